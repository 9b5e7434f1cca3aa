//! Interior manuscript and full-book documents
//!
//! Both artifacts are built from the same converted images. Nothing here
//! converts or resizes pixels; pages are only ordered and boxed.

use super::overlay::{guide_ops, title_ops};
use super::pdf::{PageSpec, PdfBuilder};
use crate::color::PrintImage;
use crate::geometry::{InteriorGeometry, PageSide};
use crate::planner::CompletionPlan;
use crate::types::*;
use lopdf::ObjectId;

/// Converted images an interior is assembled from
pub struct InteriorSources<'a> {
    /// Real content pages in reading order
    pub content: &'a [PrintImage],
    /// Shared by every filler page; required when the plan has fillers
    pub filler: Option<&'a PrintImage>,
    pub front_cover: Option<&'a PrintImage>,
    pub back_cover: Option<&'a PrintImage>,
    /// Set on the front cover page of the full book
    pub title: &'a str,
    pub guides: bool,
}

pub struct InteriorAssembler<'a> {
    geometry: &'a InteriorGeometry,
    plan: CompletionPlan,
}

impl<'a> InteriorAssembler<'a> {
    pub fn new(geometry: &'a InteriorGeometry, plan: CompletionPlan) -> Self {
        Self { geometry, plan }
    }

    /// Content pages then fillers, no covers
    pub fn manuscript(&self, sources: &InteriorSources<'_>) -> Result<Vec<u8>> {
        self.check_sources(sources)?;
        let mut pdf = PdfBuilder::new();
        self.add_interior_pages(&mut pdf, sources);
        log::debug!(
            "manuscript: {} content + {} filler pages",
            self.plan.real_pages,
            self.plan.filler_pages
        );
        pdf.finish()
    }

    /// Front cover, content pages, fillers, back cover
    pub fn full_book(&self, sources: &InteriorSources<'_>) -> Result<Vec<u8>> {
        self.check_sources(sources)?;
        let (front, back) = match (sources.front_cover, sources.back_cover) {
            (Some(front), Some(back)) => (front, back),
            _ => {
                return Err(AssemblyError::Assembly(
                    "full book needs both cover images".to_string(),
                ));
            }
        };

        let mut pdf = PdfBuilder::new();

        let front_id = pdf.add_image(front);
        let mut overlay = title_ops(
            sources.title,
            &self.geometry.safe_area(PageSide::Recto),
            self.geometry.page_height_in,
            front.space,
        );
        overlay.push_str(&self.guides(sources, PageSide::Recto));
        self.add_page(&mut pdf, front_id, PageSide::Recto, &overlay);

        self.add_interior_pages(&mut pdf, sources);

        let back_id = pdf.add_image(back);
        let overlay = self.guides(sources, PageSide::Verso);
        self.add_page(&mut pdf, back_id, PageSide::Verso, &overlay);

        log::debug!("full book: {} pages", pdf.page_count());
        pdf.finish()
    }

    fn check_sources(&self, sources: &InteriorSources<'_>) -> Result<()> {
        if sources.content.len() != self.plan.real_pages {
            return Err(AssemblyError::Assembly(format!(
                "planned {} content pages but got {} images",
                self.plan.real_pages,
                sources.content.len()
            )));
        }
        if self.plan.filler_pages > 0 && sources.filler.is_none() {
            return Err(AssemblyError::Assembly(format!(
                "{} filler pages planned but no filler image",
                self.plan.filler_pages
            )));
        }
        Ok(())
    }

    fn add_interior_pages(&self, pdf: &mut PdfBuilder, sources: &InteriorSources<'_>) {
        for (i, image) in sources.content.iter().enumerate() {
            let side = PageSide::of_page(i + 1);
            let id = pdf.add_image(image);
            let overlay = self.guides(sources, side);
            self.add_page(pdf, id, side, &overlay);
        }

        let filler = match sources.filler {
            Some(filler) if self.plan.filler_pages > 0 => filler,
            _ => return,
        };
        let filler_id = pdf.add_image(filler);
        for position in self.plan.filler_positions() {
            let side = PageSide::of_page(position + 1);
            let overlay = self.guides(sources, side);
            self.add_page(pdf, filler_id, side, &overlay);
        }
    }

    fn guides(&self, sources: &InteriorSources<'_>, side: PageSide) -> String {
        if !sources.guides {
            return String::new();
        }
        guide_ops(
            &[self.geometry.trim_box(side)],
            self.geometry.page_height_in,
        )
    }

    fn add_page(&self, pdf: &mut PdfBuilder, image: ObjectId, side: PageSide, overlay: &str) {
        pdf.add_page(&PageSpec {
            width_in: self.geometry.page_width_in,
            height_in: self.geometry.page_height_in,
            trim: Some(self.geometry.trim_box(side)),
            image,
            overlay,
        });
    }
}
