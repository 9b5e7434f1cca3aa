//! Export pipeline: validate, plan, convert once, assemble
//!
//! 1. Resolve paper type and trim format (unknown ids fail fast)
//! 2. Validate the whole page set; hard violations stop here
//! 3. Plan fillers, compute spine and geometry
//! 4. Convert every page image exactly once
//! 5. Assemble each requested artifact from the converted images

use crate::assemble::{
    CoverAssembler, CoverInputs, InteriorAssembler, InteriorSources, SpineFill,
};
use crate::barcode::{Barcode, BarcodePayload};
use crate::color::{ColorProfileConverter, PrintImage};
use crate::geometry::{InteriorGeometry, SpineCalculator, TrimGeometryResolver};
use crate::planner::PageCompletionPlanner;
use crate::policy::{PaperTypeSpec, PolicyTable};
use crate::stats::{BookStatistics, calculate_statistics};
use crate::types::*;
use crate::validation::{ValidationEngine, ValidationResult};
use chrono::Utc;
use std::sync::Arc;

/// What to produce
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRequest {
    pub kinds: Vec<ArtifactKind>,
    /// Printed on the back cover when present
    pub barcode: Option<BarcodePayload>,
    pub spine_fill: SpineFill,
    /// Draw dashed trim, safe-area and zone outlines
    pub guides: bool,
}

impl Default for ExportRequest {
    fn default() -> Self {
        Self {
            kinds: ArtifactKind::ALL.to_vec(),
            barcode: None,
            spine_fill: SpineFill::default(),
            guides: false,
        }
    }
}

impl ExportRequest {
    pub fn only(kinds: &[ArtifactKind]) -> Self {
        Self {
            kinds: kinds.to_vec(),
            ..Self::default()
        }
    }

    pub fn with_barcode(mut self, payload: BarcodePayload) -> Self {
        self.barcode = Some(payload);
        self
    }

    pub fn with_spine_fill(mut self, fill: SpineFill) -> Self {
        self.spine_fill = fill;
        self
    }

    pub fn with_guides(mut self, guides: bool) -> Self {
        self.guides = guides;
        self
    }

    pub fn wants(&self, kind: ArtifactKind) -> bool {
        self.kinds.contains(&kind)
    }

    fn wants_interior(&self) -> bool {
        self.wants(ArtifactKind::FullBook) || self.wants(ArtifactKind::InteriorManuscript)
    }

    fn wants_covers(&self) -> bool {
        self.wants(ArtifactKind::FullBook) || self.wants(ArtifactKind::CoverOnly)
    }
}

/// Outcome of one export
#[derive(Debug, Clone)]
pub struct ExportReport {
    pub validation: ValidationResult,
    /// Empty when validation blocked the export
    pub artifacts: Vec<ExportArtifact>,
    pub statistics: Option<BookStatistics>,
}

impl ExportReport {
    pub fn is_blocked(&self) -> bool {
        self.validation.is_blocking()
    }

    pub fn artifact(&self, kind: ArtifactKind) -> Option<&ExportArtifact> {
        self.artifacts.iter().find(|a| a.kind == kind)
    }
}

/// Page images converted for print, shared by every artifact
struct ConvertedPages {
    content: Vec<PrintImage>,
    filler: Option<PrintImage>,
    front_cover: Option<PrintImage>,
    back_cover: Option<PrintImage>,
}

#[derive(Debug, Clone)]
pub struct ExportEngine {
    policy: Arc<PolicyTable>,
}

impl ExportEngine {
    /// Rejects a policy table that fails [`PolicyTable::validate`]
    pub fn new(policy: Arc<PolicyTable>) -> Result<Self> {
        policy.validate()?;
        Ok(Self { policy })
    }

    pub fn policy(&self) -> &PolicyTable {
        &self.policy
    }

    pub fn validate(
        &self,
        ebook: &Ebook,
        pages: &PageSet,
        request: &ExportRequest,
    ) -> Result<ValidationResult> {
        ValidationEngine::new(&self.policy).validate(ebook, pages, request)
    }

    /// Run the export pipeline
    pub fn export(
        &self,
        ebook: &Ebook,
        pages: &PageSet,
        request: &ExportRequest,
    ) -> Result<ExportReport> {
        let policy = self.policy.as_ref();
        let validation = self.validate(ebook, pages, request)?;
        if validation.is_blocking() {
            log::warn!(
                "export of {} blocked by {} violation(s)",
                ebook.id,
                validation.hard().count()
            );
            return Ok(ExportReport {
                validation,
                artifacts: Vec::new(),
                statistics: None,
            });
        }

        let paper = policy.paper_type(&ebook.paper_type_id)?;
        let trim = policy.trim_format(&ebook.trim_format_id)?;
        let plan = PageCompletionPlanner::for_paper(paper).plan(pages.content_count());
        let spine_width = SpineCalculator::new(policy).spine_width_for(paper, plan.total_pages)?;
        let resolver = TrimGeometryResolver::new(policy);
        let interior = resolver.interior(trim);
        let cover = resolver.cover(trim, spine_width);

        let statistics = calculate_statistics(policy, ebook, pages)?;
        let converted = self.convert_pages(paper, pages, request, &interior)?;
        let snapshot = pages.snapshot_id(ebook);
        let generated_at = Utc::now();

        let barcode = match &request.barcode {
            Some(payload) if request.wants_covers() => Some(
                Barcode::encode(payload)
                    .map_err(|e| AssemblyError::Assembly(format!("barcode: {}", e)))?,
            ),
            _ => None,
        };

        let sources = InteriorSources {
            content: &converted.content,
            filler: converted.filler.as_ref(),
            front_cover: converted.front_cover.as_ref(),
            back_cover: converted.back_cover.as_ref(),
            title: &ebook.title,
            guides: request.guides,
        };
        let interior_assembler = InteriorAssembler::new(&interior, plan);

        let mut artifacts = Vec::with_capacity(request.kinds.len());
        for &kind in &ArtifactKind::ALL {
            if !request.wants(kind) {
                continue;
            }
            let (bytes, page_count) = match kind {
                ArtifactKind::FullBook => {
                    (interior_assembler.full_book(&sources)?, plan.total_pages + 2)
                }
                ArtifactKind::InteriorManuscript => {
                    (interior_assembler.manuscript(&sources)?, plan.total_pages)
                }
                ArtifactKind::CoverOnly => {
                    let (front, back) = match (pages.front_cover(), pages.back_cover()) {
                        (Some(front), Some(back)) => (front, back),
                        _ => {
                            return Err(AssemblyError::Assembly(
                                "cover needs front and back cover pages".to_string(),
                            ));
                        }
                    };
                    let inputs = CoverInputs {
                        front: &front.buffer,
                        back: &back.buffer,
                        spine_fill: &request.spine_fill,
                        title: &ebook.title,
                        barcode: barcode.as_ref(),
                        guides: request.guides,
                    };
                    (CoverAssembler::new(policy, &cover).assemble(&inputs)?, 1)
                }
            };

            log::info!(
                "{} for {}: {} pages, {} bytes",
                kind,
                ebook.id,
                page_count,
                bytes.len()
            );
            artifacts.push(ExportArtifact {
                kind,
                bytes,
                generated_at,
                source_page_count: page_count,
                snapshot: snapshot.clone(),
            });
        }

        Ok(ExportReport {
            validation,
            artifacts,
            statistics: Some(statistics),
        })
    }

    /// Same pipeline on tokio's blocking pool
    pub async fn export_async(
        &self,
        ebook: Ebook,
        pages: PageSet,
        request: ExportRequest,
    ) -> Result<ExportReport> {
        let engine = self.clone();
        tokio::task::spawn_blocking(move || engine.export(&ebook, &pages, &request)).await?
    }

    fn convert_pages(
        &self,
        paper: &PaperTypeSpec,
        pages: &PageSet,
        request: &ExportRequest,
        interior: &InteriorGeometry,
    ) -> Result<ConvertedPages> {
        let policy = self.policy.as_ref();

        let (content, filler) = if request.wants_interior() {
            let converter = ColorProfileConverter::for_paper(policy, paper)?;
            let content = pages
                .content()
                .into_iter()
                .map(|page| converter.convert(&page.buffer))
                .collect::<Result<Vec<_>>>()?;
            let blank = PageCompletionPlanner::filler_buffer(interior, policy.required_dpi);
            (content, Some(converter.convert(&blank)?))
        } else {
            (Vec::new(), None)
        };

        let (front_cover, back_cover) = if request.wants(ArtifactKind::FullBook) {
            let converter = ColorProfileConverter::for_cover(policy)?;
            let convert = |page: Option<&ImagePage>| {
                page.map(|p| converter.convert(&p.buffer)).transpose()
            };
            (convert(pages.front_cover())?, convert(pages.back_cover())?)
        } else {
            (None, None)
        };

        Ok(ConvertedPages {
            content,
            filler,
            front_cover,
            back_cover,
        })
    }
}
