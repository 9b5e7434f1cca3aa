//! Blank filler pages that bring the interior up to the paper's minimum
//!
//! Fillers are always appended after the last real content page and are
//! never interleaved with it.

use crate::geometry::InteriorGeometry;
use crate::policy::PaperTypeSpec;
use crate::types::PixelBuffer;
use std::ops::Range;

/// How many fillers an interior needs and where they go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionPlan {
    pub real_pages: usize,
    pub filler_pages: usize,
    /// `max(real_pages, min_pages)`
    pub total_pages: usize,
}

impl CompletionPlan {
    /// Interior positions (0-based) occupied by fillers
    pub fn filler_positions(&self) -> Range<usize> {
        self.real_pages..self.total_pages
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCompletionPlanner {
    min_pages: usize,
}

impl PageCompletionPlanner {
    pub fn new(min_pages: usize) -> Self {
        Self { min_pages }
    }

    pub fn for_paper(paper: &PaperTypeSpec) -> Self {
        Self::new(paper.min_pages)
    }

    pub fn plan(&self, real_pages: usize) -> CompletionPlan {
        let total_pages = real_pages.max(self.min_pages);
        CompletionPlan {
            real_pages,
            filler_pages: total_pages - real_pages,
            total_pages,
        }
    }

    /// Plain white page at the interior's trim-plus-bleed size
    pub fn filler_buffer(geometry: &InteriorGeometry, dpi: u32) -> PixelBuffer {
        let (width, height) = geometry.page_pixels(dpi);
        PixelBuffer::white(width, height, dpi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_pages_fill_to_twenty_four() {
        let plan = PageCompletionPlanner::new(24).plan(3);
        assert_eq!(plan.filler_pages, 21);
        assert_eq!(plan.total_pages, 24);
        assert_eq!(plan.filler_positions(), 3..24);
        assert!(!plan.filler_positions().contains(&2));
        assert!(plan.filler_positions().contains(&3));
    }

    #[test]
    fn no_fillers_at_or_above_minimum() {
        let planner = PageCompletionPlanner::new(24);
        assert_eq!(planner.plan(24).filler_pages, 0);
        assert_eq!(planner.plan(30).total_pages, 30);
        assert!(planner.plan(30).filler_positions().is_empty());
    }
}
