use crate::constants::round_to;
use crate::policy::{PaperTypeSpec, PolicyTable};
use crate::types::*;

/// Spine width from page count. Pure and deterministic.
#[derive(Debug, Clone, Copy)]
pub struct SpineCalculator<'a> {
    policy: &'a PolicyTable,
}

impl<'a> SpineCalculator<'a> {
    pub fn new(policy: &'a PolicyTable) -> Self {
        Self { policy }
    }

    /// Spine width in inches for a paper type id
    pub fn spine_width(&self, paper_type_id: &str, page_count: usize) -> Result<f64> {
        let paper = self.policy.paper_type(paper_type_id)?;
        self.spine_width_for(paper, page_count)
    }

    pub fn spine_width_for(&self, paper: &PaperTypeSpec, page_count: usize) -> Result<f64> {
        check_page_count(paper, page_count)?;
        Ok(round_to(
            page_count as f64 * paper.spine_in_per_page,
            self.policy.spine_precision_decimals,
        ))
    }

    /// Whether a spine this wide may carry a title
    pub fn allows_spine_text(&self, spine_width_in: f64) -> bool {
        spine_width_in >= self.policy.spine_text_min_width_in
    }
}

pub(crate) fn check_page_count(paper: &PaperTypeSpec, page_count: usize) -> Result<()> {
    if page_count < paper.min_pages || page_count > paper.max_pages {
        return Err(AssemblyError::PageCountOutOfRange {
            paper_type: paper.id.clone(),
            page_count,
            min_pages: paper.min_pages,
            max_pages: paper.max_pages,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn premium_color_24_pages() {
        let policy = PolicyTable::kdp_default();
        let spine = SpineCalculator::new(&policy)
            .spine_width("premium-color", 24)
            .unwrap();
        assert_eq!(spine, 0.0563);
    }

    #[test]
    fn bounds_are_inclusive() {
        let policy = PolicyTable::kdp_default();
        let calc = SpineCalculator::new(&policy);
        assert!(calc.spine_width("white", 24).is_ok());
        assert!(calc.spine_width("white", 828).is_ok());
        assert!(matches!(
            calc.spine_width("white", 23),
            Err(AssemblyError::PageCountOutOfRange { page_count: 23, .. })
        ));
        assert!(matches!(
            calc.spine_width("white", 829),
            Err(AssemblyError::PageCountOutOfRange { max_pages: 828, .. })
        ));
    }

    #[test]
    fn unknown_paper_fails_closed() {
        let policy = PolicyTable::kdp_default();
        let err = SpineCalculator::new(&policy)
            .spine_width("newsprint", 100)
            .unwrap_err();
        assert!(matches!(err, AssemblyError::UnknownPaperType(id) if id == "newsprint"));
    }
}
