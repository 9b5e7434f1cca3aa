use crate::geometry::{SpineCalculator, TrimGeometryResolver};
use crate::planner::PageCompletionPlanner;
use crate::policy::PolicyTable;
use crate::types::*;

/// Physical summary of a book as it would be printed
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BookStatistics {
    pub content_pages: usize,
    pub filler_pages: usize,
    /// Content plus fillers
    pub interior_pages: usize,
    /// Interior plus front and back cover
    pub full_book_pages: usize,
    pub spine_width_in: f64,
    pub cover_width_in: f64,
    pub cover_height_in: f64,
    pub spine_text_allowed: bool,
    /// Fixed cost per book plus the paper's per-page cost, in cents precision
    pub estimated_print_cost: f64,
}

/// Calculate statistics for an ebook's current page set
pub fn calculate_statistics(
    policy: &PolicyTable,
    ebook: &Ebook,
    pages: &PageSet,
) -> Result<BookStatistics> {
    let paper = policy.paper_type(&ebook.paper_type_id)?;
    let trim = policy.trim_format(&ebook.trim_format_id)?;

    let plan = PageCompletionPlanner::for_paper(paper).plan(pages.content_count());
    let spine = SpineCalculator::new(policy);
    let spine_width_in = spine.spine_width_for(paper, plan.total_pages)?;
    let cover = TrimGeometryResolver::new(policy).cover(trim, spine_width_in);

    let cost = policy.fixed_cost_per_book + plan.total_pages as f64 * paper.cost_factor;

    Ok(BookStatistics {
        content_pages: plan.real_pages,
        filler_pages: plan.filler_pages,
        interior_pages: plan.total_pages,
        full_book_pages: plan.total_pages + 2,
        spine_width_in,
        cover_width_in: cover.canvas_width_in,
        cover_height_in: cover.canvas_height_in,
        spine_text_allowed: spine.allows_spine_text(spine_width_in),
        estimated_print_cost: (cost * 100.0).round() / 100.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::EbookStatus;
    use chrono::DateTime;

    fn ebook(paper: &str) -> Ebook {
        Ebook {
            id: EbookId::new("stats"),
            title: "Stats".to_string(),
            trim_format_id: "8.5x8.5".to_string(),
            paper_type_id: paper.to_string(),
            target_page_count: 3,
            status: EbookStatus::Draft,
        }
    }

    fn content(count: usize) -> PageSet {
        PageSet::new(
            (0..count)
                .map(|index| ImagePage {
                    index,
                    role: PageRole::Content,
                    buffer: PixelBuffer::white(1, 1, 1),
                    seed: 0,
                    regenerated_at: DateTime::default(),
                })
                .collect(),
        )
    }

    #[test]
    fn short_book_is_padded_and_priced() {
        let policy = PolicyTable::kdp_default();
        let stats = calculate_statistics(&policy, &ebook("premium-color"), &content(3)).unwrap();
        assert_eq!(stats.content_pages, 3);
        assert_eq!(stats.filler_pages, 21);
        assert_eq!(stats.interior_pages, 24);
        assert_eq!(stats.full_book_pages, 26);
        assert_eq!(stats.spine_width_in, 0.0563);
        assert_eq!(stats.cover_width_in, 17.3063);
        assert_eq!(stats.cover_height_in, 8.75);
        assert!(!stats.spine_text_allowed);
        // 1.00 + 24 * 0.07
        assert_eq!(stats.estimated_print_cost, 2.68);
    }

    #[test]
    fn too_many_pages_is_an_error() {
        let policy = PolicyTable::kdp_default();
        let err = calculate_statistics(&policy, &ebook("standard-color"), &content(601)).unwrap_err();
        assert!(matches!(
            err,
            AssemblyError::PageCountOutOfRange { page_count: 601, .. }
        ));
    }
}
