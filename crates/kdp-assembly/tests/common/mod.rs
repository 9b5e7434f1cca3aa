#![allow(dead_code)]

use chrono::DateTime;
use kdp_assembly::*;

/// Low resolution keeps test buffers small; geometry is unaffected
pub const TEST_DPI: u32 = 20;

pub fn test_policy() -> PolicyTable {
    PolicyTable::kdp_default().with_required_dpi(TEST_DPI)
}

pub fn ebook(id: &str, paper: &str, status: EbookStatus) -> Ebook {
    Ebook {
        id: EbookId::new(id),
        title: "The Quiet Lighthouse".to_string(),
        trim_format_id: "8.5x8.5".to_string(),
        paper_type_id: paper.to_string(),
        target_page_count: 0,
        status,
    }
}

/// Minimum pixel size for an 8.5" square trim at `TEST_DPI`
pub fn trim_px() -> u32 {
    (8.5 * TEST_DPI as f64).round() as u32
}

pub fn page(index: usize, role: PageRole, rgb: [u8; 3]) -> ImagePage {
    ImagePage {
        index,
        role,
        buffer: PixelBuffer::solid_rgb(trim_px(), trim_px(), TEST_DPI, rgb),
        seed: index as u64,
        regenerated_at: DateTime::default(),
    }
}

/// Front cover at index 0, `content` pages at 1..=n, back cover at n + 1.
/// Every page gets a distinct color.
pub fn book_pages(content: usize) -> PageSet {
    let mut pages = vec![page(0, PageRole::FrontCover, [200, 30, 30])];
    for i in 0..content {
        let shade = (i * 7 % 200) as u8;
        pages.push(page(i + 1, PageRole::Content, [shade, 120, 255 - shade]));
    }
    pages.push(page(content + 1, PageRole::BackCover, [30, 30, 200]));
    PageSet::new(pages)
}

pub fn digests(bytes: &[u8]) -> Vec<String> {
    inspect_pdf(bytes)
        .unwrap()
        .into_iter()
        .map(|p| p.image.expect("page without image").digest)
        .collect()
}
