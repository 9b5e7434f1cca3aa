//! Vector content drawn over page images: titles and proof guides
//!
//! All functions return PDF content stream operations. Positions come in as
//! inch rectangles in canvas coordinates and are flipped into PDF space here.

use super::pdf::{FONT_NAME, pdf_string};
use crate::color::PrintColorSpace;
use crate::constants::*;
use crate::geometry::Rect;

/// Fill operator for solid black text in the page's color space
fn black_fill(space: PrintColorSpace) -> &'static str {
    match space {
        PrintColorSpace::DeviceCmyk => "0 0 0 1 k",
        PrintColorSpace::DeviceGray => "0 g",
        PrintColorSpace::DeviceRgb => "0 0 0 rg",
    }
}

/// Approximate Helvetica advance width in points
fn text_width(text: &str, size: f64) -> f64 {
    text.chars().count() as f64 * size * HELVETICA_CHAR_WIDTH_RATIO
}

/// Title centered horizontally near the top of `area`
pub(crate) fn title_ops(
    title: &str,
    area: &Rect,
    page_height_in: f64,
    space: PrintColorSpace,
) -> String {
    let title = title.trim();
    if title.is_empty() {
        return String::new();
    }

    let [x, y, width, height] = area.to_pdf(page_height_in);
    let fit = width / (title.chars().count() as f64 * HELVETICA_CHAR_WIDTH_RATIO);
    let size = fit.clamp(TITLE_MIN_FONT_SIZE, TITLE_MAX_FONT_SIZE);

    let text_x = x + (width - text_width(title, size)) / 2.0;
    let text_y = y + height - size;

    format!(
        "q {} BT /{} {} Tf {} {} Td {} Tj ET Q\n",
        black_fill(space),
        FONT_NAME,
        size,
        text_x,
        text_y,
        pdf_string(title)
    )
}

/// Title set top-to-bottom along the spine band
pub(crate) fn spine_text_ops(
    title: &str,
    band: &Rect,
    page_height_in: f64,
    space: PrintColorSpace,
) -> String {
    let title = title.trim();
    if title.is_empty() {
        return String::new();
    }

    let [x, y, width, height] = band.to_pdf(page_height_in);
    let size = (width * SPINE_FONT_WIDTH_RATIO).min(SPINE_MAX_FONT_SIZE);
    let run = text_width(title, size).min(height);

    // Rotated -90 degrees: the baseline runs downward and glyph tops face
    // the front cover, so the baseline sits left of the band's center.
    let origin_x = x + width / 2.0 - size * 0.35;
    let origin_y = y + height / 2.0 + run / 2.0;

    format!(
        "q {} BT /{} {} Tf 0 -1 1 0 {} {} Tm {} Tj ET Q\n",
        black_fill(space),
        FONT_NAME,
        size,
        origin_x,
        origin_y,
        pdf_string(title)
    )
}

/// Dashed outlines of the given rectangles
pub(crate) fn guide_ops(rects: &[Rect], page_height_in: f64) -> String {
    if rects.is_empty() {
        return String::new();
    }

    let mut ops = String::new();
    ops.push_str("q\n");
    ops.push_str("0 0 0 RG\n");
    ops.push_str(&format!("{} w\n", GUIDE_LINE_WIDTH));
    ops.push_str(&format!("[{} {}] 0 d\n", GUIDE_DASH.0, GUIDE_DASH.1));

    for rect in rects {
        let [x, y, w, h] = rect.to_pdf(page_height_in);
        ops.push_str(&format!("{} {} {} {} re S\n", x, y, w, h));
    }

    ops.push_str("[] 0 d\n");
    ops.push_str("Q\n");
    ops
}
