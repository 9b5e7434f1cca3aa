//! Shared constants for print assembly
//!
//! This module centralizes magic numbers and constants used throughout
//! geometry, cover composition and PDF output.

// =============================================================================
// Unit Conversion
// =============================================================================

/// Points per inch (PDF user space unit)
pub const POINTS_PER_INCH: f64 = 72.0;

/// Convert inches to points
#[inline]
pub fn in_to_pt(inches: f64) -> f64 {
    inches * POINTS_PER_INCH
}

/// Convert an inch length to whole pixels at the given resolution
#[inline]
pub fn in_to_px(inches: f64, dpi: u32) -> u32 {
    (inches * dpi as f64).round().max(0.0) as u32
}

/// Round to a fixed number of decimal places
#[inline]
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

// =============================================================================
// Platform Defaults
// =============================================================================

/// Bleed beyond the trim on every outer edge (inches)
pub const DEFAULT_BLEED_IN: f64 = 0.125;

/// Minimum print resolution
pub const DEFAULT_REQUIRED_DPI: u32 = 300;

/// Distance from trim to keep text and critical art inside (inches)
pub const DEFAULT_SAFETY_MARGIN_IN: f64 = 0.125;

/// Decimal places kept for spine widths and cover canvas sizes
pub const DEFAULT_SPINE_PRECISION: u32 = 4;

/// Narrowest spine that may carry a title (inches)
pub const DEFAULT_SPINE_TEXT_MIN_WIDTH_IN: f64 = 0.1775;

/// Barcode box reserved on the back cover (inches)
pub const DEFAULT_BARCODE_WIDTH_IN: f64 = 2.0;
pub const DEFAULT_BARCODE_HEIGHT_IN: f64 = 1.2;

/// Barcode box offset from the back cover's bottom and spine-side trim edges
pub const DEFAULT_BARCODE_INSET_IN: f64 = 0.25;

/// White border around the bars inside the barcode box
pub const DEFAULT_BARCODE_QUIET_ZONE_IN: f64 = 0.1;

// =============================================================================
// Text
// =============================================================================

/// Largest font size for the front cover title (points)
pub const TITLE_MAX_FONT_SIZE: f64 = 48.0;

/// Smallest font size the title is shrunk to before it is allowed to overflow
pub const TITLE_MIN_FONT_SIZE: f64 = 10.0;

/// Largest font size for spine text (points)
pub const SPINE_MAX_FONT_SIZE: f64 = 14.0;

/// Spine text height as a share of the spine width
pub const SPINE_FONT_WIDTH_RATIO: f64 = 0.6;

/// Approximate character width ratio for Helvetica
pub const HELVETICA_CHAR_WIDTH_RATIO: f64 = 0.5;

// =============================================================================
// Proof Guides
// =============================================================================

/// Line width for trim, safe-area and zone guides (points)
pub const GUIDE_LINE_WIDTH: f64 = 0.5;

/// Dash pattern for guides: dash and gap length (points)
pub const GUIDE_DASH: (f64, f64) = (4.0, 2.0);

// =============================================================================
// Color Conversion
// =============================================================================

/// Largest channel spread still treated as a neutral gray
pub const DEFAULT_NEUTRAL_TOLERANCE: u8 = 8;

/// Brightest neutral still treated as line-art black
pub const DEFAULT_LINE_ART_THRESHOLD: u8 = 40;
