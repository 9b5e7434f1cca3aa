//! Cover canvas and interior page geometry
//!
//! All rectangles are in inches, in canvas coordinates: origin at the top
//! left of the full-bleed canvas, y growing downwards.

use crate::constants::{in_to_pt, in_to_px, round_to};
use crate::policy::{PolicyTable, TrimFormat};

/// Axis-aligned rectangle in inches
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center_x(&self) -> f64 {
        self.x + self.width / 2.0
    }

    pub fn center_y(&self) -> f64 {
        self.y + self.height / 2.0
    }

    /// Shrink by `d` on every side
    pub fn inset(&self, d: f64) -> Rect {
        Rect::new(
            self.x + d,
            self.y + d,
            (self.width - 2.0 * d).max(0.0),
            (self.height - 2.0 * d).max(0.0),
        )
    }

    pub fn contains(&self, other: &Rect) -> bool {
        const EPS: f64 = 1e-9;
        other.x >= self.x - EPS
            && other.y >= self.y - EPS
            && other.right() <= self.right() + EPS
            && other.bottom() <= self.bottom() + EPS
    }

    /// Pixel bounds at a resolution. Edges are rounded independently so
    /// adjacent rectangles share their boundary pixel column.
    pub fn to_pixels(&self, dpi: u32) -> PixelRect {
        let x0 = in_to_px(self.x, dpi);
        let y0 = in_to_px(self.y, dpi);
        let x1 = in_to_px(self.right(), dpi);
        let y1 = in_to_px(self.bottom(), dpi);
        PixelRect {
            x: x0,
            y: y0,
            width: x1.saturating_sub(x0),
            height: y1.saturating_sub(y0),
        }
    }

    /// PDF rectangle `[x, y, width, height]` in points on a page of the
    /// given height (PDF space has y growing upwards)
    pub fn to_pdf(&self, page_height_in: f64) -> [f64; 4] {
        [
            in_to_pt(self.x),
            in_to_pt(page_height_in - self.bottom()),
            in_to_pt(self.width),
            in_to_pt(self.height),
        ]
    }
}

/// Rectangle in whole pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Named regions of the cover canvas
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverZones {
    /// Canvas inset by bleed plus the safety margin
    pub safe_interior: Rect,
    /// Reserved box at the back cover's bottom right
    pub barcode: Rect,
    /// Band the width of the spine, clear of the safety margin top and bottom
    pub spine_text: Rect,
    /// Where the printer cuts; a guide only, never printed
    pub trim_line: Rect,
}

/// Full-bleed cover canvas: back panel, spine, front panel
#[derive(Debug, Clone, PartialEq)]
pub struct CoverGeometry {
    pub trim_width_in: f64,
    pub trim_height_in: f64,
    pub bleed_in: f64,
    pub safety_margin_in: f64,
    pub spine_width_in: f64,
    pub canvas_width_in: f64,
    pub canvas_height_in: f64,
    pub back_panel: Rect,
    pub spine_panel: Rect,
    pub front_panel: Rect,
    pub zones: CoverZones,
}

impl CoverGeometry {
    /// Front cover trim area inset by the safety margin
    pub fn front_safe_area(&self) -> Rect {
        Rect::new(
            self.spine_panel.right(),
            self.bleed_in,
            self.trim_width_in,
            self.trim_height_in,
        )
        .inset(self.safety_margin_in)
    }

    /// Back cover trim area inset by the safety margin
    pub fn back_safe_area(&self) -> Rect {
        Rect::new(
            self.bleed_in,
            self.bleed_in,
            self.trim_width_in,
            self.trim_height_in,
        )
        .inset(self.safety_margin_in)
    }

    pub fn canvas_pixels(&self, dpi: u32) -> (u32, u32) {
        (
            in_to_px(self.canvas_width_in, dpi),
            in_to_px(self.canvas_height_in, dpi),
        )
    }
}

/// Which side of the open book a page lands on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSide {
    /// Right-hand page; the outer edge is on the right
    Recto,
    /// Left-hand page; the outer edge is on the left
    Verso,
}

impl PageSide {
    /// Side of a 1-based page number
    pub fn of_page(page_number: usize) -> Self {
        if page_number % 2 == 1 {
            PageSide::Recto
        } else {
            PageSide::Verso
        }
    }
}

/// Interior page box: bleed on top, bottom and the outer edge
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InteriorGeometry {
    pub trim_width_in: f64,
    pub trim_height_in: f64,
    pub bleed_in: f64,
    pub safety_margin_in: f64,
    pub page_width_in: f64,
    pub page_height_in: f64,
}

impl InteriorGeometry {
    /// Trim area within the page, in page coordinates
    pub fn trim_box(&self, side: PageSide) -> Rect {
        let x = match side {
            PageSide::Recto => 0.0,
            PageSide::Verso => self.bleed_in,
        };
        Rect::new(x, self.bleed_in, self.trim_width_in, self.trim_height_in)
    }

    /// Trim area inset by the safety margin
    pub fn safe_area(&self, side: PageSide) -> Rect {
        self.trim_box(side).inset(self.safety_margin_in)
    }

    pub fn page_pixels(&self, dpi: u32) -> (u32, u32) {
        (
            in_to_px(self.page_width_in, dpi),
            in_to_px(self.page_height_in, dpi),
        )
    }
}

/// Turns trim, bleed and spine into canvases and zones
#[derive(Debug, Clone, Copy)]
pub struct TrimGeometryResolver<'a> {
    policy: &'a PolicyTable,
}

impl<'a> TrimGeometryResolver<'a> {
    pub fn new(policy: &'a PolicyTable) -> Self {
        Self { policy }
    }

    pub fn cover(&self, trim: &TrimFormat, spine_width_in: f64) -> CoverGeometry {
        let bleed = self.policy.bleed_in;
        let safety = self.policy.safety_margin_in;
        let precision = self.policy.spine_precision_decimals;

        let canvas_width = round_to(
            2.0 * trim.width_in + spine_width_in + 2.0 * bleed,
            precision,
        );
        let canvas_height = round_to(trim.height_in + 2.0 * bleed, precision);

        let spine_x = bleed + trim.width_in;
        let back_panel = Rect::new(0.0, 0.0, spine_x, canvas_height);
        let spine_panel = Rect::new(spine_x, 0.0, spine_width_in, canvas_height);
        let front_x = spine_x + spine_width_in;
        let front_panel = Rect::new(front_x, 0.0, canvas_width - front_x, canvas_height);

        let canvas = Rect::new(0.0, 0.0, canvas_width, canvas_height);
        let barcode = &self.policy.barcode;
        let zones = CoverZones {
            safe_interior: canvas.inset(bleed + safety),
            barcode: Rect::new(
                spine_x - barcode.inset_in - barcode.width_in,
                bleed + trim.height_in - barcode.inset_in - barcode.height_in,
                barcode.width_in,
                barcode.height_in,
            ),
            spine_text: Rect::new(
                spine_x,
                bleed + safety,
                spine_width_in,
                (trim.height_in - 2.0 * safety).max(0.0),
            ),
            trim_line: canvas.inset(bleed),
        };

        CoverGeometry {
            trim_width_in: trim.width_in,
            trim_height_in: trim.height_in,
            bleed_in: bleed,
            safety_margin_in: safety,
            spine_width_in,
            canvas_width_in: canvas_width,
            canvas_height_in: canvas_height,
            back_panel,
            spine_panel,
            front_panel,
            zones,
        }
    }

    pub fn interior(&self, trim: &TrimFormat) -> InteriorGeometry {
        let bleed = self.policy.bleed_in;
        InteriorGeometry {
            trim_width_in: trim.width_in,
            trim_height_in: trim.height_in,
            bleed_in: bleed,
            safety_margin_in: self.policy.safety_margin_in,
            page_width_in: trim.width_in + bleed,
            page_height_in: trim.height_in + 2.0 * bleed,
        }
    }

    /// Smallest pixel size a page of this trim may have
    pub fn minimum_pixels(&self, trim: &TrimFormat) -> (u32, u32) {
        let dpi = self.policy.required_dpi;
        (in_to_px(trim.width_in, dpi), in_to_px(trim.height_in, dpi))
    }
}
