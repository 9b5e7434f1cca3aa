//! Physical geometry of the printed book
//!
//! - `spine`: spine width from page count and paper
//! - `trim`: cover canvas, panels and zones; interior page boxes

mod spine;
mod trim;

pub use spine::SpineCalculator;
pub(crate) use spine::check_page_count;
pub use trim::{
    CoverGeometry, CoverZones, InteriorGeometry, PageSide, PixelRect, Rect, TrimGeometryResolver,
};
