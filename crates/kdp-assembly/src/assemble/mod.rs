//! Print-ready PDF assembly
//!
//! - `cover`: flattened wraparound cover, one page
//! - `interior`: manuscript and full book from shared page images
//! - `overlay`: vector title text and proof guides
//! - `pdf`: the lopdf document builder both assemblers write through

mod cover;
mod interior;
mod overlay;
mod pdf;

pub use cover::{CoverAssembler, CoverInputs, SpineFill};
pub use interior::{InteriorAssembler, InteriorSources};
