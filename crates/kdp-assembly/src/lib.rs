pub mod assemble;
mod barcode;
mod color;
pub mod constants;
mod export;
pub mod geometry;
mod inspect;
mod io;
mod lifecycle;
mod planner;
mod policy;
mod regenerate;
mod stats;
mod types;
mod validation;

pub use assemble::{CoverAssembler, CoverInputs, InteriorAssembler, InteriorSources, SpineFill};
pub use barcode::{Barcode, BarcodeError, BarcodePayload};
pub use color::{ColorProfileConverter, PrintColorSpace, PrintImage};
pub use export::{ExportEngine, ExportReport, ExportRequest};
pub use geometry::{
    CoverGeometry, CoverZones, InteriorGeometry, PageSide, PixelRect, Rect, SpineCalculator,
    TrimGeometryResolver,
};
pub use inspect::{EmbeddedImage, PageInfo, inspect_pdf};
pub use io::{decode_image_file, load_page_manifest, save_artifact};
pub use lifecycle::{EbookStatus, LifecycleAction, LifecycleViolation};
pub use planner::{CompletionPlan, PageCompletionPlanner};
pub use policy::*;
pub use regenerate::{Regeneration, RegenerationCoordinator};
pub use stats::{BookStatistics, calculate_statistics};
pub use types::*;
pub use validation::{
    Severity, ValidationContext, ValidationEngine, ValidationResult, ValidationRule, Violation,
    ViolationKind,
};
