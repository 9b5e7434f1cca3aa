//! Pre-export checks
//!
//! Every rule runs against the whole page set and reports what it finds.
//! Violations are data, not errors: the engine only returns `Err` when the
//! ebook names a paper type or trim format the policy does not know.

use crate::barcode::{Barcode, BarcodePayload};
use crate::export::ExportRequest;
use crate::geometry::{SpineCalculator, TrimGeometryResolver, check_page_count};
use crate::planner::{CompletionPlan, PageCompletionPlanner};
use crate::policy::{PaperTypeSpec, PolicyTable, TrimFormat};
use crate::types::*;
use std::collections::BTreeMap;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Whether a violation stops the export
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Severity {
    Hard,
    Informational,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ViolationKind {
    PageCountOutOfRange,
    ImageResolutionTooLow,
    MissingPage,
    DuplicatePage,
    InvalidColorMode,
    MissingColorProfile,
    InvalidBarcode,
    FillerPagesAdded,
    SpineTextOmitted,
    TargetPageCountMismatch,
}

impl ViolationKind {
    pub fn severity(self) -> Severity {
        match self {
            ViolationKind::PageCountOutOfRange
            | ViolationKind::ImageResolutionTooLow
            | ViolationKind::MissingPage
            | ViolationKind::DuplicatePage
            | ViolationKind::InvalidColorMode
            | ViolationKind::MissingColorProfile
            | ViolationKind::InvalidBarcode => Severity::Hard,
            ViolationKind::FillerPagesAdded
            | ViolationKind::SpineTextOmitted
            | ViolationKind::TargetPageCountMismatch => Severity::Informational,
        }
    }

    pub fn is_hard(self) -> bool {
        self.severity() == Severity::Hard
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Violation {
    pub kind: ViolationKind,
    /// Offending page, when the violation is about one page
    pub page_index: Option<usize>,
    pub measured: String,
    pub required: String,
    pub message: String,
}

impl Violation {
    fn new(
        kind: ViolationKind,
        page_index: Option<usize>,
        measured: impl Into<String>,
        required: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            page_index,
            measured: measured.into(),
            required: required.into(),
            message: message.into(),
        }
    }

    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity() {
            Severity::Hard => "error",
            Severity::Informational => "info",
        };
        write!(f, "[{}] {}", tag, self.kind)?;
        if let Some(index) = self.page_index {
            write!(f, " (page {})", index)?;
        }
        write!(
            f,
            ": {} (measured {}, required {})",
            self.message, self.measured, self.required
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ValidationResult {
    /// No hard violations
    pub passed: bool,
    pub violations: Vec<Violation>,
}

impl ValidationResult {
    fn from_violations(violations: Vec<Violation>) -> Self {
        Self {
            passed: !violations.iter().any(|v| v.kind.is_hard()),
            violations,
        }
    }

    pub fn is_blocking(&self) -> bool {
        !self.passed
    }

    pub fn hard(&self) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(|v| v.kind.is_hard())
    }

    pub fn informational(&self) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(|v| !v.kind.is_hard())
    }

    pub fn of_kind(&self, kind: ViolationKind) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(move |v| v.kind == kind)
    }
}

/// Everything a rule may look at
pub struct ValidationContext<'a> {
    pub policy: &'a PolicyTable,
    pub ebook: &'a Ebook,
    pub paper: &'a PaperTypeSpec,
    pub trim: &'a TrimFormat,
    pub pages: &'a PageSet,
    pub request: &'a ExportRequest,
    pub plan: CompletionPlan,
}

impl ValidationContext<'_> {
    fn needs_covers(&self) -> bool {
        self.request
            .kinds
            .iter()
            .any(|k| matches!(k, ArtifactKind::FullBook | ArtifactKind::CoverOnly))
    }

    fn needs_interior(&self) -> bool {
        self.request
            .kinds
            .iter()
            .any(|k| matches!(k, ArtifactKind::FullBook | ArtifactKind::InteriorManuscript))
    }

    /// Pages that end up in a requested artifact
    fn checked_pages(&self) -> impl Iterator<Item = &ImagePage> {
        let covers = self.needs_covers();
        let interior = self.needs_interior();
        self.pages.pages().iter().filter(move |p| match p.role {
            PageRole::Content => interior,
            PageRole::FrontCover | PageRole::BackCover => covers,
            PageRole::BlankFiller => false,
        })
    }
}

pub trait ValidationRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn check(&self, ctx: &ValidationContext<'_>) -> Vec<Violation>;
}

/// Content indices contiguous, covers present, no index used twice
pub struct PageSequenceRule;

impl ValidationRule for PageSequenceRule {
    fn name(&self) -> &'static str {
        "page_sequence"
    }

    fn check(&self, ctx: &ValidationContext<'_>) -> Vec<Violation> {
        let mut violations = vec![];

        let mut by_index: BTreeMap<usize, usize> = BTreeMap::new();
        for page in ctx.pages.pages().iter().filter(|p| p.role != PageRole::BlankFiller) {
            *by_index.entry(page.index).or_default() += 1;
        }
        for (&index, &count) in by_index.iter().filter(|(_, c)| **c > 1) {
            violations.push(Violation::new(
                ViolationKind::DuplicatePage,
                Some(index),
                format!("{} pages", count),
                "1 page",
                format!("page index {} is used more than once", index),
            ));
        }

        if ctx.needs_interior() {
            let content = ctx.pages.content();
            if content.is_empty() {
                violations.push(Violation::new(
                    ViolationKind::MissingPage,
                    None,
                    "0 content pages",
                    "at least 1",
                    "the book has no content pages",
                ));
            }
            for pair in content.windows(2) {
                for missing in pair[0].index + 1..pair[1].index {
                    violations.push(Violation::new(
                        ViolationKind::MissingPage,
                        Some(missing),
                        format!("gap between {} and {}", pair[0].index, pair[1].index),
                        "contiguous content indices",
                        format!("content page {} is missing", missing),
                    ));
                }
            }
        }

        if ctx.needs_covers() {
            for role in [PageRole::FrontCover, PageRole::BackCover] {
                let found = ctx.pages.pages().iter().filter(|p| p.role == role).count();
                match found {
                    0 => violations.push(Violation::new(
                        ViolationKind::MissingPage,
                        None,
                        format!("0 {} pages", role),
                        format!("1 {} page", role),
                        format!("{} is missing", role),
                    )),
                    1 => {}
                    n => violations.push(Violation::new(
                        ViolationKind::DuplicatePage,
                        None,
                        format!("{} {} pages", n, role),
                        format!("1 {} page", role),
                        format!("{} is supplied more than once", role),
                    )),
                }
            }
        }

        violations
    }
}

/// Planned interior count against the paper's limits
pub struct PageCountRule;

impl ValidationRule for PageCountRule {
    fn name(&self) -> &'static str {
        "page_count"
    }

    fn check(&self, ctx: &ValidationContext<'_>) -> Vec<Violation> {
        let mut violations = vec![];
        let paper = ctx.paper;

        if let Err(AssemblyError::PageCountOutOfRange { page_count, .. }) =
            check_page_count(paper, ctx.plan.total_pages)
        {
            violations.push(Violation::new(
                ViolationKind::PageCountOutOfRange,
                None,
                format!("{} pages", page_count),
                format!("{}..={} pages", paper.min_pages, paper.max_pages),
                format!("too many interior pages for paper type {}", paper.id),
            ));
        }

        if ctx.plan.filler_pages > 0 {
            violations.push(Violation::new(
                ViolationKind::FillerPagesAdded,
                None,
                format!("{} content pages", ctx.plan.real_pages),
                format!("{} pages minimum", paper.min_pages),
                format!("{} blank filler pages will be appended", ctx.plan.filler_pages),
            ));
        }

        let target = ctx.ebook.target_page_count;
        if target > 0 && target != ctx.plan.real_pages {
            violations.push(Violation::new(
                ViolationKind::TargetPageCountMismatch,
                None,
                format!("{} content pages", ctx.plan.real_pages),
                format!("{} content pages", target),
                "content page count differs from the ebook's target",
            ));
        }

        violations
    }
}

/// Pixel size of every page against trim × required DPI
pub struct ResolutionRule;

impl ValidationRule for ResolutionRule {
    fn name(&self) -> &'static str {
        "resolution"
    }

    fn check(&self, ctx: &ValidationContext<'_>) -> Vec<Violation> {
        let (min_w, min_h) = TrimGeometryResolver::new(ctx.policy).minimum_pixels(ctx.trim);

        ctx.checked_pages()
            .filter(|p| p.buffer.width < min_w || p.buffer.height < min_h)
            .map(|p| {
                Violation::new(
                    ViolationKind::ImageResolutionTooLow,
                    Some(p.index),
                    format!("{}x{} px", p.buffer.width, p.buffer.height),
                    format!("{}x{} px minimum", min_w, min_h),
                    format!(
                        "{} page is below {} DPI at {} trim",
                        p.role, ctx.policy.required_dpi, ctx.trim.id
                    ),
                )
            })
            .collect()
    }
}

/// Profiles resolvable and buffers readable as pixels
pub struct ColorModeRule;

impl ValidationRule for ColorModeRule {
    fn name(&self) -> &'static str {
        "color_mode"
    }

    fn check(&self, ctx: &ValidationContext<'_>) -> Vec<Violation> {
        let mut violations = vec![];

        if ctx.needs_interior() && ctx.policy.profile_for_paper(ctx.paper).is_err() {
            violations.push(Violation::new(
                ViolationKind::MissingColorProfile,
                None,
                format!("profile {}", ctx.paper.color_profile_id),
                "a profile present in the policy table",
                format!(
                    "paper type {} references an unknown color profile",
                    ctx.paper.id
                ),
            ));
        }
        if ctx.needs_covers() && ctx.policy.cover_profile().is_err() {
            violations.push(Violation::new(
                ViolationKind::MissingColorProfile,
                None,
                format!("profile {}", ctx.policy.cover_color_profile_id),
                "a profile present in the policy table",
                "the cover color profile is unknown",
            ));
        }

        for page in ctx.checked_pages() {
            if let Some(problem) = page.buffer.layout_problem() {
                violations.push(Violation::new(
                    ViolationKind::InvalidColorMode,
                    Some(page.index),
                    problem,
                    "1, 3 or 4 channels of 8-bit samples",
                    format!("{} page buffer cannot be converted", page.role),
                ));
            }
        }

        violations
    }
}

/// Barcode payload encodes, when one is given
pub struct BarcodeRule;

impl ValidationRule for BarcodeRule {
    fn name(&self) -> &'static str {
        "barcode"
    }

    fn check(&self, ctx: &ValidationContext<'_>) -> Vec<Violation> {
        let payload: &BarcodePayload = match (&ctx.request.barcode, ctx.needs_covers()) {
            (Some(payload), true) => payload,
            _ => return vec![],
        };
        match Barcode::encode(payload) {
            Ok(_) => vec![],
            Err(e) => vec![Violation::new(
                ViolationKind::InvalidBarcode,
                None,
                payload.isbn.clone(),
                "valid EAN-13 with optional 5-digit add-on",
                e.to_string(),
            )],
        }
    }
}

/// Spine too narrow for legible text
pub struct SpineTextRule;

impl ValidationRule for SpineTextRule {
    fn name(&self) -> &'static str {
        "spine_text"
    }

    fn check(&self, ctx: &ValidationContext<'_>) -> Vec<Violation> {
        if !ctx.needs_covers() {
            return vec![];
        }
        let calc = SpineCalculator::new(ctx.policy);
        match calc.spine_width_for(ctx.paper, ctx.plan.total_pages) {
            Ok(width) if !calc.allows_spine_text(width) => vec![Violation::new(
                ViolationKind::SpineTextOmitted,
                None,
                format!("{:.4} in", width),
                format!("{:.4} in", ctx.policy.spine_text_min_width_in),
                "spine is too narrow for a title; it will be left blank",
            )],
            _ => vec![],
        }
    }
}

/// Runs the fixed rule set in a fixed order
pub struct ValidationEngine<'a> {
    policy: &'a PolicyTable,
    rules: Vec<Box<dyn ValidationRule>>,
}

impl<'a> ValidationEngine<'a> {
    pub fn new(policy: &'a PolicyTable) -> Self {
        Self {
            policy,
            rules: vec![
                Box::new(PageSequenceRule),
                Box::new(PageCountRule),
                Box::new(ResolutionRule),
                Box::new(ColorModeRule),
                Box::new(BarcodeRule),
                Box::new(SpineTextRule),
            ],
        }
    }

    pub fn validate(
        &self,
        ebook: &Ebook,
        pages: &PageSet,
        request: &ExportRequest,
    ) -> Result<ValidationResult> {
        let paper = self.policy.paper_type(&ebook.paper_type_id)?;
        let trim = self.policy.trim_format(&ebook.trim_format_id)?;
        let plan = PageCompletionPlanner::for_paper(paper).plan(pages.content_count());

        let ctx = ValidationContext {
            policy: self.policy,
            ebook,
            paper,
            trim,
            pages,
            request,
            plan,
        };

        let mut violations = vec![];
        for rule in &self.rules {
            let found = rule.check(&ctx);
            if !found.is_empty() {
                log::debug!("rule {} reported {} violation(s)", rule.name(), found.len());
            }
            violations.extend(found);
        }

        let result = ValidationResult::from_violations(violations);
        log::info!(
            "validated {}: {} hard, {} informational",
            ebook.id,
            result.hard().count(),
            result.informational().count()
        );
        Ok(result)
    }
}
