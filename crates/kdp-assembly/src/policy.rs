//! Platform policy table
//!
//! Paper types, trim formats and color profiles are data keyed by id, not
//! types. The table is built once by the caller and handed to every
//! component; nothing here mutates or reloads it.

use crate::constants::*;
use crate::types::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Paper stock and the physical constants that follow from it
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PaperTypeSpec {
    pub id: String,
    pub name: String,
    /// Inches of spine added per interior page
    pub spine_in_per_page: f64,
    pub min_pages: usize,
    pub max_pages: usize,
    /// Print cost per interior page
    pub cost_factor: f64,
    /// Profile interior pages are converted with
    pub color_profile_id: String,
}

/// Finished page size after trimming
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TrimFormat {
    pub id: String,
    pub width_in: f64,
    pub height_in: f64,
}

/// How neutral line-art black is separated into inks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "policy", rename_all = "snake_case"))]
pub enum BlackGeneration {
    /// Black ink only: (0, 0, 0, 100%)
    SingleInk,
    /// Black plus an underlay of the given C/M/Y percentages
    RichBlack { cyan: u8, magenta: u8, yellow: u8 },
}

/// Destination color space of a profile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "space", rename_all = "snake_case"))]
pub enum ColorProfileKind {
    Rgb,
    Gray,
    Cmyk {
        /// Maximum sum of the four inks, in percent
        total_ink_limit: u16,
        black: BlackGeneration,
    },
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ColorProfileSpec {
    pub id: String,
    pub kind: ColorProfileKind,
    #[cfg_attr(feature = "serde", serde(default = "default_neutral_tolerance"))]
    pub neutral_tolerance: u8,
    #[cfg_attr(feature = "serde", serde(default = "default_line_art_threshold"))]
    pub line_art_threshold: u8,
}

#[cfg(feature = "serde")]
fn default_neutral_tolerance() -> u8 {
    DEFAULT_NEUTRAL_TOLERANCE
}

#[cfg(feature = "serde")]
fn default_line_art_threshold() -> u8 {
    DEFAULT_LINE_ART_THRESHOLD
}

impl ColorProfileSpec {
    pub fn new(id: impl Into<String>, kind: ColorProfileKind) -> Self {
        Self {
            id: id.into(),
            kind,
            neutral_tolerance: DEFAULT_NEUTRAL_TOLERANCE,
            line_art_threshold: DEFAULT_LINE_ART_THRESHOLD,
        }
    }
}

/// Barcode box on the back cover
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BarcodeSpec {
    pub width_in: f64,
    pub height_in: f64,
    /// Offset from the bottom trim and the spine-side trim of the back cover
    pub inset_in: f64,
    pub quiet_zone_in: f64,
}

impl Default for BarcodeSpec {
    fn default() -> Self {
        Self {
            width_in: DEFAULT_BARCODE_WIDTH_IN,
            height_in: DEFAULT_BARCODE_HEIGHT_IN,
            inset_in: DEFAULT_BARCODE_INSET_IN,
            quiet_zone_in: DEFAULT_BARCODE_QUIET_ZONE_IN,
        }
    }
}

/// Immutable platform constants
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PolicyTable {
    pub bleed_in: f64,
    pub required_dpi: u32,
    pub safety_margin_in: f64,
    pub spine_precision_decimals: u32,
    pub spine_text_min_width_in: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub barcode: BarcodeSpec,
    pub fixed_cost_per_book: f64,
    /// Profile the flattened cover is converted with
    pub cover_color_profile_id: String,
    pub paper_types: Vec<PaperTypeSpec>,
    pub trim_formats: Vec<TrimFormat>,
    pub color_profiles: Vec<ColorProfileSpec>,
}

impl PolicyTable {
    /// Built-in print-on-demand paperback constants
    pub fn kdp_default() -> Self {
        let paper = |id: &str, name: &str, spine: f64, min, max, cost, profile: &str| {
            PaperTypeSpec {
                id: id.to_string(),
                name: name.to_string(),
                spine_in_per_page: spine,
                min_pages: min,
                max_pages: max,
                cost_factor: cost,
                color_profile_id: profile.to_string(),
            }
        };
        let trim = |id: &str, width_in, height_in| TrimFormat {
            id: id.to_string(),
            width_in,
            height_in,
        };

        Self {
            bleed_in: DEFAULT_BLEED_IN,
            required_dpi: DEFAULT_REQUIRED_DPI,
            safety_margin_in: DEFAULT_SAFETY_MARGIN_IN,
            spine_precision_decimals: DEFAULT_SPINE_PRECISION,
            spine_text_min_width_in: DEFAULT_SPINE_TEXT_MIN_WIDTH_IN,
            barcode: BarcodeSpec::default(),
            fixed_cost_per_book: 1.00,
            cover_color_profile_id: "cmyk-cover".to_string(),
            paper_types: vec![
                paper("white", "Black ink, white paper", 0.002252, 24, 828, 0.012, "gray-interior"),
                paper("cream", "Black ink, cream paper", 0.0025, 24, 776, 0.012, "gray-interior"),
                paper("standard-color", "Standard color, white paper", 0.002252, 72, 600, 0.0255, "cmyk-interior"),
                paper("premium-color", "Premium color, white paper", 0.002347, 24, 828, 0.07, "cmyk-interior"),
            ],
            trim_formats: vec![
                trim("5x8", 5.0, 8.0),
                trim("5.5x8.5", 5.5, 8.5),
                trim("6x9", 6.0, 9.0),
                trim("7x10", 7.0, 10.0),
                trim("8x10", 8.0, 10.0),
                trim("8.25x8.25", 8.25, 8.25),
                trim("8.5x8.5", 8.5, 8.5),
                trim("8.5x11", 8.5, 11.0),
            ],
            color_profiles: vec![
                ColorProfileSpec::new("srgb", ColorProfileKind::Rgb),
                ColorProfileSpec::new("gray-interior", ColorProfileKind::Gray),
                ColorProfileSpec::new(
                    "cmyk-interior",
                    ColorProfileKind::Cmyk {
                        total_ink_limit: 300,
                        black: BlackGeneration::SingleInk,
                    },
                ),
                ColorProfileSpec::new(
                    "cmyk-cover",
                    ColorProfileKind::Cmyk {
                        total_ink_limit: 300,
                        black: BlackGeneration::RichBlack {
                            cyan: 60,
                            magenta: 40,
                            yellow: 40,
                        },
                    },
                ),
            ],
        }
    }

    /// Same table at a different print resolution
    pub fn with_required_dpi(mut self, dpi: u32) -> Self {
        self.required_dpi = dpi;
        self
    }

    pub fn paper_type(&self, id: &str) -> Result<&PaperTypeSpec> {
        self.paper_types
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| AssemblyError::UnknownPaperType(id.to_string()))
    }

    pub fn trim_format(&self, id: &str) -> Result<&TrimFormat> {
        self.trim_formats
            .iter()
            .find(|t| t.id == id)
            .ok_or_else(|| AssemblyError::UnknownTrimFormat(id.to_string()))
    }

    pub fn color_profile(&self, id: &str) -> Option<&ColorProfileSpec> {
        self.color_profiles.iter().find(|c| c.id == id)
    }

    /// The interior profile named by a paper type
    pub fn profile_for_paper(&self, paper: &PaperTypeSpec) -> Result<&ColorProfileSpec> {
        self.color_profile(&paper.color_profile_id)
            .ok_or_else(|| AssemblyError::MissingColorProfile {
                paper_type: paper.id.clone(),
                profile_id: paper.color_profile_id.clone(),
            })
    }

    pub fn cover_profile(&self) -> Result<&ColorProfileSpec> {
        self.color_profile(&self.cover_color_profile_id)
            .ok_or_else(|| AssemblyError::MissingColorProfile {
                paper_type: "cover".to_string(),
                profile_id: self.cover_color_profile_id.clone(),
            })
    }

    /// Reject structurally broken tables.
    ///
    /// Dangling color profile ids are not checked here; they surface as
    /// `MissingColorProfile` when a book on that paper is validated.
    pub fn validate(&self) -> Result<()> {
        if self.required_dpi == 0 {
            return Err(AssemblyError::InvalidPolicy(
                "required_dpi must be positive".to_string(),
            ));
        }
        if self.bleed_in < 0.0 || self.safety_margin_in < 0.0 {
            return Err(AssemblyError::InvalidPolicy(
                "bleed and safety margin cannot be negative".to_string(),
            ));
        }
        let barcode = &self.barcode;
        if barcode.width_in <= 2.0 * barcode.quiet_zone_in
            || barcode.height_in <= 2.0 * barcode.quiet_zone_in
        {
            return Err(AssemblyError::InvalidPolicy(
                "barcode box leaves no room inside its quiet zone".to_string(),
            ));
        }

        for (i, paper) in self.paper_types.iter().enumerate() {
            if paper.spine_in_per_page <= 0.0 {
                return Err(AssemblyError::InvalidPolicy(format!(
                    "paper type {} has a non-positive spine formula",
                    paper.id
                )));
            }
            if paper.min_pages == 0 || paper.min_pages > paper.max_pages {
                return Err(AssemblyError::InvalidPolicy(format!(
                    "paper type {} has page range [{}, {}]",
                    paper.id, paper.min_pages, paper.max_pages
                )));
            }
            if self.paper_types[..i].iter().any(|p| p.id == paper.id) {
                return Err(AssemblyError::InvalidPolicy(format!(
                    "duplicate paper type {}",
                    paper.id
                )));
            }
        }

        for (i, trim) in self.trim_formats.iter().enumerate() {
            if trim.width_in <= 0.0 || trim.height_in <= 0.0 {
                return Err(AssemblyError::InvalidPolicy(format!(
                    "trim format {} has a non-positive dimension",
                    trim.id
                )));
            }
            if self.trim_formats[..i].iter().any(|t| t.id == trim.id) {
                return Err(AssemblyError::InvalidPolicy(format!(
                    "duplicate trim format {}",
                    trim.id
                )));
            }
        }

        for (i, profile) in self.color_profiles.iter().enumerate() {
            if let ColorProfileKind::Cmyk {
                total_ink_limit, ..
            } = profile.kind
            {
                if !(100..=400).contains(&total_ink_limit) {
                    return Err(AssemblyError::InvalidPolicy(format!(
                        "color profile {} has ink limit {}%",
                        profile.id, total_ink_limit
                    )));
                }
            }
            if self.color_profiles[..i].iter().any(|c| c.id == profile.id) {
                return Err(AssemblyError::InvalidPolicy(format!(
                    "duplicate color profile {}",
                    profile.id
                )));
            }
        }

        Ok(())
    }

    /// Parse and validate a JSON policy table
    #[cfg(feature = "serde")]
    pub fn from_json_str(json: &str) -> Result<Self> {
        let table: PolicyTable = serde_json::from_str(json)?;
        table.validate()?;
        Ok(table)
    }

    /// Load policy from JSON file
    #[cfg(feature = "serde")]
    pub async fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let table: PolicyTable = serde_json::from_slice(&bytes)?;
        table.validate()?;
        Ok(table)
    }

    /// Save policy to JSON file
    #[cfg(feature = "serde")]
    pub async fn save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self::kdp_default()
    }
}
