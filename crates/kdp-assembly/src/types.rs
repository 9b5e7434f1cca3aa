use crate::lifecycle::{EbookStatus, LifecycleViolation};
use chrono::{DateTime, Utc};
use image::RgbImage;
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssemblyError {
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[cfg(feature = "serde")]
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
    #[error("Unknown paper type: {0}")]
    UnknownPaperType(String),
    #[error("Unknown trim format: {0}")]
    UnknownTrimFormat(String),
    #[error("Invalid policy: {0}")]
    InvalidPolicy(String),
    #[error(
        "Page count {page_count} outside [{min_pages}, {max_pages}] for paper type {paper_type}"
    )]
    PageCountOutOfRange {
        paper_type: String,
        page_count: usize,
        min_pages: usize,
        max_pages: usize,
    },
    #[error("Paper type {paper_type} references missing color profile {profile_id}")]
    MissingColorProfile {
        paper_type: String,
        profile_id: String,
    },
    #[error("Unsupported pixel layout: {0}")]
    InvalidColorMode(String),
    #[error(transparent)]
    Lifecycle(#[from] LifecycleViolation),
    #[error("No page matches {0}")]
    PageNotFound(PageSelector),
    #[error("Assembly failed: {0}")]
    Assembly(String),
}

pub type Result<T> = std::result::Result<T, AssemblyError>;

/// Identity of an ebook, as assigned by the editorial workflow
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct EbookId(pub String);

impl EbookId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EbookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Book metadata owned by the editorial workflow
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Ebook {
    pub id: EbookId,
    pub title: String,
    pub trim_format_id: String,
    pub paper_type_id: String,
    pub target_page_count: usize,
    pub status: EbookStatus,
}

/// Where a page sits in the finished book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum PageRole {
    FrontCover,
    Content,
    BackCover,
    BlankFiller,
}

impl PageRole {
    pub fn name(self) -> &'static str {
        match self {
            PageRole::FrontCover => "FRONT_COVER",
            PageRole::Content => "CONTENT",
            PageRole::BackCover => "BACK_COVER",
            PageRole::BlankFiller => "BLANK_FILLER",
        }
    }

    pub fn is_cover(self) -> bool {
        matches!(self, PageRole::FrontCover | PageRole::BackCover)
    }
}

impl fmt::Display for PageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for PageRole {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "FRONT_COVER" => Ok(PageRole::FrontCover),
            "CONTENT" => Ok(PageRole::Content),
            "BACK_COVER" => Ok(PageRole::BackCover),
            "BLANK_FILLER" => Ok(PageRole::BlankFiller),
            other => Err(format!("unknown page role '{}'", other)),
        }
    }
}

/// Raw pixels of a page image as delivered by the generation pipeline.
///
/// `channels` is taken at face value: 1 = gray, 3 = RGB, 4 = RGBA.
/// Anything else is rejected when the buffer is converted.
#[derive(Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    pub width: u32,
    pub height: u32,
    pub dpi: u32,
    pub channels: u8,
    pub data: Vec<u8>,
}

impl fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("dpi", &self.dpi)
            .field("channels", &self.channels)
            .field("bytes", &self.data.len())
            .finish()
    }
}

impl PixelBuffer {
    pub fn new(width: u32, height: u32, dpi: u32, channels: u8, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            dpi,
            channels,
            data,
        }
    }

    /// A buffer filled with a single RGB color
    pub fn solid_rgb(width: u32, height: u32, dpi: u32, rgb: [u8; 3]) -> Self {
        let pixels = width as usize * height as usize;
        let mut data = Vec::with_capacity(pixels * 3);
        for _ in 0..pixels {
            data.extend_from_slice(&rgb);
        }
        Self::new(width, height, dpi, 3, data)
    }

    pub fn white(width: u32, height: u32, dpi: u32) -> Self {
        Self::solid_rgb(width, height, dpi, [255, 255, 255])
    }

    pub fn from_rgb_image(image: RgbImage, dpi: u32) -> Self {
        let (width, height) = image.dimensions();
        Self::new(width, height, dpi, 3, image.into_raw())
    }

    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * self.channels as usize
    }

    /// Describe why this buffer cannot be read as pixels, if it cannot
    pub fn layout_problem(&self) -> Option<String> {
        if !matches!(self.channels, 1 | 3 | 4) {
            return Some(format!("{} channels per pixel", self.channels));
        }
        if self.width == 0 || self.height == 0 {
            return Some(format!("empty {}x{} buffer", self.width, self.height));
        }
        if self.data.len() != self.expected_len() {
            return Some(format!(
                "{} bytes for {}x{}x{} pixels",
                self.data.len(),
                self.width,
                self.height,
                self.channels
            ));
        }
        None
    }

    /// Expand to 8-bit RGB. RGBA is composited over white.
    pub fn to_rgb_image(&self) -> Result<RgbImage> {
        if let Some(problem) = self.layout_problem() {
            return Err(AssemblyError::InvalidColorMode(problem));
        }

        let pixels = self.width as usize * self.height as usize;
        let mut rgb = Vec::with_capacity(pixels * 3);
        match self.channels {
            1 => {
                for &v in &self.data {
                    rgb.extend_from_slice(&[v, v, v]);
                }
            }
            3 => rgb.extend_from_slice(&self.data),
            _ => {
                for px in self.data.chunks_exact(4) {
                    let alpha = px[3] as u32;
                    for &c in &px[..3] {
                        let blended = (c as u32 * alpha + 255 * (255 - alpha) + 127) / 255;
                        rgb.push(blended as u8);
                    }
                }
            }
        }

        RgbImage::from_raw(self.width, self.height, rgb).ok_or_else(|| {
            AssemblyError::Assembly(format!(
                "RGB expansion produced a short buffer for {}x{}",
                self.width, self.height
            ))
        })
    }
}

/// One generated page of an ebook
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePage {
    pub index: usize,
    pub role: PageRole,
    pub buffer: PixelBuffer,
    pub seed: u64,
    pub regenerated_at: DateTime<Utc>,
}

/// Addresses a single page for replacement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSelector {
    Index(usize),
    Role(PageRole),
}

impl fmt::Display for PageSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageSelector::Index(index) => write!(f, "page index {}", index),
            PageSelector::Role(role) => write!(f, "role {}", role),
        }
    }
}

/// All pages belonging to one ebook
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageSet {
    pages: Vec<ImagePage>,
}

impl PageSet {
    pub fn new(pages: Vec<ImagePage>) -> Self {
        Self { pages }
    }

    pub fn pages(&self) -> &[ImagePage] {
        &self.pages
    }

    pub fn front_cover(&self) -> Option<&ImagePage> {
        self.pages.iter().find(|p| p.role == PageRole::FrontCover)
    }

    pub fn back_cover(&self) -> Option<&ImagePage> {
        self.pages.iter().find(|p| p.role == PageRole::BackCover)
    }

    /// Content pages in ascending index order. Supplied fillers are not content.
    pub fn content(&self) -> Vec<&ImagePage> {
        let mut content: Vec<&ImagePage> = self
            .pages
            .iter()
            .filter(|p| p.role == PageRole::Content)
            .collect();
        content.sort_by_key(|p| p.index);
        content
    }

    pub fn content_count(&self) -> usize {
        self.pages
            .iter()
            .filter(|p| p.role == PageRole::Content)
            .count()
    }

    fn position(&self, selector: PageSelector) -> Option<usize> {
        match selector {
            PageSelector::Index(index) => self.pages.iter().position(|p| p.index == index),
            PageSelector::Role(role) => {
                let mut matches = self
                    .pages
                    .iter()
                    .enumerate()
                    .filter(|(_, p)| p.role == role)
                    .map(|(pos, _)| pos);
                match (matches.next(), matches.next()) {
                    (Some(pos), None) => Some(pos),
                    _ => None,
                }
            }
        }
    }

    pub fn find(&self, selector: PageSelector) -> Option<&ImagePage> {
        self.position(selector).map(|pos| &self.pages[pos])
    }

    /// Swap in a new buffer for exactly one page. Every other page is left as is.
    pub fn replace(
        &mut self,
        selector: PageSelector,
        buffer: PixelBuffer,
        regenerated_at: DateTime<Utc>,
    ) -> Result<&ImagePage> {
        let pos = self
            .position(selector)
            .ok_or(AssemblyError::PageNotFound(selector))?;
        let page = &mut self.pages[pos];
        page.buffer = buffer;
        page.regenerated_at = regenerated_at;
        Ok(page)
    }

    /// Content-addressed identity of the ebook metadata plus every page.
    pub fn snapshot_id(&self, ebook: &Ebook) -> String {
        let mut hasher = Sha256::new();
        for field in [
            ebook.id.as_str(),
            ebook.title.as_str(),
            ebook.trim_format_id.as_str(),
            ebook.paper_type_id.as_str(),
        ] {
            hasher.update((field.len() as u64).to_le_bytes());
            hasher.update(field.as_bytes());
        }

        let mut ordered: Vec<&ImagePage> = self.pages.iter().collect();
        ordered.sort_by_key(|p| (p.index, p.role));
        for page in ordered {
            hasher.update((page.index as u64).to_le_bytes());
            hasher.update(page.role.name().as_bytes());
            hasher.update(page.seed.to_le_bytes());
            hasher.update(page.buffer.width.to_le_bytes());
            hasher.update(page.buffer.height.to_le_bytes());
            hasher.update(page.buffer.dpi.to_le_bytes());
            hasher.update([page.buffer.channels]);
            hasher.update((page.buffer.data.len() as u64).to_le_bytes());
            hasher.update(&page.buffer.data);
        }

        hex_digest(hasher.finalize().as_slice())
    }
}

pub(crate) fn hex_digest(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Artifact families produced by an export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum ArtifactKind {
    FullBook,
    InteriorManuscript,
    CoverOnly,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 3] = [
        ArtifactKind::FullBook,
        ArtifactKind::InteriorManuscript,
        ArtifactKind::CoverOnly,
    ];

    /// Artifacts whose content includes a page of the given role
    pub fn affected_by(role: PageRole) -> &'static [ArtifactKind] {
        match role {
            PageRole::Content | PageRole::BlankFiller => {
                &[ArtifactKind::FullBook, ArtifactKind::InteriorManuscript]
            }
            PageRole::FrontCover | PageRole::BackCover => {
                &[ArtifactKind::FullBook, ArtifactKind::CoverOnly]
            }
        }
    }

    pub fn file_stem(self) -> &'static str {
        match self {
            ArtifactKind::FullBook => "full-book",
            ArtifactKind::InteriorManuscript => "interior",
            ArtifactKind::CoverOnly => "cover",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArtifactKind::FullBook => "FULL_BOOK",
            ArtifactKind::InteriorManuscript => "INTERIOR_MANUSCRIPT",
            ArtifactKind::CoverOnly => "COVER_ONLY",
        };
        f.write_str(name)
    }
}

/// A print-ready PDF produced from one snapshot of an ebook
#[derive(Debug, Clone, PartialEq)]
pub struct ExportArtifact {
    pub kind: ArtifactKind,
    pub bytes: Vec<u8>,
    pub generated_at: DateTime<Utc>,
    /// Pages in the document
    pub source_page_count: usize,
    /// See [`PageSet::snapshot_id`]
    pub snapshot: String,
}
