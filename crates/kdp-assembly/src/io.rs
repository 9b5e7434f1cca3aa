//! File I/O for hosts and the CLI
//!
//! The assembly pipeline itself never touches the filesystem; these helpers
//! load inputs and persist outputs around it.

use crate::types::*;
use chrono::{DateTime, Utc};
use image::{ColorType, DynamicImage};
use std::path::{Path, PathBuf};

/// Write an artifact's bytes to disk
pub async fn save_artifact(artifact: &ExportArtifact, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    tokio::fs::write(path, &artifact.bytes).await?;
    log::info!(
        "wrote {} ({} bytes) to {}",
        artifact.kind,
        artifact.bytes.len(),
        path.display()
    );
    Ok(())
}

/// Decode a PNG or JPEG into a page buffer, keeping gray and alpha channels
pub fn decode_image_file(path: impl AsRef<Path>, dpi: u32) -> Result<PixelBuffer> {
    let image = image::open(path.as_ref())?;
    Ok(buffer_from_image(image, dpi))
}

fn buffer_from_image(image: DynamicImage, dpi: u32) -> PixelBuffer {
    let (width, height) = (image.width(), image.height());
    match image.color() {
        ColorType::L8 | ColorType::L16 => {
            PixelBuffer::new(width, height, dpi, 1, image.into_luma8().into_raw())
        }
        color if color.has_alpha() => {
            PixelBuffer::new(width, height, dpi, 4, image.into_rgba8().into_raw())
        }
        _ => PixelBuffer::from_rgb_image(image.into_rgb8(), dpi),
    }
}

/// One row of a page manifest
#[derive(Debug, Clone, PartialEq)]
struct ManifestRow {
    index: usize,
    role: PageRole,
    path: PathBuf,
    seed: u64,
    dpi: Option<u32>,
}

/// Load a page set from a CSV manifest with columns
/// `index,role,path,seed[,dpi]`. Image paths are relative to the manifest.
pub async fn load_page_manifest(path: impl AsRef<Path>, default_dpi: u32) -> Result<PageSet> {
    let path = path.as_ref().to_owned();
    let bytes = tokio::fs::read(&path).await?;
    let base = path.parent().map(Path::to_path_buf).unwrap_or_default();

    tokio::task::spawn_blocking(move || {
        let rows = parse_manifest(&bytes)?;
        let mut pages = Vec::with_capacity(rows.len());
        for row in rows {
            let image_path = base.join(&row.path);
            let buffer = decode_image_file(&image_path, row.dpi.unwrap_or(default_dpi))?;
            let regenerated_at: DateTime<Utc> = std::fs::metadata(&image_path)
                .and_then(|m| m.modified())
                .map(DateTime::from)
                .unwrap_or_default();
            log::debug!(
                "page {} ({}) from {}",
                row.index,
                row.role,
                image_path.display()
            );
            pages.push(ImagePage {
                index: row.index,
                role: row.role,
                buffer,
                seed: row.seed,
                regenerated_at,
            });
        }
        Ok::<_, AssemblyError>(PageSet::new(pages))
    })
    .await?
}

fn parse_manifest(bytes: &[u8]) -> Result<Vec<ManifestRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        let field = |i: usize, name: &str| {
            record.get(i).filter(|s| !s.is_empty()).ok_or_else(|| {
                AssemblyError::Assembly(format!("manifest row {}: missing {}", line + 1, name))
            })
        };
        let bad = |name: &str, value: &str| {
            AssemblyError::Assembly(format!(
                "manifest row {}: invalid {} '{}'",
                line + 1,
                name,
                value
            ))
        };

        let index = field(0, "index")?;
        let role = field(1, "role")?;
        let image = field(2, "path")?;
        let seed = field(3, "seed")?;
        let dpi = record.get(4).filter(|s| !s.is_empty());

        rows.push(ManifestRow {
            index: index.parse().map_err(|_| bad("index", index))?,
            role: role.parse().map_err(|_| bad("role", role))?,
            path: PathBuf::from(image),
            seed: seed.parse().map_err(|_| bad("seed", seed))?,
            dpi: dpi
                .map(|d| d.parse().map_err(|_| bad("dpi", d)))
                .transpose()?,
        });
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgba, RgbaImage};

    #[test]
    fn parses_rows_with_optional_dpi() {
        let csv = b"index,role,path,seed,dpi\n0,front-cover,front.png,7,\n1,CONTENT,p1.png,8,150\n";
        let rows = parse_manifest(csv).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].role, PageRole::FrontCover);
        assert_eq!(rows[0].dpi, None);
        assert_eq!(rows[1].index, 1);
        assert_eq!(rows[1].dpi, Some(150));
    }

    #[test]
    fn reports_the_bad_row() {
        let csv = b"index,role,path,seed\n0,CONTENT,a.png,1\n1,SPINE,b.png,2\n";
        let err = parse_manifest(csv).unwrap_err();
        assert!(err.to_string().contains("row 2"));
        assert!(err.to_string().contains("SPINE"));
    }

    #[test]
    fn keeps_gray_and_alpha_layouts() {
        let gray = DynamicImage::ImageLuma8(GrayImage::from_pixel(2, 2, Luma([9])));
        assert_eq!(buffer_from_image(gray, 300).channels, 1);

        let rgba = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([1, 2, 3, 4])));
        let buffer = buffer_from_image(rgba, 300);
        assert_eq!(buffer.channels, 4);
        assert_eq!(buffer.data.len(), 16);
    }

    #[tokio::test]
    async fn loads_manifest_next_to_images() {
        let dir = tempfile::tempdir().unwrap();
        GrayImage::from_pixel(4, 3, Luma([200]))
            .save(dir.path().join("p0.png"))
            .unwrap();
        std::fs::write(
            dir.path().join("pages.csv"),
            "index,role,path,seed\n0,CONTENT,p0.png,42\n",
        )
        .unwrap();

        let pages = load_page_manifest(dir.path().join("pages.csv"), 72)
            .await
            .unwrap();
        let page = &pages.pages()[0];
        assert_eq!(page.seed, 42);
        assert_eq!((page.buffer.width, page.buffer.height), (4, 3));
        assert_eq!(page.buffer.dpi, 72);
    }
}
