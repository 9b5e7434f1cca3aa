//! Flattened wraparound cover: back panel, spine, front panel
//!
//! The art, spine fill and barcode are composited into one raster at the
//! policy's required DPI. Title and spine text stay vector, drawn over it.

use super::overlay::{guide_ops, spine_text_ops, title_ops};
use super::pdf::{PageSpec, PdfBuilder};
use crate::barcode::Barcode;
use crate::color::{ColorProfileConverter, PrintImage};
use crate::geometry::{CoverGeometry, PixelRect, SpineCalculator};
use crate::policy::PolicyTable;
use crate::types::*;
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};

/// What fills the spine panel
#[derive(Debug, Clone, PartialEq)]
pub enum SpineFill {
    /// Solid RGB color
    Flat([u8; 3]),
    /// Image tiled from the panel's top left
    Texture(PixelBuffer),
}

impl Default for SpineFill {
    fn default() -> Self {
        SpineFill::Flat([255, 255, 255])
    }
}

/// Everything placed on the cover besides the geometry
pub struct CoverInputs<'a> {
    pub front: &'a PixelBuffer,
    pub back: &'a PixelBuffer,
    pub spine_fill: &'a SpineFill,
    pub title: &'a str,
    pub barcode: Option<&'a Barcode>,
    pub guides: bool,
}

pub struct CoverAssembler<'a> {
    policy: &'a PolicyTable,
    geometry: &'a CoverGeometry,
}

impl<'a> CoverAssembler<'a> {
    pub fn new(policy: &'a PolicyTable, geometry: &'a CoverGeometry) -> Self {
        Self { policy, geometry }
    }

    pub fn dpi(&self) -> u32 {
        self.policy.required_dpi
    }

    pub fn spine_text_allowed(&self) -> bool {
        SpineCalculator::new(self.policy).allows_spine_text(self.geometry.spine_width_in)
    }

    /// Composite every raster element into one RGB canvas
    pub fn compose(&self, inputs: &CoverInputs<'_>) -> Result<RgbImage> {
        let dpi = self.dpi();
        let geometry = self.geometry;
        let (width, height) = geometry.canvas_pixels(dpi);
        let mut canvas = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));

        let back = inputs.back.to_rgb_image()?;
        paste_filled(&mut canvas, &back, geometry.back_panel.to_pixels(dpi));

        let front = inputs.front.to_rgb_image()?;
        paste_filled(&mut canvas, &front, geometry.front_panel.to_pixels(dpi));

        let spine = geometry.spine_panel.to_pixels(dpi);
        match inputs.spine_fill {
            SpineFill::Flat(rgb) => fill_rect(&mut canvas, spine, Rgb(*rgb)),
            SpineFill::Texture(texture) => {
                let texture = texture.to_rgb_image()?;
                tile_rect(&mut canvas, &texture, spine);
            }
        }

        if let Some(barcode) = inputs.barcode {
            let zone = geometry.zones.barcode;
            fill_rect(&mut canvas, zone.to_pixels(dpi), Rgb([255, 255, 255]));
            let bars = zone.inset(self.policy.barcode.quiet_zone_in).to_pixels(dpi);
            if bars.width > 0 && bars.height > 0 {
                let rendered = barcode.render(bars.width, bars.height);
                imageops::replace(&mut canvas, &rendered, bars.x as i64, bars.y as i64);
            }
        }

        Ok(canvas)
    }

    /// Flattened cover converted with the cover profile
    pub fn render(&self, inputs: &CoverInputs<'_>) -> Result<PrintImage> {
        let canvas = self.compose(inputs)?;
        let converter = ColorProfileConverter::for_cover(self.policy)?;
        Ok(converter.convert_rgb(&canvas, self.dpi()))
    }

    /// Text and guides drawn over the flattened cover
    pub fn overlay(&self, inputs: &CoverInputs<'_>, image: &PrintImage) -> String {
        let geometry = self.geometry;
        let height = geometry.canvas_height_in;

        let mut ops = title_ops(inputs.title, &geometry.front_safe_area(), height, image.space);
        if self.spine_text_allowed() {
            ops.push_str(&spine_text_ops(
                inputs.title,
                &geometry.zones.spine_text,
                height,
                image.space,
            ));
        } else {
            log::warn!(
                "spine is {:.4} in wide; spine text omitted",
                geometry.spine_width_in
            );
        }
        if inputs.guides {
            ops.push_str(&guide_ops(
                &[
                    geometry.zones.trim_line,
                    geometry.zones.safe_interior,
                    geometry.spine_panel,
                    geometry.zones.barcode,
                ],
                height,
            ));
        }
        ops
    }

    /// Single-page PDF sized exactly to the cover canvas
    pub fn assemble(&self, inputs: &CoverInputs<'_>) -> Result<Vec<u8>> {
        let image = self.render(inputs)?;
        self.assemble_rendered(inputs, &image)
    }

    pub(crate) fn assemble_rendered(
        &self,
        inputs: &CoverInputs<'_>,
        image: &PrintImage,
    ) -> Result<Vec<u8>> {
        let overlay = self.overlay(inputs, image);
        let mut pdf = PdfBuilder::new();
        let image_id = pdf.add_image(image);
        pdf.add_page(&PageSpec {
            width_in: self.geometry.canvas_width_in,
            height_in: self.geometry.canvas_height_in,
            trim: Some(self.geometry.zones.trim_line),
            image: image_id,
            overlay: &overlay,
        });
        pdf.finish()
    }
}

/// Scale `src` to cover `rect`, center-crop and paste
fn paste_filled(canvas: &mut RgbImage, src: &RgbImage, rect: PixelRect) {
    if rect.width == 0 || rect.height == 0 {
        return;
    }
    let fitted = fill_to(src, rect.width, rect.height);
    imageops::replace(canvas, &fitted, rect.x as i64, rect.y as i64);
}

fn fill_to(src: &RgbImage, width: u32, height: u32) -> RgbImage {
    let (sw, sh) = src.dimensions();
    if (sw, sh) == (width, height) {
        return src.clone();
    }

    let scale = (width as f64 / sw as f64).max(height as f64 / sh as f64);
    let scaled_w = ((sw as f64 * scale).ceil() as u32).max(width);
    let scaled_h = ((sh as f64 * scale).ceil() as u32).max(height);
    let scaled = imageops::resize(src, scaled_w, scaled_h, FilterType::Triangle);

    let x = (scaled_w - width) / 2;
    let y = (scaled_h - height) / 2;
    imageops::crop_imm(&scaled, x, y, width, height).to_image()
}

fn fill_rect(canvas: &mut RgbImage, rect: PixelRect, color: Rgb<u8>) {
    let x1 = (rect.x + rect.width).min(canvas.width());
    let y1 = (rect.y + rect.height).min(canvas.height());
    for y in rect.y..y1 {
        for x in rect.x..x1 {
            canvas.put_pixel(x, y, color);
        }
    }
}

fn tile_rect(canvas: &mut RgbImage, texture: &RgbImage, rect: PixelRect) {
    let (tw, th) = texture.dimensions();
    let x1 = (rect.x + rect.width).min(canvas.width());
    let y1 = (rect.y + rect.height).min(canvas.height());
    for y in rect.y..y1 {
        for x in rect.x..x1 {
            let px = *texture.get_pixel((x - rect.x) % tw, (y - rect.y) % th);
            canvas.put_pixel(x, y, px);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::barcode::BarcodePayload;
    use crate::geometry::TrimGeometryResolver;

    const DPI: u32 = 20;

    fn setup() -> (PolicyTable, CoverGeometry) {
        let policy = PolicyTable::kdp_default().with_required_dpi(DPI);
        let trim = policy.trim_format("8.5x8.5").unwrap().clone();
        let geometry = TrimGeometryResolver::new(&policy).cover(&trim, 0.5);
        (policy, geometry)
    }

    #[test]
    fn panels_land_where_geometry_says() {
        let (policy, geometry) = setup();
        let front = PixelBuffer::solid_rgb(170, 170, DPI, [255, 0, 0]);
        let back = PixelBuffer::solid_rgb(170, 170, DPI, [0, 0, 255]);
        let fill = SpineFill::Flat([0, 255, 0]);
        let inputs = CoverInputs {
            front: &front,
            back: &back,
            spine_fill: &fill,
            title: "",
            barcode: None,
            guides: false,
        };

        let canvas = CoverAssembler::new(&policy, &geometry).compose(&inputs).unwrap();
        assert_eq!(canvas.dimensions(), geometry.canvas_pixels(DPI));

        let mid_y = canvas.height() / 2;
        let back_px = geometry.back_panel.to_pixels(DPI);
        let spine_px = geometry.spine_panel.to_pixels(DPI);
        let front_px = geometry.front_panel.to_pixels(DPI);
        assert_eq!(canvas.get_pixel(back_px.x + 1, mid_y), &Rgb([0, 0, 255]));
        assert_eq!(canvas.get_pixel(spine_px.x + 1, mid_y), &Rgb([0, 255, 0]));
        assert_eq!(canvas.get_pixel(front_px.x + 1, mid_y), &Rgb([255, 0, 0]));
    }

    #[test]
    fn barcode_zone_is_whitened_before_bars() {
        let (policy, geometry) = setup();
        let art = PixelBuffer::solid_rgb(170, 170, DPI, [10, 200, 10]);
        let fill = SpineFill::default();
        let barcode = Barcode::encode(&BarcodePayload {
            isbn: "9780306406157".to_string(),
            price: None,
        })
        .unwrap();
        let inputs = CoverInputs {
            front: &art,
            back: &art,
            spine_fill: &fill,
            title: "",
            barcode: Some(&barcode),
            guides: false,
        };

        let canvas = CoverAssembler::new(&policy, &geometry).compose(&inputs).unwrap();
        let zone = geometry.zones.barcode.to_pixels(DPI);
        // Quiet zone corner stays white
        assert_eq!(canvas.get_pixel(zone.x, zone.y), &Rgb([255, 255, 255]));
    }

    #[test]
    fn texture_tiles_across_the_spine() {
        let (policy, geometry) = setup();
        let art = PixelBuffer::white(170, 170, DPI);
        let texture = PixelBuffer::new(2, 1, DPI, 3, vec![0, 0, 0, 255, 255, 255]);
        let fill = SpineFill::Texture(texture);
        let inputs = CoverInputs {
            front: &art,
            back: &art,
            spine_fill: &fill,
            title: "",
            barcode: None,
            guides: false,
        };

        let canvas = CoverAssembler::new(&policy, &geometry).compose(&inputs).unwrap();
        let spine = geometry.spine_panel.to_pixels(DPI);
        assert_eq!(canvas.get_pixel(spine.x, 5), &Rgb([0, 0, 0]));
        assert_eq!(canvas.get_pixel(spine.x + 1, 5), &Rgb([255, 255, 255]));
        assert_eq!(canvas.get_pixel(spine.x + 2, 5), &Rgb([0, 0, 0]));
    }

    #[test]
    fn fill_to_center_crops() {
        let wide = RgbImage::from_pixel(40, 10, Rgb([1, 2, 3]));
        let fitted = fill_to(&wide, 10, 10);
        assert_eq!(fitted.dimensions(), (10, 10));
    }
}
