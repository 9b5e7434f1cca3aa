//! Print color conversion
//!
//! Integer-only transforms from 8-bit RGB into the destination space of a
//! color profile. Identical input always yields identical samples.

use crate::policy::{BlackGeneration, ColorProfileKind, ColorProfileSpec, PaperTypeSpec, PolicyTable};
use crate::types::*;
use image::RgbImage;

/// Color space of converted samples, as named in PDF
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrintColorSpace {
    DeviceRgb,
    DeviceGray,
    DeviceCmyk,
}

impl PrintColorSpace {
    pub fn pdf_name(self) -> &'static str {
        match self {
            PrintColorSpace::DeviceRgb => "DeviceRGB",
            PrintColorSpace::DeviceGray => "DeviceGray",
            PrintColorSpace::DeviceCmyk => "DeviceCMYK",
        }
    }

    pub fn components(self) -> usize {
        match self {
            PrintColorSpace::DeviceRgb => 3,
            PrintColorSpace::DeviceGray => 1,
            PrintColorSpace::DeviceCmyk => 4,
        }
    }
}

/// Converted page image ready to embed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintImage {
    pub width: u32,
    pub height: u32,
    /// Carried over unchanged from the source buffer
    pub dpi: u32,
    pub space: PrintColorSpace,
    pub samples: Vec<u8>,
}

/// Applies one color profile to page buffers
#[derive(Debug, Clone, Copy)]
pub struct ColorProfileConverter<'a> {
    profile: &'a ColorProfileSpec,
}

impl<'a> ColorProfileConverter<'a> {
    pub fn new(profile: &'a ColorProfileSpec) -> Self {
        Self { profile }
    }

    /// Converter for a paper type's interior profile
    pub fn for_paper(policy: &'a PolicyTable, paper: &PaperTypeSpec) -> Result<Self> {
        Ok(Self::new(policy.profile_for_paper(paper)?))
    }

    pub fn for_cover(policy: &'a PolicyTable) -> Result<Self> {
        Ok(Self::new(policy.cover_profile()?))
    }

    pub fn profile(&self) -> &ColorProfileSpec {
        self.profile
    }

    pub fn output_space(&self) -> PrintColorSpace {
        match self.profile.kind {
            ColorProfileKind::Rgb => PrintColorSpace::DeviceRgb,
            ColorProfileKind::Gray => PrintColorSpace::DeviceGray,
            ColorProfileKind::Cmyk { .. } => PrintColorSpace::DeviceCmyk,
        }
    }

    pub fn convert(&self, buffer: &PixelBuffer) -> Result<PrintImage> {
        let rgb = buffer.to_rgb_image()?;
        Ok(self.convert_rgb(&rgb, buffer.dpi))
    }

    pub fn convert_rgb(&self, image: &RgbImage, dpi: u32) -> PrintImage {
        let space = self.output_space();
        let mut samples = Vec::with_capacity(image.as_raw().len() / 3 * space.components());

        for px in image.as_raw().chunks_exact(3) {
            let (r, g, b) = (px[0], px[1], px[2]);
            match self.profile.kind {
                ColorProfileKind::Rgb => samples.extend_from_slice(&[r, g, b]),
                ColorProfileKind::Gray => samples.push(luma(r, g, b)),
                ColorProfileKind::Cmyk {
                    total_ink_limit,
                    black,
                } => samples.extend_from_slice(&self.cmyk(r, g, b, total_ink_limit, black)),
            }
        }

        PrintImage {
            width: image.width(),
            height: image.height(),
            dpi,
            space,
            samples,
        }
    }

    /// Separate one RGB pixel. Neutral darks are line art and follow the
    /// profile's black generation; everything else uses full GCR.
    fn cmyk(&self, r: u8, g: u8, b: u8, ink_limit: u16, black: BlackGeneration) -> [u8; 4] {
        let max = r.max(g).max(b) as u32;
        let min = r.min(g).min(b) as u32;

        let [c, m, y, k] = if max - min <= self.profile.neutral_tolerance as u32
            && max <= self.profile.line_art_threshold as u32
        {
            match black {
                BlackGeneration::SingleInk => [0, 0, 0, 255],
                BlackGeneration::RichBlack {
                    cyan,
                    magenta,
                    yellow,
                } => [percent(cyan), percent(magenta), percent(yellow), 255],
            }
        } else {
            let k = 255 - max;
            let ink = |v: u8| ((max - v as u32) * 255 + max / 2) / max;
            [ink(r), ink(g), ink(b), k]
        };

        // Black alone may exceed a sub-100% limit; colour inks share what is left
        let limit = ink_limit as u32 * 255 / 100;
        let k = k.min(limit);
        let (c, m, y) = if c + m + y + k > limit {
            let cmy = c + m + y;
            let room = limit - k;
            (c * room / cmy, m * room / cmy, y * room / cmy)
        } else {
            (c, m, y)
        };

        [clamp(c), clamp(m), clamp(y), clamp(k)]
    }
}

fn luma(r: u8, g: u8, b: u8) -> u8 {
    clamp((299 * r as u32 + 587 * g as u32 + 114 * b as u32 + 500) / 1000)
}

fn percent(p: u8) -> u32 {
    (p.min(100) as u32 * 255 + 50) / 100
}

fn clamp(v: u32) -> u8 {
    v.min(255) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmyk_profile(black: BlackGeneration) -> ColorProfileSpec {
        ColorProfileSpec::new(
            "test-cmyk",
            ColorProfileKind::Cmyk {
                total_ink_limit: 300,
                black,
            },
        )
    }

    #[test]
    fn white_uses_no_ink() {
        let profile = cmyk_profile(BlackGeneration::SingleInk);
        let converter = ColorProfileConverter::new(&profile);
        assert_eq!(converter.cmyk(255, 255, 255, 300, BlackGeneration::SingleInk), [0, 0, 0, 0]);
    }

    #[test]
    fn saturated_red() {
        let profile = cmyk_profile(BlackGeneration::SingleInk);
        let converter = ColorProfileConverter::new(&profile);
        assert_eq!(converter.cmyk(255, 0, 0, 300, BlackGeneration::SingleInk), [0, 255, 255, 0]);
    }

    #[test]
    fn ink_limit_scales_colour_inks() {
        let profile = cmyk_profile(BlackGeneration::SingleInk);
        let converter = ColorProfileConverter::new(&profile);
        // Dark blue separates to full cyan and magenta plus k = 155, over 200%
        let [c, m, y, k] = converter.cmyk(0, 0, 100, 200, BlackGeneration::SingleInk);
        assert_eq!(k, 155);
        assert!(c as u32 + m as u32 + y as u32 + k as u32 <= 200 * 255 / 100);
    }

    #[test]
    fn low_ink_limit_caps_black_on_neutral_grays() {
        let profile = ColorProfileSpec::new(
            "thin-ink",
            ColorProfileKind::Cmyk {
                total_ink_limit: 60,
                black: BlackGeneration::SingleInk,
            },
        );
        let converter = ColorProfileConverter::new(&profile);
        let limit = 60 * 255 / 100;

        // Mid gray is above the line-art threshold, so it separates to k only
        assert_eq!(converter.cmyk(100, 100, 100, 60, BlackGeneration::SingleInk), [0, 0, 0, limit as u8]);

        let buffer = PixelBuffer::solid_rgb(1, 1, 300, [100, 100, 100]);
        let image = converter.convert(&buffer).unwrap();
        let total: u32 = image.samples.iter().map(|&v| v as u32).sum();
        assert!(total <= limit);
    }

    #[test]
    fn gray_luma_is_weighted() {
        assert_eq!(luma(255, 255, 255), 255);
        assert_eq!(luma(0, 0, 0), 0);
        assert_eq!(luma(255, 0, 0), 76);
    }
}
