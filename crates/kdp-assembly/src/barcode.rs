//! EAN-13 (ISBN) barcode with an optional EAN-5 price add-on
//!
//! Bars are rendered straight into a raster so the cover stays a single
//! flattened image.

use image::{Rgb, RgbImage};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BarcodeError {
    #[error("identifier must have 12 or 13 digits, got {0}")]
    InvalidLength(usize),
    #[error("identifier contains non-digit character '{0}'")]
    NonDigit(char),
    #[error("check digit is {found}, expected {expected}")]
    CheckDigit { expected: u8, found: u8 },
    #[error("price add-on must be exactly 5 digits, got '{0}'")]
    InvalidPrice(String),
}

/// Identifier and price printed on the back cover
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BarcodePayload {
    /// ISBN-13 / EAN-13, hyphens and spaces allowed
    pub isbn: String,
    /// EAN-5 price code, e.g. `51299` for USD 12.99
    pub price: Option<String>,
}

/// Validated barcode digits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Barcode {
    pub digits: [u8; 13],
    pub addon: Option<[u8; 5]>,
}

const L_CODES: [&str; 10] = [
    "0001101", "0011001", "0010011", "0111101", "0100011", "0110001", "0101111", "0111011",
    "0110111", "0001011",
];
const G_CODES: [&str; 10] = [
    "0100111", "0110011", "0011011", "0100001", "0011101", "0111001", "0000101", "0010001",
    "0001001", "0010111",
];
const R_CODES: [&str; 10] = [
    "1110010", "1100110", "1101100", "1000010", "1011100", "1001110", "1010000", "1000100",
    "1001000", "1110100",
];

/// Left-half parity selected by the leading digit
const EAN13_PARITY: [&str; 10] = [
    "LLLLLL", "LLGLGG", "LLGGLG", "LLGGGL", "LGLLGG", "LGGLLG", "LGGGLL", "LGLGLG", "LGLGGL",
    "LGGLGL",
];

/// Add-on parity selected by the add-on checksum
const EAN5_PARITY: [&str; 10] = [
    "GGLLL", "GLGLL", "GLLGL", "GLLLG", "LGGLL", "LLGGL", "LLLGG", "LGLGL", "LGLLG", "LLGLG",
];

/// Modules between the main symbol and the add-on
const ADDON_GAP_MODULES: usize = 9;

/// Add-on bars start this far down the bar height
const ADDON_TOP_RATIO: f64 = 0.15;

impl Barcode {
    pub fn encode(payload: &BarcodePayload) -> Result<Self, BarcodeError> {
        let mut digits = Vec::with_capacity(13);
        for ch in payload.isbn.chars() {
            if ch == '-' || ch == ' ' {
                continue;
            }
            let d = ch.to_digit(10).ok_or(BarcodeError::NonDigit(ch))?;
            digits.push(d as u8);
        }

        match digits.len() {
            12 => digits.push(ean13_check_digit(&digits)),
            13 => {
                let expected = ean13_check_digit(&digits[..12]);
                if digits[12] != expected {
                    return Err(BarcodeError::CheckDigit {
                        expected,
                        found: digits[12],
                    });
                }
            }
            n => return Err(BarcodeError::InvalidLength(n)),
        }

        let addon = match &payload.price {
            None => None,
            Some(price) => {
                let price = price.trim();
                if price.len() != 5 || !price.chars().all(|c| c.is_ascii_digit()) {
                    return Err(BarcodeError::InvalidPrice(price.to_string()));
                }
                let mut addon = [0u8; 5];
                for (slot, b) in addon.iter_mut().zip(price.bytes()) {
                    *slot = b - b'0';
                }
                Some(addon)
            }
        };

        let mut fixed = [0u8; 13];
        fixed.copy_from_slice(&digits);
        Ok(Self {
            digits: fixed,
            addon,
        })
    }

    /// Main symbol modules, `true` = bar
    fn main_modules(&self) -> Vec<bool> {
        let mut bits = String::with_capacity(95);
        bits.push_str("101");
        let parity = EAN13_PARITY[self.digits[0] as usize].as_bytes();
        for (i, &d) in self.digits[1..7].iter().enumerate() {
            let table = if parity[i] == b'L' { &L_CODES } else { &G_CODES };
            bits.push_str(table[d as usize]);
        }
        bits.push_str("01010");
        for &d in &self.digits[7..] {
            bits.push_str(R_CODES[d as usize]);
        }
        bits.push_str("101");
        bits.bytes().map(|b| b == b'1').collect()
    }

    fn addon_modules(addon: &[u8; 5]) -> Vec<bool> {
        let checksum = (3 * (addon[0] + addon[2] + addon[4]) as u32
            + 9 * (addon[1] + addon[3]) as u32)
            % 10;
        let parity = EAN5_PARITY[checksum as usize].as_bytes();

        let mut bits = String::with_capacity(47);
        bits.push_str("1011");
        for (i, &d) in addon.iter().enumerate() {
            if i > 0 {
                bits.push_str("01");
            }
            let table = if parity[i] == b'L' { &L_CODES } else { &G_CODES };
            bits.push_str(table[d as usize]);
        }
        bits.bytes().map(|b| b == b'1').collect()
    }

    pub fn total_modules(&self) -> usize {
        match self.addon {
            Some(_) => 95 + ADDON_GAP_MODULES + 47,
            None => 95,
        }
    }

    /// Draw black bars on white at exactly `width` × `height` pixels
    pub fn render(&self, width: u32, height: u32) -> RgbImage {
        let mut img = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));
        let module_width = width as f64 / self.total_modules() as f64;

        let mut draw = |modules: &[bool], first_module: usize, top: u32| {
            for (i, &bar) in modules.iter().enumerate() {
                if !bar {
                    continue;
                }
                let x0 = ((first_module + i) as f64 * module_width).floor() as u32;
                let x1 = ((first_module + i + 1) as f64 * module_width).floor() as u32;
                for x in x0..x1.min(width) {
                    for y in top..height {
                        img.put_pixel(x, y, Rgb([0, 0, 0]));
                    }
                }
            }
        };

        draw(&self.main_modules(), 0, 0);
        if let Some(addon) = &self.addon {
            let top = (height as f64 * ADDON_TOP_RATIO).round() as u32;
            draw(&Self::addon_modules(addon), 95 + ADDON_GAP_MODULES, top);
        }

        img
    }
}

fn ean13_check_digit(first12: &[u8]) -> u8 {
    let sum: u32 = first12
        .iter()
        .enumerate()
        .map(|(i, &d)| if i % 2 == 0 { d as u32 } else { 3 * d as u32 })
        .sum();
    ((10 - sum % 10) % 10) as u8
}
