//! Color types and conversions: sRGB ↔ linear ↔ XYZ ↔ CIE Lab (D65).
//!
//! All perceptual matching in the crate goes through [`Lab`] and
//! [`delta_e_2000`]. Conversions follow IEC 61966-2-1 (sRGB transfer
//! function) and the standard D65 matrices.

mod delta_e;

pub use delta_e::delta_e_2000;

use serde::{Deserialize, Serialize};

/// An 8-bit sRGB triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb8 {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Rgb8 {
    /// Construct from individual channels.
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse a 6-digit hex color, with or without a leading `#`.
    pub fn from_hex(hex: &str) -> Result<Self, ParseColorError> {
        let s = hex.trim();
        let s = s.strip_prefix('#').unwrap_or(s);
        if s.len() != 6 {
            return Err(ParseColorError::InvalidLength(s.len()));
        }
        let r = u8::from_str_radix(&s[0..2], 16)?;
        let g = u8::from_str_radix(&s[2..4], 16)?;
        let b = u8::from_str_radix(&s[4..6], 16)?;
        Ok(Self { r, g, b })
    }

    /// The channels as an array in `[r, g, b]` order.
    pub fn channels(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

impl From<[u8; 3]> for Rgb8 {
    fn from(c: [u8; 3]) -> Self {
        Self::new(c[0], c[1], c[2])
    }
}

/// Error parsing a hex color string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseColorError {
    /// Hex string is not exactly 6 digits after stripping `#`.
    InvalidLength(usize),
    /// A character was not a hexadecimal digit.
    InvalidDigit(std::num::ParseIntError),
}

impl From<std::num::ParseIntError> for ParseColorError {
    fn from(e: std::num::ParseIntError) -> Self {
        ParseColorError::InvalidDigit(e)
    }
}

impl std::fmt::Display for ParseColorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseColorError::InvalidLength(n) => {
                write!(f, "hex color must have 6 digits, got {n}")
            }
            ParseColorError::InvalidDigit(e) => write!(f, "invalid hex digit: {e}"),
        }
    }
}

impl std::error::Error for ParseColorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ParseColorError::InvalidDigit(e) => Some(e),
            _ => None,
        }
    }
}

/// A color in CIE Lab space, D65 white point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Lab {
    /// Lightness, 0 (black) to 100 (diffuse white).
    pub l: f64,
    /// Green–red opponent axis.
    pub a: f64,
    /// Blue–yellow opponent axis.
    pub b: f64,
}

impl Lab {
    /// Construct from components.
    pub fn new(l: f64, a: f64, b: f64) -> Self {
        Self { l, a, b }
    }
}

// D65 reference white in XYZ.
const D65_WHITE: [f64; 3] = [0.95047, 1.0, 1.08883];

// Linear RGB → XYZ matrix for sRGB primaries with D65 white.
const RGB_TO_XYZ: [[f64; 3]; 3] = [
    [0.4124564, 0.3575761, 0.1804375],
    [0.2126729, 0.7151522, 0.0721750],
    [0.0193339, 0.1191920, 0.9503041],
];

// XYZ → linear RGB, the inverse of `RGB_TO_XYZ`.
const XYZ_TO_RGB: [[f64; 3]; 3] = [
    [3.2404542, -1.5371385, -0.4985314],
    [-0.9692660, 1.8760108, 0.0415560],
    [0.0556434, -0.2040259, 1.0572252],
];

/// Decode one 8-bit sRGB channel to linear light in `[0, 1]`.
pub fn srgb_to_linear(c8: u8) -> f64 {
    let v = c8 as f64 / 255.0;
    if v <= 0.04045 {
        v / 12.92
    } else {
        ((v + 0.055) / 1.055).powf(2.4)
    }
}

/// Encode linear light back to one 8-bit sRGB channel, clamped.
pub fn linear_to_srgb(v: f64) -> u8 {
    let v = v.clamp(0.0, 1.0);
    let s = if v <= 0.0031308 {
        v * 12.92
    } else {
        1.055 * v.powf(1.0 / 2.4) - 0.055
    };
    (s * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Linear RGB → XYZ.
pub fn linear_rgb_to_xyz(rgb: [f64; 3]) -> [f64; 3] {
    let mut xyz = [0.0f64; 3];
    for (row, out) in RGB_TO_XYZ.iter().zip(xyz.iter_mut()) {
        *out = row[0] * rgb[0] + row[1] * rgb[1] + row[2] * rgb[2];
    }
    xyz
}

/// XYZ → linear RGB. Out-of-gamut values are left unclamped.
pub fn xyz_to_linear_rgb(xyz: [f64; 3]) -> [f64; 3] {
    let mut rgb = [0.0f64; 3];
    for (row, out) in XYZ_TO_RGB.iter().zip(rgb.iter_mut()) {
        *out = row[0] * xyz[0] + row[1] * xyz[1] + row[2] * xyz[2];
    }
    rgb
}

const LAB_EPSILON: f64 = 0.008856;
const LAB_KAPPA: f64 = 7.787;

fn lab_f(t: f64) -> f64 {
    if t > LAB_EPSILON {
        t.cbrt()
    } else {
        LAB_KAPPA * t + 16.0 / 116.0
    }
}

fn lab_f_inv(ft: f64) -> f64 {
    let t3 = ft * ft * ft;
    if t3 > LAB_EPSILON {
        t3
    } else {
        (ft - 16.0 / 116.0) / LAB_KAPPA
    }
}

/// XYZ → CIE Lab with D65 white normalization.
pub fn xyz_to_lab(xyz: [f64; 3]) -> Lab {
    let fx = lab_f(xyz[0] / D65_WHITE[0]);
    let fy = lab_f(xyz[1] / D65_WHITE[1]);
    let fz = lab_f(xyz[2] / D65_WHITE[2]);
    Lab {
        l: 116.0 * fy - 16.0,
        a: 500.0 * (fx - fy),
        b: 200.0 * (fy - fz),
    }
}

/// CIE Lab → XYZ, the inverse of [`xyz_to_lab`].
pub fn lab_to_xyz(lab: Lab) -> [f64; 3] {
    let fy = (lab.l + 16.0) / 116.0;
    let fx = fy + lab.a / 500.0;
    let fz = fy - lab.b / 200.0;
    [
        lab_f_inv(fx) * D65_WHITE[0],
        lab_f_inv(fy) * D65_WHITE[1],
        lab_f_inv(fz) * D65_WHITE[2],
    ]
}

/// Full decode: 8-bit sRGB triple → Lab.
pub fn rgb_to_lab(rgb: Rgb8) -> Lab {
    let lin = [
        srgb_to_linear(rgb.r),
        srgb_to_linear(rgb.g),
        srgb_to_linear(rgb.b),
    ];
    xyz_to_lab(linear_rgb_to_xyz(lin))
}

/// Full encode: Lab → 8-bit sRGB triple, clamped into gamut.
pub fn lab_to_rgb(lab: Lab) -> Rgb8 {
    let lin = xyz_to_linear_rgb(lab_to_xyz(lab));
    Rgb8::new(
        linear_to_srgb(lin[0]),
        linear_to_srgb(lin[1]),
        linear_to_srgb(lin[2]),
    )
}

/// A color in HSV. Hue in degrees `[0, 360)`; saturation and value scaled
/// to `[0, 255]` so thresholds match the 8-bit convention used elsewhere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsv {
    /// Hue angle in degrees.
    pub h: f64,
    /// Saturation, 0–255.
    pub s: f64,
    /// Value, 0–255.
    pub v: f64,
}

/// sRGB → HSV.
pub fn rgb_to_hsv(rgb: Rgb8) -> Hsv {
    let r = rgb.r as f64;
    let g = rgb.g as f64;
    let b = rgb.b as f64;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let s = if max > 0.0 { delta / max * 255.0 } else { 0.0 };
    let h = if delta <= 0.0 {
        0.0
    } else if (max - r).abs() < f64::EPSILON {
        60.0 * (((g - b) / delta).rem_euclid(6.0))
    } else if (max - g).abs() < f64::EPSILON {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };

    Hsv { h, s, v: max }
}
