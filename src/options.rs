/// Render options.
///
/// [`RenderOptions`] is the single typed configuration handed to the encoder. The
/// enums here carry the fixed lookup tables that map coarse user selections (shape,
/// eye style) onto concrete dot and corner styles.
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::logo::Logo;

/// QR error correction tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ErrorCorrectionLevel {
    /// Tolerates ~7% erroneous codewords.
    #[serde(rename = "L")]
    Low,
    /// Tolerates ~15% erroneous codewords.
    #[serde(rename = "M")]
    Medium,
    /// Tolerates ~25% erroneous codewords.
    #[serde(rename = "Q")]
    Quartile,
    /// Tolerates ~30% erroneous codewords.
    #[default]
    #[serde(rename = "H")]
    High,
}

impl ErrorCorrectionLevel {
    pub fn letter(self) -> char {
        use ErrorCorrectionLevel::*;
        match self {
            Low => 'L',
            Medium => 'M',
            Quartile => 'Q',
            High => 'H',
        }
    }

    pub fn label(self) -> &'static str {
        use ErrorCorrectionLevel::*;
        match self {
            Low => "Low (7%)",
            Medium => "Medium (15%)",
            Quartile => "Quartile (25%)",
            High => "High (30%)",
        }
    }

    pub(crate) fn to_ec_level(self) -> qrcode::EcLevel {
        use ErrorCorrectionLevel::*;
        match self {
            Low => qrcode::EcLevel::L,
            Medium => qrcode::EcLevel::M,
            Quartile => qrcode::EcLevel::Q,
            High => qrcode::EcLevel::H,
        }
    }
}

impl FromStr for ErrorCorrectionLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "L" | "LOW" => Ok(ErrorCorrectionLevel::Low),
            "M" | "MEDIUM" => Ok(ErrorCorrectionLevel::Medium),
            "Q" | "QUARTILE" => Ok(ErrorCorrectionLevel::Quartile),
            "H" | "HIGH" => Ok(ErrorCorrectionLevel::High),
            _ => Err(format!("unknown error correction level: {s}")),
        }
    }
}

impl fmt::Display for ErrorCorrectionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// Style of the data modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DotStyle {
    #[default]
    Square,
    Rounded,
    ClassyRounded,
    Dots,
}

impl DotStyle {
    pub fn name(self) -> &'static str {
        match self {
            DotStyle::Square => "square",
            DotStyle::Rounded => "rounded",
            DotStyle::ClassyRounded => "classy-rounded",
            DotStyle::Dots => "dots",
        }
    }
}

/// Style of a finder pattern part, used for both the outer square and the inner dot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CornerStyle {
    #[default]
    Square,
    ExtraRounded,
    Dot,
}

impl CornerStyle {
    pub fn name(self) -> &'static str {
        match self {
            CornerStyle::Square => "square",
            CornerStyle::ExtraRounded => "extra-rounded",
            CornerStyle::Dot => "dot",
        }
    }
}

/// Coarse shape selector offered to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShapeKind {
    #[default]
    Square,
    Rounded,
    Circle,
    Dots,
}

impl ShapeKind {
    /// Parses a selector name; anything unrecognized falls back to `Square`.
    pub fn from_name(name: &str) -> ShapeKind {
        match name {
            "rounded" => ShapeKind::Rounded,
            "circle" => ShapeKind::Circle,
            "dots" => ShapeKind::Dots,
            _ => ShapeKind::Square,
        }
    }

    /// The fixed dot style / corner style pair for this shape.
    pub fn styles(self) -> (DotStyle, CornerStyle) {
        match self {
            ShapeKind::Square => (DotStyle::Square, CornerStyle::Square),
            ShapeKind::Rounded => (DotStyle::Rounded, CornerStyle::ExtraRounded),
            ShapeKind::Circle => (DotStyle::ClassyRounded, CornerStyle::ExtraRounded),
            ShapeKind::Dots => (DotStyle::Dots, CornerStyle::Dot),
        }
    }
}

/// Finder pattern ("eye") selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EyeStyle {
    #[default]
    Square,
    Rounded,
}

impl EyeStyle {
    /// `rounded` selects rounded eyes, every other name selects square ones.
    pub fn from_name(name: &str) -> EyeStyle {
        if name == "rounded" {
            EyeStyle::Rounded
        } else {
            EyeStyle::Square
        }
    }

    /// (corner-square style, corner-dot style)
    pub fn styles(self) -> (CornerStyle, CornerStyle) {
        match self {
            EyeStyle::Rounded => (CornerStyle::ExtraRounded, CornerStyle::Dot),
            EyeStyle::Square => (CornerStyle::Square, CornerStyle::Square),
        }
    }
}

/// An opaque RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0 };
    pub const WHITE: Color = Color {
        r: 255,
        g: 255,
        b: 255,
    };

    pub fn rgba(self, alpha: u8) -> [u8; 4] {
        [self.r, self.g, self.b, alpha]
    }
}

/// Returns true for `#rgb` and `#rrggbb` hex colors.
pub fn is_valid_hex_color(color: &str) -> bool {
    let Some(hex) = color.strip_prefix('#') else {
        return false;
    };
    (hex.len() == 3 || hex.len() == 6) && hex.chars().all(|c| c.is_ascii_hexdigit())
}

impl FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !is_valid_hex_color(s) {
            return Err(format!("invalid hex color: {s}"));
        }
        let hex = &s[1..];
        let channel = |digits: &str| u8::from_str_radix(digits, 16).map_err(|e| e.to_string());
        if hex.len() == 3 {
            let expand = |i: usize| channel(&hex[i..i + 1].repeat(2));
            Ok(Color {
                r: expand(0)?,
                g: expand(1)?,
                b: expand(2)?,
            })
        } else {
            Ok(Color {
                r: channel(&hex[0..2])?,
                g: channel(&hex[2..4])?,
                b: channel(&hex[4..6])?,
            })
        }
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Background of the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Background {
    Color(Color),
    Transparent,
}

impl Background {
    pub fn rgba(self) -> [u8; 4] {
        match self {
            Background::Color(color) => color.rgba(255),
            Background::Transparent => [0, 0, 0, 0],
        }
    }
}

impl fmt::Display for Background {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Background::Color(color) => color.fmt(f),
            Background::Transparent => f.write_str("transparent"),
        }
    }
}

/// How the logo is laid over the symbol.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageOptions {
    /// Skip data modules underneath the logo.
    pub hide_background_dots: bool,
    /// Logo side as a fraction of the symbol side.
    pub image_size: f32,
    /// Clear space around the logo, in pixels.
    pub margin: u32,
}

impl Default for ImageOptions {
    fn default() -> Self {
        ImageOptions {
            hide_background_dots: true,
            image_size: 0.4,
            margin: 8,
        }
    }
}

/// Everything the encoder needs to draw one symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    pub width: u32,
    pub height: u32,
    pub margin: u32,
    pub error_correction: ErrorCorrectionLevel,
    pub dot_style: DotStyle,
    pub corner_square_style: CornerStyle,
    pub corner_dot_style: CornerStyle,
    pub foreground: Color,
    pub background: Background,
    pub image_options: ImageOptions,
    pub logo: Option<Arc<Logo>>,
    pub data: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            width: 400,
            height: 400,
            margin: 4,
            error_correction: ErrorCorrectionLevel::High,
            dot_style: DotStyle::Square,
            corner_square_style: CornerStyle::Square,
            corner_dot_style: CornerStyle::Square,
            foreground: Color::BLACK,
            background: Background::Color(Color::WHITE),
            image_options: ImageOptions::default(),
            logo: None,
            data: String::new(),
        }
    }
}

impl RenderOptions {
    pub fn has_payload(&self) -> bool {
        !self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_table() {
        assert_eq!(
            ShapeKind::from_name("square").styles(),
            (DotStyle::Square, CornerStyle::Square)
        );
        assert_eq!(
            ShapeKind::from_name("rounded").styles(),
            (DotStyle::Rounded, CornerStyle::ExtraRounded)
        );
        assert_eq!(
            ShapeKind::from_name("circle").styles(),
            (DotStyle::ClassyRounded, CornerStyle::ExtraRounded)
        );
        assert_eq!(
            ShapeKind::from_name("dots").styles(),
            (DotStyle::Dots, CornerStyle::Dot)
        );
        assert_eq!(
            ShapeKind::from_name("hexagon").styles(),
            (DotStyle::Square, CornerStyle::Square)
        );
    }

    #[test]
    fn test_eye_table() {
        assert_eq!(
            EyeStyle::from_name("rounded").styles(),
            (CornerStyle::ExtraRounded, CornerStyle::Dot)
        );
        assert_eq!(
            EyeStyle::from_name("square").styles(),
            (CornerStyle::Square, CornerStyle::Square)
        );
        assert_eq!(EyeStyle::from_name("anything"), EyeStyle::Square);
    }

    #[test]
    fn test_error_correction_parsing() {
        assert_eq!("L".parse(), Ok(ErrorCorrectionLevel::Low));
        assert_eq!("q".parse(), Ok(ErrorCorrectionLevel::Quartile));
        assert_eq!("high".parse(), Ok(ErrorCorrectionLevel::High));
        assert!("X".parse::<ErrorCorrectionLevel>().is_err());
        assert_eq!(ErrorCorrectionLevel::Medium.label(), "Medium (15%)");
    }

    #[test]
    fn test_hex_colors() {
        assert!(is_valid_hex_color("#fff"));
        assert!(is_valid_hex_color("#A1b2C3"));
        assert!(!is_valid_hex_color("fff"));
        assert!(!is_valid_hex_color("#ffff"));
        assert!(!is_valid_hex_color("#ggg"));

        assert_eq!("#fa0".parse(), Ok(Color { r: 255, g: 170, b: 0 }));
        assert_eq!("#102030".parse::<Color>().map(|c| c.to_string()), Ok("#102030".to_string()));
    }

    #[test]
    fn test_defaults() {
        let options = RenderOptions::default();
        assert_eq!((options.width, options.height, options.margin), (400, 400, 4));
        assert_eq!(options.error_correction, ErrorCorrectionLevel::High);
        assert_eq!(options.background.to_string(), "#ffffff");
        assert!(!options.has_payload());
        assert!(options.logo.is_none());
    }
}
