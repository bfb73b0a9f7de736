//! RGBA colors with CSS names and hexcodes.

use std::{collections::HashMap, fmt, str::FromStr};

use once_cell::sync::Lazy;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// 8-bit RGBA color, optionally carrying the CSS name it was created from.
///
/// Equality only considers the channels, so `Color::from_str("red")` equals
/// `Color::rgb(255, 0, 0)`.
#[derive(Clone, Copy, Debug)]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub alpha: u8,
    name: Option<&'static str>,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);

    pub const fn rgba(red: u8, green: u8, blue: u8, alpha: u8) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
            name: None,
        }
    }

    pub const fn rgb(red: u8, green: u8, blue: u8) -> Self {
        Self::rgba(red, green, blue, 255)
    }

    pub const fn gray(value: u8) -> Self {
        Self::rgb(value, value, value)
    }

    /// Gray level from a float channel value, truncated and saturated to `[0, 255]`.
    pub fn gray_f64(value: f64) -> Self {
        Self::gray(channel(value))
    }

    pub fn from_hexcode(hexcode: &str) -> Result<Self, ColorError> {
        let digits = hexcode
            .strip_prefix('#')
            .ok_or_else(|| ColorError::InvalidHex(hexcode.to_string()))?;
        if !(digits.len() == 6 || digits.len() == 8) || !digits.is_ascii() {
            return Err(ColorError::InvalidHex(hexcode.to_string()));
        }
        let byte = |i: usize| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map_err(|_| ColorError::InvalidHex(hexcode.to_string()))
        };
        let alpha = if digits.len() == 8 { byte(6)? } else { 255 };
        Ok(Self::rgba(byte(0)?, byte(2)?, byte(4)?, alpha))
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let (key, hexcode) = NAMED_COLORS.get_key_value(name.to_ascii_lowercase().as_str())?;
        let mut color = Self::from_hexcode(hexcode).ok()?;
        color.name = Some(*key);
        Some(color)
    }

    pub fn name(&self) -> Option<&'static str> {
        self.name
    }

    pub fn to_tuple(&self) -> (u8, u8, u8, u8) {
        (self.red, self.green, self.blue, self.alpha)
    }

    pub fn to_rgba(&self) -> [u8; 4] {
        [self.red, self.green, self.blue, self.alpha]
    }

    /// `#RRGGBBAA`.
    pub fn to_hexcode(&self) -> String {
        format!(
            "#{:02X}{:02X}{:02X}{:02X}",
            self.red, self.green, self.blue, self.alpha
        )
    }

    /// `#RRGGBB`, the alpha channel is dropped.
    pub fn to_rgb_hexcode(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.red, self.green, self.blue)
    }

    /// CSS functional notation without alpha.
    pub fn rgb_css(&self) -> String {
        format!("rgb({},{},{})", self.red, self.green, self.blue)
    }

    /// Multiplies the color channels by `factor`, keeping alpha. Channels are truncated.
    pub fn scaled(&self, factor: f64) -> Self {
        Self::rgba(
            channel(f64::from(self.red) * factor),
            channel(f64::from(self.green) * factor),
            channel(f64::from(self.blue) * factor),
            self.alpha,
        )
    }

    /// Mean of the three color channels.
    pub fn average(&self) -> f64 {
        (f64::from(self.red) + f64::from(self.green) + f64::from(self.blue)) / 3.0
    }

    pub fn is_opaque(&self) -> bool {
        self.alpha == u8::MAX
    }
}

fn channel(value: f64) -> u8 {
    value.clamp(0.0, 255.0) as u8
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

impl PartialEq for Color {
    fn eq(&self, other: &Self) -> bool {
        self.to_tuple() == other.to_tuple()
    }
}

impl Eq for Color {}

impl From<[u8; 4]> for Color {
    fn from([red, green, blue, alpha]: [u8; 4]) -> Self {
        Self::rgba(red, green, blue, alpha)
    }
}

impl From<image::Rgba<u8>> for Color {
    fn from(value: image::Rgba<u8>) -> Self {
        value.0.into()
    }
}

impl From<Color> for image::Rgba<u8> {
    fn from(value: Color) -> Self {
        image::Rgba(value.to_rgba())
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name {
            Some(name) => f.write_str(name),
            None => f.write_str(&self.to_hexcode()),
        }
    }
}

impl FromStr for Color {
    type Err = ColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.starts_with('#') {
            Self::from_hexcode(s)
        } else {
            Self::from_name(s).ok_or_else(|| ColorError::UnknownName(s.to_string()))
        }
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ColorError {
    #[error("invalid hexcode {0:?}, expected #RRGGBB or #RRGGBBAA")]
    InvalidHex(String),
    #[error("unknown color name {0:?}")]
    UnknownName(String),
}

static NAMED_COLORS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("aliceblue", "#F0F8FF"),
        ("antiquewhite", "#FAEBD7"),
        ("aqua", "#00FFFF"),
        ("aquamarine", "#7FFFD4"),
        ("azure", "#F0FFFF"),
        ("beige", "#F5F5DC"),
        ("bisque", "#FFE4C4"),
        ("black", "#000000"),
        ("blanchedalmond", "#FFEBCD"),
        ("blue", "#0000FF"),
        ("blueviolet", "#8A2BE2"),
        ("brown", "#A52A2A"),
        ("burlywood", "#DEB887"),
        ("cadetblue", "#5F9EA0"),
        ("chartreuse", "#7FFF00"),
        ("chocolate", "#D2691E"),
        ("coral", "#FF7F50"),
        ("cornflowerblue", "#6495ED"),
        ("cornsilk", "#FFF8DC"),
        ("crimson", "#DC143C"),
        ("cyan", "#00FFFF"),
        ("darkblue", "#00008B"),
        ("darkcyan", "#008B8B"),
        ("darkgoldenrod", "#B8860B"),
        ("darkgray", "#A9A9A9"),
        ("darkgreen", "#006400"),
        ("darkgrey", "#A9A9A9"),
        ("darkkhaki", "#BDB76B"),
        ("darkmagenta", "#8B008B"),
        ("darkolivegreen", "#556B2F"),
        ("darkorange", "#FF8C00"),
        ("darkorchid", "#9932CC"),
        ("darkred", "#8B0000"),
        ("darksalmon", "#E9967A"),
        ("darkseagreen", "#8FBC8F"),
        ("darkslateblue", "#483D8B"),
        ("darkslategray", "#2F4F4F"),
        ("darkslategrey", "#2F4F4F"),
        ("darkturquoise", "#00CED1"),
        ("darkviolet", "#9400D3"),
        ("deeppink", "#FF1493"),
        ("deepskyblue", "#00BFFF"),
        ("dimgray", "#696969"),
        ("dimgrey", "#696969"),
        ("dodgerblue", "#1E90FF"),
        ("firebrick", "#B22222"),
        ("floralwhite", "#FFFAF0"),
        ("forestgreen", "#228B22"),
        ("fuchsia", "#FF00FF"),
        ("gainsboro", "#DCDCDC"),
        ("ghostwhite", "#F8F8FF"),
        ("gold", "#FFD700"),
        ("goldenrod", "#DAA520"),
        ("gray", "#808080"),
        ("green", "#008000"),
        ("greenyellow", "#ADFF2F"),
        ("grey", "#808080"),
        ("honeydew", "#F0FFF0"),
        ("hotpink", "#FF69B4"),
        ("indianred", "#CD5C5C"),
        ("indigo", "#4B0082"),
        ("ivory", "#FFFFF0"),
        ("khaki", "#F0E68C"),
        ("lavender", "#E6E6FA"),
        ("lavenderblush", "#FFF0F5"),
        ("lawngreen", "#7CFC00"),
        ("lemonchiffon", "#FFFACD"),
        ("lightblue", "#ADD8E6"),
        ("lightcoral", "#F08080"),
        ("lightcyan", "#E0FFFF"),
        ("lightgoldenrodyellow", "#FAFAD2"),
        ("lightgray", "#D3D3D3"),
        ("lightgreen", "#90EE90"),
        ("lightgrey", "#D3D3D3"),
        ("lightpink", "#FFB6C1"),
        ("lightsalmon", "#FFA07A"),
        ("lightseagreen", "#20B2AA"),
        ("lightskyblue", "#87CEFA"),
        ("lightslategray", "#778899"),
        ("lightslategrey", "#778899"),
        ("lightsteelblue", "#B0C4DE"),
        ("lightyellow", "#FFFFE0"),
        ("lime", "#00FF00"),
        ("limegreen", "#32CD32"),
        ("linen", "#FAF0E6"),
        ("magenta", "#FF00FF"),
        ("maroon", "#800000"),
        ("mediumaquamarine", "#66CDAA"),
        ("mediumblue", "#0000CD"),
        ("mediumorchid", "#BA55D3"),
        ("mediumpurple", "#9370DB"),
        ("mediumseagreen", "#3CB371"),
        ("mediumslateblue", "#7B68EE"),
        ("mediumspringgreen", "#00FA9A"),
        ("mediumturquoise", "#48D1CC"),
        ("mediumvioletred", "#C71585"),
        ("midnightblue", "#191970"),
        ("mintcream", "#F5FFFA"),
        ("mistyrose", "#FFE4E1"),
        ("moccasin", "#FFE4B5"),
        ("navajowhite", "#FFDEAD"),
        ("navy", "#000080"),
        ("oldlace", "#FDF5E6"),
        ("olive", "#808000"),
        ("olivedrab", "#6B8E23"),
        ("orange", "#FFA500"),
        ("orangered", "#FF4500"),
        ("orchid", "#DA70D6"),
        ("palegoldenrod", "#EEE8AA"),
        ("palegreen", "#98FB98"),
        ("paleturquoise", "#AFEEEE"),
        ("palevioletred", "#DB7093"),
        ("papayawhip", "#FFEFD5"),
        ("peachpuff", "#FFDAB9"),
        ("peru", "#CD853F"),
        ("pink", "#FFC0CB"),
        ("plum", "#DDA0DD"),
        ("powderblue", "#B0E0E6"),
        ("purple", "#800080"),
        ("rebeccapurple", "#663399"),
        ("red", "#FF0000"),
        ("rosybrown", "#BC8F8F"),
        ("royalblue", "#4169E1"),
        ("saddlebrown", "#8B4513"),
        ("salmon", "#FA8072"),
        ("sandybrown", "#F4A460"),
        ("seagreen", "#2E8B57"),
        ("seashell", "#FFF5EE"),
        ("sienna", "#A0522D"),
        ("silver", "#C0C0C0"),
        ("skyblue", "#87CEEB"),
        ("slateblue", "#6A5ACD"),
        ("slategray", "#708090"),
        ("slategrey", "#708090"),
        ("snow", "#FFFAFA"),
        ("springgreen", "#00FF7F"),
        ("steelblue", "#4682B4"),
        ("tan", "#D2B48C"),
        ("teal", "#008080"),
        ("thistle", "#D8BFD8"),
        ("tomato", "#FF6347"),
        ("transparent", "#00000000"),
        ("turquoise", "#40E0D0"),
        ("violet", "#EE82EE"),
        ("wheat", "#F5DEB3"),
        ("white", "#FFFFFF"),
        ("whitesmoke", "#F5F5F5"),
        ("yellow", "#FFFF00"),
        ("yellowgreen", "#9ACD32"),
    ])
});

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_hexcode_round_trip_all_channels() {
        for value in (0..=255u8).step_by(5) {
            for color in [
                Color::rgba(value, 0, 0, 255),
                Color::rgba(0, value, 0, 255),
                Color::rgba(0, 0, value, 255),
                Color::rgba(12, 34, 56, value),
                Color::rgba(value, 255 - value, value / 2, value),
            ] {
                let parsed = Color::from_hexcode(&color.to_hexcode()).unwrap();
                assert_eq!(parsed.to_tuple(), color.to_tuple());
            }
        }
    }

    #[rstest]
    #[case::rgb("#800080", (128, 0, 128, 255))]
    #[case::rgba("#FF000080", (255, 0, 0, 128))]
    #[case::lower_case("#00ff7f", (0, 255, 127, 255))]
    #[case::name("purple", (128, 0, 128, 255))]
    #[case::name_mixed_case("RebeccaPurple", (102, 51, 153, 255))]
    #[case::transparent("transparent", (0, 0, 0, 0))]
    fn test_color_from_str(#[case] text: &str, #[case] expected: (u8, u8, u8, u8)) {
        assert_eq!(text.parse::<Color>().unwrap().to_tuple(), expected);
    }

    #[rstest]
    #[case::no_hash("FF0000")]
    #[case::short("#F00")]
    #[case::bad_digit("#GG0000")]
    #[case::unknown_name("blurple")]
    fn test_color_from_str_rejects(#[case] text: &str) {
        assert!(text.parse::<Color>().is_err());
    }

    #[test]
    fn test_display_prefers_name() {
        assert_eq!(Color::from_name("white").unwrap().to_string(), "white");
        assert_eq!(Color::rgb(1, 2, 3).to_string(), "#010203FF");
    }

    #[test]
    fn test_named_color_equals_channels() {
        assert_eq!(Color::from_name("red").unwrap(), Color::rgb(255, 0, 0));
    }

    #[rstest]
    #[case(1.0, (200, 100, 50, 255))]
    #[case(0.5, (100, 50, 25, 255))]
    #[case(0.0, (0, 0, 0, 255))]
    fn test_scaled(#[case] factor: f64, #[case] expected: (u8, u8, u8, u8)) {
        assert_eq!(Color::rgb(200, 100, 50).scaled(factor).to_tuple(), expected);
    }

    #[test]
    fn test_serde_uses_name_or_hexcode() {
        let json = serde_json::to_string(&[Color::from_name("navy").unwrap(), Color::rgb(0, 0, 1)])
            .unwrap();
        assert_eq!(json, r##"["navy","#000001FF"]"##);
        let parsed: Vec<Color> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[0].name(), Some("navy"));
        assert_eq!(parsed[1], Color::rgb(0, 0, 1));
    }
}
