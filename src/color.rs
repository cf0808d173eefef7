use std::fmt;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ColorError {
    #[error("color must start with '#': {0:?}")]
    MissingHash(String),
    #[error("color must have exactly six hex digits: {0:?}")]
    BadLength(String),
    #[error("invalid hex digits in color: {0:?}")]
    BadDigits(String),
}

/// 8-bit sRGB color as carried by furniture records and materials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Self = Self::from_u32(0x000000);
    pub const WHITE: Self = Self::from_u32(0xffffff);

    pub const fn from_u32(rgb: u32) -> Self {
        Self {
            r: ((rgb >> 16) & 0xff) as u8,
            g: ((rgb >> 8) & 0xff) as u8,
            b: (rgb & 0xff) as u8,
        }
    }

    pub fn to_u32(self) -> u32 {
        ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }

    /// Parses `#RRGGBB`.
    pub fn from_hex(value: &str) -> Result<Self, ColorError> {
        let Some(digits) = value.strip_prefix('#') else {
            return Err(ColorError::MissingHash(value.to_string()));
        };
        if digits.len() != 6 {
            return Err(ColorError::BadLength(value.to_string()));
        }
        u32::from_str_radix(digits, 16)
            .map(Self::from_u32)
            .map_err(|_| ColorError::BadDigits(value.to_string()))
    }

    /// Parses `#RRGGBB`, logging and substituting `fallback` on malformed input.
    pub fn from_hex_or(value: &str, fallback: Color) -> Self {
        match Self::from_hex(value) {
            Ok(color) => color,
            Err(err) => {
                log::warn!("{err}; using {fallback}");
                fallback
            }
        }
    }

    pub fn to_f32(self) -> [f32; 3] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
        ]
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl serde::Serialize for Color {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for Color {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Self::from_hex(&value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_colors() {
        assert_eq!(Color::from_hex("#8B4513").unwrap(), Color::from_u32(0x8b4513));
        assert_eq!(Color::from_hex("#ffffff").unwrap(), Color::WHITE);
    }

    #[test]
    fn rejects_malformed_colors() {
        assert!(matches!(Color::from_hex("8B4513"), Err(ColorError::MissingHash(_))));
        assert!(matches!(Color::from_hex("#fff"), Err(ColorError::BadLength(_))));
        assert!(matches!(Color::from_hex("#gg0000"), Err(ColorError::BadDigits(_))));
        assert_eq!(Color::from_hex_or("nope", Color::BLACK), Color::BLACK);
    }

    #[test]
    fn display_is_lowercase_hex() {
        assert_eq!(Color::from_u32(0xD2691E).to_string(), "#d2691e");
    }
}
