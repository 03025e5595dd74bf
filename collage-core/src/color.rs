//! # Colour
//!
//! Shape colours are plain 8-bit sRGB triples. In persisted form they are exactly six
//! lowercase hex digits, `RRGGBB`, without any prefix.

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct Rgb {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}
impl Rgb {
    pub const BLACK: Self = Self::new(0, 0, 0);
    pub const WHITE: Self = Self::new(255, 255, 255);
    #[must_use]
    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }
    #[must_use]
    pub fn as_array(self) -> [u8; 3] {
        [self.red, self.green, self.blue]
    }
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseColourError {
    #[error("colour must be exactly six hex digits, found {0} characters")]
    Length(usize),
    #[error("colour contains a non-hex character")]
    NotHex,
}

impl std::str::FromStr for Rgb {
    type Err = ParseColourError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Byte length, not char count. A multibyte char is not hex anyway.
        if s.len() != 6 {
            return Err(ParseColourError::Length(s.chars().count()));
        }
        // `from_str_radix` would let a sign through, check every digit ourselves.
        if !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ParseColourError::NotHex);
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&s[range], 16).map_err(|_| ParseColourError::NotHex)
        };
        Ok(Self {
            red: channel(0..2)?,
            green: channel(2..4)?,
            blue: channel(4..6)?,
        })
    }
}
impl std::fmt::Display for Rgb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02x}{:02x}{:02x}", self.red, self.green, self.blue)
    }
}

impl serde::Serialize for Rgb {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
impl<'de> serde::Deserialize<'de> for Rgb {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let string = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        string.parse().map_err(serde::de::Error::custom)
    }
}
