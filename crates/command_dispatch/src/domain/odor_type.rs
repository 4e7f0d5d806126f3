use std::fmt;

/// Odor cartridges understood by receivers, with their protocol codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OdorType {
    Coffee = 1,
    Alcohol = 2,
    Lemon = 3,
    Mint = 4,
    Lavender = 5,
    Mixed = 6,
}

impl OdorType {
    pub const ALL: [OdorType; 6] = [
        OdorType::Coffee,
        OdorType::Alcohol,
        OdorType::Lemon,
        OdorType::Mint,
        OdorType::Lavender,
        OdorType::Mixed,
    ];

    /// Case-insensitive lookup. Unknown names fall back to coffee.
    pub fn from_name(name: &str) -> Self {
        let name = name.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|odor| odor.name() == name)
            .unwrap_or(OdorType::Coffee)
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|odor| odor.code() == code)
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            OdorType::Coffee => "coffee",
            OdorType::Alcohol => "alcohol",
            OdorType::Lemon => "lemon",
            OdorType::Mint => "mint",
            OdorType::Lavender => "lavender",
            OdorType::Mixed => "mixed",
        }
    }
}

impl fmt::Display for OdorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name_is_case_insensitive() {
        assert_eq!(OdorType::from_name("coffee"), OdorType::Coffee);
        assert_eq!(OdorType::from_name("COFFEE"), OdorType::Coffee);
        assert_eq!(OdorType::from_name("Mint").code(), 4);
        assert_eq!(OdorType::from_name("LaVeNdEr"), OdorType::Lavender);
    }

    #[test]
    fn test_unknown_name_defaults_to_coffee() {
        assert_eq!(OdorType::from_name("unknown"), OdorType::Coffee);
        assert_eq!(OdorType::from_name(""), OdorType::Coffee);
    }

    #[test]
    fn test_codes_cover_one_to_six() {
        let codes: Vec<u8> = OdorType::ALL.iter().map(|odor| odor.code()).collect();
        assert_eq!(codes, vec![1, 2, 3, 4, 5, 6]);

        assert_eq!(OdorType::from_code(2), Some(OdorType::Alcohol));
        assert_eq!(OdorType::from_code(0), None);
        assert_eq!(OdorType::from_code(7), None);
    }
}
