use serde::{Deserialize, Serialize};

pub const NUM_CLASSES: usize = 3;

/// The three categories a sample can be classified into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemeClass {
    Meme    = 0,
    NoMeme  = 1,
    Sticker = 2,
}

impl MemeClass {
    pub const ALL: [MemeClass; NUM_CLASSES] = [Self::Meme, Self::NoMeme, Self::Sticker];

    /// Remap a raw corpus target code to a training label.
    ///
    /// Code 4 collapses into `Meme` in meme-only mode and becomes
    /// `Sticker` otherwise; codes 1..=3 shift down by one. Any other
    /// code has no label.
    pub fn from_raw(target: i64, meme_only: bool) -> Option<Self> {
        match target {
            4 if meme_only => Some(Self::Meme),
            4 => Some(Self::Sticker),
            1..=3 => Self::from_index((target - 1) as usize),
            _ => None,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Meme    => "Meme",
            Self::NoMeme  => "No Meme",
            Self::Sticker => "Sticker",
        }
    }
}

impl std::fmt::Display for MemeClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_four_depends_on_meme_only() {
        assert_eq!(MemeClass::from_raw(4, true), Some(MemeClass::Meme));
        assert_eq!(MemeClass::from_raw(4, false), Some(MemeClass::Sticker));
    }

    #[test]
    fn test_other_codes_shift_down() {
        assert_eq!(MemeClass::from_raw(1, false), Some(MemeClass::Meme));
        assert_eq!(MemeClass::from_raw(2, true), Some(MemeClass::NoMeme));
        assert_eq!(MemeClass::from_raw(3, false), Some(MemeClass::Sticker));
    }

    #[test]
    fn test_out_of_range_codes_have_no_label() {
        assert_eq!(MemeClass::from_raw(0, false), None);
        assert_eq!(MemeClass::from_raw(5, false), None);
        assert_eq!(MemeClass::from_raw(-1, true), None);
    }
}
