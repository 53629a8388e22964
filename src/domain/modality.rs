// ============================================================
// Layer 3 — Modality
// ============================================================
// Which inputs a run feeds to the model. There are two families:
//
//   token-id family:  Image | Text | ImageText
//   BERT family:      Bert  | ImageBert
//
// The CLI exposes the original flag set (--include-text, --only-text,
// --bert, --include-image); `from_flags` turns that set into exactly
// one modality or refuses it.

use serde::{Deserialize, Serialize};

use crate::domain::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Modality {
    Image,
    Text,
    ImageText,
    Bert,
    ImageBert,
}

impl Modality {
    pub fn from_flags(
        include_text:  bool,
        only_text:     bool,
        bert:          bool,
        include_image: bool,
    ) -> Result<Self, ConfigError> {
        let contradiction = |msg: &str| Err(ConfigError::ContradictoryModality(msg.to_string()));

        if bert {
            if include_text || only_text {
                return contradiction("--bert cannot be combined with token-id text flags");
            }
            return Ok(if include_image { Self::ImageBert } else { Self::Bert });
        }

        match (include_text, only_text, include_image) {
            (true, true, _)      => contradiction("--include-text and --only-text are exclusive"),
            (_, true, true)      => contradiction("--only-text excludes --include-image"),
            (false, true, false) => Ok(Self::Text),
            (true, false, _)     => Ok(Self::ImageText),
            (false, false, _)    => Ok(Self::Image),
        }
    }

    pub fn uses_image(self) -> bool {
        matches!(self, Self::Image | Self::ImageText | Self::ImageBert)
    }

    pub fn uses_tokens(self) -> bool {
        matches!(self, Self::Text | Self::ImageText)
    }

    pub fn uses_bert(self) -> bool {
        matches!(self, Self::Bert | Self::ImageBert)
    }
}

impl std::fmt::Display for Modality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Image     => "image",
            Self::Text      => "text",
            Self::ImageText => "image+text",
            Self::Bert      => "bert",
            Self::ImageBert => "image+bert",
        };
        f.write_str(s)
    }
}
