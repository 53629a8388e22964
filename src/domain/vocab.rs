// ============================================================
// Layer 3 — Vocabulary
// ============================================================
// Maps whole-word tokens to integer ids and back.
//
// Id 1 is always the padding symbol `<pad>`. It is reserved BEFORE
// any corpus token is accepted; a corpus token that already holds
// id 1 is rejected rather than overwritten.
//
// Both directions are kept as hash maps built once, so turning a
// pre-tokenized id sequence back into text costs O(1) per token.

use std::collections::HashMap;

use crate::domain::error::VocabError;

pub const PAD_TOKEN: &str = "<pad>";
pub const PAD_ID: u32 = 1;
pub const UNK_TOKEN: &str = "<unk>";

#[derive(Debug, Clone)]
pub struct Vocabulary {
    token_to_id: HashMap<String, u32>,
    id_to_token: HashMap<u32, String>,
}

impl Vocabulary {
    /// Build a vocabulary with `<pad>` pre-reserved at id 1.
    pub fn from_entries<I, S>(entries: I) -> Result<Self, VocabError>
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        let mut token_to_id = HashMap::from([(PAD_TOKEN.to_string(), PAD_ID)]);
        let mut id_to_token = HashMap::from([(PAD_ID, PAD_TOKEN.to_string())]);

        for (token, id) in entries {
            let token = token.into();

            if token == PAD_TOKEN {
                if id == PAD_ID {
                    continue;
                }
                return Err(VocabError::ReservedIdCollision { token, id: PAD_ID });
            }
            if id == PAD_ID {
                return Err(VocabError::ReservedIdCollision { token, id });
            }
            if let Some(existing) = id_to_token.get(&id) {
                return Err(VocabError::DuplicateId {
                    id,
                    first:  existing.clone(),
                    second: token,
                });
            }

            id_to_token.insert(id, token.clone());
            token_to_id.insert(token, id);
        }

        Ok(Self { token_to_id, id_to_token })
    }

    pub fn pad_id(&self) -> u32 {
        PAD_ID
    }

    pub fn id(&self, token: &str) -> Option<u32> {
        self.token_to_id.get(token).copied()
    }

    pub fn token(&self, id: u32) -> Option<&str> {
        self.id_to_token.get(&id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.token_to_id.len()
    }

    /// Size of an embedding table able to index every id.
    pub fn id_bound(&self) -> usize {
        self.id_to_token.keys().max().map_or(0, |&m| m as usize + 1)
    }

    /// Rebuild the space-separated text behind a pre-tokenized sequence.
    pub fn decode(&self, ids: &[u32]) -> Result<String, VocabError> {
        let words = ids
            .iter()
            .map(|&id| self.token(id).ok_or(VocabError::UnknownId(id)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(words.join(" "))
    }

    /// Whitespace tokenization of already cleaned text.
    /// Unknown words map to `<unk>` when present, otherwise they are dropped.
    pub fn tokenize(&self, text: &str) -> Vec<u32> {
        let unk = self.id(UNK_TOKEN);
        text.split_whitespace()
            .filter_map(|w| self.id(w).or(unk))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocab() -> Vocabulary {
        Vocabulary::from_entries([("hola", 2), ("mundo", 3), ("meme", 7)]).unwrap()
    }

    #[test]
    fn test_pad_is_reserved_at_one() {
        let v = vocab();
        assert_eq!(v.id(PAD_TOKEN), Some(1));
        assert_eq!(v.token(1), Some(PAD_TOKEN));
        assert_eq!(v.len(), 4);
    }

    #[test]
    fn test_existing_pad_entry_is_accepted() {
        let v = Vocabulary::from_entries([("<pad>", 1), ("a", 2)]).unwrap();
        assert_eq!(v.len(), 2);
    }

    #[test]
    fn test_real_token_on_pad_id_is_rejected() {
        let err = Vocabulary::from_entries([("the", 1)]).unwrap_err();
        assert_eq!(
            err,
            VocabError::ReservedIdCollision { token: "the".into(), id: 1 }
        );
    }

    #[test]
    fn test_pad_on_other_id_is_rejected() {
        assert!(Vocabulary::from_entries([("<pad>", 0)]).is_err());
    }

    #[test]
    fn test_duplicate_id_is_rejected() {
        let err = Vocabulary::from_entries([("a", 5), ("b", 5)]).unwrap_err();
        assert!(matches!(err, VocabError::DuplicateId { id: 5, .. }));
    }

    #[test]
    fn test_reverse_lookup_covers_every_id() {
        let v = vocab();
        for (token, &id) in &v.token_to_id {
            assert_eq!(v.token(id), Some(token.as_str()));
        }
    }

    #[test]
    fn test_decode_joins_words() {
        assert_eq!(vocab().decode(&[2, 3]).unwrap(), "hola mundo");
        assert_eq!(vocab().decode(&[]).unwrap(), "");
        assert_eq!(vocab().decode(&[99]), Err(VocabError::UnknownId(99)));
    }

    #[test]
    fn test_tokenize_drops_unknown_without_unk() {
        assert_eq!(vocab().tokenize("hola gato meme"), vec![2, 7]);
    }

    #[test]
    fn test_tokenize_maps_unknown_to_unk() {
        let v = Vocabulary::from_entries([("<unk>", 0), ("hola", 2)]).unwrap();
        assert_eq!(v.tokenize("hola gato"), vec![2, 0]);
        assert_eq!(v.id_bound(), 3);
    }
}
