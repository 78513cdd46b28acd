use std::collections::HashMap;

use crate::error::{ModelError, Result};

/// Dense id assigned to each distinct token, in first-seen order.
pub type TokenId = u32;

/// Token vocabulary built while training.
///
/// Ids are handed out in the order tokens are first encountered, so iterating
/// `tokens` is the canonical vocabulary order used for tie-breaking.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Vocab {
    /// Token strings, indexed by token ID.
    pub tokens: Vec<String>,
    /// Reverse mapping from token string to token ID.
    pub token_to_id: HashMap<String, TokenId>,
}

impl Vocab {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the id for `token`, inserting it at the end if unseen.
    ///
    /// Fails once the vocabulary holds more distinct tokens than `TokenId`
    /// can address.
    pub fn intern(&mut self, token: &str) -> Result<TokenId> {
        if let Some(&id) = self.token_to_id.get(token) {
            return Ok(id);
        }
        let id = next_id(self.tokens.len())?;
        self.tokens.push(token.to_string());
        self.token_to_id.insert(token.to_string(), id);
        Ok(id)
    }

    /// Look up the id of a token seen during training.
    pub fn id(&self, token: &str) -> Option<TokenId> {
        self.token_to_id.get(token).copied()
    }

    /// Token string for an id, if it is in range.
    pub fn token(&self, id: TokenId) -> Option<&str> {
        self.tokens.get(id as usize).map(String::as_str)
    }

    /// Number of tokens in the vocabulary.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Returns true if the vocabulary is empty.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Iterate over `(id, token)` pairs in vocabulary order.
    pub fn iter(&self) -> impl Iterator<Item = (TokenId, &str)> + '_ {
        self.tokens
            .iter()
            .enumerate()
            .map(|(i, t)| (i as TokenId, t.as_str()))
    }
}

fn next_id(len: usize) -> Result<TokenId> {
    TokenId::try_from(len).map_err(|_| {
        ModelError::InvalidInput(format!(
            "vocabulary exceeds {} distinct tokens",
            TokenId::MAX
        ))
    })
}
