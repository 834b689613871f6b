//! Immutable text pools with random selection.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::{BotError, BotResult};

/// A non-empty list of strings loaded once and picked from at random.
#[derive(Debug, Clone)]
pub struct TextPool {
    kind: &'static str,
    items: Vec<String>,
}

impl TextPool {
    /// Builds a pool named `kind` (used in errors and logs).
    ///
    /// Fails with `BotError::EmptyPool` when `items` is empty, since a reply
    /// could never be composed from it.
    pub fn new(kind: &'static str, items: Vec<String>) -> BotResult<Self> {
        if items.is_empty() {
            return Err(BotError::EmptyPool(kind));
        }
        Ok(Self { kind, items })
    }

    /// Returns a uniformly random element.
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> &str {
        self.items
            .choose(rng)
            .map(String::as_str)
            // Non-empty by construction.
            .unwrap_or_default()
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }
}
