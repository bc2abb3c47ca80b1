//! Bypassed effect parameters
//!
//! Entries are `"EFFECT-PARAMETER"` keys. Outside export, ranges whose key
//! is in the set are skipped entirely: no scheduling, no unit creation.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BypassSet {
    entries: BTreeSet<String>,
}

impl BypassSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, effect: &str, parameter: &str) {
        self.entries.insert(format!("{}-{}", effect, parameter));
    }

    /// Insert an already-joined `"EFFECT-PARAMETER"` key
    pub fn insert_key(&mut self, key: impl Into<String>) {
        self.entries.insert(key.into());
    }

    pub fn contains(&self, effect: &str, parameter: &str) -> bool {
        self.entries.contains(&format!("{}-{}", effect, parameter))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for BypassSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(Into::into).collect(),
        }
    }
}
