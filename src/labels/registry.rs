// Label Registry - Known addresses and their attribution labels

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A display label attached to an address
///
/// Custodial is an explicit property decided when the registry is built,
/// not something derived from the display name at query time. Custodial
/// addresses (exchange deposit wallets, bridges) pool funds from many
/// parties, so provenance cannot be traced through them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    name: String,
    custodial: bool,
}

impl Label {
    /// A regular, traceable label
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            custodial: false,
        }
    }

    /// A custodial label: tracing stops here with no attribution
    pub fn custodial(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            custodial: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_custodial(&self) -> bool {
        self.custodial
    }
}

/// Address -> label lookup used by tracing and reporting
#[derive(Clone, Debug, Default)]
pub struct LabelRegistry {
    labels: HashMap<Address, Label>,
}

impl LabelRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            labels: HashMap::new(),
        }
    }

    /// Build a registry from (address, name) pairs, deriving the custodial
    /// flag once from a keyword contained in the name (case-insensitive)
    pub fn with_keyword<I, S>(entries: I, keyword: &str) -> Self
    where
        I: IntoIterator<Item = (Address, S)>,
        S: Into<String>,
    {
        let keyword = keyword.to_lowercase();
        let mut registry = Self::new();
        for (address, name) in entries {
            let name = name.into();
            let custodial = !keyword.is_empty() && name.to_lowercase().contains(&keyword);
            let label = if custodial {
                Label::custodial(name)
            } else {
                Label::new(name)
            };
            registry.insert(address, label);
        }
        registry
    }

    pub fn insert(&mut self, address: Address, label: Label) {
        self.labels.insert(address, label);
    }

    pub fn get(&self, address: &Address) -> Option<&Label> {
        self.labels.get(address)
    }

    /// Display name for an address, if labeled
    pub fn label_name(&self, address: &Address) -> Option<&str> {
        self.labels.get(address).map(|l| l.name())
    }

    pub fn is_labeled(&self, address: &Address) -> bool {
        self.labels.contains_key(address)
    }

    pub fn is_custodial(&self, address: &Address) -> bool {
        self.labels
            .get(address)
            .map(|l| l.is_custodial())
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Address, &Label)> {
        self.labels.iter()
    }

    /// Normalize a label to its base form for grouping
    ///
    /// Looks for the longest registered label that is a proper prefix of
    /// `name` at a separator boundary (space or hyphen), case-insensitively,
    /// so "Vesting - tranche 2" groups under a registered "Vesting". Returns
    /// the name itself when nothing matches.
    pub fn base_name(&self, name: &str) -> String {
        let trimmed = name.trim();
        let lower = trimmed.to_lowercase();

        let mut candidates: Vec<&str> = self
            .labels
            .values()
            .map(|l| l.name().trim())
            .filter(|l| !l.is_empty())
            .collect();
        candidates.sort_by(|a, b| b.len().cmp(&a.len()));

        for base in candidates {
            let base_lower = base.to_lowercase();
            if lower == base_lower {
                continue;
            }
            if let Some(rest) = lower.strip_prefix(&base_lower) {
                match rest.chars().next() {
                    Some(' ') | Some('-') | None => return base.to_string(),
                    _ => {}
                }
            }
        }
        trimmed.to_string()
    }
}
