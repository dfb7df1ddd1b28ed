//! The named output table produced at the end of synthesis.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::SynthError;
use crate::types::AttrValue;

/// One exported value: a stable key, a value resolved at declare time, and a
/// human-facing description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputEntry {
    pub key: String,
    pub value: AttrValue,
    pub description: String,
}

/// The flat output mapping for one synthesis pass. Keys are unique; a second
/// export under the same key is an internal builder defect, not a silent
/// overwrite.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Outputs {
    entries: BTreeMap<String, OutputEntry>,
}

impl Outputs {
    pub fn new() -> Self {
        Outputs::default()
    }

    pub fn export(
        &mut self,
        key: &str,
        value: AttrValue,
        description: &str,
    ) -> Result<(), SynthError> {
        if self.entries.contains_key(key) {
            return Err(SynthError::DuplicateOutput(key.to_string()));
        }
        self.entries.insert(
            key.to_string(),
            OutputEntry {
                key: key.to_string(),
                value,
                description: description.to_string(),
            },
        );
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&OutputEntry> {
        self.entries.get(key)
    }

    /// Fetch an entry a later consumer depends on; absence is a
    /// `MissingOutput` defect.
    pub fn require(&self, key: &str) -> Result<&OutputEntry, SynthError> {
        self.entries
            .get(key)
            .ok_or_else(|| SynthError::MissingOutput(key.to_string()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &OutputEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_and_require() {
        let mut outputs = Outputs::new();
        outputs
            .export("cluster-name", AttrValue::from("acme-cluster"), "Cluster name")
            .unwrap();

        assert_eq!(
            outputs.require("cluster-name").unwrap().value,
            AttrValue::from("acme-cluster")
        );
        assert_eq!(
            outputs.require("service-name"),
            Err(SynthError::MissingOutput("service-name".to_string()))
        );
    }

    #[test]
    fn test_duplicate_key_is_rejected() {
        let mut outputs = Outputs::new();
        outputs
            .export("vpc-id", AttrValue::from("first"), "VPC id")
            .unwrap();
        assert_eq!(
            outputs.export("vpc-id", AttrValue::from("second"), "VPC id"),
            Err(SynthError::DuplicateOutput("vpc-id".to_string()))
        );
        // The first export survives untouched.
        assert_eq!(outputs.require("vpc-id").unwrap().value, AttrValue::from("first"));
    }

    #[test]
    fn test_keys_iterate_in_stable_order() {
        let mut outputs = Outputs::new();
        outputs.export("b", AttrValue::from(1i64), "").unwrap();
        outputs.export("a", AttrValue::from(2i64), "").unwrap();
        assert_eq!(outputs.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
