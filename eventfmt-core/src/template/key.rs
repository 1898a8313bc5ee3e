//! Derivation of capture-slot keys for replacement fields.

use std::collections::HashMap;

use super::parser::{Conversion, FieldRef};

/// Per-pass key derivation.
///
/// A key is `name + "!" + conversion + ":" + spec`. When the same key is
/// produced again within one pass it gets `/2`, `/3`, ... appended, so a
/// field used twice in one template gets two independent slots. Build a
/// new flattener for every flatten or format call; the counts must not
/// carry over between templates.
#[derive(Debug, Default)]
pub struct KeyFlattener {
    seen: HashMap<String, usize>,
}

impl KeyFlattener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive the key for one field occurrence.
    pub fn flat_key(&mut self, name: &str, spec: &str, conversion: Conversion) -> String {
        let key = base_key(name, spec, conversion);
        let count = self.seen.entry(key.clone()).or_insert(0);
        *count += 1;
        if *count == 1 {
            key
        } else {
            format!("{key}/{count}")
        }
    }

    /// [`KeyFlattener::flat_key`] for a parsed field.
    pub fn key_for(&mut self, field: &FieldRef) -> String {
        self.flat_key(&field.name, &field.spec, field.conversion)
    }
}

/// The undisambiguated key of a field, as the first occurrence gets it.
pub fn base_key(name: &str, spec: &str, conversion: Conversion) -> String {
    format!("{name}!{}:{spec}", conversion.as_str())
}
