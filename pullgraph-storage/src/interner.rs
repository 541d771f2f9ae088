//! Name interner - maps label and relationship type names to dense u32 ids.
//!
//! - `s2i`: HashMap for O(1) string → ID lookup
//! - `i2s`: Vec for O(1) ID → string lookup

use std::collections::HashMap;

#[derive(Debug, Default, Clone)]
pub struct Interner {
    s2i: HashMap<String, u32>,
    i2s: Vec<String>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the ID for a name, returning None if not found.
    #[inline]
    pub fn get_id(&self, name: &str) -> Option<u32> {
        self.s2i.get(name).copied()
    }

    /// Get the name for an ID, returning None if not found.
    #[inline]
    pub fn get_name(&self, id: u32) -> Option<&str> {
        self.i2s.get(id as usize).map(|s| s.as_str())
    }

    /// Get or create a name, returning the existing or new ID.
    pub fn get_or_create(&mut self, name: &str) -> u32 {
        if let Some(id) = self.s2i.get(name) {
            return *id;
        }

        let id = self.i2s.len() as u32;
        self.s2i.insert(name.to_string(), id);
        self.i2s.push(name.to_string());
        id
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.i2s.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.i2s.is_empty()
    }
}
