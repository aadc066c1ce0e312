//! Unique label numbering.
//!
//! Each output artifact owns one allocator; counters never repeat within it
//! and start over only when a new allocator is created.

use std::collections::HashMap;

#[derive(Debug, Default, Clone)]
pub struct LabelAllocator {
    counters: HashMap<&'static str, u32>,
}

impl LabelAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next number in `namespace`, starting at 0.
    pub fn next(&mut self, namespace: &'static str) -> u32 {
        let counter = self.counters.entry(namespace).or_insert(0);
        let n = *counter;
        *counter += 1;
        n
    }
}
