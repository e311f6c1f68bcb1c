//! Forward and reverse adjacency over a wire record set.

use std::collections::HashMap;

use crate::types::{NormalizedKey, WireRecord};

/// Adjacency buckets keyed by normalized node code.
///
/// Each bucket holds record positions in input order, so iteration during
/// traversal is deterministic.
#[derive(Debug, Clone, Default)]
pub struct WireIndex {
    from: HashMap<NormalizedKey, Vec<usize>>,
    to: HashMap<NormalizedKey, Vec<usize>>,
    wire_count: usize,
}

impl WireIndex {
    /// Index every record by its `from` and `to` node.
    ///
    /// Blank node codes land in the empty-key bucket; callers never query it.
    pub fn build(records: &[WireRecord]) -> Self {
        let mut from: HashMap<NormalizedKey, Vec<usize>> = HashMap::new();
        let mut to: HashMap<NormalizedKey, Vec<usize>> = HashMap::new();

        for (position, wire) in records.iter().enumerate() {
            from.entry(wire.from_key()).or_default().push(position);
            to.entry(wire.to_key()).or_default().push(position);
        }

        Self {
            from,
            to,
            wire_count: records.len(),
        }
    }

    /// Positions of wires whose `from` side is `key`.
    pub fn outgoing(&self, key: &NormalizedKey) -> &[usize] {
        self.from.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Positions of wires whose `to` side is `key`.
    pub fn incoming(&self, key: &NormalizedKey) -> &[usize] {
        self.to.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of distinct `from` keys.
    pub fn from_len(&self) -> usize {
        self.from.len()
    }

    /// Number of distinct `to` keys.
    pub fn to_len(&self) -> usize {
        self.to.len()
    }

    pub fn wire_count(&self) -> usize {
        self.wire_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn wire(from: &str, to: &str) -> WireRecord {
        WireRecord::new(None, from, "1", to, "1")
    }

    #[test]
    fn buckets_keep_input_order() {
        let records = vec![wire("A", "B"), wire("A", "C"), wire("D", "B"), wire("a ", "E")];
        let index = WireIndex::build(&records);
        assert_eq!(index.outgoing(&NormalizedKey::new("A")), &[0, 1, 3]);
        assert_eq!(index.incoming(&NormalizedKey::new("B")), &[0, 2]);
        assert_eq!(index.from_len(), 2);
        assert_eq!(index.to_len(), 3);
        assert_eq!(index.wire_count(), 4);
    }

    #[test]
    fn case_and_whitespace_variants_share_a_bucket() {
        let records = vec![wire("ip01", "X"), wire(" IP 01", "Y"), wire("IP01", "Z")];
        let index = WireIndex::build(&records);
        assert_eq!(index.outgoing(&NormalizedKey::new("IP01")), &[0, 1, 2]);
    }

    #[test]
    fn blank_nodes_index_under_empty_key() {
        let records = vec![wire("", "B"), wire("  ", "")];
        let index = WireIndex::build(&records);
        assert_eq!(index.outgoing(&NormalizedKey::default()), &[0, 1]);
        assert_eq!(index.incoming(&NormalizedKey::default()), &[1]);
    }

    #[test]
    fn unknown_key_yields_empty_slice() {
        let index = WireIndex::build(&[]);
        assert!(index.outgoing(&NormalizedKey::new("NOPE")).is_empty());
        assert!(index.incoming(&NormalizedKey::new("NOPE")).is_empty());
        assert_eq!(index.wire_count(), 0);
    }
}
