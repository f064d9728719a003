//! Command name to payload lookup.
//!
//! Each bed model ships a fixed table of symbolic command names and the raw
//! bytes its controller expects. The table is built once and never changes;
//! a lookup either yields the payload or `None`. Missing names are a normal
//! outcome here, not an error.
//!
//! Names are matched loosely so MQTT clients can publish either the vendor
//! spelling or a snake_case variant:
//!
//! ```rust
//! use mqtt_bed::CommandTable;
//!
//! static ENTRIES: &[(&str, &[u8])] = &[("Head Up", &[0x0B, 0x00])];
//! let table = CommandTable::new(ENTRIES);
//!
//! assert_eq!(table.lookup("Head Up"), Some(&[0x0B, 0x00][..]));
//! assert_eq!(table.lookup("head_up"), Some(&[0x0B, 0x00][..]));
//! assert_eq!(table.lookup("  HEAD-UP "), Some(&[0x0B, 0x00][..]));
//! assert_eq!(table.lookup("head"), None);
//! ```

use std::collections::HashMap;

/// Normalize a command name for matching.
///
/// Trims, lowercases, treats `_` and `-` as spaces and collapses runs of
/// whitespace.
pub fn normalize_name(name: &str) -> String {
    name.split(|c: char| c.is_whitespace() || c == '_' || c == '-')
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Read-only mapping from command name to payload.
#[derive(Clone, Debug)]
pub struct CommandTable {
    entries: &'static [(&'static str, &'static [u8])],
    index: HashMap<String, usize>,
}

impl CommandTable {
    /// Build a table from static `(name, payload)` pairs.
    ///
    /// If two names normalize to the same key, the first one wins.
    pub fn new(entries: &'static [(&'static str, &'static [u8])]) -> Self {
        let mut index = HashMap::with_capacity(entries.len());
        for (i, (name, _)) in entries.iter().enumerate() {
            index.entry(normalize_name(name)).or_insert(i);
        }
        Self { entries, index }
    }

    /// Look up the payload for a command name.
    pub fn lookup(&self, name: &str) -> Option<&'static [u8]> {
        self.index
            .get(&normalize_name(name))
            .map(|&i| self.entries[i].1)
    }

    /// Canonical (vendor) spelling of a command, if known.
    pub fn canonical_name(&self, name: &str) -> Option<&'static str> {
        self.index
            .get(&normalize_name(name))
            .map(|&i| self.entries[i].0)
    }

    /// Returns true if the name resolves to a payload.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(&normalize_name(name))
    }

    /// Canonical command names in table order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(name, _)| *name)
    }

    /// Number of commands.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the table has no commands.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Payload width shared by every command, or `None` if widths differ
    /// or the table is empty.
    pub fn payload_width(&self) -> Option<usize> {
        let first = self.entries.first()?.1.len();
        self.entries
            .iter()
            .all(|(_, payload)| payload.len() == first)
            .then_some(first)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static ENTRIES: &[(&str, &[u8])] = &[
        ("Flat Preset", &[0x01, 0x02]),
        ("Lift Head", &[0x03, 0x04]),
        ("Keepalive NOOP", &[0x00, 0x00]),
    ];

    #[test]
    fn normalize_variants() {
        assert_eq!(normalize_name("Flat Preset"), "flat preset");
        assert_eq!(normalize_name("flat_preset"), "flat preset");
        assert_eq!(normalize_name("FLAT-PRESET"), "flat preset");
        assert_eq!(normalize_name("  flat   preset\n"), "flat preset");
        assert_eq!(normalize_name(""), "");
    }

    #[test]
    fn lookup_known() {
        let table = CommandTable::new(ENTRIES);
        assert_eq!(table.lookup("Lift Head"), Some(&[0x03, 0x04][..]));
        assert_eq!(table.lookup("lift_head"), Some(&[0x03, 0x04][..]));
        assert_eq!(table.canonical_name("keepalive_noop"), Some("Keepalive NOOP"));
    }

    #[test]
    fn lookup_unknown() {
        let table = CommandTable::new(ENTRIES);
        assert_eq!(table.lookup("Lower Head"), None);
        assert_eq!(table.lookup(""), None);
        assert!(!table.contains("lift"));
    }

    #[test]
    fn names_in_order() {
        let table = CommandTable::new(ENTRIES);
        let names: Vec<_> = table.names().collect();
        assert_eq!(names, ["Flat Preset", "Lift Head", "Keepalive NOOP"]);
        assert_eq!(table.len(), 3);
        assert!(!table.is_empty());
    }

    #[test]
    fn payload_width_uniform_and_mixed() {
        assert_eq!(CommandTable::new(ENTRIES).payload_width(), Some(2));

        static MIXED: &[(&str, &[u8])] = &[("a", &[0x01]), ("b", &[0x01, 0x02])];
        assert_eq!(CommandTable::new(MIXED).payload_width(), None);

        static EMPTY: &[(&str, &[u8])] = &[];
        assert_eq!(CommandTable::new(EMPTY).payload_width(), None);
    }

    #[test]
    fn duplicate_normalized_names_keep_first() {
        static DUPES: &[(&str, &[u8])] = &[("Head Up", &[0x01]), ("head_up", &[0x02])];
        let table = CommandTable::new(DUPES);
        assert_eq!(table.lookup("HEAD UP"), Some(&[0x01][..]));
    }
}
