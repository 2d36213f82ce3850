//! Gene-to-species mapping.
//!
//! - [Gene2Species]: maps gene leaf names to species leaf names, by exact
//!   name or by `prefix*` / `*suffix` patterns.

use crate::error::{ReconError, Result};
use std::collections::HashMap;
use std::fmt;

// =#========================================================================#=
// GENE TO SPECIES MAP
// =#========================================================================#=
/// Maps gene names to species names.
///
/// Exact entries take precedence over patterns. Among patterns, the longest
/// matching one wins; equally long patterns are resolved by insertion order.
///
/// # Example
/// ```
/// use dlcrecon::model::Gene2Species;
///
/// let mut g2s = Gene2Species::new();
/// g2s.insert("human_*", "HUMAN");
/// g2s.insert("*_mm", "MOUSE");
/// g2s.insert("chimp1", "CHIMP");
///
/// assert_eq!(g2s.species_of("human_a"), Some("HUMAN"));
/// assert_eq!(g2s.species_of("gene7_mm"), Some("MOUSE"));
/// assert_eq!(g2s.species_of("chimp1"), Some("CHIMP"));
/// assert_eq!(g2s.species_of("dog1"), None);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Gene2Species {
    /// Exact gene names
    exact: HashMap<String, String>,
    /// `prefix*` patterns, stored without the `*`
    prefixes: Vec<(String, String)>,
    /// `*suffix` patterns, stored without the `*`
    suffixes: Vec<(String, String)>,
}

impl Gene2Species {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a map from exact `(gene, species)` pairs.
    pub fn from_pairs<I, G, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (G, S)>,
        G: Into<String>,
        S: Into<String>,
    {
        let mut map = Self::new();
        for (gene, species) in pairs {
            map.insert(gene, species);
        }
        map
    }

    /// Inserts a gene name or pattern.
    ///
    /// A trailing `*` makes a prefix pattern, a leading `*` a suffix pattern.
    pub fn insert(&mut self, pattern: impl Into<String>, species: impl Into<String>) {
        let pattern = pattern.into();
        let species = species.into();
        if let Some(prefix) = pattern.strip_suffix('*') {
            self.prefixes.push((prefix.to_string(), species));
        } else if let Some(suffix) = pattern.strip_prefix('*') {
            self.suffixes.push((suffix.to_string(), species));
        } else {
            self.exact.insert(pattern, species);
        }
    }

    /// Parses a species map: one `pattern species` pair per line, separated
    /// by a tab or whitespace. Empty lines and lines starting with `#` are skipped.
    pub fn from_smap(text: &str) -> Result<Self> {
        let mut map = Self::new();
        for (line_number, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut fields = line.split_whitespace();
            match (fields.next(), fields.next(), fields.next()) {
                (Some(pattern), Some(species), None) => map.insert(pattern, species),
                _ => {
                    return Err(ReconError::format(format!(
                        "species map line {}: expected two columns, found {:?}",
                        line_number + 1,
                        line
                    )));
                }
            }
        }
        Ok(map)
    }

    /// Returns the species for a gene name, if any entry matches.
    pub fn species_of(&self, gene: &str) -> Option<&str> {
        if let Some(species) = self.exact.get(gene) {
            return Some(species);
        }

        let mut best: Option<(usize, &str)> = None;
        let prefix_hits = self
            .prefixes
            .iter()
            .filter(|(prefix, _)| gene.starts_with(prefix.as_str()));
        let suffix_hits = self
            .suffixes
            .iter()
            .filter(|(suffix, _)| gene.ends_with(suffix.as_str()));
        for (pattern, species) in prefix_hits.chain(suffix_hits) {
            if best.is_none_or(|(len, _)| pattern.len() > len) {
                best = Some((pattern.len(), species));
            }
        }
        best.map(|(_, species)| species)
    }

    /// Returns the number of entries (exact names and patterns).
    pub fn len(&self) -> usize {
        self.exact.len() + self.prefixes.len() + self.suffixes.len()
    }

    /// Returns `true` if the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for Gene2Species {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut exact: Vec<_> = self.exact.iter().collect();
        exact.sort();
        for (gene, species) in exact {
            writeln!(f, "{gene}\t{species}")?;
        }
        for (prefix, species) in &self.prefixes {
            writeln!(f, "{prefix}*\t{species}")?;
        }
        for (suffix, species) in &self.suffixes {
            writeln!(f, "*{suffix}\t{species}")?;
        }
        Ok(())
    }
}
