//! extract.rs — Deterministic location/date extraction and phrase normalization.
//!
//! Runs before the model sees anything. The depot's LOKASI column holds
//! several spellings per site, so a mention of a canonical key ("Jakarta")
//! expands to every configured alias, while a mention of one specific alias
//! narrows the filter to that alias alone.

use regex::Regex;

use crate::config::LocationEntry;

lazy_static::lazy_static! {
    // DD/MM/YYYY only; dash-separated dates are not recognized.
    static ref DATE_PATTERN: Regex = Regex::new(r"\b\d{1,2}/\d{1,2}/\d{4}\b")
        .expect("date pattern is a valid regex");
}

/// Static alias table. Entries are checked in declaration order and matching
/// is case-insensitive; returned aliases keep their configured spelling.
#[derive(Debug, Clone)]
pub struct LocationTable {
    entries: Vec<FoldedEntry>,
}

#[derive(Debug, Clone)]
struct FoldedEntry {
    key: String,
    aliases: Vec<String>,
    folded_key: String,
    folded_aliases: Vec<String>,
}

impl LocationTable {
    pub fn new(entries: &[LocationEntry]) -> Self {
        let entries = entries
            .iter()
            .map(|e| FoldedEntry {
                key: e.key.clone(),
                aliases: e.aliases.clone(),
                folded_key: fold(&e.key),
                folded_aliases: e.aliases.iter().map(|a| fold(a)).collect(),
            })
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Location clause for the query phrase, or `None` when nothing matches.
    ///
    /// 1. the whole input is a key: all of its aliases;
    /// 2. otherwise, per entry in order: an alias found in the input wins
    ///    alone, then the key found in the input yields all its aliases.
    pub fn extract_location(&self, text: &str) -> Option<String> {
        let folded = fold(text);
        let whole = folded.trim();

        if let Some(entry) = self.entries.iter().find(|e| e.folded_key == whole) {
            return Some(quote_all(&entry.aliases));
        }

        for entry in &self.entries {
            if let Some(i) = entry
                .folded_aliases
                .iter()
                .position(|a| !a.is_empty() && folded.contains(a.as_str()))
            {
                return Some(quote(&entry.aliases[i]));
            }
            if !entry.folded_key.is_empty() && folded.contains(entry.folded_key.as_str()) {
                return Some(quote_all(&entry.aliases));
            }
        }

        None
    }
}

fn fold(s: &str) -> String {
    s.to_uppercase()
}

fn quote(alias: &str) -> String {
    format!("'{}'", alias)
}

fn quote_all(aliases: &[String]) -> String {
    aliases.iter().map(|a| quote(a)).collect::<Vec<_>>().join(" & ")
}

/// First `D/M/YYYY`-shaped token in the text.
pub fn extract_date(text: &str) -> Option<String> {
    DATE_PATTERN.find(text).map(|m| m.as_str().to_string())
}

/// Canonical filter phrase handed to the query model.
///
/// When neither a location nor a date is found the raw input is dropped
/// into the LOKASI template as-is. Downstream queries built from that are
/// usually wrong; the branch is kept until the expected behaviour is settled.
pub fn preprocess_input(locations: &LocationTable, text: &str) -> String {
    let location = locations.extract_location(text);
    let date = extract_date(text);

    match (location, date) {
        (Some(loc), Some(date)) => {
            format!("Tampilkan data di 'LOKASI' = {} dan 'TGL. STATUS' = {}", loc, date)
        }
        (Some(loc), None) => format!("Tampilkan data di 'LOKASI' = {}", loc),
        (None, Some(date)) => format!("Tampilkan data dengan 'TGL. STATUS' = {}", date),
        (None, None) => format!("tampilkan data di 'LOKASI' = {}", text),
    }
}
