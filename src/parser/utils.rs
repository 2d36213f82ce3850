//! Utility functions for label escaping in Newick strings.
//!
//! Names are written verbatim when they contain no Newick punctuation and
//! single quoted otherwise, so that they read back unchanged.

/// Characters that force a label to be quoted.
const SPECIAL_CHARS: &[char] = &[' ', ',', ';', '\t', '\n', '\r', '(', ')', ':', '[', ']', '\''];

/// Checks if a label can be written without quotes.
///
/// # Examples
/// ```
/// # use dlcrecon::parser::utils::is_plain;
/// assert!(is_plain("Pukeko"));
/// assert!(is_plain("Australasian_Swamphen"));
/// assert!(!is_plain("Pu[ke]ko"));
/// assert!(!is_plain("Australasian Swamphen"));
/// assert!(!is_plain(""));
/// ```
pub fn is_plain(label: &str) -> bool {
    !label.is_empty() && !label.contains(SPECIAL_CHARS)
}

/// Escapes a label for use in a Newick string.
///
/// Labels containing special characters (punctuation, delimiters, spaces) are
/// wrapped in single quotes and internal single quotes are doubled.
///
/// # Examples
/// ```
/// # use dlcrecon::parser::utils::escape_label;
/// assert_eq!(escape_label("Pukeko"), "Pukeko");
/// assert_eq!(escape_label("Pu[ke]ko"), "'Pu[ke]ko'");
/// assert_eq!(escape_label("Australasian Swamphen"), "'Australasian Swamphen'");
/// assert_eq!(escape_label("Baillon's Crake"), "'Baillon''s Crake'");
/// ```
pub fn escape_label(label: &str) -> String {
    if is_plain(label) {
        label.to_string()
    } else {
        format!("'{}'", label.replace('\'', "''"))
    }
}
