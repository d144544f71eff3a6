//! Helpers shared by the Newick reader and writer.

/// Bytes that force a label to be single-quoted when written.
const QUOTE_TRIGGERS: &[char] = &[' ', ',', ';', '\t', '\n', '\r', '(', ')', ':', '[', ']', '\''];

/// Escapes a label for Newick output.
///
/// Labels containing whitespace or Newick punctuation are wrapped in single
/// quotes, doubling any quote inside.
///
/// # Example
/// ```
/// use phylocurate::parser::utils::escape_label;
///
/// assert_eq!(escape_label("Kea"), "Kea");
/// assert_eq!(escape_label("South Island Kokako"), "'South Island Kokako'");
/// assert_eq!(escape_label("Hutton's Shearwater"), "'Hutton''s Shearwater'");
/// ```
pub fn escape_label(label: &str) -> String {
    if label.chars().any(|c| QUOTE_TRIGGERS.contains(&c)) {
        format!("'{}'", label.replace('\'', "''"))
    } else {
        label.to_string()
    }
}
