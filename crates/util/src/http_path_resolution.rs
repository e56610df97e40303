//! URL template substitution for finder templates.
//!
//! Finder templates use positional `%s` placeholders, one per declared key,
//! and `%%` for a literal percent sign. Values are substituted left to right
//! and percent-encoded so that an identifier containing `/` or spaces cannot
//! change the shape of the resulting path.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use thiserror::Error;

/// Everything outside the RFC 3986 unreserved set (`A-Z a-z 0-9 - . _ ~`).
const PATH_VALUE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

/// Error raised when values cannot be substituted into a template.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("template '{template}' has {placeholders} placeholder(s) but {values} value(s) were supplied")]
    ArityMismatch {
        template: String,
        placeholders: usize,
        values: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TemplatePart<'a> {
    Literal(&'a str),
    Percent,
    Placeholder,
}

fn tokenize(template: &str) -> Vec<TemplatePart<'_>> {
    let mut parts = Vec::new();
    let mut literal_start = 0;
    let bytes = template.as_bytes();
    let mut index = 0;

    while index < bytes.len() {
        if bytes[index] == b'%' && index + 1 < bytes.len() && matches!(bytes[index + 1], b's' | b'%') {
            if literal_start < index {
                parts.push(TemplatePart::Literal(&template[literal_start..index]));
            }
            parts.push(if bytes[index + 1] == b's' {
                TemplatePart::Placeholder
            } else {
                TemplatePart::Percent
            });
            index += 2;
            literal_start = index;
        } else {
            index += 1;
        }
    }
    if literal_start < template.len() {
        parts.push(TemplatePart::Literal(&template[literal_start..]));
    }
    parts
}

/// Counts the `%s` placeholders in a template.
///
/// # Example
/// ```rust
/// use docbind_util::count_placeholders;
///
/// assert_eq!(count_placeholders("/number/%s/street/%s"), 2);
/// assert_eq!(count_placeholders("/discount/100%%/%s"), 1);
/// ```
pub fn count_placeholders(template: &str) -> usize {
    tokenize(template)
        .iter()
        .filter(|part| matches!(part, TemplatePart::Placeholder))
        .count()
}

/// Substitutes `values` into the template's placeholders, in order.
///
/// # Errors
/// Returns [`TemplateError::ArityMismatch`] when the number of values differs
/// from the number of placeholders.
///
/// # Example
/// ```rust
/// use docbind_util::substitute_placeholders;
///
/// let url = substitute_placeholders("/number/%s/street/%s", &["5", "Elm"]).unwrap();
/// assert_eq!(url, "/number/5/street/Elm");
/// ```
pub fn substitute_placeholders(template: &str, values: &[&str]) -> Result<String, TemplateError> {
    let parts = tokenize(template);
    let placeholders = parts
        .iter()
        .filter(|part| matches!(part, TemplatePart::Placeholder))
        .count();
    if placeholders != values.len() {
        return Err(TemplateError::ArityMismatch {
            template: template.to_string(),
            placeholders,
            values: values.len(),
        });
    }

    let mut url = String::with_capacity(template.len());
    let mut remaining = values.iter();
    for part in parts {
        match part {
            TemplatePart::Literal(text) => url.push_str(text),
            TemplatePart::Percent => url.push('%'),
            TemplatePart::Placeholder => {
                if let Some(value) = remaining.next() {
                    url.push_str(&encode_path_value(value));
                }
            }
        }
    }
    Ok(url)
}

/// Percent-encodes a value while preserving RFC 3986 unreserved bytes.
pub fn encode_path_value(value: &str) -> String {
    utf8_percent_encode(value, PATH_VALUE).to_string()
}
