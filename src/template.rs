//! Template renderer: interpolates named variables into text.
//!
//! The renderer is pure and explicit about its variable set — it never
//! silently ignores an unknown name. Interpolation syntax is `{{.name}}`,
//! matching the literal template strings named in the end-to-end
//! scenarios (`"{{.input}}"`).

use std::collections::BTreeMap;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum TemplateError {
    #[error("unknown template variable {0:?}")]
    #[diagnostic(
        code(chainforge::template::unknown_variable),
        help("Variables must be bound before the node that renders this template runs.")
    )]
    UnknownVariable(String),

    #[error("unterminated variable reference starting at byte {0}")]
    #[diagnostic(code(chainforge::template::unterminated))]
    Unterminated(usize),
}

/// Renders `template`, substituting each `{{.name}}` reference with the
/// stringified value of `variables[name]`. Text outside of `{{...}}`
/// markers passes through unchanged. No control flow (conditionals,
/// loops) is supported — only named substitution.
pub fn render(template: &str, variables: &BTreeMap<String, String>) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let bytes = template.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'{' && bytes.get(i + 1) == Some(&b'{') {
            let start = i;
            let close = template[i..]
                .find("}}")
                .map(|rel| i + rel)
                .ok_or(TemplateError::Unterminated(start))?;
            let mut name = &template[i + 2..close];
            name = name.strip_prefix('.').unwrap_or(name);
            let name = name.trim();
            let value = variables
                .get(name)
                .ok_or_else(|| TemplateError::UnknownVariable(name.to_string()))?;
            out.push_str(value);
            i = close + 2;
        } else {
            let ch_len = next_char_len(bytes, i);
            out.push_str(&template[i..i + ch_len]);
            i += ch_len;
        }
    }
    Ok(out)
}

fn next_char_len(bytes: &[u8], i: usize) -> usize {
    let b = bytes[i];
    if b < 0x80 {
        1
    } else if b >> 5 == 0b110 {
        2
    } else if b >> 4 == 0b1110 {
        3
    } else {
        4
    }
}
