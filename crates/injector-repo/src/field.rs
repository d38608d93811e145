//! Fixed-width field parsing.
//!
//! Repository and schedule files are line oriented: the value of a line is
//! the token in its first eight columns. Repository fields are always eight
//! hex digits. Schedule fields are decimal and may be shorter. Anything
//! after the token must be separated by whitespace.

use std::fmt;

/// Width of a field token in columns.
pub const FIELD_WIDTH: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Hex,
    Decimal,
    SignedDecimal,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FieldKind::Hex => "hex",
            FieldKind::Decimal => "decimal",
            FieldKind::SignedDecimal => "signed decimal",
        })
    }
}

/// A token that does not fit its field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub kind: FieldKind,
    pub token: String,
}

impl FieldError {
    fn new(kind: FieldKind, token: &str) -> Self {
        Self {
            kind,
            token: token.to_string(),
        }
    }
}

/// Split off the leading token: everything up to the first whitespace.
fn leading_token(line: &str) -> &str {
    let line = line.trim_end();
    match line.find(char::is_whitespace) {
        Some(end) => &line[..end],
        None => line,
    }
}

/// Exactly eight hex digits.
pub fn parse_hex(line: &str) -> Result<u32, FieldError> {
    let token = leading_token(line);
    if token.len() != FIELD_WIDTH || !token.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(FieldError::new(FieldKind::Hex, token));
    }
    u32::from_str_radix(token, 16).map_err(|_| FieldError::new(FieldKind::Hex, token))
}

/// One to eight decimal digits.
pub fn parse_decimal(line: &str) -> Result<u32, FieldError> {
    let token = leading_token(line);
    if token.is_empty() || token.len() > FIELD_WIDTH || !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(FieldError::new(FieldKind::Decimal, token));
    }
    token
        .parse()
        .map_err(|_| FieldError::new(FieldKind::Decimal, token))
}

/// Decimal with an optional leading minus sign, eight columns at most.
pub fn parse_signed(line: &str) -> Result<i32, FieldError> {
    let token = leading_token(line);
    let digits = token.strip_prefix('-').unwrap_or(token);
    if digits.is_empty()
        || token.len() > FIELD_WIDTH
        || !digits.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(FieldError::new(FieldKind::SignedDecimal, token));
    }
    token
        .parse()
        .map_err(|_| FieldError::new(FieldKind::SignedDecimal, token))
}

/// Render a value as a repository field.
pub fn format_hex(value: u32) -> String {
    format!("{value:08x}")
}
