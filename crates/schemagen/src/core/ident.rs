//! Identifier handling: snake-case derivation of physical names and
//! validation of identifiers that end up in emitted SQL.
//!
//! Identifiers cannot be parameterized in SQL, so everything that flows into
//! a statement is validated here before any file is rendered.

use crate::error::{GeneratorError, Result};

/// Maximum identifier length (conservative limit across databases).
/// - PostgreSQL: 63 bytes
/// - MariaDB: 64 characters
const MAX_IDENTIFIER_LENGTH: usize = 63;

/// Convert a field or class name to its snake_case physical name.
///
/// Handles camelCase, PascalCase and acronym runs: `orderId` -> `order_id`,
/// `HTTPStatus` -> `http_status`, `userID` -> `user_id`.
pub fn to_snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev_lower = i > 0 && chars[i - 1].is_lowercase();
            let prev_digit = i > 0 && chars[i - 1].is_ascii_digit();
            let next_lower = chars.get(i + 1).map(|n| n.is_lowercase()).unwrap_or(false);
            if i > 0 && (prev_lower || prev_digit || (next_lower && chars[i - 1].is_uppercase())) {
                out.push('_');
            }
            for lc in c.to_lowercase() {
                out.push(lc);
            }
        } else {
            out.push(c);
        }
    }

    out
}

/// Validate an identifier before it is rendered into SQL.
///
/// Rejects empty identifiers, identifiers containing characters outside
/// `[A-Za-z0-9_]`, identifiers starting with a digit, and identifiers
/// exceeding the maximum length.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(GeneratorError::Config(
            "Identifier cannot be empty".to_string(),
        ));
    }

    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(GeneratorError::Config(format!(
            "Identifier exceeds maximum length of {} bytes (got {} bytes): {:?}",
            MAX_IDENTIFIER_LENGTH,
            name.len(),
            name
        )));
    }

    let mut chars = name.chars();
    let first = chars.next().unwrap();
    if !(first.is_ascii_alphabetic() || first == '_') {
        return Err(GeneratorError::Config(format!(
            "Identifier must start with a letter or underscore: {:?}",
            name
        )));
    }

    if let Some(bad) = name.chars().find(|c| !(c.is_ascii_alphanumeric() || *c == '_')) {
        return Err(GeneratorError::Config(format!(
            "Identifier contains invalid character {:?}: {:?}",
            bad, name
        )));
    }

    Ok(())
}
