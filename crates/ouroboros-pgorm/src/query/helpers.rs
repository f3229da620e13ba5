//! Identifier and placeholder helpers shared by the DDL generator and the
//! statement builders.

use crate::{OrmError, Result};
use unicode_normalization::UnicodeNormalization;

/// Quotes a SQL identifier.
///
/// Handles schema-qualified names by quoting each part separately.
pub fn quote_identifier(name: &str) -> String {
    if name.contains('.') {
        name.split('.')
            .map(|part| format!("\"{}\"", part))
            .collect::<Vec<_>>()
            .join(".")
    } else {
        format!("\"{}\"", name)
    }
}

/// Validates a SQL identifier (table/column name).
///
/// Supports both simple identifiers and schema-qualified names (e.g., "public.users").
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(OrmError::Configuration("Identifier cannot be empty".to_string()));
    }

    if name.contains('.') {
        let parts: Vec<&str> = name.split('.').collect();

        // Only allow schema.table format (two parts)
        if parts.len() != 2 {
            return Err(OrmError::Configuration(format!(
                "Invalid schema-qualified identifier '{}': must be in format 'schema.table'",
                name
            )));
        }

        for part in parts {
            validate_identifier_part(part)?;
        }

        return Ok(());
    }

    validate_identifier_part(name)
}

/// Validates a single part of an identifier (no dots allowed).
pub fn validate_identifier_part(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(OrmError::Configuration("Identifier part cannot be empty".to_string()));
    }

    // Stored names are compared byte-wise, so confusable spellings such as
    // full-width letters must not slip through as distinct identifiers.
    let normalized = name.nfkc().collect::<String>();
    if normalized != name {
        return Err(OrmError::Configuration(format!(
            "Identifier '{}' is not in NFKC form (did you mean '{}'?)",
            name, normalized
        )));
    }

    // PostgreSQL limit is 63 bytes per part
    if name.len() > 63 {
        return Err(OrmError::Configuration(format!(
            "Identifier '{}' exceeds maximum length of 63",
            name
        )));
    }

    let first_char = name.chars().next().ok_or_else(|| {
        OrmError::Configuration(format!("Identifier '{}' is empty or invalid", name))
    })?;
    if !first_char.is_ascii_alphabetic() && first_char != '_' {
        return Err(OrmError::Configuration(format!(
            "Identifier '{}' must start with a letter or underscore",
            name
        )));
    }

    for ch in name.chars() {
        if !ch.is_ascii_alphanumeric() && ch != '_' {
            return Err(OrmError::Configuration(format!(
                "Identifier '{}' contains invalid character '{}'",
                name, ch
            )));
        }
    }

    let name_lower = name.to_lowercase();
    if name_lower.starts_with("pg_") {
        return Err(OrmError::Configuration(format!(
            "Identifier '{}' uses the reserved pg_ prefix",
            name
        )));
    }

    if name_lower == "information_schema" {
        return Err(OrmError::Configuration(
            "information_schema cannot be used as an identifier".to_string(),
        ));
    }

    Ok(())
}

/// Converts a type-style name to a table name: `UserProfile` -> `user_profile`.
///
/// Acronyms stay together: `HTTPLog` -> `http_log`.
pub fn normalise_name(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, &ch) in chars.iter().enumerate() {
        if ch.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).map(|c| c.is_lowercase()).unwrap_or(false);
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower) {
                out.push('_');
            }
        }
        out.extend(ch.to_lowercase());
    }

    out
}

/// Adjusts parameter indices in SQL by adding an offset.
///
/// Used to renumber a raw fragment's `$1..$k` behind the placeholders that
/// precede it in the statement. Quoted literals, quoted identifiers,
/// dollar-quoted bodies and comments are copied untouched.
pub fn adjust_param_indices(sql: &str, offset: usize) -> String {
    if offset == 0 {
        return sql.to_string();
    }
    scan_placeholders(sql, offset).0
}

/// Highest `$N` placeholder in `sql`, 0 if there is none.
///
/// `$N` inside literals, quoted identifiers or comments does not count.
pub fn max_placeholder(sql: &str) -> usize {
    scan_placeholders(sql, 0).1
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b >= 0x80
}

/// Copies `sql` while shifting every positional placeholder by `offset`.
///
/// Returns the rewritten text and the highest placeholder seen before the
/// shift. Only ASCII delimiters are matched, so slicing stays on char
/// boundaries.
fn scan_placeholders(sql: &str, offset: usize) -> (String, usize) {
    let bytes = sql.as_bytes();
    let mut out = String::with_capacity(sql.len() + 8);
    let mut max = 0;
    let mut copied = 0;
    let mut i = 0;

    while i < bytes.len() {
        let prev_is_ident = i > 0 && is_ident_byte(bytes[i - 1]);
        match bytes[i] {
            b'\'' => {
                // E'...' strings honour backslash escapes.
                let escapes = i > 0
                    && matches!(bytes[i - 1], b'e' | b'E')
                    && !(i > 1 && is_ident_byte(bytes[i - 2]));
                i += 1;
                while i < bytes.len() {
                    match bytes[i] {
                        b'\\' if escapes => i += 2,
                        b'\'' => {
                            i += 1;
                            break;
                        }
                        _ => i += 1,
                    }
                }
            }
            b'"' => {
                i += 1;
                while i < bytes.len() && bytes[i] != b'"' {
                    i += 1;
                }
                i += 1;
            }
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let mut depth = 1;
                i += 2;
                while i < bytes.len() && depth > 0 {
                    if bytes[i] == b'/' && bytes.get(i + 1) == Some(&b'*') {
                        depth += 1;
                        i += 2;
                    } else if bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/') {
                        depth -= 1;
                        i += 2;
                    } else {
                        i += 1;
                    }
                }
            }
            b'$' if !prev_is_ident => {
                let start = i + 1;
                let mut end = start;
                while end < bytes.len() && bytes[end].is_ascii_digit() {
                    end += 1;
                }
                if end > start {
                    let num: usize = sql[start..end].parse().unwrap_or(0);
                    max = max.max(num);
                    out.push_str(&sql[copied..i]);
                    out.push('$');
                    out.push_str(&(num + offset).to_string());
                    copied = end;
                    i = end;
                    continue;
                }

                // $tag$ ... $tag$
                while end < bytes.len() && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_') {
                    end += 1;
                }
                if bytes.get(end) == Some(&b'$') {
                    let tag = &sql[i..=end];
                    i = match sql[end + 1..].find(tag) {
                        Some(pos) => end + 1 + pos + tag.len(),
                        None => bytes.len(),
                    };
                } else {
                    i += 1;
                }
            }
            _ => i += 1,
        }
    }

    out.push_str(&sql[copied.min(sql.len())..]);
    (out, max)
}
