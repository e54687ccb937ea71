//! Identifier helpers
//! ------------------
//! Single source of truth for statement ids (`<namespace>.<local id>`), column-name matching
//! and SQL identifier normalization.

pub const DEFAULT_NAMESPACE: &str = "default";

/// Normalize an identifier according to SQL rules:
/// - If enclosed in double-quotes, strip quotes and preserve case
/// - Otherwise, convert to lowercase for case-insensitive matching
pub fn normalize_identifier(ident: &str) -> String {
    let trimmed = ident.trim();
    if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
        trimmed[1..trimmed.len()-1].to_string()
    } else {
        trimmed.to_ascii_lowercase()
    }
}

/// Key used for case-insensitive column lookups (result maps precompute these).
pub fn column_key(column: &str) -> String { column.trim().to_ascii_uppercase() }

/// Namespace part of a statement id: everything before the last '.'.
pub fn namespace_of(statement_id: &str) -> &str {
    match statement_id.rfind('.') {
        Some(idx) if idx > 0 => &statement_id[..idx],
        _ => DEFAULT_NAMESPACE,
    }
}
