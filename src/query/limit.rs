//! Limit injector.
//!
//! A textual transform, not a parser: any whole-word `limit` token anywhere in
//! the statement (a subquery, a string literal, a column alias) counts as an
//! existing cap and the statement is forwarded as written.

/// Clamp a requested row count into `[1, hard_cap]`.
pub fn clamp_limit(requested: i64, hard_cap: u32) -> u32 {
    let cap = i64::from(hard_cap.max(1));
    // within [1, cap] so the cast is lossless
    requested.clamp(1, cap) as u32
}

/// Whether the text contains `limit` as a whole word, in any case.
pub fn has_limit(query: &str) -> bool {
    query
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .any(|token| token.eq_ignore_ascii_case("limit"))
}

/// Append ` LIMIT n` unless the statement already carries a limit.
pub fn apply_limit(query: &str, requested: i64, hard_cap: u32) -> String {
    if has_limit(query) {
        return query.to_string();
    }
    let body = query.trim_end_matches(|c: char| c.is_whitespace() || c == ';');
    format!("{body} LIMIT {}", clamp_limit(requested, hard_cap))
}
