// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Input neutralization for user-supplied text.
//!
//! Stored text is HTML-escaped so it can be rendered by any client without
//! injecting markup. Search terms go through the same escaping (so they match
//! stored text) and then have SQL `LIKE` wildcards escaped; the values are
//! always bound as parameters.

const MAX_URL_LEN: usize = 2048;

/// Escape the five HTML-significant characters.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Single-line text (titles, names): trimmed, control characters removed.
pub fn clean_line(input: &str) -> String {
    escape_html(
        &input
            .trim()
            .chars()
            .filter(|c| !c.is_control())
            .collect::<String>(),
    )
}

/// Multi-line text (descriptions): newlines and tabs survive.
pub fn clean_text(input: &str) -> String {
    let normalized = input.replace("\r\n", "\n");
    escape_html(
        &normalized
            .trim()
            .chars()
            .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
            .collect::<String>(),
    )
}

/// `LIKE` pattern matching `term` anywhere, using `\` as the escape character.
pub fn like_pattern(term: &str) -> String {
    let cleaned = clean_line(term);
    let mut pattern = String::with_capacity(cleaned.len() + 2);
    pattern.push('%');
    for c in cleaned.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Relative URL of a locally stored upload, or an absolute http(s) URL.
pub fn is_acceptable_url(url: &str) -> bool {
    let url = url.trim();
    if url.is_empty()
        || url.len() > MAX_URL_LEN
        || url.chars().any(|c| c.is_whitespace() || c.is_control())
    {
        return false;
    }
    if let Some(rest) = url.strip_prefix("/uploads/") {
        return !rest.is_empty() && !rest.contains("..") && !rest.contains('/');
    }
    url.starts_with("https://") || url.starts_with("http://")
}
