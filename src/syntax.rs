//! Conservative address syntax check (RFC 5321 subset, ASCII only).

use std::sync::LazyLock;

use regex::Regex;

pub const MAX_ADDRESS_LEN: usize = 254;
pub const MAX_LOCAL_LEN: usize = 64;

static ADDRESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+",
        r"@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?",
        r"(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*",
        r"\.[a-zA-Z]{2,}$",
    ))
    .expect("address pattern compiles")
});

/// Splits on the last `@`. Returns `None` when there is no `@`.
pub fn split_address(address: &str) -> Option<(&str, &str)> {
    address.rsplit_once('@')
}

/// Returns `true` when `address` (trimmed) passes the length limits and the
/// address pattern. Never panics.
pub fn is_valid_syntax(address: &str) -> bool {
    let input = address.trim();
    if input.is_empty() || input.chars().count() > MAX_ADDRESS_LEN {
        return false;
    }

    let Some((local, domain)) = split_address(input) else {
        return false;
    };
    if local.chars().count() > MAX_LOCAL_LEN || !domain.contains('.') {
        return false;
    }

    ADDRESS_RE.is_match(input)
}
