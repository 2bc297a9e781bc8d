use phf::phf_set;

/// Providers known to hand out throwaway inboxes.
static DISPOSABLE_DOMAINS: phf::Set<&'static str> = phf_set! {
    "mailinator.com",
    "tempmail.com",
    "throwawaymail.com",
    "guerrillamail.com",
    "10minutemail.com",
    "yopmail.com",
    "tempinbox.com",
    "sharklasers.com",
};

/// Checks `domain` against the built-in list. Case and a trailing dot are
/// ignored.
pub fn is_disposable_domain(domain: &str) -> bool {
    let normalized = domain.trim().trim_end_matches('.').to_ascii_lowercase();
    DISPOSABLE_DOMAINS.contains(normalized.as_str())
}
