#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct MxRecord {
    pub preference: u16,
    pub exchange: String,
}

impl MxRecord {
    pub fn new(preference: u16, exchange: impl Into<String>) -> Self {
        Self {
            preference,
            exchange: exchange.into(),
        }
    }
}

/// Outcome of a single MX query, as seen by the retry state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MxAnswer {
    /// Records as returned by the server, in wire order.
    Records(Vec<MxRecord>),
    /// The domain does not exist.
    NxDomain,
    /// The domain exists but publishes no MX record.
    NoAnswer,
    /// No nameserver could answer (unreachable, SERVFAIL, REFUSED).
    NoNameservers,
    Timeout,
    Failed(String),
}

/// Outcome of the A-record fallback query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressAnswer {
    Found,
    Missing,
    Failed(String),
}

/// Extracts hostnames, keeping record order.
pub fn hosts(records: &[MxRecord]) -> Vec<String> {
    records.iter().map(|r| r.exchange.clone()).collect()
}
