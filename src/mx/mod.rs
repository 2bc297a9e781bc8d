//! DNS MX discovery with bounded retry and an A-record fallback.
//!
//! The public entry point is [`resolve_mx`], which performs synchronous
//! lookups with the system resolver and never fails: every resolver error is
//! folded into an empty (or partial) host list.

mod error;
mod resolver;
mod types;

pub use error::MxError as Error;
pub use resolver::{
    DnsLookup, MAX_RETRIES, SystemResolver, resolve_mx, resolve_mx_with, system_lookup,
};
pub use types::{AddressAnswer, MxAnswer, MxRecord, hosts};
