use std::io;
use std::time::Duration;

use tracing::{debug, warn};
use trust_dns_resolver::{
    Resolver,
    config::ResolverOpts,
    error::{ResolveError, ResolveErrorKind},
    proto::{error::ProtoErrorKind, op::ResponseCode},
    system_conf::read_system_conf,
};

use super::{AddressAnswer, Error, MxAnswer, MxRecord, hosts};

/// Retries granted on timeout, on top of the first attempt.
pub const MAX_RETRIES: u32 = 2;

/// DNS queries needed by the MX stage. Implemented by [`SystemResolver`];
/// tests plug scripted responders in instead.
pub trait DnsLookup {
    fn lookup_mx(&self, domain: &str) -> MxAnswer;
    fn lookup_a(&self, domain: &str) -> AddressAnswer;
}

/// Resolves the mail hosts of `domain` through the system resolver, most
/// preferred first. Failures of any kind produce an empty list.
pub fn resolve_mx(domain: &str, dns_timeout: Duration) -> Vec<String> {
    let lookup = system_lookup(dns_timeout);
    hosts(&resolve_mx_with(lookup.as_ref(), domain))
}

/// Builds a [`SystemResolver`]. When the host configuration cannot be read,
/// the returned lookup answers every query with a failure, so callers still
/// get an empty host list instead of an error.
pub fn system_lookup(dns_timeout: Duration) -> Box<dyn DnsLookup> {
    match SystemResolver::new(dns_timeout) {
        Ok(resolver) => Box::new(resolver),
        Err(err) => {
            warn!(error = %err, "DNS resolver unavailable");
            Box::new(UnavailableResolver {
                reason: err.to_string(),
            })
        }
    }
}

struct UnavailableResolver {
    reason: String,
}

impl DnsLookup for UnavailableResolver {
    fn lookup_mx(&self, _domain: &str) -> MxAnswer {
        MxAnswer::Failed(self.reason.clone())
    }

    fn lookup_a(&self, _domain: &str) -> AddressAnswer {
        AddressAnswer::Failed(self.reason.clone())
    }
}

/// Runs the retry/fallback policy against `lookup`.
///
/// - `Records`: sorted by preference (stable), empty exchanges dropped.
/// - `NxDomain`: stop, no fallback.
/// - `NoAnswer`: on the last allowed attempt only, fall back to an A lookup
///   and use the domain itself as the mail host.
/// - `Timeout`: retried up to [`MAX_RETRIES`] times.
/// - `NoNameservers` / `Failed`: stop with what was gathered so far.
pub fn resolve_mx_with<L>(lookup: &L, domain: &str) -> Vec<MxRecord>
where
    L: DnsLookup + ?Sized,
{
    let domain = normalize_domain(domain);
    if domain.is_empty() {
        return Vec::new();
    }

    let mut found = Vec::new();
    let mut retry = 0;
    loop {
        match lookup.lookup_mx(&domain) {
            MxAnswer::Records(records) => {
                found = order_records(records);
                debug!(%domain, count = found.len(), "MX records resolved");
                break;
            }
            MxAnswer::NxDomain => {
                debug!(%domain, "domain does not exist");
                break;
            }
            MxAnswer::NoAnswer => {
                if retry == MAX_RETRIES {
                    found = fallback_to_address(lookup, &domain);
                }
                break;
            }
            MxAnswer::NoNameservers => {
                debug!(%domain, "no nameserver answered");
                break;
            }
            MxAnswer::Timeout => {
                retry += 1;
                if retry <= MAX_RETRIES {
                    debug!(%domain, retry, "MX lookup timed out, retrying");
                    continue;
                }
                warn!(%domain, "MX lookup timed out, giving up");
                break;
            }
            MxAnswer::Failed(reason) => {
                warn!(%domain, %reason, "MX check error");
                break;
            }
        }
    }
    found
}

fn fallback_to_address<L>(lookup: &L, domain: &str) -> Vec<MxRecord>
where
    L: DnsLookup + ?Sized,
{
    match lookup.lookup_a(domain) {
        AddressAnswer::Found => {
            debug!(%domain, "no MX record, using A record as implicit MX");
            vec![MxRecord::new(0, domain)]
        }
        AddressAnswer::Missing => Vec::new(),
        AddressAnswer::Failed(reason) => {
            debug!(%domain, %reason, "A fallback failed");
            Vec::new()
        }
    }
}

pub(crate) fn order_records(records: Vec<MxRecord>) -> Vec<MxRecord> {
    let mut records: Vec<MxRecord> = records
        .into_iter()
        .map(|r| MxRecord::new(r.preference, normalize_exchange(r.exchange)))
        .filter(|r| !r.exchange.is_empty())
        .collect();
    records.sort_by_key(|r| r.preference);
    records
}

pub(crate) fn normalize_domain(domain: &str) -> String {
    domain.trim().trim_end_matches('.').to_ascii_lowercase()
}

pub(crate) fn normalize_exchange(exchange: String) -> String {
    let trimmed = exchange.trim_end_matches('.');
    trimmed.to_ascii_lowercase()
}

/// [`DnsLookup`] backed by `trust-dns-resolver`, configured from the host
/// and bounded by a per-query timeout.
pub struct SystemResolver {
    inner: Resolver,
}

impl SystemResolver {
    pub fn new(timeout: Duration) -> Result<Self, Error> {
        let (config, opts) =
            read_system_conf().map_err(|err| Error::resolver_init(io::Error::other(err)))?;
        let inner = Resolver::new(config, query_opts(opts, timeout)).map_err(Error::resolver_init)?;
        Ok(Self { inner })
    }
}

/// One attempt per query and no answer cache: every lookup reaches the
/// network.
pub(crate) fn query_opts(mut opts: ResolverOpts, timeout: Duration) -> ResolverOpts {
    opts.timeout = timeout;
    // retries are driven by `resolve_mx_with`
    opts.attempts = 1;
    opts.cache_size = 0;
    opts
}

impl DnsLookup for SystemResolver {
    fn lookup_mx(&self, domain: &str) -> MxAnswer {
        match self.inner.mx_lookup(fqdn(domain)) {
            Ok(lookup) => MxAnswer::Records(
                lookup
                    .iter()
                    .map(|mx| MxRecord::new(mx.preference(), mx.exchange().to_utf8()))
                    .collect(),
            ),
            Err(err) => classify_error(&err),
        }
    }

    fn lookup_a(&self, domain: &str) -> AddressAnswer {
        match self.inner.ipv4_lookup(fqdn(domain)) {
            Ok(lookup) if lookup.iter().next().is_some() => AddressAnswer::Found,
            Ok(_) => AddressAnswer::Missing,
            Err(err) => match classify_error(&err) {
                MxAnswer::NxDomain | MxAnswer::NoAnswer => AddressAnswer::Missing,
                _ => AddressAnswer::Failed(err.to_string()),
            },
        }
    }
}

fn fqdn(domain: &str) -> String {
    format!("{domain}.")
}

pub(crate) fn classify_error(err: &ResolveError) -> MxAnswer {
    match err.kind() {
        ResolveErrorKind::NoRecordsFound { response_code, .. } => answer_for_code(*response_code),
        ResolveErrorKind::NoConnections => MxAnswer::NoNameservers,
        ResolveErrorKind::Timeout => MxAnswer::Timeout,
        ResolveErrorKind::Io(io_err) if io_err.kind() == io::ErrorKind::TimedOut => {
            MxAnswer::Timeout
        }
        ResolveErrorKind::Proto(proto) if matches!(proto.kind(), ProtoErrorKind::Timeout) => {
            MxAnswer::Timeout
        }
        _ => MxAnswer::Failed(err.to_string()),
    }
}

pub(crate) fn answer_for_code(code: ResponseCode) -> MxAnswer {
    match code {
        ResponseCode::NXDomain => MxAnswer::NxDomain,
        ResponseCode::ServFail | ResponseCode::Refused => MxAnswer::NoNameservers,
        _ => MxAnswer::NoAnswer,
    }
}
