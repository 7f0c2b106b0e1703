use std::io;
use std::net::{IpAddr, SocketAddr, TcpStream};
use std::time::Duration;

use dns_lookup::{AddrInfoHints, LookupErrorKind, SockType};
use tracing::debug;

use crate::error::{Error, Result};
use crate::host::{client_host, require_host};

/// Outcome of a single probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortState {
    /// Every candidate refused or failed to connect.
    Free,
    /// At least one candidate accepted a connection.
    Occupied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    V4,
    V6,
}

/// One address to attempt a connection against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidate {
    Address(SocketAddr),
    /// Fallback for a host the resolver could not look up and that is not an
    /// IP literal either; there is nothing to connect to.
    Unresolvable { family: Family },
}

impl Candidate {
    pub fn family(&self) -> Family {
        match self {
            Candidate::Address(SocketAddr::V4(_)) => Family::V4,
            Candidate::Address(SocketAddr::V6(_)) => Family::V6,
            Candidate::Unresolvable { family } => *family,
        }
    }
}

/// Resolve `host:port` to stream candidates across every address family the
/// resolver returns, in resolver order.
///
/// When `fallback` is set and the resolver reports the name as unknown, a
/// single synthetic candidate is produced instead of an error (see
/// [`synthetic_candidate`]). Every other resolver failure is unexpected.
pub fn resolve_candidates(host: &str, port: u16, fallback: bool) -> Result<Vec<Candidate>> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(vec![Candidate::Address(SocketAddr::new(ip, port))]);
    }

    let unexpected = |source: io::Error| Error::Unexpected {
        host: host.to_string(),
        port,
        source,
    };
    let hints = AddrInfoHints {
        socktype: SockType::Stream.into(),
        ..AddrInfoHints::default()
    };
    match dns_lookup::getaddrinfo(Some(host), Some(&port.to_string()), Some(hints)) {
        Ok(infos) => infos
            .map(|info| info.map(|info| Candidate::Address(info.sockaddr)).map_err(&unexpected))
            .collect(),
        Err(err) if fallback && is_unknown_name(err.kind()) => {
            let candidate = synthetic_candidate(host, port);
            debug!(
                %host,
                port,
                error = ?err,
                ?candidate,
                "name not known, probing literal address"
            );
            Ok(vec![candidate])
        }
        Err(err) => Err(unexpected(err.into())),
    }
}

/// Resolver failures that mean the name does not exist, as opposed to the
/// resolver itself being unavailable or misconfigured.
pub fn is_unknown_name(kind: LookupErrorKind) -> bool {
    matches!(kind, LookupErrorKind::NoName | LookupErrorKind::NoData)
}

/// Build the single candidate used when the resolver cannot look up `host`.
///
/// A colon in `host` selects IPv6, anything else IPv4.
pub fn synthetic_candidate(host: &str, port: u16) -> Candidate {
    let family = if host.contains(':') {
        Family::V6
    } else {
        Family::V4
    };
    let literal = host.trim_start_matches('[').trim_end_matches(']');
    match literal.parse::<IpAddr>() {
        Ok(ip @ IpAddr::V4(_)) if family == Family::V4 => {
            Candidate::Address(SocketAddr::new(ip, port))
        }
        Ok(ip @ IpAddr::V6(_)) if family == Family::V6 => {
            Candidate::Address(SocketAddr::new(ip, port))
        }
        _ => Candidate::Unresolvable { family },
    }
}

/// Whether a connect error means "nothing is listening there" rather than a
/// fault in the probe itself.
pub fn is_connection_failure(err: &io::Error) -> bool {
    use io::ErrorKind::*;

    matches!(
        err.kind(),
        ConnectionRefused
            | TimedOut
            | ConnectionReset
            | ConnectionAborted
            | HostUnreachable
            | NetworkUnreachable
            | NetworkDown
            | AddrNotAvailable
    ) || err.raw_os_error().is_some_and(is_connection_failure_code)
}

#[cfg(unix)]
fn is_connection_failure_code(code: i32) -> bool {
    matches!(
        code,
        libc::ECONNREFUSED
            | libc::ETIMEDOUT
            | libc::ENETUNREACH
            | libc::EHOSTUNREACH
            | libc::ENETDOWN
            | libc::EHOSTDOWN
            | libc::EADDRNOTAVAIL
            | libc::EAFNOSUPPORT
    )
}

#[cfg(not(unix))]
fn is_connection_failure_code(_code: i32) -> bool {
    false
}

/// Single-shot probe policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prober {
    timeout: Duration,
    resolver_fallback: bool,
}

impl Default for Prober {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl Prober {
    /// `timeout` bounds each individual connect attempt.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            resolver_fallback: true,
        }
    }

    pub fn resolver_fallback(mut self, enabled: bool) -> Self {
        self.resolver_fallback = enabled;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Connect once to every candidate `host:port` resolves to.
    ///
    /// Wildcard hosts are probed through their loopback counterpart. Stops at
    /// the first candidate that accepts; each socket is closed before moving on.
    pub fn probe(&self, host: &str, port: u16) -> Result<PortState> {
        require_host(host)?;
        if self.timeout.is_zero() {
            return Err(Error::InvalidArgument(
                "probe timeout must be greater than zero".to_string(),
            ));
        }
        let host = client_host(host);

        for candidate in resolve_candidates(host, port, self.resolver_fallback)? {
            let addr = match candidate {
                Candidate::Address(addr) => addr,
                Candidate::Unresolvable { family } => {
                    debug!(%host, port, ?family, "no connectable address, treating as free");
                    continue;
                }
            };
            match TcpStream::connect_timeout(&addr, self.timeout) {
                Ok(stream) => {
                    drop(stream);
                    debug!(%host, %addr, "connection accepted");
                    return Ok(PortState::Occupied);
                }
                Err(err) if is_connection_failure(&err) => {
                    debug!(%host, %addr, error = %err, "connection failed");
                }
                Err(source) => {
                    return Err(Error::Unexpected {
                        host: host.to_string(),
                        port,
                        source,
                    });
                }
            }
        }
        Ok(PortState::Free)
    }

    /// Like [`Prober::probe`], but an occupied port is reported as
    /// [`Error::PortInUse`].
    pub fn check(&self, host: &str, port: u16) -> Result<()> {
        match self.probe(host, port)? {
            PortState::Free => Ok(()),
            PortState::Occupied => Err(Error::PortInUse {
                host: client_host(host).to_string(),
                port,
            }),
        }
    }
}

pub fn probe_port(host: &str, port: u16, timeout: Duration) -> Result<PortState> {
    Prober::new(timeout).probe(host, port)
}

/// Fail with [`Error::PortInUse`] if anything accepts connections on
/// `host:port`; return normally if the port is free.
pub fn check_port(host: &str, port: u16, timeout: Duration) -> Result<()> {
    Prober::new(timeout).check(host, port)
}
