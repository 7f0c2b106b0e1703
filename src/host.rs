use crate::error::{Error, Result};

/// Return the host a same-machine client should connect to in order to reach
/// a listener bound on `server_host`.
///
/// Wildcard binds are not connectable themselves, so they map to loopback:
/// `0.0.0.0` (INADDR_ANY) becomes `127.0.0.1`, and `::` along with the
/// non-canonical `::0` and `::0.0.0.0` (IN6ADDR_ANY) become `::1`. Every other
/// host is returned unchanged.
pub fn client_host(server_host: &str) -> &str {
    match server_host {
        "0.0.0.0" => "127.0.0.1",
        "::" | "::0" | "::0.0.0.0" => "::1",
        other => other,
    }
}

/// Coerce a textual port into a `u16`.
pub fn parse_port(port: &str) -> Result<u16> {
    port.trim()
        .parse()
        .map_err(|_| Error::InvalidArgument(format!("invalid port: {:?}", port)))
}

pub(crate) fn require_host(host: &str) -> Result<()> {
    if host.is_empty() {
        return Err(Error::empty_host());
    }
    Ok(())
}
