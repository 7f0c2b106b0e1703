use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::host::require_host;
use crate::probe::{PortState, Prober};

/// How long a wait call may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaitTimeout {
    Bounded(Duration),
    #[default]
    Unbounded,
}

impl WaitTimeout {
    /// Convert a seconds value; positive infinity means unbounded.
    pub fn from_secs_f64(secs: f64) -> Result<Self> {
        if secs == f64::INFINITY {
            return Ok(WaitTimeout::Unbounded);
        }
        Duration::try_from_secs_f64(secs)
            .map(WaitTimeout::Bounded)
            .map_err(|_| Error::InvalidArgument(format!("invalid timeout: {secs} seconds")))
    }

    fn is_exhausted(&self, elapsed: Duration) -> bool {
        match self {
            WaitTimeout::Bounded(limit) => elapsed >= *limit,
            WaitTimeout::Unbounded => false,
        }
    }
}

impl From<Duration> for WaitTimeout {
    fn from(timeout: Duration) -> Self {
        WaitTimeout::Bounded(timeout)
    }
}

impl From<Option<Duration>> for WaitTimeout {
    fn from(timeout: Option<Duration>) -> Self {
        timeout.map_or(WaitTimeout::Unbounded, WaitTimeout::Bounded)
    }
}

/// Polls a port until it reaches the desired state.
#[derive(Debug, Clone, Default)]
pub struct Waiter {
    settings: Settings,
}

impl Waiter {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Single probe with the configured check timeout; see [`Prober::check`].
    pub fn check(&self, host: &str, port: u16) -> Result<()> {
        self.prober(self.settings.check_timeout()).check(host, port)
    }

    /// Block until nothing accepts connections on `host:port`.
    pub fn wait_for_free(
        &self,
        host: &str,
        port: u16,
        timeout: impl Into<WaitTimeout>,
    ) -> Result<()> {
        let prober = self.prober(self.settings.free_probe_timeout());
        self.wait_for(&prober, host, port, timeout.into(), PortState::Free)
    }

    /// Block until something accepts connections on `host:port`.
    pub fn wait_for_occupied(
        &self,
        host: &str,
        port: u16,
        timeout: impl Into<WaitTimeout>,
    ) -> Result<()> {
        let prober = self.prober(self.settings.occupied_probe_timeout());
        self.wait_for(&prober, host, port, timeout.into(), PortState::Occupied)
    }

    fn prober(&self, timeout: Duration) -> Prober {
        Prober::new(timeout).resolver_fallback(self.settings.resolver_fallback)
    }

    fn wait_for(
        &self,
        prober: &Prober,
        host: &str,
        port: u16,
        timeout: WaitTimeout,
        want: PortState,
    ) -> Result<()> {
        require_host(host)?;

        let start = Instant::now();
        let mut attempts = 0u64;
        while !timeout.is_exhausted(start.elapsed()) {
            attempts = attempts.saturating_add(1);
            let state = prober.probe(host, port)?;
            trace!(%host, port, attempt = attempts, ?state, "probed");
            if state == want {
                debug!(
                    %host,
                    port,
                    ?state,
                    attempts,
                    elapsed = ?start.elapsed(),
                    "port reached state"
                );
                return Ok(());
            }
            thread::sleep(self.settings.poll_interval());
        }

        debug!(%host, port, ?want, attempts, ?timeout, "gave up waiting");
        Err(Error::Timeout {
            host: host.to_string(),
            port,
            state: want,
        })
    }
}

/// Wait for `host:port` to stop accepting connections, using default polling.
pub fn wait_for_free_port(host: &str, port: u16, timeout: impl Into<WaitTimeout>) -> Result<()> {
    Waiter::default().wait_for_free(host, port, timeout)
}

/// Wait for `host:port` to start accepting connections, using default polling.
pub fn wait_for_occupied_port(
    host: &str,
    port: u16,
    timeout: impl Into<WaitTimeout>,
) -> Result<()> {
    Waiter::default().wait_for_occupied(host, port, timeout)
}
