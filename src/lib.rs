//! Wait for a TCP port to become free or occupied.
//!
//! Useful when supervising a server process: block until a freshly started
//! server accepts connections, or until a stopped one has released its port.
//!
//! ```no_run
//! use std::time::Duration;
//!
//! portend::wait_for_occupied_port("0.0.0.0", 8080, Duration::from_secs(5))?;
//! # Ok::<(), portend::Error>(())
//! ```

mod config;
mod error;
mod host;
mod probe;
mod wait;

pub use config::Settings;
pub use error::{Error, Result};
pub use host::{client_host, parse_port};
pub use probe::{
    Candidate, Family, PortState, Prober, check_port, is_connection_failure, is_unknown_name,
    probe_port, resolve_candidates, synthetic_candidate,
};
pub use wait::{WaitTimeout, Waiter, wait_for_free_port, wait_for_occupied_port};
