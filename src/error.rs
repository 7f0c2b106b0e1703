use std::io;

use crate::probe::PortState;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Rejected before any socket or timer activity.
    #[error("{0}")]
    InvalidArgument(String),

    /// A resolved candidate accepted the connection.
    #[error(
        "Port {port} is in use on {host}; perhaps the previous server did not shut down properly."
    )]
    PortInUse { host: String, port: u16 },

    /// A socket or resolver failure outside the "connection failed" class.
    #[error("unexpected I/O error probing {host}:{port}: {source}")]
    Unexpected {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// Settings could not be read, parsed or serialized.
    #[error(transparent)]
    Config(#[from] anyhow::Error),

    /// The wait deadline elapsed before `state` was observed.
    #[error("Port {port} not {} on {host}", state_word(.state))]
    Timeout {
        host: String,
        port: u16,
        state: PortState,
    },
}

fn state_word(state: &PortState) -> &'static str {
    match state {
        PortState::Free => "free",
        PortState::Occupied => "bound",
    }
}

impl Error {
    pub(crate) fn empty_host() -> Self {
        Error::InvalidArgument("Host values of '' or None are not allowed.".to_string())
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }

    pub fn is_port_in_use(&self) -> bool {
        matches!(self, Error::PortInUse { .. })
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Error::InvalidArgument(_))
    }
}
