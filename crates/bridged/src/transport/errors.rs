//! Listener failures.

use std::io;

use thiserror::Error;

/// Errors raised while binding an endpoint or running its accept loop.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The TCP host name could not be resolved.
    #[error("could not resolve {endpoint}: {source}")]
    Resolve {
        endpoint: String,
        #[source]
        source: io::Error,
    },
    /// Resolution succeeded but produced no address.
    #[error("{endpoint} resolved to no addresses")]
    NoAddress { endpoint: String },
    /// The operating system refused the bind.
    #[error("failed to bind {endpoint}: {source}")]
    Bind {
        endpoint: String,
        #[source]
        source: io::Error,
    },
    /// The bound socket could not be switched to non-blocking mode.
    #[error("failed to configure listener for {endpoint}: {source}")]
    Configure {
        endpoint: String,
        #[source]
        source: io::Error,
    },
    #[cfg(not(unix))]
    #[error("{endpoint} needs Unix domain sockets, which this platform lacks")]
    UnixUnsupported { endpoint: String },
    /// Another process is already listening on the socket path.
    #[cfg(unix)]
    #[error("socket {path} is served by another process")]
    SocketInUse { path: String },
    #[cfg(unix)]
    #[error("{path} exists and is not a socket")]
    NotASocket { path: String },
    /// A leftover socket file could not be inspected or removed.
    #[cfg(unix)]
    #[error("failed to reclaim stale socket {path}: {source}")]
    StaleSocket {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to spawn accept thread: {source}")]
    Spawn {
        #[source]
        source: io::Error,
    },
    #[error("accept thread panicked")]
    AcceptPanic,
}
