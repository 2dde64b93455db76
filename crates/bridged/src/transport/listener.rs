//! Endpoint binding and the accept loop.
//!
//! The accept loop polls a non-blocking listener so that a stop request is
//! noticed within one backoff interval, and gives every accepted client its
//! own session thread.

use std::io;
use std::net::{SocketAddr, TcpListener, ToSocketAddrs};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, warn};

use bridge_config::SocketEndpoint;

use super::{ConnectionHandler, ConnectionStream, LISTENER_TARGET, ListenerError};

#[cfg(unix)]
use std::os::unix::net::UnixListener;

const IDLE_POLL: Duration = Duration::from_millis(25);
const FAILURE_BACKOFF: Duration = Duration::from_millis(150);

enum Acceptor {
    Tcp(TcpListener),
    #[cfg(unix)]
    Unix(UnixListener),
}

impl Acceptor {
    fn set_nonblocking(&self) -> io::Result<()> {
        match self {
            Self::Tcp(listener) => listener.set_nonblocking(true),
            #[cfg(unix)]
            Self::Unix(listener) => listener.set_nonblocking(true),
        }
    }

    /// Accepts one pending client, or `None` when nobody is waiting.
    fn poll(&self) -> io::Result<Option<ConnectionStream>> {
        let accepted = match self {
            Self::Tcp(listener) => listener.accept().and_then(|(stream, _)| {
                stream.set_nonblocking(false)?;
                Ok(ConnectionStream::Tcp(stream))
            }),
            #[cfg(unix)]
            Self::Unix(listener) => listener.accept().and_then(|(stream, _)| {
                stream.set_nonblocking(false)?;
                Ok(ConnectionStream::Unix(stream))
            }),
        };
        match accepted {
            Ok(stream) => Ok(Some(stream)),
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(error) => Err(error),
        }
    }
}

/// A bound endpoint that is not yet accepting.
pub(crate) struct BoundEndpoint {
    endpoint: SocketEndpoint,
    acceptor: Acceptor,
}

impl BoundEndpoint {
    /// Binds `endpoint`, reclaiming a stale Unix socket file if one is left
    /// over from an earlier run.
    pub(crate) fn bind(endpoint: &SocketEndpoint) -> Result<Self, ListenerError> {
        let acceptor = match endpoint {
            SocketEndpoint::Tcp { host, port } => Acceptor::Tcp(bind_tcp(endpoint, host, *port)?),
            #[cfg(unix)]
            SocketEndpoint::Unix { path } => {
                Acceptor::Unix(unix_path::bind(endpoint, path.as_std_path())?)
            }
            #[cfg(not(unix))]
            SocketEndpoint::Unix { .. } => {
                return Err(ListenerError::UnixUnsupported {
                    endpoint: endpoint.to_string(),
                });
            }
        };
        Ok(Self {
            endpoint: endpoint.clone(),
            acceptor,
        })
    }

    /// Bound TCP address. Unix endpoints have none.
    pub(crate) fn local_addr(&self) -> Option<SocketAddr> {
        match &self.acceptor {
            Acceptor::Tcp(listener) => listener.local_addr().ok(),
            #[cfg(unix)]
            Acceptor::Unix(_) => None,
        }
    }

    /// Starts the accept loop on a background thread.
    pub(crate) fn spawn(self, handler: Arc<dyn ConnectionHandler>) -> Result<AcceptLoop, ListenerError> {
        if let Err(source) = self.acceptor.set_nonblocking() {
            self.release();
            return Err(ListenerError::Configure {
                endpoint: self.endpoint.to_string(),
                source,
            });
        }
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let thread = thread::Builder::new()
            .name("bridged-accept".to_owned())
            .spawn(move || self.accept_until(&flag, &handler))
            .map_err(|source| ListenerError::Spawn { source })?;
        Ok(AcceptLoop {
            stop,
            thread: Some(thread),
        })
    }

    fn accept_until(self, stop: &AtomicBool, handler: &Arc<dyn ConnectionHandler>) {
        info!(target: LISTENER_TARGET, endpoint = %self.endpoint, "accepting clients");
        let mut sessions = 0_u64;
        let mut throttle = FailureThrottle::default();
        while !stop.load(Ordering::SeqCst) {
            match self.acceptor.poll() {
                Ok(Some(stream)) => {
                    throttle.reset();
                    sessions += 1;
                    spawn_session(sessions, stream, Arc::clone(handler));
                }
                Ok(None) => thread::sleep(IDLE_POLL),
                Err(error) => {
                    if throttle.first_of_kind(error.kind()) {
                        warn!(target: LISTENER_TARGET, %error, "accept failed");
                    }
                    thread::sleep(FAILURE_BACKOFF);
                }
            }
        }
        self.release();
        debug!(target: LISTENER_TARGET, endpoint = %self.endpoint, "accept loop exited");
    }

    fn release(&self) {
        #[cfg(unix)]
        if let SocketEndpoint::Unix { path } = &self.endpoint {
            unix_path::remove(path.as_std_path());
        }
    }
}

fn spawn_session(session: u64, stream: ConnectionStream, handler: Arc<dyn ConnectionHandler>) {
    let spawned = thread::Builder::new()
        .name(format!("bridged-session-{session}"))
        .spawn(move || handler.handle(stream));
    if let Err(error) = spawned {
        warn!(target: LISTENER_TARGET, session, %error, "could not start session thread");
    }
}

/// Suppresses repeats of the same accept failure until an accept succeeds.
#[derive(Default)]
struct FailureThrottle {
    last: Option<io::ErrorKind>,
}

impl FailureThrottle {
    fn first_of_kind(&mut self, kind: io::ErrorKind) -> bool {
        self.last.replace(kind) != Some(kind)
    }

    fn reset(&mut self) {
        self.last = None;
    }
}

/// Running accept loop. Dropping it asks the loop to stop without waiting.
pub(crate) struct AcceptLoop {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl AcceptLoop {
    /// Stops accepting and waits for the loop to exit.
    pub(crate) fn stop(mut self) -> Result<(), ListenerError> {
        self.stop.store(true, Ordering::SeqCst);
        match self.thread.take().map(JoinHandle::join) {
            Some(Err(_)) => Err(ListenerError::AcceptPanic),
            Some(Ok(())) | None => Ok(()),
        }
    }
}

impl Drop for AcceptLoop {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}

fn bind_tcp(endpoint: &SocketEndpoint, host: &str, port: u16) -> Result<TcpListener, ListenerError> {
    let addr = (host, port)
        .to_socket_addrs()
        .map_err(|source| ListenerError::Resolve {
            endpoint: endpoint.to_string(),
            source,
        })?
        .next()
        .ok_or_else(|| ListenerError::NoAddress {
            endpoint: endpoint.to_string(),
        })?;
    TcpListener::bind(addr).map_err(|source| ListenerError::Bind {
        endpoint: endpoint.to_string(),
        source,
    })
}

#[cfg(unix)]
mod unix_path {
    //! Ownership checks for Unix socket paths.

    use std::fs;
    use std::io;
    use std::os::unix::fs::FileTypeExt;
    use std::os::unix::net::{UnixListener, UnixStream};
    use std::path::Path;

    use bridge_config::SocketEndpoint;
    use tracing::{debug, warn};

    use super::{LISTENER_TARGET, ListenerError};

    enum PathState {
        Vacant,
        /// A socket file nobody is listening on.
        Stale,
        Live,
        NotASocket,
    }

    fn inspect(path: &Path) -> io::Result<PathState> {
        let metadata = match fs::symlink_metadata(path) {
            Ok(metadata) => metadata,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(PathState::Vacant),
            Err(error) => return Err(error),
        };
        if !metadata.file_type().is_socket() {
            return Ok(PathState::NotASocket);
        }
        match UnixStream::connect(path) {
            Ok(_) => Ok(PathState::Live),
            Err(error)
                if matches!(
                    error.kind(),
                    io::ErrorKind::ConnectionRefused | io::ErrorKind::NotFound
                ) =>
            {
                Ok(PathState::Stale)
            }
            Err(error) => Err(error),
        }
    }

    pub(super) fn bind(endpoint: &SocketEndpoint, path: &Path) -> Result<UnixListener, ListenerError> {
        let display = || path.display().to_string();
        let stale = |source| ListenerError::StaleSocket {
            path: display(),
            source,
        };
        match inspect(path).map_err(stale)? {
            PathState::Vacant => {}
            PathState::Stale => {
                debug!(target: LISTENER_TARGET, path = %path.display(), "removing stale socket");
                fs::remove_file(path).map_err(stale)?;
            }
            PathState::Live => return Err(ListenerError::SocketInUse { path: display() }),
            PathState::NotASocket => return Err(ListenerError::NotASocket { path: display() }),
        }
        UnixListener::bind(path).map_err(|source| ListenerError::Bind {
            endpoint: endpoint.to_string(),
            source,
        })
    }

    pub(super) fn remove(path: &Path) {
        match fs::remove_file(path) {
            Ok(()) => {}
            Err(error) if error.kind() == io::ErrorKind::NotFound => {}
            Err(error) => warn!(
                target: LISTENER_TARGET,
                path = %path.display(),
                %error,
                "could not remove socket file"
            ),
        }
    }
}
