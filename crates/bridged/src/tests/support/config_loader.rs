//! Test configuration loaders for scenarios covering success and failure paths.

use std::ffi::OsString;
use std::sync::Arc;

use bridge_config::{Config, SocketEndpoint};
use camino::Utf8PathBuf;
use ortho_config::{OrthoConfig, OrthoError};
use tempfile::TempDir;

use crate::bootstrap::ConfigLoader;

/// Loader listening on an ephemeral loopback TCP port with a fast drain tick.
#[derive(Debug, Default)]
pub struct TestConfigLoader {
    queue_limit: usize,
}

impl TestConfigLoader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Caps the deferred queue; zero leaves it unbounded.
    #[must_use]
    pub fn with_queue_limit(limit: usize) -> Self {
        Self { queue_limit: limit }
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(Config {
            daemon_socket: SocketEndpoint::tcp("127.0.0.1", 0),
            drain_interval_ms: 10,
            deferred_queue_limit: self.queue_limit,
            ..Config::default()
        })
    }
}

/// Loader that provisions a Unix socket path under a temporary directory.
pub struct UnixConfigLoader {
    socket_dir: TempDir,
}

impl UnixConfigLoader {
    #[must_use]
    pub fn new() -> Self {
        Self {
            socket_dir: TempDir::new().expect("failed to create temporary directory for socket"),
        }
    }

    /// Socket path inside a not-yet-created subdirectory.
    #[must_use]
    pub fn socket_path(&self) -> Utf8PathBuf {
        let root = Utf8PathBuf::from_path_buf(self.socket_dir.path().to_path_buf())
            .expect("temporary socket path was not valid UTF-8");
        root.join("run").join("bridged.sock")
    }
}

impl ConfigLoader for UnixConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(Config {
            daemon_socket: SocketEndpoint::unix(self.socket_path()),
            ..Config::default()
        })
    }
}

/// Loader that intentionally fails by passing invalid CLI arguments.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("bridged"),
            OsString::from("--daemon-socket"),
            OsString::from("invalid://socket"),
        ];
        Config::load_from_iter(args)
    }
}
