//! Listener endpoint for the bridge.

use std::fmt;
use std::fs::{self, DirBuilder};
use std::io;
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::defaults::DEFAULT_TCP_PORT;

/// Where the connection manager listens.
///
/// Written as `tcp://host[:port]` or `unix:///absolute/path`. A TCP endpoint
/// without a port listens on [`DEFAULT_TCP_PORT`].
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "transport", rename_all = "snake_case")]
pub enum SocketEndpoint {
    /// Unix domain socket at `path`.
    Unix { path: Utf8PathBuf },
    /// TCP listener on `host:port`.
    Tcp { host: String, port: u16 },
}

impl SocketEndpoint {
    /// Unix endpoint at `path`.
    #[must_use]
    pub fn unix(path: impl Into<Utf8PathBuf>) -> Self {
        Self::Unix { path: path.into() }
    }

    /// TCP endpoint on `host:port`. Port zero asks the OS for a free port.
    #[must_use]
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self::Tcp {
            host: host.into(),
            port,
        }
    }

    /// Socket file path, for Unix endpoints.
    #[must_use]
    pub fn unix_path(&self) -> Option<&Utf8Path> {
        if let Self::Unix { path } = self {
            Some(path.as_path())
        } else {
            None
        }
    }

    /// Creates the directory that will hold a Unix socket, owner-only on
    /// Unix platforms. TCP endpoints need nothing.
    ///
    /// # Errors
    ///
    /// Returns [`SocketPreparationError`] when the socket path has no parent,
    /// the parent exists as something other than a directory, or it cannot
    /// be created.
    pub fn prepare_filesystem(&self) -> Result<(), SocketPreparationError> {
        let Some(path) = self.unix_path() else {
            return Ok(());
        };
        let directory = path
            .parent()
            .filter(|parent| !parent.as_str().is_empty())
            .ok_or_else(|| SocketPreparationError::NoParent {
                path: path.to_owned(),
            })?;
        match fs::metadata(directory) {
            Ok(metadata) if metadata.is_dir() => Ok(()),
            Ok(_) => Err(SocketPreparationError::NotADirectory {
                path: directory.to_owned(),
            }),
            Err(error) if error.kind() == io::ErrorKind::NotFound => create_private_dir(directory),
            Err(source) => Err(SocketPreparationError::CreateDir {
                path: directory.to_owned(),
                source,
            }),
        }
    }
}

fn create_private_dir(directory: &Utf8Path) -> Result<(), SocketPreparationError> {
    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    std::os::unix::fs::DirBuilderExt::mode(&mut builder, 0o700);
    builder
        .create(directory)
        .map_err(|source| SocketPreparationError::CreateDir {
            path: directory.to_owned(),
            source,
        })
}

impl fmt::Display for SocketEndpoint {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unix { path } => write!(formatter, "unix://{path}"),
            Self::Tcp { host, port } => write!(formatter, "tcp://{host}:{port}"),
        }
    }
}

impl FromStr for SocketEndpoint {
    type Err = SocketParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let url = Url::parse(input.trim())?;
        match url.scheme() {
            "tcp" => parse_tcp(&url, input),
            "unix" => parse_unix(&url, input),
            other => Err(SocketParseError::UnsupportedScheme(other.to_owned())),
        }
    }
}

fn parse_tcp(url: &Url, input: &str) -> Result<SocketEndpoint, SocketParseError> {
    let host = url
        .host_str()
        .filter(|host| !host.is_empty())
        .ok_or_else(|| SocketParseError::MissingHost(input.to_owned()))?;
    // IPv6 literals keep their brackets in `host_str`; the resolver wants them bare.
    let host = host.trim_start_matches('[').trim_end_matches(']');
    Ok(SocketEndpoint::tcp(host, url.port().unwrap_or(DEFAULT_TCP_PORT)))
}

fn parse_unix(url: &Url, input: &str) -> Result<SocketEndpoint, SocketParseError> {
    match url.path() {
        "" | "/" => Err(SocketParseError::MissingUnixPath(input.to_owned())),
        path => Ok(SocketEndpoint::unix(path)),
    }
}

/// Errors from parsing a [`SocketEndpoint`].
#[derive(Debug, Error)]
pub enum SocketParseError {
    #[error("unsupported socket scheme '{0}', expected tcp or unix")]
    UnsupportedScheme(String),
    #[error("missing TCP host in '{0}'")]
    MissingHost(String),
    #[error("missing Unix socket path in '{0}'")]
    MissingUnixPath(String),
    #[error(transparent)]
    Url(#[from] url::ParseError),
}

/// Errors from preparing the directory of a Unix socket.
#[derive(Debug, Error)]
pub enum SocketPreparationError {
    #[error("socket path '{path}' has no parent directory")]
    NoParent { path: Utf8PathBuf },
    #[error("socket directory '{path}' exists but is not a directory")]
    NotADirectory { path: Utf8PathBuf },
    #[error("failed to create socket directory '{path}': {source}")]
    CreateDir {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
}
