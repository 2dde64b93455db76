//! Stream abstraction shared by the listener and connection sessions.

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};

#[cfg(unix)]
use std::os::unix::net::UnixStream;

/// Stream types accepted by the bridge listener.
pub(crate) enum ConnectionStream {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
}

impl Read for ConnectionStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(stream) => stream.read(buf),
            #[cfg(unix)]
            Self::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for ConnectionStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(stream) => stream.write(buf),
            #[cfg(unix)]
            Self::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Tcp(stream) => stream.flush(),
            #[cfg(unix)]
            Self::Unix(stream) => stream.flush(),
        }
    }
}

impl ConnectionStream {
    /// Opens a second handle onto the same socket.
    pub(crate) fn try_clone(&self) -> io::Result<Self> {
        match self {
            Self::Tcp(stream) => stream.try_clone().map(Self::Tcp),
            #[cfg(unix)]
            Self::Unix(stream) => stream.try_clone().map(Self::Unix),
        }
    }

    /// Shuts down both halves, unblocking any reader on another handle.
    pub(crate) fn shutdown(&self) -> io::Result<()> {
        let result = match self {
            Self::Tcp(stream) => stream.shutdown(Shutdown::Both),
            #[cfg(unix)]
            Self::Unix(stream) => stream.shutdown(Shutdown::Both),
        };
        match result {
            Err(error) if error.kind() == io::ErrorKind::NotConnected => Ok(()),
            other => other,
        }
    }
}

/// Handles accepted socket connections.
pub(crate) trait ConnectionHandler: Send + Sync + 'static {
    /// Handles a single connection. Implementations should avoid panicking.
    fn handle(&self, stream: ConnectionStream);
}

#[cfg(test)]
mod tests {
    use std::io::{BufRead, BufReader};
    use std::net::TcpListener;
    use std::thread;

    use super::*;

    fn connected_pair() -> (ConnectionStream, TcpStream) {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind listener");
        let addr = listener.local_addr().expect("listener address");
        let client = thread::spawn(move || TcpStream::connect(addr).expect("connect client"));
        let (server, _) = listener.accept().expect("accept connection");
        (
            ConnectionStream::Tcp(server),
            client.join().expect("join client"),
        )
    }

    #[test]
    fn clones_share_the_socket() {
        let (server, client) = connected_pair();
        let mut writer = server.try_clone().expect("clone stream");
        writer.write_all(b"hello\n").expect("write");
        writer.flush().expect("flush");

        let mut line = String::new();
        BufReader::new(client).read_line(&mut line).expect("read line");
        assert_eq!(line, "hello\n");
    }

    #[test]
    fn shutdown_unblocks_a_reader_on_another_handle() {
        let (server, _client) = connected_pair();
        let mut reader = server.try_clone().expect("clone stream");
        let blocked = thread::spawn(move || {
            let mut buf = [0_u8; 8];
            reader.read(&mut buf)
        });
        server.shutdown().expect("shutdown");
        let read = blocked.join().expect("join reader").unwrap_or(0);
        assert_eq!(read, 0);
        server.shutdown().expect("second shutdown is harmless");
    }
}
