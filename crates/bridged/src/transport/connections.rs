//! Connection manager: client sessions, the connection table, and delivery
//! of decoded requests to a [`MessageSink`].

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bridge_config::SocketEndpoint;
use tracing::{debug, info, warn};

use super::framing::{FrameReader, MAX_FRAME_BYTES};
use super::listener::{AcceptLoop, BoundEndpoint};
use super::{ConnectionHandler, ConnectionStream, LISTENER_TARGET, ListenerError};
use crate::dispatch::{
    AutomationRequest, ConnectionHandle, ConnectionId, DispatchError, ResponseChannel,
    ResponseEnvelope, ResponseWriter, recover_request_id,
};

/// Receiver of decoded requests.
pub trait MessageSink: Send + Sync {
    /// Called once per decoded request, on the session thread that read it.
    fn on_message(&self, request: AutomationRequest, connection: ConnectionHandle);

    /// Called when a line cannot be decoded. `request_id` is empty when it
    /// could not be recovered from the line.
    fn on_decode_error(&self, request_id: &str, error: &DispatchError, connection: &ConnectionHandle) {
        connection.send(&ResponseEnvelope::failure(
            request_id,
            error.to_string(),
            error.error_code(),
        ));
    }
}

/// Write side of one client connection.
struct StreamChannel {
    id: ConnectionId,
    writer: Mutex<ResponseWriter<ConnectionStream>>,
    control: ConnectionStream,
}

impl StreamChannel {
    fn close(&self) {
        if let Err(error) = self.control.shutdown() {
            debug!(
                target: LISTENER_TARGET,
                connection = self.id,
                error = %error,
                "socket shutdown failed"
            );
        }
    }
}

impl ResponseChannel for StreamChannel {
    fn deliver(&self, envelope: &ResponseEnvelope) -> bool {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        match writer.write_envelope(envelope) {
            Ok(()) => true,
            Err(error) => {
                debug!(
                    target: LISTENER_TARGET,
                    connection = self.id,
                    error = %error,
                    "response write failed"
                );
                false
            }
        }
    }
}

/// Live connections keyed by id. Owns the only strong references to each
/// [`StreamChannel`].
#[derive(Default)]
struct ConnectionTable {
    next_id: AtomicU64,
    live: Mutex<HashMap<ConnectionId, Arc<StreamChannel>>>,
}

impl ConnectionTable {
    fn register(&self, stream: ConnectionStream) -> io::Result<(Arc<StreamChannel>, ConnectionStream)> {
        let writer = stream.try_clone()?;
        let control = stream.try_clone()?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let channel = Arc::new(StreamChannel {
            id,
            writer: Mutex::new(ResponseWriter::new(writer)),
            control,
        });
        self.lock().insert(id, Arc::clone(&channel));
        Ok((channel, stream))
    }

    fn remove(&self, id: ConnectionId) {
        self.lock().remove(&id);
    }

    fn len(&self) -> usize {
        self.lock().len()
    }

    fn close_all(&self) -> usize {
        let closed: Vec<Arc<StreamChannel>> = self.lock().drain().map(|(_, channel)| channel).collect();
        for channel in &closed {
            channel.close();
        }
        closed.len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ConnectionId, Arc<StreamChannel>>> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Reads frames from one client and forwards them to the sink.
struct SessionHandler {
    table: Arc<ConnectionTable>,
    sink: Arc<dyn MessageSink>,
    max_frame_bytes: usize,
}

impl ConnectionHandler for SessionHandler {
    fn handle(&self, stream: ConnectionStream) {
        let (channel, reader) = match self.table.register(stream) {
            Ok(registered) => registered,
            Err(error) => {
                warn!(
                    target: LISTENER_TARGET,
                    error = %error,
                    "failed to register connection"
                );
                return;
            }
        };
        let id = channel.id;
        let connection = {
            let channel: Arc<dyn ResponseChannel> = channel;
            ConnectionHandle::new(id, &channel)
        };
        debug!(target: LISTENER_TARGET, connection = id, "client connected");

        self.serve(reader, &connection);

        self.table.remove(id);
        debug!(target: LISTENER_TARGET, connection = id, "client disconnected");
    }
}

impl SessionHandler {
    fn serve(&self, stream: ConnectionStream, connection: &ConnectionHandle) {
        let mut frames = FrameReader::new(stream, self.max_frame_bytes);
        loop {
            match frames.next_frame() {
                Ok(None) => return,
                Ok(Some(line)) => {
                    if line.trim_ascii().is_empty() {
                        continue;
                    }
                    match AutomationRequest::parse(&line) {
                        Ok(request) => self.sink.on_message(request, connection.clone()),
                        Err(error) => {
                            let request_id = recover_request_id(&line).unwrap_or_default();
                            self.sink.on_decode_error(&request_id, &error, connection);
                        }
                    }
                }
                Err(error @ DispatchError::RequestTooLarge { .. }) => {
                    self.sink.on_decode_error("", &error, connection);
                    return;
                }
                Err(error) => {
                    debug!(
                        target: LISTENER_TARGET,
                        connection = connection.id(),
                        error = %error,
                        "connection read failed"
                    );
                    return;
                }
            }
        }
    }
}

/// Owns the socket listener and every client session.
pub struct ConnectionManager {
    endpoint: SocketEndpoint,
    local_addr: Option<SocketAddr>,
    accept: Option<AcceptLoop>,
    table: Arc<ConnectionTable>,
}

impl ConnectionManager {
    /// Binds `endpoint` and starts accepting clients whose requests are
    /// delivered to `sink`.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError`] when the endpoint cannot be bound or the
    /// accept thread cannot start.
    pub fn start(endpoint: &SocketEndpoint, sink: Arc<dyn MessageSink>) -> Result<Self, ListenerError> {
        let bound = BoundEndpoint::bind(endpoint)?;
        let local_addr = bound.local_addr();
        let table = Arc::new(ConnectionTable::default());
        let handler = Arc::new(SessionHandler {
            table: Arc::clone(&table),
            sink,
            max_frame_bytes: MAX_FRAME_BYTES,
        });
        let accept = bound.spawn(handler)?;
        Ok(Self {
            endpoint: endpoint.clone(),
            local_addr,
            accept: Some(accept),
            table,
        })
    }

    /// Configured endpoint.
    #[must_use]
    pub const fn endpoint(&self) -> &SocketEndpoint {
        &self.endpoint
    }

    /// Bound TCP address, useful when the endpoint asked for port 0.
    #[must_use]
    pub const fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Number of connected clients.
    #[must_use]
    pub fn active_connections(&self) -> usize {
        self.table.len()
    }

    /// Stops accepting, then closes every client connection.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError::AcceptPanic`] if the accept thread panicked.
    pub fn stop(mut self) -> Result<(), ListenerError> {
        self.stop_inner()
    }

    fn stop_inner(&mut self) -> Result<(), ListenerError> {
        let Some(accept) = self.accept.take() else {
            return Ok(());
        };
        let joined = accept.stop();
        let closed = self.table.close_all();
        info!(
            target: LISTENER_TARGET,
            endpoint = %self.endpoint,
            closed,
            "connection manager stopped"
        );
        joined
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        if let Err(error) = self.stop_inner() {
            warn!(target: LISTENER_TARGET, error = %error, "connection manager did not stop cleanly");
        }
    }
}
