//! Scenario worlds shared by the behavioural suites.

use std::cell::RefCell;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::bootstrap::{BootstrapError, ConfigLoader, bootstrap_with};
use crate::dispatch::{HandlerRegistry, HandlerResult, RequestContext, ResponseEnvelope};
use crate::handlers::register_builtin_handlers;
use crate::host::{EditorHost, HeadlessEditor, SafetyFlags};
use crate::subsystem::{BridgeSubsystem, SubsystemDeps, SubsystemError};

use super::config_loader::{FailingConfigLoader, TestConfigLoader, UnixConfigLoader};
use super::harness::DispatchHarness;
use super::reporter::RecordingHealthReporter;

/// World for in-process dispatch scenarios.
///
/// The harness is built on first use so `Given` steps can still shape the
/// registry and the queue limit.
#[derive(Default)]
pub struct DispatchWorld {
    editor: Arc<HeadlessEditor>,
    queue_limit: Option<usize>,
    with_panicking_handler: bool,
    harness: Option<DispatchHarness>,
}

impl DispatchWorld {
    pub fn limit_queue(&mut self, limit: usize) {
        assert!(self.harness.is_none(), "queue limit set after first request");
        self.queue_limit = Some(limit);
    }

    pub fn add_panicking_handler(&mut self) {
        assert!(self.harness.is_none(), "handler added after first request");
        self.with_panicking_handler = true;
    }

    pub fn editor(&self) -> &HeadlessEditor {
        &self.editor
    }

    pub fn harness(&mut self) -> &mut DispatchHarness {
        let editor: Arc<dyn EditorHost> = self.editor.clone();
        let queue_limit = self.queue_limit;
        let with_panicking_handler = self.with_panicking_handler;
        self.harness.get_or_insert_with(|| {
            let mut registry = HandlerRegistry::new();
            register_builtin_handlers(&mut registry, &editor);
            if with_panicking_handler {
                registry.register_fn("explode", |_ctx: &RequestContext<'_>| -> HandlerResult {
                    panic!("handler exploded")
                });
            }
            DispatchHarness::with_limit(registry, queue_limit)
        })
    }

    pub fn send(&mut self, request_id: &str, action: &str, payload: Value) {
        self.harness().send(request_id, action, payload);
    }

    /// Response for `request_id`, panicking when there is not exactly one.
    pub fn response_for(&mut self, request_id: &str) -> ResponseEnvelope {
        let mut matching: Vec<ResponseEnvelope> = self
            .harness()
            .responses()
            .into_iter()
            .filter(|envelope| envelope.request_id() == request_id)
            .collect();
        assert_eq!(
            matching.len(),
            1,
            "expected one response for {request_id}, got {matching:?}"
        );
        matching.remove(0)
    }
}

/// Fixture for dispatch scenarios.
#[must_use]
pub fn dispatch_world() -> RefCell<DispatchWorld> {
    RefCell::new(DispatchWorld::default())
}

/// World for end-to-end lifecycle scenarios over a real socket.
pub struct BridgeWorld {
    loader: Box<dyn ConfigLoader>,
    pub reporter: Arc<RecordingHealthReporter>,
    pub safety: Arc<SafetyFlags>,
    subsystem: Option<BridgeSubsystem>,
    bootstrap_error: Option<BootstrapError>,
    stop_result: Option<Result<(), SubsystemError>>,
    client: Option<(TcpStream, BufReader<TcpStream>)>,
    unix_socket: Option<camino::Utf8PathBuf>,
}

impl BridgeWorld {
    #[must_use]
    pub fn new() -> Self {
        Self {
            loader: Box::new(TestConfigLoader::new()),
            reporter: Arc::new(RecordingHealthReporter::default()),
            safety: Arc::new(SafetyFlags::new()),
            subsystem: None,
            bootstrap_error: None,
            stop_result: None,
            client: None,
            unix_socket: None,
        }
    }

    pub fn use_queue_limit(&mut self, limit: usize) {
        self.loader = Box::new(TestConfigLoader::with_queue_limit(limit));
    }

    pub fn use_failing_loader(&mut self) {
        self.loader = Box::new(FailingConfigLoader);
    }

    pub fn use_unix_loader(&mut self) {
        let loader = UnixConfigLoader::new();
        self.unix_socket = Some(loader.socket_path());
        self.loader = Box::new(loader);
    }

    /// Bootstraps and, on success, starts the subsystem.
    pub fn start(&mut self) {
        let bridge = match bootstrap_with(self.loader.as_ref(), self.reporter.as_ref()) {
            Ok(bridge) => bridge,
            Err(error) => {
                self.bootstrap_error = Some(error);
                return;
            }
        };
        let editor: Arc<dyn EditorHost> = Arc::new(HeadlessEditor::default());
        let deps = SubsystemDeps::new(editor, self.safety.clone());
        let subsystem = BridgeSubsystem::initialize(bridge.config(), deps, self.reporter.clone())
            .expect("subsystem should start");
        self.subsystem = Some(subsystem);
    }

    pub fn bootstrap_error(&self) -> Option<&BootstrapError> {
        self.bootstrap_error.as_ref()
    }

    pub fn subsystem(&self) -> &BridgeSubsystem {
        self.subsystem.as_ref().expect("subsystem not running")
    }

    pub fn unix_socket(&self) -> Option<&camino::Utf8PathBuf> {
        self.unix_socket.as_ref()
    }

    pub fn connect(&mut self) {
        let addr = self.subsystem().local_addr().expect("bridge listens on TCP");
        let stream = TcpStream::connect(addr).expect("connect to bridge");
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .expect("set read timeout");
        let reader = BufReader::new(stream.try_clone().expect("clone client stream"));
        self.client = Some((stream, reader));
    }

    pub fn send_line(&mut self, line: &str) {
        let (stream, _) = self.client.as_mut().expect("client not connected");
        stream.write_all(line.as_bytes()).expect("write request");
        stream.write_all(b"\n").expect("write newline");
        stream.flush().expect("flush request");
    }

    pub fn read_response(&mut self) -> ResponseEnvelope {
        let (_, reader) = self.client.as_mut().expect("client not connected");
        let mut line = String::new();
        reader.read_line(&mut line).expect("read response");
        serde_json::from_str(&line).expect("decode response")
    }

    /// Reads from the client until the server closes the connection.
    pub fn client_sees_close(&mut self) -> bool {
        let (_, reader) = self.client.as_mut().expect("client not connected");
        let mut line = String::new();
        matches!(reader.read_line(&mut line), Ok(0))
    }

    pub fn stop(&mut self) {
        let subsystem = self.subsystem.take().expect("subsystem not running");
        self.stop_result = Some(subsystem.deinitialize().map(|_| ()));
    }

    pub fn stop_result(&self) -> Option<&Result<(), SubsystemError>> {
        self.stop_result.as_ref()
    }
}

impl Default for BridgeWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture for lifecycle scenarios.
#[must_use]
pub fn bridge_world() -> RefCell<BridgeWorld> {
    RefCell::new(BridgeWorld::new())
}
