//! In-process dispatcher harness.
//!
//! The test thread is bound as the logic thread, so requests sent from it run
//! synchronously and anything posted from other threads runs on
//! [`DispatchHarness::pump`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

use serde_json::Value;

use crate::dispatch::{
    AutomationRequest, ConnectionHandle, Dispatcher, DispatcherDeps, HandlerRegistry,
    OutcomeTelemetry, ResponseChannel, ResponseEnvelope,
};
use crate::host::{LogicLoop, LogicThread, SafetyFlags};

/// Envelopes delivered to a [`RecordingChannel`], readable after the channel
/// itself is gone.
#[derive(Debug, Clone, Default)]
struct ResponseLog {
    sent: Arc<Mutex<Vec<ResponseEnvelope>>>,
}

impl ResponseLog {
    fn lock(&self) -> MutexGuard<'_, Vec<ResponseEnvelope>> {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Removes and returns everything delivered so far.
    fn take(&self) -> Vec<ResponseEnvelope> {
        std::mem::take(&mut *self.lock())
    }

    /// Copies everything delivered so far.
    fn snapshot(&self) -> Vec<ResponseEnvelope> {
        self.lock().clone()
    }
}

/// Channel that appends every envelope it is handed to a shared log.
#[derive(Debug)]
struct RecordingChannel {
    log: ResponseLog,
}

impl ResponseChannel for RecordingChannel {
    fn deliver(&self, envelope: &ResponseEnvelope) -> bool {
        self.log.lock().push(envelope.clone());
        true
    }
}

/// Dispatcher wired to a recording connection on the current thread.
pub struct DispatchHarness {
    dispatcher: Dispatcher,
    pump: LogicLoop,
    safety: Arc<SafetyFlags>,
    telemetry: Arc<OutcomeTelemetry>,
    inbox: ResponseLog,
    channel: Option<Arc<dyn ResponseChannel>>,
    connection: ConnectionHandle,
}

impl DispatchHarness {
    /// Harness with an unbounded deferred queue.
    pub fn new(registry: HandlerRegistry) -> Self {
        Self::with_limit(registry, None)
    }

    /// Harness whose deferred queue holds at most `limit` requests.
    pub fn with_limit(registry: HandlerRegistry, limit: Option<usize>) -> Self {
        let (logic_thread, pump) = LogicThread::bind_current();
        let safety = Arc::new(SafetyFlags::new());
        let telemetry = Arc::new(OutcomeTelemetry::new());
        let inbox = ResponseLog::default();
        let channel: Arc<dyn ResponseChannel> = Arc::new(RecordingChannel { log: inbox.clone() });
        let connection = ConnectionHandle::new(1, &channel);
        let dispatcher = Dispatcher::new(
            registry,
            DispatcherDeps {
                logic_thread,
                safety: safety.clone(),
                telemetry: telemetry.clone(),
                queue_limit: limit,
            },
        );
        Self {
            dispatcher,
            pump,
            safety,
            telemetry,
            inbox,
            channel: Some(channel),
            connection,
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn safety(&self) -> &SafetyFlags {
        &self.safety
    }

    pub fn telemetry(&self) -> &OutcomeTelemetry {
        &self.telemetry
    }

    /// Handle to the harness connection. Closed after [`Self::disconnect`].
    pub fn connection(&self) -> ConnectionHandle {
        self.connection.clone()
    }

    /// Dispatches a request from the logic thread.
    pub fn send(&self, request_id: &str, action: &str, payload: Value) {
        self.dispatcher
            .dispatch(request(request_id, action, payload), self.connection());
    }

    /// Dispatches a request from a freshly spawned thread and waits for the
    /// post to land. The request only runs once [`Self::pump`] is called.
    pub fn send_from_thread(&self, request_id: &str, action: &str, payload: Value) {
        let dispatcher = self.dispatcher.clone();
        let connection = self.connection();
        let request = request(request_id, action, payload);
        thread::spawn(move || dispatcher.dispatch(request, connection))
            .join()
            .expect("dispatching thread panicked");
    }

    /// Runs jobs posted to the logic thread.
    pub fn pump(&self) -> usize {
        self.pump.run_pending()
    }

    /// Drops the only strong reference to the connection channel.
    pub fn disconnect(&mut self) {
        self.channel = None;
    }

    /// Responses delivered so far, leaving them in place.
    pub fn responses(&self) -> Vec<ResponseEnvelope> {
        self.inbox.snapshot()
    }

    /// Responses delivered so far, clearing the record.
    pub fn take_responses(&self) -> Vec<ResponseEnvelope> {
        self.inbox.take()
    }

    /// Takes the recorded responses and asserts there is exactly one.
    pub fn single_response(&self) -> ResponseEnvelope {
        let mut sent = self.inbox.take();
        assert_eq!(sent.len(), 1, "expected exactly one response, got {sent:?}");
        sent.remove(0)
    }
}

/// Builds a request from a JSON object payload.
fn request(request_id: &str, action: &str, payload: Value) -> AutomationRequest {
    let Value::Object(payload) = payload else {
        panic!("payload must be a JSON object, got {payload}");
    };
    AutomationRequest::new(request_id, action, payload)
}
