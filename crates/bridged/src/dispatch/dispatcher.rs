//! The request dispatcher.
//!
//! Every request ends up here. The dispatcher confines handler execution to
//! the logic thread, defers work while the engine is unsafe, applies the
//! structural routing rules, walks the fallback chain, and guarantees exactly
//! one response per request.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, warn};

use super::DISPATCH_TARGET;
use super::connection::ConnectionHandle;
use super::context::{RequestContext, Responder};
use super::emitter::ResponseEmitter;
use super::errors::{DispatchError, QueueError, error_code};
use super::outcomes::TelemetrySink;
use super::queue::DeferredQueue;
use super::registry::{Handler, HandlerRegistry};
use super::request::{AutomationRequest, Payload, PendingRequest};
use super::routing::structural_route;
use crate::host::{EngineSafetyProbe, LogicThreadError, LogicThreadHandle};
use crate::transport::MessageSink;

/// Collaborators required to build a [`Dispatcher`].
pub struct DispatcherDeps {
    /// Thread on which handlers run.
    pub logic_thread: LogicThreadHandle,
    /// Source of the engine safety state.
    pub safety: Arc<dyn EngineSafetyProbe>,
    /// Receiver of every response outcome.
    pub telemetry: Arc<dyn TelemetrySink>,
    /// Deferred queue capacity; `None` is unbounded.
    pub queue_limit: Option<usize>,
}

struct DispatcherInner {
    registry: HandlerRegistry,
    queue: DeferredQueue,
    emitter: ResponseEmitter,
    safety: Arc<dyn EngineSafetyProbe>,
    logic: LogicThreadHandle,
}

/// Routes requests to handlers on the logic thread.
///
/// Cloning is cheap; clones share the registry and the deferred queue.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

impl Dispatcher {
    /// Builds a dispatcher over a fully populated registry.
    #[must_use]
    pub fn new(registry: HandlerRegistry, deps: DispatcherDeps) -> Self {
        let DispatcherDeps {
            logic_thread,
            safety,
            telemetry,
            queue_limit,
        } = deps;
        Self {
            inner: Arc::new(DispatcherInner {
                registry,
                queue: DeferredQueue::new(queue_limit),
                emitter: ResponseEmitter::new(telemetry),
                safety,
                logic: logic_thread,
            }),
        }
    }

    /// Dispatches `request`, answering on `connection`.
    ///
    /// Called off the logic thread, the request is posted there and this
    /// returns immediately. On the logic thread, the request is deferred when
    /// the engine is unsafe and handled synchronously otherwise.
    pub fn dispatch(&self, request: AutomationRequest, connection: ConnectionHandle) {
        if self.inner.logic.is_current() {
            self.dispatch_on_logic_thread(request, connection);
            return;
        }

        let request_id = request.request_id().to_owned();
        let reply_to = connection.clone();
        let dispatcher = self.clone();
        let posted = self
            .inner
            .logic
            .post(move || dispatcher.dispatch_on_logic_thread(request, connection));
        if let Err(error) = posted {
            self.reject_stopped(&reply_to, &request_id, &error);
        }
    }

    /// Runs every deferred request in arrival order.
    ///
    /// Off the logic thread this re-posts itself. The queue is captured and
    /// cleared under its lock; the captured requests are processed after the
    /// lock is released, so a request made unsafe again by an earlier handler
    /// is simply deferred once more.
    pub fn drain_all(&self) {
        if !self.inner.logic.is_current() {
            let dispatcher = self.clone();
            if let Err(error) = self.inner.logic.post(move || dispatcher.drain_all()) {
                debug!(target: DISPATCH_TARGET, %error, "drain not scheduled");
            }
            return;
        }

        let drained = self.inner.queue.take_all();
        if drained.is_empty() {
            return;
        }
        debug!(
            target: DISPATCH_TARGET,
            count = drained.len(),
            "draining deferred requests"
        );
        for pending in drained {
            let waited_ms = u64::try_from(pending.waited().as_millis()).unwrap_or(u64::MAX);
            let (request, connection) = pending.into_parts();
            debug!(
                target: DISPATCH_TARGET,
                request_id = request.request_id(),
                waited_ms,
                "replaying deferred request"
            );
            self.dispatch_on_logic_thread(request, connection);
        }
    }

    /// One drain-task tick: drains when a drain is scheduled and the engine
    /// is safe. Returns whether a drain ran.
    pub fn drain_tick(&self) -> bool {
        if !self.inner.queue.is_drain_scheduled() || !self.inner.safety.is_safe() {
            return false;
        }
        self.drain_all();
        true
    }

    /// Answers every queued request with `SHUTTING_DOWN` and empties the
    /// queue. Returns the number of requests abandoned.
    pub fn abandon_pending(&self) -> usize {
        let abandoned = self.inner.queue.take_all();
        let count = abandoned.len();
        for pending in abandoned {
            let (request, connection) = pending.into_parts();
            self.inner.emitter.send_error(
                &connection,
                request.request_id(),
                "Bridge is shutting down",
                error_code::SHUTTING_DOWN,
            );
        }
        if count > 0 {
            debug!(target: DISPATCH_TARGET, count, "abandoned deferred requests");
        }
        count
    }

    /// Number of deferred requests.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.inner.queue.len()
    }

    /// Whether deferred requests are awaiting a drain.
    #[must_use]
    pub fn is_drain_scheduled(&self) -> bool {
        self.inner.queue.is_drain_scheduled()
    }

    /// Handle of the thread handlers run on.
    #[must_use]
    pub fn logic_thread(&self) -> &LogicThreadHandle {
        &self.inner.logic
    }

    /// Registry consulted for every request.
    #[must_use]
    pub fn registry(&self) -> &HandlerRegistry {
        &self.inner.registry
    }

    fn dispatch_on_logic_thread(&self, request: AutomationRequest, connection: ConnectionHandle) {
        if !self.inner.safety.is_safe() {
            self.defer(PendingRequest::new(request, connection));
            return;
        }
        self.process(&request, &connection);
    }

    fn defer(&self, pending: PendingRequest) {
        match self.inner.queue.enqueue(pending) {
            Ok(depth) => {
                debug!(target: DISPATCH_TARGET, depth, "engine busy; request deferred");
            }
            Err(QueueError::Full { limit, request }) => {
                let (request, connection) = (*request).into_parts();
                self.inner.emitter.send_error(
                    &connection,
                    request.request_id(),
                    &format!("Deferred queue is full ({limit} pending requests)"),
                    error_code::QUEUE_FULL,
                );
            }
        }
    }

    fn process(&self, request: &AutomationRequest, connection: &ConnectionHandle) {
        let inner = &*self.inner;
        let responder = Responder::new(&inner.emitter, connection, request.request_id());

        if let Some(route) = structural_route(request.action(), request.payload()) {
            let Some(handler) = inner.registry.lookup(route.target) else {
                responder.fail(
                    &format!("Unknown action: {}", route.target),
                    error_code::UNKNOWN_ACTION,
                );
                return;
            };
            debug!(
                target: DISPATCH_TARGET,
                request_id = request.request_id(),
                from = request.action(),
                to = route.target,
                "structural route"
            );
            self.run_chain(
                &responder,
                route.target,
                &route.payload,
                &[(route.target, handler)],
            );
            return;
        }

        let chain = inner.registry.chain(request.action());
        if chain.is_empty() {
            responder.fail(
                &format!("Unknown action: {}", request.action()),
                error_code::UNKNOWN_ACTION,
            );
            return;
        }
        self.run_chain(&responder, request.action(), request.payload(), &chain);
    }

    fn run_chain(
        &self,
        responder: &Responder<'_>,
        action: &str,
        payload: &Payload,
        chain: &[(&str, &Arc<dyn Handler>)],
    ) {
        let ctx = RequestContext::new(
            responder.request_id(),
            action,
            payload,
            responder,
            &self.inner.registry,
        );

        for (name, handler) in chain {
            match panic::catch_unwind(AssertUnwindSafe(|| handler.handle(&ctx))) {
                Ok(Ok(true)) => {
                    if !responder.has_responded() {
                        warn!(
                            target: DISPATCH_TARGET,
                            request_id = ctx.request_id(),
                            handler = *name,
                            "handler claimed request without responding"
                        );
                        responder.fail(
                            &format!("Handler for '{name}' finished without a response"),
                            error_code::EXECUTION_FAILED,
                        );
                    }
                    return;
                }
                Ok(Ok(false)) if responder.has_responded() => return,
                Ok(Ok(false)) => {
                    debug!(
                        target: DISPATCH_TARGET,
                        request_id = ctx.request_id(),
                        handler = *name,
                        action,
                        "handler declined"
                    );
                }
                Ok(Err(error)) => {
                    responder.fail(error.message(), error.code());
                    return;
                }
                Err(panic_payload) => {
                    let reason = panic_message(panic_payload.as_ref());
                    warn!(
                        target: DISPATCH_TARGET,
                        request_id = ctx.request_id(),
                        handler = *name,
                        reason = %reason,
                        "handler panicked"
                    );
                    responder.fail(
                        &format!("Handler for '{action}' panicked: {reason}"),
                        error_code::EXECUTION_FAILED,
                    );
                    return;
                }
            }
        }

        responder.fail(
            &format!("Action '{action}' is not implemented"),
            error_code::NOT_IMPLEMENTED,
        );
    }

    fn reject_stopped(&self, connection: &ConnectionHandle, request_id: &str, error: &LogicThreadError) {
        debug!(target: DISPATCH_TARGET, request_id, %error, "logic thread unavailable");
        self.inner.emitter.send_error(
            connection,
            request_id,
            "Bridge is shutting down",
            error_code::SHUTTING_DOWN,
        );
    }
}

impl MessageSink for Dispatcher {
    fn on_message(&self, request: AutomationRequest, connection: ConnectionHandle) {
        self.dispatch(request, connection);
    }

    fn on_decode_error(&self, request_id: &str, error: &DispatchError, connection: &ConnectionHandle) {
        self.inner
            .emitter
            .send_error(connection, request_id, &error.to_string(), error.error_code());
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_owned())
}
