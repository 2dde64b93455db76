//! Action-name registry of handlers.
//!
//! Built once before the connection manager starts and read-only afterwards.
//! Registration is "last wins": registering an action twice replaces the
//! earlier handler without error.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use super::DISPATCH_TARGET;
use super::context::RequestContext;
use super::errors::HandlerError;

/// Result of a handler invocation.
///
/// `Ok(true)` means the handler claimed the action and has responded.
/// `Ok(false)` passes the action to the next handler in the fallback chain.
pub type HandlerResult = Result<bool, HandlerError>;

/// Implements one or more actions.
pub trait Handler: Send + Sync {
    /// Handles a request or declines it.
    ///
    /// # Errors
    ///
    /// Returning an error claims the action; the dispatcher answers with the
    /// error's message and code.
    fn handle(&self, ctx: &RequestContext<'_>) -> HandlerResult;
}

impl<F> Handler for F
where
    F: Fn(&RequestContext<'_>) -> HandlerResult + Send + Sync,
{
    fn handle(&self, ctx: &RequestContext<'_>) -> HandlerResult {
        self(ctx)
    }
}

/// Registry mapping action names to handlers.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn Handler>>,
    fallbacks: HashMap<String, Vec<String>>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `action`, replacing any earlier registration.
    ///
    /// A blank action name is ignored.
    pub fn register(&mut self, action: impl Into<String>, handler: Arc<dyn Handler>) {
        let action = action.into();
        if action.trim().is_empty() {
            debug!(target: DISPATCH_TARGET, "ignoring handler registered without an action");
            return;
        }
        if self.handlers.insert(action.clone(), handler).is_some() {
            debug!(target: DISPATCH_TARGET, action = %action, "handler replaced");
        }
    }

    /// Registers a closure for `action`.
    pub fn register_fn<F>(&mut self, action: impl Into<String>, handler: F)
    where
        F: Fn(&RequestContext<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        self.register(action, Arc::new(handler));
    }

    /// Declares the handlers consulted, in order, after the handler
    /// registered for `action` declines it.
    pub fn set_fallbacks<I, S>(&mut self, action: impl Into<String>, chain: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fallbacks
            .insert(action.into(), chain.into_iter().map(Into::into).collect());
    }

    /// Looks up the handler registered for `action`.
    #[must_use]
    pub fn lookup(&self, action: &str) -> Option<&Arc<dyn Handler>> {
        self.handlers.get(action)
    }

    /// Handlers to try for `action`: its own handler first, then its
    /// fallbacks. Unregistered names in the chain are skipped.
    #[must_use]
    pub fn chain<'a>(&'a self, action: &'a str) -> Vec<(&'a str, &'a Arc<dyn Handler>)> {
        let fallbacks = self
            .fallbacks
            .get(action)
            .map(Vec::as_slice)
            .unwrap_or_default();
        std::iter::once(action)
            .chain(fallbacks.iter().map(String::as_str))
            .filter_map(|name| self.lookup(name).map(|handler| (name, handler)))
            .collect()
    }

    /// Returns true when `action` has a handler.
    #[must_use]
    pub fn contains(&self, action: &str) -> bool {
        self.handlers.contains_key(action)
    }

    /// Sorted list of registered action names.
    #[must_use]
    pub fn actions(&self) -> Vec<&str> {
        let mut actions: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        actions.sort_unstable();
        actions
    }

    /// Number of registered actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns true when no actions are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
