//! Subscription registry for inbound updates.
//!
//! A [`Subscription`] pairs a [`Pattern`] with a handler and the user data it
//! was registered with. When an update is dispatched:
//!
//! 1. Subscriptions are checked in registration order
//! 2. Every subscription whose pattern matches the update's text is invoked
//! 3. A failing or panicking handler is logged and dispatch moves on
//!
//! ```rust,ignore
//! use tgbridge_core::{SubscriptionRegistry, UserData};
//!
//! let registry = SubscriptionRegistry::new();
//! registry.subscribe("/start", Some(start_handler), UserData::none())?;
//! registry.subscribe("*", Some(log_handler), UserData::none())?;
//!
//! // Both handlers run for "/start", in that order.
//! registry.dispatch(&update);
//! ```

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tracing::{Level, debug, info, span, warn};

use crate::foundation::error::{HandlerError, HandlerResult, SubscribeError};
use crate::foundation::record::UpdateRecord;
use crate::foundation::user_data::UserData;

/// A type-erased update handler.
pub type UpdateHandler = Arc<dyn Fn(&UpdateRecord, &UserData) -> HandlerResult + Send + Sync>;

/// The pattern that matches every update.
pub const WILDCARD: &str = "*";

// =============================================================================
// Pattern
// =============================================================================

/// Selects which updates a subscription receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    /// `*`: every update, including ones without text.
    Wildcard,
    /// Exact, case-sensitive comparison with the update text.
    Exact(String),
}

impl Pattern {
    /// Parses a subscription pattern.
    ///
    /// # Errors
    ///
    /// Returns [`SubscribeError::EmptyPattern`] for an empty string.
    pub fn parse(pattern: &str) -> Result<Self, SubscribeError> {
        match pattern {
            "" => Err(SubscribeError::EmptyPattern),
            WILDCARD => Ok(Self::Wildcard),
            exact => Ok(Self::Exact(exact.to_string())),
        }
    }

    /// Returns whether an update with the given text matches.
    pub fn matches(&self, text: Option<&str>) -> bool {
        match self {
            Self::Wildcard => true,
            Self::Exact(expected) => text == Some(expected.as_str()),
        }
    }

    /// Returns the pattern as it was subscribed.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Wildcard => WILDCARD,
            Self::Exact(s) => s,
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Subscription
// =============================================================================

/// Identifies a subscription within its registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionHandle(u64);

impl SubscriptionHandle {
    /// Returns the raw handle value.
    pub fn get(self) -> u64 {
        self.0
    }
}

/// A registered pattern with its handler.
#[derive(Clone)]
pub struct Subscription {
    handle: SubscriptionHandle,
    pattern: Pattern,
    handler: UpdateHandler,
    user_data: UserData,
}

impl Subscription {
    /// Returns the subscription's handle.
    pub fn handle(&self) -> SubscriptionHandle {
        self.handle
    }

    /// Returns the subscribed pattern.
    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    /// Returns the user data passed at subscribe time.
    pub fn user_data(&self) -> &UserData {
        &self.user_data
    }

    fn invoke(&self, update: &UpdateRecord) -> HandlerResult {
        panic::catch_unwind(AssertUnwindSafe(|| (self.handler)(update, &self.user_data)))
            .unwrap_or_else(|payload| Err(HandlerError::from_panic(payload)))
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("handle", &self.handle)
            .field("pattern", &self.pattern)
            .field("user_data", &self.user_data)
            .finish_non_exhaustive()
    }
}

/// Handler installed when a subscription is registered without one.
///
/// It accepts every update and does nothing, so the subscription simply
/// absorbs what it matches.
pub fn noop_handler() -> UpdateHandler {
    Arc::new(|_, _| Ok(()))
}

// =============================================================================
// Registry
// =============================================================================

/// Summary of one dispatch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Subscriptions whose pattern matched.
    pub matched: usize,
    /// Matched handlers that failed or panicked.
    pub failed: usize,
}

impl DispatchOutcome {
    /// Returns `true` if at least one subscription matched.
    pub fn is_matched(&self) -> bool {
        self.matched > 0
    }
}

/// Ordered table of subscriptions.
///
/// `subscribe` and `dispatch` may be called from different threads; the table
/// is guarded by a lock that is never held while handlers run, so handlers
/// are free to subscribe further patterns.
#[derive(Default)]
pub struct SubscriptionRegistry {
    subscriptions: RwLock<Vec<Subscription>>,
    next_handle: AtomicU64,
}

impl SubscriptionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a pattern.
    ///
    /// When `handler` is `None` a [`noop_handler`] is installed.
    ///
    /// # Errors
    ///
    /// Returns [`SubscribeError::EmptyPattern`] for an empty pattern.
    pub fn subscribe(
        &self,
        pattern: &str,
        handler: Option<UpdateHandler>,
        user_data: UserData,
    ) -> Result<SubscriptionHandle, SubscribeError> {
        let pattern = Pattern::parse(pattern)?;
        let handle = SubscriptionHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));

        info!(pattern = %pattern, handle = handle.0, "Subscribed");

        self.subscriptions.write().push(Subscription {
            handle,
            pattern,
            handler: handler.unwrap_or_else(noop_handler),
            user_data,
        });
        Ok(handle)
    }

    /// Dispatches an update to every matching subscription.
    ///
    /// Handlers run synchronously in registration order. Failures are logged
    /// and counted; they never abort the dispatch.
    pub fn dispatch(&self, update: &UpdateRecord) -> DispatchOutcome {
        let span = span!(
            Level::DEBUG,
            "dispatch",
            kind = %update.kind,
            chat_id = update.chat_id
        );
        let _enter = span.enter();

        let text = update.text();
        let matching: Vec<Subscription> = self
            .subscriptions
            .read()
            .iter()
            .filter(|s| s.pattern.matches(text))
            .cloned()
            .collect();

        let mut outcome = DispatchOutcome {
            matched: matching.len(),
            failed: 0,
        };

        if matching.is_empty() {
            info!(text = text.unwrap_or_default(), "No subscription matched");
            return outcome;
        }

        for subscription in &matching {
            debug!(
                pattern = %subscription.pattern,
                handle = subscription.handle.0,
                "Invoking handler"
            );
            if let Err(err) = subscription.invoke(update) {
                outcome.failed += 1;
                warn!(
                    pattern = %subscription.pattern,
                    handle = subscription.handle.0,
                    error = %err,
                    "Update handler failed"
                );
            }
        }

        outcome
    }

    /// Returns a snapshot of the registered subscriptions.
    pub fn subscriptions(&self) -> Vec<Subscription> {
        self.subscriptions.read().clone()
    }

    /// Returns the number of registered subscriptions.
    pub fn len(&self) -> usize {
        self.subscriptions.read().len()
    }

    /// Returns `true` if nothing is subscribed.
    pub fn is_empty(&self) -> bool {
        self.subscriptions.read().is_empty()
    }
}

impl fmt::Debug for SubscriptionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionRegistry")
            .field("subscription_count", &self.len())
            .finish()
    }
}
