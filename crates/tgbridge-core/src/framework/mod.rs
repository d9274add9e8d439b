//! Framework layer - update routing.
//!
//! Matches decoded updates against subscribed patterns and invokes handlers.

pub mod registry;

pub use registry::{
    DispatchOutcome, Pattern, Subscription, SubscriptionHandle, SubscriptionRegistry,
    UpdateHandler, WILDCARD, noop_handler,
};
