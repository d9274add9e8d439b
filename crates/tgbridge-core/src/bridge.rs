//! The [`Bridge`]: subscription registry and correlator over one transport.

use std::sync::Arc;

use tracing::warn;

use crate::foundation::descriptor::NativeRecord;
use crate::foundation::error::{HandlerResult, ParseResult, SubscribeError};
use crate::foundation::record::{ResponseRecord, UpdateRecord, parse_response, parse_update};
use crate::foundation::user_data::UserData;
use crate::framework::registry::{DispatchOutcome, SubscriptionHandle, SubscriptionRegistry};
use crate::integration::correlator::Correlator;
use crate::integration::transport::Transport;

/// Composes the subscription registry with the outbound correlator.
///
/// A `Bridge` holds no state of its own beyond these two; it is what the
/// runtime feeds updates into and what applications reply through.
#[derive(Debug)]
pub struct Bridge {
    registry: SubscriptionRegistry,
    correlator: Correlator,
}

impl Bridge {
    /// Creates a bridge over the given transport.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            registry: SubscriptionRegistry::new(),
            correlator: Correlator::new(transport),
        }
    }

    /// Returns the subscription registry.
    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.registry
    }

    /// Returns the outbound call interface.
    pub fn calls(&self) -> &Correlator {
        &self.correlator
    }

    /// Subscribes `handler` to updates matching `pattern`.
    pub fn subscribe<F>(
        &self,
        pattern: &str,
        handler: F,
        user_data: UserData,
    ) -> Result<SubscriptionHandle, SubscribeError>
    where
        F: Fn(&UpdateRecord, &UserData) -> HandlerResult + Send + Sync + 'static,
    {
        self.registry.subscribe(pattern, Some(Arc::new(handler)), user_data)
    }

    /// Subscribes a pattern without a handler; matching updates are absorbed.
    pub fn subscribe_silent(
        &self,
        pattern: &str,
        user_data: UserData,
    ) -> Result<SubscriptionHandle, SubscribeError> {
        self.registry.subscribe(pattern, None, user_data)
    }

    /// Decodes a native update record and dispatches it.
    ///
    /// A record that fails to decode is logged and reported to the caller;
    /// no handler runs for it.
    pub fn dispatch_record(&self, record: &dyn NativeRecord) -> ParseResult<DispatchOutcome> {
        let update = parse_update(record).inspect_err(|err| {
            warn!(error = %err, "Dropping undecodable update");
        })?;
        Ok(self.registry.dispatch(&update))
    }

    /// Decodes a native update record.
    pub fn parse_update(&self, record: &dyn NativeRecord) -> ParseResult<UpdateRecord> {
        parse_update(record)
    }

    /// Decodes a native response record.
    pub fn parse_response(&self, record: &dyn NativeRecord) -> ParseResult<ResponseRecord> {
        parse_response(record)
    }
}
