//! # tgbridge
//!
//! Connects Telegram bot updates to application handlers.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐  Connected / Disconnected  ┌──────────┐
//! │ Transport │──────────────────────────▶│ EventBus │──▶ on_event handlers
//! │ (Bot API) │        Update record      ├──────────┤
//! │           │──────────────────────────▶│ Registry │──▶ subscribe handlers
//! │           │◀──────────────────────────│Correlator│◀── send_message, ...
//! └───────────┘   Completed (response)    └──────────┘
//! ```
//!
//! - **Runtime**: loads configuration, owns the transport and pumps its events
//! - **Registry**: routes decoded updates by exact command text or `*`
//! - **Correlator**: serializes outbound calls and runs their completions
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tgbridge::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = BridgeRuntime::builder().build()?;
//!     tgbridge::install(&runtime)?;
//!
//!     tgbridge::on_event(*tgbridge::CONNECTED, |_, _| {
//!         let _ = tgbridge::subscribe("/start", |update, _| {
//!             tgbridge::send_message(update.chat_id, "Hello")?;
//!             Ok(())
//!         }, UserData::none());
//!     }, UserData::none())?;
//!
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config` (default): read `tgbridge.toml`
//! - `yaml-config`: read `tgbridge.yaml`
//! - `json-log`: JSON log lines
//! - `http-client` (default): the Bot API transport

use std::sync::{Arc, LazyLock, OnceLock};

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use tgbridge_core::{
    Bridge, Correlator, EventBus, EventId, HandlerResult, LifecycleEvent, NativeRecord,
    ParseResult, ResponseRecord, SubmissionError, SubmitResult, SubscribeError,
    SubscriptionHandle, UpdateKind, UpdateRecord, UserData,
};
use tgbridge_runtime::BridgeRuntime;

pub use tgbridge_core as core;
pub use tgbridge_runtime as runtime;
pub use tgbridge_transport as transport;

/// Raised once the transport has completed its handshake.
pub static CONNECTED: LazyLock<EventId> = LazyLock::new(|| LifecycleEvent::Connected.id());

/// Raised when the transport loses its connection.
pub static DISCONNECTED: LazyLock<EventId> = LazyLock::new(|| LifecycleEvent::Disconnected.id());

/// Update kind of a text message.
pub const MESSAGE: UpdateKind = UpdateKind::Message;

/// Update kind of an inline keyboard press.
pub const CALLBACK_QUERY: UpdateKind = UpdateKind::CallbackQuery;

/// Errors from the process-wide facade.
#[derive(Error, Debug)]
pub enum FacadeError {
    /// `init` or `install` has not been called.
    #[error("tgbridge is not initialized")]
    NotInitialized,

    /// `init` or `install` was called twice.
    #[error("tgbridge is already initialized")]
    AlreadyInitialized,

    /// The subscription was rejected.
    #[error(transparent)]
    Subscribe(#[from] SubscribeError),
}

/// Result type for facade operations.
pub type FacadeResult<T> = Result<T, FacadeError>;

struct Instance {
    bridge: Arc<Bridge>,
    events: Arc<EventBus>,
}

static INSTANCE: OnceLock<Instance> = OnceLock::new();

/// Installs the process-wide bridge and event bus.
///
/// There is no teardown; the instance lives as long as the process.
pub fn init(bridge: Arc<Bridge>, events: Arc<EventBus>) -> FacadeResult<()> {
    INSTANCE
        .set(Instance { bridge, events })
        .map_err(|_| FacadeError::AlreadyInitialized)?;
    info!("tgbridge facade initialized");
    Ok(())
}

/// Installs the bridge and event bus of `runtime`.
pub fn install(runtime: &BridgeRuntime) -> FacadeResult<()> {
    init(runtime.bridge(), runtime.events())
}

/// Returns the installed bridge.
pub fn bridge() -> Option<Arc<Bridge>> {
    INSTANCE.get().map(|instance| Arc::clone(&instance.bridge))
}

/// Returns the installed event bus.
pub fn events() -> Option<Arc<EventBus>> {
    INSTANCE.get().map(|instance| Arc::clone(&instance.events))
}

fn instance() -> FacadeResult<&'static Instance> {
    INSTANCE.get().ok_or(FacadeError::NotInitialized)
}

fn with_calls<R>(f: impl FnOnce(&Correlator) -> SubmitResult<R>) -> SubmitResult<R> {
    match INSTANCE.get() {
        Some(instance) => f(instance.bridge.calls()),
        None => Err(SubmissionError::Unavailable(
            "tgbridge is not initialized".into(),
        )),
    }
}

// =============================================================================
// Events and subscriptions
// =============================================================================

/// Registers a handler for a lifecycle event such as [`CONNECTED`].
pub fn on_event<F>(id: EventId, handler: F, user_data: UserData) -> FacadeResult<()>
where
    F: Fn(EventId, &UserData) + Send + Sync + 'static,
{
    instance()?.events.add_handler(id, handler, user_data);
    Ok(())
}

/// Subscribes `handler` to updates whose text equals `pattern`, or to every
/// update for `*`.
pub fn subscribe<F>(
    pattern: &str,
    handler: F,
    user_data: UserData,
) -> FacadeResult<SubscriptionHandle>
where
    F: Fn(&UpdateRecord, &UserData) -> HandlerResult + Send + Sync + 'static,
{
    Ok(instance()?.bridge.subscribe(pattern, handler, user_data)?)
}

/// Subscribes a pattern with no handler.
pub fn subscribe_silent(pattern: &str, user_data: UserData) -> FacadeResult<SubscriptionHandle> {
    Ok(instance()?.bridge.subscribe_silent(pattern, user_data)?)
}

/// Decodes a native update record. Works before initialization.
pub fn parse_update(record: &dyn NativeRecord) -> ParseResult<UpdateRecord> {
    tgbridge_core::parse_update(record)
}

/// Decodes a native response record. Works before initialization.
pub fn parse_response(record: &dyn NativeRecord) -> ParseResult<ResponseRecord> {
    tgbridge_core::parse_response(record)
}

// =============================================================================
// Outbound calls
// =============================================================================
//
// Every verb fails with `SubmissionError::Unavailable` before initialization.

/// Sends a text message.
pub fn send_message(chat_id: i64, text: impl Into<String>) -> SubmitResult<u64> {
    with_calls(|calls| calls.send_message(chat_id, text))
}

/// Sends a text message and runs `completion` with the response.
pub fn send_message_with<F>(
    chat_id: i64,
    text: impl Into<String>,
    user_data: UserData,
    completion: F,
) -> SubmitResult<u64>
where
    F: FnOnce(&ResponseRecord, &UserData) + Send + 'static,
{
    with_calls(|calls| calls.send_message_with(chat_id, text, user_data, completion))
}

/// Sends a message from a full `sendMessage` JSON object.
pub fn send_json<T: Serialize + ?Sized>(payload: &T) -> SubmitResult<u64> {
    with_calls(|calls| calls.send_json(payload))
}

/// JSON form of [`send_message_with`].
pub fn send_json_with<T, F>(payload: &T, user_data: UserData, completion: F) -> SubmitResult<u64>
where
    T: Serialize + ?Sized,
    F: FnOnce(&ResponseRecord, &UserData) + Send + 'static,
{
    with_calls(|calls| calls.send_json_with(payload, user_data, completion))
}

/// Replaces the text of a sent message.
pub fn edit_message_text(
    chat_id: i64,
    message_id: i64,
    text: impl Into<String>,
) -> SubmitResult<u64> {
    with_calls(|calls| calls.edit_message_text(chat_id, message_id, text))
}

/// Replaces the text of a sent message and runs `completion`.
pub fn edit_message_text_with<F>(
    chat_id: i64,
    message_id: i64,
    text: impl Into<String>,
    user_data: UserData,
    completion: F,
) -> SubmitResult<u64>
where
    F: FnOnce(&ResponseRecord, &UserData) + Send + 'static,
{
    with_calls(|calls| {
        calls.edit_message_text_with(chat_id, message_id, text, user_data, completion)
    })
}

/// Edits a message from a full `editMessageText` JSON object.
pub fn edit_json<T: Serialize + ?Sized>(payload: &T) -> SubmitResult<u64> {
    with_calls(|calls| calls.edit_json(payload))
}

/// JSON form of [`edit_message_text_with`].
pub fn edit_json_with<T, F>(payload: &T, user_data: UserData, completion: F) -> SubmitResult<u64>
where
    T: Serialize + ?Sized,
    F: FnOnce(&ResponseRecord, &UserData) + Send + 'static,
{
    with_calls(|calls| calls.edit_json_with(payload, user_data, completion))
}

/// Replaces the inline keyboard of a sent message.
pub fn edit_message_reply_markup<T: Serialize + ?Sized>(
    chat_id: i64,
    message_id: i64,
    reply_markup: &T,
) -> SubmitResult<u64> {
    with_calls(|calls| calls.edit_message_reply_markup(chat_id, message_id, reply_markup))
}

/// Replaces the inline keyboard of a sent message and runs `completion`.
pub fn edit_message_reply_markup_with<T, F>(
    chat_id: i64,
    message_id: i64,
    reply_markup: &T,
    user_data: UserData,
    completion: F,
) -> SubmitResult<u64>
where
    T: Serialize + ?Sized,
    F: FnOnce(&ResponseRecord, &UserData) + Send + 'static,
{
    with_calls(|calls| {
        calls.edit_message_reply_markup_with(
            chat_id,
            message_id,
            reply_markup,
            user_data,
            completion,
        )
    })
}

/// Answers an inline keyboard press.
pub fn answer_callback_query(
    callback_query_id: impl Into<String>,
    text: Option<&str>,
    show_alert: bool,
) -> SubmitResult<u64> {
    with_calls(|calls| calls.answer_callback_query(callback_query_id, text, show_alert))
}

/// Answers an inline keyboard press and runs `completion`.
pub fn answer_callback_query_with<F>(
    callback_query_id: impl Into<String>,
    text: Option<&str>,
    show_alert: bool,
    user_data: UserData,
    completion: F,
) -> SubmitResult<u64>
where
    F: FnOnce(&ResponseRecord, &UserData) + Send + 'static,
{
    with_calls(|calls| {
        calls.answer_callback_query_with(callback_query_id, text, show_alert, user_data, completion)
    })
}

/// Answers an inline keyboard press from a full JSON object.
pub fn answer_callback_json<T: Serialize + ?Sized>(payload: &T) -> SubmitResult<u64> {
    with_calls(|calls| calls.answer_callback_json(payload))
}

/// JSON form of [`answer_callback_query_with`].
pub fn answer_callback_json_with<T, F>(
    payload: &T,
    user_data: UserData,
    completion: F,
) -> SubmitResult<u64>
where
    T: Serialize + ?Sized,
    F: FnOnce(&ResponseRecord, &UserData) + Send + 'static,
{
    with_calls(|calls| calls.answer_callback_json_with(payload, user_data, completion))
}

/// Invokes any Bot API method with a JSON object body.
pub fn call_method<T: Serialize + ?Sized>(
    method: impl Into<String>,
    payload: &T,
) -> SubmitResult<u64> {
    with_calls(|calls| calls.call_method(method, payload))
}

/// Invokes any Bot API method and runs `completion`.
pub fn call_method_with<T, F>(
    method: impl Into<String>,
    payload: &T,
    user_data: UserData,
    completion: F,
) -> SubmitResult<u64>
where
    T: Serialize + ?Sized,
    F: FnOnce(&ResponseRecord, &UserData) + Send + 'static,
{
    with_calls(|calls| calls.call_method_with(method, payload, user_data, completion))
}

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use tgbridge::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use tgbridge_runtime::{BridgeConfig, BridgeRuntime, LoggingBuilder};

    // Records and handler types
    pub use tgbridge_core::{
        HandlerError, HandlerResult, ResponseRecord, SubmissionError, UpdateKind, UpdateRecord,
        UserData,
    };

    // Outbound helpers
    pub use tgbridge_core::Correlator;

    pub use super::{CALLBACK_QUERY, CONNECTED, DISCONNECTED, FacadeError, MESSAGE};
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;
    use tgbridge_core::{OutboundRequest, PendingCall, RawRecord, Transport};

    #[derive(Default)]
    struct MockTransport {
        requests: Mutex<Vec<OutboundRequest>>,
        pending: Mutex<Vec<PendingCall>>,
    }

    impl Transport for MockTransport {
        fn submit(
            &self,
            request: OutboundRequest,
            pending: Option<PendingCall>,
        ) -> SubmitResult<()> {
            self.requests.lock().push(request);
            self.pending.lock().extend(pending);
            Ok(())
        }
    }

    #[test]
    fn test_constants() {
        assert_ne!(*CONNECTED, *DISCONNECTED);
        assert_eq!(*CONNECTED, *CONNECTED);
        assert_eq!(*DISCONNECTED + 1, *CONNECTED);
        assert_eq!(MESSAGE.as_str(), "message");
        assert_eq!(CALLBACK_QUERY.as_str(), "callback_query");
    }

    #[test]
    fn test_parse_without_instance() {
        let update = parse_update(
            &RawRecord::new()
                .with("kind", "message")
                .with("chat_id", 42)
                .with("text", "/start"),
        )
        .unwrap();
        assert_eq!(update.kind, MESSAGE);
        assert_eq!(update.text(), Some("/start"));

        let response = parse_response(&RawRecord::new().with("ok", false)).unwrap();
        assert!(!response.is_success());
    }

    // The instance is process-wide, so its whole lifecycle is one test.
    #[test]
    fn test_singleton_lifecycle() {
        assert!(matches!(
            send_message(1, "hi"),
            Err(SubmissionError::Unavailable(_))
        ));
        assert!(matches!(
            subscribe("*", |_, _| Ok(()), UserData::none()),
            Err(FacadeError::NotInitialized)
        ));
        assert!(bridge().is_none());

        let transport = Arc::new(MockTransport::default());
        let bridge = Arc::new(Bridge::new(transport.clone()));
        let events = Arc::new(EventBus::new());
        init(Arc::clone(&bridge), Arc::clone(&events)).unwrap();
        assert!(matches!(
            init(Arc::clone(&bridge), Arc::clone(&events)),
            Err(FacadeError::AlreadyInitialized)
        ));

        on_event(
            *CONNECTED,
            |_, _| {
                subscribe(
                    "/start",
                    |update, _| {
                        send_json(&json!({
                            "chat_id": update.chat_id,
                            "text": "Choose",
                            "reply_markup": Correlator::inline_keyboard(&[("Status", "status")]),
                        }))?;
                        Ok(())
                    },
                    UserData::none(),
                )
                .unwrap();
            },
            UserData::none(),
        )
        .unwrap();
        assert_eq!(events.trigger(*CONNECTED), 1);

        let outcome = bridge
            .dispatch_record(
                &RawRecord::new()
                    .with("kind", "message")
                    .with("chat_id", 42)
                    .with("text", "/start"),
            )
            .unwrap();
        assert_eq!(outcome.matched, 1);
        assert_eq!(outcome.failed, 0);

        let seen = Arc::new(Mutex::new(None));
        let s = Arc::clone(&seen);
        answer_callback_query_with(
            "cb-1",
            Some("ok"),
            false,
            UserData::new(7_i32),
            move |response, data| {
                *s.lock() = Some((response.is_success(), data.downcast_ref::<i32>().copied()));
            },
        )
        .unwrap();

        {
            let requests = transport.requests.lock();
            assert_eq!(requests.len(), 2);
            assert_eq!(requests[0].method, "sendMessage");
            assert_eq!(requests[1].method, "answerCallbackQuery");
        }

        let pending = transport.pending.lock().remove(0);
        pending.complete(&RawRecord::new().with("ok", true).with("result", "true"));
        assert_eq!(*seen.lock(), Some((true, Some(7))));

        assert!(matches!(
            subscribe("", |_, _| Ok(()), UserData::none()),
            Err(FacadeError::Subscribe(SubscribeError::EmptyPattern))
        ));
    }
}
