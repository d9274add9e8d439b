//! Outbound call correlation.
//!
//! Every outbound verb comes in two forms:
//!
//! | Form | Example | Completion |
//! |------|---------|------------|
//! | Fire-and-forget | [`Correlator::send_message`] | none |
//! | Callback | [`Correlator::send_message_with`] | runs exactly once if the call is accepted |
//!
//! A call is serialized and validated before it reaches the transport, so
//! bad arguments and serialization failures come back synchronously as a
//! [`SubmissionError`] and never run the completion.
//!
//! When the transport reports back, the native response record is decoded
//! with [`parse_response`] and the completion receives the typed
//! [`ResponseRecord`]. A record that fails to decode is turned into a failed
//! response, so the completion still runs once.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::foundation::error::{SubmissionError, SubmitResult};
use crate::foundation::record::{ResponseRecord, parse_response};
use crate::foundation::user_data::UserData;
use crate::integration::transport::{OutboundRequest, PendingCall, Transport};

/// Completion invoked with the decoded response and the caller's user data.
pub type Completion = Box<dyn FnOnce(&ResponseRecord, &UserData) + Send>;

/// Protocol method names used by the built-in verbs.
pub mod methods {
    /// Sends a message.
    pub const SEND_MESSAGE: &str = "sendMessage";
    /// Replaces a message's text.
    pub const EDIT_MESSAGE_TEXT: &str = "editMessageText";
    /// Replaces a message's inline keyboard.
    pub const EDIT_MESSAGE_REPLY_MARKUP: &str = "editMessageReplyMarkup";
    /// Answers a callback query.
    pub const ANSWER_CALLBACK_QUERY: &str = "answerCallbackQuery";
}

// =============================================================================
// Outbound Calls
// =============================================================================

/// An outbound protocol operation before serialization.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundCall {
    /// Plain text message.
    SendMessage {
        /// Target chat.
        chat_id: i64,
        /// Message text.
        text: String,
    },
    /// Message described by a full JSON object.
    SendMessageJson(Value),
    /// Replace the text of an existing message.
    EditMessageText {
        /// Chat holding the message.
        chat_id: i64,
        /// Message to edit.
        message_id: i64,
        /// New text.
        text: String,
    },
    /// Edit described by a full JSON object.
    EditMessageJson(Value),
    /// Replace the inline keyboard of an existing message.
    EditMessageReplyMarkup {
        /// Chat holding the message.
        chat_id: i64,
        /// Message to edit.
        message_id: i64,
        /// New `reply_markup` object.
        reply_markup: Value,
    },
    /// Answer a callback query.
    AnswerCallbackQuery {
        /// Query identifier from the update.
        callback_query_id: String,
        /// Optional notification text.
        text: Option<String>,
        /// Show an alert instead of a toast.
        show_alert: bool,
    },
    /// Answer described by a full JSON object.
    AnswerCallbackQueryJson(Value),
    /// Any other protocol method.
    Custom {
        /// Method name.
        method: String,
        /// JSON object body.
        payload: Value,
    },
}

#[derive(Serialize)]
struct TextBody<'a> {
    chat_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    message_id: Option<i64>,
    text: &'a str,
}

#[derive(Serialize)]
struct ReplyMarkupBody<'a> {
    chat_id: i64,
    message_id: i64,
    reply_markup: &'a Value,
}

#[derive(Serialize)]
struct AnswerBody<'a> {
    callback_query_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
    show_alert: bool,
}

impl OutboundCall {
    /// Returns the protocol method this call invokes.
    pub fn method(&self) -> &str {
        match self {
            Self::SendMessage { .. } | Self::SendMessageJson(_) => methods::SEND_MESSAGE,
            Self::EditMessageText { .. } | Self::EditMessageJson(_) => methods::EDIT_MESSAGE_TEXT,
            Self::EditMessageReplyMarkup { .. } => methods::EDIT_MESSAGE_REPLY_MARKUP,
            Self::AnswerCallbackQuery { .. } | Self::AnswerCallbackQueryJson(_) => {
                methods::ANSWER_CALLBACK_QUERY
            }
            Self::Custom { method, .. } => method,
        }
    }

    /// Validates the call and serializes it into a request.
    ///
    /// # Errors
    ///
    /// Returns [`SubmissionError::InvalidArgument`] for empty text or ids,
    /// malformed method names and non-object payloads, and
    /// [`SubmissionError::Serialization`] if the body cannot be written.
    pub fn into_request(self) -> SubmitResult<OutboundRequest> {
        let method = self.method().to_string();
        let body = match &self {
            Self::SendMessage { chat_id, text } => {
                require_text("text", text)?;
                serde_json::to_string(&TextBody {
                    chat_id: *chat_id,
                    message_id: None,
                    text,
                })?
            }
            Self::EditMessageText {
                chat_id,
                message_id,
                text,
            } => {
                require_text("text", text)?;
                serde_json::to_string(&TextBody {
                    chat_id: *chat_id,
                    message_id: Some(*message_id),
                    text,
                })?
            }
            Self::EditMessageReplyMarkup {
                chat_id,
                message_id,
                reply_markup,
            } => {
                require_object("reply_markup", reply_markup)?;
                serde_json::to_string(&ReplyMarkupBody {
                    chat_id: *chat_id,
                    message_id: *message_id,
                    reply_markup,
                })?
            }
            Self::AnswerCallbackQuery {
                callback_query_id,
                text,
                show_alert,
            } => {
                require_text("callback_query_id", callback_query_id)?;
                serde_json::to_string(&AnswerBody {
                    callback_query_id,
                    text: text.as_deref(),
                    show_alert: *show_alert,
                })?
            }
            Self::SendMessageJson(payload)
            | Self::EditMessageJson(payload)
            | Self::AnswerCallbackQueryJson(payload) => {
                require_object("payload", payload)?;
                serde_json::to_string(payload)?
            }
            Self::Custom { method, payload } => {
                validate_method(method)?;
                require_object("payload", payload)?;
                serde_json::to_string(payload)?
            }
        };
        Ok(OutboundRequest { method, body })
    }
}

fn require_text(argument: &'static str, value: &str) -> SubmitResult<()> {
    if value.is_empty() {
        return Err(SubmissionError::invalid(argument, "must not be empty"));
    }
    Ok(())
}

fn require_object(argument: &'static str, value: &Value) -> SubmitResult<()> {
    if !value.is_object() {
        return Err(SubmissionError::invalid(argument, "must be a JSON object"));
    }
    Ok(())
}

fn validate_method(method: &str) -> SubmitResult<()> {
    if method.is_empty() {
        return Err(SubmissionError::invalid("method", "must not be empty"));
    }
    if !method
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(SubmissionError::invalid(
            "method",
            format!("'{method}' contains characters outside [A-Za-z0-9_]"),
        ));
    }
    Ok(())
}

fn to_payload<T: Serialize + ?Sized>(payload: &T) -> SubmitResult<Value> {
    Ok(serde_json::to_value(payload)?)
}

// =============================================================================
// Correlator
// =============================================================================

/// Issues outbound calls and ties completions to their responses.
pub struct Correlator {
    transport: Arc<dyn Transport>,
    next_call_id: AtomicU64,
}

impl Correlator {
    /// Creates a correlator over a transport.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            next_call_id: AtomicU64::new(1),
        }
    }

    /// Submits a call, returning its id.
    ///
    /// With `completion` set to `None` the call is fire-and-forget and the
    /// transport receives no pending call.
    ///
    /// # Errors
    ///
    /// Returns a [`SubmissionError`] if the call is invalid or the transport
    /// rejects it. The completion is dropped without running.
    pub fn submit(
        &self,
        call: OutboundCall,
        completion: Option<Completion>,
        user_data: UserData,
    ) -> SubmitResult<u64> {
        let request = call.into_request()?;
        let id = self.next_call_id.fetch_add(1, Ordering::Relaxed);
        let method = request.method.clone();

        let pending = completion.map(|completion| {
            let method = method.clone();
            PendingCall::new(
                id,
                method.clone(),
                Box::new(move |record| {
                    let response = parse_response(record).unwrap_or_else(|err| {
                        warn!(
                            call_id = id,
                            method = %method,
                            error = %err,
                            "Malformed response record"
                        );
                        ResponseRecord::failure(format!("malformed response: {err}"))
                    });
                    debug!(call_id = id, method = %method, ok = response.ok, "Completing call");
                    completion(&response, &user_data);
                }),
            )
        });
        let has_completion = pending.is_some();

        self.transport.submit(request, pending).inspect_err(|err| {
            warn!(call_id = id, method = %method, error = %err, "Outbound call rejected");
        })?;

        debug!(call_id = id, method = %method, has_completion, "Outbound call submitted");
        Ok(id)
    }

    fn submit_with<F>(
        &self,
        call: OutboundCall,
        user_data: UserData,
        completion: F,
    ) -> SubmitResult<u64>
    where
        F: FnOnce(&ResponseRecord, &UserData) + Send + 'static,
    {
        self.submit(call, Some(Box::new(completion)), user_data)
    }

    /// Sends a text message.
    pub fn send_message(&self, chat_id: i64, text: impl Into<String>) -> SubmitResult<u64> {
        let text = text.into();
        self.submit(OutboundCall::SendMessage { chat_id, text }, None, UserData::none())
    }

    /// Sends a text message and runs `completion` with the response.
    pub fn send_message_with<F>(
        &self,
        chat_id: i64,
        text: impl Into<String>,
        user_data: UserData,
        completion: F,
    ) -> SubmitResult<u64>
    where
        F: FnOnce(&ResponseRecord, &UserData) + Send + 'static,
    {
        let text = text.into();
        self.submit_with(OutboundCall::SendMessage { chat_id, text }, user_data, completion)
    }

    /// Sends a message described by a JSON object (`chat_id`, `text`, `reply_markup`, ...).
    pub fn send_json<T: Serialize + ?Sized>(&self, payload: &T) -> SubmitResult<u64> {
        let call = OutboundCall::SendMessageJson(to_payload(payload)?);
        self.submit(call, None, UserData::none())
    }

    /// JSON form of [`send_message_with`](Self::send_message_with).
    pub fn send_json_with<T, F>(
        &self,
        payload: &T,
        user_data: UserData,
        completion: F,
    ) -> SubmitResult<u64>
    where
        T: Serialize + ?Sized,
        F: FnOnce(&ResponseRecord, &UserData) + Send + 'static,
    {
        let call = OutboundCall::SendMessageJson(to_payload(payload)?);
        self.submit_with(call, user_data, completion)
    }

    /// Replaces the text of a message.
    pub fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: impl Into<String>,
    ) -> SubmitResult<u64> {
        let call = OutboundCall::EditMessageText {
            chat_id,
            message_id,
            text: text.into(),
        };
        self.submit(call, None, UserData::none())
    }

    /// Replaces the text of a message and runs `completion` with the response.
    pub fn edit_message_text_with<F>(
        &self,
        chat_id: i64,
        message_id: i64,
        text: impl Into<String>,
        user_data: UserData,
        completion: F,
    ) -> SubmitResult<u64>
    where
        F: FnOnce(&ResponseRecord, &UserData) + Send + 'static,
    {
        let call = OutboundCall::EditMessageText {
            chat_id,
            message_id,
            text: text.into(),
        };
        self.submit_with(call, user_data, completion)
    }

    /// Edits a message described by a JSON object.
    pub fn edit_json<T: Serialize + ?Sized>(&self, payload: &T) -> SubmitResult<u64> {
        let call = OutboundCall::EditMessageJson(to_payload(payload)?);
        self.submit(call, None, UserData::none())
    }

    /// JSON form of [`edit_message_text_with`](Self::edit_message_text_with).
    pub fn edit_json_with<T, F>(
        &self,
        payload: &T,
        user_data: UserData,
        completion: F,
    ) -> SubmitResult<u64>
    where
        T: Serialize + ?Sized,
        F: FnOnce(&ResponseRecord, &UserData) + Send + 'static,
    {
        let call = OutboundCall::EditMessageJson(to_payload(payload)?);
        self.submit_with(call, user_data, completion)
    }

    /// Replaces the inline keyboard of a message.
    pub fn edit_message_reply_markup<T: Serialize + ?Sized>(
        &self,
        chat_id: i64,
        message_id: i64,
        reply_markup: &T,
    ) -> SubmitResult<u64> {
        let call = OutboundCall::EditMessageReplyMarkup {
            chat_id,
            message_id,
            reply_markup: to_payload(reply_markup)?,
        };
        self.submit(call, None, UserData::none())
    }

    /// Replaces the inline keyboard of a message and runs `completion`.
    pub fn edit_message_reply_markup_with<T, F>(
        &self,
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
        let call = OutboundCall::EditMessageReplyMarkup {
            chat_id,
            message_id,
            reply_markup: to_payload(reply_markup)?,
        };
        self.submit_with(call, user_data, completion)
    }

    /// Answers a callback query.
    pub fn answer_callback_query(
        &self,
        callback_query_id: impl Into<String>,
        text: Option<&str>,
        show_alert: bool,
    ) -> SubmitResult<u64> {
        let call = OutboundCall::AnswerCallbackQuery {
            callback_query_id: callback_query_id.into(),
            text: text.map(str::to_string),
            show_alert,
        };
        self.submit(call, None, UserData::none())
    }

    /// Answers a callback query and runs `completion` with the response.
    pub fn answer_callback_query_with<F>(
        &self,
        callback_query_id: impl Into<String>,
        text: Option<&str>,
        show_alert: bool,
        user_data: UserData,
        completion: F,
    ) -> SubmitResult<u64>
    where
        F: FnOnce(&ResponseRecord, &UserData) + Send + 'static,
    {
        let call = OutboundCall::AnswerCallbackQuery {
            callback_query_id: callback_query_id.into(),
            text: text.map(str::to_string),
            show_alert,
        };
        self.submit_with(call, user_data, completion)
    }

    /// Answers a callback query described by a JSON object.
    pub fn answer_callback_json<T: Serialize + ?Sized>(&self, payload: &T) -> SubmitResult<u64> {
        let call = OutboundCall::AnswerCallbackQueryJson(to_payload(payload)?);
        self.submit(call, None, UserData::none())
    }

    /// JSON form of [`answer_callback_query_with`](Self::answer_callback_query_with).
    pub fn answer_callback_json_with<T, F>(
        &self,
        payload: &T,
        user_data: UserData,
        completion: F,
    ) -> SubmitResult<u64>
    where
        T: Serialize + ?Sized,
        F: FnOnce(&ResponseRecord, &UserData) + Send + 'static,
    {
        let call = OutboundCall::AnswerCallbackQueryJson(to_payload(payload)?);
        self.submit_with(call, user_data, completion)
    }

    /// Invokes an arbitrary protocol method with a JSON object body.
    pub fn call_method<T: Serialize + ?Sized>(
        &self,
        method: impl Into<String>,
        payload: &T,
    ) -> SubmitResult<u64> {
        let call = OutboundCall::Custom {
            method: method.into(),
            payload: to_payload(payload)?,
        };
        self.submit(call, None, UserData::none())
    }

    /// Invokes an arbitrary protocol method and runs `completion`.
    pub fn call_method_with<T, F>(
        &self,
        method: impl Into<String>,
        payload: &T,
        user_data: UserData,
        completion: F,
    ) -> SubmitResult<u64>
    where
        T: Serialize + ?Sized,
        F: FnOnce(&ResponseRecord, &UserData) + Send + 'static,
    {
        let call = OutboundCall::Custom {
            method: method.into(),
            payload: to_payload(payload)?,
        };
        self.submit_with(call, user_data, completion)
    }

    /// Builds the `reply_markup` for a one-row inline keyboard.
    ///
    /// Each button is `(label, callback_data)`.
    pub fn inline_keyboard(buttons: &[(&str, &str)]) -> Value {
        let row: Vec<Value> = buttons
            .iter()
            .map(|(text, data)| json!({ "text": text, "callback_data": data }))
            .collect();
        json!({ "inline_keyboard": [row] })
    }
}

impl fmt::Debug for Correlator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Correlator")
            .field("next_call_id", &self.next_call_id.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::descriptor::RawRecord;
    use parking_lot::Mutex;
    use serde::Serializer;
    use serde::ser::{Error as _, SerializeMap};
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Records submissions and keeps pending calls for later completion.
    #[derive(Default)]
    struct MockTransport {
        requests: Mutex<Vec<OutboundRequest>>,
        pending: Mutex<Vec<PendingCall>>,
        reject: bool,
    }

    impl Transport for MockTransport {
        fn submit(
            &self,
            request: OutboundRequest,
            pending: Option<PendingCall>,
        ) -> SubmitResult<()> {
            if self.reject {
                return Err(SubmissionError::Unavailable("offline".into()));
            }
            self.requests.lock().push(request);
            if let Some(pending) = pending {
                self.pending.lock().push(pending);
            }
            Ok(())
        }
    }

    impl MockTransport {
        fn complete_next(&self, record: RawRecord) {
            let pending = self.pending.lock().remove(0);
            pending.complete(&record);
        }
    }

    fn setup() -> (Arc<MockTransport>, Correlator) {
        let transport = Arc::new(MockTransport::default());
        let correlator = Correlator::new(transport.clone());
        (transport, correlator)
    }

    type Seen = Arc<Mutex<Vec<(ResponseRecord, Option<&'static str>)>>>;

    fn capture(seen: &Seen) -> impl FnOnce(&ResponseRecord, &UserData) + Send + 'static {
        let seen = Arc::clone(seen);
        move |response, data| {
            seen.lock()
                .push((response.clone(), data.downcast_ref::<&'static str>().copied()));
        }
    }

    #[test]
    fn test_send_message_body() {
        let (transport, correlator) = setup();
        correlator.send_message(42, "hello").unwrap();

        let requests = transport.requests.lock();
        assert_eq!(requests[0].method, "sendMessage");
        assert_eq!(
            requests[0].body_json().unwrap(),
            json!({"chat_id": 42, "text": "hello"})
        );
        assert!(transport.pending.lock().is_empty());
    }

    #[test]
    fn test_completion_runs_once_on_success() {
        let (transport, correlator) = setup();
        let seen: Seen = Arc::default();

        correlator
            .send_message_with(1, "hi", UserData::new("ctx"), capture(&seen))
            .unwrap();
        assert!(seen.lock().is_empty());

        transport.complete_next(
            RawRecord::new()
                .with("ok", true)
                .with("result", r#"{"message_id": 10}"#),
        );

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].0.is_success());
        assert_eq!(seen[0].0.message_id(), Some(10));
        assert_eq!(seen[0].1, Some("ctx"));
        assert!(transport.pending.lock().is_empty());
    }

    #[test]
    fn test_completion_runs_once_on_failure() {
        let (transport, correlator) = setup();
        let seen: Seen = Arc::default();

        correlator
            .edit_message_text_with(1, 2, "new", UserData::none(), capture(&seen))
            .unwrap();
        transport.complete_next(
            RawRecord::new()
                .with("ok", false)
                .with("error_code", 400_i64)
                .with("description", "Bad Request: message is not modified"),
        );

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert!(!seen[0].0.is_success());
        assert_eq!(
            seen[0].0.error_description(),
            Some("Bad Request: message is not modified")
        );
    }

    #[test]
    fn test_malformed_response_still_completes() {
        let (transport, correlator) = setup();
        let seen: Seen = Arc::default();

        correlator
            .call_method_with("getChat", &json!({"chat_id": 1}), UserData::none(), capture(&seen))
            .unwrap();
        transport.complete_next(RawRecord::new().with("ok", true).with("result", "{not json"));

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert!(!seen[0].0.is_success());
        assert!(seen[0].0.error_description().is_some());
    }

    struct Node {
        name: &'static str,
        next: RefCell<Option<Rc<Node>>>,
    }

    struct Walk<'a> {
        node: &'a Node,
        seen: &'a RefCell<Vec<*const Node>>,
    }

    impl Serialize for Walk<'_> {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let ptr = self.node as *const Node;
            if self.seen.borrow().contains(&ptr) {
                return Err(S::Error::custom("cyclic structure"));
            }
            self.seen.borrow_mut().push(ptr);

            let mut map = serializer.serialize_map(Some(2))?;
            map.serialize_entry("name", self.node.name)?;
            match &*self.node.next.borrow() {
                Some(next) => map.serialize_entry(
                    "next",
                    &Walk {
                        node: next,
                        seen: self.seen,
                    },
                )?,
                None => map.serialize_entry("next", &())?,
            }
            map.end()
        }
    }

    impl Serialize for Node {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let seen = RefCell::new(Vec::new());
            Walk { node: self, seen: &seen }.serialize(serializer)
        }
    }

    #[test]
    fn test_cyclic_payload_fails_synchronously() {
        let a = Rc::new(Node {
            name: "a",
            next: RefCell::new(None),
        });
        let b = Rc::new(Node {
            name: "b",
            next: RefCell::new(Some(Rc::clone(&a))),
        });
        *a.next.borrow_mut() = Some(Rc::clone(&b));

        let (transport, correlator) = setup();
        let seen: Seen = Arc::default();

        let result = correlator.send_json_with(&*a, UserData::none(), capture(&seen));
        assert!(matches!(result, Err(SubmissionError::Serialization(_))));
        assert!(seen.lock().is_empty());
        assert!(transport.requests.lock().is_empty());

        // Break the cycle so the nodes are freed.
        a.next.borrow_mut().take();
    }

    #[test]
    fn test_invalid_arguments_are_rejected() {
        let (transport, correlator) = setup();

        assert!(matches!(
            correlator.send_message(1, ""),
            Err(SubmissionError::InvalidArgument { argument: "text", .. })
        ));
        assert!(matches!(
            correlator.send_json(&json!([1, 2, 3])),
            Err(SubmissionError::InvalidArgument { argument: "payload", .. })
        ));
        assert!(matches!(
            correlator.call_method("send message", &json!({})),
            Err(SubmissionError::InvalidArgument { argument: "method", .. })
        ));
        assert!(matches!(
            correlator.answer_callback_query("", None, false),
            Err(SubmissionError::InvalidArgument { .. })
        ));
        assert!(transport.requests.lock().is_empty());
    }

    #[test]
    fn test_transport_rejection_never_completes() {
        let transport = Arc::new(MockTransport {
            reject: true,
            ..Default::default()
        });
        let correlator = Correlator::new(transport.clone());
        let seen: Seen = Arc::default();

        let result = correlator.send_message_with(1, "hi", UserData::none(), capture(&seen));
        assert!(matches!(result, Err(SubmissionError::Unavailable(_))));
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn test_answer_and_markup_bodies() {
        let (transport, correlator) = setup();
        correlator
            .answer_callback_query("cb-7", Some("done"), true)
            .unwrap();
        correlator
            .edit_message_reply_markup(5, 6, &Correlator::inline_keyboard(&[("Status", "status")]))
            .unwrap();

        let requests = transport.requests.lock();
        assert_eq!(requests[0].method, "answerCallbackQuery");
        assert_eq!(
            requests[0].body_json().unwrap(),
            json!({"callback_query_id": "cb-7", "text": "done", "show_alert": true})
        );
        assert_eq!(requests[1].method, "editMessageReplyMarkup");
        assert_eq!(
            requests[1].body_json().unwrap()["reply_markup"]["inline_keyboard"][0][0],
            json!({"text": "Status", "callback_data": "status"})
        );
    }

    #[test]
    fn test_call_ids_are_sequential() {
        let (_transport, correlator) = setup();
        let first = correlator.send_message(1, "a").unwrap();
        let second = correlator.send_message(1, "b").unwrap();
        assert_eq!(second, first + 1);
    }
}
