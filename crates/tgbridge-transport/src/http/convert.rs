//! Conversion between Bot API JSON and native records.
//!
//! These helpers are pure so they can be exercised without a network.

use serde_json::Value;
use tracing::debug;

use tgbridge_core::{RawRecord, UNSUPPORTED_TEXT, UpdateKind};

/// Builds the URL of a Bot API method.
pub fn method_url(server: &str, token: &str, method: &str) -> String {
    format!("{}/bot{}/{}", server.trim_end_matches('/'), token, method)
}

/// Returns the `update_id` of a Bot API update.
pub fn update_id(update: &Value) -> Option<i64> {
    update.get("update_id").and_then(Value::as_i64)
}

/// Converts one Bot API update into an update record.
///
/// Returns `None` for update types the bridge does not route or updates
/// without a chat.
pub fn update_to_record(update: &Value) -> Option<RawRecord> {
    if let Some(message) = update.get("message") {
        message_record(update, message)
    } else if let Some(query) = update.get("callback_query") {
        callback_record(update, query)
    } else {
        debug!(update_id = ?update_id(update), "Ignoring unsupported update type");
        None
    }
}

fn message_record(update: &Value, message: &Value) -> Option<RawRecord> {
    let chat_id = message.pointer("/chat/id").and_then(Value::as_i64)?;
    let text = message.get("text").and_then(Value::as_str);

    let mut record = RawRecord::new()
        .with("kind", UpdateKind::Message.as_str())
        .with("chat_id", chat_id)
        .with("update_id", update_id(update))
        .with("user_id", message.pointer("/from/id").and_then(Value::as_i64))
        .with("message_id", message.get("message_id").and_then(Value::as_i64))
        .with("payload", message.to_string());

    match text {
        Some(text) => {
            record.set("ok", true);
            record.set("text", text);
        }
        None => {
            record.set("ok", false);
            record.set("text", UNSUPPORTED_TEXT);
        }
    }
    Some(record)
}

fn callback_record(update: &Value, query: &Value) -> Option<RawRecord> {
    let chat_id = query
        .pointer("/message/chat/id")
        .or_else(|| query.pointer("/from/id"))
        .and_then(Value::as_i64)?;

    Some(
        RawRecord::new()
            .with("kind", UpdateKind::CallbackQuery.as_str())
            .with("ok", true)
            .with("chat_id", chat_id)
            .with("update_id", update_id(update))
            .with("user_id", query.pointer("/from/id").and_then(Value::as_i64))
            .with(
                "message_id",
                query.pointer("/message/message_id").and_then(Value::as_i64),
            )
            .with("callback_id", query.get("id").and_then(Value::as_str))
            .with("text", query.get("data").and_then(Value::as_str))
            .with("payload", query.to_string()),
    )
}

/// Converts a Bot API response body into a response record.
///
/// `result` is carried as JSON text, the way the response layout declares it.
pub fn response_to_record(body: &Value) -> RawRecord {
    RawRecord::new()
        .with("ok", body.get("ok").and_then(Value::as_bool).unwrap_or(false))
        .with(
            "result",
            body.get("result")
                .filter(|r| !r.is_null())
                .map(Value::to_string),
        )
        .with("error_code", body.get("error_code").and_then(Value::as_i64))
        .with(
            "description",
            body.get("description").and_then(Value::as_str),
        )
}

/// Builds a failed response record for a call that never got an answer.
pub fn failure_record(description: impl Into<String>) -> RawRecord {
    RawRecord::new()
        .with("ok", false)
        .with("description", description.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tgbridge_core::{parse_response, parse_update};

    #[test]
    fn test_method_url() {
        assert_eq!(
            method_url("https://api.telegram.org/", "1:abc", "getMe"),
            "https://api.telegram.org/bot1:abc/getMe"
        );
    }

    #[test]
    fn test_text_message_update() {
        let update = json!({
            "update_id": 900,
            "message": {
                "message_id": 12,
                "from": {"id": 555},
                "chat": {"id": 42},
                "text": "/start"
            }
        });

        let record = update_to_record(&update).unwrap();
        let parsed = parse_update(&record).unwrap();
        assert_eq!(parsed.kind, UpdateKind::Message);
        assert_eq!(parsed.chat_id, 42);
        assert_eq!(parsed.user_id, Some(555));
        assert_eq!(parsed.message_id, Some(12));
        assert_eq!(parsed.update_id, Some(900));
        assert_eq!(parsed.text(), Some("/start"));
        assert!(parsed.is_supported());
        assert_eq!(parsed.payload.unwrap()["chat"]["id"], 42);
    }

    #[test]
    fn test_message_without_text_is_unsupported() {
        let update = json!({
            "update_id": 1,
            "message": {"message_id": 3, "chat": {"id": 8}, "sticker": {}}
        });

        let parsed = parse_update(&update_to_record(&update).unwrap()).unwrap();
        assert!(!parsed.is_supported());
        assert_eq!(parsed.text(), Some(UNSUPPORTED_TEXT));
    }

    #[test]
    fn test_callback_query_update() {
        let update = json!({
            "update_id": 2,
            "callback_query": {
                "id": "777",
                "from": {"id": 555},
                "message": {"message_id": 4, "chat": {"id": -100}},
                "data": "status"
            }
        });

        let parsed = parse_update(&update_to_record(&update).unwrap()).unwrap();
        assert_eq!(parsed.kind, UpdateKind::CallbackQuery);
        assert_eq!(parsed.chat_id, -100);
        assert_eq!(parsed.callback_id.as_deref(), Some("777"));
        assert_eq!(parsed.text(), Some("status"));
    }

    #[test]
    fn test_unrouted_update_is_skipped() {
        assert!(update_to_record(&json!({"update_id": 3, "edited_message": {}})).is_none());
        let no_chat = json!({"update_id": 4, "message": {"text": "no chat"}});
        assert!(update_to_record(&no_chat).is_none());
    }

    #[test]
    fn test_response_records() {
        let ok = parse_response(&response_to_record(&json!({
            "ok": true,
            "result": {"message_id": 77}
        })))
        .unwrap();
        assert!(ok.is_success());
        assert_eq!(ok.message_id(), Some(77));

        let failed = parse_response(&response_to_record(&json!({
            "ok": false,
            "error_code": 401,
            "description": "Unauthorized"
        })))
        .unwrap();
        assert_eq!(failed.error_code, Some(401));
        assert_eq!(failed.error_description(), Some("Unauthorized"));

        let lost = parse_response(&failure_record("connection reset")).unwrap();
        assert_eq!(lost.error_description(), Some("connection reset"));
    }
}
