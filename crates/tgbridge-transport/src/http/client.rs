//! Long-polling Bot API client.
//!
//! [`http_transport`] returns the two halves of the transport:
//!
//! - [`HttpTransport`] accepts outbound calls into a bounded queue.
//! - [`HttpDriver`] runs the `getMe` handshake, the `getUpdates` poll loop and
//!   the outbound sender side by side until shutdown.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, ClientBuilder};
use serde_json::{Value, json};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use tgbridge_core::{
    OutboundRequest, PendingCall, SubmissionError, SubmitResult, Transport, TransportDriver,
    TransportEvent, UpdateKind,
};

use crate::config::HttpTransportConfig;
use crate::error::{TransportError, TransportResult};
use crate::http::convert::{
    failure_record, method_url, response_to_record, update_id, update_to_record,
};

/// Slack added on top of the long-poll timeout for the HTTP client timeout.
const REQUEST_TIMEOUT_SLACK: Duration = Duration::from_secs(10);

struct Outgoing {
    request: OutboundRequest,
    pending: Option<PendingCall>,
}

/// Creates a Bot API transport.
///
/// # Errors
///
/// Returns [`TransportError::InvalidConfig`] for an empty token or queue
/// length, and [`TransportError::Http`] if the HTTP client cannot be built.
pub fn http_transport(config: HttpTransportConfig) -> TransportResult<(HttpTransport, HttpDriver)> {
    if config.token.is_empty() {
        return Err(TransportError::InvalidConfig("token is empty".into()));
    }
    if config.tx_queue_len == 0 {
        return Err(TransportError::InvalidConfig(
            "tx_queue_len must be at least 1".into(),
        ));
    }

    let client = ClientBuilder::new()
        .timeout(config.poll_timeout + REQUEST_TIMEOUT_SLACK)
        .build()?;
    let (outbound_tx, outbound_rx) = mpsc::channel(config.tx_queue_len);

    let transport = HttpTransport {
        outbound: outbound_tx,
        capacity: config.tx_queue_len,
    };
    let driver = HttpDriver {
        api: BotApi { client, config },
        outbound: outbound_rx,
    };
    Ok((transport, driver))
}

// =============================================================================
// Submission half
// =============================================================================

/// Submission half of the Bot API transport.
#[derive(Debug)]
pub struct HttpTransport {
    outbound: mpsc::Sender<Outgoing>,
    capacity: usize,
}

impl Transport for HttpTransport {
    fn submit(&self, request: OutboundRequest, pending: Option<PendingCall>) -> SubmitResult<()> {
        match self.outbound.try_send(Outgoing { request, pending }) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(SubmissionError::QueueFull {
                capacity: self.capacity,
            }),
            Err(TrySendError::Closed(_)) => Err(SubmissionError::Unavailable(
                "transport has shut down".into(),
            )),
        }
    }
}

impl std::fmt::Debug for Outgoing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Outgoing")
            .field("method", &self.request.method)
            .field("pending", &self.pending)
            .finish()
    }
}

// =============================================================================
// Bot API access
// =============================================================================

struct BotApi {
    client: Client,
    config: HttpTransportConfig,
}

impl BotApi {
    /// POSTs to a method and returns the parsed JSON body.
    ///
    /// Error statuses still carry a Bot API body, so the status is not
    /// checked here.
    async fn post(&self, method: &str, body: Option<String>) -> TransportResult<Value> {
        let url = method_url(&self.config.server, &self.config.token, method);
        let mut request = self.client.post(&url).header(CONTENT_TYPE, "application/json");
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            TransportError::InvalidResponse(format!("HTTP {}: {}", status.as_u16(), e))
        })
    }

    async fn handshake(&self) -> TransportResult<Value> {
        let body = self.post("getMe", None).await?;
        if body.get("ok").and_then(Value::as_bool) == Some(true) {
            Ok(body)
        } else {
            Err(TransportError::InvalidResponse(describe_failure(&body)))
        }
    }

    async fn get_updates(&self, offset: Option<i64>) -> TransportResult<Vec<Value>> {
        let mut params = json!({
            "limit": 1,
            "timeout": self.config.poll_timeout.as_secs(),
            "allowed_updates": [UpdateKind::Message.as_str(), UpdateKind::CallbackQuery.as_str()],
        });
        if let Some(offset) = offset {
            params["offset"] = json!(offset + 1);
        }

        let body = self.post("getUpdates", Some(params.to_string())).await?;
        if body.get("ok").and_then(Value::as_bool) != Some(true) {
            return Err(TransportError::InvalidResponse(describe_failure(&body)));
        }
        match body.get("result") {
            Some(Value::Array(updates)) => Ok(updates.clone()),
            _ => Err(TransportError::InvalidResponse(
                "getUpdates result is not an array".into(),
            )),
        }
    }
}

fn describe_failure(body: &Value) -> String {
    let code = body.get("error_code").and_then(Value::as_i64);
    let description = body
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or("no description");
    match code {
        Some(code) => format!("{code}: {description}"),
        None => description.to_string(),
    }
}

// =============================================================================
// Driver half
// =============================================================================

/// Driving half of the Bot API transport.
pub struct HttpDriver {
    api: BotApi,
    outbound: mpsc::Receiver<Outgoing>,
}

impl std::fmt::Debug for HttpDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpDriver")
            .field("config", &self.api.config)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TransportDriver for HttpDriver {
    async fn run(
        self: Box<Self>,
        events: mpsc::Sender<TransportEvent>,
        shutdown: CancellationToken,
    ) {
        let HttpDriver { api, outbound } = *self;
        info!(server = %api.config.server, "Starting Bot API transport");

        tokio::join!(
            poll_loop(&api, &events, &shutdown),
            send_loop(&api, outbound, &events, &shutdown),
        );

        info!("Bot API transport stopped");
    }
}

/// Runs the handshake, then polls for updates until a poll fails, then
/// starts over.
async fn poll_loop(
    api: &BotApi,
    events: &mpsc::Sender<TransportEvent>,
    shutdown: &CancellationToken,
) {
    let mut offset: Option<i64> = None;

    loop {
        // Handshake with a fixed pause between attempts.
        loop {
            let result = tokio::select! {
                _ = shutdown.cancelled() => return,
                result = api.handshake() => result,
            };
            match result {
                Ok(me) => {
                    let username = me
                        .pointer("/result/username")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown");
                    info!(username, "Connected to Bot API");
                    break;
                }
                Err(e) => {
                    warn!(error = %e, retry_in = ?api.config.handshake_retry, "getMe failed");
                }
            }
            tokio::select! {
                _ = shutdown.cancelled() => return,
                () = tokio::time::sleep(api.config.handshake_retry) => {}
            }
        }

        if events.send(TransportEvent::Connected).await.is_err() {
            return;
        }

        loop {
            let result = tokio::select! {
                _ = shutdown.cancelled() => return,
                result = api.get_updates(offset) => result,
            };

            let updates = match result {
                Ok(updates) => updates,
                Err(e) => {
                    warn!(error = %e, "getUpdates failed, reconnecting");
                    if events.send(TransportEvent::Disconnected).await.is_err() {
                        return;
                    }
                    break;
                }
            };

            // The offset only moves past an update once it is queued. A full
            // event queue pauses polling here.
            for update in &updates {
                if let Some(record) = update_to_record(update) {
                    info!(update_id = ?update_id(update), "Received update");
                    let queued = tokio::select! {
                        _ = shutdown.cancelled() => return,
                        queued = events.send(TransportEvent::Update(record)) => queued,
                    };
                    if queued.is_err() {
                        return;
                    }
                }
                if let Some(id) = update_id(update) {
                    offset = Some(id);
                }
            }
        }
    }
}

/// Sends queued outbound calls one at a time.
async fn send_loop(
    api: &BotApi,
    mut outbound: mpsc::Receiver<Outgoing>,
    events: &mpsc::Sender<TransportEvent>,
    shutdown: &CancellationToken,
) {
    loop {
        let Outgoing { request, pending } = tokio::select! {
            _ = shutdown.cancelled() => break,
            outgoing = outbound.recv() => match outgoing {
                Some(outgoing) => outgoing,
                None => break,
            },
        };

        debug!(method = %request.method, body = %request.body, "Sending request");
        let result = tokio::select! {
            _ = shutdown.cancelled() => break,
            result = api.post(&request.method, Some(request.body)) => result,
        };

        let record = match result {
            Ok(body) => {
                if body.get("ok").and_then(Value::as_bool) == Some(true) {
                    info!(method = %request.method, "Request succeeded");
                } else {
                    warn!(
                        method = %request.method,
                        error = %describe_failure(&body),
                        "Request rejected"
                    );
                }
                response_to_record(&body)
            }
            Err(e) => {
                warn!(method = %request.method, error = %e, "Request failed");
                failure_record(e.to_string())
            }
        };

        if let Some(pending) = pending
            && events
                .send(TransportEvent::Completed { pending, record })
                .await
                .is_err()
        {
            break;
        }
    }

    // Calls still queued at shutdown are dropped with their completions.
    outbound.close();
    let mut dropped = 0_usize;
    while outbound.try_recv().is_ok() {
        dropped += 1;
    }
    if dropped > 0 {
        debug!(dropped, "Discarded queued outbound calls");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tgbridge_core::{Correlator, UserData};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::time::timeout;

    use super::*;

    /// Reads one request and returns its request line.
    async fn read_request(socket: &mut TcpStream) -> Option<String> {
        let mut buf = Vec::new();
        let mut chunk = [0_u8; 1024];
        loop {
            let n = socket.read(&mut chunk).await.ok()?;
            if n == 0 {
                return None;
            }
            buf.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buf);
            let Some(head_end) = text.find("\r\n\r\n") else {
                continue;
            };
            let body_len = text[..head_end]
                .lines()
                .filter_map(|line| line.split_once(':'))
                .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
                .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= head_end + 4 + body_len {
                return text.lines().next().map(str::to_string);
            }
        }
    }

    /// Serves a fake Bot API whose `getUpdates` holds for `poll_delay` and
    /// returns no updates.
    async fn fake_bot_api(poll_delay: Duration) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let Some(request_line) = read_request(&mut socket).await else {
                        return;
                    };
                    let body = if request_line.contains("/getUpdates") {
                        tokio::time::sleep(poll_delay).await;
                        r#"{"ok":true,"result":[]}"#
                    } else if request_line.contains("/getMe") {
                        r#"{"ok":true,"result":{"username":"tgbridge_bot"}}"#
                    } else {
                        r#"{"ok":true,"result":{"message_id":7}}"#
                    };
                    let response = format!(
                        "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\n\
                         content-length: {}\r\nconnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                });
            }
        });

        format!("http://{addr}")
    }

    fn transport(len: usize) -> (HttpTransport, HttpDriver) {
        http_transport(HttpTransportConfig::new("1:test").tx_queue_len(len)).unwrap()
    }

    #[test]
    fn test_rejects_empty_token() {
        assert!(matches!(
            http_transport(HttpTransportConfig::default()),
            Err(TransportError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_full_queue_rejects_synchronously() {
        let (transport, _driver) = transport(1);
        let request = OutboundRequest::new("sendMessage", r#"{"chat_id":1,"text":"a"}"#);

        transport.submit(request.clone(), None).unwrap();
        assert!(matches!(
            transport.submit(request, None),
            Err(SubmissionError::QueueFull { capacity: 1 })
        ));
    }

    #[test]
    fn test_closed_driver_is_unavailable() {
        let (transport, driver) = transport(1);
        drop(driver);
        assert!(matches!(
            transport.submit(OutboundRequest::new("getMe", "{}"), None),
            Err(SubmissionError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_cancelled_driver_stops() {
        let (_transport, driver) = transport(1);
        let (events_tx, mut events_rx) = mpsc::channel(1);
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        Box::new(driver).run(events_tx, shutdown).await;
        assert!(events_rx.recv().await.is_none());
    }

    #[test]
    fn test_describe_failure() {
        assert_eq!(
            describe_failure(&json!({"ok": false, "error_code": 404, "description": "Not Found"})),
            "404: Not Found"
        );
        assert_eq!(describe_failure(&json!({"ok": false})), "no description");
    }

    #[tokio::test]
    async fn test_completion_not_held_behind_long_poll() {
        let server = fake_bot_api(Duration::from_secs(3)).await;
        let (transport, driver) =
            http_transport(HttpTransportConfig::new("1:test").server(server)).unwrap();
        let (events_tx, mut events_rx) = mpsc::channel(1);
        let shutdown = CancellationToken::new();
        let driver_task = tokio::spawn(Box::new(driver).run(events_tx, shutdown.clone()));

        let connected = timeout(Duration::from_secs(5), events_rx.recv()).await.unwrap();
        assert!(matches!(connected, Some(TransportEvent::Connected)));

        // getUpdates is now parked on the server; the reply must not wait for it.
        let correlator = Correlator::new(Arc::new(transport));
        correlator
            .send_message_with(42, "hi", UserData::none(), |_, _| {})
            .unwrap();

        let event = timeout(Duration::from_secs(1), events_rx.recv())
            .await
            .expect("completion waited for the long poll");
        match event {
            Some(TransportEvent::Completed { pending, .. }) => {
                assert_eq!(pending.method(), "sendMessage");
            }
            other => panic!("unexpected event: {other:?}"),
        }

        shutdown.cancel();
        driver_task.await.unwrap();
    }
}
