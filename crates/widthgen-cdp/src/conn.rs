//! A shared WebSocket session with one DevTools target.

use crate::{Error, Result};
use futures::{SinkExt, StreamExt};
use rustc_hash::FxHashMap;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, trace, warn};

type Reply = Result<Value>;
type Pending = Arc<Mutex<Waiters>>;

/// Callers awaiting a reply, keyed by message id. `closed` flips once the reader is gone so
/// late callers fail instead of waiting forever.
#[derive(Default)]
struct Waiters {
    closed: bool,
    by_id: FxHashMap<u64, oneshot::Sender<Reply>>,
}

enum Outgoing {
    Frame(String),
    Close(oneshot::Sender<()>),
}

/// A connection to one DevTools target.
///
/// `Connection` is `Send + Sync` and is meant to be shared behind an `Arc`. Each [`call`]
/// registers its message id before the frame is written, and the reader task hands every
/// reply to the caller with the matching id. Callers therefore need no external locking.
///
/// Dropping the connection stops its background tasks; [`close`] additionally sends a close
/// frame to the browser.
///
/// [`call`]: Connection::call
/// [`close`]: Connection::close
pub struct Connection {
    next_id: AtomicU64,
    pending: Pending,
    outgoing: mpsc::UnboundedSender<Outgoing>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

#[derive(Debug, Deserialize)]
struct Incoming {
    id: Option<u64>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<ProtocolError>,
}

#[derive(Debug, Deserialize)]
struct ProtocolError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EvaluateReply {
    #[serde(default)]
    result: Option<RemoteObject>,
    #[serde(default)]
    exception_details: Option<ExceptionDetails>,
}

#[derive(Debug, Deserialize)]
struct RemoteObject {
    #[serde(default)]
    value: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ExceptionDetails {
    #[serde(default)]
    text: String,
    #[serde(default)]
    exception: Option<ExceptionObject>,
}

#[derive(Debug, Deserialize)]
struct ExceptionObject {
    #[serde(default)]
    description: Option<String>,
}

impl ExceptionDetails {
    fn describe(self) -> String {
        match self.exception.and_then(|e| e.description) {
            Some(desc) if !desc.is_empty() => desc,
            _ => self.text,
        }
    }
}

impl Connection {
    /// Opens the target's WebSocket (its `webSocketDebuggerUrl`).
    pub async fn connect(ws_url: &str) -> Result<Self> {
        let (stream, _) = tokio_tungstenite::connect_async(ws_url).await?;
        debug!(ws_url, "DevTools socket open");
        let (mut sink, mut source) = stream.split();

        let (outgoing, mut outgoing_rx) = mpsc::unbounded_channel::<Outgoing>();
        let writer = tokio::spawn(async move {
            while let Some(item) = outgoing_rx.recv().await {
                match item {
                    Outgoing::Frame(text) => {
                        if let Err(err) = sink.send(Message::Text(text)).await {
                            warn!(error = %err, "DevTools write failed");
                            break;
                        }
                    }
                    Outgoing::Close(done) => {
                        outgoing_rx.close();
                        let _ = sink.send(Message::Close(None)).await;
                        let _ = sink.flush().await;
                        let _ = done.send(());
                        break;
                    }
                }
            }
        });

        let pending: Pending = Arc::default();
        let reader_pending = Arc::clone(&pending);
        let reader = tokio::spawn(async move {
            while let Some(msg) = source.next().await {
                match msg {
                    Ok(Message::Text(text)) => dispatch(&reader_pending, &text),
                    Ok(Message::Binary(bytes)) => match std::str::from_utf8(&bytes) {
                        Ok(text) => dispatch(&reader_pending, text),
                        Err(_) => warn!("ignoring non-UTF-8 binary DevTools frame"),
                    },
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(err) => {
                        warn!(error = %err, "DevTools read failed");
                        break;
                    }
                }
            }
            fail_pending(&reader_pending);
            debug!("DevTools reader finished");
        });

        Ok(Self {
            next_id: AtomicU64::new(1),
            pending,
            outgoing,
            reader,
            writer,
        })
    }

    /// Sends one protocol command and awaits its `result` object.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let frame = json!({ "id": id, "method": method, "params": params }).to_string();

        let (tx, rx) = oneshot::channel();
        {
            let mut waiters = lock(&self.pending);
            if waiters.closed {
                return Err(Error::Closed);
            }
            waiters.by_id.insert(id, tx);
        }
        if self.outgoing.send(Outgoing::Frame(frame)).is_err() {
            lock(&self.pending).by_id.remove(&id);
            return Err(Error::Closed);
        }
        trace!(id, method, "DevTools command sent");

        rx.await.map_err(|_| Error::Closed)?
    }

    /// Evaluates `expression` in the page, awaits the promise it yields and decodes the
    /// resolved value.
    ///
    /// A thrown exception or rejected promise becomes [`Error::Evaluation`]. A resolved
    /// `undefined` decodes as JSON `null`.
    pub async fn eval_promise<T: DeserializeOwned>(&self, expression: &str) -> Result<T> {
        let raw = self
            .call(
                "Runtime.evaluate",
                json!({
                    "expression": expression,
                    "awaitPromise": true,
                    "returnByValue": true,
                }),
            )
            .await?;
        let reply: EvaluateReply = serde_json::from_value(raw)?;
        if let Some(details) = reply.exception_details {
            return Err(Error::Evaluation(details.describe()));
        }
        let value = reply.result.and_then(|r| r.value).unwrap_or(Value::Null);
        Ok(serde_json::from_value(value)?)
    }

    /// Sends a close frame and waits until it has been written.
    ///
    /// Calls still in flight resolve to [`Error::Closed`] once the browser acknowledges.
    /// Closing twice is harmless.
    pub async fn close(&self) {
        let (done, flushed) = oneshot::channel();
        if self.outgoing.send(Outgoing::Close(done)).is_ok() {
            let _ = flushed.await;
        }
        debug!("DevTools socket closed");
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.writer.abort();
        self.reader.abort();
        fail_pending(&self.pending);
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

fn dispatch(pending: &Pending, text: &str) {
    let incoming: Incoming = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(err) => {
            warn!(error = %err, "dropping malformed DevTools frame");
            return;
        }
    };
    let Some(id) = incoming.id else {
        trace!(method = incoming.method.as_deref().unwrap_or(""), "DevTools event");
        return;
    };
    let Some(tx) = lock(pending).by_id.remove(&id) else {
        warn!(id, "DevTools reply for unknown id");
        return;
    };
    let reply = match incoming.error {
        Some(err) => Err(Error::Protocol {
            code: err.code,
            message: err.message,
        }),
        None => Ok(incoming.result.unwrap_or(Value::Null)),
    };
    let _ = tx.send(reply);
}

fn fail_pending(pending: &Pending) {
    let mut waiters = lock(pending);
    waiters.closed = true;
    for (_, tx) in waiters.by_id.drain() {
        let _ = tx.send(Err(Error::Closed));
    }
}
