use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{stream::BoxStream, StreamExt};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::client::{decoder::StreamDecoder, error::ClientError};
use crate::models::chat::{ChatMessage, Role, WireMessage};
use crate::utils::i18n::{chat_strings, translate, Locale, TranslationTable};

pub const FAILED_TO_GET_RESPONSE: &str = "Failed to get response";
pub const STREAM_INTERRUPTED: &str = "Connection lost while receiving response";
pub const REQUEST_CANCELLED: &str = "Request was cancelled";

pub type ChatStream = BoxStream<'static, Result<Bytes, ClientError>>;

/// Posts a transcript to the completion endpoint and hands back the raw body.
/// A non-2xx reply is an `Err`, never a stream.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn open(&self, messages: Vec<WireMessage>) -> Result<ChatStream, ClientError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ChatStatus {
    #[default]
    Idle,
    Sending,
    Streaming,
}

impl ChatStatus {
    pub fn is_busy(&self) -> bool {
        matches!(self, ChatStatus::Sending | ChatStatus::Streaming)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChatError {
    #[error("message is empty")]
    EmptyMessage,
    #[error("a reply is already in progress")]
    Busy,
    #[error("{0}")]
    Failed(String),
}

/// One conversation with the assistant. Only one request may be in flight at
/// a time; the reply is rendered into the transcript as it streams in.
///
/// A failed request returns the status to `Idle` and leaves its message in
/// [`ChatSession::error`] until the next send.
pub struct ChatSession {
    transport: Arc<dyn ChatTransport>,
    transcript: watch::Sender<Vec<ChatMessage>>,
    status: watch::Sender<ChatStatus>,
    error: watch::Sender<Option<String>>,
    locale: Locale,
    strings: TranslationTable,
}

impl ChatSession {
    pub fn new(transport: Arc<dyn ChatTransport>, locale: Locale) -> Self {
        Self {
            transport,
            transcript: watch::channel(Vec::new()).0,
            status: watch::channel(ChatStatus::Idle).0,
            error: watch::channel(None).0,
            locale,
            strings: chat_strings(),
        }
    }

    pub fn welcome_message(&self) -> String {
        translate(&self.strings, self.locale, "chat.welcome")
    }

    pub fn placeholder(&self) -> String {
        translate(&self.strings, self.locale, "chat.placeholder")
    }

    pub fn transcript(&self) -> Vec<ChatMessage> {
        self.transcript.borrow().clone()
    }

    pub fn subscribe_transcript(&self) -> watch::Receiver<Vec<ChatMessage>> {
        self.transcript.subscribe()
    }

    pub fn status(&self) -> ChatStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<ChatStatus> {
        self.status.subscribe()
    }

    pub fn error(&self) -> Option<String> {
        self.error.borrow().clone()
    }

    pub fn subscribe_error(&self) -> watch::Receiver<Option<String>> {
        self.error.subscribe()
    }

    /// Sends `text` and streams the reply. Returns the final assistant
    /// message, or `None` when the reply carried no text.
    ///
    /// Dropping the returned future mid-request releases the session: the
    /// status goes back to `Idle` and any partial reply stays in the
    /// transcript.
    pub async fn send(&self, text: &str) -> Result<Option<ChatMessage>, ChatError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let claimed = self.status.send_if_modified(|status| {
            if status.is_busy() {
                return false;
            }
            *status = ChatStatus::Sending;
            true
        });
        if !claimed {
            return Err(ChatError::Busy);
        }
        let in_flight = InFlight::new(self);
        self.error.send_replace(None);

        self.transcript
            .send_modify(|t| t.push(ChatMessage::new(Role::User, text)));
        let wire: Vec<WireMessage> = self.transcript.borrow().iter().map(|m| m.to_wire()).collect();

        let mut stream = match self.transport.open(wire).await {
            Ok(stream) => stream,
            Err(e) => {
                warn!("chat request failed: {}", e);
                return Err(in_flight.fail(FAILED_TO_GET_RESPONSE));
            }
        };

        self.status.send_replace(ChatStatus::Streaming);
        let assistant_id = Uuid::new_v4().to_string();
        let mut decoder = StreamDecoder::new();

        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(bytes) => {
                    if decoder.push(&bytes) {
                        self.upsert_assistant(&assistant_id, decoder.text());
                    }
                }
                Err(e) => {
                    warn!("chat stream interrupted: {}", e);
                    return Err(in_flight.fail(STREAM_INTERRUPTED));
                }
            }
        }
        if decoder.finish() {
            self.upsert_assistant(&assistant_id, decoder.text());
        }

        in_flight.finish();
        let content = decoder.into_text();
        if content.is_empty() {
            debug!("reply carried no text");
            return Ok(None);
        }
        Ok(Some(ChatMessage {
            id: assistant_id,
            role: Role::Assistant,
            content,
        }))
    }

    /// Replaces the in-progress assistant message by id, or appends it the
    /// first time. Empty text is never shown.
    fn upsert_assistant(&self, id: &str, content: &str) {
        if content.is_empty() {
            return;
        }
        self.transcript.send_modify(|t| {
            match t.iter_mut().find(|m| m.id == id) {
                Some(existing) => existing.content = content.to_string(),
                None => t.push(ChatMessage {
                    id: id.to_string(),
                    role: Role::Assistant,
                    content: content.to_string(),
                }),
            }
        });
    }

    fn fail(&self, message: &str) -> ChatError {
        self.error.send_replace(Some(message.to_string()));
        self.status.send_replace(ChatStatus::Idle);
        ChatError::Failed(message.to_string())
    }
}

/// Held by `send` while a request is outstanding. If it is dropped without
/// `finish` or `fail` the request was cancelled.
struct InFlight<'a> {
    session: &'a ChatSession,
    settled: bool,
}

impl<'a> InFlight<'a> {
    fn new(session: &'a ChatSession) -> Self {
        Self {
            session,
            settled: false,
        }
    }

    fn finish(mut self) {
        self.settled = true;
        self.session.status.send_replace(ChatStatus::Idle);
    }

    fn fail(mut self, message: &str) -> ChatError {
        self.settled = true;
        self.session.fail(message)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.settled {
            warn!("chat request dropped before completion");
            self.session.fail(REQUEST_CANCELLED);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use http::StatusCode;
    use std::sync::{
        atomic::{AtomicBool, Ordering},
        Mutex,
    };
    use std::time::Duration;
    use tokio::sync::Notify;

    type Script = Result<Vec<Result<Bytes, ClientError>>, ClientError>;

    /// Replays one scripted reply per request and records what was sent.
    #[derive(Default)]
    struct ScriptedTransport {
        replies: Mutex<Vec<Script>>,
        sent: Mutex<Vec<Vec<WireMessage>>>,
    }

    impl ScriptedTransport {
        fn replying(replies: Vec<Script>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into_iter().rev().collect()),
                sent: Mutex::default(),
            })
        }
    }

    #[async_trait]
    impl ChatTransport for ScriptedTransport {
        async fn open(&self, messages: Vec<WireMessage>) -> Result<ChatStream, ClientError> {
            self.sent.lock().unwrap().push(messages);
            let reply = self.replies.lock().unwrap().pop().expect("unexpected request");
            reply.map(|chunks| stream::iter(chunks).boxed())
        }
    }

    fn chunks(parts: &[&'static str]) -> Script {
        Ok(parts.iter().map(|p| Ok(Bytes::from_static(p.as_bytes()))).collect())
    }

    fn assistant_messages(session: &ChatSession) -> Vec<ChatMessage> {
        session
            .transcript()
            .into_iter()
            .filter(|m| m.role == Role::Assistant)
            .collect()
    }

    #[tokio::test]
    async fn streamed_deltas_replace_a_single_message() {
        let transport = ScriptedTransport::replying(vec![chunks(&["0:\"Hello\"\n", "0:\" world\"\n"])]);
        let session = ChatSession::new(transport.clone(), Locale::En);

        let reply = session.send("What should I sow in June?").await.unwrap().unwrap();

        assert_eq!(reply.content, "Hello world");
        let assistants = assistant_messages(&session);
        assert_eq!(assistants.len(), 1);
        assert_eq!(assistants[0].content, "Hello world");
        assert_eq!(assistants[0].id, reply.id);
        assert_eq!(session.transcript().len(), 2);
        assert_eq!(session.status(), ChatStatus::Idle);
    }

    #[tokio::test]
    async fn plain_text_chunk_is_kept() {
        let transport = ScriptedTransport::replying(vec![chunks(&["plain chunk"])]);
        let session = ChatSession::new(transport, Locale::En);

        let reply = session.send("hi").await.unwrap().unwrap();
        assert_eq!(reply.content, "plain chunk");
    }

    #[tokio::test]
    async fn whole_transcript_is_sent_each_turn() {
        let transport = ScriptedTransport::replying(vec![
            chunks(&["0:\"Paddy\"\n"]),
            chunks(&["0:\"In June\"\n"]),
        ]);
        let session = ChatSession::new(transport.clone(), Locale::Hi);

        session.send("Best crop?").await.unwrap();
        session.send("  When?  ").await.unwrap();

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent[1].len(), 3);
        assert_eq!(sent[1][0].content, "Best crop?");
        assert_eq!(sent[1][1].role, Role::Assistant);
        assert_eq!(sent[1][2].content, "When?");
    }

    #[tokio::test]
    async fn error_status_adds_no_assistant_message() {
        let transport = ScriptedTransport::replying(vec![Err(ClientError::Api {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "Failed to process chat request".into(),
            code: None,
        })]);
        let session = ChatSession::new(transport, Locale::En);

        let err = session.send("hello").await.unwrap_err();

        assert_eq!(err, ChatError::Failed(FAILED_TO_GET_RESPONSE.into()));
        assert_eq!(session.status(), ChatStatus::Idle);
        assert_eq!(session.error().as_deref(), Some(FAILED_TO_GET_RESPONSE));
        assert!(assistant_messages(&session).is_empty());
    }

    #[tokio::test]
    async fn interrupted_stream_keeps_partial_text() {
        let transport = ScriptedTransport::replying(vec![
            Ok(vec![
                Ok(Bytes::from_static(b"0:\"Use neem\"\n")),
                Err(ClientError::Other("connection reset".into())),
            ]),
            chunks(&["0:\"ok\"\n"]),
        ]);
        let session = ChatSession::new(transport, Locale::En);

        let err = session.send("pests?").await.unwrap_err();
        assert_eq!(err, ChatError::Failed(STREAM_INTERRUPTED.into()));
        assert_eq!(assistant_messages(&session)[0].content, "Use neem");
        assert_eq!(session.error().as_deref(), Some(STREAM_INTERRUPTED));

        // a failed session accepts the next message
        assert!(session.send("again").await.is_ok());
        assert_eq!(session.status(), ChatStatus::Idle);
        assert_eq!(session.error(), None);
    }

    #[tokio::test]
    async fn empty_reply_adds_nothing() {
        let transport = ScriptedTransport::replying(vec![chunks(&["\n", "0:null\n"])]);
        let session = ChatSession::new(transport, Locale::En);

        assert_eq!(session.send("hello").await.unwrap(), None);
        assert!(assistant_messages(&session).is_empty());
    }

    #[tokio::test]
    async fn blank_input_is_rejected() {
        let session = ChatSession::new(ScriptedTransport::replying(vec![]), Locale::En);
        assert_eq!(session.send("   ").await, Err(ChatError::EmptyMessage));
        assert!(session.transcript().is_empty());
    }

    struct GatedTransport {
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl ChatTransport for GatedTransport {
        async fn open(&self, _messages: Vec<WireMessage>) -> Result<ChatStream, ClientError> {
            let gate = self.gate.clone();
            Ok(stream::once(async move {
                gate.notified().await;
                Ok(Bytes::from_static(b"0:\"done\"\n"))
            })
            .boxed())
        }
    }

    #[tokio::test]
    async fn second_send_is_rejected_while_streaming() {
        let gate = Arc::new(Notify::new());
        let session = Arc::new(ChatSession::new(
            Arc::new(GatedTransport { gate: gate.clone() }),
            Locale::En,
        ));
        let mut status = session.subscribe_status();

        let first = tokio::spawn({
            let session = session.clone();
            async move { session.send("first").await }
        });
        status
            .wait_for(|s| *s == ChatStatus::Streaming)
            .await
            .unwrap();

        assert_eq!(session.send("second").await, Err(ChatError::Busy));

        gate.notify_one();
        let reply = first.await.unwrap().unwrap().unwrap();
        assert_eq!(reply.content, "done");
        assert_eq!(session.transcript().len(), 2);
    }

    /// Never answers the first request; answers later ones at once.
    #[derive(Default)]
    struct StallsOnceTransport {
        stalled: AtomicBool,
    }

    #[async_trait]
    impl ChatTransport for StallsOnceTransport {
        async fn open(&self, _messages: Vec<WireMessage>) -> Result<ChatStream, ClientError> {
            if !self.stalled.swap(true, Ordering::SeqCst) {
                return Ok(stream::pending().boxed());
            }
            Ok(stream::iter(vec![Ok(Bytes::from_static(b"0:\"back\"\n"))]).boxed())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_send_releases_the_session() {
        let session = ChatSession::new(Arc::new(StallsOnceTransport::default()), Locale::En);

        let timed_out = tokio::time::timeout(Duration::from_secs(1), session.send("first")).await;
        assert!(timed_out.is_err());
        assert_eq!(session.status(), ChatStatus::Idle);
        assert_eq!(session.error().as_deref(), Some(REQUEST_CANCELLED));

        let reply = session.send("second").await.unwrap().unwrap();
        assert_eq!(reply.content, "back");
        assert_eq!(session.error(), None);
    }

    #[test]
    fn greeting_follows_locale() {
        let session = ChatSession::new(ScriptedTransport::replying(vec![]), Locale::Np);
        assert!(session.welcome_message().starts_with("नमस्ते"));
        assert_eq!(session.placeholder(), "अपन सवाल लिखो...");
    }
}
