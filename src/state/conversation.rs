//! Conversation engine: chat transcript and assistant turn lifecycle.
//!
//! DESIGN
//! ======
//! Each submit appends a user turn and a pending assistant placeholder in one
//! step, then spawns a resolution task keyed by the exchange id. The task asks
//! a `Responder` for the answer and writes it into the placeholder. Several
//! exchanges may be pending at once and they resolve in whatever order their
//! responders finish; the transcript order is always submit order.
//!
//! Resolution tasks hold only a `Weak` handle to the shared transcript, and
//! the engine aborts every outstanding task on shutdown or drop. A late
//! answer therefore has nowhere to land once the engine is gone.

#[cfg(test)]
#[path = "conversation_test.rs"]
mod conversation_test;

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rand::Rng;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::records::{RecordStore, StoreError};
use crate::net::types::RecordFields;

/// Placeholder text shown while an assistant turn is pending.
pub const PENDING_TEXT: &str = "...";

/// Assistant text for a chat line the store accepted.
pub const DELEGATED_ACK: &str = "Message saved.";

pub type ExchangeId = u64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One message in the transcript.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatTurn {
    pub exchange: ExchangeId,
    pub role: Role,
    pub text: String,
    pub pending: bool,
}

/// Lifecycle of a user/assistant exchange.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnStage {
    Composing,
    UserCommitted,
    AssistantPending,
    AssistantResolved,
}

// =============================================================================
// RESPONDERS
// =============================================================================

/// Produces the assistant answer for one user message.
#[async_trait::async_trait]
pub trait Responder: Send + Sync {
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the answer could not be produced; the
    /// engine shows it in place of the answer.
    async fn respond(&self, text: &str) -> Result<String, StoreError>;
}

/// Stores each chat line as a record and acknowledges it.
pub struct DelegatedResponder {
    store: Arc<RecordStore>,
}

impl DelegatedResponder {
    #[must_use]
    pub fn new(store: Arc<RecordStore>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl Responder for DelegatedResponder {
    async fn respond(&self, text: &str) -> Result<String, StoreError> {
        let id = chat_record_id();
        match self.store.create(&id, chat_record_fields(text)).await {
            Ok(()) => Ok(DELEGATED_ACK.to_owned()),
            Err(e) if e.is_applied() => {
                warn!(id, error = %e, "chat line saved without a fresh listing");
                Ok(DELEGATED_ACK.to_owned())
            }
            Err(e) => Err(e),
        }
    }
}

/// Answers with a fixed reply after a fixed delay, without touching the network.
pub struct SimulatedResponder {
    delay: Duration,
    reply: String,
}

impl SimulatedResponder {
    #[must_use]
    pub fn new(delay: Duration, reply: String) -> Self {
        Self { delay, reply }
    }
}

#[async_trait::async_trait]
impl Responder for SimulatedResponder {
    async fn respond(&self, _text: &str) -> Result<String, StoreError> {
        tokio::time::sleep(self.delay).await;
        Ok(self.reply.clone())
    }
}

/// Fresh record id for a chat line: epoch millis plus a random suffix.
#[must_use]
pub fn chat_record_id() -> String {
    let suffix: u16 = rand::rng().random();
    format!("{}-{suffix:04x}", now_ms())
}

/// Canonical record fields for a chat line. The text goes in `note`.
#[must_use]
pub fn chat_record_fields(text: &str) -> RecordFields {
    RecordFields {
        name: "chat".to_owned(),
        description: "user message".to_owned(),
        price: "0".to_owned(),
        note: text.to_owned(),
    }
}

fn now_ms() -> i64 {
    let Ok(duration) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(duration.as_millis()).unwrap_or(0)
}

// =============================================================================
// ENGINE
// =============================================================================

#[derive(Default)]
struct Transcript {
    turns: Vec<ChatTurn>,
    stages: BTreeMap<ExchangeId, TurnStage>,
}

struct Shared {
    transcript: Mutex<Transcript>,
    tasks: Mutex<HashMap<ExchangeId, JoinHandle<()>>>,
    revision: watch::Sender<u64>,
}

impl Shared {
    fn transcript(&self) -> MutexGuard<'_, Transcript> {
        self.transcript.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn tasks(&self) -> MutexGuard<'_, HashMap<ExchangeId, JoinHandle<()>>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn bump(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }

    fn resolve(&self, exchange: ExchangeId, text: String) {
        {
            let mut transcript = self.transcript();
            let placeholder = transcript
                .turns
                .iter_mut()
                .find(|t| t.exchange == exchange && t.role == Role::Assistant && t.pending);
            let Some(placeholder) = placeholder else {
                return;
            };
            placeholder.text = text;
            placeholder.pending = false;
            transcript.stages.insert(exchange, TurnStage::AssistantResolved);
        }
        self.tasks().remove(&exchange);
        debug!(exchange, "assistant turn resolved");
        self.bump();
    }
}

pub struct ConversationEngine {
    responder: Arc<dyn Responder>,
    shared: Arc<Shared>,
    input: String,
    next_exchange: ExchangeId,
}

impl ConversationEngine {
    #[must_use]
    pub fn new(responder: Arc<dyn Responder>) -> Self {
        let (revision, _) = watch::channel(0);
        let shared = Shared { transcript: Mutex::default(), tasks: Mutex::default(), revision };
        Self { responder, shared: Arc::new(shared), input: String::new(), next_exchange: 1 }
    }

    /// Engine that stores each chat line through `store`.
    #[must_use]
    pub fn delegated(store: Arc<RecordStore>) -> Self {
        Self::new(Arc::new(DelegatedResponder::new(store)))
    }

    /// Engine that answers every message with `reply` after `delay`.
    #[must_use]
    pub fn simulated(delay: Duration, reply: String) -> Self {
        Self::new(Arc::new(SimulatedResponder::new(delay, reply)))
    }

    // =========================================================================
    // INPUT
    // =========================================================================

    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    /// Submit the input buffer. See [`ConversationEngine::submit`].
    pub fn submit_input(&mut self) -> Option<ExchangeId> {
        let text = std::mem::take(&mut self.input);
        let submitted = self.submit(&text);
        if submitted.is_none() {
            self.input = text;
        }
        submitted
    }

    /// Append a user turn and a pending assistant turn, clear the input
    /// buffer, and start resolving the answer.
    ///
    /// Blank text is ignored and returns `None`. Must be called inside a
    /// tokio runtime.
    pub fn submit(&mut self, text: &str) -> Option<ExchangeId> {
        let text = text.trim();
        if text.is_empty() {
            debug!("ignoring blank chat submit");
            return None;
        }

        let exchange = self.next_exchange;
        self.next_exchange += 1;

        {
            let mut transcript = self.shared.transcript();
            transcript.turns.push(ChatTurn {
                exchange,
                role: Role::User,
                text: text.to_owned(),
                pending: false,
            });
            transcript.stages.insert(exchange, TurnStage::UserCommitted);
            transcript.turns.push(ChatTurn {
                exchange,
                role: Role::Assistant,
                text: PENDING_TEXT.to_owned(),
                pending: true,
            });
            transcript.stages.insert(exchange, TurnStage::AssistantPending);
        }
        self.input.clear();
        info!(exchange, "chat message submitted");

        let weak: Weak<Shared> = Arc::downgrade(&self.shared);
        let responder = Arc::clone(&self.responder);
        let prompt = text.to_owned();

        // Hold the task map while spawning so the task cannot remove its
        // entry before it is inserted.
        let mut tasks = self.shared.tasks();
        let handle = tokio::spawn(async move {
            let outcome = responder.respond(&prompt).await;
            let Some(shared) = weak.upgrade() else {
                return;
            };
            let text = match outcome {
                Ok(answer) => answer,
                Err(e) => {
                    warn!(exchange, error = %e, "assistant turn failed");
                    format!("Error saving message: {e}")
                }
            };
            shared.resolve(exchange, text);
        });
        tasks.insert(exchange, handle);
        drop(tasks);

        self.shared.bump();
        Some(exchange)
    }

    // =========================================================================
    // OBSERVATION
    // =========================================================================

    /// Copy of the transcript in submit order.
    #[must_use]
    pub fn transcript(&self) -> Vec<ChatTurn> {
        self.shared.transcript().turns.clone()
    }

    /// Stage of an exchange. An id that has not been submitted is `Composing`.
    #[must_use]
    pub fn stage(&self, exchange: ExchangeId) -> TurnStage {
        self.shared
            .transcript()
            .stages
            .get(&exchange)
            .copied()
            .unwrap_or(TurnStage::Composing)
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.shared
            .transcript()
            .turns
            .iter()
            .filter(|t| t.pending)
            .count()
    }

    /// Receiver whose value increments on every transcript change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.shared.revision.subscribe()
    }

    /// Wait until no resolution task is outstanding.
    pub async fn settle(&self) {
        let mut rx = self.subscribe();
        while !self.shared.tasks().is_empty() {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    // =========================================================================
    // TEARDOWN
    // =========================================================================

    /// Abort every outstanding resolution. Their placeholders stay pending.
    pub fn shutdown(&self) {
        let drained: Vec<(ExchangeId, JoinHandle<()>)> = self.shared.tasks().drain().collect();
        if drained.is_empty() {
            return;
        }
        for (exchange, handle) in drained {
            handle.abort();
            debug!(exchange, "assistant resolution cancelled");
        }
        self.shared.bump();
    }
}

impl Drop for ConversationEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}
