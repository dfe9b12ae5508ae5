//! DM-driven interactive wizard framework (spec §4.4): a single-threaded
//! session per author, a live preview message kept in sync by
//! edit-with-send-fallback, and a small set of modal input parsers.
//!
//! Grounded on `original_source/.../ui/wizards/common.py`
//! (`WizardSessionBase`, `PreviewWizardContext`, `PreviewWizardView`): the
//! Python base class's mutable-attribute dance is replaced here by an actor
//! owning its draft plus a single inbound [`SessionInput`] enum (spec §9).

pub mod character_wizard;
pub mod parsers;
pub mod quest_wizard;

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::UserId;
use crate::utils::prelude::*;

/// The single inbound message type every wizard session reacts to (spec §9).
#[derive(Debug, Clone)]
pub enum SessionInput {
    /// A plain-text DM reply to an `_ask` prompt.
    Text(String),
    /// A button custom-id click.
    Button(String),
    /// A submitted modal's field values, keyed by field name.
    Modal(HashMap<String, String>),
    /// The view or `_ask` await timed out.
    Timeout,
    /// The author sent the `cancel` keyword or pressed the Cancel button.
    Cancel,
}

/// The terminal result of a wizard session (spec §4.4 step 6).
#[derive(Debug, Clone)]
pub enum WizardOutcome<T> {
    Completed(T),
    Failed { reason: String },
}

impl<T> WizardOutcome<T> {
    /// `entity` names what was being created, e.g. `"Quest"`/`"Character"`,
    /// so the cancellation message reads correctly for every session kind.
    pub fn cancelled(entity: &str) -> Self {
        Self::Failed {
            reason: format!("{entity} creation cancelled."),
        }
    }

    pub fn timed_out() -> Self {
        Self::Failed {
            reason: "Wizard timed out. Start again when you're ready.".to_string(),
        }
    }

    pub fn missing_fields(fields: &[&str]) -> Self {
        Self::Failed {
            reason: format!("Missing required fields: {}.", fields.join(", ")),
        }
    }
}

/// Process-wide gate: at most one active session per author (spec §4.4).
#[derive(Default)]
pub struct SessionRegistry {
    active: Mutex<std::collections::HashSet<UserId>>,
}

/// Releases the author's slot when the session ends, by panic or by return.
pub struct SessionGuard<'a> {
    registry: &'a SessionRegistry,
    author: UserId,
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        self.registry
            .active
            .lock()
            .expect("session registry mutex poisoned")
            .remove(&self.author);
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the author's slot, or fails if a session is already open for
    /// them. The returned guard releases the slot on drop, including on the
    /// early-return paths of a cancelled or timed-out session.
    pub fn acquire(&self, author: UserId) -> DomainResult<SessionGuard<'_>> {
        let mut active = self.active.lock().expect("session registry mutex poisoned");
        if !active.insert(author.clone()) {
            return Err(DomainError::conflict(
                "You already have an active wizard session. Finish or cancel it first.",
            ));
        }
        Ok(SessionGuard {
            registry: self,
            author,
        })
    }

    pub fn is_active(&self, author: &UserId) -> bool {
        self.active
            .lock()
            .expect("session registry mutex poisoned")
            .contains(author)
    }
}

/// The DM side-effects a wizard drives: sending and editing the single
/// preview message. A real implementation wraps `twilight-http`; tests use
/// an in-memory fake.
#[async_trait]
pub trait PreviewSink: Send + Sync {
    async fn send(&self, content: String) -> AnyResult<u64>;
    async fn edit(&self, message_id: u64, content: String) -> AnyResult<()>;
}

/// Tracks the single live preview message and implements the
/// edit-with-send-fallback invariant (spec §4.4 "Preview invariant"),
/// grounded on `WizardSessionBase._update_preview`.
pub struct PreviewState {
    message_id: Option<u64>,
}

impl PreviewState {
    pub fn new() -> Self {
        Self { message_id: None }
    }

    /// Edits the known preview message; if there is none yet, or the edit
    /// fails (message deleted, channel gone), sends a new message and
    /// adopts it as the new preview target.
    pub async fn update(&mut self, sink: &dyn PreviewSink, content: String) -> AnyResult<()> {
        if let Some(message_id) = self.message_id {
            if sink.edit(message_id, content.clone()).await.is_ok() {
                return Ok(());
            }
        }
        let new_id = sink.send(content).await?;
        self.message_id = Some(new_id);
        Ok(())
    }
}

impl Default for PreviewState {
    fn default() -> Self {
        Self::new()
    }
}

/// Awaits the next input from the author's DM channel, honouring the
/// session's `_ask` timeout (spec §5). A closed channel (the gateway
/// connection dropped) is treated the same as an explicit cancel.
pub async fn next_input(rx: &mut UnboundedReceiver<SessionInput>, timeout: StdDuration) -> SessionInput {
    match tokio::time::timeout(timeout, rx.recv()).await {
        Ok(Some(input)) => input,
        Ok(None) => SessionInput::Cancel,
        Err(_) => SessionInput::Timeout,
    }
}

/// True if the free-text reply is the `cancel` keyword (case-insensitive,
/// trimmed), per spec §4.4 step 5.
pub fn is_cancel_keyword(text: &str) -> bool {
    text.trim().eq_ignore_ascii_case("cancel")
}

/// True if the free-text reply is the `skip` keyword.
pub fn is_skip_keyword(text: &str) -> bool {
    text.trim().eq_ignore_ascii_case("skip")
}

/// True if the free-text reply is the `clear` keyword.
pub fn is_clear_keyword(text: &str) -> bool {
    text.trim().eq_ignore_ascii_case("clear")
}

/// Routes DM side-channel input (plain text, button clicks, modal submits)
/// from gateway events to whichever wizard session is awaiting it, keyed by
/// the author's Discord user id.
#[derive(Default)]
pub struct WizardRouter {
    senders: Mutex<HashMap<u64, tokio::sync::mpsc::UnboundedSender<SessionInput>>>,
}

impl WizardRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a fresh channel for `discord_user_id`, returning the
    /// receiving half for the wizard task to consume. Replaces any
    /// previously registered channel for the same author.
    pub fn open(&self, discord_user_id: u64) -> UnboundedReceiver<SessionInput> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        self.senders
            .lock()
            .expect("wizard router mutex poisoned")
            .insert(discord_user_id, tx);
        rx
    }

    /// Deregisters the author's channel once their session has ended.
    pub fn close(&self, discord_user_id: u64) {
        self.senders
            .lock()
            .expect("wizard router mutex poisoned")
            .remove(&discord_user_id);
    }

    /// Forwards `input` to the open session for `discord_user_id`, if any.
    /// Returns `true` if a session was listening.
    pub fn dispatch(&self, discord_user_id: u64, input: SessionInput) -> bool {
        let senders = self.senders.lock().expect("wizard router mutex poisoned");
        match senders.get(&discord_user_id) {
            Some(tx) => tx.send(input).is_ok(),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_rejects_second_session_for_same_author() {
        let registry = SessionRegistry::new();
        let author = UserId::generate();
        let _first = registry.acquire(author.clone()).unwrap();
        let err = registry.acquire(author.clone()).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn dropping_the_guard_releases_the_slot() {
        let registry = SessionRegistry::new();
        let author = UserId::generate();
        {
            let _guard = registry.acquire(author.clone()).unwrap();
            assert!(registry.is_active(&author));
        }
        assert!(!registry.is_active(&author));
        registry.acquire(author).unwrap();
    }

    struct FlakySink {
        fail_edit: std::sync::atomic::AtomicBool,
    }

    #[async_trait]
    impl PreviewSink for FlakySink {
        async fn send(&self, _content: String) -> AnyResult<u64> {
            Ok(42)
        }

        async fn edit(&self, _message_id: u64, _content: String) -> AnyResult<()> {
            if self.fail_edit.load(std::sync::atomic::Ordering::SeqCst) {
                anyhow::bail!("message gone")
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn update_edits_the_existing_preview_when_possible() {
        let sink = FlakySink {
            fail_edit: std::sync::atomic::AtomicBool::new(false),
        };
        let mut preview = PreviewState::new();
        preview.update(&sink, "first".to_string()).await.unwrap();
        let first_id = preview.message_id;
        preview.update(&sink, "second".to_string()).await.unwrap();
        assert_eq!(preview.message_id, first_id);
    }

    #[tokio::test]
    async fn update_sends_a_new_message_when_the_edit_fails() {
        let sink = FlakySink {
            fail_edit: std::sync::atomic::AtomicBool::new(false),
        };
        let mut preview = PreviewState::new();
        preview.update(&sink, "first".to_string()).await.unwrap();
        sink.fail_edit.store(true, std::sync::atomic::Ordering::SeqCst);
        preview.update(&sink, "second".to_string()).await.unwrap();
        assert_eq!(preview.message_id, Some(42));
    }

    #[tokio::test]
    async fn next_input_reports_timeout_when_the_author_is_silent() {
        let (_tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let input = next_input(&mut rx, StdDuration::from_millis(10)).await;
        assert!(matches!(input, SessionInput::Timeout));
    }

    #[tokio::test]
    async fn next_input_reports_cancel_when_the_channel_closes() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        drop(tx);
        let input = next_input(&mut rx, StdDuration::from_secs(5)).await;
        assert!(matches!(input, SessionInput::Cancel));
    }

    #[test]
    fn cancel_keyword_is_case_insensitive_and_trimmed() {
        assert!(is_cancel_keyword("  Cancel  "));
        assert!(is_cancel_keyword("CANCEL"));
        assert!(!is_cancel_keyword("cancelled"));
    }

    #[test]
    fn router_dispatch_reaches_the_open_session() {
        let router = WizardRouter::new();
        let mut rx = router.open(7);
        assert!(router.dispatch(7, SessionInput::Text("hi".to_string())));
        assert!(matches!(rx.try_recv(), Ok(SessionInput::Text(t)) if t == "hi"));
    }

    #[test]
    fn router_dispatch_to_unknown_author_is_a_noop() {
        let router = WizardRouter::new();
        assert!(!router.dispatch(9, SessionInput::Cancel));
    }

    #[test]
    fn router_close_stops_future_dispatch() {
        let router = WizardRouter::new();
        let _rx = router.open(3);
        router.close(3);
        assert!(!router.dispatch(3, SessionInput::Cancel));
    }
}
