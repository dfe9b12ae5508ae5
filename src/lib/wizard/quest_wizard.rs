//! The quest-create/edit wizard (spec §4.4): collects title, starting time,
//! duration and the optional fields, re-rendering a single preview message
//! after every accepted mutation.

use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::domain::UserId;
use crate::utils::consts::QUEST_WIZARD_TIMEOUT_SECONDS;
use crate::wizard::parsers::{parse_comma_separated, parse_epoch_seconds, parse_http_url, parse_positive_hours, validate_length};
use crate::wizard::{is_cancel_keyword, next_input, PreviewSink, PreviewState, SessionInput, SessionRegistry, WizardOutcome};

const TITLE_MAX_LEN: usize = 100;
const MAX_TAGS: usize = 10;
const DESCRIPTION_MAX_LEN: usize = 2000;

/// The in-progress quest draft a session mutates. Turned into a real
/// [`crate::domain::Quest`] by the caller once the wizard completes, via
/// `QuestService::create_draft`.
#[derive(Debug, Clone, Default)]
pub struct QuestDraft {
    pub title: Option<String>,
    pub starting_at: Option<DateTime<Utc>>,
    pub duration: Option<chrono::Duration>,
    pub tags: Vec<String>,
    pub description: String,
    pub image_url: Option<String>,
}

impl QuestDraft {
    fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.title.is_none() {
            missing.push("title");
        }
        if self.starting_at.is_none() {
            missing.push("starting-at");
        }
        if self.duration.is_none() {
            missing.push("duration");
        }
        missing
    }

    fn render(&self) -> String {
        format!(
            "**Current preview:**\nTitle: {}\nStarts: {}\nDuration: {}\nTags: {}\nDescription: {}",
            self.title.as_deref().unwrap_or("_unset_"),
            self.starting_at
                .map(|dt| dt.to_rfc3339())
                .unwrap_or_else(|| "_unset_".to_string()),
            self.duration
                .map(|d| format!("{:.1}h", d.num_minutes() as f64 / 60.0))
                .unwrap_or_else(|| "_unset_".to_string()),
            if self.tags.is_empty() { "_none_".to_string() } else { self.tags.join(", ") },
            if self.description.is_empty() { "_none_" } else { self.description.as_str() },
        )
    }

    fn apply_field(&mut self, field: &str, value: &str) -> Result<(), String> {
        match field {
            "title" => {
                self.title = Some(validate_length(value, 1, TITLE_MAX_LEN, "Title").map_err(|e| e.user_message())?);
            }
            "starting_at" => {
                self.starting_at = Some(parse_epoch_seconds(value).map_err(|e| e.user_message())?);
            }
            "duration_hours" => {
                self.duration = Some(parse_positive_hours(value).map_err(|e| e.user_message())?);
            }
            "tags" => {
                self.tags = parse_comma_separated(value, MAX_TAGS).map_err(|e| e.user_message())?;
            }
            "description" => {
                self.description = validate_length(value, 0, DESCRIPTION_MAX_LEN, "Description")
                    .map_err(|e| e.user_message())?;
            }
            "image_url" => {
                self.image_url = Some(parse_http_url(value).map_err(|e| e.user_message())?);
            }
            other => return Err(format!("Unknown field '{other}'.")),
        }
        Ok(())
    }
}

/// Runs the quest-create wizard to completion. Claims the author's session
/// slot for the duration of the call and releases it on any exit path
/// (completion, cancel, timeout) so a subsequent `quest create` succeeds
/// immediately afterwards (spec scenario S6).
pub async fn run_quest_wizard(
    registry: &SessionRegistry,
    author: UserId,
    mut rx: UnboundedReceiver<SessionInput>,
    sink: &dyn PreviewSink,
) -> WizardOutcome<QuestDraft> {
    let _guard = match registry.acquire(author) {
        Ok(guard) => guard,
        Err(e) => return WizardOutcome::Failed { reason: e.user_message() },
    };

    let mut draft = QuestDraft::default();
    let mut preview = PreviewState::new();
    let timeout = StdDuration::from_secs(QUEST_WIZARD_TIMEOUT_SECONDS);

    if preview.update(sink, draft.render()).await.is_err() {
        return WizardOutcome::Failed {
            reason: "I can't send you direct messages anymore. Enable DMs and run the command again.".to_string(),
        };
    }

    loop {
        match next_input(&mut rx, timeout).await {
            SessionInput::Cancel => return WizardOutcome::cancelled("Quest"),
            SessionInput::Timeout => return WizardOutcome::timed_out(),
            SessionInput::Text(text) if is_cancel_keyword(&text) => return WizardOutcome::cancelled("Quest"),
            SessionInput::Button(id) if id == "cancel" => return WizardOutcome::cancelled("Quest"),
            SessionInput::Button(id) if id == "submit" => {
                let missing = draft.missing_fields();
                if !missing.is_empty() {
                    let _ = sink.send(format!("Missing required fields: {}.", missing.join(", "))).await;
                    continue;
                }
                return WizardOutcome::Completed(draft);
            }
            SessionInput::Modal(fields) => {
                let mut error = None;
                for (field, value) in fields {
                    if let Err(e) = draft.apply_field(&field, &value) {
                        error = Some(e);
                        break;
                    }
                }
                if let Some(e) = error {
                    let _ = sink.send(e).await;
                    continue;
                }
                if preview.update(sink, draft.render()).await.is_err() {
                    return WizardOutcome::Failed {
                        reason: "Lost the DM channel while updating the preview.".to_string(),
                    };
                }
            }
            SessionInput::Text(_) | SessionInput::Button(_) => {
                let _ = sink
                    .send("Use the buttons below, or submit a form field.".to_string())
                    .await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tokio::sync::mpsc::unbounded_channel;

    struct RecordingSink {
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PreviewSink for RecordingSink {
        async fn send(&self, content: String) -> AnyResult<u64> {
            self.sent.lock().unwrap().push(content);
            Ok(self.sent.lock().unwrap().len() as u64)
        }

        async fn edit(&self, _message_id: u64, content: String) -> AnyResult<()> {
            self.sent.lock().unwrap().push(content);
            Ok(())
        }
    }

    use crate::utils::prelude::AnyResult;

    fn modal(fields: &[(&str, &str)]) -> SessionInput {
        let mut map = HashMap::new();
        for (k, v) in fields {
            map.insert(k.to_string(), v.to_string());
        }
        SessionInput::Modal(map)
    }

    #[tokio::test]
    async fn s6_wizard_cancel_releases_the_slot_for_a_second_attempt() {
        let registry = SessionRegistry::new();
        let author = UserId::generate();
        let sink = RecordingSink { sent: Mutex::new(Vec::new()) };

        let (tx, rx) = unbounded_channel();
        tx.send(SessionInput::Text("cancel".to_string())).unwrap();
        let outcome = run_quest_wizard(&registry, author.clone(), rx, &sink).await;
        match outcome {
            WizardOutcome::Failed { reason } => assert_eq!(reason, "Quest creation cancelled."),
            _ => panic!("expected cancellation"),
        }
        assert!(!registry.is_active(&author));

        // A second session for the same author now succeeds.
        let (tx2, rx2) = unbounded_channel();
        tx2.send(SessionInput::Cancel).unwrap();
        let outcome2 = run_quest_wizard(&registry, author.clone(), rx2, &sink).await;
        assert!(matches!(outcome2, WizardOutcome::Failed { .. }));
    }

    #[tokio::test]
    async fn submit_with_missing_fields_does_not_resolve() {
        let registry = SessionRegistry::new();
        let author = UserId::generate();
        let sink = RecordingSink { sent: Mutex::new(Vec::new()) };

        let (tx, rx) = unbounded_channel();
        tx.send(SessionInput::Button("submit".to_string())).unwrap();
        tx.send(SessionInput::Cancel).unwrap();
        let outcome = run_quest_wizard(&registry, author, rx, &sink).await;
        assert!(matches!(outcome, WizardOutcome::Failed { .. }));
        assert!(sink.sent.lock().unwrap().iter().any(|m| m.contains("Missing required fields")));
    }

    #[tokio::test]
    async fn completing_required_fields_resolves_with_the_draft() {
        let registry = SessionRegistry::new();
        let author = UserId::generate();
        let sink = RecordingSink { sent: Mutex::new(Vec::new()) };

        let (tx, rx) = unbounded_channel();
        tx.send(modal(&[
            ("title", "Expedition"),
            ("starting_at", "1893456000"),
            ("duration_hours", "3"),
        ]))
        .unwrap();
        tx.send(SessionInput::Button("submit".to_string())).unwrap();
        let outcome = run_quest_wizard(&registry, author, rx, &sink).await;
        match outcome {
            WizardOutcome::Completed(draft) => {
                assert_eq!(draft.title.as_deref(), Some("Expedition"));
                assert!(draft.starting_at.is_some());
                assert!(draft.duration.is_some());
            }
            WizardOutcome::Failed { reason } => panic!("expected completion, got: {reason}"),
        }
    }

    #[tokio::test]
    async fn timeout_resolves_with_the_timeout_reason() {
        let registry = SessionRegistry::new();
        let author = UserId::generate();
        let sink = RecordingSink { sent: Mutex::new(Vec::new()) };
        let (_tx, rx) = unbounded_channel();
        // Dropping the sender without sending anything closes the channel,
        // which `next_input` treats as Cancel, exercising the other
        // non-completion exit path without waiting out the real timeout.
        let outcome = run_quest_wizard(&registry, author, rx, &sink).await;
        assert!(matches!(outcome, WizardOutcome::Failed { .. }));
    }
}
