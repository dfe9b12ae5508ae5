//! The character-create/edit wizard (spec §4.4), same shape as
//! [`crate::wizard::quest_wizard`] with Character's required fields: name,
//! sheet link, art link.

use std::time::Duration as StdDuration;

use tokio::sync::mpsc::UnboundedReceiver;

use crate::domain::UserId;
use crate::utils::consts::CHARACTER_WIZARD_TIMEOUT_SECONDS;
use crate::wizard::parsers::{parse_comma_separated, parse_http_url, validate_length};
use crate::wizard::{is_cancel_keyword, next_input, PreviewSink, PreviewState, SessionInput, SessionRegistry, WizardOutcome};

const NAME_MIN_LEN: usize = 2;
const NAME_MAX_LEN: usize = 64;
const MAX_TAGS: usize = 20;
const DESCRIPTION_MAX_LEN: usize = 500;

#[derive(Debug, Clone, Default)]
pub struct CharacterDraft {
    pub name: Option<String>,
    pub sheet_url: Option<String>,
    pub art_url: Option<String>,
    pub tags: Vec<String>,
    pub description: String,
}

impl CharacterDraft {
    fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.name.is_none() {
            missing.push("name");
        }
        if self.sheet_url.is_none() {
            missing.push("sheet link");
        }
        if self.art_url.is_none() {
            missing.push("art link");
        }
        missing
    }

    fn render(&self) -> String {
        format!(
            "**Current preview:**\nName: {}\nSheet: {}\nArt: {}\nTags: {}\nDescription: {}",
            self.name.as_deref().unwrap_or("_unset_"),
            self.sheet_url.as_deref().unwrap_or("_unset_"),
            self.art_url.as_deref().unwrap_or("_unset_"),
            if self.tags.is_empty() { "_none_".to_string() } else { self.tags.join(", ") },
            if self.description.is_empty() { "_none_" } else { self.description.as_str() },
        )
    }

    fn apply_field(&mut self, field: &str, value: &str) -> Result<(), String> {
        match field {
            "name" => {
                self.name =
                    Some(validate_length(value, NAME_MIN_LEN, NAME_MAX_LEN, "Name").map_err(|e| e.user_message())?);
            }
            "sheet_url" => {
                self.sheet_url = Some(parse_http_url(value).map_err(|e| e.user_message())?);
            }
            "art_url" => {
                self.art_url = Some(parse_http_url(value).map_err(|e| e.user_message())?);
            }
            "tags" => {
                self.tags = parse_comma_separated(value, MAX_TAGS).map_err(|e| e.user_message())?;
            }
            "description" => {
                self.description = validate_length(value, 0, DESCRIPTION_MAX_LEN, "Description")
                    .map_err(|e| e.user_message())?;
            }
            other => return Err(format!("Unknown field '{other}'.")),
        }
        Ok(())
    }
}

pub async fn run_character_wizard(
    registry: &SessionRegistry,
    author: UserId,
    mut rx: UnboundedReceiver<SessionInput>,
    sink: &dyn PreviewSink,
) -> WizardOutcome<CharacterDraft> {
    let _guard = match registry.acquire(author) {
        Ok(guard) => guard,
        Err(e) => return WizardOutcome::Failed { reason: e.user_message() },
    };

    let mut draft = CharacterDraft::default();
    let mut preview = PreviewState::new();
    let timeout = StdDuration::from_secs(CHARACTER_WIZARD_TIMEOUT_SECONDS);

    if preview.update(sink, draft.render()).await.is_err() {
        return WizardOutcome::Failed {
            reason: "I can't send you direct messages anymore. Enable DMs and run the command again.".to_string(),
        };
    }

    loop {
        match next_input(&mut rx, timeout).await {
            SessionInput::Cancel => return WizardOutcome::cancelled("Character"),
            SessionInput::Timeout => return WizardOutcome::timed_out(),
            SessionInput::Text(text) if is_cancel_keyword(&text) => return WizardOutcome::cancelled("Character"),
            SessionInput::Button(id) if id == "cancel" => return WizardOutcome::cancelled("Character"),
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

    use crate::utils::prelude::AnyResult;

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

    fn modal(fields: &[(&str, &str)]) -> SessionInput {
        let mut map = HashMap::new();
        for (k, v) in fields {
            map.insert(k.to_string(), v.to_string());
        }
        SessionInput::Modal(map)
    }

    #[tokio::test]
    async fn cancel_button_resolves_with_the_cancellation_reason() {
        let registry = SessionRegistry::new();
        let author = UserId::generate();
        let sink = RecordingSink { sent: Mutex::new(Vec::new()) };
        let (tx, rx) = unbounded_channel();
        tx.send(SessionInput::Button("cancel".to_string())).unwrap();
        let outcome = run_character_wizard(&registry, author, rx, &sink).await;
        assert!(matches!(outcome, WizardOutcome::Failed { .. }));
    }

    #[tokio::test]
    async fn completing_required_fields_resolves_with_the_draft() {
        let registry = SessionRegistry::new();
        let author = UserId::generate();
        let sink = RecordingSink { sent: Mutex::new(Vec::new()) };
        let (tx, rx) = unbounded_channel();
        tx.send(modal(&[
            ("name", "Aleksi"),
            ("sheet_url", "https://sheets.example.com/character/abc123"),
            ("art_url", "https://art.example.com/abc123"),
        ]))
        .unwrap();
        tx.send(SessionInput::Button("submit".to_string())).unwrap();
        let outcome = run_character_wizard(&registry, author, rx, &sink).await;
        match outcome {
            WizardOutcome::Completed(draft) => {
                assert_eq!(draft.name.as_deref(), Some("Aleksi"));
                assert!(draft.sheet_url.is_some());
                assert!(draft.art_url.is_some());
            }
            WizardOutcome::Failed { reason } => panic!("expected completion, got: {reason}"),
        }
    }

    #[tokio::test]
    async fn invalid_field_value_flashes_and_does_not_resolve() {
        let registry = SessionRegistry::new();
        let author = UserId::generate();
        let sink = RecordingSink { sent: Mutex::new(Vec::new()) };
        let (tx, rx) = unbounded_channel();
        tx.send(modal(&[("sheet_url", "not-a-url")])).unwrap();
        tx.send(SessionInput::Cancel).unwrap();
        let outcome = run_character_wizard(&registry, author, rx, &sink).await;
        assert!(matches!(outcome, WizardOutcome::Failed { .. }));
        assert!(sink.sent.lock().unwrap().iter().any(|m| m.contains("valid URL")));
    }
}
