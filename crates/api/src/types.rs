use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Server-assigned identifier of one persisted conversation thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(pub u64);

impl ConversationId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Server-assigned identifier of one persisted message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteMessageId(pub u64);

impl fmt::Display for RemoteMessageId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Risk grading reported by the assistant. Unknown grades are kept as `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Per-channel switches; an absent flag leaves that channel enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ContactActions {
    #[serde(default)]
    pub sms: Option<bool>,
    #[serde(default)]
    pub email: Option<bool>,
    #[serde(default)]
    pub call: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContactDraft {
    #[serde(default, deserialize_with = "null_as_default")]
    pub sms_body: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub email_subject: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub email_body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContactTargets {
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// One outgoing user turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AskRequest {
    pub text: String,
    pub conversation_id: Option<ConversationId>,
    /// Local image handles (file paths or `file://` uris), in selection order.
    pub images: Vec<String>,
}

impl AskRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            conversation_id: None,
            images: Vec::new(),
        }
    }

    pub fn with_conversation(mut self, conversation_id: Option<ConversationId>) -> Self {
        self.conversation_id = conversation_id;
        self
    }

    pub fn with_images(mut self, images: Vec<String>) -> Self {
        self.images = images;
        self
    }

    pub fn is_multipart(&self) -> bool {
        !self.images.is_empty()
    }
}

/// JSON body used when no image is attached.
#[derive(Debug, Serialize)]
pub(crate) struct AskJsonBody<'a> {
    pub text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<ConversationId>,
}

/// Successful assistant reply. The escalation fields are optional on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AskReply {
    pub conversation_id: ConversationId,
    pub message_id: RemoteMessageId,
    #[serde(default)]
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub summary: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub steps: Vec<String>,
    #[serde(default)]
    pub escalate_suggested: bool,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub show_contact_panel: Option<bool>,
    #[serde(default)]
    pub escalation_reason: Option<String>,
    #[serde(default)]
    pub contact_actions: Option<ContactActions>,
    #[serde(default)]
    pub contact_draft: Option<ContactDraft>,
    #[serde(default)]
    pub contact_targets: Option<ContactTargets>,
}

impl AskReply {
    /// Summary paragraph, then a blank line and numbered steps when present.
    pub fn formatted_text(&self) -> String {
        let mut lines = Vec::new();
        let summary = self.summary.trim();
        if !summary.is_empty() {
            lines.push(summary.to_string());
        }

        if !self.steps.is_empty() {
            if !lines.is_empty() {
                lines.push(String::new());
            }
            for (index, step) in self.steps.iter().enumerate() {
                lines.push(format!("{}. {step}", index + 1));
            }
        }

        lines.join("\n")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: ConversationId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub channel: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub last_message_at: Option<String>,
    #[serde(default)]
    pub created_at: String,
}

/// Image attached to a persisted message; the server may send a bare url or an object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RemoteImage {
    Url(String),
    Object {
        #[serde(alias = "url")]
        uri: String,
    },
}

impl RemoteImage {
    pub fn uri(&self) -> &str {
        match self {
            Self::Url(uri) | Self::Object { uri } => uri,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteMessage {
    pub id: RemoteMessageId,
    #[serde(default)]
    pub sender_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub risk_level: Option<RiskLevel>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub images: Vec<RemoteImage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationDetail {
    pub conversation: ConversationSummary,
    #[serde(default, deserialize_with = "null_as_default")]
    pub messages: Vec<RemoteMessage>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(summary: &str, steps: &[&str]) -> AskReply {
        AskReply {
            conversation_id: ConversationId::new(1),
            message_id: RemoteMessageId(2),
            risk_level: RiskLevel::Low,
            summary: summary.to_string(),
            steps: steps.iter().map(|step| step.to_string()).collect(),
            escalate_suggested: false,
            confidence: 0.5,
            show_contact_panel: None,
            escalation_reason: None,
            contact_actions: None,
            contact_draft: None,
            contact_targets: None,
        }
    }

    #[test]
    fn formatted_text_numbers_steps_after_blank_line() {
        let reply = reply("  Looks like a scam.  ", &["Hang up", "Call your bank"]);
        assert_eq!(
            reply.formatted_text(),
            "Looks like a scam.\n\n1. Hang up\n2. Call your bank"
        );
    }

    #[test]
    fn formatted_text_without_steps_is_just_summary() {
        assert_eq!(reply("All good.", &[]).formatted_text(), "All good.");
    }

    #[test]
    fn reply_tolerates_missing_escalation_fields_and_unknown_risk() {
        let raw = r#"{
            "conversation_id": 7,
            "message_id": 70,
            "risk_level": "severe",
            "summary": "Stop.",
            "steps": null,
            "escalate_suggested": true,
            "confidence": 0.9,
            "contact_actions": null
        }"#;

        let parsed: AskReply = serde_json::from_str(raw).expect("reply parses");
        assert_eq!(parsed.conversation_id, ConversationId::new(7));
        assert_eq!(parsed.risk_level, RiskLevel::Unknown);
        assert!(parsed.steps.is_empty());
        assert_eq!(parsed.show_contact_panel, None);
        assert_eq!(parsed.contact_actions, None);
    }

    #[test]
    fn remote_images_accept_strings_and_objects() {
        let raw = r#"{
            "id": 3,
            "sender_type": "user",
            "content": null,
            "created_at": "2025-01-01T00:00:00Z",
            "images": ["https://cdn/a.jpg", {"url": "https://cdn/b.jpg"}]
        }"#;

        let parsed: RemoteMessage = serde_json::from_str(raw).expect("message parses");
        let uris = parsed.images.iter().map(RemoteImage::uri).collect::<Vec<_>>();
        assert_eq!(uris, vec!["https://cdn/a.jpg", "https://cdn/b.jpg"]);
        assert!(parsed.content.is_empty());
        assert_eq!(parsed.sender_type, "user");
    }

    #[test]
    fn formatted_text_with_blank_summary_starts_at_first_step() {
        assert_eq!(reply("   ", &["Hang up"]).formatted_text(), "1. Hang up");
    }

    #[test]
    fn partial_contact_actions_leave_missing_channels_unset() {
        let raw = r#"{
            "conversation_id": 7,
            "message_id": 71,
            "summary": "Call the bank.",
            "show_contact_panel": true,
            "contact_actions": {"sms": false}
        }"#;

        let parsed: AskReply = serde_json::from_str(raw).expect("reply parses");
        assert_eq!(
            parsed.contact_actions,
            Some(ContactActions {
                sms: Some(false),
                email: None,
                call: None,
            })
        );
    }

    #[test]
    fn contact_draft_accepts_null_bodies() {
        let raw = r#"{
            "conversation_id": 7,
            "message_id": 72,
            "summary": "Call the bank.",
            "contact_draft": {"sms_body": null, "email_subject": "Bank call", "email_body": null}
        }"#;

        let parsed: AskReply = serde_json::from_str(raw).expect("reply parses");
        let draft = parsed.contact_draft.expect("draft present");
        assert!(draft.sms_body.is_empty());
        assert_eq!(draft.email_subject, "Bank call");
        assert!(draft.email_body.is_empty());
    }
}
