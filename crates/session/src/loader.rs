use std::sync::Arc;

use askmom_api::{AssistantApi, ConversationDetail, ConversationId, ConversationSummary};
use snafu::ResultExt;

use crate::error::{FetchSnafu, ListSnafu, LoadError};
use crate::ids::TurnId;
use crate::turn::{IMAGE_ONLY_LABEL, ImageRef, Role, Turn};

/// Reads conversation history from the assistant backend.
#[derive(Clone)]
pub struct ConversationLoader {
    api: Arc<dyn AssistantApi>,
}

impl ConversationLoader {
    pub fn new(api: Arc<dyn AssistantApi>) -> Self {
        Self { api }
    }

    /// Lists summaries; a blank query is treated as no filter.
    pub async fn list_summaries(
        &self,
        query: Option<String>,
    ) -> Result<Vec<ConversationSummary>, LoadError> {
        let query = query
            .map(|query| query.trim().to_string())
            .filter(|query| !query.is_empty());

        self.api
            .list_conversations(query)
            .await
            .context(ListSnafu {
                stage: "list-summaries",
            })
    }

    pub async fn load_detail(
        &self,
        conversation_id: ConversationId,
    ) -> Result<ConversationDetail, LoadError> {
        self.api
            .load_conversation(conversation_id)
            .await
            .context(FetchSnafu {
                stage: "load-detail",
                conversation_id,
            })
    }
}

/// Converts a loaded conversation into timeline turns.
///
/// Messages with neither text nor images are dropped; image-only messages get
/// the image label.
pub fn map_detail(detail: &ConversationDetail) -> Vec<Turn> {
    detail
        .messages
        .iter()
        .filter_map(|message| {
            let text = message.content.trim();
            if text.is_empty() && message.images.is_empty() {
                return None;
            }

            let images = message
                .images
                .iter()
                .map(|image| ImageRef::ready(image.uri()))
                .collect();

            Some(Turn {
                images,
                ..Turn::new(
                    TurnId::from(message.id),
                    Role::from_sender_type(&message.sender_type),
                    if text.is_empty() {
                        IMAGE_ONLY_LABEL
                    } else {
                        message.content.as_str()
                    },
                )
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use askmom_api::{RemoteImage, RemoteMessage, RemoteMessageId, RiskLevel};

    use super::*;

    fn message(id: u64, sender_type: &str, content: &str, images: Vec<RemoteImage>) -> RemoteMessage {
        RemoteMessage {
            id: RemoteMessageId(id),
            sender_type: sender_type.to_string(),
            content: content.to_string(),
            content_type: None,
            risk_level: None,
            created_at: "2026-01-01T00:00:00Z".to_string(),
            images,
        }
    }

    fn detail(messages: Vec<RemoteMessage>) -> ConversationDetail {
        ConversationDetail {
            conversation: ConversationSummary {
                id: ConversationId::new(9),
                title: None,
                channel: "app".to_string(),
                status: "open".to_string(),
                risk_level: RiskLevel::Low,
                last_message_at: None,
                created_at: "2026-01-01T00:00:00Z".to_string(),
            },
            messages,
        }
    }

    #[test]
    fn map_detail_keeps_text_or_image_messages() {
        let turns = map_detail(&detail(vec![
            message(1, "user", "Is this real?", Vec::new()),
            message(2, "assistant", "   ", Vec::new()),
            message(
                3,
                "user",
                "",
                vec![RemoteImage::Url("https://cdn.example/a.jpg".to_string())],
            ),
            message(4, "mom", "No, hang up.", Vec::new()),
        ]));

        assert_eq!(turns.len(), 3);
        assert_eq!(turns[0].id, TurnId::Remote(RemoteMessageId(1)));
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[1].text, IMAGE_ONLY_LABEL);
        assert_eq!(turns[1].images, vec![ImageRef::ready("https://cdn.example/a.jpg")]);
        assert_eq!(turns[2].role, Role::Assistant);
        assert!(turns.iter().all(|turn| !turn.pending));
    }
}
