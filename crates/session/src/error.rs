use askmom_api::{AssistantError, ConversationId};
use snafu::Snafu;

/// User-facing alert text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: &'static str,
    pub body: String,
}

impl Notice {
    pub fn new(title: &'static str, body: impl Into<String>) -> Self {
        Self {
            title,
            body: body.into(),
        }
    }
}

/// Local validation failure; nothing was mutated and nothing reached the network.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SendRejection {
    #[snafu(display("nothing to send: text is blank and no image is staged"))]
    EmptyTurn { stage: &'static str },
    #[snafu(display("a reply is still outstanding"))]
    AwaitingResponse { stage: &'static str },
    #[snafu(display("a conversation is still loading"))]
    LoadingConversation { stage: &'static str },
}

impl SendRejection {
    pub fn notice(&self) -> Option<Notice> {
        match self {
            Self::EmptyTurn { .. } => Some(Notice::new(
                "Type a message",
                "Ask anything about what you’re seeing or what happened.",
            )),
            // The composer is disabled while busy; no alert.
            Self::AwaitingResponse { .. } | Self::LoadingConversation { .. } => None,
        }
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum PickError {
    #[snafu(display("staging already holds {max} images"))]
    LimitReached { stage: &'static str, max: usize },
    #[snafu(display("photo library permission was denied"))]
    PermissionDenied { stage: &'static str },
    #[snafu(display("photo picker failed on `{stage}`: {message}"))]
    Picker {
        stage: &'static str,
        message: String,
    },
}

impl PickError {
    pub fn notice(&self) -> Notice {
        match self {
            Self::LimitReached { .. } => Notice::new("Max 5 images", "Remove one to add another."),
            Self::PermissionDenied { .. } => Notice::new(
                "Photo access needed",
                "Please allow photo library access to attach images.",
            ),
            Self::Picker { .. } => Notice::new("Couldn’t open photos", "Please try again."),
        }
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum TranscodeError {
    #[snafu(display("failed to read image '{uri}': {source}"))]
    Read {
        stage: &'static str,
        uri: String,
        source: std::io::Error,
    },
    #[snafu(display("failed to decode image '{uri}': {source}"))]
    Decode {
        stage: &'static str,
        uri: String,
        source: image::ImageError,
    },
    #[snafu(display("failed to create converted image '{path}': {source}"))]
    Create {
        stage: &'static str,
        path: String,
        source: std::io::Error,
    },
    #[snafu(display("failed to write converted image '{path}': {source}"))]
    Encode {
        stage: &'static str,
        path: String,
        source: image::ImageError,
    },
    #[snafu(display("transcode worker for '{uri}' did not finish: {source}"))]
    Worker {
        stage: &'static str,
        uri: String,
        source: tokio::task::JoinError,
    },
    #[snafu(display("image handle '{uri}' is not a local file"))]
    NotLocal { stage: &'static str, uri: String },
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum LoadError {
    #[snafu(display("failed to list conversations: {source}"))]
    List {
        stage: &'static str,
        source: AssistantError,
    },
    #[snafu(display("failed to load conversation {conversation_id}: {source}"))]
    Fetch {
        stage: &'static str,
        conversation_id: ConversationId,
        source: AssistantError,
    },
}

impl LoadError {
    pub fn notice(&self) -> Notice {
        load_failure_notice(Some(self.to_string()))
    }
}

/// Alert shown when a history conversation fails to load.
pub fn load_failure_notice(message: Option<String>) -> Notice {
    Notice::new(
        "Couldn’t load that chat",
        message
            .filter(|message| !message.trim().is_empty())
            .unwrap_or_else(|| "Please try again.".to_string()),
    )
}
