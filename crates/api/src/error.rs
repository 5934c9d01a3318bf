use snafu::Snafu;

/// Coarse failure classes surfaced to the session layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    MissingCredential,
    Timeout,
    Transport,
    Status(u16),
    MalformedBody,
    Attachment,
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum AssistantError {
    #[snafu(display("missing bearer credential on `{stage}`"))]
    MissingCredential { stage: &'static str },
    #[snafu(display("failed to build http client on `{stage}`: {source}"))]
    BuildClient {
        stage: &'static str,
        source: reqwest::Error,
    },
    #[snafu(display("request to {endpoint} failed on `{stage}`: {source}"))]
    Transport {
        stage: &'static str,
        endpoint: String,
        source: reqwest::Error,
    },
    #[snafu(display("{endpoint} returned status {status}: {body}"))]
    Status {
        stage: &'static str,
        endpoint: String,
        status: u16,
        body: String,
    },
    #[snafu(display("failed to parse response from {endpoint} on `{stage}`: {source}"))]
    MalformedBody {
        stage: &'static str,
        endpoint: String,
        source: serde_json::Error,
    },
    #[snafu(display("failed to read image attachment '{uri}' on `{stage}`: {source}"))]
    ReadAttachment {
        stage: &'static str,
        uri: String,
        source: std::io::Error,
    },
    #[snafu(display("invalid mime type '{mime}' for attachment '{uri}': {source}"))]
    AttachmentMime {
        stage: &'static str,
        uri: String,
        mime: &'static str,
        source: reqwest::Error,
    },
}

impl AssistantError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::MissingCredential { .. } => FailureKind::MissingCredential,
            Self::BuildClient { .. } => FailureKind::Transport,
            Self::Transport { source, .. } if source.is_timeout() => FailureKind::Timeout,
            Self::Transport { .. } => FailureKind::Transport,
            Self::Status { status, .. } => FailureKind::Status(*status),
            Self::MalformedBody { .. } => FailureKind::MalformedBody,
            Self::ReadAttachment { .. } | Self::AttachmentMime { .. } => FailureKind::Attachment,
        }
    }
}

pub type AssistantResult<T> = Result<T, AssistantError>;
