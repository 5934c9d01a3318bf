#![deny(unsafe_code)]

//! Typed client for the Ask Mom assistant backend.

mod client;
mod credentials;
mod error;
mod types;

pub use client::{
    ASK_PATH, AssistantApi, BoxFuture, CONVERSATIONS_PATH, ClientConfig, DEFAULT_REQUEST_TIMEOUT,
    HttpAssistantClient, filename_and_mime,
};
pub use credentials::{CredentialSource, SharedCredential};
pub use error::{AssistantError, AssistantResult, FailureKind};
pub use types::{
    AskReply, AskRequest, ContactActions, ContactDraft, ContactTargets, ConversationDetail,
    ConversationId, ConversationSummary, RemoteImage, RemoteMessage, RemoteMessageId, RiskLevel,
};
