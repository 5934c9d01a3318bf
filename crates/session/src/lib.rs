#![deny(unsafe_code)]

//! Conversation session controller for the Ask Mom assistant.
//!
//! [`Session`] owns the timeline, composer and history state. Remote calls and
//! the thinking animation run on spawned tasks and re-enter through
//! [`Session::next_update`].

mod animator;
mod attachments;
mod contact;
mod coordinator;
mod deep_link;
mod error;
mod events;
mod ids;
mod loader;
mod session;
mod settings;
mod store;
mod turn;

pub use animator::{AnimatorHandle, DEFAULT_THINKING_CADENCE, ThinkingAnimator, thinking_frame};
pub use attachments::{
    COMPATIBLE_EXTENSIONS, ImageAttachmentPipeline, ImageCrateTranscoder, ImageTranscoder,
    MAX_IMAGES, PathPhotoLibrary, PhotoLibrary, PickOutcome, extension,
};
pub use contact::{
    ContactPanel, ContactPanelView, DEFAULT_CONTACT_EMAIL, DEFAULT_CONTACT_PHONE,
    DEFAULT_EMAIL_BODY, DEFAULT_EMAIL_SUBJECT, DEFAULT_SMS_BODY,
};
pub use coordinator::{Completion, SendCoordinator, SendPhase, SendRequest, SendTicket};
pub use deep_link::{Platform, mailto_url, normalize_phone, sms_url, tel_url};
pub use error::{LoadError, Notice, PickError, SendRejection, TranscodeError, load_failure_notice};
pub use events::{AskOutcome, SessionEvent, SessionUpdate, ThinkingTick};
pub use ids::TurnId;
pub use loader::{ConversationLoader, map_detail};
pub use session::{Session, SessionPhase};
pub use settings::{
    DEFAULT_API_BASE_URL, DEFAULT_THINKING_PHRASE, SessionSettings, SettingsError, SettingsStore,
};
pub use store::MessageStore;
pub use turn::{FALLBACK_TEXT, IMAGE_ONLY_LABEL, ImageRef, OPENER_TEXT, Role, Turn, TurnPatch};
