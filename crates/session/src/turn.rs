use askmom_api::{ContactActions, ContactDraft, ContactTargets};

use crate::contact::ContactPanel;
use crate::ids::TurnId;

/// Pre-chat opener shown once on a fresh thread.
pub const OPENER_TEXT: &str = "Okay, sweetheart. Take it slow and tell me what’s in front of you.";

/// Text used for a turn that only carries images.
pub const IMAGE_ONLY_LABEL: &str = "(image)";

/// Replaces the pending placeholder when the assistant call fails for any reason.
pub const FALLBACK_TEXT: &str = "I couldn’t reach the server right now. Please try again.\n\n(If this is urgent or involves money/codes, don’t proceed—tell me what it said.)";

/// Chat speaker role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// `user` maps to the caller; every other sender is the assistant.
    pub fn from_sender_type(sender_type: &str) -> Self {
        if sender_type == "user" {
            Self::User
        } else {
            Self::Assistant
        }
    }
}

/// Image attached to the composer or to a sent turn.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageRef {
    pub uri: String,
    pub loading: bool,
}

impl ImageRef {
    /// Freshly selected image; the thumbnail has not decoded yet.
    pub fn placeholder(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            loading: true,
        }
    }

    pub fn ready(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            loading: false,
        }
    }
}

/// One chat bubble.
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub id: TurnId,
    pub role: Role,
    pub text: String,
    pub pending: bool,
    pub images: Vec<ImageRef>,
    pub show_contact_panel: Option<bool>,
    pub escalation_reason: Option<String>,
    pub contact_actions: Option<ContactActions>,
    pub contact_draft: Option<ContactDraft>,
    pub contact_targets: Option<ContactTargets>,
}

impl Turn {
    pub fn new(id: TurnId, role: Role, text: impl Into<String>) -> Self {
        Self {
            id,
            role,
            text: text.into(),
            pending: false,
            images: Vec::new(),
            show_contact_panel: None,
            escalation_reason: None,
            contact_actions: None,
            contact_draft: None,
            contact_targets: None,
        }
    }

    /// User turn; empty text is replaced by the image-only label.
    pub fn user(text: &str, images: Vec<ImageRef>) -> Self {
        let text = if text.trim().is_empty() {
            IMAGE_ONLY_LABEL
        } else {
            text
        };

        Self {
            images,
            ..Self::new(TurnId::new_local(), Role::User, text)
        }
    }

    /// Assistant placeholder shown while the remote call is outstanding.
    pub fn pending_assistant(base_text: impl Into<String>) -> Self {
        Self {
            pending: true,
            ..Self::new(TurnId::new_local(), Role::Assistant, base_text)
        }
    }

    pub fn opener() -> Self {
        Self::new(TurnId::new_local(), Role::Assistant, OPENER_TEXT)
    }

    /// Contact panel data as resolved from the assistant reply, if any was applied.
    pub fn contact_panel(&self) -> Option<ContactPanel> {
        let show_contact_panel = self.show_contact_panel?;
        Some(ContactPanel {
            show_contact_panel,
            escalation_reason: self.escalation_reason.clone(),
            contact_actions: self.contact_actions,
            contact_draft: self.contact_draft.clone(),
            contact_targets: self.contact_targets.clone(),
        })
    }

    pub(crate) fn apply(&mut self, patch: TurnPatch) {
        if let Some(text) = patch.text {
            self.text = text;
        }
        if let Some(pending) = patch.pending {
            self.pending = pending;
        }
        if let Some(panel) = patch.contact_panel {
            self.show_contact_panel = Some(panel.show_contact_panel);
            self.escalation_reason = panel.escalation_reason;
            self.contact_actions = panel.contact_actions;
            self.contact_draft = panel.contact_draft;
            self.contact_targets = panel.contact_targets;
        }
    }
}

/// Partial update applied through `MessageStore::update_by_id`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TurnPatch {
    pub text: Option<String>,
    pub pending: Option<bool>,
    pub contact_panel: Option<ContactPanel>,
}

impl TurnPatch {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// Final text for a pending turn; clears the pending flag.
    pub fn settle(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            pending: Some(false),
            contact_panel: None,
        }
    }

    pub fn with_contact_panel(mut self, panel: ContactPanel) -> Self {
        self.contact_panel = Some(panel);
        self
    }
}
