use askmom_api::{AskReply, ContactActions, ContactDraft, ContactTargets};

use crate::deep_link::{self, Platform};

/// Phone number used when the assistant does not name a contact.
pub const DEFAULT_CONTACT_PHONE: &str = "+15551234567";
/// Email address used when the assistant does not name a contact.
pub const DEFAULT_CONTACT_EMAIL: &str = "support@momcomputer.com";

pub const DEFAULT_SMS_BODY: &str = "Hey — can you help me real quick?\n\nI’m stuck and not sure what to do next.\n\nWhat’s the next step I should try?";
pub const DEFAULT_EMAIL_SUBJECT: &str = "Quick help needed";
pub const DEFAULT_EMAIL_BODY: &str = "Hi,\n\nI’m using Mom’s Computer and I’m not sure what to do next.\n\nI’m stuck and not sure what to do next.\n\nWhat’s the next step I should try?\n\n— Sent from Mom’s Computer";

/// Escalation data attached to a resolved assistant turn.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ContactPanel {
    pub show_contact_panel: bool,
    pub escalation_reason: Option<String>,
    pub contact_actions: Option<ContactActions>,
    pub contact_draft: Option<ContactDraft>,
    pub contact_targets: Option<ContactTargets>,
}

impl ContactPanel {
    /// Maps a reply onto panel fields without inventing values.
    pub fn resolve(reply: &AskReply) -> Self {
        Self {
            show_contact_panel: reply.show_contact_panel.unwrap_or(false),
            escalation_reason: reply.escalation_reason.clone(),
            contact_actions: reply.contact_actions,
            contact_draft: reply.contact_draft.clone(),
            contact_targets: reply.contact_targets.clone(),
        }
    }

    /// Renderer view with defaults filled in; `None` when the panel is hidden.
    pub fn view(&self) -> Option<ContactPanelView> {
        if !self.show_contact_panel {
            return None;
        }

        let actions = self.contact_actions;
        let draft = self.contact_draft.as_ref();
        let targets = self.contact_targets.as_ref();

        Some(ContactPanelView {
            sms_enabled: actions.is_none_or(|actions| actions.sms != Some(false)),
            email_enabled: actions.is_none_or(|actions| actions.email != Some(false)),
            call_enabled: actions.is_none_or(|actions| actions.call != Some(false)),
            phone: non_blank(targets.and_then(|targets| targets.phone.as_deref()))
                .unwrap_or(DEFAULT_CONTACT_PHONE)
                .to_string(),
            email: non_blank(targets.and_then(|targets| targets.email.as_deref()))
                .unwrap_or(DEFAULT_CONTACT_EMAIL)
                .to_string(),
            sms_body: non_blank(draft.map(|draft| draft.sms_body.as_str()))
                .unwrap_or(DEFAULT_SMS_BODY)
                .to_string(),
            email_subject: non_blank(draft.map(|draft| draft.email_subject.as_str()))
                .unwrap_or(DEFAULT_EMAIL_SUBJECT)
                .to_string(),
            email_body: non_blank(draft.map(|draft| draft.email_body.as_str()))
                .unwrap_or(DEFAULT_EMAIL_BODY)
                .to_string(),
        })
    }
}

/// Fully defaulted panel, ready to render buttons and open deep links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactPanelView {
    pub sms_enabled: bool,
    pub email_enabled: bool,
    pub call_enabled: bool,
    pub phone: String,
    pub email: String,
    pub sms_body: String,
    pub email_subject: String,
    pub email_body: String,
}

impl ContactPanelView {
    pub fn sms_link(&self, platform: Platform) -> Option<String> {
        self.sms_enabled
            .then(|| deep_link::sms_url(&self.phone, &self.sms_body, platform))
    }

    pub fn email_link(&self) -> Option<String> {
        self.email_enabled
            .then(|| deep_link::mailto_url(&self.email, &self.email_subject, &self.email_body))
    }

    pub fn call_link(&self) -> Option<String> {
        self.call_enabled.then(|| deep_link::tel_url(&self.phone))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
