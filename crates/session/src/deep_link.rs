use serde::{Deserialize, Serialize};

/// Host platform, which decides the SMS body separator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Ios,
    #[default]
    Android,
}

/// Keeps digits and `+` only.
pub fn normalize_phone(phone: &str) -> String {
    phone
        .chars()
        .filter(|character| character.is_ascii_digit() || *character == '+')
        .collect()
}

/// `sms:` link; iOS takes `&body=`, Android takes `?body=`.
pub fn sms_url(phone: &str, body: &str, platform: Platform) -> String {
    let separator = match platform {
        Platform::Ios => '&',
        Platform::Android => '?',
    };
    format!(
        "sms:{}{separator}body={}",
        normalize_phone(phone),
        urlencoding::encode(body)
    )
}

pub fn mailto_url(email: &str, subject: &str, body: &str) -> String {
    format!(
        "mailto:{}?subject={}&body={}",
        email.trim(),
        urlencoding::encode(subject),
        urlencoding::encode(body)
    )
}

pub fn tel_url(phone: &str) -> String {
    format!("tel:{}", normalize_phone(phone))
}
