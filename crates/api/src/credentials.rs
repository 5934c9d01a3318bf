use std::sync::Arc;

use arc_swap::ArcSwapOption;

/// Source of the bearer token supplied by the sign-in flow.
pub trait CredentialSource: Send + Sync {
    fn bearer_token(&self) -> Option<String>;
}

/// Token holder that the auth layer swaps on sign-in/sign-out.
#[derive(Default)]
pub struct SharedCredential {
    token: ArcSwapOption<String>,
}

impl SharedCredential {
    pub fn new(token: Option<String>) -> Self {
        let credential = Self::default();
        credential.set(token);
        credential
    }

    pub fn set(&self, token: Option<String>) {
        let token = token
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        self.token.store(token.map(Arc::new));
    }

    pub fn clear(&self) {
        self.token.store(None);
    }
}

impl CredentialSource for SharedCredential {
    fn bearer_token(&self) -> Option<String> {
        self.token.load_full().map(|token| token.as_ref().clone())
    }
}
