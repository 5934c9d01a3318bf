use std::fmt;

use askmom_api::RemoteMessageId;
use uuid::Uuid;

/// Identifier of one chat bubble.
///
/// Locally created turns use UUIDv7 (millisecond clock plus random bits), so rapid
/// sequential sends never collide. Hydrated history keeps the server message id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TurnId {
    Local(Uuid),
    Remote(RemoteMessageId),
}

impl TurnId {
    pub fn new_local() -> Self {
        Self::Local(Uuid::now_v7())
    }
}

impl fmt::Display for TurnId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(raw) => write!(formatter, "{raw}"),
            Self::Remote(raw) => write!(formatter, "remote-{raw}"),
        }
    }
}

impl From<RemoteMessageId> for TurnId {
    fn from(value: RemoteMessageId) -> Self {
        Self::Remote(value)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn rapid_local_ids_are_unique() {
        let ids = (0..1_000).map(|_| TurnId::new_local()).collect::<HashSet<_>>();
        assert_eq!(ids.len(), 1_000);
    }

    #[test]
    fn remote_ids_display_with_prefix() {
        assert_eq!(TurnId::Remote(RemoteMessageId(42)).to_string(), "remote-42");
        assert_eq!(TurnId::from(RemoteMessageId(42)), TurnId::Remote(RemoteMessageId(42)));
    }
}
