use askmom_api::{
    AskReply, AssistantError, ConversationDetail, ConversationId, ConversationSummary, FailureKind,
};

use crate::error::{LoadError, Notice};
use crate::ids::TurnId;

/// One animation frame for the pending turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThinkingTick {
    pub turn_id: TurnId,
    pub generation: u64,
    pub text: String,
}

/// Tagged result of one assistant call.
#[derive(Debug, Clone, PartialEq)]
pub enum AskOutcome {
    Resolved(AskReply),
    Failed(FailureKind),
}

impl From<Result<AskReply, AssistantError>> for AskOutcome {
    fn from(result: Result<AskReply, AssistantError>) -> Self {
        match result {
            Ok(reply) => Self::Resolved(reply),
            Err(error) => Self::Failed(error.kind()),
        }
    }
}

/// Work finished off the session task, waiting to be applied by `Session::handle_event`.
#[derive(Debug)]
pub enum SessionEvent {
    Thinking(ThinkingTick),
    AskCompleted {
        pending_turn: TurnId,
        outcome: AskOutcome,
    },
    ConversationsListed {
        request: u64,
        result: Result<Vec<ConversationSummary>, LoadError>,
    },
    ConversationLoaded {
        request: u64,
        conversation_id: ConversationId,
        result: Result<ConversationDetail, LoadError>,
    },
}

/// What changed after applying one event, for the rendering layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionUpdate {
    ThinkingAnimated(TurnId),
    ReplyResolved {
        turn_id: TurnId,
        conversation_id: ConversationId,
    },
    ReplyFailed {
        turn_id: TurnId,
        kind: FailureKind,
    },
    StaleReplyIgnored(TurnId),
    ConversationsRefreshed,
    ConversationsRefreshFailed,
    ConversationLoaded(ConversationId),
    ConversationLoadFailed {
        conversation_id: ConversationId,
        notice: Notice,
    },
    /// The event no longer matched current state and was dropped.
    Ignored,
}
