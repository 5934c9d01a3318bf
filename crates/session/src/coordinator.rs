use std::sync::Arc;
use std::time::Duration;

use askmom_api::{AskRequest, AssistantApi, ConversationId, FailureKind};
use rand::seq::SliceRandom;
use snafu::ensure;
use tokio::sync::mpsc;

use crate::animator::ThinkingAnimator;
use crate::attachments::ImageAttachmentPipeline;
use crate::contact::ContactPanel;
use crate::error::{
    AwaitingResponseSnafu, EmptyTurnSnafu, LoadingConversationSnafu, SendRejection,
};
use crate::events::{AskOutcome, SessionEvent, ThinkingTick};
use crate::ids::TurnId;
use crate::settings::DEFAULT_THINKING_PHRASE;
use crate::store::MessageStore;
use crate::turn::{FALLBACK_TEXT, Turn, TurnPatch};

/// Lifecycle of one outgoing turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendPhase {
    Idle,
    Validating,
    Staged { pending_turn: TurnId },
    AwaitingResponse { pending_turn: TurnId },
    Resolved { turn_id: TurnId },
    Failed { turn_id: TurnId, kind: FailureKind },
}

impl SendPhase {
    pub fn can_transition_to(&self, next: &SendPhase) -> bool {
        use SendPhase::*;

        match (self, next) {
            (Idle, Validating) => true,
            (Validating, Idle | Staged { .. }) => true,
            (Staged { pending_turn }, AwaitingResponse { pending_turn: next }) => {
                pending_turn == next
            }
            // A completion whose turn was cleared away drops straight back to idle.
            (AwaitingResponse { .. }, Idle) => true,
            (AwaitingResponse { pending_turn }, Resolved { turn_id } | Failed { turn_id, .. }) => {
                pending_turn == turn_id
            }
            (Resolved { .. } | Failed { .. }, Idle) => true,
            _ => false,
        }
    }

    pub fn pending_turn(&self) -> Option<TurnId> {
        match self {
            Self::Staged { pending_turn } | Self::AwaitingResponse { pending_turn } => {
                Some(*pending_turn)
            }
            _ => None,
        }
    }
}

/// Inputs to one send attempt.
pub struct SendRequest<'a> {
    pub text: &'a str,
    pub conversation_id: Option<ConversationId>,
    pub loading_conversation: bool,
}

/// A send that passed validation and reached the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendTicket {
    pub user_turn: TurnId,
    pub pending_turn: TurnId,
}

/// What a completion did to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Resolved {
        turn_id: TurnId,
        conversation_id: ConversationId,
    },
    Failed {
        turn_id: TurnId,
        kind: FailureKind,
    },
    /// The pending turn was cleared or switched away; nothing was applied.
    Stale(TurnId),
    /// No send was outstanding for this turn.
    Unexpected(TurnId),
}

/// Drives one outgoing turn at a time through `SendPhase`.
pub struct SendCoordinator {
    api: Arc<dyn AssistantApi>,
    events: mpsc::UnboundedSender<SessionEvent>,
    animator: ThinkingAnimator,
    phrases: Vec<String>,
    phase: SendPhase,
}

impl SendCoordinator {
    pub fn new(
        api: Arc<dyn AssistantApi>,
        events: mpsc::UnboundedSender<SessionEvent>,
        cadence: Duration,
        phrases: Vec<String>,
    ) -> Self {
        Self {
            api,
            animator: ThinkingAnimator::new(cadence, events.clone()),
            events,
            phrases,
            phase: SendPhase::Idle,
        }
    }

    pub fn phase(&self) -> SendPhase {
        self.phase
    }

    /// True while a remote call is outstanding.
    pub fn is_busy(&self) -> bool {
        !matches!(self.phase, SendPhase::Idle)
    }

    pub fn animator(&self) -> &ThinkingAnimator {
        &self.animator
    }

    pub fn accepts_tick(&self, tick: &ThinkingTick) -> bool {
        self.animator.accepts(tick)
    }

    /// Stops the thinking animation without touching the outstanding call.
    pub fn stop_animation(&mut self) {
        self.animator.stop();
    }

    fn transition(&mut self, next: SendPhase) {
        if !self.phase.can_transition_to(&next) {
            tracing::warn!(from = ?self.phase, to = ?next, "unexpected send phase transition");
        }
        tracing::trace!(from = ?self.phase, to = ?next, "send phase");
        self.phase = next;
    }

    fn validate(request: &SendRequest<'_>, staged: usize) -> Result<(), SendRejection> {
        ensure!(
            !request.loading_conversation,
            LoadingConversationSnafu {
                stage: "validate-loading",
            }
        );
        ensure!(
            !request.text.trim().is_empty() || staged > 0,
            EmptyTurnSnafu {
                stage: "validate-content",
            }
        );
        Ok(())
    }

    fn thinking_phrase(&self) -> String {
        self.phrases
            .choose(&mut rand::thread_rng())
            .cloned()
            .unwrap_or_else(|| DEFAULT_THINKING_PHRASE.to_string())
    }

    /// Validates, stages both turns, starts the animation and spawns the remote call.
    ///
    /// On rejection nothing is mutated.
    pub fn begin(
        &mut self,
        request: SendRequest<'_>,
        attachments: &mut ImageAttachmentPipeline,
        store: &mut MessageStore,
    ) -> Result<SendTicket, SendRejection> {
        if self.is_busy() {
            tracing::debug!(phase = ?self.phase, "send rejected while a reply is outstanding");
            return AwaitingResponseSnafu {
                stage: "validate-outstanding",
            }
            .fail();
        }

        self.transition(SendPhase::Validating);
        if let Err(rejection) = Self::validate(&request, attachments.len()) {
            tracing::debug!(reason = %rejection, "send rejected");
            self.transition(SendPhase::Idle);
            return Err(rejection);
        }

        let text = request.text.trim().to_string();
        let images = attachments.snapshot_and_clear();
        let image_uris = images.iter().map(|image| image.uri.clone()).collect();

        let user_turn = Turn::user(&text, images);
        let base_text = self.thinking_phrase();
        let pending = Turn::pending_assistant(base_text.clone());
        let ticket = SendTicket {
            user_turn: user_turn.id,
            pending_turn: pending.id,
        };

        store.append([user_turn, pending]);
        self.animator.start(ticket.pending_turn, base_text);
        self.transition(SendPhase::Staged {
            pending_turn: ticket.pending_turn,
        });

        let ask = AskRequest::new(text)
            .with_conversation(request.conversation_id)
            .with_images(image_uris);
        let api = Arc::clone(&self.api);
        let events = self.events.clone();
        let pending_turn = ticket.pending_turn;

        tokio::spawn(async move {
            let outcome = AskOutcome::from(api.ask(ask).await);
            if events
                .send(SessionEvent::AskCompleted {
                    pending_turn,
                    outcome,
                })
                .is_err()
            {
                tracing::debug!(turn_id = %pending_turn, "session dropped before reply arrived");
            }
        });

        self.transition(SendPhase::AwaitingResponse { pending_turn });
        tracing::info!(
            turn_id = %pending_turn,
            conversation_id = ?request.conversation_id,
            "send accepted"
        );
        Ok(ticket)
    }

    /// Applies a finished remote call to the store and returns to `Idle`.
    pub fn complete(
        &mut self,
        pending_turn: TurnId,
        outcome: AskOutcome,
        store: &mut MessageStore,
    ) -> Completion {
        if self.phase.pending_turn() != Some(pending_turn) {
            tracing::warn!(turn_id = %pending_turn, phase = ?self.phase, "completion for unknown send");
            return Completion::Unexpected(pending_turn);
        }

        if !store.contains(pending_turn) {
            tracing::debug!(turn_id = %pending_turn, "ignoring reply for a cleared turn");
            if self.animator.active_turn() == Some(pending_turn) {
                self.animator.stop();
            }
            self.transition(SendPhase::Idle);
            return Completion::Stale(pending_turn);
        }

        self.animator.stop();

        let completion = match outcome {
            AskOutcome::Resolved(reply) => {
                let patch = TurnPatch::settle(reply.formatted_text())
                    .with_contact_panel(ContactPanel::resolve(&reply));
                store.update_by_id(pending_turn, patch);
                self.transition(SendPhase::Resolved {
                    turn_id: pending_turn,
                });
                tracing::info!(
                    turn_id = %pending_turn,
                    conversation_id = %reply.conversation_id,
                    risk_level = ?reply.risk_level,
                    "reply resolved"
                );
                Completion::Resolved {
                    turn_id: pending_turn,
                    conversation_id: reply.conversation_id,
                }
            }
            AskOutcome::Failed(kind) => {
                store.update_by_id(pending_turn, TurnPatch::settle(FALLBACK_TEXT));
                self.transition(SendPhase::Failed {
                    turn_id: pending_turn,
                    kind,
                });
                tracing::warn!(turn_id = %pending_turn, kind = ?kind, "reply failed");
                Completion::Failed {
                    turn_id: pending_turn,
                    kind,
                }
            }
        };

        self.transition(SendPhase::Idle);
        completion
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_transitions_are_legal() {
        let turn_id = TurnId::new_local();
        let path = [
            SendPhase::Idle,
            SendPhase::Validating,
            SendPhase::Staged {
                pending_turn: turn_id,
            },
            SendPhase::AwaitingResponse {
                pending_turn: turn_id,
            },
            SendPhase::Resolved { turn_id },
            SendPhase::Idle,
        ];

        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(&pair[1]), "{:?} -> {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn skipping_states_is_illegal() {
        let turn_id = TurnId::new_local();
        assert!(!SendPhase::Idle.can_transition_to(&SendPhase::AwaitingResponse {
            pending_turn: turn_id
        }));
        assert!(
            !SendPhase::AwaitingResponse {
                pending_turn: turn_id
            }
            .can_transition_to(&SendPhase::Failed {
                turn_id: TurnId::new_local(),
                kind: FailureKind::Timeout,
            })
        );
        assert!(!SendPhase::Validating.can_transition_to(&SendPhase::Validating));
    }
}
