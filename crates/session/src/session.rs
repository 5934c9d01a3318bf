use std::sync::Arc;

use askmom_api::{AssistantApi, ConversationId, ConversationSummary};
use tokio::sync::mpsc;

use crate::attachments::{ImageAttachmentPipeline, ImageTranscoder, PhotoLibrary};
use crate::coordinator::{Completion, SendCoordinator, SendRequest, SendTicket};
use crate::error::{PickError, SendRejection};
use crate::events::{SessionEvent, SessionUpdate};
use crate::loader::{ConversationLoader, map_detail};
use crate::settings::SessionSettings;
use crate::store::MessageStore;
use crate::turn::{ImageRef, Turn, TurnPatch};

/// Where the timeline is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    /// Empty and unbound; the opener has not been shown yet.
    #[default]
    Fresh,
    /// A history conversation is being fetched.
    Loading,
    Active,
}

/// Owns every piece of conversation state.
///
/// All mutation happens through `&mut self`. Background work reports back as
/// `SessionEvent`s, which `next_update` (or `try_drain`) applies in order.
pub struct Session {
    store: MessageStore,
    attachments: ImageAttachmentPipeline,
    coordinator: SendCoordinator,
    loader: ConversationLoader,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
    phase: SessionPhase,
    conversation_id: Option<ConversationId>,
    input: String,
    conversations: Vec<ConversationSummary>,
    list_request: u64,
    load_request: u64,
}

impl Session {
    pub fn new(api: Arc<dyn AssistantApi>, settings: &SessionSettings) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let coordinator = SendCoordinator::new(
            Arc::clone(&api),
            events_tx.clone(),
            settings.thinking_cadence(),
            settings.thinking_phrases.clone(),
        );

        Self {
            store: MessageStore::new(),
            attachments: ImageAttachmentPipeline::new(),
            coordinator,
            loader: ConversationLoader::new(api),
            events_tx,
            events_rx,
            phase: SessionPhase::Fresh,
            conversation_id: None,
            input: String::new(),
            conversations: Vec::new(),
            list_request: 0,
            load_request: 0,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn conversation_id(&self) -> Option<ConversationId> {
        self.conversation_id
    }

    pub fn turns(&self) -> &[Turn] {
        self.store.turns()
    }

    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    pub fn staged(&self) -> &[ImageRef] {
        self.attachments.staged()
    }

    pub fn conversations(&self) -> &[ConversationSummary] {
        &self.conversations
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, input: impl Into<String>) {
        self.input = input.into();
    }

    pub fn is_busy(&self) -> bool {
        self.coordinator.is_busy()
    }

    /// Mirrors the composer's send button.
    pub fn can_send(&self) -> bool {
        !self.is_busy()
            && self.phase != SessionPhase::Loading
            && (!self.input.trim().is_empty() || !self.attachments.is_empty())
    }

    /// Shows the opener on an empty, unbound timeline. Returns whether it was added.
    pub fn seed_opener_if_fresh(&mut self) -> bool {
        if self.phase != SessionPhase::Fresh
            || self.conversation_id.is_some()
            || !self.store.is_empty()
        {
            return false;
        }

        self.store.append([Turn::opener()]);
        self.phase = SessionPhase::Active;
        true
    }

    /// Sends the composer input and staged images.
    pub fn send(&mut self) -> Result<SendTicket, SendRejection> {
        let has_content = !self.input.trim().is_empty() || !self.attachments.is_empty();
        if has_content {
            self.seed_opener_if_fresh();
        }

        let request = SendRequest {
            text: &self.input,
            conversation_id: self.conversation_id,
            loading_conversation: self.phase == SessionPhase::Loading,
        };
        let ticket = self
            .coordinator
            .begin(request, &mut self.attachments, &mut self.store)?;

        self.input.clear();
        Ok(ticket)
    }

    /// Applies one background event.
    pub fn handle_event(&mut self, event: SessionEvent) -> SessionUpdate {
        match event {
            SessionEvent::Thinking(tick) => {
                if !self.coordinator.accepts_tick(&tick) {
                    return SessionUpdate::Ignored;
                }
                let turn_id = tick.turn_id;
                if self.store.update_by_id(turn_id, TurnPatch::text(tick.text)) {
                    SessionUpdate::ThinkingAnimated(turn_id)
                } else {
                    SessionUpdate::Ignored
                }
            }
            SessionEvent::AskCompleted {
                pending_turn,
                outcome,
            } => match self.coordinator.complete(pending_turn, outcome, &mut self.store) {
                Completion::Resolved {
                    turn_id,
                    conversation_id,
                } => {
                    if self.conversation_id.is_none() {
                        self.conversation_id = Some(conversation_id);
                    }
                    self.refresh_conversations();
                    SessionUpdate::ReplyResolved {
                        turn_id,
                        conversation_id,
                    }
                }
                Completion::Failed { turn_id, kind } => SessionUpdate::ReplyFailed { turn_id, kind },
                Completion::Stale(turn_id) => SessionUpdate::StaleReplyIgnored(turn_id),
                Completion::Unexpected(_) => SessionUpdate::Ignored,
            },
            SessionEvent::ConversationsListed { request, result } => {
                if request != self.list_request {
                    return SessionUpdate::Ignored;
                }
                match result {
                    Ok(conversations) => {
                        tracing::debug!(count = conversations.len(), "conversation list refreshed");
                        self.conversations = conversations;
                        SessionUpdate::ConversationsRefreshed
                    }
                    Err(error) => {
                        tracing::warn!(error = %error, "conversation list refresh failed");
                        SessionUpdate::ConversationsRefreshFailed
                    }
                }
            }
            SessionEvent::ConversationLoaded {
                request,
                conversation_id,
                result,
            } => {
                if request != self.load_request || self.phase != SessionPhase::Loading {
                    tracing::debug!(conversation_id = %conversation_id, "ignoring superseded load");
                    return SessionUpdate::Ignored;
                }
                match result {
                    Ok(detail) => {
                        let turns = map_detail(&detail);
                        tracing::info!(
                            conversation_id = %conversation_id,
                            turns = turns.len(),
                            "conversation loaded"
                        );
                        self.store.replace(turns);
                        self.conversation_id = Some(conversation_id);
                        self.attachments.clear();
                        self.input.clear();
                        self.phase = SessionPhase::Active;
                        SessionUpdate::ConversationLoaded(conversation_id)
                    }
                    Err(error) => {
                        tracing::warn!(
                            conversation_id = %conversation_id,
                            error = %error,
                            "conversation load failed"
                        );
                        self.phase = if self.store.is_empty() && self.conversation_id.is_none() {
                            SessionPhase::Fresh
                        } else {
                            SessionPhase::Active
                        };
                        SessionUpdate::ConversationLoadFailed {
                            conversation_id,
                            notice: error.notice(),
                        }
                    }
                }
            }
        }
    }

    /// Waits for the next background event and applies it.
    pub async fn next_update(&mut self) -> Option<SessionUpdate> {
        let event = self.events_rx.recv().await?;
        Some(self.handle_event(event))
    }

    /// Applies every event already queued without waiting.
    pub fn try_drain(&mut self) -> Vec<SessionUpdate> {
        let mut updates = Vec::new();
        while let Ok(event) = self.events_rx.try_recv() {
            updates.push(self.handle_event(event));
        }
        updates
    }

    pub fn refresh_conversations(&mut self) {
        self.search_conversations(None);
    }

    /// Fetches the conversation list; only the latest request is applied.
    pub fn search_conversations(&mut self, query: Option<String>) {
        self.list_request = self.list_request.wrapping_add(1);
        let request = self.list_request;
        let loader = self.loader.clone();
        let events = self.events_tx.clone();

        tokio::spawn(async move {
            let result = loader.list_summaries(query).await;
            let _ = events.send(SessionEvent::ConversationsListed { request, result });
        });
    }

    /// Switches to a history conversation, replacing the timeline once it loads.
    pub fn select_conversation(&mut self, conversation_id: ConversationId) {
        self.coordinator.stop_animation();
        self.phase = SessionPhase::Loading;
        self.load_request = self.load_request.wrapping_add(1);
        let request = self.load_request;
        let loader = self.loader.clone();
        let events = self.events_tx.clone();

        tracing::info!(conversation_id = %conversation_id, "loading conversation");
        tokio::spawn(async move {
            let result = loader.load_detail(conversation_id).await;
            let _ = events.send(SessionEvent::ConversationLoaded {
                request,
                conversation_id,
                result,
            });
        });
    }

    /// Starts a fresh thread. An outstanding reply still settles, as a no-op.
    pub fn clear(&mut self) {
        self.coordinator.stop_animation();
        self.store.clear();
        self.attachments.clear();
        self.input.clear();
        self.conversation_id = None;
        // Invalidates any load still in flight.
        self.load_request = self.load_request.wrapping_add(1);
        self.phase = SessionPhase::Fresh;
        tracing::info!("session cleared");
    }

    pub async fn pick_images(
        &mut self,
        library: &dyn PhotoLibrary,
        transcoder: &dyn ImageTranscoder,
    ) -> Result<usize, PickError> {
        self.attachments.pick(library, transcoder).await
    }

    pub fn mark_image_loaded(&mut self, uri: &str) -> bool {
        self.attachments.mark_loaded(uri)
    }

    pub fn remove_image(&mut self, uri: &str) -> bool {
        self.attachments.remove(uri)
    }
}
