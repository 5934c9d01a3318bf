#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use askmom_api::{
    AskReply, AskRequest, AssistantApi, AssistantResult, BoxFuture, ClientConfig,
    ConversationDetail, ConversationId, ConversationSummary, HttpAssistantClient, RemoteImage,
    RemoteMessage, RemoteMessageId, RiskLevel, SharedCredential,
};
use askmom_session::{
    ImageTranscoder, PhotoLibrary, PickError, PickOutcome, Session, SessionSettings,
    SessionUpdate, TranscodeError,
};
use tokio::sync::Semaphore;

pub enum Scripted<T> {
    Ok(T),
    /// Fails the way a client without credentials does.
    Fail,
}

/// In-memory assistant backend with a release gate on `ask`.
pub struct ScriptedAssistant {
    gate: Semaphore,
    asks: Mutex<Vec<AskRequest>>,
    replies: Mutex<VecDeque<Scripted<AskReply>>>,
    list_queries: Mutex<Vec<Option<String>>>,
    details: Mutex<HashMap<ConversationId, Scripted<ConversationDetail>>>,
    unauthenticated: HttpAssistantClient,
}

impl ScriptedAssistant {
    fn with_permits(permits: usize) -> Arc<Self> {
        let unauthenticated = HttpAssistantClient::new(
            ClientConfig::new("http://127.0.0.1:9"),
            Arc::new(SharedCredential::new(None)),
        )
        .expect("client builds");

        Arc::new(Self {
            gate: Semaphore::new(permits),
            asks: Mutex::new(Vec::new()),
            replies: Mutex::new(VecDeque::new()),
            list_queries: Mutex::new(Vec::new()),
            details: Mutex::new(HashMap::new()),
            unauthenticated,
        })
    }

    /// Replies as soon as asked.
    pub fn open() -> Arc<Self> {
        Self::with_permits(Semaphore::MAX_PERMITS)
    }

    /// Holds every reply until `release` is called.
    pub fn gated() -> Arc<Self> {
        Self::with_permits(0)
    }

    pub fn release(&self, replies: usize) {
        self.gate.add_permits(replies);
    }

    pub fn push_reply(&self, reply: Scripted<AskReply>) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn set_detail(&self, conversation_id: ConversationId, detail: Scripted<ConversationDetail>) {
        self.details.lock().unwrap().insert(conversation_id, detail);
    }

    pub fn asks(&self) -> Vec<AskRequest> {
        self.asks.lock().unwrap().clone()
    }

    pub fn list_queries(&self) -> Vec<Option<String>> {
        self.list_queries.lock().unwrap().clone()
    }
}

impl AssistantApi for ScriptedAssistant {
    fn ask<'a>(&'a self, request: AskRequest) -> BoxFuture<'a, AssistantResult<AskReply>> {
        Box::pin(async move {
            self.asks.lock().unwrap().push(request.clone());
            self.gate.acquire().await.expect("gate open").forget();

            let scripted = self.replies.lock().unwrap().pop_front();
            match scripted {
                Some(Scripted::Ok(reply)) => Ok(reply),
                Some(Scripted::Fail) | None => self.unauthenticated.ask(request).await,
            }
        })
    }

    fn list_conversations<'a>(
        &'a self,
        query: Option<String>,
    ) -> BoxFuture<'a, AssistantResult<Vec<ConversationSummary>>> {
        Box::pin(async move {
            self.list_queries.lock().unwrap().push(query.clone());
            let title = query.unwrap_or_else(|| "all".to_string());
            Ok(vec![summary(1, &title)])
        })
    }

    fn load_conversation<'a>(
        &'a self,
        conversation_id: ConversationId,
    ) -> BoxFuture<'a, AssistantResult<ConversationDetail>> {
        Box::pin(async move {
            let scripted = self.details.lock().unwrap().remove(&conversation_id);
            match scripted {
                Some(Scripted::Ok(detail)) => Ok(detail),
                Some(Scripted::Fail) | None => {
                    self.unauthenticated.load_conversation(conversation_id).await
                }
            }
        })
    }
}

/// Grants access and returns a fixed selection.
pub struct FixedLibrary(pub Vec<&'static str>);

impl PhotoLibrary for FixedLibrary {
    fn request_permission<'a>(&'a self) -> BoxFuture<'a, Result<bool, PickError>> {
        Box::pin(async { Ok(true) })
    }

    fn pick<'a>(&'a self, limit: usize) -> BoxFuture<'a, Result<PickOutcome, PickError>> {
        let picked = self.0.iter().take(limit).map(|uri| uri.to_string()).collect();
        Box::pin(async move { Ok(PickOutcome::Picked(picked)) })
    }
}

/// Converts `x.heic` to `x-converted.jpg` without touching the filesystem.
pub struct RenamingTranscoder;

impl ImageTranscoder for RenamingTranscoder {
    fn transcode<'a>(&'a self, uri: &'a str) -> BoxFuture<'a, Result<String, TranscodeError>> {
        let stem = uri.rsplit_once('.').map_or(uri, |(stem, _)| stem);
        let converted = format!("{stem}-converted.jpg");
        Box::pin(async move { Ok(converted) })
    }
}

pub fn settings() -> SessionSettings {
    SessionSettings {
        thinking_phrases: vec!["One sec".to_string()],
        ..SessionSettings::default()
    }
}

pub fn session(api: Arc<ScriptedAssistant>) -> Session {
    Session::new(api, &settings())
}

pub fn reply(conversation_id: u64, summary: &str, steps: &[&str]) -> AskReply {
    AskReply {
        conversation_id: ConversationId::new(conversation_id),
        message_id: RemoteMessageId(100),
        risk_level: RiskLevel::Medium,
        summary: summary.to_string(),
        steps: steps.iter().map(|step| step.to_string()).collect(),
        escalate_suggested: false,
        confidence: 0.5,
        show_contact_panel: None,
        escalation_reason: None,
        contact_actions: None,
        contact_draft: None,
        contact_targets: None,
    }
}

pub fn summary(id: u64, title: &str) -> ConversationSummary {
    ConversationSummary {
        id: ConversationId::new(id),
        title: Some(title.to_string()),
        channel: "app".to_string(),
        status: "open".to_string(),
        risk_level: RiskLevel::Low,
        last_message_at: None,
        created_at: "2026-01-01T00:00:00Z".to_string(),
    }
}

pub fn remote_message(id: u64, sender_type: &str, content: &str, images: &[&str]) -> RemoteMessage {
    RemoteMessage {
        id: RemoteMessageId(id),
        sender_type: sender_type.to_string(),
        content: content.to_string(),
        content_type: None,
        risk_level: None,
        created_at: "2026-01-01T00:00:00Z".to_string(),
        images: images
            .iter()
            .map(|uri| RemoteImage::Url(uri.to_string()))
            .collect(),
    }
}

pub fn detail(id: u64, messages: Vec<RemoteMessage>) -> ConversationDetail {
    ConversationDetail {
        conversation: summary(id, "history"),
        messages,
    }
}

/// Applies updates until one matches `predicate`.
pub async fn wait_for(
    session: &mut Session,
    mut predicate: impl FnMut(&SessionUpdate) -> bool,
) -> SessionUpdate {
    tokio::time::timeout(Duration::from_secs(30), async {
        loop {
            let update = session.next_update().await.expect("session channel open");
            if predicate(&update) {
                return update;
            }
        }
    })
    .await
    .expect("timed out waiting for a session update")
}
