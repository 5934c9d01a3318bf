use std::sync::Arc;
use std::time::Duration;

use askmom_api::{ClientConfig, ConversationId, FailureKind, HttpAssistantClient, SharedCredential};
use askmom_session::{FALLBACK_TEXT, Session, SessionSettings, SessionUpdate, SettingsStore};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn session_for(server: &MockServer) -> Session {
    let client = HttpAssistantClient::new(
        ClientConfig::new(server.uri()).with_timeout(Duration::from_secs(5)),
        Arc::new(SharedCredential::new(Some("session-token".to_string()))),
    )
    .expect("client builds");
    Session::new(Arc::new(client), &SessionSettings::default())
}

async fn next_reply(session: &mut Session) -> SessionUpdate {
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            let update = session.next_update().await.expect("session channel open");
            if matches!(
                update,
                SessionUpdate::ReplyResolved { .. } | SessionUpdate::ReplyFailed { .. }
            ) {
                return update;
            }
        }
    })
    .await
    .expect("reply arrives")
}

#[tokio::test]
async fn server_reply_resolves_through_real_client() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/ask_mom"))
        .and(header("authorization", "Bearer session-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "conversation_id": 41,
            "message_id": 410,
            "risk_level": "high",
            "summary": "Don't pay.",
            "steps": ["Hang up"],
            "escalate_suggested": true,
            "confidence": 0.9,
            "show_contact_panel": true,
            "contact_actions": null
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/conversations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": "nope"})))
        .mount(&server)
        .await;

    let mut session = session_for(&server);
    session.set_input("They want bitcoin");
    let ticket = session.send().expect("send accepted");

    let update = next_reply(&mut session).await;
    assert_eq!(
        update,
        SessionUpdate::ReplyResolved {
            turn_id: ticket.pending_turn,
            conversation_id: ConversationId::new(41),
        }
    );

    let turn = session.store().get(ticket.pending_turn).expect("turn kept");
    assert_eq!(turn.text, "Don't pay.\n\n1. Hang up");
    assert_eq!(turn.show_contact_panel, Some(true));
    assert_eq!(turn.contact_actions, None);
}

#[tokio::test]
async fn server_error_resolves_to_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/ask_mom"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let mut session = session_for(&server);
    session.set_input("Is this my grandson?");
    let ticket = session.send().expect("send accepted");

    let update = next_reply(&mut session).await;
    assert_eq!(
        update,
        SessionUpdate::ReplyFailed {
            turn_id: ticket.pending_turn,
            kind: FailureKind::Status(502),
        }
    );

    let turn = session.store().get(ticket.pending_turn).expect("turn kept");
    assert!(!turn.pending);
    assert_eq!(turn.text, FALLBACK_TEXT);
    assert_eq!(session.conversation_id(), None);
}

#[tokio::test]
async fn saved_token_authenticates_the_next_send() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/ask_mom"))
        .and(header("authorization", "Bearer fresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "conversation_id": 8,
            "message_id": 80,
            "summary": "You're fine."
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().expect("temp dir");
    let store = SettingsStore::new(dir.path().join("settings.json"));
    let credentials = Arc::new(SharedCredential::new(None));
    let client = HttpAssistantClient::new(
        ClientConfig::new(server.uri()).with_timeout(Duration::from_secs(5)),
        credentials.clone(),
    )
    .expect("client builds");
    let mut session = Session::new(Arc::new(client), &store.settings());

    session.set_input("first try");
    let signed_out = session.send().expect("send accepted");
    assert_eq!(
        next_reply(&mut session).await,
        SessionUpdate::ReplyFailed {
            turn_id: signed_out.pending_turn,
            kind: FailureKind::MissingCredential,
        }
    );

    assert!(store.save_auth_token(Some("fresh-token"), &credentials).expect("token saved"));

    session.set_input("second try");
    let signed_in = session.send().expect("send accepted");
    assert_eq!(
        next_reply(&mut session).await,
        SessionUpdate::ReplyResolved {
            turn_id: signed_in.pending_turn,
            conversation_id: ConversationId::new(8),
        }
    );
}
