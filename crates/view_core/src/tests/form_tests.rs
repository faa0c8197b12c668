use super::*;
use crate::{
    session::{AnonymousSession, StaticSession},
    test_support::ScriptedTransport,
    NoticeLevel,
};
use shared::domain::{SessionUser, UserId};

fn member() -> SessionUser {
    SessionUser {
        id: UserId::new("u-1"),
        is_admin: false,
        display_name: Some("Founder".into()),
        bearer_token: Some("session-token".into()),
    }
}

fn endpoint() -> Url {
    Url::parse("http://api.test/api/contact").expect("url")
}

fn contact_form(
    transport: Arc<ScriptedTransport>,
    session: Arc<dyn SessionProvider>,
) -> (FormSubmissionController, broadcast::Receiver<ViewEvent>) {
    let (events, rx) = broadcast::channel(16);
    let form = FormSubmissionController::new(
        transport,
        session,
        endpoint(),
        FormState::with_fields(CONTACT_FIELDS),
        events,
    )
    .with_fallback_message("Could not send your message.");
    (form, rx)
}

fn fill(form: &FormSubmissionController) {
    form.update_field("name", "Ada");
    form.update_field("email", "ada@example.test");
    form.update_field("subject", "Incubation");
    form.update_field("message", "Hello there");
}

#[test]
fn update_field_overwrites_single_key() {
    let mut state = FormState::with_fields(["name", "email"]);
    state.set("name", "Ada");
    state.set("name", "Grace");

    assert_eq!(state.get("name"), Some("Grace"));
    assert_eq!(state.get("email"), Some(""));
    assert_eq!(state.iter().count(), 2);
}

#[tokio::test]
async fn successful_submit_blanks_every_field() {
    let transport = Arc::new(ScriptedTransport::respond(201, r#"{"message":"Thanks!"}"#));
    let (form, mut rx) = contact_form(transport.clone(), Arc::new(StaticSession::signed_in(member())));
    fill(&form);

    let receipt = form.submit().await.expect("submit");

    assert_eq!(receipt.status, 201);
    assert_eq!(receipt.message, "Thanks!");
    let after = form.snapshot();
    assert!(after.is_blank());
    assert_eq!(after.iter().count(), CONTACT_FIELDS.len());

    match rx.recv().await.expect("event") {
        ViewEvent::Notice(notice) => assert_eq!(notice.level, NoticeLevel::Success),
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn submit_sends_snapshot_with_bearer_token() {
    let transport = Arc::new(ScriptedTransport::respond(200, ""));
    let (form, _rx) = contact_form(transport.clone(), Arc::new(StaticSession::signed_in(member())));
    fill(&form);

    form.submit().await.expect("submit");

    let request = transport.last_request().expect("request");
    let body = request.body.expect("json body");
    assert_eq!(body["email"], "ada@example.test");
    assert_eq!(body["message"], "Hello there");
    assert_eq!(request.bearer_token.as_deref(), Some("session-token"));
}

#[tokio::test]
async fn failed_submit_preserves_fields() {
    let transport = Arc::new(ScriptedTransport::respond(422, r#"{"message":"email is invalid"}"#));
    let (form, mut rx) = contact_form(transport, Arc::new(StaticSession::signed_in(member())));
    fill(&form);
    let before = form.snapshot();

    let failure = form.submit().await.expect_err("rejected");

    assert_eq!(failure.message, "email is invalid");
    assert_eq!(
        failure.cause,
        ViewError::ServerRejection {
            status: 422,
            message: Some("email is invalid".into())
        }
    );
    assert_eq!(form.snapshot(), before);
    match rx.recv().await.expect("event") {
        ViewEvent::Notice(notice) => {
            assert_eq!(notice.level, NoticeLevel::Error);
            assert!(notice.dismissible);
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn network_failure_uses_fallback_and_keeps_fields() {
    let transport = Arc::new(ScriptedTransport::unreachable());
    let (form, _rx) = contact_form(transport, Arc::new(StaticSession::signed_in(member())));
    fill(&form);
    let before = form.snapshot();

    let failure = form.submit().await.expect_err("unreachable");

    assert_eq!(failure.message, "Could not send your message.");
    assert!(matches!(failure.cause, ViewError::NetworkFailure(_)));
    assert_eq!(form.snapshot(), before);
    assert_eq!(form.in_flight(), 0);
}

#[tokio::test]
async fn submit_without_session_never_touches_network() {
    let transport = Arc::new(ScriptedTransport::respond(200, ""));
    let (form, mut rx) = contact_form(transport.clone(), Arc::new(AnonymousSession));
    fill(&form);

    let failure = form.submit().await.expect_err("unauthenticated");

    assert!(failure.is_unauthenticated());
    assert_eq!(transport.calls(), 0);
    assert_eq!(form.snapshot().get("name"), Some("Ada"));
    assert!(matches!(
        rx.recv().await.expect("event"),
        ViewEvent::LoginRequired { .. }
    ));
}

#[tokio::test]
async fn concurrent_submits_are_not_deduplicated() {
    let transport = Arc::new(
        ScriptedTransport::respond(200, "").with_delay(std::time::Duration::from_millis(20)),
    );
    let (form, _rx) = contact_form(transport.clone(), Arc::new(StaticSession::signed_in(member())));
    fill(&form);

    let (first, second) = tokio::join!(form.submit(), form.submit());

    assert!(first.is_ok() && second.is_ok());
    assert_eq!(transport.calls(), 2);
    assert_eq!(form.in_flight(), 0);
}
