use super::*;
use crate::test_support::ScriptedTransport;
use shared::domain::{EventId, Mentor, SessionUser, UserId};

fn settings() -> Settings {
    Settings {
        api_base_url: Some("http://api.test/api".to_string()),
        ..Settings::default()
    }
}

fn member() -> SessionUser {
    SessionUser {
        id: UserId::new("u-7"),
        is_admin: false,
        display_name: Some("Dana".to_string()),
        bearer_token: Some("tok-7".to_string()),
    }
}

fn core_with(
    transport: ScriptedTransport,
    session: Arc<dyn SessionProvider>,
) -> (ViewCore, Arc<ManualViewport>) {
    let viewport = Arc::new(ManualViewport::new());
    let core = ViewCore::new_with_dependencies(
        settings(),
        Arc::new(transport),
        session,
        viewport.clone(),
        Arc::new(TokioTimer::new()),
    )
    .expect("core");
    (core, viewport)
}

#[test]
fn missing_base_url_is_rejected() {
    let result = ViewCore::new_with_dependencies(
        Settings::default(),
        Arc::new(ScriptedTransport::respond(200, "[]")),
        Arc::new(AnonymousSession),
        Arc::new(ManualViewport::new()),
        Arc::new(TokioTimer::new()),
    );
    assert!(result.is_err());
}

#[test]
fn notifications_are_dismissible() {
    assert!(Notification::info("x").dismissible);
    assert_eq!(Notification::success("ok").level, NoticeLevel::Success);
    assert_eq!(Notification::error("no").level, NoticeLevel::Error);
}

#[tokio::test]
async fn fetch_collection_forwards_session_token() {
    let transport = ScriptedTransport::respond(200, r#"{"data":[{"_id":"m1","name":"Asha"}]}"#);
    let requests = Arc::clone(&transport.requests);
    let (core, _) = core_with(transport, Arc::new(StaticSession::signed_in(member())));

    let state: FetchState<Mentor> = core.fetch_collection().await;

    assert_eq!(state.status(), FetchStatus::Success);
    assert_eq!(state.data()[0].name, "Asha");
    let request = requests.lock().expect("requests").last().cloned().expect("request");
    assert_eq!(request.url.as_str(), "http://api.test/api/mentors");
    assert_eq!(request.bearer_token.as_deref(), Some("tok-7"));
    assert!(request.with_credentials);
}

#[tokio::test]
async fn theme_toggle_reaches_event_bus() {
    let (core, _) = core_with(
        ScriptedTransport::respond(200, "[]"),
        Arc::new(AnonymousSession),
    );
    let mut events = core.subscribe_events();

    core.theme().toggle();

    match events.recv().await.expect("event") {
        ViewEvent::ThemeChanged(state) => assert!(state.is_dark_mode),
        other => panic!("unexpected event {other:?}"),
    }
    let style = core.section_style(Section::Mentors, false, 2);
    assert_eq!(style.palette, style::palette_for(true));
    assert_eq!(style.css_transform(), "translateY(50px)");
}

#[tokio::test]
async fn register_without_session_prompts_login() {
    let transport = ScriptedTransport::respond(201, "{}");
    let requests = Arc::clone(&transport.requests);
    let (core, _) = core_with(transport, Arc::new(AnonymousSession));
    let mut events = core.subscribe_events();

    let result = core.registrations().register(&EventId::new("e1")).await;

    assert_eq!(result, Err(ViewError::Unauthenticated));
    assert!(requests.lock().expect("requests").is_empty());
    assert!(matches!(
        events.recv().await.expect("event"),
        ViewEvent::LoginRequired { .. }
    ));
}

#[tokio::test]
async fn observe_section_uses_configured_threshold() {
    let (core, viewport) = core_with(
        ScriptedTransport::respond(200, "[]"),
        Arc::new(AnonymousSession),
    );

    let mut handle = core.observe_section(Section::Partners);
    let region = RegionId::new("partners");
    tokio::task::yield_now().await;
    assert_eq!(viewport.threshold(&region), Some(0.1));

    viewport.emit(&region, true);
    assert!(handle.revealed().await);
    assert_eq!(viewport.unobserve_count(&region), 1);
}

#[tokio::test]
async fn production_core_reveals_through_host_viewport() {
    let viewport = Arc::new(ManualViewport::new());
    let core = ViewCore::new(settings(), Arc::new(AnonymousSession), viewport.clone())
        .expect("core");
    let region = RegionId::new("mentors");

    let mut handle = core.observe_section(Section::Mentors);
    assert!(viewport.is_observed(&region));

    assert!(viewport.emit(&region, true));
    assert!(handle.revealed().await);
}

#[tokio::test]
async fn two_observers_of_one_section_detach_independently() {
    let (core, viewport) = core_with(
        ScriptedTransport::respond(200, "[]"),
        Arc::new(AnonymousSession),
    );
    let region = RegionId::new("mentors");

    let header = core.observe_section(Section::Mentors);
    let mut grid = core.observe_section(Section::Mentors);
    assert_eq!(viewport.observer_count(&region), 2);

    header.teardown();
    assert_eq!(viewport.observer_count(&region), 1);

    assert!(viewport.emit(&region, true));
    assert!(grid.revealed().await);
    assert!(!header.is_revealed());
}
