use super::*;
use crate::timer::TokioTimer;

fn now() -> DateTime<Utc> {
    "2025-03-01T12:00:00Z".parse().expect("timestamp")
}

async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

#[test]
fn one_shot_machine_latches_on_first_intersection() {
    let mut machine = RevealMachine::new(true);

    assert_eq!(machine.on_signal(false, now()), RevealTransition::Unchanged);
    assert_eq!(machine.on_signal(true, now()), RevealTransition::Latched);
    assert_eq!(machine.on_signal(false, now()), RevealTransition::Unchanged);
    assert_eq!(machine.on_signal(true, now()), RevealTransition::Unchanged);

    assert!(machine.is_latched());
    assert!(machine.state().has_revealed);
    assert_eq!(machine.state().triggered_at, Some(now()));
}

#[test]
fn repeatable_machine_follows_every_crossing() {
    let mut machine = RevealMachine::new(false);

    assert_eq!(machine.on_signal(true, now()), RevealTransition::Revealed);
    assert_eq!(machine.on_signal(true, now()), RevealTransition::Unchanged);
    assert_eq!(machine.on_signal(false, now()), RevealTransition::Hidden);
    assert!(!machine.state().has_revealed);
    assert_eq!(machine.on_signal(true, now()), RevealTransition::Revealed);
    assert!(!machine.is_latched());
}

#[tokio::test]
async fn already_visible_region_reveals_on_first_signal() {
    let viewport = Arc::new(ManualViewport::new());
    let region = RegionId::new("mentors");
    viewport.set_initial(&region, true);
    let controller = RevealController::new(viewport.clone());

    let mut handle = controller.observe(region.clone(), RevealOptions::default());

    assert!(handle.revealed().await);
    assert!(handle.state().triggered_at.is_some());
}

#[tokio::test]
async fn one_shot_reveal_never_reverts_and_detaches() {
    let viewport = Arc::new(ManualViewport::new());
    let region = RegionId::new("team");
    let controller = RevealController::new(viewport.clone());
    let mut handle = controller.observe(
        region.clone(),
        RevealOptions {
            threshold: 0.25,
            once: true,
        },
    );
    assert_eq!(viewport.threshold(&region), Some(0.25));

    assert!(viewport.emit(&region, true));
    assert!(handle.revealed().await);
    settle().await;

    assert!(!viewport.emit(&region, false), "observer must be detached");
    assert!(handle.is_revealed());
    assert_eq!(viewport.unobserve_count(&region), 1);

    handle.teardown();
    assert_eq!(viewport.unobserve_count(&region), 1);
}

#[tokio::test]
async fn repeatable_reveal_toggles_with_crossings() {
    let viewport = Arc::new(ManualViewport::new());
    let region = RegionId::new("testimonials");
    let controller = RevealController::new(viewport.clone());
    let handle = controller.observe(
        region.clone(),
        RevealOptions {
            threshold: 0.1,
            once: false,
        },
    );
    let mut rx = handle.subscribe();

    viewport.emit(&region, true);
    rx.changed().await.expect("revealed");
    assert!(rx.borrow_and_update().has_revealed);

    viewport.emit(&region, false);
    rx.changed().await.expect("hidden");
    assert!(!rx.borrow_and_update().has_revealed);

    assert!(viewport.is_observed(&region));
}

#[tokio::test]
async fn teardown_detaches_observer_exactly_once() {
    let viewport = Arc::new(ManualViewport::new());
    let region = RegionId::new("partners");
    let controller = RevealController::new(viewport.clone());

    let handle = controller.observe(region.clone(), RevealOptions::default());
    assert!(viewport.is_observed(&region));

    handle.teardown();
    drop(handle);

    assert!(!viewport.is_observed(&region));
    assert_eq!(viewport.unobserve_count(&region), 1);
}

#[tokio::test]
async fn signals_after_teardown_do_not_update_state() {
    let viewport = Arc::new(ManualViewport::new());
    let region = RegionId::new("about");
    let controller = RevealController::new(viewport.clone());
    let handle = controller.observe(region.clone(), RevealOptions::default());

    handle.teardown();
    viewport.emit(&region, true);
    settle().await;

    assert!(!handle.is_revealed());
}

#[tokio::test(start_paused = true)]
async fn delayed_reveal_flips_once_after_delay() {
    let reveal = DelayedReveal::after_ms(500, Arc::new(TokioTimer::new()));
    assert!(!reveal.is_revealed());

    tokio::time::sleep(Duration::from_millis(499)).await;
    assert!(!reveal.is_revealed());

    tokio::time::sleep(Duration::from_millis(2)).await;
    assert!(reveal.is_revealed());
}

#[tokio::test(start_paused = true)]
async fn delayed_reveal_cancels_pending_timer_on_teardown() {
    let timer = Arc::new(TokioTimer::new());
    let reveal = DelayedReveal::after_ms(500, timer.clone());
    assert_eq!(timer.pending_count(), 1);

    reveal.teardown();
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert!(!reveal.is_revealed());
    assert_eq!(timer.pending_count(), 0);
}

#[tokio::test]
async fn teardown_of_one_observer_keeps_the_other_attached() {
    let viewport = Arc::new(ManualViewport::new());
    let region = RegionId::new("mentors");
    let controller = RevealController::new(viewport.clone());

    let first = controller.observe(region.clone(), RevealOptions::default());
    let mut second = controller.observe(region.clone(), RevealOptions::default());
    assert_eq!(viewport.observer_count(&region), 2);

    first.teardown();
    assert!(viewport.is_observed(&region));

    assert!(viewport.emit(&region, true));
    assert!(second.revealed().await);
    assert!(!first.is_revealed());
    settle().await;
    assert!(!viewport.is_observed(&region));
    assert_eq!(viewport.unobserve_count(&region), 2);
}
