//! End-to-end session lifecycle against the in-memory backend.

use serde_json::json;

use crown::remote::fake::FakeSessionClient;
use crown::{
    Error, MetricScores, NOT_SELECTED, PollOutcome, SessionController, SessionView,
    SubscriptionConfig,
};
use crown_protocol::{DeviceInfo, MetricChannel, MetricUpdate};

const DEVICE_ID: &str = "XXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXX";

fn crown_device() -> DeviceInfo {
    DeviceInfo { device_id: DEVICE_ID.to_string(), device_nickname: "Crown1".to_string() }
}

fn online_snapshot(battery: f32) -> serde_json::Value {
    json!({ "battery": battery, "state": "Online", "sleepMode": false, "sleepModeReason": null })
}

fn ready_client() -> FakeSessionClient {
    let client = FakeSessionClient::new();
    client.set_devices(vec![crown_device()]);
    client.set_snapshot(DEVICE_ID, online_snapshot(80.0));
    client
}

#[tokio::test]
async fn login_select_subscribe_poll_happy_path() -> anyhow::Result<()> {
    let client = ready_client();
    let controller = SessionController::new(client.clone());

    controller.login("a@b.com", "pw").await?;
    let selected = controller.select_device("Crown1").await?;
    assert_eq!(selected, DEVICE_ID);

    let view = controller.view();
    assert!(view.is_logged_in);
    assert!(view.is_subscribed);
    assert_eq!(view.selected_device_id, DEVICE_ID);
    assert_eq!(
        client.live_channels(),
        vec![MetricChannel::Accelerometer, MetricChannel::Calm, MetricChannel::Focus]
    );

    let outcome = controller.poll().await;
    let PollOutcome::Updated(status) = outcome else {
        panic!("expected an updated poll, got {outcome:?}");
    };
    assert_eq!(status.label, "Online");
    assert_eq!(status.battery_percent, 80.0);

    let view = controller.view();
    assert_eq!(view.status_label, "Online");
    assert_eq!(view.battery_percent, 80.0);
    Ok(())
}

#[tokio::test]
async fn pushed_metrics_reach_the_view() -> anyhow::Result<()> {
    let client = ready_client();
    let controller = SessionController::new(client.clone());
    controller.login("a@b.com", "pw").await?;
    controller.select_device("Crown1").await?;

    client.push(&MetricChannel::Calm, MetricUpdate::Calm(0.9));
    client.push(&MetricChannel::Focus, MetricUpdate::Focus(0.4));

    let metrics = controller.view().metrics;
    assert_eq!(metrics.calm, 0.9);
    assert_eq!(metrics.focus, 0.4);
    Ok(())
}

#[tokio::test]
async fn sleep_reason_zeroes_metrics_on_poll() -> anyhow::Result<()> {
    let client = ready_client();
    let controller = SessionController::new(client.clone());
    controller.login("a@b.com", "pw").await?;
    controller.select_device("Crown1").await?;

    client.push(&MetricChannel::Calm, MetricUpdate::Calm(0.9));
    assert_eq!(controller.view().metrics.calm, 0.9);

    client.set_snapshot(
        DEVICE_ID,
        json!({ "battery": 45.0, "state": "Online", "sleepMode": true, "sleepModeReason": "Charging" }),
    );
    let PollOutcome::Updated(status) = controller.poll().await else {
        panic!("expected an updated poll");
    };
    assert_eq!(status.label, "Charging");
    assert!(status.suppress_metrics);

    let view = controller.view();
    assert_eq!(view.status_label, "Charging");
    assert_eq!(view.battery_percent, 45.0);
    assert_eq!(view.metrics, MetricScores::default());
    Ok(())
}

#[tokio::test]
async fn logout_resets_everything_even_when_remote_fails() -> anyhow::Result<()> {
    let client = ready_client();
    let controller = SessionController::new(client.clone());
    controller.login("a@b.com", "pw").await?;
    controller.select_device("Crown1").await?;
    controller.poll().await;
    client.push(&MetricChannel::Calm, MetricUpdate::Calm(0.7));

    client.set_fail_logout(true);
    controller.logout().await?;

    assert_eq!(controller.view(), SessionView::default());
    assert_eq!(controller.view().selected_device_id, NOT_SELECTED);
    // Every live channel was explicitly unsubscribed before the remote call.
    assert_eq!(client.unsubscribed_channels().len(), 3);
    assert!(client.live_channels().is_empty());
    Ok(())
}

#[tokio::test]
async fn logout_when_logged_out_is_a_noop() -> anyhow::Result<()> {
    let client = FakeSessionClient::new();
    let controller = SessionController::new(client.clone());

    controller.logout().await?;
    assert_eq!(client.logout_calls(), 0);
    Ok(())
}

#[tokio::test]
async fn subscribe_is_idempotent() -> anyhow::Result<()> {
    let client = ready_client();
    let controller = SessionController::new(client.clone());
    controller.login("a@b.com", "pw").await?;
    controller.select_device("Crown1").await?;

    controller.subscribe().await?;
    controller.subscribe().await?;

    assert_eq!(client.live_channels().len(), 3);
    assert!(client.unsubscribed_channels().is_empty());
    Ok(())
}

#[tokio::test]
async fn subscription_config_limits_started_channels() -> anyhow::Result<()> {
    let client = ready_client();
    let config = SubscriptionConfig { calm: true, focus: false, accelerometer: false };
    let controller = SessionController::with_config(client.clone(), config);
    controller.login("a@b.com", "pw").await?;
    controller.select_device("Crown1").await?;

    assert_eq!(client.live_channels(), vec![MetricChannel::Calm]);
    Ok(())
}

#[tokio::test]
async fn subscription_failure_surfaces_to_the_caller() -> anyhow::Result<()> {
    let client = ready_client();
    client.set_fail_subscribe(true);
    let controller = SessionController::new(client.clone());
    controller.login("a@b.com", "pw").await?;

    let error = controller.select_device("Crown1").await.unwrap_err();
    assert!(matches!(error, Error::Remote(_)));

    // The selection itself stuck; a later subscribe can retry.
    assert_eq!(controller.view().selected_device_id, DEVICE_ID);
    client.set_fail_subscribe(false);
    controller.subscribe().await?;
    assert_eq!(client.live_channels().len(), 3);
    Ok(())
}

#[tokio::test]
async fn unsubscribe_all_stops_channels_and_zeroes_metrics() -> anyhow::Result<()> {
    let client = ready_client();
    let controller = SessionController::new(client.clone());
    controller.login("a@b.com", "pw").await?;
    controller.select_device("Crown1").await?;
    client.push(&MetricChannel::Focus, MetricUpdate::Focus(0.6));

    controller.unsubscribe_all().await?;

    let view = controller.view();
    assert!(view.is_logged_in);
    assert!(!view.is_subscribed);
    assert_eq!(view.metrics, MetricScores::default());
    assert!(client.live_channels().is_empty());
    Ok(())
}

#[tokio::test]
async fn kinesis_labels_are_subscribed_and_scored_per_label() -> anyhow::Result<()> {
    let client = ready_client();
    let controller = SessionController::new(client.clone());
    controller.login("a@b.com", "pw").await?;
    controller.select_device("Crown1").await?;

    controller.subscribe_kinesis("leftArm").await?;
    controller.subscribe_kinesis("leftArm").await?;
    assert_eq!(client.live_channels().len(), 4);

    client.push(
        &MetricChannel::Kinesis("leftArm".into()),
        MetricUpdate::Kinesis { label: "leftArm".into(), probability: 0.42 },
    );
    assert_eq!(controller.kinesis_score("leftArm"), Some(0.42));
    assert_eq!(controller.kinesis_score("rightArm"), None);
    Ok(())
}

#[tokio::test]
async fn unknown_nickname_leaves_selection_untouched() -> anyhow::Result<()> {
    let client = ready_client();
    let controller = SessionController::new(client.clone());
    controller.login("a@b.com", "pw").await?;
    controller.select_device("Crown1").await?;

    let error = controller.select_device("NotMine").await.unwrap_err();
    assert!(matches!(error, Error::DeviceNotFound(name) if name == "NotMine"));
    assert_eq!(controller.view().selected_device_id, DEVICE_ID);
    Ok(())
}

#[tokio::test]
async fn first_nickname_match_wins_across_the_whole_list() -> anyhow::Result<()> {
    let client = FakeSessionClient::new();
    client.set_devices(vec![
        DeviceInfo {
            device_id: "A".repeat(32),
            device_nickname: "Bedroom".to_string(),
        },
        DeviceInfo {
            device_id: "B".repeat(32),
            device_nickname: "Crown1".to_string(),
        },
        DeviceInfo {
            device_id: "C".repeat(32),
            device_nickname: "Crown1".to_string(),
        },
    ]);
    let controller = SessionController::new(client.clone());
    controller.login("a@b.com", "pw").await?;

    // Not the first device in the list; first matching nickname still wins.
    let selected = controller.select_device("Crown1").await?;
    assert_eq!(selected, "B".repeat(32));
    Ok(())
}

#[tokio::test]
async fn rejected_login_leaves_the_session_logged_out() -> anyhow::Result<()> {
    let client = ready_client();
    client.set_reject_login(true);
    let controller = SessionController::new(client.clone());

    let error = controller.login("a@b.com", "bad").await.unwrap_err();
    assert!(matches!(error, Error::Auth(_)));
    assert!(!controller.view().is_logged_in);

    // The failed attempt retains nothing; a corrected login succeeds.
    client.set_reject_login(false);
    controller.login("a@b.com", "pw").await?;
    assert!(controller.view().is_logged_in);
    assert_eq!(client.login_calls(), 2);
    Ok(())
}

#[tokio::test]
async fn listing_devices_requires_a_session() {
    let controller = SessionController::new(FakeSessionClient::new());
    let error = controller.list_devices().await.unwrap_err();
    assert!(matches!(error, Error::NotLoggedIn));
}
