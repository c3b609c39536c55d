// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for the session controller lifecycle

use codescanner::backends::scripted::{AccessAnswer, ScriptedPlatform, StartConfirmation};
use codescanner::backends::{AuthorizationStatus, MetadataObject, SymbolType};
use codescanner::config::{GuideStyle, ReconfigurePolicy};
use codescanner::errors::UnsupportedReason;
use codescanner::overlay::{Rect, Rgba, Size};
use codescanner::session::{ChannelObserver, ScannerNotification, SessionController, SessionState};
use codescanner::{ConfigError, ResultDiscipline, ScanFailure, SessionConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

const WAIT: Duration = Duration::from_secs(5);

fn controller_for(
    platform: &ScriptedPlatform,
) -> (SessionController, UnboundedReceiver<ScannerNotification>) {
    let (observer, notifications) = ChannelObserver::new();
    let controller = SessionController::new(Arc::new(platform.clone())).with_observer(observer);
    (controller, notifications)
}

fn notifications_of(rx: &mut UnboundedReceiver<ScannerNotification>) -> Vec<ScannerNotification> {
    let mut out = Vec::new();
    while let Ok(notification) = rx.try_recv() {
        out.push(notification);
    }
    out
}

/// Process events until the controller leaves `Configuring`
async fn settle(controller: &mut SessionController) {
    tokio::time::timeout(WAIT, async {
        while matches!(
            controller.state(),
            SessionState::Configuring | SessionState::RequestingPermission
        ) {
            if !controller.process_next().await {
                break;
            }
        }
    })
    .await
    .expect("controller did not settle");
}

/// Wait until the scripted session was started on the worker thread
async fn wait_for_start(platform: &ScriptedPlatform) {
    tokio::time::timeout(WAIT, async {
        while !platform.is_running() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("session never started");
}

async fn running(
    platform: &ScriptedPlatform,
    config: SessionConfig,
) -> (SessionController, UnboundedReceiver<ScannerNotification>) {
    let (mut controller, notifications) = controller_for(platform);
    controller.attach(config).unwrap();
    controller.become_visible();
    settle(&mut controller).await;
    assert_eq!(controller.state(), SessionState::Running);
    (controller, notifications)
}

async fn deliver(
    controller: &mut SessionController,
    platform: &ScriptedPlatform,
    objects: Vec<MetadataObject>,
) {
    assert!(platform.emit_metadata(objects));
    tokio::time::timeout(WAIT, controller.process_next())
        .await
        .expect("metadata not delivered");
}

#[tokio::test]
async fn test_runs_only_when_visible_with_access_and_support() {
    let platform = ScriptedPlatform::new();
    let (mut controller, mut notifications) = controller_for(&platform);
    let bindings = controller.bindings();

    controller.attach(SessionConfig::default()).unwrap();
    assert_eq!(controller.state(), SessionState::Idle);
    assert!(!bindings.flags().is_session_started);
    assert_eq!(platform.counters().sessions_created, 0);

    controller.become_visible();
    settle(&mut controller).await;

    assert_eq!(controller.state(), SessionState::Running);
    assert!(controller.is_scanner_supported());
    let flags = bindings.flags();
    assert!(flags.is_session_started);
    assert!(flags.is_camera_supported);
    assert!(flags.has_camera_access);
    assert!(matches!(
        notifications_of(&mut notifications)[..],
        [ScannerNotification::SessionStarted]
    ));
}

#[tokio::test]
async fn test_not_visible_never_builds() {
    let platform = ScriptedPlatform::new();
    let (mut controller, _notifications) = controller_for(&platform);

    controller.attach(SessionConfig::default()).unwrap();
    controller.layout_changed(Rect::new(0.0, 0.0, 390.0, 844.0));
    assert_eq!(controller.process_pending(), 0);

    let counters = platform.counters();
    assert_eq!(counters.sessions_created, 0);
    assert_eq!(counters.prompts, 0);
}

#[tokio::test]
async fn test_double_visible_builds_one_pipeline() {
    let platform = ScriptedPlatform::new();
    let (mut controller, mut notifications) = running(&platform, SessionConfig::default()).await;

    controller.become_visible();
    controller.process_pending();

    let counters = platform.counters();
    assert_eq!(counters.sessions_created, 1);
    assert_eq!(counters.inputs_opened, 1);
    assert_eq!(counters.outputs_added, 1);
    assert_eq!(counters.starts, 1);
    assert_eq!(notifications_of(&mut notifications).len(), 1);
}

#[tokio::test]
async fn test_revisible_reuses_pipeline() {
    let platform = ScriptedPlatform::new();
    let (mut controller, _notifications) = running(&platform, SessionConfig::default()).await;
    let pipeline = controller.pipeline_id();

    controller.become_hidden();
    assert_eq!(controller.state(), SessionState::Stopped);

    controller.become_visible();
    settle(&mut controller).await;

    assert_eq!(controller.state(), SessionState::Running);
    assert_eq!(controller.pipeline_id(), pipeline);
    assert_eq!(platform.counters().sessions_created, 1);
    assert_eq!(platform.counters().starts, 2);
}

#[tokio::test]
async fn test_hide_stops_synchronously() {
    let platform = ScriptedPlatform::new();
    let (mut controller, _notifications) = running(&platform, SessionConfig::default()).await;
    let bindings = controller.bindings();

    controller.become_hidden();

    assert!(!platform.is_running());
    assert_eq!(platform.counters().stops, 1);
    assert_eq!(controller.state(), SessionState::Stopped);
    assert!(!bindings.flags().is_session_started);
    assert!(controller.guide_overlay().is_none());
}

#[tokio::test]
async fn test_denied_prompt_notifies_once() {
    let platform = ScriptedPlatform::new()
        .with_authorization(AuthorizationStatus::NotDetermined)
        .with_access_answer(AccessAnswer::Deny);
    let (mut controller, mut notifications) = controller_for(&platform);

    controller.attach(SessionConfig::default()).unwrap();
    controller.become_visible();
    assert_eq!(controller.state(), SessionState::RequestingPermission);
    settle(&mut controller).await;

    assert_eq!(controller.state(), SessionState::PermissionDenied);
    assert_eq!(controller.last_failure(), Some(&ScanFailure::PermissionDenied));
    assert!(!controller.bindings().flags().has_camera_access);

    let received = notifications_of(&mut notifications);
    assert_eq!(received.len(), 1);
    assert!(matches!(received[0], ScannerNotification::NoCameraAccess(_)));

    let counters = platform.counters();
    assert_eq!(counters.prompts, 1);
    assert_eq!(counters.inputs_opened, 0);
    assert_eq!(counters.sessions_created, 0);
    assert_eq!(counters.outputs_added, 0);
}

#[tokio::test]
async fn test_already_denied_does_not_prompt() {
    let platform = ScriptedPlatform::new().with_authorization(AuthorizationStatus::Restricted);
    let (mut controller, mut notifications) = controller_for(&platform);

    controller.attach(SessionConfig::default()).unwrap();
    controller.become_visible();

    assert_eq!(controller.state(), SessionState::PermissionDenied);
    assert_eq!(platform.counters().prompts, 0);
    assert!(matches!(
        notifications_of(&mut notifications)[..],
        [ScannerNotification::NoCameraAccess(_)]
    ));
}

#[tokio::test]
async fn test_denied_rechecks_access_on_each_show() {
    let platform = ScriptedPlatform::new().with_authorization(AuthorizationStatus::Denied);
    let (mut controller, mut notifications) = controller_for(&platform);

    controller.attach(SessionConfig::default()).unwrap();
    controller.become_visible();
    controller.become_hidden();
    assert_eq!(controller.state(), SessionState::PermissionDenied);

    // Still denied: shown again, the host is told once more
    controller.become_visible();
    assert_eq!(controller.state(), SessionState::PermissionDenied);
    assert_eq!(notifications_of(&mut notifications).len(), 2);
    controller.become_hidden();

    platform.set_authorization(AuthorizationStatus::Authorized);
    controller.become_visible();
    settle(&mut controller).await;

    assert_eq!(controller.state(), SessionState::Running);
    assert!(controller.bindings().flags().has_camera_access);
    assert_eq!(platform.counters().prompts, 0);
    assert!(matches!(
        notifications_of(&mut notifications)[..],
        [ScannerNotification::SessionStarted]
    ));
}

#[tokio::test]
async fn test_granted_prompt_starts() {
    let platform = ScriptedPlatform::new()
        .with_authorization(AuthorizationStatus::NotDetermined)
        .with_access_answer(AccessAnswer::Hold);
    let (mut controller, _notifications) = controller_for(&platform);

    controller.attach(SessionConfig::default()).unwrap();
    controller.become_visible();
    assert!(controller.has_pending_access_request());
    assert_eq!(controller.process_pending(), 0);

    assert_eq!(platform.resolve_access(true), 1);
    settle(&mut controller).await;

    assert_eq!(controller.state(), SessionState::Running);
    assert!(!controller.has_pending_access_request());
    assert_eq!(platform.counters().prompts, 1);
}

#[tokio::test]
async fn test_abandoned_prompt_counts_as_denied() {
    let platform = ScriptedPlatform::new()
        .with_authorization(AuthorizationStatus::NotDetermined)
        .with_access_answer(AccessAnswer::Hold);
    let (mut controller, _notifications) = controller_for(&platform);

    controller.attach(SessionConfig::default()).unwrap();
    controller.become_visible();
    assert_eq!(platform.drop_access_requests(), 1);
    assert_eq!(controller.process_pending(), 1);

    assert_eq!(controller.state(), SessionState::PermissionDenied);
}

#[tokio::test]
async fn test_hide_during_prompt_ignores_answer() {
    let platform = ScriptedPlatform::new()
        .with_authorization(AuthorizationStatus::NotDetermined)
        .with_access_answer(AccessAnswer::Hold);
    let (mut controller, mut notifications) = controller_for(&platform);

    controller.attach(SessionConfig::default()).unwrap();
    controller.become_visible();
    controller.become_hidden();
    assert_eq!(controller.state(), SessionState::Stopped);

    platform.resolve_access(true);
    assert_eq!(controller.process_pending(), 1);

    assert_eq!(controller.state(), SessionState::Stopped);
    assert_eq!(platform.counters().sessions_created, 0);
    assert!(notifications_of(&mut notifications).is_empty());

    // Shown again, the now granted status is picked up without a new prompt
    controller.become_visible();
    settle(&mut controller).await;
    assert_eq!(controller.state(), SessionState::Running);
    assert_eq!(platform.counters().prompts, 1);
}

#[tokio::test]
async fn test_repeated_visible_keeps_single_prompt() {
    let platform = ScriptedPlatform::new()
        .with_authorization(AuthorizationStatus::NotDetermined)
        .with_access_answer(AccessAnswer::Hold);
    let (mut controller, _notifications) = controller_for(&platform);

    controller.attach(SessionConfig::default()).unwrap();
    controller.become_visible();
    controller.become_hidden();
    controller.become_visible();

    assert_eq!(platform.counters().prompts, 1);
    assert_eq!(platform.pending_prompts(), 1);
}

#[tokio::test]
async fn test_no_rear_camera_is_unsupported_without_prompt() {
    let platform = ScriptedPlatform::new()
        .with_rear_camera(false)
        .with_authorization(AuthorizationStatus::NotDetermined);
    let (mut controller, mut notifications) = controller_for(&platform);

    let config = SessionConfig::default().with_failure_text("No camera", "Use another device");
    controller.attach(config).unwrap();
    controller.become_visible();

    assert_eq!(controller.state(), SessionState::Unsupported);
    assert_eq!(
        controller.last_failure(),
        Some(&ScanFailure::Unsupported(UnsupportedReason::NoRearCamera))
    );
    assert_eq!(platform.counters().prompts, 0);
    assert!(!controller.bindings().flags().is_camera_supported);

    let received = notifications_of(&mut notifications);
    match &received[..] {
        [ScannerNotification::CameraNotSupported(message)] => {
            assert_eq!(message.title, "No camera");
            assert_eq!(message.description, "Use another device");
        }
        other => panic!("unexpected notifications: {:?}", other),
    }
}

#[tokio::test]
async fn test_unsupported_is_sticky_until_reattach() {
    let platform = ScriptedPlatform::new().without_video_device();
    let (mut controller, mut notifications) = controller_for(&platform);

    controller.attach(SessionConfig::default()).unwrap();
    controller.become_visible();
    assert_eq!(controller.state(), SessionState::Unsupported);
    assert!(controller.pipeline_id().is_none());

    controller.become_hidden();
    assert_eq!(controller.state(), SessionState::Unsupported);
    controller.become_visible();
    assert_eq!(controller.state(), SessionState::Unsupported);
    assert_eq!(notifications_of(&mut notifications).len(), 1);
}

#[tokio::test]
async fn test_reattach_clears_unsupported() {
    let platform = ScriptedPlatform::new().with_rear_camera(false);
    let (mut controller, _notifications) = controller_for(&platform);

    controller.attach(SessionConfig::default()).unwrap();
    controller.become_visible();
    assert_eq!(controller.state(), SessionState::Unsupported);

    let platform = platform.with_rear_camera(true);
    controller.attach(SessionConfig::default()).unwrap();
    settle(&mut controller).await;

    assert_eq!(controller.state(), SessionState::Running);
    assert!(controller.last_failure().is_none());
    assert_eq!(platform.counters().sessions_created, 1);
}

#[tokio::test]
async fn test_rejected_output_is_unsupported() {
    let platform = ScriptedPlatform::new().rejecting_output();
    let (mut controller, _notifications) = controller_for(&platform);

    controller.attach(SessionConfig::default()).unwrap();
    controller.become_visible();

    assert_eq!(
        controller.last_failure(),
        Some(&ScanFailure::Unsupported(UnsupportedReason::OutputRejected))
    );
    assert!(!controller.is_scanner_supported());
}

#[tokio::test]
async fn test_start_failure_is_unsupported() {
    let platform = ScriptedPlatform::new().failing_start("device busy");
    let (mut controller, mut notifications) = controller_for(&platform);

    controller.attach(SessionConfig::default()).unwrap();
    controller.become_visible();
    settle(&mut controller).await;

    assert_eq!(controller.state(), SessionState::Unsupported);
    assert!(matches!(
        controller.last_failure(),
        Some(ScanFailure::Unsupported(UnsupportedReason::StartFailed(_)))
    ));
    assert!(controller.pipeline_id().is_none());
    assert!(matches!(
        notifications_of(&mut notifications)[..],
        [ScannerNotification::CameraNotSupported(_)]
    ));
}

#[tokio::test]
async fn test_deferred_start_stays_configuring() {
    let platform = ScriptedPlatform::new().with_start_confirmation(StartConfirmation::Deferred);
    let (mut controller, _notifications) = controller_for(&platform);

    controller.attach(SessionConfig::default()).unwrap();
    controller.become_visible();
    wait_for_start(&platform).await;

    assert_eq!(controller.process_pending(), 0);
    assert_eq!(controller.state(), SessionState::Configuring);

    assert!(platform.confirm_start());
    settle(&mut controller).await;
    assert_eq!(controller.state(), SessionState::Running);
}

#[tokio::test]
async fn test_start_confirmed_after_hide_is_dropped() {
    let platform = ScriptedPlatform::new().with_start_confirmation(StartConfirmation::Deferred);
    let (mut controller, mut notifications) = controller_for(&platform);

    controller.attach(SessionConfig::default()).unwrap();
    controller.become_visible();
    wait_for_start(&platform).await;
    let stale = platform.clone();

    controller.become_hidden();
    // A confirmation racing the stop
    let _ = stale.confirm_start();
    controller.process_pending();

    assert_eq!(controller.state(), SessionState::Stopped);
    assert!(notifications_of(&mut notifications).is_empty());
}

#[tokio::test]
async fn test_continuous_publishes_and_clears() {
    let platform = ScriptedPlatform::new();
    let (mut controller, mut notifications) = running(&platform, SessionConfig::default()).await;
    let bindings = controller.bindings();
    notifications_of(&mut notifications);

    deliver(&mut controller, &platform, vec![MetadataObject::code(SymbolType::Qr, "ABC123")]).await;
    assert_eq!(bindings.scan_result().as_deref(), Some("ABC123"));
    assert!(!bindings.is_scanned());

    deliver(&mut controller, &platform, vec![]).await;
    assert_eq!(bindings.scan_result(), None);

    let received = notifications_of(&mut notifications);
    assert_eq!(received.len(), 1);
    match &received[0] {
        ScannerNotification::CodeScanned(event) => {
            assert_eq!(event.payload, "ABC123");
            assert_eq!(event.symbol_type, SymbolType::Qr);
        }
        other => panic!("unexpected notification: {:?}", other),
    }
}

#[tokio::test]
async fn test_one_shot_keeps_first_result() {
    let platform = ScriptedPlatform::new();
    let config = SessionConfig::default().with_discipline(ResultDiscipline::OneShot);
    let (mut controller, _notifications) = running(&platform, config.clone()).await;
    let bindings = controller.bindings();

    let code = MetadataObject::code(SymbolType::Ean13, "ABC123");
    deliver(&mut controller, &platform, vec![code]).await;
    assert_eq!(bindings.scan_result().as_deref(), Some("ABC123"));
    assert!(bindings.is_scanned());

    deliver(&mut controller, &platform, vec![]).await;
    deliver(&mut controller, &platform, vec![MetadataObject::code(SymbolType::Qr, "XYZ")]).await;
    assert_eq!(bindings.scan_result().as_deref(), Some("ABC123"));

    // Attaching the same configuration re-arms the sink
    controller.attach(config).unwrap();
    assert!(!bindings.is_scanned());
    deliver(&mut controller, &platform, vec![MetadataObject::code(SymbolType::Qr, "XYZ")]).await;
    assert_eq!(bindings.scan_result().as_deref(), Some("XYZ"));
    assert!(bindings.is_scanned());
}

#[tokio::test]
async fn test_unaccepted_types_never_published() {
    let platform = ScriptedPlatform::new();
    let config = SessionConfig::default().with_symbol_types([SymbolType::Qr]);
    let (mut controller, mut notifications) = running(&platform, config).await;
    let bindings = controller.bindings();
    notifications_of(&mut notifications);

    let barcode = MetadataObject::code(SymbolType::Ean13, "4006381333931");
    deliver(&mut controller, &platform, vec![barcode]).await;
    deliver(&mut controller, &platform, vec![MetadataObject::Other("face".into())]).await;

    assert_eq!(bindings.scan_result(), None);
    assert!(notifications_of(&mut notifications).is_empty());
}

#[tokio::test]
async fn test_output_requests_supported_subset() {
    let platform =
        ScriptedPlatform::new().with_available_symbol_types([SymbolType::Qr, SymbolType::Code128]);
    let config = SessionConfig::default().with_symbol_types([SymbolType::Qr, SymbolType::Ean13]);
    let (_controller, _notifications) = running(&platform, config).await;

    assert_eq!(
        platform.requested_symbol_types(),
        Some([SymbolType::Qr].into_iter().collect())
    );
}

#[tokio::test]
async fn test_metadata_after_hide_is_dropped() {
    let platform = ScriptedPlatform::new();
    let (mut controller, _notifications) = running(&platform, SessionConfig::default()).await;
    let bindings = controller.bindings();

    controller.become_hidden();
    assert!(platform.emit_metadata_from(0, vec![MetadataObject::code(SymbolType::Qr, "LATE")]));
    assert_eq!(controller.process_pending(), 1);

    assert_eq!(bindings.scan_result(), None);
}

#[tokio::test]
async fn test_metadata_queued_before_hide_is_dropped_after_reshow() {
    let platform = ScriptedPlatform::new().with_start_confirmation(StartConfirmation::Deferred);
    let (mut controller, _notifications) = controller_for(&platform);
    let bindings = controller.bindings();

    controller.attach(SessionConfig::default()).unwrap();
    controller.become_visible();
    wait_for_start(&platform).await;
    assert!(platform.confirm_start());
    settle(&mut controller).await;
    assert_eq!(controller.state(), SessionState::Running);

    // Delivered while running, applied only after the next show
    assert!(platform.emit_metadata(vec![MetadataObject::code(SymbolType::Qr, "STALE")]));
    controller.become_hidden();
    controller.become_visible();
    controller.process_pending();

    assert_eq!(controller.state(), SessionState::Configuring);
    assert_eq!(bindings.scan_result(), None);

    wait_for_start(&platform).await;
    assert!(platform.confirm_start());
    settle(&mut controller).await;
    deliver(&mut controller, &platform, vec![MetadataObject::code(SymbolType::Qr, "FRESH")]).await;
    assert_eq!(bindings.scan_result().as_deref(), Some("FRESH"));
}

#[tokio::test]
async fn test_interrupted_session_is_unsupported() {
    let platform = ScriptedPlatform::new();
    let (mut controller, mut notifications) = running(&platform, SessionConfig::default()).await;
    let bindings = controller.bindings();
    notifications_of(&mut notifications);

    assert!(platform.interrupt("device unplugged"));
    tokio::time::timeout(WAIT, controller.process_next())
        .await
        .expect("interruption not delivered");

    assert_eq!(controller.state(), SessionState::Unsupported);
    assert!(matches!(
        controller.last_failure(),
        Some(ScanFailure::Unsupported(UnsupportedReason::Interrupted(_)))
    ));
    assert!(!bindings.flags().is_session_started);
    assert!(controller.pipeline_id().is_none());
    assert!(matches!(
        notifications_of(&mut notifications)[..],
        [ScannerNotification::CameraNotSupported(_)]
    ));
}

#[tokio::test]
async fn test_attach_rejects_unrepresentable_duration() {
    let platform = ScriptedPlatform::new();
    let (mut controller, _notifications) = controller_for(&platform);

    let mut config = SessionConfig::default();
    config.guide.animation_duration = f64::INFINITY;

    assert!(matches!(controller.attach(config), Err(ConfigError::InvalidValue(_))));
    assert!(controller.config().is_none());
}

#[tokio::test]
async fn test_guide_style_rejects_unrepresentable_duration() {
    let platform = ScriptedPlatform::new();
    let bounds = Rect::new(0.0, 0.0, 390.0, 844.0);
    let config = SessionConfig::default().with_guide_size(Size::new(200.0, 200.0));
    let (mut controller, _notifications) = running(&platform, config).await;
    controller.layout_changed(bounds);

    let mut style = controller.config().unwrap().guide.style();
    style.animation_duration = f64::INFINITY;
    assert!(matches!(
        controller.set_guide_style(style),
        Err(ConfigError::InvalidValue(_))
    ));

    controller.layout_changed(bounds);
    let overlay = controller.guide_overlay().unwrap();
    assert_eq!(overlay.scan_bar.animation.duration, Duration::from_millis(500));
}

#[tokio::test]
async fn test_frozen_field_change_rejected() {
    let platform = ScriptedPlatform::new();
    let (mut controller, _notifications) = running(&platform, SessionConfig::default()).await;

    let mut changed = SessionConfig::default().with_symbol_types([SymbolType::Qr]);
    changed.guide.line_color = Rgba::from_rgb8(255, 0, 0);

    assert_eq!(
        controller.attach(changed),
        Err(ConfigError::FrozenAfterBuild("symbol_types"))
    );
    let config = controller.config().unwrap();
    assert_eq!(config.symbol_types, SessionConfig::default().symbol_types);
    assert_eq!(config.guide.line_color, Rgba::from_rgb8(255, 0, 0));
    assert_eq!(controller.state(), SessionState::Running);
}

#[tokio::test]
async fn test_rebuild_policy_replaces_pipeline() {
    let platform = ScriptedPlatform::new();
    let config = SessionConfig::default().with_reconfigure(ReconfigurePolicy::RebuildPipeline);
    let (mut controller, _notifications) = running(&platform, config.clone()).await;
    let bindings = controller.bindings();
    let first = controller.pipeline_id();

    controller
        .attach(config.with_symbol_types([SymbolType::Code128]))
        .unwrap();
    settle(&mut controller).await;

    assert_eq!(controller.state(), SessionState::Running);
    assert_ne!(controller.pipeline_id(), first);
    assert_eq!(platform.counters().sessions_created, 2);

    // Frames from the old pipeline no longer count
    assert!(platform.emit_metadata_from(0, vec![MetadataObject::code(SymbolType::Code128, "OLD")]));
    controller.process_pending();
    assert_eq!(bindings.scan_result(), None);

    let code = MetadataObject::code(SymbolType::Code128, "NEW");
    deliver(&mut controller, &platform, vec![code]).await;
    assert_eq!(bindings.scan_result().as_deref(), Some("NEW"));
}

#[tokio::test]
async fn test_guide_style_applies_on_next_layout() {
    let platform = ScriptedPlatform::new();
    let bounds = Rect::new(0.0, 0.0, 400.0, 800.0);
    let config = SessionConfig::default().with_guide_size(Size::new(200.0, 200.0));
    let (mut controller, _notifications) = controller_for(&platform);

    controller.attach(config).unwrap();
    controller.layout_changed(bounds);
    assert!(controller.guide_overlay().is_none());

    controller.become_visible();
    settle(&mut controller).await;
    let overlay = controller.guide_overlay().unwrap();
    let generation = overlay.generation;
    assert_eq!(overlay.border.color, Rgba::WHITE);
    assert_eq!(overlay.mask, Rect::new(100.0, 300.0, 200.0, 200.0));

    let green = Rgba::from_rgb8(0, 255, 0);
    controller
        .set_guide_style(GuideStyle {
            line_color: green,
            line_width: 2.0,
            animation_duration: 1.0,
            show_overlay: true,
        })
        .unwrap();
    assert_eq!(controller.guide_overlay().unwrap().border.color, Rgba::WHITE);

    controller.layout_changed(bounds);
    let overlay = controller.guide_overlay().unwrap();
    assert_eq!(overlay.border.color, green);
    assert_eq!(overlay.generation, generation + 1);
}

#[tokio::test]
async fn test_guide_style_requires_attach() {
    let platform = ScriptedPlatform::new();
    let (mut controller, _notifications) = controller_for(&platform);
    let style = SessionConfig::default().guide.style();

    assert_eq!(controller.set_guide_style(style), Err(ConfigError::NotAttached));
}

#[tokio::test]
async fn test_dismantle_releases_pipeline() {
    let platform = ScriptedPlatform::new();
    let (mut controller, _notifications) = running(&platform, SessionConfig::default()).await;

    controller.dismantle();

    assert!(!controller.is_visible());
    assert!(controller.pipeline_id().is_none());
    assert!(controller.preview().is_none());
    assert!(!platform.is_running());
}
