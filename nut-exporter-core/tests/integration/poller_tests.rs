//! Poll cycles against a fake upsd

use std::sync::Arc;
use std::time::Duration;

use nut_exporter_core::{
    CycleOutcome, MIN_REFRESH, MetricCatalog, MetricSynchronizer, NutError, NutSession,
    PollScheduler, SeriesRegistry, SeriesTransition, VariableMap,
};

use super::fake_upsd::{FakeUpsd, Reply, unused_port};

const INTERVAL: Duration = Duration::from_secs(3600);

fn scheduler(session: NutSession) -> (PollScheduler, Arc<SeriesRegistry>) {
    let registry = Arc::new(SeriesRegistry::new());
    let synchronizer = MetricSynchronizer::new(MetricCatalog::standard(), Arc::clone(&registry));
    (PollScheduler::new(session, synchronizer, INTERVAL), registry)
}

fn expect_report(outcome: CycleOutcome) -> nut_exporter_core::SyncReport {
    match outcome {
        CycleOutcome::Synchronized(report) => report,
        other => panic!("cycle did not synchronize: {other:?}"),
    }
}

#[tokio::test]
async fn test_cycle_exports_variables() {
    let server = FakeUpsd::start(&[
        ("battery.charge", "87.5"),
        ("battery.packs", "1"),
        ("device.mfr", "ACME"),
        ("ups.status", "OL CHRG"),
        ("ups.serial", "AS1234"),
    ])
    .await;
    let (mut scheduler, registry) = scheduler(server.session());

    let report = expect_report(scheduler.run_cycle().await);
    assert!(report.is_clean());
    assert_eq!(report.count(SeriesTransition::Registered), 4);

    assert_eq!(registry.value("battery_charge"), Some(87.5));
    assert_eq!(registry.value("ups_status"), Some(3.0));
    let text = registry.encode().unwrap();
    assert!(text.contains(r#"nut_device_mfr{manufacturer="ACME"} 1"#));
    assert!(text.contains("nut_battery_pack 1"));

    let commands = server.commands();
    assert_eq!(commands[3], "LIST VAR ups");
    assert_eq!(commands.last().map(String::as_str), Some("LOGOUT"));
}

#[tokio::test]
async fn test_vanished_variable_is_removed_once() {
    let server = FakeUpsd::start(&[("battery.packs", "2"), ("ups.load", "20")]).await;
    let (mut scheduler, registry) = scheduler(server.session());
    expect_report(scheduler.run_cycle().await);
    assert!(registry.contains("battery_pack"));

    server.set_variables(&[("ups.load", "20")]);
    let report = expect_report(scheduler.run_cycle().await);
    assert_eq!(report.transition("battery_pack"), Some(SeriesTransition::Removed));
    assert!(!registry.encode().unwrap().contains("nut_battery_pack"));

    let report = expect_report(scheduler.run_cycle().await);
    assert_eq!(report.transition("battery_pack"), Some(SeriesTransition::Absent));
    assert_eq!(report.structural_changes(), 0);
}

#[tokio::test]
async fn test_label_change_replaces_series() {
    let server = FakeUpsd::start(&[("device.mfr", "ACME")]).await;
    let (mut scheduler, registry) = scheduler(server.session());
    expect_report(scheduler.run_cycle().await);

    server.set_variables(&[("device.mfr", "Foo")]);
    expect_report(scheduler.run_cycle().await);

    let text = registry.encode().unwrap();
    assert!(text.contains(r#"nut_device_mfr{manufacturer="Foo"} 1"#));
    assert!(!text.contains("ACME"));
}

#[tokio::test]
async fn test_unreachable_server_leaves_registry_untouched() {
    let port = unused_port().await;
    let session = NutSession::new(
        "127.0.0.1",
        port,
        nut_exporter_core::Credentials::new("monuser", "secret"),
        "ups",
    );
    let (mut scheduler, registry) = scheduler(session);
    scheduler
        .synchronizer()
        .apply(&VariableMap::from_blob("ups.load: 33"));

    let outcome = scheduler.run_cycle().await;
    assert!(matches!(outcome, CycleOutcome::ConnectFailed(ref e) if e.is_connection()));
    assert_eq!(registry.value("ups_load"), Some(33.0));
    assert_eq!(registry.series_ids(), ["ups_load"]);
}

#[tokio::test]
async fn test_failed_login_leaves_registry_untouched() {
    let server = FakeUpsd::start(&[("ups.load", "10")]).await;
    let (mut scheduler, registry) = scheduler(server.session());
    expect_report(scheduler.run_cycle().await);

    server.override_reply("USERNAME", Reply::lines(&["ERR ACCESS-DENIED"]));
    server.set_variables(&[]);
    let outcome = scheduler.run_cycle().await;
    assert!(matches!(outcome, CycleOutcome::ConnectFailed(ref e) if e.is_authentication()));
    assert_eq!(registry.value("ups_load"), Some(10.0));
}

#[tokio::test]
async fn test_failed_fetch_leaves_registry_untouched() {
    let server = FakeUpsd::start(&[("ups.load", "10"), ("battery.charge", "99")]).await;
    let (mut scheduler, registry) = scheduler(server.session());
    expect_report(scheduler.run_cycle().await);

    server.override_reply("LIST VAR", Reply::lines(&["ERR DRIVER-NOT-CONNECTED"]));
    let outcome = scheduler.run_cycle().await;
    assert!(matches!(
        outcome,
        CycleOutcome::FetchFailed(NutError::Server { .. })
    ));
    assert_eq!(registry.len(), 2);
    assert_eq!(registry.value("battery_charge"), Some(99.0));
    // Session is still logged out after a failed fetch
    assert_eq!(server.commands().last().map(String::as_str), Some("LOGOUT"));
}

#[tokio::test]
async fn test_truncated_list_leaves_registry_untouched() {
    let server = FakeUpsd::start(&[("ups.load", "10")]).await;
    let (mut scheduler, registry) = scheduler(server.session());
    expect_report(scheduler.run_cycle().await);

    server.override_reply("LIST VAR", Reply::Hangup);
    let outcome = scheduler.run_cycle().await;
    assert!(matches!(outcome, CycleOutcome::FetchFailed(ref e) if e.is_connection()));
    assert_eq!(registry.value("ups_load"), Some(10.0));
}

#[tokio::test]
async fn test_malformed_line_only_skips_its_field() {
    let server = FakeUpsd::start(&[]).await;
    server.override_reply(
        "LIST VAR",
        Reply::lines(&[
            "BEGIN LIST VAR ups",
            r#"VAR ups battery.charge "80""#,
            "VAR ups ups.load",
            r#"VAR ups ups.temperature "31.5""#,
            "END LIST VAR ups",
        ]),
    );
    let (mut scheduler, registry) = scheduler(server.session());

    let report = expect_report(scheduler.run_cycle().await);
    assert_eq!(report.errors().len(), 1);
    assert!(matches!(report.errors()[0], NutError::ProtocolParse { .. }));
    assert_eq!(registry.value("battery_charge"), Some(80.0));
    assert_eq!(registry.value("ups_temp"), Some(31.5));
    assert!(!registry.contains("ups_load"));
}

#[tokio::test]
async fn test_malformed_line_keeps_previous_value() {
    let server = FakeUpsd::start(&[("ups.load", "10"), ("battery.charge", "95")]).await;
    let (mut scheduler, registry) = scheduler(server.session());
    expect_report(scheduler.run_cycle().await);
    assert_eq!(registry.value("ups_load"), Some(10.0));

    server.override_reply(
        "LIST VAR",
        Reply::lines(&[
            "BEGIN LIST VAR ups",
            "VAR ups ups.load",
            r#"VAR ups battery.charge "94""#,
            "END LIST VAR ups",
        ]),
    );
    let report = expect_report(scheduler.run_cycle().await);

    assert_eq!(report.errors().len(), 1);
    assert!(report.transition("ups_load").is_none());
    assert_eq!(registry.value("ups_load"), Some(10.0));
    assert_eq!(registry.value("battery_charge"), Some(94.0));
}

#[test]
fn test_zero_interval_is_raised_to_minimum() {
    let registry = Arc::new(SeriesRegistry::new());
    let synchronizer = MetricSynchronizer::new(MetricCatalog::standard(), registry);
    let session = NutSession::new(
        "127.0.0.1",
        3493,
        nut_exporter_core::Credentials::new("u", "p"),
        "ups",
    );

    let scheduler = PollScheduler::new(session, synchronizer, Duration::ZERO);
    assert_eq!(scheduler.interval(), MIN_REFRESH);
}

#[tokio::test]
async fn test_spawned_poller_runs_and_stops() {
    let server = FakeUpsd::start(&[("ups.load", "42")]).await;
    let (scheduler, registry) = scheduler(server.session());
    let handle = scheduler.spawn();

    let populated = tokio::time::timeout(Duration::from_secs(5), async {
        while !registry.contains("ups_load") {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(populated.is_ok(), "first cycle did not run");
    assert_eq!(registry.value("ups_load"), Some(42.0));

    tokio::time::timeout(Duration::from_secs(5), handle.shutdown())
        .await
        .expect("poller did not stop");
}
