//! End-to-end runs of the service orchestrator.
//!
//! The orchestrator builds its own runtime, so these are plain tests.

use std::io;
use std::sync::Arc;

use fill_postgresql::lifecycle::{ExitStatus, Service};
use fill_postgresql::observability::logging::LoggingConfigurator;
use fill_postgresql::observability::SinkRegistry;
use tokio::sync::mpsc;
use tracing::Level;

mod common;
use common::{argv, capture, MemorySink, ScriptedApp, ScriptedConfigurator, Step};

fn logging_file(contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("logging.json");
    std::fs::write(&path, contents).unwrap();
    (dir, path)
}

type ScriptedService = Service<ScriptedApp, ScriptedConfigurator>;

fn run_scripted(
    app: ScriptedApp,
    configurator: Arc<ScriptedConfigurator>,
) -> (ExitStatus, ScriptedService) {
    run_with_sinks(app, configurator, SinkRegistry::new())
}

fn run_with_sinks(
    app: ScriptedApp,
    configurator: Arc<ScriptedConfigurator>,
    sinks: SinkRegistry,
) -> (ExitStatus, ScriptedService) {
    let mut service = Service::new(app, sinks, configurator);
    let (_tx, rx) = mpsc::unbounded_channel::<()>();
    let status = service.run(argv(), move || Ok(rx));
    (status, service)
}

/// Registry holding one in-memory sink.
fn target_sinks() -> (Arc<MemorySink>, SinkRegistry) {
    let target = MemorySink::new("target");
    let sinks = SinkRegistry::new();
    sinks.insert(target.clone());
    (target, sinks)
}

#[test]
fn test_refused_initialization_skips_everything() {
    let (log, _guard) = capture();
    let (_dir, path) = logging_file("{}");
    let configurator = ScriptedConfigurator::new(&[]);
    let mut app = ScriptedApp::new(path);
    app.accept_init = false;

    let (status, service) = run_scripted(app, configurator.clone());

    assert_eq!(status, ExitStatus::InitializeFail);
    assert_eq!(status.code(), -1);
    assert_eq!(service.app().journal(), vec!["initialize"]);
    assert_eq!(configurator.calls(), 0);
    assert_eq!(log.errors(), 0);
}

#[test]
fn test_panicking_initialization_is_classified() {
    let (log, _guard) = capture();
    let (_dir, path) = logging_file("{}");
    let configurator = ScriptedConfigurator::new(&[]);
    let mut app = ScriptedApp::new(path);
    app.init_panic = Some("plugin option parse exploded");

    let (status, service) = run_scripted(app, configurator.clone());

    assert_eq!(status, ExitStatus::OtherFail);
    assert_eq!(status.code(), -2);
    assert_eq!(service.app().journal(), vec!["initialize"]);
    assert_eq!(configurator.calls(), 0);
    assert_eq!(log.errors(), 1);
    let error = log
        .records()
        .into_iter()
        .find(|r| r.level == Level::ERROR)
        .unwrap();
    assert_eq!(error.message, "plugin option parse exploded");
}

#[test]
fn test_successful_run() {
    let (log, _guard) = capture();
    let (_dir, path) = logging_file("{}");
    let configurator = ScriptedConfigurator::new(&[]);
    let (target, sinks) = target_sinks();

    let (status, service) = run_with_sinks(ScriptedApp::new(&path), configurator.clone(), sinks);

    assert_eq!(status, ExitStatus::Success);
    // Sinks are initialized once, after the file is applied.
    assert_eq!(target.initializations(), 1);
    assert_eq!(status.code(), 0);
    assert_eq!(service.app().journal(), vec!["initialize", "startup", "exec"]);
    assert_eq!(configurator.paths(), vec![path]);
    assert!(service.app().shutdown.is_triggered());

    let messages = log.messages();
    let version = messages
        .iter()
        .position(|m| m == "fill-postgresql version 9.9.9-test")
        .unwrap();
    assert_eq!(
        messages[version + 1],
        "fill-postgresql using configuration file /srv/config/config.toml"
    );
    assert_eq!(
        messages[version + 2],
        "fill-postgresql data directory is /srv/data"
    );
    assert_eq!(log.errors(), 0);
}

#[test]
fn test_missing_logging_file_is_not_an_error() {
    let (log, _guard) = capture();
    let dir = tempfile::tempdir().unwrap();
    let configurator = ScriptedConfigurator::new(&[]);
    let (target, sinks) = target_sinks();
    let app = ScriptedApp::new(dir.path().join("logging.json"));

    let (status, _) = run_with_sinks(app, configurator.clone(), sinks);

    assert_eq!(status, ExitStatus::Success);
    assert_eq!(configurator.calls(), 0);
    assert_eq!(target.initializations(), 1);
    assert_eq!(log.errors(), 0);
}

#[test]
fn test_invalid_logging_file_at_startup_is_fatal() {
    let (log, _guard) = capture();
    let (_dir, path) = logging_file(
        r#"{ "level": "info", "appenders": [ { "name": "x", "kind": "syslog" } ] }"#,
    );
    let app = ScriptedApp::new(&path);
    let journal = Arc::clone(&app.journal);
    let configurator = Arc::new(LoggingConfigurator::new(SinkRegistry::new()));

    let mut service = Service::new(app, SinkRegistry::new(), configurator.clone());
    let (_tx, rx) = mpsc::unbounded_channel::<()>();
    let status = service.run(argv(), move || Ok(rx));

    assert_eq!(status, ExitStatus::OtherFail);
    assert_eq!(status.code(), -2);
    assert_eq!(*journal.lock().unwrap(), vec!["initialize"]);
    assert!(configurator.current().is_none());
    assert_eq!(log.errors(), 1);
    let error = log
        .records()
        .into_iter()
        .find(|r| r.level == Level::ERROR)
        .unwrap();
    assert!(error.message.contains("configuration"));
    assert!(error.message.contains("logging.json"));
}

#[test]
fn test_allocation_fault_in_configure_exits_bad_alloc() {
    let (log, _guard) = capture();
    let (_dir, path) = logging_file("{}");
    let configurator = ScriptedConfigurator::new(&[Step::FailOutOfMemory]);

    let (status, service) = run_scripted(ScriptedApp::new(path), configurator);

    assert_eq!(status, ExitStatus::BadAlloc);
    assert_eq!(status.code(), 1);
    assert_eq!(service.app().journal(), vec!["initialize"]);
    assert_eq!(log.errors(), 1);
    assert!(log.messages().iter().any(|m| m == "bad alloc"));
}

#[test]
fn test_exec_faults_are_classified() {
    let cases = [
        (
            Step::FailService,
            ExitStatus::OtherFail,
            "logging: unknown appender kind\n    file: logging.json",
        ),
        (Step::FailOutOfMemory, ExitStatus::BadAlloc, "bad alloc"),
        (Step::FailRuntime, ExitStatus::OtherFail, "range error"),
        (Step::FailUnknown, ExitStatus::OtherFail, "unknown exception"),
        (Step::Panic, ExitStatus::OtherFail, "configurator exploded"),
    ];

    for (step, expected, message) in cases {
        let (log, _guard) = capture();
        let dir = tempfile::tempdir().unwrap();
        let mut app = ScriptedApp::new(dir.path().join("logging.json"));
        app.exec = step;

        let (status, service) = run_scripted(app, ScriptedConfigurator::new(&[]));

        assert_eq!(status, expected, "{step:?}");
        assert_eq!(
            service.app().journal(),
            vec!["initialize", "startup", "exec"],
            "{step:?}"
        );
        assert_eq!(log.errors(), 1, "{step:?}");
        let error = log
            .records()
            .into_iter()
            .find(|r| r.level == Level::ERROR)
            .unwrap();
        assert_eq!(error.message, message, "{step:?}");
    }
}

#[test]
fn test_startup_fault_stops_before_exec() {
    let (log, _guard) = capture();
    let dir = tempfile::tempdir().unwrap();
    let mut app = ScriptedApp::new(dir.path().join("logging.json"));
    app.startup = Step::FailRuntime;

    let (status, service) = run_scripted(app, ScriptedConfigurator::new(&[]));

    assert_eq!(status, ExitStatus::OtherFail);
    // Torn down instead of executed; the reload loop is released too.
    assert_eq!(service.app().journal(), vec!["initialize", "startup", "stop"]);
    assert!(service.app().shutdown.is_triggered());
    assert_eq!(log.errors(), 1);
    let error = log
        .records()
        .into_iter()
        .find(|r| r.level == Level::ERROR)
        .unwrap();
    assert_eq!(error.message, "range error");
}

#[test]
fn test_reload_registration_failure_is_fatal() {
    let (log, _guard) = capture();
    let dir = tempfile::tempdir().unwrap();
    let app = ScriptedApp::new(dir.path().join("logging.json"));
    let journal = Arc::clone(&app.journal);

    let mut service = Service::new(app, SinkRegistry::new(), ScriptedConfigurator::new(&[]));
    let status = service.run(argv(), || {
        Err::<mpsc::UnboundedReceiver<()>, _>(io::Error::other("signal registration refused"))
    });

    assert_eq!(status, ExitStatus::OtherFail);
    assert_eq!(*journal.lock().unwrap(), vec!["initialize"]);
    assert_eq!(log.errors(), 1);
    assert!(log.messages().iter().any(|m| m == "signal registration refused"));
}
