//! Server deployment scenarios driven through injected signals.

mod common;

use common::{load_config, memory_logger, FailingEngine, RecordingEngine};
use devmount::config::LogLevel;
use devmount::engine::EngineError;
use devmount::lifecycle::{Shared, Signals, TerminationSignal};
use devmount::{Server, ServerError, ServerState};

const TWO_DEVICES: &str = r#"{
    "port": "9000",
    "log": { "path": "stderr", "level": "debug" },
    "devices": [
        { "name": "mic0", "endpoint": "a" },
        { "name": "mic1", "endpoint": "b" }
    ]
}"#;

#[test]
fn signal_stops_a_deployed_server() {
    let config = Shared::new(load_config(TWO_DEVICES));
    let (logger, buffer) = memory_logger(LogLevel::Debug);
    let engine = RecordingEngine::default();
    let probe = engine.clone();

    let server = Server::create_with(&config, &logger, move |_| Ok(engine)).unwrap();
    let (sender, signals) = Signals::channel();
    assert!(sender.send(TerminationSignal::Terminate));

    server.deploy_with(signals).unwrap();

    assert_eq!(server.state(), ServerState::Stopped);
    assert_eq!(probe.attached_paths(), Some(vec!["/a".into(), "/b".into()]));

    let order = [
        "INFO starting deployment",
        "DEBUG adding signal handlers",
        "DEBUG mounting devices",
        "INFO mounted device \"mic0\" at endpoint /a",
        "INFO mounted device \"mic1\" at endpoint /b",
        "DEBUG attaching engine",
        "DEBUG starting main loop",
        "INFO signal received (SIGTERM)",
        "INFO server shutting down",
    ];
    let positions: Vec<usize> = order
        .iter()
        .map(|line| buffer.position(line).unwrap_or_else(|| panic!("missing {line:?}")))
        .collect();
    assert!(positions.windows(2).all(|pair| pair[0] < pair[1]), "{positions:?}");
    assert!(buffer
        .contents()
        .contains("launch string: ( decodebin name=depay0 ! pulsesink device=mic1 )"));
}

#[test]
fn signal_sent_while_running_stops_the_loop() {
    let config = Shared::new(load_config(TWO_DEVICES));
    let (logger, buffer) = memory_logger(LogLevel::Info);
    let engine = RecordingEngine::default();
    let probe = engine.clone();

    let server = Server::create_with(&config, &logger, move |_| Ok(engine)).unwrap();
    let (sender, signals) = Signals::channel();

    let signaller = std::thread::spawn(move || {
        while probe.attached_paths().is_none() {
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        std::thread::sleep(std::time::Duration::from_millis(20));
        sender.send(TerminationSignal::Terminate)
    });

    server.deploy_with(signals).unwrap();
    assert!(signaller.join().unwrap());

    assert_eq!(server.state(), ServerState::Stopped);
    let received = buffer.position("INFO signal received (SIGTERM)").unwrap();
    let shutdown = buffer.position("INFO server shutting down").unwrap();
    assert!(received < shutdown);
}

#[test]
fn interrupt_is_handled_like_terminate() {
    let config = Shared::new(load_config(TWO_DEVICES));
    let (logger, buffer) = memory_logger(LogLevel::Info);

    let server =
        Server::create_with(&config, &logger, |_| Ok(RecordingEngine::default())).unwrap();
    let (sender, signals) = Signals::channel();
    sender.send(TerminationSignal::Interrupt);

    server.deploy_with(signals).unwrap();
    assert!(buffer.contents().contains("INFO signal received (SIGINT)"));
    assert!(!buffer.contents().contains("DEBUG"));
}

#[test]
fn stop_handle_ends_the_loop_from_another_thread() {
    let config = Shared::new(load_config(TWO_DEVICES));
    let (logger, buffer) = memory_logger(LogLevel::Info);
    let server =
        Server::create_with(&config, &logger, |_| Ok(RecordingEngine::default())).unwrap();

    let stop = server.stop_handle();
    let stopper = std::thread::spawn(move || {
        std::thread::sleep(std::time::Duration::from_millis(50));
        stop.stop();
    });

    let (_sender, signals) = Signals::channel();
    server.deploy_with(signals).unwrap();
    stopper.join().unwrap();

    assert_eq!(server.state(), ServerState::Stopped);
    assert!(buffer.lines().last().unwrap().ends_with("server shutting down"));
}

#[test]
fn failed_mount_rolls_back_and_skips_the_loop() {
    let config = Shared::new(load_config(
        r#"{ "devices": [
            { "name": "mic0", "endpoint": "a" },
            { "name": "", "endpoint": "b" },
            { "name": "mic2", "endpoint": "c" }
        ] }"#,
    ));
    let (logger, buffer) = memory_logger(LogLevel::Info);
    let engine = RecordingEngine::default();
    let probe = engine.clone();

    let server = Server::create_with(&config, &logger, move |_| Ok(engine)).unwrap();
    let err = server.deploy_with(Signals::channel().1).unwrap_err();

    assert!(matches!(err, ServerError::Mount { failed: 1, total: 3 }));
    assert_eq!(err.to_string(), "failed to mount 1 of 3 device(s)");
    assert_eq!(server.state(), ServerState::Stopped);
    assert!(probe.attached_paths().is_none());
    assert!(server.mount_points().paths().is_empty());

    // Every device was attempted before the failure was reported.
    let mounted_c = buffer.position("endpoint /c").unwrap();
    let failed = buffer.position("ERROR failed to mount device(s)").unwrap();
    assert!(mounted_c < failed);
    assert!(buffer.lines().last().unwrap().ends_with("server shutting down"));
}

#[test]
fn attach_failure_is_reported() {
    let config = Shared::new(load_config(TWO_DEVICES));
    let (logger, buffer) = memory_logger(LogLevel::Info);
    let server = Server::create_with(&config, &logger, |_| Ok(FailingEngine::default())).unwrap();

    let err = server.deploy_with(Signals::channel().1).unwrap_err();
    assert!(matches!(err, ServerError::Engine(EngineError::Attach(_))));
    assert!(buffer
        .contents()
        .contains("ERROR errors occurred while deploying server"));
    assert_eq!(server.state(), ServerState::Stopped);
}

#[test]
fn empty_device_list_still_runs() {
    let config = Shared::new(load_config("{}"));
    let (logger, _buffer) = memory_logger(LogLevel::Error);
    let engine = RecordingEngine::default();
    let probe = engine.clone();

    let server = Server::create_with(&config, &logger, move |_| Ok(engine)).unwrap();
    server.stop_handle().stop();
    server.deploy_with(Signals::channel().1).unwrap();

    assert_eq!(probe.attached_paths(), Some(Vec::new()));
}
