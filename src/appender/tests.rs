//! Tests for the appender implementation.

use std::{
    io::{BufRead, BufReader},
    net::{SocketAddr, TcpListener},
    sync::mpsc,
    thread,
    time::{Duration, Instant},
};

use rstest::{fixture, rstest};

use super::{
    BackoffPolicy, BuildError, LIBRARY_IDENTIFIER, LINE_SEP, SocketAppender,
    SocketAppenderBuilder, backoff::BackoffState, transport::mock::MockTransport,
};

const VALID_TOKEN: &str = "2bfbea1e-10c3-4419-bdad-7e6435882e1f";

#[fixture]
fn tcp_listener() -> TcpListener {
    TcpListener::bind(("127.0.0.1", 0)).expect("bind ephemeral listener")
}

/// Accept one connection and read `lines` newline-terminated lines from it.
fn spawn_line_server(
    listener: TcpListener,
    lines: usize,
) -> (SocketAddr, mpsc::Receiver<Vec<String>>) {
    let addr = listener.local_addr().expect("listener has address");
    let (notify_tx, notify_rx) = mpsc::channel();
    thread::spawn(move || {
        let (stream, _) = listener.accept().expect("accept connection");
        let mut reader = BufReader::new(stream);
        let mut received = Vec::with_capacity(lines);
        for _ in 0..lines {
            let mut line = String::new();
            reader.read_line(&mut line).expect("read line");
            received.push(line.trim_end_matches('\n').to_owned());
        }
        notify_tx.send(received).expect("send lines");
    });
    (addr, notify_rx)
}

fn build_tcp_appender(addr: SocketAddr) -> SocketAppender {
    SocketAppenderBuilder::new(VALID_TOKEN)
        .with_endpoint(addr.ip().to_string(), addr.port())
        .build()
        .expect("build appender")
}

fn build_mock_appender(transport: MockTransport) -> SocketAppender {
    SocketAppenderBuilder::new(VALID_TOKEN)
        .with_mock_transport(transport)
        .with_min_delay_ms(1)
        .with_max_delay_ms(4)
        .build()
        .expect("build appender")
}

/// Poll `condition` until it holds or the timeout elapses.
fn wait_for(condition: impl Fn() -> bool, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

#[rstest]
fn builder_rejects_zero_capacity() {
    let err = SocketAppenderBuilder::new(VALID_TOKEN)
        .with_capacity(0)
        .build()
        .expect_err("zero capacity must fail");
    assert!(matches!(err, BuildError::InvalidConfig(msg) if msg.contains("capacity")));
}

#[rstest]
fn builder_rejects_empty_host() {
    let err = SocketAppenderBuilder::new(VALID_TOKEN)
        .with_endpoint("  ", 10_000)
        .build()
        .expect_err("empty host must fail");
    assert!(matches!(err, BuildError::InvalidConfig(msg) if msg.contains("host")));
}

#[rstest]
fn builder_rejects_inverted_backoff_window() {
    let err = SocketAppenderBuilder::new(VALID_TOKEN)
        .with_min_delay_ms(500)
        .with_max_delay_ms(100)
        .build()
        .expect_err("min above max must fail");
    assert!(matches!(err, BuildError::InvalidConfig(msg) if msg.contains("delay")));
}

#[rstest]
fn priming_line_is_transmitted_first(tcp_listener: TcpListener) {
    let (addr, notify_rx) = spawn_line_server(tcp_listener, 2);
    let mut appender = build_tcp_appender(addr);
    appender.submit("user message");

    let lines = notify_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("lines received");
    assert_eq!(lines[0], format!("{LIBRARY_IDENTIFIER}{VALID_TOKEN}"));
    assert_eq!(lines[1], format!("{VALID_TOKEN}user message"));

    appender.close();
}

#[rstest]
fn submitted_lines_keep_queue_order(tcp_listener: TcpListener) {
    let (addr, notify_rx) = spawn_line_server(tcp_listener, 4);
    let mut appender = build_tcp_appender(addr);
    appender.submit("first");
    appender.submit("second");
    appender.submit("third");

    let lines = notify_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("lines received");
    // Priming line, then the submissions in FIFO order.
    assert_eq!(lines[1], format!("{VALID_TOKEN}first"));
    assert_eq!(lines[2], format!("{VALID_TOKEN}second"));
    assert_eq!(lines[3], format!("{VALID_TOKEN}third"));

    appender.close();
}

#[rstest]
fn multiline_message_arrives_as_single_line(tcp_listener: TcpListener) {
    let (addr, notify_rx) = spawn_line_server(tcp_listener, 2);
    let mut appender = build_tcp_appender(addr);
    appender.submit("first\nsecond\nthird");

    let lines = notify_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("lines received");
    assert_eq!(
        lines[1],
        format!("{VALID_TOKEN}first{LINE_SEP}second{LINE_SEP}third")
    );

    appender.close();
}

#[rstest]
fn trailing_newlines_are_stripped_before_framing(tcp_listener: TcpListener) {
    let (addr, notify_rx) = spawn_line_server(tcp_listener, 2);
    let mut appender = build_tcp_appender(addr);
    appender.submit("padded\n\n");

    let lines = notify_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("lines received");
    assert_eq!(lines[1], format!("{VALID_TOKEN}padded"));

    appender.close();
}

#[rstest]
fn resends_same_message_after_transient_write_failures() {
    let transport = MockTransport::new().fail_writes(2);
    let mut appender = build_mock_appender(transport.clone());
    appender.submit("payload");

    let expected = format!("{VALID_TOKEN}payload\n");
    assert!(
        wait_for(
            || String::from_utf8_lossy(&transport.bytes()).contains(&expected),
            Duration::from_secs(5),
        ),
        "payload never arrived on the wire"
    );

    let wire = String::from_utf8_lossy(&transport.bytes()).into_owned();
    assert_eq!(
        wire.matches(&expected).count(),
        1,
        "exactly one copy must arrive, wire {wire:?}"
    );
    // Each failed write severs the connection, so two failures force two
    // reconnects on top of the initial connect.
    assert_eq!(transport.connect_count(), 3);

    appender.close();
}

#[rstest]
fn retries_connecting_until_the_endpoint_accepts() {
    let transport = MockTransport::new().fail_connects(3);
    let mut appender = build_mock_appender(transport.clone());
    appender.submit("after outage");

    assert!(
        wait_for(|| !transport.bytes().is_empty(), Duration::from_secs(5)),
        "nothing arrived after the scripted outage"
    );
    assert_eq!(transport.attempt_count(), 4);
    assert_eq!(transport.connect_count(), 1);

    appender.close();
}

#[rstest]
fn dispatcher_starts_lazily_on_first_submission() {
    let transport = MockTransport::new();
    let appender = build_mock_appender(transport.clone());
    assert!(!appender.is_running());
    assert_eq!(transport.attempt_count(), 0);

    appender.submit("wake up");
    assert!(appender.is_running());

    drop(appender);
}

#[rstest]
fn invalid_token_degrades_to_a_noop_sink(tcp_listener: TcpListener) {
    // The only test that installs the global logger and the only one that
    // constructs a rejected token, so the diagnostic count is deterministic.
    let mut captured = logtest::Logger::start();

    let addr = tcp_listener.local_addr().expect("listener has address");
    tcp_listener
        .set_nonblocking(true)
        .expect("nonblocking listener");

    let appender = SocketAppenderBuilder::new("not-a-token")
        .with_endpoint(addr.ip().to_string(), addr.port())
        .build()
        .expect("build appender");
    for _ in 0..16 {
        appender.submit("dropped on the floor");
    }

    assert!(!appender.is_running());
    thread::sleep(Duration::from_millis(200));
    assert!(
        tcp_listener.accept().is_err(),
        "no connection may ever be opened for a rejected token"
    );

    let diagnostics = std::iter::from_fn(|| captured.pop())
        .filter(|record| record.args().contains("access token is not valid"))
        .count();
    assert_eq!(diagnostics, 1, "the diagnostic must be emitted exactly once");
}

#[rstest]
fn custom_validator_overrides_token_shape_check() {
    let transport = MockTransport::new();
    let appender = SocketAppenderBuilder::new("opaque-credential")
        .with_mock_transport(transport.clone())
        .with_token_validator(|token| token.starts_with("opaque"))
        .build()
        .expect("build appender");
    appender.submit("accepted");
    assert!(appender.is_running());

    drop(appender);
}

#[rstest]
fn close_returns_promptly_while_reconnecting() {
    let transport = MockTransport::new().fail_connects(usize::MAX);
    let mut appender = SocketAppenderBuilder::new(VALID_TOKEN)
        .with_mock_transport(transport)
        .with_min_delay_ms(3_000)
        .with_max_delay_ms(10_000)
        .build()
        .expect("build appender");
    appender.submit("never leaves");

    // Let the dispatcher enter its backoff sleep.
    thread::sleep(Duration::from_millis(50));
    let start = Instant::now();
    appender.close();
    assert!(
        start.elapsed() < Duration::from_secs(2),
        "close must interrupt the backoff sleep, took {:?}",
        start.elapsed()
    );
}

#[rstest]
fn close_is_idempotent() {
    let mut appender = build_mock_appender(MockTransport::new());
    appender.submit("once");
    appender.close();
    appender.close();
}

#[rstest]
fn backoff_doubles_until_capped() {
    let mut backoff = BackoffState::new(BackoffPolicy {
        min: Duration::from_millis(100),
        max: Duration::from_secs(1),
    });
    let delays: Vec<u64> = (0..5).map(|_| backoff.next_delay().as_millis() as u64).collect();
    assert_eq!(delays, vec![200, 400, 800, 1_000, 1_000]);
}

#[rstest]
fn backoff_resets_to_minimum_after_success() {
    let mut backoff = BackoffState::new(BackoffPolicy {
        min: Duration::from_millis(100),
        max: Duration::from_secs(10),
    });
    for _ in 0..6 {
        backoff.next_delay();
    }
    backoff.reset();
    assert_eq!(backoff.next_delay(), Duration::from_millis(200));
}

#[rstest]
fn backoff_jitter_stays_within_double_the_base() {
    let mut backoff = BackoffState::new(BackoffPolicy::default());
    let base = Duration::from_millis(80);
    for _ in 0..64 {
        let jittered = backoff.jitter(base);
        assert!(jittered >= base);
        assert!(jittered <= base * 2);
    }
}
