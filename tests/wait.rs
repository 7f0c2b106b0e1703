use std::net::TcpListener;
use std::thread;
use std::time::{Duration, Instant};

use portend::{Error, Settings, WaitTimeout, Waiter, wait_for_free_port, wait_for_occupied_port};

fn unused_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

#[test_log::test]
fn free_port_returns_promptly() {
    let port = unused_port();
    let start = Instant::now();
    wait_for_free_port("127.0.0.1", port, Duration::from_secs(1)).unwrap();
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[test_log::test]
fn occupied_port_returns_promptly() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let start = Instant::now();
    wait_for_occupied_port("127.0.0.1", port, Duration::from_secs(1)).unwrap();
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[test_log::test]
fn held_port_times_out_after_deadline() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let start = Instant::now();
    let err = wait_for_free_port("127.0.0.1", port, WaitTimeout::from_secs_f64(0.3).unwrap())
        .unwrap_err();
    let elapsed = start.elapsed();

    assert!(err.is_timeout(), "{err:?}");
    assert_eq!(err.to_string(), format!("Port {port} not free on 127.0.0.1"));
    assert!(elapsed >= Duration::from_millis(300), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(900), "{elapsed:?}");
    drop(listener);
}

#[test_log::test]
fn missing_listener_times_out_waiting_for_occupied() {
    let port = unused_port();
    let err = wait_for_occupied_port("127.0.0.1", port, Duration::from_millis(300)).unwrap_err();
    assert!(matches!(err, Error::Timeout { port: p, .. } if p == port));
}

#[test_log::test]
fn wildcard_bind_round_trip() {
    let listener = TcpListener::bind("0.0.0.0:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    wait_for_occupied_port("0.0.0.0", port, Duration::from_secs(2)).unwrap();
    drop(listener);
    wait_for_free_port("0.0.0.0", port, Duration::from_secs(2)).unwrap();
}

#[test_log::test]
fn waits_for_a_late_listener() {
    let port = unused_port();
    let server = thread::spawn(move || {
        thread::sleep(Duration::from_millis(300));
        let listener = TcpListener::bind(("127.0.0.1", port)).unwrap();
        thread::sleep(Duration::from_secs(2));
        drop(listener);
    });

    wait_for_occupied_port("127.0.0.1", port, Duration::from_secs(5)).unwrap();
    server.join().unwrap();
}

#[test_log::test]
fn waits_for_a_listener_to_close() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = thread::spawn(move || {
        thread::sleep(Duration::from_millis(300));
        drop(listener);
    });

    wait_for_free_port("127.0.0.1", port, WaitTimeout::Unbounded).unwrap();
    server.join().unwrap();
}

#[test]
fn empty_host_is_invalid() {
    let waiter = Waiter::new(Settings::default());
    assert!(waiter.wait_for_free("", 8080, None::<Duration>).unwrap_err().is_invalid_argument());
    assert!(waiter.wait_for_occupied("", 8080, None::<Duration>).unwrap_err().is_invalid_argument());
}

#[test_log::test]
fn custom_settings_pace_polling() {
    let settings = Settings::from_toml_str(
        "poll_interval_ms = 20\nfree_probe_timeout_ms = 50\noccupied_probe_timeout_ms = 50\n",
    )
    .unwrap();
    let waiter = Waiter::new(settings);
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    waiter.wait_for_occupied("127.0.0.1", port, Duration::from_secs(1)).unwrap();
    assert!(waiter.check("127.0.0.1", port).unwrap_err().is_port_in_use());
    let err = waiter
        .wait_for_free("127.0.0.1", port, Duration::from_millis(100))
        .unwrap_err();
    assert!(err.is_timeout());
}

#[test_log::test]
fn resolver_failure_ends_the_wait() {
    let settings = Settings {
        resolver_fallback: false,
        ..Settings::default()
    };
    let waiter = Waiter::new(settings);

    let start = Instant::now();
    let err = waiter
        .wait_for_free("no-such-host.invalid", 80, Duration::from_secs(1))
        .unwrap_err();
    assert!(matches!(err, Error::Unexpected { port: 80, .. }), "{err:?}");

    let err = waiter
        .wait_for_occupied("no-such-host.invalid", 80, Duration::from_secs(1))
        .unwrap_err();
    assert!(matches!(err, Error::Unexpected { port: 80, .. }), "{err:?}");
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[test_log::test]
fn zero_poll_interval_spins_until_deadline() {
    let settings = Settings::from_toml_str("poll_interval_ms = 0\n").unwrap();
    let waiter = Waiter::new(settings);
    let port = unused_port();

    let start = Instant::now();
    let err = waiter
        .wait_for_occupied("127.0.0.1", port, Duration::from_millis(200))
        .unwrap_err();
    assert!(err.is_timeout());
    assert!(start.elapsed() >= Duration::from_millis(200));
}
