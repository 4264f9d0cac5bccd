//! End-to-end socket lifecycle tests over real loopback connections.

use std::error::Error as _;
use std::io::Write as _;
use std::net::{Shutdown, TcpStream};
use std::thread;
use std::time::{Duration, Instant};

use stream_socket::net::{ReadOutcome, Scheme, SocketError, SocketOption, StreamState};
use stream_socket::{Client, LineFramer, Server};

#[test]
fn test_target_is_stable() {
    let mut stream = stream_socket::Stream::new(Scheme::Tcp);
    stream.set_address("10.0.0.5");
    stream.set_port(8443);
    assert_eq!(stream.target(), "tcp://10.0.0.5:8443");
}

#[test]
fn test_close_is_idempotent_and_terminal() {
    let mut listener = Server::default().start().unwrap();
    assert!(listener.is_open());

    listener.close();
    assert_eq!(listener.state(), StreamState::Closed);
    assert!(!listener.is_open());

    // a second close is a no-op, not an error
    listener.close();
    assert_eq!(listener.state(), StreamState::Closed);

    assert!(matches!(listener.accept(), Err(SocketError::Closed)));
    assert!(matches!(listener.read(16), Err(SocketError::Closed)));
    assert!(matches!(listener.send(b"x"), Err(SocketError::Closed)));
}

#[test]
fn test_nonblocking_accept_returns_none_without_connection() {
    let mut listener = Server::default().start().unwrap();
    listener.set_no_block().unwrap();

    for _ in 0..10 {
        assert!(listener.accept().unwrap().is_none());
    }
    assert_eq!(listener.state(), StreamState::Listening);
}

#[test]
fn test_blocking_accept_times_out_with_error() {
    let mut listener = Server::default().with_accept_timeout(1).start().unwrap();
    assert!(listener.is_blocking());

    let started = Instant::now();
    let err = listener.accept().unwrap_err();
    assert!(matches!(err, SocketError::Accept { .. }));
    assert!(started.elapsed() >= Duration::from_millis(900));

    // the listener survives the timeout and keeps accepting
    listener.set_no_block().unwrap();
    assert!(listener.accept().unwrap().is_none());
}

#[test]
fn test_accept_derives_connected_stream() {
    let mut listener = Server::default().start().unwrap();
    let port = listener.local_addr().unwrap().port();

    let _client = TcpStream::connect(("127.0.0.1", port)).unwrap();
    let conn = listener.accept().unwrap().unwrap();

    assert_eq!(conn.state(), StreamState::Connected);
    assert_eq!(conn.scheme(), Scheme::Tcp);
    assert!(conn.is_blocking());
    assert!(conn.target().starts_with("tcp://127.0.0.1:"));
    assert!(conn.peer_addr().is_ok());
}

#[test]
fn test_ping_echo_roundtrip() {
    let mut listener = Server::default().start().unwrap();
    let port = listener.local_addr().unwrap().port();

    let client = thread::spawn(move || {
        let mut conn = Client::new("127.0.0.1", port).start().unwrap();
        let mut framer = LineFramer::new();
        let sent = framer.send_line(&mut conn, "PING").unwrap();
        assert_eq!(sent, 5);
        let reply = framer.read_line(&mut conn).unwrap();
        conn.close();
        reply
    });

    let mut conn = listener.accept().unwrap().unwrap();
    let mut framer = LineFramer::new();
    let line = framer.read_line(&mut conn).unwrap().unwrap();
    assert_eq!(line, "PING");
    framer.send_line(&mut conn, &line).unwrap();

    assert_eq!(client.join().unwrap(), Some("PING".to_string()));
    conn.close();
}

#[test]
fn test_accepted_connection_outlives_listener() {
    let mut listener = Server::default().start().unwrap();
    let port = listener.local_addr().unwrap().port();

    let mut client = TcpStream::connect(("127.0.0.1", port)).unwrap();
    let mut conn = listener.accept().unwrap().unwrap();

    listener.close();
    client.write_all(b"after-close\n").unwrap();

    let mut framer = LineFramer::new();
    let line = framer.read_line(&mut conn).unwrap();
    assert_eq!(line.as_deref(), Some("after-close"));
}

#[test]
fn test_listen_failure_without_held_resource_has_no_cause_chain() {
    let occupier = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = occupier.local_addr().unwrap().port();

    let err = Server::new("127.0.0.1", port).start().unwrap_err();
    match &err {
        SocketError::Listen { cleanup, code, .. } => {
            assert!(cleanup.is_none());
            assert!(code.is_some(), "bind failure must carry the OS code");
        }
        other => panic!("expected a listen error, got {other:?}"),
    }
    assert!(err.source().is_none());
}

#[test]
fn test_mode_flag_round_trip() {
    let mut listener = Server::default().start().unwrap();
    assert!(listener.is_blocking());

    listener.set_no_block().unwrap();
    assert!(!listener.is_blocking());
    listener.set_block().unwrap();
    assert!(listener.is_blocking());

    // after close both switches fail and the flag stays put
    listener.close();
    assert!(matches!(listener.set_no_block(), Err(SocketError::Closed)));
    assert!(listener.is_blocking());
}

#[test]
fn test_read_line_splits_at_first_terminator() {
    let mut listener = Server::default().start().unwrap();
    let port = listener.local_addr().unwrap().port();

    let mut client = TcpStream::connect(("127.0.0.1", port)).unwrap();
    let mut conn = listener.accept().unwrap().unwrap();
    client.write_all(b"ONE\nTWO\n").unwrap();

    let mut framer = LineFramer::new();
    assert_eq!(framer.read_line(&mut conn).unwrap().as_deref(), Some("ONE"));
    assert_eq!(framer.read_line(&mut conn).unwrap().as_deref(), Some("TWO"));
}

#[test]
fn test_read_line_eof_before_terminator_is_error() {
    let mut listener = Server::default().start().unwrap();
    let port = listener.local_addr().unwrap().port();

    let mut client = TcpStream::connect(("127.0.0.1", port)).unwrap();
    let mut conn = listener.accept().unwrap().unwrap();
    client.write_all(b"no newline").unwrap();
    drop(client);

    let mut framer = LineFramer::new();
    let err = framer.read_line(&mut conn).unwrap_err();
    assert!(matches!(err, SocketError::Read { .. }));
    assert!(err.to_string().contains("before a line terminator"));
}

#[test]
fn test_read_line_keeps_partial_line_across_not_ready() {
    let mut listener = Server::default().start().unwrap();
    let port = listener.local_addr().unwrap().port();

    let mut client = TcpStream::connect(("127.0.0.1", port)).unwrap();
    let mut conn = listener.accept().unwrap().unwrap();
    conn.set_no_block().unwrap();

    // no terminator yet: the poll comes back empty-handed but the partial
    // line stays buffered for the next call
    client.write_all(b"PAR").unwrap();
    let mut framer = LineFramer::new();
    assert_eq!(framer.read_line(&mut conn).unwrap(), None);
    assert_eq!(framer.buffered(), b"PAR");

    client.write_all(b"TIAL\n").unwrap();
    assert_eq!(
        framer.read_line(&mut conn).unwrap().as_deref(),
        Some("PARTIAL")
    );
    assert!(framer.buffered().is_empty());
}

#[test]
fn test_nonblocking_read_reports_not_ready_then_data() {
    let mut listener = Server::default().start().unwrap();
    let port = listener.local_addr().unwrap().port();

    let mut client = TcpStream::connect(("127.0.0.1", port)).unwrap();
    let mut conn = listener.accept().unwrap().unwrap();
    conn.set_no_block().unwrap();

    let started = Instant::now();
    assert_eq!(conn.read(64).unwrap(), ReadOutcome::NotReady);
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(800), "retries must be delayed");
    assert!(elapsed < Duration::from_secs(5), "retries must be bounded");

    client.write_all(b"late\n").unwrap();
    assert_eq!(conn.read(64).unwrap(), ReadOutcome::Data(b"late\n".to_vec()));
}

#[test]
fn test_blocking_read_timeout_is_read_error() {
    let mut listener = Server::default().start().unwrap();
    let port = listener.local_addr().unwrap().port();

    let _client = TcpStream::connect(("127.0.0.1", port)).unwrap();
    let mut conn = listener.accept().unwrap().unwrap();
    assert!(conn.is_blocking());

    // a live resource takes the option immediately, nothing is staged
    conn.set_option(SocketOption::ReceiveTimeout(Some(Duration::from_millis(
        300,
    ))))
    .unwrap();

    let started = Instant::now();
    let err = conn.read(64).unwrap_err();
    assert!(matches!(err, SocketError::Read { .. }));
    assert!(started.elapsed() >= Duration::from_millis(250));
}

#[test]
fn test_send_after_write_shutdown_fails() {
    let mut listener = Server::default().start().unwrap();
    let port = listener.local_addr().unwrap().port();

    let _client = TcpStream::connect(("127.0.0.1", port)).unwrap();
    let mut conn = listener.accept().unwrap().unwrap();

    conn.shutdown(Shutdown::Write).unwrap();
    let err = conn.send(b"too late\n").unwrap_err();
    assert!(matches!(err, SocketError::Write { .. }));

    // the resource stays owned; only close() releases it
    assert!(conn.is_open());
}

#[test]
fn test_reading_a_listening_socket_is_an_error() {
    let mut listener = Server::default().start().unwrap();
    let err = listener.read(16).unwrap_err();
    assert!(matches!(err, SocketError::Read { .. }));
}
