//! End-to-end scenarios (spec §8) driven over `mio::net::UnixStream`
//! pairs instead of real TCP sockets, with a `TestClock` standing in
//! for wall-clock time so liveness/timeout behavior doesn't need real
//! sleeps. Each test builds its own isolated `Server` and drives it one
//! `tick_once` at a time, exactly the seam spec §9 calls out.

use std::io::{Read, Write};
use std::rc::Rc;
use std::time::Duration;

use mio::net::UnixStream;

use ircd::client::Connection;
use ircd::clock::TestClock;
use ircd::config::Config;
use ircd::registry::ClientId;
use ircd::server::Server;

fn make_server() -> (Server<Rc<TestClock>>, Rc<TestClock>) {
    let clock = Rc::new(TestClock::new());
    let mut config = Config::default();
    config.network.password = None;
    let server = Server::without_listener(config, clock.clone()).expect("server builds without a listener");
    (server, clock)
}

/// Adds a client to `srv` and returns its id plus the peer half of the
/// socket pair, which stands in for the real remote IRC client.
fn add_client(srv: &mut Server<Rc<TestClock>>) -> (ClientId, UnixStream) {
    let (server_side, client_side) = UnixStream::pair().expect("socketpair");
    let id = srv
        .add_client(Box::new(server_side) as Box<dyn Connection>, "localhost".to_string())
        .expect("registers with the poller");
    (id, client_side)
}

fn send(stream: &mut UnixStream, line: &str) {
    stream.write_all(line.as_bytes()).unwrap();
    stream.write_all(b"\r\n").unwrap();
}

fn read_available(stream: &mut UnixStream) -> String {
    let mut out = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        match stream.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => out.extend_from_slice(&buf[..n]),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
            Err(e) => panic!("unexpected read error: {e}"),
        }
    }
    String::from_utf8(out).unwrap()
}

fn register(srv: &mut Server<Rc<TestClock>>, stream: &mut UnixStream, nick: &str) {
    send(stream, &format!("NICK {nick}"));
    send(stream, &format!("USER {nick} 0 * :Test User"));
    srv.tick_once().unwrap();
    let _ = read_available(stream); // drain the welcome burst
}

#[test]
fn registration_happy_path_sends_welcome_burst_and_motd() {
    let (mut srv, _clock) = make_server();
    let (_id, mut client) = add_client(&mut srv);

    send(&mut client, "NICK alice");
    send(&mut client, "USER alice 0 * :Alice A");
    srv.tick_once().unwrap();

    let out = read_available(&mut client);
    assert!(out.contains(" 001 alice "), "expected RPL_WELCOME, got: {out}");
    assert!(out.contains(" 002 alice "));
    assert!(out.contains(" 003 alice "));
    assert!(out.contains(" 004 alice "));
    assert!(out.contains(" 375 alice "), "expected MOTD start, got: {out}");
    assert!(out.contains(" 376 alice "), "expected end of MOTD, got: {out}");
}

#[test]
fn wrong_password_is_rejected_and_connection_closed() {
    let mut config = Config::default();
    config.network.password = Some("letmein".to_string());
    let clock = Rc::new(TestClock::new());
    let mut srv = Server::without_listener(config, clock).unwrap();
    let (id, mut client) = add_client(&mut srv);

    send(&mut client, "PASS wrong");
    srv.tick_once().unwrap();

    let out = read_available(&mut client);
    assert!(out.contains(" 464 "), "expected ERR_PASSWDMISMATCH, got: {out}");
    assert!(srv.clients.get(id).is_none(), "connection should be torn down after the mismatch");
}

#[test]
fn nick_collision_is_rejected() {
    let (mut srv, _clock) = make_server();
    let (_a, mut a_stream) = add_client(&mut srv);
    register(&mut srv, &mut a_stream, "alice");

    let (_b, mut b_stream) = add_client(&mut srv);
    send(&mut b_stream, "NICK alice");
    srv.tick_once().unwrap();

    let out = read_available(&mut b_stream);
    assert!(out.contains(" 433 "), "expected ERR_NICKNAMEINUSE, got: {out}");
}

#[test]
fn invite_only_channel_requires_invite_before_join() {
    let (mut srv, _clock) = make_server();
    let (_a, mut a_stream) = add_client(&mut srv);
    register(&mut srv, &mut a_stream, "alice");
    let (_b, mut b_stream) = add_client(&mut srv);
    register(&mut srv, &mut b_stream, "bob");

    send(&mut a_stream, "JOIN #private");
    send(&mut a_stream, "MODE #private +i");
    srv.tick_once().unwrap();
    let _ = read_available(&mut a_stream);

    send(&mut b_stream, "JOIN #private");
    srv.tick_once().unwrap();
    let out = read_available(&mut b_stream);
    assert!(out.contains(" 473 "), "expected ERR_INVITEONLYCHAN, got: {out}");

    send(&mut a_stream, "INVITE bob #private");
    srv.tick_once().unwrap();
    let _ = read_available(&mut a_stream);
    let invite_notice = read_available(&mut b_stream);
    assert!(invite_notice.contains("INVITE bob :#private"), "got: {invite_notice}");

    send(&mut b_stream, "JOIN #private");
    srv.tick_once().unwrap();
    let out = read_available(&mut b_stream);
    assert!(out.contains("JOIN :#private"), "expected JOIN echo, got: {out}");
    assert!(!out.contains(" 473 "));
}

#[test]
fn channel_message_reaches_other_members_but_not_the_sender() {
    let (mut srv, _clock) = make_server();
    let (_a, mut a_stream) = add_client(&mut srv);
    register(&mut srv, &mut a_stream, "alice");
    let (_b, mut b_stream) = add_client(&mut srv);
    register(&mut srv, &mut b_stream, "bob");

    send(&mut a_stream, "JOIN #chat");
    send(&mut b_stream, "JOIN #chat");
    srv.tick_once().unwrap();
    let _ = read_available(&mut a_stream);
    let _ = read_available(&mut b_stream);

    send(&mut a_stream, "PRIVMSG #chat :hello there");
    srv.tick_once().unwrap();

    let a_out = read_available(&mut a_stream);
    let b_out = read_available(&mut b_stream);
    assert!(!a_out.contains("PRIVMSG"), "sender should not see its own message echoed, got: {a_out}");
    assert!(b_out.contains("PRIVMSG #chat :hello there"), "got: {b_out}");
}

#[test]
fn ping_timeout_disconnects_client_and_broadcasts_quit() {
    let (mut srv, clock) = make_server();
    let (_a, mut a_stream) = add_client(&mut srv);
    register(&mut srv, &mut a_stream, "alice");
    let (bob_id, mut b_stream) = add_client(&mut srv);
    register(&mut srv, &mut b_stream, "bob");

    send(&mut a_stream, "JOIN #chat");
    send(&mut b_stream, "JOIN #chat");
    srv.tick_once().unwrap();
    let _ = read_available(&mut a_stream);
    let _ = read_available(&mut b_stream);

    // Past the idle window: bob should receive a PING and not answer it.
    clock.advance(Duration::from_secs(61));
    srv.tick_once().unwrap();
    let ping = read_available(&mut b_stream);
    assert!(ping.starts_with("PING"), "expected a PING, got: {ping}");

    // Past the ping timeout with no PONG: bob is dropped.
    clock.advance(Duration::from_secs(61));
    srv.tick_once().unwrap();

    assert!(srv.clients.get(bob_id).is_none(), "bob should have been reaped after the ping timeout");
    let quit = read_available(&mut a_stream);
    assert!(quit.contains("QUIT :Ping timeout"), "expected a QUIT broadcast to alice, got: {quit}");
}
