//! Integration tests for the companion client against a live server.

use std::time::Duration;

use direct_chat::{AppError, ChatClient, ChatServer, ClientConfig, ServerConfig};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::time::timeout;
use tokio_util::codec::{Framed, LinesCodec};

// =========================================================================
// Helpers
// =========================================================================

type Peer = Framed<TcpStream, LinesCodec>;

const WAIT: Duration = Duration::from_secs(5);

async fn start_server() -> String {
    let server = ChatServer::bind(ServerConfig {
        bind_addr: "127.0.0.1:0".to_string(),
        ..ServerConfig::default()
    })
    .await
    .expect("server should bind");

    let addr = server.local_addr().expect("local addr").to_string();
    tokio::spawn(server.run());
    addr
}

async fn connect_client(addr: &str) -> ChatClient {
    ChatClient::connect(&ClientConfig {
        server_addr: addr.to_string(),
        ..ClientConfig::default()
    })
    .await
    .expect("client should connect")
}

/// Scripted local input
fn input(script: &'static str) -> Lines<BufReader<&'static [u8]>> {
    BufReader::new(script.as_bytes()).lines()
}

async fn login_peer(addr: &str, username: &str) -> Peer {
    let mut peer = Framed::new(
        TcpStream::connect(addr).await.expect("should connect"),
        LinesCodec::new(),
    );
    peer.send(username).await.expect("send");
    let reply = timeout(WAIT, peer.next()).await.expect("timed out");
    assert_eq!(reply.and_then(Result::ok).as_deref(), Some("Authenticated"));
    peer
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn handshake_confirms_username() {
    let addr = start_server().await;
    let mut client = connect_client(&addr).await;

    let name = timeout(WAIT, client.handshake(&mut input("alice\n")))
        .await
        .expect("timed out")
        .expect("handshake should succeed");

    assert_eq!(name.as_deref(), Some("alice"));
}

#[tokio::test]
async fn handshake_retries_after_conflict() {
    let addr = start_server().await;
    let _alice = login_peer(&addr, "alice").await;
    let mut client = connect_client(&addr).await;

    let name = timeout(WAIT, client.handshake(&mut input("alice\nbob\n")))
        .await
        .expect("timed out")
        .expect("handshake should succeed");

    assert_eq!(name.as_deref(), Some("bob"));
}

#[tokio::test]
async fn handshake_ends_with_local_input() {
    let addr = start_server().await;
    let mut client = connect_client(&addr).await;

    let name = client.handshake(&mut input("")).await.expect("no error");
    assert!(name.is_none());
}

#[tokio::test]
async fn commands_are_forwarded_and_invalid_input_is_dropped() {
    let addr = start_server().await;
    let mut bob = login_peer(&addr, "bob").await;
    let mut client = connect_client(&addr).await;

    let mut local = input("carol\nhello\nbob:skipped\nSEND bob:hi\n");
    client.handshake(&mut local).await.expect("handshake");

    timeout(WAIT, client.run(local))
        .await
        .expect("timed out")
        .expect("run ends cleanly at end of input");

    // Lines rejected locally never reach bob; only the SEND payload does
    let line = timeout(WAIT, bob.next()).await.expect("timed out");
    assert_eq!(line.and_then(Result::ok).as_deref(), Some("carol: hi"));
}

#[tokio::test]
async fn server_disconnect_ends_client() {
    // A stand-in server that confirms one username and hangs up
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut conn = Framed::new(stream, LinesCodec::new());
        let _username = conn.next().await;
        conn.send("Authenticated").await.unwrap();
    });

    let mut client = connect_client(&addr).await;
    client.handshake(&mut input("alice\n")).await.expect("handshake");

    // Local input that never ends
    let (_keep_open, pending) = tokio::io::duplex(64);
    let result = timeout(WAIT, client.run(BufReader::new(pending).lines()))
        .await
        .expect("timed out");

    assert!(matches!(result, Err(AppError::Disconnected)));
}

#[tokio::test]
async fn handshake_stops_when_server_is_full() {
    // A stand-in server with no free slot
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut conn = Framed::new(stream, LinesCodec::new());
        let _username = conn.next().await;
        conn.send("Server is full").await.unwrap();
    });

    let mut client = connect_client(&addr).await;
    let result = timeout(WAIT, client.handshake(&mut input("alice\nbob\n")))
        .await
        .expect("timed out");

    assert!(matches!(result, Err(AppError::Disconnected)));
}

#[tokio::test]
async fn over_long_server_line_does_not_end_client() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let (hang_up_tx, hang_up_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut conn = Framed::new(stream, LinesCodec::new());
        let _username = conn.next().await;
        conn.send("Authenticated").await.unwrap();
        conn.send("y".repeat(2000)).await.unwrap();
        conn.send("after").await.unwrap();
        let _ = hang_up_rx.await;
    });

    let mut client = connect_client(&addr).await;
    client.handshake(&mut input("alice\n")).await.expect("handshake");

    let (_keep_open, pending) = tokio::io::duplex(64);
    let run = tokio::spawn(client.run(BufReader::new(pending).lines()));

    // Still connected after the over-long line
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!run.is_finished());

    // A real hang-up still ends the client
    hang_up_tx.send(()).unwrap();
    let result = timeout(WAIT, run).await.expect("timed out").expect("join");
    assert!(matches!(result, Err(AppError::Disconnected)));
}

#[tokio::test]
async fn long_message_is_refused_and_recipient_stays_connected() {
    let addr = start_server().await;

    let mut bob = connect_client(&addr).await;
    bob.handshake(&mut input("bob\n")).await.expect("handshake");
    let (_keep_open, pending) = tokio::io::duplex(64);
    let bob_run = tokio::spawn(bob.run(BufReader::new(pending).lines()));

    let sender_name = "s".repeat(50);
    let mut sender = login_peer(&addr, &sender_name).await;

    // Accepted as an incoming line, but "<sender>: <body>" would be too long
    sender.send(format!("bob:{}", "x".repeat(1000))).await.unwrap();
    let reply = timeout(WAIT, sender.next()).await.expect("timed out");
    assert_eq!(
        reply.and_then(Result::ok).as_deref(),
        Some("Message too long (max 1024 bytes)")
    );

    // Exactly at the limit is forwarded without an error reply
    let body = "x".repeat(1024 - sender_name.len() - 2);
    sender.send(format!("bob:{}", body)).await.unwrap();

    sender.send("LIST").await.unwrap();
    let reply = timeout(WAIT, sender.next()).await.expect("timed out");
    assert_eq!(
        reply.and_then(Result::ok),
        Some(format!("Online clients: bob, {}", sender_name))
    );
    assert!(!bob_run.is_finished());
}
