//! Integration tests for the relay server over real TCP connections.

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use textrelay::prelude::*;
use textrelay_protocol::{DEFAULT_MAX_BODY_LENGTH, line_overhead, split_token, verify};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;

// =========================================================================
// Helpers
// =========================================================================

const TIMEOUT: Duration = Duration::from_secs(5);

/// Starts a server on an OS-assigned port and returns its address and
/// broker handle.
async fn start_server(builder: RelayServerBuilder) -> (SocketAddr, BrokerHandle) {
    let server = builder.bind("127.0.0.1:0").build().await.expect("should bind");
    let addr = server.local_addr().expect("should have an address");
    let broker = server.broker();
    tokio::spawn(server.run());
    (addr, broker)
}

/// A protocol client speaking frames through `tokio_util::codec`.
struct Client {
    framed: Framed<TcpStream, FrameCodec>,
}

impl Client {
    async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.expect("client should connect");
        Self {
            framed: Framed::new(stream, FrameCodec::default()),
        }
    }

    async fn send_raw(&mut self, body: String) {
        self.framed.send(body).await.expect("send should succeed");
    }

    async fn send(&mut self, command: &str, args: &str) {
        self.send_raw(compose_body(command, args)).await;
    }

    /// Reads the next reply as `(command, payload)`, checking its checksum.
    async fn recv(&mut self) -> (String, String) {
        let body = tokio::time::timeout(TIMEOUT, self.framed.next())
            .await
            .expect("reply should arrive in time")
            .expect("connection should stay open")
            .expect("reply should decode");

        let (token, line) = split_token(&body).unwrap();
        assert!(verify(token, line), "reply checksum must verify: {body}");

        let mut parts = line.splitn(4, ',');
        let _ = parts.next();
        let timestamp = parts.next().unwrap_or_default();
        assert_eq!(timestamp.len(), 22, "unexpected timestamp in {body}");
        let command = parts.next().unwrap_or_default().to_string();
        let payload = parts.next().unwrap_or_default().to_string();
        (command, payload)
    }

    async fn request(&mut self, command: &str, args: &str) -> String {
        self.send(command, args).await;
        let (got, payload) = self.recv().await;
        assert_eq!(got, command);
        payload
    }
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_two_participants_across_rooms() {
    let (addr, _broker) = start_server(RelayServer::builder()).await;
    let mut p1 = Client::connect(addr).await;
    let mut p2 = Client::connect(addr).await;

    // P1 gets an identity and starts in the lobby.
    let p1_id = p1.request("REQUUID", "").await;
    assert_eq!(p1_id.len(), 36);
    assert_eq!(p1.request("REQCHATROOM", "").await, "the lobby");

    assert_eq!(p1.request("SENDTEXT", "hello").await, "5[hello];");

    // P2, also in the lobby, pulls P1's post.
    assert_eq!(p2.request("REQTEXT", "").await, format!("{p1_id} hello;"));

    // P1 names "dev"; P2 moves there and finds it empty.
    assert_eq!(p1.request("NAMECHATROOM", "dev").await, "dev");
    assert_eq!(p2.request("CHANGECHATROOM", "dev").await, "dev");
    assert_eq!(p2.request("REQTEXT", "").await, "");

    // P1 follows and posts; P2 sees it exactly once.
    assert_eq!(p1.request("CHANGECHATROOM", "dev").await, "dev");
    p1.request("SENDTEXT", "hi dev").await;
    assert_eq!(p2.request("REQTEXT", "").await, format!("{p1_id} hi dev;"));
    assert_eq!(p2.request("REQTEXT", "").await, "");
}

#[tokio::test]
async fn test_checksum_mismatch_gets_no_reply() {
    let (addr, _broker) = start_server(RelayServer::builder()).await;
    let mut client = Client::connect(addr).await;

    let mut corrupted = compose_body("SENDTEXT", "tampered");
    corrupted.push('!');
    client.send_raw(corrupted).await;

    // The next reply belongs to the following request, and nothing was posted.
    assert_eq!(client.request("REQTEXT", "").await, "");
}

#[tokio::test]
async fn test_bad_header_closes_connection() {
    let (addr, broker) = start_server(RelayServer::builder()).await;
    let mut client = Client::connect(addr).await;
    assert_eq!(client.request("REQCHATROOM", "").await, "the lobby");
    assert_eq!(broker.list_members("the lobby").await.unwrap().len(), 1);

    client.framed.get_mut().write_all(b"zz!!").await.unwrap();

    let next = tokio::time::timeout(TIMEOUT, client.framed.next())
        .await
        .expect("server should close in time");
    assert!(next.is_none(), "expected EOF, got {next:?}");

    // The participant left the broker.
    let mut members = usize::MAX;
    for _ in 0..50 {
        members = broker.list_members("the lobby").await.unwrap().len();
        if members == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(members, 0);
}

#[tokio::test]
async fn test_disconnect_removes_member() {
    let (addr, _broker) = start_server(RelayServer::builder()).await;
    let mut p1 = Client::connect(addr).await;
    let mut p2 = Client::connect(addr).await;

    let p1_id = p1.request("REQUUID", "").await;
    p1.request("NICK", "alice").await;
    let p2_id = p2.request("REQUUID", "").await;

    let users = p2.request("REQUSERS", "").await;
    assert_eq!(users, format!("{p1_id},alice;{p2_id},;"));

    drop(p1);

    let mut users = String::new();
    for _ in 0..50 {
        users = p2.request("REQUSERS", "").await;
        if users == format!("{p2_id},;") {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(users, format!("{p2_id},;"));

    // The name is free again.
    assert_eq!(p2.request("NICK", "alice").await, "alice");
}

#[tokio::test]
async fn test_taken_nick_and_missing_room_are_ignored() {
    let (addr, _broker) = start_server(RelayServer::builder()).await;
    let mut p1 = Client::connect(addr).await;
    let mut p2 = Client::connect(addr).await;

    p1.request("NICK", "alice").await;

    // No reply for either ignored request; the next reply answers REQCHATROOM.
    p2.send("NICK", "alice").await;
    p2.send("CHANGECHATROOM", "nowhere").await;
    assert_eq!(p2.request("REQCHATROOM", "").await, "the lobby");
}

#[tokio::test]
async fn test_room_listing_is_sorted() {
    let (addr, broker) = start_server(RelayServer::builder()).await;
    let mut client = Client::connect(addr).await;

    client.request("NAMECHATROOM", "zeta").await;
    client.request("NAMECHATROOM", "alpha").await;
    client.send("NAMECHATROOM", "alpha").await;

    assert_eq!(
        client.request("REQCHATROOMS", "").await,
        "alpha;the lobby;zeta;"
    );
    assert_eq!(broker.room_count().await.unwrap(), 3);
}

#[tokio::test]
async fn test_multi_word_arguments_are_rejoined() {
    let (addr, _broker) = start_server(RelayServer::builder()).await;
    let mut client = Client::connect(addr).await;

    assert_eq!(client.request("NAMECHATROOM", "dev team").await, "dev team");
    assert_eq!(client.request("CHANGECHATROOM", "dev team").await, "dev team");
    assert_eq!(client.request("REQCHATROOM", "").await, "dev team");
}

#[tokio::test]
async fn test_long_backlog_arrives_over_several_pulls() {
    let (addr, _broker) = start_server(RelayServer::builder()).await;
    let mut client = Client::connect(addr).await;

    let text = "y".repeat(200);
    for _ in 0..5 {
        client.request("SENDTEXT", &text).await;
    }

    let mut delivered = 0;
    for _ in 0..5 {
        let payload = client.request("REQTEXT", "").await;
        if payload.is_empty() {
            break;
        }
        delivered += payload.matches(';').count();
    }
    assert_eq!(delivered, 5);
    assert_eq!(client.request("REQTEXT", "").await, "");
}

#[tokio::test]
async fn test_history_limit_from_builder() {
    let builder = RelayServer::builder().broker_config(BrokerConfig {
        history_limit: Some(2),
        ..BrokerConfig::default()
    });
    let (addr, _broker) = start_server(builder).await;
    let mut client = Client::connect(addr).await;

    for text in ["one", "two", "three"] {
        client.request("SENDTEXT", text).await;
    }
    assert_eq!(client.request("REQTEXT", "").await, " two; three;");
}

#[tokio::test]
async fn test_checksum_validation_can_be_disabled() {
    let builder = RelayServer::builder().session_config(SessionConfig {
        verify_checksums: false,
        ..SessionConfig::default()
    });
    let (addr, _broker) = start_server(builder).await;
    let mut client = Client::connect(addr).await;

    client.send_raw("whatever,t,REQCHATROOM".to_string()).await;
    assert_eq!(client.recv().await, ("REQCHATROOM".into(), "the lobby".into()));
}

#[tokio::test]
async fn test_longest_deliverable_post_arrives_byte_for_byte() {
    let (addr, broker) = start_server(RelayServer::builder()).await;
    let mut client = Client::connect(addr).await;
    let id = client.request("REQUUID", "").await;

    // "<id> <text>;" exactly fills a REQTEXT reply.
    let room = DEFAULT_MAX_BODY_LENGTH - line_overhead("REQTEXT");
    let text = "y".repeat(room - id.len() - 2);
    assert_eq!(
        client.request("SENDTEXT", &text).await,
        format!("{}[{text}];", text.len())
    );
    assert_eq!(client.request("REQTEXT", "").await, format!("{id} {text};"));
    assert_eq!(broker.room_len("the lobby").await.unwrap(), Some(1));
}

#[tokio::test]
async fn test_post_too_large_to_deliver_is_ignored() {
    let (addr, broker) = start_server(RelayServer::builder()).await;
    let mut client = Client::connect(addr).await;
    client.request("REQUUID", "").await;

    // Fits a request frame but not a REQTEXT reply once the author is added.
    client.send("SENDTEXT", &"y".repeat(460)).await;
    assert_eq!(client.request("REQTEXT", "").await, "");
    assert_eq!(broker.room_len("the lobby").await.unwrap(), Some(0));
}

#[tokio::test]
async fn test_longest_legal_request_post_is_ignored_without_append() {
    let (addr, broker) = start_server(RelayServer::builder()).await;
    let mut client = Client::connect(addr).await;

    let text = "y".repeat(DEFAULT_MAX_BODY_LENGTH - line_overhead("SENDTEXT"));
    let body = compose_body("SENDTEXT", &text);
    assert!(body.len() <= DEFAULT_MAX_BODY_LENGTH);

    // Its echo cannot fit a reply, so nothing is stored.
    client.send_raw(body).await;
    assert_eq!(client.request("REQTEXT", "").await, "");
    assert_eq!(broker.room_len("the lobby").await.unwrap(), Some(0));
}

#[tokio::test]
async fn test_build_rejects_max_body_length_wider_than_header() {
    let result = RelayServer::builder()
        .bind("127.0.0.1:0")
        .frame_config(FrameConfig {
            header_width: 4,
            max_body_length: 20_000,
        })
        .build()
        .await;
    assert!(matches!(result, Err(RelayError::Config(_))));
}

#[tokio::test]
async fn test_large_max_body_length_within_header_serves_replies() {
    let builder = RelayServer::builder().frame_config(FrameConfig {
        header_width: 4,
        max_body_length: 9999,
    });
    let (addr, _broker) = start_server(builder).await;
    let stream = TcpStream::connect(addr).await.unwrap();
    let mut client = Client {
        framed: Framed::new(
            stream,
            FrameCodec::new(FrameConfig {
                header_width: 4,
                max_body_length: 9999,
            }),
        ),
    };

    let text = "z".repeat(400);
    for _ in 0..30 {
        client.request("SENDTEXT", &text).await;
    }

    let mut delivered = 0;
    for _ in 0..5 {
        let payload = client.request("REQTEXT", "").await;
        if payload.is_empty() {
            break;
        }
        delivered += payload.matches(';').count();
    }
    assert_eq!(delivered, 30);
}
