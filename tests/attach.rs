//! Integration tests for docker-attach.
//!
//! These tests run full attach sessions against a fake daemon listening on
//! a local TCP socket.

use docker_attach::protocol::{build_frame, build_raw_frame, StreamType};
use docker_attach::{
    AttachBuilder, AttachConfig, AttachError, BytesSender, Endpoint, NullSender, SessionState,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

const OK_HEADER: &[u8] =
    b"HTTP/1.1 200 OK\r\nContent-Type: application/vnd.docker.raw-stream\r\n\r\n";

/// What the fake daemon saw from the client.
struct Observed {
    request: String,
    stdin: Vec<u8>,
}

/// Read one request up to and including the blank line.
async fn read_request(socket: &mut TcpStream) -> String {
    let mut request = Vec::new();
    while !request.ends_with(b"\r\n\r\n") {
        request.push(socket.read_u8().await.unwrap());
    }
    String::from_utf8(request).unwrap()
}

/// Accept one connection, send `reply`, then collect stdin until the client
/// half-closes.
async fn fake_daemon(reply: Vec<u8>) -> (Endpoint, JoinHandle<Observed>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = Endpoint::Tcp(listener.local_addr().unwrap().to_string());

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;
        socket.write_all(&reply).await.unwrap();

        let mut stdin = Vec::new();
        socket.read_to_end(&mut stdin).await.unwrap();
        Observed { request, stdin }
    });

    (endpoint, handle)
}

fn reply(frames: &[Vec<u8>]) -> Vec<u8> {
    let mut bytes = OK_HEADER.to_vec();
    for frame in frames {
        bytes.extend_from_slice(frame);
    }
    bytes
}

#[tokio::test]
async fn test_attach_end_to_end() {
    let (endpoint, daemon) = fake_daemon(reply(&[
        build_frame(StreamType::Stdout, b"world"),
        build_frame(StreamType::Stderr, b"err"),
    ]))
    .await;

    let session = AttachBuilder::new("abc123")
        .path_prefix("v1.3")
        .logs(true)
        .stream(true)
        .stdin(BytesSender::new("hello"))
        .stdout(Vec::new())
        .stderr(Vec::new())
        .connect(&endpoint)
        .await
        .unwrap();
    assert_eq!(session.state(), SessionState::InputSent);

    let output = session.wait_for().await.unwrap();
    assert_eq!(output.stdout.unwrap(), b"world");
    assert_eq!(output.stderr.unwrap(), b"err");
    assert_eq!(output.stats.frames, 2);
    assert_eq!(output.stats.stdout_bytes, 5);
    assert_eq!(output.stats.stderr_bytes, 3);

    let observed = daemon.await.unwrap();
    assert_eq!(
        observed.request,
        "POST /v1.3/containers/abc123/attach?logs=true&stream=true&stdin=true&stdout=true&stderr=true HTTP/1.1\r\n\r\n"
    );
    assert_eq!(observed.stdin, b"hello");
}

#[tokio::test]
async fn test_attach_with_config() {
    let (endpoint, daemon) =
        fake_daemon(reply(&[build_frame(StreamType::Stdout, b"replayed")])).await;

    let config = AttachConfig::from_json_str(&format!(
        r#"{{ "endpoint": "{endpoint}", "api_version": "/v1.41/", "logs": true, "stream": false }}"#
    ))
    .unwrap();

    let output = AttachBuilder::new("web")
        .config(&config)
        .stdin(NullSender)
        .stdout(Vec::new())
        .connect(&config.parsed_endpoint().unwrap())
        .await
        .unwrap()
        .wait_for()
        .await
        .unwrap();
    assert_eq!(output.stdout.unwrap(), b"replayed");

    let observed = daemon.await.unwrap();
    assert_eq!(
        observed.request,
        "POST /v1.41/containers/web/attach?logs=true&stream=false&stdin=true&stdout=true&stderr=false HTTP/1.1\r\n\r\n"
    );
    assert!(observed.stdin.is_empty());
}

#[tokio::test]
async fn test_attach_large_and_empty_frames() {
    let big: Vec<u8> = (0..=255u8).cycle().take(100_000).collect();
    let (endpoint, _daemon) = fake_daemon(reply(&[
        build_frame(StreamType::Stdout, b""),
        build_frame(StreamType::Stdout, &big),
        build_frame(StreamType::Stderr, b"tail"),
    ]))
    .await;

    let output = AttachBuilder::new("big")
        .stdin(NullSender)
        .stdout(Vec::new())
        .stderr(Vec::new())
        .connect(&endpoint)
        .await
        .unwrap()
        .wait_for()
        .await
        .unwrap();

    assert_eq!(output.stdout.unwrap(), big);
    assert_eq!(output.stderr.unwrap(), b"tail");
    assert_eq!(output.stats.frames, 3);
}

#[tokio::test]
async fn test_attach_discards_unrequested_stream() {
    let (endpoint, _daemon) = fake_daemon(reply(&[
        build_frame(StreamType::Stderr, b"ignored"),
        build_frame(StreamType::Stdout, b"kept"),
    ]))
    .await;

    let output = AttachBuilder::new("quiet")
        .stdin(NullSender)
        .stdout(Vec::new())
        .connect(&endpoint)
        .await
        .unwrap()
        .wait_for()
        .await
        .unwrap();

    assert_eq!(output.stdout.unwrap(), b"kept");
    assert!(output.stderr.is_none());
    assert_eq!(output.stats.discarded_frames, 1);
}

#[tokio::test]
async fn test_attach_unknown_stream_type() {
    let (endpoint, _daemon) = fake_daemon(reply(&[
        build_frame(StreamType::Stdout, b"before"),
        build_raw_frame(0x0000_0000, b"stdin echo"),
    ]))
    .await;

    let session = AttachBuilder::new("odd")
        .stdin(NullSender)
        .stdout(Vec::new())
        .connect(&endpoint)
        .await
        .unwrap();

    let (output, result) = session.wait_for_output().await;
    let err = result.unwrap_err();
    assert!(matches!(err, AttachError::Protocol(_)), "{err}");
    assert_eq!(output.unwrap().stdout.unwrap(), b"before");
}

#[tokio::test]
async fn test_attach_truncated_frame() {
    let mut truncated = build_frame(StreamType::Stdout, b"complete");
    truncated.extend_from_slice(&build_frame(StreamType::Stdout, b"cut off")[..10]);
    let (endpoint, _daemon) = fake_daemon(reply(&[truncated])).await;

    let session = AttachBuilder::new("cut")
        .stdin(NullSender)
        .stdout(Vec::new())
        .connect(&endpoint)
        .await
        .unwrap();

    let (output, result) = session.wait_for_output().await;
    assert!(result.unwrap_err().is_io());
    assert_eq!(output.unwrap().stdout.unwrap(), b"complete");
}

#[tokio::test]
async fn test_attach_connection_refused() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = Endpoint::Tcp(listener.local_addr().unwrap().to_string());
    drop(listener);

    let result = AttachBuilder::new("gone")
        .stdout(Vec::new())
        .connect(&endpoint)
        .await;
    assert!(matches!(result, Err(AttachError::Io(_))));
}
