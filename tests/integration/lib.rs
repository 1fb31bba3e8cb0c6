//! Shared helpers for gateway integration tests.

use bytes::Bytes;
use fleetgate_gateway::Gateway;
use futures::{Stream, StreamExt};
use std::net::SocketAddr;

/// Serve a gateway's router on an ephemeral loopback port.
///
/// The listener task runs until the test process exits; tests talk to the
/// returned address over real HTTP.
pub async fn spawn_gateway(gateway: &Gateway) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    let app = gateway.router();
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve gateway");
    });
    addr
}

/// One parsed server-sent event.
#[derive(Debug)]
pub struct SseEvent {
    pub event: String,
    pub data: String,
}

/// Incremental SSE parser over a reqwest byte stream.
pub struct SseReader<S> {
    stream: S,
    buf: String,
}

impl<S> SseReader<S>
where
    S: Stream<Item = reqwest::Result<Bytes>> + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            buf: String::new(),
        }
    }

    /// Read the next event, skipping keep-alive comments. Returns `None`
    /// once the server ends the stream.
    pub async fn next_event(&mut self) -> Option<SseEvent> {
        loop {
            if let Some(pos) = self.buf.find("\n\n") {
                let raw: String = self.buf.drain(..pos + 2).collect();
                let mut event = String::from("message");
                let mut data = String::new();
                let mut saw_field = false;

                for line in raw.lines() {
                    if let Some(rest) = line.strip_prefix("event:") {
                        event = rest.trim().to_string();
                        saw_field = true;
                    } else if let Some(rest) = line.strip_prefix("data:") {
                        if !data.is_empty() {
                            data.push('\n');
                        }
                        data.push_str(rest.trim());
                        saw_field = true;
                    }
                    // Lines starting with ':' are keep-alive comments.
                }

                if saw_field {
                    return Some(SseEvent { event, data });
                }
                continue;
            }

            let chunk = self.stream.next().await?.expect("sse stream error");
            self.buf.push_str(&String::from_utf8_lossy(&chunk));
        }
    }
}

/// Open an SSE stream against a running gateway and consume the initial
/// `endpoint` event. Returns the reader and the allocated session id.
pub async fn open_stream(
    client: &reqwest::Client,
    addr: SocketAddr,
) -> (SseReader<impl Stream<Item = reqwest::Result<Bytes>> + Unpin>, String) {
    let resp = client
        .get(format!("http://{addr}/stream"))
        .send()
        .await
        .expect("open stream");
    assert_eq!(resp.status(), 200, "stream open should succeed");

    let mut reader = SseReader::new(resp.bytes_stream());
    let endpoint = reader.next_event().await.expect("endpoint event");
    assert_eq!(endpoint.event, "endpoint");

    let payload: serde_json::Value =
        serde_json::from_str(&endpoint.data).expect("endpoint payload");
    let session_id = payload["session_id"]
        .as_str()
        .expect("session_id field")
        .to_string();

    (reader, session_id)
}
