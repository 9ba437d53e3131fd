//! End-to-end tests over a real TCP listener and WebSocket clients.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use seatcast_core::{Course, CourseUpdate};
use seatcast_server::config::ServerConfig;
use seatcast_server::{DispatchContext, HttpServer, StrategySelection};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct Harness {
    server: Arc<HttpServer>,
    dispatch: Arc<DispatchContext>,
    addr: SocketAddr,
    serve: JoinHandle<()>,
}

async fn start(strategy: &str, max_connections: usize) -> Harness {
    let server = Arc::new(HttpServer::new(ServerConfig {
        max_connections,
        ..ServerConfig::default()
    }));
    let dispatch = Arc::new(DispatchContext::new(StrategySelection::builtin(strategy)));
    dispatch.init(server.as_ref()).unwrap();

    let listener = server.bind().await.unwrap();
    let addr = listener.local_addr().unwrap();
    let serve = {
        let server = server.clone();
        let dispatch = dispatch.clone();
        tokio::spawn(async move {
            server.serve_on(listener, dispatch).await.unwrap();
        })
    };
    Harness {
        server,
        dispatch,
        addr,
        serve,
    }
}

async fn connect(addr: SocketAddr, query: &str) -> Client {
    let (ws, _resp) = connect_async(format!("ws://{addr}/ws{query}")).await.unwrap();
    ws
}

async fn next_event(ws: &mut Client) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("timed out waiting for frame")
            .expect("stream ended")
            .expect("websocket error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

async fn wait_until(mut cond: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not met in time");
}

#[tokio::test]
async fn first_frame_is_connection_established() {
    let h = start("observer", 10).await;
    let mut ws = connect(h.addr, "").await;

    let event = next_event(&mut ws).await;
    assert_eq!(event["type"], "connection.established");
    assert!(event["data"]["clientId"].as_str().unwrap().starts_with("conn_"));
}

#[tokio::test]
async fn observer_client_receives_course_update() {
    let h = start("observer", 10).await;
    let mut ws = connect(h.addr, "?userId=u1").await;
    let established = next_event(&mut ws).await;
    assert_eq!(established["type"], "connection.established");
    assert_eq!(h.dispatch.active_user_ids(), vec!["u1".to_string()]);

    h.dispatch.notify_course_update(&CourseUpdate {
        updated_course: Course::new("c1", "Yoga"),
        old_spots: 0,
        new_spots: 2,
    });

    let updated = next_event(&mut ws).await;
    assert_eq!(updated["type"], "course_updated");
    assert_eq!(updated["data"]["previousSeats"], 0);
    assert_eq!(updated["data"]["seatsAvailable"], 2);
    let reopened = next_event(&mut ws).await;
    assert_eq!(reopened["type"], "seats_available");
}

#[tokio::test]
async fn broadcast_client_receives_flattened_update_via_http() {
    let h = start("broadcast", 10).await;
    let mut ws = connect(h.addr, "").await;
    let _ = next_event(&mut ws).await;
    assert_eq!(h.server.transport().unwrap().registry().len(), 1);

    let mut stream = TcpStream::connect(h.addr).await.unwrap();
    let body = json!({
        "updatedCourse": {"id": 9, "title": "Spin"},
        "oldSpots": 4,
        "newSpots": 3
    })
    .to_string();
    let request = format!(
        "POST /notify/course-update HTTP/1.1\r\nHost: {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        h.addr,
        body.len(),
        body
    );
    tokio::io::AsyncWriteExt::write_all(&mut stream, request.as_bytes())
        .await
        .unwrap();
    let mut response = String::new();
    let _ = tokio::io::AsyncReadExt::read_to_string(&mut stream, &mut response)
        .await
        .unwrap();
    assert!(response.starts_with("HTTP/1.1 202"));

    let event = next_event(&mut ws).await;
    assert_eq!(event["type"], "course_updated");
    assert_eq!(
        event["data"],
        json!({"courseTitle": "Spin", "seatsAvailable": 3, "courseId": 9})
    );
}

#[tokio::test]
async fn disconnect_removes_identity() {
    let h = start("observer", 10).await;
    let mut ws = connect(h.addr, "?userId=u1").await;
    let _ = next_event(&mut ws).await;
    assert_eq!(h.dispatch.active_user_ids(), vec!["u1".to_string()]);

    ws.send(Message::Close(None)).await.unwrap();
    drop(ws);
    wait_until(|| h.dispatch.active_user_ids().is_empty()).await;
}

#[tokio::test]
async fn connection_limit_returns_503() {
    let h = start("observer", 1).await;
    let mut first = connect(h.addr, "").await;
    let _ = next_event(&mut first).await;

    let Err(err) = connect_async(format!("ws://{}/ws", h.addr)).await else {
        panic!("second client should be refused");
    };
    match err {
        tokio_tungstenite::tungstenite::Error::Http(resp) => {
            assert_eq!(resp.status().as_u16(), 503);
        }
        other => panic!("expected HTTP 503, got {other:?}"),
    }
}

#[tokio::test]
async fn shutdown_closes_sessions_and_stops_server() {
    let h = start("observer", 10).await;
    let mut ws = connect(h.addr, "").await;
    let _ = next_event(&mut ws).await;

    h.server.shutdown().shutdown();

    let closed = tokio::time::timeout(Duration::from_secs(2), async {
        while let Some(Ok(msg)) = ws.next().await {
            if msg.is_close() {
                break;
            }
        }
    })
    .await;
    assert!(closed.is_ok());
    tokio::time::timeout(Duration::from_secs(5), h.serve)
        .await
        .unwrap()
        .unwrap();
}
