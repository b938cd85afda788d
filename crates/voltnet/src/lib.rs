//! TCP transport for the charging network.
//!
//! Framing is newline-delimited JSON: one request object per line, one reply
//! object per line. TCP gives no message-boundary guarantee, so the transport
//! never assumes a whole request arrives in a single read; lines are
//! accumulated until the delimiter shows up.
//!
//! Every connection runs in its own task, but all handler execution happens
//! under one mutex around the network state. The reservation-uniqueness and
//! open-charge invariants span several records, so mutations must not
//! interleave.

use std::sync::{Arc, Mutex};

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use volt_core::NetworkState;
use volt_wire::{Router, default_router};

pub type SharedState = Arc<Mutex<NetworkState>>;

/// Accept connections forever, serving the full operation table against
/// `state`.
pub async fn serve(listener: TcpListener, state: NetworkState) -> std::io::Result<()> {
    let shared = Arc::new(Mutex::new(state));
    let router = Arc::new(default_router());
    loop {
        let (socket, peer) = listener.accept().await?;
        tracing::info!("client connected: {peer}");
        let shared = Arc::clone(&shared);
        let router = Arc::clone(&router);
        tokio::spawn(async move {
            if let Err(err) = handle_connection(socket, shared, router).await {
                tracing::error!("connection error: {err}");
            }
        });
    }
}

async fn handle_connection(
    socket: TcpStream,
    state: SharedState,
    router: Arc<Router>,
) -> std::io::Result<()> {
    let (reader, mut writer) = socket.into_split();
    let mut lines = BufReader::new(reader).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let reply = {
            let mut state = state.lock().unwrap();
            router.dispatch(&mut state, &line)
        };
        let mut out = serde_json::to_vec(&reply).expect("replies serialize to JSON");
        out.push(b'\n');
        writer.write_all(&out).await?;
    }
    tracing::debug!("client disconnected");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use volt_core::{NetworkConfig, Position, StationSeed};
    use volt_wire::Reply;

    async fn spawn_server() -> std::net::SocketAddr {
        let state = NetworkState::new(NetworkConfig {
            max_radius: 8000.0,
            stations: vec![StationSeed {
                id: 2,
                location: Position { x: 200, y: 50 },
            }],
        });
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve(listener, state));
        addr
    }

    async fn send(
        reader: &mut BufReader<tokio::net::tcp::OwnedReadHalf>,
        writer: &mut tokio::net::tcp::OwnedWriteHalf,
        request: Value,
    ) -> Reply {
        let mut out = request.to_string().into_bytes();
        out.push(b'\n');
        writer.write_all(&out).await.unwrap();
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        serde_json::from_str(&line).unwrap()
    }

    #[tokio::test]
    async fn serves_a_full_session_over_one_connection() {
        let addr = spawn_server().await;
        let socket = TcpStream::connect(addr).await.unwrap();
        let (read_half, mut writer) = socket.into_split();
        let mut reader = BufReader::new(read_half);

        let reply = send(
            &mut reader,
            &mut writer,
            json!({"type": "registerUser", "data": {"id": 7}}),
        )
        .await;
        assert!(reply.success);

        let reply = send(
            &mut reader,
            &mut writer,
            json!({"type": "reserve", "data": {"userId": 7, "stationId": 2}}),
        )
        .await;
        assert!(reply.success);

        let reply = send(
            &mut reader,
            &mut writer,
            json!({"type": "startCharging", "data": {"stationId": 2, "userId": 7, "battery_level": 50}}),
        )
        .await;
        assert!(reply.success);

        let reply = send(
            &mut reader,
            &mut writer,
            json!({"type": "endCharging", "data": {"stationId": 2, "userId": 7, "battery_level": 80}}),
        )
        .await;
        assert!(reply.success);
        let cost = reply.data.unwrap()["cost"].as_f64().unwrap();
        assert!((cost - 180.6).abs() < 1e-9);
    }

    #[tokio::test]
    async fn connections_share_one_network_state() {
        let addr = spawn_server().await;

        let first = TcpStream::connect(addr).await.unwrap();
        let (read_half, mut writer) = first.into_split();
        let mut reader = BufReader::new(read_half);
        let reply = send(
            &mut reader,
            &mut writer,
            json!({"type": "registerUser", "data": {"id": 7}}),
        )
        .await;
        assert!(reply.success);
        drop((reader, writer));

        // A second client sees the vehicle registered by the first.
        let second = TcpStream::connect(addr).await.unwrap();
        let (read_half, mut writer) = second.into_split();
        let mut reader = BufReader::new(read_half);
        let reply = send(
            &mut reader,
            &mut writer,
            json!({"type": "reserve", "data": {"userId": 7, "stationId": 2}}),
        )
        .await;
        assert!(reply.success);
    }

    #[tokio::test]
    async fn malformed_lines_get_an_error_reply_and_the_connection_survives() {
        let addr = spawn_server().await;
        let socket = TcpStream::connect(addr).await.unwrap();
        let (read_half, mut writer) = socket.into_split();
        let mut reader = BufReader::new(read_half);

        writer.write_all(b"{broken\n").await.unwrap();
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        let reply: Reply = serde_json::from_str(&line).unwrap();
        assert!(!reply.success);

        // The same connection still serves valid requests.
        let reply = send(
            &mut reader,
            &mut writer,
            json!({"type": "getStationInfo", "data": {"id": 2}}),
        )
        .await;
        assert!(reply.success);
    }
}
