//! WebSocket client transport
//!
//! Dials the central system with the `ocpp1.6` subprotocol and bridges the
//! socket to a pair of [`OcppFrame`] channels: frames pushed into
//! `outbound` are written as text messages, text messages read from the
//! socket come out of `inbound`.

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use crate::application::FrameSender;
use crate::domain::{SessionError, SessionResult};
use crate::support::ocpp_frame::OcppFrame;
use crate::support::shutdown::ShutdownSignal;

/// OCPP 1.6 WebSocket subprotocol
pub const OCPP_SUBPROTOCOL: &str = "ocpp1.6";

pub struct WsConnection {
    pub outbound: FrameSender,
    pub inbound: mpsc::UnboundedReceiver<OcppFrame>,
    /// Finishes once both pumps have stopped.
    pub pumps: JoinHandle<()>,
}

/// Open the socket at `url` and start the send and receive pumps.
pub async fn connect(url: &str, shutdown: ShutdownSignal) -> SessionResult<WsConnection> {
    let mut request = url
        .into_client_request()
        .map_err(|e| SessionError::Transport(format!("invalid url {}: {}", url, e)))?;
    request.headers_mut().insert(
        "Sec-WebSocket-Protocol",
        HeaderValue::from_static(OCPP_SUBPROTOCOL),
    );

    info!(url, "Connecting to central system");
    let (ws_stream, response) = tokio_tungstenite::connect_async(request)
        .await
        .map_err(|e| SessionError::Transport(format!("connect to {} failed: {}", url, e)))?;
    info!(
        url,
        status = %response.status(),
        protocol = ?response.headers().get("Sec-WebSocket-Protocol"),
        "Connected"
    );

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<OcppFrame>();
    let (inbound_tx, inbound) = mpsc::unbounded_channel::<OcppFrame>();

    let send_shutdown = shutdown.clone();
    let send_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                frame = outbound_rx.recv() => {
                    let Some(frame) = frame else { break };
                    let text = frame.serialize();
                    debug!("-> {}", text);
                    if let Err(e) = ws_sender.send(Message::Text(text)).await {
                        error!("Send error: {}", e);
                        break;
                    }
                }
                _ = send_shutdown.wait() => break,
            }
        }
        let _ = ws_sender.send(Message::Close(None)).await;
    });

    let recv_task = tokio::spawn(async move {
        loop {
            let msg = tokio::select! {
                msg = ws_receiver.next() => msg,
                _ = shutdown.wait() => break,
            };
            match msg {
                Some(Ok(Message::Text(text))) => {
                    debug!("<- {}", text);
                    match OcppFrame::parse(&text) {
                        Ok(frame) => {
                            if inbound_tx.send(frame).is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!(error = %e, "Skipping unparseable frame"),
                    }
                }
                Some(Ok(Message::Ping(_))) => debug!("Ping received"),
                Some(Ok(Message::Pong(_))) => debug!("Pong received"),
                Some(Ok(Message::Close(frame))) => {
                    info!("Close frame received: {:?}", frame);
                    break;
                }
                Some(Ok(Message::Binary(data))) => {
                    warn!("Binary message received ({} bytes), ignoring", data.len());
                }
                Some(Ok(Message::Frame(_))) => {}
                Some(Err(e)) => {
                    error!("WebSocket error: {}", e);
                    break;
                }
                None => break,
            }
        }
    });

    let pumps = tokio::spawn(async move {
        let send_abort = send_task.abort_handle();
        let _ = recv_task.await;
        // The receiver is gone; give the sender a moment to flush a close.
        if tokio::time::timeout(std::time::Duration::from_secs(1), send_task)
            .await
            .is_err()
        {
            send_abort.abort();
        }
        info!("Disconnected");
    });

    Ok(WsConnection {
        outbound,
        inbound,
        pumps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::net::TcpListener;
    use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};

    #[tokio::test]
    async fn frames_cross_the_socket_both_ways() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut path = String::new();
            let mut protocol = String::new();
            let mut ws = tokio_tungstenite::accept_hdr_async(
                stream,
                |req: &Request, mut response: Response| {
                    path = req.uri().path().to_string();
                    protocol = req
                        .headers()
                        .get("Sec-WebSocket-Protocol")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("")
                        .to_string();
                    response.headers_mut().insert(
                        "Sec-WebSocket-Protocol",
                        HeaderValue::from_static(OCPP_SUBPROTOCOL),
                    );
                    Ok(response)
                },
            )
            .await
            .unwrap();

            let received = match ws.next().await {
                Some(Ok(Message::Text(text))) => text,
                other => panic!("Expected text frame, got {:?}", other),
            };
            ws.send(Message::Text("not a frame".to_string())).await.unwrap();
            ws.send(Message::Text(
                r#"[3,"m-1",{"currentTime":"2024-01-01T00:00:00Z"}]"#.to_string(),
            ))
            .await
            .unwrap();
            ws.close(None).await.unwrap();
            (path, protocol, received)
        });

        let url = format!("ws://127.0.0.1:{}/ocpp/CP_1", port);
        let mut conn = connect(&url, ShutdownSignal::new()).await.unwrap();
        conn.outbound
            .send(OcppFrame::call("m-1", "Heartbeat", json!({})))
            .unwrap();

        let reply = conn.inbound.recv().await.unwrap();
        assert_eq!(
            reply,
            OcppFrame::result("m-1", json!({"currentTime": "2024-01-01T00:00:00Z"}))
        );
        // Closed by the server: the inbound channel ends.
        assert!(conn.inbound.recv().await.is_none());

        let (path, protocol, received) = server.await.unwrap();
        assert_eq!(path, "/ocpp/CP_1");
        assert_eq!(protocol, OCPP_SUBPROTOCOL);
        assert_eq!(
            OcppFrame::parse(&received).unwrap(),
            OcppFrame::call("m-1", "Heartbeat", json!({}))
        );
    }

    #[tokio::test]
    async fn unreachable_central_system_is_a_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let url = format!("ws://127.0.0.1:{}/CP_1", port);
        let err = connect(&url, ShutdownSignal::new()).await.err().unwrap();
        assert!(err.is_fatal());
    }
}
