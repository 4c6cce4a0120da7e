use std::future::Future;

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;

use crate::transport::{ControlTransport, TransportConn, TransportEvent, ABNORMAL_CLOSE};

/// Real WebSocket transport to the vehicle.
#[derive(Debug, Default)]
pub struct WsTransport;

pub struct WsConn {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl ControlTransport for WsTransport {
    type Conn = WsConn;

    fn connect(&mut self, url: &str) -> impl Future<Output = Result<Self::Conn>> + Send {
        let url = url.to_string();
        async move {
            let (stream, _resp) = connect_async(&url)
                .await
                .with_context(|| format!("connect {}", url))?;
            debug!("ws: connected to {}", url);
            Ok(WsConn { stream })
        }
    }
}

impl TransportConn for WsConn {
    fn send(&mut self, text: &str) -> impl Future<Output = Result<()>> + Send {
        let msg = Message::Text(text.to_string());
        async move { self.stream.send(msg).await.context("ws send") }
    }

    fn next_event(&mut self) -> impl Future<Output = TransportEvent> + Send {
        async move {
            loop {
                match self.stream.next().await {
                    Some(Ok(Message::Text(t))) => return TransportEvent::Message(t),
                    Some(Ok(Message::Binary(b))) => {
                        return TransportEvent::Message(String::from_utf8_lossy(&b).into_owned())
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let (code, reason) = match frame {
                            Some(f) => (u16::from(f.code), f.reason.into_owned()),
                            None => (ABNORMAL_CLOSE, String::new()),
                        };
                        return TransportEvent::Closed { code, reason };
                    }
                    // keepalive frames are transport noise
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        return TransportEvent::Closed {
                            code: ABNORMAL_CLOSE,
                            reason: e.to_string(),
                        }
                    }
                    None => {
                        return TransportEvent::Closed {
                            code: ABNORMAL_CLOSE,
                            reason: "stream ended".to_string(),
                        }
                    }
                }
            }
        }
    }

    fn close(&mut self, code: u16) -> impl Future<Output = ()> + Send {
        async move {
            let frame = CloseFrame {
                code: CloseCode::from(code),
                reason: "".into(),
            };
            let _ = self.stream.close(Some(frame)).await;
        }
    }
}
