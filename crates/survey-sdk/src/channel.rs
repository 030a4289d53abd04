//! Live mission channel over WebSocket.

use anyhow::Result;
use futures_util::{SinkExt, StreamExt};
use survey_core::{ClientEvent, PositionUpdate, ServerEvent};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// Connection to the server's `/ws` endpoint.
pub struct MissionChannel {
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl MissionChannel {
    pub async fn connect(url: &str) -> Result<Self> {
        let (socket, _) = connect_async(url).await?;
        tracing::debug!("Connected live channel at {}", url);
        Ok(Self { socket })
    }

    /// Start receiving positions for a mission.
    pub async fn join(&mut self, mission_id: &str) -> Result<()> {
        self.send(&ClientEvent::JoinMission(mission_id.to_string())).await
    }

    pub async fn leave(&mut self, mission_id: &str) -> Result<()> {
        self.send(&ClientEvent::LeaveMission(mission_id.to_string())).await
    }

    /// Relay a drone position to every observer of its mission.
    pub async fn publish(&mut self, update: PositionUpdate) -> Result<()> {
        self.send(&ClientEvent::DroneUpdate(update)).await
    }

    /// Ask the operator assistant a question; the answer arrives as a
    /// `ServerEvent::ChatResponse`.
    pub async fn chat(&mut self, message: &str) -> Result<()> {
        self.send(&ClientEvent::ChatMessage(message.to_string())).await
    }

    pub async fn send(&mut self, event: &ClientEvent) -> Result<()> {
        let text = serde_json::to_string(event)?;
        self.socket.send(Message::Text(text)).await?;
        Ok(())
    }

    /// Read the next server event (returns None on close).
    pub async fn next_event(&mut self) -> Result<Option<ServerEvent>> {
        while let Some(msg) = self.socket.next().await {
            match msg? {
                Message::Text(text) => match serde_json::from_str(&text) {
                    Ok(event) => return Ok(Some(event)),
                    Err(err) => tracing::warn!("Skipping unreadable server frame: {}", err),
                },
                Message::Close(_) => return Ok(None),
                _ => {}
            }
        }
        Ok(None)
    }

    pub async fn close(mut self) -> Result<()> {
        self.socket.close(None).await?;
        Ok(())
    }
}
