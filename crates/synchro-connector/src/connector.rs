//! The translation connector node (C9, `converter_seamless` NodeSpec).
//!
//! Holds a long-lived full-duplex session to a remote streaming translation
//! model over a plain-WebSocket JSON event envelope (§4.10 ADDED note: the
//! original rides on `python-socketio`; this workspace speaks a minimal
//! `{"event": name, "data": ...}` framing instead, documented in
//! `DESIGN.md`'s Open Question 7). Only `ws://` endpoints are supported - no
//! TLS connector crate is part of this workspace's dependency family.

use std::net::TcpStream;
use std::time::{Duration, Instant};

use base64::Engine as _;
use serde::Deserialize;
use serde_json::json;
use tungstenite::{Message, WebSocket};
use url::Url;
use uuid::Uuid;

use synchro_core::{AudioFormat, Contextual, Emitter, Event, EventBus, Frame, LifecycleResult, Receiver, StreamConfig};

use crate::error::{Error, Result};
use crate::languages::to_remote_tag;

/// Connector session state (§4.10: `DISCONNECTED -> CONNECTING -> READY <-> ERROR`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectorState {
    /// No session; terminal state after `release`.
    Disconnected,
    /// Handshake in progress.
    Connecting,
    /// Handshake complete, ready to send/receive audio.
    Ready,
    /// A send, receive, or protocol error occurred; the session is unusable
    /// until the node is re-acquired.
    Error,
}

/// Per-message poll budget for `emit`'s drain loop (§4.10 step 3: "~10 ms").
const POLL_BUDGET: Duration = Duration::from_millis(10);

/// `payload` sample amplitude → INT16 conversion factor (§4.10 step 3).
const INT16_MAX: f32 = 32767.0;

#[derive(Deserialize)]
struct TranslationSpeech {
    sample_rate: u32,
    payload: Vec<f32>,
}

/// A receiver-emitter node holding a session to a remote translation model.
pub struct SeamlessConnector {
    name: String,
    server_url: String,
    lang_from: String,
    lang_to: String,
    user_id: String,
    room_id: String,
    state: ConnectorState,
    socket: Option<WebSocket<TcpStream>>,
    /// Set once `configure_stream` has been sent (deferred until the input
    /// rate is known from the first `receive`d Frame - see module docs on
    /// `acquire`).
    stream_configured: bool,
    input_rate: Option<u32>,
    pending_out: Vec<u8>,
    accumulator: Vec<u8>,
    events: Option<EventBus>,
}

impl SeamlessConnector {
    /// Builds a connector for a `server_url` translating `lang_from -> lang_to`.
    /// Language validity against `LANGUAGES_MAP` is checked in `acquire`, not
    /// here, matching the original's behavior of failing inside `__enter__`.
    #[must_use]
    pub fn new(name: impl Into<String>, server_url: impl Into<String>, lang_from: impl Into<String>, lang_to: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            server_url: server_url.into(),
            lang_from: lang_from.into(),
            lang_to: lang_to.into(),
            user_id: Uuid::new_v4().to_string(),
            room_id: Uuid::new_v4().to_string()[..4].to_string(),
            state: ConnectorState::Disconnected,
            socket: None,
            stream_configured: false,
            input_rate: None,
            pending_out: Vec::new(),
            accumulator: Vec::new(),
            events: None,
        }
    }

    /// Wires this connector to the graph's event bus (C12); lifecycle
    /// transitions are published as `connector.state` events.
    #[must_use]
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// Current session state.
    #[must_use]
    pub fn state(&self) -> ConnectorState {
        self.state
    }

    /// True only while `READY` (§4.10 ADDED note: the original's
    /// `is_active()` has a `raise self._client.connected` bug that would
    /// always raise rather than return; not reproduced here).
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == ConnectorState::Ready
    }

    fn publish(&self, action: &str) {
        if let Some(events) = &self.events {
            events.publish(Event::new(self.name.clone(), "connector.state", action));
        }
    }

    fn dial(&self) -> Result<WebSocket<TcpStream>> {
        let raw = format!("{}/?clientID={}", self.server_url, self.user_id);
        let parsed = Url::parse(&raw).map_err(|e| Error::Connect {
            url: raw.clone(),
            reason: format!("invalid url: {e}"),
        })?;
        let host = parsed.host_str().ok_or_else(|| Error::Connect {
            url: raw.clone(),
            reason: "missing host".to_string(),
        })?;
        let port = parsed.port_or_known_default().unwrap_or(80);
        let stream = TcpStream::connect((host, port)).map_err(|e| Error::Connect {
            url: raw.clone(),
            reason: e.to_string(),
        })?;
        let (socket, _response) = tungstenite::client::client(raw.clone(), stream).map_err(|e| Error::Connect {
            url: raw,
            reason: e.to_string(),
        })?;
        Ok(socket)
    }

    /// Connects and sends `join_room` + `set_dynamic_config` (§4.10 step 1).
    /// `configure_stream` is deferred to the first `receive`d Frame, since
    /// `converter_seamless`'s NodeSpec carries no rate field - unlike the
    /// original, which gets it from a constructor-injected `input_config`,
    /// this graph only learns a node's upstream rate from its first Frame.
    fn handshake(&mut self, remote_lang_to: &str) -> Result<WebSocket<TcpStream>> {
        let mut socket = self.dial()?;

        let join_room = json!([
            self.user_id.clone(),
            self.room_id.clone(),
            { "roles": ["speaker", "listener"], "lockServerName": serde_json::Value::Null },
        ]);
        let envelope = json!({ "event": "join_room", "data": join_room }).to_string();
        socket.send(Message::Text(envelope.into())).map_err(|e| Error::Protocol(e.to_string()))?;

        let set_dynamic_config = json!({ "target_language": remote_lang_to, "expressive": serde_json::Value::Null });
        let envelope = json!({ "event": "set_dynamic_config", "data": set_dynamic_config }).to_string();
        socket.send(Message::Text(envelope.into())).map_err(|e| Error::Protocol(e.to_string()))?;

        Ok(socket)
    }

    fn send_event(&mut self, event: &str, data: serde_json::Value) -> Result<()> {
        let Some(socket) = self.socket.as_mut() else {
            return Err(Error::Protocol("send on a disconnected session".to_string()));
        };
        let envelope = json!({ "event": event, "data": data }).to_string();
        socket.send(Message::Text(envelope.into())).map_err(|e| Error::Protocol(e.to_string()))
    }

    fn configure_stream(&mut self, rate: u32) -> Result<()> {
        self.send_event(
            "configure_stream",
            json!({
                "event": "config",
                "rate": rate,
                "model_name": "SeamlessStreaming",
                "model_type": "s2s&t",
                "debug": false,
                "async_processing": true,
                "buffer_limit": 1,
            }),
        )?;
        self.stream_configured = true;
        tracing::debug!(node = %self.name, rate, "connector: configured stream");
        Ok(())
    }

    fn drain_pending(&mut self) -> Result<()> {
        if self.pending_out.is_empty() {
            return Ok(());
        }
        let payload = base64::engine::general_purpose::STANDARD.encode(&self.pending_out);
        self.send_event("incoming_audio", json!(payload))?;
        tracing::debug!(node = %self.name, bytes = self.pending_out.len(), "connector: sent audio chunk");
        self.pending_out.clear();
        Ok(())
    }

    fn handle_message(&mut self, message: Message) -> Result<()> {
        match message {
            Message::Text(text) => {
                let value: serde_json::Value = serde_json::from_str(text.as_str()).map_err(|e| Error::Protocol(e.to_string()))?;
                let event = value.get("event").and_then(serde_json::Value::as_str).unwrap_or_default();
                if event != "translation_speech" {
                    tracing::debug!(node = %self.name, event, "connector: ignoring non-audio message");
                    return Ok(());
                }
                let data = value.get("data").cloned().unwrap_or(serde_json::Value::Null);
                let speech: TranslationSpeech = serde_json::from_value(data).map_err(|e| Error::Protocol(e.to_string()))?;
                for sample in speech.payload {
                    let clamped = sample.clamp(-1.0, 1.0);
                    let int16 = (clamped * INT16_MAX).round() as i16;
                    self.accumulator.extend_from_slice(&int16.to_le_bytes());
                }
                tracing::debug!(node = %self.name, sample_rate = speech.sample_rate, "connector: received translation_speech");
                Ok(())
            }
            Message::Close(_) => {
                self.state = ConnectorState::Disconnected;
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

impl std::fmt::Display for SeamlessConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SeamlessConnector({} -> {})", self.lang_from, self.lang_to)
    }
}

impl Contextual for SeamlessConnector {
    fn acquire(&mut self) -> LifecycleResult {
        self.state = ConnectorState::Connecting;
        self.publish("connecting");

        if to_remote_tag(&self.lang_to).is_none() {
            self.state = ConnectorState::Error;
            self.publish("error");
            return Err(Box::new(Error::UnsupportedLanguage(self.lang_to.clone())));
        }
        let remote_lang_to = to_remote_tag(&self.lang_to).unwrap().to_string();

        match self.handshake(&remote_lang_to) {
            Ok(socket) => {
                self.socket = Some(socket);
                self.state = ConnectorState::Ready;
                self.publish("ready");
                tracing::info!(node = %self.name, room = %self.room_id, "connector: joined room, awaiting first frame to configure stream");
                Ok(())
            }
            Err(e) => {
                self.state = ConnectorState::Error;
                self.publish("error");
                Err(Box::new(e) as Box<dyn std::error::Error + Send + Sync>)
            }
        }
    }

    fn release(&mut self) {
        if let Some(mut socket) = self.socket.take() {
            let _ = socket.close(None);
        }
        self.state = ConnectorState::Disconnected;
        self.stream_configured = false;
        self.publish("disconnected");
        tracing::info!(node = %self.name, "connector: disconnected");
    }
}

impl Receiver for SeamlessConnector {
    fn receive(&mut self, _source: &str, frame: Frame) {
        if self.state != ConnectorState::Ready || frame.is_empty() {
            return;
        }

        if self.input_rate.is_none() {
            self.input_rate = Some(frame.config().sample_rate_hz);
        }
        if !self.stream_configured {
            let rate = self.input_rate.unwrap();
            if let Err(e) = self.configure_stream(rate) {
                tracing::warn!(node = %self.name, error = %e, "connector: failed to configure stream");
                self.state = ConnectorState::Error;
                self.publish("error");
                return;
            }
        }

        self.pending_out.extend_from_slice(&frame.to_pcm16_le());
        if let Err(e) = self.drain_pending() {
            tracing::warn!(node = %self.name, error = %e, "connector: failed to send audio");
            self.state = ConnectorState::Error;
            self.publish("error");
        }
    }
}

impl Emitter for SeamlessConnector {
    fn emit(&mut self) -> Option<Frame> {
        if self.state != ConnectorState::Ready {
            return None;
        }

        let deadline = Instant::now() + POLL_BUDGET;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            let Some(socket) = self.socket.as_mut() else { break };
            if socket.get_ref().set_read_timeout(Some(remaining)).is_err() {
                break;
            }
            match socket.read() {
                Ok(message) => {
                    if let Err(e) = self.handle_message(message) {
                        tracing::warn!(node = %self.name, error = %e, "connector: dropping malformed message");
                    }
                    if self.state != ConnectorState::Ready {
                        break;
                    }
                }
                Err(tungstenite::Error::Io(ref e))
                    if e.kind() == std::io::ErrorKind::WouldBlock || e.kind() == std::io::ErrorKind::TimedOut =>
                {
                    break;
                }
                Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                    self.state = ConnectorState::Disconnected;
                    self.publish("disconnected");
                    break;
                }
                Err(e) => {
                    tracing::warn!(node = %self.name, error = %e, "connector: read error");
                    self.state = ConnectorState::Error;
                    self.publish("error");
                    break;
                }
            }
        }

        if self.accumulator.is_empty() {
            return None;
        }
        let remote_lang_to = to_remote_tag(&self.lang_to).unwrap_or(&self.lang_to);
        let config = StreamConfig {
            audio_format: AudioFormat::Int16,
            sample_rate_hz: self.input_rate.unwrap_or(16000),
            channels: 1,
            language_tag: Some(remote_lang_to.to_string()),
        };
        let payload = std::mem::take(&mut self.accumulator);
        Frame::new(config, payload).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_connector_starts_disconnected() {
        let c = SeamlessConnector::new("conn", "ws://localhost:9999", "en", "ru");
        assert_eq!(c.state(), ConnectorState::Disconnected);
        assert!(!c.is_active());
    }

    #[test]
    fn emit_before_acquire_yields_nothing() {
        let mut c = SeamlessConnector::new("conn", "ws://localhost:9999", "en", "ru");
        assert!(c.emit().is_none());
    }

    #[test]
    fn receive_before_acquire_is_a_no_op() {
        let mut c = SeamlessConnector::new("conn", "ws://localhost:9999", "en", "ru");
        let cfg = StreamConfig::mono(AudioFormat::Int16, 16000);
        c.receive("in", Frame::new(cfg, vec![0, 0, 1, 0]).unwrap());
        assert!(c.pending_out.is_empty());
    }

    #[test]
    fn acquire_fails_fast_for_unsupported_language() {
        let mut c = SeamlessConnector::new("conn", "ws://127.0.0.1:1", "en", "fr");
        let err = c.acquire();
        assert!(err.is_err());
        assert_eq!(c.state(), ConnectorState::Error);
    }
}
