//! # WebSocket Session Transport
//!
//! Clients connect to `/ws` and exchange one utterance (binary) or one query
//! (text) per message. Each connection is an independent actor that owns a
//! [`SessionHandler`] for its registered session.
//!
//! ## Ordering:
//! A message is processed inside `ctx.wait`, which suspends the actor until the
//! future completes. The next frame is not read before all replies for the
//! current one have been written, so replies never interleave.
//!
//! ## Message Size:
//! The frame limit of the codec is raised to the audio limit plus some headroom,
//! so any utterance the handler accepts fits in a single frame. A larger frame
//! is dropped by the codec and answered with an error; the session stays open.
//! Fragmented messages are reassembled here and held to the audio limit.
//!
//! ## Lifecycle:
//! 1. **Upgrade**: The session is registered; refused with 503 when full
//! 2. **Frames**: Text and binary messages go to the handler, control frames are
//!    answered here
//! 3. **Heartbeat**: The server pings periodically and closes silent clients.
//!    Pings are not answered while a decode is running, which is why the decode
//!    timeout must stay below the client timeout
//! 4. **Stop**: Close frame, protocol error or timeout; the session is deregistered

use crate::config::AppConfig;
use crate::error::SessionError;
use crate::session::{InboundFrame, OutboundMessage, SessionHandler, SessionRegistry};
use crate::state::AppState;
use actix::prelude::*;
use actix_http::ws::Item;
use actix_web::{web, HttpRequest, HttpResponse, Result as ActixResult};
use actix_web_actors::ws;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Room for framing and a text message next to the largest accepted utterance.
const FRAME_HEADROOM: usize = 64 * 1024;

/// Largest single frame the codec accepts for the given configuration.
pub fn max_frame_size(config: &AppConfig) -> usize {
    config.speech.max_audio_bytes.saturating_add(FRAME_HEADROOM)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FragmentKind {
    Text,
    Binary,
}

/// A fragmented message being collected.
#[derive(Debug)]
struct Fragments {
    kind: FragmentKind,
    data: Vec<u8>,
    /// Bytes received so far, including anything dropped over the limit
    total: usize,
}

impl Fragments {
    fn new(kind: FragmentKind) -> Self {
        Self {
            kind,
            data: Vec::new(),
            total: 0,
        }
    }

    /// Append a fragment; past `limit` the data is discarded and only counted.
    fn push(&mut self, chunk: &[u8], limit: usize) {
        self.total = self.total.saturating_add(chunk.len());
        if self.total > limit {
            self.data = Vec::new();
        } else {
            self.data.extend_from_slice(chunk);
        }
    }

    /// One of the fragments was too large for the codec.
    fn overflow(&mut self) {
        self.total = usize::MAX;
        self.data = Vec::new();
    }

    fn into_frame(self, limit: usize) -> Result<InboundFrame, SessionError> {
        if self.total > limit {
            return Err(SessionError::DecodeFailure(format!(
                "Fragmented message exceeds the limit of {} bytes",
                limit
            )));
        }

        match self.kind {
            FragmentKind::Binary => Ok(InboundFrame::Audio(self.data)),
            FragmentKind::Text => String::from_utf8(self.data)
                .map(InboundFrame::Text)
                .map_err(|_| SessionError::MalformedFrame("text message is not valid UTF-8".to_string())),
        }
    }
}

/// Actor serving one WebSocket connection.
pub struct WeatherSocket {
    handler: SessionHandler,
    registry: SessionRegistry,
    /// Last time anything was heard from the client
    last_heartbeat: Instant,
    heartbeat_interval: Duration,
    client_timeout: Duration,
    /// Fragmented message in progress, if any
    fragments: Option<Fragments>,
    max_message_bytes: usize,
    max_frame_bytes: usize,
}

impl WeatherSocket {
    pub fn new(session_id: Uuid, state: &AppState) -> Self {
        let config = state.get_config();

        Self {
            handler: SessionHandler::new(session_id, state.clone()),
            registry: state.registry.clone(),
            last_heartbeat: Instant::now(),
            heartbeat_interval: Duration::from_secs(config.websocket.heartbeat_interval_secs),
            client_timeout: Duration::from_secs(config.websocket.client_timeout_secs),
            fragments: None,
            max_message_bytes: config.speech.max_audio_bytes,
            max_frame_bytes: max_frame_size(&config),
        }
    }

    fn session_id(&self) -> Uuid {
        self.handler.session_id()
    }

    /// Process `frame` and write its replies before the next frame is read.
    fn dispatch(&mut self, frame: InboundFrame, ctx: &mut ws::WebsocketContext<Self>) {
        let handler = self.handler.clone();

        ctx.wait(
            async move { handler.respond(frame).await }
                .into_actor(self)
                .map(|messages, act, ctx| {
                    // The client may have waited on a long decode
                    act.last_heartbeat = Instant::now();
                    for message in &messages {
                        send_message(ctx, message);
                    }
                }),
        );
    }

    fn reject(&self, err: SessionError, ctx: &mut ws::WebsocketContext<Self>) {
        let message = self.handler.reject(err);
        send_message(ctx, &message);
    }

    /// Collect a fragmented message and dispatch it once the last fragment arrives.
    fn reassemble(&mut self, item: Item, ctx: &mut ws::WebsocketContext<Self>) {
        let (chunk, last) = match item {
            Item::FirstText(data) => {
                self.fragments = Some(Fragments::new(FragmentKind::Text));
                (data, false)
            }
            Item::FirstBinary(data) => {
                self.fragments = Some(Fragments::new(FragmentKind::Binary));
                (data, false)
            }
            Item::Continue(data) => (data, false),
            Item::Last(data) => (data, true),
        };

        let Some(fragments) = self.fragments.as_mut() else {
            let err = SessionError::MalformedFrame("continuation without a first fragment".to_string());
            self.reject(err, ctx);
            return;
        };
        fragments.push(&chunk, self.max_message_bytes);

        if !last {
            return;
        }

        if let Some(fragments) = self.fragments.take() {
            debug!(
                session = %self.session_id(),
                kind = ?fragments.kind,
                "Reassembled {} bytes",
                fragments.total
            );
            match fragments.into_frame(self.max_message_bytes) {
                Ok(frame) => self.dispatch(frame, ctx),
                Err(err) => self.reject(err, ctx),
            }
        }
    }

    fn start_heartbeat(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(self.heartbeat_interval, |act, ctx| {
            if Instant::now().duration_since(act.last_heartbeat) > act.client_timeout {
                warn!(session = %act.session_id(), "WebSocket heartbeat timeout, closing connection");
                ctx.stop();
                return;
            }

            ctx.ping(b"");
        });
    }
}

fn send_message(ctx: &mut ws::WebsocketContext<WeatherSocket>, message: &OutboundMessage) {
    match serde_json::to_string(message) {
        Ok(json) => ctx.text(json),
        Err(err) => error!("Failed to serialize outbound message: {}", err),
    }
}

impl Actor for WeatherSocket {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        info!(session = %self.session_id(), "WebSocket session opened");
        self.start_heartbeat(ctx);
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        if self.registry.deregister(&self.session_id()).is_some() {
            info!(
                session = %self.session_id(),
                "WebSocket session closed ({} still open)",
                self.registry.len()
            );
        }
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WeatherSocket {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        self.last_heartbeat = Instant::now();

        match msg {
            Ok(ws::Message::Text(text)) => {
                self.dispatch(InboundFrame::Text(text.to_string()), ctx);
            }
            Ok(ws::Message::Binary(data)) => {
                self.dispatch(InboundFrame::Audio(data.to_vec()), ctx);
            }
            Ok(ws::Message::Continuation(item)) => {
                self.reassemble(item, ctx);
            }
            Ok(ws::Message::Ping(data)) => {
                ctx.pong(&data);
            }
            Ok(ws::Message::Pong(_)) => {}
            Ok(ws::Message::Close(reason)) => {
                debug!(session = %self.session_id(), "Client closed connection: {:?}", reason);
                ctx.close(reason);
                ctx.stop();
            }
            Ok(ws::Message::Nop) => {}
            // The codec has already skipped the oversized payload
            Err(ws::ProtocolError::Overflow) => match self.fragments.as_mut() {
                Some(fragments) => fragments.overflow(),
                None => {
                    let err = SessionError::DecodeFailure(format!(
                        "Frame exceeds the limit of {} bytes",
                        self.max_frame_bytes
                    ));
                    self.reject(err, ctx);
                }
            },
            Err(err) => {
                error!(session = %self.session_id(), "WebSocket protocol error: {}", err);
                ctx.stop();
            }
        }
    }
}

/// WebSocket endpoint handler.
///
/// The session is registered before the upgrade so a full server answers with
/// 503 instead of accepting and then dropping the connection.
pub async fn weather_websocket(
    req: HttpRequest,
    stream: web::Payload,
    app_state: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    let peer = req.connection_info().peer_addr().map(str::to_string);
    info!("New WebSocket connection request from: {:?}", peer);

    let session_id = app_state.registry.register(peer)?;
    let socket = WeatherSocket::new(session_id, &app_state);
    let frame_size = socket.max_frame_bytes;

    ws::WsResponseBuilder::new(socket, &req, stream)
        .frame_size(frame_size)
        .start()
        .map_err(|err| {
            warn!("WebSocket handshake failed: {}", err);
            app_state.registry.deregister(&session_id);
            err
        })
}
