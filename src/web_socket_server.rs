use std::time::{Duration, Instant};

use actix::prelude::*;
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use log::{debug, error, warn};
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::chat_server::{
    AddUser, ChatDraft, ChatServer, Connect, Disconnect, LastMessage, MarkSeen, RelayEvent,
    SeenReceipt, SendMessage, UpdateLastMessage,
};

/// Largest frame accepted from a client (chat images travel inline).
pub const MAX_FRAME_SIZE: usize = 5 * 1024 * 1024;
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Events a client may send, as `{"event": ..., "data": ...}` text frames.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    AddUser(String),
    SendMessage(ChatDraft),
    MessageSeen(SeenReceipt),
    UpdateLastMessage(LastMessage),
}

#[derive(Debug, Error, PartialEq)]
pub enum FragmentError {
    #[error("continuation frame without a first frame")]
    Orphan,
    #[error("fragmented message exceeds {max} bytes", max = MAX_FRAME_SIZE)]
    TooLarge,
    #[error("binary messages are not supported")]
    Binary,
    #[error("fragmented text is not valid UTF-8")]
    Utf8,
}

#[derive(Debug, Default)]
enum Fragments {
    #[default]
    Idle,
    Text(Vec<u8>),
    Binary,
}

impl Fragments {
    /// Feeds one continuation frame; yields the text once the last fragment
    /// arrives. Any error resets the buffer.
    fn push(&mut self, item: actix_http::ws::Item) -> Result<Option<String>, FragmentError> {
        let state = std::mem::take(self);
        let (mut buf, chunk, last) = match (state, item) {
            (_, actix_http::ws::Item::FirstText(chunk)) => (Vec::new(), chunk, false),
            (_, actix_http::ws::Item::FirstBinary(_)) => {
                *self = Fragments::Binary;
                return Ok(None);
            }
            (Fragments::Binary, actix_http::ws::Item::Continue(_)) => {
                *self = Fragments::Binary;
                return Ok(None);
            }
            (Fragments::Binary, actix_http::ws::Item::Last(_)) => return Err(FragmentError::Binary),
            (Fragments::Idle, _) => return Err(FragmentError::Orphan),
            (Fragments::Text(buf), actix_http::ws::Item::Continue(chunk)) => (buf, chunk, false),
            (Fragments::Text(buf), actix_http::ws::Item::Last(chunk)) => (buf, chunk, true),
        };

        if buf.len() + chunk.len() > MAX_FRAME_SIZE {
            return Err(FragmentError::TooLarge);
        }
        buf.extend_from_slice(&chunk);
        if !last {
            *self = Fragments::Text(buf);
            return Ok(None);
        }
        String::from_utf8(buf)
            .map(Some)
            .map_err(|_| FragmentError::Utf8)
    }
}

pub struct WebSocketConnection {
    pub id: String,
    pub hb: Instant,
    pub addr: Addr<ChatServer>,
    fragments: Fragments,
}

impl WebSocketConnection {
    pub fn new(addr: Addr<ChatServer>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            hb: Instant::now(),
            addr,
            fragments: Fragments::Idle,
        }
    }

    fn hb(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.hb) > CLIENT_TIMEOUT {
                warn!("WebSocket client {} heartbeat failed, disconnecting.", act.id);
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }

    fn on_text(&self, text: &str) {
        match serde_json::from_str::<ClientEvent>(text) {
            Ok(event) => self.dispatch(event),
            Err(e) => debug!("Failed to parse client event: {}", e),
        }
    }

    fn dispatch(&self, event: ClientEvent) {
        match event {
            ClientEvent::AddUser(user_id) => self.addr.do_send(AddUser {
                socket_id: self.id.clone(),
                user_id,
            }),
            ClientEvent::SendMessage(draft) => self.addr.do_send(SendMessage {
                socket_id: self.id.clone(),
                draft,
            }),
            ClientEvent::MessageSeen(receipt) => self.addr.do_send(MarkSeen { receipt }),
            ClientEvent::UpdateLastMessage(update) => {
                self.addr.do_send(UpdateLastMessage { update })
            }
        }
    }
}

impl Actor for WebSocketConnection {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        self.hb(ctx);

        self.addr
            .send(Connect {
                socket_id: self.id.clone(),
                addr: ctx.address().recipient(),
            })
            .into_actor(self)
            .then(|res, _act, ctx| {
                if res.is_err() {
                    error!("Failed to register with chat server.");
                    ctx.stop();
                }
                fut::ready(())
            })
            .wait(ctx);
    }

    fn stopped(&mut self, _: &mut Self::Context) {
        self.addr.do_send(Disconnect {
            socket_id: self.id.clone(),
        });
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WebSocketConnection {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                self.hb = Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.hb = Instant::now();
            }
            Ok(ws::Message::Text(text)) => self.on_text(&text),
            Ok(ws::Message::Continuation(item)) => match self.fragments.push(item) {
                Ok(Some(text)) => self.on_text(&text),
                Ok(None) => {}
                Err(FragmentError::TooLarge) => {
                    warn!("WebSocket client {} sent an oversized message.", self.id);
                    ctx.close(Some(ws::CloseCode::Size.into()));
                    ctx.stop();
                }
                Err(e) => debug!("Dropping fragmented frame from {}: {}", self.id, e),
            },
            Ok(ws::Message::Binary(_)) => {
                debug!("Ignoring binary frame from {}", self.id);
            }
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            Err(e) => {
                warn!("WebSocket error: {}", e);
                ctx.stop();
            }
            Ok(ws::Message::Nop) => {}
        }
    }
}

impl Handler<RelayEvent> for WebSocketConnection {
    type Result = ();

    fn handle(&mut self, msg: RelayEvent, ctx: &mut ws::WebsocketContext<Self>) {
        match serde_json::to_string(&msg) {
            Ok(frame) => ctx.text(frame),
            Err(e) => error!("Failed to encode relay event: {}", e),
        }
    }
}

/// GET /ws
pub async fn ws_index(
    req: HttpRequest,
    stream: web::Payload,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    ws::WsResponseBuilder::new(WebSocketConnection::new(data.chat_server.clone()), &req, stream)
        .frame_size(MAX_FRAME_SIZE)
        .start()
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::web::Bytes;

    #[test]
    fn parses_client_events() {
        let add: ClientEvent =
            serde_json::from_str(r#"{"event":"addUser","data":"user-1"}"#).unwrap();
        assert_eq!(add, ClientEvent::AddUser("user-1".into()));

        let send: ClientEvent = serde_json::from_str(
            r#"{"event":"sendMessage","data":{"senderId":"u1","receiverId":"s1","text":"hi"}}"#,
        )
        .unwrap();
        match send {
            ClientEvent::SendMessage(draft) => {
                assert_eq!(draft.receiver_id, "s1");
                assert_eq!(draft.images, None);
            }
            other => panic!("unexpected event {other:?}"),
        }

        let seen: ClientEvent = serde_json::from_str(
            r#"{"event":"messageSeen","data":{"senderId":"u1","receiverId":"s1","messageId":"m1"}}"#,
        )
        .unwrap();
        assert!(matches!(seen, ClientEvent::MessageSeen(r) if r.message_id == "m1"));
    }

    #[test]
    fn unknown_events_are_rejected() {
        assert!(serde_json::from_str::<ClientEvent>(r#"{"event":"typing","data":{}}"#).is_err());
    }

    #[test]
    fn fragmented_text_is_reassembled() {
        let mut fragments = Fragments::default();
        assert_eq!(
            fragments.push(actix_http::ws::Item::FirstText(Bytes::from_static(b"{\"event\":"))),
            Ok(None)
        );
        assert_eq!(
            fragments.push(actix_http::ws::Item::Continue(Bytes::from_static(b"\"addUser\","))),
            Ok(None)
        );
        let text = fragments
            .push(actix_http::ws::Item::Last(Bytes::from_static(b"\"data\":\"u1\"}")))
            .unwrap()
            .unwrap();
        assert_eq!(
            serde_json::from_str::<ClientEvent>(&text).unwrap(),
            ClientEvent::AddUser("u1".into())
        );

        // the buffer is free for the next message
        assert_eq!(
            fragments.push(actix_http::ws::Item::Last(Bytes::from_static(b"x"))),
            Err(FragmentError::Orphan)
        );
    }

    #[test]
    fn oversized_or_binary_fragments_are_refused() {
        let mut fragments = Fragments::default();
        let half = Bytes::from(vec![b'a'; MAX_FRAME_SIZE / 2 + 1]);
        assert_eq!(fragments.push(actix_http::ws::Item::FirstText(half.clone())), Ok(None));
        assert_eq!(
            fragments.push(actix_http::ws::Item::Continue(half)),
            Err(FragmentError::TooLarge)
        );

        assert_eq!(
            fragments.push(actix_http::ws::Item::FirstBinary(Bytes::from_static(b"\x00"))),
            Ok(None)
        );
        assert_eq!(
            fragments.push(actix_http::ws::Item::Continue(Bytes::from_static(b"\x01"))),
            Ok(None)
        );
        assert_eq!(
            fragments.push(actix_http::ws::Item::Last(Bytes::from_static(b"\x02"))),
            Err(FragmentError::Binary)
        );
    }
}
