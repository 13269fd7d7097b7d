use std::collections::{HashMap, VecDeque};

use actix::prelude::*;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::presence::{OnlineUser, Registry};

/// Relayed messages remembered per sending user, for `messageSeen`.
const REMEMBERED_PER_SENDER: usize = 256;

/// `sendMessage` payload from a client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatDraft {
    pub sender_id: String,
    pub receiver_id: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub images: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RelayedMessage {
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub text: Option<String>,
    pub images: Option<serde_json::Value>,
    pub seen: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SeenReceipt {
    pub sender_id: String,
    pub receiver_id: String,
    pub message_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LastMessage {
    pub last_message: String,
    pub last_messages_id: String,
}

/// Events pushed to connected clients.
#[derive(Message, Debug, Clone, Serialize, PartialEq)]
#[rtype(result = "()")]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum RelayEvent {
    GetUsers(Vec<OnlineUser>),
    GetMessage(RelayedMessage),
    MessageSeen(SeenReceipt),
    GetLastMessage(LastMessage),
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct Connect {
    pub socket_id: String,
    pub addr: Recipient<RelayEvent>,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct Disconnect {
    pub socket_id: String,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct AddUser {
    pub socket_id: String,
    pub user_id: String,
}

#[derive(Message)]
#[rtype(result = "RelayedMessage")]
pub struct SendMessage {
    pub socket_id: String,
    pub draft: ChatDraft,
}

#[derive(Message)]
#[rtype(result = "bool")]
pub struct MarkSeen {
    pub receipt: SeenReceipt,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct UpdateLastMessage {
    pub update: LastMessage,
}

/// Chat presence/delivery relay.
///
/// The only writer of the presence [`Registry`]; every connection talks to it
/// through actor messages. Nothing here is persisted and nothing is retried:
/// events for users who are not connected are dropped.
#[derive(Default)]
pub struct ChatServer {
    sessions: HashMap<String, Recipient<RelayEvent>>,
    registry: Registry,
    sent: HashMap<String, VecDeque<RelayedMessage>>,
}

impl ChatServer {
    pub fn new() -> Self {
        Self {
            sessions: HashMap::new(),
            registry: Registry::new(),
            sent: HashMap::new(),
        }
    }

    fn emit(&self, socket_id: &str, event: RelayEvent) {
        if let Some(addr) = self.sessions.get(socket_id) {
            addr.do_send(event);
        }
    }

    fn broadcast(&self, event: RelayEvent) {
        for addr in self.sessions.values() {
            addr.do_send(event.clone());
        }
    }

    fn broadcast_roster(&self) {
        self.broadcast(RelayEvent::GetUsers(self.registry.users().to_vec()));
    }

    fn remember(&mut self, message: RelayedMessage) {
        let log = self.sent.entry(message.sender_id.clone()).or_default();
        if log.len() == REMEMBERED_PER_SENDER {
            log.pop_front();
        }
        log.push_back(message);
    }
}

impl Actor for ChatServer {
    type Context = Context<Self>;
}

impl Handler<Connect> for ChatServer {
    type Result = ();

    fn handle(&mut self, msg: Connect, _: &mut Context<Self>) {
        info!("a user is connected (socket {})", msg.socket_id);
        self.sessions.insert(msg.socket_id, msg.addr);
    }
}

impl Handler<Disconnect> for ChatServer {
    type Result = ();

    fn handle(&mut self, msg: Disconnect, _: &mut Context<Self>) {
        info!("a user disconnected (socket {})", msg.socket_id);
        self.sessions.remove(&msg.socket_id);
        let routed: Vec<String> = self
            .registry
            .users()
            .iter()
            .filter(|u| u.socket_id == msg.socket_id)
            .map(|u| u.user_id.clone())
            .collect();
        for user_id in routed {
            self.sent.remove(&user_id);
        }
        self.registry.remove(&msg.socket_id);
        self.broadcast_roster();
    }
}

impl Handler<AddUser> for ChatServer {
    type Result = ();

    fn handle(&mut self, msg: AddUser, _: &mut Context<Self>) {
        if !self.registry.put(&msg.user_id, &msg.socket_id) {
            debug!(
                "user {} already routed, ignoring socket {}",
                msg.user_id, msg.socket_id
            );
        }
        self.broadcast_roster();
    }
}

impl Handler<SendMessage> for ChatServer {
    type Result = MessageResult<SendMessage>;

    fn handle(&mut self, msg: SendMessage, _: &mut Context<Self>) -> Self::Result {
        let message = RelayedMessage {
            id: Uuid::new_v4().to_string(),
            sender_id: msg.draft.sender_id,
            receiver_id: msg.draft.receiver_id,
            text: msg.draft.text,
            images: msg.draft.images,
            seen: false,
        };

        match self.registry.lookup(&message.receiver_id) {
            Some(receiver) => {
                let socket_id = receiver.socket_id.clone();
                self.emit(&socket_id, RelayEvent::GetMessage(message.clone()));
                self.remember(message.clone());
            }
            None => debug!("receiver {} offline, dropping message", message.receiver_id),
        }
        MessageResult(message)
    }
}

impl Handler<MarkSeen> for ChatServer {
    type Result = MessageResult<MarkSeen>;

    fn handle(&mut self, msg: MarkSeen, _: &mut Context<Self>) -> Self::Result {
        let receipt = msg.receipt;
        let Some(sender_socket) = self
            .registry
            .lookup(&receipt.sender_id)
            .map(|u| u.socket_id.clone())
        else {
            return MessageResult(false);
        };

        let Some(log) = self.sent.get_mut(&receipt.sender_id) else {
            return MessageResult(false);
        };
        let Some(pos) = log.iter().position(|m| {
            m.id == receipt.message_id
                && m.sender_id == receipt.sender_id
                && m.receiver_id == receipt.receiver_id
        }) else {
            return MessageResult(false);
        };

        // a receipt is delivered at most once
        log.remove(pos);
        self.emit(&sender_socket, RelayEvent::MessageSeen(receipt));
        MessageResult(true)
    }
}

impl Handler<UpdateLastMessage> for ChatServer {
    type Result = ();

    fn handle(&mut self, msg: UpdateLastMessage, _: &mut Context<Self>) {
        self.broadcast(RelayEvent::GetLastMessage(msg.update));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Probe {
        received: Vec<RelayEvent>,
    }

    impl Actor for Probe {
        type Context = Context<Self>;
    }

    impl Handler<RelayEvent> for Probe {
        type Result = ();

        fn handle(&mut self, msg: RelayEvent, _: &mut Context<Self>) {
            self.received.push(msg);
        }
    }

    #[derive(Message)]
    #[rtype(result = "Vec<RelayEvent>")]
    struct Drain;

    impl Handler<Drain> for Probe {
        type Result = MessageResult<Drain>;

        fn handle(&mut self, _: Drain, _: &mut Context<Self>) -> Self::Result {
            MessageResult(std::mem::take(&mut self.received))
        }
    }

    async fn connect(server: &Addr<ChatServer>, socket_id: &str) -> Addr<Probe> {
        let probe = Probe::default().start();
        server
            .send(Connect {
                socket_id: socket_id.to_string(),
                addr: probe.clone().recipient(),
            })
            .await
            .unwrap();
        probe
    }

    async fn add_user(server: &Addr<ChatServer>, socket_id: &str, user_id: &str) {
        server
            .send(AddUser {
                socket_id: socket_id.to_string(),
                user_id: user_id.to_string(),
            })
            .await
            .unwrap();
    }

    fn draft(from: &str, to: &str, text: &str) -> ChatDraft {
        ChatDraft {
            sender_id: from.to_string(),
            receiver_id: to.to_string(),
            text: Some(text.to_string()),
            images: None,
        }
    }

    fn roster(events: &[RelayEvent]) -> Vec<Vec<(String, String)>> {
        events
            .iter()
            .filter_map(|e| match e {
                RelayEvent::GetUsers(users) => Some(
                    users
                        .iter()
                        .map(|u| (u.user_id.clone(), u.socket_id.clone()))
                        .collect(),
                ),
                _ => None,
            })
            .collect()
    }

    #[actix_web::test]
    async fn add_user_broadcasts_roster_to_every_socket() {
        let server = ChatServer::new().start();
        let a = connect(&server, "sa").await;
        let b = connect(&server, "sb").await;

        add_user(&server, "sa", "alice").await;

        let expected = vec![vec![("alice".to_string(), "sa".to_string())]];
        assert_eq!(roster(&a.send(Drain).await.unwrap()), expected);
        assert_eq!(roster(&b.send(Drain).await.unwrap()), expected);
    }

    #[actix_web::test]
    async fn second_socket_for_same_user_is_ignored() {
        let server = ChatServer::new().start();
        let a1 = connect(&server, "a1").await;
        let _a2 = connect(&server, "a2").await;
        let b = connect(&server, "sb").await;

        add_user(&server, "a1", "alice").await;
        add_user(&server, "a2", "alice").await;
        add_user(&server, "sb", "bob").await;
        a1.send(Drain).await.unwrap();

        server
            .send(SendMessage {
                socket_id: "sb".to_string(),
                draft: draft("bob", "alice", "hi"),
            })
            .await
            .unwrap();

        let events = a1.send(Drain).await.unwrap();
        assert!(matches!(&events[..], [RelayEvent::GetMessage(m)] if m.text.as_deref() == Some("hi")));
        // the roster was still re-broadcast after the ignored add
        assert_eq!(roster(&b.send(Drain).await.unwrap()).len(), 3);
    }

    #[actix_web::test]
    async fn message_goes_only_to_receiver() {
        let server = ChatServer::new().start();
        let a = connect(&server, "sa").await;
        let b = connect(&server, "sb").await;
        let c = connect(&server, "sc").await;
        add_user(&server, "sa", "alice").await;
        add_user(&server, "sb", "bob").await;
        add_user(&server, "sc", "carol").await;
        for p in [&a, &b, &c] {
            p.send(Drain).await.unwrap();
        }

        let sent = server
            .send(SendMessage {
                socket_id: "sa".to_string(),
                draft: draft("alice", "bob", "order shipped?"),
            })
            .await
            .unwrap();
        assert!(!sent.seen);

        assert_eq!(
            b.send(Drain).await.unwrap(),
            vec![RelayEvent::GetMessage(sent)]
        );
        assert!(a.send(Drain).await.unwrap().is_empty());
        assert!(c.send(Drain).await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn offline_receiver_drops_message() {
        let server = ChatServer::new().start();
        let a = connect(&server, "sa").await;
        add_user(&server, "sa", "alice").await;
        a.send(Drain).await.unwrap();

        let sent = server
            .send(SendMessage {
                socket_id: "sa".to_string(),
                draft: draft("alice", "nobody", "hello?"),
            })
            .await
            .unwrap();

        assert!(a.send(Drain).await.unwrap().is_empty());
        let seen = server
            .send(MarkSeen {
                receipt: SeenReceipt {
                    sender_id: "alice".into(),
                    receiver_id: "nobody".into(),
                    message_id: sent.id,
                },
            })
            .await
            .unwrap();
        assert!(!seen);
    }

    #[actix_web::test]
    async fn seen_receipt_reaches_sender_once() {
        let server = ChatServer::new().start();
        let a = connect(&server, "sa").await;
        let b = connect(&server, "sb").await;
        add_user(&server, "sa", "alice").await;
        add_user(&server, "sb", "bob").await;

        let sent = server
            .send(SendMessage {
                socket_id: "sa".to_string(),
                draft: draft("alice", "bob", "ping"),
            })
            .await
            .unwrap();
        a.send(Drain).await.unwrap();
        b.send(Drain).await.unwrap();

        let receipt = SeenReceipt {
            sender_id: "alice".into(),
            receiver_id: "bob".into(),
            message_id: sent.id.clone(),
        };
        assert!(server
            .send(MarkSeen {
                receipt: receipt.clone()
            })
            .await
            .unwrap());
        assert!(!server
            .send(MarkSeen {
                receipt: receipt.clone()
            })
            .await
            .unwrap());

        assert_eq!(
            a.send(Drain).await.unwrap(),
            vec![RelayEvent::MessageSeen(receipt)]
        );
        assert!(b.send(Drain).await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn receipt_for_message_from_an_extra_socket_reaches_the_routed_one() {
        let server = ChatServer::new().start();
        let a1 = connect(&server, "a1").await;
        let a2 = connect(&server, "a2").await;
        let _b = connect(&server, "sb").await;
        add_user(&server, "a1", "alice").await;
        add_user(&server, "a2", "alice").await;
        add_user(&server, "sb", "bob").await;

        let sent = server
            .send(SendMessage {
                socket_id: "a2".to_string(),
                draft: draft("alice", "bob", "from my phone"),
            })
            .await
            .unwrap();
        a1.send(Drain).await.unwrap();
        a2.send(Drain).await.unwrap();

        let receipt = SeenReceipt {
            sender_id: "alice".into(),
            receiver_id: "bob".into(),
            message_id: sent.id,
        };
        assert!(server
            .send(MarkSeen {
                receipt: receipt.clone()
            })
            .await
            .unwrap());
        assert_eq!(
            a1.send(Drain).await.unwrap(),
            vec![RelayEvent::MessageSeen(receipt)]
        );
        assert!(a2.send(Drain).await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn last_message_update_is_broadcast() {
        let server = ChatServer::new().start();
        let a = connect(&server, "sa").await;
        let b = connect(&server, "sb").await;

        let update = LastMessage {
            last_message: "see you".into(),
            last_messages_id: "conv-1".into(),
        };
        server
            .send(UpdateLastMessage {
                update: update.clone(),
            })
            .await
            .unwrap();

        for p in [&a, &b] {
            assert_eq!(
                p.send(Drain).await.unwrap(),
                vec![RelayEvent::GetLastMessage(update.clone())]
            );
        }
    }

    #[actix_web::test]
    async fn disconnect_removes_user_and_broadcasts() {
        let server = ChatServer::new().start();
        let _a = connect(&server, "sa").await;
        let b = connect(&server, "sb").await;
        add_user(&server, "sa", "alice").await;
        add_user(&server, "sb", "bob").await;
        b.send(Drain).await.unwrap();

        server
            .send(Disconnect {
                socket_id: "sa".to_string(),
            })
            .await
            .unwrap();

        let rosters = roster(&b.send(Drain).await.unwrap());
        assert_eq!(rosters, vec![vec![("bob".to_string(), "sb".to_string())]]);
    }

    #[test]
    fn events_serialize_as_named_frames() {
        let frame = serde_json::to_value(RelayEvent::GetLastMessage(LastMessage {
            last_message: "ok".into(),
            last_messages_id: "c1".into(),
        }))
        .unwrap();
        assert_eq!(frame["event"], "getLastMessage");
        assert_eq!(frame["data"]["lastMessagesId"], "c1");
    }
}
