use std::collections::HashMap;

use actix::prelude::*;
use log::{debug, info};
use serde::Serialize;

use crate::models::MessageView;

/// A text frame for one websocket session.
#[derive(Message)]
#[rtype(result = "()")]
pub struct WsMessage(pub String);

#[derive(Message)]
#[rtype(result = "()")]
pub struct Connect {
    pub user_id: String,
    pub addr: Recipient<WsMessage>,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct Disconnect {
    pub user_id: String,
    pub addr: Recipient<WsMessage>,
}

/// A freshly stored message to push to both participants.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Deliver {
    pub sender_id: String,
    pub receiver_id: String,
    pub message: MessageView,
}

#[derive(Serialize)]
struct OutgoingFrame<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    message: &'a MessageView,
}

/// Routes stored chat messages to the open websocket sessions of their
/// sender and receiver. A user may hold several sessions (tabs, devices).
#[derive(Default)]
pub struct ChatServer {
    sessions: HashMap<String, Vec<Recipient<WsMessage>>>,
}

impl ChatServer {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, user_id: &str, frame: &str) -> usize {
        match self.sessions.get(user_id) {
            Some(addrs) => {
                for addr in addrs {
                    addr.do_send(WsMessage(frame.to_owned()));
                }
                addrs.len()
            }
            None => 0,
        }
    }
}

impl Actor for ChatServer {
    type Context = Context<Self>;
}

impl Handler<Connect> for ChatServer {
    type Result = ();

    fn handle(&mut self, msg: Connect, _: &mut Context<Self>) {
        info!("User {} connected (WS)", msg.user_id);
        self.sessions.entry(msg.user_id).or_default().push(msg.addr);
    }
}

impl Handler<Disconnect> for ChatServer {
    type Result = ();

    fn handle(&mut self, msg: Disconnect, _: &mut Context<Self>) {
        info!("User {} disconnected (WS)", msg.user_id);
        if let Some(addrs) = self.sessions.get_mut(&msg.user_id) {
            // Remove only the connection that matches the provided address.
            addrs.retain(|a| a != &msg.addr);
            if addrs.is_empty() {
                self.sessions.remove(&msg.user_id);
            }
        }
    }
}

impl Handler<Deliver> for ChatServer {
    type Result = ();

    fn handle(&mut self, msg: Deliver, _: &mut Context<Self>) {
        let frame = match serde_json::to_string(&OutgoingFrame {
            kind: "message",
            message: &msg.message,
        }) {
            Ok(frame) => frame,
            Err(e) => {
                log::error!("Could not encode message {}: {}", msg.message.id, e);
                return;
            }
        };
        let mut delivered = self.push(&msg.receiver_id, &frame);
        if msg.sender_id != msg.receiver_id {
            delivered += self.push(&msg.sender_id, &frame);
        }
        debug!("Message {} pushed to {} sessions", msg.message.id, delivered);
    }
}
