#[cfg(test)]
#[path = "message_test.rs"]
mod tests;

use chrono::DateTime;
use chrono::Local;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

use super::Role;

/// Id of the greeting every session starts with. It is never sent to the
/// model as history.
pub const WELCOME_MESSAGE_ID: &str = "welcome";

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageType {
    Normal,
    Error,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Local>,
    pub source: Option<String>,
    pub link: Option<String>,
    mtype: MessageType,
}

impl Message {
    pub fn new(role: Role, content: &str) -> Message {
        return Message::with_id(&Message::create_id(), role, content);
    }

    pub fn new_with_type(role: Role, mtype: MessageType, content: &str) -> Message {
        let mut msg = Message::new(role, content);
        msg.mtype = mtype;
        return msg;
    }

    pub fn with_id(id: &str, role: Role, content: &str) -> Message {
        return Message {
            id: id.to_string(),
            role,
            content: content.to_string(),
            timestamp: Local::now(),
            source: None,
            link: None,
            mtype: MessageType::Normal,
        };
    }

    pub fn welcome() -> Message {
        return Message::with_id(
            WELCOME_MESSAGE_ID,
            Role::Bot,
            "Hello! I am TerrierHelper. You can upload multiple SFC documents (like 'The Cord', syllabi, or campus maps), and I'll help you with any questions about them.",
        );
    }

    pub fn create_id() -> String {
        return Uuid::new_v4().to_string();
    }

    pub fn is_welcome(&self) -> bool {
        return self.id == WELCOME_MESSAGE_ID;
    }

    pub fn message_type(&self) -> MessageType {
        return self.mtype;
    }

    pub fn append(&mut self, text: &str) {
        self.content += text;
    }

    pub fn apply(&mut self, patch: MessagePatch) {
        if let Some(content) = patch.content {
            self.content = content;
        }
        if let Some(delta) = patch.append {
            self.append(&delta);
        }
        if let Some(source) = patch.source {
            self.source = Some(source);
        }
        if let Some(link) = patch.link {
            self.link = Some(link);
        }
        if let Some(mtype) = patch.mtype {
            self.mtype = mtype;
        }
    }
}

/// In-place update for an existing message. Unset fields are left alone.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MessagePatch {
    pub content: Option<String>,
    pub append: Option<String>,
    pub source: Option<String>,
    pub link: Option<String>,
    pub mtype: Option<MessageType>,
}

impl MessagePatch {
    pub fn append(delta: &str) -> MessagePatch {
        return MessagePatch {
            append: Some(delta.to_string()),
            ..MessagePatch::default()
        };
    }

    pub fn content(content: &str) -> MessagePatch {
        return MessagePatch {
            content: Some(content.to_string()),
            ..MessagePatch::default()
        };
    }
}
