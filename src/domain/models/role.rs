use serde::Deserialize;
use serde::Serialize;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    User,
    Bot,
    System,
}

impl Role {
    /// Bot and system messages are both spoken by the assistant as far as the
    /// model is concerned.
    pub fn is_assistant(&self) -> bool {
        return *self != Role::User;
    }
}
