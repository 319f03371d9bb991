//! Change events published after successful writes

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::User;

/// Kind of write that produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    Create,
    Update,
    Delete,
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActionType::Create => "create",
            ActionType::Update => "update",
            ActionType::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// Message body placed on the event queue.
///
/// `user` is the full snapshot of the entity as it stood right after the write
/// (for deletes, the removed entity).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserEvent {
    pub action_type: ActionType,
    pub user: User,
}

impl UserEvent {
    pub fn new(action_type: ActionType, user: User) -> Self {
        Self { action_type, user }
    }
}
