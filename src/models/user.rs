//! User entity and read selectors

use serde::{Deserialize, Serialize};

/// Store-assigned user identifier.
pub type UserId = i64;

/// A persisted user.
///
/// `id` is assigned by the store on insert and never changes afterwards.
/// Neither `email` nor `nickname` is unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: Option<String>,
    pub nickname: Option<String>,
}

/// Predicate for the filter read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserFilter {
    /// Every user
    All,
    ById(UserId),
    ByEmail(String),
    ByNickname(String),
}

impl UserFilter {
    /// Returns true if `user` satisfies this predicate.
    pub fn matches(&self, user: &User) -> bool {
        match self {
            UserFilter::All => true,
            UserFilter::ById(id) => user.id == *id,
            UserFilter::ByEmail(email) => user.email.as_deref() == Some(email.as_str()),
            UserFilter::ByNickname(nickname) => {
                user.nickname.as_deref() == Some(nickname.as_str())
            }
        }
    }

    /// Named arguments identifying this read in the cache.
    pub fn cache_args(&self) -> Vec<(&'static str, Option<String>)> {
        let (ids, email, nickname) = match self {
            UserFilter::All => (None, None, None),
            UserFilter::ById(id) => (Some(id.to_string()), None, None),
            UserFilter::ByEmail(email) => (None, Some(email.clone()), None),
            UserFilter::ByNickname(nickname) => (None, None, Some(nickname.clone())),
        };
        vec![("ids", ids), ("email", email), ("nickname", nickname)]
    }
}
