//! Request DTOs for the user service API
//!
//! Defines the structure of incoming HTTP request bodies and query strings.

use serde::{Deserialize, Deserializer};

use crate::error::{Result, ServiceError};
use crate::models::{User, UserFilter, UserId};

/// Request body for POST /users
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewUser {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
}

/// Request body for PUT /users/{id}
///
/// Only `email` and `nickname` are mutable. The outer `Option` records
/// whether the field was sent at all; an explicit `null` clears the field.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    #[serde(default, deserialize_with = "present")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub nickname: Option<Option<String>>,
}

impl UserUpdate {
    /// Applies the provided fields to `user`, leaving the rest untouched.
    pub fn apply(&self, user: &mut User) {
        if let Some(email) = &self.email {
            user.email = email.clone();
        }
        if let Some(nickname) = &self.nickname {
            user.nickname = nickname.clone();
        }
    }
}

// A field that is present in the body, even as `null`, deserializes to `Some`.
fn present<'de, D>(deserializer: D) -> std::result::Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// Query string for GET /users
///
/// At most one selector may be supplied. A selector counts as supplied when
/// its parameter is present, even with an empty value: `?email=&nickname=x`
/// is rejected as conflicting, `?email=` matches users whose email is the
/// empty string, and `?ids=0` matches no user.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterParams {
    pub ids: Option<UserId>,
    pub email: Option<String>,
    pub nickname: Option<String>,
}

impl FilterParams {
    /// Resolves the selectors into a single filter.
    ///
    /// Returns `InvalidParameters` if more than one selector is present.
    pub fn into_filter(self) -> Result<UserFilter> {
        match (self.ids, self.email, self.nickname) {
            (None, None, None) => Ok(UserFilter::All),
            (Some(id), None, None) => Ok(UserFilter::ById(id)),
            (None, Some(email), None) => Ok(UserFilter::ByEmail(email)),
            (None, None, Some(nickname)) => Ok(UserFilter::ByNickname(nickname)),
            _ => Err(ServiceError::InvalidParameters),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_new_user_deserialize() {
        let json = r#"{"email": "john.smith@mail.com", "nickname": "Johny"}"#;
        let req: NewUser = serde_json::from_str(json).unwrap();
        assert_eq!(req.email.as_deref(), Some("john.smith@mail.com"));
        assert_eq!(req.nickname.as_deref(), Some("Johny"));
    }

    #[test]
    fn test_new_user_rejects_wrong_type() {
        let json = r#"{"email": "john.smith@mail.com", "nickname": {"message": "hi"}}"#;
        assert!(serde_json::from_str::<NewUser>(json).is_err());
    }

    #[test]
    fn test_update_distinguishes_absent_from_null() {
        let req: UserUpdate = serde_json::from_str(r#"{"email": null}"#).unwrap();
        assert_eq!(req.email, Some(None));
        assert_eq!(req.nickname, None);
    }

    #[test]
    fn test_empty_update_leaves_user_unchanged() {
        let req: UserUpdate = serde_json::from_str("{}").unwrap();
        assert_eq!(req.email, None);
        assert_eq!(req.nickname, None);

        let mut user = User {
            id: 1,
            email: Some("a@b.c".into()),
            nickname: Some("A".into()),
        };
        let before = user.clone();
        req.apply(&mut user);
        assert_eq!(user, before);
    }

    #[test]
    fn test_update_applies_only_provided_fields() {
        let req: UserUpdate =
            serde_json::from_str(r#"{"nickname": "Smithy", "id": 99}"#).unwrap();
        let mut user = User {
            id: 1,
            email: Some("a@b.c".into()),
            nickname: None,
        };
        req.apply(&mut user);

        assert_eq!(user.id, 1);
        assert_eq!(user.email.as_deref(), Some("a@b.c"));
        assert_eq!(user.nickname.as_deref(), Some("Smithy"));
    }

    #[test]
    fn test_filter_without_selectors_is_all() {
        let filter = FilterParams::default().into_filter().unwrap();
        assert_eq!(filter, UserFilter::All);
    }

    proptest! {
        // Any combination of two or three selectors is rejected; one or none is accepted.
        #[test]
        fn prop_selectors_are_mutually_exclusive(
            id in prop::option::of(1i64..1000),
            email in prop::option::of("[a-z]{1,8}@mail\\.com"),
            nickname in prop::option::of("[A-Za-z]{1,12}"),
        ) {
            let given = [id.is_some(), email.is_some(), nickname.is_some()]
                .iter()
                .filter(|p| **p)
                .count();
            let result = FilterParams { ids: id, email, nickname }.into_filter();

            if given > 1 {
                prop_assert!(matches!(result, Err(ServiceError::InvalidParameters)));
            } else {
                prop_assert!(result.is_ok());
            }
        }
    }
}
