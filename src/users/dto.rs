use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;
use validator::Validate;

use super::repo_types::User;

/// Request body for registration.
#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UserCreate {
    #[validate(email(message = "value is not a valid email address"))]
    pub email: String,
    #[validate(length(min = 8, max = 128, message = "password must be 8 to 128 characters"))]
    pub password: String,
}

/// Request body for partial updates.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UserUpdate {
    #[validate(email(message = "value is not a valid email address"))]
    pub email: Option<String>,
    #[validate(length(min = 8, max = 128, message = "password must be 8 to 128 characters"))]
    pub password: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ListUsersQuery {
    #[serde(default)]
    #[validate(range(min = 0, max = 1_000_000_000, message = "skip must be between 0 and 1000000000"))]
    pub skip: i64,
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 100, message = "limit must be between 1 and 100"))]
    pub limit: i64,
}

fn default_limit() -> i64 {
    100
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct UserOut {
    pub id: Uuid,
    pub email: String,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<User> for UserOut {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            is_active: u.is_active,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_out_never_carries_password_hash() {
        let now = OffsetDateTime::now_utc();
        let out = UserOut::from(User {
            id: Uuid::new_v4(),
            email: "test@example.com".into(),
            hashed_password: "$argon2id$v=19$secret".into(),
            is_active: true,
            created_at: now,
            updated_at: now,
        });
        let json = serde_json::to_string(&out).unwrap();
        assert!(json.contains("test@example.com"));
        assert!(!json.contains("argon2"));
    }

    #[test]
    fn list_query_defaults_and_bounds() {
        let q: ListUsersQuery = serde_json::from_str("{}").unwrap();
        assert_eq!((q.skip, q.limit), (0, 100));
        assert!(q.validate().is_ok());

        let q = ListUsersQuery { skip: -1, limit: 0 };
        let errs = q.validate().unwrap_err();
        assert_eq!(errs.field_errors().len(), 2);

        let q = ListUsersQuery {
            skip: i64::MAX,
            limit: 1,
        };
        assert!(q.validate().unwrap_err().field_errors().contains_key("skip"));
    }

    #[test]
    fn request_bodies_reject_unknown_fields() {
        let create = serde_json::from_str::<UserCreate>(
            r#"{"email":"a@example.com","password":"password-123","is_active":false}"#,
        );
        assert!(create.unwrap_err().to_string().contains("unknown field `is_active`"));

        let update = serde_json::from_str::<UserUpdate>(r#"{"role":"admin"}"#);
        assert!(update.is_err());
    }

    #[test]
    fn short_password_fails_validation() {
        let body = UserCreate {
            email: "a@example.com".into(),
            password: "short".into(),
        };
        assert!(body.validate().is_err());
    }
}
