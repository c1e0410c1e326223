use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use super::{
    dto::UserUpdate,
    repo::UserRepository,
    repo_types::{NewUser, User, UserChanges},
};
use crate::{
    auth::jwt::SecurityManager,
    error::{AppError, AppResult},
};

/// Business rules for users on top of a [`UserRepository`].
pub struct UserService<R> {
    repo: R,
    security: Arc<SecurityManager>,
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl<R: UserRepository> UserService<R> {
    pub fn new(repo: R, security: Arc<SecurityManager>) -> Self {
        Self { repo, security }
    }

    pub async fn create_user(&self, email: &str, password: &str) -> AppResult<User> {
        let email = normalize_email(email);
        if self.repo.get_by_email(&email).await?.is_some() {
            warn!(email = %email, "email already registered");
            return Err(AppError::Duplicate {
                entity: "User",
                field: "email",
                value: email,
            });
        }

        let hashed_password = self.security.hash_password(password)?;
        let user = self
            .repo
            .create(NewUser {
                email,
                hashed_password,
                is_active: true,
            })
            .await?;
        info!(user_id = %user.id, email = %user.email, "user registered");
        Ok(user)
    }

    /// Unknown email and wrong password fail with the same error.
    pub async fn authenticate_user(&self, email: &str, password: &str) -> AppResult<User> {
        let email = normalize_email(email);
        let Some(user) = self.repo.get_by_email(&email).await? else {
            warn!(email = %email, "login unknown email");
            self.security.verify_dummy(password);
            return Err(AppError::invalid_credentials());
        };

        if !self.security.verify_password(password, &user.hashed_password) {
            warn!(user_id = %user.id, "login invalid password");
            return Err(AppError::invalid_credentials());
        }

        if !user.is_active {
            warn!(user_id = %user.id, "login inactive user");
            return Err(AppError::Authorization("Inactive user".into()));
        }

        info!(user_id = %user.id, "user authenticated");
        Ok(user)
    }

    pub async fn get_user(&self, id: Uuid) -> AppResult<User> {
        self.repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("User", id))
    }

    pub async fn list_users(&self, skip: i64, limit: i64) -> AppResult<(i64, Vec<User>)> {
        Ok(self.repo.get_all(skip, limit).await?)
    }

    pub async fn update_user(&self, id: Uuid, update: UserUpdate) -> AppResult<User> {
        let email = match update.email {
            Some(raw) => {
                let email = normalize_email(&raw);
                if let Some(existing) = self.repo.get_by_email(&email).await? {
                    if existing.id != id {
                        return Err(AppError::Duplicate {
                            entity: "User",
                            field: "email",
                            value: email,
                        });
                    }
                }
                Some(email)
            }
            None => None,
        };

        let hashed_password = match update.password {
            Some(plain) => Some(self.security.hash_password(&plain)?),
            None => None,
        };

        let changes = UserChanges {
            email,
            hashed_password,
            is_active: update.is_active,
        };
        let user = self
            .repo
            .update(id, changes)
            .await?
            .ok_or_else(|| AppError::not_found("User", id))?;
        info!(user_id = %user.id, "user updated");
        Ok(user)
    }

    pub async fn delete_user(&self, id: Uuid) -> AppResult<()> {
        if !self.repo.delete(id).await? {
            return Err(AppError::not_found("User", id));
        }
        info!(user_id = %id, "user deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::JwtConfig,
        repository::{RepoResult, Repository},
        response::PaginationMeta,
    };
    use async_trait::async_trait;
    use time::OffsetDateTime;
    use tokio::sync::RwLock;

    /// Vec-backed repository keeping insertion order.
    #[derive(Clone, Default)]
    struct InMemoryUserRepository {
        users: Arc<RwLock<Vec<User>>>,
    }

    impl InMemoryUserRepository {
        async fn len(&self) -> usize {
            self.users.read().await.len()
        }
    }

    #[async_trait]
    impl Repository for InMemoryUserRepository {
        type Entity = User;
        type Create = NewUser;
        type Update = UserChanges;

        async fn get_by_id(&self, id: Uuid) -> RepoResult<Option<User>> {
            Ok(self.users.read().await.iter().find(|u| u.id == id).cloned())
        }

        async fn get_all(&self, skip: i64, limit: i64) -> RepoResult<(i64, Vec<User>)> {
            let users = self.users.read().await;
            let page = users
                .iter()
                .skip(skip as usize)
                .take(limit as usize)
                .cloned()
                .collect();
            Ok((users.len() as i64, page))
        }

        async fn create(&self, input: NewUser) -> RepoResult<User> {
            let now = OffsetDateTime::now_utc();
            let user = User {
                id: Uuid::new_v4(),
                email: input.email,
                hashed_password: input.hashed_password,
                is_active: input.is_active,
                created_at: now,
                updated_at: now,
            };
            self.users.write().await.push(user.clone());
            Ok(user)
        }

        async fn update(&self, id: Uuid, changes: UserChanges) -> RepoResult<Option<User>> {
            let mut users = self.users.write().await;
            let Some(user) = users.iter_mut().find(|u| u.id == id) else {
                return Ok(None);
            };
            if let Some(email) = changes.email {
                user.email = email;
            }
            if let Some(hash) = changes.hashed_password {
                user.hashed_password = hash;
            }
            if let Some(active) = changes.is_active {
                user.is_active = active;
            }
            user.updated_at = OffsetDateTime::now_utc();
            Ok(Some(user.clone()))
        }

        async fn delete(&self, id: Uuid) -> RepoResult<bool> {
            let mut users = self.users.write().await;
            let before = users.len();
            users.retain(|u| u.id != id);
            Ok(users.len() != before)
        }
    }

    #[async_trait]
    impl UserRepository for InMemoryUserRepository {
        async fn get_by_email(&self, email: &str) -> RepoResult<Option<User>> {
            Ok(self
                .users
                .read()
                .await
                .iter()
                .find(|u| u.email == email)
                .cloned())
        }
    }

    fn service() -> (UserService<InMemoryUserRepository>, InMemoryUserRepository) {
        let repo = InMemoryUserRepository::default();
        let security = Arc::new(SecurityManager::new(&JwtConfig {
            secret: "test".into(),
            algorithm: jsonwebtoken::Algorithm::HS256,
            access_ttl_minutes: 15,
            refresh_ttl_days: 30,
        }));
        (UserService::new(repo.clone(), security), repo)
    }

    #[tokio::test]
    async fn registered_user_can_authenticate() {
        let (svc, _) = service();
        let created = svc
            .create_user("Alice@Example.com ", "correct-horse")
            .await
            .expect("create");
        assert_eq!(created.email, "alice@example.com");
        assert!(created.is_active);
        assert_ne!(created.hashed_password, "correct-horse");

        let authed = svc
            .authenticate_user("alice@example.com", "correct-horse")
            .await
            .expect("authenticate");
        assert_eq!(authed.id, created.id);
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected_without_insert() {
        let (svc, repo) = service();
        svc.create_user("bob@example.com", "password-one").await.unwrap();
        let err = svc
            .create_user("BOB@example.com", "password-two")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Duplicate { field: "email", .. }));
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_are_indistinguishable() {
        let (svc, _) = service();
        svc.create_user("carol@example.com", "right-password").await.unwrap();

        let wrong = svc
            .authenticate_user("carol@example.com", "wrong-password")
            .await
            .unwrap_err();
        let unknown = svc
            .authenticate_user("nobody@example.com", "right-password")
            .await
            .unwrap_err();

        assert!(matches!(wrong, AppError::Authentication(_)));
        assert!(matches!(unknown, AppError::Authentication(_)));
        assert_eq!(wrong.to_string(), unknown.to_string());
    }

    #[tokio::test]
    async fn inactive_user_cannot_authenticate() {
        let (svc, _) = service();
        let user = svc.create_user("dave@example.com", "password-123").await.unwrap();
        svc.update_user(
            user.id,
            UserUpdate {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let err = svc
            .authenticate_user("dave@example.com", "password-123")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));
    }

    #[tokio::test]
    async fn list_users_reports_total_and_window() {
        let (svc, repo) = service();
        for i in 0..25 {
            repo.create(NewUser {
                email: format!("user{i}@example.com"),
                hashed_password: "x".into(),
                is_active: true,
            })
            .await
            .unwrap();
        }

        let (total, page) = svc.list_users(0, 10).await.unwrap();
        assert_eq!(total, 25);
        assert_eq!(page.len(), 10);
        assert_eq!(page[0].email, "user0@example.com");

        let meta = PaginationMeta::from_window(0, 10, total);
        assert_eq!(meta.page, 1);
        assert_eq!(meta.pages, 3);
        assert!(meta.has_next);
        assert!(!meta.has_prev);
    }

    #[tokio::test]
    async fn password_update_is_hashed_and_takes_effect() {
        let (svc, _) = service();
        let user = svc.create_user("erin@example.com", "old-password").await.unwrap();
        let updated = svc
            .update_user(
                user.id,
                UserUpdate {
                    password: Some("new-password".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_ne!(updated.hashed_password, "new-password");
        assert!(svc
            .authenticate_user("erin@example.com", "new-password")
            .await
            .is_ok());
        assert!(svc
            .authenticate_user("erin@example.com", "old-password")
            .await
            .is_err());
    }

    #[tokio::test]
    async fn email_update_to_taken_address_is_duplicate() {
        let (svc, _) = service();
        svc.create_user("frank@example.com", "password-1").await.unwrap();
        let grace = svc.create_user("grace@example.com", "password-2").await.unwrap();
        let err = svc
            .update_user(
                grace.id,
                UserUpdate {
                    email: Some("Frank@example.com".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Duplicate { .. }));
    }

    #[tokio::test]
    async fn update_and_delete_unknown_id_are_not_found() {
        let (svc, _) = service();
        let id = Uuid::new_v4();
        assert!(matches!(
            svc.update_user(id, UserUpdate::default()).await,
            Err(AppError::NotFound { .. })
        ));
        assert!(matches!(
            svc.delete_user(id).await,
            Err(AppError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn delete_removes_user() {
        let (svc, repo) = service();
        let user = svc.create_user("heidi@example.com", "password-9").await.unwrap();
        svc.delete_user(user.id).await.unwrap();
        assert_eq!(repo.len().await, 0);
        assert!(matches!(
            svc.get_user(user.id).await,
            Err(AppError::NotFound { .. })
        ));
    }
}
