use async_trait::async_trait;
use sqlx::Connection;
use uuid::Uuid;

use super::repo_types::{NewUser, User, UserChanges};
use crate::{
    db::DbSession,
    repository::{RepoResult, Repository},
};

#[async_trait]
pub trait UserRepository:
    Repository<Entity = User, Create = NewUser, Update = UserChanges>
{
    async fn get_by_email(&self, email: &str) -> RepoResult<Option<User>>;
}

/// Postgres-backed users table, bound to one request's session.
pub struct PgUserRepository<'s> {
    session: &'s DbSession,
}

impl<'s> PgUserRepository<'s> {
    pub fn new(session: &'s DbSession) -> Self {
        Self { session }
    }
}

#[async_trait]
impl<'s> Repository for PgUserRepository<'s> {
    type Entity = User;
    type Create = NewUser;
    type Update = UserChanges;

    async fn get_by_id(&self, id: Uuid) -> RepoResult<Option<User>> {
        let mut conn = self.session.lock().await;
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, hashed_password, is_active, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut **conn)
        .await
    }

    /// Count and page are read from one snapshot.
    async fn get_all(&self, skip: i64, limit: i64) -> RepoResult<(i64, Vec<User>)> {
        let mut conn = self.session.lock().await;
        let mut tx = conn.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&mut *tx)
            .await?;
        let rows = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, hashed_password, is_active, created_at, updated_at
            FROM users
            ORDER BY created_at, id
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(skip)
        .fetch_all(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok((total, rows))
    }

    async fn create(&self, input: NewUser) -> RepoResult<User> {
        let mut conn = self.session.lock().await;
        let mut tx = conn.begin().await?;
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, hashed_password, is_active)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, hashed_password, is_active, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&input.email)
        .bind(&input.hashed_password)
        .bind(input.is_active)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(user)
    }

    async fn update(&self, id: Uuid, changes: UserChanges) -> RepoResult<Option<User>> {
        let mut conn = self.session.lock().await;
        let mut tx = conn.begin().await?;
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
               SET email           = COALESCE($2, email),
                   hashed_password = COALESCE($3, hashed_password),
                   is_active       = COALESCE($4, is_active),
                   updated_at      = now()
             WHERE id = $1
            RETURNING id, email, hashed_password, is_active, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(changes.email)
        .bind(changes.hashed_password)
        .bind(changes.is_active)
        .fetch_optional(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(user)
    }

    async fn delete(&self, id: Uuid) -> RepoResult<bool> {
        let mut conn = self.session.lock().await;
        let mut tx = conn.begin().await?;
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl<'s> UserRepository for PgUserRepository<'s> {
    async fn get_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let mut conn = self.session.lock().await;
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, hashed_password, is_active, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&mut **conn)
        .await
    }
}
