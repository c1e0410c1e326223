use async_trait::async_trait;
use uuid::Uuid;

pub type RepoResult<T> = Result<T, sqlx::Error>;

/// CRUD over one entity type. Field mapping goes through the explicit
/// `Create` / `Update` structs of each implementation.
///
/// Mutations commit before returning. Storage errors, constraint violations
/// included, are handed back to the caller untouched.
#[async_trait]
pub trait Repository: Send + Sync {
    type Entity: Send;
    type Create: Send;
    type Update: Send;

    async fn get_by_id(&self, id: Uuid) -> RepoResult<Option<Self::Entity>>;

    /// Total row count plus the `[skip, skip + limit)` window.
    async fn get_all(&self, skip: i64, limit: i64) -> RepoResult<(i64, Vec<Self::Entity>)>;

    async fn create(&self, input: Self::Create) -> RepoResult<Self::Entity>;

    /// `None` when no row has this id.
    async fn update(&self, id: Uuid, changes: Self::Update) -> RepoResult<Option<Self::Entity>>;

    async fn delete(&self, id: Uuid) -> RepoResult<bool>;
}
