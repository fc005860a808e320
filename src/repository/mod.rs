//! Persistence seams consumed by the link and auth services
//!
//! The services only see these traits; the redb store in
//! [`crate::database`] is the production implementation and
//! [`memory::MemoryStore`] backs the unit tests.

#[cfg(test)]
pub mod memory;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{NewShortLink, NewUser, ShortLink, User};

#[async_trait]
pub trait LinkRepository: Send + Sync + 'static {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<ShortLink>>;

    async fn find_by_id(&self, id: u64) -> Result<Option<ShortLink>>;

    /// Links created by `owner_id`, oldest first.
    async fn find_by_owner(&self, owner_id: u64) -> Result<Vec<ShortLink>>;

    /// Stores a new link. Fails with `Conflict` if the slug is taken at write time.
    async fn insert(&self, link: NewShortLink) -> Result<ShortLink>;

    /// Writes the mutable fields (`slug`, `long_url`) of an existing link.
    /// Fails with `Conflict` if the new slug belongs to another link.
    async fn save(&self, link: &ShortLink) -> Result<ShortLink>;

    /// Atomically adds one to the click counter.
    async fn increment_click_count(&self, id: u64) -> Result<()>;

    async fn delete_by_id(&self, id: u64) -> Result<()>;
}

#[async_trait]
pub trait UserRepository: Send + Sync + 'static {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Fails with `Conflict` if the email is already registered.
    async fn insert_user(&self, user: NewUser) -> Result<User>;
}
