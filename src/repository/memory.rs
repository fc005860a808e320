use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{LinkRepository, UserRepository};
use crate::error::{AppError, Result};
use crate::model::{NewShortLink, NewUser, ShortLink, User};

#[derive(Default)]
struct Inner {
    links: BTreeMap<u64, ShortLink>,
    users: BTreeMap<u64, User>,
    last_link_id: u64,
    last_user_id: u64,
}

/// In-process store with the same uniqueness rules as the redb store.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LinkRepository for MemoryStore {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<ShortLink>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.links.values().find(|l| l.slug == slug).cloned())
    }

    async fn find_by_id(&self, id: u64) -> Result<Option<ShortLink>> {
        Ok(self.inner.lock().unwrap().links.get(&id).cloned())
    }

    async fn find_by_owner(&self, owner_id: u64) -> Result<Vec<ShortLink>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .links
            .values()
            .filter(|l| l.owner_id == Some(owner_id))
            .cloned()
            .collect())
    }

    async fn insert(&self, link: NewShortLink) -> Result<ShortLink> {
        let mut inner = self.inner.lock().unwrap();
        if inner.links.values().any(|l| l.slug == link.slug) {
            return Err(AppError::slug_taken());
        }
        inner.last_link_id += 1;
        let record = ShortLink {
            id: inner.last_link_id,
            slug: link.slug,
            long_url: link.long_url,
            click_count: 0,
            created_at: link.created_at,
            owner_id: link.owner_id,
        };
        inner.links.insert(record.id, record.clone());
        Ok(record)
    }

    async fn save(&self, link: &ShortLink) -> Result<ShortLink> {
        let mut inner = self.inner.lock().unwrap();
        if inner
            .links
            .values()
            .any(|l| l.slug == link.slug && l.id != link.id)
        {
            return Err(AppError::slug_taken());
        }
        let stored = inner
            .links
            .get_mut(&link.id)
            .ok_or_else(AppError::url_not_found)?;
        stored.slug = link.slug.clone();
        stored.long_url = link.long_url.clone();
        Ok(stored.clone())
    }

    async fn increment_click_count(&self, id: u64) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let stored = inner.links.get_mut(&id).ok_or_else(AppError::url_not_found)?;
        stored.click_count += 1;
        Ok(())
    }

    async fn delete_by_id(&self, id: u64) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .links
            .remove(&id)
            .map(|_| ())
            .ok_or_else(AppError::url_not_found)
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn insert_user(&self, user: NewUser) -> Result<User> {
        let mut inner = self.inner.lock().unwrap();
        if inner.users.values().any(|u| u.email == user.email) {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }
        inner.last_user_id += 1;
        let record = User {
            id: inner.last_user_id,
            email: user.email,
            password_hash: user.password_hash,
            created_at: user.created_at,
        };
        inner.users.insert(record.id, record.clone());
        Ok(record)
    }
}
