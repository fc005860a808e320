//! Link operations behind the HTTP handlers
//!
//! Creation goes through the [`SlugAllocator`]; every owner-only operation
//! (update, delete, stats) loads the link and passes it through
//! [`authorize_owner`] first.

use std::sync::Arc;

use chrono::Utc;

use crate::error::{AppError, Result};
use crate::model::{CreateUrlRequest, LinkStats, NewShortLink, ShortLink, UpdateUrlRequest};
use crate::repository::LinkRepository;
use crate::slug::SlugAllocator;

/// Passes only when `requester` is the link's owner. Anonymous links have no
/// owner and are therefore never mutable through this check.
pub fn authorize_owner(link: &ShortLink, requester: u64) -> Result<()> {
    match link.owner_id {
        Some(owner) if owner == requester => Ok(()),
        _ => Err(AppError::Forbidden),
    }
}

#[derive(Clone)]
pub struct LinkService {
    repo: Arc<dyn LinkRepository>,
    allocator: SlugAllocator,
}

impl LinkService {
    pub fn new(repo: Arc<dyn LinkRepository>, allocator: SlugAllocator) -> Self {
        Self { repo, allocator }
    }

    #[tracing::instrument(skip(self, request), fields(requested = ?request.slug))]
    pub async fn create(&self, request: CreateUrlRequest, owner_id: Option<u64>) -> Result<ShortLink> {
        let slug = self.allocator.allocate(request.slug.as_deref()).await?;
        let link = self
            .repo
            .insert(NewShortLink {
                slug,
                long_url: request.long_url,
                owner_id,
                created_at: Utc::now(),
            })
            .await?;

        tracing::info!(id = link.id, slug = %link.slug, "short link created");
        Ok(link)
    }

    /// Resolves `slug` to its target and counts the visit.
    ///
    /// The increment is issued before returning, but a failed increment only
    /// gets logged; the visitor is redirected either way.
    pub async fn resolve_and_count(&self, slug: &str) -> Result<String> {
        let link = self
            .repo
            .find_by_slug(slug)
            .await?
            .ok_or_else(AppError::slug_not_found)?;

        if let Err(err) = self.repo.increment_click_count(link.id).await {
            tracing::warn!(id = link.id, err = %err, "failed to count click");
        }

        Ok(link.long_url)
    }

    pub async fn list_for_owner(&self, owner_id: u64) -> Result<Vec<ShortLink>> {
        self.repo.find_by_owner(owner_id).await
    }

    async fn owned(&self, id: u64, requester: u64) -> Result<ShortLink> {
        let link = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or_else(AppError::url_not_found)?;
        authorize_owner(&link, requester)?;
        Ok(link)
    }

    #[tracing::instrument(skip(self, request))]
    pub async fn update(&self, id: u64, request: UpdateUrlRequest, requester: u64) -> Result<ShortLink> {
        let mut link = self.owned(id, requester).await?;

        if let Some(slug) = request.slug.filter(|s| *s != link.slug) {
            self.allocator.ensure_available(&slug).await?;
            link.slug = slug;
        }
        if let Some(long_url) = request.long_url {
            link.long_url = long_url;
        }

        self.repo.save(&link).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: u64, requester: u64) -> Result<()> {
        self.owned(id, requester).await?;
        self.repo.delete_by_id(id).await?;
        tracing::info!(id, "short link deleted");
        Ok(())
    }

    pub async fn stats(&self, id: u64, requester: u64) -> Result<LinkStats> {
        let link = self.owned(id, requester).await?;
        Ok(LinkStats {
            click_count: link.click_count,
        })
    }
}
