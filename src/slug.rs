//! Slug allocation for new short links
//!
//! A caller-supplied slug is accepted only if no link holds it yet. Otherwise
//! a candidate is drawn from a [`SlugGenerator`] and redrawn on collision, up
//! to a configured number of attempts.

use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;

use crate::error::{AppError, Result};
use crate::repository::LinkRepository;

pub const DEFAULT_SLUG_LENGTH: usize = 7;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 32;

/// Source of candidate slugs
pub trait SlugGenerator: Send + Sync + 'static {
    fn generate(&self) -> String;
}

/// Random slugs over the base64url alphabet (`A-Z a-z 0-9 - _`)
#[derive(Debug, Clone)]
pub struct RandomSlugs {
    length: usize,
}

impl RandomSlugs {
    pub fn new(length: usize) -> Self {
        Self {
            length: length.max(1),
        }
    }
}

impl Default for RandomSlugs {
    fn default() -> Self {
        Self::new(DEFAULT_SLUG_LENGTH)
    }
}

impl SlugGenerator for RandomSlugs {
    fn generate(&self) -> String {
        // `length` bytes encode to at least `length` characters.
        let mut bytes = vec![0u8; self.length];
        rand::rng().fill_bytes(&mut bytes);
        let mut slug = URL_SAFE_NO_PAD.encode(&bytes);
        slug.truncate(self.length);
        slug
    }
}

#[derive(Clone)]
pub struct SlugAllocator {
    repo: Arc<dyn LinkRepository>,
    generator: Arc<dyn SlugGenerator>,
    max_attempts: u32,
}

impl SlugAllocator {
    pub fn new(
        repo: Arc<dyn LinkRepository>,
        generator: Arc<dyn SlugGenerator>,
        max_attempts: u32,
    ) -> Self {
        Self {
            repo,
            generator,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Decides the slug for a new link.
    ///
    /// The returned slug is free at the moment of the check only; the store's
    /// insert re-checks it inside its write transaction.
    pub async fn allocate(&self, requested: Option<&str>) -> Result<String> {
        if let Some(slug) = requested {
            self.ensure_available(slug).await?;
            return Ok(slug.to_string());
        }

        for attempt in 1..=self.max_attempts {
            let candidate = self.generator.generate();
            if self.repo.find_by_slug(&candidate).await?.is_none() {
                return Ok(candidate);
            }
            tracing::debug!(attempt, slug = %candidate, "generated slug collided, drawing again");
        }

        tracing::error!(
            attempts = self.max_attempts,
            "could not find a free slug, slug space may be exhausted"
        );
        Err(AppError::SlugSpaceExhausted(self.max_attempts))
    }

    /// Fails with `Conflict` if a link already uses `slug`.
    pub async fn ensure_available(&self, slug: &str) -> Result<()> {
        match self.repo.find_by_slug(slug).await? {
            Some(_) => Err(AppError::slug_taken()),
            None => Ok(()),
        }
    }
}
