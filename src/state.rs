use std::sync::Arc;

use chrono::Duration;

use crate::auth::AuthService;
use crate::config::Config;
use crate::database::RedbStore;
use crate::rate_limit::RateLimits;
use crate::service::LinkService;
use crate::slug::{RandomSlugs, SlugAllocator};

/// Application state shared across all request handlers
///
/// Built once at startup and cloned into every handler; the store it wraps
/// is the only shared mutable state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub links: LinkService,
    pub auth: AuthService,
    pub limits: Arc<RateLimits>,
}

impl AppState {
    pub fn new(store: RedbStore, config: Config) -> Self {
        let store = Arc::new(store);
        let allocator = SlugAllocator::new(
            store.clone(),
            Arc::new(RandomSlugs::new(config.slug_length)),
            config.slug_max_attempts,
        );

        Self {
            links: LinkService::new(store.clone(), allocator),
            auth: AuthService::new(
                store,
                &config.jwt_secret,
                Duration::seconds(config.jwt_ttl_secs),
                config.bcrypt_cost,
            ),
            limits: Arc::new(RateLimits::from_config(&config)),
            config: Arc::new(config),
        }
    }
}
