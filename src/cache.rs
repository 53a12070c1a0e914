use std::ops::DerefMut;
use std::time::Duration;

use log::{info, warn};
use r2d2_redis::r2d2;
use r2d2_redis::redis::{Commands, RedisError};
use r2d2_redis::RedisConnectionManager;

use crate::food_api::SearchPage;

pub type RedisPool = r2d2::Pool<RedisConnectionManager>;

const CACHE_POOL_MAX_OPEN: u32 = 16;
const CACHE_POOL_MIN_IDLE: u32 = 2;
const CACHE_POOL_EXPIRE_SECONDS: u64 = 60;
const CACHE_CONNECT_TIMEOUT_SECONDS: u64 = 2;

/// Redis cache for food search pages. A missing or unreachable redis turns
/// every lookup into a miss; it never fails a request.
pub struct SearchCache {
    pool: Option<RedisPool>,
    ttl_seconds: usize,
}

impl SearchCache {
    pub fn connect(redis_url: Option<&str>, ttl_seconds: usize) -> Self {
        let pool = redis_url.and_then(|url| match build_pool(url) {
            Ok(pool) => {
                info!("search cache connected to redis");
                Some(pool)
            }
            Err(e) => {
                warn!("search cache disabled, redis unavailable: {}", e);
                None
            }
        });
        Self { pool, ttl_seconds }
    }

    pub fn disabled() -> Self {
        Self {
            pool: None,
            ttl_seconds: 0,
        }
    }

    /// The term is length-prefixed so no term/brand pair can spell another.
    pub fn key(term: &str, brand: Option<&str>) -> String {
        let term = term.trim().to_lowercase();
        let brand = brand.unwrap_or("").trim().to_lowercase();
        format!("food-search:{}:{}:{}", term.len(), term, brand)
    }

    /// Blocking; call from `web::block`.
    pub fn get(&self, key: &str) -> Option<SearchPage> {
        let pool = self.pool.as_ref()?;
        let mut redis_conn = match pool.get() {
            Ok(conn) => conn,
            Err(e) => {
                warn!("search cache lookup skipped: {}", e);
                return None;
            }
        };
        let value: Result<Vec<u8>, RedisError> = redis_conn.deref_mut().get(key);
        match value {
            // a missing key reads as an empty value
            Ok(value) if value.is_empty() => None,
            Ok(value) => match bincode::deserialize(&value) {
                Ok(page) => Some(page),
                Err(e) => {
                    warn!("discarding unreadable cache entry {}: {}", key, e);
                    None
                }
            },
            Err(e) => {
                warn!("search cache lookup failed: {}", e);
                None
            }
        }
    }

    /// Blocking; call from `web::block`.
    pub fn put(&self, key: &str, page: &SearchPage) {
        let pool = match self.pool.as_ref() {
            Some(pool) => pool,
            None => return,
        };
        let value = match bincode::serialize(page) {
            Ok(value) => value,
            Err(e) => {
                warn!("could not encode search page for cache: {}", e);
                return;
            }
        };
        let stored = pool.get().map_err(|e| e.to_string()).and_then(|mut redis_conn| {
            redis_conn
                .deref_mut()
                .set_ex::<_, _, ()>(key, value, self.ttl_seconds)
                .map_err(|e| e.to_string())
        });
        if let Err(e) = stored {
            warn!("search cache store failed: {}", e);
        }
    }
}

fn build_pool(redis_url: &str) -> Result<RedisPool, String> {
    let manager = RedisConnectionManager::new(redis_url).map_err(|e| e.to_string())?;
    r2d2::Pool::builder()
        .max_size(CACHE_POOL_MAX_OPEN)
        .max_lifetime(Some(Duration::from_secs(CACHE_POOL_EXPIRE_SECONDS)))
        .min_idle(Some(CACHE_POOL_MIN_IDLE))
        .connection_timeout(Duration::from_secs(CACHE_CONNECT_TIMEOUT_SECONDS))
        .build(manager)
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::food_api::{FoodHit, SearchCriteria};

    #[test]
    fn keys_ignore_case_and_padding() {
        assert_eq!(
            SearchCache::key(" Chips ", Some("LAY'S")),
            SearchCache::key("chips", Some("lay's"))
        );
        assert_ne!(SearchCache::key("chips", None), SearchCache::key("chips", Some("lay's")));
    }

    #[test]
    fn separators_inside_terms_do_not_collide() {
        assert_ne!(SearchCache::key("a:b", None), SearchCache::key("a", Some("b:")));
        assert_ne!(SearchCache::key("a:", Some("b")), SearchCache::key("a", Some(":b")));
        assert_eq!(SearchCache::key("Ramen", Some("Nissin")), "food-search:5:ramen:nissin");
    }

    #[test]
    fn disabled_cache_always_misses() {
        let cache = SearchCache::disabled();
        let page = SearchPage {
            food_search_criteria: SearchCriteria {
                general_search_input: "ramen".into(),
            },
            total_hits: 1,
            current_page: 1,
            total_pages: 1,
            foods: vec![FoodHit {
                fdc_id: 1,
                description: "RAMEN".into(),
                data_type: Some("Branded".into()),
                brand_owner: Some("Nissin".into()),
            }],
        };
        let key = SearchCache::key("ramen", None);
        cache.put(&key, &page);
        assert_eq!(cache.get(&key), None);
    }
}
