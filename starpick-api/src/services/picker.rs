//! Random Star Picker
//!
//! Picks a uniformly random star while avoiding recent repeats. Each scope
//! keeps a FIFO window of recently picked ids; the window is bounded at
//! floor(0.8 x catalog size), recomputed against the live catalog on every
//! pick, so at least one star is always eligible once the catalog is
//! non-empty.
//!
//! The pick itself uses a count/sample pair against storage instead of
//! loading the whole catalog: count the eligible subset, draw a random
//! index, fetch that one row. A concurrent catalog change can invalidate
//! the index between the two calls; the sample then comes back `None` and
//! the pick retries with a fresh count.

use starpick_core::{CacheScope, RecencyCacheState, Star};
use starpick_storage::AppStore;

use crate::error::{ApiError, ApiResult};

/// Retries when a concurrent catalog change invalidates the sampled index.
const MAX_SAMPLE_RETRIES: u32 = 3;

/// Pick a random star from the catalog, excluding the scope's recency
/// window, and record the pick in the window.
pub async fn pick_random_star(store: &dyn AppStore, scope: CacheScope) -> ApiResult<Star> {
    use rand::Rng;

    let total = store.star_count().await?;
    if total == 0 {
        return Err(ApiError::empty_catalog());
    }

    let mut cache = store.cache_load_or_init(scope).await?;
    let capacity = RecencyCacheState::capacity_for(total);

    // Trim before sampling, not only after: the catalog may have shrunk
    // since the last pick, and an oversized window could exclude every
    // survivor. The most recent pick is always retained, matching
    // `note_pick`.
    let bound = capacity.max(1);
    if cache.recent_ids.len() > bound {
        let excess = cache.recent_ids.len() - bound;
        cache.recent_ids.drain(..excess);
    }

    for attempt in 0..MAX_SAMPLE_RETRIES {
        let available = store.star_count_excluding(&cache.recent_ids).await?;
        if available == 0 {
            // A one-star catalog whose star was just picked, or the catalog
            // changed underneath us mid-pick.
            return Err(ApiError::exclusion_exhausted());
        }

        let index = rand::rng().random_range(0..available);
        match store.star_sample_excluding(&cache.recent_ids, index).await? {
            Some(star) => {
                cache.note_pick(star.star_id, capacity);
                store.cache_save(&cache).await?;

                tracing::debug!(
                    star_id = %star.star_id,
                    name = %star.name,
                    window_len = cache.recent_ids.len(),
                    "Random pick"
                );
                return Ok(star);
            }
            None => {
                tracing::debug!(attempt, index, "Sampled index went stale, retrying");
            }
        }
    }

    Err(ApiError::service_unavailable(
        "Catalog is changing too quickly, retry the pick",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use starpick_core::Tier;
    use starpick_storage::{CatalogStore, MemoryStore, RecencyCacheStore};

    async fn seed(store: &MemoryStore, n: usize) {
        for i in 0..n {
            store
                .star_create(&format!("Star-{i:02}"), Tier::new(1 + (i % 5) as i16).unwrap())
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn empty_catalog_is_a_not_found() {
        let store = MemoryStore::new();
        let err = pick_random_star(&store, CacheScope::Global)
            .await
            .unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::EmptyCatalog);
    }

    #[tokio::test]
    async fn single_star_catalog_exhausts_after_one_pick() {
        let store = MemoryStore::new();
        seed(&store, 1).await;

        let star = pick_random_star(&store, CacheScope::Global).await.unwrap();
        assert_eq!(star.name, "Star-00");

        // The only star is now in the window and stays there.
        let err = pick_random_star(&store, CacheScope::Global)
            .await
            .unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::ExclusionExhausted);

        // A second star makes the catalog pickable again.
        store.star_create("Star-01", Tier::new(3).unwrap()).await.unwrap();
        let star = pick_random_star(&store, CacheScope::Global).await.unwrap();
        assert_eq!(star.name, "Star-01");
    }

    #[tokio::test]
    async fn pick_never_lands_in_the_window() {
        let store = MemoryStore::new();
        seed(&store, 10).await;

        for _ in 0..50 {
            let before = store.cache_load_or_init(CacheScope::Global).await.unwrap();
            let star = pick_random_star(&store, CacheScope::Global).await.unwrap();
            assert!(
                !before.recent_ids.contains(&star.star_id),
                "picked a star inside the recency window"
            );
        }
    }

    #[tokio::test]
    async fn window_is_bounded_by_capacity() {
        let store = MemoryStore::new();
        seed(&store, 10).await;

        for _ in 0..30 {
            pick_random_star(&store, CacheScope::Global).await.unwrap();
        }
        let cache = store.cache_load_or_init(CacheScope::Global).await.unwrap();
        assert!(cache.recent_ids.len() <= RecencyCacheState::capacity_for(10));
    }

    #[tokio::test]
    async fn shrinking_catalog_recovers() {
        let store = MemoryStore::new();
        seed(&store, 10).await;

        for _ in 0..8 {
            pick_random_star(&store, CacheScope::Global).await.unwrap();
        }

        // Delete most of the catalog; the oversized window must be trimmed
        // on the next pick rather than excluding all survivors.
        let stars = store.star_list().await.unwrap();
        for star in &stars[..8] {
            store.star_delete(star.star_id).await.unwrap();
        }

        let star = pick_random_star(&store, CacheScope::Global).await.unwrap();
        assert!(stars[8..].iter().any(|s| s.star_id == star.star_id));
    }

    #[tokio::test]
    async fn scopes_have_independent_windows() {
        let store = MemoryStore::new();
        seed(&store, 5).await;
        let user = starpick_core::new_entity_id();

        pick_random_star(&store, CacheScope::Global).await.unwrap();

        let user_cache = store
            .cache_load_or_init(CacheScope::User(user))
            .await
            .unwrap();
        assert!(user_cache.recent_ids.is_empty());
    }
}
