//! Background sweep that drops idle rooms from the store's cache.

use std::time::Duration;

use cinesync_rooms::application::room_store::RoomStore;
use tokio::task::JoinHandle;
use tracing::debug;

/// Spawns a task that calls [`RoomStore::evict_idle`] every `every`.
pub fn spawn_idle_eviction(store: RoomStore, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.reset();
        loop {
            ticker.tick().await;
            let evicted = store.evict_idle();
            if evicted > 0 {
                debug!(evicted, cached = store.cached_rooms(), "evicted idle rooms");
            }
        }
    })
}
