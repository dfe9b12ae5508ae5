//! The long-lived dirty-flush task (spec §4.1, §5 "One dirty-flush task").

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc::UnboundedReceiver;

use crate::cache::{DirtyKey, FlushPath, GuildCacheEngine};
use crate::domain::User;
use crate::repository::{RepoResult, RepositoryError, UsersRepo};
use crate::utils::prelude::*;

/// Runs until the channel closes (process shutdown). Sleeps
/// `flush_interval_seconds`, then drains the queue non-blockingly, coalesces
/// by `(guild_id, user_id)` last-writer-wins, and persists each surviving
/// entry. A single user's failure is logged and counted but never aborts
/// the batch (spec §4.1, §5).
///
/// `path` selects how each user is persisted (spec §4.1, "Two persistence
/// paths", chosen once at startup by `flush_via_adapter`): [`FlushPath::DirectUpsert`]
/// awaits `repo.upsert` in place; [`FlushPath::SyncAdapter`] treats the same
/// call as a synchronous adapter call and offloads it onto the blocking
/// worker pool via `tokio::task::spawn_blocking`, so a slow adapter call
/// can't stall the event loop.
pub async fn run(
    engine: Arc<GuildCacheEngine>,
    repo: Arc<dyn UsersRepo>,
    mut dirty_rx: UnboundedReceiver<DirtyKey>,
    flush_interval_seconds: u64,
    path: FlushPath,
) {
    let interval = Duration::from_secs(flush_interval_seconds);
    loop {
        tokio::time::sleep(interval).await;

        let queue_size = dirty_rx.len();
        let mut to_flush: HashMap<DirtyKey, User> = HashMap::new();
        while let Ok(key) = dirty_rx.try_recv() {
            let (guild_id, user_id) = key;
            let Some(Some(user)) =
                engine.with_guild(guild_id, |entry| entry.users.get(&user_id).cloned())
            else {
                debug!(guild_id, user_id, "skipping flush: no cached user");
                continue;
            };
            to_flush.insert(key, user);
        }

        if to_flush.is_empty() {
            continue;
        }

        let start = Instant::now();
        let mut errors: u64 = 0;
        let batch_size = to_flush.len() as u64;

        for ((guild_id, user_id), mut user) in to_flush {
            user.guild_id = guild_id;
            let result = match path {
                FlushPath::DirectUpsert => repo.upsert(&user).await,
                FlushPath::SyncAdapter => persist_via_adapter(repo.clone(), user.clone()).await,
            };
            if let Err(e) = result {
                error!(guild_id, user_id, "failed to persist user: {e}");
                errors += 1;
            } else {
                debug!(guild_id, user_id, user_id_value = %user.user_id, "persisted user");
            }
        }

        let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
        info!(
            dirty_qsize = queue_size,
            batch = batch_size,
            duration_ms,
            "flush_metrics"
        );
        engine.record_batch(batch_size, duration_ms, errors);
    }
}

/// The `true` leg of `flush_via_adapter`: runs `repo.upsert` on the blocking
/// worker pool instead of inline on the event loop, matching spec §4.1's
/// "synchronous adapter call, executed on a worker pool" framing for an
/// adapter whose write path may block.
async fn persist_via_adapter(repo: Arc<dyn UsersRepo>, user: User) -> RepoResult<()> {
    let handle = tokio::runtime::Handle::current();
    tokio::task::spawn_blocking(move || handle.block_on(repo.upsert(&user)))
        .await
        .unwrap_or_else(|e| Err(RepositoryError::Transient(e.to_string())))
}
