//! Per-guild state engine: in-process cache of entities per tenant, a
//! dirty-write queue, and the periodic flush loop that drains it (spec
//! §4.1), grounded on the original bot's `core/cache.py`.

pub mod flush;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::domain::{Character, CharacterId, Quest, QuestId, Summary, SummaryId, User};

/// `(guild_id, external_user_id)` — the dirty queue's canonical hand-off
/// unit (spec §4.1, GLOSSARY "Dirty queue").
pub type DirtyKey = (u64, u64);

/// The per-tenant entry: `{users, quests, characters, summaries}` keyed as
/// described in §3/§4.1. `users` is additionally keyed by the external
/// (Discord) id, since that's what gateway events carry.
#[derive(Default)]
pub struct GuildEntry {
    pub users: HashMap<u64, User>,
    pub quests: HashMap<QuestId, Quest>,
    pub characters: HashMap<CharacterId, Character>,
    pub summaries: HashMap<SummaryId, Summary>,
}

/// Accumulators published alongside each flush batch (spec §4.1).
#[derive(Debug, Default, Clone, Copy)]
pub struct FlushStats {
    pub total_batches: u64,
    pub total_items: u64,
    pub last_duration_ms: f64,
    pub errors: u64,
}

/// Whether the flush loop persists via a direct upsert or via the
/// synchronous adapter call offloaded to a worker thread (spec §4.1,
/// "Two persistence paths").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushPath {
    DirectUpsert,
    SyncAdapter,
}

/// The process-wide guild cache plus its dirty queue. Cloning shares the
/// same underlying state (cheap `Arc`-like handles via `RwLock` behind a
/// `&'static`-free struct stored once in the bot [`Context`]).
pub struct GuildCacheEngine {
    guilds: RwLock<HashMap<u64, GuildEntry>>,
    dirty_tx: UnboundedSender<DirtyKey>,
    stats: RwLock<FlushStats>,
    total_batches: AtomicU64,
}

impl GuildCacheEngine {
    /// Construct the engine and the receiving half of its dirty queue. The
    /// receiver is handed to the flush loop task at startup.
    pub fn new() -> (Self, UnboundedReceiver<DirtyKey>) {
        let (dirty_tx, dirty_rx) = mpsc::unbounded_channel();
        (
            Self {
                guilds: RwLock::new(HashMap::new()),
                dirty_tx,
                stats: RwLock::new(FlushStats::default()),
                total_batches: AtomicU64::new(0),
            },
            dirty_rx,
        )
    }

    /// Idempotent: returns the existing entry or creates defaults on first
    /// touch (spec §4.1, §8 Idempotence).
    pub fn ensure_guild_entry(&self, guild_id: u64) {
        let exists = self.guilds.read().unwrap().contains_key(&guild_id);
        if !exists {
            self.guilds
                .write()
                .unwrap()
                .entry(guild_id)
                .or_insert_with(GuildEntry::default);
        }
    }

    pub fn drop_guild(&self, guild_id: u64) {
        self.guilds.write().unwrap().remove(&guild_id);
    }

    /// Enqueue a dirty-write. Any mutation to a cached user must call this
    /// after the mutation completes.
    pub fn mark_dirty(&self, guild_id: u64, external_user_id: u64) {
        // An unbounded sender only errs if the receiver was dropped, which
        // only happens during shutdown; there's nothing useful to do.
        let _ = self.dirty_tx.send((guild_id, external_user_id));
    }

    pub fn with_guild<R>(&self, guild_id: u64, f: impl FnOnce(&GuildEntry) -> R) -> Option<R> {
        self.guilds.read().unwrap().get(&guild_id).map(f)
    }

    pub fn with_guild_mut<R>(
        &self,
        guild_id: u64,
        f: impl FnOnce(&mut GuildEntry) -> R,
    ) -> Option<R> {
        self.guilds.write().unwrap().get_mut(&guild_id).map(f)
    }

    /// Read a user, then enqueue it dirty in one cooperative step (no
    /// intervening await), per the shared-resource policy of §5.
    pub fn mutate_user(
        &self,
        guild_id: u64,
        external_user_id: u64,
        f: impl FnOnce(&mut User),
    ) -> bool {
        let mutated = self
            .with_guild_mut(guild_id, |entry| {
                if let Some(user) = entry.users.get_mut(&external_user_id) {
                    f(user);
                    true
                } else {
                    false
                }
            })
            .unwrap_or(false);
        if mutated {
            self.mark_dirty(guild_id, external_user_id);
        }
        mutated
    }

    pub fn stats(&self) -> FlushStats {
        *self.stats.read().unwrap()
    }

    fn record_batch(&self, batch_size: u64, duration_ms: f64, errors: u64) {
        self.total_batches.fetch_add(1, Ordering::Relaxed);
        let mut stats = self.stats.write().unwrap();
        stats.total_batches += 1;
        stats.total_items += batch_size;
        stats.last_duration_ms = duration_ms;
        stats.errors += errors;
    }
}
