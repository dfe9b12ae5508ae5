//! Shared constants.

/// Characters that open and close a quoted classic-command argument.
pub const DELIMITERS: &[char] = &['"', '\'', '`'];

/// Default dirty-queue flush cadence, in seconds (`flush_interval_seconds`).
pub const DEFAULT_FLUSH_INTERVAL_SECONDS: u64 = 15;

/// How often the announcement scheduler scans tenants, in seconds.
pub const SCHEDULER_TICK_SECONDS: u64 = 60;

/// Minimum time between two accepted nudges for the same quest.
pub const NUDGE_COOLDOWN_HOURS: i64 = 48;

/// Default wizard `_ask` timeout for quest sessions, in seconds.
pub const QUEST_WIZARD_TIMEOUT_SECONDS: u64 = 300;

/// Default wizard `_ask` timeout for character sessions, in seconds.
pub const CHARACTER_WIZARD_TIMEOUT_SECONDS: u64 = 180;

/// Total timeout for outbound calls to the self-call HTTP/GraphQL surface.
pub const EXTERNAL_HTTP_TIMEOUT_SECONDS: u64 = 10;

/// Message shown whenever a duplicate signup is attempted, regardless of
/// whether the rejection came from the local state machine or the remote API.
pub const ALREADY_SIGNED_UP_MESSAGE: &str = "You already requested to join this quest.";
