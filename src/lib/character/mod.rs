//! Character use-cases: the player-facing counterpart to `quest::service`
//! (spec §3 "Character"), grounded on the same cache-then-repository shape.

pub mod service;
