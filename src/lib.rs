/*!
 * Skinguard - cosmetic restriction engine for game servers
 *
 * Keeps connected players in a canonical starter outfit:
 * - Cached classification of cosmetic items (asset attributes and name keywords)
 * - Starter outfit on first contact, recorded in a durable ledger
 * - Re-dressing of players who respawn naked
 * - Immediate and deferred removal of cosmetics as they are worn
 * - Client-side skin, cosmetic and mythic rendering suppression
 *
 * The game server itself is reached through the `skinguard-host` traits.
 *
 * Version: 0.1.0
 * Author: Shane Wall <shaneawall@gmail.com>
 */

pub mod classify;
pub mod config;
pub mod decide;
pub mod error;
pub mod first_contact;
pub mod ledger;
pub mod lifecycle;
pub mod logging;
pub mod monitor;
pub mod reaction;
pub mod service;
pub mod stats;

mod enforce;

// Re-export commonly used types
pub use classify::{ClassificationCache, CosmeticRules};
pub use config::{GuardConfig, LogLevel, OutfitTemplate};
pub use error::{GuardError, Result};
pub use first_contact::InitOutcome;
pub use ledger::LedgerStore;
pub use lifecycle::{LifeState, LifecycleTracker, Transition};
pub use reaction::ReactionOutcome;
pub use service::{GuardService, BYPASS_PERMISSION};
pub use stats::TickStats;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
