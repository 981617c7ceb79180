//! Reconciliation statistics
//!
//! Tracks what a single reconciliation tick observed and changed.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Statistics from a single reconciliation tick
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickStats {
    /// Entities seen in the roster
    pub entities: usize,

    /// Entities skipped because they hold the bypass permission
    pub bypassed: usize,

    /// Slots emptied by the cosmetic sweep
    pub slots_cleared: usize,

    /// Dead -> alive transitions observed
    pub respawns: usize,

    /// Starter outfits applied on the respawn path
    pub templates_applied: usize,

    /// Respawn windows closed (applied or already dressed)
    pub windows_closed: usize,

    /// First-contact initializations launched
    pub inits_launched: usize,

    /// Offline entities whose records were purged
    pub purged: usize,

    /// Whether the ledger was written during this tick
    pub ledger_saved: bool,

    /// Whether the tick stopped early (shutdown or roster failure)
    pub aborted: bool,

    /// Time taken to complete the tick
    pub duration: Option<Duration>,
}

impl TickStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the tick issued any equipment mutation
    pub fn changed_equipment(&self) -> bool {
        self.slots_cleared > 0 || self.templates_applied > 0
    }

    /// Format a human-readable summary
    pub fn summary(&self) -> String {
        format!(
            "Tick: {} entities | {} bypassed | {} slots cleared | {} respawns ({} outfits, {} windows closed) | {} inits | {} purged{}",
            self.entities,
            self.bypassed,
            self.slots_cleared,
            self.respawns,
            self.templates_applied,
            self.windows_closed,
            self.inits_launched,
            self.purged,
            if self.ledger_saved { " | ledger saved" } else { "" }
        )
    }
}

/// Builder for accumulating tick stats
#[derive(Debug, Clone)]
pub struct TickStatsBuilder {
    stats: TickStats,
    start_time: Instant,
}

impl TickStatsBuilder {
    pub fn new() -> Self {
        Self {
            stats: TickStats::new(),
            start_time: Instant::now(),
        }
    }

    pub fn record_entity(&mut self) {
        self.stats.entities += 1;
    }

    pub fn record_bypassed(&mut self) {
        self.stats.bypassed += 1;
    }

    pub fn record_cleared(&mut self, slots: usize) {
        self.stats.slots_cleared += slots;
    }

    pub fn record_respawn(&mut self) {
        self.stats.respawns += 1;
    }

    pub fn record_template_applied(&mut self) {
        self.stats.templates_applied += 1;
    }

    pub fn record_window_closed(&mut self) {
        self.stats.windows_closed += 1;
    }

    pub fn record_init_launched(&mut self) {
        self.stats.inits_launched += 1;
    }

    pub fn record_purged(&mut self, count: usize) {
        self.stats.purged += count;
    }

    pub fn record_ledger_saved(&mut self) {
        self.stats.ledger_saved = true;
    }

    pub fn record_aborted(&mut self) {
        self.stats.aborted = true;
    }

    /// Finalize and return the stats
    pub fn finish(mut self) -> TickStats {
        self.stats.duration = Some(self.start_time.elapsed());
        self.stats
    }

    /// Get a reference to the current stats (without finishing)
    pub fn stats(&self) -> &TickStats {
        &self.stats
    }
}

impl Default for TickStatsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_builder() {
        let mut builder = TickStatsBuilder::new();

        builder.record_entity();
        builder.record_entity();
        builder.record_bypassed();
        builder.record_cleared(2);
        builder.record_respawn();
        builder.record_template_applied();
        builder.record_window_closed();
        builder.record_purged(3);
        assert_eq!(builder.stats().entities, 2);

        let stats = builder.finish();

        assert_eq!(stats.entities, 2);
        assert_eq!(stats.bypassed, 1);
        assert_eq!(stats.slots_cleared, 2);
        assert_eq!(stats.templates_applied, 1);
        assert_eq!(stats.purged, 3);
        assert!(!stats.ledger_saved);
        assert!(!stats.aborted);
        assert!(stats.changed_equipment());
        assert!(stats.duration.is_some());
    }

    #[test]
    fn test_summary() {
        let mut stats = TickStats::new();
        assert!(!stats.changed_equipment());

        stats.entities = 12;
        stats.slots_cleared = 4;
        stats.respawns = 2;
        stats.templates_applied = 1;
        stats.windows_closed = 2;
        stats.inits_launched = 3;

        let summary = stats.summary();
        assert!(summary.contains("12 entities"));
        assert!(summary.contains("4 slots cleared"));
        assert!(summary.contains("2 respawns (1 outfits, 2 windows closed)"));
        assert!(summary.contains("3 inits"));
        assert!(!summary.contains("ledger saved"));

        stats.ledger_saved = true;
        assert!(stats.summary().ends_with("| ledger saved"));
    }
}
