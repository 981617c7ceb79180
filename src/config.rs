/*!
 * Configuration types for Skinguard
 */

use crate::classify::{DEFAULT_COSMETIC_FLAGS, DEFAULT_COSMETIC_KEYWORDS};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use skinguard_host::{ItemId, Slot};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File name of the first-contact ledger inside the data directory
pub const LEDGER_FILE_NAME: &str = "first_join_players.txt";

pub const DEFAULT_MONITOR_INTERVAL_SECS: f32 = 1.0;
pub const MIN_MONITOR_INTERVAL_SECS: f32 = 0.25;
pub const MAX_MONITOR_INTERVAL_SECS: f32 = 10.0;

pub const DEFAULT_SAVE_INTERVAL_SECS: f32 = 15.0;
pub const MIN_SAVE_INTERVAL_SECS: f32 = 1.0;
pub const MAX_SAVE_INTERVAL_SECS: f32 = 120.0;

/// Highest wear quality the host accepts
pub const MAX_QUALITY: u8 = 100;

/// Main configuration for the guard service
///
/// Keys are PascalCase in the TOML file (`BlockSkins`, `StarterOutfit`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GuardConfig {
    /// Force the client-side cosmetic rendering switch off
    #[serde(default = "default_true")]
    pub block_cosmetics: bool,

    /// Force the client-side skin rendering switch off
    #[serde(default = "default_true")]
    pub block_skins: bool,

    /// Force the client-side mythic rendering switch off
    #[serde(default = "default_true")]
    pub block_mythics: bool,

    /// Strip every slot on first contact before applying the starter outfit
    #[serde(default = "default_true")]
    pub remove_wearables_on_first_join: bool,

    /// Reconciliation period in seconds (clamped to 0.25-10)
    #[serde(default = "default_monitor_interval")]
    pub monitor_interval_seconds: f32,

    /// Ledger save debounce in seconds (clamped to 1-120)
    #[serde(default = "default_save_interval")]
    pub save_interval_seconds: f32,

    /// Sent once on first contact; empty disables it
    #[serde(default = "default_first_join_message")]
    pub first_join_message: String,

    /// Sent when a cosmetic item is removed; empty disables it
    #[serde(default = "default_skin_blocked_message")]
    pub skin_blocked_message: String,

    /// Boolean asset attributes that mark an item as cosmetic
    #[serde(default = "default_cosmetic_flags")]
    pub cosmetic_flags: Vec<String>,

    /// Case-insensitive name fragments that mark an item as cosmetic
    #[serde(default = "default_cosmetic_keywords")]
    pub cosmetic_name_keywords: Vec<String>,

    /// Directory holding the ledger file (default: current directory)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    #[serde(default)]
    pub log_level: LogLevel,

    /// Write JSON logs to this file instead of stdout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,

    #[serde(default)]
    pub starter_outfit: OutfitTemplate,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            block_cosmetics: true,
            block_skins: true,
            block_mythics: true,
            remove_wearables_on_first_join: true,
            monitor_interval_seconds: default_monitor_interval(),
            save_interval_seconds: default_save_interval(),
            first_join_message: default_first_join_message(),
            skin_blocked_message: default_skin_blocked_message(),
            cosmetic_flags: default_cosmetic_flags(),
            cosmetic_name_keywords: default_cosmetic_keywords(),
            data_dir: None,
            log_level: LogLevel::Info,
            log_file: None,
            starter_outfit: OutfitTemplate::default(),
        }
    }
}

/// The canonical outfit applied on first contact and forced respawns
///
/// An id of 0 means "no canonical item for this slot".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct OutfitTemplate {
    pub shirt_id: ItemId,
    pub pants_id: ItemId,
    pub hat_id: ItemId,
    pub backpack_id: ItemId,
    pub vest_id: ItemId,
    pub mask_id: ItemId,
    pub glasses_id: ItemId,
    pub quality: u8,
    pub play_effect: bool,
}

impl Default for OutfitTemplate {
    fn default() -> Self {
        Self {
            shirt_id: 211,
            pants_id: 212,
            hat_id: 0,
            backpack_id: 0,
            vest_id: 0,
            mask_id: 0,
            glasses_id: 0,
            quality: MAX_QUALITY,
            play_effect: true,
        }
    }
}

impl OutfitTemplate {
    /// Template with no item in any slot
    pub fn empty() -> Self {
        Self {
            shirt_id: 0,
            pants_id: 0,
            quality: MAX_QUALITY,
            ..Self::default()
        }
    }

    /// Builder-style setter for one slot
    pub fn with(mut self, slot: Slot, item: ItemId) -> Self {
        *self.slot_mut(slot) = item;
        self
    }

    pub fn item(&self, slot: Slot) -> ItemId {
        match slot {
            Slot::Shirt => self.shirt_id,
            Slot::Pants => self.pants_id,
            Slot::Hat => self.hat_id,
            Slot::Backpack => self.backpack_id,
            Slot::Vest => self.vest_id,
            Slot::Mask => self.mask_id,
            Slot::Glasses => self.glasses_id,
        }
    }

    fn slot_mut(&mut self, slot: Slot) -> &mut ItemId {
        match slot {
            Slot::Shirt => &mut self.shirt_id,
            Slot::Pants => &mut self.pants_id,
            Slot::Hat => &mut self.hat_id,
            Slot::Backpack => &mut self.backpack_id,
            Slot::Vest => &mut self.vest_id,
            Slot::Mask => &mut self.mask_id,
            Slot::Glasses => &mut self.glasses_id,
        }
    }

    /// Whether any slot names a non-zero item (validity is not checked)
    pub fn has_any_item(&self) -> bool {
        Slot::ALL.iter().any(|slot| self.item(*slot) != 0)
    }

    /// Whether `item` is the canonical item of any slot
    pub fn contains(&self, item: ItemId) -> bool {
        item != 0 && Slot::ALL.iter().any(|slot| self.item(*slot) == item)
    }

    /// Wear quality with the upper bound applied; zero passes through
    pub fn effective_quality(&self) -> u8 {
        self.quality.min(MAX_QUALITY)
    }
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Only errors
    Error,

    /// Warnings and errors
    Warn,

    /// Info, warnings, and errors
    #[default]
    Info,

    /// Debug and above
    Debug,

    /// All messages including traces
    Trace,
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_monitor_interval() -> f32 {
    DEFAULT_MONITOR_INTERVAL_SECS
}

fn default_save_interval() -> f32 {
    DEFAULT_SAVE_INTERVAL_SECS
}

fn default_first_join_message() -> String {
    "Your cosmetics have been disabled and the starter outfit was applied.".to_string()
}

fn default_skin_blocked_message() -> String {
    "Inventory skins and cosmetics are blocked on this server!".to_string()
}

fn default_cosmetic_flags() -> Vec<String> {
    DEFAULT_COSMETIC_FLAGS.iter().map(|s| s.to_string()).collect()
}

fn default_cosmetic_keywords() -> Vec<String> {
    DEFAULT_COSMETIC_KEYWORDS.iter().map(|s| s.to_string()).collect()
}

/// Non-positive or non-finite values fall back to the default, then clamp
fn clamp_interval(value: f32, default: f32, min: f32, max: f32) -> f32 {
    let value = if value.is_finite() && value > 0.0 {
        value
    } else {
        default
    };
    value.clamp(min, max)
}

impl GuardConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: GuardConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Effective reconciliation period in seconds
    pub fn monitor_interval_secs(&self) -> f32 {
        clamp_interval(
            self.monitor_interval_seconds,
            DEFAULT_MONITOR_INTERVAL_SECS,
            MIN_MONITOR_INTERVAL_SECS,
            MAX_MONITOR_INTERVAL_SECS,
        )
    }

    pub fn monitor_interval(&self) -> Duration {
        Duration::from_secs_f32(self.monitor_interval_secs())
    }

    /// Effective ledger debounce in seconds
    pub fn save_interval_secs(&self) -> f32 {
        clamp_interval(
            self.save_interval_seconds,
            DEFAULT_SAVE_INTERVAL_SECS,
            MIN_SAVE_INTERVAL_SECS,
            MAX_SAVE_INTERVAL_SECS,
        )
    }

    pub fn save_interval(&self) -> Duration {
        Duration::from_secs_f32(self.save_interval_secs())
    }

    /// Attribute names used for classification; empty selects the built-ins
    pub fn effective_cosmetic_flags(&self) -> Vec<String> {
        if self.cosmetic_flags.is_empty() {
            default_cosmetic_flags()
        } else {
            self.cosmetic_flags.clone()
        }
    }

    /// Lower-cased name keywords; empty selects the built-ins
    pub fn effective_name_keywords(&self) -> Vec<String> {
        let keywords = if self.cosmetic_name_keywords.is_empty() {
            default_cosmetic_keywords()
        } else {
            self.cosmetic_name_keywords.clone()
        };
        keywords.into_iter().map(|k| k.to_lowercase()).collect()
    }

    /// Whether worn cosmetic items are removed (sweep and event path)
    pub fn blocks_cosmetic_items(&self) -> bool {
        self.block_skins || self.block_cosmetics
    }

    /// Full path of the first-contact ledger
    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(LEDGER_FILE_NAME)
    }

    /// Human-readable notes about values that will be adjusted at runtime
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.monitor_interval_secs() != self.monitor_interval_seconds {
            warnings.push(format!(
                "MonitorIntervalSeconds {} adjusted to {}",
                self.monitor_interval_seconds,
                self.monitor_interval_secs()
            ));
        }
        if self.save_interval_secs() != self.save_interval_seconds {
            warnings.push(format!(
                "SaveIntervalSeconds {} adjusted to {}",
                self.save_interval_seconds,
                self.save_interval_secs()
            ));
        }
        if !self.starter_outfit.has_any_item() {
            warnings.push(
                "StarterOutfit is empty; first-join stripping and respawn outfits are disabled"
                    .to_string(),
            );
        }
        if self.starter_outfit.quality > MAX_QUALITY {
            warnings.push(format!(
                "StarterOutfit Quality {} capped at {}",
                self.starter_outfit.quality, MAX_QUALITY
            ));
        }

        warnings
    }
}
