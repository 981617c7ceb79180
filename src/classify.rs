//! Cosmetic classification
//!
//! Decides whether an item id counts as "cosmetic" and memoizes the verdict.
//! Verdicts never expire: the asset database is assumed stable for the
//! process lifetime.

use crate::config::{GuardConfig, OutfitTemplate};
use skinguard_host::{AssetInfo, GameHost, ItemId};
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::debug;

/// Boolean asset attributes checked when `CosmeticFlags` is empty
pub const DEFAULT_COSMETIC_FLAGS: &[&str] = &[
    "isCosmetic",
    "isSkin",
    "isSkinned",
    "isPro",
    "isMythic",
    "isMythical",
    "isWorkshop",
];

/// Name fragments checked when `CosmeticNameKeywords` is empty
pub const DEFAULT_COSMETIC_KEYWORDS: &[&str] = &[
    "cosmetic", "skin", "premium", "dlc", "workshop", "twitch", "mythic",
];

/// The active classification rules
#[derive(Debug, Clone, PartialEq)]
pub struct CosmeticRules {
    pub flags: Vec<String>,
    /// Lower-cased
    pub keywords: Vec<String>,
}

impl CosmeticRules {
    pub fn from_config(config: &GuardConfig) -> Self {
        Self {
            flags: config.effective_cosmetic_flags(),
            keywords: config.effective_name_keywords(),
        }
    }

    /// Pure verdict for one asset
    ///
    /// Only wearables can be cosmetic. A wearable is cosmetic when any
    /// configured attribute is true or its name contains any keyword.
    pub fn evaluate(&self, asset: &AssetInfo) -> bool {
        if !asset.is_wearable() {
            return false;
        }

        if self
            .flags
            .iter()
            .any(|flag| asset.attribute(flag).unwrap_or(false))
        {
            return true;
        }

        let name = asset.name.to_lowercase();
        self.keywords
            .iter()
            .any(|keyword| !keyword.is_empty() && name.contains(keyword.as_str()))
    }
}

impl Default for CosmeticRules {
    fn default() -> Self {
        Self::from_config(&GuardConfig::default())
    }
}

/// Memoized `item id -> is cosmetic` verdicts
#[derive(Debug)]
pub struct ClassificationCache {
    rules: CosmeticRules,
    template: OutfitTemplate,
    verdicts: Mutex<HashMap<ItemId, bool>>,
}

impl ClassificationCache {
    pub fn new(rules: CosmeticRules, template: OutfitTemplate) -> Self {
        Self {
            rules,
            template,
            verdicts: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &GuardConfig) -> Self {
        Self::new(
            CosmeticRules::from_config(config),
            config.starter_outfit.clone(),
        )
    }

    /// Whether `item` is cosmetic
    ///
    /// Empty slots and starter-outfit items are never cosmetic. Lookup
    /// failures count as "not cosmetic" and are memoized like any other
    /// verdict.
    pub async fn classify(&self, host: &dyn GameHost, item: ItemId) -> bool {
        if item == 0 || self.template.contains(item) {
            return false;
        }

        if let Some(cached) = self.verdicts.lock().await.get(&item) {
            return *cached;
        }

        // Query outside the lock; a concurrent miss for the same id computes
        // the same verdict.
        let verdict = match host.find_asset(item).await {
            Ok(Some(asset)) => self.rules.evaluate(&asset),
            Ok(None) => false,
            Err(e) => {
                debug!("Asset lookup for item {} failed: {}", item, e);
                false
            }
        };

        self.verdicts.lock().await.insert(item, verdict);
        verdict
    }

    /// Number of memoized verdicts
    pub async fn len(&self) -> usize {
        self.verdicts.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skinguard_host::mock::MockHost;
    use skinguard_host::Slot;

    fn cache() -> ClassificationCache {
        ClassificationCache::from_config(&GuardConfig::default())
    }

    #[test]
    fn test_evaluate_requires_wearable() {
        let rules = CosmeticRules::default();
        let gun = AssetInfo::other(363, "Maplestrike Skin").with_attribute("isSkin", true);
        assert!(!rules.evaluate(&gun));
    }

    #[test]
    fn test_evaluate_flags_and_keywords() {
        let rules = CosmeticRules::default();

        let flagged = AssetInfo::wearable(1, Slot::Hat, "Top Hat").with_attribute("isPro", true);
        assert!(rules.evaluate(&flagged));

        let unflagged =
            AssetInfo::wearable(2, Slot::Hat, "Top Hat").with_attribute("isPro", false);
        assert!(!rules.evaluate(&unflagged));

        let named = AssetInfo::wearable(3, Slot::Shirt, "Twitch Prime HOODIE");
        assert!(rules.evaluate(&named));

        let plain = AssetInfo::wearable(4, Slot::Pants, "Khaki Pants");
        assert!(!rules.evaluate(&plain));
    }

    #[test]
    fn test_custom_rules() {
        let config = GuardConfig {
            cosmetic_flags: vec!["isFestive".to_string()],
            cosmetic_name_keywords: vec!["GOLD".to_string()],
            ..Default::default()
        };
        let rules = CosmeticRules::from_config(&config);

        let festive =
            AssetInfo::wearable(1, Slot::Hat, "Santa Hat").with_attribute("isFestive", true);
        assert!(rules.evaluate(&festive));

        let skin = AssetInfo::wearable(2, Slot::Hat, "Hat").with_attribute("isSkin", true);
        assert!(!rules.evaluate(&skin));

        let gold = AssetInfo::wearable(3, Slot::Glasses, "Golden Aviators");
        assert!(rules.evaluate(&gold));
    }

    #[tokio::test]
    async fn test_zero_and_template_items_never_cosmetic() {
        let host = MockHost::new();
        host.add_asset(
            AssetInfo::wearable(211, Slot::Shirt, "Skin Shirt").with_attribute("isSkin", true),
        );
        let cache = cache();

        assert!(!cache.classify(&host, 0).await);
        assert!(!cache.classify(&host, 211).await);
        assert!(!cache.classify(&host, 212).await);
        assert_eq!(host.asset_lookups(), 0);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_verdicts_are_memoized() {
        let host = MockHost::new();
        host.add_asset(AssetInfo::wearable(900, Slot::Hat, "Mythical Crown"));
        host.add_asset(AssetInfo::wearable(901, Slot::Hat, "Cowboy Hat"));
        let cache = cache();

        for _ in 0..3 {
            assert!(cache.classify(&host, 900).await);
            assert!(!cache.classify(&host, 901).await);
        }

        assert_eq!(host.asset_lookups(), 2);
        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test]
    async fn test_missing_and_failed_lookups_memoized_as_false() {
        let host = MockHost::new();
        host.break_asset(77);
        let cache = cache();

        assert!(!cache.classify(&host, 77).await);
        assert!(!cache.classify(&host, 78).await);
        assert!(!cache.classify(&host, 77).await);
        assert!(!cache.classify(&host, 78).await);

        assert_eq!(host.asset_lookups(), 2);
    }
}
