//! Price point cache.
//!
//! Delegate price feeds accumulate per (height, pair); the per-block median
//! transaction reads them back over the governed sliding window and persists
//! the resulting medians.

use crate::keyed_store::{KeyedStore, StoreChanges, StoreUndo};
use serde::{Deserialize, Serialize};
use shared_types::{CoinPricePair, TokenSymbol};
use std::collections::BTreeMap;
use std::ops::Bound;

/// Key of one priced pair at one height.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct PricePointKey {
    /// Block height the points were fed at.
    pub height: u32,
    /// The priced pair.
    pub pair: CoinPricePair,
}

impl PricePointKey {
    /// Smallest possible key at a height (range-scan lower bound).
    fn floor(height: u32) -> Self {
        Self {
            height,
            pair: (TokenSymbol::Wicc, TokenSymbol::Wicc),
        }
    }

    /// Largest possible key at a height (range-scan upper bound).
    fn ceil(height: u32) -> Self {
        Self {
            height,
            pair: (TokenSymbol::Usd, TokenSymbol::Usd),
        }
    }
}

/// Change set drained from a price cache child layer.
#[derive(Debug)]
pub struct PriceChanges {
    feeds: StoreChanges<PricePointKey, Vec<u64>>,
    medians: StoreChanges<PricePointKey, u64>,
}

/// Undo log of a price cache.
#[derive(Debug, Default)]
pub struct PriceUndo {
    feeds: StoreUndo<PricePointKey, Vec<u64>>,
    medians: StoreUndo<PricePointKey, u64>,
}

/// Layered price point view.
#[derive(Debug)]
pub struct PricePointCache<'a> {
    feeds: KeyedStore<'a, PricePointKey, Vec<u64>>,
    medians: KeyedStore<'a, PricePointKey, u64>,
}

impl PricePointCache<'static> {
    /// Create a root cache.
    pub fn root() -> Self {
        Self {
            feeds: KeyedStore::root("price_feed"),
            medians: KeyedStore::root("price_median"),
        }
    }
}

impl<'a> PricePointCache<'a> {
    /// Create a child layer over this cache.
    pub fn fork(&self) -> PricePointCache<'_> {
        PricePointCache {
            feeds: self.feeds.fork(),
            medians: self.medians.fork(),
        }
    }

    /// Append one fed price point.
    pub fn add_feed(&mut self, height: u32, pair: CoinPricePair, price: u64) {
        let key = PricePointKey { height, pair };
        let mut points = self.feeds.get(&key).unwrap_or_default();
        points.push(price);
        self.feeds.set(key, points);
    }

    /// Persist the consensus median for a pair at a height.
    pub fn set_median(&mut self, height: u32, pair: CoinPricePair, price: u64) {
        self.medians.set(PricePointKey { height, pair }, price);
    }

    /// The persisted median for a pair at a height, if any.
    pub fn get_median(&self, height: u32, pair: CoinPricePair) -> Option<u64> {
        self.medians.get(&PricePointKey { height, pair })
    }

    /// Per-pair medians over the feeds of the trailing window
    /// `[height - window + 1, height]`.
    pub fn block_median_prices(
        &self,
        height: u32,
        window: u64,
    ) -> BTreeMap<CoinPricePair, u64> {
        let from = height.saturating_sub(window.saturating_sub(1).min(u32::MAX as u64) as u32);
        let low = PricePointKey::floor(from);
        let high = PricePointKey::ceil(height);

        let mut per_pair: BTreeMap<CoinPricePair, Vec<u64>> = BTreeMap::new();
        for (key, points) in self
            .feeds
            .collect_range(Bound::Included(&low), Bound::Included(&high))
        {
            per_pair.entry(key.pair).or_default().extend(points);
        }

        per_pair
            .into_iter()
            .filter_map(|(pair, mut points)| median(&mut points).map(|m| (pair, m)))
            .collect()
    }

    /// Drain this layer into a change set for the parent.
    pub fn into_changes(self) -> PriceChanges {
        PriceChanges {
            feeds: self.feeds.into_changes(),
            medians: self.medians.into_changes(),
        }
    }

    /// Apply a child's change set.
    pub fn apply_changes(&mut self, changes: PriceChanges) {
        self.feeds.apply_changes(changes.feeds);
        self.medians.apply_changes(changes.medians);
    }

    /// Start recording an undo log.
    pub fn enable_undo(&mut self) {
        self.feeds.enable_undo();
        self.medians.enable_undo();
    }

    /// Take the recorded log.
    pub fn take_undo(&mut self) -> PriceUndo {
        PriceUndo {
            feeds: self.feeds.take_undo(),
            medians: self.medians.take_undo(),
        }
    }

    /// Stop recording.
    pub fn disable_undo(&mut self) {
        self.feeds.disable_undo();
        self.medians.disable_undo();
    }

    /// Apply an undo log in reverse.
    pub fn apply_undo(&mut self, undo: PriceUndo) {
        self.feeds.apply_undo(undo.feeds);
        self.medians.apply_undo(undo.medians);
    }
}

/// Median of a point set: the middle element, lower-middle on even counts.
fn median(points: &mut [u64]) -> Option<u64> {
    if points.is_empty() {
        return None;
    }
    points.sort_unstable();
    Some(points[(points.len() - 1) / 2])
}
