//! The pending transaction pool.
//!
//! Admission-checked, non-persistent. The pool itself is unordered; the
//! packing order is computed per block attempt by the priority queue. A
//! monotonically increasing update counter advances on every effective
//! mutation so the mining loop can detect staleness without diffing.

use ac_03_transactions::Transaction;
use shared_types::{TokenSymbol, TxId};
use std::collections::HashMap;
use std::sync::Arc;

/// One pooled transaction with its packing inputs precomputed.
#[derive(Clone, Debug)]
pub struct MempoolEntry {
    /// The transaction.
    pub tx: Arc<Transaction>,
    /// Serialized size, bytes.
    pub size: u32,
    /// Declared fee token.
    pub fee_symbol: TokenSymbol,
    /// Declared fee amount.
    pub fee_amount: u64,
    /// Mempool priority.
    pub priority: f64,
}

/// The pending transaction set.
#[derive(Debug, Default)]
pub struct Mempool {
    txs: HashMap<TxId, MempoolEntry>,
    update_num: u64,
}

impl Mempool {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a transaction. Reward transactions are never pooled;
    /// reinserting a present transaction is a no-op. Returns whether the
    /// pool changed.
    pub fn insert(&mut self, tx: Arc<Transaction>) -> bool {
        if tx.is_reward() {
            return false;
        }
        let txid = tx.tx_hash();
        if self.txs.contains_key(&txid) {
            return false;
        }

        let (fee_symbol, fee_amount) = tx.fees();
        let entry = MempoolEntry {
            size: tx.serialized_size(),
            fee_symbol,
            fee_amount,
            priority: tx.priority(),
            tx,
        };
        self.txs.insert(txid, entry);
        self.update_num += 1;
        true
    }

    /// Remove a transaction. Removing an absent one is a no-op. Returns
    /// whether the pool changed.
    pub fn remove(&mut self, txid: &TxId) -> bool {
        if self.txs.remove(txid).is_some() {
            self.update_num += 1;
            true
        } else {
            false
        }
    }

    /// True when the transaction is pooled.
    pub fn contains(&self, txid: &TxId) -> bool {
        self.txs.contains_key(txid)
    }

    /// Look an entry up.
    pub fn get(&self, txid: &TxId) -> Option<&MempoolEntry> {
        self.txs.get(txid)
    }

    /// Number of pooled transactions.
    pub fn len(&self) -> usize {
        self.txs.len()
    }

    /// True when nothing is pooled.
    pub fn is_empty(&self) -> bool {
        self.txs.is_empty()
    }

    /// Counter advancing on every effective mutation.
    pub fn update_num(&self) -> u64 {
        self.update_num
    }

    /// Iterate over all entries (unordered).
    pub fn entries(&self) -> impl Iterator<Item = (&TxId, &MempoolEntry)> {
        self.txs.iter()
    }
}
