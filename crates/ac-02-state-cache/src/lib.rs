//! # State Cache Fabric
//!
//! Layered copy-on-write state views used uniformly by block assembly,
//! validation and chain reorganization.
//!
//! ## Layering
//!
//! Every state domain lives in a `KeyedStore`: a local map of pending
//! writes and tombstones over an optional parent layer. The root layer owns
//! committed state. A `CacheWrapper` bundles one store per domain and forks
//! in O(1); applying a child's drained change set is the flush, dropping
//! the child discards it.
//!
//! ## Undo
//!
//! With undo logging armed, every write records the previously visible
//! value for its key. One log per executed transaction, aggregated into a
//! `BlockUndo`, played back newest-first to disconnect a block.

pub mod accounts;
pub mod cdp;
pub mod delegates;
pub mod execlog;
pub mod keyed_store;
pub mod prices;
pub mod scalar_store;
pub mod sysparams;
pub mod txseen;
pub mod wrapper;

pub use accounts::AccountCache;
pub use cdp::{format16hex, CdpCache, CdpError, UserCdp};
pub use delegates::DelegateCache;
pub use execlog::{ExecFailure, ExecLogCache};
pub use keyed_store::{KeyedStore, StoreChanges};
pub use prices::{PricePointCache, PricePointKey};
pub use scalar_store::ScalarStore;
pub use sysparams::SysParamCache;
pub use txseen::TxSeenCache;
pub use wrapper::{BlockUndo, CacheChanges, CacheWrapper, TxUndo};
