//! # Transactions
//!
//! The consensus transaction catalog and the entities it assembles into:
//! blocks, headers and the block index. Transactions are a closed tagged
//! enum over a capability surface (hash, size, fees, priority, check,
//! execute); the pipeline dispatches by tag and never learns variant
//! internals.
//!
//! Execution always happens against a scratch `CacheWrapper`: a failed
//! transaction's writes die with its scratch view, never reaching the
//! block's outer cache.

pub mod block;
pub mod cdp_tx;
pub mod context;
pub mod error;
pub mod price;
pub mod reward;
pub mod store;
pub mod transfer;
pub mod tx;

pub use block::{Block, BlockHeader, BLOCK_VERSION, INIT_TX_VERSION};
pub use cdp_tx::{CdpLiquidateTx, CdpRedeemTx, CdpStakeTx};
pub use context::{ExecuteContext, TX_VALID_HEIGHT_RANGE};
pub use error::{TxError, TxResult};
pub use price::{PriceFeedTx, PriceMedianTx, PricePoint};
pub use reward::{BlockRewardTx, UCoinBlockRewardTx};
pub use store::{BlockIndex, BlockStore, MemoryBlockStore};
pub use transfer::{BaseCoinTransferTx, TransferLeg, UCoinTransferTx};
pub use tx::{Transaction, TxKind};
