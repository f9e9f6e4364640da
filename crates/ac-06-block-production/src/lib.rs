//! # Block Production
//!
//! Everything between "this node holds the slot delegate's key" and "a
//! signed block joined the chain":
//!
//! - [`fuel::FuelRateController`] prices compute from a trailing window
//! - [`assembler::BlockAssembler`] packs mempool transactions by priority
//!   under size, run-step and slot-time bounds, accounting fees into the
//!   reward transaction
//! - [`node::ChainState`] connects verified blocks with per-transaction
//!   undo data and can disconnect the tip for reorganization
//! - [`service::MiningService`] is the long-lived producing task
//! - [`ring::MinedBlockRing`] answers the recent-mined-blocks query

pub mod assembler;
pub mod config;
pub mod error;
pub mod fuel;
pub mod node;
pub mod ring;
pub mod service;

pub use assembler::{BlockAssembler, BlockCandidate, PackFailure};
pub use config::BlockProductionConfig;
pub use error::{BlockProductionError, Result};
pub use fuel::FuelRateController;
pub use node::{ChainState, Node};
pub use ring::{MinedBlockInfo, MinedBlockRing};
pub use service::{MiningService, PeerView, StaticPeerView};
