//! # Mempool
//!
//! The admissible set of pending transactions and the deterministic
//! priority order the assembler packs them in. The pool is guarded by the
//! node's mempool mutex; its update counter lets the mining loop notice
//! meaningful change without holding the lock.

pub mod ordering;
pub mod pool;

pub use ordering::{collect_priorities, TxPriority, FEE_PER_KB_EPSILON, PRIORITY_BAND};
pub use pool::{Mempool, MempoolEntry};
