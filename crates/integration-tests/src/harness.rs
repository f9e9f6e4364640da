//! Test chain harness.
//!
//! Builds a node at genesis with a funded, voted delegate committee whose
//! keys all live in one in-memory signer, then drives block production the
//! same way the mining service does: build a candidate, resolve the slot
//! delegate for the given time, seal, verify and connect.

use ac_01_chain_params::{ChainParams, Network};
use ac_02_state_cache::CacheWrapper;
use ac_03_transactions::{Block, MemoryBlockStore, Transaction};
use ac_05_delegate_schedule::DelegateScheduler;
use ac_06_block_production::{
    BlockAssembler, BlockProductionConfig, BlockProductionError, ChainState, Node,
};
use ac_07_block_validation::BlockVerifier;
use shared_crypto::{KeyPair, MemorySigner};
use shared_types::{Account, KeyId, RegId, TokenSymbol, COIN};
use std::sync::Arc;

/// A complete single-process chain for scenario tests.
pub struct TestChain {
    /// Network parameters.
    pub params: ChainParams,
    /// Shared node context.
    pub node: Arc<Node>,
    /// Holds every delegate key.
    pub signer: Arc<MemorySigner>,
    /// Delegate regids, committee order.
    pub delegates: Vec<RegId>,
    /// Delegate keypairs by committee position (for signing user txs).
    pub keypairs: Vec<KeyPair>,
    /// The assembler under test.
    pub assembler: BlockAssembler,
    /// The verifier under test.
    pub verifier: BlockVerifier,
    /// The schedule both sides follow.
    pub scheduler: DelegateScheduler,
    /// Genesis timestamp.
    pub genesis_time: i64,
}

impl TestChain {
    /// Stand a chain up at genesis on the given network.
    pub fn new(network: Network) -> Self {
        let params = ChainParams::for_network(network);
        let genesis_time = 1_600_000_000;

        let mut signer = MemorySigner::new();
        let mut committed = CacheWrapper::root();
        let mut delegates = Vec::new();
        let mut keypairs = Vec::new();

        for position in 0..params.total_delegate_num as u16 {
            let mut seed = [0u8; 32];
            seed[0] = position as u8 + 1;
            let keypair = KeyPair::from_seed(seed).expect("delegate seed");
            let pubkey = keypair.public_key();

            let regid = RegId::new(0, position + 1);
            let mut account = Account::new(regid, KeyId::from_pubkey(&pubkey), Some(pubkey));
            account.received_votes = 1_000_000 * COIN;
            account
                .add_balance(TokenSymbol::Wicc, 1_000_000 * COIN)
                .expect("genesis funding");
            committed.accounts.set_account(&account);
            committed.delegates.set_votes(regid, account.received_votes);

            signer.add_key(KeyPair::from_seed(seed).expect("delegate seed"), false);
            keypairs.push(keypair);
            delegates.push(regid);
        }

        let store = MemoryBlockStore::with_genesis(&params, genesis_time);
        let node = Arc::new(Node::new(ChainState::new(store, committed)));

        Self {
            assembler: BlockAssembler::new(params.clone(), BlockProductionConfig::default()),
            verifier: BlockVerifier::new(params.clone()),
            scheduler: DelegateScheduler::new(params.clone()),
            signer: Arc::new(signer),
            params,
            node,
            delegates,
            keypairs,
            genesis_time,
        }
    }

    /// The time one interval past the current tip, the earliest a new
    /// block can honestly carry.
    pub fn next_block_time(&self) -> i64 {
        let chain = self.node.chain.lock();
        let tip = chain.tip().expect("tip");
        tip.time + self.params.block_interval(tip.height + 1) as i64
    }

    /// Produce, seal, verify and connect one block at `now`.
    pub fn produce_block_at(&self, now: i64) -> Result<Block, BlockProductionError> {
        let mut chain = self.node.chain.lock();

        let candidate = {
            let mempool = self.node.mempool.lock();
            self.assembler
                .create_new_block(&chain.committed, &chain.store, &mempool, now)?
        };
        let height = candidate.block.header.height;

        let mut committee = self.scheduler.top_delegates(&chain.committed.delegates)?;
        self.scheduler.shuffle_delegates(height, &mut committee);
        let slot_delegate = self.scheduler.slot_delegate(now, height, &committee);
        let delegate = chain
            .committed
            .accounts
            .get_account(&slot_delegate)
            .expect("delegate account");

        let mut block = candidate.block;
        self.assembler.finalize_and_sign(
            &mut block,
            &delegate,
            &chain.committed,
            &chain.store,
            now,
            self.signer.as_ref(),
        )?;

        chain.connect_block(&block, &self.verifier, &self.params)?;

        let mut mempool = self.node.mempool.lock();
        for tx in block.txs.iter().skip(1) {
            mempool.remove(&tx.tx_hash());
        }
        Ok(block)
    }

    /// Produce the next block one interval after the tip.
    pub fn produce_next_block(&self) -> Result<Block, BlockProductionError> {
        self.produce_block_at(self.next_block_time())
    }

    /// Submit a transaction to the mempool.
    pub fn submit(&self, tx: Transaction) -> bool {
        self.node.mempool.lock().insert(Arc::new(tx))
    }

    /// The committee position of a delegate regid.
    pub fn position_of(&self, regid: &RegId) -> usize {
        self.delegates
            .iter()
            .position(|candidate| candidate == regid)
            .expect("known delegate")
    }

    /// Sign a payload with the keypair of the delegate at `position`.
    pub fn sign_with(&self, position: usize, payload: &[u8]) -> shared_crypto::Signature {
        let digest = shared_crypto::hash(payload);
        self.keypairs[position].sign(&digest)
    }

    /// Read an account from committed state.
    pub fn account(&self, regid: &RegId) -> Option<Account> {
        self.node.chain.lock().committed.accounts.get_account(regid)
    }
}
