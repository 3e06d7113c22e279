//! Multi-ledger test network
//!
//! Each [`LedgerNode`] is one independent ledger: balances, proceeds, its own
//! auction and its own porter. All nodes share one [`ManualClock`] and one
//! chain table. [`TestNetwork::relay`] plays the relay: it commits the source
//! chain's head to the destination's verifier and hands over the record with
//! the links that lead to that head.

use crate::fixtures::{test_auction_config, GENESIS};
use metro_auction::{Auctions, FounderAllocation, PurchaseReceipt};
use metro_bridge::{ChainLinkVerifier, ExportRecord, ExportRequest, ImportProof, TokenPorter};
use metro_core::{
    AccountId, Amount, AuctionConfig, ChainId, ChainTable, LedgerEffects, MetroError, Result,
    UnixTime,
};
use metro_ledger::{ManualClock, MemoryLedger, ProceedsVault};
use std::collections::BTreeMap;

/// One ledger of the network
#[derive(Debug)]
pub struct LedgerNode {
    /// Ledger id
    pub chain: ChainId,
    /// Balances
    pub ledger: MemoryLedger,
    /// Auction proceeds
    pub proceeds: ProceedsVault,
    /// Issuance auction
    pub auctions: Auctions<ManualClock>,
    /// Bridge endpoint
    pub porter: TokenPorter<ChainLinkVerifier, ManualClock>,
}

impl LedgerNode {
    /// Buy from this ledger's auction
    pub fn buy(&mut self, buyer: AccountId, funds: Amount) -> Result<PurchaseReceipt> {
        self.auctions
            .purchase(&mut self.ledger, &mut self.proceeds, buyer, funds)
    }

    /// Export from this ledger
    pub fn export(&mut self, request: ExportRequest) -> Result<ExportRecord> {
        self.porter.export(&mut self.ledger, &self.auctions, request)
    }

    /// Balance of `account` on this ledger
    pub fn balance_of(&self, account: AccountId) -> Amount {
        self.ledger.balance_of(account)
    }

    /// Total supply on this ledger
    pub fn total_supply(&self) -> Amount {
        self.ledger.total_supply()
    }
}

/// Builder for [`TestNetwork`]
#[derive(Debug, Clone)]
pub struct NetworkBuilder {
    chains: Vec<String>,
    genesis: UnixTime,
    start: Option<UnixTime>,
    auction: AuctionConfig,
    founders: BTreeMap<String, Vec<FounderAllocation>>,
}

impl Default for NetworkBuilder {
    fn default() -> Self {
        Self {
            chains: vec!["ETC".to_string(), "ETH".to_string()],
            genesis: GENESIS,
            start: None,
            auction: test_auction_config(),
            founders: BTreeMap::new(),
        }
    }
}

impl NetworkBuilder {
    /// Chain table, in slot order
    pub fn chains(mut self, names: &[&str]) -> Self {
        self.chains = names.iter().map(|n| (*n).to_string()).collect();
        self
    }

    /// Genesis of every auction (defaults to [`GENESIS`])
    pub fn genesis(mut self, genesis: UnixTime) -> Self {
        self.genesis = genesis;
        self
    }

    /// Clock start (defaults to genesis)
    pub fn start_at(mut self, start: UnixTime) -> Self {
        self.start = Some(start);
        self
    }

    /// Auction parameters shared by all nodes
    pub fn auction(mut self, config: AuctionConfig) -> Self {
        self.auction = config;
        self
    }

    /// Founder allocations minted on `chain` at build time
    pub fn founders(mut self, chain: &str, allocations: Vec<FounderAllocation>) -> Self {
        self.founders.insert(chain.to_string(), allocations);
        self
    }

    /// Wire up every node
    pub fn build(self) -> Result<TestNetwork> {
        let table = ChainTable::from_names(&self.chains)?;
        let clock = ManualClock::new(self.start.unwrap_or(self.genesis));
        let mut nodes = BTreeMap::new();
        for &chain in table.chains() {
            let mut node = LedgerNode {
                chain,
                ledger: MemoryLedger::new(),
                proceeds: ProceedsVault::new(),
                auctions: Auctions::new(&self.auction, self.genesis, clock.clone())?,
                porter: TokenPorter::new(
                    chain,
                    table.clone(),
                    ChainLinkVerifier::new(),
                    clock.clone(),
                )?,
            };
            if let Some(allocations) = self.founders.get(&chain.to_string()) {
                node.auctions
                    .mint_initial_supply(&mut node.ledger, allocations)?;
            }
            nodes.insert(chain, node);
        }
        Ok(TestNetwork { clock, table, nodes })
    }
}

/// Ledgers sharing a clock and a chain table
#[derive(Debug)]
pub struct TestNetwork {
    /// Shared clock
    pub clock: ManualClock,
    table: ChainTable,
    nodes: BTreeMap<ChainId, LedgerNode>,
}

impl TestNetwork {
    /// Start configuring a network
    pub fn builder() -> NetworkBuilder {
        NetworkBuilder::default()
    }

    /// Shared chain table
    pub fn chain_table(&self) -> &ChainTable {
        &self.table
    }

    /// Node for `name`
    pub fn node(&self, name: &str) -> &LedgerNode {
        let chain = crate::fixtures::chain(name);
        self.nodes.get(&chain).expect("chain is part of the network")
    }

    /// Mutable node for `name`
    pub fn node_mut(&mut self, name: &str) -> &mut LedgerNode {
        let chain = crate::fixtures::chain(name);
        self.nodes.get_mut(&chain).expect("chain is part of the network")
    }

    /// Buy on `chain`'s auction
    pub fn buy(&mut self, chain: &str, buyer: AccountId, funds: Amount) -> Result<PurchaseReceipt> {
        self.node_mut(chain).buy(buyer, funds)
    }

    /// Export `amount` of `holder`'s tokens from `from` to the same holder on `to`
    pub fn export(
        &mut self,
        from: &str,
        to: &str,
        holder: AccountId,
        amount: Amount,
    ) -> Result<ExportRecord> {
        self.node_mut(from).export(ExportRequest {
            caller: holder,
            destination_chain: crate::fixtures::chain(to),
            destination_contract: AccountId::from_label(&format!("{to}-token")),
            recipient: holder,
            amount,
            extra_data: Vec::new(),
        })
    }

    /// Relay export `sequence` of `from` to its destination and import it
    pub fn relay(&mut self, from: &str, sequence: u64) -> Result<Amount> {
        let (record, proof, head) = {
            let exports = self.node(from).porter.export_chain();
            let record = exports
                .record(sequence)
                .cloned()
                .ok_or_else(|| MetroError::invalid(format!("{from} has no export {sequence}")))?;
            let proof = ImportProof::from_links(exports.records_after(sequence).to_vec());
            (record, proof, exports.head())
        };
        let source = record.source_chain;
        let head_sequence = self.node(from).porter.export_chain().len() as u64;
        let destination = self
            .nodes
            .get_mut(&record.destination_chain)
            .ok_or_else(|| MetroError::unknown_chain(record.destination_chain))?;
        destination
            .porter
            .verifier_mut()
            .commit_head(source, head_sequence, head)?;
        destination
            .porter
            .import(
                &mut destination.ledger,
                &destination.auctions,
                source,
                &record,
                &proof,
            )
    }

    /// Sum of total supply over every ledger
    pub fn network_supply(&self) -> Amount {
        self.nodes.values().map(LedgerNode::total_supply).sum()
    }

    /// Sum of auction issuance over every ledger
    pub fn network_issued(&self) -> Amount {
        self.nodes
            .values()
            .map(|n| n.auctions.global_issued_supply())
            .sum()
    }
}
