//! In-memory bridge ledger for integration tests
//!
//! One shared state backs the Ethereum client, every contract role and the
//! Bitcoin client. Waiting calls park on a version counter bumped after each
//! mutation, so tests drive the chains forward explicitly.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use alloy_primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use tokio::sync::{watch, RwLock};

use tbtc::chain::bitcoin::ParsedTransaction;
use tbtc::chain::ethereum::EthResult;
use tbtc::chain::events::{
    CreatedEvent, FundedEvent, PublicKeyPublishedEvent, RedemptionRequestedEvent,
    RegisteredPubkeyEvent, TransferEvent,
};
use tbtc::chain::{
    BitcoinClient, BitcoinError, ContractAddresses, ContractArtifact, ContractEvent, ContractRole,
    DeploymentRegistry, DepositContract, DepositFactoryContract, DepositTokenContract,
    EthereumClient, EthereumError, EventLog, FeeParameters, FeeRebateTokenContract,
    FoundTransaction, KeepContract, SpvProofBundle, SystemContract, TokenContract,
    TransactionReceipt, VendingMachineContract,
};
use tbtc::chain::artifacts::DeploymentInfo;
use tbtc::funding_proof::compute_txid;
use tbtc::types::units::satoshis_to_tbtc;
use tbtc::{DepositAddresses, DepositFactory, DepositState, FundingProof, Network, TbtcConfig};

pub const NETWORK_ID: &str = "1337";
pub const ALLOWED_LOT_SIZES: [u64; 4] = [100_000, 1_000_000, 10_000_000, 100_000_000];
pub const DIFFICULTY_FACTOR: u64 = 6;

/// secp256k1 generator, used as the signer group key
pub const SIGNER_X: &str = "79be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";
pub const SIGNER_Y: &str = "483ada7726a3c4655da4fbfc0e1108a8fd17b448a68554199c47d08ffb10d4b8";
/// P2WPKH testnet address of the signer group key
pub const SIGNER_BTC_ADDRESS: &str = "tb1qw508d6qejxtdg4y5r3zarvary0c5xw7kxpjzsx";
/// Redeemer address used by redemption tests
pub const REDEEMER_ADDRESS: &str = "tb1qw508d6qejxtdg4y5r3zarvary0c5xw7kxpjzsx";

fn tagged_address(tag: u8, n: u64) -> Address {
    let mut bytes = [0u8; 20];
    bytes[0] = tag;
    bytes[12..].copy_from_slice(&n.to_be_bytes());
    Address::from(bytes)
}

fn word(n: u64) -> B256 {
    let mut bytes = [0u8; 32];
    bytes[24..].copy_from_slice(&n.to_be_bytes());
    B256::from(bytes)
}

fn token_id_to_address(token_id: U256) -> Address {
    let bytes: [u8; 32] = token_id.to_be_bytes();
    Address::from_slice(&bytes[12..])
}

#[derive(Debug, Clone)]
pub struct DepositRecord {
    pub lot_size: u64,
    pub state: DepositState,
    pub keep: Address,
    pub utxo_size: u64,
    pub redemption_requirement: Option<U256>,
    pub owner_redemption_requirement: U256,
}

#[derive(Debug, Clone)]
pub struct BitcoinTx {
    pub txid: String,
    pub address: String,
    pub value: u64,
    pub version: Vec<u8>,
    pub tx_in_vector: Vec<u8>,
    pub tx_out_vector: Vec<u8>,
    pub locktime: Vec<u8>,
    pub block_height: Option<u64>,
}

#[derive(Default)]
pub struct LedgerState {
    pub allowed_lot_sizes: Vec<u64>,
    pub creation_fee: U256,
    pub minimum_redemption_fee: u64,
    pub bitcoin_fee: u64,
    pub eth_balances: HashMap<Address, U256>,
    pub tbtc_balances: HashMap<Address, U256>,
    pub deposits: HashMap<Address, DepositRecord>,
    pub keep_keys: HashMap<Address, Bytes>,
    pub tdt_owners: HashMap<Address, Address>,
    pub frt_owners: HashMap<Address, Address>,
    pub events: Vec<EventLog>,
    /// Names of every state-changing call, in order
    pub sent: Vec<String>,
    pub proofs: Vec<FundingProof>,
    pub transactions: Vec<BitcoinTx>,
    pub tip_height: u64,
    pub next_id: u64,
    /// Event names recorded on chain but left out of transaction receipts
    pub withheld_from_receipts: Vec<&'static str>,
}

pub struct Ledger {
    state: RwLock<LedgerState>,
    version: watch::Sender<u64>,
    pub account: Address,
    pub addresses: ContractAddresses,
}

impl Ledger {
    pub fn new() -> Arc<Self> {
        let account = tagged_address(0xac, 1);
        let addresses = ContractAddresses {
            system: tagged_address(0xc0, 1),
            token: tagged_address(0xc0, 2),
            deposit_token: tagged_address(0xc0, 3),
            fee_rebate_token: tagged_address(0xc0, 4),
            deposit_factory: tagged_address(0xc0, 5),
            vending_machine: tagged_address(0xc0, 6),
        };

        let mut state = LedgerState {
            allowed_lot_sizes: ALLOWED_LOT_SIZES.to_vec(),
            creation_fee: U256::from(50_000_000_000_000_000u64),
            minimum_redemption_fee: 2_000,
            bitcoin_fee: 150,
            tip_height: 100,
            ..Default::default()
        };
        state
            .eth_balances
            .insert(account, U256::from(10u64).pow(U256::from(18u64)));

        let (version, _) = watch::channel(0);
        Arc::new(Self {
            state: RwLock::new(state),
            version,
            account,
            addresses,
        })
    }

    /// Deployment artifacts for every role on `NETWORK_ID`
    pub fn registry(&self) -> DeploymentRegistry {
        self.registry_without(None)
    }

    /// Deployment artifacts with `missing` left undeployed
    pub fn registry_without(&self, missing: Option<ContractRole>) -> DeploymentRegistry {
        let a = self.addresses;
        let by_role = [
            (ContractRole::System, a.system),
            (ContractRole::Token, a.token),
            (ContractRole::DepositToken, a.deposit_token),
            (ContractRole::FeeRebateToken, a.fee_rebate_token),
            (ContractRole::DepositFactory, a.deposit_factory),
            (ContractRole::VendingMachine, a.vending_machine),
        ];
        DeploymentRegistry::from_artifacts(by_role.into_iter().map(|(role, address)| {
            let mut networks = HashMap::new();
            if Some(role) != missing {
                networks.insert(NETWORK_ID.to_string(), DeploymentInfo { address });
            }
            ContractArtifact {
                contract_name: role.artifact_name().to_string(),
                networks,
            }
        }))
    }

    pub fn clients(self: &Arc<Self>) -> (Arc<dyn EthereumClient>, Arc<dyn BitcoinClient>) {
        (
            Arc::new(TestEthereum { ledger: Arc::clone(self) }),
            Arc::new(TestBitcoin { ledger: Arc::clone(self) }),
        )
    }

    /// Factory wired to this ledger on testnet
    pub async fn factory(self: &Arc<Self>) -> DepositFactory {
        let (ethereum, bitcoin) = self.clients();
        DepositFactory::with_config(
            TbtcConfig::for_network(Network::Test),
            ethereum,
            bitcoin,
            &self.registry(),
        )
        .await
        .expect("factory")
    }

    pub async fn read<R>(&self, f: impl FnOnce(&LedgerState) -> R) -> R {
        let state = self.state.read().await;
        f(&state)
    }

    pub async fn mutate<R>(&self, f: impl FnOnce(&mut LedgerState) -> R) -> R {
        let result = {
            let mut state = self.state.write().await;
            f(&mut state)
        };
        self.version.send_modify(|v| *v += 1);
        result
    }

    async fn wait_until<T, F>(&self, mut probe: F) -> T
    where
        F: FnMut(&LedgerState) -> Option<T> + Send,
        T: Send,
    {
        let mut changes = self.version.subscribe();
        loop {
            if let Some(found) = probe(&*self.state.read().await) {
                return found;
            }
            let _ = changes.changed().await;
        }
    }

    fn emit(state: &mut LedgerState, emitter: Address, event: ContractEvent) -> EventLog {
        let log = EventLog { emitter, event };
        state.events.push(log.clone());
        log
    }

    fn receipt(state: &mut LedgerState, name: &str, logs: Vec<EventLog>) -> TransactionReceipt {
        state.next_id += 1;
        state.sent.push(name.to_string());
        let withheld = &state.withheld_from_receipts;
        TransactionReceipt {
            transaction_hash: word(state.next_id),
            logs: logs
                .into_iter()
                .filter(|log| !withheld.contains(&event_name(&log.event)))
                .collect(),
        }
    }

    // ------------------------------------------------------------------
    // Test drivers
    // ------------------------------------------------------------------

    pub async fn sent(&self) -> Vec<String> {
        self.read(|s| s.sent.clone()).await
    }

    /// Keep emitting `event` on chain but drop it from receipts
    pub async fn withhold_from_receipts(&self, event: &'static str) {
        self.mutate(|s| s.withheld_from_receipts.push(event)).await;
    }

    /// Keep publishes the signer group key
    pub async fn publish_signer_key(&self, keep: Address) {
        let mut key = hex::decode(SIGNER_X).expect("hex");
        key.extend(hex::decode(SIGNER_Y).expect("hex"));
        self.mutate(|s| {
            s.keep_keys.insert(keep, Bytes::from(key.clone()));
            Self::emit(
                s,
                keep,
                ContractEvent::PublicKeyPublished(PublicKeyPublishedEvent {
                    public_key: Bytes::from(key),
                }),
            );
        })
        .await;
    }

    /// Broadcast an unconfirmed transaction paying `value` to `address`
    pub async fn broadcast(&self, address: &str, value: u64) -> String {
        self.mutate(|s| {
            s.next_id += 1;
            let version = hex::decode("01000000").expect("hex");
            let mut tx_in_vector = vec![0x01];
            tx_in_vector.extend_from_slice(word(s.next_id).as_slice());
            tx_in_vector.extend_from_slice(&[0, 0, 0, 0, 0, 0xff, 0xff, 0xff, 0xff]);
            let mut tx_out_vector = vec![0x01];
            tx_out_vector.extend_from_slice(&value.to_le_bytes());
            tx_out_vector.extend_from_slice(&[0x16, 0x00, 0x14]);
            tx_out_vector.extend_from_slice(&[0x75; 20]);
            let locktime = vec![0, 0, 0, 0];

            let txid = compute_txid(&version, &tx_in_vector, &tx_out_vector, &locktime);
            s.transactions.push(BitcoinTx {
                txid: txid.clone(),
                address: address.to_string(),
                value,
                version,
                tx_in_vector,
                tx_out_vector,
                locktime,
                block_height: None,
            });
            txid
        })
        .await
    }

    /// Mine `count` blocks; pending transactions land in the first one
    pub async fn mine(&self, count: u64) {
        self.mutate(|s| {
            let next = s.tip_height + 1;
            for tx in s.transactions.iter_mut().filter(|tx| tx.block_height.is_none()) {
                tx.block_height = Some(next);
            }
            s.tip_height += count;
        })
        .await;
    }

    /// A deposit already qualified, owned by the default account
    pub async fn open_active_deposit(&self, lot_size: u64) -> DepositAddresses {
        let account = self.account;
        let system = self.addresses.system;
        self.mutate(|s| {
            s.next_id += 1;
            let deposit = tagged_address(0xd0, s.next_id);
            let keep = tagged_address(0xee, s.next_id);
            s.deposits.insert(
                deposit,
                DepositRecord {
                    lot_size,
                    state: DepositState::Active,
                    keep,
                    utxo_size: lot_size,
                    redemption_requirement: None,
                    owner_redemption_requirement: U256::ZERO,
                },
            );
            s.tdt_owners.insert(deposit, account);
            Self::emit(
                s,
                system,
                ContractEvent::Created(CreatedEvent {
                    deposit_contract_address: deposit,
                    keep_address: keep,
                    timestamp: 0,
                }),
            );
            let txid = word(s.next_id);
            Self::emit(
                s,
                system,
                ContractEvent::Funded(FundedEvent {
                    deposit_contract_address: deposit,
                    txid,
                    timestamp: 0,
                }),
            );
            DepositAddresses {
                deposit_address: deposit,
                keep_address: keep,
            }
        })
        .await
    }

    pub async fn set_state(&self, deposit: Address, state: DepositState) {
        self.mutate(|s| {
            if let Some(record) = s.deposits.get_mut(&deposit) {
                record.state = state;
            }
        })
        .await;
    }

    pub async fn set_tdt_owner(&self, deposit: Address, owner: Address) {
        self.mutate(|s| {
            s.tdt_owners.insert(deposit, owner);
        })
        .await;
    }

    pub async fn credit_tbtc(&self, account: Address, amount: U256) {
        self.mutate(|s| {
            *s.tbtc_balances.entry(account).or_default() += amount;
        })
        .await;
    }

    pub async fn set_owner_redemption_requirement(&self, deposit: Address, amount: U256) {
        self.mutate(|s| {
            if let Some(record) = s.deposits.get_mut(&deposit) {
                record.owner_redemption_requirement = amount;
            }
        })
        .await;
    }

    /// Signers bump the fee on a pending redemption
    pub async fn bump_redemption_fee(&self, deposit: Address, requested_fee: U256) {
        let system = self.addresses.system;
        self.mutate(|s| {
            let latest = s
                .events
                .iter()
                .rev()
                .find_map(|log| match &log.event {
                    ContractEvent::RedemptionRequested(e) if e.deposit_contract_address == deposit => {
                        Some(e.clone())
                    }
                    _ => None,
                })
                .expect("redemption requested");
            s.next_id += 1;
            let digest = word(s.next_id);
            Self::emit(
                s,
                system,
                ContractEvent::RedemptionRequested(RedemptionRequestedEvent {
                    requested_fee,
                    digest,
                    ..latest
                }),
            );
        })
        .await;
    }

    pub async fn latest_redemption_event(&self, deposit: Address) -> Option<RedemptionRequestedEvent> {
        self.read(|s| find_latest_redemption(s, deposit)).await
    }

    // ------------------------------------------------------------------
    // Contract behavior
    // ------------------------------------------------------------------

    fn confirmations(state: &LedgerState, txid: &str) -> u64 {
        state
            .transactions
            .iter()
            .find(|tx| tx.txid == txid)
            .and_then(|tx| tx.block_height)
            .map(|height| state.tip_height + 1 - height)
            .unwrap_or(0)
    }

    fn accept_funding_proof(
        state: &mut LedgerState,
        system: Address,
        deposit: Address,
        proof: &FundingProof,
    ) -> EthResult<EventLog> {
        let txid = compute_txid(&proof.version, &proof.tx_in_vector, &proof.tx_out_vector, &proof.locktime);
        let tx = state
            .transactions
            .iter()
            .find(|tx| tx.txid == txid)
            .cloned()
            .ok_or_else(|| EthereumError::Reverted("unknown funding transaction".into()))?;

        let confirmations = Self::confirmations(state, &txid);
        let record = state
            .deposits
            .get_mut(&deposit)
            .ok_or_else(|| EthereumError::Reverted("unknown deposit".into()))?;
        if record.state != DepositState::AwaitingBtcFundingProof {
            return Err(EthereumError::Reverted(format!("deposit in state {}", record.state)));
        }
        if tx.value != record.lot_size {
            return Err(EthereumError::Reverted("funding value mismatch".into()));
        }
        if confirmations < DIFFICULTY_FACTOR || (proof.chain_headers.len() / 80) < DIFFICULTY_FACTOR as usize {
            return Err(EthereumError::Reverted("insufficient work".into()));
        }

        record.state = DepositState::Active;
        record.utxo_size = tx.value;
        state.proofs.push(proof.clone());
        let mut txid_bytes = [0u8; 32];
        txid_bytes.copy_from_slice(&hex::decode(&txid).expect("hex"));
        Ok(Self::emit(
            state,
            system,
            ContractEvent::Funded(FundedEvent {
                deposit_contract_address: deposit,
                txid: B256::from(txid_bytes),
                timestamp: 0,
            }),
        ))
    }

    fn mint_for_tdt(state: &mut LedgerState, token: Address, vending_machine: Address, deposit: Address) -> EthResult<EventLog> {
        let owner = state
            .tdt_owners
            .get(&deposit)
            .copied()
            .ok_or_else(|| EthereumError::Reverted("no such TDT".into()))?;
        let lot_size = state
            .deposits
            .get(&deposit)
            .map(|record| record.lot_size)
            .ok_or_else(|| EthereumError::Reverted("unknown deposit".into()))?;

        let amount = satoshis_to_tbtc(U256::from(lot_size));
        state.tdt_owners.insert(deposit, vending_machine);
        *state.tbtc_balances.entry(owner).or_default() += amount;
        Ok(Self::emit(
            state,
            token,
            ContractEvent::Transfer(TransferEvent {
                from: Address::ZERO,
                to: owner,
                value: amount,
            }),
        ))
    }

    fn start_redemption(
        state: &mut LedgerState,
        system: Address,
        deposit: Address,
        requester: Address,
        output_value_bytes: [u8; 8],
        redeemer_output_script: Bytes,
    ) -> EthResult<EventLog> {
        let record = state
            .deposits
            .get_mut(&deposit)
            .ok_or_else(|| EthereumError::Reverted("unknown deposit".into()))?;
        if record.state != DepositState::Active {
            return Err(EthereumError::Reverted("deposit not ACTIVE".into()));
        }

        let output_value = u64::from_le_bytes(output_value_bytes);
        record.state = DepositState::AwaitingWithdrawalSignature;
        let utxo_size = record.utxo_size;
        state.tdt_owners.insert(deposit, requester);
        state.next_id += 1;
        let digest = word(state.next_id);

        Ok(Self::emit(
            state,
            system,
            ContractEvent::RedemptionRequested(RedemptionRequestedEvent {
                deposit_contract_address: deposit,
                requester,
                digest,
                utxo_size: U256::from(utxo_size),
                redeemer_output_script,
                requested_fee: U256::from(utxo_size - output_value),
                outpoint: Bytes::from(vec![0x0f; 36]),
            }),
        ))
    }
}

fn event_name(event: &ContractEvent) -> &'static str {
    match event {
        ContractEvent::Created(_) => "Created",
        ContractEvent::RegisteredPubkey(_) => "RegisteredPubkey",
        ContractEvent::Funded(_) => "Funded",
        ContractEvent::PublicKeyPublished(_) => "PublicKeyPublished",
        ContractEvent::RedemptionRequested(_) => "RedemptionRequested",
        ContractEvent::Transfer(_) => "Transfer",
    }
}

fn find_latest_redemption(state: &LedgerState, deposit: Address) -> Option<RedemptionRequestedEvent> {
    state.events.iter().rev().find_map(|log| match &log.event {
        ContractEvent::RedemptionRequested(e) if e.deposit_contract_address == deposit => Some(e.clone()),
        _ => None,
    })
}

// ============================================================================
// Ethereum side
// ============================================================================

pub struct TestEthereum {
    pub ledger: Arc<Ledger>,
}

impl TestEthereum {
    fn bind(&self, address: Address) -> Arc<ContractHandle> {
        Arc::new(ContractHandle {
            ledger: Arc::clone(&self.ledger),
            address,
        })
    }
}

#[async_trait]
impl EthereumClient for TestEthereum {
    async fn network_id(&self) -> EthResult<String> {
        Ok(NETWORK_ID.to_string())
    }

    fn default_account(&self) -> Address {
        self.ledger.account
    }

    async fn get_balance(&self, account: Address) -> EthResult<U256> {
        Ok(self
            .ledger
            .read(|s| s.eth_balances.get(&account).copied().unwrap_or_default())
            .await)
    }

    fn system_contract(&self, address: Address) -> Arc<dyn SystemContract> {
        self.bind(address)
    }

    fn token_contract(&self, address: Address) -> Arc<dyn TokenContract> {
        self.bind(address)
    }

    fn deposit_token_contract(&self, address: Address) -> Arc<dyn DepositTokenContract> {
        self.bind(address)
    }

    fn fee_rebate_token_contract(&self, address: Address) -> Arc<dyn FeeRebateTokenContract> {
        self.bind(address)
    }

    fn deposit_factory_contract(&self, address: Address) -> Arc<dyn DepositFactoryContract> {
        self.bind(address)
    }

    fn vending_machine_contract(&self, address: Address) -> Arc<dyn VendingMachineContract> {
        self.bind(address)
    }

    fn deposit_contract(&self, address: Address) -> Arc<dyn DepositContract> {
        self.bind(address)
    }

    fn keep_contract(&self, address: Address) -> Arc<dyn KeepContract> {
        self.bind(address)
    }
}

/// Every contract role at one address
pub struct ContractHandle {
    ledger: Arc<Ledger>,
    address: Address,
}

impl ContractHandle {
    async fn deposit_record(&self) -> EthResult<DepositRecord> {
        let address = self.address;
        self.ledger
            .read(|s| s.deposits.get(&address).cloned())
            .await
            .ok_or_else(|| EthereumError::Call(format!("no deposit at {}", address)))
    }
}

#[async_trait]
impl SystemContract for ContractHandle {
    fn address(&self) -> Address {
        self.address
    }

    async fn get_allowed_lot_sizes(&self) -> EthResult<Vec<u64>> {
        Ok(self.ledger.read(|s| s.allowed_lot_sizes.clone()).await)
    }

    async fn is_allowed_lot_size(&self, lot_size: u64) -> EthResult<bool> {
        Ok(self.ledger.read(|s| s.allowed_lot_sizes.contains(&lot_size)).await)
    }

    async fn create_new_deposit_fee_estimate(&self) -> EthResult<U256> {
        Ok(self.ledger.read(|s| s.creation_fee).await)
    }

    async fn get_tx_proof_difficulty_factor(&self) -> EthResult<u64> {
        Ok(DIFFICULTY_FACTOR)
    }

    async fn get_minimum_redemption_fee(&self) -> EthResult<u64> {
        Ok(self.ledger.read(|s| s.minimum_redemption_fee).await)
    }

    async fn find_created_event(&self, deposit: Address) -> EthResult<Option<CreatedEvent>> {
        Ok(self
            .ledger
            .read(|s| {
                s.events.iter().find_map(|log| match &log.event {
                    ContractEvent::Created(e) if e.deposit_contract_address == deposit => Some(e.clone()),
                    _ => None,
                })
            })
            .await)
    }

    async fn find_registered_pubkey_event(
        &self,
        deposit: Address,
    ) -> EthResult<Option<RegisteredPubkeyEvent>> {
        Ok(self
            .ledger
            .read(|s| {
                s.events.iter().find_map(|log| match &log.event {
                    ContractEvent::RegisteredPubkey(e) if e.deposit_contract_address == deposit => {
                        Some(e.clone())
                    }
                    _ => None,
                })
            })
            .await)
    }

    async fn wait_for_funded_event(&self, deposit: Address) -> EthResult<FundedEvent> {
        Ok(self
            .ledger
            .wait_until(|s| {
                s.events.iter().find_map(|log| match &log.event {
                    ContractEvent::Funded(e) if e.deposit_contract_address == deposit => Some(e.clone()),
                    _ => None,
                })
            })
            .await)
    }

    async fn find_latest_redemption_requested_event(
        &self,
        deposit: Address,
    ) -> EthResult<Option<RedemptionRequestedEvent>> {
        Ok(self.ledger.read(|s| find_latest_redemption(s, deposit)).await)
    }
}

#[async_trait]
impl DepositFactoryContract for ContractHandle {
    fn address(&self) -> Address {
        self.address
    }

    async fn create_deposit(&self, lot_size: u64, value: U256) -> EthResult<TransactionReceipt> {
        let account = self.ledger.account;
        let system = self.ledger.addresses.system;
        self.ledger
            .mutate(|s| {
                if value < s.creation_fee {
                    return Err(EthereumError::Reverted("insufficient creation fee".into()));
                }
                s.next_id += 1;
                let deposit = tagged_address(0xd0, s.next_id);
                let keep = tagged_address(0xee, s.next_id);
                s.deposits.insert(
                    deposit,
                    DepositRecord {
                        lot_size,
                        state: DepositState::AwaitingSignerSetup,
                        keep,
                        utxo_size: 0,
                        redemption_requirement: None,
                        owner_redemption_requirement: U256::ZERO,
                    },
                );
                s.tdt_owners.insert(deposit, account);
                s.frt_owners.insert(deposit, account);
                let created = Ledger::emit(
                    s,
                    system,
                    ContractEvent::Created(CreatedEvent {
                        deposit_contract_address: deposit,
                        keep_address: keep,
                        timestamp: 0,
                    }),
                );
                Ok(Ledger::receipt(s, "createDeposit", vec![created]))
            })
            .await
    }
}

#[async_trait]
impl DepositContract for ContractHandle {
    fn address(&self) -> Address {
        self.address
    }

    async fn current_state(&self) -> EthResult<u8> {
        Ok(self.deposit_record().await?.state.code())
    }

    async fn in_active(&self) -> EthResult<bool> {
        Ok(self.deposit_record().await?.state == DepositState::Active)
    }

    async fn lot_size_satoshis(&self) -> EthResult<u64> {
        Ok(self.deposit_record().await?.lot_size)
    }

    async fn utxo_size(&self) -> EthResult<u64> {
        Ok(self.deposit_record().await?.utxo_size)
    }

    async fn get_redemption_tbtc_requirement(&self, _requester: Address) -> EthResult<U256> {
        let record = self.deposit_record().await?;
        Ok(record
            .redemption_requirement
            .unwrap_or_else(|| satoshis_to_tbtc(U256::from(record.lot_size))))
    }

    async fn get_owner_redemption_tbtc_requirement(&self, _requester: Address) -> EthResult<U256> {
        Ok(self.deposit_record().await?.owner_redemption_requirement)
    }

    async fn retrieve_signer_pubkey(&self) -> EthResult<TransactionReceipt> {
        let deposit = self.address;
        let system = self.ledger.addresses.system;
        self.ledger
            .mutate(|s| {
                let record = s
                    .deposits
                    .get_mut(&deposit)
                    .ok_or_else(|| EthereumError::Reverted("unknown deposit".into()))?;
                let key = s
                    .keep_keys
                    .get(&record.keep)
                    .cloned()
                    .ok_or_else(|| EthereumError::Reverted("keep has no public key".into()))?;
                record.state = DepositState::AwaitingBtcFundingProof;

                let registered = Ledger::emit(
                    s,
                    system,
                    ContractEvent::RegisteredPubkey(RegisteredPubkeyEvent {
                        deposit_contract_address: deposit,
                        signing_group_pubkey_x: B256::from_slice(&key[..32]),
                        signing_group_pubkey_y: B256::from_slice(&key[32..]),
                        timestamp: 0,
                    }),
                );
                Ok(Ledger::receipt(s, "retrieveSignerPubkey", vec![registered]))
            })
            .await
    }

    async fn provide_btc_funding_proof(&self, proof: &FundingProof) -> EthResult<TransactionReceipt> {
        let deposit = self.address;
        let system = self.ledger.addresses.system;
        self.ledger
            .mutate(|s| {
                let funded = Ledger::accept_funding_proof(s, system, deposit, proof)?;
                Ok(Ledger::receipt(s, "provideBTCFundingProof", vec![funded]))
            })
            .await
    }

    async fn request_redemption(
        &self,
        output_value_bytes: [u8; 8],
        redeemer_output_script: Bytes,
    ) -> EthResult<TransactionReceipt> {
        let deposit = self.address;
        let account = self.ledger.account;
        let system = self.ledger.addresses.system;
        self.ledger
            .mutate(|s| {
                let requested = Ledger::start_redemption(
                    s,
                    system,
                    deposit,
                    account,
                    output_value_bytes,
                    redeemer_output_script,
                )?;
                Ok(Ledger::receipt(s, "requestRedemption", vec![requested]))
            })
            .await
    }
}

#[async_trait]
impl KeepContract for ContractHandle {
    fn address(&self) -> Address {
        self.address
    }

    async fn wait_for_public_key_published(&self) -> EthResult<PublicKeyPublishedEvent> {
        let keep = self.address;
        Ok(self
            .ledger
            .wait_until(|s| {
                s.keep_keys
                    .get(&keep)
                    .map(|key| PublicKeyPublishedEvent { public_key: key.clone() })
            })
            .await)
    }
}

#[async_trait]
impl DepositTokenContract for ContractHandle {
    fn address(&self) -> Address {
        self.address
    }

    async fn owner_of(&self, token_id: U256) -> EthResult<Address> {
        let deposit = token_id_to_address(token_id);
        self.ledger
            .read(|s| s.tdt_owners.get(&deposit).copied())
            .await
            .ok_or_else(|| EthereumError::Call("nonexistent token".into()))
    }

    async fn approve(&self, _to: Address, _token_id: U256) -> EthResult<TransactionReceipt> {
        Ok(self.ledger.mutate(|s| Ledger::receipt(s, "TBTCDepositToken.approve", vec![])).await)
    }
}

#[async_trait]
impl FeeRebateTokenContract for ContractHandle {
    fn address(&self) -> Address {
        self.address
    }

    async fn owner_of(&self, token_id: U256) -> EthResult<Option<Address>> {
        let deposit = token_id_to_address(token_id);
        Ok(self.ledger.read(|s| s.frt_owners.get(&deposit).copied()).await)
    }
}

#[async_trait]
impl TokenContract for ContractHandle {
    fn address(&self) -> Address {
        self.address
    }

    async fn balance_of(&self, account: Address) -> EthResult<U256> {
        Ok(self
            .ledger
            .read(|s| s.tbtc_balances.get(&account).copied().unwrap_or_default())
            .await)
    }

    async fn approve(&self, _spender: Address, _amount: U256) -> EthResult<TransactionReceipt> {
        Ok(self.ledger.mutate(|s| Ledger::receipt(s, "TBTCToken.approve", vec![])).await)
    }
}

#[async_trait]
impl VendingMachineContract for ContractHandle {
    fn address(&self) -> Address {
        self.address
    }

    async fn tdt_to_tbtc(&self, tdt_id: U256) -> EthResult<TransactionReceipt> {
        let deposit = token_id_to_address(tdt_id);
        let (token, vending_machine) = (self.ledger.addresses.token, self.address);
        self.ledger
            .mutate(|s| {
                let transfer = Ledger::mint_for_tdt(s, token, vending_machine, deposit)?;
                Ok(Ledger::receipt(s, "tdtToTbtc", vec![transfer]))
            })
            .await
    }

    async fn unqualified_deposit_to_tbtc(
        &self,
        deposit: Address,
        proof: &FundingProof,
    ) -> EthResult<TransactionReceipt> {
        let system = self.ledger.addresses.system;
        let (token, vending_machine) = (self.ledger.addresses.token, self.address);
        self.ledger
            .mutate(|s| {
                let funded = Ledger::accept_funding_proof(s, system, deposit, proof)?;
                let transfer = Ledger::mint_for_tdt(s, token, vending_machine, deposit)?;
                Ok(Ledger::receipt(s, "unqualifiedDepositToTbtc", vec![funded, transfer]))
            })
            .await
    }

    async fn tbtc_to_btc(
        &self,
        deposit: Address,
        output_value_bytes: [u8; 8],
        redeemer_output_script: Bytes,
        requester: Address,
    ) -> EthResult<TransactionReceipt> {
        let system = self.ledger.addresses.system;
        self.ledger
            .mutate(|s| {
                let requested = Ledger::start_redemption(
                    s,
                    system,
                    deposit,
                    requester,
                    output_value_bytes,
                    redeemer_output_script,
                )?;
                Ok(Ledger::receipt(s, "tbtcToBtc", vec![requested]))
            })
            .await
    }
}

// ============================================================================
// Bitcoin side
// ============================================================================

pub struct TestBitcoin {
    pub ledger: Arc<Ledger>,
}

fn found(tx: &BitcoinTx) -> FoundTransaction {
    FoundTransaction {
        transaction_id: tx.txid.clone(),
        output_position: 0,
        value: tx.value,
    }
}

#[async_trait]
impl BitcoinClient for TestBitcoin {
    async fn find_transaction(
        &self,
        address: &str,
        value: u64,
    ) -> Result<Option<FoundTransaction>, BitcoinError> {
        Ok(self
            .ledger
            .read(|s| {
                s.transactions
                    .iter()
                    .find(|tx| tx.address == address && tx.value == value)
                    .map(found)
            })
            .await)
    }

    async fn find_or_wait_for(&self, address: &str, value: u64) -> Result<FoundTransaction, BitcoinError> {
        let address = address.to_string();
        Ok(self
            .ledger
            .wait_until(|s| {
                s.transactions
                    .iter()
                    .find(|tx| tx.address == address && tx.value == value)
                    .map(found)
            })
            .await)
    }

    async fn wait_for_confirmations(
        &self,
        transaction: &FoundTransaction,
        required: u64,
    ) -> Result<u64, BitcoinError> {
        let txid = transaction.transaction_id.clone();
        Ok(self
            .ledger
            .wait_until(|s| {
                let confirmations = Ledger::confirmations(s, &txid);
                (confirmations >= required).then_some(confirmations)
            })
            .await)
    }

    async fn check_for_confirmations(
        &self,
        transaction: &FoundTransaction,
        required: u64,
    ) -> Result<bool, BitcoinError> {
        let txid = transaction.transaction_id.clone();
        Ok(self
            .ledger
            .read(|s| Ledger::confirmations(s, &txid) >= required)
            .await)
    }

    async fn estimate_transaction_fee(&self, params: &FeeParameters) -> Result<u64, BitcoinError> {
        let minimum = params.minimum_redemption_fee;
        Ok(self.ledger.read(|s| s.bitcoin_fee.max(minimum)).await)
    }

    async fn get_spv_proof(
        &self,
        transaction_id: &str,
        confirmations: u64,
    ) -> Result<SpvProofBundle, BitcoinError> {
        let txid = transaction_id.to_string();
        self.ledger
            .read(|s| {
                let tx = s
                    .transactions
                    .iter()
                    .find(|tx| tx.txid == txid)
                    .ok_or_else(|| BitcoinError::TransactionNotFound(txid.clone()))?;
                if Ledger::confirmations(s, &txid) < confirmations {
                    return Err(BitcoinError::ProofUnavailable(format!(
                        "{} has fewer than {} confirmations",
                        txid, confirmations
                    )));
                }

                Ok(SpvProofBundle {
                    parsed_transaction: ParsedTransaction {
                        version: hex::encode(&tx.version),
                        tx_in_vector: hex::encode(&tx.tx_in_vector),
                        tx_out_vector: hex::encode(&tx.tx_out_vector),
                        locktime: hex::encode(&tx.locktime),
                    },
                    merkle_proof: "ab".repeat(32 * 2),
                    chain_headers: "00".repeat(80 * confirmations as usize),
                    tx_in_block_index: 1,
                })
            })
            .await
    }
}
