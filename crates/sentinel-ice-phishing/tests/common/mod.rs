#![allow(dead_code)]

use async_trait::async_trait;
use ethereum_types::{Address, H256, U256};
use sentinel_core::{traits::ChainProvider, Error, Finding, Result};
use sentinel_feeds::{ExplorerApi, ExplorerResponse, ScamFeed, SuspiciousContract, SuspiciousContractSource};
use sentinel_ice_phishing::{
    ApprovalEvent, ApprovalKind, IcePhishingConfig, IcePhishingDetector, PermitCall, TransferEvent, TransferKind, TxEvent,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const DAY: u64 = 86_400;

pub fn addr(n: u8) -> Address {
    Address::repeat_byte(n)
}

/// Bytecode qualquer, sem o seletor de ERC-1155
pub fn contract_code() -> Vec<u8> {
    vec![0x60, 0x80, 0x60, 0x40, 0x52]
}

/// Bytecode contendo `safeBatchTransferFrom`
pub fn erc1155_code() -> Vec<u8> {
    vec![0x60, 0x80, 0x63, 0x2e, 0xb2, 0xc2, 0xd6, 0x14]
}

#[derive(Default)]
pub struct MockChain {
    pub codes: Mutex<HashMap<Address, Vec<u8>>>,
    pub nonces: Mutex<HashMap<Address, u64>>,
    pub balances: Mutex<HashMap<(Address, Address), U256>>,
    pub balances_1155: Mutex<HashMap<(Address, Address, U256), U256>>,
    pub code_calls: AtomicUsize,
    pub balance_calls: AtomicUsize,
}

impl MockChain {
    pub fn set_code(&self, address: Address, code: Vec<u8>) {
        self.codes.lock().unwrap().insert(address, code);
    }

    pub fn set_nonce(&self, address: Address, nonce: u64) {
        self.nonces.lock().unwrap().insert(address, nonce);
    }

    pub fn set_balance(&self, token: Address, account: Address, balance: u64) {
        self.balances.lock().unwrap().insert((token, account), U256::from(balance));
    }

    pub fn set_balance_1155(&self, token: Address, account: Address, id: u64, balance: u64) {
        self.balances_1155
            .lock()
            .unwrap()
            .insert((token, account, U256::from(id)), U256::from(balance));
    }
}

#[async_trait]
impl ChainProvider for MockChain {
    async fn chain_id(&self) -> Result<u64> {
        Ok(1)
    }

    async fn get_code(&self, address: Address) -> Result<Vec<u8>> {
        self.code_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.codes.lock().unwrap().get(&address).cloned().unwrap_or_default())
    }

    async fn get_transaction_count(&self, address: Address, _block: u64) -> Result<U256> {
        Ok(U256::from(self.nonces.lock().unwrap().get(&address).copied().unwrap_or_default()))
    }

    async fn balance_of(&self, token: Address, account: Address, _block: u64) -> Result<U256> {
        self.balance_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.balances.lock().unwrap().get(&(token, account)).copied().unwrap_or_default())
    }

    async fn balance_of_1155(&self, token: Address, account: Address, id: U256, _block: u64) -> Result<U256> {
        self.balance_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.balances_1155.lock().unwrap().get(&(token, account, id)).copied().unwrap_or_default())
    }
}

#[derive(Default)]
pub struct MockExplorer {
    pub abis: Mutex<HashMap<Address, String>>,
    pub tx_counts: Mutex<HashMap<Address, usize>>,
    pub creators: Mutex<HashMap<Address, Address>>,
    pub rate_limited: AtomicBool,
    pub calls: AtomicUsize,
}

impl MockExplorer {
    pub fn verify(&self, address: Address) {
        self.abis.lock().unwrap().insert(address, "[]".into());
    }

    pub fn set_tx_count(&self, address: Address, count: usize) {
        self.tx_counts.lock().unwrap().insert(address, count);
    }

    pub fn set_creator(&self, contract: Address, creator: Address) {
        self.creators.lock().unwrap().insert(contract, creator);
    }

    fn limited(&self) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.rate_limited.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExplorerApi for MockExplorer {
    async fn contract_abi(&self, address: Address) -> Result<ExplorerResponse<Option<String>>> {
        if self.limited() {
            return Ok(ExplorerResponse::RateLimited);
        }
        Ok(ExplorerResponse::Ok(self.abis.lock().unwrap().get(&address).cloned()))
    }

    async fn transaction_count(&self, address: Address, limit: usize) -> Result<ExplorerResponse<usize>> {
        if self.limited() {
            return Ok(ExplorerResponse::RateLimited);
        }
        let count = self.tx_counts.lock().unwrap().get(&address).copied().unwrap_or_default();
        Ok(ExplorerResponse::Ok(count.min(limit)))
    }

    async fn contract_creator(&self, address: Address) -> Result<ExplorerResponse<Option<Address>>> {
        if self.limited() {
            return Ok(ExplorerResponse::RateLimited);
        }
        Ok(ExplorerResponse::Ok(self.creators.lock().unwrap().get(&address).copied()))
    }
}

#[derive(Default)]
pub struct MockScamFeed {
    pub addresses: Mutex<Vec<Address>>,
    pub domains: Mutex<BTreeMap<String, Vec<Address>>>,
    pub fail: AtomicBool,
    pub calls: AtomicUsize,
}

impl MockScamFeed {
    pub fn set_addresses(&self, addresses: Vec<Address>) {
        *self.addresses.lock().unwrap() = addresses;
    }

    pub fn set_domain(&self, domain: &str, addresses: Vec<Address>) {
        self.domains.lock().unwrap().insert(domain.to_string(), addresses);
    }
}

#[async_trait]
impl ScamFeed for MockScamFeed {
    async fn scam_addresses(&self) -> Result<Vec<Address>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::HttpError("feed fora do ar".into()));
        }
        Ok(self.addresses.lock().unwrap().clone())
    }

    async fn scam_domains(&self) -> Result<BTreeMap<String, Vec<Address>>> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::HttpError("feed fora do ar".into()));
        }
        Ok(self.domains.lock().unwrap().clone())
    }
}

#[derive(Default)]
pub struct MockSuspicious {
    pub contracts: Mutex<Vec<SuspiciousContract>>,
    pub reloads: Mutex<Vec<bool>>,
    pub fail: AtomicBool,
}

#[async_trait]
impl SuspiciousContractSource for MockSuspicious {
    async fn fetch(&self, _block_number: u64, full_reload: bool) -> Result<Vec<SuspiciousContract>> {
        self.reloads.lock().unwrap().push(full_reload);
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::HttpError("graphql indisponível".into()));
        }
        Ok(self.contracts.lock().unwrap().clone())
    }
}

pub struct Harness {
    pub detector: IcePhishingDetector,
    pub chain: Arc<MockChain>,
    pub explorer: Arc<MockExplorer>,
    pub scam: Arc<MockScamFeed>,
    pub suspicious: Arc<MockSuspicious>,
}

impl Harness {
    pub fn new(config: IcePhishingConfig) -> Self {
        let chain = Arc::new(MockChain::default());
        let explorer = Arc::new(MockExplorer::default());
        let scam = Arc::new(MockScamFeed::default());
        let suspicious = Arc::new(MockSuspicious::default());
        let detector = IcePhishingDetector::new(config, chain.clone(), explorer.clone(), scam.clone(), suspicious.clone());
        Self { detector, chain, explorer, scam, suspicious }
    }
}

pub fn tx(from: Address, timestamp: u64, seq: u64) -> TxEvent {
    TxEvent {
        hash: H256::from_low_u64_be(seq),
        from,
        timestamp,
        block_number: seq,
        ..Default::default()
    }
}

pub fn erc20_approval(asset: Address, owner: Address, spender: Address, value: u64) -> ApprovalEvent {
    ApprovalEvent { asset, owner, spender, kind: ApprovalKind::Erc20 { value: U256::from(value) } }
}

pub fn erc721_approval(asset: Address, owner: Address, spender: Address, token_id: u64) -> ApprovalEvent {
    ApprovalEvent { asset, owner, spender, kind: ApprovalKind::Erc721 { token_id: U256::from(token_id) } }
}

pub fn approval_for_all(asset: Address, owner: Address, operator: Address, approved: bool) -> ApprovalEvent {
    ApprovalEvent { asset, owner, spender: operator, kind: ApprovalKind::ForAll { approved } }
}

pub fn erc20_transfer(asset: Address, from: Address, to: Address, value: u64) -> TransferEvent {
    TransferEvent { asset, from, to, kind: TransferKind::Erc20 { value: U256::from(value) } }
}

pub fn erc721_transfer(asset: Address, from: Address, to: Address, token_id: u64) -> TransferEvent {
    TransferEvent { asset, from, to, kind: TransferKind::Erc721 { token_id: U256::from(token_id) } }
}

pub fn permit(asset: Address, owner: Address, spender: Address, deadline: u64, value: Option<u64>) -> PermitCall {
    PermitCall { asset, owner, spender, deadline, value: value.map(U256::from) }
}

pub fn alert_ids(findings: &[Finding]) -> Vec<&str> {
    findings.iter().map(|f| f.alert_id.as_str()).collect()
}
