use ethereum_types::Address;
use sentinel_core::{
    traits::ChainProvider,
    utils::{bytecode_contains_selector, format_address},
    Finding, Result,
};
use sentinel_feeds::{ExplorerApi, ScamFeed, SuspiciousContract, SuspiciousContractSource};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::address_type::{AddressType, Tier};
use crate::classifier::{AddressClassifier, Role};
use crate::config::IcePhishingConfig;
use crate::events::{ApprovalEvent, ApprovalKind, BlockEvent, PermitCall, TransferEvent, TransferKind, TxEvent};
use crate::findings::{self, TokenStandard};
use crate::tables::{ApprovalRecord, ApprovalTable, PermitRecord, TrackingTables, TransferRecord};

/// Seletor de `safeBatchTransferFrom`, presente apenas em contratos ERC-1155
const SAFE_BATCH_TRANSFER_FROM: [u8; 4] = [0x2e, 0xb2, 0xc2, 0xd6];

const TIERS: [Tier; 2] = [Tier::Standard, Tier::Info];

/// Alertas agregados já emitidos na invocação corrente, por (alert id, spender)
type Raised = HashSet<(String, Address)>;

fn push_once(findings: &mut Vec<Finding>, raised: &mut Raised, spender: Address, finding: Finding) {
    if raised.insert((finding.alert_id.clone(), spender)) {
        findings.push(finding);
    }
}

/// Detector de ice phishing.
///
/// Correlaciona approvals e permits concedidos por EOAs com transferências
/// posteriores feitas pelo mesmo spender. Todo o estado vive na instância e
/// os handlers recebem `&mut self`, então cada transação ou bloco é
/// processado por inteiro antes do próximo.
pub struct IcePhishingDetector {
    config: IcePhishingConfig,
    classifier: AddressClassifier,
    scam_feed: Arc<dyn ScamFeed>,
    suspicious_source: Arc<dyn SuspiciousContractSource>,
    suspicious_contracts: HashMap<Address, Address>,
    suspicious_loaded: bool,
    tables: TrackingTables,
    last_cleanup: u64,
    last_scam_refresh: Option<u64>,
}

impl IcePhishingDetector {
    pub fn new(
        config: IcePhishingConfig,
        provider: Arc<dyn ChainProvider>,
        explorer: Arc<dyn ExplorerApi>,
        scam_feed: Arc<dyn ScamFeed>,
        suspicious_source: Arc<dyn SuspiciousContractSource>,
    ) -> Self {
        let classifier = AddressClassifier::new(provider, explorer, &config);
        Self {
            config,
            classifier,
            scam_feed,
            suspicious_source,
            suspicious_contracts: HashMap::new(),
            suspicious_loaded: false,
            tables: TrackingTables::default(),
            last_cleanup: 0,
            last_scam_refresh: None,
        }
    }

    pub fn config(&self) -> &IcePhishingConfig {
        &self.config
    }

    pub fn tables(&self) -> &TrackingTables {
        &self.tables
    }

    pub fn classifier(&self) -> &AddressClassifier {
        &self.classifier
    }

    /// Contratos suspeitos conhecidos, contrato → criador
    pub fn suspicious_contracts(&self) -> &HashMap<Address, Address> {
        &self.suspicious_contracts
    }

    pub fn last_cleanup(&self) -> u64 {
        self.last_cleanup
    }

    fn suspicious(&self, address: &Address) -> Option<SuspiciousContract> {
        self.suspicious_contracts
            .get(address)
            .map(|creator| SuspiciousContract { address: *address, creator: *creator })
    }

    /// Processa uma transação: permits, depois approvals, depois transfers.
    ///
    /// Erros do node propagam e abortam a invocação; limites do explorer
    /// apenas descartam o evento afetado.
    pub async fn handle_transaction(&mut self, tx: &TxEvent) -> Result<Vec<Finding>> {
        let mut findings = Vec::new();
        let mut raised = Raised::new();

        for permit in &tx.permits {
            self.process_permit(tx, permit, &mut findings).await?;
        }
        for approval in &tx.approvals {
            self.process_approval(tx, approval, &mut findings, &mut raised).await?;
        }
        for transfer in &tx.transfers {
            self.process_transfer(tx, transfer, &mut findings, &mut raised).await?;
        }

        Ok(findings)
    }

    async fn process_permit(&mut self, tx: &TxEvent, permit: &PermitCall, findings: &mut Vec<Finding>) -> Result<()> {
        let PermitCall { asset, owner, spender, deadline, value } = *permit;
        if permit.is_revoke() {
            return Ok(());
        }
        if tx.from == owner {
            debug!(owner = %format_address(&owner), "permit enviado pelo próprio owner");
            return Ok(());
        }

        let spender_type = self.classifier.classify(spender, Role::Counterparty, tx.block_number).await?;
        let sender_type = self.classifier.classify(tx.from, Role::Counterparty, tx.block_number).await?;
        let (Some(spender_type), Some(sender_type)) = (spender_type, sender_type) else {
            debug!(spender = %format_address(&spender), "classificação inconclusiva; permit ignorado");
            return Ok(());
        };

        if let Some(contract) = [spender, tx.from].iter().find_map(|a| self.suspicious(a)) {
            findings.push(findings::suspicious_permit(&tx.from, &spender, &owner, &asset, &contract));
        }

        let mut parties = vec![(spender, spender_type)];
        if tx.from != spender {
            parties.push((tx.from, sender_type));
        }

        let record = PermitRecord { asset, owner, tx_hash: tx.hash, deadline, value };

        let scam_parties: Vec<Address> = parties
            .iter()
            .filter(|(_, t)| *t == AddressType::ScamAddress)
            .map(|(a, _)| *a)
            .collect();
        if !scam_parties.is_empty() {
            self.tables.standard.record_permit(spender, record);
            let domains = self.classifier.scam_domains_for(&scam_parties);
            findings.push(findings::scam_permit(&tx.from, &spender, &owner, &asset, &scam_parties, domains));
            return Ok(());
        }

        let mut scam_creators = Vec::new();
        for (party, kind) in &parties {
            if !kind.is_contract() {
                continue;
            }
            if let Some(creator) = self.classifier.contract_creator(*party).await? {
                if self.classifier.is_scam(&creator) && !scam_creators.contains(&creator) {
                    scam_creators.push(creator);
                }
            }
        }
        if !scam_creators.is_empty() {
            let domains = self.classifier.scam_domains_for(&scam_creators);
            findings.push(findings::scam_creator_permit(&tx.from, &spender, &owner, &asset, &scam_creators, domains));
        }

        let tier = match (spender_type.tier(), sender_type.tier()) {
            (Some(Tier::Standard), Some(Tier::Standard)) => Tier::Standard,
            (Some(_), Some(_)) => Tier::Info,
            _ => {
                debug!(spender = %format_address(&spender), ?spender_type, ?sender_type, "permit para endereço não rastreado");
                return Ok(());
            }
        };
        self.tables.tier_mut(tier).record_permit(spender, record);
        findings.push(findings::permit(tier, &tx.from, &spender, &owner, &asset));
        Ok(())
    }

    async fn process_approval(
        &mut self,
        tx: &TxEvent,
        approval: &ApprovalEvent,
        findings: &mut Vec<Finding>,
        raised: &mut Raised,
    ) -> Result<()> {
        let ApprovalEvent { asset, owner, spender, .. } = *approval;
        if approval.is_revoke() || spender.is_zero() {
            return Ok(());
        }

        // transferFrom de ERC-20 emite um novo Approval com o saldo restante
        if matches!(approval.kind, ApprovalKind::Erc20 { .. })
            && TIERS.iter().any(|t| self.tables.tier(*t).has_erc20_approval(&spender, &owner, &asset))
        {
            return Ok(());
        }

        match self.classifier.classify(owner, Role::Owner, tx.block_number).await? {
            Some(t) if !t.is_contract() => {}
            _ => return Ok(()),
        }

        let Some(spender_type) = self.classifier.classify(spender, Role::Counterparty, tx.block_number).await? else {
            return Ok(());
        };
        let Some(tier) = spender_type.tier() else {
            debug!(spender = %format_address(&spender), ?spender_type, "spender não rastreado");
            return Ok(());
        };

        let table = match approval.kind {
            ApprovalKind::ForAll { .. } => {
                let code = self.classifier.provider().get_code(asset).await?;
                if bytecode_contains_selector(&code, SAFE_BATCH_TRANSFER_FROM) {
                    ApprovalTable::Erc1155ForAll
                } else {
                    ApprovalTable::Erc721ForAll
                }
            }
            ApprovalKind::Erc721 { .. } => ApprovalTable::Erc721,
            ApprovalKind::Erc20 { .. } => ApprovalTable::Erc20,
        };

        let window = self.config.time_period();
        let tables = self.tables.tier_mut(tier);
        tables.record_approval(
            spender,
            table,
            ApprovalRecord {
                asset,
                owner,
                tx_hash: tx.hash,
                timestamp: tx.timestamp,
                token_id: approval.token_id(),
                is_approval_for_all: approval.is_approval_for_all(),
            },
        );
        tables.prune_approvals(&spender, tx.timestamp, window);

        if spender_type == AddressType::ScamAddress {
            let domains = self.classifier.scam_domains_for(&[spender]);
            findings.push(findings::scam_approval(&spender, &owner, &asset, domains));
        }

        let tables = self.tables.tier(tier);
        let total = tables.approvals.get(&spender).map_or(0, Vec::len);
        if total > self.config.max_address_alerts_per_period {
            info!(spender = %format_address(&spender), total, "spender ignorado até a próxima limpeza");
            self.classifier.set_ignored(spender);
        }

        let list = tables.table(table).get(&spender).map(Vec::as_slice).unwrap_or_default();
        match table {
            ApprovalTable::Erc20 | ApprovalTable::Erc721 => {
                if list.len() > self.config.approve_count_threshold {
                    let standard = if table == ApprovalTable::Erc20 { TokenStandard::Erc20 } else { TokenStandard::Erc721 };
                    push_once(findings, raised, spender, findings::high_num_approvals(tier, standard, &spender, list));
                }
            }
            ApprovalTable::Erc721ForAll | ApprovalTable::Erc1155ForAll => {
                if list.len() > self.config.approve_for_all_count_threshold {
                    let standard = if table == ApprovalTable::Erc721ForAll { TokenStandard::Erc721 } else { TokenStandard::Erc1155 };
                    findings.push(findings::approval_for_all(tier, standard, &spender, &owner, &asset));
                }
            }
        }
        Ok(())
    }

    async fn process_transfer(
        &mut self,
        tx: &TxEvent,
        transfer: &TransferEvent,
        findings: &mut Vec<Finding>,
        raised: &mut Raised,
    ) -> Result<()> {
        let TransferEvent { asset, from, to, .. } = *transfer;
        let spender = tx.from;
        if from == spender || from.is_zero() {
            return Ok(());
        }

        let mut scam_parties = Vec::new();
        if self.classifier.is_scam(&to) {
            scam_parties.push(to);
        }
        if self.classifier.is_scam(&spender) && spender != to {
            scam_parties.push(spender);
        }
        if !scam_parties.is_empty() {
            for party in &scam_parties {
                self.classifier.mark_scam(*party);
            }
            let domains = self.classifier.scam_domains_for(&scam_parties);
            findings.push(findings::scam_transfer(&spender, &from, &to, &asset, &scam_parties, domains));
        }

        if let Some(contract) = self.suspicious(&spender) {
            findings.push(findings::suspicious_transfer(&spender, &from, &to, &asset, &contract));
        }

        if !TIERS.iter().any(|t| self.tables.tier(*t).monitors(&spender)) {
            return Ok(());
        }

        if let Some(amount) = transfer.erc20_value() {
            for tier in TIERS {
                let Some(permits) = self.tables.tier(tier).permits.get(&spender) else {
                    continue;
                };
                for _ in permits.iter().filter(|p| p.asset == asset && p.owner == from && p.covers(amount)) {
                    findings.push(findings::permitted_transfer(tier, &spender, &from, &to, &asset, amount));
                }
            }
        }

        // approval casado tem prioridade; sem ele, vale um permit do mesmo owner no ativo
        let token_ids = transfer.token_ids();
        let matched = TIERS
            .into_iter()
            .find(|t| {
                self.tables
                    .tier(*t)
                    .find_approval(&spender, &from, &asset, &token_ids, tx.timestamp)
                    .is_some()
            })
            .or_else(|| TIERS.into_iter().find(|t| self.tables.tier(*t).has_permit(&spender, &from, &asset)));
        let Some(tier) = matched else {
            return Ok(());
        };

        info!(
            owner = %format_address(&from),
            spender = %format_address(&spender),
            asset = %format_address(&asset),
            ?tier,
            "transferência de ativos previamente aprovados"
        );
        let window = self.config.time_period();
        let tables = self.tables.tier_mut(tier);
        tables.record_transfer(spender, TransferRecord { asset, owner: from, tx_hash: tx.hash, timestamp: tx.timestamp });
        tables.prune_transfers(&spender, tx.timestamp, window);

        let count = self.tables.tier(tier).transfers.get(&spender).map_or(0, Vec::len);
        if count <= self.config.transfer_count_threshold {
            return Ok(());
        }
        if !self.owner_drained(transfer, tx.block_number).await? {
            debug!(owner = %format_address(&from), "owner ainda possui saldo");
            return Ok(());
        }

        let list = self.tables.tier(tier).transfers.get(&spender).map(Vec::as_slice).unwrap_or_default();
        push_once(findings, raised, spender, findings::high_num_transfers(tier, &spender, list));
        Ok(())
    }

    /// Saldo do owner zerado após a transferência, para cada id movido.
    /// ERC-721 sempre conta como drenado.
    async fn owner_drained(&self, transfer: &TransferEvent, block: u64) -> Result<bool> {
        let provider = self.classifier.provider();
        let (asset, owner) = (transfer.asset, transfer.from);
        match &transfer.kind {
            TransferKind::Erc721 { .. } => Ok(true),
            TransferKind::Erc20 { .. } => Ok(provider.balance_of(asset, owner, block).await?.is_zero()),
            TransferKind::Erc1155Single { id, .. } => Ok(provider.balance_of_1155(asset, owner, *id, block).await?.is_zero()),
            TransferKind::Erc1155Batch { ids, .. } => {
                for id in ids {
                    if !provider.balance_of_1155(asset, owner, *id, block).await?.is_zero() {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
        }
    }

    /// Manutenção por bloco: atualiza as listas externas e, uma vez por
    /// janela, limpa as tabelas. Falhas dos feeds são registradas e a última
    /// lista válida é mantida.
    pub async fn handle_block(&mut self, block: &BlockEvent) -> Result<Vec<Finding>> {
        self.refresh_scam_list(block.number).await;
        self.refresh_suspicious_contracts(block.number).await;

        if block.timestamp.saturating_sub(self.last_cleanup) > self.config.time_period() {
            self.cleanup(block.timestamp);
        }
        Ok(Vec::new())
    }

    async fn refresh_scam_list(&mut self, block_number: u64) {
        let due = match self.last_scam_refresh {
            None => true,
            Some(last) => block_number.saturating_sub(last) >= self.config.refresh_interval_blocks,
        };
        if !due {
            return;
        }

        match self.scam_feed.scam_addresses().await {
            Ok(addresses) => {
                debug!(count = addresses.len(), "lista de scam atualizada");
                self.classifier.set_scam_addresses(addresses);
                self.last_scam_refresh = Some(block_number);
            }
            Err(e) => warn!(error = %e, "falha ao atualizar lista de scam; mantendo a anterior"),
        }
        match self.scam_feed.scam_domains().await {
            Ok(domains) => self.classifier.set_scam_domains(domains),
            Err(e) => warn!(error = %e, "falha ao atualizar domínios de scam; mantendo os anteriores"),
        }
    }

    async fn refresh_suspicious_contracts(&mut self, block_number: u64) {
        let full_reload = !self.suspicious_loaded;
        match self.suspicious_source.fetch(block_number, full_reload).await {
            Ok(contracts) => {
                if full_reload {
                    self.suspicious_contracts.clear();
                }
                for c in contracts {
                    self.suspicious_contracts.insert(c.address, c.creator);
                }
                self.suspicious_loaded = true;
            }
            Err(e) => warn!(error = %e, full_reload, "falha ao atualizar contratos suspeitos"),
        }
    }

    fn cleanup(&mut self, now: u64) {
        let before = (self.tables.standard.stats(), self.tables.info.stats());
        let removed = self.tables.sweep(now, self.config.time_period());
        let unignored = self.classifier.clear_ignored();
        self.last_cleanup = now;
        info!(
            approvals_before = before.0.approvals + before.1.approvals,
            permits_before = before.0.permits + before.1.permits,
            transfers_before = before.0.transfers + before.1.transfers,
            approvals_after = self.tables.standard.stats().approvals + self.tables.info.stats().approvals,
            permits_after = self.tables.standard.stats().permits + self.tables.info.stats().permits,
            transfers_after = self.tables.standard.stats().transfers + self.tables.info.stats().transfers,
            removed,
            unignored,
            "limpeza das tabelas de correlação"
        );
    }
}
