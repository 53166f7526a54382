//! Tabelas de correlação em memória, indexadas por spender.

use ethereum_types::{Address, H256, U256};
use std::collections::HashMap;

use crate::address_type::Tier;

/// Approval registrado para um spender
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalRecord {
    pub asset: Address,
    pub owner: Address,
    pub tx_hash: H256,
    pub timestamp: u64,
    pub token_id: Option<U256>,
    pub is_approval_for_all: bool,
}

/// Permit registrado para um spender
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermitRecord {
    pub asset: Address,
    pub owner: Address,
    pub tx_hash: H256,
    pub deadline: u64,
    /// `None` para permits ilimitados
    pub value: Option<U256>,
}

impl PermitRecord {
    /// O permit cobre a transferência de `amount`
    pub fn covers(&self, amount: U256) -> bool {
        match self.value {
            None => true,
            Some(v) => v == amount,
        }
    }
}

/// Transferência de ativos previamente aprovados
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRecord {
    pub asset: Address,
    pub owner: Address,
    pub tx_hash: H256,
    pub timestamp: u64,
}

/// Registros com timestamp, usados na poda por janela
pub trait Timestamped {
    fn timestamp(&self) -> u64;
    fn tx_hash(&self) -> H256;
    fn asset(&self) -> Address;
    fn owner(&self) -> Address;
}

macro_rules! impl_timestamped {
    ($t:ty) => {
        impl Timestamped for $t {
            fn timestamp(&self) -> u64 {
                self.timestamp
            }
            fn tx_hash(&self) -> H256 {
                self.tx_hash
            }
            fn asset(&self) -> Address {
                self.asset
            }
            fn owner(&self) -> Address {
                self.owner
            }
        }
    };
}

impl_timestamped!(ApprovalRecord);
impl_timestamped!(TransferRecord);

/// Tabela específica em que um approval é registrado, além da combinada
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalTable {
    Erc20,
    Erc721,
    Erc721ForAll,
    Erc1155ForAll,
}

type PerSpender<T> = HashMap<Address, Vec<T>>;

/// Conjunto de tabelas de uma faixa de severidade
#[derive(Debug, Default)]
pub struct TierTables {
    pub approvals: PerSpender<ApprovalRecord>,
    pub erc20_approvals: PerSpender<ApprovalRecord>,
    pub erc721_approvals: PerSpender<ApprovalRecord>,
    pub erc721_approvals_for_all: PerSpender<ApprovalRecord>,
    pub erc1155_approvals_for_all: PerSpender<ApprovalRecord>,
    pub permits: PerSpender<PermitRecord>,
    pub transfers: PerSpender<TransferRecord>,
}

/// Quantidade de spenders em cada tabela
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableStats {
    pub approvals: usize,
    pub erc20_approvals: usize,
    pub erc721_approvals: usize,
    pub erc721_approvals_for_all: usize,
    pub erc1155_approvals_for_all: usize,
    pub permits: usize,
    pub transfers: usize,
}

fn prune_list<T: Timestamped>(list: &mut Vec<T>, now: u64, window: u64) {
    list.retain(|r| now.saturating_sub(r.timestamp()) < window);
}

/// Remove spenders cujo registro mais recente saiu da janela
fn sweep_map<T: Timestamped>(map: &mut PerSpender<T>, now: u64, window: u64) {
    map.retain(|_, list| match list.last() {
        Some(last) => now.saturating_sub(last.timestamp()) <= window,
        None => false,
    });
}

impl TierTables {
    fn table_mut(&mut self, table: ApprovalTable) -> &mut PerSpender<ApprovalRecord> {
        match table {
            ApprovalTable::Erc20 => &mut self.erc20_approvals,
            ApprovalTable::Erc721 => &mut self.erc721_approvals,
            ApprovalTable::Erc721ForAll => &mut self.erc721_approvals_for_all,
            ApprovalTable::Erc1155ForAll => &mut self.erc1155_approvals_for_all,
        }
    }

    pub fn table(&self, table: ApprovalTable) -> &PerSpender<ApprovalRecord> {
        match table {
            ApprovalTable::Erc20 => &self.erc20_approvals,
            ApprovalTable::Erc721 => &self.erc721_approvals,
            ApprovalTable::Erc721ForAll => &self.erc721_approvals_for_all,
            ApprovalTable::Erc1155ForAll => &self.erc1155_approvals_for_all,
        }
    }

    /// Registra o approval na tabela específica e na combinada
    pub fn record_approval(&mut self, spender: Address, table: ApprovalTable, record: ApprovalRecord) {
        self.table_mut(table).entry(spender).or_default().push(record.clone());
        self.approvals.entry(spender).or_default().push(record);
    }

    pub fn record_permit(&mut self, spender: Address, record: PermitRecord) {
        self.permits.entry(spender).or_default().push(record);
    }

    pub fn record_transfer(&mut self, spender: Address, record: TransferRecord) {
        self.transfers.entry(spender).or_default().push(record);
    }

    /// Mantém apenas os approvals do spender dentro da janela
    pub fn prune_approvals(&mut self, spender: &Address, now: u64, window: u64) {
        for map in [
            &mut self.approvals,
            &mut self.erc20_approvals,
            &mut self.erc721_approvals,
            &mut self.erc721_approvals_for_all,
            &mut self.erc1155_approvals_for_all,
        ] {
            if let Some(list) = map.get_mut(spender) {
                prune_list(list, now, window);
            }
        }
    }

    pub fn prune_transfers(&mut self, spender: &Address, now: u64, window: u64) {
        if let Some(list) = self.transfers.get_mut(spender) {
            prune_list(list, now, window);
        }
    }

    /// Há approvals ou permits rastreados para o spender
    pub fn monitors(&self, spender: &Address) -> bool {
        self.approvals.get(spender).map_or(false, |l| !l.is_empty())
            || self.permits.get(spender).map_or(false, |l| !l.is_empty())
    }

    /// Approval ERC-20 já rastreado para o par (owner, asset)
    pub fn has_erc20_approval(&self, spender: &Address, owner: &Address, asset: &Address) -> bool {
        self.erc20_approvals
            .get(spender)
            .map_or(false, |l| l.iter().any(|a| a.owner == *owner && a.asset == *asset))
    }

    /// Permit do owner para o ativo registrado para o spender
    pub fn has_permit(&self, spender: &Address, owner: &Address, asset: &Address) -> bool {
        self.permits
            .get(spender)
            .map_or(false, |l| l.iter().any(|p| p.owner == *owner && p.asset == *asset))
    }

    /// Procura o approval que autoriza a transferência.
    ///
    /// NFTs exigem approval do mesmo owner no mesmo ativo que seja
    /// ApprovalForAll ou cubra um dos ids; ERC-20 exige approval do mesmo
    /// owner no mesmo ativo registrado antes de `timestamp`.
    pub fn find_approval(
        &self,
        spender: &Address,
        owner: &Address,
        asset: &Address,
        token_ids: &[U256],
        timestamp: u64,
    ) -> Option<&ApprovalRecord> {
        let list = self.approvals.get(spender)?;
        let mut candidates = list.iter().filter(|a| a.owner == *owner && a.asset == *asset);
        if token_ids.is_empty() {
            candidates.find(|a| !a.is_approval_for_all && a.token_id.is_none() && a.timestamp < timestamp)
        } else {
            candidates.find(|a| a.is_approval_for_all || a.token_id.map_or(false, |id| token_ids.contains(&id)))
        }
    }

    /// Limpeza periódica; retorna quantos spenders foram removidos
    pub fn sweep(&mut self, now: u64, window: u64) -> usize {
        let before = self.spender_count();
        sweep_map(&mut self.approvals, now, window);
        sweep_map(&mut self.erc20_approvals, now, window);
        sweep_map(&mut self.erc721_approvals, now, window);
        sweep_map(&mut self.erc721_approvals_for_all, now, window);
        sweep_map(&mut self.erc1155_approvals_for_all, now, window);
        sweep_map(&mut self.transfers, now, window);
        self.permits.retain(|_, list| {
            list.retain(|p| p.deadline >= now);
            !list.is_empty()
        });
        before - self.spender_count()
    }

    fn spender_count(&self) -> usize {
        let s = self.stats();
        s.approvals
            + s.erc20_approvals
            + s.erc721_approvals
            + s.erc721_approvals_for_all
            + s.erc1155_approvals_for_all
            + s.permits
            + s.transfers
    }

    pub fn stats(&self) -> TableStats {
        TableStats {
            approvals: self.approvals.len(),
            erc20_approvals: self.erc20_approvals.len(),
            erc721_approvals: self.erc721_approvals.len(),
            erc721_approvals_for_all: self.erc721_approvals_for_all.len(),
            erc1155_approvals_for_all: self.erc1155_approvals_for_all.len(),
            permits: self.permits.len(),
            transfers: self.transfers.len(),
        }
    }
}

/// Tabelas das duas faixas de severidade
#[derive(Debug, Default)]
pub struct TrackingTables {
    pub standard: TierTables,
    pub info: TierTables,
}

impl TrackingTables {
    pub fn tier(&self, tier: Tier) -> &TierTables {
        match tier {
            Tier::Standard => &self.standard,
            Tier::Info => &self.info,
        }
    }

    pub fn tier_mut(&mut self, tier: Tier) -> &mut TierTables {
        match tier {
            Tier::Standard => &mut self.standard,
            Tier::Info => &mut self.info,
        }
    }

    pub fn sweep(&mut self, now: u64, window: u64) -> usize {
        self.standard.sweep(now, window) + self.info.sweep(now, window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: u64 = 86_400;

    fn approval(owner: u8, asset: u8, timestamp: u64) -> ApprovalRecord {
        ApprovalRecord {
            asset: Address::repeat_byte(asset),
            owner: Address::repeat_byte(owner),
            tx_hash: H256::repeat_byte(owner),
            timestamp,
            token_id: None,
            is_approval_for_all: false,
        }
    }

    #[test]
    fn records_land_in_specific_and_combined_tables() {
        let spender = Address::repeat_byte(0xee);
        let mut t = TierTables::default();
        t.record_approval(spender, ApprovalTable::Erc20, approval(1, 0xa0, 10));
        t.record_approval(spender, ApprovalTable::Erc721ForAll, ApprovalRecord { is_approval_for_all: true, ..approval(2, 0xa1, 11) });

        assert_eq!(t.approvals[&spender].len(), 2);
        assert_eq!(t.erc20_approvals[&spender].len(), 1);
        assert_eq!(t.table(ApprovalTable::Erc721ForAll)[&spender].len(), 1);
        assert!(t.monitors(&spender));
        assert!(t.has_erc20_approval(&spender, &Address::repeat_byte(1), &Address::repeat_byte(0xa0)));
        assert!(!t.has_erc20_approval(&spender, &Address::repeat_byte(1), &Address::repeat_byte(0xa1)));
    }

    #[test]
    fn prune_keeps_only_records_inside_window() {
        let spender = Address::repeat_byte(0xee);
        let mut t = TierTables::default();
        t.record_approval(spender, ApprovalTable::Erc20, approval(1, 0xa0, 0));
        t.record_approval(spender, ApprovalTable::Erc20, approval(2, 0xa0, 5 * DAY));
        t.prune_approvals(&spender, 10 * DAY, 7 * DAY);
        assert_eq!(t.approvals[&spender].len(), 1);
        assert_eq!(t.erc20_approvals[&spender][0].owner, Address::repeat_byte(2));
    }

    #[test]
    fn sweep_boundary_uses_newest_record() {
        let window = 30 * DAY;
        let last = 1_000_000;
        let spender = Address::repeat_byte(0xee);

        let mut kept = TierTables::default();
        kept.record_approval(spender, ApprovalTable::Erc20, approval(1, 0xa0, last));
        kept.sweep(last + window - 1, window);
        assert_eq!(kept.stats().approvals, 1);

        let mut removed = TierTables::default();
        removed.record_approval(spender, ApprovalTable::Erc20, approval(1, 0xa0, last));
        removed.sweep(last + window + 1, window);
        assert_eq!(removed.stats(), TableStats::default());
    }

    #[test]
    fn sweep_drops_expired_permits() {
        let spender = Address::repeat_byte(0xee);
        let mut t = TierTables::default();
        let permit = |deadline| PermitRecord {
            asset: Address::repeat_byte(0xa0),
            owner: Address::repeat_byte(1),
            tx_hash: H256::zero(),
            deadline,
            value: None,
        };
        t.record_permit(spender, permit(999));
        t.record_permit(spender, permit(2_000));
        t.sweep(1_000, DAY);
        assert_eq!(t.permits[&spender].len(), 1);
        t.sweep(2_001, DAY);
        assert!(t.permits.is_empty());
    }

    #[test]
    fn erc20_approval_must_precede_transfer() {
        let spender = Address::repeat_byte(0xee);
        let owner = Address::repeat_byte(1);
        let asset = Address::repeat_byte(0xa0);
        let mut t = TierTables::default();
        t.record_approval(spender, ApprovalTable::Erc20, approval(1, 0xa0, 100));
        assert!(t.find_approval(&spender, &owner, &asset, &[], 100).is_none());
        assert!(t.find_approval(&spender, &owner, &asset, &[], 101).is_some());
        assert!(t.find_approval(&spender, &owner, &Address::repeat_byte(0xa1), &[], 101).is_none());
    }

    #[test]
    fn nft_approval_matches_for_all_or_token_id() {
        let spender = Address::repeat_byte(0xee);
        let owner = Address::repeat_byte(1);
        let asset = Address::repeat_byte(0xa0);
        let mut t = TierTables::default();
        t.record_approval(
            spender,
            ApprovalTable::Erc721,
            ApprovalRecord { token_id: Some(U256::from(7u64)), ..approval(1, 0xa0, 100) },
        );
        assert!(t.find_approval(&spender, &owner, &asset, &[U256::from(7u64)], 100).is_some());
        assert!(t.find_approval(&spender, &owner, &asset, &[U256::from(8u64)], 100).is_none());

        t.record_approval(
            spender,
            ApprovalTable::Erc721ForAll,
            ApprovalRecord { is_approval_for_all: true, ..approval(1, 0xa0, 100) },
        );
        assert!(t.find_approval(&spender, &owner, &asset, &[U256::from(8u64)], 100).is_some());
    }

    #[test]
    fn permit_coverage() {
        let p = |value| PermitRecord { asset: Address::zero(), owner: Address::zero(), tx_hash: H256::zero(), deadline: 0, value };
        assert!(p(None).covers(U256::from(5u64)));
        assert!(!p(Some(U256::zero())).covers(U256::from(5u64)));
        assert!(p(Some(U256::from(5u64))).covers(U256::from(5u64)));
        assert!(!p(Some(U256::from(4u64))).covers(U256::from(5u64)));
    }
}
