mod common;

use common::*;
use sentinel_ice_phishing::{AddressClassifier, AddressType, IcePhishingConfig, Role};
use std::collections::BTreeMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;

fn classifier() -> (AddressClassifier, Arc<MockChain>, Arc<MockExplorer>) {
    let chain = Arc::new(MockChain::default());
    let explorer = Arc::new(MockExplorer::default());
    let c = AddressClassifier::new(chain.clone(), explorer.clone(), &IcePhishingConfig::default());
    (c, chain, explorer)
}

#[tokio::test]
async fn eoa_nonce_threshold_is_exclusive() {
    let (mut c, chain, _) = classifier();
    chain.set_nonce(addr(1), 100);
    chain.set_nonce(addr(2), 101);

    assert_eq!(c.classify(addr(1), Role::Counterparty, 1).await.unwrap(), Some(AddressType::EoaLowNonce));
    assert_eq!(c.classify(addr(2), Role::Counterparty, 1).await.unwrap(), Some(AddressType::EoaHighNonce));
}

#[tokio::test]
async fn contract_owner_skips_explorer_and_cache() {
    let (mut c, chain, explorer) = classifier();
    chain.set_code(addr(1), contract_code());

    let kind = c.classify(addr(1), Role::Owner, 1).await.unwrap();
    assert_eq!(kind, Some(AddressType::LowNumTxsUnverifiedContract));
    assert_eq!(explorer.calls.load(Ordering::SeqCst), 0);
    assert_eq!(c.cache_len(), 0);
}

#[tokio::test]
async fn verified_busy_contract_is_never_requeried() {
    let (mut c, chain, explorer) = classifier();
    let target = addr(0x80);
    chain.set_code(target, contract_code());
    explorer.verify(target);
    explorer.set_tx_count(target, 10);

    let first = c.classify(target, Role::Counterparty, 1).await.unwrap();
    assert_eq!(first, Some(AddressType::HighNumTxsVerifiedContract));
    assert_eq!(explorer.calls.load(Ordering::SeqCst), 2);

    let second = c.classify(target, Role::Counterparty, 2).await.unwrap();
    assert_eq!(second, first);
    assert_eq!(explorer.calls.load(Ordering::SeqCst), 2);
    assert_eq!(chain.code_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn cached_counterparty_is_reclassified() {
    let (mut c, chain, explorer) = classifier();
    let target = addr(0x81);
    chain.set_code(target, contract_code());

    assert_eq!(
        c.classify(target, Role::Counterparty, 1).await.unwrap(),
        Some(AddressType::LowNumTxsUnverifiedContract)
    );

    explorer.set_tx_count(target, 6_000);
    assert_eq!(
        c.classify(target, Role::Counterparty, 2).await.unwrap(),
        Some(AddressType::HighNumTxsUnverifiedContract)
    );
    assert_eq!(c.cached(&target), Some(AddressType::HighNumTxsUnverifiedContract));
}

#[tokio::test]
async fn cached_owner_keeps_previous_type() {
    let (mut c, chain, _) = classifier();
    let owner = addr(3);
    c.classify(owner, Role::Owner, 1).await.unwrap();
    chain.set_nonce(owner, 500);

    assert_eq!(c.classify(owner, Role::Owner, 2).await.unwrap(), Some(AddressType::EoaLowNonce));
    assert_eq!(c.classify(owner, Role::Counterparty, 2).await.unwrap(), Some(AddressType::EoaHighNonce));
}

#[tokio::test]
async fn address_dropped_from_scam_list_is_reclassified() {
    let (mut c, _, _) = classifier();
    let target = addr(0x66);
    c.set_scam_addresses(vec![target]);
    assert_eq!(c.classify(target, Role::Counterparty, 1).await.unwrap(), Some(AddressType::ScamAddress));
    assert_eq!(c.cached(&target), Some(AddressType::ScamAddress));

    c.set_scam_addresses(Vec::new());
    assert_eq!(c.classify(target, Role::Counterparty, 2).await.unwrap(), Some(AddressType::EoaLowNonce));
}

#[tokio::test]
async fn rate_limited_creator_lookup_is_not_cached() {
    let (mut c, _, explorer) = classifier();
    let (contract, creator) = (addr(0x60), addr(0x61));
    explorer.set_creator(contract, creator);
    explorer.rate_limited.store(true, Ordering::SeqCst);

    assert_eq!(c.contract_creator(contract).await.unwrap(), None);
    assert_eq!(c.contract_creator(contract).await.unwrap(), None);
    assert_eq!(explorer.calls.load(Ordering::SeqCst), 2);

    explorer.rate_limited.store(false, Ordering::SeqCst);
    assert_eq!(c.contract_creator(contract).await.unwrap(), Some(creator));
    assert_eq!(c.contract_creator(contract).await.unwrap(), Some(creator));
    assert_eq!(explorer.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn ignored_mark_survives_until_cleared() {
    let (mut c, _, _) = classifier();
    let target = addr(0x40);
    c.classify(target, Role::Counterparty, 1).await.unwrap();
    c.set_ignored(target);

    assert_eq!(c.classify(target, Role::Counterparty, 2).await.unwrap(), Some(AddressType::IgnoredEoa));
    assert_eq!(c.clear_ignored(), 1);
    assert_eq!(c.cached(&target), Some(AddressType::EoaLowNonce));
}

#[test]
fn scam_domains_match_any_listed_address() {
    let (mut c, _, _) = classifier();
    let mut domains = BTreeMap::new();
    domains.insert("claim-airdrop.xyz".to_string(), vec![addr(1), addr(2)]);
    domains.insert("other.io".to_string(), vec![addr(3)]);
    c.set_scam_domains(domains);

    assert_eq!(c.scam_domains_for(&[addr(2)]), vec!["claim-airdrop.xyz".to_string()]);
    assert_eq!(c.scam_domains_for(&[addr(2), addr(3)]).len(), 2);
    assert!(c.scam_domains_for(&[addr(9)]).is_empty());
}
