/*!
 * Sentinel Traits
 *
 * Traits comuns usados em toda a workspace Sentinel
 */

use async_trait::async_trait;
use crate::error::Result;
use ethereum_types::{Address, U256};

/// Trait para provedores de estado da chain
#[async_trait]
pub trait ChainProvider: Send + Sync {
    /// Identificador da chain (1 = mainnet, 137 = polygon, ...)
    async fn chain_id(&self) -> Result<u64>;

    /// Obtém o código de um endereço; vazio para EOAs
    async fn get_code(&self, address: Address) -> Result<Vec<u8>>;

    /// Obtém o nonce de um endereço no bloco informado
    async fn get_transaction_count(&self, address: Address, block: u64) -> Result<U256>;

    /// Saldo ERC-20 (ou ERC-721) de `account` em `token` no bloco informado
    async fn balance_of(&self, token: Address, account: Address, block: u64) -> Result<U256>;

    /// Saldo ERC-1155 de `account` para o id `id` no bloco informado
    async fn balance_of_1155(&self, token: Address, account: Address, id: U256, block: u64) -> Result<U256>;
}
