/*!
 * Sentinel RPC
 *
 * Implementação de `ChainProvider` sobre um provider HTTP do ethers
 */

use async_trait::async_trait;
use ethereum_types::{Address, U256};
use ethers::abi::{AbiParser, Token};
use ethers::providers::{Http, Middleware, Provider};
use ethers::types::{transaction::eip2718::TypedTransaction, BlockId, BlockNumber, TransactionRequest, U64};
use lru::LruCache;
use parking_lot::Mutex;
use sentinel_core::{traits::ChainProvider, Error, Result};
use std::num::NonZeroUsize;
use std::time::Duration;
use tracing::debug;

/// Configuração do cliente RPC
#[derive(Debug, Clone)]
pub struct RpcConfig {
    pub endpoint: String,
    pub timeout: Duration,
    pub balance_cache_size: usize,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8545".to_string(),
            timeout: Duration::from_secs(10),
            balance_cache_size: 100_000,
        }
    }
}

/// Chave do cache de saldos: (token, conta, id ERC-1155, bloco)
type BalanceKey = (Address, Address, Option<U256>, u64);

/// Cliente RPC com cache de saldos por bloco.
///
/// Saldos consultados em um bloco fixo nunca mudam, então o cache não
/// precisa de expiração além do despejo LRU.
pub struct SentinelRpcClient {
    provider: Provider<Http>,
    balance_cache: Mutex<LruCache<BalanceKey, U256>>,
}

impl SentinelRpcClient {
    /// Cria um novo cliente HTTP
    pub fn new(config: RpcConfig) -> Result<Self> {
        let url = reqwest::Url::parse(&config.endpoint)
            .map_err(|e| Error::ConfigError(format!("Endpoint RPC inválido: {}", e)))?;
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::RpcError(format!("Falha ao criar cliente HTTP: {}", e)))?;
        let capacity = NonZeroUsize::new(config.balance_cache_size)
            .ok_or_else(|| Error::ConfigError("balance_cache_size deve ser maior que zero".into()))?;

        Ok(Self {
            provider: Provider::new(Http::new_with_client(url, client)),
            balance_cache: Mutex::new(LruCache::new(capacity)),
        })
    }

    /// Número de saldos em cache
    pub fn cached_balances(&self) -> usize {
        self.balance_cache.lock().len()
    }

    fn block_id(block: u64) -> BlockId {
        BlockId::Number(BlockNumber::Number(U64::from(block)))
    }

    async fn cached_balance(&self, key: BalanceKey, signature: &str, args: Vec<Token>) -> Result<U256> {
        if let Some(v) = self.balance_cache.lock().get(&key).copied() {
            return Ok(v);
        }

        let (token, account, _, block) = key;
        let function = AbiParser::default()
            .parse_function(signature)
            .map_err(|e| Error::DecodeError(format!("ABI inválida: {}", e)))?;
        let data = function
            .encode_input(&args)
            .map_err(|e| Error::DecodeError(format!("Falha ao codificar chamada: {}", e)))?;
        let tx: TypedTransaction = TransactionRequest::new().to(token).data(data).into();

        let out = self
            .provider
            .call(&tx, Some(Self::block_id(block)))
            .await
            .map_err(|e| Error::RpcError(format!("Falha ao consultar saldo: {}", e)))?;
        let balance = function
            .decode_output(&out[..])
            .map_err(|e| Error::DecodeError(format!("Resposta de saldo inválida: {}", e)))?
            .into_iter()
            .next()
            .and_then(Token::into_uint)
            .ok_or_else(|| Error::DecodeError("balanceOf sem retorno".into()))?;

        debug!(?token, ?account, block, %balance, "saldo consultado");
        self.balance_cache.lock().put(key, balance);
        Ok(balance)
    }
}

#[async_trait]
impl ChainProvider for SentinelRpcClient {
    async fn chain_id(&self) -> Result<u64> {
        let id = self
            .provider
            .get_chainid()
            .await
            .map_err(|e| Error::RpcError(format!("Falha ao obter chain id: {}", e)))?;
        Ok(id.as_u64())
    }

    async fn get_code(&self, address: Address) -> Result<Vec<u8>> {
        let code = self
            .provider
            .get_code(address, None)
            .await
            .map_err(|e| Error::RpcError(format!("Falha ao obter código do contrato: {}", e)))?;
        Ok(code.to_vec())
    }

    async fn get_transaction_count(&self, address: Address, block: u64) -> Result<U256> {
        self.provider
            .get_transaction_count(address, Some(Self::block_id(block)))
            .await
            .map_err(|e| Error::RpcError(format!("Falha ao obter nonce: {}", e)))
    }

    async fn balance_of(&self, token: Address, account: Address, block: u64) -> Result<U256> {
        self.cached_balance(
            (token, account, None, block),
            "balanceOf(address) view returns (uint256)",
            vec![Token::Address(account)],
        )
        .await
    }

    async fn balance_of_1155(&self, token: Address, account: Address, id: U256, block: u64) -> Result<U256> {
        self.cached_balance(
            (token, account, Some(id), block),
            "balanceOf(address,uint256) view returns (uint256)",
            vec![Token::Address(account), Token::Uint(id)],
        )
        .await
    }
}
