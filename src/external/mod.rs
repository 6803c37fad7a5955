//! Interfaces of external collaborators consumed by the core.
//!
//! The runtime coordinates agents; it never decodes chain accounts, signs
//! transactions or runs a model itself. Everything of that shape lives
//! behind the traits here and is injected on construction.

pub mod dashboard;
pub mod store;

use crate::types::MarketOutcome;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Keypair;

/// Wrapped SOL mint, the quote side of every swap
pub const SOL_MINT: Pubkey = solana_sdk::pubkey!("So11111111111111111111111111111111111111112");

/// Token metadata snapshot supplied by the RPC collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenData {
    pub token: Pubkey,
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub supply: f64,
    pub decimals: u8,
    pub mint_disabled: bool,
    pub freeze_disabled: bool,
    pub created_at_ms: i64,
    pub liquidity_sol: f64,
}

/// Single holder row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HolderInfo {
    pub wallet: Pubkey,
    /// Share of supply in percent (0-100)
    pub percent: f64,
    /// Liquidity-pool accounts are excluded from concentration analyses
    pub is_lp: bool,
}

/// Pool summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolInfo {
    pub address: Pubkey,
    pub liquidity_sol: f64,
}

/// Wallet history profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletProfile {
    pub wallet: Pubkey,
    pub age_days: u32,
    pub token_count: u32,
    /// Tokens this wallet created that later rugged
    pub rug_count: u32,
    pub funded_by: Option<Pubkey>,
}

/// Swap quote
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub input: Pubkey,
    pub output: Pubkey,
    pub in_amount: f64,
    pub out_amount: f64,
    /// Output-per-input price implied by the quote
    pub price: f64,
    pub slippage_bps: u16,
}

/// Result of a submitted (or simulated) swap
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapOutcome {
    pub success: bool,
    pub signature: Option<String>,
    pub error: Option<String>,
}

/// Chain RPC collaborator. Supplies token metadata, holders, pools, quotes
/// and signed-transaction submission.
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn token_data(&self, token: &Pubkey) -> Result<TokenData>;

    async fn holders(&self, token: &Pubkey) -> Result<Vec<HolderInfo>>;

    async fn lp_pool(&self, token: &Pubkey) -> Result<Option<PoolInfo>>;

    async fn token_creator(&self, token: &Pubkey) -> Result<Pubkey>;

    async fn profile_wallet(&self, wallet: &Pubkey) -> Result<WalletProfile>;

    /// SOL balance of a wallet
    async fn balance(&self, wallet: &Pubkey) -> Result<f64>;

    /// Quote a swap. `None` when no route exists.
    async fn quote(
        &self,
        input: &Pubkey,
        output: &Pubkey,
        amount: f64,
        slippage_bps: u16,
    ) -> Result<Option<Quote>>;

    /// Sign and submit a swap built from `quote`
    async fn execute_swap(
        &self,
        quote: &Quote,
        owner: &Pubkey,
        signer: Option<&Keypair>,
    ) -> Result<SwapOutcome>;
}

/// Price feed registration surface. The feed pushes [`crate::types::PriceUpdate`]s
/// onto the bus (`price.update`); the trader registers interest per pool
/// through the two lifecycle callbacks it is constructed with.
pub trait PriceStream: Send + Sync {
    fn watch(&self, pool_address: Pubkey, token: Pubkey);
    fn unwatch(&self, pool_address: &Pubkey);
}

/// One reasoning step produced by the LLM collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmStep {
    pub thought: String,
    pub action: Option<LlmAction>,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmAction {
    pub tool: String,
    pub input: serde_json::Value,
}

/// Optional natural-language reasoning engine
#[async_trait]
pub trait LlmService: Send + Sync {
    fn is_available(&self) -> bool;

    /// One ReAct step over the prompt; `tools` lists invocable tool names
    async fn reason(&self, prompt: &str, tools: &[String]) -> Result<LlmStep>;
}

/// Market oracle used by the outcome checker to classify aged predictions
#[async_trait]
pub trait MarketOracle: Send + Sync {
    async fn classify(&self, token: &Pubkey, since_ms: i64) -> Result<MarketOutcome>;
}

/// Deterministic stand-in chain client for simulation runs.
///
/// No network, no decoding: quotes derive a stable pseudo-price from the
/// token address so repeated runs behave identically. Production wiring
/// replaces this with a real RPC-backed implementation of [`ChainClient`].
pub struct SimulatedChainClient;

impl SimulatedChainClient {
    pub fn new() -> Self {
        Self
    }

    fn pseudo_price(token: &Pubkey) -> f64 {
        // Stable in (0, 0.001], derived from the first address bytes
        let bytes = token.to_bytes();
        let seed = u16::from_le_bytes([bytes[0], bytes[1]]) as f64;
        (seed + 1.0) / 65_536.0 * 0.001
    }
}

impl Default for SimulatedChainClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChainClient for SimulatedChainClient {
    async fn token_data(&self, token: &Pubkey) -> Result<TokenData> {
        Ok(TokenData {
            token: *token,
            name: None,
            symbol: None,
            supply: 1_000_000_000.0,
            decimals: 6,
            mint_disabled: true,
            freeze_disabled: true,
            created_at_ms: crate::types::now_ms(),
            liquidity_sol: 10.0,
        })
    }

    async fn holders(&self, _token: &Pubkey) -> Result<Vec<HolderInfo>> {
        Ok(Vec::new())
    }

    async fn lp_pool(&self, _token: &Pubkey) -> Result<Option<PoolInfo>> {
        Ok(None)
    }

    async fn token_creator(&self, _token: &Pubkey) -> Result<Pubkey> {
        Ok(Pubkey::new_unique())
    }

    async fn profile_wallet(&self, wallet: &Pubkey) -> Result<WalletProfile> {
        Ok(WalletProfile {
            wallet: *wallet,
            age_days: 30,
            token_count: 1,
            rug_count: 0,
            funded_by: None,
        })
    }

    async fn balance(&self, _wallet: &Pubkey) -> Result<f64> {
        Ok(10.0)
    }

    async fn quote(
        &self,
        input: &Pubkey,
        output: &Pubkey,
        amount: f64,
        slippage_bps: u16,
    ) -> Result<Option<Quote>> {
        let token = if *input == SOL_MINT { output } else { input };
        let price = Self::pseudo_price(token);
        let out_amount = if *input == SOL_MINT {
            amount / price
        } else {
            amount * price
        };
        Ok(Some(Quote {
            input: *input,
            output: *output,
            in_amount: amount,
            out_amount,
            price,
            slippage_bps,
        }))
    }

    async fn execute_swap(
        &self,
        _quote: &Quote,
        _owner: &Pubkey,
        _signer: Option<&Keypair>,
    ) -> Result<SwapOutcome> {
        Ok(SwapOutcome {
            success: true,
            signature: Some(format!("sim_{}", uuid::Uuid::new_v4())),
            error: None,
        })
    }
}
