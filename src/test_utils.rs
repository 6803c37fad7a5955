//! Test utilities: deterministic mock collaborators
//!
//! Only compiled for tests or with the `test_utils` feature enabled.

#![cfg(any(test, feature = "test_utils"))]

use crate::external::{
    ChainClient, HolderInfo, LlmService, LlmStep, MarketOracle, PoolInfo, Quote, SwapOutcome,
    TokenData, WalletProfile, SOL_MINT,
};
use crate::types::{now_ms, Dex, LaunchEvent, MarketOutcome};
use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Keypair;
use std::collections::HashMap;

/// Scripted chain client. Everything is settable per token/wallet and
/// falls back to benign defaults, so tests only script what they assert.
#[derive(Default)]
pub struct MockChainClient {
    token_data: Mutex<HashMap<Pubkey, TokenData>>,
    holders: Mutex<HashMap<Pubkey, Vec<HolderInfo>>>,
    creators: Mutex<HashMap<Pubkey, Pubkey>>,
    profiles: Mutex<HashMap<Pubkey, WalletProfile>>,
    prices: Mutex<HashMap<Pubkey, f64>>,
    balances: Mutex<HashMap<Pubkey, f64>>,
    /// When set, `quote` returns `None` for these tokens
    no_route: Mutex<Vec<Pubkey>>,
}

impl MockChainClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_token_data(&self, data: TokenData) {
        self.token_data.lock().insert(data.token, data);
    }

    pub fn set_holders(&self, token: Pubkey, holders: Vec<HolderInfo>) {
        self.holders.lock().insert(token, holders);
    }

    pub fn set_creator(&self, token: Pubkey, creator: Pubkey) {
        self.creators.lock().insert(token, creator);
    }

    pub fn set_profile(&self, profile: WalletProfile) {
        self.profiles.lock().insert(profile.wallet, profile);
    }

    pub fn set_price(&self, token: Pubkey, price: f64) {
        self.prices.lock().insert(token, price);
    }

    pub fn set_balance(&self, wallet: Pubkey, sol: f64) {
        self.balances.lock().insert(wallet, sol);
    }

    pub fn remove_route(&self, token: Pubkey) {
        self.no_route.lock().push(token);
    }

    fn price_of(&self, token: &Pubkey) -> f64 {
        self.prices.lock().get(token).copied().unwrap_or(0.0001)
    }
}

#[async_trait]
impl ChainClient for MockChainClient {
    async fn token_data(&self, token: &Pubkey) -> Result<TokenData> {
        Ok(self
            .token_data
            .lock()
            .get(token)
            .cloned()
            .unwrap_or(TokenData {
                token: *token,
                name: Some("MOCK".to_string()),
                symbol: Some("MCK".to_string()),
                supply: 1_000_000_000.0,
                decimals: 6,
                mint_disabled: true,
                freeze_disabled: true,
                created_at_ms: now_ms() - 60_000,
                liquidity_sol: 10.0,
            }))
    }

    async fn holders(&self, token: &Pubkey) -> Result<Vec<HolderInfo>> {
        Ok(self.holders.lock().get(token).cloned().unwrap_or_default())
    }

    async fn lp_pool(&self, token: &Pubkey) -> Result<Option<PoolInfo>> {
        let data = self.token_data(token).await?;
        Ok(Some(PoolInfo {
            address: Pubkey::new_unique(),
            liquidity_sol: data.liquidity_sol,
        }))
    }

    async fn token_creator(&self, token: &Pubkey) -> Result<Pubkey> {
        Ok(self
            .creators
            .lock()
            .get(token)
            .copied()
            .unwrap_or_else(Pubkey::new_unique))
    }

    async fn profile_wallet(&self, wallet: &Pubkey) -> Result<WalletProfile> {
        Ok(self
            .profiles
            .lock()
            .get(wallet)
            .cloned()
            .unwrap_or(WalletProfile {
                wallet: *wallet,
                age_days: 30,
                token_count: 1,
                rug_count: 0,
                funded_by: None,
            }))
    }

    async fn balance(&self, wallet: &Pubkey) -> Result<f64> {
        Ok(self.balances.lock().get(wallet).copied().unwrap_or(10.0))
    }

    async fn quote(
        &self,
        input: &Pubkey,
        output: &Pubkey,
        amount: f64,
        slippage_bps: u16,
    ) -> Result<Option<Quote>> {
        let token = if *input == SOL_MINT { output } else { input };
        if self.no_route.lock().contains(token) {
            return Ok(None);
        }

        let price = self.price_of(token);
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
            signature: Some(format!("mock_{}", uuid::Uuid::new_v4())),
            error: None,
        })
    }
}

/// Oracle returning a fixed outcome per token
#[derive(Default)]
pub struct MockOracle {
    outcomes: Mutex<HashMap<Pubkey, MarketOutcome>>,
}

impl MockOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_outcome(&self, token: Pubkey, outcome: MarketOutcome) {
        self.outcomes.lock().insert(token, outcome);
    }
}

#[async_trait]
impl MarketOracle for MockOracle {
    async fn classify(&self, token: &Pubkey, _since_ms: i64) -> Result<MarketOutcome> {
        Ok(self
            .outcomes
            .lock()
            .get(token)
            .copied()
            .unwrap_or(MarketOutcome::Stable))
    }
}

/// LLM stub that always produces the same terminal thought
pub struct StubLlm {
    pub available: bool,
}

#[async_trait]
impl LlmService for StubLlm {
    fn is_available(&self) -> bool {
        self.available
    }

    async fn reason(&self, _prompt: &str, _tools: &[String]) -> Result<LlmStep> {
        Ok(LlmStep {
            thought: "nothing further to do".to_string(),
            action: None,
            confidence: 0.7,
        })
    }
}

/// Launch event builder with sane defaults
pub fn launch_event(dex: Dex, liquidity_sol: Option<f64>) -> LaunchEvent {
    LaunchEvent {
        token: Pubkey::new_unique(),
        creator: Pubkey::new_unique(),
        slot: 1_000,
        timestamp_ms: now_ms(),
        dex,
        pool_address: Pubkey::new_unique(),
        liquidity_sol,
        token_name: Some("Test Token".to_string()),
        token_symbol: Some("TT".to_string()),
        graduated_from: None,
        bonding_curve_time_ms: None,
    }
}

/// Holder distribution with a dominant top wallet and a coordinated
/// bundle, the classic rug shape used across tests
pub fn rug_shaped_holders(top_percent: f64, bundle_percent_each: f64, bundle_size: usize) -> Vec<HolderInfo> {
    let mut holders = vec![
        HolderInfo {
            wallet: Pubkey::new_unique(),
            percent: 20.0,
            is_lp: true,
        },
        HolderInfo {
            wallet: Pubkey::new_unique(),
            percent: top_percent,
            is_lp: false,
        },
    ];
    for _ in 0..bundle_size {
        holders.push(HolderInfo {
            wallet: Pubkey::new_unique(),
            percent: bundle_percent_each,
            is_lp: false,
        });
    }
    holders.push(HolderInfo {
        wallet: Pubkey::new_unique(),
        percent: 0.3,
        is_lp: false,
    });
    holders
}
