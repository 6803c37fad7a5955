//! Persistence store for positions, predictions, outcomes and learning state
//!
//! The in-memory maps stay the source of truth for live operation; the
//! store exists for recovery. Callers log store failures and continue.

use crate::errors::StoreError;
use crate::types::{
    ExitReason, MarketOutcome, Position, PositionStatus, Prediction, ScammerProfile,
};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::path::Path;

/// Aggregate counts for diagnostics
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct StoreStats {
    pub positions: usize,
    pub active_positions: usize,
    pub predictions: usize,
    pub scammer_profiles: usize,
}

/// Persisted state surface the coordinator and trader write through.
///
/// Every record is keyed by its natural id; positions carry a secondary
/// `pool_address` index for active lookups. Timestamps are epoch millis.
pub trait PositionStore: Send + Sync {
    fn create(&self, position: &Position) -> Result<(), StoreError>;

    fn get_by_id(&self, id: &str) -> Result<Option<Position>, StoreError>;

    fn get_by_pool(&self, pool_address: &Pubkey) -> Result<Option<Position>, StoreError>;

    fn get_active(&self) -> Result<Vec<Position>, StoreError>;

    fn update_price(
        &self,
        id: &str,
        price: f64,
        pnl: f64,
        pnl_percent: f64,
    ) -> Result<(), StoreError>;

    fn close(
        &self,
        id: &str,
        status: PositionStatus,
        exit_reason: ExitReason,
        exit_time_ms: i64,
        exit_price: f64,
    ) -> Result<(), StoreError>;

    fn has_active_position(&self, token: &Pubkey) -> Result<bool, StoreError>;

    fn stats(&self) -> Result<StoreStats, StoreError>;

    fn save_prediction(&self, prediction: &Prediction) -> Result<(), StoreError>;

    /// Predictions without an outcome, predicted at or before `cutoff_ms`
    fn pending_predictions(&self, cutoff_ms: i64) -> Result<Vec<Prediction>, StoreError>;

    fn record_outcome(
        &self,
        token: &Pubkey,
        outcome: MarketOutcome,
        checked_at_ms: i64,
    ) -> Result<(), StoreError>;

    fn save_learning_state(&self, weights: &serde_json::Value) -> Result<(), StoreError>;

    fn load_learning_state(&self) -> Result<Option<serde_json::Value>, StoreError>;

    fn save_scammer_profile(&self, profile: &ScammerProfile) -> Result<(), StoreError>;

    fn load_scammer_profiles(&self) -> Result<Vec<ScammerProfile>, StoreError>;
}

const TREE_POSITIONS: &str = "positions";
const TREE_POOL_INDEX: &str = "pool_index";
const TREE_PREDICTIONS: &str = "predictions";
const TREE_OUTCOMES: &str = "outcomes";
const TREE_LEARNING: &str = "learning";
const TREE_SCAMMERS: &str = "scammers";

const LEARNING_WEIGHTS_KEY: &[u8] = b"weights";

/// Sled-backed implementation of [`PositionStore`]
pub struct SledStore {
    positions: sled::Tree,
    pool_index: sled::Tree,
    predictions: sled::Tree,
    outcomes: sled::Tree,
    learning: sled::Tree,
    scammers: sled::Tree,
    _db: sled::Db,
}

impl SledStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db = sled::open(path)?;
        Ok(Self {
            positions: db.open_tree(TREE_POSITIONS)?,
            pool_index: db.open_tree(TREE_POOL_INDEX)?,
            predictions: db.open_tree(TREE_PREDICTIONS)?,
            outcomes: db.open_tree(TREE_OUTCOMES)?,
            learning: db.open_tree(TREE_LEARNING)?,
            scammers: db.open_tree(TREE_SCAMMERS)?,
            _db: db,
        })
    }

    fn load_position(&self, id: &str) -> Result<Option<Position>, StoreError> {
        match self.positions.get(id.as_bytes())? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    fn save_position(&self, position: &Position) -> Result<(), StoreError> {
        let bytes = bincode::serialize(position)?;
        self.positions.insert(position.id.as_bytes(), bytes)?;
        Ok(())
    }
}

impl PositionStore for SledStore {
    fn create(&self, position: &Position) -> Result<(), StoreError> {
        self.save_position(position)?;
        self.pool_index.insert(
            position.pool_address.to_bytes().to_vec(),
            position.id.as_bytes(),
        )?;
        Ok(())
    }

    fn get_by_id(&self, id: &str) -> Result<Option<Position>, StoreError> {
        self.load_position(id)
    }

    fn get_by_pool(&self, pool_address: &Pubkey) -> Result<Option<Position>, StoreError> {
        match self.pool_index.get(pool_address.to_bytes())? {
            Some(id_bytes) => {
                let id = String::from_utf8_lossy(&id_bytes).to_string();
                self.load_position(&id)
            }
            None => Ok(None),
        }
    }

    fn get_active(&self) -> Result<Vec<Position>, StoreError> {
        let mut active = Vec::new();
        for entry in self.positions.iter() {
            let (_, bytes) = entry?;
            let position: Position = bincode::deserialize(&bytes)?;
            if position.status == PositionStatus::Active {
                active.push(position);
            }
        }
        Ok(active)
    }

    fn update_price(
        &self,
        id: &str,
        price: f64,
        pnl: f64,
        pnl_percent: f64,
    ) -> Result<(), StoreError> {
        let mut position = self
            .load_position(id)?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        position.current_price = price;
        position.pnl = pnl;
        position.pnl_percent = pnl_percent;
        self.save_position(&position)
    }

    fn close(
        &self,
        id: &str,
        status: PositionStatus,
        exit_reason: ExitReason,
        exit_time_ms: i64,
        exit_price: f64,
    ) -> Result<(), StoreError> {
        let mut position = self
            .load_position(id)?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        position.status = status;
        position.exit_reason = Some(exit_reason);
        position.exit_time_ms = Some(exit_time_ms);
        position.current_price = exit_price;
        position.refresh_pnl();
        self.save_position(&position)?;
        self.pool_index.remove(position.pool_address.to_bytes())?;
        Ok(())
    }

    fn has_active_position(&self, token: &Pubkey) -> Result<bool, StoreError> {
        for entry in self.positions.iter() {
            let (_, bytes) = entry?;
            let position: Position = bincode::deserialize(&bytes)?;
            if position.status == PositionStatus::Active && position.token == *token {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn stats(&self) -> Result<StoreStats, StoreError> {
        Ok(StoreStats {
            positions: self.positions.len(),
            active_positions: self.get_active()?.len(),
            predictions: self.predictions.len(),
            scammer_profiles: self.scammers.len(),
        })
    }

    fn save_prediction(&self, prediction: &Prediction) -> Result<(), StoreError> {
        let bytes = bincode::serialize(prediction)?;
        self.predictions
            .insert(prediction.token.to_bytes().to_vec(), bytes)?;
        Ok(())
    }

    fn pending_predictions(&self, cutoff_ms: i64) -> Result<Vec<Prediction>, StoreError> {
        let mut pending = Vec::new();
        for entry in self.predictions.iter() {
            let (_, bytes) = entry?;
            let prediction: Prediction = bincode::deserialize(&bytes)?;
            if prediction.outcome.is_none() && prediction.predicted_at_ms <= cutoff_ms {
                pending.push(prediction);
            }
        }
        Ok(pending)
    }

    fn record_outcome(
        &self,
        token: &Pubkey,
        outcome: MarketOutcome,
        checked_at_ms: i64,
    ) -> Result<(), StoreError> {
        let key = token.to_bytes().to_vec();
        let mut prediction: Prediction = match self.predictions.get(&key)? {
            Some(bytes) => bincode::deserialize(&bytes)?,
            None => return Err(StoreError::NotFound(token.to_string())),
        };
        prediction.outcome = Some(outcome);
        prediction.checked_at_ms = Some(checked_at_ms);
        let bytes = bincode::serialize(&prediction)?;
        self.predictions.insert(key.clone(), bytes.clone())?;
        self.outcomes.insert(key, bytes)?;
        Ok(())
    }

    fn save_learning_state(&self, weights: &serde_json::Value) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(weights)?;
        self.learning.insert(LEARNING_WEIGHTS_KEY, bytes)?;
        Ok(())
    }

    fn load_learning_state(&self) -> Result<Option<serde_json::Value>, StoreError> {
        match self.learning.get(LEARNING_WEIGHTS_KEY)? {
            Some(bytes) => Ok(serde_json::from_slice(&bytes).ok()),
            None => Ok(None),
        }
    }

    fn save_scammer_profile(&self, profile: &ScammerProfile) -> Result<(), StoreError> {
        let bytes = bincode::serialize(profile)?;
        self.scammers
            .insert(profile.wallet.to_bytes().to_vec(), bytes)?;
        Ok(())
    }

    fn load_scammer_profiles(&self) -> Result<Vec<ScammerProfile>, StoreError> {
        let mut profiles = Vec::new();
        for entry in self.scammers.iter() {
            let (_, bytes) = entry?;
            profiles.push(bincode::deserialize(&bytes)?);
        }
        Ok(profiles)
    }
}
