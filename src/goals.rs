//! Per-agent goal metrics with on-track bands and weighted overall progress
//!
//! The tracker is coordinator-owned and passed into agents on construction;
//! state is guarded per call, agents only ever touch their own entries.

use crate::types::now_ms;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// Goal class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GoalType {
    Primary,
    Secondary,
    Constraint,
}

/// Which way the metric is optimized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Maximize,
    Minimize,
    Target,
}

const EPSILON: f64 = 1e-9;

/// Single tracked goal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goal {
    pub id: String,
    pub goal_type: GoalType,
    pub metric: String,
    pub target: f64,
    pub current: f64,
    pub weight: f64,
    pub direction: Direction,
}

impl Goal {
    /// Within 10% of target in the direction of optimisation
    pub fn on_track(&self) -> bool {
        match self.direction {
            Direction::Maximize => self.current >= self.target * 0.9,
            Direction::Minimize => self.current <= self.target * 1.1,
            Direction::Target => (self.current - self.target).abs() <= self.target.abs() * 0.1,
        }
    }

    /// Direction-appropriate progress ratio, clamped to `[0, 1]`
    pub fn progress(&self) -> f64 {
        let raw = match self.direction {
            Direction::Maximize => {
                if self.target.abs() < EPSILON {
                    1.0
                } else {
                    self.current / self.target
                }
            }
            Direction::Minimize => self.target / self.current.max(EPSILON),
            Direction::Target => {
                if self.target.abs() < EPSILON {
                    if self.current.abs() < EPSILON {
                        1.0
                    } else {
                        0.0
                    }
                } else {
                    1.0 - (self.current - self.target).abs() / self.target.abs()
                }
            }
        };
        raw.clamp(0.0, 1.0)
    }
}

/// Returned by [`GoalTracker::update`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GoalProgress {
    pub value: f64,
    pub delta: f64,
    pub on_track: bool,
}

/// Per-agent roll-up returned by [`GoalTracker::summary`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GoalSummary {
    /// Weight-normalised mean of per-goal progress, in `[0, 1]`
    pub progress: f64,
    /// Goals currently on track
    pub on_track: usize,
    pub total: usize,
}

/// Per-goal history point cap
pub const HISTORY_CAP: usize = 1000;

#[derive(Default)]
struct AgentGoals {
    goals: HashMap<String, Goal>,
    history: HashMap<String, VecDeque<(i64, f64)>>,
    overall: f64,
}

impl AgentGoals {
    fn recompute_overall(&mut self) {
        let mut weighted = 0.0;
        let mut total_weight = 0.0;
        for goal in self.goals.values() {
            weighted += goal.progress() * goal.weight;
            total_weight += goal.weight;
        }
        self.overall = if total_weight > EPSILON {
            (weighted / total_weight).clamp(0.0, 1.0)
        } else {
            0.0
        };
    }
}

/// Tracks metric targets for every agent in the system
pub struct GoalTracker {
    agents: Mutex<HashMap<String, AgentGoals>>,
}

impl GoalTracker {
    pub fn new() -> Self {
        Self {
            agents: Mutex::new(HashMap::new()),
        }
    }

    /// Register (or replace) a goal for an agent
    pub fn register(&self, agent: &str, goal: Goal) {
        let mut agents = self.agents.lock();
        let entry = agents.entry(agent.to_string()).or_default();
        entry.goals.insert(goal.id.clone(), goal);
        entry.recompute_overall();
    }

    /// Update a goal's current value. Returns `None` for unknown goals.
    pub fn update(&self, agent: &str, goal_id: &str, value: f64) -> Option<GoalProgress> {
        let mut agents = self.agents.lock();
        let entry = agents.get_mut(agent)?;
        let goal = entry.goals.get_mut(goal_id)?;

        let delta = value - goal.current;
        goal.current = value;
        let on_track = goal.on_track();

        let history = entry.history.entry(goal_id.to_string()).or_default();
        if history.len() >= HISTORY_CAP {
            history.pop_front();
        }
        history.push_back((now_ms(), value));

        entry.recompute_overall();

        Some(GoalProgress {
            value,
            delta,
            on_track,
        })
    }

    /// Weighted overall progress for one agent, `[0, 1]`
    pub fn overall_progress(&self, agent: &str) -> f64 {
        self.agents
            .lock()
            .get(agent)
            .map(|a| a.overall)
            .unwrap_or(0.0)
    }

    /// History points recorded for one goal
    pub fn history(&self, agent: &str, goal_id: &str) -> Vec<(i64, f64)> {
        self.agents
            .lock()
            .get(agent)
            .and_then(|a| a.history.get(goal_id))
            .map(|h| h.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Roll-up per agent
    pub fn summary(&self) -> HashMap<String, GoalSummary> {
        let agents = self.agents.lock();
        agents
            .iter()
            .map(|(name, entry)| {
                let on_track = entry.goals.values().filter(|g| g.on_track()).count();
                (
                    name.clone(),
                    GoalSummary {
                        progress: entry.overall,
                        on_track,
                        total: entry.goals.len(),
                    },
                )
            })
            .collect()
    }
}

impl Default for GoalTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn goal(id: &str, direction: Direction, target: f64, weight: f64) -> Goal {
        Goal {
            id: id.to_string(),
            goal_type: GoalType::Primary,
            metric: id.to_string(),
            target,
            current: 0.0,
            weight,
            direction,
        }
    }

    #[test]
    fn test_maximize_on_track_band() {
        let mut g = goal("win_rate", Direction::Maximize, 0.6, 1.0);
        g.current = 0.54; // exactly target * 0.9
        assert!(g.on_track());
        g.current = 0.53;
        assert!(!g.on_track());
    }

    #[test]
    fn test_minimize_on_track_band() {
        let mut g = goal("loss", Direction::Minimize, 10.0, 1.0);
        g.current = 11.0; // exactly target * 1.1
        assert!(g.on_track());
        g.current = 11.5;
        assert!(!g.on_track());
    }

    #[test]
    fn test_target_on_track_band() {
        let mut g = goal("exposure", Direction::Target, 100.0, 1.0);
        g.current = 109.0;
        assert!(g.on_track());
        g.current = 111.0;
        assert!(!g.on_track());
        g.current = 91.0;
        assert!(g.on_track());
    }

    #[test]
    fn test_progress_clamped() {
        let mut g = goal("win_rate", Direction::Maximize, 0.5, 1.0);
        g.current = 2.0; // 400% of target
        assert_eq!(g.progress(), 1.0);
        g.current = -1.0;
        assert_eq!(g.progress(), 0.0);

        let mut g = goal("loss", Direction::Minimize, 10.0, 1.0);
        g.current = 0.0; // no loss at all, better than target
        assert_eq!(g.progress(), 1.0);
    }

    #[test]
    fn test_update_returns_delta_and_track() {
        let tracker = GoalTracker::new();
        tracker.register("trader-1", goal("win_rate", Direction::Maximize, 0.6, 1.0));

        let p1 = tracker.update("trader-1", "win_rate", 0.3).unwrap();
        assert_eq!(p1.value, 0.3);
        assert_eq!(p1.delta, 0.3);
        assert!(!p1.on_track);

        let p2 = tracker.update("trader-1", "win_rate", 0.58).unwrap();
        assert!((p2.delta - 0.28).abs() < 1e-12);
        assert!(p2.on_track);

        assert!(tracker.update("trader-1", "missing", 1.0).is_none());
        assert!(tracker.update("nobody", "win_rate", 1.0).is_none());
    }

    #[test]
    fn test_weighted_overall_progress() {
        let tracker = GoalTracker::new();
        tracker.register("scout-1", goal("scans", Direction::Maximize, 100.0, 3.0));
        tracker.register("scout-1", goal("misses", Direction::Minimize, 10.0, 1.0));

        tracker.update("scout-1", "scans", 50.0); // progress 0.5, weight 3
        tracker.update("scout-1", "misses", 10.0); // progress 1.0, weight 1

        let overall = tracker.overall_progress("scout-1");
        assert!((overall - (0.5 * 3.0 + 1.0) / 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_history_capped() {
        let tracker = GoalTracker::new();
        tracker.register("a", goal("g", Direction::Maximize, 1.0, 1.0));
        for n in 0..(HISTORY_CAP + 20) {
            tracker.update("a", "g", n as f64);
        }
        let history = tracker.history("a", "g");
        assert_eq!(history.len(), HISTORY_CAP);
        assert_eq!(history.last().unwrap().1, (HISTORY_CAP + 19) as f64);
    }

    #[test]
    fn test_summary_rollup() {
        let tracker = GoalTracker::new();
        tracker.register("a", goal("g1", Direction::Maximize, 1.0, 1.0));
        tracker.register("a", goal("g2", Direction::Minimize, 5.0, 1.0));
        tracker.update("a", "g1", 1.0);
        tracker.update("a", "g2", 100.0);

        let summary = tracker.summary();
        let a = summary.get("a").unwrap();
        assert_eq!(a.total, 2);
        assert_eq!(a.on_track, 1);
        assert!(a.progress > 0.0 && a.progress < 1.0);
    }
}
