use std::collections::BTreeMap;

use blockfall_engine::StateKey;
use rand::{Rng, seq::IndexedRandom as _};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{KeyValueStore, StoreError};

/// Store key the Q-table is saved under.
pub const STORE_KEY: &str = "blockfall-q-table";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QLearningParams {
    pub learning_rate: f32,
    pub discount_factor: f32,
    pub exploration_rate: f32,
}

impl Default for QLearningParams {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            discount_factor: 0.9,
            exploration_rate: 0.1,
        }
    }
}

impl QLearningParams {
    fn is_valid(&self) -> bool {
        [self.learning_rate, self.discount_factor, self.exploration_rate]
            .iter()
            .all(|v| (0.0..=1.0).contains(v))
    }
}

/// Multiplicative decay of the exploration rate, applied once per episode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecayParams {
    pub factor: f32,
    pub floor: f32,
}

impl Default for DecayParams {
    fn default() -> Self {
        Self {
            factor: 0.995,
            floor: 0.01,
        }
    }
}

#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum PersistError {
    #[display("failed to encode Q-table: {_0}")]
    Encode(serde_json::Error),
    #[display("failed to write Q-table: {_0}")]
    Store(StoreError),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snapshot {
    action_count: usize,
    entries: Vec<(StateKey, Vec<f32>)>,
    learning_rate: f32,
    discount_factor: f32,
    exploration_rate: f32,
}

/// Tabular one-step Q-learning over integer state keys and action indices.
///
/// Every state owns a vector of Q-values indexed by action. Vectors are created lazily,
/// zero-filled and sized to the fixed action count of the board.
///
/// # Example
///
/// ```
/// use blockfall_agent::{DecayParams, QLearning, QLearningParams};
/// use blockfall_engine::StateKey;
///
/// let mut agent = QLearning::new(8, QLearningParams::default(), DecayParams::default());
/// let (s1, s2) = (StateKey::from_bits(1), StateKey::from_bits(2));
/// agent.update(s1, 3, 1.0, s2, &[]);
///
/// assert!((agent.q_value(s1, 3) - 0.1).abs() < 1e-6);
/// assert_eq!(agent.best_action(s1, &[0, 3, 5]), Some(3));
/// ```
#[derive(Debug, Clone)]
pub struct QLearning {
    table: BTreeMap<StateKey, Vec<f32>>,
    params: QLearningParams,
    decay: DecayParams,
    action_count: usize,
}

impl QLearning {
    #[must_use]
    pub fn new(action_count: usize, params: QLearningParams, decay: DecayParams) -> Self {
        Self {
            table: BTreeMap::new(),
            params,
            decay,
            action_count,
        }
    }

    #[must_use]
    pub fn params(&self) -> &QLearningParams {
        &self.params
    }

    #[must_use]
    pub fn exploration_rate(&self) -> f32 {
        self.params.exploration_rate
    }

    pub fn set_exploration_rate(&mut self, rate: f32) {
        self.params.exploration_rate = rate;
    }

    #[must_use]
    pub fn action_count(&self) -> usize {
        self.action_count
    }

    /// Number of states seen so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Q-value of `action` in `state`, zero when never visited.
    #[must_use]
    pub fn q_value(&self, state: StateKey, action: usize) -> f32 {
        self.table
            .get(&state)
            .and_then(|values| values.get(action))
            .copied()
            .unwrap_or(0.0)
    }

    /// Q-values of `state`, created on first use.
    ///
    /// The vector is long enough to index every action in `available`.
    pub fn q_values(&mut self, state: StateKey, available: &[usize]) -> &mut Vec<f32> {
        let needed = available
            .iter()
            .map(|&a| a + 1)
            .max()
            .unwrap_or(0)
            .max(self.action_count);
        let values = self.table.entry(state).or_default();
        if values.len() < needed {
            values.resize(needed, 0.0);
        }
        values
    }

    /// Greedy choice among `available`; ties go to the earliest entry.
    pub fn best_action(&mut self, state: StateKey, available: &[usize]) -> Option<usize> {
        let (&first, rest) = available.split_first()?;
        let values = self.q_values(state, available);
        let mut best = first;
        for &action in rest {
            if values[action] > values[best] {
                best = action;
            }
        }
        Some(best)
    }

    /// Epsilon-greedy choice among `available`, `None` when it is empty.
    pub fn select_action<R>(
        &mut self,
        state: StateKey,
        available: &[usize],
        rng: &mut R,
    ) -> Option<usize>
    where
        R: Rng + ?Sized,
    {
        if available.is_empty() {
            return None;
        }
        if rng.random::<f32>() < self.params.exploration_rate {
            return available.choose(rng).copied();
        }
        self.best_action(state, available)
    }

    /// One-step temporal-difference update of `Q(state, action)`.
    ///
    /// `next_available` lists the actions of `next_state`; an empty list marks a terminal
    /// transition, whose future value is zero.
    pub fn update(
        &mut self,
        state: StateKey,
        action: usize,
        reward: f32,
        next_state: StateKey,
        next_available: &[usize],
    ) {
        let max_next = if next_available.is_empty() {
            0.0
        } else {
            let next = self.q_values(next_state, next_available);
            next_available
                .iter()
                .map(|&a| next[a])
                .fold(f32::NEG_INFINITY, f32::max)
        };
        let QLearningParams {
            learning_rate,
            discount_factor,
            ..
        } = self.params;
        let values = self.q_values(state, &[action]);
        let current = values[action];
        values[action] = current + learning_rate * (reward + discount_factor * max_next - current);
    }

    /// Decays the exploration rate, never going below the floor, and returns it.
    pub fn decay(&mut self) -> f32 {
        let rate = (self.params.exploration_rate * self.decay.factor).max(self.decay.floor);
        self.params.exploration_rate = rate;
        rate
    }

    /// Writes the table and parameters to `store` under [`STORE_KEY`].
    pub fn save<S>(&self, store: &mut S) -> Result<(), PersistError>
    where
        S: KeyValueStore + ?Sized,
    {
        let snapshot = Snapshot {
            action_count: self.action_count,
            entries: self
                .table
                .iter()
                .map(|(&key, values)| (key, values.clone()))
                .collect(),
            learning_rate: self.params.learning_rate,
            discount_factor: self.params.discount_factor,
            exploration_rate: self.params.exploration_rate,
        };
        let blob = serde_json::to_string(&snapshot)?;
        store.set(STORE_KEY, &blob)?;
        debug!(states = self.table.len(), "saved Q-table");
        Ok(())
    }

    /// Replaces the table and parameters with the ones saved in `store`.
    ///
    /// Returns `false` and leaves `self` untouched when nothing usable is stored,
    /// including a table saved for a different action count.
    pub fn load<S>(&mut self, store: &S) -> bool
    where
        S: KeyValueStore + ?Sized,
    {
        let blob = match store.get(STORE_KEY) {
            Ok(Some(blob)) => blob,
            Ok(None) => {
                debug!("no saved Q-table");
                return false;
            }
            Err(e) => {
                warn!("cannot read saved Q-table: {e}");
                return false;
            }
        };
        let snapshot: Snapshot = match serde_json::from_str(&blob) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("ignoring malformed Q-table: {e}");
                return false;
            }
        };
        let params = QLearningParams {
            learning_rate: snapshot.learning_rate,
            discount_factor: snapshot.discount_factor,
            exploration_rate: snapshot.exploration_rate,
        };
        if !params.is_valid() {
            warn!(?params, "ignoring Q-table with out of range parameters");
            return false;
        }
        let short = snapshot
            .entries
            .iter()
            .any(|(_, values)| values.len() < self.action_count);
        if snapshot.action_count != self.action_count || short {
            warn!(
                saved = snapshot.action_count,
                expected = self.action_count,
                "ignoring Q-table saved for another action count"
            );
            return false;
        }
        self.table = snapshot.entries.into_iter().collect();
        self.params = params;
        debug!(states = self.table.len(), "loaded Q-table");
        true
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;
    use rand_pcg::Pcg32;

    use super::*;
    use crate::MemoryStore;

    const S1: StateKey = StateKey::from_bits(1);
    const S2: StateKey = StateKey::from_bits(2);

    fn agent(exploration_rate: f32) -> QLearning {
        QLearning::new(
            4,
            QLearningParams {
                exploration_rate,
                ..QLearningParams::default()
            },
            DecayParams::default(),
        )
    }

    #[test]
    fn test_q_values_start_at_zero() {
        let mut agent = agent(0.0);
        assert_eq!(agent.q_values(S1, &[0, 2]), &vec![0.0; 4]);
        assert_eq!(agent.len(), 1);
    }

    #[test]
    fn test_q_values_grow_for_large_actions() {
        let mut agent = agent(0.0);
        assert_eq!(agent.q_values(S1, &[6]).len(), 7);
        assert_eq!(agent.q_values(S1, &[1]).len(), 7);
    }

    #[test]
    fn test_terminal_update() {
        let mut agent = agent(0.0);
        agent.update(S1, 0, 1.0, S2, &[]);
        assert!((agent.q_value(S1, 0) - 0.1).abs() < 1e-6);
        // A terminal transition does not create the next state.
        assert_eq!(agent.len(), 1);
    }

    #[test]
    fn test_terminal_update_ignores_discount() {
        for discount_factor in [0.0, 0.5, 1.0] {
            let mut agent = QLearning::new(
                4,
                QLearningParams {
                    learning_rate: 0.5,
                    discount_factor,
                    exploration_rate: 0.0,
                },
                DecayParams::default(),
            );
            agent.q_values(S1, &[])[2] = 0.4;
            agent.q_values(S2, &[])[0] = 10.0;
            agent.update(S1, 2, 1.0, S2, &[]);
            // 0.4 + 0.5 * (1.0 - 0.4)
            assert!(
                (agent.q_value(S1, 2) - 0.7).abs() < 1e-6,
                "gamma {discount_factor}"
            );
        }
    }

    #[test]
    fn test_update_bootstraps_from_next_state() {
        let mut agent = agent(0.0);
        agent.q_values(S2, &[0, 1])[1] = 2.0;
        agent.update(S1, 3, 0.5, S2, &[0, 1]);
        // 0.1 * (0.5 + 0.9 * 2.0)
        assert!((agent.q_value(S1, 3) - 0.23).abs() < 1e-6);
    }

    #[test]
    fn test_greedy_prefers_first_of_ties() {
        let mut agent = agent(0.0);
        let mut rng = Pcg32::seed_from_u64(0);
        assert_eq!(agent.select_action(S1, &[2, 1, 3], &mut rng), Some(2));
        agent.q_values(S1, &[])[3] = 0.5;
        agent.q_values(S1, &[])[1] = 0.5;
        assert_eq!(agent.select_action(S1, &[2, 1, 3], &mut rng), Some(1));
        assert_eq!(agent.select_action(S1, &[], &mut rng), None);
    }

    #[test]
    fn test_full_exploration_stays_in_available() {
        let mut agent = agent(1.0);
        let mut rng = Pcg32::seed_from_u64(7);
        for _ in 0..100 {
            let action = agent.select_action(S1, &[1, 3], &mut rng).unwrap();
            assert!(action == 1 || action == 3);
        }
    }

    #[test]
    fn test_decay_stops_at_floor() {
        let mut agent = agent(0.1);
        assert!((agent.decay() - 0.0995).abs() < 1e-6);
        for _ in 0..2000 {
            agent.decay();
        }
        assert!((agent.exploration_rate() - 0.01).abs() < 1e-6);
    }

    #[test]
    fn test_save_then_load() {
        let mut store = MemoryStore::new();
        let mut saved = agent(0.3);
        saved.update(StateKey::from_bits(1 << 100), 2, 1.0, S2, &[]);
        saved.save(&mut store).unwrap();

        let blob = store.get(STORE_KEY).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&blob).unwrap();
        assert_eq!(value["actionCount"], 4);
        assert!(value["entries"].is_array());
        assert!(value["learningRate"].is_number());
        assert!(value["explorationRate"].is_number());

        let mut loaded = agent(0.0);
        assert!(loaded.load(&store));
        assert_eq!(loaded.action_count(), 4);
        assert_eq!(loaded.len(), 1);
        assert!((loaded.exploration_rate() - 0.3).abs() < 1e-6);
        assert!((loaded.q_value(StateKey::from_bits(1 << 100), 2) - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_load_fails_closed() {
        let mut store = MemoryStore::new();
        let mut agent = agent(0.2);
        agent.update(S1, 0, 1.0, S2, &[]);

        assert!(!agent.load(&store));
        store.set(STORE_KEY, "not json").unwrap();
        assert!(!agent.load(&store));
        store
            .set(
                STORE_KEY,
                r#"{"actionCount":4,"entries":[],"learningRate":5.0,"discountFactor":0.9,"explorationRate":0.1}"#,
            )
            .unwrap();
        assert!(!agent.load(&store));

        assert_eq!(agent.len(), 1);
        assert!((agent.exploration_rate() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_load_rejects_other_action_count() {
        let mut store = MemoryStore::new();
        let mut narrow = QLearning::new(24, QLearningParams::default(), DecayParams::default());
        narrow.q_values(StateKey::from_bits(3), &[])[7] = 0.5;
        narrow.save(&mut store).unwrap();

        let mut wide = QLearning::new(40, QLearningParams::default(), DecayParams::default());
        wide.update(S1, 0, 1.0, S2, &[]);
        assert!(!wide.load(&store));
        assert_eq!(wide.len(), 1);
        assert!(wide.q_value(StateKey::from_bits(3), 7).abs() < 1e-6);

        let short = r#"{"actionCount":40,"entries":[[3,[0.5]]],"learningRate":0.1,"discountFactor":0.9,"explorationRate":0.1}"#;
        store.set(STORE_KEY, short).unwrap();
        assert!(!wide.load(&store));
        assert_eq!(wide.len(), 1);

        narrow.save(&mut store).unwrap();
        let mut same = QLearning::new(24, QLearningParams::default(), DecayParams::default());
        assert!(same.load(&store));
        assert!((same.q_value(StateKey::from_bits(3), 7) - 0.5).abs() < 1e-6);
    }
}
