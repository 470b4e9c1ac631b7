//! Tabular Q-learning agent for the blockfall board.
//!
//! [`QLearning`] only knows integer state keys and action indices. [`Trainer`] connects
//! it to a [`blockfall_engine::GameBoard`] through the placement enumerator, and the
//! learned table is persisted through a [`KeyValueStore`].

pub use self::{q_learning::*, store::*, trainer::*};

mod q_learning;
mod store;
mod trainer;
