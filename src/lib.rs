//! An analysis engine for deterministic, memory-two iterated prisoner's dilemma strategies.
//!
//! There are 2^16 such strategies (one bit per memory-two history state). This crate classifies
//! them by three game-theoretic properties:
//!
//! - [`Strategy::is_defensible`]: no opponent can achieve a positive long-run payoff advantage.
//! - [`Strategy::is_efficient_default`]: self-play concentrates on mutual cooperation under small
//!   implementation noise.
//! - [`Strategy::is_distinguishable_default`]: the strategy is not observationally equivalent to
//!   an always-cooperate opponent.
//!
//! Each of the latter two properties has both a numeric formulation (via the stationary
//! distribution of a noisy Markov chain) and a noise-free topological surrogate built from the
//! [intra-transition graph](Strategy::itg); [`Strategy::assert_cross_check_consistent`] checks
//! that the two formulations agree, as they must for every well-formed strategy.
//!
//! # Example
//!
//! ```
//! use m2pd::Strategy;
//!
//! let tit_for_tat = Strategy::from_str16("cdcdcdcdcdcdcdcd");
//! assert!(tit_for_tat.is_defensible());
//! assert!(!tit_for_tat.is_efficient_default().unwrap());
//! assert!(!tit_for_tat.is_distinguishable_default().unwrap());
//! ```

mod action;
mod error;
mod graph;
mod state;
mod strategy;

pub use action::{Action, C, D};
pub use error::AnalysisError;
pub use graph::DirectedGraph;
pub use state::State;
pub use strategy::{Strategy, DEFAULT_EPSILON, DEFAULT_THETA};
