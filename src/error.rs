//! Errors surfaced by the analysis engine.
//!
//! Malformed [`Action`](crate::Action)s, out-of-range [`State`](crate::State) IDs, and
//! mismatched-length strategy/state strings are precondition violations — programming errors that
//! panic at the point of construction rather than appearing here (see the `from_char`/`from_id`/
//! `from_str4`/`from_str16` constructors). This module covers the two failure modes that are not
//! programming errors: a numerically unstable stationary-state solve, and a contradiction between
//! the topological and numeric formulations of efficiency/distinguishability, which indicates a
//! bug in this engine rather than in a caller.

use thiserror::Error;

/// An error produced while analyzing a [`Strategy`](crate::Strategy).
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The stationary-state linear solver failed to converge to a usable probability vector.
    #[error("stationary-state solver failed to converge for strategy {strategy}: {reason}")]
    SolverDidNotConverge {
        /// The 16-character textual form of the strategy being analyzed.
        strategy: String,
        /// A human-readable description of why the solve failed.
        reason: String,
    },

    /// The topological and numeric formulations of a check disagreed. Per the cross-check
    /// contract, this should never happen for a well-formed strategy and indicates a bug in this
    /// engine.
    #[error(
        "cross-check contradiction for strategy {strategy}: \
         topological and numeric {check} disagree ({topological} vs {numeric})"
    )]
    CrossCheckContradiction {
        /// The 16-character textual form of the strategy being analyzed.
        strategy: String,
        /// Which check disagreed (`"efficiency"` or `"distinguishability"`).
        check: &'static str,
        /// The topological check's verdict.
        topological: bool,
        /// The numeric (stationary-state) check's verdict.
        numeric: bool,
    },
}
