//! A Monte Carlo Tree Search move chooser for Connect-X style games.
//!
//! Players drop pieces into the columns of a fixed grid and win by aligning
//! a configured number of their own pieces. The engine builds a partial game
//! tree with UCB1 selection, estimates positions with uniformly random
//! playouts and picks the most visited move. The tree is carried over between
//! turns so earlier search effort is not thrown away.
//!
//! # Modules
//! - `board`: Rules engine (legality, incremental win detection, outcome).
//! - `tree`: Arena-backed search tree.
//! - `mcts`: The search engine.
//! - `telemetry`: Optional per-rollout record sink.
//! - `agent`: Decision entry for an external game host.
//! - `utils`: Random tie-breaking helpers.
//!
//! # Examples
//! ```rust
//! use connectx_mcts::{BoardState, Geometry, Mark, MctsConfig, MctsEngine, MctsError};
//!
//! fn main() -> Result<(), MctsError> {
//!     let state = BoardState::new(Geometry::CONNECT_FOUR, Mark::A);
//!     let mut engine = MctsEngine::with_seed(state, MctsConfig::DEFAULT, 42);
//!
//!     // Run 500 rollouts, or use `search` with a time budget.
//!     engine.search_rollouts(500);
//!
//!     if let Some(column) = engine.best_move() {
//!         // Keep the explored subtree for the next decision.
//!         engine.advance(column)?;
//!     }
//!     Ok(())
//! }
//! ```

mod board;
mod tree;
mod mcts;
pub mod agent;
pub mod telemetry;
pub mod utils;

#[doc(hidden)]
pub mod test_utils;

pub use board::*;
pub use tree::*;
pub use mcts::*;
pub use telemetry::{LineSink, TelemetrySink};
