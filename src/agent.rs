//! Decision entry for an external game host.
//!
//! The host sends an [`Observation`] (flat board and the deciding player's
//! mark) and a [`Configuration`] (grid size, run length and time budget);
//! [`choose_column`] answers with a column index or [`NO_MOVE`].

use std::time::Duration;

use log::debug;
use serde::Deserialize;
use thiserror::Error;

use crate::{BoardError, BoardState, Geometry, Mark, MctsConfig, MctsEngine};

/// Returned when the position admits no move.
pub const NO_MOVE: i32 = -1;

/// Time kept back from the host budget for the round trip.
pub const SAFETY_MARGIN: Duration = Duration::from_millis(100);

fn default_time_budget() -> f64{
    1.0
}

/// Errors in the host-supplied configuration or observation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError{
    #[error(transparent)]
    Board(#[from] BoardError),

    #[error("time budget must be a finite, non-negative number of seconds, got {0}")]
    InvalidTimeBudget(f64),

    #[error("invalid player mark {0}, expected 1 or 2")]
    InvalidMark(u8)
}

/// Game configuration as sent by the host.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Configuration{
    pub rows: usize,
    pub columns: usize,
    pub inarow: usize,
    /// Decision budget in seconds.
    #[serde(alias = "actTimeout", alias = "timeout", default = "default_time_budget")]
    pub time_budget: f64
}

impl Configuration{
    pub fn geometry(&self) -> Result<Geometry, ConfigError>{
        Ok(Geometry::new(self.rows, self.columns, self.inarow)?)
    }

    /// Checks the geometry and the time budget.
    pub fn validate(&self) -> Result<(), ConfigError>{
        self.geometry()?;
        self.budget().map(|_| ())
    }

    /// Time budget as a [`Duration`], without the safety margin.
    pub fn budget(&self) -> Result<Duration, ConfigError>{
        Duration::try_from_secs_f64(self.time_budget).map_err(|_| ConfigError::InvalidTimeBudget(self.time_budget))
    }

    /// Time the search may use: the budget minus [`SAFETY_MARGIN`].
    pub fn search_budget(&self) -> Result<Duration, ConfigError>{
        Ok(self.budget()?.saturating_sub(SAFETY_MARGIN))
    }
}

/// Board observation as sent by the host.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct Observation{
    /// Row-major cell codes, row 0 at the top: `0` empty, `1` and `2` marks.
    pub board: Vec<u8>,
    /// Mark of the deciding player, who is also the player to move.
    pub mark: u8
}

impl Observation{
    /// Builds the position the deciding player faces.
    pub fn board_state(&self, geometry: Geometry) -> Result<BoardState, ConfigError>{
        let to_move = Mark::from_code(self.mark).ok_or(ConfigError::InvalidMark(self.mark))?;
        Ok(BoardState::from_codes(geometry, &self.board, to_move)?)
    }
}

/// Runs a timed search on the observed position and returns the chosen column.
///
/// # Parameters
/// - `observation`: Current board and the deciding player's mark.
/// - `configuration`: Board dimensions and time budget.
/// - `seed`: Seed of the search generator.
///
/// # Returns
/// A column in `[0, columns)`, [`NO_MOVE`] if the position is already
/// finished, or the configuration error.
pub fn choose_column(observation: &Observation, configuration: &Configuration, seed: u64) -> Result<i32, ConfigError>{
    let geometry = configuration.geometry()?;
    let budget = configuration.search_budget()?;
    let state = observation.board_state(geometry)?;

    let mut engine = MctsEngine::with_seed(state, MctsConfig::DEFAULT, seed);
    let stats = engine.search(budget);
    let choice = engine.best_move();

    debug!("chose {:?} after {} rollouts ({:?})", choice, stats.rollouts, stats.elapsed);

    Ok(choice.map_or(NO_MOVE, |column| column as i32))
}
