//! Implementation of the Monte Carlo Tree Search decision engine.
//!
//! Each iteration selects a node with UCB1, expands it when it is a
//! non-terminal leaf, plays a uniformly random game to the end and
//! backpropagates the result to the root. Searches are bounded by the CPU
//! time of the searching thread or by a rollout count, and the tree is carried
//! over between turns by [`MctsEngine::advance`].

use std::time::Duration;

use cpu_time::ThreadTime;
use log::{debug, trace, warn};
use rand::{rngs::StdRng, seq::IndexedRandom, SeedableRng};
use thiserror::Error;

use crate::telemetry::TelemetrySink;
use crate::tree::{NodeId, SearchTree};
use crate::utils::choose_max;
use crate::{BoardError, BoardState, Mark, Outcome};

/// How a drawn rollout is rewarded along the backpropagation path.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DrawScoring{
    /// Every node on the path receives `0.5`.
    #[default]
    Half,
    /// The node the rollout started from receives `1`, every ancestor `0`.
    StartNodeOnly
}

/// Configuration parameters for an [`MctsEngine`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MctsConfig{
    /// Weight of the UCB1 exploration term. A higher value favours
    /// under-visited children.
    pub exploration: f64,
    /// Reward given to the nodes of a drawn rollout.
    pub draw_scoring: DrawScoring
}

impl MctsConfig{
    /// The default configuration.
    ///
    /// - `exploration`: `std::f64::consts::SQRT_2`, the usual UCB1 constant.
    /// - `draw_scoring`: [`DrawScoring::Half`].
    pub const DEFAULT: MctsConfig = MctsConfig{
        exploration: std::f64::consts::SQRT_2,
        draw_scoring: DrawScoring::Half
    };
}

impl Default for MctsConfig{
    fn default() -> Self{
        MctsConfig::DEFAULT
    }
}

/// Errors returned by checked engine operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MctsError{
    /// The root position is already won or full.
    #[error("the game is already over")]
    GameOver,
    #[error(transparent)]
    IllegalMove(#[from] BoardError)
}

/// Rollout and timing figures for diagnostics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SearchStats{
    /// Rollouts played by the last search.
    pub rollouts: u64,
    /// CPU time spent in the last search.
    pub elapsed: Duration,
    /// Rollouts played since the engine was created.
    pub total_rollouts: u64,
    /// CPU time spent searching since the engine was created.
    pub total_elapsed: Duration,
    /// Telemetry records that could not be written.
    pub telemetry_failures: u64
}

/// Monte Carlo Tree Search engine for one game.
///
/// The engine owns the root position, the search tree, its random generator
/// and an optional telemetry sink. It is meant for a single caller playing a
/// single game.
pub struct MctsEngine{
    root_state: BoardState,
    tree: SearchTree,
    config: MctsConfig,
    rng: StdRng,
    telemetry: Option<Box<dyn TelemetrySink>>,
    stats: SearchStats,
    /// Working copy of `root_state` for the current iteration.
    scratch: BoardState,
    moves: Vec<usize>
}

impl MctsEngine{
    /// Creates an engine for `state` with the default configuration and an
    /// OS-seeded generator.
    pub fn new(state: BoardState) -> Self{
        Self::with_rng(state, MctsConfig::DEFAULT, StdRng::from_os_rng())
    }

    /// Creates an engine whose choices are reproducible for a given `seed`.
    pub fn with_seed(state: BoardState, config: MctsConfig, seed: u64) -> Self{
        Self::with_rng(state, config, StdRng::seed_from_u64(seed))
    }

    /// Creates an engine from an explicit configuration and generator.
    ///
    /// # Parameters
    /// - `state`: Position of the player about to decide.
    /// - `config`: Exploration constant and draw rule.
    /// - `rng`: Source of every random choice made by the search.
    pub fn with_rng(state: BoardState, config: MctsConfig, rng: StdRng) -> Self{
        MctsEngine{
            scratch: state.clone(),
            moves: Vec::with_capacity(state.geometry().cols()),
            root_state: state,
            tree: SearchTree::new(),
            config,
            rng,
            telemetry: None,
            stats: SearchStats::default()
        }
    }

    /// Attaches a telemetry sink receiving one record per rollout.
    pub fn with_telemetry<S: TelemetrySink + 'static>(mut self, sink: S) -> Self{
        self.telemetry = Some(Box::new(sink));
        self
    }

    /// Replaces the telemetry sink, `None` detaches it.
    pub fn set_telemetry(&mut self, sink: Option<Box<dyn TelemetrySink>>){
        self.telemetry = sink;
    }

    #[inline]
    pub fn config(&self) -> &MctsConfig{
        &self.config
    }

    /// Position at the root of the search.
    #[inline]
    pub fn root_state(&self) -> &BoardState{
        &self.root_state
    }

    #[inline]
    pub fn tree(&self) -> &SearchTree{
        &self.tree
    }

    /// Number of nodes currently held by the tree.
    #[inline]
    pub fn tree_size(&self) -> usize{
        self.tree.len()
    }

    #[inline]
    pub fn root_visits(&self) -> u32{
        self.tree.get(self.tree.root()).visits()
    }

    #[inline]
    pub fn root_reward(&self) -> f64{
        self.tree.get(self.tree.root()).reward()
    }

    /// Visit count of the root child reached by `mv`, `None` if unexpanded.
    pub fn child_visits(&self, mv: usize) -> Option<u32>{
        self.tree
            .get(self.tree.root())
            .child(mv)
            .map(|id| self.tree.get(id).visits())
    }

    #[inline]
    pub fn statistics(&self) -> SearchStats{
        self.stats
    }

    /// Selection phase, with expansion when it reaches a non-terminal leaf.
    ///
    /// On return `self.scratch` holds the position of the returned node.
    ///
    /// # Returns
    /// The node the rollout starts from: an unvisited child, a freshly
    /// expanded child, or a terminal node.
    fn select(&mut self) -> NodeId{
        self.scratch.clone_from(&self.root_state);

        let exploration = self.config.exploration;
        let mut node_id = self.tree.root();

        loop {
            let node = self.tree.get(node_id);
            if node.is_leaf() {
                break;
            }

            let parent_visits = node.visits();
            let tree = &self.tree;
            let Some(&(mv, child_id)) = choose_max(
                node.children(),
                |&(_, id)| tree.get(id).selection_score(parent_visits, exploration),
                &mut self.rng
            ) else {
                break;
            };

            self.scratch.apply_move(mv);
            node_id = child_id;

            if self.tree.get(child_id).visits() == 0 {
                return child_id;
            }
        }

        if self.scratch.is_terminal() {
            return node_id;
        }

        self.scratch.legal_moves_into(&mut self.moves);
        self.tree.expand(node_id, &self.moves);
        trace!("expanded node with {} children", self.moves.len());

        match self.tree.get(node_id).children().choose(&mut self.rng) {
            Some(&(mv, child_id)) => {
                self.scratch.apply_move(mv);
                child_id
            }
            None => node_id
        }
    }

    /// Simulation phase: uniformly random moves until the game ends.
    fn simulate(state: &mut BoardState, moves: &mut Vec<usize>, rng: &mut StdRng) -> Outcome{
        loop {
            if let Some(outcome) = state.outcome() {
                return outcome;
            }

            state.legal_moves_into(moves);
            match moves.choose(rng) {
                Some(&mv) => state.apply_move(mv),
                None => return Outcome::Draw
            }
        }
    }

    /// Backpropagation phase.
    ///
    /// # Parameters
    /// - `node`: Node the rollout started from.
    /// - `perspective`: Mark to move when the rollout started.
    /// - `outcome`: Result of the rollout.
    fn backpropagate(&mut self, node: NodeId, perspective: Mark, outcome: Outcome){
        let draw_scoring = self.config.draw_scoring;

        let mut reward = match outcome {
            Outcome::Draw if draw_scoring == DrawScoring::Half => 0.5,
            Outcome::Win(mark) if mark == perspective => 0.0,
            _ => 1.0
        };
        let mut current = Some(node);

        while let Some(id) = current {
            let node = self.tree.get_mut(id);
            node.record(reward);
            current = node.parent();

            reward = match (outcome, draw_scoring) {
                (Outcome::Draw, DrawScoring::Half) => 0.5,
                (Outcome::Draw, DrawScoring::StartNodeOnly) => 0.0,
                (Outcome::Win(_), _) => 1.0 - reward
            };
        }
    }

    /// Sends the finished rollout held in `scratch` to the telemetry sink.
    fn report(&mut self, outcome: Outcome){
        let Some(sink) = self.telemetry.as_mut() else {
            return;
        };

        if let Err(err) = sink.record(&self.scratch, outcome) {
            self.stats.telemetry_failures += 1;
            if self.stats.telemetry_failures == 1 {
                warn!("telemetry record dropped: {err}");
            } else {
                debug!("telemetry record dropped ({} so far): {err}", self.stats.telemetry_failures);
            }
        }
    }

    /// Performs one full iteration (selection, expansion, simulation, backpropagation).
    fn iterate(&mut self){
        let node = self.select();
        let perspective = self.scratch.to_move();
        let outcome = Self::simulate(&mut self.scratch, &mut self.moves, &mut self.rng);

        self.report(outcome);
        self.backpropagate(node, perspective, outcome);
    }

    fn finish_search(&mut self, rollouts: u64, elapsed: Duration) -> SearchStats{
        if let Some(sink) = self.telemetry.as_mut() {
            if let Err(err) = sink.flush() {
                warn!("telemetry flush failed: {err}");
            }
        }

        self.stats.rollouts = rollouts;
        self.stats.elapsed = elapsed;
        self.stats.total_rollouts += rollouts;
        self.stats.total_elapsed += elapsed;

        debug!(
            "search finished: {} rollouts in {:?}, root visits {}, {} nodes",
            rollouts,
            elapsed,
            self.root_visits(),
            self.tree.len()
        );

        self.stats
    }

    /// Runs iterations until the calling thread has used `budget` of CPU time
    /// since the call.
    ///
    /// Time the thread spends descheduled or blocked, in a slow telemetry
    /// writer for instance, does not count. The clock is read between rollouts
    /// only, so the search may overrun the budget by the length of one rollout.
    /// A zero budget runs no rollout.
    ///
    /// # Returns
    /// Statistics including the rollouts played by this call.
    pub fn search(&mut self, budget: Duration) -> SearchStats{
        let start = ThreadTime::now();
        let mut rollouts = 0;

        while start.elapsed() < budget {
            self.iterate();
            rollouts += 1;
        }

        self.finish_search(rollouts, start.elapsed())
    }

    /// Runs exactly `count` iterations, reproducible under a seeded generator.
    pub fn search_rollouts(&mut self, count: u64) -> SearchStats{
        let start = ThreadTime::now();

        for _ in 0..count {
            self.iterate();
        }

        self.finish_search(count, start.elapsed())
    }

    /// Returns the most visited root move, ties broken at random.
    ///
    /// # Returns
    /// `None` if the root position is terminal. A random legal move if the
    /// root was never expanded.
    pub fn best_move(&mut self) -> Option<usize>{
        if self.root_state.is_terminal() {
            return None;
        }

        let tree = &self.tree;
        let root = tree.get(tree.root());

        match choose_max(root.children(), |&(_, id)| tree.get(id).visits(), &mut self.rng) {
            Some(&(mv, _)) => Some(mv),
            None => {
                self.root_state.legal_moves_into(&mut self.moves);
                self.moves.choose(&mut self.rng).copied()
            }
        }
    }

    /// Plays `mv` at the root, keeping its subtree when it was explored.
    ///
    /// # Parameters
    /// - `mv`: Column played, by this engine or by the opponent.
    ///
    /// # Returns
    /// `Ok(true)` if the explored subtree became the new root, `Ok(false)` if
    /// the search restarts from an empty root.
    /// `Err(MctsError::GameOver)` if the root position is already terminal.
    /// `Err(MctsError::IllegalMove(_))` if `mv` is out of range or full.
    pub fn advance(&mut self, mv: usize) -> Result<bool, MctsError>{
        if self.root_state.is_terminal() {
            return Err(MctsError::GameOver);
        }

        self.root_state.try_apply_move(mv)?;
        let reused = self.tree.reroot(mv);

        debug!(
            "advanced by column {mv}: {} ({} visits kept, {} nodes)",
            if reused { "subtree reused" } else { "fresh root" },
            self.root_visits(),
            self.tree.len()
        );

        Ok(reused)
    }
}
