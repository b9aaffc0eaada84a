//! Rules engine for Connect-X style drop games.
//!
//! A [`BoardState`] holds a `rows x cols` grid stored row-major with row 0 at
//! the top, the next free row of every column, the mark to move and the last
//! placed cell. Win detection is incremental: only the lines crossing the last
//! placed cell are inspected.

use std::fmt;

use thiserror::Error;

/// The token identifying which player owns a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Mark{
    /// First player, encoded as `1`.
    A,
    /// Second player, encoded as `2`.
    B
}

impl Mark{
    /// Returns the other player's mark.
    #[inline]
    pub fn opponent(self) -> Mark{
        match self {
            Mark::A => Mark::B,
            Mark::B => Mark::A
        }
    }

    /// Host encoding: `1` for [`Mark::A`], `2` for [`Mark::B`].
    #[inline]
    pub fn code(self) -> u8{
        match self {
            Mark::A => 1,
            Mark::B => 2
        }
    }

    /// Decodes a host mark, `None` for anything other than `1` or `2`.
    pub fn from_code(code: u8) -> Option<Mark>{
        match code {
            1 => Some(Mark::A),
            2 => Some(Mark::B),
            _ => None
        }
    }
}

/// Content of a single grid cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Cell{
    #[default]
    Empty,
    Taken(Mark)
}

impl Cell{
    /// Host encoding: `0` empty, otherwise the owner's [`Mark::code`].
    #[inline]
    pub fn code(self) -> u8{
        match self {
            Cell::Empty => 0,
            Cell::Taken(mark) => mark.code()
        }
    }

    /// Decodes a host cell code, `None` for anything but `0`, `1` or `2`.
    pub fn from_code(code: u8) -> Option<Cell>{
        match code {
            0 => Some(Cell::Empty),
            _ => Mark::from_code(code).map(Cell::Taken)
        }
    }

    /// Whether no piece occupies the cell.
    #[inline]
    pub fn is_empty(self) -> bool{
        self == Cell::Empty
    }
}

/// Result of a finished game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome{
    Win(Mark),
    Draw
}

impl Outcome{
    /// Outcome code used when no outcome is available.
    pub const NONE_CODE: u8 = 0;

    /// Telemetry encoding: `1` A wins, `2` B wins, `3` draw.
    #[inline]
    pub fn code(self) -> u8{
        match self {
            Outcome::Win(mark) => mark.code(),
            Outcome::Draw => 3
        }
    }

    /// Returns the winning mark, `None` on a draw.
    #[inline]
    pub fn winner(self) -> Option<Mark>{
        match self {
            Outcome::Win(mark) => Some(mark),
            Outcome::Draw => None
        }
    }
}

/// Errors raised while building a board or applying a checked move.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BoardError{
    #[error("invalid board geometry: {rows} rows x {cols} columns, {inarow} in a row")]
    InvalidGeometry{ rows: usize, cols: usize, inarow: usize },

    #[error("expected {expected} cells, found {found}")]
    CellCount{ expected: usize, found: usize },

    #[error("invalid cell code {code} at index {index}")]
    InvalidCell{ index: usize, code: u8 },

    #[error("piece at row {row}, column {column} sits above an empty cell")]
    FloatingPiece{ row: usize, column: usize },

    #[error("column {column} is outside the board ({columns} columns)")]
    ColumnOutOfRange{ column: usize, columns: usize },

    #[error("column {0} is full")]
    ColumnFull(usize)
}

/// Fixed dimensions of a game: grid size and the run length needed to win.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Geometry{
    rows: usize,
    cols: usize,
    inarow: usize
}

impl Geometry{
    /// Classic Connect Four: 6 rows, 7 columns, 4 in a row.
    pub const CONNECT_FOUR: Geometry = Geometry{ rows: 6, cols: 7, inarow: 4 };

    /// Creates a geometry, rejecting empty grids, a zero run length and
    /// grids whose cell count does not fit in a `usize`.
    ///
    /// # Parameters
    /// - `rows`: Number of rows, at least 1.
    /// - `cols`: Number of columns, at least 1.
    /// - `inarow`: Number of aligned pieces needed to win, at least 1.
    ///
    /// # Returns
    /// The geometry, or [`BoardError::InvalidGeometry`].
    pub fn new(rows: usize, cols: usize, inarow: usize) -> Result<Self, BoardError>{
        if rows == 0
            || cols == 0
            || inarow == 0
            || rows > isize::MAX as usize
            || cols > isize::MAX as usize
            || rows.checked_mul(cols).is_none()
        {
            return Err(BoardError::InvalidGeometry{ rows, cols, inarow });
        }

        Ok(Geometry{ rows, cols, inarow })
    }

    /// Number of rows.
    #[inline]
    pub fn rows(&self) -> usize{
        self.rows
    }

    /// Number of columns.
    #[inline]
    pub fn cols(&self) -> usize{
        self.cols
    }

    /// Number of aligned pieces needed to win.
    #[inline]
    pub fn inarow(&self) -> usize{
        self.inarow
    }

    #[inline]
    pub fn cell_count(&self) -> usize{
        self.rows * self.cols
    }

    #[inline]
    fn index(&self, row: usize, col: usize) -> usize{
        row * self.cols + col
    }
}

impl Default for Geometry{
    fn default() -> Self{
        Geometry::CONNECT_FOUR
    }
}

/// Axis directions as (row step, column step): vertical, horizontal and both diagonals.
const AXES: [(isize, isize); 4] = [(1, 0), (0, 1), (1, 1), (1, -1)];

/// Game position: the grid, per-column heights, the mark to move and the last move.
#[derive(Debug, PartialEq, Eq)]
pub struct BoardState{
    geometry: Geometry,
    cells: Vec<Cell>,
    /// Row of the next free cell per column, `-1` once the column is full.
    heights: Vec<isize>,
    to_move: Mark,
    last_placed: Option<(usize, usize)>
}

impl Clone for BoardState{
    fn clone(&self) -> Self{
        BoardState{
            geometry: self.geometry,
            cells: self.cells.clone(),
            heights: self.heights.clone(),
            to_move: self.to_move,
            last_placed: self.last_placed
        }
    }

    /// Reuses the existing buffers, the search copies the root state into a
    /// scratch state on every iteration.
    fn clone_from(&mut self, source: &Self){
        self.geometry = source.geometry;
        self.cells.clone_from(&source.cells);
        self.heights.clone_from(&source.heights);
        self.to_move = source.to_move;
        self.last_placed = source.last_placed;
    }
}

impl BoardState{
    /// Creates an empty board with `first` to move.
    pub fn new(geometry: Geometry, first: Mark) -> Self{
        BoardState{
            geometry,
            cells: vec![Cell::Empty; geometry.cell_count()],
            heights: vec![geometry.rows as isize - 1; geometry.cols],
            to_move: first,
            last_placed: None
        }
    }

    /// Builds a position from a row-major grid (row 0 at the top).
    ///
    /// Column heights are derived from the grid. The last move is unknown, so
    /// [`BoardState::check_winner`] reports no winner until a move is applied.
    ///
    /// # Parameters
    /// - `geometry`: Board dimensions.
    /// - `cells`: Exactly `rows * cols` cells.
    /// - `to_move`: Mark that plays next.
    ///
    /// # Returns
    /// The position, or an error if the cell count is wrong or a piece floats
    /// above an empty cell.
    pub fn from_cells(geometry: Geometry, cells: Vec<Cell>, to_move: Mark) -> Result<Self, BoardError>{
        if cells.len() != geometry.cell_count() {
            return Err(BoardError::CellCount{ expected: geometry.cell_count(), found: cells.len() });
        }

        let mut heights = Vec::with_capacity(geometry.cols);
        for col in 0..geometry.cols {
            let empty = (0..geometry.rows)
                .take_while(|&row| cells[geometry.index(row, col)].is_empty())
                .count();

            if let Some(row) = (empty..geometry.rows).find(|&row| cells[geometry.index(row, col)].is_empty()) {
                return Err(BoardError::FloatingPiece{ row: row - 1, column: col });
            }

            heights.push(empty as isize - 1);
        }

        Ok(BoardState{ geometry, cells, heights, to_move, last_placed: None })
    }

    /// Same as [`BoardState::from_cells`] with host cell codes (`0`, `1`, `2`).
    pub fn from_codes(geometry: Geometry, codes: &[u8], to_move: Mark) -> Result<Self, BoardError>{
        let cells = codes
            .iter()
            .enumerate()
            .map(|(index, &code)| Cell::from_code(code).ok_or(BoardError::InvalidCell{ index, code }))
            .collect::<Result<Vec<_>, _>>()?;

        Self::from_cells(geometry, cells, to_move)
    }

    #[inline]
    pub fn geometry(&self) -> Geometry{
        self.geometry
    }

    #[inline]
    pub fn to_move(&self) -> Mark{
        self.to_move
    }

    /// (row, column) of the most recent move, `None` before any move.
    #[inline]
    pub fn last_placed(&self) -> Option<(usize, usize)>{
        self.last_placed
    }

    /// Row-major cells, row 0 at the top.
    #[inline]
    pub fn cells(&self) -> &[Cell]{
        &self.cells
    }

    #[inline]
    pub fn cell(&self, row: usize, col: usize) -> Cell{
        self.cells[self.geometry.index(row, col)]
    }

    /// Row index of the next free cell of `col`, `-1` when the column is full.
    #[inline]
    pub fn height(&self, col: usize) -> isize{
        self.heights[col]
    }

    pub fn piece_count(&self) -> usize{
        self.cells.iter().filter(|cell| !cell.is_empty()).count()
    }

    /// Whether a piece can be dropped in `col`.
    #[inline]
    pub fn is_legal(&self, col: usize) -> bool{
        col < self.geometry.cols && self.heights[col] >= 0
    }

    /// Columns with a free slot, in ascending order.
    pub fn legal_moves(&self) -> Vec<usize>{
        let mut moves = Vec::with_capacity(self.geometry.cols);
        self.legal_moves_into(&mut moves);
        moves
    }

    /// Fills `moves` with the legal columns, reusing its allocation.
    pub fn legal_moves_into(&self, moves: &mut Vec<usize>){
        moves.clear();
        moves.extend((0..self.geometry.cols).filter(|&col| self.heights[col] >= 0));
    }

    #[inline]
    pub fn has_legal_move(&self) -> bool{
        self.heights.iter().any(|&height| height >= 0)
    }

    /// Drops the mark to move into `col` and passes the turn.
    ///
    /// # Parameters
    /// - `col`: A legal column. The search only applies moves taken from
    ///          [`BoardState::legal_moves`]; use [`BoardState::try_apply_move`]
    ///          for unchecked input.
    #[inline]
    pub fn apply_move(&mut self, col: usize){
        debug_assert!(self.is_legal(col), "column {col} is not playable");

        let row = self.heights[col] as usize;
        let index = self.geometry.index(row, col);

        self.cells[index] = Cell::Taken(self.to_move);
        self.last_placed = Some((row, col));
        self.heights[col] -= 1;
        self.to_move = self.to_move.opponent();
    }

    /// Checked version of [`BoardState::apply_move`]. The state is left
    /// untouched on error.
    pub fn try_apply_move(&mut self, col: usize) -> Result<(), BoardError>{
        if col >= self.geometry.cols {
            return Err(BoardError::ColumnOutOfRange{ column: col, columns: self.geometry.cols });
        }
        if self.heights[col] < 0 {
            return Err(BoardError::ColumnFull(col));
        }

        self.apply_move(col);
        Ok(())
    }

    /// Counts consecutive `mark` cells from (row, col), excluded, along one
    /// direction, capped at `inarow - 1`.
    fn count_run(&self, row: usize, col: usize, step: (isize, isize), mark: Mark) -> usize{
        let reach = self.geometry.inarow - 1;
        let (mut r, mut c) = (row as isize, col as isize);

        for i in 1..=reach {
            r += step.0;
            c += step.1;

            if r < 0 || c < 0 || r >= self.geometry.rows as isize || c >= self.geometry.cols as isize
                || self.cell(r as usize, c as usize) != Cell::Taken(mark)
            {
                return i - 1;
            }
        }

        reach
    }

    /// Returns the mark that completed a line with the last move, if any.
    pub fn check_winner(&self) -> Option<Mark>{
        let (row, col) = self.last_placed?;
        let Cell::Taken(mark) = self.cell(row, col) else {
            return None;
        };

        let need = self.geometry.inarow - 1;
        AXES.iter()
            .any(|&(dr, dc)| {
                self.count_run(row, col, (dr, dc), mark) + self.count_run(row, col, (-dr, -dc), mark) >= need
            })
            .then_some(mark)
    }

    /// `true` once a player has won or the grid is full.
    #[inline]
    pub fn is_terminal(&self) -> bool{
        self.check_winner().is_some() || !self.has_legal_move()
    }

    /// Result of a finished game, `None` while the game is still running.
    pub fn outcome(&self) -> Option<Outcome>{
        match self.check_winner() {
            Some(mark) => Some(Outcome::Win(mark)),
            None if !self.has_legal_move() => Some(Outcome::Draw),
            None => None
        }
    }
}

impl fmt::Display for BoardState{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result{
        for row in self.cells.chunks(self.geometry.cols) {
            for cell in row {
                let symbol = match cell {
                    Cell::Empty => '.',
                    Cell::Taken(Mark::A) => 'A',
                    Cell::Taken(Mark::B) => 'B'
                };
                write!(f, "{symbol}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{board_from_rows, drawn_rows, play_all};

    #[test]
    fn test_empty_board(){
        let state = BoardState::new(Geometry::CONNECT_FOUR, Mark::A);

        assert_eq!(state.legal_moves(), vec![0, 1, 2, 3, 4, 5, 6]);
        assert_eq!(state.piece_count(), 0);
        assert_eq!(state.to_move(), Mark::A);
        assert!(state.last_placed().is_none());
        assert!(state.check_winner().is_none());
        assert!(!state.is_terminal());
        assert!(state.outcome().is_none());
        assert!((0..7).all(|col| state.height(col) == 5));
    }

    #[test]
    fn test_apply_move(){
        let mut state = BoardState::new(Geometry::CONNECT_FOUR, Mark::A);
        state.apply_move(3);

        assert_eq!(state.cell(5, 3), Cell::Taken(Mark::A));
        assert_eq!(state.height(3), 4);
        assert_eq!(state.last_placed(), Some((5, 3)));
        assert_eq!(state.to_move(), Mark::B);

        state.apply_move(3);
        assert_eq!(state.cell(4, 3), Cell::Taken(Mark::B));
        assert_eq!(state.height(3), 3);
        assert_eq!(state.to_move(), Mark::A);
    }

    #[test]
    fn test_moves_count_and_heights(){
        let mut state = BoardState::new(Geometry::CONNECT_FOUR, Mark::A);
        let moves = [0, 6, 0, 2, 3, 3, 0, 5];

        let mut previous: Vec<isize> = (0..7).map(|col| state.height(col)).collect();
        for (played, &col) in moves.iter().enumerate() {
            state.apply_move(col);
            assert_eq!(state.piece_count(), played + 1);
            assert!(state.height(col) < previous[col]);
            previous[col] = state.height(col);
        }
    }

    #[test]
    fn test_full_column_is_not_legal() -> Result<(), BoardError>{
        let mut state = BoardState::new(Geometry::CONNECT_FOUR, Mark::A);
        play_all(&mut state, &[2, 2, 2, 2, 2, 2]);

        assert_eq!(state.height(2), -1);
        assert_eq!(state.legal_moves(), vec![0, 1, 3, 4, 5, 6]);
        assert!(!state.is_legal(2));

        let before = state.clone();
        assert_eq!(state.try_apply_move(2), Err(BoardError::ColumnFull(2)));
        assert_eq!(state.try_apply_move(7), Err(BoardError::ColumnOutOfRange{ column: 7, columns: 7 }));
        assert_eq!(state, before);

        state.try_apply_move(1)?;
        assert_eq!(state.cell(5, 1), Cell::Taken(Mark::A));
        Ok(())
    }

    #[test]
    fn test_vertical_win_on_fourth_piece() -> Result<(), BoardError>{
        let mut state = board_from_rows(&[
            ".......",
            ".......",
            ".......",
            "A......",
            "A......",
            "A......",
        ], 4, Mark::A)?;

        assert!(state.check_winner().is_none());
        state.apply_move(0);

        assert_eq!(state.check_winner(), Some(Mark::A));
        assert!(state.is_terminal());
        assert_eq!(state.outcome(), Some(Outcome::Win(Mark::A)));
        Ok(())
    }

    #[test]
    fn test_horizontal_win_from_the_middle(){
        let mut state = BoardState::new(Geometry::CONNECT_FOUR, Mark::A);
        // A: 0, 1, 3 then 2 closes the gap; B stacks on top.
        play_all(&mut state, &[0, 0, 1, 1, 3, 3]);
        assert!(state.check_winner().is_none());

        state.apply_move(2);
        assert_eq!(state.check_winner(), Some(Mark::A));
    }

    #[test]
    fn test_diagonal_wins() -> Result<(), BoardError>{
        let mut rising = board_from_rows(&[
            ".......",
            ".......",
            ".......",
            "..AB...",
            ".ABB...",
            "ABBA...",
        ], 4, Mark::A)?;
        rising.apply_move(3);
        assert_eq!(rising.last_placed(), Some((2, 3)));
        assert_eq!(rising.check_winner(), Some(Mark::A));

        let mut falling = board_from_rows(&[
            ".......",
            ".......",
            ".......",
            "...AB..",
            "...ABB.",
            "...BAAB",
        ], 4, Mark::B)?;
        falling.apply_move(3);
        assert_eq!(falling.last_placed(), Some((2, 3)));
        assert_eq!(falling.check_winner(), Some(Mark::B));
        Ok(())
    }

    #[test]
    fn test_no_winner_before_completing_move() -> Result<(), BoardError>{
        let mut state = board_from_rows(&[
            ".......",
            ".......",
            ".......",
            ".......",
            ".......",
            "AAA.BBB",
        ], 4, Mark::A)?;
        state.apply_move(0);
        assert!(state.check_winner().is_none());

        // B drops on column 3 and takes the bottom row with four in a row.
        let mut state = board_from_rows(&[
            ".......",
            ".......",
            ".......",
            ".......",
            ".......",
            "AA..BBB",
        ], 4, Mark::B)?;
        state.apply_move(3);
        assert_eq!(state.check_winner(), Some(Mark::B));
        Ok(())
    }

    #[test]
    fn test_smaller_run_length() -> Result<(), BoardError>{
        let mut state = board_from_rows(&[
            "...",
            "...",
            "A..",
        ], 2, Mark::A)?;
        state.apply_move(1);
        assert_eq!(state.check_winner(), Some(Mark::A));
        Ok(())
    }

    #[test]
    fn test_full_board_draw() -> Result<(), BoardError>{
        let state = board_from_rows(&drawn_rows(), 4, Mark::A)?;

        assert!(state.legal_moves().is_empty());
        assert!(state.check_winner().is_none());
        assert!(state.is_terminal());
        assert_eq!(state.outcome(), Some(Outcome::Draw));
        Ok(())
    }

    #[test]
    fn test_last_piece_draw() -> Result<(), BoardError>{
        let mut rows = drawn_rows();
        rows[0] = "AABBAA.";
        let mut state = board_from_rows(&rows, 4, Mark::B)?;

        assert!(!state.is_terminal());
        assert_eq!(state.legal_moves(), vec![6]);

        state.apply_move(6);
        assert!(state.check_winner().is_none());
        assert_eq!(state.outcome(), Some(Outcome::Draw));
        Ok(())
    }

    #[test]
    fn test_from_codes(){
        let geometry = Geometry::new(2, 2, 2).unwrap();

        let state = BoardState::from_codes(geometry, &[0, 0, 1, 2], Mark::A).unwrap();
        assert_eq!(state.height(0), 0);
        assert_eq!(state.height(1), 0);
        assert_eq!(state.cell(1, 1), Cell::Taken(Mark::B));

        assert_eq!(
            BoardState::from_codes(geometry, &[0, 0, 1], Mark::A),
            Err(BoardError::CellCount{ expected: 4, found: 3 })
        );
        assert_eq!(
            BoardState::from_codes(geometry, &[0, 0, 1, 7], Mark::A),
            Err(BoardError::InvalidCell{ index: 3, code: 7 })
        );
        assert_eq!(
            BoardState::from_codes(geometry, &[1, 0, 0, 0], Mark::A),
            Err(BoardError::FloatingPiece{ row: 0, column: 0 })
        );
    }

    #[test]
    fn test_invalid_geometry(){
        assert!(Geometry::new(0, 7, 4).is_err());
        assert!(Geometry::new(6, 0, 4).is_err());
        assert!(Geometry::new(6, 7, 0).is_err());
        assert_eq!(Geometry::new(6, 7, 4), Ok(Geometry::CONNECT_FOUR));
    }

    #[test]
    fn test_geometry_rejects_overflowing_cell_count(){
        let rows = isize::MAX as usize;
        assert_eq!(
            Geometry::new(rows, 3, 4),
            Err(BoardError::InvalidGeometry{ rows, cols: 3, inarow: 4 })
        );
        assert!(Geometry::new(1, usize::MAX, 4).is_err());
        assert_eq!(Geometry::new(rows, 2, 4).map(|geometry| geometry.cell_count()), Ok(usize::MAX - 1));
    }

    #[test]
    fn test_clone_from_matches_source(){
        let mut source = BoardState::new(Geometry::CONNECT_FOUR, Mark::A);
        play_all(&mut source, &[3, 4, 3]);

        let mut scratch = BoardState::new(Geometry::CONNECT_FOUR, Mark::B);
        scratch.apply_move(0);
        scratch.clone_from(&source);

        assert_eq!(scratch, source);
    }

    #[test]
    fn test_display(){
        let mut state = BoardState::new(Geometry::new(2, 3, 2).unwrap(), Mark::A);
        play_all(&mut state, &[0, 2]);

        assert_eq!(state.to_string(), "...\nA.B\n");
    }
}
