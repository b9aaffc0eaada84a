//! Test utilities for building positions

use std::cell::RefCell;
use std::io;
use std::rc::Rc;

use crate::{BoardError, BoardState, Cell, Geometry, Mark};

/// Builds a position from text rows, top row first.
///
/// `.` is an empty cell, `A` and `B` are the players' marks. Any other
/// character is rejected as an invalid cell.
///
/// # Parameters
/// - `rows`: One string per row, all of the same length.
/// - `inarow`: Run length needed to win.
/// - `to_move`: Mark that plays next.
pub fn board_from_rows(rows: &[&str], inarow: usize, to_move: Mark) -> Result<BoardState, BoardError>{
    let cols = rows.first().map_or(0, |row| row.len());
    let geometry = Geometry::new(rows.len(), cols, inarow)?;

    let cells = rows
        .iter()
        .flat_map(|row| row.bytes())
        .enumerate()
        .map(|(index, symbol)| match symbol {
            b'.' => Ok(Cell::Empty),
            b'A' => Ok(Cell::Taken(Mark::A)),
            b'B' => Ok(Cell::Taken(Mark::B)),
            code => Err(BoardError::InvalidCell{ index, code })
        })
        .collect::<Result<Vec<_>, _>>()?;

    BoardState::from_cells(geometry, cells, to_move)
}

/// A full 6x7 grid without any line of four.
pub fn drawn_rows() -> [&'static str; 6]{
    [
        "AABBAAB",
        "BBAABBA",
        "AABBAAB",
        "BBAABBA",
        "AABBAAB",
        "BBAABBA",
    ]
}

/// Applies every move in order.
pub fn play_all(state: &mut BoardState, moves: &[usize]){
    for &mv in moves {
        state.apply_move(mv);
    }
}

/// Writer appending into a buffer that the test keeps a handle on.
#[derive(Clone, Debug, Default)]
pub struct SharedBuffer(pub Rc<RefCell<Vec<u8>>>);

impl io::Write for SharedBuffer{
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>{
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()>{
        Ok(())
    }
}
