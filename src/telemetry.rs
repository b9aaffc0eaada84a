//! Optional per-rollout record sink.
//!
//! Every finished rollout can be reported as one text line: the terminal
//! cells in row-major order as codes separated by spaces, a tab, the outcome
//! code and a newline. The engine treats the sink as write-only and never
//! lets a failed write interrupt the search.

use std::fmt::Write as _;
use std::io::{self, Write};

use crate::{BoardState, Outcome};

/// Receiver for simulated games.
pub trait TelemetrySink{
    /// Records the terminal board of a rollout and its outcome.
    fn record(&mut self, board: &BoardState, outcome: Outcome) -> io::Result<()>;

    /// Flushes buffered records, called by the engine at the end of a search.
    fn flush(&mut self) -> io::Result<()>{
        Ok(())
    }
}

/// Formats one record line, terminator included.
pub fn format_record(board: &BoardState, outcome: Outcome) -> String{
    let mut line = String::with_capacity(board.cells().len() * 2 + 3);
    write_record(&mut line, board, outcome);
    line
}

fn write_record(line: &mut String, board: &BoardState, outcome: Outcome){
    for (index, cell) in board.cells().iter().enumerate() {
        if index != 0 {
            line.push(' ');
        }
        line.push(char::from(b'0' + cell.code()));
    }
    // Writing into a String cannot fail.
    let _ = writeln!(line, "\t{}", outcome.code());
}

/// Sink appending record lines to any [`Write`] implementor.
///
/// Wrap files in a `BufWriter` so a record costs a memory copy on the search
/// hot path.
#[derive(Debug)]
pub struct LineSink<W: Write>{
    writer: W,
    line: String
}

impl<W: Write> LineSink<W>{
    /// Wraps `writer`, which receives one line per record.
    pub fn new(writer: W) -> Self{
        LineSink{ writer, line: String::new() }
    }

    /// Underlying writer.
    pub fn get_ref(&self) -> &W{
        &self.writer
    }

    /// Unwraps the sink, returning the writer.
    pub fn into_inner(self) -> W{
        self.writer
    }
}

impl<W: Write> TelemetrySink for LineSink<W>{
    fn record(&mut self, board: &BoardState, outcome: Outcome) -> io::Result<()>{
        self.line.clear();
        write_record(&mut self.line, board, outcome);
        self.writer.write_all(self.line.as_bytes())
    }

    fn flush(&mut self) -> io::Result<()>{
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BoardState, Geometry, Mark};

    #[test]
    fn test_format_record(){
        let geometry = Geometry::new(2, 3, 2).unwrap();
        let board = BoardState::from_codes(geometry, &[0, 0, 0, 1, 2, 0], Mark::A).unwrap();

        assert_eq!(format_record(&board, Outcome::Win(Mark::B)), "0 0 0 1 2 0\t2\n");
        assert_eq!(format_record(&board, Outcome::Draw), "0 0 0 1 2 0\t3\n");
    }

    #[test]
    fn test_line_sink_appends() -> io::Result<()>{
        let geometry = Geometry::new(1, 2, 2).unwrap();
        let mut board = BoardState::new(geometry, Mark::A);
        let mut sink = LineSink::new(Vec::new());

        board.apply_move(1);
        sink.record(&board, Outcome::Win(Mark::A))?;
        board.apply_move(0);
        sink.record(&board, Outcome::Draw)?;
        sink.flush()?;

        assert_eq!(String::from_utf8_lossy(sink.get_ref()), "0 1\t1\n2 1\t3\n");

        let written = sink.into_inner();
        assert_eq!(written.len(), 12);
        Ok(())
    }
}
