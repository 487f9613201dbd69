// Cursor motion and horizontal display scrolling.

/// Direction of cursor travel (entry mode I/D bit, shift R/L bit).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    pub fn from_bit(forward: bool) -> Self {
        if forward {
            Self::Forward
        } else {
            Self::Backward
        }
    }
}

/// What happens to the row when the column wraps past either edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowWrap {
    /// Column wraps, row stays (single-line mode).
    Stay,
    /// Column wraps and the row moves to the next/previous line, modulo rows.
    Advance,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    pub row: usize,
    pub col: usize,
}

impl Cursor {
    pub fn home(&mut self) {
        self.row = 0;
        self.col = 0;
    }

    /// Moves one cell in `direction` and applies the wrap in the same step.
    ///
    /// `col` may enter equal to `cols`; moving backward from there lands on the
    /// last column without wrapping.
    pub fn step(&mut self, direction: Direction, rows: usize, cols: usize, wrap: RowWrap) {
        if rows == 0 || cols == 0 {
            return;
        }
        match direction {
            Direction::Forward => {
                self.col += 1;
                if self.col >= cols {
                    self.col = 0;
                    if wrap == RowWrap::Advance {
                        self.row = (self.row + 1) % rows;
                    }
                }
            }
            Direction::Backward => {
                if self.col == 0 {
                    self.col = cols - 1;
                    if wrap == RowWrap::Advance {
                        self.row = (self.row + rows - 1) % rows;
                    }
                } else {
                    self.col -= 1;
                }
            }
        }
    }
}

/// Moves the display window by one column and clamps it to `[-cols, cols]`.
pub fn shift_window(offset: i32, direction: Direction, cols: usize) -> i32 {
    let limit = i32::try_from(cols).unwrap_or(i32::MAX);
    let moved = match direction {
        Direction::Forward => offset.saturating_add(1),
        Direction::Backward => offset.saturating_sub(1),
    };
    moved.clamp(-limit, limit)
}
