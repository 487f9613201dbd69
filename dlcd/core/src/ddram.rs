// Display Data RAM image and the HD44780 row addressing scheme.

pub const MAX_ROWS: usize = 4;
pub const MAX_COLS: usize = 40;

// Rows 2/3 live in the second half of each 40-byte line on the two-driver
// layout used by 4-line modules.
pub const ROW_BASE_ADDRESSES: [u8; MAX_ROWS] = [0x00, 0x40, 0x14, 0x54];

/// Width of the address window each row answers to, regardless of geometry.
pub const ROW_WINDOW: u8 = MAX_COLS as u8;

/// Character cells of one display, stored row-major. A zero byte is blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayBuffer {
    rows: usize,
    cols: usize,
    cells: Vec<u8>,
}

impl DisplayBuffer {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            cells: vec![0; rows * cols],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn clear(&mut self) {
        self.cells.fill(0);
    }

    fn index(&self, row: usize, col: usize) -> Option<usize> {
        (row < self.rows && col < self.cols).then(|| row * self.cols + col)
    }

    pub fn get(&self, row: usize, col: usize) -> Option<u8> {
        self.index(row, col).map(|idx| self.cells[idx])
    }

    /// Stores `value` at `(row, col)`. Returns false when the cell does not exist.
    pub fn put(&mut self, row: usize, col: usize, value: u8) -> bool {
        match self.index(row, col) {
            Some(idx) => {
                self.cells[idx] = value;
                true
            }
            None => false,
        }
    }

    pub fn row(&self, row: usize) -> &[u8] {
        let start = (row * self.cols).min(self.cells.len());
        let end = (start + self.cols).min(self.cells.len());
        &self.cells[start..end]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.cells
    }

    /// Replaces the whole image. The payload must match the geometry exactly.
    pub fn copy_from(&mut self, payload: &[u8]) -> bool {
        if payload.len() != self.cells.len() {
            return false;
        }
        self.cells.copy_from_slice(payload);
        true
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|&byte| byte == 0)
    }

    /// Maps a 7-bit DDRAM address to a `(row, col)` cell of this geometry.
    ///
    /// Rows are scanned in order and the first window containing `addr` wins,
    /// so the overlap between rows 0 and 2 resolves to row 0. A column past the
    /// configured width is pinned to the last column instead of being rejected.
    pub fn position_of(&self, addr: u8) -> Option<(usize, usize)> {
        ddram_position(addr, self.rows, self.cols)
    }
}

pub fn ddram_position(addr: u8, rows: usize, cols: usize) -> Option<(usize, usize)> {
    if cols == 0 {
        return None;
    }
    ROW_BASE_ADDRESSES
        .iter()
        .take(rows.min(MAX_ROWS))
        .enumerate()
        .find(|&(_, &base)| {
            addr >= base && u16::from(addr) < u16::from(base) + u16::from(ROW_WINDOW)
        })
        .map(|(row, &base)| (row, usize::from(addr - base).min(cols - 1)))
}

/// Inverse of [`ddram_position`] for cells inside the row window.
pub fn ddram_address(row: usize, col: usize) -> Option<u8> {
    let base = *ROW_BASE_ADDRESSES.get(row)?;
    (col < MAX_COLS).then(|| base + col as u8)
}
