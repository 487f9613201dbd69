use crate::command::{self, Command};
use crate::cursor::{shift_window, Cursor, Direction, RowWrap};
use crate::ddram::{DisplayBuffer, MAX_COLS, MAX_ROWS};
use crate::register::RegisterLatch;
use crate::{CoreError, Result};
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Controller mode flags. Defaults are the HD44780 power-on state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hd44780State {
    pub display_on: bool,
    pub increment_mode: bool,
    pub multi_line: bool,
    /// Columns the visible window is displaced by, within `[-cols, cols]`.
    pub shift_offset: i32,
}

impl Default for Hd44780State {
    fn default() -> Self {
        Self {
            display_on: false,
            increment_mode: true,
            multi_line: false,
            shift_offset: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LcdStats {
    pub instruction_count: u32,
    pub data_write_count: u32,
    pub ignored_count: u32,
    pub frame_count: u32,
}

#[derive(Deserialize)]
struct ControllerMeta {
    rows: usize,
    cols: usize,
    #[serde(default)]
    state: Option<Hd44780State>,
    #[serde(default)]
    cursor_row: usize,
    #[serde(default)]
    cursor_col: usize,
    #[serde(default)]
    instruction_count: u32,
    #[serde(default)]
    data_write_count: u32,
    #[serde(default)]
    ignored_count: u32,
}

/// One HD44780 controller: DDRAM image, cursor, and mode flags.
#[derive(Debug, Clone)]
pub struct Hd44780 {
    buffer: DisplayBuffer,
    cursor: Cursor,
    state: Hd44780State,
    instruction_count: u32,
    data_write_count: u32,
    ignored_count: u32,
}

impl Hd44780 {
    pub fn new(rows: usize, cols: usize) -> Result<Self> {
        if !(1..=MAX_ROWS).contains(&rows) {
            return Err(CoreError::Geometry {
                what: "rows",
                value: rows as u64,
                max: MAX_ROWS,
            });
        }
        if !(1..=MAX_COLS).contains(&cols) {
            return Err(CoreError::Geometry {
                what: "columns",
                value: cols as u64,
                max: MAX_COLS,
            });
        }
        Ok(Self {
            buffer: DisplayBuffer::new(rows, cols),
            cursor: Cursor::default(),
            state: Hd44780State::default(),
            instruction_count: 0,
            data_write_count: 0,
            ignored_count: 0,
        })
    }

    pub fn rows(&self) -> usize {
        self.buffer.rows()
    }

    pub fn cols(&self) -> usize {
        self.buffer.cols()
    }

    pub fn buffer(&self) -> &DisplayBuffer {
        &self.buffer
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn state(&self) -> Hd44780State {
        self.state
    }

    pub fn display_on(&self) -> bool {
        self.state.display_on
    }

    pub fn increment_mode(&self) -> bool {
        self.state.increment_mode
    }

    pub fn multi_line(&self) -> bool {
        self.state.multi_line
    }

    pub fn shift_offset(&self) -> i32 {
        self.state.shift_offset
    }

    /// Rows that show buffer content when the display is on.
    pub fn active_rows(&self) -> usize {
        if self.state.multi_line {
            self.rows()
        } else {
            1
        }
    }

    /// Executes a latched strobe. Returns true when the panel contents changed.
    pub fn execute(&mut self, latch: RegisterLatch) -> bool {
        if latch.rw {
            // Busy flag / DDRAM reads are not modelled.
            trace!("[dlcd] read strobe ignored (rs={})", latch.rs);
            self.ignored_count = self.ignored_count.wrapping_add(1);
            return false;
        }
        if latch.rs {
            self.write_data(latch.data)
        } else {
            self.write_instruction(latch.data)
        }
    }

    pub fn write_instruction(&mut self, cmd: u8) -> bool {
        match command::decode(cmd) {
            Some(decoded) => {
                trace!("[dlcd] instruction 0x{cmd:02X} -> {}", decoded.name());
                self.apply(decoded)
            }
            None => {
                debug!("[dlcd] unsupported instruction 0x{cmd:02X} ignored");
                self.ignored_count = self.ignored_count.wrapping_add(1);
                false
            }
        }
    }

    pub fn apply(&mut self, command: Command) -> bool {
        self.instruction_count = self.instruction_count.wrapping_add(1);
        match command {
            Command::Clear => {
                self.buffer.clear();
                self.cursor.home();
                self.state.shift_offset = 0;
            }
            Command::ReturnHome => {
                self.cursor.home();
                self.state.shift_offset = 0;
            }
            Command::EntryMode { increment } => {
                self.state.increment_mode = increment;
            }
            Command::DisplayControl { display_on } => {
                self.state.display_on = display_on;
            }
            Command::FunctionSet { multi_line } => {
                self.state.multi_line = multi_line;
            }
            Command::Shift { display, right } => {
                let direction = Direction::from_bit(right);
                if display {
                    self.state.shift_offset =
                        shift_window(self.state.shift_offset, direction, self.cols());
                } else {
                    // Cursor moves always cross into the neighbouring row.
                    let (rows, cols) = (self.rows(), self.cols());
                    self.cursor.step(direction, rows, cols, RowWrap::Advance);
                }
            }
            Command::SetDdramAddress(addr) => self.set_ddram_address(addr),
        }
        command.updates_display()
    }

    fn set_ddram_address(&mut self, addr: u8) {
        let Some((row, col)) = self.buffer.position_of(addr) else {
            debug!("[dlcd] DDRAM address 0x{addr:02X} outside every row window");
            return;
        };
        // Single-line mode only ever exposes row 0.
        self.cursor.row = if self.state.multi_line { row } else { 0 };
        self.cursor.col = col;
    }

    pub fn write_data(&mut self, byte: u8) -> bool {
        let Cursor { row, col } = self.cursor;
        if col >= self.cols() || !self.buffer.put(row, col, byte) {
            debug!("[dlcd] data 0x{byte:02X} dropped at row={row} col={col}");
            self.ignored_count = self.ignored_count.wrapping_add(1);
            return false;
        }
        self.data_write_count = self.data_write_count.wrapping_add(1);
        let direction = Direction::from_bit(self.state.increment_mode);
        let wrap = if self.state.multi_line {
            RowWrap::Advance
        } else {
            RowWrap::Stay
        };
        let (rows, cols) = (self.rows(), self.cols());
        self.cursor.step(direction, rows, cols, wrap);
        true
    }

    pub fn stats(&self) -> LcdStats {
        LcdStats {
            instruction_count: self.instruction_count,
            data_write_count: self.data_write_count,
            ignored_count: self.ignored_count,
            frame_count: 0,
        }
    }

    pub fn export_snapshot(&self) -> (Value, Vec<u8>) {
        let meta = json!({
            "rows": self.rows(),
            "cols": self.cols(),
            "state": {
                "display_on": self.state.display_on,
                "increment_mode": self.state.increment_mode,
                "multi_line": self.state.multi_line,
                "shift_offset": self.state.shift_offset,
            },
            "cursor_row": self.cursor.row,
            "cursor_col": self.cursor.col,
            "instruction_count": self.instruction_count,
            "data_write_count": self.data_write_count,
            "ignored_count": self.ignored_count,
        });
        (meta, self.buffer.as_bytes().to_vec())
    }

    pub fn load_snapshot(&mut self, metadata: &Value, ddram: &[u8]) -> Result<()> {
        let meta: ControllerMeta = serde_json::from_value(metadata.clone())?;
        if meta.rows != self.rows() || meta.cols != self.cols() {
            return Err(CoreError::InvalidSnapshot(format!(
                "lcd geometry mismatch: snapshot {}x{}, device {}x{}",
                meta.rows,
                meta.cols,
                self.rows(),
                self.cols()
            )));
        }
        if meta.cursor_row >= self.rows() || meta.cursor_col > self.cols() {
            return Err(CoreError::InvalidSnapshot(format!(
                "lcd cursor ({}, {}) outside geometry",
                meta.cursor_row, meta.cursor_col
            )));
        }
        let state = meta.state.unwrap_or_default();
        let limit = self.cols() as i32;
        if !(-limit..=limit).contains(&state.shift_offset) {
            return Err(CoreError::InvalidSnapshot(format!(
                "lcd shift offset {} outside [-{limit}, {limit}]",
                state.shift_offset
            )));
        }
        if !self.buffer.copy_from(ddram) {
            return Err(CoreError::InvalidSnapshot(format!(
                "lcd ddram size mismatch: expected {}, got {}",
                self.buffer.len(),
                ddram.len()
            )));
        }
        self.state = state;
        self.cursor = Cursor {
            row: meta.cursor_row,
            col: meta.cursor_col,
        };
        self.instruction_count = meta.instruction_count;
        self.data_write_count = meta.data_write_count;
        self.ignored_count = meta.ignored_count;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lcd(rows: usize, cols: usize) -> Hd44780 {
        Hd44780::new(rows, cols).expect("valid geometry")
    }

    fn write_text(lcd: &mut Hd44780, text: &[u8]) {
        for &byte in text {
            lcd.write_data(byte);
        }
    }

    #[test]
    fn power_on_defaults() {
        let lcd = lcd(2, 16);
        assert!(!lcd.display_on());
        assert!(lcd.increment_mode());
        assert!(!lcd.multi_line());
        assert_eq!(lcd.shift_offset(), 0);
        assert_eq!(lcd.cursor(), Cursor::default());
    }

    #[test]
    fn rejects_geometry_outside_limits() {
        assert!(Hd44780::new(0, 16).is_err());
        assert!(Hd44780::new(5, 16).is_err());
        assert!(Hd44780::new(2, 0).is_err());
        assert!(Hd44780::new(2, 41).is_err());
        assert!(Hd44780::new(4, 40).is_ok());
    }

    #[test]
    fn read_strobes_are_skipped() {
        let mut lcd = lcd(2, 16);
        let latch = RegisterLatch {
            rs: true,
            rw: true,
            enable: false,
            data: b'A',
        };
        assert!(!lcd.execute(latch));
        assert!(lcd.buffer().is_blank());
        assert_eq!(lcd.stats().ignored_count, 1);
    }

    #[test]
    fn decrement_mode_writes_backwards() {
        let mut lcd = lcd(2, 4);
        lcd.write_instruction(0x04);
        lcd.write_instruction(0x83);
        write_text(&mut lcd, b"abcd");
        assert_eq!(lcd.buffer().row(0), b"dcba");
        assert_eq!(lcd.cursor(), Cursor { row: 0, col: 3 });
    }

    #[test]
    fn decrement_wrap_in_multi_line_moves_up_a_row() {
        let mut lcd = lcd(2, 4);
        lcd.write_instruction(0x38);
        lcd.write_instruction(0x04);
        lcd.write_data(b'x');
        assert_eq!(lcd.cursor(), Cursor { row: 1, col: 3 });
    }

    #[test]
    fn cursor_shift_wraps_rows_even_in_single_line_mode() {
        let mut lcd = lcd(2, 4);
        lcd.write_instruction(0x83);
        assert!(lcd.write_instruction(0x14));
        assert_eq!(lcd.cursor(), Cursor { row: 1, col: 0 });
        assert!(lcd.write_instruction(0x10));
        assert_eq!(lcd.cursor(), Cursor { row: 0, col: 3 });
    }

    #[test]
    fn display_shift_leaves_cursor_and_buffer() {
        let mut lcd = lcd(1, 8);
        write_text(&mut lcd, b"AB");
        let before = lcd.buffer().clone();
        assert!(lcd.write_instruction(0x1C));
        assert!(lcd.write_instruction(0x1C));
        assert!(lcd.write_instruction(0x18));
        assert_eq!(lcd.shift_offset(), 1);
        assert_eq!(lcd.cursor(), Cursor { row: 0, col: 2 });
        assert_eq!(lcd.buffer(), &before);
    }

    #[test]
    fn set_address_forces_row_zero_in_single_line_mode() {
        let mut lcd = lcd(2, 16);
        assert!(!lcd.write_instruction(0xC5));
        assert_eq!(lcd.cursor(), Cursor { row: 0, col: 5 });
        lcd.write_instruction(0x38);
        lcd.write_instruction(0xC5);
        assert_eq!(lcd.cursor(), Cursor { row: 1, col: 5 });
    }

    #[test]
    fn invalid_address_keeps_cursor() {
        let mut lcd = lcd(2, 16);
        lcd.write_instruction(0x38);
        lcd.write_instruction(0xC3);
        lcd.write_instruction(0x80 | 0x30);
        assert_eq!(lcd.cursor(), Cursor { row: 1, col: 3 });
    }

    #[test]
    fn clear_resets_everything_visible() {
        let mut lcd = lcd(2, 16);
        lcd.write_instruction(0x38);
        write_text(&mut lcd, b"hello");
        lcd.write_instruction(0x1C);
        assert!(lcd.write_instruction(0x01));
        assert!(lcd.buffer().is_blank());
        assert_eq!(lcd.cursor(), Cursor::default());
        assert_eq!(lcd.shift_offset(), 0);
        assert!(lcd.multi_line());
    }

    #[test]
    fn unsupported_instruction_changes_nothing() {
        let mut lcd = lcd(2, 16);
        write_text(&mut lcd, b"hi");
        let cursor = lcd.cursor();
        for cmd in [0x00, 0x03, 0x40, 0x7F] {
            assert!(!lcd.write_instruction(cmd));
        }
        assert_eq!(lcd.cursor(), cursor);
        assert_eq!(lcd.stats().ignored_count, 4);
        assert_eq!(lcd.stats().instruction_count, 0);
    }

    #[test]
    fn snapshot_restores_state_and_ddram() {
        let mut lcd = lcd(2, 8);
        lcd.write_instruction(0x38);
        lcd.write_instruction(0x0C);
        write_text(&mut lcd, b"snap");
        lcd.write_instruction(0x1C);
        let (meta, ddram) = lcd.export_snapshot();

        let mut restored = Hd44780::new(2, 8).expect("valid geometry");
        restored.load_snapshot(&meta, &ddram).expect("load snapshot");
        assert_eq!(restored.buffer(), lcd.buffer());
        assert_eq!(restored.state(), lcd.state());
        assert_eq!(restored.cursor(), lcd.cursor());
        assert_eq!(restored.stats(), lcd.stats());
    }

    #[test]
    fn snapshot_rejects_other_geometry() {
        let lcd = lcd(2, 8);
        let (meta, ddram) = lcd.export_snapshot();
        let mut other = Hd44780::new(2, 16).expect("valid geometry");
        assert!(matches!(
            other.load_snapshot(&meta, &ddram),
            Err(CoreError::InvalidSnapshot(_))
        ));
    }
}
