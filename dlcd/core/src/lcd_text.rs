// Text rendering of the controller state: the bordered frame printed on every
// display update and a trimmed per-row decode for hosts and tests.

use crate::lcd::Hd44780;
use log::debug;
use std::io::{self, Write};

const TOP_LEFT: char = '┌';
const TOP_RIGHT: char = '┐';
const BOTTOM_LEFT: char = '└';
const BOTTOM_RIGHT: char = '┘';
const HORIZONTAL: char = '─';
const VERTICAL: char = '│';
const BLANK: char = ' ';

/// Characters currently visible on the panel, one `Vec` per configured row.
///
/// A switched-off panel is blank. Otherwise only the active rows show content,
/// read through the display shift window; cells that fall outside the row are
/// blank, as are never-written (zero) cells.
pub fn visible_cells(lcd: &Hd44780) -> Vec<Vec<char>> {
    let (rows, cols) = (lcd.rows(), lcd.cols());
    let mut screen = vec![vec![BLANK; cols]; rows];
    if !lcd.display_on() {
        return screen;
    }
    let offset = lcd.shift_offset() as isize;
    let buffer = lcd.buffer();
    for (row, line) in screen.iter_mut().enumerate().take(lcd.active_rows()) {
        for (col, cell) in line.iter_mut().enumerate() {
            let source = col as isize + offset;
            if source < 0 || source >= cols as isize {
                continue;
            }
            if let Some(byte) = buffer.get(row, source as usize) {
                *cell = cell_char(byte);
            }
        }
    }
    screen
}

fn cell_char(byte: u8) -> char {
    if byte == 0 {
        BLANK
    } else {
        // DDRAM bytes are shown as Latin-1.
        char::from(byte)
    }
}

pub fn render_frame(lcd: &Hd44780) -> String {
    let cols = lcd.cols();
    let rows = lcd.rows();
    let mut frame = String::with_capacity((rows + 2) * (cols + 3) * 3);
    let border = |frame: &mut String, left: char, right: char| {
        frame.push(left);
        frame.extend(std::iter::repeat(HORIZONTAL).take(cols));
        frame.push(right);
        frame.push('\n');
    };

    border(&mut frame, TOP_LEFT, TOP_RIGHT);
    for line in visible_cells(lcd) {
        frame.push(VERTICAL);
        frame.extend(line);
        frame.push(VERTICAL);
        frame.push('\n');
    }
    border(&mut frame, BOTTOM_LEFT, BOTTOM_RIGHT);
    frame
}

/// Visible rows as strings with trailing blanks removed.
pub fn decode_display_text(lcd: &Hd44780) -> Vec<String> {
    visible_cells(lcd)
        .into_iter()
        .map(|line| line.into_iter().collect::<String>().trim_end().to_string())
        .collect()
}

/// Destination for rendered frames.
pub trait FrameSink {
    fn emit(&mut self, frame: &str);
}

/// Prints each frame to stdout and flushes immediately.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl FrameSink for StdoutSink {
    fn emit(&mut self, frame: &str) {
        let mut out = io::stdout().lock();
        if let Err(err) = out.write_all(frame.as_bytes()).and_then(|_| out.flush()) {
            debug!("[dlcd] frame output failed: {err}");
        }
    }
}

/// Keeps frames in memory.
#[derive(Debug, Default, Clone)]
pub struct FrameCapture {
    frames: Vec<String>,
}

impl FrameCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> &[String] {
        &self.frames
    }

    pub fn last(&self) -> Option<&str> {
        self.frames.last().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn take(&mut self) -> Vec<String> {
        std::mem::take(&mut self.frames)
    }
}

impl FrameSink for FrameCapture {
    fn emit(&mut self, frame: &str) {
        self.frames.push(frame.to_string());
    }
}

impl<S: FrameSink + ?Sized> FrameSink for Box<S> {
    fn emit(&mut self, frame: &str) {
        (**self).emit(frame);
    }
}
