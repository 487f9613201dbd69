//! HD44780-compatible character LCD attached to a simulated physical bus.
//!
//! The host sees a 4-byte register block: offset 0 latches a data/command
//! byte, offset 1 drives RS/RW/E. A falling edge on E executes the latched
//! byte against the controller, and every operation that changes the panel
//! renders a bordered text frame into a [`FrameSink`].

use thiserror::Error;

pub mod command;
pub mod config;
pub mod cursor;
pub mod ddram;
pub mod device;
pub mod host;
pub mod lcd;
pub mod lcd_text;
pub mod register;

pub use command::Command;
pub use config::{parse_uint, LcdConfig};
pub use cursor::Cursor;
pub use ddram::{DisplayBuffer, MAX_COLS, MAX_ROWS, ROW_BASE_ADDRESSES};
pub use device::{CommandSpec, DeviceType, Dlcd, COMMANDS, DLCD};
pub use host::{DeviceTable, PhysicalRange, PhysicalSpace, PHYS_ADDRESS_LIMIT};
pub use lcd::{Hd44780, Hd44780State, LcdStats};
pub use lcd_text::{decode_display_text, render_frame, FrameCapture, FrameSink, StdoutSink};
pub use register::{
    strobe, RegisterFile, RegisterLatch, CONTROL_E, CONTROL_RS, CONTROL_RW, REGISTER_CONTROL,
    REGISTER_DATA, REGISTER_LIMIT,
};

pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("number of {what} ({value}) must be between 1 and {max}")]
    Geometry {
        what: &'static str,
        value: u64,
        max: usize,
    },
    #[error("physical memory address {0:#x} of data register is out of range")]
    AddressOutOfRange(u64),
    #[error("invalid address {0:#x}, registers would exceed the physical memory range")]
    RegisterBlockOverflow(u64),
    #[error("missing parameter <{0}>")]
    MissingParameter(&'static str),
    #[error("invalid {name} parameter {value:?}")]
    InvalidParameter { name: &'static str, value: String },
    #[error("unexpected parameter {0:?}")]
    UnexpectedParameter(String),
    #[error("unknown command {0:?}")]
    UnknownCommand(String),
    #[error("device {0:?} already exists")]
    DuplicateDevice(String),
    #[error("serialize error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("snapshot error: {0}")]
    InvalidSnapshot(String),
}
