// Register block of the LCD as seen from the host bus.
//
// Offset 0 holds the pending data/command byte, offset 1 drives the control
// lines. The controller samples on the falling edge of E, so the host sends
// one byte as: data, control with E high, control with E low.

use serde::{Deserialize, Serialize};

pub const REGISTER_DATA: u64 = 0;
pub const REGISTER_CONTROL: u64 = 1;
/// Size of the register block in the physical address space.
pub const REGISTER_LIMIT: u64 = 4;

pub const CONTROL_RS: u32 = 1 << 0;
pub const CONTROL_RW: u32 = 1 << 1;
pub const CONTROL_E: u32 = 1 << 2;

/// Snapshot of the control lines and the latched data byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterLatch {
    /// Register select: data when set, instruction when clear.
    pub rs: bool,
    pub rw: bool,
    pub enable: bool,
    pub data: u8,
}

impl RegisterLatch {
    /// Control register value reproducing these control lines.
    pub fn control_bits(&self) -> u32 {
        let mut value = 0;
        if self.rs {
            value |= CONTROL_RS;
        }
        if self.rw {
            value |= CONTROL_RW;
        }
        if self.enable {
            value |= CONTROL_E;
        }
        value
    }
}

/// Register access decoded from a bus offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterAccess {
    Data(u8),
    Control { rs: bool, rw: bool, enable: bool },
}

impl RegisterAccess {
    pub fn decode(offset: u64, value: u32) -> Option<Self> {
        match offset {
            REGISTER_DATA => Some(Self::Data((value & 0xFF) as u8)),
            REGISTER_CONTROL => Some(Self::Control {
                rs: value & CONTROL_RS != 0,
                rw: value & CONTROL_RW != 0,
                enable: value & CONTROL_E != 0,
            }),
            _ => None,
        }
    }
}

/// Current and previous latch; the pair is the whole strobe state machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegisterFile {
    pub current: RegisterLatch,
    pub previous: RegisterLatch,
}

impl RegisterFile {
    /// Applies one register write. Returns the latch to execute when the write
    /// completed an enable strobe (E high in `previous`, low now).
    pub fn write(&mut self, offset: u64, value: u32) -> Option<RegisterLatch> {
        match RegisterAccess::decode(offset, value)? {
            RegisterAccess::Data(byte) => {
                self.current.data = byte;
                None
            }
            RegisterAccess::Control { rs, rw, enable } => {
                self.previous = self.current;
                self.current.rs = rs;
                self.current.rw = rw;
                self.current.enable = enable;
                self.falling_edge().then_some(self.current)
            }
        }
    }

    pub fn falling_edge(&self) -> bool {
        self.previous.enable && !self.current.enable
    }
}

/// The three `(offset, value)` writes that clock one byte into the controller.
pub fn strobe(rs: bool, byte: u8) -> [(u64, u32); 3] {
    let select = if rs { CONTROL_RS } else { 0 };
    [
        (REGISTER_DATA, u32::from(byte)),
        (REGISTER_CONTROL, select | CONTROL_E),
        (REGISTER_CONTROL, select),
    ]
}
