// HD44780 instruction decoding.
//
// Classification walks `OPCODES` in order and the first entry whose masked
// bits match wins. Bytes that match nothing are not instructions this model
// implements (CGRAM addressing, 0x00, 0x03) and decode to `None`.

pub const CMD_CLEAR: u8 = 0x01;
pub const CMD_HOME: u8 = 0x02;
pub const CMD_ENTRY_MODE_BASE: u8 = 0x04;
pub const CMD_DISPLAY_CONTROL_BASE: u8 = 0x08;
pub const CMD_SHIFT_BASE: u8 = 0x10;
pub const CMD_FUNCTION_SET_BASE: u8 = 0x20;
pub const CMD_SET_DDRAM: u8 = 0x80;
pub const DDRAM_ADDR_MASK: u8 = 0x7F;

const ENTRY_INCREMENT: u8 = 0x02;
const DISPLAY_ON: u8 = 0x04;
const SHIFT_DISPLAY: u8 = 0x08;
const SHIFT_RIGHT: u8 = 0x04;
const FUNCTION_MULTI_LINE: u8 = 0x08;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Clear,
    ReturnHome,
    EntryMode { increment: bool },
    DisplayControl { display_on: bool },
    FunctionSet { multi_line: bool },
    Shift { display: bool, right: bool },
    SetDdramAddress(u8),
}

struct Opcode {
    mask: u8,
    expected: u8,
    decode: fn(u8) -> Command,
}

const OPCODES: [Opcode; 7] = [
    Opcode {
        mask: 0xFF,
        expected: CMD_CLEAR,
        decode: decode_clear,
    },
    Opcode {
        mask: 0xFF,
        expected: CMD_HOME,
        decode: decode_home,
    },
    Opcode {
        mask: 0xFC,
        expected: CMD_ENTRY_MODE_BASE,
        decode: decode_entry_mode,
    },
    Opcode {
        mask: 0xF8,
        expected: CMD_DISPLAY_CONTROL_BASE,
        decode: decode_display_control,
    },
    Opcode {
        mask: 0xE0,
        expected: CMD_FUNCTION_SET_BASE,
        decode: decode_function_set,
    },
    Opcode {
        mask: 0xF0,
        expected: CMD_SHIFT_BASE,
        decode: decode_shift,
    },
    Opcode {
        mask: CMD_SET_DDRAM,
        expected: CMD_SET_DDRAM,
        decode: decode_set_ddram,
    },
];

fn decode_clear(_: u8) -> Command {
    Command::Clear
}

fn decode_home(_: u8) -> Command {
    Command::ReturnHome
}

fn decode_entry_mode(cmd: u8) -> Command {
    Command::EntryMode {
        increment: cmd & ENTRY_INCREMENT != 0,
    }
}

fn decode_display_control(cmd: u8) -> Command {
    Command::DisplayControl {
        display_on: cmd & DISPLAY_ON != 0,
    }
}

fn decode_function_set(cmd: u8) -> Command {
    Command::FunctionSet {
        multi_line: cmd & FUNCTION_MULTI_LINE != 0,
    }
}

fn decode_shift(cmd: u8) -> Command {
    Command::Shift {
        display: cmd & SHIFT_DISPLAY != 0,
        right: cmd & SHIFT_RIGHT != 0,
    }
}

fn decode_set_ddram(cmd: u8) -> Command {
    Command::SetDdramAddress(cmd & DDRAM_ADDR_MASK)
}

pub fn decode(cmd: u8) -> Option<Command> {
    OPCODES
        .iter()
        .find(|op| cmd & op.mask == op.expected)
        .map(|op| (op.decode)(cmd))
}

impl Command {
    /// Whether executing this command changes what the panel shows.
    /// Cursor-only instructions (home, entry mode, address set) do not.
    pub fn updates_display(self) -> bool {
        matches!(
            self,
            Self::Clear | Self::DisplayControl { .. } | Self::FunctionSet { .. } | Self::Shift { .. }
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Clear => "clear",
            Self::ReturnHome => "home",
            Self::EntryMode { .. } => "entry-mode",
            Self::DisplayControl { .. } => "display-control",
            Self::FunctionSet { .. } => "function-set",
            Self::Shift { .. } => "shift",
            Self::SetDdramAddress(_) => "set-ddram",
        }
    }

    /// Instruction byte a host would send for this command.
    pub fn to_byte(self) -> u8 {
        let flag = |set: bool, bit: u8| if set { bit } else { 0 };
        match self {
            Self::Clear => CMD_CLEAR,
            Self::ReturnHome => CMD_HOME,
            Self::EntryMode { increment } => CMD_ENTRY_MODE_BASE | flag(increment, ENTRY_INCREMENT),
            Self::DisplayControl { display_on } => {
                CMD_DISPLAY_CONTROL_BASE | flag(display_on, DISPLAY_ON)
            }
            Self::FunctionSet { multi_line } => {
                CMD_FUNCTION_SET_BASE | flag(multi_line, FUNCTION_MULTI_LINE)
            }
            Self::Shift { display, right } => {
                CMD_SHIFT_BASE | flag(display, SHIFT_DISPLAY) | flag(right, SHIFT_RIGHT)
            }
            Self::SetDdramAddress(addr) => CMD_SET_DDRAM | (addr & DDRAM_ADDR_MASK),
        }
    }
}
