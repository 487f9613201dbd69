use crate::command::Command;
use crate::config::LcdConfig;
use crate::ddram::ddram_address;
use crate::host::PhysicalSpace;
use crate::lcd::{Hd44780, LcdStats};
use crate::lcd_text::{decode_display_text, render_frame, FrameSink, StdoutSink};
use crate::register::{
    strobe, RegisterFile, RegisterLatch, REGISTER_CONTROL, REGISTER_DATA, REGISTER_LIMIT,
};
use crate::{CoreError, Result};
use log::{debug, trace};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Str,
    Int,
}

#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub required: bool,
    pub kind: ParamKind,
    pub name: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct CommandSpec {
    pub name: &'static str,
    pub brief: &'static str,
    pub full: &'static str,
    pub params: &'static [ParamSpec],
}

impl CommandSpec {
    pub fn usage(&self) -> String {
        let mut line = self.name.to_string();
        for param in self.params {
            if param.required {
                line.push_str(&format!(" <{}>", param.name));
            } else {
                line.push_str(&format!(" [{}]", param.name));
            }
        }
        line
    }
}

/// Static description of the device type, as registered with the simulator.
#[derive(Debug, Clone, Copy)]
pub struct DeviceType {
    pub name: &'static str,
    pub brief: &'static str,
    pub full: &'static str,
    /// The model is a pure function of its register writes, so replay is exact.
    pub nondet: bool,
    pub commands: &'static [CommandSpec],
}

const INIT_PARAMS: [ParamSpec; 4] = [
    ParamSpec {
        required: true,
        kind: ParamKind::Str,
        name: "name",
        description: "lcd name",
    },
    ParamSpec {
        required: true,
        kind: ParamKind::Int,
        name: "rows",
        description: "number of rows",
    },
    ParamSpec {
        required: true,
        kind: ParamKind::Int,
        name: "columns",
        description: "number of columns",
    },
    ParamSpec {
        required: true,
        kind: ParamKind::Int,
        name: "register",
        description: "address of the register",
    },
];

const HELP_PARAMS: [ParamSpec; 1] = [ParamSpec {
    required: false,
    kind: ParamKind::Str,
    name: "cmd",
    description: "command name",
}];

pub const COMMANDS: [CommandSpec; 3] = [
    CommandSpec {
        name: "init",
        brief: "Initialization",
        full: "Initialization",
        params: &INIT_PARAMS,
    },
    CommandSpec {
        name: "help",
        brief: "Display this help text",
        full: "Display this help text",
        params: &HELP_PARAMS,
    },
    CommandSpec {
        name: "info",
        brief: "Display LCD state and configuration",
        full: "Display LCD state and configuration",
        params: &[],
    },
];

pub const DLCD: DeviceType = DeviceType {
    name: "dlcd",
    brief: "LCD and shift register module simulation",
    full: "LCD and shift register module simulation",
    nondet: false,
    commands: &COMMANDS,
};

impl DeviceType {
    pub fn command(&self, name: &str) -> Option<&'static CommandSpec> {
        self.commands.iter().find(|cmd| cmd.name == name)
    }

    /// Generic help: every command with its brief, or one command in full.
    pub fn help(&self, cmd: Option<&str>) -> Result<String> {
        match cmd {
            None => {
                let width = self.commands.iter().map(|c| c.name.len()).max().unwrap_or(0);
                let mut text = format!("[{}] {}\n", self.name, self.brief);
                for command in self.commands {
                    text.push_str(&format!(
                        "  {:<width$}  {}\n",
                        command.name,
                        command.brief,
                        width = width
                    ));
                }
                Ok(text)
            }
            Some(name) => {
                let command = self
                    .command(name)
                    .ok_or_else(|| CoreError::UnknownCommand(name.to_string()))?;
                let mut text = format!("{}\n  {}\n", command.usage(), command.full);
                for param in command.params {
                    let kind = match param.kind {
                        ParamKind::Str => "string",
                        ParamKind::Int => "integer",
                    };
                    text.push_str(&format!(
                        "  {:<10} {:<8} {}\n",
                        param.name, kind, param.description
                    ));
                }
                Ok(text)
            }
        }
    }
}

#[derive(Deserialize)]
struct RegisterSnapshot {
    current: RegisterLatch,
    previous: RegisterLatch,
}

/// One attached LCD: configuration, register latches, controller, and the
/// sink that receives rendered frames.
pub struct Dlcd<S = StdoutSink> {
    config: LcdConfig,
    registers: RegisterFile,
    lcd: Hd44780,
    sink: S,
    frame_count: u32,
}

impl Dlcd<StdoutSink> {
    /// `init` with frames printed to stdout.
    pub fn init<T: AsRef<str>>(tokens: &[T], space: &dyn PhysicalSpace) -> Result<Self> {
        Self::init_with_sink(tokens, space, StdoutSink)
    }
}

impl<S: FrameSink> Dlcd<S> {
    pub fn init_with_sink<T: AsRef<str>>(
        tokens: &[T],
        space: &dyn PhysicalSpace,
        sink: S,
    ) -> Result<Self> {
        Self::new(LcdConfig::from_tokens(tokens)?, space, sink)
    }

    pub fn new(config: LcdConfig, space: &dyn PhysicalSpace, sink: S) -> Result<Self> {
        config.validate(space)?;
        let lcd = Hd44780::new(config.rows, config.cols)?;
        debug!(
            "[dlcd] {} attached: {}x{} at 0x{:X}",
            config.name, config.rows, config.cols, config.address
        );
        Ok(Self {
            config,
            registers: RegisterFile::default(),
            lcd,
            sink,
            frame_count: 0,
        })
    }

    pub fn device_type(&self) -> &'static DeviceType {
        &DLCD
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &LcdConfig {
        &self.config
    }

    pub fn base_address(&self) -> u64 {
        self.config.address
    }

    pub fn registers(&self) -> &RegisterFile {
        &self.registers
    }

    pub fn lcd(&self) -> &Hd44780 {
        &self.lcd
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Bus entry point for 32-bit physical writes.
    pub fn write32(&mut self, procno: u32, address: u64, value: u32) {
        let Some(offset) = address
            .checked_sub(self.config.address)
            .filter(|&offset| offset < REGISTER_LIMIT)
        else {
            return;
        };
        trace!(
            "[dlcd] cpu{procno} {} write 0x{address:X} (+{offset}) = 0x{value:08X}",
            self.config.name
        );
        self.write(offset, value);
    }

    /// Register write at `offset` from the block base.
    pub fn write(&mut self, offset: u64, value: u32) {
        if let Some(latch) = self.registers.write(offset, value) {
            if self.lcd.execute(latch) {
                self.refresh();
            }
        }
    }

    fn refresh(&mut self) {
        let frame = render_frame(&self.lcd);
        self.frame_count = self.frame_count.wrapping_add(1);
        self.sink.emit(&frame);
    }

    pub fn send_command(&mut self, cmd: u8) {
        for (offset, value) in strobe(false, cmd) {
            self.write(offset, value);
        }
    }

    pub fn send_data(&mut self, byte: u8) {
        for (offset, value) in strobe(true, byte) {
            self.write(offset, value);
        }
    }

    pub fn send_text(&mut self, text: &str) {
        for byte in text.bytes() {
            self.send_data(byte);
        }
    }

    pub fn apply(&mut self, command: Command) {
        self.send_command(command.to_byte());
    }

    /// Issues Set DDRAM Address for `(row, col)`. Returns false when the cell
    /// has no DDRAM address, in which case nothing is sent.
    pub fn move_to(&mut self, row: usize, col: usize) -> bool {
        match ddram_address(row, col) {
            Some(addr) => {
                self.apply(Command::SetDdramAddress(addr));
                true
            }
            None => false,
        }
    }

    /// `info` command output.
    pub fn info(&self) -> String {
        format!(
            "[data register]\n{:#11x}\n[control register]\n{:#11x}\n",
            self.config.address + REGISTER_DATA,
            self.config.address + REGISTER_CONTROL
        )
    }

    pub fn help(&self, cmd: Option<&str>) -> Result<String> {
        DLCD.help(cmd)
    }

    /// Runs a post-construction device command (`help`, `info`).
    pub fn command(&self, line: &str) -> Result<String> {
        let mut words = line.split_whitespace();
        match words.next() {
            Some("help") => self.help(words.next()),
            Some("info") => Ok(self.info()),
            Some(other) => Err(CoreError::UnknownCommand(other.to_string())),
            None => Err(CoreError::MissingParameter("cmd")),
        }
    }

    pub fn render(&self) -> String {
        render_frame(&self.lcd)
    }

    pub fn text_lines(&self) -> Vec<String> {
        decode_display_text(&self.lcd)
    }

    pub fn stats(&self) -> LcdStats {
        LcdStats {
            frame_count: self.frame_count,
            ..self.lcd.stats()
        }
    }

    pub fn export_snapshot(&self) -> (Value, Vec<u8>) {
        let (mut meta, ddram) = self.lcd.export_snapshot();
        if let Some(obj) = meta.as_object_mut() {
            obj.insert("name".to_string(), Value::from(self.config.name.clone()));
            obj.insert("address".to_string(), Value::from(self.config.address));
            obj.insert("frame_count".to_string(), Value::from(self.frame_count));
            obj.insert(
                "registers".to_string(),
                json!({
                    "current": self.registers.current,
                    "previous": self.registers.previous,
                }),
            );
        }
        (meta, ddram)
    }

    pub fn load_snapshot(&mut self, metadata: &Value, ddram: &[u8]) -> Result<()> {
        let registers = match metadata.get("registers") {
            Some(value) => Some(RegisterSnapshot::deserialize(value)?),
            None => None,
        };
        let frame_count = match metadata.get("frame_count") {
            Some(value) => value
                .as_u64()
                .and_then(|count| u32::try_from(count).ok())
                .ok_or_else(|| {
                    CoreError::InvalidSnapshot(format!("frame_count {value} is not a u32"))
                })?,
            None => 0,
        };
        self.lcd.load_snapshot(metadata, ddram)?;
        if let Some(registers) = registers {
            self.registers.current = registers.current;
            self.registers.previous = registers.previous;
        }
        self.frame_count = frame_count;
        Ok(())
    }

    /// Teardown hook. Releases the controller and hands the sink back.
    pub fn done(self) -> S {
        debug!("[dlcd] {} detached", self.config.name);
        self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::PhysicalRange;
    use crate::lcd_text::FrameCapture;

    fn device(rows: usize, cols: usize) -> Dlcd<FrameCapture> {
        Dlcd::new(
            LcdConfig::new("lcd", rows, cols, 0x1000),
            &PhysicalRange::default(),
            FrameCapture::new(),
        )
        .expect("valid device")
    }

    #[test]
    fn device_type_is_deterministic_dlcd() {
        assert_eq!(DLCD.name, "dlcd");
        assert!(!DLCD.nondet);
        assert_eq!(
            DLCD.commands.iter().map(|c| c.name).collect::<Vec<_>>(),
            vec!["init", "help", "info"]
        );
    }

    #[test]
    fn info_reports_both_register_addresses() {
        let lcd = device(2, 16);
        assert_eq!(
            lcd.info(),
            "[data register]\n     0x1000\n[control register]\n     0x1001\n"
        );
    }

    #[test]
    fn help_lists_commands_and_details_one() {
        let lcd = device(2, 16);
        let all = lcd.help(None).expect("help");
        assert!(all.contains("info  Display LCD state and configuration"));
        let init = lcd.help(Some("init")).expect("help init");
        assert!(init.starts_with("init <name> <rows> <columns> <register>\n"));
        assert!(matches!(
            lcd.help(Some("reset")),
            Err(CoreError::UnknownCommand(_))
        ));
        assert_eq!(lcd.command("info").expect("info"), lcd.info());
        assert!(lcd.command("help help").expect("help help").starts_with("help [cmd]"));
    }

    #[test]
    fn writes_below_base_are_ignored() {
        let mut lcd = device(1, 8);
        lcd.write32(0, 0x0FFF, 0x41);
        lcd.write32(0, 0x1000 - 1, 0x04);
        assert_eq!(lcd.registers(), &RegisterFile::default());
    }

    #[test]
    fn one_frame_per_display_update() {
        let mut lcd = device(1, 8);
        lcd.apply(Command::DisplayControl { display_on: true });
        lcd.send_text("ok");
        lcd.apply(Command::ReturnHome);
        lcd.apply(Command::EntryMode { increment: true });
        assert_eq!(lcd.sink().len(), 3);
        assert_eq!(lcd.stats().frame_count, 3);
        assert_eq!(lcd.sink().last(), Some("┌────────┐\n│ok      │\n└────────┘\n"));
    }

    #[test]
    fn move_to_addresses_rows() {
        let mut lcd = device(4, 20);
        lcd.apply(Command::FunctionSet { multi_line: true });
        assert!(lcd.move_to(1, 2));
        assert_eq!(lcd.lcd().cursor().row, 1);
        assert_eq!(lcd.lcd().cursor().col, 2);
        // Row 3's base falls inside row 1's window.
        assert!(lcd.move_to(3, 2));
        assert_eq!(lcd.lcd().cursor().row, 1);
        assert_eq!(lcd.lcd().cursor().col, 19);
        assert!(!lcd.move_to(4, 0));
    }

    #[test]
    fn snapshot_carries_latches() {
        let mut lcd = device(2, 16);
        lcd.send_text("hi");
        lcd.write(REGISTER_DATA, 0x55);
        let (meta, ddram) = lcd.export_snapshot();

        let mut restored = device(2, 16);
        restored.load_snapshot(&meta, &ddram).expect("load");
        assert_eq!(restored.registers(), lcd.registers());
        assert_eq!(restored.lcd().buffer(), lcd.lcd().buffer());
        assert_eq!(restored.stats(), lcd.stats());
    }

    #[test]
    fn snapshot_rejects_frame_count_past_u32() {
        let mut lcd = device(2, 16);
        lcd.send_text("hi");
        let (mut meta, ddram) = lcd.export_snapshot();
        meta["frame_count"] = Value::from(u64::from(u32::MAX) + 1);

        let mut restored = device(2, 16);
        assert!(matches!(
            restored.load_snapshot(&meta, &ddram),
            Err(CoreError::InvalidSnapshot(_))
        ));
        assert!(restored.lcd().buffer().is_blank());
        assert_eq!(restored.stats().frame_count, 0);

        meta["frame_count"] = Value::from(u32::MAX);
        restored.load_snapshot(&meta, &ddram).expect("max u32 fits");
        assert_eq!(restored.stats().frame_count, u32::MAX);
    }

    #[test]
    fn snapshot_exports_both_latches() {
        let mut lcd = device(1, 8);
        lcd.write(REGISTER_DATA, 0x41);
        lcd.write(REGISTER_CONTROL, 0x05);
        let (meta, _) = lcd.export_snapshot();
        assert_eq!(meta["registers"]["current"]["data"], 0x41);
        assert_eq!(meta["registers"]["current"]["enable"], true);
        assert_eq!(meta["registers"]["previous"]["enable"], false);
    }
}
