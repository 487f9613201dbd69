use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser};
use dlcd_core::{
    parse_uint, Dlcd, FrameCapture, FrameSink, LcdConfig, PhysicalRange, StdoutSink, DLCD,
    PHYS_ADDRESS_LIMIT,
};
use log::{LevelFilter, Log, Metadata, Record};
use serde::Deserialize;
use std::env;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "dlcd")]
#[command(about = "Drive an HD44780 LCD model through its register block", long_about = None)]
struct Args {
    /// Device name
    #[arg(long, default_value = "lcd")]
    name: String,

    /// Number of rows (1-4)
    #[arg(long, default_value_t = 2)]
    rows: usize,

    /// Number of columns (1-40)
    #[arg(long, default_value_t = 16)]
    cols: usize,

    /// Physical address of the data register (decimal or 0x hex)
    #[arg(long, default_value = "0x10000000", value_parser = parse_address)]
    address: u64,

    /// Size of the physical address space
    #[arg(long, default_value_t = PHYS_ADDRESS_LIMIT, value_parser = parse_address)]
    phys_limit: u64,

    /// JSON script of register writes; reads stdin when omitted or "-"
    #[arg(long, value_name = "PATH")]
    script: Option<PathBuf>,

    /// Print the register addresses and exit
    #[arg(long, action = ArgAction::SetTrue)]
    info: bool,

    /// Print the device command help and exit
    #[arg(long, action = ArgAction::SetTrue)]
    describe: bool,

    /// Only print the frame left after the whole script ran
    #[arg(long, action = ArgAction::SetTrue)]
    final_only: bool,

    /// Log register traffic to stderr (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn parse_address(raw: &str) -> std::result::Result<u64, String> {
    parse_uint(raw).ok_or_else(|| format!("invalid address {raw:?}"))
}

/// One step of a register script.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Step {
    /// Raw 32-bit physical write.
    Write { addr: u64, value: u32 },
    /// Instruction byte clocked in with a full E strobe.
    Command(u8),
    /// Data byte clocked in with a full E strobe.
    Data(u8),
    Text(String),
}

struct StderrLogger;

static LOGGER: StderrLogger = StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

// DLCD_DEBUG=trace enables trace output, any other value debug.
fn log_level(verbose: u8, env_switch: Option<&str>) -> LevelFilter {
    let from_env = match env_switch {
        Some("trace") => 2,
        Some(_) => 1,
        None => 0,
    };
    match verbose.max(from_env) {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn init_logging(verbose: u8) {
    let level = log_level(verbose, env::var("DLCD_DEBUG").ok().as_deref());
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

fn load_script(path: Option<&PathBuf>) -> Result<Vec<Step>> {
    let raw = match path {
        Some(path) if path.as_os_str() != "-" => fs::read_to_string(path)
            .with_context(|| format!("failed to read script {}", path.display()))?,
        _ => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read script from stdin")?;
            buffer
        }
    };
    serde_json::from_str(&raw).context("script must be a JSON array of steps")
}

fn run_script<S: FrameSink>(device: &mut Dlcd<S>, steps: &[Step]) {
    let base = device.base_address();
    for step in steps {
        match step {
            Step::Write { addr, value } => device.write32(0, *addr, *value),
            Step::Command(cmd) => device.send_command(*cmd),
            Step::Data(byte) => device.send_data(*byte),
            Step::Text(text) => device.send_text(text),
        }
    }
    log::debug!("script finished for device at 0x{base:X}");
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    if args.describe {
        print!("{}", DLCD.help(None)?);
        for command in DLCD.commands {
            print!("\n{}", DLCD.help(Some(command.name))?);
        }
        return Ok(());
    }

    let space = PhysicalRange::new(args.phys_limit);
    let config = LcdConfig::new(args.name.clone(), args.rows, args.cols, args.address);
    if args.info {
        let device = Dlcd::new(config, &space, StdoutSink)
            .with_context(|| format!("failed to initialise {}", args.name))?;
        print!("{}", device.info());
        device.done();
        return Ok(());
    }

    let steps = load_script(args.script.as_ref())?;
    if steps.is_empty() {
        bail!("script has no steps");
    }

    // Intermediate frames are kept off stdout when only the last one is wanted.
    let sink: Box<dyn FrameSink> = if args.final_only {
        Box::new(FrameCapture::new())
    } else {
        Box::new(StdoutSink)
    };
    let mut device = Dlcd::new(config, &space, sink)
        .with_context(|| format!("failed to initialise {}", args.name))?;
    run_script(&mut device, &steps);
    if args.final_only {
        print!("{}", device.render());
        let stats = device.stats();
        eprintln!(
            "{} instruction(s), {} data write(s), {} ignored, {} frame(s)",
            stats.instruction_count, stats.data_write_count, stats.ignored_count, stats.frame_count
        );
    }
    device.done();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_and_env_switch_pick_the_higher_level() {
        assert_eq!(log_level(0, None), LevelFilter::Warn);
        assert_eq!(log_level(1, None), LevelFilter::Debug);
        assert_eq!(log_level(3, None), LevelFilter::Trace);
        assert_eq!(log_level(0, Some("1")), LevelFilter::Debug);
        assert_eq!(log_level(0, Some("trace")), LevelFilter::Trace);
        assert_eq!(log_level(2, Some("1")), LevelFilter::Trace);
    }

    #[test]
    fn static_logger_installs_with_requested_level() {
        init_logging(2);
        assert_eq!(log::max_level(), LevelFilter::Trace);
        let metadata = Metadata::builder().level(log::Level::Trace).build();
        assert!(LOGGER.enabled(&metadata));
    }

    #[test]
    fn script_steps_parse_from_json() {
        let steps: Vec<Step> = serde_json::from_str(
            r#"[{"command": 12}, {"text": "hi"}, {"data": 33},
                {"write": {"addr": 4096, "value": 4}}]"#,
        )
        .expect("valid script");
        assert_eq!(steps.len(), 4);
        assert!(matches!(steps[0], Step::Command(0x0C)));
        assert!(matches!(&steps[1], Step::Text(text) if text == "hi"));
        assert!(matches!(steps[3], Step::Write { addr: 0x1000, value: 4 }));
    }

    #[test]
    fn boxed_sink_runs_a_script() {
        let sink: Box<dyn FrameSink> = Box::new(FrameCapture::new());
        let config = LcdConfig::new("cli", 1, 8, 0x1000);
        let mut device =
            Dlcd::new(config, &PhysicalRange::default(), sink).expect("valid device");
        let steps = [Step::Command(0x0C), Step::Text("ok".to_string())];
        run_script(&mut device, &steps);
        assert_eq!(device.text_lines(), vec!["ok"]);
        assert_eq!(device.stats().frame_count, 3);
    }
}
