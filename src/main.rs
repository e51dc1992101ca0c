//! sertest - serial link test program
//!
//! Run one node per process. A master fabricates messages and, in a chain,
//! checks them when they come back; slaves verify what they receive and, in
//! a chain, forward it with every byte incremented.

use clap::Parser;
use serial_link_test::core::{MessageLength, Role, Topology};
use serial_link_test::hardware::{open_channels, read_icount};
use serial_link_test::session::{run_session, signals};
use serial_link_test::{LinkError, LinkResult, LinkTestConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = "\
If one device is specified, it is used for bidirectional communication.
If two devices are specified, the first device is used for output, and
the second device is used for input.

Use \"CTRL-C\" to print transfer statistics, \"CTRL-\\\" to quit.";

/// Accept decimal, 0x-prefixed hex or 0-prefixed octal
fn parse_number(value: &str) -> Result<u32, String> {
    let parsed = if let Some(hex) = value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16)
    } else if value.len() > 1 && value.starts_with('0') {
        u32::from_str_radix(&value[1..], 8)
    } else {
        value.parse()
    };
    parsed.map_err(|e| format!("invalid number '{}': {}", value, e))
}

#[derive(Parser, Debug)]
#[command(name = "sertest")]
#[command(version, about = "Serial link test program", after_help = AFTER_HELP)]
struct Cli {
    /// Device to use (output device when two are given)
    device: String,

    /// Input device
    device2: Option<String>,

    /// Use master mode
    #[arg(long, conflicts_with = "slave")]
    master: bool,

    /// Use slave mode (default)
    #[arg(long)]
    slave: bool,

    /// Master and slave(s) are daisy chained
    #[arg(long)]
    chain: bool,

    /// Only print icount
    #[arg(long)]
    icount: bool,

    /// Initial seed (zero is pseudorandom)
    #[arg(short = 'i', long, value_parser = parse_number)]
    seed: Option<u32>,

    /// Maximum message length (must be <= 4096)
    #[arg(short = 'l', long, value_parser = parse_number)]
    len: Option<u32>,

    /// Send messages of exactly --len bytes
    #[arg(long)]
    fixed_len: bool,

    /// Serial speed
    #[arg(short, long, value_parser = parse_number)]
    speed: Option<u32>,

    /// Stop after this many messages
    #[arg(short, long)]
    count: Option<u64>,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the final statistics as JSON
    #[arg(long)]
    json: bool,

    /// Enable verbose mode
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Layer command line flags over the file (or default) configuration
    fn to_config(&self) -> LinkResult<LinkTestConfig> {
        let mut config = match &self.config {
            Some(path) => LinkTestConfig::from_file(path)?,
            None => LinkTestConfig::default(),
        };

        if self.master {
            config.role = Role::Master;
        } else if self.slave {
            config.role = Role::Slave;
        }
        if self.chain {
            config.topology = Topology::Chain;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(speed) = self.speed {
            config.speed = Some(speed);
        }
        if self.count.is_some() {
            config.message_limit = self.count;
        }

        config.length = match self.len {
            // negative directive: random lengths up to --len
            Some(len) if self.fixed_len => MessageLength::from_directive(i64::from(len))?,
            Some(len) => MessageLength::from_directive(-i64::from(len))?,
            None if self.fixed_len => MessageLength::Fixed(config.length.max()),
            None => config.length,
        };

        if self.device2.is_some() && !config.topology.is_chain() {
            return Err(LinkError::Config("two devices require --chain".to_string()));
        }

        config.validate()?;
        Ok(config)
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "serial_link_test=debug,sertest=debug"
    } else {
        "serial_link_test=info,sertest=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .with_target(false)
        .init();
}

fn run(cli: &Cli) -> LinkResult<()> {
    if cli.icount {
        print!("{}", read_icount(&cli.device)?);
        return Ok(());
    }

    let config = cli.to_config()?;
    let channels = open_channels(
        &cli.device,
        cli.device2.as_deref(),
        config.role,
        config.topology,
        &config.device_config(),
    )?;

    signals::install();
    let report = run_session(config.session_config(), channels)?;

    if cli.json {
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| LinkError::Write(e.into()))?;
        println!("{}", json);
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            ExitCode::from(err.exit_code())
        }
    }
}
