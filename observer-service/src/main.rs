use std::{
    fmt,
    io::{BufRead, BufReader},
    path::PathBuf,
    str::FromStr,
    thread,
    time::Duration,
};

use anyhow::Context;
use clap::Parser;
use lazy_static::lazy_static;
use regex::Regex;
use serialport::SerialPort;

mod config;

use crate::config::{Config, RawConfig, Serial};

/// Pause before reopening a serial port that went away
const RECONNECT_DELAY: Duration = Duration::from_secs(2);

#[derive(Parser, Debug)]
#[command(about, version)]
struct Args {
    /// Path to config file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,
}

fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Parse config
    let raw_config = match RawConfig::load(&args.config) {
        Ok(val) => val,
        Err(e) => {
            println!("Error: Failed to load config: {:#}", e);
            println!();
            println!(
                "Example config:\n\n{}",
                toml::to_string(&RawConfig::example())?
            );
            return Ok(());
        }
    };
    let config: Config = raw_config.try_into()?;

    // Connect to serial device
    let mut port = open_port(&config.serial)?;

    // Main loop
    let mut observer = Observer::new(config.monitor.max_valid_distance_cm);
    let mut line_buffer = String::new();
    loop {
        match port.read_line(&mut line_buffer) {
            Ok(0) => {
                // End of input, the USB device went away
                eprintln!("Serial port closed, reconnecting");
                observer.disconnected();
                port = reopen_port(&config.serial);
            }
            Ok(_size) => {
                if let Some(notice) =
                    parse_line(line_buffer.trim()).and_then(|e| observer.process(e))
                {
                    println!("{}", notice);
                }
            }
            Err(e) => eprintln!("Error while reading: {}", e),
        }
        line_buffer.clear();
    }
}

/// Open the serial port with buffered reading.
fn open_port(serial: &Serial) -> anyhow::Result<BufReader<Box<dyn SerialPort>>> {
    let port_name = serial
        .port
        .to_str()
        .context("Serial port path is not valid UTF-8")?;
    let raw_port = serialport::new(port_name, serial.baudrate)
        .timeout(Duration::from_secs(30))
        .open()
        .context(format!("Failed to open serial port at {:?}", serial.port))?;
    Ok(BufReader::new(raw_port))
}

/// Retry opening the serial port until it succeeds.
fn reopen_port(serial: &Serial) -> BufReader<Box<dyn SerialPort>> {
    loop {
        thread::sleep(RECONNECT_DELAY);
        match open_port(serial) {
            Ok(port) => return port,
            Err(e) => eprintln!("Error: {:#}", e),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PowerState {
    On,
    Off,
}

impl FromStr for PowerState {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ON" => Ok(Self::On),
            "OFF" => Ok(Self::Off),
            other => anyhow::bail!("Unknown power state: {:?}", other),
        }
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::On => write!(f, "ON"),
            Self::Off => write!(f, "OFF"),
        }
    }
}

#[derive(Debug, PartialEq)]
enum Event {
    Update { state: PowerState, distance_cm: u32 },
    Transition { from: PowerState, to: PowerState },
}

/// Parse a status line sent by the firmware
fn parse_line(line: &str) -> Option<Event> {
    // Patterns
    lazy_static! {
        static ref UPDATE_RE: Regex =
            Regex::new(r#"^State: (?P<state>ON|OFF); Distance\[cm\]: (?P<distance>[0-9]+)$"#)
                .unwrap();
        static ref TRANSITION_RE: Regex =
            Regex::new("^:: State transition: (?P<from>ON|OFF) -> (?P<to>ON|OFF)$").unwrap();
    }

    // Check for matches
    if let Some(capture) = UPDATE_RE.captures(line) {
        return Some(Event::Update {
            state: capture["state"].parse().ok()?,
            distance_cm: capture["distance"].parse().ok()?,
        });
    }
    if let Some(capture) = TRANSITION_RE.captures(line) {
        return Some(Event::Transition {
            from: capture["from"].parse().ok()?,
            to: capture["to"].parse().ok()?,
        });
    }

    // No match
    None
}

/// Something worth telling the user about.
#[derive(Debug, PartialEq)]
enum Notice {
    /// First status line after startup
    Connected { state: PowerState },
    /// The firmware switched the power
    Transition {
        from: PowerState,
        to: PowerState,
        invalid_readings: u64,
        readings: u64,
    },
    /// The state changed without a transition line, e.g. after a device reset
    Resynced { from: PowerState, to: PowerState },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connected { state } => write!(f, "Connected, power is {}", state),
            Self::Transition {
                from,
                to,
                invalid_readings,
                readings,
            } => write!(
                f,
                "Power switched {} -> {} ({} of {} readings invalid since last switch)",
                from, to, invalid_readings, readings
            ),
            Self::Resynced { from, to } => {
                write!(f, "Power state changed unannounced {} -> {}", from, to)
            }
        }
    }
}

/// Follows the status lines and keeps track of the power state.
struct Observer {
    max_valid_distance_cm: u32,
    state: Option<PowerState>,
    readings: u64,
    invalid_readings: u64,
}

impl Observer {
    fn new(max_valid_distance_cm: u32) -> Self {
        Self {
            max_valid_distance_cm,
            state: None,
            readings: 0,
            invalid_readings: 0,
        }
    }

    /// Forget the power state, the device may have restarted meanwhile.
    fn disconnected(&mut self) {
        self.state = None;
    }

    fn process(&mut self, event: Event) -> Option<Notice> {
        match event {
            Event::Update { state, distance_cm } => {
                self.readings += 1;
                if distance_cm == 0 || distance_cm >= self.max_valid_distance_cm {
                    self.invalid_readings += 1;
                }
                let previous = self.state.replace(state);
                match previous {
                    None => Some(Notice::Connected { state }),
                    Some(from) if from != state => Some(Notice::Resynced { from, to: state }),
                    Some(_) => None,
                }
            }
            Event::Transition { from, to } => {
                self.state = Some(to);
                let notice = Notice::Transition {
                    from,
                    to,
                    invalid_readings: self.invalid_readings,
                    readings: self.readings,
                };
                self.readings = 0;
                self.invalid_readings = 0;
                Some(notice)
            }
        }
    }
}
