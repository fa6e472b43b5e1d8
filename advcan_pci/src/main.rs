//! # Advcan PCI Binder CLI
//!
//! Exercises the adapter binding manager against the simulated bus and
//! controller subsystem.
//!
//! # Usage
//!
//! ```bash
//! # List supported boards
//! advcan_pci --list
//!
//! # Bind one simulated MIOe-3680
//! advcan_pci --device 0xc302
//!
//! # Bind the devices described in a scenario file
//! advcan_pci --scenario scenario.toml
//!
//! # Verbose logging
//! advcan_pci --device 0xc302 -v
//! ```

#![deny(warnings)]

use advcan_common::can::profile;
use advcan_pci::core::CardBinder;
use advcan_pci::scenario::{DeviceSpec, Scenario};
use advcan_pci::sim::EventLog;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

/// Advcan PCI binder - bind simulated Advantech CAN cards
#[derive(Parser, Debug)]
#[command(name = "advcan_pci")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "PCI adapter binding manager for multi-port Advantech CAN cards")]
#[command(long_about = None)]
struct Args {
    /// List supported boards and exit
    #[arg(short, long)]
    list: bool,

    /// Bind one simulated device with this PCI device ID (hex, e.g. 0xc302)
    #[arg(short, long, value_parser = parse_device_id)]
    device: Option<u16>,

    /// Path to a scenario TOML describing simulated devices
    #[arg(long, value_name = "FILE")]
    scenario: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = run() {
        error!("binder run failed: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    setup_tracing(&args);

    if args.list {
        list_boards();
        return Ok(());
    }

    let devices: Vec<DeviceSpec> = if let Some(ref path) = args.scenario {
        info!("Loading scenario from {:?}", path);
        Scenario::load(path)?.devices
    } else if let Some(device_id) = args.device {
        vec![DeviceSpec {
            device_id,
            irq: None,
            fail_reserve: Vec::new(),
            fail_map: Vec::new(),
            fail_msi: false,
            fail_register_port: None,
            fail_create_call: None,
        }]
    } else {
        return Err("nothing to do: pass --list, --device or --scenario".into());
    };

    let mut failures = 0usize;
    for spec in &devices {
        if !bind_one(spec) {
            failures += 1;
        }
    }

    if failures > 0 {
        return Err(format!("{failures} of {} device(s) failed to bind", devices.len()).into());
    }
    Ok(())
}

/// Bind one simulated device, report, then remove it again.
fn bind_one(spec: &DeviceSpec) -> bool {
    let log = Arc::new(EventLog::default());
    let (bus, subsystem) = spec.build(log);

    let mut binder = CardBinder::new(bus, subsystem);
    match binder.bind() {
        Ok(()) => {
            let ports = binder.context().map(|c| c.bound_ports()).unwrap_or(0);
            println!("device {:#06x}: bound {} port(s)", spec.device_id, ports);
            binder.remove();
            true
        }
        Err(e) => {
            println!("device {:#06x}: bind failed: {e}", spec.device_id);
            false
        }
    }
}

/// Print the board profile table.
fn list_boards() {
    println!("supported boards:");
    for board in profile::supported() {
        let layout = match &board.access {
            profile::AccessStrategy::MemoryMapped { bar, stride } => {
                format!("memory-mapped, BAR {bar}, stride {stride:#x}")
            }
            profile::AccessStrategy::PortAddressed { bars } => {
                format!("port-addressed, BARs {bars:?}")
            }
        };
        println!(
            "  {:#06x}  {:<20} {} port(s), {}",
            board.device_id, board.name, board.ports, layout
        );
    }
}

/// Parse a PCI device ID given as hex, with or without `0x`.
fn parse_device_id(s: &str) -> Result<u16, String> {
    let digits = s.trim_start_matches("0x").trim_start_matches("0X");
    u16::from_str_radix(digits, 16).map_err(|e| format!("invalid device id '{s}': {e}"))
}

/// Setup tracing subscriber based on CLI arguments.
fn setup_tracing(args: &Args) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
