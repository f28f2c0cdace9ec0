use sunline::register::Value;
use sunline::{Config, Device, Event, Model, RegisterType, AUTO_TRANSFORMER};

use anyhow::{anyhow, bail, Context};
use chrono::Local;
use clap::Parser;
use log::{info, LevelFilter};
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the TOML or JSON configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Serial port, overrides the configuration.
    #[arg(long)]
    port: Option<String>,

    /// Baud rate, overrides the configuration.
    #[arg(long)]
    baud_rate: Option<u32>,

    /// Stage a register value once connected, e.g. `--set DAC_LEVEL=40`.
    #[arg(long = "set", value_name = "NAME=VALUE")]
    set: Vec<String>,

    /// Print the available serial ports and exit.
    #[arg(long, default_value_t = false)]
    list_ports: bool,

    /// Switch on verbose output.
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

fn parse_assignment(s: &str) -> anyhow::Result<(&str, Value)> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| anyhow!("Expected NAME=VALUE, got {s}"))?;
    let value = value
        .trim()
        .parse()
        .with_context(|| format!("Invalid value for {name}"))?;
    Ok((name.trim(), value))
}

/// Reject assignments to registers the model does not have or cannot write.
fn check_assignments(model: &Model, assignments: &[(&str, Value)]) -> anyhow::Result<()> {
    for (name, _) in assignments {
        let definition = model
            .registers
            .iter()
            .find(|d| d.name == *name)
            .ok_or_else(|| anyhow!("Unknown register {name}"))?;
        if !matches!(
            definition.kind,
            RegisterType::Coil | RegisterType::HoldingRegister
        ) {
            bail!("{name} is a {} and cannot be written", definition.kind);
        }
    }
    Ok(())
}

fn timestamp() -> String {
    format!("{}", Local::now().format("[ %d:%m:%Y | %H:%M:%S ]"))
}

fn print_event(event: &Event) {
    match event {
        Event::ErrorReadingRegister(m) | Event::ErrorCommittingRegister(m) => {
            println!("{} ERROR {}", timestamp(), m)
        }
        Event::RegistersCommitted => println!("{} Registers committed", timestamp()),
        Event::RegistersUpdated => {}
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(if args.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .parse_default_env()
        .init();

    if args.list_ports {
        let ports = tokio_serial::available_ports().context("Failed to list serial ports")?;
        for port in ports {
            println!("{}", port.port_name);
        }
        return Ok(());
    }

    let mut config = match &args.config {
        Some(path) => Config::read(path)?,
        None => Config::default(),
    };
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(baud_rate) = args.baud_rate {
        config.baud_rate = baud_rate;
    }
    config.validate()?;

    let assignments = args
        .set
        .iter()
        .map(|s| parse_assignment(s))
        .collect::<anyhow::Result<Vec<_>>>()?;
    check_assignments(&AUTO_TRANSFORMER, &assignments)?;

    let device = Device::connect(&config)
        .await
        .with_context(|| format!("Failed to connect on {}", config.port))?;
    if let Err(e) = device.ping().await {
        device.stop().await;
        bail!("{} does not answer on {}. [{}]", device.model().name, config.port, e);
    }
    info!("{} answers on {}.", device.model().name, config.port);

    let mut events = device.events().subscribe();
    for (name, value) in assignments {
        if let Err(e) = device.stage(name, value) {
            device.stop().await;
            return Err(e.into());
        }
        info!("Staged {name} = {value}.");
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Some(event) => print_event(&event),
                None => break,
            },
        }
    }

    device.stop().await;
    Ok(())
}
