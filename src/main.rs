//! Host binary: runs the light against the simulated stack with a console
//! on stdin standing in for a controller.
//!
//! Usage:
//!   cargo run -- --gpio 8
//!   cargo run -- --active-low --storage-dir /tmp/light

use clap::Parser;
use log::{error, info};
use matter_gpio_light::config::{self, Config};
use matter_gpio_light::device::SimulatedPin;
use matter_gpio_light::matter::simulated::SimulatedStack;
use matter_gpio_light::matter::simulated::console::Console;
use matter_gpio_light::storage::FileStorage;
use matter_gpio_light::{Bootstrap, LightError};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::io::BufReader;
use tokio::runtime::Runtime;
use tokio::signal;

#[derive(Parser)]
#[command(name = "matter-gpio-light")]
#[command(about = "GPIO LED exposed as a Matter On/Off Light")]
struct Cli {
    /// GPIO number of the LED (overrides LED_GPIO)
    #[arg(long)]
    gpio: Option<u8>,

    /// LED lights when the line is driven low (overrides LED_ACTIVE_LOW)
    #[arg(long)]
    active_low: bool,

    /// Directory of the configuration store (overrides STORAGE_DIR)
    #[arg(long)]
    storage_dir: Option<PathBuf>,

    /// Do not read console commands from stdin
    #[arg(long)]
    no_console: bool,
}

fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

fn load_config(cli: &Cli) -> Result<Config, LightError> {
    let mut config = Config::from_env();
    if let Some(gpio) = cli.gpio {
        config.led.gpio = gpio;
    }
    if cli.active_low {
        config.led.active_low = true;
    }
    if let Some(dir) = &cli.storage_dir {
        config.storage.dir = dir.clone();
    }
    config.validate()?;
    Ok(config)
}

fn main() -> ExitCode {
    // Environment is only written here, before any runtime thread exists.
    let dotenv_vars = config::load_dotenv();
    let cli = Cli::parse();
    init_logger();
    info!("Starting matter-gpio-light");
    if dotenv_vars > 0 {
        info!("Loaded {} variable(s) from .env", dotenv_vars);
    }

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    info!("Configuration loaded:");
    info!("  Device Name: {}", config.matter.device_name);
    info!(
        "  LED: GPIO{}{}",
        config.led.gpio,
        if config.led.active_low { " (active low)" } else { "" }
    );
    info!("  Storage: {}", config.storage.dir.display());

    let runtime = match Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };
    runtime.block_on(run(config, cli.no_console))
}

async fn run(config: Config, no_console: bool) -> ExitCode {
    let stack = SimulatedStack::new();
    let mut bootstrap = Bootstrap::new(
        config.clone(),
        FileStorage::new(config.storage.dir.clone()),
        SimulatedPin::new(config.led.gpio),
        stack.clone(),
        tokio::runtime::Handle::current(),
    );
    let device = match bootstrap.run() {
        Ok(device) => device,
        Err(e) => {
            error!("Startup failed at stage {}: {}", bootstrap.stage(), e);
            return ExitCode::FAILURE;
        }
    };

    info!("matter-gpio-light is running");
    info!("  - Press Ctrl+C to exit");

    if no_console {
        wait_for_shutdown().await;
    } else {
        let console = Console::new(stack, device.endpoint.id, device.driver.clone());
        info!("  - Type 'help' for console commands");
        tokio::select! {
            result = console.run(BufReader::new(tokio::io::stdin())) => {
                if let Err(e) = result {
                    error!("Console failed: {}", e);
                }
            }
            _ = wait_for_shutdown() => {}
        }
    }

    device.shutdown();
    info!("matter-gpio-light stopped");
    ExitCode::SUCCESS
}

async fn wait_for_shutdown() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Received shutdown signal"),
        Err(e) => error!("Failed to listen for shutdown signal: {}", e),
    }
}
