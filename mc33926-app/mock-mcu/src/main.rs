use std::{
    collections::HashMap,
    error::Error,
    path::{Path, PathBuf},
};

use clap::Parser;
use embassy_executor::Executor;
use embassy_futures::yield_now;
use mc33926_core::utils::{
    config::CurrentSenseConfig,
    controllers::EdgeNotifier,
    platform::{PinId, PinIo, PinMode, PinState},
    DriverConfig, MotorDriver, STATUS_CHANNEL,
};
use static_cell::StaticCell;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version = "1.0")]
struct Opts {
    /// JSON channel configuration file
    #[arg(long)]
    config: Option<PathBuf>,
    /// speed commands to replay, comma separated
    #[arg(
        long,
        value_delimiter = ',',
        allow_negative_numbers = true,
        default_values_t = [0, 128, 300, -100, -400, 0]
    )]
    speeds: Vec<i32>,
    /// index of the command at which the simulated driver raises its fault flag
    #[arg(long)]
    fault_at: Option<usize>,
    /// override the configured speed bound
    #[arg(long, allow_negative_numbers = true)]
    max_output: Option<i32>,
}

/// Simulated MCU pin runtime. The current-sense ADC follows the largest
/// duty written so far.
#[derive(Default)]
struct SimBoard {
    modes: HashMap<PinId, PinMode>,
    duties: HashMap<PinId, u32>,
    levels: HashMap<PinId, PinState>,
    notifiers: Vec<EdgeNotifier>,
}

impl SimBoard {
    /// Drive an input pin, firing attached notifiers on a falling edge.
    fn drive(
        &mut self,
        pin: PinId,
        level: PinState,
    ) {
        let previous = self.levels.insert(pin, level).unwrap_or(PinState::High);
        if previous == PinState::High && level == PinState::Low {
            for n in self.notifiers.iter().filter(|n| n.pin() == pin) {
                if !n.notify() {
                    warn!(pin, "status queue full");
                }
            }
        }
    }
}

impl PinIo for SimBoard {
    fn configure_pin_mode(
        &mut self,
        pin: PinId,
        mode: PinMode,
    ) {
        debug!(pin, ?mode, "pin mode");
        self.modes.insert(pin, mode);
    }

    fn write_analog(
        &mut self,
        pin: PinId,
        duty: u32,
    ) {
        if self.modes.get(&pin) != Some(&PinMode::Output) {
            warn!(pin, "write to pin not configured as output");
        }
        self.duties.insert(pin, duty);
    }

    fn read_analog(
        &mut self,
        _pin: PinId,
    ) -> u16 {
        let duty = self.duties.values().copied().max().unwrap_or(0);
        duty.saturating_mul(3).min(1023) as u16
    }

    fn read_digital(
        &mut self,
        pin: PinId,
    ) -> PinState {
        self.levels.get(&pin).copied().unwrap_or(PinState::High)
    }

    fn attach_falling_edge(
        &mut self,
        pin: PinId,
        notifier: EdgeNotifier,
    ) {
        debug!(pin, "falling edge notifier attached");
        self.notifiers.push(notifier);
    }

    fn set_write_resolution(
        &mut self,
        bits: u8,
    ) -> bool {
        info!(bits, "write resolution set");
        true
    }
}

#[embassy_executor::task]
async fn status_task() -> ! {
    loop {
        let event = STATUS_CHANNEL.receiver().receive().await;
        warn!(pin = event.pin, "status flag asserted");
    }
}

#[embassy_executor::task]
async fn replay_task(
    mut driver: MotorDriver<SimBoard>,
    speeds: Vec<i32>,
    fault_at: Option<usize>,
) {
    for (i, &speed) in speeds.iter().enumerate() {
        driver.set_speed(speed);

        if fault_at == Some(i) {
            match driver.status_pin() {
                Some(pin) => driver.io_mut().drive(pin, PinState::Low),
                None => warn!("no status pin configured, fault not simulated"),
            }
        }

        let duties = &driver.io().duties;
        let forward = duties.get(&driver.forward_pin()).copied().unwrap_or(0);
        let reverse = duties.get(&driver.reverse_pin()).copied().unwrap_or(0);
        let current = driver.get_current();
        let status = driver.get_status();
        info!(speed, forward, reverse, current, status, "command applied");

        yield_now().await;
    }

    info!("replay finished");
    yield_now().await;
    std::process::exit(0);
}

fn default_config() -> DriverConfig {
    let mut cfg = DriverConfig::new(3, 5);
    cfg.status_pin = Some(7);
    cfg.current_sense = Some(CurrentSenseConfig {
        pin: 14,
        reference_voltage: 5.0,
    });
    cfg
}

fn read_config(path: &Path) -> Result<DriverConfig, Box<dyn Error>> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

fn load_config(path: Option<&Path>) -> DriverConfig {
    let Some(path) = path else {
        return default_config();
    };
    match read_config(path) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("failed to load {}: {}, using defaults", path.display(), e);
            default_config()
        }
    }
}

static EXECUTOR: StaticCell<Executor> = StaticCell::new();

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let opts = Opts::parse();
    let mut cfg = load_config(opts.config.as_deref());
    if let Some(max_output) = opts.max_output {
        cfg.max_output = Some(max_output);
    }
    info!(?cfg, "channel configuration");

    let mut driver = MotorDriver::from_config(SimBoard::default(), &cfg);
    if let Some(pin) = cfg.status_pin {
        driver.register_status_change_handler(STATUS_CHANNEL.sender(), pin);
    }

    let executor = EXECUTOR.init(Executor::new());
    executor.run(|spawner| {
        spawner.spawn(status_task()).unwrap();
        spawner
            .spawn(replay_task(driver, opts.speeds, opts.fault_at))
            .unwrap();
    });
}
