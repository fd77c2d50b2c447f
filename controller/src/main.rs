//! sparc-controller: blink-driven communication device controller.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use sparc_controller::backend::{self, gpio::GpioPins, BackendType, RunOptions};
use sparc_controller::config::PropFileStore;
use sparc_controller::remote::RemoteServer;

#[derive(Parser, Debug)]
#[command(name = "sparc-controller", about = "Blink-driven communication controller")]
struct Cli {
    /// Backend to use: gpio or headless
    #[arg(long, default_value = "gpio")]
    backend: String,

    /// Settings file (default: $XDG_CONFIG_HOME/sparc/controller.conf)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Remote link listen address
    #[arg(long, default_value_t = RemoteServer::default_listen_addr())]
    listen: SocketAddr,

    /// User id reported in notifications (overrides the settings file)
    #[arg(long)]
    user_id: Option<u32>,

    /// Sensor sampling interval in milliseconds
    #[arg(long, default_value_t = 10)]
    tick_ms: u64,

    /// Exit after N seconds (testing)
    #[arg(long)]
    exit_after: Option<u64>,

    /// Log all remote link traffic
    #[arg(long)]
    remote_trace: bool,

    /// Eye sensor value file, e.g. /sys/class/gpio/gpio17/value
    #[arg(long)]
    sensor_gpio: Option<PathBuf>,

    /// Eye sensor reads low when the eye is open
    #[arg(long)]
    sensor_active_low: bool,

    /// Emergency clear button value file
    #[arg(long)]
    clear_gpio: Option<PathBuf>,

    /// Clear button reads low when pressed
    #[arg(long)]
    clear_active_low: bool,

    /// Settings key value file
    #[arg(long)]
    settings_gpio: Option<PathBuf>,

    /// Settings key reads low when pressed
    #[arg(long)]
    settings_active_low: bool,

    /// Blink LED value file
    #[arg(long)]
    blink_led_gpio: Option<PathBuf>,

    /// Emergency LED value file
    #[arg(long)]
    alert_led_gpio: Option<PathBuf>,

    /// Buzzer value file
    #[arg(long)]
    buzzer_gpio: Option<PathBuf>,

    /// Show version and exit
    #[arg(long)]
    version: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.version {
        println!("sparc-controller {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sparc_controller=info".into()),
        )
        .init();

    info!("sparc-controller v{} starting", env!("CARGO_PKG_VERSION"));
    info!("backend: {}", cli.backend);

    let backend_type = match cli.backend.as_str() {
        "gpio" => BackendType::Gpio,
        "headless" => BackendType::Headless,
        other => {
            eprintln!("Unknown backend: {other}. Use: gpio or headless");
            std::process::exit(1);
        }
    };

    let options = RunOptions {
        config_path: cli.config.unwrap_or_else(PropFileStore::default_path),
        user_id: cli.user_id,
        listen: cli.listen,
        remote_trace: cli.remote_trace,
        tick_ms: cli.tick_ms,
        exit_after: cli.exit_after,
    };
    let pins = GpioPins {
        sensor: cli.sensor_gpio,
        sensor_active_low: cli.sensor_active_low,
        clear_button: cli.clear_gpio,
        clear_active_low: cli.clear_active_low,
        settings_button: cli.settings_gpio,
        settings_active_low: cli.settings_active_low,
        blink_led: cli.blink_led_gpio,
        alert_led: cli.alert_led_gpio,
        buzzer: cli.buzzer_gpio,
    };

    backend::run(backend_type, options, pins)
}
