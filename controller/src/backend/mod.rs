//! Backend abstraction: sysfs GPIO hardware or headless operation, both
//! driven by the same calloop event loop.

pub mod gpio;
pub mod headless;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{anyhow, Context};
use calloop::timer::{TimeoutAction, Timer};
use calloop::EventLoop;
use tracing::info;

use crate::clock::{Clock, MonotonicClock};
use crate::config::{ConfigStore, PropFileStore};
use crate::controller::Peripherals;
use crate::peripherals::{Indicators, TracingAnnouncer, TracingRenderer};
use crate::remote::RemoteServer;
use crate::state::{DeviceState, Inputs};

/// Global flag set by SIGTERM/SIGINT handlers.
static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Interval between status log lines.
const STATUS_INTERVAL_MS: u64 = 60_000;

/// Backend type selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    Gpio,
    Headless,
}

/// Options shared by every backend.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub config_path: PathBuf,
    /// Overrides the persisted user id.
    pub user_id: Option<u32>,
    pub listen: SocketAddr,
    pub remote_trace: bool,
    pub tick_ms: u64,
    /// Exit after N seconds (CI).
    pub exit_after: Option<u64>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            config_path: PropFileStore::default_path(),
            user_id: None,
            listen: RemoteServer::default_listen_addr(),
            remote_trace: false,
            tick_ms: 10,
            exit_after: None,
        }
    }
}

/// Run the controller with the selected backend.
pub fn run(backend: BackendType, options: RunOptions, pins: gpio::GpioPins) -> anyhow::Result<()> {
    match backend {
        BackendType::Gpio => gpio::run(options, pins),
        BackendType::Headless => headless::run(options),
    }
}

/// Load settings and assemble the device state around the given hardware.
pub(crate) fn build_state(
    options: &RunOptions,
    inputs: Inputs,
    indicators: Box<dyn Indicators>,
) -> anyhow::Result<DeviceState> {
    let mut store = PropFileStore::new(&options.config_path);
    let mut settings = store
        .load()
        .with_context(|| format!("loading settings from {}", options.config_path.display()))?;
    if let Some(user_id) = options.user_id {
        settings.user_id = user_id;
    }

    let peripherals = Peripherals {
        renderer: Box::new(TracingRenderer),
        announcer: Box::new(TracingAnnouncer),
        indicators,
    };
    let mut state = DeviceState::new(
        settings,
        Box::new(store),
        Box::new(MonotonicClock::new()),
        inputs,
        peripherals,
    );
    state.remote.remote_trace = options.remote_trace;
    Ok(state)
}

/// Install signal handlers for graceful shutdown (SIGTERM, SIGINT).
fn install_signal_handlers() {
    unsafe {
        libc::signal(libc::SIGTERM, signal_handler as libc::sighandler_t);
        libc::signal(libc::SIGINT, signal_handler as libc::sighandler_t);
    }
}

extern "C" fn signal_handler(_sig: libc::c_int) {
    SHUTDOWN_REQUESTED.store(true, Ordering::SeqCst);
}

/// Bind the remote link, register the tick timer and loop until shutdown.
pub(crate) fn run_event_loop(mut state: DeviceState, options: &RunOptions) -> anyhow::Result<()> {
    let mut event_loop =
        EventLoop::<DeviceState>::try_new().context("failed to create event loop")?;

    let local = RemoteServer::bind(options.listen, &event_loop.handle())?;
    state.remote.local_addr = Some(local);

    let tick = Duration::from_millis(options.tick_ms.max(1));
    event_loop
        .handle()
        .insert_source(Timer::from_duration(tick), move |_deadline, _, state| {
            state.tick();
            TimeoutAction::ToDuration(tick)
        })
        .map_err(|e| anyhow!("failed to register tick timer: {}", e.error))?;

    install_signal_handlers();
    state.controller.start();

    let exit_after_ms = exit_after_ms(options.exit_after);
    let mut last_status_log = state.clock.now_ms();

    info!(
        tick_ms = tick.as_millis() as u64,
        listen = %local,
        "entering event loop"
    );

    while state.running {
        if SHUTDOWN_REQUESTED.load(Ordering::SeqCst) {
            info!("Shutdown signal received, exiting");
            state.running = false;
            break;
        }

        if let Some(limit) = exit_after_ms {
            if state.clock.now_ms() >= limit {
                info!("Exit timer fired after {}s", limit / 1000);
                state.running = false;
                break;
            }
        }

        if state.clock.elapsed_since(last_status_log) >= STATUS_INTERVAL_MS {
            info!(
                "Status: {} tick(s), {} remote client(s), emergency {}, mode {}",
                state.ticks,
                state.remote.clients.len(),
                if state.controller.emergency_active() { "active" } else { "idle" },
                state.controller.selection().mode.as_str()
            );
            last_status_log = state.clock.now_ms();
        }

        RemoteServer::poll_clients(&mut state);

        event_loop.dispatch(Some(tick), &mut state)?;
    }

    info!(
        "Controller shutting down ({} tick(s), {} remote client(s))",
        state.ticks,
        state.remote.clients.len()
    );
    Ok(())
}

/// Exit deadline in milliseconds.  Absurd values saturate instead of wrapping
/// into an early exit.
fn exit_after_ms(secs: Option<u64>) -> Option<u64> {
    secs.map(|secs| secs.saturating_mul(1000))
}
