//! uvcview
//!
//! Selects a USB webcam, runs the device permission handshake, hands the
//! device to the capture provider, and persists per-device preview settings.

use anyhow::{Context, Result, anyhow};
use app::capture::HeadlessCapture;
use app::config::AppConfig;
use app::identity::resolve_key;
use app::notify::{Notice, Notifier, TracingNotifier};
use app::permission::{DiscoveryOutcome, HandshakeOutcome, PermissionCoordinator};
use app::session::CloseOutcome;
use app::store::SettingsStore;
use app::usb::{UsbPermissionBroker, spawn_usb_worker};
use clap::Parser;
use common::{
    AppEvent, CaptureEvent, DiscoveredDevice, PixelFormat, Resolution, UsbBridge, UsbCommand,
    create_usb_bridge, setup_logging,
};
use tokio::signal;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "uvcview")]
#[command(
    author,
    version,
    about = "USB webcam selection and per-device preview settings"
)]
#[command(long_about = "
Selects a USB webcam, negotiates device access, and keeps per-device preview
settings (format, resolution, frame rate) across runs.

EXAMPLES:
    # List connected video devices and their stored settings
    uvcview --list-devices

    # Preview the first camera found
    uvcview

    # Pick a specific camera
    uvcview --device 046d:0825

    # Change and save the preferred resolution for a camera
    uvcview --device 046d:0825 --resolution 640x480

CONFIGURATION:
    The app looks for configuration in the following order:
    1. Path specified with --config
    2. ~/.config/uvcview/config.toml
    3. Built-in defaults
")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<std::path::PathBuf>,

    /// Save default configuration to the default location and exit
    #[arg(long)]
    save_config: bool,

    /// List video devices and exit
    #[arg(long)]
    list_devices: bool,

    /// Select a device by VID:PID (hex, e.g. 046d:0825)
    #[arg(short, long, value_name = "VID:PID")]
    device: Option<String>,

    /// Set and save the preferred resolution (WIDTHxHEIGHT)
    #[arg(long, value_name = "RES")]
    resolution: Option<String>,

    /// Set and save the preferred pixel format (MJPEG or YUYV)
    #[arg(long, value_name = "FORMAT")]
    format: Option<String>,

    /// Set and save the preferred frame rate (0 = auto)
    #[arg(long, value_name = "FPS")]
    fps: Option<u32>,

    /// Set and save the rotation in degrees
    #[arg(long, value_name = "DEG")]
    rotate: Option<u32>,

    /// Assign a human-readable name to the selected device
    #[arg(long, value_name = "NAME")]
    label: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,
}

impl Args {
    fn has_settings_edits(&self) -> bool {
        self.resolution.is_some()
            || self.format.is_some()
            || self.fps.is_some()
            || self.rotate.is_some()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.save_config {
        let config = AppConfig::default();
        let path = AppConfig::default_path();
        config.save(&path).context("Failed to save configuration")?;
        println!("Configuration saved to: {}", path.display());
        return Ok(());
    }

    let config = if let Some(ref path) = args.config {
        AppConfig::load(Some(path.clone())).context("Failed to load configuration")?
    } else {
        AppConfig::load_or_default()
    };

    let log_level = args.log_level.as_deref().unwrap_or(&config.app.log_level);
    setup_logging(log_level).context("Failed to setup logging")?;

    info!("uvcview v{}", env!("CARGO_PKG_VERSION"));

    let (bridge, worker) = create_usb_bridge();
    // Capture events ride the same stream the app loop already listens on
    let capture_events = worker.event_tx.clone();
    let usb_worker_handle = spawn_usb_worker(worker, config.usb.filters.clone());

    let result = if args.list_devices {
        list_devices_mode(&bridge, &config).await
    } else {
        run(&bridge, &config, &args, capture_events).await
    };

    info!("Shutting down USB subsystem...");
    if let Err(e) = bridge.send_command(UsbCommand::Shutdown).await {
        error!("Error shutting down USB worker: {}", e);
    }
    match usb_worker_handle.join() {
        Ok(Err(e)) => error!("USB worker exited with error: {}", e),
        Err(e) => error!("USB worker thread panicked: {:?}", e),
        Ok(Ok(())) => {}
    }

    result
}

/// Ask the worker for a scan and await the response
async fn scan_devices(bridge: &UsbBridge) -> Result<Vec<DiscoveredDevice>> {
    let (tx, rx) = tokio::sync::oneshot::channel();
    bridge
        .send_command(UsbCommand::ListDevices { response: tx })
        .await
        .map_err(|e| anyhow!("Failed to request device scan: {}", e))?;
    rx.await.context("USB worker dropped the scan response")
}

/// Print discovered devices with their identity and stored settings
async fn list_devices_mode(bridge: &UsbBridge, config: &AppConfig) -> Result<()> {
    let devices = scan_devices(bridge).await?;
    if devices.is_empty() {
        println!("No USB video devices found.");
        return Ok(());
    }

    let store = SettingsStore::open(config.store_path());

    println!("Found {} video device(s):", devices.len());
    for discovered in &devices {
        let desc = &discovered.descriptor;
        let key = resolve_key(desc);
        let name = store
            .name(&key)
            .map(str::to_string)
            .unwrap_or_else(|| desc.label());
        let access = if discovered.permission_granted {
            "yes"
        } else {
            "no"
        };
        let settings = match store.load(&key) {
            Some(s) => format!("{} {} @{}fps", s.format, s.resolution, s.fps),
            None => "none stored".to_string(),
        };

        println!(
            "  [{}] {:04x}:{:04x}  {}  access={}  settings: {}",
            desc.id.0, desc.vendor_id, desc.product_id, name, access, settings
        );
        println!("        key: {}", key);
    }

    Ok(())
}

async fn run(
    bridge: &UsbBridge,
    config: &AppConfig,
    args: &Args,
    capture_events: async_channel::Sender<AppEvent>,
) -> Result<()> {
    let mut notifier = TracingNotifier;

    let devices = scan_devices(bridge).await?;
    if devices.is_empty() {
        notifier.notify(Notice::NoDevicesFound);
        return Ok(());
    }
    let Some(chosen) = choose_device(&devices, args.device.as_deref())? else {
        warn!(
            "Device {} not found among {} discovered device(s)",
            args.device.as_deref().unwrap_or_default(),
            devices.len()
        );
        return Ok(());
    };

    let store = SettingsStore::open(config.store_path());
    let mut coordinator = PermissionCoordinator::new(
        store,
        Box::new(UsbPermissionBroker::new(bridge.clone())),
        Box::new(HeadlessCapture::new(capture_events)),
        Box::new(TracingNotifier),
    );

    let outcome = coordinator
        .handle_discovered_device(&chosen.descriptor, chosen.permission_granted)
        .context("Device discovery failed")?;

    if let Some(label) = &args.label {
        coordinator
            .set_device_name(label)
            .context("Failed to store device name")?;
    }

    if outcome == DiscoveryOutcome::Ready {
        apply_settings_edits(&mut coordinator, args)?;
    }

    // Event loop: permission responses and capture lifecycle, until ctrl-c
    loop {
        tokio::select! {
            event = bridge.recv_event() => {
                match event {
                    Ok(AppEvent::PermissionResolved(response)) => {
                        match coordinator.on_permission_response(response) {
                            Some(HandshakeOutcome::Ready) => {
                                apply_settings_edits(&mut coordinator, args)?;
                            }
                            Some(HandshakeOutcome::Denied) => break,
                            None => {}
                        }
                    }
                    Ok(AppEvent::Capture(event)) => handle_capture_event(event),
                    Err(e) => {
                        error!("Event channel closed: {}", e);
                        break;
                    }
                }
            }
            _ = signal::ctrl_c() => {
                info!("Interrupted, shutting down");
                break;
            }
        }
    }

    coordinator.teardown();
    Ok(())
}

/// Pick the device to use from a scan result
fn choose_device<'a>(
    devices: &'a [DiscoveredDevice],
    wanted: Option<&str>,
) -> Result<Option<&'a DiscoveredDevice>> {
    let Some(wanted) = wanted else {
        return Ok(devices.first());
    };

    let (vid, pid) = parse_vid_pid(wanted)?;
    Ok(devices
        .iter()
        .find(|d| d.descriptor.vendor_id == vid && d.descriptor.product_id == pid))
}

fn parse_vid_pid(s: &str) -> Result<(u16, u16)> {
    let invalid = || anyhow!("invalid device selector '{}', expected VID:PID in hex", s);
    let (vid, pid) = s.split_once(':').ok_or_else(invalid)?;
    let vid = u16::from_str_radix(vid.trim_start_matches("0x"), 16).map_err(|_| invalid())?;
    let pid = u16::from_str_radix(pid.trim_start_matches("0x"), 16).map_err(|_| invalid())?;
    Ok((vid, pid))
}

/// Apply CLI settings flags through the reconciliation session
///
/// CLI flags carry explicit save intent, so a changed pending copy is
/// committed without an interactive prompt.
fn apply_settings_edits(coordinator: &mut PermissionCoordinator, args: &Args) -> Result<()> {
    if !args.has_settings_edits() {
        return Ok(());
    }

    let format = args
        .format
        .as_deref()
        .map(|f| f.parse::<PixelFormat>())
        .transpose()?;

    if !coordinator.open_editor() {
        warn!("No device ready, settings flags ignored");
        return Ok(());
    }
    if let Some(editor) = coordinator.editor() {
        if let Some(resolution) = &args.resolution {
            editor.set_resolution(resolution);
        }
        if let Some(format) = format {
            editor.set_format(format);
        }
        if let Some(fps) = args.fps {
            editor.set_fps(fps);
        }
        if let Some(rotate) = args.rotate {
            editor.set_rotate(rotate);
        }
    }

    match coordinator.close_editor() {
        Some(CloseOutcome::PromptSave) => {
            coordinator.save_pending().context("Failed to save settings")?;
            apply_preview_resolution(coordinator);
        }
        Some(CloseOutcome::Unchanged) => info!("Settings unchanged"),
        None => {}
    }

    Ok(())
}

/// Push the saved resolution preference to the capture provider
fn apply_preview_resolution(coordinator: &mut PermissionCoordinator) {
    let Some(resolution) = coordinator
        .editor()
        .and_then(|s| s.last_loaded().resolution.parse::<Resolution>().ok())
    else {
        return;
    };

    if let Err(e) = coordinator.request_preview_resolution(resolution) {
        warn!("Preview resolution change failed: {}", e);
    }
}

fn handle_capture_event(event: CaptureEvent) {
    match event {
        CaptureEvent::Opened => info!("Camera opened"),
        CaptureEvent::Closed => info!("Camera closed"),
        CaptureEvent::Error { message } => warn!("Camera error: {}", message),
        CaptureEvent::FrameRate { fps } => info!("Frame rate: {} fps", fps),
    }
}
