//! Subcommand handlers.

use std::error::Error;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use super::args::{ComposeArgs, ConfigAction, ShootArgs};
use crate::booth::{BoothSession, ResultsView};
use crate::camera::{
    list_video_input_devices, CameraProvider, DeviceDescriptor, TestPatternProvider,
};
use crate::capture::SequencerEvent;
use crate::config::{default_path as get_config_path, Config, DEFAULT_CONFIG};
use crate::event_loop::{run_capture, setup_ctrlc_handler, shutdown_flag};
use crate::frame::Frame;
use crate::permissions::PermissionState;
use crate::strip::compose;

pub type CliResult<T> = Result<T, Box<dyn Error>>;

/// Load the config, requiring the file only when a path was given.
fn load_config(path: Option<&Path>) -> CliResult<Config> {
    Ok(match path {
        Some(path) => Config::load_from_explicit(path)?,
        None => Config::load(None)?,
    })
}

/// Take the photos and save the strip. Returns where it was saved.
pub fn shoot(args: &ShootArgs) -> CliResult<PathBuf> {
    let mut config = load_config(args.config.as_deref())?;
    args.apply(&mut config);
    config.validate()?;

    if args.test_pattern {
        return run_shoot(TestPatternProvider::new(), &config);
    }
    run_shoot(native_provider()?, &config)
}

#[cfg(feature = "native-camera")]
fn native_provider() -> CliResult<crate::camera::NativeProvider> {
    Ok(crate::camera::NativeProvider::new())
}

#[cfg(not(feature = "native-camera"))]
fn native_provider() -> CliResult<TestPatternProvider> {
    Err("photobooth was built without the native-camera feature. \
         Rebuild with --features native-camera, or pass --test-pattern"
        .into())
}

fn run_shoot<P: CameraProvider>(provider: P, config: &Config) -> CliResult<PathBuf> {
    let mut booth = BoothSession::new(provider, config);
    if let Err(e) = booth.prepare() {
        if let Some(notice) = booth.notice() {
            eprintln!("{}\n", notice);
        }
        return Err(e.into());
    }
    if let Some(device) = booth.selected_device() {
        let position = booth
            .devices()
            .iter()
            .position(|d| d.id == device.id)
            .unwrap_or(0);
        println!("Using camera: {}", device.display_label(position));
    }

    if let Err(e) = setup_ctrlc_handler() {
        log::warn!("Failed to set up Ctrl+C handler: {}", e);
    }

    let total = config.session.photo_count;
    println!("Get ready! Taking {} photo(s).", total);
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let handoff = runtime.block_on(run_capture(&mut booth, shutdown_flag(), |event| {
        print_event(event, total)
    }))?;
    drop(booth);

    let view = ResultsView::open(Some(handoff), config.layout(), config.strip.background)?;
    let path = view.download(&config.strip.output_dir)?;
    println!("Saved photo strip to {}", path.display());
    Ok(path)
}

fn print_event(event: &SequencerEvent, total: usize) {
    let mut stdout = std::io::stdout();
    match event {
        SequencerEvent::Countdown(n) if *n > 0 => {
            let _ = write!(stdout, "{}... ", n);
        }
        SequencerEvent::Countdown(_) | SequencerEvent::FlashEnded => {}
        SequencerEvent::Flash => {
            let _ = write!(stdout, "*flash* ");
        }
        // Terminal bell as the shutter sound.
        SequencerEvent::Shutter => {
            let _ = write!(stdout, "\x07");
        }
        SequencerEvent::Captured { index } => {
            let _ = writeln!(stdout, "photo {}/{}", index + 1, total);
        }
        SequencerEvent::CaptureFailed { attempt, reason } => {
            eprintln!("\nCapture attempt {} failed: {}", attempt, reason);
        }
        SequencerEvent::Aborted { reason } => {
            eprintln!("Giving up: {}", reason);
        }
        SequencerEvent::Completed => {
            let _ = writeln!(stdout, "All photos taken!");
        }
    }
    let _ = stdout.flush();
}

/// List available cameras and print them to stdout.
pub fn list_cameras(test_pattern: bool) -> CliResult<()> {
    if test_pattern {
        print_cameras(TestPatternProvider::new())
    } else {
        print_cameras(native_provider()?)
    }
}

fn print_cameras<P: CameraProvider>(mut provider: P) -> CliResult<()> {
    let devices = visible_cameras(&mut provider);
    if devices.is_empty() {
        println!("No cameras found.");
        println!();
        println!("Make sure your camera is connected and permissions are granted.");
        println!("Grant access in {}.", crate::permissions::settings_path());
    } else {
        println!("Available cameras:");
        for (position, device) in devices.iter().enumerate() {
            println!("  [{}] {}", device.id, device.display_label(position));
        }
        println!();
        println!("Use --camera <id> to select a camera.");
    }
    Ok(())
}

/// Enumerate cameras, asking for access only while it is undecided.
///
/// Labels stay hidden when access was refused.
fn visible_cameras<P: CameraProvider>(provider: &mut P) -> Vec<DeviceDescriptor> {
    match provider.permission_state() {
        PermissionState::Prompt => {
            if let Err(e) = provider.request_permission() {
                log::warn!("Camera permission request failed: {}", e);
            }
        }
        PermissionState::Denied => {
            log::warn!("Camera access was refused; device labels are hidden");
        }
        PermissionState::Granted => {}
    }
    list_video_input_devices(&*provider)
}

/// Build a strip from image files on disk. Returns where it was saved.
pub fn compose_files(args: &ComposeArgs) -> CliResult<PathBuf> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(background) = args.background {
        config.strip.background = background;
    }
    if let Some(output) = &args.output {
        config.strip.output_dir = output.clone();
    }

    let loaded_at = Instant::now();
    let frames = args
        .images
        .iter()
        .map(|path| {
            let bytes = std::fs::read(path)
                .map_err(|e| format!("Failed to read '{}': {}", path.display(), e))?;
            Frame::from_encoded(&bytes, loaded_at)
                .map_err(|e| format!("Failed to decode '{}': {}", path.display(), e))
        })
        .collect::<Result<Vec<_>, String>>()?;

    let strip = compose(&frames, config.strip.background, &config.layout())?;
    let path = strip.download(&config.strip.output_dir)?;
    println!("Saved photo strip to {}", path.display());
    Ok(path)
}

/// Handle config subcommand actions.
pub fn handle_config_action(action: ConfigAction) -> CliResult<()> {
    match action {
        ConfigAction::Show { config } => {
            let cfg = load_config(config.as_deref())?;
            println!("Current configuration:");
            println!("  Photos: {}", cfg.session.photo_count);
            println!("  Countdown: {}s", cfg.session.countdown_secs);
            println!(
                "  Flash / settle / retry: {}ms / {}ms / {}ms",
                cfg.session.flash_ms, cfg.session.settle_ms, cfg.session.retry_ms
            );
            println!("  Capture attempts: {}", cfg.session.max_capture_attempts);
            println!(
                "  Shutter sound: {}",
                if cfg.session.shutter_sound { "yes" } else { "no" }
            );
            println!(
                "  Camera: {}",
                cfg.camera.device.as_deref().unwrap_or("first available")
            );
            println!("  Resolution: {}", cfg.camera.resolution);
            println!("  Mirror: {}", if cfg.camera.mirror { "yes" } else { "no" });
            println!(
                "  Strip: {}x{}, padding {}, gap {}",
                cfg.strip.width, cfg.strip.height, cfg.strip.padding, cfg.strip.gap
            );
            println!("  Background: {}", cfg.strip.background);
            println!("  Output: {}", cfg.strip.output_dir.display());
            println!();

            let config_path = config.unwrap_or_else(get_config_path);
            if config_path.exists() {
                println!("Config file: {} (exists)", config_path.display());
            } else {
                println!("Config file: {} (not found)", config_path.display());
            }
        }
        ConfigAction::Init => {
            let config_path = get_config_path();
            init_config(&config_path)?;
            println!("Created config file: {}", config_path.display());
        }
    }
    Ok(())
}

/// Write the default config to `path`, refusing to overwrite.
fn init_config(path: &Path) -> CliResult<()> {
    if path.exists() {
        return Err(format!(
            "Config file already exists: {}. Use 'photobooth config show' to view current settings",
            path.display()
        )
        .into());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Error creating config directory: {}", e))?;
    }
    std::fs::write(path, DEFAULT_CONFIG).map_err(|e| format!("Error writing config file: {}", e))?;
    Ok(())
}
