//! Lumos demo application
//!
//! Opens a window on the platform selected at build time and logs every key
//! event until Escape is pressed. Without the `x11` feature the window lives on
//! the in-process headless server, which is seeded with a short key script.

use std::time::Duration;

use lumos::config::{Config, ConfigError, LumosConfig};
use lumos::events::{from_fn, EventManager, Key, KeyEvent, KeyEventHandler};
use lumos::foundation::logging;
use lumos::window::{self, DefaultPlatform, PlatformWindow, Window, WindowError};

const TICK: Duration = Duration::from_millis(16);
const MAX_TICKS: u32 = 60 * 60;

#[derive(thiserror::Error, Debug)]
enum DemoError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Window error: {0}")]
    Window(#[from] WindowError),

    #[error("Quit handler is no longer registered")]
    QuitHandlerLost,
}

/// Raises a flag once Escape is released
#[derive(Debug, Default)]
struct QuitOnEscape {
    requested: bool,
}

impl KeyEventHandler for QuitOnEscape {
    fn handle_key_event(&mut self, event: &KeyEvent) {
        if event.is_release() && event.key() == Some(Key::Esc) {
            log::info!("Escape released, quitting");
            self.requested = true;
        }
    }
}

fn load_config() -> Result<LumosConfig, ConfigError> {
    match std::env::args().nth(1) {
        Some(path) => LumosConfig::load_from_file(path),
        None => Ok(LumosConfig::default()),
    }
}

#[cfg(feature = "x11")]
fn platform(config: &LumosConfig) -> DefaultPlatform {
    DefaultPlatform::new(config.window.display.clone())
}

#[cfg(not(feature = "x11"))]
fn platform(config: &LumosConfig) -> DefaultPlatform {
    if let Some(display) = &config.window.display {
        log::warn!("Ignoring display {display:?}: built without the x11 feature");
    }

    let platform = DefaultPlatform::new();
    for key in [Key::W, Key::A, Key::Space] {
        platform.push_key_press(key_code(key));
        platform.push_key_release(key_code(key));
    }
    platform.push_key_press(key_code(Key::Esc));
    platform.push_key_release(key_code(Key::Esc));
    platform
}

#[cfg(not(feature = "x11"))]
fn key_code(key: Key) -> u8 {
    u8::try_from(key.code()).unwrap_or_default()
}

fn run(config: &LumosConfig) -> Result<(), DemoError> {
    let mut window: PlatformWindow = window::open_window(platform(config), &config.window)?;
    log::info!("Window open at {}", Window::extent(&window));

    let mut events = EventManager::new();
    events.register(from_fn(|event: &KeyEvent| log::info!("{event}")));
    let quit = events.register(QuitOnEscape::default());

    for tick in 0..MAX_TICKS {
        let forwarded = window.poll_events(&mut events)?;
        if forwarded > 0 {
            log::debug!("Tick {tick}: {forwarded} key events");
        }

        let requested = events
            .handler::<QuitOnEscape>(quit)
            .map_err(|_| DemoError::QuitHandlerLost)?
            .requested;
        if requested {
            return Ok(());
        }
        std::thread::sleep(TICK);
    }

    log::info!("Tick limit reached");
    Ok(())
}

fn main() -> Result<(), DemoError> {
    let config = load_config()?;
    logging::init_with_level(&config.logging.level);

    log::info!("Starting Lumos demo");
    run(&config)?;
    log::info!("Lumos demo finished");
    Ok(())
}
