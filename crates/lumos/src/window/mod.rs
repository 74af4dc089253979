//! Window management
//!
//! ```text
//! ┌─────────────────────────────────┐
//! │     Application Code            │
//! └─────────────┬───────────────────┘
//!               │ Uses (generic, no dyn)
//!         ┌─────▼─────┐
//!         │  Window   │ ← Trait, fixed to one backend per build
//!         └─────┬─────┘
//!               │ Implemented by
//!      ┌────────▼────────┐
//!      │ NativeWindow<P> │ ← Resource owner + event pump (backend.rs)
//!      └────────┬────────┘
//!               │ Consumes
//!      ┌────────▼────────┐
//!      │   Platform      │ ← Native boundary (platform.rs)
//!      └────────┬────────┘
//!               │ Implemented by
//!   ┌───────────▼───────────┐
//!   │ HeadlessPlatform      │ ← In-process server (headless.rs)
//!   │ X11Platform           │ ← X11 + GLX, feature `x11` (x11.rs)
//!   └───────────────────────┘
//! ```
//!
//! The backend is chosen when the crate is built: [`DefaultPlatform`] is
//! `X11Platform` with the `x11` feature and `HeadlessPlatform` otherwise.

pub mod backend;
pub mod headless;
pub mod platform;
pub mod pump;
#[cfg(feature = "x11")]
pub mod x11;

use thiserror::Error;

use crate::events::KeyEventHandler;
use crate::geometry::Extent2d;

pub use backend::{BackendState, NativeWindow};
pub use headless::HeadlessPlatform;
pub use platform::{Platform, PlatformError};
#[cfg(feature = "x11")]
pub use x11::X11Platform;

/// Platform selected for this build
#[cfg(feature = "x11")]
pub type DefaultPlatform = X11Platform;

/// Platform selected for this build
#[cfg(not(feature = "x11"))]
pub type DefaultPlatform = HeadlessPlatform;

/// Window backed by the platform selected for this build
pub type PlatformWindow = NativeWindow<DefaultPlatform>;

/// Window creation and event errors
#[derive(Error, Debug)]
pub enum WindowError {
    /// Width or height is not strictly positive
    #[error("Invalid window extent {width}x{height}: dimensions must be positive")]
    InvalidExtent {
        /// Requested width
        width: i16,
        /// Requested height
        height: i16,
    },

    /// The display could not be opened
    #[error("Can't open display: {0}")]
    DisplayUnavailable(PlatformError),

    /// No connection could be obtained from the display
    #[error("Can't get connection from display: {0}")]
    ConnectionUnavailable(PlatformError),

    /// The display has no screen at the requested index
    #[error("Screen {index} out of range ({count} available)")]
    ScreenOutOfRange {
        /// Requested screen index
        index: usize,
        /// Screens on the display
        count: usize,
    },

    /// Framebuffer configurations could not be queried
    #[error("Frame buffer configuration query failed: {0}")]
    FramebufferQuery(PlatformError),

    /// No framebuffer configuration supports an RGBA window
    #[error("No compatible frame buffer configuration")]
    NoFramebufferConfig,

    /// Rendering context creation failed
    #[error("Failed to create rendering context: {0}")]
    ContextCreation(PlatformError),

    /// Colormap creation failed
    #[error("Failed to create colormap: {0}")]
    ColormapCreation(PlatformError),

    /// Native window creation failed
    #[error("Failed to create window: {0}")]
    WindowCreation(PlatformError),

    /// The native window could not be mapped
    #[error("Failed to map window: {0}")]
    MapWindow(PlatformError),

    /// Context-bound window creation failed
    #[error("Failed to create context-bound window: {0}")]
    SurfaceCreation(PlatformError),

    /// The context could not be made current
    #[error("Failed to make rendering context current: {0}")]
    MakeCurrent(PlatformError),

    /// `open` was called on a live window
    #[error("Window has already been created")]
    AlreadyCreated,

    /// The window is not up
    #[error("Window has not been created")]
    NotCreated,

    /// Flushing or polling the event queue failed
    #[error("Event queue error: {0}")]
    EventQueue(PlatformError),
}

/// Result of a window operation
pub type WindowResult<T> = Result<T, WindowError>;

/// A window with a current rendering context
///
/// Implemented by exactly one backend per build. Call sites are generic over
/// (or name) the concrete type, so nothing here is dispatched at run time.
pub trait Window: Sized {
    /// Native platform the window is built on
    type Platform: Platform;

    /// Create a window, passing ownership to the caller
    ///
    /// An error means no native resource is left behind.
    fn create(platform: Self::Platform, extent: Extent2d, title: &[u8]) -> WindowResult<Self>;

    /// Drain pending native events, forwarding key events to `handler`
    ///
    /// Returns the number of key events forwarded.
    fn poll_events<H>(&mut self, handler: &mut H) -> WindowResult<usize>
    where
        H: KeyEventHandler + ?Sized;

    /// Extent the window was created with
    fn extent(&self) -> Extent2d;
}

/// Create a window from a configuration
pub fn open_window<W: Window>(
    platform: W::Platform,
    config: &crate::config::WindowConfig,
) -> WindowResult<W> {
    W::create(platform, config.extent(), config.title.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WindowConfig;
    use crate::events::KeyEvent;

    fn pump_once<W: Window>(window: &mut W) -> usize {
        let mut sink: Vec<KeyEvent> = Vec::new();
        window.poll_events(&mut sink).unwrap_or(0)
    }

    #[test]
    fn test_generic_call_site() {
        let platform = HeadlessPlatform::new();
        let probe = platform.clone();
        let config = WindowConfig {
            title: "generic".to_string(),
            width: 300,
            height: 200,
            ..WindowConfig::default()
        };

        let window: WindowResult<NativeWindow<HeadlessPlatform>> = open_window(platform, &config);
        let mut window = window.unwrap_or_else(|err| panic!("creation failed: {err}"));
        assert_eq!(Window::extent(&window), Extent2d::new(300, 200));

        probe.push_key_press(0x41);
        assert_eq!(pump_once(&mut window), 1);
        assert_eq!(pump_once(&mut window), 0);
    }

    #[test]
    fn test_error_messages() {
        let err = WindowError::InvalidExtent {
            width: 0,
            height: -4,
        };
        assert_eq!(
            err.to_string(),
            "Invalid window extent 0x-4: dimensions must be positive"
        );
        let err = WindowError::ContextCreation(PlatformError::new("no GLX"));
        assert_eq!(err.to_string(), "Failed to create rendering context: no GLX");
    }
}
