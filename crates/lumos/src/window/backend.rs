//! Native window backend
//!
//! [`NativeWindow`] owns one display connection, one native window and the
//! rendering context bound to it. Bringing the window up is a fixed sequence
//! of native calls:
//!
//! ```text
//! Uninitialized ─► DisplayOpen ─► ConnectionBound ─► ScreenResolved
//!                                                        │
//!      ContextCurrent ◄─ WindowCreated ◄─ ColormapReady ◄┘
//! ```
//!
//! Each resource is recorded the moment it is acquired. When a step fails,
//! [`NativeWindow::destroy`] releases exactly the recorded resources, innermost
//! first, and the backend lands in [`BackendState::Failed`]. No resource
//! survives a failed creation.
//!
//! The graphics resources (rendering context, context-bound window, drawable)
//! are only ever valid while the display resources are, and are always
//! released before them.

use crate::events::KeyEventHandler;
use crate::geometry::Extent2d;

use super::platform::{
    ColormapId, ContextId, EventMask, FramebufferConfig, Platform, ScreenInfo, SurfaceId,
    WindowId, WindowParams,
};
use super::pump;
use super::{Window, WindowError, WindowResult};

/// Progress of window creation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendState {
    /// No native resource is held
    Uninitialized,
    /// The display is open
    DisplayOpen,
    /// The connection has been obtained from the display
    ConnectionBound,
    /// The active screen has been selected
    ScreenResolved,
    /// Rendering context and colormap exist
    ColormapReady,
    /// The native window exists and is mapped
    WindowCreated,
    /// The context is current on the window's drawable
    ContextCurrent,
    /// Creation failed; every partial resource has been released
    Failed,
}

/// Display-side resources
struct WindowResource<P: Platform> {
    display: Option<P::Display>,
    connection: Option<P::Connection>,
    screen: Option<ScreenInfo>,
    screen_index: usize,
    colormap: Option<ColormapId>,
    window: Option<WindowId>,
}

impl<P: Platform> Default for WindowResource<P> {
    fn default() -> Self {
        Self {
            display: None,
            connection: None,
            screen: None,
            screen_index: 0,
            colormap: None,
            window: None,
        }
    }
}

/// Graphics-side resources, nested inside the display resources
#[derive(Debug, Default)]
struct GraphicsResource {
    config: Option<FramebufferConfig>,
    context: Option<ContextId>,
    surface: Option<SurfaceId>,
    drawable: Option<SurfaceId>,
}

/// A platform window with a current rendering context
///
/// Single owner, single thread: the backend holds its native handles
/// exclusively and must be used from the thread that created it.
pub struct NativeWindow<P: Platform> {
    graphics: GraphicsResource,
    window: WindowResource<P>,
    platform: P,
    state: BackendState,
    extent: Extent2d,
}

impl<P: Platform> NativeWindow<P> {
    /// Create a backend with no native resources
    pub fn new(platform: P) -> Self {
        Self {
            graphics: GraphicsResource::default(),
            window: WindowResource::default(),
            platform,
            state: BackendState::Uninitialized,
            extent: Extent2d::default(),
        }
    }

    /// Bring up the window and make its rendering context current
    ///
    /// On error every resource acquired along the way has been released and
    /// the backend is in [`BackendState::Failed`]; it may be opened again.
    pub fn open(&mut self, extent: Extent2d, title: &[u8]) -> WindowResult<()> {
        if !matches!(self.state, BackendState::Uninitialized | BackendState::Failed) {
            return Err(WindowError::AlreadyCreated);
        }
        let (width, height) = extent.validate().ok_or(WindowError::InvalidExtent {
            width: extent.width,
            height: extent.height,
        })?;

        match self.acquire(width, height, title) {
            Ok(()) => {
                self.extent = extent;
                log::info!("Window created ({extent})");
                Ok(())
            }
            Err(err) => {
                log::warn!("Window creation failed in state {:?}: {err}", self.state);
                self.destroy();
                self.state = BackendState::Failed;
                Err(err)
            }
        }
    }

    fn acquire(&mut self, width: u16, height: u16, title: &[u8]) -> WindowResult<()> {
        let Self {
            graphics,
            window,
            platform,
            state,
            ..
        } = self;

        log::debug!("Opening display");
        let display = platform
            .open_display()
            .map_err(WindowError::DisplayUnavailable)?;
        let display = &*window.display.insert(display);
        window.screen_index = platform.default_screen(display);
        *state = BackendState::DisplayOpen;

        log::debug!("Obtaining connection");
        let connection = platform
            .connection(display)
            .map_err(WindowError::ConnectionUnavailable)?;
        let connection = &*window.connection.insert(connection);
        *state = BackendState::ConnectionBound;

        let screens = platform.screens(connection);
        let screen = *screens
            .get(window.screen_index)
            .ok_or(WindowError::ScreenOutOfRange {
                index: window.screen_index,
                count: screens.len(),
            })?;
        window.screen = Some(screen);
        *state = BackendState::ScreenResolved;
        log::debug!("Using screen {} ({}x{})", window.screen_index, screen.width_px, screen.height_px);

        let config = platform
            .framebuffer_configs(display, window.screen_index)
            .map_err(WindowError::FramebufferQuery)?
            .into_iter()
            .find(FramebufferConfig::is_compatible)
            .ok_or(WindowError::NoFramebufferConfig)?;
        let visual = config.visual.unwrap_or(screen.root_visual);
        let config = &*graphics.config.insert(config);
        log::debug!("Selected framebuffer config {:?} (visual {:?})", config.id, visual);

        let context = platform
            .create_context(display, window.screen_index, config)
            .map_err(WindowError::ContextCreation)?;
        graphics.context = Some(context);

        let colormap = platform
            .create_colormap(connection, screen.root, visual)
            .map_err(WindowError::ColormapCreation)?;
        window.colormap = Some(colormap);
        *state = BackendState::ColormapReady;

        let params = WindowParams {
            parent: screen.root,
            visual,
            colormap,
            width,
            height,
            event_mask: EventMask::WINDOW_DEFAULT,
            title,
        };
        let native = platform
            .create_window(connection, &params)
            .map_err(WindowError::WindowCreation)?;
        window.window = Some(native);
        platform
            .map_window(connection, native)
            .map_err(WindowError::MapWindow)?;
        *state = BackendState::WindowCreated;
        log::debug!("Native window {native:?} mapped");

        let surface = platform
            .create_surface(display, window.screen_index, config, native)
            .map_err(WindowError::SurfaceCreation)?;
        graphics.surface = Some(surface);
        platform
            .make_current(display, surface, context)
            .map_err(WindowError::MakeCurrent)?;
        graphics.drawable = Some(surface);
        *state = BackendState::ContextCurrent;

        Ok(())
    }

    /// Release every native resource, innermost first
    ///
    /// Safe to call repeatedly and on a backend that never finished (or never
    /// started) creation.
    pub fn destroy(&mut self) {
        let Self {
            graphics,
            window,
            platform,
            state,
            ..
        } = self;

        // The context binding has no release call of its own.
        graphics.drawable = None;

        if let Some(display) = window.display.as_ref() {
            if let Some(surface) = graphics.surface.take() {
                platform.destroy_surface(display, surface);
            }
            if let Some(connection) = window.connection.as_ref() {
                if let Some(native) = window.window.take() {
                    platform.destroy_window(connection, native);
                }
                if let Some(colormap) = window.colormap.take() {
                    platform.free_colormap(connection, colormap);
                }
            }
            if let Some(context) = graphics.context.take() {
                platform.destroy_context(display, context);
            }
        }
        graphics.config = None;
        window.screen = None;

        if let Some(connection) = window.connection.take() {
            platform.release_connection(connection);
        }
        if let Some(display) = window.display.take() {
            platform.close_display(display);
            log::debug!("Display closed");
        }

        if *state != BackendState::Failed {
            *state = BackendState::Uninitialized;
        }
    }

    /// Drain the native queue, forwarding key events to `handler`
    ///
    /// Never blocks. Returns the number of key events forwarded this tick.
    pub fn poll_events<H>(&mut self, handler: &mut H) -> WindowResult<usize>
    where
        H: KeyEventHandler + ?Sized,
    {
        if self.state != BackendState::ContextCurrent {
            return Err(WindowError::NotCreated);
        }
        let connection = self
            .window
            .connection
            .as_ref()
            .ok_or(WindowError::NotCreated)?;
        pump::drain(&mut self.platform, connection, handler).map_err(WindowError::EventQueue)
    }

    /// Current creation state
    pub const fn state(&self) -> BackendState {
        self.state
    }

    /// Whether the window is up with its context current
    pub fn is_current(&self) -> bool {
        self.state == BackendState::ContextCurrent
    }

    /// Extent the window was created with
    pub const fn extent(&self) -> Extent2d {
        self.extent
    }

    /// Native window id, once created
    pub const fn native_window(&self) -> Option<WindowId> {
        self.window.window
    }

    /// Drawable the context renders into, once current
    pub const fn drawable(&self) -> Option<SurfaceId> {
        self.graphics.drawable
    }

    /// Index of the screen in use
    pub const fn screen_index(&self) -> usize {
        self.window.screen_index
    }

    /// The platform this backend talks to
    pub const fn platform(&self) -> &P {
        &self.platform
    }
}

impl<P: Platform> Window for NativeWindow<P> {
    type Platform = P;

    fn create(platform: P, extent: Extent2d, title: &[u8]) -> WindowResult<Self> {
        let mut window = Self::new(platform);
        window.open(extent, title)?;
        Ok(window)
    }

    fn poll_events<H>(&mut self, handler: &mut H) -> WindowResult<usize>
    where
        H: KeyEventHandler + ?Sized,
    {
        Self::poll_events(self, handler)
    }

    fn extent(&self) -> Extent2d {
        self.extent
    }
}

impl<P: Platform> Drop for NativeWindow<P> {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl<P: Platform> std::fmt::Debug for NativeWindow<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeWindow")
            .field("state", &self.state)
            .field("extent", &self.extent)
            .field("screen", &self.window.screen_index)
            .field("window", &self.window.window)
            .field("graphics", &self.graphics)
            .finish_non_exhaustive()
    }
}
