//! Headless platform
//!
//! An in-process stand-in for a display server. It hands out ids, keeps a
//! scripted event queue, and records every native call so tests and tooling
//! can check acquisition order, injected failures and leaks.
//!
//! Clones share one simulated server: keep a clone around to inspect the
//! state after handing the platform to a window.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use std::rc::Rc;

use super::platform::{
    category, ColormapId, ContextId, FbConfigId, FramebufferConfig, NativeEvent, Platform,
    PlatformError, PlatformResult, ScreenInfo, SurfaceId, VisualId, WindowId, WindowParams,
};

/// First id handed out, mirroring the X resource-id base
const FIRST_RESOURCE_ID: u32 = 0x0040_0000;

/// Failable native operations, used for failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    /// Opening the display
    OpenDisplay,
    /// Obtaining the connection from the display
    Connection,
    /// Querying framebuffer configurations
    FramebufferConfigs,
    /// Creating the rendering context
    CreateContext,
    /// Creating the colormap
    CreateColormap,
    /// Creating the native window
    CreateWindow,
    /// Mapping the native window
    MapWindow,
    /// Creating the context-bound window
    CreateSurface,
    /// Making the context current
    MakeCurrent,
    /// Flushing the connection
    Flush,
    /// Polling the event queue
    PollEvent,
}

/// A native call as recorded by the headless server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeCall {
    /// Display opened
    OpenDisplay,
    /// Connection obtained
    AcquireConnection,
    /// Connection released
    ReleaseConnection,
    /// Display closed
    CloseDisplay,
    /// Framebuffer configurations queried
    QueryFramebufferConfigs,
    /// Rendering context created from a framebuffer configuration
    CreateContext(ContextId, FbConfigId),
    /// Rendering context destroyed
    DestroyContext(ContextId),
    /// Colormap created
    CreateColormap(ColormapId),
    /// Colormap freed
    FreeColormap(ColormapId),
    /// Native window created
    CreateWindow(WindowId),
    /// Native window mapped
    MapWindow(WindowId),
    /// Native window destroyed
    DestroyWindow(WindowId),
    /// Context-bound window created
    CreateSurface(SurfaceId),
    /// Context-bound window destroyed
    DestroySurface(SurfaceId),
    /// Context made current on a drawable
    MakeCurrent(SurfaceId, ContextId),
    /// Connection flushed
    Flush,
}

/// A native resource tracked by the headless server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Resource {
    /// The open display
    Display,
    /// The connection obtained from the display
    Connection,
    /// A rendering context
    Context(ContextId),
    /// A colormap
    Colormap(ColormapId),
    /// A native window
    Window(WindowId),
    /// A context-bound window
    Surface(SurfaceId),
}

/// Display handle of the headless server
#[derive(Debug)]
pub struct HeadlessDisplay {
    default_screen: usize,
}

/// Connection handle of the headless server
#[derive(Debug)]
pub struct HeadlessConnection {
    _private: (),
}

#[derive(Debug)]
struct ServerState {
    screens: Vec<ScreenInfo>,
    default_screen: usize,
    configs: Vec<FramebufferConfig>,
    failures: HashSet<Step>,
    queue: VecDeque<NativeEvent>,
    calls: Vec<NativeCall>,
    live: BTreeSet<Resource>,
    titles: BTreeMap<WindowId, Vec<u8>>,
    mapped: BTreeSet<WindowId>,
    surfaces: BTreeMap<SurfaceId, WindowId>,
    current: Option<(SurfaceId, ContextId)>,
    invalid_releases: usize,
    next_id: u32,
}

impl ServerState {
    fn check(&self, step: Step) -> PlatformResult<()> {
        if self.failures.contains(&step) {
            Err(PlatformError::new(format!("injected failure at {step:?}")))
        } else {
            Ok(())
        }
    }

    fn allocate(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn acquire(&mut self, resource: Resource, call: NativeCall) {
        self.live.insert(resource);
        self.calls.push(call);
    }

    fn release(&mut self, resource: Resource, call: NativeCall) {
        if !self.live.remove(&resource) {
            log::error!("Headless server: release of {resource:?} which is not live");
            self.invalid_releases += 1;
        }
        self.calls.push(call);
    }

    fn require(&self, resource: Resource) -> PlatformResult<()> {
        if self.live.contains(&resource) {
            Ok(())
        } else {
            Err(PlatformError::new(format!("{resource:?} is not live")))
        }
    }
}

/// In-process display server
#[derive(Debug, Clone)]
pub struct HeadlessPlatform {
    state: Rc<RefCell<ServerState>>,
}

impl HeadlessPlatform {
    /// Root window of the default screen
    pub const ROOT: WindowId = WindowId(0x0000_0100);
    /// Visual of the compatible framebuffer configuration
    pub const VISUAL: VisualId = VisualId(0x21);

    /// A server with one 1920x1080 screen and two framebuffer configurations,
    /// the first of which has no visual
    pub fn new() -> Self {
        let screen = ScreenInfo {
            root: Self::ROOT,
            root_visual: Self::VISUAL,
            width_px: 1920,
            height_px: 1080,
        };
        let configs = vec![
            FramebufferConfig {
                id: FbConfigId(0x70),
                visual: None,
                window_capable: false,
                rgba: true,
            },
            FramebufferConfig {
                id: FbConfigId(0x71),
                visual: Some(Self::VISUAL),
                window_capable: true,
                rgba: true,
            },
        ];

        Self {
            state: Rc::new(RefCell::new(ServerState {
                screens: vec![screen],
                default_screen: 0,
                configs,
                failures: HashSet::new(),
                queue: VecDeque::new(),
                calls: Vec::new(),
                live: BTreeSet::new(),
                titles: BTreeMap::new(),
                mapped: BTreeSet::new(),
                surfaces: BTreeMap::new(),
                current: None,
                invalid_releases: 0,
                next_id: FIRST_RESOURCE_ID,
            })),
        }
    }

    /// Replace the screen list and the default screen index
    ///
    /// The index is not checked; an out-of-range default is reported when a
    /// window tries to resolve it.
    #[must_use]
    pub fn with_screens(self, screens: Vec<ScreenInfo>, default_screen: usize) -> Self {
        {
            let mut state = self.state.borrow_mut();
            state.screens = screens;
            state.default_screen = default_screen;
        }
        self
    }

    /// Replace the framebuffer configurations
    #[must_use]
    pub fn with_framebuffer_configs(self, configs: Vec<FramebufferConfig>) -> Self {
        self.state.borrow_mut().configs = configs;
        self
    }

    /// Make `step` fail until [`clear_failures`](Self::clear_failures) is called
    pub fn fail_at(&self, step: Step) {
        self.state.borrow_mut().failures.insert(step);
    }

    /// Remove every injected failure
    pub fn clear_failures(&self) {
        self.state.borrow_mut().failures.clear();
    }

    /// Append an event to the native queue
    pub fn push_event(&self, event: NativeEvent) {
        self.state.borrow_mut().queue.push_back(event);
    }

    /// Append a key press for `keycode`
    pub fn push_key_press(&self, keycode: u8) {
        self.push_event(NativeEvent::new(category::KEY_PRESS, keycode));
    }

    /// Append a key release for `keycode`
    pub fn push_key_release(&self, keycode: u8) {
        self.push_event(NativeEvent::new(category::KEY_RELEASE, keycode));
    }

    /// Number of events still queued
    pub fn pending_events(&self) -> usize {
        self.state.borrow().queue.len()
    }

    /// Every native call so far, in order
    pub fn calls(&self) -> Vec<NativeCall> {
        self.state.borrow().calls.clone()
    }

    /// Resources currently held
    pub fn live_resources(&self) -> Vec<Resource> {
        self.state.borrow().live.iter().copied().collect()
    }

    /// Releases of resources that were not live (double frees)
    pub fn invalid_releases(&self) -> usize {
        self.state.borrow().invalid_releases
    }

    /// Title given to `window` at creation
    pub fn window_title(&self, window: WindowId) -> Option<Vec<u8>> {
        self.state.borrow().titles.get(&window).cloned()
    }

    /// The drawable and context currently bound
    pub fn current(&self) -> Option<(SurfaceId, ContextId)> {
        self.state.borrow().current
    }
}

impl Default for HeadlessPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl Platform for HeadlessPlatform {
    type Display = HeadlessDisplay;
    type Connection = HeadlessConnection;

    fn open_display(&mut self) -> PlatformResult<HeadlessDisplay> {
        let mut state = self.state.borrow_mut();
        state.check(Step::OpenDisplay)?;
        if state.live.contains(&Resource::Display) {
            return Err(PlatformError::new("display already open"));
        }
        state.acquire(Resource::Display, NativeCall::OpenDisplay);
        Ok(HeadlessDisplay {
            default_screen: state.default_screen,
        })
    }

    fn default_screen(&self, display: &HeadlessDisplay) -> usize {
        display.default_screen
    }

    fn connection(&mut self, _display: &HeadlessDisplay) -> PlatformResult<HeadlessConnection> {
        let mut state = self.state.borrow_mut();
        state.check(Step::Connection)?;
        state.require(Resource::Display)?;
        state.acquire(Resource::Connection, NativeCall::AcquireConnection);
        Ok(HeadlessConnection { _private: () })
    }

    fn release_connection(&mut self, _connection: HeadlessConnection) {
        self.state
            .borrow_mut()
            .release(Resource::Connection, NativeCall::ReleaseConnection);
    }

    fn close_display(&mut self, _display: HeadlessDisplay) {
        let mut state = self.state.borrow_mut();
        state.release(Resource::Display, NativeCall::CloseDisplay);
        state.current = None;
    }

    fn screens(&self, _connection: &HeadlessConnection) -> Vec<ScreenInfo> {
        self.state.borrow().screens.clone()
    }

    fn framebuffer_configs(
        &mut self,
        _display: &HeadlessDisplay,
        _screen: usize,
    ) -> PlatformResult<Vec<FramebufferConfig>> {
        let mut state = self.state.borrow_mut();
        state.check(Step::FramebufferConfigs)?;
        state.calls.push(NativeCall::QueryFramebufferConfigs);
        Ok(state.configs.clone())
    }

    fn create_context(
        &mut self,
        _display: &HeadlessDisplay,
        _screen: usize,
        config: &FramebufferConfig,
    ) -> PlatformResult<ContextId> {
        let mut state = self.state.borrow_mut();
        state.check(Step::CreateContext)?;
        if !state.configs.contains(config) {
            return Err(PlatformError::new(format!("unknown config {:?}", config.id)));
        }
        let context = ContextId(state.allocate());
        state.acquire(
            Resource::Context(context),
            NativeCall::CreateContext(context, config.id),
        );
        Ok(context)
    }

    fn destroy_context(&mut self, _display: &HeadlessDisplay, context: ContextId) {
        let mut state = self.state.borrow_mut();
        state.release(Resource::Context(context), NativeCall::DestroyContext(context));
        if state.current.is_some_and(|(_, bound)| bound == context) {
            state.current = None;
        }
    }

    fn create_colormap(
        &mut self,
        _connection: &HeadlessConnection,
        root: WindowId,
        _visual: VisualId,
    ) -> PlatformResult<ColormapId> {
        let mut state = self.state.borrow_mut();
        state.check(Step::CreateColormap)?;
        if !state.screens.iter().any(|screen| screen.root == root) {
            return Err(PlatformError::new(format!("{root:?} is not a root window")));
        }
        let colormap = ColormapId(state.allocate());
        state.acquire(Resource::Colormap(colormap), NativeCall::CreateColormap(colormap));
        Ok(colormap)
    }

    fn free_colormap(&mut self, _connection: &HeadlessConnection, colormap: ColormapId) {
        self.state
            .borrow_mut()
            .release(Resource::Colormap(colormap), NativeCall::FreeColormap(colormap));
    }

    fn create_window(
        &mut self,
        _connection: &HeadlessConnection,
        params: &WindowParams<'_>,
    ) -> PlatformResult<WindowId> {
        let mut state = self.state.borrow_mut();
        state.check(Step::CreateWindow)?;
        state.require(Resource::Colormap(params.colormap))?;
        if params.width == 0 || params.height == 0 {
            return Err(PlatformError::new("zero-sized window"));
        }
        let window = WindowId(state.allocate());
        state.titles.insert(window, params.title.to_vec());
        state.acquire(Resource::Window(window), NativeCall::CreateWindow(window));
        Ok(window)
    }

    fn map_window(&mut self, _connection: &HeadlessConnection, window: WindowId) -> PlatformResult<()> {
        let mut state = self.state.borrow_mut();
        state.check(Step::MapWindow)?;
        state.require(Resource::Window(window))?;
        state.mapped.insert(window);
        state.calls.push(NativeCall::MapWindow(window));
        Ok(())
    }

    fn destroy_window(&mut self, _connection: &HeadlessConnection, window: WindowId) {
        let mut state = self.state.borrow_mut();
        state.mapped.remove(&window);
        state.titles.remove(&window);
        state.release(Resource::Window(window), NativeCall::DestroyWindow(window));
    }

    fn create_surface(
        &mut self,
        _display: &HeadlessDisplay,
        _screen: usize,
        _config: &FramebufferConfig,
        window: WindowId,
    ) -> PlatformResult<SurfaceId> {
        let mut state = self.state.borrow_mut();
        state.check(Step::CreateSurface)?;
        state.require(Resource::Window(window))?;
        let surface = SurfaceId(state.allocate());
        state.surfaces.insert(surface, window);
        state.acquire(Resource::Surface(surface), NativeCall::CreateSurface(surface));
        Ok(surface)
    }

    fn destroy_surface(&mut self, _display: &HeadlessDisplay, surface: SurfaceId) {
        let mut state = self.state.borrow_mut();
        state.surfaces.remove(&surface);
        if state.current.is_some_and(|(bound, _)| bound == surface) {
            state.current = None;
        }
        state.release(Resource::Surface(surface), NativeCall::DestroySurface(surface));
    }

    fn make_current(
        &mut self,
        _display: &HeadlessDisplay,
        drawable: SurfaceId,
        context: ContextId,
    ) -> PlatformResult<()> {
        let mut state = self.state.borrow_mut();
        state.check(Step::MakeCurrent)?;
        state.require(Resource::Surface(drawable))?;
        state.require(Resource::Context(context))?;
        let mapped = state
            .surfaces
            .get(&drawable)
            .is_some_and(|window| state.mapped.contains(window));
        if !mapped {
            return Err(PlatformError::new("window must be mapped before binding a context"));
        }
        state.current = Some((drawable, context));
        state.calls.push(NativeCall::MakeCurrent(drawable, context));
        Ok(())
    }

    fn flush(&mut self, _connection: &HeadlessConnection) -> PlatformResult<()> {
        let mut state = self.state.borrow_mut();
        state.check(Step::Flush)?;
        state.require(Resource::Connection)?;
        state.calls.push(NativeCall::Flush);
        Ok(())
    }

    fn poll_event(&mut self, _connection: &HeadlessConnection) -> PlatformResult<Option<NativeEvent>> {
        let mut state = self.state.borrow_mut();
        state.check(Step::PollEvent)?;
        Ok(state.queue.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        let mut platform = HeadlessPlatform::new();
        let display = platform.open_display().ok();
        assert!(display.is_some());
        let configs = HeadlessPlatform::new().state.borrow().configs.clone();

        let mut ids = BTreeSet::new();
        if let Some(display) = display.as_ref() {
            for _ in 0..4 {
                let context = platform.create_context(display, 0, &configs[1]);
                assert!(context.is_ok());
                ids.extend(context.ok());
            }
        }
        assert_eq!(ids.len(), 4);
    }

    #[test]
    fn test_injected_failure_blocks_step() {
        let mut platform = HeadlessPlatform::new();
        platform.fail_at(Step::OpenDisplay);
        assert!(platform.open_display().is_err());
        assert!(platform.live_resources().is_empty());

        platform.clear_failures();
        assert!(platform.open_display().is_ok());
        assert_eq!(platform.live_resources(), vec![Resource::Display]);
    }

    #[test]
    fn test_release_of_dead_resource_is_counted() {
        let mut platform = HeadlessPlatform::new();
        let display = HeadlessDisplay { default_screen: 0 };
        platform.destroy_context(&display, ContextId(7));
        assert_eq!(platform.invalid_releases(), 1);
    }

    #[test]
    fn test_queue_is_fifo() {
        let mut platform = HeadlessPlatform::new();
        platform.push_key_press(0x26);
        platform.push_key_release(0x26);
        let connection = HeadlessConnection { _private: () };

        assert_eq!(
            platform.poll_event(&connection).ok().flatten(),
            Some(NativeEvent::new(category::KEY_PRESS, 0x26))
        );
        assert_eq!(
            platform.poll_event(&connection).ok().flatten(),
            Some(NativeEvent::new(category::KEY_RELEASE, 0x26))
        );
        assert_eq!(platform.poll_event(&connection).ok().flatten(), None);
    }
}
