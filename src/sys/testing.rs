//! In-memory window server used by the engine and controller tests.

use parking_lot::Mutex;

use super::geometry::Rect;
use super::window_server::{Error, RawWindow, Result, WindowHandle, WindowServer, WindowState};

#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Restore(WindowHandle),
    SetFrame(WindowHandle, Rect),
    Raise(WindowHandle),
}

struct FakeWindow {
    raw: RawWindow,
    state: WindowState,
    frame: Rect,
    refuse_moves: bool,
}

struct State {
    windows: Vec<FakeWindow>,
    frontmost: Option<WindowHandle>,
    screen: Rect,
    work_area: Rect,
    ops: Vec<Op>,
    next_id: u32,
}

pub struct FakeWindowServer {
    state: Mutex<State>,
}

impl FakeWindowServer {
    pub fn new() -> Self {
        Self::with_screen(Rect::new(0.0, 0.0, 1920.0, 1080.0), Rect::new(0.0, 0.0, 1920.0, 1040.0))
    }

    pub fn with_screen(screen: Rect, work_area: Rect) -> Self {
        FakeWindowServer {
            state: Mutex::new(State {
                windows: Vec::new(),
                frontmost: None,
                screen,
                work_area,
                ops: Vec::new(),
                next_id: 1,
            }),
        }
    }

    pub fn add_window(&self, title: &str, class: &str) -> WindowHandle {
        let pid = 1000 + self.state.lock().next_id;
        self.add_window_for_pid(title, class, pid)
    }

    pub fn add_window_for_pid(&self, title: &str, class: &str, pid: u32) -> WindowHandle {
        let mut s = self.state.lock();
        let handle = WindowHandle::from_parts(pid, s.next_id);
        s.next_id += 1;
        let frame = Rect::new(100.0, 100.0, 800.0, 600.0);
        s.windows.push(FakeWindow {
            raw: RawWindow {
                handle,
                owner_pid: pid,
                class: class.to_string(),
                title: title.to_string(),
                is_visible: true,
                bounds: Some(frame),
            },
            state: WindowState::Normal,
            frame,
            refuse_moves: false,
        });
        if s.frontmost.is_none() {
            s.frontmost = Some(handle);
        }
        handle
    }

    pub fn set_visible(&self, handle: WindowHandle, visible: bool) {
        self.with_window(handle, |w| w.raw.is_visible = visible);
    }

    pub fn break_geometry(&self, handle: WindowHandle) {
        self.with_window(handle, |w| w.raw.bounds = None);
    }

    pub fn set_state(&self, handle: WindowHandle, state: WindowState) {
        self.with_window(handle, |w| w.state = state);
    }

    pub fn refuse_moves(&self, handle: WindowHandle) {
        self.with_window(handle, |w| w.refuse_moves = true);
    }

    /// Removes the window from the OS table; its handle becomes stale.
    pub fn close(&self, handle: WindowHandle) {
        let mut s = self.state.lock();
        s.windows.retain(|w| w.raw.handle != handle);
        if s.frontmost == Some(handle) {
            s.frontmost = None;
        }
    }

    pub fn set_frontmost(&self, handle: Option<WindowHandle>) { self.state.lock().frontmost = handle; }

    pub fn frame(&self, handle: WindowHandle) -> Option<Rect> {
        self.state.lock().windows.iter().find(|w| w.raw.handle == handle).map(|w| w.frame)
    }

    pub fn state_of(&self, handle: WindowHandle) -> Option<WindowState> {
        self.state.lock().windows.iter().find(|w| w.raw.handle == handle).map(|w| w.state)
    }

    pub fn ops(&self) -> Vec<Op> { self.state.lock().ops.clone() }

    pub fn moved(&self) -> Vec<WindowHandle> {
        self.ops()
            .into_iter()
            .filter_map(|op| match op {
                Op::SetFrame(h, _) => Some(h),
                _ => None,
            })
            .collect()
    }

    fn with_window(&self, handle: WindowHandle, f: impl FnOnce(&mut FakeWindow)) {
        if let Some(w) = self.state.lock().windows.iter_mut().find(|w| w.raw.handle == handle) {
            f(w);
        }
    }

    fn mutate<T>(
        &self,
        handle: WindowHandle,
        op: Op,
        f: impl FnOnce(&mut FakeWindow) -> Result<T>,
    ) -> Result<T> {
        let mut s = self.state.lock();
        let window = s
            .windows
            .iter_mut()
            .find(|w| w.raw.handle == handle)
            .ok_or(Error::StaleHandle(handle))?;
        let out = f(window)?;
        s.ops.push(op);
        Ok(out)
    }
}

impl Default for FakeWindowServer {
    fn default() -> Self { Self::new() }
}

impl WindowServer for FakeWindowServer {
    fn windows(&self) -> Vec<RawWindow> {
        self.state.lock().windows.iter().map(|w| w.raw.clone()).collect()
    }

    fn frontmost_window(&self) -> Option<WindowHandle> { self.state.lock().frontmost }

    fn window_state(&self, handle: WindowHandle) -> Result<WindowState> {
        let s = self.state.lock();
        s.windows
            .iter()
            .find(|w| w.raw.handle == handle)
            .map(|w| w.state)
            .ok_or(Error::StaleHandle(handle))
    }

    fn restore(&self, handle: WindowHandle) -> Result<()> {
        self.mutate(handle, Op::Restore(handle), |w| {
            w.state = WindowState::Normal;
            Ok(())
        })
    }

    fn set_frame(&self, handle: WindowHandle, frame: Rect) -> Result<()> {
        self.mutate(handle, Op::SetFrame(handle, frame), |w| {
            if w.refuse_moves {
                return Err(Error::Os {
                    handle,
                    message: "window refused the new frame".into(),
                });
            }
            // mirrors the platform: geometry calls are ignored while maximized or minimized
            if w.state == WindowState::Normal {
                w.frame = frame;
                w.raw.bounds = Some(frame);
            }
            Ok(())
        })
    }

    fn raise(&self, handle: WindowHandle) -> Result<()> {
        let out = self.mutate(handle, Op::Raise(handle), |_| Ok(()));
        if out.is_ok() {
            self.state.lock().frontmost = Some(handle);
        }
        out
    }

    fn screen_bounds(&self) -> Rect { self.state.lock().screen }

    fn work_area(&self) -> Rect { self.state.lock().work_area }
}
