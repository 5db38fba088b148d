mod capture;
mod display;

pub use {
    crate::{
        capture::CapturedRaster,
        display::{all_displays, DisplaySurface},
    },
    enigo::Button,
};

use {
    enigo::{Coordinate, Direction, Enigo, Mouse},
    std::{
        sync::{Arc, Mutex},
        thread::sleep,
        time::Duration,
    },
    tracing::debug,
};

/// Pause after each injected input event so the window system can deliver it.
const INPUT_DELAY: Duration = Duration::from_millis(100);

struct ContextData {
    enigo: Mutex<Enigo>,
}

/// Access to the displays and the pointer of the current desktop session.
///
/// Input injection handles are not guaranteed to be `Send` on every platform,
/// so a context should be created on the thread that uses it.
#[derive(Clone)]
pub struct Context(Arc<ContextData>);

impl Context {
    #[allow(clippy::new_without_default)]
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self(Arc::new(ContextData {
            enigo: Mutex::new(Enigo::new(&enigo::Settings::default())?),
        })))
    }

    pub fn displays(&self) -> anyhow::Result<Vec<DisplaySurface>> {
        display::all_displays()
    }

    /// Captures the current content of `display`. Safe to call repeatedly.
    pub fn capture_display(&self, display: &DisplaySurface) -> anyhow::Result<CapturedRaster> {
        capture::capture(display)
    }

    pub fn mouse_move_global(&self, x: i32, y: i32) -> anyhow::Result<()> {
        self.0
            .enigo
            .lock()
            .unwrap()
            .move_mouse(x, y, Coordinate::Abs)?;
        sleep(INPUT_DELAY);
        Ok(())
    }

    pub fn mouse_click(&self, button: Button) -> anyhow::Result<()> {
        self.0
            .enigo
            .lock()
            .unwrap()
            .button(button, Direction::Click)?;
        sleep(INPUT_DELAY);
        Ok(())
    }

    pub fn mouse_left_click(&self) -> anyhow::Result<()> {
        self.mouse_click(Button::Left)
    }

    /// Moves the pointer to a global position and performs a primary click there.
    pub fn click_global(&self, x: i32, y: i32) -> anyhow::Result<()> {
        debug!("clicking at ({x}, {y})");
        self.mouse_move_global(x, y)?;
        self.mouse_left_click()
    }
}
