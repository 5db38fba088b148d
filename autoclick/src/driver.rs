use {
    autoclick_desktop::{CapturedRaster, Context, DisplaySurface},
    std::{thread, time::Duration},
};

/// Global screen position in the coordinate space shared by all displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Source of display surfaces and their pixels.
pub trait Screen {
    fn displays(&self) -> anyhow::Result<Vec<DisplaySurface>>;
    fn capture(&self, display: &DisplaySurface) -> anyhow::Result<CapturedRaster>;
}

/// Synthetic pointer input.
pub trait Pointer {
    /// Moves the pointer to `point` and performs a primary click.
    fn click(&self, point: Point) -> anyhow::Result<()>;
}

pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

/// Blocks the current thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

impl Screen for Context {
    fn displays(&self) -> anyhow::Result<Vec<DisplaySurface>> {
        Context::displays(self)
    }

    fn capture(&self, display: &DisplaySurface) -> anyhow::Result<CapturedRaster> {
        self.capture_display(display)
    }
}

impl Pointer for Context {
    fn click(&self, point: Point) -> anyhow::Result<()> {
        self.click_global(point.x, point.y)
    }
}

impl<T: Screen + ?Sized> Screen for &T {
    fn displays(&self) -> anyhow::Result<Vec<DisplaySurface>> {
        (**self).displays()
    }

    fn capture(&self, display: &DisplaySurface) -> anyhow::Result<CapturedRaster> {
        (**self).capture(display)
    }
}
