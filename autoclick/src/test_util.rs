use {
    crate::{
        driver::{Point, Pointer, Screen, Sleeper},
        error::AutoclickError,
        locator::{Locate, MatchResult},
        template::TemplateImage,
    },
    anyhow::bail,
    autoclick_desktop::{CapturedRaster, DisplaySurface},
    image::{GenericImage, RgbImage},
    std::{
        cell::{Cell, RefCell},
        collections::VecDeque,
        path::{Path, PathBuf},
        time::Duration,
    },
};

/// Deterministic pseudo-random image.
pub fn noise(width: u32, height: u32, seed: u64) -> RgbImage {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    RgbImage::from_fn(width, height, |_, _| {
        let mut channel = || {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (state >> 56) as u8
        };
        image::Rgb([channel(), channel(), channel()])
    })
}

pub fn paste(target: &mut RgbImage, source: &RgbImage, x: u32, y: u32) {
    target.copy_from(source, x, y).unwrap();
}

pub fn surface(index: usize, offset_x: i32, offset_y: i32, width: u32, height: u32) -> DisplaySurface {
    DisplaySurface {
        index,
        id: index as u32 + 1,
        offset_x,
        offset_y,
        width,
        height,
    }
}

pub fn write_png(dir: &Path, name: &str, image: &RgbImage) -> PathBuf {
    let path = dir.join(name);
    image.save(&path).unwrap();
    path
}

pub struct FakeScreen {
    displays: Vec<(DisplaySurface, RgbImage)>,
    captured: RefCell<Vec<usize>>,
    fail_capture: bool,
}

impl FakeScreen {
    pub fn new(displays: Vec<(DisplaySurface, RgbImage)>) -> Self {
        Self {
            displays,
            captured: RefCell::new(Vec::new()),
            fail_capture: false,
        }
    }

    pub fn failing_capture(mut self) -> Self {
        self.fail_capture = true;
        self
    }

    /// Indices of the displays captured so far, in order.
    pub fn captured(&self) -> Vec<usize> {
        self.captured.borrow().clone()
    }
}

impl Screen for FakeScreen {
    fn displays(&self) -> anyhow::Result<Vec<DisplaySurface>> {
        Ok(self.displays.iter().map(|(surface, _)| *surface).collect())
    }

    fn capture(&self, display: &DisplaySurface) -> anyhow::Result<CapturedRaster> {
        if self.fail_capture {
            bail!("screen recording permission denied");
        }
        self.captured.borrow_mut().push(display.index);
        let (surface, image) = &self.displays[display.index];
        Ok(CapturedRaster::new(*surface, image.clone()))
    }
}

/// Returns scripted results in order, then `None` (or an error) forever.
pub struct ScriptedLocator {
    script: RefCell<VecDeque<Option<MatchResult>>>,
    fail_when_done: bool,
    calls: Cell<usize>,
}

impl ScriptedLocator {
    pub fn new(script: Vec<Option<MatchResult>>) -> Self {
        Self {
            script: RefCell::new(script.into()),
            fail_when_done: false,
            calls: Cell::new(0),
        }
    }

    pub fn never() -> Self {
        Self::new(Vec::new())
    }

    pub fn failing_after(script: Vec<Option<MatchResult>>) -> Self {
        Self {
            fail_when_done: true,
            ..Self::new(script)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl Locate for ScriptedLocator {
    fn locate(&self, _template: &TemplateImage) -> Result<Option<MatchResult>, AutoclickError> {
        self.calls.set(self.calls.get() + 1);
        match self.script.borrow_mut().pop_front() {
            Some(result) => Ok(result),
            None if self.fail_when_done => Err(AutoclickError::Resource(anyhow::anyhow!(
                "display went away"
            ))),
            None => Ok(None),
        }
    }
}

/// Answers by template name and records every search.
pub struct TemplateLocator {
    answers: Vec<(&'static str, Option<MatchResult>)>,
    searched: RefCell<Vec<String>>,
}

impl TemplateLocator {
    pub fn new(answers: Vec<(&'static str, Option<MatchResult>)>) -> Self {
        Self {
            answers,
            searched: RefCell::new(Vec::new()),
        }
    }

    pub fn searched(&self) -> Vec<String> {
        self.searched.borrow().clone()
    }
}

impl Locate for TemplateLocator {
    fn locate(&self, template: &TemplateImage) -> Result<Option<MatchResult>, AutoclickError> {
        self.searched.borrow_mut().push(template.name().to_string());
        Ok(self
            .answers
            .iter()
            .find(|(name, _)| *name == template.name())
            .and_then(|(_, answer)| *answer))
    }
}

#[derive(Default)]
pub struct RecordingPointer {
    clicks: RefCell<Vec<Point>>,
}

impl RecordingPointer {
    pub fn clicks(&self) -> Vec<Point> {
        self.clicks.borrow().clone()
    }
}

impl Pointer for RecordingPointer {
    fn click(&self, point: Point) -> anyhow::Result<()> {
        self.clicks.borrow_mut().push(point);
        Ok(())
    }
}

pub struct FailingPointer;

impl Pointer for FailingPointer {
    fn click(&self, _point: Point) -> anyhow::Result<()> {
        bail!("input injection is not permitted")
    }
}

#[derive(Default)]
pub struct RecordingSleeper {
    sleeps: RefCell<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.borrow().clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.sleeps.borrow_mut().push(duration);
    }
}
