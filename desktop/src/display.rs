use {anyhow::Context as _, tracing::trace};

/// One physical monitor's rectangle in global screen coordinates.
///
/// Surfaces are produced fresh by every enumeration. `index` is the position
/// in enumeration order and is only stable for the current process run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplaySurface {
    pub index: usize,
    /// Platform monitor id, used to find the monitor again at capture time.
    pub id: u32,
    pub offset_x: i32,
    pub offset_y: i32,
    pub width: u32,
    pub height: u32,
}

impl DisplaySurface {
    pub fn contains(&self, x: i32, y: i32) -> bool {
        let right = i64::from(self.offset_x) + i64::from(self.width);
        let bottom = i64::from(self.offset_y) + i64::from(self.height);
        x >= self.offset_x
            && y >= self.offset_y
            && i64::from(x) < right
            && i64::from(y) < bottom
    }
}

fn surface_from_monitor(index: usize, monitor: &xcap::Monitor) -> anyhow::Result<DisplaySurface> {
    Ok(DisplaySurface {
        index,
        id: monitor.id()?,
        offset_x: monitor.x()?,
        offset_y: monitor.y()?,
        width: monitor.width()?,
        height: monitor.height()?,
    })
}

/// Returns every attached monitor in platform order.
///
/// xcap only reports physical monitors, so there is no combined
/// "all displays" pseudo-surface to filter out here.
pub fn all_displays() -> anyhow::Result<Vec<DisplaySurface>> {
    let monitors = xcap::Monitor::all().context("failed to enumerate monitors")?;
    let surfaces = monitors
        .iter()
        .enumerate()
        .map(|(index, monitor)| {
            surface_from_monitor(index, monitor)
                .with_context(|| format!("failed to query geometry of monitor #{index}"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    trace!("enumerated displays: {:?}", surfaces);
    Ok(surfaces)
}

pub(crate) fn find_monitor(display: &DisplaySurface) -> anyhow::Result<xcap::Monitor> {
    for monitor in xcap::Monitor::all().context("failed to enumerate monitors")? {
        if monitor.id()? == display.id {
            return Ok(monitor);
        }
    }
    anyhow::bail!(
        "display #{} (id={}) is no longer attached",
        display.index,
        display.id
    )
}

#[test]
fn contains_is_half_open() {
    let surface = DisplaySurface {
        index: 1,
        id: 7,
        offset_x: -1280,
        offset_y: 0,
        width: 1280,
        height: 1024,
    };
    assert!(surface.contains(-1280, 0));
    assert!(surface.contains(-1, 1023));
    assert!(!surface.contains(0, 0));
    assert!(!surface.contains(-1, 1024));
    assert!(!surface.contains(-1281, 10));
}
