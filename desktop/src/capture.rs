use {
    crate::display::{find_monitor, DisplaySurface},
    anyhow::Context as _,
    image::{DynamicImage, RgbImage, RgbaImage},
    tracing::trace,
};

/// Pixels of one display surface, normalized to 8-bit RGB.
///
/// Platform captures come in with an alpha channel (and on some platforms
/// a different channel order, which xcap already swaps); the alpha channel
/// is dropped here so every raster has the same 3-channel layout.
#[derive(Debug, Clone)]
pub struct CapturedRaster {
    display: DisplaySurface,
    image: RgbImage,
}

impl CapturedRaster {
    pub fn new(display: DisplaySurface, image: RgbImage) -> Self {
        Self { display, image }
    }

    pub fn from_rgba(display: DisplaySurface, image: RgbaImage) -> Self {
        Self::new(display, DynamicImage::ImageRgba8(image).into_rgb8())
    }

    pub fn display(&self) -> &DisplaySurface {
        &self.display
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Converts a pixel position inside the raster to global screen coordinates.
    ///
    /// On HiDPI displays the capture has more pixels than the surface has
    /// logical points, so the position is scaled down before the surface
    /// offset is applied.
    pub fn to_global(&self, x: u32, y: u32) -> (i32, i32) {
        let scale_x = axis_scale(self.display.width, self.image.width());
        let scale_y = axis_scale(self.display.height, self.image.height());
        (
            self.display.offset_x + (f64::from(x) * scale_x).round() as i32,
            self.display.offset_y + (f64::from(y) * scale_y).round() as i32,
        )
    }
}

fn axis_scale(logical: u32, physical: u32) -> f64 {
    if logical == 0 || physical == 0 || logical == physical {
        1.0
    } else {
        f64::from(logical) / f64::from(physical)
    }
}

pub(crate) fn capture(display: &DisplaySurface) -> anyhow::Result<CapturedRaster> {
    let monitor = find_monitor(display)?;
    let image = monitor
        .capture_image()
        .with_context(|| format!("failed to capture display #{}", display.index))?;
    // tracing's macros import `field::display`, which would shadow the binding.
    let index = display.index;
    trace!(
        "captured display #{}: {}x{}",
        index,
        image.width(),
        image.height()
    );
    Ok(CapturedRaster::from_rgba(*display, image))
}

#[cfg(test)]
mod tests {
    use {super::*, image::Rgba};

    fn surface(offset_x: i32, offset_y: i32, width: u32, height: u32) -> DisplaySurface {
        DisplaySurface {
            index: 0,
            id: 1,
            offset_x,
            offset_y,
            width,
            height,
        }
    }

    #[test]
    fn drops_alpha_channel() {
        let rgba = RgbaImage::from_pixel(4, 3, Rgba([10, 20, 30, 0]));
        let raster = CapturedRaster::from_rgba(surface(0, 0, 4, 3), rgba);
        assert_eq!(raster.image().get_pixel(2, 1).0, [10, 20, 30]);
        assert_eq!((raster.width(), raster.height()), (4, 3));
    }

    #[test]
    fn global_coordinates_add_offset() {
        let raster = CapturedRaster::new(surface(1920, -200, 100, 50), RgbImage::new(100, 50));
        assert_eq!(raster.to_global(10, 20), (1930, -180));
    }

    #[test]
    fn global_coordinates_scale_hidpi_captures() {
        let raster = CapturedRaster::new(surface(1440, 0, 100, 50), RgbImage::new(200, 100));
        assert_eq!(raster.to_global(60, 30), (1470, 15));
    }
}
