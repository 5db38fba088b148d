use {
    crate::{
        driver::{Point, Screen},
        error::AutoclickError,
        matcher::Matcher,
        template::TemplateImage,
    },
    tracing::{debug, trace},
};

/// A template found on screen, in global coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchResult {
    /// Center of the matched region.
    pub point: Point,
    pub score: f64,
    /// Enumeration index of the display the match was found on.
    pub display_index: usize,
}

/// Single search attempt for a template. Implemented by [`Locator`].
pub trait Locate {
    fn locate(&self, template: &TemplateImage) -> Result<Option<MatchResult>, AutoclickError>;
}

/// Searches every display once, in enumeration order.
pub struct Locator<S> {
    screen: S,
    matcher: Matcher,
}

impl<S: Screen> Locator<S> {
    pub fn new(screen: S, matcher: Matcher) -> Self {
        Self { screen, matcher }
    }

    pub fn screen(&self) -> &S {
        &self.screen
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }
}

impl<S: Screen> Locate for Locator<S> {
    /// Returns the match on the first display that has one; later displays
    /// are not captured.
    fn locate(&self, template: &TemplateImage) -> Result<Option<MatchResult>, AutoclickError> {
        let displays = self.screen.displays().map_err(AutoclickError::Resource)?;
        for display in &displays {
            let raster = self
                .screen
                .capture(display)
                .map_err(AutoclickError::Resource)?;
            // tracing's macros import `field::display`, which would shadow the binding.
            let index = display.index;
            let Some(candidate) = self.matcher.find(raster.image(), template.image()) else {
                trace!("{} not on display #{}", template.name(), index);
                continue;
            };
            let (cx, cy) = candidate.center();
            let (x, y) = raster.to_global(cx, cy);
            debug!(
                "{} matched on display #{} with score {:.4}",
                template.name(),
                index,
                candidate.score
            );
            return Ok(Some(MatchResult {
                point: Point::new(x, y),
                score: candidate.score,
                display_index: display.index,
            }));
        }
        Ok(None)
    }
}
