//! Normalized cross-correlation template matching over 8-bit RGB rasters.
//!
//! The score at an alignment is the correlation coefficient between the
//! template and the window of the raster under it, with each channel centered
//! on its own mean (the same measure as OpenCV's `TM_CCOEFF_NORMED` on
//! 3-channel images). A pixel-identical window scores 1.0.

use {
    image::RgbImage,
    serde::{Deserialize, Serialize},
};

pub const DEFAULT_THRESHOLD: f64 = 0.98;

/// Bounds that fall short of the floor by less than this are still scored.
const PRUNE_SLACK: f64 = 1e-9;

/// Minimum score for an alignment to count as a match.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchThreshold(f64);

impl MatchThreshold {
    pub fn new(value: f64) -> Self {
        Self(value)
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn accepts(self, score: f64) -> bool {
        score >= self.0
    }
}

impl Default for MatchThreshold {
    fn default() -> Self {
        Self(DEFAULT_THRESHOLD)
    }
}

/// Best alignment of a template inside a raster.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    /// Top-left corner of the matched window.
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub score: f64,
}

impl Candidate {
    /// Center of the matched window, the point a click should target.
    pub fn center(&self) -> (u32, u32) {
        (self.x + self.width / 2, self.y + self.height / 2)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Matcher {
    threshold: MatchThreshold,
}

impl Matcher {
    pub fn new(threshold: MatchThreshold) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> MatchThreshold {
        self.threshold
    }

    /// Returns the highest scoring alignment, or `None` when the template does
    /// not fit inside the raster. On ties the first alignment in row-major
    /// order wins.
    pub fn best_match(&self, raster: &RgbImage, template: &RgbImage) -> Option<Candidate> {
        scan(raster, template, None)
    }

    /// Like [`Matcher::best_match`], but only reports a candidate whose score
    /// passes the threshold. Alignments that provably cannot reach the
    /// threshold are abandoned early, which is what makes a full-screen search
    /// affordable.
    pub fn find(&self, raster: &RgbImage, template: &RgbImage) -> Option<Candidate> {
        scan(raster, template, Some(self.threshold.value()))
            .filter(|candidate| self.threshold.accepts(candidate.score))
    }
}

/// Score of a single alignment with the template's top-left corner at `(x, y)`.
pub fn ncc_score(raster: &RgbImage, template: &RgbImage, x: u32, y: u32) -> Option<f64> {
    let (tw, th) = (template.width() as usize, template.height() as usize);
    let (x, y) = (x as usize, y as usize);
    if tw == 0
        || th == 0
        || x + tw > raster.width() as usize
        || y + th > raster.height() as usize
    {
        return None;
    }
    let prepared = PreparedTemplate::new(template);
    let stride = raster.width() as usize * 3;
    let mut window = WindowSums::default();
    for row in raster.as_raw()[y * stride..(y + th) * stride].chunks_exact(stride) {
        for px in row[x * 3..(x + tw) * 3].chunks_exact(3) {
            window.add_pixel(px);
        }
    }
    prepared.score(raster.as_raw(), stride, x, y, &window, None)
}

fn scan(raster: &RgbImage, template: &RgbImage, threshold: Option<f64>) -> Option<Candidate> {
    let (iw, ih) = (raster.width() as usize, raster.height() as usize);
    let (tw, th) = (template.width() as usize, template.height() as usize);
    if tw == 0 || th == 0 || tw > iw || th > ih {
        return None;
    }

    let prepared = PreparedTemplate::new(template);
    let pixels = raster.as_raw();
    let stride = iw * 3;
    let mut columns = ColumnSums::new(pixels, stride, th);
    let mut best: Option<Candidate> = None;

    for y in 0..=(ih - th) {
        if y > 0 {
            columns.remove_row(pixels, stride, y - 1);
            columns.add_row(pixels, stride, y + th - 1);
        }
        let mut window = WindowSums::default();
        for x in 0..tw {
            window.add_column(&columns, x);
        }
        for x in 0..=(iw - tw) {
            if x > 0 {
                window.remove_column(&columns, x - 1);
                window.add_column(&columns, x + tw - 1);
            }
            // Only alignments that beat both the threshold and the current
            // best can change the result.
            let floor = match (threshold, best) {
                (Some(t), Some(b)) => Some(t.max(b.score)),
                (Some(t), None) => Some(t),
                (None, Some(b)) => Some(b.score),
                (None, None) => None,
            };
            let Some(score) = prepared.score(pixels, stride, x, y, &window, floor) else {
                continue;
            };
            if best.is_none_or(|b| score > b.score) {
                best = Some(Candidate {
                    x: x as u32,
                    y: y as u32,
                    width: tw as u32,
                    height: th as u32,
                    score,
                });
            }
        }
    }
    best
}

struct PreparedTemplate {
    width: usize,
    height: usize,
    /// Pixel values minus their channel mean, row-major, 3 values per pixel.
    centered: Vec<f64>,
    /// `remaining_energy[r]` is the centered energy of rows `r..height`.
    remaining_energy: Vec<f64>,
    sums: WindowSums,
}

impl PreparedTemplate {
    fn new(template: &RgbImage) -> Self {
        let width = template.width() as usize;
        let height = template.height() as usize;
        let mut sums = WindowSums::default();
        for px in template.as_raw().chunks_exact(3) {
            sums.add_pixel(px);
        }
        let means = sums.means((width * height) as u64);
        let centered: Vec<f64> = template
            .as_raw()
            .chunks_exact(3)
            .flat_map(|px| (0..3).map(move |c| f64::from(px[c]) - means[c]))
            .collect();
        let mut remaining_energy = vec![0.0; height + 1];
        for r in (0..height).rev() {
            let row = &centered[r * width * 3..(r + 1) * width * 3];
            remaining_energy[r] = remaining_energy[r + 1] + row.iter().map(|v| v * v).sum::<f64>();
        }
        Self {
            width,
            height,
            centered,
            remaining_energy,
            sums,
        }
    }

    fn pixel_count(&self) -> u64 {
        (self.width * self.height) as u64
    }

    /// Scores the window whose top-left corner is at `(x, y)`.
    ///
    /// With a `floor`, returns `None` as soon as the Cauchy-Schwarz bound on
    /// the rows not yet visited shows the score cannot reach it.
    fn score(
        &self,
        pixels: &[u8],
        stride: usize,
        x: usize,
        y: usize,
        window: &WindowSums,
        floor: Option<f64>,
    ) -> Option<f64> {
        let n = self.pixel_count();
        let template_flat = self.sums.is_flat(n);
        let window_flat = window.is_flat(n);
        if template_flat || window_flat {
            // Correlation is undefined without variance. Two flat regions
            // match exactly when their colors agree.
            let identical = template_flat && window_flat && self.sums.sum == window.sum;
            return Some(if identical { 1.0 } else { 0.0 });
        }

        let means = window.means(n);
        let window_energy = window.energy(n);
        let denominator = (self.remaining_energy[0] * window_energy).sqrt();
        let row_len = self.width * 3;
        let mut numerator = 0.0;
        let mut seen_energy = 0.0;
        for r in 0..self.height {
            let start = (y + r) * stride + x * 3;
            let row = &pixels[start..start + row_len];
            let template_row = &self.centered[r * row_len..(r + 1) * row_len];
            for (px, t) in row.chunks_exact(3).zip(template_row.chunks_exact(3)) {
                for c in 0..3 {
                    let d = f64::from(px[c]) - means[c];
                    numerator += t[c] * d;
                    seen_energy += d * d;
                }
            }
            if let Some(floor) = floor {
                let rest =
                    (self.remaining_energy[r + 1] * (window_energy - seen_energy).max(0.0)).sqrt();
                if (numerator + rest) / denominator < floor - PRUNE_SLACK {
                    return None;
                }
            }
        }
        Some((numerator / denominator).clamp(-1.0, 1.0))
    }
}

/// Per-column channel sums over the rows of the current window band.
struct ColumnSums {
    sum: Vec<[u64; 3]>,
    sq: Vec<[u64; 3]>,
}

impl ColumnSums {
    fn new(pixels: &[u8], stride: usize, rows: usize) -> Self {
        let width = stride / 3;
        let mut columns = Self {
            sum: vec![[0; 3]; width],
            sq: vec![[0; 3]; width],
        };
        for row in 0..rows {
            columns.add_row(pixels, stride, row);
        }
        columns
    }

    fn add_row(&mut self, pixels: &[u8], stride: usize, row: usize) {
        for (x, px) in pixels[row * stride..(row + 1) * stride]
            .chunks_exact(3)
            .enumerate()
        {
            for c in 0..3 {
                let v = u64::from(px[c]);
                self.sum[x][c] += v;
                self.sq[x][c] += v * v;
            }
        }
    }

    fn remove_row(&mut self, pixels: &[u8], stride: usize, row: usize) {
        for (x, px) in pixels[row * stride..(row + 1) * stride]
            .chunks_exact(3)
            .enumerate()
        {
            for c in 0..3 {
                let v = u64::from(px[c]);
                self.sum[x][c] -= v;
                self.sq[x][c] -= v * v;
            }
        }
    }
}

/// Exact integer channel sums of one window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct WindowSums {
    sum: [u64; 3],
    sq: [u64; 3],
}

impl WindowSums {
    fn add_pixel(&mut self, px: &[u8]) {
        for c in 0..3 {
            let v = u64::from(px[c]);
            self.sum[c] += v;
            self.sq[c] += v * v;
        }
    }

    fn add_column(&mut self, columns: &ColumnSums, x: usize) {
        for c in 0..3 {
            self.sum[c] += columns.sum[x][c];
            self.sq[c] += columns.sq[x][c];
        }
    }

    fn remove_column(&mut self, columns: &ColumnSums, x: usize) {
        for c in 0..3 {
            self.sum[c] -= columns.sum[x][c];
            self.sq[c] -= columns.sq[x][c];
        }
    }

    fn means(&self, n: u64) -> [f64; 3] {
        self.sum.map(|s| s as f64 / n as f64)
    }

    /// `n * Σv² - (Σv)²` per channel; zero exactly when that channel is constant.
    fn scaled_variances(&self, n: u64) -> [u128; 3] {
        let mut out = [0; 3];
        for c in 0..3 {
            let sum = u128::from(self.sum[c]);
            out[c] = u128::from(n) * u128::from(self.sq[c]) - sum * sum;
        }
        out
    }

    fn is_flat(&self, n: u64) -> bool {
        self.scaled_variances(n).iter().all(|&v| v == 0)
    }

    /// Sum of squared deviations from the channel means.
    fn energy(&self, n: u64) -> f64 {
        self.scaled_variances(n)
            .iter()
            .map(|&v| v as f64 / n as f64)
            .sum()
    }
}
