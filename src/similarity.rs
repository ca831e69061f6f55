//! Region similarity scoring.
//!
//! The analysis only needs two operations: scoring two equally sized regions
//! against each other, and finding the best placement of a small region
//! inside a larger one. [`NormedCrossCorrelation`] implements both as
//! normalized cross-correlation over all three color channels:
//!
//! ```text
//! score = Σ a·b / sqrt(Σ a² · Σ b²)
//! ```
//!
//! Samples are non-negative, so scores fall in `[0, 1]`. Near-uniform regions
//! correlate strongly with almost anything, which is why the resolver
//! distrusts large tiles.

use rayon::prelude::*;

use crate::buffer::{Region, CHANNELS};

/// Best placement of a needle inside a haystack.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Match {
    pub score: f64,
    /// Column of the needle's top-left corner, relative to the haystack.
    pub x: u32,
    /// Row of the needle's top-left corner, relative to the haystack.
    pub y: u32,
}

/// Scoring primitive used by the estimator and resolver.
pub trait Similarity: Sync {
    /// Agreement of two regions of identical shape, in `[0, 1]`.
    fn compare(&self, a: &Region<'_>, b: &Region<'_>) -> f64;

    /// Best match of `needle` anywhere inside `haystack`.
    ///
    /// Returns `None` if the needle is empty or larger than the haystack.
    /// Ties resolve to the first position in row-major order.
    fn locate(&self, haystack: &Region<'_>, needle: &Region<'_>) -> Option<Match>;
}

/// Normalized cross-correlation, summed over RGB.
#[derive(Debug, Clone, Copy, Default)]
pub struct NormedCrossCorrelation;

#[inline]
fn dot(a: &[u8], b: &[u8]) -> u64 {
    a.iter().zip(b).map(|(&p, &q)| p as u64 * q as u64).sum()
}

#[inline]
fn energy(a: &[u8]) -> u64 {
    a.iter().map(|&p| p as u64 * p as u64).sum()
}

fn normalize(cross: u64, energy_a: u64, energy_b: u64) -> f64 {
    let denom = (energy_a as f64 * energy_b as f64).sqrt();
    if denom <= 0.0 {
        return 0.0;
    }
    (cross as f64 / denom).min(1.0)
}

/// Summed-area table of squared samples, one entry per pixel corner.
struct SquaredIntegral {
    width: usize,
    sums: Vec<u64>,
}

impl SquaredIntegral {
    fn new(region: &Region<'_>) -> Self {
        let width = region.width() as usize + 1;
        let height = region.height() as usize + 1;
        let mut sums = vec![0u64; width * height];
        for y in 0..region.height() as usize {
            let mut row_sum = 0u64;
            for (x, px) in region.row(y as u32).chunks_exact(CHANNELS).enumerate() {
                row_sum += energy(px);
                sums[(y + 1) * width + x + 1] = sums[y * width + x + 1] + row_sum;
            }
        }
        Self { width, sums }
    }

    fn window(&self, x: usize, y: usize, w: usize, h: usize) -> u64 {
        let at = |cx: usize, cy: usize| self.sums[cy * self.width + cx];
        at(x + w, y + h) + at(x, y) - at(x + w, y) - at(x, y + h)
    }
}

impl Similarity for NormedCrossCorrelation {
    fn compare(&self, a: &Region<'_>, b: &Region<'_>) -> f64 {
        debug_assert!(a.same_shape(b), "compare requires equal shapes");
        if !a.same_shape(b) || a.is_empty() {
            return 0.0;
        }
        let (mut cross, mut energy_a, mut energy_b) = (0u64, 0u64, 0u64);
        for dy in 0..a.height() {
            let (ra, rb) = (a.row(dy), b.row(dy));
            cross += dot(ra, rb);
            energy_a += energy(ra);
            energy_b += energy(rb);
        }
        normalize(cross, energy_a, energy_b)
    }

    fn locate(&self, haystack: &Region<'_>, needle: &Region<'_>) -> Option<Match> {
        if needle.is_empty()
            || needle.width() > haystack.width()
            || needle.height() > haystack.height()
        {
            return None;
        }

        let (nw, nh) = (needle.width() as usize, needle.height() as usize);
        let needle_energy: u64 = (0..needle.height()).map(|dy| energy(needle.row(dy))).sum();
        let integral = SquaredIntegral::new(haystack);
        let positions_x = haystack.width() as usize - nw + 1;
        let positions_y = haystack.height() - needle.height() + 1;

        let row_best: Vec<(f64, u32)> = (0..positions_y)
            .into_par_iter()
            .map(|y| {
                let mut best = (f64::NEG_INFINITY, 0u32);
                for x in 0..positions_x {
                    let start = x * CHANNELS;
                    let end = start + nw * CHANNELS;
                    let cross: u64 = (0..needle.height())
                        .map(|dy| dot(&haystack.row(y + dy)[start..end], needle.row(dy)))
                        .sum();
                    let window_energy = integral.window(x, y as usize, nw, nh);
                    let score = normalize(cross, window_energy, needle_energy);
                    if score > best.0 {
                        best = (score, x as u32);
                    }
                }
                best
            })
            .collect();

        let mut best: Option<Match> = None;
        for (y, (score, x)) in row_best.into_iter().enumerate() {
            if best.map_or(true, |b| score > b.score) {
                best = Some(Match {
                    score,
                    x,
                    y: y as u32,
                });
            }
        }
        best
    }
}
