//! Loading sprite sheets into opaque color buffers.
//!
//! Sheets usually carry an alpha channel. The analysis works on RGB only, so
//! transparent pixels are composited against black. Sheets that come out
//! almost entirely black (dark line art on a transparent background) are
//! inverted before compositing so the artwork stays distinguishable from
//! the backdrop.

use std::path::Path;

use image::{DynamicImage, Rgb, RgbImage, RgbaImage};
use log::info;

use crate::buffer::Region;
use crate::error::{Error, Result};

/// Default fraction of black pixels above which a composited sheet is
/// inverted.
pub const DEFAULT_INVERT_BLACK_RATIO: f64 = 0.95;

/// Decode the image at `path` and composite it against black.
pub fn load<P: AsRef<Path>>(path: P, invert_black_ratio: f64) -> Result<RgbImage> {
    let path = path.as_ref();
    let decoded = image::open(path).map_err(|source| Error::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(composite(&decoded, invert_black_ratio))
}

/// Strip the alpha channel of `image` by premultiplying against black.
///
/// Images without alpha are returned as plain RGB.
pub fn composite(image: &DynamicImage, invert_black_ratio: f64) -> RgbImage {
    if !image.color().has_alpha() {
        return image.to_rgb8();
    }

    let rgba = image.to_rgba8();
    let flattened = premultiply(&rgba, false);
    if Region::full(&flattened).exceeds_background_ratio(invert_black_ratio) {
        info!(
            "Image is over {}% black. Inverting colors.",
            invert_black_ratio * 100.0
        );
        return premultiply(&rgba, true);
    }
    flattened
}

fn premultiply(rgba: &RgbaImage, invert: bool) -> RgbImage {
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let alpha = a as f64 / 255.0;
        let channel = |c: u8| {
            let c = if invert { 255 - c } else { c };
            (alpha * c as f64) as u8
        };
        Rgb([channel(r), channel(g), channel(b)])
    })
}

/// Prepend `rows` black rows to `image`.
///
/// The boundary scan uses this band to probe above the sheet's top edge.
pub fn pad_top(image: &RgbImage, rows: u32) -> RgbImage {
    let mut padded = RgbImage::new(image.width(), image.height() + rows);
    image::imageops::replace(&mut padded, image, 0, rows as i64);
    padded
}
