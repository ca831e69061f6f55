//! Search for square tiles that are not mostly background.
//!
//! Tiles are visited as a raster of `dim × dim` cells: left to right, bottom
//! row first, moving one tile height up each time a row is exhausted. Faces
//! in a sheet sit below the body, so the first usable tile from the bottom
//! left is the best guess for a face sample.

use log::debug;

use crate::buffer::Region;

/// A `dim × dim` tile accepted by the search, with its origin.
#[derive(Debug, Clone, Copy)]
pub struct Tile<'a> {
    pub region: Region<'a>,
    pub x: u32,
    pub y: u32,
}

/// Find the first tile at or after `(start_x, start_y)` in raster order whose
/// background share does not exceed `max_background_ratio`.
///
/// A tile that would cross the right edge wraps the search to column 0 of
/// the row above. Returns `None` once the row origin leaves the image.
pub fn find_tile<'a>(
    image: &Region<'a>,
    dim: u32,
    start_x: u32,
    start_y: i64,
    max_background_ratio: f64,
) -> Option<Tile<'a>> {
    if dim == 0 {
        return None;
    }
    let step = dim as i64;
    let (width, height) = (image.width() as i64, image.height() as i64);
    let (mut x, mut y) = (start_x as i64, start_y);

    loop {
        if x + step > width {
            x = 0;
            y -= step;
        }
        if y < 0 || y + step > height {
            return None;
        }

        let region = image.sub(x as u32, y as u32, dim, dim)?;
        if !region.exceeds_background_ratio(max_background_ratio) {
            return Some(Tile {
                region,
                x: x as u32,
                y: y as u32,
            });
        }
        debug!("{} {} {} is too black.", dim, x, y);
        x += step;
    }
}

/// Find the first usable tile starting from the bottom-left corner.
pub fn find_first_tile<'a>(
    image: &Region<'a>,
    dim: u32,
    max_background_ratio: f64,
) -> Option<Tile<'a>> {
    let start_y = image.height() as i64 - dim as i64;
    find_tile(image, dim, 0, start_y, max_background_ratio)
}
