use image::RgbImage;

/// Number of color channels in a sheet buffer.
pub const CHANNELS: usize = 3;

/// Rounded BT.601 luma of an RGB sample, in fixed point.
///
/// A sample whose luma rounds to zero counts as background.
#[inline]
pub fn luma(pixel: [u8; 3]) -> u8 {
    let [r, g, b] = pixel;
    ((r as u32 * 4899 + g as u32 * 9617 + b as u32 * 1868 + (1 << 13)) >> 14) as u8
}

/// A borrowed rectangular view into a color buffer.
///
/// Views never copy pixels; they only narrow the window that similarity
/// scoring and background checks read from.
#[derive(Debug, Clone, Copy)]
pub struct Region<'a> {
    image: &'a RgbImage,
    x: u32,
    y: u32,
    width: u32,
    height: u32,
}

impl<'a> Region<'a> {
    /// View covering the whole image.
    pub fn full(image: &'a RgbImage) -> Self {
        Self {
            image,
            x: 0,
            y: 0,
            width: image.width(),
            height: image.height(),
        }
    }

    /// Sub-view relative to this region's origin. Returns `None` if the
    /// requested rectangle does not lie entirely inside this region.
    pub fn sub(&self, x: u32, y: u32, width: u32, height: u32) -> Option<Region<'a>> {
        let fits_x = x.checked_add(width).is_some_and(|right| right <= self.width);
        let fits_y = y.checked_add(height).is_some_and(|bottom| bottom <= self.height);
        if !fits_x || !fits_y {
            return None;
        }
        Some(Self {
            image: self.image,
            x: self.x + x,
            y: self.y + y,
            width,
            height,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn same_shape(&self, other: &Region<'_>) -> bool {
        self.width == other.width && self.height == other.height
    }

    /// Interleaved RGB samples of row `dy` of this view.
    #[inline]
    pub fn row(&self, dy: u32) -> &'a [u8] {
        let stride = self.image.width() as usize * CHANNELS;
        let start = (self.y + dy) as usize * stride + self.x as usize * CHANNELS;
        &self.image.as_raw()[start..start + self.width as usize * CHANNELS]
    }

    /// RGB sample at `(dx, dy)` relative to the view origin.
    pub fn pixel(&self, dx: u32, dy: u32) -> [u8; 3] {
        self.image.get_pixel(self.x + dx, self.y + dy).0
    }

    /// Number of pixels whose luma is non-zero.
    pub fn non_background_count(&self) -> usize {
        (0..self.height)
            .map(|dy| {
                self.row(dy)
                    .chunks_exact(CHANNELS)
                    .filter(|px| luma([px[0], px[1], px[2]]) != 0)
                    .count()
            })
            .sum()
    }

    /// True when fewer than `(1 - ratio)` of the pixels are non-background,
    /// i.e. the view is more than `ratio` black.
    pub fn exceeds_background_ratio(&self, ratio: f64) -> bool {
        let area = self.width as f64 * self.height as f64;
        (self.non_background_count() as f64) < (1.0 - ratio) * area
    }

    /// Copy the view into an owned buffer.
    pub fn to_image(&self) -> RgbImage {
        let mut data = Vec::with_capacity(self.width as usize * self.height as usize * CHANNELS);
        for dy in 0..self.height {
            data.extend_from_slice(self.row(dy));
        }
        RgbImage::from_raw(self.width, self.height, data)
            .unwrap_or_else(|| RgbImage::new(self.width, self.height))
    }
}
