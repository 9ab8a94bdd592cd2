use std::path::Path;

use image::{GrayImage, ImageBuffer, Luma, Rgb, RgbImage};
use ndarray::Array2;
use rayon::prelude::*;

use crate::volume::VolumeError;

/// A single-channel 8-bit image, indexed `[y][x]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster2D {
    data: Array2<u8>,
}

impl Raster2D {
    /// Create a zero-filled raster of `size_x` columns and `size_y` rows.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::InvalidConfiguration`] if either size is zero.
    pub fn new(size_x: usize, size_y: usize) -> Result<Self, VolumeError> {
        if size_x == 0 || size_y == 0 {
            return Err(VolumeError::InvalidConfiguration(format!(
                "raster dimensions must be positive, got {size_x}x{size_y}"
            )));
        }
        Ok(Self {
            data: Array2::zeros((size_y, size_x)),
        })
    }

    /// Wrap an array of shape `(size_y, size_x)`.
    pub fn from_array(data: Array2<u8>) -> Result<Self, VolumeError> {
        let (size_y, size_x) = data.dim();
        if size_x == 0 || size_y == 0 {
            return Err(VolumeError::InvalidConfiguration(format!(
                "raster dimensions must be positive, got {size_x}x{size_y}"
            )));
        }
        Ok(Self { data })
    }

    /// Build a raster from row-major pixels (`y` outer, `x` inner).
    pub(crate) fn from_row_major(
        size_x: usize,
        size_y: usize,
        pixels: Vec<u8>,
    ) -> Result<Self, VolumeError> {
        let data = Array2::from_shape_vec((size_y, size_x), pixels).map_err(|e| {
            VolumeError::InvalidConfiguration(format!("raster buffer does not fit shape: {e}"))
        })?;
        Self::from_array(data)
    }

    pub fn size_x(&self) -> usize {
        self.data.dim().1
    }

    pub fn size_y(&self) -> usize {
        self.data.dim().0
    }

    /// Get a reference to the underlying data
    pub fn data(&self) -> &Array2<u8> {
        &self.data
    }

    fn out_of_range(&self, x: usize, y: usize) -> VolumeError {
        VolumeError::OutOfRange {
            coord: [x, y, 0],
            size: [self.size_x(), self.size_y(), 1],
        }
    }

    pub fn get(&self, x: usize, y: usize) -> Result<u8, VolumeError> {
        self.data
            .get((y, x))
            .copied()
            .ok_or_else(|| self.out_of_range(x, y))
    }

    pub fn set(&mut self, x: usize, y: usize, value: u8) -> Result<(), VolumeError> {
        let error = self.out_of_range(x, y);
        let pixel = self.data.get_mut((y, x)).ok_or(error)?;
        *pixel = value;
        Ok(())
    }

    /// Write `value` at the pixel containing `(x, y)`. Positions outside the
    /// raster are dropped.
    pub(crate) fn plot(&mut self, x: f64, y: f64, value: u8) {
        if x < 0.0 || y < 0.0 {
            return;
        }
        if let Some(pixel) = self.data.get_mut((y as usize, x as usize)) {
            *pixel = value;
        }
    }

    /// Smallest and largest pixel value.
    pub fn min_max(&self) -> (u8, u8) {
        min_max(self.data.as_slice())
            .unwrap_or_else(|| self.data.iter().fold((u8::MAX, u8::MIN), fold_min_max))
    }

    /// Apply `f` to every pixel, producing a new raster.
    pub fn map(&self, f: impl Fn(u8) -> u8 + Sync + Send) -> Self {
        let mut data = self.data.clone();
        data.par_map_inplace(|v| *v = f(*v));
        Self { data }
    }

    pub fn to_image(&self) -> GrayImage {
        ImageBuffer::from_fn(self.size_x() as u32, self.size_y() as u32, |x, y| {
            Luma([self.data[[y as usize, x as usize]]])
        })
    }

    /// Encode to an image file; the format follows the file extension.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), image::ImageError> {
        self.to_image().save(path)
    }
}

/// A three-channel 8-bit image, indexed `[y][x]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorRaster2D {
    data: Array2<[u8; 3]>,
}

impl ColorRaster2D {
    pub fn new(size_x: usize, size_y: usize) -> Result<Self, VolumeError> {
        if size_x == 0 || size_y == 0 {
            return Err(VolumeError::InvalidConfiguration(format!(
                "raster dimensions must be positive, got {size_x}x{size_y}"
            )));
        }
        Ok(Self {
            data: Array2::from_elem((size_y, size_x), [0; 3]),
        })
    }

    pub(crate) fn from_row_major(
        size_x: usize,
        size_y: usize,
        pixels: Vec<[u8; 3]>,
    ) -> Result<Self, VolumeError> {
        if size_x == 0 || size_y == 0 {
            return Err(VolumeError::InvalidConfiguration(format!(
                "raster dimensions must be positive, got {size_x}x{size_y}"
            )));
        }
        let data = Array2::from_shape_vec((size_y, size_x), pixels).map_err(|e| {
            VolumeError::InvalidConfiguration(format!("raster buffer does not fit shape: {e}"))
        })?;
        Ok(Self { data })
    }

    pub fn size_x(&self) -> usize {
        self.data.dim().1
    }

    pub fn size_y(&self) -> usize {
        self.data.dim().0
    }

    pub fn data(&self) -> &Array2<[u8; 3]> {
        &self.data
    }

    pub fn get(&self, x: usize, y: usize) -> Result<[u8; 3], VolumeError> {
        self.data
            .get((y, x))
            .copied()
            .ok_or(VolumeError::OutOfRange {
                coord: [x, y, 0],
                size: [self.size_x(), self.size_y(), 1],
            })
    }

    pub fn set(&mut self, x: usize, y: usize, value: [u8; 3]) -> Result<(), VolumeError> {
        let size = [self.size_x(), self.size_y(), 1];
        let pixel = self.data.get_mut((y, x)).ok_or(VolumeError::OutOfRange {
            coord: [x, y, 0],
            size,
        })?;
        *pixel = value;
        Ok(())
    }

    pub fn to_image(&self) -> RgbImage {
        let (width, height) = (self.size_x() as u32, self.size_y() as u32);
        let mut image = RgbImage::new(width, height);
        for ((y, x), rgb) in self.data.indexed_iter() {
            image.put_pixel(x as u32, y as u32, Rgb(*rgb));
        }
        image
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), image::ImageError> {
        self.to_image().save(path)
    }
}

#[inline]
fn fold_min_max((min, max): (u8, u8), &v: &u8) -> (u8, u8) {
    (min.min(v), max.max(v))
}

/// Parallel min/max over a contiguous buffer. `None` for an empty or
/// non-contiguous buffer.
pub(crate) fn min_max(values: Option<&[u8]>) -> Option<(u8, u8)> {
    let values = values.filter(|v| !v.is_empty())?;
    Some(
        values
            .par_iter()
            .fold(|| (u8::MAX, u8::MIN), fold_min_max)
            .reduce(
                || (u8::MAX, u8::MIN),
                |(a_min, a_max), (b_min, b_max)| (a_min.min(b_min), a_max.max(b_max)),
            ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn zero_sized_raster_is_rejected() {
        assert!(matches!(
            Raster2D::new(0, 3),
            Err(VolumeError::InvalidConfiguration(_))
        ));
        assert!(ColorRaster2D::new(2, 0).is_err());
    }

    #[test_log::test]
    fn get_after_set_and_bounds() {
        let mut raster = Raster2D::new(3, 2).unwrap();
        for y in 0..2 {
            for x in 0..3 {
                raster.set(x, y, (x + 10 * y) as u8).unwrap();
            }
        }
        assert_eq!(raster.get(2, 1).unwrap(), 12);
        assert_eq!(raster.data()[[1, 2]], 12);
        assert_eq!(
            raster.get(3, 0),
            Err(VolumeError::OutOfRange {
                coord: [3, 0, 0],
                size: [3, 2, 1]
            })
        );
        assert!(raster.set(0, 2, 1).is_err());
    }

    #[test_log::test]
    fn plot_clips_outside_positions() {
        let mut raster = Raster2D::new(2, 2).unwrap();
        raster.plot(-0.5, 0.0, 255);
        raster.plot(2.0, 1.0, 255);
        raster.plot(1.7, 0.2, 255);
        assert_eq!(raster.min_max(), (0, 255));
        assert_eq!(raster.get(1, 0).unwrap(), 255);
        assert_eq!(raster.data().iter().filter(|&&v| v == 255).count(), 1);
    }

    #[test_log::test]
    fn min_max_scans_every_pixel() {
        let raster =
            Raster2D::from_row_major(3, 2, vec![7, 3, 9, 200, 4, 5]).unwrap();
        assert_eq!(raster.min_max(), (3, 200));
    }

    #[test_log::test]
    fn image_layout_is_x_by_y() {
        let mut raster = Raster2D::new(3, 2).unwrap();
        raster.set(2, 1, 42).unwrap();
        let image = raster.to_image();
        assert_eq!(image.dimensions(), (3, 2));
        assert_eq!(image.get_pixel(2, 1).0, [42]);
        assert_eq!(image.as_raw(), &vec![0, 0, 0, 0, 0, 42]);

        let mut color = ColorRaster2D::new(2, 3).unwrap();
        color.set(1, 2, [1, 2, 3]).unwrap();
        let image = color.to_image();
        assert_eq!(image.dimensions(), (2, 3));
        assert_eq!(image.get_pixel(1, 2).0, [1, 2, 3]);
    }
}
