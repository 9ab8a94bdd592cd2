use crate::enums::Axis;
use crate::raster::{self, Raster2D};
use crate::transform::diagonal_length;

use log::debug;
use nalgebra::Point3;
use ndarray::Array3;
use ndarray::Zip;
use rayon::prelude::*;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum VolumeError {
    /// `coord` and `size` are `(x, y, z)`; rasters report `z = 0` and a depth
    /// of 1.
    #[error("coordinate {coord:?} is outside of size {size:?}")]
    OutOfRange { coord: [usize; 3], size: [usize; 3] },

    #[error("Degenerate input: {0}")]
    DegenerateInput(&'static str),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// A dense grid of 8-bit intensities, indexed `[z][y][x]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoxelVolume {
    data: Array3<u8>,
}

impl VoxelVolume {
    /// Create a zero-filled volume.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::InvalidConfiguration`] if any size is zero.
    pub fn new(size_x: usize, size_y: usize, size_z: usize) -> Result<Self, VolumeError> {
        Self::from_array(Array3::zeros((size_z, size_y, size_x)))
    }

    /// Wrap an array of shape `(depth, height, width)`.
    pub fn from_array(data: Array3<u8>) -> Result<Self, VolumeError> {
        let (z, y, x) = data.dim();
        if x == 0 || y == 0 || z == 0 {
            return Err(VolumeError::InvalidConfiguration(format!(
                "volume dimensions must be positive, got {x}x{y}x{z}"
            )));
        }
        Ok(Self { data })
    }

    /// Create a volume from a function of `(x, y, z)`.
    pub fn from_fn(
        size_x: usize,
        size_y: usize,
        size_z: usize,
        f: impl Fn(usize, usize, usize) -> u8,
    ) -> Result<Self, VolumeError> {
        Self::from_array(Array3::from_shape_fn((size_z, size_y, size_x), |(z, y, x)| {
            f(x, y, z)
        }))
    }

    /// Get the dimensions of the volume (depth, height, width)
    pub fn dim(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    pub fn size_x(&self) -> usize {
        self.data.dim().2
    }

    pub fn size_y(&self) -> usize {
        self.data.dim().1
    }

    pub fn size_z(&self) -> usize {
        self.data.dim().0
    }

    /// Get a reference to the underlying data
    pub fn data(&self) -> &Array3<u8> {
        &self.data
    }

    /// Length of the volume's space diagonal, the side of every rotated view.
    pub fn diagonal(&self) -> f64 {
        diagonal_length(self.size_x(), self.size_y(), self.size_z())
    }

    /// Side in pixels of the square rasters produced by rotated views.
    pub(crate) fn view_side(&self) -> usize {
        (self.diagonal() as usize).max(1)
    }

    fn out_of_range(&self, x: usize, y: usize, z: usize) -> VolumeError {
        VolumeError::OutOfRange {
            coord: [x, y, z],
            size: [self.size_x(), self.size_y(), self.size_z()],
        }
    }

    pub fn get(&self, x: usize, y: usize, z: usize) -> Result<u8, VolumeError> {
        self.data
            .get((z, y, x))
            .copied()
            .ok_or_else(|| self.out_of_range(x, y, z))
    }

    pub fn set(&mut self, x: usize, y: usize, z: usize, value: u8) -> Result<(), VolumeError> {
        let size = [self.size_x(), self.size_y(), self.size_z()];
        let voxel = self.data.get_mut((z, y, x)).ok_or(VolumeError::OutOfRange {
            coord: [x, y, z],
            size,
        })?;
        *voxel = value;
        Ok(())
    }

    /// Nearest-voxel sample: each coordinate is truncated. `None` when the
    /// point is outside `[0, size)` on any axis.
    #[inline]
    pub fn sample(&self, point: &Point3<f64>) -> Option<u8> {
        if point.x < 0.0 || point.y < 0.0 || point.z < 0.0 {
            return None;
        }
        self.data
            .get((point.z as usize, point.y as usize, point.x as usize))
            .copied()
    }

    /// Smallest and largest intensity in the volume.
    pub fn min_max(&self) -> (u8, u8) {
        raster::min_max(self.data.as_slice()).unwrap_or_else(|| {
            self.data
                .iter()
                .fold((u8::MAX, u8::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)))
        })
    }

    /// Raw bytes in `z`, `y`, `x` order, one byte per voxel.
    pub fn to_raw_bytes(&self) -> Vec<u8> {
        self.data.iter().copied().collect()
    }

    /// Copy `slice` into plane `z`.
    pub(crate) fn fill_plane(&mut self, z: usize, slice: &Raster2D) -> Result<(), VolumeError> {
        if slice.size_x() != self.size_x() || slice.size_y() != self.size_y() {
            return Err(VolumeError::InvalidConfiguration(format!(
                "plane of {}x{} does not fit a volume of {}x{}",
                slice.size_x(),
                slice.size_y(),
                self.size_x(),
                self.size_y()
            )));
        }
        if z >= self.size_z() {
            return Err(self.out_of_range(0, 0, z));
        }
        self.data
            .index_axis_mut(ndarray::Axis(0), z)
            .assign(slice.data());
        Ok(())
    }

    /// Extract the plane at `pos` along `axis`.
    ///
    /// The first output dimension (raster x) is x for [`Axis::Z`] and z for
    /// the other two axes; the second (raster y) is y for [`Axis::Z`] and
    /// [`Axis::X`], x for [`Axis::Y`]. `mirror` reverses the first dimension.
    pub fn cut(&self, axis: Axis, pos: usize, mirror: bool) -> Result<Raster2D, VolumeError> {
        let (size_x, size_y, size_z) = (self.size_x(), self.size_y(), self.size_z());
        let (s1, s2) = match axis {
            Axis::Z if pos < size_z => (size_x, size_y),
            Axis::X if pos < size_x => (size_z, size_y),
            Axis::Y if pos < size_y => (size_z, size_x),
            Axis::Z => return Err(self.out_of_range(0, 0, pos)),
            Axis::X => return Err(self.out_of_range(pos, 0, 0)),
            Axis::Y => return Err(self.out_of_range(0, pos, 0)),
        };
        debug!("cutting {axis:?} plane {pos} ({s1}x{s2}, mirror: {mirror})");

        let mut cut = ndarray::Array2::zeros((s2, s1));
        Zip::indexed(&mut cut).par_for_each(|(j, i), out| {
            let i = if mirror { s1 - i - 1 } else { i };
            *out = match axis {
                Axis::Z => self.data[[pos, j, i]],
                Axis::X => self.data[[i, j, pos]],
                Axis::Y => self.data[[i, pos, j]],
            };
        });
        Raster2D::from_array(cut)
    }
}

/// Map 16-bit intensities into 8 bits.
///
/// Values are copied unchanged when they already fit; otherwise they are
/// rescaled so the largest intensity becomes 255.
pub fn rescale_to_u8(data: &Array3<u16>) -> Array3<u8> {
    let max = data.par_iter().copied().max().unwrap_or(0);
    if max <= u16::from(u8::MAX) {
        return data.mapv(|v| v as u8);
    }
    debug!("rescaling intensities with maximum {max} into 8 bits");
    let scale = 255.0 / f64::from(max);
    data.mapv(|v| (f64::from(v) * scale) as u8)
}
