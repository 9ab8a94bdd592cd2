use crate::raster::Raster2D;
use crate::transform::{Transform, normalized};
use crate::volume::{VolumeError, VoxelVolume};

use log::{debug, info};
use nalgebra::{Point3, Vector3};
use rayon::prelude::*;

/// Extracts planar cross-sections at arbitrary orientation.
pub struct ObliquePlaneSampler;

impl ObliquePlaneSampler {
    /// Rotation angles `(alpha_x, alpha_y)` such that rotating `(0, 0, 1)`
    /// about y by `alpha_y` and then about x by `-alpha_x` yields `normal`.
    ///
    /// `alpha_x` lies in the hemisphere of `normal.z`, and `alpha_y` is taken
    /// against the projection of `normal` onto the y-z plane, so normals in
    /// the x-y plane stay finite: `(0, ±1, 0)` gives `(±π/2, 0)` and
    /// `(±1, 0, 0)` gives `(0, ±π/2)`.
    pub fn plane_angles(normal: &Vector3<f64>) -> (f64, f64) {
        let alpha_x = normal.y.atan2(normal.z);
        let vzl = normal.y.hypot(normal.z);
        let alpha_y = normal.x.atan2(vzl);
        (alpha_x, alpha_y)
    }

    /// Transform mapping a pixel `(u, v, -diagonal / 2)` of the output plane
    /// into volume space.
    pub fn plane_to_volume(diagonal: f64, origin: &Point3<f64>, normal: &Vector3<f64>) -> Transform {
        let (alpha_x, alpha_y) = Self::plane_angles(normal);
        let half = diagonal / 2.0;

        let center = Transform::translation(Vector3::new(-half, -half, half));
        let rot_x = Transform::rotation_x(-alpha_x);
        let rot_y = Transform::rotation_y(alpha_y);
        let to_origin = Transform::translation(origin.coords);

        to_origin * rot_x * rot_y * center
    }

    /// Sample the plane through `origin` with normal `normal`.
    ///
    /// The result is a square of side `floor(diagonal)` so that no orientation
    /// clips the volume. Pixels mapping outside the volume are 0.
    ///
    /// # Errors
    ///
    /// [`VolumeError::DegenerateInput`] if `normal` has zero length.
    pub fn sample(
        volume: &VoxelVolume,
        origin: &Point3<f64>,
        normal: &Vector3<f64>,
    ) -> Result<Raster2D, VolumeError> {
        let normal = normalized(*normal)?;
        let diagonal = volume.diagonal();
        let side = volume.view_side();
        let phi_inv = Self::plane_to_volume(diagonal, origin, &normal);
        debug!("oblique slice through {origin} with normal {normal:?}, side {side}");

        let pixels: Vec<u8> = (0..side)
            .into_par_iter()
            .flat_map_iter(|v| {
                (0..side).map(move |u| {
                    let local = Point3::new(u as f64, v as f64, -diagonal / 2.0);
                    volume.sample(&phi_inv.apply(&local)).unwrap_or(0)
                })
            })
            .collect();

        Raster2D::from_row_major(side, side, pixels)
    }
}

/// Resamples a volume into a stack of oblique slices along a segment.
pub struct PathReformatter;

impl PathReformatter {
    /// Build a `side * side * slices` volume whose plane `i` is the oblique
    /// slice at `p1 + (i + 1) * |pn - p1| / slices` along the segment,
    /// perpendicular to it.
    ///
    /// # Errors
    ///
    /// [`VolumeError::InvalidConfiguration`] for zero slices and
    /// [`VolumeError::DegenerateInput`] when `p1 == pn`.
    pub fn reformat(
        volume: &VoxelVolume,
        slices: usize,
        p1: &Point3<f64>,
        pn: &Point3<f64>,
    ) -> Result<VoxelVolume, VolumeError> {
        if slices == 0 {
            return Err(VolumeError::InvalidConfiguration(
                "path reformatting needs at least one slice".to_string(),
            ));
        }
        let segment = pn - p1;
        let direction = normalized(segment)?;
        let lambda = segment.norm() / slices as f64;
        let side = volume.view_side();
        info!("reformatting {slices} slices from {p1} to {pn}");

        let planes = (0..slices)
            .into_par_iter()
            .map(|i| {
                let point = p1 + direction * (lambda * (i + 1) as f64);
                ObliquePlaneSampler::sample(volume, &point, &direction)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut reformatted = VoxelVolume::new(side, side, slices)?;
        for (z, plane) in planes.iter().enumerate() {
            reformatted.fill_plane(z, plane)?;
        }
        Ok(reformatted)
    }
}
