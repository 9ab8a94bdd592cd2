use crate::dda::max_intensity;
use crate::enums::Face;
use crate::raster::Raster2D;
use crate::transform::{Transform, normalized};
use crate::volume::{VolumeError, VoxelVolume};

use log::debug;
use nalgebra::{Point3, Vector3};
use rayon::prelude::*;

/// A face of the volume's bounding box with a point lying on it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingFace {
    pub face: Face,
    pub center: Point3<f64>,
}

impl BoundingFace {
    /// The six faces of `volume`, through the centres of its outermost voxel
    /// planes.
    pub fn of(volume: &VoxelVolume) -> [BoundingFace; 6] {
        let (nx, ny, nz) = (
            volume.size_x() as f64 - 1.0,
            volume.size_y() as f64 - 1.0,
            volume.size_z() as f64 - 1.0,
        );
        let (cx, cy, cz) = (nx / 2.0, ny / 2.0, nz / 2.0);
        Face::ALL.map(|face| {
            let center = match face {
                Face::PosX => Point3::new(nx, cy, cz),
                Face::NegX => Point3::new(0.0, cy, cz),
                Face::PosY => Point3::new(cx, ny, cz),
                Face::NegY => Point3::new(cx, 0.0, cz),
                Face::PosZ => Point3::new(cx, cy, nz),
                Face::NegZ => Point3::new(cx, cy, 0.0),
            };
            BoundingFace { face, center }
        })
    }

    /// Ray parameter at which `origin + λ * direction` meets this face's
    /// plane; `None` when the ray runs parallel to it.
    pub fn intersect(&self, origin: &Point3<f64>, direction: &Vector3<f64>) -> Option<f64> {
        let normal = self.face.normal();
        let denominator = normal.dot(direction);
        if denominator.abs() < f64::EPSILON {
            return None;
        }
        Some((normal.dot(&self.center.coords) - normal.dot(&origin.coords)) / denominator)
    }
}

/// Maximum-intensity projection by ray casting.
pub struct RayCastProjector;

impl RayCastProjector {
    /// Where the ray enters and leaves the volume.
    ///
    /// Each face hit is rounded to the nearest voxel and kept only if that
    /// voxel lies inside the volume; entry and exit are the kept hits with
    /// the smallest and largest ray parameter. The face order is irrelevant.
    pub fn entry_exit(
        volume: &VoxelVolume,
        faces: &[BoundingFace],
        origin: &Point3<f64>,
        direction: &Vector3<f64>,
    ) -> Option<(Point3<f64>, Point3<f64>)> {
        let size = Vector3::new(
            volume.size_x() as f64,
            volume.size_y() as f64,
            volume.size_z() as f64,
        );

        let hits = faces.iter().filter_map(|face| {
            let lambda = face.intersect(origin, direction)?;
            let hit = (origin + direction * lambda).map(f64::round);
            let inside = (0..3).all(|axis| hit[axis] >= 0.0 && hit[axis] < size[axis]);
            inside.then_some((lambda, hit))
        });

        hits.fold(None, |bounds, (lambda, hit)| match bounds {
            None => Some(((lambda, hit), (lambda, hit))),
            Some((entry, exit)) => Some((
                if lambda < entry.0 { (lambda, hit) } else { entry },
                if lambda > exit.0 { (lambda, hit) } else { exit },
            )),
        })
        .map(|((_, entry), (_, exit))| (entry, exit))
    }

    /// Render the maximum-intensity projection of `volume` seen along `view`
    /// after rotating the view plane by `delta_x` about x and `delta_y` about
    /// y.
    ///
    /// The output is a square of side `floor(diagonal)`. Pixels whose ray
    /// misses the volume are 0. Intensities are already 8-bit (see
    /// [`crate::volume::rescale_to_u8`]), so no rescaling happens here.
    ///
    /// # Errors
    ///
    /// [`VolumeError::DegenerateInput`] if `view` has zero length.
    pub fn project(
        volume: &VoxelVolume,
        delta_x: f64,
        delta_y: f64,
        view: &Vector3<f64>,
    ) -> Result<Raster2D, VolumeError> {
        let view = normalized(*view)?;
        let diagonal = volume.diagonal();
        let half = diagonal / 2.0;
        let side = volume.view_side();

        let center_to_local = Transform::translation(Vector3::repeat(-half));
        let volume_center = Transform::translation(Vector3::new(
            (volume.size_x() as f64 - 1.0) / 2.0,
            (volume.size_y() as f64 - 1.0) / 2.0,
            (volume.size_z() as f64 - 1.0) / 2.0,
        ));
        let rotation = Transform::rotation_x(-delta_x) * Transform::rotation_y(-delta_y);
        let to_volume = volume_center * rotation * center_to_local;

        let direction = rotation.apply_direction(&view);
        let faces = BoundingFace::of(volume);
        debug!("MIP of {side}x{side} along {direction:?} (delta x {delta_x}, delta y {delta_y})");

        let pixels: Vec<u8> = (0..side)
            .into_par_iter()
            .flat_map_iter(|j| {
                let faces = &faces;
                (0..side).map(move |i| {
                    let origin = to_volume.apply(&Point3::new(i as f64, j as f64, -half));
                    Self::entry_exit(volume, faces, &origin, &direction)
                        .map_or(0, |(p1, pn)| max_intensity(volume, &p1, &pn))
                })
            })
            .collect();

        Raster2D::from_row_major(side, side, pixels)
    }
}
