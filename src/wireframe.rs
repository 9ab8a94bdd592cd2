use crate::dda::Dda2;
use crate::enums::Face;
use crate::raster::Raster2D;
use crate::transform::Transform;
use crate::volume::{VolumeError, VoxelVolume};

use log::debug;
use nalgebra::{Point3, Vector2, Vector3};

const FOREGROUND: u8 = 255;

/// Viewing direction of the virtual camera.
pub fn view_direction() -> Vector3<f64> {
    -Vector3::z()
}

/// Draws the camera-facing edges of a rotated bounding box.
pub struct WireframeProjector;

impl WireframeProjector {
    /// Whether each face of [`Face::ALL`] faces the camera after rotating by
    /// `rad` (x, then y, then z).
    pub fn visible_faces(rad: &Vector3<f64>) -> [bool; 6] {
        let rotation = Transform::rotation_xyz(*rad);
        let view = view_direction();
        Face::ALL.map(|face| rotation.apply_direction(&face.normal()).dot(&view) > 0.0)
    }

    /// The eight box corners, rotated about the box centre and placed inside
    /// the `[0, diagonal]` square. Corner `i` has x set when bit 0 is set, y
    /// for bit 1 and z for bit 2.
    pub fn vertices(volume: &VoxelVolume, rad: &Vector3<f64>) -> [Point3<f64>; 8] {
        let size = Vector3::new(
            volume.size_x() as f64,
            volume.size_y() as f64,
            volume.size_z() as f64,
        );
        let half = volume.diagonal() / 2.0;
        let transform = Transform::translation(Vector3::new(half, half, -half))
            * Transform::rotation_xyz(*rad)
            * Transform::translation(-size / 2.0);

        std::array::from_fn(|i| {
            let corner = Point3::new(
                if i & 1 == 0 { 0.0 } else { size.x },
                if i & 2 == 0 { 0.0 } else { size.y },
                if i & 4 == 0 { 0.0 } else { size.z },
            );
            transform.apply(&corner)
        })
    }

    /// Render the visible edges of `volume`'s rotated bounding box on a
    /// square raster of side `floor(diagonal)`.
    pub fn project(volume: &VoxelVolume, rad: &Vector3<f64>) -> Result<Raster2D, VolumeError> {
        let side = volume.view_side();
        let mut raster = Raster2D::new(side, side)?;
        let vertices = Self::vertices(volume, rad);
        let visible = Self::visible_faces(rad);

        for (face, _) in Face::ALL.iter().zip(visible).filter(|(_, shown)| *shown) {
            debug!("drawing {face:?}");
            let corners = face.corners();
            for k in 0..corners.len() {
                let from = &vertices[corners[k]];
                let to = &vertices[corners[(k + 1) % corners.len()]];
                draw_line(&mut raster, from, to);
            }
        }
        Ok(raster)
    }
}

/// Rasterize the projection of `from`..`to` onto the x-y plane.
fn draw_line(raster: &mut Raster2D, from: &Point3<f64>, to: &Point3<f64>) {
    for p in Dda2::new(Vector2::new(from.x, from.y), Vector2::new(to.x, to.y)) {
        raster.plot(p.x, p.y, FOREGROUND);
    }
}
