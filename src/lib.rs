//! # volume-reslice
//!
//! Reslicing and projection of 3-D voxel volumes (e.g. CT or MR series) into
//! 2-D views.
//!
//! A [`VoxelVolume`] holds 8-bit intensities and can be turned into:
//!  - axis-aligned cuts ([`VoxelVolume::cut`])
//!  - oblique slices through any point and normal ([`ObliquePlaneSampler`])
//!  - a volume straightened along a segment ([`PathReformatter`])
//!  - maximum-intensity projections ([`RayCastProjector`])
//!  - a wireframe of the rotated bounding box ([`WireframeProjector`])
//!
//! Every rotated view is a square whose side is the volume's space diagonal,
//! so no orientation clips the data. Sampling is nearest-voxel throughout;
//! there is no interpolation.
//!
//! Volumes are read from raw byte files or from a directory of DICOM files
//! with [`VolumeLoader`]. DICOM series wider than 8 bits are rescaled so the
//! brightest voxel maps to 255. Per-row work is spread over threads with
//! rayon.
//!
//! # Examples
//!
//! ## Oblique slice through the centre of a DICOM series
//!
//! ```no_run
//! # use volume_reslice::{ObliquePlaneSampler, VolumeLoader, enums::SortBy};
//! # use nalgebra::{Point3, Vector3};
//! let volume = VolumeLoader::load_from_directory("dicom", SortBy::InstanceNumber)
//!     .expect("should have loaded files from directory");
//! let center = Point3::new(
//!     volume.size_x() as f64 / 2.0,
//!     volume.size_y() as f64 / 2.0,
//!     volume.size_z() as f64 / 2.0,
//! );
//! let slice = ObliquePlaneSampler::sample(&volume, &center, &Vector3::new(0.0, 1.0, 1.0))
//!     .expect("normal is not degenerate");
//! slice.save("oblique.png").expect("should have written image");
//! ```

pub mod dda;
pub mod enums;
pub mod oblique;
pub mod projection;
pub mod raster;
pub mod transform;
pub mod volume;
pub mod volume_loader;
pub mod windowing;
pub mod wireframe;

pub use oblique::{ObliquePlaneSampler, PathReformatter};
pub use projection::RayCastProjector;
pub use raster::{ColorRaster2D, Raster2D};
pub use transform::{Transform, diagonal_length, normalized};
pub use volume::{VolumeError, VoxelVolume};
pub use volume_loader::{VolumeLoader, VolumeLoaderError};
pub use wireframe::WireframeProjector;
