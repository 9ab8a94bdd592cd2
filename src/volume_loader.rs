use crate::{
    enums::SortBy,
    volume::{VolumeError, VoxelVolume, rescale_to_u8},
};

use dicom::{
    object::{FileDicomObject, InMemDicomObject, open_file},
    pixeldata::{ConvertOptions, PixelDecoder, VoiLutOption},
};
use dicom_dictionary_std::tags;
use log::{info, warn};
use ndarray::{Array2, Array3, s};
use std::{fs, path::Path};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VolumeLoaderError {
    #[error("No valid DICOM images found")]
    NoValidImages,

    #[error("Inconsistent image dimensions")]
    InconsistentDimensions,

    #[error("Expected {expected} bytes for the given dimensions, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("Volume error: {0}")]
    Volume(#[from] VolumeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("DICOM error: {0}")]
    Dicom(#[from] dicom::object::ReadError),
}

pub struct VolumeLoader;

impl VolumeLoader {
    /// Build a volume from raw voxels, one byte each, in `z`, `y`, `x` order.
    ///
    /// # Arguments
    ///
    /// * `bytes` - Voxel intensities
    /// * `dims` - `(size_x, size_y, size_z)`
    ///
    /// # Errors
    ///
    /// Returns error if the byte count does not match the dimensions or a
    /// dimension is zero
    pub fn load_from_raw_bytes(
        bytes: &[u8],
        dims: (usize, usize, usize),
    ) -> Result<VoxelVolume, VolumeLoaderError> {
        let (size_x, size_y, size_z) = dims;
        let expected = size_x
            .checked_mul(size_y)
            .and_then(|v| v.checked_mul(size_z))
            .ok_or_else(|| {
                VolumeError::InvalidConfiguration(format!(
                    "volume of {size_x}x{size_y}x{size_z} voxels is not addressable"
                ))
            })?;
        if bytes.len() != expected {
            return Err(VolumeLoaderError::SizeMismatch {
                expected,
                actual: bytes.len(),
            });
        }
        let data = Array3::from_shape_vec((size_z, size_y, size_x), bytes.to_vec())
            .map_err(|e| VolumeError::InvalidConfiguration(e.to_string()))?;
        Ok(VoxelVolume::from_array(data)?)
    }

    /// Load a raw volume file
    pub fn load_from_raw_file(
        path: impl AsRef<Path>,
        dims: (usize, usize, usize),
    ) -> Result<VoxelVolume, VolumeLoaderError> {
        let bytes = fs::read(path.as_ref())?;
        let volume = Self::load_from_raw_bytes(&bytes, dims)?;
        info!(
            "loaded raw volume {} ({}x{}x{})",
            path.as_ref().display(),
            dims.0,
            dims.1,
            dims.2
        );
        Ok(volume)
    }

    /// Write a volume as raw bytes, readable again by
    /// [`VolumeLoader::load_from_raw_file`] with the same dimensions.
    pub fn write_raw_file(
        volume: &VoxelVolume,
        path: impl AsRef<Path>,
    ) -> Result<(), VolumeLoaderError> {
        fs::write(path, volume.to_raw_bytes())?;
        Ok(())
    }

    /// Load a volume from DICOM objects
    ///
    /// # Arguments
    ///
    /// * `dicom_objects` - Slice of DICOM file objects
    /// * `sort_by` - Method to sort the slices
    ///
    /// # Errors
    ///
    /// Returns error if no valid images found or dimensions are inconsistent
    pub fn load_from_dicom_objects(
        dicom_objects: &[FileDicomObject<InMemDicomObject>],
        sort_by: SortBy,
    ) -> Result<VoxelVolume, VolumeLoaderError> {
        let mut images_with_order: Vec<_> = dicom_objects
            .iter()
            .filter_map(|dicom_object| Self::extract_image_with_order(dicom_object, &sort_by))
            .collect();

        if images_with_order.is_empty() {
            return Err(VolumeLoaderError::NoValidImages);
        }
        if images_with_order.len() < dicom_objects.len() {
            warn!(
                "skipped {} objects without decodable pixel data",
                dicom_objects.len() - images_with_order.len()
            );
        }

        Self::sort_images(&mut images_with_order, sort_by);

        let images: Vec<_> = images_with_order
            .into_iter()
            .map(|(_, image)| image)
            .collect();

        Self::validate_dimensions(&images)?;

        let volume_array = Self::build_volume_array(&images);
        let (depth, height, width) = volume_array.dim();
        info!("stacked {depth} DICOM slices of {width}x{height}");

        Ok(VoxelVolume::from_array(rescale_to_u8(&volume_array))?)
    }

    /// Load a volume from file paths
    pub fn load_from_file_paths(
        paths: &[impl AsRef<Path>],
        sort_by: SortBy,
    ) -> Result<VoxelVolume, VolumeLoaderError> {
        let objects: Result<Vec<_>, _> =
            paths.iter().map(|path| open_file(path.as_ref())).collect();

        Self::load_from_dicom_objects(&objects?, sort_by)
    }

    /// Load a volume from a directory containing .dcm files
    pub fn load_from_directory(
        path: impl AsRef<Path>,
        sort_by: SortBy,
    ) -> Result<VoxelVolume, VolumeLoaderError> {
        let paths: Vec<_> = fs::read_dir(path.as_ref())?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .and_then(|s| s.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("dcm"))
            })
            .collect();

        if paths.is_empty() {
            return Err(VolumeLoaderError::NoValidImages);
        }

        Self::load_from_file_paths(&paths, sort_by)
    }

    fn extract_image_with_order(
        dicom_object: &FileDicomObject<InMemDicomObject>,
        sort_by: &SortBy,
    ) -> Option<(Option<f32>, Array2<u16>)> {
        let order = Self::get_sort_order(dicom_object, sort_by)?;
        let image_2d = Self::decode_image(dicom_object)?;
        Some((order, image_2d))
    }

    fn get_sort_order(
        dicom_object: &FileDicomObject<InMemDicomObject>,
        sort_by: &SortBy,
    ) -> Option<Option<f32>> {
        match sort_by {
            SortBy::ImagePositionPatient => {
                let pos = dicom_object
                    .element(tags::IMAGE_POSITION_PATIENT)
                    .ok()?
                    .to_multi_float32()
                    .ok()?;
                Some(pos.get(2).copied())
            }
            SortBy::TablePosition => {
                let pos = dicom_object
                    .element(tags::TABLE_POSITION)
                    .ok()?
                    .to_float32()
                    .ok();
                Some(pos)
            }
            SortBy::InstanceNumber => {
                let num = dicom_object
                    .element(tags::INSTANCE_NUMBER)
                    .ok()?
                    .to_int::<i32>()
                    .ok()
                    .map(|n| n as f32);
                Some(num)
            }
            SortBy::None => Some(Some(0.0)),
        }
    }

    /// First frame, first sample of the object's pixel data.
    fn decode_image(dicom_object: &FileDicomObject<InMemDicomObject>) -> Option<Array2<u16>> {
        let pixel_data = dicom_object.decode_pixel_data().ok()?;
        let options = ConvertOptions::new().with_voi_lut(VoiLutOption::First);
        pixel_data
            .to_ndarray_with_options::<u16>(&options)
            .ok()
            .map(|arr| arr.slice_move(s![0, .., .., 0]))
    }

    fn sort_images(images_with_order: &mut [(Option<f32>, Array2<u16>)], sort_by: SortBy) {
        if !matches!(sort_by, SortBy::None) {
            images_with_order
                .sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        }

        if matches!(sort_by, SortBy::ImagePositionPatient) {
            images_with_order.reverse();
        }
    }

    fn validate_dimensions(images: &[Array2<u16>]) -> Result<(), VolumeLoaderError> {
        let first_dim = images[0].dim();
        if images.iter().any(|img| img.dim() != first_dim) {
            return Err(VolumeLoaderError::InconsistentDimensions);
        }
        Ok(())
    }

    fn build_volume_array(images: &[Array2<u16>]) -> Array3<u16> {
        let (height, width) = images[0].dim();
        let depth = images.len();
        let mut volume = Array3::<u16>::zeros((depth, height, width));

        for (i, image) in images.iter().enumerate() {
            volume.slice_mut(s![i, .., ..]).assign(image);
        }

        volume
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn raw_bytes_fill_x_fastest() {
        let bytes: Vec<u8> = (0..24).collect();
        let volume = VolumeLoader::load_from_raw_bytes(&bytes, (2, 3, 4)).unwrap();
        assert_eq!(volume.get(1, 0, 0).unwrap(), 1);
        assert_eq!(volume.get(0, 1, 0).unwrap(), 2);
        assert_eq!(volume.get(0, 0, 1).unwrap(), 6);
        assert_eq!(volume.get(1, 2, 3).unwrap(), 23);
    }

    #[test_log::test]
    fn raw_bytes_must_match_dimensions() {
        assert!(matches!(
            VolumeLoader::load_from_raw_bytes(&[0; 10], (2, 3, 2)),
            Err(VolumeLoaderError::SizeMismatch {
                expected: 12,
                actual: 10
            })
        ));
        assert!(matches!(
            VolumeLoader::load_from_raw_bytes(&[], (0, 3, 2)),
            Err(VolumeLoaderError::Volume(VolumeError::InvalidConfiguration(_)))
        ));
    }

    #[test_log::test]
    fn oversized_dimensions_are_rejected() {
        assert!(matches!(
            VolumeLoader::load_from_raw_bytes(&[], (usize::MAX, 2, 1)),
            Err(VolumeLoaderError::Volume(VolumeError::InvalidConfiguration(_)))
        ));
        assert!(matches!(
            VolumeLoader::load_from_raw_bytes(&[0; 4], (2, usize::MAX / 2, 3)),
            Err(VolumeLoaderError::Volume(VolumeError::InvalidConfiguration(_)))
        ));
    }

    #[test_log::test]
    fn sorting_reverses_patient_position() {
        let image = |v: u16| Array2::from_elem((1, 1), v);
        let mut images = vec![
            (Some(2.0), image(2)),
            (Some(-1.0), image(1)),
            (Some(5.0), image(5)),
        ];
        VolumeLoader::sort_images(&mut images, SortBy::ImagePositionPatient);
        let order: Vec<_> = images.iter().map(|(_, img)| img[[0, 0]]).collect();
        assert_eq!(order, vec![5, 2, 1]);

        VolumeLoader::sort_images(&mut images, SortBy::InstanceNumber);
        let order: Vec<_> = images.iter().map(|(_, img)| img[[0, 0]]).collect();
        assert_eq!(order, vec![1, 2, 5]);
    }

    #[test_log::test]
    fn mismatched_slices_are_rejected() {
        let images = vec![Array2::zeros((2, 2)), Array2::zeros((2, 3))];
        assert!(matches!(
            VolumeLoader::validate_dimensions(&images),
            Err(VolumeLoaderError::InconsistentDimensions)
        ));
    }

    #[test_log::test]
    fn slices_stack_along_depth() {
        let images = vec![Array2::from_elem((2, 3), 7u16), Array2::from_elem((2, 3), 9u16)];
        let volume = VolumeLoader::build_volume_array(&images);
        assert_eq!(volume.dim(), (2, 2, 3));
        assert_eq!(volume[[1, 1, 2]], 9);
    }

    #[test_log::test]
    fn empty_object_list_has_no_images() {
        assert!(matches!(
            VolumeLoader::load_from_dicom_objects(&[], SortBy::None),
            Err(VolumeLoaderError::NoValidImages)
        ));
    }
}
