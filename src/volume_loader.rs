use crate::{enums::SortBy, volume::VolumeError, volume::VoxelField};

use dicom::{
    object::{FileDicomObject, InMemDicomObject, open_file},
    pixeldata::{ConvertOptions, PixelDecoder, VoiLutOption},
};
use dicom_dictionary_std::tags;
use futures::future::{BoxFuture, FutureExt};
use ndarray::{Array2, Array3, s};
use rayon::prelude::*;
use std::{fs, path::Path};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to decode volume: {0}")]
    Decode(String),

    #[error("Failed to fetch volume: {0}")]
    Network(String),

    #[error("No valid DICOM images found")]
    NoValidImages,

    #[error("Inconsistent image dimensions")]
    InconsistentDimensions,

    #[error("Missing spacing information")]
    MissingSpacing,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("DICOM error: {0}")]
    Dicom(#[from] dicom::object::ReadError),

    #[error(transparent)]
    Volume(#[from] VolumeError),
}

/// Source of decoded voxel fields.
///
/// `location` is whatever the implementation understands: a path, a URL, a
/// record key.
pub trait VolumeLoader {
    fn load<'a>(&'a self, location: &'a str) -> BoxFuture<'a, Result<VoxelField, LoadError>>;
}

/// Loads a directory of single-frame DICOM slices as one volume.
///
/// Slices are assumed to come from one axial series. Files are opened in
/// parallel with rayon.
#[derive(Debug, Default, Clone, Copy)]
pub struct DicomDirectoryLoader {
    pub sort_by: SortBy,
}

impl VolumeLoader for DicomDirectoryLoader {
    fn load<'a>(&'a self, location: &'a str) -> BoxFuture<'a, Result<VoxelField, LoadError>> {
        async move { Self::load_from_directory(location, self.sort_by) }.boxed()
    }
}

struct Slice {
    order: Option<f32>,
    position: Option<[f64; 3]>,
    image: Array2<u16>,
}

impl DicomDirectoryLoader {
    pub fn new(sort_by: SortBy) -> Self {
        Self { sort_by }
    }

    /// Load a volume from DICOM objects
    ///
    /// # Errors
    ///
    /// Returns error if no valid images found, a slice's pixel data cannot be
    /// decoded, dimensions are inconsistent or spacing is missing. Objects
    /// lacking the attribute used for sorting are skipped.
    pub fn load_from_dicom_objects(
        dicom_objects: &[FileDicomObject<InMemDicomObject>],
        sort_by: SortBy,
    ) -> Result<VoxelField, LoadError> {
        let mut slices = dicom_objects
            .iter()
            .filter_map(|dicom_object| Self::extract_slice(dicom_object, &sort_by))
            .collect::<Result<Vec<_>, _>>()?;

        if slices.is_empty() {
            return Err(LoadError::NoValidImages);
        }

        Self::sort_slices(&mut slices, sort_by);
        Self::validate_dimensions(&slices)?;

        let origin = slices[0].position.unwrap_or([0.0; 3]);
        let volume_array = Self::build_volume_array(&slices);
        let spacing = Self::get_spacing(dicom_objects).ok_or(LoadError::MissingSpacing)?;

        Ok(VoxelField::new(volume_array, spacing)?.with_origin(origin))
    }

    pub fn load_from_file_paths(
        paths: &[impl AsRef<Path> + Sync],
        sort_by: SortBy,
    ) -> Result<VoxelField, LoadError> {
        let objects: Result<Vec<_>, _> = paths
            .par_iter()
            .map(|path| open_file(path.as_ref()))
            .collect();

        Self::load_from_dicom_objects(&objects?, sort_by)
    }

    /// Load a volume from a directory containing .dcm files
    pub fn load_from_directory(
        path: impl AsRef<Path>,
        sort_by: SortBy,
    ) -> Result<VoxelField, LoadError> {
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
            return Err(LoadError::NoValidImages);
        }

        Self::load_from_file_paths(&paths, sort_by)
    }

    fn extract_slice(
        dicom_object: &FileDicomObject<InMemDicomObject>,
        sort_by: &SortBy,
    ) -> Option<Result<Slice, LoadError>> {
        let order = Self::get_sort_order(dicom_object, sort_by)?;
        Some(Self::decode_image(dicom_object).map(|image| Slice {
            order,
            position: Self::get_position(dicom_object),
            image,
        }))
    }

    fn get_position(dicom_object: &FileDicomObject<InMemDicomObject>) -> Option<[f64; 3]> {
        let pos = dicom_object
            .element(tags::IMAGE_POSITION_PATIENT)
            .ok()?
            .to_multi_float64()
            .ok()?;
        match pos.as_slice() {
            [x, y, z, ..] => Some([*x, *y, *z]),
            _ => None,
        }
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

    fn decode_image(
        dicom_object: &FileDicomObject<InMemDicomObject>,
    ) -> Result<Array2<u16>, LoadError> {
        let pixel_data = dicom_object
            .decode_pixel_data()
            .map_err(|err| LoadError::Decode(err.to_string()))?;
        let options = ConvertOptions::new().with_voi_lut(VoiLutOption::First);
        pixel_data
            .to_ndarray_with_options::<u16>(&options)
            .map(|arr| arr.slice_move(s![0, .., .., 0]))
            .map_err(|err| LoadError::Decode(err.to_string()))
    }

    fn sort_slices(slices: &mut [Slice], sort_by: SortBy) {
        if !matches!(sort_by, SortBy::None) {
            slices.sort_by(|a, b| {
                a.order
                    .partial_cmp(&b.order)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }
    }

    fn validate_dimensions(slices: &[Slice]) -> Result<(), LoadError> {
        let first_dim = slices[0].image.dim();
        if slices.iter().any(|slice| slice.image.dim() != first_dim) {
            return Err(LoadError::InconsistentDimensions);
        }
        Ok(())
    }

    fn build_volume_array(slices: &[Slice]) -> Array3<u16> {
        let (height, width) = slices[0].image.dim();
        let depth = slices.len();
        let mut volume = Array3::<u16>::zeros((depth, height, width));

        for (i, slice) in slices.iter().enumerate() {
            volume.slice_mut(s![i, .., ..]).assign(&slice.image);
        }

        volume
    }

    /// Spacing as (x, y, z). PixelSpacing is stored as (row, column).
    fn get_spacing(dicom_objects: &[FileDicomObject<InMemDicomObject>]) -> Option<(f64, f64, f64)> {
        dicom_objects.iter().find_map(|dicom_object| {
            let pixel_spacing = dicom_object
                .element(tags::PIXEL_SPACING)
                .ok()?
                .to_multi_float64()
                .ok()?;

            let slice_thickness = dicom_object
                .element(tags::SLICE_THICKNESS)
                .ok()?
                .to_float64()
                .ok()?;

            match pixel_spacing.as_slice() {
                [row, column, ..] => Some((*column, *row, slice_thickness)),
                _ => None,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dicom::object::FileMetaTableBuilder;

    #[tokio::test]
    async fn missing_directory_is_an_io_error() {
        let loader = DicomDirectoryLoader::default();
        let result = loader.load("/definitely/not/a/dicom/dir").await;
        assert!(matches!(result, Err(LoadError::Io(_))));
    }

    #[test]
    fn slice_without_pixel_data_is_a_decode_error() {
        let meta = FileMetaTableBuilder::new()
            .media_storage_sop_class_uid("1.2.840.10008.5.1.4.1.1.4")
            .media_storage_sop_instance_uid("1.2.826.0.1.3680043.2.1125.1")
            .transfer_syntax("1.2.840.10008.1.2.1");
        let object = InMemDicomObject::new_empty().with_meta(meta).unwrap();

        let result = DicomDirectoryLoader::load_from_dicom_objects(&[object], SortBy::None);
        assert!(matches!(result, Err(LoadError::Decode(_))));
    }

    #[test]
    fn empty_object_list_has_no_images() {
        let result = DicomDirectoryLoader::load_from_dicom_objects(&[], SortBy::None);
        assert!(matches!(result, Err(LoadError::NoValidImages)));
    }
}
