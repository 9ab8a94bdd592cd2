use std::path::PathBuf;

use nalgebra::{Point3, Vector3};
use volume_reslice::{
    ObliquePlaneSampler, PathReformatter, RayCastProjector, VolumeLoader, VoxelVolume,
    WireframeProjector, enums::Axis, windowing,
};

fn ramp_bytes() -> Vec<u8> {
    (0..64u8).collect()
}

fn scratch_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("volume-reslice-{}-{name}", std::process::id()))
}

#[test_log::test]
fn cut_of_ingested_ramp() {
    let volume = VolumeLoader::load_from_raw_bytes(&ramp_bytes(), (4, 4, 4)).unwrap();
    let cut = volume.cut(Axis::Z, 2, false).unwrap();
    assert_eq!((cut.size_x(), cut.size_y()), (4, 4));
    for y in 0..4 {
        for x in 0..4 {
            assert_eq!(cut.get(x, y).unwrap(), (x + y * 4 + 32) as u8);
        }
    }
}

#[test_log::test]
fn raw_file_round_trip_is_byte_exact() {
    let volume = VoxelVolume::from_fn(5, 3, 7, |x, y, z| (x * 13 + y * 29 + z * 37) as u8).unwrap();
    let path = scratch_path("round-trip.raw");

    VolumeLoader::write_raw_file(&volume, &path).unwrap();
    let reloaded = VolumeLoader::load_from_raw_file(&path, (5, 3, 7)).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(reloaded, volume);
    assert_eq!(reloaded.to_raw_bytes(), volume.to_raw_bytes());
}

#[test_log::test]
fn every_view_fits_the_diagonal_square() {
    let volume = VolumeLoader::load_from_raw_bytes(&ramp_bytes(), (4, 4, 4)).unwrap();
    let center = Point3::new(2.0, 2.0, 2.0);

    let oblique =
        ObliquePlaneSampler::sample(&volume, &center, &Vector3::new(1.0, 1.0, 1.0)).unwrap();
    let mip = RayCastProjector::project(&volume, 0.3, -0.7, &Vector3::z()).unwrap();
    let wireframe = WireframeProjector::project(&volume, &Vector3::new(0.2, 0.4, 0.6)).unwrap();
    for raster in [&oblique, &mip, &wireframe] {
        assert_eq!((raster.size_x(), raster.size_y()), (6, 6));
    }

    assert!(oblique.min_max().1 > 0);
    assert_eq!(wireframe.min_max(), (0, 255));
    assert!(mip.min_max().1 > 0);
}

#[test_log::test]
fn reformat_then_project_and_save() {
    let volume = VolumeLoader::load_from_raw_bytes(&ramp_bytes(), (4, 4, 4)).unwrap();
    let straightened = PathReformatter::reformat(
        &volume,
        3,
        &Point3::new(0.5, 0.5, 0.5),
        &Point3::new(3.5, 3.5, 3.5),
    )
    .unwrap();
    assert_eq!(
        (straightened.size_x(), straightened.size_y(), straightened.size_z()),
        (6, 6, 3)
    );

    let cut = straightened.cut(Axis::Z, 1, false).unwrap();
    let stretched = windowing::normalize(&cut, 8).unwrap();
    let path = scratch_path("reformat.png");
    stretched.save(&path).unwrap();
    let decoded = image::open(&path).unwrap().to_luma8();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(decoded.dimensions(), (6, 6));
    assert_eq!(decoded.get_pixel(3, 2).0[0], stretched.get(3, 2).unwrap());
}
