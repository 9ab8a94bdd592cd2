//! Digital differential analyzer.
//!
//! Walks the segment between two points one unit step at a time along the
//! axis with the largest extent (the drive axis). The other axes advance by
//! their share of the delta, so positions are generally fractional; callers
//! decide how to turn them into grid cells.

use nalgebra::{Point3, SVector};

use crate::volume::VoxelVolume;

/// Spans this close below an integer count as that integer.
const SPAN_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone)]
pub struct Dda<const D: usize> {
    start: SVector<f64, D>,
    increment: SVector<f64, D>,
    steps: usize,
    taken: usize,
}

pub type Dda2 = Dda<2>;
pub type Dda3 = Dda<3>;

impl<const D: usize> Dda<D> {
    pub fn new(start: SVector<f64, D>, end: SVector<f64, D>) -> Self {
        let delta = end - start;
        let drive = delta.iamax();
        let span = delta[drive].abs();

        if span == 0.0 || !span.is_finite() {
            return Self {
                start,
                increment: SVector::zeros(),
                steps: 1,
                taken: 0,
            };
        }

        Self {
            start,
            increment: delta / span,
            steps: ((span + SPAN_TOLERANCE).floor() as usize).saturating_add(1),
            taken: 0,
        }
    }
}

impl<const D: usize> Iterator for Dda<D> {
    type Item = SVector<f64, D>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.taken >= self.steps {
            return None;
        }
        let position = self.start + self.increment * self.taken as f64;
        self.taken += 1;
        Some(position)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.steps - self.taken;
        (remaining, Some(remaining))
    }
}

impl<const D: usize> ExactSizeIterator for Dda<D> {}

/// Largest intensity sampled along the segment `p1`..`pn`.
///
/// Positions outside the volume contribute nothing; 0 if none are inside.
pub fn max_intensity(volume: &VoxelVolume, p1: &Point3<f64>, pn: &Point3<f64>) -> u8 {
    Dda3::new(p1.coords, pn.coords)
        .filter_map(|p| volume.sample(&Point3::from(p)))
        .max()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use nalgebra::{Vector2, Vector3};

    use super::*;

    #[test_log::test]
    fn coincident_points_yield_one_position() {
        let p = Vector3::new(1.0, 2.0, 3.0);
        let walk: Vec<_> = Dda3::new(p, p).collect();
        assert_eq!(walk, vec![p]);
    }

    #[test_log::test]
    fn step_count_follows_drive_axis() {
        let dda = Dda3::new(Vector3::new(0.0, 1.0, 3.0), Vector3::new(2.0, 6.0, 0.0));
        assert_eq!(dda.len(), 6);

        let walk: Vec<_> = dda.collect();
        assert_eq!(walk.first(), Some(&Vector3::new(0.0, 1.0, 3.0)));
        assert!((walk[5] - Vector3::new(2.0, 6.0, 0.0)).norm() < 1e-12);
        for pair in walk.windows(2) {
            assert!(((pair[1].y - pair[0].y) - 1.0).abs() < 1e-12);
        }
    }

    #[test_log::test]
    fn huge_span_saturates_step_count() {
        let mut dda = Dda3::new(Vector3::zeros(), Vector3::new(1e300, 0.0, 0.0));
        assert_eq!(dda.len(), usize::MAX);
        assert_eq!(dda.next(), Some(Vector3::zeros()));
        assert_eq!(dda.next(), Some(Vector3::new(1.0, 0.0, 0.0)));
    }

    #[test_log::test]
    fn drive_axis_moves_backwards_with_negative_delta() {
        let walk: Vec<_> = Dda2::new(Vector2::new(4.0, 0.0), Vector2::new(0.0, 2.0)).collect();
        assert_eq!(walk.len(), 5);
        assert_eq!(walk[1], Vector2::new(3.0, 0.5));
        assert_eq!(walk[4], Vector2::new(0.0, 2.0));
    }

    #[test_log::test]
    fn max_intensity_single_voxel_and_line() {
        let volume =
            VoxelVolume::from_fn(4, 4, 4, |x, y, z| (x + y * 4 + z * 16) as u8).unwrap();

        let p = Point3::new(1.0, 2.0, 3.0);
        assert_eq!(max_intensity(&volume, &p, &p), 1 + 8 + 48);

        let p1 = Point3::new(3.0, 3.0, 0.0);
        let pn = Point3::new(0.0, 0.0, 0.0);
        assert_eq!(max_intensity(&volume, &p1, &pn), 15);

        let p1 = Point3::new(0.0, 0.0, 0.0);
        let pn = Point3::new(0.0, 1.0, 3.0);
        assert_eq!(max_intensity(&volume, &p1, &pn), 4 + 48);
    }

    #[test_log::test]
    fn max_intensity_outside_volume_is_zero() {
        let volume = VoxelVolume::from_fn(2, 2, 2, |_, _, _| 9).unwrap();
        let p1 = Point3::new(5.0, 5.0, 5.0);
        let pn = Point3::new(7.0, 5.0, 5.0);
        assert_eq!(max_intensity(&volume, &p1, &pn), 0);
    }
}
