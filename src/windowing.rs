//! Intensity windowing and label overlays for extracted rasters.
//!
//! These operate on 2-D results only; none of them resample geometry.

use std::collections::HashMap;

use crate::raster::{ColorRaster2D, Raster2D};
use crate::volume::VolumeError;

use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Linear intensity window: inputs below `i1` map to `k1`, inputs at or above
/// `i2` to `k2`, and the range between is stretched linearly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Window {
    pub i1: f64,
    pub i2: f64,
    pub k1: f64,
    pub k2: f64,
}

impl Window {
    pub fn apply(&self, value: u8) -> u8 {
        let v = f64::from(value);
        let out = if v < self.i1 {
            self.k1
        } else if v < self.i2 {
            (self.k2 - self.k1) / (self.i2 - self.i1) * (v - self.i1) + self.k1
        } else {
            self.k2
        };
        out.clamp(0.0, 255.0) as u8
    }

    pub fn apply_to(&self, raster: &Raster2D) -> Raster2D {
        let window = *self;
        raster.map(move |v| window.apply(v))
    }
}

/// Stretch the raster's range onto `[0, 2^num_bits - 1]`.
pub fn normalize(raster: &Raster2D, num_bits: u32) -> Result<Raster2D, VolumeError> {
    if !(1..=8).contains(&num_bits) {
        return Err(VolumeError::InvalidConfiguration(format!(
            "cannot normalize 8-bit rasters to {num_bits} bits"
        )));
    }
    let (min, max) = raster.min_max();
    let window = Window {
        i1: f64::from(min),
        i2: f64::from(max),
        k1: 0.0,
        k2: f64::from((1u32 << num_bits) - 1),
    };
    debug!("normalizing {min}..{max} to {num_bits} bits");
    Ok(window.apply_to(raster))
}

/// Invert the raster within its own range: the minimum becomes the maximum
/// and vice versa.
pub fn negative(raster: &Raster2D) -> Raster2D {
    let (min, max) = raster.min_max();
    Window {
        i1: f64::from(min),
        i2: f64::from(max),
        k1: f64::from(max),
        k2: f64::from(min),
    }
    .apply_to(raster)
}

/// Brightness/contrast window. `brightness` and `contrast` are percentages;
/// higher values brighten and add contrast.
pub fn brightness_contrast(
    raster: &Raster2D,
    brightness: f64,
    contrast: f64,
) -> Result<Raster2D, VolumeError> {
    let percent = 0.0..=100.0;
    if !percent.contains(&brightness) || !percent.contains(&contrast) {
        return Err(VolumeError::InvalidConfiguration(format!(
            "brightness ({brightness}) and contrast ({contrast}) must be within 0..=100"
        )));
    }
    let h = f64::from(raster.min_max().1);
    let level = (100.0 - brightness) / 100.0 * h;
    let width = (100.0 - contrast) / 100.0 * h;
    Ok(Window {
        i1: level - width / 2.0,
        i2: level + width / 2.0,
        k1: 0.0,
        k2: h,
    }
    .apply_to(raster))
}

/// Stable mapping from segmentation labels to colour-map positions.
///
/// Positions are drawn from a seeded generator the first time a label is
/// seen, so the same seed and label order give the same colours.
#[derive(Debug, Clone)]
pub struct LabelPalette {
    rng: StdRng,
    positions: HashMap<u8, u8>,
}

impl LabelPalette {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            positions: HashMap::new(),
        }
    }

    /// Colour-map position of `label` in `0..=255`.
    pub fn position(&mut self, label: u8) -> u8 {
        let rng = &mut self.rng;
        *self
            .positions
            .entry(label)
            .or_insert_with(|| rng.random_range(0..=u8::MAX))
    }

    /// Jet colour for `label`.
    pub fn color(&mut self, label: u8) -> [f64; 3] {
        jet(f64::from(self.position(label)) / 255.0)
    }
}

/// Blue→cyan→yellow→red colour map over `t` in `[0, 1]`, channels in
/// `0..=255`.
fn jet(t: f64) -> [f64; 3] {
    let v = 4.0 * t + 1.0;
    let channel = |a: f64, b: f64, peak: f64| {
        255.0 * ((peak - (v - a).abs() - (v - b).abs()) / 2.0).max(0.0)
    };
    [
        channel(4.0, 5.0, 3.0),
        channel(2.0, 4.0, 4.0),
        channel(1.0, 2.0, 3.0),
    ]
}

/// Overlay `labels` on the grey-level `cut`.
///
/// Unlabelled pixels (label 0) show the cut rescaled to `0..=255`. Labelled
/// pixels keep their raw intensity as luma and take their chroma from the
/// label's palette colour. That tint is blended 70/30 with the raw intensity
/// and halved, so overlays never exceed 127.
pub fn color_labels(
    cut: &Raster2D,
    labels: &Raster2D,
    palette: &mut LabelPalette,
) -> Result<ColorRaster2D, VolumeError> {
    if (cut.size_x(), cut.size_y()) != (labels.size_x(), labels.size_y()) {
        return Err(VolumeError::InvalidConfiguration(format!(
            "label raster {}x{} does not match image {}x{}",
            labels.size_x(),
            labels.size_y(),
            cut.size_x(),
            cut.size_y()
        )));
    }
    let max = f64::from(cut.min_max().1);

    let pixels = cut
        .data()
        .iter()
        .zip(labels.data().iter())
        .map(|(&value, &label)| {
            if label == 0 {
                let g = if max > 0.0 {
                    (255.0 * f64::from(value) / max) as u8
                } else {
                    0
                };
                return [g, g, g];
            }
            let luma = f64::from(value);
            let [r, g, b] = palette.color(label);
            let cg = -0.25 * r + 0.5 * g - 0.25 * b;
            let co = 0.5 * r - 0.5 * b;
            let tinted = [luma - cg + co, luma + cg, luma - cg - co];
            tinted.map(|c| ((0.7 * c.clamp(0.0, 255.0) + 0.3 * luma) / 2.0) as u8)
        })
        .collect();

    ColorRaster2D::from_row_major(cut.size_x(), cut.size_y(), pixels)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raster(values: &[u8]) -> Raster2D {
        Raster2D::from_row_major(values.len(), 1, values.to_vec()).unwrap()
    }

    fn pixels(raster: &Raster2D) -> Vec<u8> {
        raster.data().iter().copied().collect()
    }

    #[test_log::test]
    fn window_clamps_and_stretches() {
        let window = Window {
            i1: 10.0,
            i2: 20.0,
            k1: 0.0,
            k2: 100.0,
        };
        assert_eq!(window.apply(5), 0);
        assert_eq!(window.apply(15), 50);
        assert_eq!(window.apply(20), 100);
        assert_eq!(window.apply(250), 100);
    }

    #[test_log::test]
    fn normalize_stretches_to_bit_depth() {
        let out = normalize(&raster(&[10, 20, 30]), 8).unwrap();
        assert_eq!(pixels(&out), vec![0, 127, 255]);

        let out = normalize(&raster(&[10, 20, 30]), 4).unwrap();
        assert_eq!(pixels(&out), vec![0, 7, 15]);

        assert!(normalize(&raster(&[1]), 9).is_err());
        assert!(normalize(&raster(&[1]), 0).is_err());
    }

    #[test_log::test]
    fn flat_raster_normalizes_to_top() {
        let out = normalize(&raster(&[9, 9]), 8).unwrap();
        assert_eq!(pixels(&out), vec![255, 255]);
    }

    #[test_log::test]
    fn negative_swaps_extremes() {
        let out = negative(&raster(&[10, 30, 50]));
        assert_eq!(pixels(&out), vec![50, 30, 10]);
    }

    #[test_log::test]
    fn brightness_contrast_at_midpoint() {
        // level 100, width 100: window 50..150 onto 0..200
        let out = brightness_contrast(&raster(&[0, 50, 100, 150, 200]), 50.0, 50.0).unwrap();
        assert_eq!(pixels(&out), vec![0, 0, 100, 200, 200]);
        assert!(brightness_contrast(&raster(&[1]), 120.0, 0.0).is_err());
    }

    #[test_log::test]
    fn palette_is_deterministic_per_seed() {
        let mut a = LabelPalette::new(7);
        let mut b = LabelPalette::new(7);
        let first: Vec<_> = [3, 1, 3, 9].iter().map(|&l| a.position(l)).collect();
        let second: Vec<_> = [3, 1, 3, 9].iter().map(|&l| b.position(l)).collect();
        assert_eq!(first, second);
        assert_eq!(first[0], first[2]);
    }

    #[test_log::test]
    fn jet_endpoints() {
        assert_eq!(jet(0.0), [0.0, 0.0, 255.0]);
        assert_eq!(jet(1.0), [255.0, 0.0, 0.0]);
    }

    #[test_log::test]
    fn unlabelled_pixels_stay_grey() {
        let cut = raster(&[0, 100, 200]);
        let labels = raster(&[0, 0, 4]);
        let mut palette = LabelPalette::new(1);
        let colored = color_labels(&cut, &labels, &mut palette).unwrap();
        assert_eq!(colored.get(0, 0).unwrap(), [0, 0, 0]);
        assert_eq!(colored.get(1, 0).unwrap(), [127, 127, 127]);

        let again = color_labels(&cut, &labels, &mut palette).unwrap();
        assert_eq!(colored, again);
    }

    #[test_log::test]
    fn labelled_pixels_use_raw_intensity_at_half_scale() {
        let labels = raster(&[3, 0]);
        let mut palette = LabelPalette::new(5);
        let dim = color_labels(&raster(&[50, 50]), &labels, &mut palette).unwrap();
        let bright = color_labels(&raster(&[50, 200]), &labels, &mut palette).unwrap();
        assert_eq!(dim.get(0, 0).unwrap(), bright.get(0, 0).unwrap());
        assert_eq!(dim.get(1, 0).unwrap(), [255, 255, 255]);

        let saturated = color_labels(&raster(&[255; 4]), &raster(&[1, 2, 3, 4]), &mut palette)
            .unwrap();
        assert!(saturated.data().iter().flatten().all(|&c| c <= 127));
    }

    #[test_log::test]
    fn mismatched_label_raster_is_rejected() {
        let mut palette = LabelPalette::new(1);
        assert!(matches!(
            color_labels(&raster(&[1, 2]), &raster(&[1]), &mut palette),
            Err(VolumeError::InvalidConfiguration(_))
        ));
    }
}
