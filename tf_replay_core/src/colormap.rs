//! Height-based point coloring.
//!
//! Point clouds carry no color of their own; each sample is colored by
//! normalizing every point's z coordinate against the sample's own min/max
//! and looking the result up in the turbo colormap.

use nalgebra::{Vector2, Vector4};

// Polynomial approximation of the Turbo colormap.
// Taken from https://gist.github.com/mikhailov-work/0d177465a8151eb6ede1768d51d476c7.
// Original LUT: https://gist.github.com/mikhailov-work/ee72ba4191942acecc03fe6da94fc73f.
//
// Copyright 2019 Google LLC.
// SPDX-License-Identifier: Apache-2.0
//
// Authors:
//   Colormap Design: Anton Mikhailov (mikhailov@google.com)
//   GLSL Approximation: Ruofei Du (ruofei@google.com)

/// Turbo colormap lookup. `t` is expected in `[0, 1]`; the result is an RGB
/// triplet with every channel in `[0, 1]`.
pub fn turbo(t: f32) -> [f32; 3] {
    let r4 = Vector4::new(0.13572138, 4.61539260, -42.66032258, 132.13108234);
    let g4 = Vector4::new(0.09140261, 2.19418839, 4.84296658, -14.18503333);
    let b4 = Vector4::new(0.10667330, 12.64194608, -60.58204836, 110.36276771);

    let r2 = Vector2::new(-152.94239396, 59.28637943);
    let g2 = Vector2::new(4.27729857, 2.82956604);
    let b2 = Vector2::new(-89.90310912, 27.34824973);

    let t = t.clamp(0.0, 1.0);
    let v4 = Vector4::new(1.0, t, t * t, t * t * t);
    let v2 = Vector2::new(v4.z, v4.w) * v4.z;

    [
        (v4.dot(&r4) + v2.dot(&r2)).clamp(0.0, 1.0),
        (v4.dot(&g4) + v2.dot(&g2)).clamp(0.0, 1.0),
        (v4.dot(&b4) + v2.dot(&b2)).clamp(0.0, 1.0),
    ]
}

/// Min-max normalization into `[0, 1]`.
///
/// A zero-range input (`max == min`) maps to 0 rather than dividing by
/// zero; NaN never enters the output stream.
pub fn normalize(value: f32, min: f32, max: f32) -> f32 {
    if max > min {
        ((value - min) / (max - min)).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Colors one point-cloud sample by height: each point's z is normalized
/// against the sample's own min/max and mapped through [`turbo`].
pub fn color_by_height(points: &[[f32; 3]]) -> Vec<[f32; 3]> {
    let mut min_z = f32::INFINITY;
    let mut max_z = f32::NEG_INFINITY;
    for p in points {
        min_z = min_z.min(p[2]);
        max_z = max_z.max(p[2]);
    }
    points
        .iter()
        .map(|p| turbo(normalize(p[2], min_z, max_z)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn normalize_spans_unit_interval() {
        assert_eq!(normalize(-1.0, -1.0, 3.0), 0.0);
        assert_eq!(normalize(3.0, -1.0, 3.0), 1.0);
        assert_eq!(normalize(1.0, -1.0, 3.0), 0.5);
    }

    #[test]
    fn normalize_zero_range_falls_back_to_zero() {
        let t = normalize(2.5, 2.5, 2.5);
        assert_eq!(t, 0.0);
        assert!(!t.is_nan());
    }

    #[test]
    fn flat_cloud_gets_constant_color() {
        let points = [[0.0, 0.0, 1.0], [1.0, 2.0, 1.0], [3.0, 4.0, 1.0]];
        let colors = color_by_height(&points);
        assert_eq!(colors.len(), 3);
        assert_eq!(colors[0], colors[1]);
        assert_eq!(colors[1], colors[2]);
        for c in &colors {
            assert!(c.iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn empty_cloud_gets_no_colors() {
        assert!(color_by_height(&[]).is_empty());
    }

    proptest! {
        #[test]
        fn turbo_stays_in_unit_cube(t in 0.0f32..=1.0) {
            let [r, g, b] = turbo(t);
            prop_assert!((0.0..=1.0).contains(&r));
            prop_assert!((0.0..=1.0).contains(&g));
            prop_assert!((0.0..=1.0).contains(&b));
        }

        #[test]
        fn normalize_stays_in_unit_interval(
            v in -1e6f32..1e6,
            min in -1e6f32..1e6,
            span in 0.0f32..1e6,
        ) {
            let t = normalize(v, min, min + span);
            prop_assert!((0.0..=1.0).contains(&t));
            prop_assert!(!t.is_nan());
        }
    }
}
