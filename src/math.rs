use serde::{Deserialize, Serialize};
use std::ops::Mul;

/// Row-major 4x4 matrix as handed back by the HMD runtime.
pub type Mat4 = [[f32; 4]; 4];

/// Affine 3-D transform: orthonormal 3x3 basis plus an origin.
///
/// This is the shape tracking data arrives in (rigid rotation plus
/// translation), so the inverse point transform can use the transposed basis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform3 {
    pub basis: [[f32; 3]; 3],
    pub origin: [f32; 3],
}

impl Transform3 {
    pub const IDENTITY: Self = Self {
        basis: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
        origin: [0.0, 0.0, 0.0],
    };

    pub fn from_origin(origin: [f32; 3]) -> Self {
        Self {
            origin,
            ..Self::IDENTITY
        }
    }

    /// Rotation around the Y axis, handy for building reference frames.
    pub fn rotation_y(angle: f32) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self {
            basis: [[cos, 0.0, sin], [0.0, 1.0, 0.0], [-sin, 0.0, cos]],
            origin: [0.0, 0.0, 0.0],
        }
    }

    /// Transforms a point: `basis * point + origin`.
    pub fn xform(&self, point: [f32; 3]) -> [f32; 3] {
        let mut out = self.origin;
        for (i, row) in self.basis.iter().enumerate() {
            out[i] += row[0] * point[0] + row[1] * point[1] + row[2] * point[2];
        }
        out
    }

    /// Applies the inverse transform to a point.
    ///
    /// Uses the transposed basis, which is the inverse only while the basis
    /// stays orthonormal.
    pub fn xform_inv(&self, point: [f32; 3]) -> [f32; 3] {
        let local = [
            point[0] - self.origin[0],
            point[1] - self.origin[1],
            point[2] - self.origin[2],
        ];
        let mut out = [0.0; 3];
        for (i, value) in out.iter_mut().enumerate() {
            *value = self.basis[0][i] * local[0]
                + self.basis[1][i] * local[1]
                + self.basis[2][i] * local[2];
        }
        out
    }

    /// Returns the transform with only its translation scaled. Used to apply
    /// world scale to eye-to-head offsets without touching rotation.
    pub fn scaled_translation(&self, scale: f32) -> Self {
        Self {
            basis: self.basis,
            origin: [
                self.origin[0] * scale,
                self.origin[1] * scale,
                self.origin[2] * scale,
            ],
        }
    }

    pub fn approx_eq(&self, other: &Self, epsilon: f32) -> bool {
        for i in 0..3 {
            if (self.origin[i] - other.origin[i]).abs() > epsilon {
                return false;
            }
            for j in 0..3 {
                if (self.basis[i][j] - other.basis[i][j]).abs() > epsilon {
                    return false;
                }
            }
        }
        true
    }
}

impl Default for Transform3 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul for Transform3 {
    type Output = Transform3;

    fn mul(self, rhs: Transform3) -> Transform3 {
        let mut basis = [[0.0; 3]; 3];
        for i in 0..3 {
            for j in 0..3 {
                basis[i][j] = self.basis[i][0] * rhs.basis[0][j]
                    + self.basis[i][1] * rhs.basis[1][j]
                    + self.basis[i][2] * rhs.basis[2][j];
            }
        }
        Transform3 {
            basis,
            origin: self.xform(rhs.origin),
        }
    }
}

/// Axis-aligned rectangle used for screen/blit geometry.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect2 {
    pub position: [f32; 2],
    pub size: [f32; 2],
}

impl Rect2 {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            position: [x, y],
            size: [width, height],
        }
    }

    pub fn has_area(&self) -> bool {
        self.size[0] > 0.0 && self.size[1] > 0.0
    }
}

/// Flattens a row-major matrix column by column: `out[i * 4 + j] = m[j][i]`.
pub fn flatten_column_major(matrix: &Mat4) -> Vec<f64> {
    let mut out = Vec::with_capacity(16);
    for i in 0..4 {
        for j in 0..4 {
            out.push(matrix[j][i] as f64);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const EPS: f32 = 1e-5;

    #[test]
    fn identity_leaves_points_untouched() {
        let point = [1.0, -2.5, 3.0];
        assert_eq!(Transform3::IDENTITY.xform(point), point);
        assert_eq!(Transform3::IDENTITY.xform_inv(point), point);
    }

    #[test]
    fn xform_inv_reverses_xform_for_rigid_transforms() {
        let transform = Transform3::rotation_y(0.7) * Transform3::from_origin([1.0, 2.0, -0.5]);
        let point = [0.3, 1.6, -2.0];
        let round_trip = transform.xform_inv(transform.xform(point));
        for (a, b) in round_trip.iter().zip(point.iter()) {
            assert!((a - b).abs() < EPS);
        }
    }

    #[test]
    fn scaled_translation_preserves_basis() {
        let transform = Transform3 {
            basis: Transform3::rotation_y(1.2).basis,
            origin: [0.032, -0.01, 0.0],
        };
        let scaled = transform.scaled_translation(10.0);
        assert_eq!(scaled.basis, transform.basis);
        assert!((scaled.origin[0] - 0.32).abs() < EPS);
        assert!((scaled.origin[1] + 0.1).abs() < EPS);
    }

    #[test]
    fn flatten_is_column_major() {
        let mut matrix = [[0.0f32; 4]; 4];
        for (j, row) in matrix.iter_mut().enumerate() {
            for (i, value) in row.iter_mut().enumerate() {
                *value = (j * 4 + i) as f32;
            }
        }
        let flat = flatten_column_major(&matrix);
        assert_eq!(flat.len(), 16);
        for i in 0..4 {
            for j in 0..4 {
                assert_eq!(flat[i * 4 + j], matrix[j][i] as f64);
            }
        }
    }

    #[test]
    fn transform_survives_json_payloads() {
        let transform = Transform3::rotation_y(0.6) * Transform3::from_origin([0.5, 1.6, -2.0]);
        let bytes = serde_json::to_vec(&transform).expect("transform should encode");
        let decoded: Transform3 = serde_json::from_slice(&bytes).expect("transform should decode");
        assert_eq!(decoded, transform);
    }

    proptest! {
        #[test]
        fn composition_matches_sequential_application(
            angle_a in -3.0f32..3.0,
            angle_b in -3.0f32..3.0,
            origin in prop::array::uniform3(-10.0f32..10.0),
            point in prop::array::uniform3(-10.0f32..10.0),
        ) {
            let a = Transform3::rotation_y(angle_a) * Transform3::from_origin(origin);
            let b = Transform3::rotation_y(angle_b);
            let composed = (a * b).xform(point);
            let sequential = a.xform(b.xform(point));
            for (lhs, rhs) in composed.iter().zip(sequential.iter()) {
                prop_assert!((lhs - rhs).abs() < 1e-3);
            }
        }
    }
}
