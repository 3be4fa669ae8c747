//! Orthonormal local frames attached to rod cross-sections.
//!
//! A frame stores an origin and two unit in-plane axes. The normal axis is
//! never stored: it is always derived as `xaxis × yaxis`, so a frame cannot
//! carry an inconsistent third axis.
//!
//! Rotations act on the in-plane axes about the normal axis:
//!
//! ```text
//! x' =  cos(θ)·x + sin(θ)·y
//! y' = -sin(θ)·x + cos(θ)·y
//! ```

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::EPSILON;

/// Local orthonormal frame (origin + two unit in-plane axes).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Frame origin (cross-section centroid)
    pub origin: Point3<f64>,
    /// First in-plane axis (material direction d1)
    pub xaxis: Vector3<f64>,
    /// Second in-plane axis (material direction d2)
    pub yaxis: Vector3<f64>,
}

impl Frame {
    /// Create a frame from two in-plane directions.
    ///
    /// `xaxis` is normalized and `yaxis` is made orthogonal to it, so the
    /// result is orthonormal even for sloppy input.
    pub fn new(origin: Point3<f64>, xaxis: Vector3<f64>, yaxis: Vector3<f64>) -> Self {
        let mut frame = Self {
            origin,
            xaxis,
            yaxis,
        };
        frame.orthonormalize();
        frame
    }

    /// Create a frame whose normal axis is `normal`, with an arbitrary but
    /// deterministic choice of in-plane axes.
    pub fn from_normal(origin: Point3<f64>, normal: &Vector3<f64>) -> Self {
        let z = normal
            .try_normalize(EPSILON)
            .unwrap_or_else(Vector3::z);
        let x = perpendicular(&z);
        Self {
            origin,
            xaxis: x,
            yaxis: z.cross(&x),
        }
    }

    /// Create a frame whose normal axis is `normal` and whose first axis is
    /// the projection of `reference` onto the normal plane.
    ///
    /// Falls back to [`Frame::from_normal`] when `reference` is parallel to
    /// `normal`.
    pub fn from_normal_and_reference(
        origin: Point3<f64>,
        normal: &Vector3<f64>,
        reference: &Vector3<f64>,
    ) -> Self {
        let z = normal
            .try_normalize(EPSILON)
            .unwrap_or_else(Vector3::z);
        match (reference - z * z.dot(reference)).try_normalize(EPSILON) {
            Some(x) => Self {
                origin,
                xaxis: x,
                yaxis: z.cross(&x),
            },
            None => Self::from_normal(origin, &z),
        }
    }

    /// World XY frame translated to `origin`.
    pub fn world_xy(origin: Point3<f64>) -> Self {
        Self {
            origin,
            xaxis: Vector3::x(),
            yaxis: Vector3::y(),
        }
    }

    /// Normal axis (`xaxis × yaxis`).
    #[inline]
    pub fn zaxis(&self) -> Vector3<f64> {
        self.xaxis.cross(&self.yaxis)
    }

    /// Rotate the in-plane axes about the normal axis by `angle` radians.
    pub fn rotate(&mut self, angle: f64) {
        let (s, c) = angle.sin_cos();
        self.rotate_cs(c, s);
    }

    /// Rotate the in-plane axes about the normal axis by a small `angle`.
    ///
    /// Uses a third-order series of the half-angle tangent
    /// `t = θ/2 + θ³/24` and the rational forms
    /// `cos = (1 - t²)/(1 + t²)`, `sin = 2t/(1 + t²)`, so that
    /// `sin² + cos² = 1` holds exactly regardless of the truncation error.
    pub fn rotate_small(&mut self, angle: f64) {
        let half = 0.5 * angle;
        let t = half + half * half * half / 3.0;
        let t2 = t * t;
        let inv = 1.0 / (1.0 + t2);
        self.rotate_cs((1.0 - t2) * inv, 2.0 * t * inv);
    }

    fn rotate_cs(&mut self, c: f64, s: f64) {
        let x = self.xaxis;
        let y = self.yaxis;
        self.xaxis = x * c + y * s;
        self.yaxis = y * c - x * s;
    }

    /// Re-orthonormalize the axes (Gram-Schmidt, `xaxis` kept as leading axis).
    pub fn orthonormalize(&mut self) {
        let Some(x) = self.xaxis.try_normalize(EPSILON) else {
            // degenerate first axis, rebuild from yaxis alone
            let normal = perpendicular_or_z(&self.yaxis);
            *self = Self::from_normal_and_reference(self.origin, &normal, &self.yaxis);
            return;
        };
        let y = self.yaxis - x * x.dot(&self.yaxis);
        self.xaxis = x;
        self.yaxis = match y.try_normalize(EPSILON) {
            Some(y) => y,
            None => perpendicular(&x).cross(&x),
        };
    }

    /// Re-orthonormalize the frame so that its normal axis is exactly
    /// `normal` (assumed unit length), keeping `xaxis` as close as possible.
    pub fn orthonormalize_about(&mut self, normal: &Vector3<f64>) {
        let x = match (self.xaxis - normal * normal.dot(&self.xaxis)).try_normalize(EPSILON) {
            Some(x) => x,
            None => match (normal.cross(&self.yaxis.cross(normal))).try_normalize(EPSILON) {
                Some(y) => y.cross(normal),
                None => perpendicular(normal),
            },
        };
        self.xaxis = x;
        self.yaxis = normal.cross(&x);
    }

    /// Components of a global vector in this frame `(·x, ·y, ·z)`.
    #[inline]
    pub fn to_local(&self, v: &Vector3<f64>) -> Vector3<f64> {
        Vector3::new(v.dot(&self.xaxis), v.dot(&self.yaxis), v.dot(&self.zaxis()))
    }

    /// Global vector from components in this frame.
    #[inline]
    pub fn to_global(&self, local: &Vector3<f64>) -> Vector3<f64> {
        self.xaxis * local.x + self.yaxis * local.y + self.zaxis() * local.z
    }

    /// Check unit length and orthogonality of the in-plane axes.
    pub fn is_orthonormal(&self, tolerance: f64) -> bool {
        (self.xaxis.norm() - 1.0).abs() <= tolerance
            && (self.yaxis.norm() - 1.0).abs() <= tolerance
            && self.xaxis.dot(&self.yaxis).abs() <= tolerance
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::world_xy(Point3::origin())
    }
}

/// Unit vector perpendicular to the unit vector `v`.
pub fn perpendicular(v: &Vector3<f64>) -> Vector3<f64> {
    // Reference axis not parallel to v
    let reference = if v.x.abs() < 0.9 {
        Vector3::x()
    } else {
        Vector3::y()
    };
    v.cross(&reference).normalize()
}

fn perpendicular_or_z(v: &Vector3<f64>) -> Vector3<f64> {
    match v.try_normalize(EPSILON) {
        Some(v) => perpendicular(&v),
        None => Vector3::z(),
    }
}

/// Signed angle from `a` to `b` measured about `axis` (unit), in `(-π, π]`.
///
/// Both vectors are projected onto the plane normal to `axis` first.
pub fn signed_angle(a: &Vector3<f64>, b: &Vector3<f64>, axis: &Vector3<f64>) -> f64 {
    let pa = a - axis * axis.dot(a);
    let pb = b - axis * axis.dot(b);
    let angle = pa.cross(&pb).dot(axis).atan2(pa.dot(&pb));
    if angle <= -std::f64::consts::PI {
        std::f64::consts::PI
    } else {
        angle
    }
}
