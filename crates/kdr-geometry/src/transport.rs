//! Parallel transport of vectors and frames between tangent directions.
//!
//! Two interchangeable operators are provided:
//!
//! - **Rotation**: the minimal rotation taking `from` onto `to`, in the
//!   closed Rodrigues form
//!   `v' = c·v + k × v + (k·v)/(1 + c)·k` with `k = from × to`, `c = from·to`.
//!   Cheap, but undefined when `c = -1`.
//! - **Double reflection**: a reflection across the plane normal to the
//!   chord `to_point - from_point`, followed by a reflection that maps the
//!   reflected tangent onto `to`. Moves a frame along the curve and aligns
//!   its normal axis in one step.
//!
//! Both agree (up to rounding) whenever the chord lies in the plane spanned
//! by the two tangents, which is the case for points on a common circle.
//! Double reflection never fails: with coincident points the first
//! reflection is taken normal to the source tangent.

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::frame::{signed_angle, Frame};
use crate::EPSILON;

/// Parallel-transport algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TransportMethod {
    /// Rodrigues minimal rotation (many calls per point)
    #[default]
    Rotation,
    /// Two hyperplane reflections (propagation between distant points)
    DoubleReflection,
}

/// Rotate `v` by the minimal rotation taking unit `from` onto unit `to`.
///
/// Returns `None` when the directions are opposite and the rotation axis is
/// undefined.
pub fn rotate_vector(
    v: &Vector3<f64>,
    from: &Vector3<f64>,
    to: &Vector3<f64>,
) -> Option<Vector3<f64>> {
    let c = from.dot(to);
    if 1.0 + c <= EPSILON {
        return None;
    }
    let k = from.cross(to);
    Some(v * c + k.cross(v) + k * (k.dot(v) / (1.0 + c)))
}

/// Transport `v` with the double-reflection method.
///
/// The first reflection is across the plane normal to
/// `to_point - from_point`, or normal to `from_dir` when the points
/// coincide. The second maps the reflected tangent onto `to_dir` and is
/// skipped when the reflected tangent already equals `to_dir`.
pub fn reflect_vector(
    v: &Vector3<f64>,
    from_point: &Point3<f64>,
    from_dir: &Vector3<f64>,
    to_point: &Point3<f64>,
    to_dir: &Vector3<f64>,
) -> Vector3<f64> {
    let mut v1 = to_point - from_point;
    let mut c1 = v1.norm_squared();
    if c1 <= EPSILON * EPSILON {
        v1 = *from_dir;
        c1 = 1.0;
    }
    let v_l = v - v1 * (2.0 * v1.dot(v) / c1);
    let t_l = from_dir - v1 * (2.0 * v1.dot(from_dir) / c1);

    let v2 = to_dir - t_l;
    let c2 = v2.norm_squared();
    if c2 <= EPSILON * EPSILON {
        return v_l;
    }
    v_l - v2 * (2.0 * v2.dot(&v_l) / c2)
}

/// Transport `v` from `from` to `to` about a common point, never failing.
///
/// Uses the rotation method and falls back to double reflection when the
/// directions are opposite.
pub fn transport_vector(v: &Vector3<f64>, from: &Vector3<f64>, to: &Vector3<f64>) -> Vector3<f64> {
    match rotate_vector(v, from, to) {
        Some(w) => w,
        None => {
            let origin = Point3::origin();
            reflect_vector(v, &origin, from, &origin, to)
        }
    }
}

/// Transport a frame with the rotation method and move it to `to_point`.
pub fn rotate_frame(frame: &Frame, to_point: &Point3<f64>, to_dir: &Vector3<f64>) -> Option<Frame> {
    let from_dir = frame.zaxis();
    let x = rotate_vector(&frame.xaxis, &from_dir, to_dir)?;
    Some(rebuild(*to_point, x, to_dir))
}

/// Transport a frame with the double-reflection method.
pub fn reflect_frame(frame: &Frame, to_point: &Point3<f64>, to_dir: &Vector3<f64>) -> Frame {
    let from_dir = frame.zaxis();
    let x = reflect_vector(&frame.xaxis, &frame.origin, &from_dir, to_point, to_dir);
    rebuild(*to_point, x, to_dir)
}

fn rebuild(origin: Point3<f64>, x: Vector3<f64>, z: &Vector3<f64>) -> Frame {
    let mut frame = Frame {
        origin,
        xaxis: x,
        yaxis: z.cross(&x),
    };
    frame.orthonormalize_about(z);
    frame
}

/// Transport `frame` so that its normal axis becomes the unit `to_dir` and
/// its origin `to_point`.
///
/// The rotation method falls back to double reflection for opposite
/// directions.
pub fn parallel_transport(
    frame: &Frame,
    to_point: &Point3<f64>,
    to_dir: &Vector3<f64>,
    method: TransportMethod,
) -> Frame {
    match method {
        TransportMethod::Rotation => rotate_frame(frame, to_point, to_dir)
            .unwrap_or_else(|| reflect_frame(frame, to_point, to_dir)),
        TransportMethod::DoubleReflection => reflect_frame(frame, to_point, to_dir),
    }
}

/// Signed twist from `f1` to `f2`, in `(-π, π]`.
///
/// `f1.x` is transported onto the normal plane of `f2`, then the angle from
/// `f2.x` to the transported axis is measured about `f2.z`. A frame `f2`
/// rotated by `+α` relative to the transported `f1` yields `-α`.
pub fn twist_angle(f1: &Frame, f2: &Frame) -> f64 {
    let z2 = f2.zaxis();
    let x1 = transport_vector(&f1.xaxis, &f1.zaxis(), &z2);
    signed_angle(&f2.xaxis, &x1, &z2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

    #[test]
    fn rotation_maps_from_onto_to() {
        let from = Vector3::new(1.0, 0.0, 0.0);
        let to = Vector3::new(0.0, 1.0, 1.0).normalize();
        let w = rotate_vector(&from, &from, &to).unwrap();
        assert!((w - to).norm() < 1e-14);
    }

    #[test]
    fn rotation_degenerate_for_opposite_directions() {
        let from = Vector3::z();
        assert!(rotate_vector(&Vector3::x(), &from, &-from).is_none());
    }

    #[test]
    fn reflection_handles_opposite_directions_between_distinct_points() {
        // half circle: x0 = 0 with tangent +y, x1 = (2, 0, 0) with tangent -y
        let frame = Frame::from_normal_and_reference(Point3::origin(), &Vector3::y(), &Vector3::z());
        let to = Point3::new(2.0, 0.0, 0.0);
        let moved = reflect_frame(&frame, &to, &-Vector3::y());
        assert!((moved.zaxis() + Vector3::y()).norm() < 1e-14);
        // the binormal of a planar curve is preserved
        assert!((moved.xaxis - Vector3::z()).norm() < 1e-14);
    }

    #[test]
    fn identity_transport() {
        let mut frame = Frame::from_normal(Point3::origin(), &Vector3::new(1.0, 2.0, 3.0));
        frame.rotate(0.7);
        let same = parallel_transport(&frame, &frame.origin, &frame.zaxis(), TransportMethod::DoubleReflection);
        assert!((same.xaxis - frame.xaxis).norm() < 1e-14);
        assert!((same.yaxis - frame.yaxis).norm() < 1e-14);
    }

    #[test]
    fn opposite_direction_at_same_point() {
        let frame = Frame::default();
        let flipped = parallel_transport(&frame, &frame.origin, &-Vector3::z(), TransportMethod::Rotation);
        assert!((flipped.zaxis() + Vector3::z()).norm() < 1e-14);
        assert!(flipped.is_orthonormal(1e-14));
    }

    #[test]
    fn twist_angle_of_rotated_frame() {
        let f1 = Frame::from_normal(Point3::origin(), &Vector3::new(0.3, -0.2, 1.0));
        for &alpha in &[0.1, FRAC_PI_4, FRAC_PI_2, 3.0, -1.2] {
            let mut f2 = f1;
            f2.rotate(alpha);
            assert!((twist_angle(&f1, &f2) + alpha).abs() < 1e-12, "alpha {alpha}");
            assert!((twist_angle(&f2, &f1) - alpha).abs() < 1e-12, "alpha {alpha}");
        }
        let mut f2 = f1;
        f2.rotate(PI);
        // half turn lands on the branch cut, either sign within rounding
        assert!((twist_angle(&f1, &f2).abs() - PI).abs() < 1e-12);
    }

    #[test]
    fn twist_angle_zero_for_transported_frame() {
        let f1 = Frame::from_normal(Point3::origin(), &Vector3::x());
        let to_dir = Vector3::new(1.0, 1.0, 0.2).normalize();
        let f2 = parallel_transport(&f1, &Point3::new(1.0, 0.5, 0.0), &to_dir, TransportMethod::Rotation);
        assert!(twist_angle(&f1, &f2).abs() < 1e-12);
    }
}
