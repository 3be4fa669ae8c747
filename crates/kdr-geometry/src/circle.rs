//! Discrete curvature from circle fits.
//!
//! All curvature functions return the curvature-binormal `κb`: a vector
//! normal to the osculating plane with magnitude `1/R`. Degenerate input
//! (coincident points) gives a zero vector.

use nalgebra::{Point3, Vector3};

use crate::EPSILON;

/// Curvature-binormal of the circle through three points.
///
/// With `e1 = p1 - p0` and `e2 = p2 - p1`:
/// `κb = 2 (e1 × e2) / (|e1| |e2| |e1 + e2|)`.
pub fn circumscribed_curvature(p0: &Point3<f64>, p1: &Point3<f64>, p2: &Point3<f64>) -> Vector3<f64> {
    let e1 = p1 - p0;
    let e2 = p2 - p1;
    let denom = e1.norm() * e2.norm() * (e1 + e2).norm();
    if denom <= EPSILON {
        return Vector3::zeros();
    }
    e1.cross(&e2) * (2.0 / denom)
}

/// Curvature-binormal of the circle tangent to unit `t` at a point and
/// passing through the next point, `e` being the chord towards it.
pub fn tangent_circle_curvature_start(t: &Vector3<f64>, e: &Vector3<f64>) -> Vector3<f64> {
    let l2 = e.norm_squared();
    if l2 <= EPSILON * EPSILON {
        return Vector3::zeros();
    }
    t.cross(e) * (2.0 / l2)
}

/// Curvature-binormal of the circle tangent to unit `t` at a point and
/// passing through the previous point, `e` being the chord arriving at it.
pub fn tangent_circle_curvature_end(e: &Vector3<f64>, t: &Vector3<f64>) -> Vector3<f64> {
    let l2 = e.norm_squared();
    if l2 <= EPSILON * EPSILON {
        return Vector3::zeros();
    }
    e.cross(t) * (2.0 / l2)
}

/// Tangent at the middle point of the circle through three points, given
/// the two chords `e_prev` (arriving) and `e_next` (leaving).
///
/// `t ∝ |e_next|²·e_prev + |e_prev|²·e_next`, i.e. the length-weighted sum
/// `l_next·u_prev + l_prev·u_next`.
pub fn circumscribed_tangent(e_prev: &Vector3<f64>, e_next: &Vector3<f64>) -> Option<Vector3<f64>> {
    (e_prev * e_next.norm_squared() + e_next * e_prev.norm_squared()).try_normalize(EPSILON)
}

/// Reflect `v` about the unit axis `a` (half turn about `a`).
///
/// Reflecting a circle tangent about a chord gives the tangent of the same
/// circle at the other end of the chord.
#[inline]
pub fn reflect_about(v: &Vector3<f64>, a: &Vector3<f64>) -> Vector3<f64> {
    a * (2.0 * v.dot(a)) - v
}

/// Mid-point of the arc starting at `start` with unit tangent `t` and
/// ending at `end`.
///
/// The arc mid-point lies along the bisector `d` of `t` and the chord
/// direction `u`, at distance `L / (2 d·u)`. Falls back to the chord
/// mid-point for a vanishing chord or a tangent pointing backwards.
pub fn arc_midpoint(start: &Point3<f64>, t: &Vector3<f64>, end: &Point3<f64>) -> Point3<f64> {
    let chord = end - start;
    let length = chord.norm();
    let midpoint = start + chord * 0.5;
    if length <= EPSILON {
        return midpoint;
    }
    let u = chord / length;
    let Some(d) = (t + u).try_normalize(EPSILON) else {
        return midpoint;
    };
    let cos_half = d.dot(&u);
    if cos_half <= EPSILON {
        return midpoint;
    }
    start + d * (0.5 * length / cos_half)
}
