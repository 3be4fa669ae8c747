//! Frame algebra for discrete elastic rods.
//!
//! This crate provides the geometric layer used by the relaxation solver:
//!
//! - [`Frame`]: origin + two orthonormal in-plane axes, exact and small-angle
//!   rotation about the normal axis
//! - parallel transport of vectors and frames ([`TransportMethod`]), and the
//!   signed [`twist_angle`] between two frames
//! - circle fits giving the discrete curvature-binormal and tangents

pub mod circle;
pub mod frame;
pub mod transport;

pub use circle::{
    arc_midpoint, circumscribed_curvature, circumscribed_tangent, reflect_about,
    tangent_circle_curvature_end, tangent_circle_curvature_start,
};
pub use frame::{perpendicular, signed_angle, Frame};
pub use transport::{
    parallel_transport, reflect_frame, reflect_vector, rotate_frame, rotate_vector,
    transport_vector, twist_angle, TransportMethod,
};

/// Length below which vectors are treated as zero.
pub const EPSILON: f64 = 1e-12;
