//! Kinetic Dynamic Relaxation of discrete Kirchhoff rods.
//!
//! This crate provides:
//! - **Rod element** ([`RodBeam`]): ghost/handle discretization of an elastic
//!   rod with bending, torsion, shear and axial internal forces
//! - **Centerline kinematics** ([`centerline`]): edges, tangents, frame
//!   alignment and the refinement of input frames
//! - **Cross sections** ([`CrossSection`], [`ElasticMaterial`]) reduced to
//!   [`RodStiffness`]
//! - **Load dispatch** ([`VectorLoad`], [`LoadDispatch`]) including follower
//!   loads
//! - **Supports** ([`Support`]) through the [`Boundary`] contract
//! - **Relaxation driver** ([`KdrSolver`]) with kinetic damping on separate
//!   translation and rotation subsystems

pub mod boundary;
pub mod centerline;
pub mod elements;
pub mod error;
pub mod loads;
pub mod relaxation;
pub mod section;

pub use boundary::{Boundary, Support};
pub use centerline::{frames_from_polyline, Centerline};
pub use elements::{Element, RodBeam, RodOptions};
pub use error::{Result, RodError};
pub use loads::{
    CoordinateSystem, Distribution, ExternalLoads, LoadDispatch, LoadKind, LoadSlot, VectorLoad,
};
pub use relaxation::{
    EnergyEvent, EnergySample, KdrConfig, KdrResults, KdrSolver, RelaxationDof,
    RelaxationStatus, Subsystem,
};
pub use section::{CrossSection, ElasticMaterial, RodStiffness};

pub use kdr_geometry::{Frame, TransportMethod};
