//! Kinetic Dynamic Relaxation driver.
//!
//! Finds the static equilibrium of a set of elements by following a
//! fictitious motion with unit time step and lumped masses, and removing all
//! kinetic energy each time it peaks (kinetic damping).
//!
//! Translations (`x`) and rotations about the tangents (`θ`) are relaxed as
//! two subsystems with independent masses, velocities and peak detection.
//! Each outer iteration advances the translations by one step, then the
//! rotations by `theta_steps_per_iteration` steps.
//!
//! # Cycle of one subsystem
//!
//! ```text
//! reset:   R = resultant(x), m = lumped mass, v = R / 2m, Ec = ½ Σ m v²
//! advance: x += v, R = resultant(x), v += R / m, Ec = ½ Σ m v²
//! peak:    Ec dropped below the previous sample
//!          q = (E2 - E1) / (E0 - 2 E1 + E2)
//!          v -= R / m, x -= q v, reset
//! ```
//!
//! Convergence is tested after every reset: both kinetic energies must be
//! below their thresholds.
//!
//! # Example
//!
//! ```no_run
//! use kdr_solver::{KdrConfig, KdrSolver, RodBeam, Support};
//!
//! # fn example(mut rods: Vec<RodBeam>) -> kdr_solver::Result<()> {
//! let mut supports = vec![Support::clamped(0, 0)];
//! let config = KdrConfig::default().with_max_iterations(50_000);
//! let mut solver = KdrSolver::new(&mut rods, &mut supports, config);
//!
//! let results = solver.solve()?;
//! println!("{:?} after {} iterations", results.status, results.iterations);
//! # Ok(())
//! # }
//! ```

use std::ops::{Add, Mul};

use nalgebra::Vector3;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::boundary::{Boundary, Support};
use crate::elements::Element;
use crate::error::Result;

/// Relaxation settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KdrConfig {
    /// Outer iterations before giving up
    pub max_iterations: usize,
    /// Kinetic energy below which translations are at rest
    pub energy_threshold_x: f64,
    /// Kinetic energy below which rotations are at rest
    pub energy_threshold_theta: f64,
    /// Rotation steps per translation step
    pub theta_steps_per_iteration: usize,
    /// Factor applied to every lumped mass (> 1 slows the motion down)
    pub mass_amplification: f64,
    /// Process elements on the rayon thread pool
    pub parallel: bool,
    /// Keep every energy sample in the results
    pub record_history: bool,
}

impl Default for KdrConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100_000,
            energy_threshold_x: 1e-12,
            energy_threshold_theta: 1e-12,
            theta_steps_per_iteration: 1,
            mass_amplification: 1.0,
            parallel: true,
            record_history: false,
        }
    }
}

impl KdrConfig {
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Same threshold for both subsystems
    pub fn with_energy_threshold(mut self, threshold: f64) -> Self {
        self.energy_threshold_x = threshold;
        self.energy_threshold_theta = threshold;
        self
    }

    pub fn with_energy_thresholds(mut self, x: f64, theta: f64) -> Self {
        self.energy_threshold_x = x;
        self.energy_threshold_theta = theta;
        self
    }

    pub fn with_theta_steps(mut self, steps: usize) -> Self {
        self.theta_steps_per_iteration = steps;
        self
    }

    pub fn with_mass_amplification(mut self, factor: f64) -> Self {
        self.mass_amplification = factor;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_history(mut self, record: bool) -> Self {
        self.record_history = record;
        self
    }
}

/// Terminal state of a relaxation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelaxationStatus {
    /// Both kinetic energies fell below their thresholds after a reset
    Converged,
    /// Iteration budget exhausted
    MaxIterationReached,
}

/// Relaxed degrees of freedom
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Subsystem {
    Translation,
    Rotation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnergyEvent {
    /// Velocities restarted from rest
    Reset,
    /// One time step taken
    Advance,
    /// Interpolated kinetic energy peak
    Peak,
}

/// One kinetic energy sample of the history
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnergySample {
    pub iteration: usize,
    pub subsystem: Subsystem,
    pub event: EnergyEvent,
    pub energy: f64,
}

/// Outcome of [`KdrSolver::solve`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KdrResults {
    pub status: RelaxationStatus,
    /// Outer iterations performed
    pub iterations: usize,
    pub translation_peaks: usize,
    pub rotation_peaks: usize,
    /// Final translational kinetic energy
    pub kinetic_energy_x: f64,
    /// Final rotational kinetic energy
    pub kinetic_energy_theta: f64,
    /// Energy samples, when recording was enabled
    pub history: Vec<EnergySample>,
}

impl KdrResults {
    pub fn is_converged(&self) -> bool {
        self.status == RelaxationStatus::Converged
    }
}

/// Value of one relaxed degree of freedom (vector for translations, scalar
/// for rotations).
pub trait RelaxationDof:
    Copy + Send + Sync + Add<Output = Self> + Mul<f64, Output = Self>
{
    fn zero() -> Self;

    fn magnitude_squared(&self) -> f64;
}

impl RelaxationDof for Vector3<f64> {
    fn zero() -> Self {
        Vector3::zeros()
    }

    fn magnitude_squared(&self) -> f64 {
        self.norm_squared()
    }
}

impl RelaxationDof for f64 {
    fn zero() -> Self {
        0.0
    }

    fn magnitude_squared(&self) -> f64 {
        self * self
    }
}

/// Binds a subsystem to the element and boundary hooks it drives.
trait DofKind<E: Element> {
    type Value: RelaxationDof;

    const SUBSYSTEM: Subsystem;

    fn calculate(element: &mut E);

    fn resultant(element: &E) -> &[Self::Value];

    fn lumped_mass(element: &E, masses: &mut [f64]);

    fn displace(element: &mut E, step: &[Self::Value]);

    fn calculate_reactions<B: Boundary<E>>(boundary: &mut B, elements: &[E]);

    fn transfer_reactions<B: Boundary<E>>(boundary: &B, elements: &mut [E]);
}

enum Translation {}

enum Rotation {}

impl<E: Element> DofKind<E> for Translation {
    type Value = Vector3<f64>;

    const SUBSYSTEM: Subsystem = Subsystem::Translation;

    fn calculate(element: &mut E) {
        element.calculate_x();
    }

    fn resultant(element: &E) -> &[Vector3<f64>] {
        element.resultant_x()
    }

    fn lumped_mass(element: &E, masses: &mut [f64]) {
        element.lumped_mass_x(masses);
    }

    fn displace(element: &mut E, step: &[Vector3<f64>]) {
        element.move_x(step);
    }

    fn calculate_reactions<B: Boundary<E>>(boundary: &mut B, elements: &[E]) {
        boundary.calculate_x(elements);
    }

    fn transfer_reactions<B: Boundary<E>>(boundary: &B, elements: &mut [E]) {
        boundary.transfer_reaction_x(elements);
    }
}

impl<E: Element> DofKind<E> for Rotation {
    type Value = f64;

    const SUBSYSTEM: Subsystem = Subsystem::Rotation;

    fn calculate(element: &mut E) {
        element.calculate_theta();
    }

    fn resultant(element: &E) -> &[f64] {
        element.resultant_theta()
    }

    fn lumped_mass(element: &E, masses: &mut [f64]) {
        element.lumped_mass_theta(masses);
    }

    fn displace(element: &mut E, step: &[f64]) {
        element.move_theta(step);
    }

    fn calculate_reactions<B: Boundary<E>>(boundary: &mut B, elements: &[E]) {
        boundary.calculate_theta(elements);
    }

    fn transfer_reactions<B: Boundary<E>>(boundary: &B, elements: &mut [E]) {
        boundary.transfer_reaction_theta(elements);
    }
}

/// Velocities, masses and energy samples of one subsystem.
struct RelaxationState<T> {
    velocity: Vec<Vec<T>>,
    mass: Vec<Vec<f64>>,
    /// Last three kinetic energies, oldest first
    samples: [f64; 3],
    energy: f64,
    peaks: usize,
}

impl<T: RelaxationDof> RelaxationState<T> {
    fn new<E: Element>(elements: &[E]) -> Self {
        Self {
            velocity: elements.iter().map(|e| vec![T::zero(); e.node_count()]).collect(),
            mass: elements.iter().map(|e| vec![0.0; e.node_count()]).collect(),
            samples: [0.0; 3],
            energy: 0.0,
            peaks: 0,
        }
    }

    fn kinetic_energy(&self, parallel: bool) -> f64 {
        let element_energy = |(velocity, mass): (&Vec<T>, &Vec<f64>)| -> f64 {
            velocity
                .iter()
                .zip(mass)
                .map(|(v, m)| m * v.magnitude_squared())
                .sum()
        };
        let sum: f64 = if parallel {
            self.velocity.par_iter().zip(self.mass.par_iter()).map(element_energy).sum()
        } else {
            self.velocity.iter().zip(&self.mass).map(element_energy).sum()
        };
        0.5 * sum
    }

    fn scaled_velocity(&self, factor: f64) -> Vec<Vec<T>> {
        self.velocity
            .iter()
            .map(|v| v.iter().map(|x| *x * factor).collect())
            .collect()
    }
}

/// Kinetic Dynamic Relaxation solver over a set of elements and their
/// boundary collaborators.
pub struct KdrSolver<'a, E: Element, B: Boundary<E> = Support> {
    elements: &'a mut [E],
    boundaries: &'a mut [B],
    config: KdrConfig,
    history: Vec<EnergySample>,
}

impl<'a, E: Element, B: Boundary<E>> KdrSolver<'a, E, B> {
    /// Create a solver
    ///
    /// # Arguments
    /// * `elements` - Elements to relax, in their initial configuration
    /// * `boundaries` - Supports and joints acting on the elements
    /// * `config` - Relaxation settings
    pub fn new(elements: &'a mut [E], boundaries: &'a mut [B], config: KdrConfig) -> Self {
        Self {
            elements,
            boundaries,
            config,
            history: Vec::new(),
        }
    }

    pub fn config(&self) -> &KdrConfig {
        &self.config
    }

    pub fn elements(&self) -> &[E] {
        &*self.elements
    }

    pub fn boundaries(&self) -> &[B] {
        &*self.boundaries
    }

    /// Relax the structure until both subsystems are at rest or the
    /// iteration budget is spent.
    ///
    /// # Errors
    /// Returns an error only if a boundary fails to initialise. Running out
    /// of iterations is reported through [`KdrResults::status`].
    pub fn solve(&mut self) -> Result<KdrResults> {
        for boundary in self.boundaries.iter_mut() {
            boundary.init(&mut *self.elements)?;
        }
        self.history.clear();

        let mut x = RelaxationState::<Vector3<f64>>::new(&*self.elements);
        let mut theta = RelaxationState::<f64>::new(&*self.elements);

        self.reset::<Translation>(&mut x, 0);
        self.reset::<Rotation>(&mut theta, 0);
        if self.converged(&x, &theta) {
            return Ok(self.finish(RelaxationStatus::Converged, 0, &x, &theta));
        }

        for iteration in 1..=self.config.max_iterations {
            if self.advance::<Translation>(&mut x, iteration) && self.converged(&x, &theta) {
                return Ok(self.finish(RelaxationStatus::Converged, iteration, &x, &theta));
            }
            for _ in 0..self.config.theta_steps_per_iteration {
                if self.advance::<Rotation>(&mut theta, iteration) && self.converged(&x, &theta) {
                    return Ok(self.finish(RelaxationStatus::Converged, iteration, &x, &theta));
                }
            }
            trace!(
                iteration,
                energy_x = x.energy,
                energy_theta = theta.energy,
                "relaxation step"
            );
        }

        warn!(
            max_iterations = self.config.max_iterations,
            energy_x = x.energy,
            energy_theta = theta.energy,
            "relaxation stopped before reaching equilibrium"
        );
        Ok(self.finish(
            RelaxationStatus::MaxIterationReached,
            self.config.max_iterations,
            &x,
            &theta,
        ))
    }

    fn parallel(&self) -> bool {
        self.config.parallel && self.elements.len() > 1
    }

    fn converged(&self, x: &RelaxationState<Vector3<f64>>, theta: &RelaxationState<f64>) -> bool {
        x.energy < self.config.energy_threshold_x && theta.energy < self.config.energy_threshold_theta
    }

    fn finish(
        &mut self,
        status: RelaxationStatus,
        iterations: usize,
        x: &RelaxationState<Vector3<f64>>,
        theta: &RelaxationState<f64>,
    ) -> KdrResults {
        if status == RelaxationStatus::Converged {
            info!(
                iterations,
                translation_peaks = x.peaks,
                rotation_peaks = theta.peaks,
                "relaxation converged"
            );
        }
        KdrResults {
            status,
            iterations,
            translation_peaks: x.peaks,
            rotation_peaks: theta.peaks,
            kinetic_energy_x: x.energy,
            kinetic_energy_theta: theta.energy,
            history: std::mem::take(&mut self.history),
        }
    }

    fn record(&mut self, iteration: usize, subsystem: Subsystem, event: EnergyEvent, energy: f64) {
        if self.config.record_history {
            self.history.push(EnergySample {
                iteration,
                subsystem,
                event,
                energy,
            });
        }
    }

    /// Element resultants, then boundary reactions computed from them and
    /// written back.
    fn recompute<S: DofKind<E>>(&mut self) {
        if self.parallel() {
            self.elements.par_iter_mut().for_each(|e| S::calculate(e));
        } else {
            self.elements.iter_mut().for_each(|e| S::calculate(e));
        }
        for boundary in self.boundaries.iter_mut() {
            S::calculate_reactions(boundary, &*self.elements);
        }
        for boundary in self.boundaries.iter() {
            S::transfer_reactions(boundary, &mut *self.elements);
        }
    }

    fn displace<S: DofKind<E>>(&mut self, steps: &[Vec<S::Value>]) {
        if self.parallel() {
            self.elements
                .par_iter_mut()
                .zip(steps.par_iter())
                .for_each(|(e, step)| S::displace(e, step));
        } else {
            for (e, step) in self.elements.iter_mut().zip(steps) {
                S::displace(e, step);
            }
        }
    }

    /// `v += factor · R / m`; massless nodes keep their velocity
    fn accelerate<S: DofKind<E>>(&self, state: &mut RelaxationState<S::Value>, factor: f64) {
        let elements = &*self.elements;
        for ((element, velocity), mass) in elements.iter().zip(&mut state.velocity).zip(&state.mass) {
            for ((v, r), m) in velocity.iter_mut().zip(S::resultant(element)).zip(mass) {
                if *m > 0.0 {
                    *v = *v + *r * (factor / m);
                }
            }
        }
    }

    fn reset<S: DofKind<E>>(&mut self, state: &mut RelaxationState<S::Value>, iteration: usize) {
        self.recompute::<S>();

        let amplification = self.config.mass_amplification;
        let elements = &*self.elements;
        let fill_mass = |(element, mass): (&E, &mut Vec<f64>)| {
            S::lumped_mass(element, mass);
            mass.iter_mut().for_each(|m| *m *= amplification);
        };
        if self.parallel() {
            elements.par_iter().zip(state.mass.par_iter_mut()).for_each(fill_mass);
        } else {
            elements.iter().zip(state.mass.iter_mut()).for_each(fill_mass);
        }

        for velocity in state.velocity.iter_mut() {
            velocity.fill(S::Value::zero());
        }
        self.accelerate::<S>(state, 0.5);

        state.energy = state.kinetic_energy(self.parallel());
        state.samples = [state.energy; 3];
        self.record(iteration, S::SUBSYSTEM, EnergyEvent::Reset, state.energy);
    }

    /// One time step; returns `true` when a peak was passed and the
    /// subsystem was reset.
    fn advance<S: DofKind<E>>(&mut self, state: &mut RelaxationState<S::Value>, iteration: usize) -> bool {
        self.displace::<S>(&state.velocity);

        self.recompute::<S>();
        self.accelerate::<S>(state, 1.0);
        let energy = state.kinetic_energy(self.parallel());

        // a motionless subsystem has no peak
        if energy >= state.samples[2] {
            state.samples = [state.samples[1], state.samples[2], energy];
            state.energy = energy;
            self.record(iteration, S::SUBSYSTEM, EnergyEvent::Advance, energy);
            return false;
        }

        let [_, e0, e1] = state.samples;
        let e2 = energy;
        let curvature = e0 - 2.0 * e1 + e2;
        let (q, peak) = if curvature < 0.0 {
            let q = ((e2 - e1) / curvature).clamp(0.0, 1.0);
            (q, e1 - (e2 - e0) * (e2 - e0) / (8.0 * curvature))
        } else {
            (0.0, e1)
        };

        // back to the velocity of the last move, then back to the peak
        self.accelerate::<S>(state, -1.0);
        if q > 0.0 {
            let back = state.scaled_velocity(-q);
            self.displace::<S>(&back);
        }

        state.peaks += 1;
        debug!(
            subsystem = ?S::SUBSYSTEM,
            iteration,
            peak,
            backstep = q,
            "kinetic energy peak"
        );
        self.record(iteration, S::SUBSYSTEM, EnergyEvent::Peak, peak);
        self.reset::<S>(state, iteration);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{RodBeam, RodOptions};
    use crate::loads::{CoordinateSystem, VectorLoad};
    use crate::section::RodStiffness;
    use kdr_geometry::Frame;
    use nalgebra::Point3;

    fn straight_rod(n: usize) -> RodBeam {
        let frames: Vec<Frame> = (0..n)
            .map(|i| Frame::new(Point3::new(i as f64, 0.0, 0.0), Vector3::y(), Vector3::z()))
            .collect();
        let stiffness = RodStiffness::new(1.0e3, 10.0, 10.0, 8.0).unwrap();
        RodBeam::from_configuration(0, &frames, stiffness, RodOptions::open()).unwrap()
    }

    #[test]
    fn test_config_default() {
        let config = KdrConfig::default();
        assert_eq!(config.max_iterations, 100_000);
        assert_eq!(config.theta_steps_per_iteration, 1);
        assert_eq!(config.mass_amplification, 1.0);
        assert!(!config.record_history);
    }

    #[test]
    fn test_config_builder() {
        let config = KdrConfig::default()
            .with_max_iterations(10)
            .with_energy_thresholds(1e-6, 1e-8)
            .with_theta_steps(3)
            .with_parallel(false)
            .with_history(true);
        assert_eq!(config.max_iterations, 10);
        assert_eq!(config.energy_threshold_x, 1e-6);
        assert_eq!(config.energy_threshold_theta, 1e-8);
        assert_eq!(config.theta_steps_per_iteration, 3);
        assert!(!config.parallel && config.record_history);
    }

    #[test]
    fn test_unloaded_rod_converges_at_first_reset() {
        let mut rods = vec![straight_rod(4)];
        let mut supports: Vec<Support> = Vec::new();
        let config = KdrConfig::default().with_history(true);
        let results = KdrSolver::new(&mut rods, &mut supports, config).solve().unwrap();

        assert_eq!(results.status, RelaxationStatus::Converged);
        assert_eq!(results.iterations, 0);
        assert_eq!(results.kinetic_energy_x, 0.0);
        assert_eq!(results.history.len(), 2);
        assert!(results.history.iter().all(|s| s.event == EnergyEvent::Reset));
    }

    #[test]
    fn test_exhaustion_is_reported() {
        let mut rods = vec![straight_rod(3)];
        let load = VectorLoad::point_force(2, Vector3::new(0.0, -1.0, 0.0), CoordinateSystem::Global).unwrap();
        rods[0].set_loads(&[load]).unwrap();
        let mut supports = vec![Support::clamped(0, 0)];
        let config = KdrConfig::default().with_max_iterations(3).with_parallel(false);

        let results = KdrSolver::new(&mut rods, &mut supports, config).solve().unwrap();
        assert_eq!(results.status, RelaxationStatus::MaxIterationReached);
        assert_eq!(results.iterations, 3);
        assert!(!results.is_converged());
    }

    #[test]
    fn test_bad_support_is_an_error() {
        let mut rods = vec![straight_rod(3)];
        let mut supports = vec![Support::pinned(0, 7)];
        let result = KdrSolver::new(&mut rods, &mut supports, KdrConfig::default()).solve();
        assert!(result.is_err());
    }

    #[test]
    fn test_advance_energies_never_decrease_between_peaks() {
        let mut rods = vec![straight_rod(4)];
        let load = VectorLoad::point_force(3, Vector3::new(0.0, -0.5, 0.0), CoordinateSystem::Global).unwrap();
        rods[0].set_loads(&[load]).unwrap();
        let mut supports = vec![Support::clamped(0, 0)];
        let config = KdrConfig::default()
            .with_max_iterations(2_000)
            .with_parallel(false)
            .with_history(true);

        let results = KdrSolver::new(&mut rods, &mut supports, config).solve().unwrap();
        assert!(results.translation_peaks > 0);

        let translation: Vec<_> = results
            .history
            .iter()
            .filter(|s| s.subsystem == Subsystem::Translation)
            .collect();
        for pair in translation.windows(2) {
            if pair[1].event == EnergyEvent::Advance {
                assert!(pair[1].energy >= pair[0].energy);
            }
            if pair[0].event == EnergyEvent::Peak {
                assert_eq!(pair[1].event, EnergyEvent::Reset);
            }
        }
    }
}
