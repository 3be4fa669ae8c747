//! Elastic energies of a rod (diagnostics only).

use super::RodBeam;

impl RodBeam {
    /// Axial energy `½ ES Σ ε² l0`
    pub fn axial_energy(&self) -> f64 {
        let sum: f64 = self
            .strain
            .iter()
            .zip(&self.rest.lengths)
            .map(|(e, l0)| e * e * l0)
            .sum();
        0.5 * self.stiffness.es * sum
    }

    /// Bending energy `½ Σ (κ - κ0)ᵀ B (κ - κ0) ds`, each side of a node
    /// weighted by half of its adjacent edge
    pub fn bending_energy(&self) -> f64 {
        let (ei1, ei2) = (self.stiffness.ei1, self.stiffness.ei2);
        let density = |d: nalgebra::Vector2<f64>| ei1 * d.x * d.x + ei2 * d.y * d.y;

        let mut energy = 0.0;
        for j in 0..self.centerline.edge_count() {
            let (a, b) = self.centerline.edge_nodes(j);
            let half = 0.5 * self.centerline.lengths[j];
            energy += density(self.kappa_right[a] - self.rest.kappa_right[a]) * half;
            energy += density(self.kappa_left[b] - self.rest.kappa_left[b]) * half;
        }
        0.5 * energy
    }

    /// Twisting energy `½ GJ Σ (τ - τ0)² l`
    pub fn twisting_energy(&self) -> f64 {
        let sum: f64 = (0..self.twist_rate.len())
            .map(|j| {
                let d = self.twist_rate[j] - self.rest.twist_rate[j];
                d * d * self.centerline.lengths[j]
            })
            .sum();
        0.5 * self.stiffness.gj * sum
    }

    pub fn elastic_energy(&self) -> f64 {
        self.axial_energy() + self.bending_energy() + self.twisting_energy()
    }
}

#[cfg(test)]
mod tests {
    use super::super::{RodBeam, RodOptions};
    use crate::section::RodStiffness;
    use kdr_geometry::Frame;
    use nalgebra::{Point3, Vector3};

    fn stiffness() -> RodStiffness {
        RodStiffness::new(1.0e3, 10.0, 10.0, 8.0).unwrap()
    }

    fn straight(n: usize, spacing: f64) -> Vec<Frame> {
        (0..n)
            .map(|i| Frame::new(Point3::new(i as f64 * spacing, 0.0, 0.0), Vector3::y(), Vector3::z()))
            .collect()
    }

    #[test]
    fn unstrained_rod_has_no_energy() {
        let beam = RodBeam::from_configuration(0, &straight(5, 0.5), stiffness(), RodOptions::open()).unwrap();
        assert_eq!(beam.elastic_energy(), 0.0);
    }

    #[test]
    fn bending_energy_of_circular_arc() {
        let radius = 2.0;
        let sweep = 1.5;
        let n = 7;
        let arc: Vec<Frame> = (0..n)
            .map(|i| {
                let a = sweep * i as f64 / (n - 1) as f64;
                let origin = Point3::new(radius * a.cos(), radius * a.sin(), 0.0);
                let tangent = Vector3::new(-a.sin(), a.cos(), 0.0);
                Frame::from_normal_and_reference(origin, &tangent, &Vector3::z())
            })
            .collect();
        let length = radius * sweep;
        let rest = straight(n, length / (n - 1) as f64);
        let beam = RodBeam::new(0, &rest, &arc, stiffness(), RodOptions::open()).unwrap();

        let expected = 0.5 * 10.0 * length / (radius * radius);
        let energy = beam.bending_energy();
        println!("arc bending energy {energy:.6} (continuous {expected:.6})");
        assert!((energy - expected).abs() / expected < 0.01);
        assert!(beam.twisting_energy() < 1e-20);
    }

    #[test]
    fn twisting_energy_of_uniform_twist() {
        let rest = straight(3, 1.0);
        let mut initial = straight(3, 1.0);
        initial[1].rotate(0.1);
        initial[2].rotate(0.2);
        let beam = RodBeam::new(0, &rest, &initial, stiffness(), RodOptions::open()).unwrap();
        // ½ GJ τ² L with τ = 0.1 over a length of 2
        assert!((beam.twisting_energy() - 0.5 * 8.0 * 0.01 * 2.0).abs() < 1e-12);
    }
}
