//! Cross-section and material properties of a rod.
//!
//! The rod model only needs four stiffness products, gathered in
//! [`RodStiffness`]:
//!
//! - `ES`  axial stiffness
//! - `EI1` bending stiffness about the first material axis `d1`
//! - `EI2` bending stiffness about the second material axis `d2`
//! - `GJ`  torsional stiffness

use serde::{Deserialize, Serialize};

use crate::error::{Result, RodError};

/// Geometric properties of a rod cross-section.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CrossSection {
    /// Cross-sectional area
    pub area: f64,
    /// Second moment of area about the first material axis
    pub i1: f64,
    /// Second moment of area about the second material axis
    pub i2: f64,
    /// Torsional constant (J)
    pub torsion_constant: f64,
}

impl CrossSection {
    /// Create a circular cross-section
    ///
    /// # Arguments
    /// * `radius` - Radius of the circular cross-section
    ///
    /// # Example
    /// ```
    /// use kdr_solver::CrossSection;
    ///
    /// let section = CrossSection::circular(0.05);
    /// assert!((section.area - std::f64::consts::PI * 0.05_f64.powi(2)).abs() < 1e-10);
    /// ```
    pub fn circular(radius: f64) -> Self {
        let area = std::f64::consts::PI * radius.powi(2);
        let i = std::f64::consts::PI * radius.powi(4) / 4.0;
        Self {
            area,
            i1: i,
            i2: i,
            torsion_constant: 2.0 * i,
        }
    }

    /// Create a hollow circular (tube) cross-section
    pub fn tube(outer_radius: f64, thickness: f64) -> Self {
        let inner = (outer_radius - thickness).max(0.0);
        let area = std::f64::consts::PI * (outer_radius.powi(2) - inner.powi(2));
        let i = std::f64::consts::PI * (outer_radius.powi(4) - inner.powi(4)) / 4.0;
        Self {
            area,
            i1: i,
            i2: i,
            torsion_constant: 2.0 * i,
        }
    }

    /// Create a rectangular cross-section
    ///
    /// # Arguments
    /// * `width` - Extent along the first material axis `d1`
    /// * `height` - Extent along the second material axis `d2`
    pub fn rectangular(width: f64, height: f64) -> Self {
        let area = width * height;
        let i1 = width * height.powi(3) / 12.0;
        let i2 = height * width.powi(3) / 12.0;

        // Torsional constant for rectangle (approximate formula)
        let a = width.max(height);
        let b = width.min(height);
        let j = if a > 0.0 {
            (a * b.powi(3)) * (1.0 / 3.0 - 0.21 * (b / a) * (1.0 - b.powi(4) / (12.0 * a.powi(4))))
        } else {
            0.0
        };

        Self {
            area,
            i1,
            i2,
            torsion_constant: j,
        }
    }

    /// Create a custom cross-section with explicit properties
    pub fn custom(area: f64, i1: f64, i2: f64, torsion_constant: f64) -> Self {
        Self {
            area,
            i1,
            i2,
            torsion_constant,
        }
    }
}

/// Linear elastic isotropic material.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElasticMaterial {
    /// Young's modulus (E) [Pa]
    pub young_modulus: f64,
    /// Shear modulus (G) [Pa]
    pub shear_modulus: f64,
}

impl ElasticMaterial {
    pub fn new(young_modulus: f64, shear_modulus: f64) -> Self {
        Self {
            young_modulus,
            shear_modulus,
        }
    }

    /// Material from E and Poisson's ratio, `G = E / (2(1 + ν))`
    pub fn from_poisson(young_modulus: f64, poissons_ratio: f64) -> Self {
        Self {
            young_modulus,
            shear_modulus: young_modulus / (2.0 * (1.0 + poissons_ratio)),
        }
    }

    /// Structural steel (E = 200 GPa, ν = 0.3)
    pub fn steel() -> Self {
        Self::from_poisson(200e9, 0.3)
    }
}

/// Stiffness products used by the rod model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RodStiffness {
    /// Axial stiffness ES
    pub es: f64,
    /// Bending stiffness about d1
    pub ei1: f64,
    /// Bending stiffness about d2
    pub ei2: f64,
    /// Torsional stiffness GJ
    pub gj: f64,
}

impl RodStiffness {
    /// Explicit stiffness products. All values must be finite and
    /// non-negative.
    pub fn new(es: f64, ei1: f64, ei2: f64, gj: f64) -> Result<Self> {
        let stiffness = Self { es, ei1, ei2, gj };
        stiffness.validate()?;
        Ok(stiffness)
    }

    pub fn from_section(section: &CrossSection, material: &ElasticMaterial) -> Result<Self> {
        let e = material.young_modulus;
        let g = material.shear_modulus;
        Self::new(
            e * section.area,
            e * section.i1,
            e * section.i2,
            g * section.torsion_constant,
        )
    }

    fn validate(&self) -> Result<()> {
        for (name, value) in [("ES", self.es), ("EI1", self.ei1), ("EI2", self.ei2), ("GJ", self.gj)] {
            if !value.is_finite() || value < 0.0 {
                return Err(RodError::InvalidSection(format!("{name} = {value}")));
            }
        }
        Ok(())
    }

    /// Largest bending stiffness
    #[inline]
    pub fn max_bending(&self) -> f64 {
        self.ei1.max(self.ei2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circular_section() {
        let s = CrossSection::circular(0.05);
        let expected_i = std::f64::consts::PI * 0.05_f64.powi(4) / 4.0;
        assert!((s.i1 - expected_i).abs() < 1e-18);
        assert_eq!(s.i1, s.i2);
        assert!((s.torsion_constant - 2.0 * expected_i).abs() < 1e-18);
    }

    #[test]
    fn rectangular_section() {
        let s = CrossSection::rectangular(0.1, 0.2);
        assert!((s.area - 0.02).abs() < 1e-15);
        assert!((s.i1 - 0.1 * 0.008 / 12.0).abs() < 1e-15);
        assert!((s.i2 - 0.2 * 0.001 / 12.0).abs() < 1e-15);
        assert!(s.torsion_constant > 0.0);
        // J is below the polar moment for a rectangle
        assert!(s.torsion_constant < s.i1 + s.i2);
    }

    #[test]
    fn tube_without_thickness_limit() {
        let solid = CrossSection::circular(0.05);
        let tube = CrossSection::tube(0.05, 0.05);
        assert!((solid.area - tube.area).abs() < 1e-15);
        assert!((solid.i1 - tube.i1).abs() < 1e-18);
    }

    #[test]
    fn steel_shear_modulus() {
        let steel = ElasticMaterial::steel();
        assert!((steel.shear_modulus - 200e9 / 2.6).abs() < 1.0);
    }

    #[test]
    fn stiffness_from_section() {
        let s = CrossSection::circular(0.05);
        let k = RodStiffness::from_section(&s, &ElasticMaterial::steel()).unwrap();
        assert!((k.es - 200e9 * s.area).abs() < 1e-3);
        assert_eq!(k.max_bending(), k.ei1);
    }

    #[test]
    fn invalid_stiffness_rejected() {
        assert!(matches!(RodStiffness::new(-1.0, 1.0, 1.0, 1.0), Err(RodError::InvalidSection(_))));
        assert!(RodStiffness::new(1.0, f64::NAN, 1.0, 1.0).is_err());
        assert!(RodStiffness::new(0.0, 0.0, 0.0, 0.0).is_ok());
    }
}
