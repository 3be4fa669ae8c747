/// Integration tests for the relaxation driver
/// Validates equilibrium states against analytical solutions for classical
/// rod problems

use kdr_solver::{
    frames_from_polyline, Boundary, CoordinateSystem, CrossSection, ElasticMaterial, EnergyEvent,
    Frame, KdrConfig, KdrSolver, RelaxationStatus, RodBeam, RodOptions, RodStiffness, Subsystem,
    Support, VectorLoad,
};
use nalgebra::{Point3, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Straight rod along x, first material axis along y
fn straight_frames(n: usize, length: f64) -> Vec<Frame> {
    let spacing = length / (n - 1) as f64;
    (0..n)
        .map(|i| Frame::new(Point3::new(i as f64 * spacing, 0.0, 0.0), Vector3::y(), Vector3::z()))
        .collect()
}

fn steel_rod(radius: f64) -> RodStiffness {
    RodStiffness::from_section(&CrossSection::circular(radius), &ElasticMaterial::from_poisson(200e9, 0.3))
        .unwrap()
}

#[test]
fn test_rest_configuration_converges_immediately() {
    init_tracing();
    let points: Vec<Point3<f64>> = (0..8)
        .map(|i| {
            let a = 0.5 * i as f64;
            Point3::new(a.cos(), a.sin(), 0.2 * a)
        })
        .collect();
    let frames = frames_from_polyline(&points, &Vector3::z(), false);
    let stiffness = RodStiffness::new(1.0e4, 50.0, 80.0, 40.0).unwrap();
    let mut rods = vec![RodBeam::from_configuration(0, &frames, stiffness, RodOptions::open()).unwrap()];
    let mut supports = vec![Support::pinned(0, 0), Support::pinned(0, 7)];

    let config = KdrConfig::default().with_parallel(false);
    let results = KdrSolver::new(&mut rods, &mut supports, config).solve().unwrap();

    assert_eq!(results.status, RelaxationStatus::Converged);
    assert_eq!(results.iterations, 0);
    assert_eq!(results.translation_peaks, 0);
    assert_eq!(results.rotation_peaks, 0);
}

#[test]
fn test_straight_pinned_rod_stays_unstressed() {
    init_tracing();
    let frames = straight_frames(5, 2.0);
    let mut rods = vec![RodBeam::from_configuration(0, &frames, steel_rod(0.01), RodOptions::open()).unwrap()];
    let mut supports = vec![Support::pinned(0, 0), Support::pinned(0, 4)];

    let results = KdrSolver::new(&mut rods, &mut supports, KdrConfig::default())
        .solve()
        .unwrap();
    assert!(results.is_converged());

    let rod = &rods[0];
    for i in 0..rod.curvature_left().len() {
        assert!(rod.curvature_left()[i].norm() < 1e-12);
        assert!(rod.curvature_right()[i].norm() < 1e-12);
        assert!(rod.bending_moment_left()[i].norm() < 1e-6);
        assert!(rod.bending_moment_right()[i].norm() < 1e-6);
    }
    assert!(rod.torsion().iter().all(|q| q.abs() < 1e-6));
    assert!(rod.axial().iter().all(|n| n.abs() < 1e-3));
}

#[test]
fn test_cantilever_tip_deflection() {
    // Cantilever with end load
    //
    // Clamped at x = 0, free at x = L, load P at the tip in -y
    //
    // Analytical solution:
    // δ = PL³/(3EI), reaction force P, reaction moment PL
    init_tracing();

    let length: f64 = 1.0;
    let radius: f64 = 0.05;
    let load: f64 = 1000.0;
    let inputs = 6;

    let stiffness = steel_rod(radius);
    let analytical = load * length.powi(3) / (3.0 * stiffness.ei1);

    let frames = straight_frames(inputs, length);
    let mut rods = vec![RodBeam::from_configuration(0, &frames, stiffness, RodOptions::open()).unwrap()];
    let tip = VectorLoad::point_force(inputs - 1, Vector3::new(0.0, -load, 0.0), CoordinateSystem::Global)
        .unwrap();
    rods[0].set_loads(&[tip]).unwrap();
    let mut supports = vec![Support::clamped(0, 0)];

    let config = KdrConfig::default()
        .with_max_iterations(200_000)
        .with_energy_threshold(1e-12)
        .with_parallel(false);
    let results = KdrSolver::new(&mut rods, &mut supports, config).solve().unwrap();

    let handles = rods[0].handle_positions();
    let deflection = -handles[inputs - 1].y;
    let error = (deflection - analytical).abs() / analytical;

    println!("\n=== Cantilever Tip Load ===");
    println!("Status: {:?} after {} iterations", results.status, results.iterations);
    println!("Peaks: {} (x), {} (θ)", results.translation_peaks, results.rotation_peaks);
    println!("EI: {:.6e} N·m²", stiffness.ei1);
    println!("Analytical deflection: {:.6e} m", analytical);
    println!("Relaxed deflection:    {:.6e} m", deflection);
    println!("Error: {:.2}%", error * 100.0);

    assert!(error < 0.05, "Tip deflection error too large: {:.2}%", error * 100.0);

    let reaction = supports[0].reaction_force();
    println!("Reaction force: {:?}", reaction);
    assert!((reaction.y - load).abs() / load < 0.02);
    assert!(reaction.x.abs() < 0.02 * load && reaction.z.abs() < 0.02 * load);

    let moment = supports[0].reaction_bending().norm();
    println!("Reaction moment: {:.3} N·m (PL = {:.3})", moment, load * length);
    assert!((moment - load * length).abs() / (load * length) < 0.1);
}

#[test]
fn test_energy_history_between_peaks() {
    init_tracing();
    let frames = straight_frames(4, 3.0);
    let stiffness = RodStiffness::new(1.0e3, 10.0, 10.0, 8.0).unwrap();
    let mut rods = vec![RodBeam::from_configuration(0, &frames, stiffness, RodOptions::open()).unwrap()];
    let load = VectorLoad::point_force(3, Vector3::new(0.0, 0.0, -0.2), CoordinateSystem::Global).unwrap();
    rods[0].set_loads(&[load]).unwrap();
    let mut supports = vec![Support::clamped(0, 0)];

    let config = KdrConfig::default()
        .with_max_iterations(20_000)
        .with_parallel(false)
        .with_history(true);
    let results = KdrSolver::new(&mut rods, &mut supports, config).solve().unwrap();
    assert!(results.translation_peaks > 0);

    let samples: Vec<_> = results
        .history
        .iter()
        .filter(|s| s.subsystem == Subsystem::Translation)
        .collect();
    assert_eq!(samples[0].event, EnergyEvent::Reset);

    // energy grows from every reset up to the next peak
    for pair in samples.windows(2) {
        match pair[1].event {
            EnergyEvent::Advance => assert!(pair[1].energy >= pair[0].energy),
            EnergyEvent::Reset => assert_eq!(pair[0].event, EnergyEvent::Peak),
            EnergyEvent::Peak => assert!(pair[0].event != EnergyEvent::Peak),
        }
    }

    // the first restart begins well below the peak that triggered it
    let first_peak = samples
        .iter()
        .position(|s| s.event == EnergyEvent::Peak)
        .unwrap();
    assert!(samples[first_peak + 1].energy <= samples[first_peak].energy);
}

#[test]
fn test_random_straight_rods_stay_unstressed() {
    init_tracing();
    let mut rng = StdRng::seed_from_u64(0x5eed_0001);

    for case in 0..20 {
        let direction = loop {
            let v = Vector3::new(
                rng.random_range(-1.0..1.0),
                rng.random_range(-1.0..1.0),
                rng.random_range(-1.0..1.0),
            );
            if let Some(unit) = v.try_normalize(0.1) {
                break unit;
            }
        };
        let origin = Point3::new(
            rng.random_range(-5.0..5.0),
            rng.random_range(-5.0..5.0),
            rng.random_range(-5.0..5.0),
        );
        let spacing: f64 = rng.random_range(0.1..2.0);
        let inputs: usize = rng.random_range(3..8);
        let roll: f64 = rng.random_range(-PI..PI);

        let frames: Vec<Frame> = (0..inputs)
            .map(|i| {
                let mut frame = Frame::from_normal(origin + direction * (i as f64 * spacing), &direction);
                frame.rotate(roll);
                frame
            })
            .collect();
        let stiffness = RodStiffness::new(1.0e3, 10.0, 20.0, 8.0).unwrap();
        let mut rods = vec![RodBeam::from_configuration(0, &frames, stiffness, RodOptions::open()).unwrap()];
        let mut supports = vec![Support::pinned(0, 0), Support::pinned(0, inputs - 1)];

        let config = KdrConfig::default().with_parallel(false);
        let results = KdrSolver::new(&mut rods, &mut supports, config).solve().unwrap();
        assert_eq!(results.status, RelaxationStatus::Converged, "case {case}");
        assert_eq!(results.iterations, 0, "case {case}");

        let rod = &rods[0];
        for i in 0..rod.curvature_left().len() {
            assert!(rod.curvature_left()[i].norm() < 1e-9, "case {case}");
            assert!(rod.curvature_right()[i].norm() < 1e-9, "case {case}");
            assert!(rod.bending_moment_left()[i].norm() < 1e-6, "case {case}");
            assert!(rod.bending_moment_right()[i].norm() < 1e-6, "case {case}");
        }
        assert!(rod.torsion().iter().all(|q| q.abs() < 1e-6), "case {case}");
        assert!(rod.axial().iter().all(|n| n.abs() < 1e-6), "case {case}");
    }
}

#[test]
fn test_rotation_history_between_peaks() {
    init_tracing();
    let frames = straight_frames(4, 3.0);
    let stiffness = RodStiffness::new(1.0e3, 10.0, 10.0, 8.0).unwrap();
    let mut rods = vec![RodBeam::from_configuration(0, &frames, stiffness, RodOptions::open()).unwrap()];
    // material z is the tangent: a pure tip torque
    let torque = VectorLoad::point_moment(3, Vector3::new(0.0, 0.0, 0.05), CoordinateSystem::Material).unwrap();
    rods[0].set_loads(&[torque]).unwrap();
    let mut supports = vec![Support::clamped(0, 0)];

    let config = KdrConfig::default()
        .with_max_iterations(20_000)
        .with_parallel(false)
        .with_history(true);
    let results = KdrSolver::new(&mut rods, &mut supports, config).solve().unwrap();
    assert!(results.rotation_peaks > 0);

    let samples: Vec<_> = results
        .history
        .iter()
        .filter(|s| s.subsystem == Subsystem::Rotation)
        .collect();
    assert_eq!(samples[0].event, EnergyEvent::Reset);

    for pair in samples.windows(2) {
        match pair[1].event {
            EnergyEvent::Advance => assert!(pair[1].energy >= pair[0].energy),
            EnergyEvent::Reset => assert_eq!(pair[0].event, EnergyEvent::Peak),
            EnergyEvent::Peak => assert!(pair[0].event != EnergyEvent::Peak),
        }
    }

    let first_peak = samples
        .iter()
        .position(|s| s.event == EnergyEvent::Peak)
        .unwrap();
    assert!(samples[first_peak + 1].energy <= samples[first_peak].energy);
}

#[test]
fn test_distributed_torque_twist() {
    // Clamped shaft under uniform torque per length m
    //
    // Analytical tip twist: φ = mL²/(2GJ)
    init_tracing();
    let length: f64 = 2.0;
    let gj: f64 = 8.0;
    let m: f64 = 0.02;
    let analytical = m * length * length / (2.0 * gj);

    let frames = straight_frames(3, length);
    let stiffness = RodStiffness::new(1.0e3, 10.0, 10.0, gj).unwrap();
    let mut rods = vec![RodBeam::from_configuration(0, &frames, stiffness, RodOptions::open()).unwrap()];
    let loads: Vec<VectorLoad> = (0..2)
        .map(|edge| VectorLoad::distributed_moment(edge, Vector3::new(m, 0.0, 0.0), CoordinateSystem::Global).unwrap())
        .collect();
    rods[0].set_loads(&loads).unwrap();
    let mut supports = vec![Support::clamped(0, 0)];

    let config = KdrConfig::default()
        .with_max_iterations(200_000)
        .with_energy_threshold(1e-16)
        .with_parallel(false);
    let results = KdrSolver::new(&mut rods, &mut supports, config).solve().unwrap();

    let rod = &rods[0];
    let twist: f64 = rod
        .twist_rate()
        .iter()
        .zip(rod.lengths())
        .map(|(tau, l)| tau * l)
        .sum();
    let error = (twist.abs() - analytical).abs() / analytical;

    println!("\n=== Distributed Torque ===");
    println!("Status: {:?} after {} iterations", results.status, results.iterations);
    println!("Analytical twist: {:.6e} rad", analytical);
    println!("Relaxed twist:    {:.6e} rad", twist.abs());

    assert!(error < 0.01, "Tip twist error too large: {:.2}%", error * 100.0);
    assert!((supports[0].reaction_torque().abs() - m * length).abs() / (m * length) < 0.02);
}

#[test]
fn test_parallel_matches_serial() {
    init_tracing();
    let stiffness = RodStiffness::new(1.0e3, 10.0, 10.0, 8.0).unwrap();
    let tips = [
        Vector3::new(0.0, -0.05, 0.0),
        Vector3::new(0.0, 0.0, 0.08),
        Vector3::new(0.0, 0.03, -0.04),
    ];
    let mut rods: Vec<RodBeam> = tips
        .iter()
        .enumerate()
        .map(|(k, tip)| {
            let mut rod = RodBeam::from_configuration(k, &straight_frames(4, 3.0), stiffness, RodOptions::open()).unwrap();
            let load = VectorLoad::point_force(3, *tip, CoordinateSystem::Global).unwrap();
            rod.set_loads(&[load]).unwrap();
            rod
        })
        .collect();
    let mut supports: Vec<Support> = (0..tips.len()).map(|k| Support::clamped(k, 0)).collect();

    let mut serial_rods = rods.clone();
    let mut serial_supports = supports.clone();

    let config = KdrConfig::default()
        .with_max_iterations(200_000)
        .with_energy_threshold(1e-14);
    let parallel = KdrSolver::new(&mut rods, &mut supports, config.with_parallel(true))
        .solve()
        .unwrap();
    let serial = KdrSolver::new(&mut serial_rods, &mut serial_supports, config.with_parallel(false))
        .solve()
        .unwrap();

    assert_eq!(parallel.status, serial.status);
    for (a, b) in rods.iter().zip(&serial_rods) {
        for (p, q) in a.handle_positions().iter().zip(b.handle_positions()) {
            assert!((p - q).norm() < 1e-6, "parallel {p:?} serial {q:?}");
        }
    }
    for (a, b) in supports.iter().zip(&serial_supports) {
        assert!((a.reaction_force() - b.reaction_force()).norm() < 1e-6);
    }
}

#[test]
fn test_boxed_boundaries_share_one_solver() {
    let frames = straight_frames(3, 1.0);
    let stiffness = RodStiffness::new(1.0e3, 10.0, 10.0, 8.0).unwrap();
    let mut rods = vec![RodBeam::from_configuration(0, &frames, stiffness, RodOptions::open()).unwrap()];
    let mut boundaries: Vec<Box<dyn Boundary<RodBeam>>> = vec![
        Box::new(Support::pinned(0, 0)),
        Box::new(Support::fixed_rotation(0, 2)),
    ];
    let results = KdrSolver::new(&mut rods, &mut boundaries, KdrConfig::default())
        .solve()
        .unwrap();
    assert!(results.is_converged());
}

#[test]
fn test_config_round_trip() {
    let config = KdrConfig::default()
        .with_max_iterations(1234)
        .with_energy_thresholds(1e-9, 1e-10)
        .with_mass_amplification(2.5)
        .with_history(true);
    let json = serde_json::to_string(&config).unwrap();
    let back: KdrConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, config);

    // missing fields fall back to defaults
    let partial: KdrConfig = serde_json::from_str(r#"{"max_iterations": 10}"#).unwrap();
    assert_eq!(partial.max_iterations, 10);
    assert_eq!(partial.energy_threshold_x, KdrConfig::default().energy_threshold_x);
}
