use qreg::prelude::*;

fn bell(sim: &mut Simulator) -> SimResult<Register<f64>> {
    let mut reg = sim.register(2, 0)?;
    sim.apply(&mut reg, &Gate::Hadamard(0))?;
    sim.apply(
        &mut reg,
        &Gate::Cnot {
            control: 0,
            target: 1,
        },
    )?;
    Ok(reg)
}

#[test]
fn test_bell_state() -> SimResult<()> {
    let mut sim = Simulator::new(SimConfig::default().with_seed(2));
    sim.set_error_hook(|_| {});
    let reg = bell(&mut sim)?;
    let mut states = reg.states().to_vec();
    states.sort_unstable();
    assert_eq!(states, vec![0b00, 0b11]);
    let half = 0.5f64.sqrt();
    for a in reg.amplitudes() {
        assert!((a.norm() - half).abs() < 1e-10);
    }
    Ok(())
}

#[test]
fn test_bell_measurements_agree() -> SimResult<()> {
    let mut sim = Simulator::new(SimConfig::default().with_seed(4));
    sim.set_error_hook(|_| {});
    let mut ones = 0;
    for _ in 0..200 {
        let mut reg = bell(&mut sim)?;
        let a = sim.measure_bit(&mut reg, 1)?;
        let b = sim.measure_bit(&mut reg, 0)?;
        assert_eq!(a, b);
        assert_eq!(reg.width(), 0);
        if a {
            ones += 1;
        }
    }
    assert!(ones > 60 && ones < 140);
    Ok(())
}

#[test]
fn test_bell_reduced_density() -> SimResult<()> {
    let mut sim = Simulator::new(SimConfig::default().with_seed(4));
    sim.set_error_hook(|_| {});
    let reg = bell(&mut sim)?;
    let mut rho = DensityOperator::from_register(reg)?;
    assert!((rho.purity()? - 1.0).abs() < 1e-10);
    sim.partial_trace(&mut rho, 0)?;
    assert!((rho.purity()? - 0.5).abs() < 1e-10);
    let m = sim.density_matrix(&rho)?;
    assert!((m[(0, 0)].re - 0.5).abs() < 1e-10);
    assert!((m[(1, 1)].re - 0.5).abs() < 1e-10);
    assert!(m[(0, 1)].norm() < 1e-10);
    Ok(())
}

#[test]
fn test_ghz_through_two_qubit_engine() -> SimResult<()> {
    let cnot = Matrix::from_reals(
        4,
        &[
            1.0, 0.0, 0.0, 0.0, //
            0.0, 0.0, 0.0, 1.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 1.0, 0.0, 0.0,
        ],
    )?;
    let mut reg = Register::<f64>::new(3, 0)?;
    reg.apply_gate(&Gate::Hadamard(0))?;
    reg.apply_gate(&Gate::Unitary2 {
        target1: 0,
        target2: 1,
        matrix: cnot.clone(),
    })?;
    reg.apply_gate(&Gate::Unitary2 {
        target1: 1,
        target2: 2,
        matrix: cnot,
    })?;
    let mut states = reg.states().to_vec();
    states.sort_unstable();
    assert_eq!(states, vec![0b000, 0b111]);
    assert!((reg.probability() - 1.0).abs() < 1e-10);
    Ok(())
}
