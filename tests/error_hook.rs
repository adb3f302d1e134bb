use qreg::prelude::*;
use std::sync::{Arc, Mutex};

#[test]
fn test_hook_receives_each_error() {
    let seen: Arc<Mutex<Vec<SimError>>> = Arc::new(Mutex::new(vec![]));
    let log = seen.clone();
    let mut sim = Simulator::default();
    sim.set_error_hook(move |e| log.lock().unwrap().push(e.clone()));

    assert!(sim.register::<f64>(1, 2).is_err());
    let mut reg = sim.register::<f64>(2, 0).unwrap();
    let bad = Gate::Unitary1 {
        target: 0,
        matrix: Matrix::identity(4).unwrap(),
    };
    assert!(sim.apply(&mut reg, &bad).is_err());
    assert!(sim.measure_bit(&mut reg, 7).is_err());

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 3);
    assert!(matches!(seen[0], SimError::InvalidQubit(_)));
    assert_eq!(
        seen[1],
        SimError::WrongMatrixSize {
            expected: (2, 2),
            found: (4, 4)
        }
    );
    assert_eq!(seen[1].kind_str(), "wrong matrix size");
    assert!(matches!(seen[2], SimError::InvalidQubit(_)));
}

#[test]
fn test_replacing_hook_returns_previous() {
    let mut sim = Simulator::default();
    assert!(sim.set_error_hook(|_| {}).is_none());
    assert!(sim.set_error_hook(|_| {}).is_some());
    assert!(sim.clear_error_hook().is_some());
    assert!(sim.clear_error_hook().is_none());
}

#[test]
fn test_register_errors_are_typed() {
    let m = Matrix::<f64>::new(4, 2).unwrap();
    assert_eq!(
        Register::from_matrix(&m, 2).err(),
        Some(SimError::SingleColumnExpected { cols: 2 })
    );
    assert!(matches!(
        DensityOperator::<f64>::from_ensemble(vec![]),
        Err(SimError::EmptyEnsemble)
    ));
}

#[test]
fn test_hook_sees_conversion_and_ensemble_errors() {
    let seen: Arc<Mutex<Vec<SimError>>> = Arc::new(Mutex::new(vec![]));
    let log = seen.clone();
    let mut sim = Simulator::default();
    sim.set_error_hook(move |e| log.lock().unwrap().push(e.clone()));

    let m = Matrix::<f64>::new(4, 2).unwrap();
    assert!(sim.register_from_matrix(&m, 2).is_err());
    assert!(sim.density::<f64>(vec![]).is_err());
    let reg = sim.register::<f64>(1, 0).unwrap();
    assert!(sim.collapse_on_bit(&reg, 3, false).is_err());

    let seen = seen.lock().unwrap();
    assert_eq!(
        *seen,
        vec![
            SimError::SingleColumnExpected { cols: 2 },
            SimError::EmptyEnsemble,
            SimError::invalid_qubit("qubit 3 outside register of width 1"),
        ]
    );
}
