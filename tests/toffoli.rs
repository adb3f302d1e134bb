use qreg::prelude::*;

// https://en.wikipedia.org/wiki/Quantum_logic_gate#Toffoli_(CCNOT)_gate
fn truth_table() -> Vec<((u64, u64, u64), (u64, u64, u64))> {
    vec![
        ((0, 0, 0), (0, 0, 0)),
        ((0, 0, 1), (0, 0, 1)),
        ((0, 1, 0), (0, 1, 0)),
        ((0, 1, 1), (0, 1, 1)),
        ((1, 0, 0), (1, 0, 0)),
        ((1, 0, 1), (1, 0, 1)),
        ((1, 1, 0), (1, 1, 1)),
        ((1, 1, 1), (1, 1, 0)),
    ]
}

fn pack((a, b, c): (u64, u64, u64)) -> u64 {
    a | (b << 1) | (c << 2)
}

#[test]
fn test_toffoli() -> SimResult<()> {
    for (input, output) in truth_table() {
        let mut reg = Register::<f64>::new(3, 0)?;
        // Set up the inputs with X gates.
        for (q, bit) in [input.0, input.1, input.2].iter().enumerate() {
            if *bit == 1 {
                reg.apply_gate(&Gate::X(q))?;
            }
        }
        reg.apply_gate(&Gate::Toffoli {
            control1: 0,
            control2: 1,
            target: 2,
        })?;
        assert_eq!(reg.states(), &[pack(output)]);
        assert_eq!(reg.amplitudes()[0], Complex::new(1.0, 0.0));
    }
    Ok(())
}

#[test]
fn test_toffoli_in_superposition() -> SimResult<()> {
    let mut reg = Register::<f64>::new(3, 0)?;
    reg.apply_hadamards(2)?;
    reg.apply_gate(&Gate::Toffoli {
        control1: 0,
        control2: 1,
        target: 2,
    })?;
    let mut states = reg.states().to_vec();
    states.sort_unstable();
    assert_eq!(states, vec![0b000, 0b001, 0b010, 0b111]);
    Ok(())
}
