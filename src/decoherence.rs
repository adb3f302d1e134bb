use crate::rayon_helper::*;
use crate::register::Register;
use crate::types::cast;
use crate::utils::{get_bit, STATE_BITS};
use crate::{Complex, Precision};
use rand::Rng;

/// Random phase noise applied after every gate.
///
/// With coefficient `lambda`, each call draws one gaussian `x_j` per qubit and rotates every
/// amplitude by `e^{i theta}`, where `theta` sums `+n_j` over set bits and `-n_j` over clear
/// bits, with `n_j = x_j sqrt(2 lambda) / 2`. `lambda == 0` disables noise entirely.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Decoherence {
    lambda: f64,
}

impl Decoherence {
    /// Noise with coefficient `lambda`.
    pub fn new(lambda: f64) -> Self {
        Self { lambda }
    }

    /// No noise.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// The coefficient.
    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    /// Whether calls change amplitudes.
    pub fn is_enabled(&self) -> bool {
        self.lambda != 0.0
    }

    /// Rotate every amplitude of `reg` by a random phase. Returns whether noise was applied.
    pub fn apply<P, R>(&self, reg: &mut Register<P>, rng: &mut R) -> bool
    where
        P: Precision,
        R: Rng + ?Sized,
    {
        if !self.is_enabled() {
            return false;
        }
        let scale = (2.0 * self.lambda).sqrt() / 2.0;
        let noise: Vec<P> = (0..reg.width())
            .map(|_| cast(standard_normal(rng) * scale))
            .collect();

        let states = &reg.states;
        iter_mut!(reg.amplitudes)
            .zip(iter!(states))
            .for_each(|(a, s)| {
                let theta = noise
                    .iter()
                    .enumerate()
                    .fold(P::zero(), |acc, (j, n)| {
                        if j < STATE_BITS && get_bit(*s, j) {
                            acc + *n
                        } else {
                            acc - *n
                        }
                    });
                *a *= Complex::from_polar(P::one(), theta);
            });
        true
    }
}

/// A standard normal sample by the Marsaglia polar method.
pub fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    loop {
        let u = 2.0 * rng.gen::<f64>() - 1.0;
        let v = 2.0 * rng.gen::<f64>() - 1.0;
        let s = u * u + v * v;
        if s < 1.0 && s > 0.0 {
            return u * (-2.0 * s.ln() / s).sqrt();
        }
    }
}

#[cfg(test)]
mod decoherence_tests {
    use super::*;
    use crate::errors::SimResult;
    use crate::gates::Gate;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn spread() -> SimResult<Register<f64>> {
        let mut reg = Register::new(3, 0)?;
        reg.apply_hadamards(3)?;
        reg.apply_gate(&Gate::Rz {
            target: 1,
            angle: 0.3,
        })?;
        Ok(reg)
    }

    #[test]
    fn test_disabled_is_bit_exact() -> SimResult<()> {
        let reference = spread()?;
        let mut reg = spread()?;
        let mut rng = StdRng::seed_from_u64(7);
        assert!(!Decoherence::disabled().apply(&mut reg, &mut rng));
        assert_eq!(reg.amplitudes(), reference.amplitudes());
        assert_eq!(reg.states(), reference.states());
        Ok(())
    }

    #[test]
    fn test_enabled_keeps_magnitudes() -> SimResult<()> {
        let reference = spread()?;
        let mut reg = spread()?;
        let mut rng = StdRng::seed_from_u64(7);
        assert!(Decoherence::new(0.5).apply(&mut reg, &mut rng));
        let mut changed = false;
        for (a, b) in reg.amplitudes().iter().zip(reference.amplitudes()) {
            assert!((a.norm() - b.norm()).abs() < 1e-12);
            changed |= (a - b).norm() > 1e-9;
        }
        assert!(changed);
        assert_eq!(reg.states(), reference.states());
        Ok(())
    }

    #[test]
    fn test_standard_normal_moments() {
        let mut rng = StdRng::seed_from_u64(1);
        let n = 20_000;
        let samples: Vec<f64> = (0..n).map(|_| standard_normal(&mut rng)).collect();
        let mean = samples.iter().sum::<f64>() / n as f64;
        let var = samples.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / n as f64;
        assert!(mean.abs() < 0.05);
        assert!((var - 1.0).abs() < 0.05);
    }
}
