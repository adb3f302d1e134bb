/// Settings for a [`crate::simulator::Simulator`] session.
///
/// The default has noise disabled, an entropy-seeded generator and no memory tracking.
///
/// # Example
/// ```
/// use qreg::prelude::*;
///
/// let config = SimConfig::default().with_seed(42).with_decoherence(1e-3);
/// let sim = Simulator::new(config);
/// assert_eq!(sim.decoherence(), 1e-3);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SimConfig {
    /// Decoherence coefficient; zero disables noise.
    pub decoherence: f64,
    /// Seed for the session generator, or `None` to seed from entropy.
    pub seed: Option<u64>,
    /// Whether registers created by the session report their footprint.
    pub track_memory: bool,
}

impl SimConfig {
    /// Set the decoherence coefficient.
    pub fn with_decoherence(mut self, lambda: f64) -> Self {
        self.decoherence = lambda;
        self
    }

    /// Seed the session generator.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Turn memory tracking on or off.
    pub fn with_memory_tracking(mut self, track: bool) -> Self {
        self.track_memory = track;
        self
    }
}
