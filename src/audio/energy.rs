//! Energy gate that keeps silent windows away from the classifier.

use super::normalize;

const FLOOR_DB: f32 = -120.0;

/// Root-mean-square of the normalized window. Accumulates in f64 so a full
/// second of full-scale audio cannot lose precision.
pub fn rms(window: &[i16]) -> f32 {
    if window.is_empty() {
        return 0.0;
    }
    let energy: f64 = window
        .iter()
        .map(|&s| {
            let y = f64::from(normalize(s));
            y * y
        })
        .sum();
    (energy / window.len() as f64).sqrt() as f32
}

/// Level in dBFS for log lines.
pub fn rms_db(rms: f32) -> f32 {
    if rms <= 0.0 {
        return FLOOR_DB;
    }
    (20.0 * rms.log10()).max(FLOOR_DB)
}

/// Classifies a window as silence when its RMS is below a calibrated threshold.
#[derive(Debug, Clone)]
pub struct EnergyGate {
    threshold: f32,
}

impl EnergyGate {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn set_threshold(&mut self, threshold: f32) {
        self.threshold = threshold;
    }

    pub fn is_silence(&self, window: &[i16]) -> bool {
        rms(window) < self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rms_of_empty_window_is_zero() {
        assert_eq!(rms(&[]), 0.0);
    }

    #[test]
    fn rms_db_clamps_to_floor() {
        assert_eq!(rms_db(0.0), FLOOR_DB);
        assert!((rms_db(1.0)).abs() < 1e-6);
    }

    #[test]
    fn threshold_can_be_recalibrated() {
        let window = vec![328i16; 160];
        let mut gate = EnergyGate::new(0.05);
        assert!(gate.is_silence(&window));
        gate.set_threshold(0.005);
        assert!(!gate.is_silence(&window));
    }
}
