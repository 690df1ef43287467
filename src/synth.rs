//! Throughput synthesizer: shapes a plausible-looking speed curve for one
//! measurement phase without touching the network.

use rand::Rng;
use std::time::Duration;

/// Fraction of the phase spent ramping toward the target.
const RAMP_FRACTION: f64 = 0.2;
/// Full width of the steady-state fluctuation band relative to the target.
const FLUCTUATION_BAND: f64 = 0.15;

/// Instantaneous throughput for the given elapsed time within a phase.
///
/// During the ramp the curve follows an ease-out cubic from zero toward
/// `target_mbps`, the slow-start shape real transfers show. Past the ramp
/// the value fluctuates uniformly within ±7.5% of the target, clamped at
/// zero. Stateless: each call depends only on its inputs and the RNG.
pub fn synthesize<R: Rng>(
    elapsed: Duration,
    target_mbps: f64,
    phase_duration: Duration,
    rng: &mut R,
) -> f64 {
    let ramp = phase_duration.mul_f64(RAMP_FRACTION);
    if elapsed < ramp {
        let progress = elapsed.as_secs_f64() / ramp.as_secs_f64();
        return target_mbps * (1.0 - (1.0 - progress).powi(3));
    }

    let fluctuation = (rng.gen::<f64>() - 0.5) * (target_mbps * FLUCTUATION_BAND);
    (target_mbps + fluctuation).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const PHASE: Duration = Duration::from_millis(5000);

    #[test]
    fn ramp_is_monotonic_and_capped_at_target() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut last = -1.0;
        for ms in (0..1000).step_by(50) {
            let v = synthesize(Duration::from_millis(ms), 100.0, PHASE, &mut rng);
            assert!(v >= last, "ramp dipped at {ms} ms: {v} < {last}");
            assert!(v <= 100.0);
            last = v;
        }
    }

    #[test]
    fn steady_state_stays_in_band_and_near_target() {
        let mut rng = StdRng::seed_from_u64(2);
        let target = 80.0;
        let n = 2000;
        let mut sum = 0.0;
        for _ in 0..n {
            let v = synthesize(Duration::from_millis(3000), target, PHASE, &mut rng);
            assert!(v >= 0.0);
            assert!((v - target).abs() <= target * FLUCTUATION_BAND / 2.0 + 1e-9);
            sum += v;
        }
        let mean = sum / n as f64;
        assert!((mean - target).abs() < 1.0, "mean drifted: {mean}");
    }

    #[test]
    fn low_target_never_goes_negative() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..500 {
            let v = synthesize(Duration::from_millis(4000), 0.1, PHASE, &mut rng);
            assert!(v >= 0.0);
        }
    }
}
