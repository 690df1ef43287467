/// Compute metrics (mean, median, 25th percentile, 75th percentile) from samples
pub fn compute_metrics(samples: &[f64]) -> Option<(f64, f64, f64, f64)> {
    if samples.len() < 2 {
        return None;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = sorted.len();
    let mean = samples.iter().sum::<f64>() / samples.len() as f64;
    let median = sorted[n / 2];
    let p25 = sorted[n / 4];
    let p75 = sorted[3 * n / 4];
    Some((mean, median, p25, p75))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn too_few_samples_yield_nothing() {
        assert!(compute_metrics(&[]).is_none());
        assert!(compute_metrics(&[1.0]).is_none());
    }

    #[test]
    fn quartiles_on_a_known_series() {
        let samples = [4.0, 1.0, 3.0, 2.0];
        let (mean, median, p25, p75) = compute_metrics(&samples).unwrap();
        assert_eq!(mean, 2.5);
        assert_eq!(median, 3.0);
        assert_eq!(p25, 2.0);
        assert_eq!(p75, 4.0);
    }
}
