//! Expansion of "every N%" repeaters into absolute percentage thresholds.

/// Expand every-N repeaters into the sorted, deduplicated set of thresholds
/// they imply, capped at 100.
///
/// Repeaters that are not positive finite numbers imply nothing.
///
/// ```
/// let out = medialistener::expand_every_percentage(&[25.0]);
/// assert_eq!(out, vec![25.0, 50.0, 75.0, 100.0]);
/// ```
pub fn expand_every_percentage(every: &[f64]) -> Vec<f64> {
    let mut output: Vec<f64> = Vec::new();

    for &step in every {
        if !step.is_finite() || step <= 0.0 {
            continue;
        }
        let count = (100.0 / step).floor() as u64;
        output.extend((1..=count).map(|l| step * l as f64));
    }

    output.sort_by(|a, b| a.total_cmp(b));
    output.dedup();
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merges_overlapping_repeaters() {
        let out = expand_every_percentage(&[25.0, 10.0]);
        assert_eq!(
            out,
            vec![10.0, 20.0, 25.0, 30.0, 40.0, 50.0, 60.0, 70.0, 75.0, 80.0, 90.0, 100.0]
        );
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(expand_every_percentage(&[]).is_empty());
    }

    #[test]
    fn stops_before_exceeding_100() {
        assert_eq!(expand_every_percentage(&[30.0]), vec![30.0, 60.0, 90.0]);
        assert!(expand_every_percentage(&[150.0]).is_empty());
    }

    #[test]
    fn ignores_degenerate_steps() {
        assert!(expand_every_percentage(&[0.0, -5.0, f64::NAN]).is_empty());
    }
}
