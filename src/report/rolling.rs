/// Trailing rolling mean over `window` consecutive samples.
///
/// Missing samples are skipped inside the window. A position with fewer than
/// `min_periods` present samples (or none at all) is `None`.
pub fn rolling_mean(values: &[Option<f64>], window: usize, min_periods: usize) -> Vec<Option<f64>> {
    let window = window.max(1);

    (0..values.len())
        .map(|end| {
            let start = (end + 1).saturating_sub(window);
            let (sum, count) = values[start..=end]
                .iter()
                .flatten()
                .fold((0.0_f64, 0usize), |(sum, count), v| (sum + *v, count + 1));

            if count == 0 || count < min_periods {
                None
            } else {
                Some(sum / count as f64)
            }
        })
        .collect()
}

// -- Tests -------------------------------------------------------------------
