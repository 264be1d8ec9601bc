//! Evenly spaced grids (linear and logarithmic).
//!
//! Temperature grids for DEM inversion are usually log-spaced
//! (e.g. 1e5 K → 1e8 K), while synthetic line centres are linear.

use crate::error::AppError;

/// Generate `steps` linearly spaced points between `min` and `max` (inclusive).
pub fn lin_space(min: f64, max: f64, steps: usize) -> Result<Vec<f64>, AppError> {
    if !(min.is_finite() && max.is_finite() && max > min) {
        return Err(AppError::invalid(format!(
            "Invalid range: min={min}, max={max} (must be finite and max>min)."
        )));
    }
    if steps < 2 {
        return Err(AppError::invalid("Grid steps must be >= 2."));
    }

    let step = (max - min) / (steps as f64 - 1.0);
    let mut out: Vec<f64> = (0..steps).map(|i| min + step * i as f64).collect();
    // Pin the endpoint so callers can rely on exact edges.
    out[steps - 1] = max;
    Ok(out)
}

/// Generate `steps` log-spaced points between `min` and `max` (inclusive).
pub fn log_space(min: f64, max: f64, steps: usize) -> Result<Vec<f64>, AppError> {
    if !(min.is_finite() && max.is_finite() && min > 0.0 && max > 0.0 && max > min) {
        return Err(AppError::invalid(format!(
            "Invalid range: min={min}, max={max} (must be finite, >0, and max>min)."
        )));
    }
    if steps < 2 {
        return Err(AppError::invalid("Grid steps must be >= 2."));
    }

    let ln_min = min.ln();
    let ln_max = max.ln();
    let step = (ln_max - ln_min) / (steps as f64 - 1.0);

    let mut out = Vec::with_capacity(steps);
    for i in 0..steps {
        out.push((ln_min + step * i as f64).exp());
    }
    out[0] = min;
    out[steps - 1] = max;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_space_includes_endpoints() {
        let v = log_space(1e5, 1e8, 16).unwrap();
        assert_eq!(v.len(), 16);
        assert_eq!(v[0], 1e5);
        assert_eq!(v[15], 1e8);
        // Constant ratio between neighbours.
        let r0 = v[1] / v[0];
        let r1 = v[15] / v[14];
        assert!((r0 - r1).abs() < 1e-9);
    }

    #[test]
    fn lin_space_matches_numpy_linspace() {
        let v = lin_space(1.0, 2.0, 6).unwrap();
        let expected = [1.0, 1.2, 1.4, 1.6, 1.8, 2.0];
        for (a, b) in v.iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn rejects_degenerate_ranges() {
        assert_eq!(lin_space(2.0, 1.0, 5).unwrap_err().exit_code(), 2);
        assert_eq!(log_space(0.0, 1.0, 5).unwrap_err().exit_code(), 2);
        assert!(log_space(1.0, 10.0, 1).is_err());
    }
}
