//! Numerical integration and interpolation on tabulated data.

/// Trapezoid-rule integral of `ys` sampled at (sorted) `xs`.
///
/// Returns `0.0` for fewer than two samples.
pub fn trapezoid(xs: &[f64], ys: &[f64]) -> f64 {
    xs.windows(2)
        .zip(ys.windows(2))
        .map(|(x, y)| 0.5 * (y[0] + y[1]) * (x[1] - x[0]))
        .sum()
}

/// Piecewise-linear interpolation at `x`, clamped to the end values outside
/// the tabulated range.
///
/// `xs` must be strictly increasing and the same length as `ys`.
pub fn linear_interp(xs: &[f64], ys: &[f64], x: f64) -> f64 {
    let n = xs.len().min(ys.len());
    if n == 0 {
        return f64::NAN;
    }
    if x <= xs[0] {
        return ys[0];
    }
    if x >= xs[n - 1] {
        return ys[n - 1];
    }

    // First index with xs[i] > x; guaranteed in 1..n by the checks above.
    let i = xs[..n].partition_point(|&v| v <= x);
    let (x0, x1) = (xs[i - 1], xs[i]);
    let (y0, y1) = (ys[i - 1], ys[i]);
    if (x1 - x0).abs() < 1e-300 {
        return y0;
    }
    let u = (x - x0) / (x1 - x0);
    y0 + u * (y1 - y0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trapezoid_of_linear_function_is_exact() {
        let xs = [0.0, 1.0, 3.0];
        let ys = [0.0, 2.0, 6.0];
        // ∫0^3 2x dx = 9
        assert!((trapezoid(&xs, &ys) - 9.0).abs() < 1e-12);
    }

    #[test]
    fn trapezoid_needs_two_points() {
        assert_eq!(trapezoid(&[1.0], &[5.0]), 0.0);
    }

    #[test]
    fn interp_between_and_outside_knots() {
        let xs = [1.0, 2.0, 4.0];
        let ys = [10.0, 20.0, 0.0];
        assert!((linear_interp(&xs, &ys, 1.5) - 15.0).abs() < 1e-12);
        assert!((linear_interp(&xs, &ys, 3.0) - 10.0).abs() < 1e-12);
        assert_eq!(linear_interp(&xs, &ys, 0.0), 10.0);
        assert_eq!(linear_interp(&xs, &ys, 9.0), 0.0);
        assert_eq!(linear_interp(&xs, &ys, 2.0), 20.0);
    }
}
