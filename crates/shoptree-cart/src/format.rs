//! Compact number formatting for text reports.

use std::fmt;

const SIGNIFICANT_DIGITS: i32 = 6;

/// Displays a float with six significant digits and trailing zeros removed,
/// switching to exponent form (`1.5e+06`, `1e-07`) outside `[1e-5, 1e6)`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Significant(pub(crate) f64);

impl fmt::Display for Significant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = self.0;
        if v == 0.0 || !v.is_finite() {
            return write!(f, "{v}");
        }

        // Exponent after rounding to the target precision.
        let sci = format!("{:.*e}", (SIGNIFICANT_DIGITS - 1) as usize, v);
        let Some((mantissa, exp)) = sci.split_once('e') else {
            return write!(f, "{v}");
        };
        let Ok(exp) = exp.parse::<i32>() else {
            return write!(f, "{v}");
        };

        if exp < -5 || exp >= SIGNIFICANT_DIGITS {
            let sign = if exp < 0 { '-' } else { '+' };
            write!(f, "{}e{sign}{:02}", trim_zeros(mantissa), exp.abs())
        } else {
            let decimals = (SIGNIFICANT_DIGITS - 1 - exp) as usize;
            f.write_str(trim_zeros(&format!("{v:.decimals$}")))
        }
    }
}

fn trim_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}
