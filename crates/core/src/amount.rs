//! Token amount display.

use crate::Amount;

fn pow10(exp: u32) -> Option<Amount> {
    (10 as Amount).checked_pow(exp)
}

/// Render base units as a fixed-point token amount.
///
/// With `fraction_digits = Some(n)` the value is rounded half-up to `n`
/// decimals (`toFixed` style). With `None` the full precision is kept and
/// trailing zeros are trimmed, leaving at least one fractional digit.
pub fn format_token_amount(amount: Amount, decimals: u32, fraction_digits: Option<u32>) -> String {
    let Some(scale) = pow10(decimals) else {
        return amount.to_string();
    };

    match fraction_digits {
        Some(digits) if digits < decimals => {
            // decimals > digits, so both powers exist
            let divisor = pow10(decimals - digits).unwrap_or(1);
            let unit = pow10(digits).unwrap_or(1);
            let rounded = match amount.checked_add(divisor / 2) {
                Some(v) => v / divisor,
                None => amount / divisor,
            };
            let whole = rounded / unit;
            let frac = rounded % unit;
            if digits == 0 {
                whole.to_string()
            } else {
                format!("{whole}.{frac:0width$}", width = digits as usize)
            }
        }
        Some(digits) => {
            let whole = amount / scale;
            let frac = amount % scale;
            let pad = (digits - decimals) as usize;
            if digits == 0 {
                whole.to_string()
            } else if decimals == 0 {
                format!("{whole}.{}", "0".repeat(pad))
            } else {
                format!(
                    "{whole}.{frac:0width$}{}",
                    "0".repeat(pad),
                    width = decimals as usize
                )
            }
        }
        None => {
            let whole = amount / scale;
            if decimals == 0 {
                return format!("{whole}.0");
            }
            let frac = format!("{:0width$}", amount % scale, width = decimals as usize);
            let trimmed = frac.trim_end_matches('0');
            if trimmed.is_empty() {
                format!("{whole}.0")
            } else {
                format!("{whole}.{trimmed}")
            }
        }
    }
}
