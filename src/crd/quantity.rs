//! Kubernetes resource quantities (e.g. "10Gi", "500Mi", "1.5G", "1e3").

/// Base-unit amounts are kept as an integer count of nano-units.
const NANO_EXPONENT: i32 = 9;

/// A parsed Kubernetes quantity.
///
/// The magnitude is stored exactly, in nano-units, so quantities written with
/// different suffixes (`10Gi`, `10240Mi`) compare equal and large sizes never
/// collapse through floating point rounding. Sub-nano fractions round up, as
/// the API server does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Quantity {
    nanos: i128,
}

impl Quantity {
    /// Parse a quantity string like "1Gi", "500Mi", "100m", "1e3" or "-1".
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let (negative, unsigned) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s.strip_prefix('+').unwrap_or(s)),
        };

        let num_end = unsigned
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .unwrap_or(unsigned.len());
        let (number, suffix) = unsigned.split_at(num_end);

        let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
        if whole.is_empty() && fraction.is_empty() {
            return None;
        }
        let mantissa: i128 = format!("{whole}{fraction}").parse().ok()?;

        let (binary_shift, decimal_exponent) = parse_suffix(suffix)?;
        let scale = NANO_EXPONENT
            .checked_add(decimal_exponent)?
            .checked_sub(i32::try_from(fraction.len()).ok()?)?;

        let magnitude = mantissa.checked_mul(1_i128 << binary_shift)?;
        let nanos = if scale >= 0 {
            magnitude.checked_mul(10_i128.checked_pow(scale.unsigned_abs())?)?
        } else {
            match 10_i128.checked_pow(scale.unsigned_abs()) {
                Some(divisor) => magnitude.div_euclid(divisor)
                    + i128::from(magnitude.rem_euclid(divisor) != 0),
                // Anything this small rounds up to one nano-unit
                None => i128::from(magnitude != 0),
            }
        };

        Some(Quantity {
            nanos: if negative { nanos.checked_neg()? } else { nanos },
        })
    }

    /// Whether the quantity is strictly greater than zero.
    pub fn is_positive(&self) -> bool {
        self.nanos > 0
    }
}

/// Map a suffix to `(binary shift, decimal exponent)`.
fn parse_suffix(suffix: &str) -> Option<(u32, i32)> {
    let parsed = match suffix {
        "" => (0, 0),
        // Decimal SI suffixes
        "n" => (0, -9),
        "u" => (0, -6),
        "m" => (0, -3),
        "k" => (0, 3),
        "M" => (0, 6),
        "G" => (0, 9),
        "T" => (0, 12),
        "P" => (0, 15),
        "E" => (0, 18),
        // Binary SI suffixes
        "Ki" => (10, 0),
        "Mi" => (20, 0),
        "Gi" => (30, 0),
        "Ti" => (40, 0),
        "Pi" => (50, 0),
        "Ei" => (60, 0),
        // Decimal exponent, e.g. "e3" or "E-2"
        _ => {
            let exponent = suffix
                .strip_prefix('e')
                .or_else(|| suffix.strip_prefix('E'))?;
            if !exponent
                .trim_start_matches(['+', '-'])
                .chars()
                .all(|c| c.is_ascii_digit())
            {
                return None;
            }
            (0, exponent.parse().ok()?)
        }
    };
    Some(parsed)
}
