//! Parsing of Kubernetes quantity strings into milli-cores and bytes.

const BINARY_UNITS: [(&str, f64); 6] = [
    ("Ei", 1_152_921_504_606_846_976.0),
    ("Pi", 1_125_899_906_842_624.0),
    ("Ti", 1_099_511_627_776.0),
    ("Gi", 1_073_741_824.0),
    ("Mi", 1_048_576.0),
    ("Ki", 1_024.0),
];

const DECIMAL_UNITS: [(&str, f64); 6] = [
    ("E", 1_000_000_000_000_000_000.0),
    ("P", 1_000_000_000_000_000.0),
    ("T", 1_000_000_000_000.0),
    ("G", 1_000_000_000.0),
    ("M", 1_000_000.0),
    ("k", 1_000.0),
];

/// Parses a CPU quantity (`"250m"`, `"1.5"`, `"120000n"`) into milli-cores.
///
/// Fractions of a milli-core round up, as `kubectl top` shows them.
pub fn parse_cpu_millicores(value: &str) -> Option<u64> {
    let raw = value.trim();
    if raw.is_empty() {
        return None;
    }

    // Nano-cores per unit of the suffix.
    let (number, nanos_per_unit) = if let Some(number) = raw.strip_suffix('m') {
        (number, 1_000_000u128)
    } else if let Some(number) = raw.strip_suffix('u') {
        (number, 1_000)
    } else if let Some(number) = raw.strip_suffix('n') {
        (number, 1)
    } else {
        (raw, 1_000_000_000)
    };

    let (mantissa, fraction_digits) = decimal_parts(number)?;
    let nanos = mantissa.checked_mul(nanos_per_unit)?;
    let divisor = 10u128.checked_pow(fraction_digits)?.checked_mul(1_000_000)?;
    u64::try_from(nanos.div_ceil(divisor)).ok()
}

/// Parses a memory quantity (`"512Mi"`, `"1G"`, `"1048576"`) into bytes.
pub fn parse_memory_bytes(value: &str) -> Option<u64> {
    let raw = value.trim();
    if raw.is_empty() {
        return None;
    }

    for (suffix, multiplier) in BINARY_UNITS {
        if let Some(number) = raw.strip_suffix(suffix) {
            return scaled(number, multiplier);
        }
    }

    for (suffix, multiplier) in DECIMAL_UNITS {
        if let Some(number) = raw.strip_suffix(suffix) {
            return scaled(number, multiplier);
        }
    }

    if let Some(number) = raw.strip_suffix('m') {
        return scaled(number, 0.001);
    }

    scaled(raw, 1.0)
}

fn scaled(number: &str, multiplier: f64) -> Option<u64> {
    let numeric = number.parse::<f64>().ok()?;
    let value = (numeric * multiplier).round();
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    Some(value as u64)
}

/// Splits `"12.5"` into the exact integer `125` and one fraction digit.
fn decimal_parts(number: &str) -> Option<(u128, u32)> {
    let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
    let digits = format!("{whole}{fraction}");
    if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    let fraction_digits = u32::try_from(fraction.len()).ok()?;
    Some((digits.parse::<u128>().ok()?, fraction_digits))
}

#[cfg(test)]
mod tests {
    use super::{parse_cpu_millicores, parse_memory_bytes};

    #[test]
    fn cpu_accepts_cores_and_sub_core_suffixes() {
        assert_eq!(parse_cpu_millicores("2"), Some(2_000));
        assert_eq!(parse_cpu_millicores("0.5"), Some(500));
        assert_eq!(parse_cpu_millicores("250m"), Some(250));
        assert_eq!(parse_cpu_millicores("1500000u"), Some(1_500));
        assert_eq!(parse_cpu_millicores("120000000n"), Some(120));
        assert_eq!(parse_cpu_millicores("1."), Some(1_000));
    }

    #[test]
    fn cpu_rounds_partial_millicores_up() {
        assert_eq!(parse_cpu_millicores("1200000n"), Some(2));
        assert_eq!(parse_cpu_millicores("100u"), Some(1));
        assert_eq!(parse_cpu_millicores("0.0001"), Some(1));
        assert_eq!(parse_cpu_millicores("0.3"), Some(300));
        assert_eq!(parse_cpu_millicores("0n"), Some(0));
    }

    #[test]
    fn cpu_rejects_garbage() {
        assert_eq!(parse_cpu_millicores(""), None);
        assert_eq!(parse_cpu_millicores("abc"), None);
        assert_eq!(parse_cpu_millicores("-1"), None);
        assert_eq!(parse_cpu_millicores("."), None);
        assert_eq!(parse_cpu_millicores("1.2.3"), None);
    }

    #[test]
    fn memory_handles_binary_and_decimal_suffixes() {
        assert_eq!(parse_memory_bytes("1Ki"), Some(1_024));
        assert_eq!(parse_memory_bytes("512Mi"), Some(536_870_912));
        assert_eq!(parse_memory_bytes("2Gi"), Some(2_147_483_648));
        assert_eq!(parse_memory_bytes("1G"), Some(1_000_000_000));
        assert_eq!(parse_memory_bytes("1k"), Some(1_000));
        assert_eq!(parse_memory_bytes("128k"), Some(128_000));
        assert_eq!(parse_memory_bytes("128974848"), Some(128_974_848));
        assert_eq!(parse_memory_bytes("1500m"), Some(2));
    }

    #[test]
    fn memory_rejects_unknown_suffix() {
        assert_eq!(parse_memory_bytes("12Xi"), None);
        assert_eq!(parse_memory_bytes("  "), None);
    }
}
