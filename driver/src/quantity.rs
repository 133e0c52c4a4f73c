//! Minimal parser for Kubernetes `resource.Quantity` strings, enough to sum
//! CPU and memory requests the way `get_state` needs to. Not a full
//! implementation of the Kubernetes quantity grammar (no exponent notation).

/// Parses a CPU quantity (e.g. `"500m"`, `"1"`, `"2.5"`) into CPU cores.
pub fn parse_cpu(s: &str) -> f64 {
    let s = s.trim();
    if let Some(milli) = s.strip_suffix('m') {
        milli.parse::<f64>().unwrap_or(0.0) / 1000.0
    } else {
        s.parse::<f64>().unwrap_or(0.0)
    }
}

/// Parses a memory quantity (e.g. `"128Mi"`, `"1Gi"`, `"512k"`) into bytes.
pub fn parse_memory(s: &str) -> u64 {
    let s = s.trim();
    const BINARY: &[(&str, u64)] = &[
        ("Ki", 1024),
        ("Mi", 1024u64.pow(2)),
        ("Gi", 1024u64.pow(3)),
        ("Ti", 1024u64.pow(4)),
        ("Pi", 1024u64.pow(5)),
        ("Ei", 1024u64.pow(6)),
    ];
    const DECIMAL: &[(&str, u64)] = &[
        ("k", 1_000),
        ("M", 1_000_000),
        ("G", 1_000_000_000),
        ("T", 1_000_000_000_000),
        ("P", 1_000_000_000_000_000),
        ("E", 1_000_000_000_000_000_000),
    ];

    for (suffix, factor) in BINARY {
        if let Some(value) = s.strip_suffix(suffix) {
            return value.parse::<f64>().map(|v| (v * *factor as f64) as u64).unwrap_or(0);
        }
    }
    for (suffix, factor) in DECIMAL {
        if let Some(value) = s.strip_suffix(suffix) {
            return value.parse::<f64>().map(|v| (v * *factor as f64) as u64).unwrap_or(0);
        }
    }
    s.parse::<f64>().map(|v| v as u64).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_millicpu() {
        assert_eq!(parse_cpu("500m"), 0.5);
        assert_eq!(parse_cpu("2"), 2.0);
        assert_eq!(parse_cpu("1.5"), 1.5);
    }

    #[test]
    fn parses_binary_memory_suffixes() {
        assert_eq!(parse_memory("1Ki"), 1024);
        assert_eq!(parse_memory("1Mi"), 1024 * 1024);
        assert_eq!(parse_memory("2Gi"), 2 * 1024 * 1024 * 1024);
    }

    #[test]
    fn parses_decimal_memory_suffixes() {
        assert_eq!(parse_memory("1k"), 1_000);
        assert_eq!(parse_memory("1M"), 1_000_000);
    }

    #[test]
    fn parses_bare_byte_count() {
        assert_eq!(parse_memory("4096"), 4096);
    }
}
