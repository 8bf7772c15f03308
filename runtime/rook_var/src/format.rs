//! Number rendering and parsing for cell contents.
//!
//! A cell's cached number is rendered to text lazily, using whatever format
//! the active namespace has configured at the moment the text is actually
//! requested. Parsing is the inverse direction: deciding whether a cell's
//! text is a pure number, and if so which kind.

/// How cached integers are rendered to text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IntDisplay {
    /// Plain decimal (the default).
    Decimal,
    /// Signed `0x`-prefixed hexadecimal.
    Hex,
}

/// Active number-to-text format, part of the namespace-scoped settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NumFormat {
    pub integer: IntDisplay,
    /// Fractional digits for float rendering.
    pub float_precision: u8,
}

impl Default for NumFormat {
    fn default() -> Self {
        NumFormat {
            integer: IntDisplay::Decimal,
            float_precision: 6,
        }
    }
}

/// Default ceiling on a single variable's capacity (64 MiB).
pub const DEFAULT_MAX_CAPACITY: usize = 64 * 1024 * 1024;

/// Storage policy carried in the namespace-scoped settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VarSettings {
    pub format: NumFormat,
    /// Maximum granted capacity for any one cell, in bytes. Exceeding it is
    /// the recoverable allocation failure of this layer.
    pub max_capacity: usize,
}

impl Default for VarSettings {
    fn default() -> Self {
        VarSettings {
            format: NumFormat::default(),
            max_capacity: DEFAULT_MAX_CAPACITY,
        }
    }
}

/// Render a cached integer per the active format.
pub fn render_int(value: i64, format: &NumFormat) -> String {
    match format.integer {
        IntDisplay::Decimal => value.to_string(),
        IntDisplay::Hex => {
            if value < 0 {
                format!("-0x{:x}", value.unsigned_abs())
            } else {
                format!("0x{value:x}")
            }
        }
    }
}

/// Render a cached float per the active format.
pub fn render_float(value: f64, format: &NumFormat) -> String {
    format!("{:.*}", format.float_precision as usize, value)
}

/// Classification of a cell's text contents.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NumKind {
    Int(i64),
    Float(f64),
    NotNumeric,
}

/// Parse an integer, accepting an optional sign and a `0x`/`0X` prefix.
///
/// Hex digits are read as the two's-complement bit pattern, so the full
/// `i64` range round-trips through [`render_int`] in hex mode.
pub fn parse_int(text: &str) -> Option<i64> {
    let trimmed = text.trim();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    // At most one sign: the std parsers below accept their own, so a
    // second one ("--5", "+-5") would otherwise slip through.
    if rest
        .as_bytes()
        .first()
        .is_some_and(|b| matches!(b, b'+' | b'-'))
    {
        return None;
    }
    let magnitude = if let Some(hex) = rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X")) {
        // Wrapping: 0xFFFFFFFFFFFFFFFF is a valid (negative) integer.
        u64::from_str_radix(hex, 16).ok()? as i64
    } else {
        rest.parse::<i64>().ok()?
    };
    Some(if negative {
        magnitude.wrapping_neg()
    } else {
        magnitude
    })
}

/// Parse a float; falls back to hex-integer parsing for `0x` strings.
pub fn parse_float(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.contains("0x") || trimmed.contains("0X") {
        return parse_int(trimmed).map(|v| v as f64);
    }
    trimmed.parse::<f64>().ok()
}

/// Decide whether text is a pure number, and of which kind.
///
/// Leading/trailing whitespace is tolerated; anything else non-numeric
/// (including the empty string) is `NotNumeric`.
pub fn classify(text: &str) -> NumKind {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return NumKind::NotNumeric;
    }
    if let Some(v) = parse_int(trimmed) {
        return NumKind::Int(v);
    }
    // Floats must not merely parse; reject forms like "inf"/"nan" that a
    // script would not consider numeric literals.
    if trimmed
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+' | b'e' | b'E'))
    {
        if let Ok(v) = trimmed.parse::<f64>() {
            return NumKind::Float(v);
        }
    }
    NumKind::NotNumeric
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn renders_decimal_and_hex() {
        let dec = NumFormat::default();
        assert_eq!(render_int(42, &dec), "42");
        assert_eq!(render_int(-7, &dec), "-7");

        let hex = NumFormat {
            integer: IntDisplay::Hex,
            ..NumFormat::default()
        };
        assert_eq!(render_int(255, &hex), "0xff");
        assert_eq!(render_int(-1, &hex), "-0x1");
        // Round trip through the parser.
        assert_eq!(parse_int(&render_int(-91234, &hex)), Some(-91234));
    }

    #[test]
    fn renders_floats_with_precision() {
        let fmt = NumFormat::default();
        assert_eq!(render_float(3.5, &fmt), "3.500000");
        let two = NumFormat {
            float_precision: 2,
            ..fmt
        };
        assert_eq!(render_float(3.5, &two), "3.50");
    }

    #[test]
    fn parses_hex_bit_patterns() {
        assert_eq!(parse_int("0x10"), Some(16));
        assert_eq!(parse_int("0xFFFFFFFFFFFFFFFF"), Some(-1));
        assert_eq!(parse_int(" -0x2 "), Some(-2));
        assert_eq!(parse_int("12ab"), None);
    }

    #[test]
    fn classifies_purity() {
        assert_eq!(classify("42"), NumKind::Int(42));
        assert_eq!(classify("  -17 "), NumKind::Int(-17));
        assert_eq!(classify("3.5"), NumKind::Float(3.5));
        assert_eq!(classify("1e3"), NumKind::Float(1000.0));
        assert_eq!(classify(""), NumKind::NotNumeric);
        assert_eq!(classify("abc"), NumKind::NotNumeric);
        assert_eq!(classify("12abc"), NumKind::NotNumeric);
        assert_eq!(classify("inf"), NumKind::NotNumeric);
        // One sign at most, in either position order.
        assert_eq!(classify("--5"), NumKind::NotNumeric);
        assert_eq!(classify("+-5"), NumKind::NotNumeric);
        assert_eq!(classify("-+5"), NumKind::NotNumeric);
    }
}
