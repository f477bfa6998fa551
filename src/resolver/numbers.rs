//! Integer and float parsing for resolved scalars.

use core::fmt;

/// An integer scalar in the narrowest representation that fits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum YamlInt {
    I32(i32),
    I64(i64),
    /// Too large for `i64`.
    ///
    /// This is a lossless text form: `digits` are the validated digits in
    /// `radix` without sign, prefix, separators or leading zeros. Values up
    /// to 128 bits convert with [`YamlInt::as_i128`]; wider values can be
    /// handed to any arbitrary-precision library from these parts.
    Big {
        negative: bool,
        radix: u32,
        digits: String,
    },
}

impl YamlInt {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            YamlInt::I32(v) => Some(i64::from(*v)),
            YamlInt::I64(v) => Some(*v),
            YamlInt::Big { .. } => None,
        }
    }

    /// The value as an `i128`, if it fits.
    pub fn as_i128(&self) -> Option<i128> {
        match self {
            YamlInt::I32(v) => Some(i128::from(*v)),
            YamlInt::I64(v) => Some(i128::from(*v)),
            YamlInt::Big {
                negative,
                radix,
                digits,
            } => {
                let magnitude = u128::from_str_radix(digits, *radix).ok()?;
                if *negative {
                    0i128.checked_sub_unsigned(magnitude)
                } else {
                    i128::try_from(magnitude).ok()
                }
            }
        }
    }
}

impl fmt::Display for YamlInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            YamlInt::I32(v) => write!(f, "{}", v),
            YamlInt::I64(v) => write!(f, "{}", v),
            YamlInt::Big {
                negative,
                radix,
                digits,
            } => {
                let sign = if *negative { "-" } else { "" };
                let prefix = match radix {
                    8 => "0o",
                    16 => "0x",
                    _ => "",
                };
                write!(f, "{}{}{}", sign, prefix, digits)
            }
        }
    }
}

fn split_sign(text: &str) -> (bool, &str) {
    match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    }
}

/// Parse integer text.
///
/// Accepts an optional sign, `0x` hex, `0o` octal and legacy octal with a
/// leading `0`. Underscores are ignored. Returns `None` if the text is not
/// an integer in any of these forms.
pub fn parse_int(text: &str) -> Option<YamlInt> {
    let cleaned: String = text.chars().filter(|c| *c != '_').collect();
    let (negative, body) = split_sign(&cleaned);
    let (radix, digits) = if let Some(hex) = body.strip_prefix("0x") {
        (16, hex)
    } else if let Some(oct) = body.strip_prefix("0o") {
        (8, oct)
    } else if body.len() > 1 && body.starts_with('0') && body.bytes().all(|b| (b'0'..=b'7').contains(&b))
    {
        (8, &body[1..])
    } else {
        (10, body)
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }

    let limit = i64::MAX as u128 + 1;
    match u128::from_str_radix(digits, radix) {
        Ok(magnitude) if magnitude < limit || (negative && magnitude == limit) => {
            let value = if negative {
                -(magnitude as i128)
            } else {
                magnitude as i128
            };
            Some(match i32::try_from(value) {
                Ok(v) => YamlInt::I32(v),
                Err(_) => YamlInt::I64(value as i64),
            })
        }
        _ => Some(YamlInt::Big {
            negative,
            radix,
            digits: digits.trim_start_matches('0').to_string(),
        }),
    }
}

/// Parse float text: sign, mantissa, exponent, `.inf` and `.nan` in any
/// case. Underscores are ignored.
pub fn parse_float(text: &str) -> Option<f64> {
    let cleaned: String = text.chars().filter(|c| *c != '_').collect();
    let (negative, body) = split_sign(&cleaned);
    let magnitude = match body.to_ascii_lowercase().as_str() {
        ".inf" => f64::INFINITY,
        ".nan" => return if negative { None } else { Some(f64::NAN) },
        lower => {
            // std also accepts "inf" and "nan" spelled out
            if lower.chars().any(|c| c.is_ascii_alphabetic() && c != 'e') {
                return None;
            }
            lower.parse::<f64>().ok()?
        }
    };
    Some(if negative { -magnitude } else { magnitude })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_int_widths() {
        assert_eq!(parse_int("42"), Some(YamlInt::I32(42)));
        assert_eq!(parse_int("-17"), Some(YamlInt::I32(-17)));
        assert_eq!(parse_int("+7"), Some(YamlInt::I32(7)));
        assert_eq!(parse_int("2147483648"), Some(YamlInt::I64(2_147_483_648)));
        assert_eq!(
            parse_int("-9223372036854775808"),
            Some(YamlInt::I64(i64::MIN))
        );
        assert_eq!(
            parse_int("9223372036854775808"),
            Some(YamlInt::Big {
                negative: false,
                radix: 10,
                digits: "9223372036854775808".into()
            })
        );
    }

    #[test]
    fn test_parse_int_radix_forms() {
        assert_eq!(parse_int("0x1F"), Some(YamlInt::I32(31)));
        assert_eq!(parse_int("0o17"), Some(YamlInt::I32(15)));
        assert_eq!(parse_int("017"), Some(YamlInt::I32(15)));
        assert_eq!(parse_int("019"), Some(YamlInt::I32(19)));
        assert_eq!(parse_int("1_000"), Some(YamlInt::I32(1000)));
        assert_eq!(parse_int("0"), Some(YamlInt::I32(0)));
        assert_eq!(parse_int("0x"), None);
        assert_eq!(parse_int("12a"), None);
        assert_eq!(parse_int(""), None);
    }

    #[test]
    fn test_big_int_display() {
        let big = parse_int("-0x1_0000_0000_0000_0000").unwrap();
        assert_eq!(big.to_string(), "-0x10000000000000000");
        assert_eq!(big.as_i64(), None);
        assert_eq!(big.as_i128(), Some(-(1i128 << 64)));

        let huge = parse_int("340282366920938463463374607431768211456").unwrap();
        assert!(matches!(huge, YamlInt::Big { radix: 10, .. }));
        assert_eq!(huge.as_i128(), None);
        assert_eq!(huge.to_string(), "340282366920938463463374607431768211456");
    }

    #[test]
    fn test_parse_float() {
        assert_eq!(parse_float("1.5"), Some(1.5));
        assert_eq!(parse_float("-.5"), Some(-0.5));
        assert_eq!(parse_float("1e3"), Some(1000.0));
        assert_eq!(parse_float("6.8523015e+5"), Some(685230.15));
        assert_eq!(parse_float("1."), Some(1.0));
        assert_eq!(parse_float(".inf"), Some(f64::INFINITY));
        assert_eq!(parse_float("-.INF"), Some(f64::NEG_INFINITY));
        assert!(parse_float(".NaN").is_some_and(f64::is_nan));
        assert_eq!(parse_float("inf"), None);
        assert_eq!(parse_float("abc"), None);
    }
}
