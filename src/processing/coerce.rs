//! Conversions from decoded field values to the typed optional fields stored
//! on the workout graph. None of these fail: anything missing or malformed
//! comes back as `None`.

use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;

use crate::processing::types::FieldValue;

/// Device positions divide a half turn into 2^31 parts.
pub const SEMICIRCLES_PER_HALF_TURN: i64 = 1 << 31;

/// Decimal places kept for latitude/longitude.
pub const COORDINATE_PRECISION: u32 = 7;

/// Round `value` to `precision` fractional digits.
pub fn safe_decimal(value: Option<&FieldValue>, precision: u32) -> Option<Decimal> {
    let decimal = match value? {
        FieldValue::Integer(raw) => Decimal::from(*raw),
        FieldValue::Float(raw) => float_to_decimal(*raw)?,
        FieldValue::Text(raw) => text_to_decimal(raw)?,
        FieldValue::Timestamp(_) => return None,
    };
    Some(decimal.round_dp(precision))
}

/// Integer view of `value`; floats truncate toward zero.
pub fn safe_int(value: Option<&FieldValue>) -> Option<i64> {
    match value? {
        FieldValue::Integer(raw) => Some(*raw),
        FieldValue::Float(raw) => {
            if raw.is_finite() && *raw >= i64::MIN as f64 && *raw <= i64::MAX as f64 {
                Some(raw.trunc() as i64)
            } else {
                None
            }
        }
        FieldValue::Text(raw) => raw.trim().parse::<i64>().ok(),
        FieldValue::Timestamp(_) => None,
    }
}

/// Text view of `value`; blank strings read as absent.
pub fn safe_text(value: Option<&FieldValue>) -> Option<String> {
    match value? {
        FieldValue::Text(raw) => {
            let trimmed = raw.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        FieldValue::Integer(raw) => Some(raw.to_string()),
        FieldValue::Float(raw) if raw.is_finite() => Some(raw.to_string()),
        FieldValue::Float(_) => None,
        FieldValue::Timestamp(ts) => Some(ts.to_rfc3339()),
    }
}

/// Semicircles to decimal degrees: `raw * 180 / 2^31`.
pub fn convert_angular_to_degrees(raw_angle: Option<&FieldValue>) -> Option<Decimal> {
    let raw = match raw_angle? {
        FieldValue::Integer(raw) => Decimal::from(*raw),
        FieldValue::Float(raw) => float_to_decimal(*raw)?,
        FieldValue::Text(raw) => text_to_decimal(raw)?,
        FieldValue::Timestamp(_) => return None,
    };
    let degrees = raw
        .checked_mul(Decimal::from(180))?
        .checked_div(Decimal::from(SEMICIRCLES_PER_HALF_TURN))?;
    Some(degrees.round_dp(COORDINATE_PRECISION))
}

/// Floating point variant of [`convert_angular_to_degrees`] used for route
/// encoding, which works on `f64` coordinates.
pub fn angular_to_degrees_f64(raw_angle: Option<&FieldValue>) -> Option<f64> {
    let raw = match raw_angle? {
        FieldValue::Integer(raw) => *raw as f64,
        FieldValue::Float(raw) if raw.is_finite() => *raw,
        _ => return None,
    };
    Some(raw * (180.0 / SEMICIRCLES_PER_HALF_TURN as f64))
}

fn float_to_decimal(raw: f64) -> Option<Decimal> {
    if raw.is_finite() {
        Decimal::from_f64(raw)
    } else {
        None
    }
}

fn text_to_decimal(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    Decimal::from_str(trimmed)
        .ok()
        .or_else(|| trimmed.parse::<f64>().ok().and_then(float_to_decimal))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(value: &str) -> FieldValue {
        FieldValue::Text(value.to_string())
    }

    #[test]
    fn decimal_rounds_numeric_text() {
        assert_eq!(
            safe_decimal(Some(&text("3.14159")), 2),
            Some(Decimal::new(314, 2))
        );
    }

    #[test]
    fn decimal_tolerates_garbage_and_absence() {
        assert_eq!(safe_decimal(Some(&text("not-a-number")), 2), None);
        assert_eq!(safe_decimal(None, 2), None);
        assert_eq!(safe_decimal(Some(&FieldValue::Float(f64::NAN)), 2), None);
        assert_eq!(safe_decimal(Some(&text("NaN")), 2), None);
        assert_eq!(safe_decimal(Some(&FieldValue::Float(f64::INFINITY)), 2), None);
    }

    #[test]
    fn decimal_keeps_zero() {
        assert_eq!(
            safe_decimal(Some(&FieldValue::Integer(0)), 2),
            Some(Decimal::ZERO)
        );
    }

    #[test]
    fn decimal_from_float_rounds() {
        assert_eq!(
            safe_decimal(Some(&FieldValue::Float(2.0456)), 3),
            Some(Decimal::new(2046, 3))
        );
    }

    #[test]
    fn int_truncates_and_rejects() {
        assert_eq!(safe_int(Some(&FieldValue::Float(152.9))), Some(152));
        assert_eq!(safe_int(Some(&text(" 42 "))), Some(42));
        assert_eq!(safe_int(Some(&text("4.2"))), None);
        assert_eq!(safe_int(Some(&FieldValue::Float(f64::NAN))), None);
        assert_eq!(safe_int(Some(&FieldValue::Float(1e300))), None);
        assert_eq!(safe_int(None), None);
    }

    #[test]
    fn text_drops_blanks() {
        assert_eq!(safe_text(Some(&text("   "))), None);
        assert_eq!(safe_text(Some(&FieldValue::Integer(3905))), Some("3905".into()));
    }

    #[test]
    fn quarter_turn_is_ninety_degrees() {
        let raw = FieldValue::Integer(1 << 30);
        assert_eq!(convert_angular_to_degrees(Some(&raw)), Some(Decimal::new(900, 1)));
    }

    #[test]
    fn zero_angle_is_zero_not_absent() {
        let raw = FieldValue::Integer(0);
        assert_eq!(convert_angular_to_degrees(Some(&raw)), Some(Decimal::ZERO));
        assert_eq!(convert_angular_to_degrees(None), None);
    }

    #[test]
    fn negative_angles_keep_sign() {
        let raw = FieldValue::Integer(-(1 << 30));
        assert_eq!(convert_angular_to_degrees(Some(&raw)), Some(Decimal::from(-90)));
        assert_eq!(angular_to_degrees_f64(Some(&raw)), Some(-90.0));
    }
}
