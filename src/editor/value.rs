use anyhow::{Context, Result};
use exif::Value;
use serde::{Deserialize, Serialize};

/// Typed EXIF value as written in the editor CSV.
///
/// The text form is a one-key JSON object naming the EXIF type:
///
/// ```rust
/// use exif_scrub::editor::TagValue;
///
/// let v = TagValue::parse(r#"{"rational":[[35,1],[41,1]]}"#).unwrap();
/// assert_eq!(v, TagValue::Rational(vec![(35, 1), (41, 1)]));
/// assert_eq!(v.to_text().unwrap(), r#"{"rational":[[35,1],[41,1]]}"#);
///
/// // Anything that is not a well-formed literal is rejected
/// assert!(TagValue::parse("__import__('os')").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagValue {
    Byte(Vec<u8>),
    Ascii(Vec<String>),
    Short(Vec<u16>),
    Long(Vec<u32>),
    Rational(Vec<(u32, u32)>),
    SByte(Vec<i8>),
    Undefined(Vec<u8>),
    SShort(Vec<i16>),
    SLong(Vec<i32>),
    SRational(Vec<(i32, i32)>),
    Float(Vec<f32>),
    Double(Vec<f64>),
}

impl TagValue {
    /// Convert a decoded EXIF value. `Unknown` values have no writable form.
    pub fn from_value(value: &Value) -> Option<Self> {
        Some(match value {
            Value::Byte(v) => Self::Byte(v.clone()),
            Value::Ascii(v) => Self::Ascii(
                v.iter()
                    .map(|s| String::from_utf8_lossy(s).to_string())
                    .collect(),
            ),
            Value::Short(v) => Self::Short(v.clone()),
            Value::Long(v) => Self::Long(v.clone()),
            Value::Rational(v) => Self::Rational(v.iter().map(|r| (r.num, r.denom)).collect()),
            Value::SByte(v) => Self::SByte(v.clone()),
            Value::Undefined(v, _) => Self::Undefined(v.clone()),
            Value::SShort(v) => Self::SShort(v.clone()),
            Value::SLong(v) => Self::SLong(v.clone()),
            Value::SRational(v) => Self::SRational(v.iter().map(|r| (r.num, r.denom)).collect()),
            Value::Float(v) => Self::Float(v.clone()),
            Value::Double(v) => Self::Double(v.clone()),
            Value::Unknown(..) => return None,
        })
    }

    /// Convert back into a value the EXIF writer accepts.
    pub fn into_value(self) -> Value {
        match self {
            Self::Byte(v) => Value::Byte(v),
            Self::Ascii(v) => Value::Ascii(v.into_iter().map(String::into_bytes).collect()),
            Self::Short(v) => Value::Short(v),
            Self::Long(v) => Value::Long(v),
            Self::Rational(v) => Value::Rational(
                v.into_iter()
                    .map(|(num, denom)| exif::Rational { num, denom })
                    .collect(),
            ),
            Self::SByte(v) => Value::SByte(v),
            Self::Undefined(v) => Value::Undefined(v, 0),
            Self::SShort(v) => Value::SShort(v),
            Self::SLong(v) => Value::SLong(v),
            Self::SRational(v) => Value::SRational(
                v.into_iter()
                    .map(|(num, denom)| exif::SRational { num, denom })
                    .collect(),
            ),
            Self::Float(v) => Value::Float(v),
            Self::Double(v) => Value::Double(v),
        }
    }

    pub fn to_text(&self) -> Result<String> {
        serde_json::to_string(self).context("Failed to serialize tag value")
    }

    /// Decode the CSV text form.
    pub fn parse(text: &str) -> Result<Self> {
        serde_json::from_str(text.trim())
            .with_context(|| format!("Invalid tag value literal: {}", preview(text)))
    }
}

fn preview(text: &str) -> String {
    const MAX: usize = 40;
    if text.chars().count() > MAX {
        format!("{}...", text.chars().take(MAX).collect::<String>())
    } else {
        text.to_string()
    }
}
