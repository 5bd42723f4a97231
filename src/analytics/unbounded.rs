//! Serde for ratios that may be infinite.
//!
//! JSON has no infinity, and `serde_json` writes non-finite floats as
//! `null`. Finite values stay numbers; the rest become `"Infinity"`,
//! `"-Infinity"` or `"NaN"`.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serializer};

pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_finite() {
        serializer.serialize_f64(*value)
    } else if value.is_nan() {
        serializer.serialize_str("NaN")
    } else if *value > 0.0 {
        serializer.serialize_str("Infinity")
    } else {
        serializer.serialize_str("-Infinity")
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Repr {
    Number(f64),
    Text(String),
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    match Repr::deserialize(deserializer)? {
        Repr::Number(value) => Ok(value),
        Repr::Text(text) => match text.as_str() {
            "Infinity" => Ok(f64::INFINITY),
            "-Infinity" => Ok(f64::NEG_INFINITY),
            "NaN" => Ok(f64::NAN),
            other => Err(de::Error::custom(format!("invalid ratio: {}", other))),
        },
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Ratio {
        #[serde(with = "super")]
        value: f64,
    }

    #[test]
    fn test_infinite_ratio_is_a_string() {
        let json = serde_json::to_string(&Ratio { value: f64::INFINITY }).unwrap();
        assert_eq!(json, r#"{"value":"Infinity"}"#);

        let back: Ratio = serde_json::from_str(&json).unwrap();
        assert_eq!(back.value, f64::INFINITY);
    }

    #[test]
    fn test_finite_ratio_stays_a_number() {
        let json = serde_json::to_string(&Ratio { value: 1.5 }).unwrap();
        assert_eq!(json, r#"{"value":1.5}"#);

        let back: Ratio = serde_json::from_str(&json).unwrap();
        assert_eq!(back.value, 1.5);
        assert!(serde_json::from_str::<Ratio>(r#"{"value":"huge"}"#).is_err());
    }
}
