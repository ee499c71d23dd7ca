use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One element of an instant-vector result:
///
/// ```json
/// {"metric": {"service": "advisor"}, "value": [1622104500.123, "120.0"]}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Label set; ordered so debug output and serialization are deterministic.
    pub metric: BTreeMap<String, String>,
    /// `(timestamp, value)`; Prometheus encodes the value as a string.
    pub value: (f64, String),
}

impl Sample {
    pub fn new<I, K, V>(labels: I, timestamp: f64, value: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            metric: labels
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            value: (timestamp, value.into()),
        }
    }

    pub fn label(&self, name: &str) -> Option<&str> {
        self.metric.get(name).map(String::as_str)
    }

    pub fn timestamp(&self) -> f64 {
        self.value.0
    }

    /// The unparsed value string.
    pub fn raw_value(&self) -> &str {
        &self.value.1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_vector_element() {
        let json = r#"{"metric": {"service": "advisor", "job": "gw"}, "value": [1622104500.5, "120.0"]}"#;
        let sample: Sample = serde_json::from_str(json).unwrap();

        assert_eq!(sample.label("service"), Some("advisor"));
        assert_eq!(sample.label("job"), Some("gw"));
        assert_eq!(sample.label("plugin"), None);
        assert_eq!(sample.timestamp(), 1622104500.5);
        assert_eq!(sample.raw_value(), "120.0");
    }

    #[test]
    fn value_must_be_a_pair() {
        let json = r#"{"metric": {}, "value": [1622104500]}"#;
        assert!(serde_json::from_str::<Sample>(json).is_err());
    }

    #[test]
    fn empty_label_set_is_allowed() {
        let json = r#"{"metric": {}, "value": [0, "NaN"]}"#;
        let sample: Sample = serde_json::from_str(json).unwrap();
        assert!(sample.metric.is_empty());
        assert_eq!(sample.raw_value(), "NaN");
    }
}
