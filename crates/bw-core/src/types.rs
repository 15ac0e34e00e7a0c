use serde::{Deserialize, Serialize};

/// Serialized interpreter snapshot. Produced and consumed only by the
/// interpreter; everything else treats it as opaque bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateBlob(String);

impl StateBlob {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceItem {
    pub index: usize,
    pub text: String,
}

#[cfg(test)]
mod types_tests {
    use super::*;

    #[test]
    fn state_blob_serializes_as_plain_string() {
        let blob = StateBlob::new(r#"{"knot":"intro"}"#);
        let json = serde_json::to_string(&blob).expect("blob should serialize");
        assert_eq!(json, r#""{\"knot\":\"intro\"}""#);

        let parsed: StateBlob = serde_json::from_str(&json).expect("blob should parse");
        assert_eq!(parsed, blob);
        assert_eq!(parsed.len(), 16);
        assert!(!parsed.is_empty());
    }

    #[test]
    fn choice_item_uses_camel_case_fields() {
        let item = ChoiceItem {
            index: 1,
            text: "Go left".to_string(),
        };
        let value = serde_json::to_value(&item).expect("choice should serialize");
        assert_eq!(value["index"], 1);
        assert_eq!(value["text"], "Go left");
    }
}
