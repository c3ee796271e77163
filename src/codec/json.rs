use super::Codec;
use crate::error::{Error, Result};
use serde_json::Value;

/// JSON codec; the registry default.
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn mimetypes(&self) -> &[&'static str] {
        &["application/json", "text/json"]
    }

    fn format(&self) -> &'static str {
        "json"
    }

    fn encode(&self, payload: &Value) -> Result<Vec<u8>> {
        serde_json::to_vec(payload)
            .map_err(|e| Error::Internal(anyhow::anyhow!("JSON encode failed: {e}")))
    }

    fn decode(&self, body: &[u8]) -> Result<Value> {
        serde_json::from_slice(body).map_err(|e| Error::bad_request(format!("malformed JSON body: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_round_trip() {
        let codec = JsonCodec;
        let payload = json!({ "a": 1 });
        let bytes = codec.encode(&payload).unwrap();
        assert_eq!(codec.decode(&bytes).unwrap(), payload);
    }

    #[test]
    fn test_malformed_body_is_bad_request() {
        let err = JsonCodec.decode(b"{not json").unwrap_err();
        assert_eq!(err.status(), 400);
    }
}
