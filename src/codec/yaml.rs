use super::Codec;
use crate::error::{Error, Result};
use serde_json::Value;

/// YAML codec.
pub struct YamlCodec;

impl Codec for YamlCodec {
    fn mimetypes(&self) -> &[&'static str] {
        &["application/yaml", "text/yaml", "application/x-yaml"]
    }

    fn format(&self) -> &'static str {
        "yaml"
    }

    fn encode(&self, payload: &Value) -> Result<Vec<u8>> {
        serde_yaml::to_string(payload)
            .map(String::into_bytes)
            .map_err(|e| Error::Internal(anyhow::anyhow!("YAML encode failed: {e}")))
    }

    fn decode(&self, body: &[u8]) -> Result<Value> {
        serde_yaml::from_slice(body).map_err(|e| Error::bad_request(format!("malformed YAML body: {e}")))
    }
}
