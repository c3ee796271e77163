use super::Codec;
use crate::error::{Error, Result};
use serde_json::{Map, Value};

/// URL-encoded form codec.
///
/// Decoding produces a flat string-valued object with last-write-wins on
/// repeated keys. Encoding is limited to flat objects; nested values are
/// serialized as JSON strings.
pub struct FormCodec;

impl Codec for FormCodec {
    fn mimetypes(&self) -> &[&'static str] {
        &["application/x-www-form-urlencoded"]
    }

    fn format(&self) -> &'static str {
        "form"
    }

    fn encode(&self, payload: &Value) -> Result<Vec<u8>> {
        let object = payload
            .as_object()
            .ok_or_else(|| Error::Internal(anyhow::anyhow!("form encoding requires an object payload")))?;
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in object {
            let text = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            serializer.append_pair(key, &text);
        }
        Ok(serializer.finish().into_bytes())
    }

    fn decode(&self, body: &[u8]) -> Result<Value> {
        let mut object = Map::new();
        for (key, value) in url::form_urlencoded::parse(body) {
            object.insert(key.to_string(), Value::String(value.to_string()));
        }
        Ok(Value::Object(object))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_flat_pairs() {
        let value = FormCodec.decode(b"question=A%3F&votes=3").unwrap();
        assert_eq!(value, json!({ "question": "A?", "votes": "3" }));
    }

    #[test]
    fn test_repeated_key_last_write_wins() {
        let value = FormCodec.decode(b"x=1&x=2").unwrap();
        assert_eq!(value, json!({ "x": "2" }));
    }
}
