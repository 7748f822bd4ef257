//! # Boundary Codec
//!
//! Binary encoding for values crossing a process boundary. Nothing is shared
//! by reference: the receiving side always decodes a fresh copy.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Upper bound on a single encoded value.
pub const MAX_ENCODED_SIZE: u64 = 4 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Encoding failed: {0}")]
    Encode(String),

    #[error("Decoding failed: {0}")]
    Decode(String),

    #[error("Encoded size {size} exceeds limit {limit}")]
    TooLarge { size: u64, limit: u64 },
}

/// Encode a value for the wire.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, CodecError> {
    let size = bincode::serialized_size(value).map_err(|e| CodecError::Encode(e.to_string()))?;
    if size > MAX_ENCODED_SIZE {
        return Err(CodecError::TooLarge {
            size,
            limit: MAX_ENCODED_SIZE,
        });
    }
    bincode::serialize(value).map_err(|e| CodecError::Encode(e.to_string()))
}

/// Decode a value received from the wire.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    if bytes.len() as u64 > MAX_ENCODED_SIZE {
        return Err(CodecError::TooLarge {
            size: bytes.len() as u64,
            limit: MAX_ENCODED_SIZE,
        });
    }
    bincode::deserialize(bytes).map_err(|e| CodecError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::NamedMessage;
    use crate::value::ArgumentValue;

    #[test]
    fn test_message_with_every_argument_type_survives() {
        let msg = NamedMessage::with_args(
            "mixed",
            vec![
                ArgumentValue::Bool(true),
                ArgumentValue::Int64(i64::MIN),
                ArgumentValue::Double(-0.25),
                ArgumentValue::String("héllo".into()),
                ArgumentValue::Other,
            ],
        );
        let bytes = encode(&msg).unwrap();
        let decoded: NamedMessage = decode(&bytes).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_truncated_input_is_rejected() {
        let bytes = encode(&NamedMessage::new("roomOpen").with_arg("x")).unwrap();
        let result: Result<NamedMessage, _> = decode(&bytes[..bytes.len() - 1]);
        assert!(matches!(result, Err(CodecError::Decode(_))));
    }

    #[test]
    fn test_oversized_value_is_rejected() {
        let big = "x".repeat(MAX_ENCODED_SIZE as usize + 1);
        let result = encode(&NamedMessage::new("big").with_arg(big));
        assert!(matches!(result, Err(CodecError::TooLarge { .. })));
    }
}
