//! JSON envelope codec
//!
//! Encodes [`ExchangeRequest`]s and decodes [`ProtocolMessage`]s as JSON.
//! Used by the daemon against JSON-speaking backends and bridges, and by the
//! test suites together with the mock transport.

use telebridge_core::{CodecError, ExchangeRequest, MessageCodec, PayloadKind, ProtocolMessage};

/// Codec that speaks the envelope as JSON documents
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl JsonCodec {
    pub fn new() -> Self {
        Self
    }
}

impl MessageCodec for JsonCodec {
    fn encode(&self, request: &ExchangeRequest) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(request).map_err(|e| CodecError::Encode(e.to_string()))
    }

    fn decode(&self, kind: PayloadKind, bytes: &[u8]) -> Result<ProtocolMessage, CodecError> {
        let message: ProtocolMessage =
            serde_json::from_slice(bytes).map_err(|e| CodecError::Decode {
                kind,
                message: e.to_string(),
            })?;

        if let Some(payload) = &message.payload {
            if payload.kind() != kind {
                return Err(CodecError::UnexpectedPayload {
                    expected: kind,
                    actual: payload.kind(),
                });
            }
        }

        Ok(message)
    }
}
