//! Codec collaborator interface

use crate::error::CodecError;
use crate::models::{ExchangeRequest, PayloadKind, ProtocolMessage};

/// Encodes requests and decodes backend responses.
///
/// The binary layout of the messages is owned entirely by the
/// implementation; callers only see [`ProtocolMessage`] envelopes.
pub trait MessageCodec: Send + Sync {
    /// Encode a request into its wire representation
    fn encode(&self, request: &ExchangeRequest) -> Result<Vec<u8>, CodecError>;

    /// Decode a response whose application payload is of `kind`
    fn decode(&self, kind: PayloadKind, bytes: &[u8]) -> Result<ProtocolMessage, CodecError>;
}
