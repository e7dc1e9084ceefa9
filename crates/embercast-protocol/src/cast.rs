//! The CastV2 protobuf envelope.
//!
//! Proto2 message, hand-annotated for prost. All fields are modeled as
//! optional and always populated on send, so every field is present on the
//! wire the way stock sender SDKs expect.

/// The single protobuf envelope exchanged on a CastV2 stream.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CastMessage {
    #[prost(enumeration = "ProtocolVersion", optional, tag = "1")]
    pub protocol_version: ::core::option::Option<i32>,
    /// Identifier chosen by the sender of this message.
    #[prost(string, optional, tag = "2")]
    pub source_id: ::core::option::Option<::prost::alloc::string::String>,
    /// Identifier of the addressed endpoint.
    #[prost(string, optional, tag = "3")]
    pub destination_id: ::core::option::Option<::prost::alloc::string::String>,
    /// URN selecting the handler, e.g. "urn:x-cast:com.google.cast.media".
    #[prost(string, optional, tag = "4")]
    pub namespace: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(enumeration = "PayloadType", optional, tag = "5")]
    pub payload_type: ::core::option::Option<i32>,
    #[prost(string, optional, tag = "6")]
    pub payload_utf8: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(bytes = "vec", optional, tag = "7")]
    pub payload_binary: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ::prost::Enumeration)]
#[repr(i32)]
pub enum ProtocolVersion {
    Castv210 = 0,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ::prost::Enumeration)]
#[repr(i32)]
pub enum PayloadType {
    String = 0,
    Binary = 1,
}

impl CastMessage {
    /// Build a UTF-8 JSON message on `namespace` from `source` to `destination`.
    pub fn utf8(
        namespace: &str,
        source: &str,
        destination: &str,
        payload: impl Into<String>,
    ) -> Self {
        Self {
            protocol_version: Some(ProtocolVersion::Castv210 as i32),
            source_id: Some(source.to_string()),
            destination_id: Some(destination.to_string()),
            namespace: Some(namespace.to_string()),
            payload_type: Some(PayloadType::String as i32),
            payload_utf8: Some(payload.into()),
            payload_binary: None,
        }
    }

    /// Build a reply on the same namespace with source/destination swapped.
    pub fn reply_to(request: &CastMessage, payload: impl Into<String>) -> Self {
        Self::utf8(
            request.namespace.as_deref().unwrap_or(""),
            request.destination_id.as_deref().unwrap_or(""),
            request.source_id.as_deref().unwrap_or(""),
            payload,
        )
    }

    /// The UTF-8 payload, or "" when absent or binary.
    pub fn payload(&self) -> &str {
        self.payload_utf8.as_deref().unwrap_or("")
    }

    /// The namespace URN, or "" when absent.
    pub fn ns(&self) -> &str {
        self.namespace.as_deref().unwrap_or("")
    }
}
