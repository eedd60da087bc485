// Message types for `chord.proto`. Keep in sync with the schema file.
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NodeInfo {
    #[prost(string, tag = "1")]
    pub address: ::prost::alloc::string::String,
    #[prost(uint64, tag = "2")]
    pub digest: u64,
    #[prost(uint64, tag = "3")]
    pub parent_digest: u64,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FindSuccessorRequest {
    #[prost(uint64, tag = "1")]
    pub request_id: u64,
    #[prost(message, optional, tag = "2")]
    pub initiator: ::core::option::Option<NodeInfo>,
    #[prost(message, optional, tag = "3")]
    pub recipient: ::core::option::Option<NodeInfo>,
    #[prost(uint64, tag = "4")]
    pub search_digest: u64,
    #[prost(uint32, tag = "5")]
    pub hops: u32,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FindSuccessorResponse {
    #[prost(uint64, tag = "1")]
    pub request_id: u64,
    #[prost(uint64, tag = "2")]
    pub search_digest: u64,
    #[prost(message, optional, tag = "3")]
    pub successor: ::core::option::Option<NodeInfo>,
    #[prost(uint32, tag = "4")]
    pub hops: u32,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct WireMessage {
    #[prost(uint32, tag = "1")]
    pub version: u32,
    #[prost(oneof = "wire_message::Body", tags = "2, 3")]
    pub body: ::core::option::Option<wire_message::Body>,
}
/// Nested message and enum types in `WireMessage`.
pub mod wire_message {
    #[allow(clippy::derive_partial_eq_without_eq)]
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Body {
        #[prost(message, tag = "2")]
        FindSuccessor(super::FindSuccessorRequest),
        #[prost(message, tag = "3")]
        Successor(super::FindSuccessorResponse),
    }
}
