//! Message schema for `lavanet.lava.pairing.BadgeGenerator/GenerateBadge`.
//!
//! Nested messages the relay never inspects (`get_pairing_response`, `spec`)
//! are kept as raw bytes, so re-serializing a response reproduces them
//! exactly.

use crate::codec::ProjectScoped;
use crate::transport::MethodDescriptor;

/// The badge generation RPC.
pub const GENERATE_BADGE: MethodDescriptor =
    MethodDescriptor::new("lavanet.lava.pairing.BadgeGenerator", "GenerateBadge");

/// Request for a badge.
#[derive(Clone, PartialEq, prost::Message)]
pub struct GenerateBadgeRequest {
    #[prost(string, tag = "1")]
    pub badge_address: String,
    #[prost(string, tag = "2")]
    pub project_id: String,
    #[prost(string, tag = "3")]
    pub spec_id: String,
}

impl ProjectScoped for GenerateBadgeRequest {
    fn set_project_id(&mut self, project_id: &str) {
        self.project_id = project_id.to_string();
    }
}

/// Response carrying the signed badge.
#[derive(Clone, PartialEq, prost::Message)]
pub struct GenerateBadgeResponse {
    #[prost(message, optional, tag = "1")]
    pub badge: Option<Badge>,
    #[prost(bytes = "vec", tag = "2")]
    pub get_pairing_response: Vec<u8>,
    #[prost(string, tag = "3")]
    pub badge_signer_address: String,
    #[prost(bytes = "vec", tag = "4")]
    pub spec: Vec<u8>,
}

/// A signed compute-unit allowance for a consumer address.
#[derive(Clone, PartialEq, prost::Message)]
pub struct Badge {
    #[prost(uint64, tag = "1")]
    pub cu_allocation: u64,
    #[prost(uint64, tag = "2")]
    pub epoch: u64,
    #[prost(string, tag = "3")]
    pub address: String,
    #[prost(string, tag = "4")]
    pub lava_chain_id: String,
    #[prost(bytes = "vec", tag = "5")]
    pub project_sig: Vec<u8>,
    #[prost(uint64, tag = "6")]
    pub virtual_epoch: u64,
}
