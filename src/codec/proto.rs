//! Protobuf capability for the messages carried through the bridge.
//!
//! The bridge only needs two things from a message type: turn bytes into an
//! instance and an instance back into bytes. Every `prost` message gets both
//! through a blanket implementation.

use bytes::Bytes;

use crate::error::Result;

/// Serialize/deserialize capability for carried RPC messages.
pub trait ProtoMessage: Sized + Send + 'static {
    /// Serialize to the protobuf binary form.
    fn serialize_to_bytes(&self) -> Bytes;

    /// Deserialize from the protobuf binary form.
    fn deserialize_from_bytes(bytes: &[u8]) -> Result<Self>;
}

impl<M> ProtoMessage for M
where
    M: prost::Message + Default + Send + 'static,
{
    fn serialize_to_bytes(&self) -> Bytes {
        Bytes::from(self.encode_to_vec())
    }

    fn deserialize_from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(M::decode(bytes)?)
    }
}

/// Requests that carry a project identifier injected before transmission.
pub trait ProjectScoped {
    /// Overwrite the project identifier.
    fn set_project_id(&mut self, project_id: &str);
}
