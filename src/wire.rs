//! Wire-format boundary.
//!
//! The rest of the crate works with structured [`Message`]s; this module is
//! the only place that touches serialization.

use hickory_proto::ProtoError;
use hickory_proto::op::Message;
use hickory_proto::serialize::binary::{BinEncodable, BinEncoder};

/// Encode a DNS message to wire-format bytes.
pub fn encode(message: &Message) -> Result<Vec<u8>, ProtoError> {
    let mut buf = Vec::with_capacity(512);
    let mut encoder = BinEncoder::new(&mut buf);
    message.emit(&mut encoder)?;
    Ok(buf)
}

/// Decode wire-format bytes into a DNS message.
pub fn decode(bytes: &[u8]) -> Result<Message, ProtoError> {
    Message::from_vec(bytes)
}
