//! Wire format of the routed envelope.
//!
//! An envelope has two parts: the destination's 4-byte identity followed by a
//! protobuf-encoded [`chord::WireMessage`]. The transport adds its own length
//! prefix when framing envelopes on a stream.

pub mod chord;
pub mod conversions;

use crate::chord::types::{FindSuccessorCommand, Identity, SuccessorResponse};
use crate::error::MessageError;
use bytes::{BufMut, Bytes, BytesMut};
use prost::Message as _;

use self::chord::{wire_message::Body, WireMessage};

/// Schema version written into every message.
pub const WIRE_VERSION: u32 = 1;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Message {
    FindSuccessor(FindSuccessorCommand),
    Successor(SuccessorResponse),
}

impl Message {
    pub fn request_id(&self) -> u64 {
        match self {
            Message::FindSuccessor(cmd) => cmd.request_id,
            Message::Successor(resp) => resp.request_id,
        }
    }

    pub fn to_wire(&self) -> WireMessage {
        let body = match self.clone() {
            Message::FindSuccessor(cmd) => Body::FindSuccessor(cmd.into()),
            Message::Successor(resp) => Body::Successor(resp.into()),
        };
        WireMessage {
            version: WIRE_VERSION,
            body: Some(body),
        }
    }

    pub fn from_wire(wire: WireMessage) -> Result<Self, MessageError> {
        if wire.version != WIRE_VERSION {
            return Err(MessageError::UnsupportedVersion(wire.version));
        }
        match wire.body {
            Some(Body::FindSuccessor(req)) => Ok(Message::FindSuccessor(req.try_into()?)),
            Some(Body::Successor(resp)) => Ok(Message::Successor(resp.into())),
            None => Err(MessageError::InvalidFormat("message without body".into())),
        }
    }
}

/// A message together with the identity it is routed to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Envelope {
    pub identity: Identity,
    pub message: Message,
}

impl Envelope {
    pub fn new(identity: Identity, message: Message) -> Self {
        Self { identity, message }
    }

    pub fn encode(&self) -> Result<Bytes, MessageError> {
        let wire = self.message.to_wire();
        let mut buf = BytesMut::with_capacity(Identity::WIRE_SIZE + wire.encoded_len());
        buf.put_slice(&self.identity.to_bytes());
        wire.encode(&mut buf)
            .map_err(|e| MessageError::SerializationFailed(e.to_string()))?;
        Ok(buf.freeze())
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, MessageError> {
        if bytes.len() < Identity::WIRE_SIZE {
            return Err(MessageError::InvalidFormat(format!(
                "envelope of {} bytes has no routing prefix",
                bytes.len()
            )));
        }
        let (prefix, payload) = bytes.split_at(Identity::WIRE_SIZE);
        let mut identity = [0u8; 4];
        identity.copy_from_slice(prefix);

        let wire = WireMessage::decode(payload)?;
        Ok(Self {
            identity: Identity::from_bytes(identity),
            message: Message::from_wire(wire)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chord::types::RoutingInfo;
    use prost::Message as _;

    fn command() -> FindSuccessorCommand {
        FindSuccessorCommand::new(
            7,
            RoutingInfo::new("127.0.0.1:5550", 256),
            RoutingInfo::new("127.0.0.1:7000", 1),
            150,
        )
    }

    #[test]
    fn envelope_starts_with_the_packed_identity() {
        let envelope = Envelope::new(Identity(1), Message::FindSuccessor(command()));
        let bytes = envelope.encode().unwrap();
        assert_eq!(&bytes[..4], &[1, 0, 0, 0]);
        assert_eq!(Envelope::decode(&bytes).unwrap(), envelope);
    }

    #[test]
    fn response_keeps_the_sentinel() {
        let response = SuccessorResponse {
            request_id: 3,
            search_digest: 40,
            successor: RoutingInfo::empty(),
            hops: 0,
        };
        let envelope = Envelope::new(Identity(256), Message::Successor(response));
        let decoded = Envelope::decode(&envelope.encode().unwrap()).unwrap();
        match decoded.message {
            Message::Successor(resp) => assert!(resp.successor.is_empty()),
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[test]
    fn rejects_unknown_versions() {
        let mut wire = Message::FindSuccessor(command()).to_wire();
        wire.version = 2;
        let mut bytes = Identity(1).to_bytes().to_vec();
        bytes.extend(wire.encode_to_vec());
        assert!(matches!(
            Envelope::decode(&bytes),
            Err(MessageError::UnsupportedVersion(2))
        ));
    }

    #[test]
    fn rejects_truncated_envelopes() {
        assert!(matches!(
            Envelope::decode(&[1, 0]),
            Err(MessageError::InvalidFormat(_))
        ));
        let missing_initiator = WireMessage {
            version: WIRE_VERSION,
            body: Some(Body::FindSuccessor(chord::FindSuccessorRequest::default())),
        };
        let mut bytes = Identity(1).to_bytes().to_vec();
        bytes.extend(missing_initiator.encode_to_vec());
        assert!(matches!(
            Envelope::decode(&bytes),
            Err(MessageError::InvalidFormat(_))
        ));
    }
}
