//! `tokio_util` framing for byte streams carrying back-to-back RAIL PDUs.
//!
//! Frames are split on `orderLength`; decoding the payload is left to
//! [`crate::decode_client_pdu`] or [`crate::decode_server_pdu`] so that a
//! bad payload does not poison the stream.

use bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::client::{encode_client_pdu, ClientPdu};
use crate::codec::{CodecConfig, HEADER_SIZE};
use crate::error::{DecodeError, PduError};
use crate::server::{encode_server_pdu, ServerPdu};

/// Length-delimited RAIL PDU framer.
#[derive(Debug, Clone, Default)]
pub struct RailCodec {
    config: CodecConfig,
}

impl RailCodec {
    pub fn new(config: CodecConfig) -> Self {
        Self { config }
    }
}

impl Decoder for RailCodec {
    type Item = Bytes;
    type Error = PduError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < HEADER_SIZE {
            return Ok(None);
        }

        let order_length = usize::from(u16::from_le_bytes([src[2], src[3]]));
        if order_length < HEADER_SIZE {
            return Err(DecodeError::Inconsistent(format!(
                "orderLength {order_length} is shorter than the header"
            ))
            .into());
        }
        if order_length > self.config.max_pdu_size {
            return Err(PduError::TooLarge {
                size: order_length,
                max: self.config.max_pdu_size,
            });
        }
        if src.len() < order_length {
            src.reserve(order_length - src.len());
            return Ok(None);
        }

        Ok(Some(src.split_to(order_length).freeze()))
    }
}

impl Encoder<ClientPdu> for RailCodec {
    type Error = PduError;

    fn encode(&mut self, item: ClientPdu, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.extend_from_slice(&encode_client_pdu(&item)?);
        Ok(())
    }
}

impl Encoder<ServerPdu> for RailCodec {
    type Error = PduError;

    fn encode(&mut self, item: ServerPdu, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.extend_from_slice(&encode_server_pdu(&item)?);
        Ok(())
    }
}
