//! Length-delimited protobuf codec for the CastV2 stream.
//!
//! Wire format: 4-byte big-endian length prefix + serialized CastMessage.
//! Framing is independent of content: a frame whose protobuf fails to decode
//! is skipped without desynchronizing the stream.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use prost::Message;
use tokio_util::codec::{Decoder, Encoder};

use crate::cast::CastMessage;
use crate::{ProtocolError, MAX_FRAME_SIZE};

/// Length prefix size in bytes.
const LENGTH_PREFIX_SIZE: usize = 4;

/// Codec for framing CastMessage values over a byte stream.
pub struct CastCodec;

impl Decoder for CastCodec {
    type Item = CastMessage;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            // Need at least the length prefix
            if src.len() < LENGTH_PREFIX_SIZE {
                return Ok(None);
            }

            // Peek at the length
            let length = u32::from_be_bytes([src[0], src[1], src[2], src[3]]) as usize;

            if length > MAX_FRAME_SIZE {
                return Err(ProtocolError::FrameTooLarge {
                    size: length,
                    max: MAX_FRAME_SIZE,
                });
            }

            // Check if we have the full frame
            let total = LENGTH_PREFIX_SIZE + length;
            if src.len() < total {
                src.reserve(total - src.len());
                return Ok(None);
            }

            src.advance(LENGTH_PREFIX_SIZE);
            let frame = src.split_to(length);

            match CastMessage::decode(frame.as_ref()) {
                Ok(msg) => return Ok(Some(msg)),
                Err(e) => {
                    // Valid frame, broken content. Skip it and keep parsing.
                    tracing::debug!("skipping undecodable frame ({length} bytes): {e}");
                }
            }
        }
    }
}

impl Encoder<CastMessage> for CastCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: CastMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let len = item.encoded_len();

        if len > MAX_FRAME_SIZE {
            return Err(ProtocolError::FrameTooLarge {
                size: len,
                max: MAX_FRAME_SIZE,
            });
        }

        dst.reserve(LENGTH_PREFIX_SIZE + len);
        dst.put_u32(len as u32);
        item.encode(dst)?;

        Ok(())
    }
}

/// Encode a single message into one contiguous buffer sized `4 + payload_len`.
pub fn encode_frame(msg: &CastMessage) -> Result<Bytes, ProtocolError> {
    let len = msg.encoded_len();

    if len > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge {
            size: len,
            max: MAX_FRAME_SIZE,
        });
    }

    let mut buf = BytesMut::with_capacity(LENGTH_PREFIX_SIZE + len);
    buf.put_u32(len as u32);
    msg.encode(&mut buf)?;
    Ok(buf.freeze())
}
