//! Streaming JSON codec for `Query` envelopes.
//!
//! - Inbound: one JSON object at a time, no delimiter required between objects
//! - A complete object that does not fit the envelope schema is surfaced as
//!   `Inbound::Malformed` so the session can drop it and keep reading
//! - Broken JSON syntax is a transport error (the stream cannot be resynced)
//! - Outbound: compact JSON followed by `\n`

use bytes::{Buf, BufMut, BytesMut};
use serde::de::IgnoredAny;
use tokio_util::codec::{Decoder, Encoder};

use prisclient_core::error::{PrisError, Result};
use prisclient_core::protocol::query::Query;

/// Upper bound on a single buffered envelope.
pub const MAX_FRAME_BYTES: usize = 1 << 20;

#[derive(Debug)]
pub enum Inbound {
    Query(Query),
    Malformed(String),
}

#[derive(Debug, Default, Clone, Copy)]
pub struct QueryCodec;

impl QueryCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for QueryCodec {
    type Item = Inbound;
    type Error = PrisError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Inbound>> {
        let skip = src.iter().take_while(|b| b.is_ascii_whitespace()).count();
        src.advance(skip);

        let Some(&first) = src.first() else {
            return Ok(None);
        };
        if first != b'{' {
            return Err(PrisError::Decode(format!(
                "expected a JSON object, found byte 0x{first:02x}"
            )));
        }

        // Find where the first complete value ends without building it yet.
        let end = {
            let mut stream =
                serde_json::Deserializer::from_slice(&src[..]).into_iter::<IgnoredAny>();
            match stream.next() {
                Some(Ok(_)) => stream.byte_offset(),
                Some(Err(e)) if e.is_eof() => {
                    if src.len() > MAX_FRAME_BYTES {
                        return Err(PrisError::Decode("envelope exceeds max frame size".into()));
                    }
                    return Ok(None);
                }
                Some(Err(e)) => return Err(PrisError::Decode(e.to_string())),
                None => return Ok(None),
            }
        };

        let frame = src.split_to(end);
        match serde_json::from_slice::<Query>(&frame) {
            Ok(q) => Ok(Some(Inbound::Query(q))),
            Err(e) => Ok(Some(Inbound::Malformed(e.to_string()))),
        }
    }
}

impl Encoder<Query> for QueryCodec {
    type Error = PrisError;

    fn encode(&mut self, item: Query, dst: &mut BytesMut) -> Result<()> {
        let buf = serde_json::to_vec(&item)
            .map_err(|e| PrisError::Internal(format!("json encode failed: {e}")))?;
        dst.reserve(buf.len() + 1);
        dst.extend_from_slice(&buf);
        dst.put_u8(b'\n');
        Ok(())
    }
}
