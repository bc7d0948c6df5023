use abtworld_abt::{TagDoc, TagError, TagGroup, TagResult};
use abtworld_chunk::{ChunkPos, stored_pos};
use abtworld_storage::CHUNK_DOC;

use crate::error::WorldResult;

/// Leading byte of a chunk request frame.
pub const CHUNK_REQUEST_ID: u8 = 0xFD;

/// Asks the server for one chunk. Sending the same request twice is harmless.
///
/// Frame: `[0xFD][x: i64 BE][y: i64 BE][z: i64 BE]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkRequest {
    pub pos: ChunkPos,
}

impl ChunkRequest {
    pub const ENCODED_LEN: usize = 1 + 3 * 8;

    pub fn new(pos: ChunkPos) -> Self {
        Self { pos }
    }

    pub fn encode(&self) -> [u8; Self::ENCODED_LEN] {
        let mut out = [0u8; Self::ENCODED_LEN];
        out[0] = CHUNK_REQUEST_ID;
        out[1..9].copy_from_slice(&self.pos.x.to_be_bytes());
        out[9..17].copy_from_slice(&self.pos.y.to_be_bytes());
        out[17..25].copy_from_slice(&self.pos.z.to_be_bytes());
        out
    }

    pub fn decode(bytes: &[u8]) -> TagResult<Self> {
        let frame: &[u8; Self::ENCODED_LEN] = bytes.try_into().map_err(|_| {
            TagError::Malformed(format!(
                "chunk request is {} bytes, expected {}",
                bytes.len(),
                Self::ENCODED_LEN
            ))
        })?;
        if frame[0] != CHUNK_REQUEST_ID {
            return Err(TagError::Malformed(format!(
                "packet id 0x{:02x} is not a chunk request",
                frame[0]
            )));
        }
        let coord = |at: usize| {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(&frame[at..at + 8]);
            i64::from_be_bytes(buf)
        };
        Ok(Self::new(ChunkPos::new(coord(1), coord(9), coord(17))))
    }
}

/// Chunk data pushed by the server, in the same group layout as a chunk file.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkDelivery {
    pub pos: ChunkPos,
    pub data: TagGroup,
}

impl ChunkDelivery {
    /// Gzip-compressed `map_c` document.
    pub fn encode(&self) -> TagResult<Vec<u8>> {
        TagDoc::new(CHUNK_DOC, self.data.clone()).to_gzip_bytes()
    }

    /// Coordinates come from the chunk group itself.
    pub fn decode(bytes: &[u8]) -> WorldResult<Self> {
        let doc = TagDoc::from_maybe_gzip(bytes)?;
        if doc.name != CHUNK_DOC {
            return Err(TagError::UnexpectedDoc {
                expected: CHUNK_DOC.to_string(),
                found: doc.name,
            }
            .into());
        }
        let pos = stored_pos(&doc.root)?;
        Ok(Self { pos, data: doc.root })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use abtworld_chunk::Chunk;

    #[test]
    fn test_request_frame_layout() {
        let frame = ChunkRequest::new(ChunkPos::new(1, -1, 256)).encode();
        assert_eq!(frame[0], 0xFD);
        assert_eq!(&frame[1..9], &[0, 0, 0, 0, 0, 0, 0, 1]);
        assert_eq!(&frame[9..17], &[0xff; 8]);
        assert_eq!(&frame[17..25], &[0, 0, 0, 0, 0, 0, 1, 0]);
        assert_eq!(ChunkRequest::decode(&frame).unwrap().pos, ChunkPos::new(1, -1, 256));
    }

    #[test]
    fn test_request_rejects_bad_frames() {
        let mut frame = ChunkRequest::new(ChunkPos::new(0, 0, 0)).encode();
        assert!(ChunkRequest::decode(&frame[..24]).unwrap_err().is_malformed());

        let mut long = frame.to_vec();
        long.push(0);
        assert!(ChunkRequest::decode(&long).is_err());

        frame[0] = 0x01;
        assert!(ChunkRequest::decode(&frame).is_err());
    }

    #[test]
    fn test_delivery_reads_coordinates_from_group() {
        let pos = ChunkPos::new(-4, 2, 0);
        let mut chunk = Chunk::new(pos);
        chunk.set_area(3, 3, 1, "harbour");
        let bytes = ChunkDelivery { pos, data: chunk.save() }.encode().unwrap();

        let delivery = ChunkDelivery::decode(&bytes).unwrap();
        assert_eq!(delivery.pos, pos);
        assert_eq!(delivery.data, chunk.save());
    }

    #[test]
    fn test_delivery_rejects_other_docs() {
        let bytes = TagDoc::new("map", Chunk::new(ChunkPos::new(0, 0, 0)).save())
            .encode()
            .unwrap();
        assert!(ChunkDelivery::decode(&bytes).is_err());
    }
}
