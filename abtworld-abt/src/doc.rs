//! Top-level document envelope and compression helpers.
//!
//! A document is `[doc name: u16 len + UTF-8][one group tag]`. The root group
//! is written under the document's own name.

use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;

use crate::codec::{Reader, Writer};
use crate::error::{TagError, TagResult};
use crate::tag::{TagGroup, TagType};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TagDoc {
    pub name: String,
    pub root: TagGroup,
}

impl TagDoc {
    pub fn new(name: impl Into<String>, root: TagGroup) -> Self {
        Self { name: name.into(), root }
    }

    pub fn encode(&self) -> TagResult<Vec<u8>> {
        let mut w = Writer::new();
        w.write_name(&self.name)?;
        w.write_group_tag(&self.name, &self.root)?;
        Ok(w.finish())
    }

    pub fn decode(bytes: &[u8]) -> TagResult<Self> {
        let mut r = Reader::new(bytes);
        let name = r.read_name()?;
        let ty = TagType::from_id(r.u8()?)?;
        if ty != TagType::Group {
            return Err(TagError::Malformed(format!(
                "document '{}' root is {:?}, expected Group",
                name, ty
            )));
        }
        // the root group's own name is redundant with the document name
        r.read_name()?;
        let root = r.read_group(0)?;
        r.finish()?;
        Ok(Self { name, root })
    }

    /// Decodes and checks the document name, e.g. `"map"` for world metadata.
    pub fn decode_named(bytes: &[u8], expected: &str) -> TagResult<Self> {
        let doc = Self::decode(bytes)?;
        if doc.name != expected {
            return Err(TagError::UnexpectedDoc {
                expected: expected.to_string(),
                found: doc.name,
            });
        }
        Ok(doc)
    }

    pub fn write_to<W: Write>(&self, mut w: W) -> TagResult<()> {
        w.write_all(&self.encode()?)?;
        w.flush()?;
        Ok(())
    }

    pub fn read_from<R: Read>(mut r: R) -> TagResult<Self> {
        let mut bytes = Vec::new();
        r.read_to_end(&mut bytes)?;
        Self::decode(&bytes)
    }

    pub fn write_gzip<W: Write>(&self, w: W) -> TagResult<()> {
        let mut encoder = GzEncoder::new(w, Compression::default());
        encoder.write_all(&self.encode()?)?;
        encoder.finish()?.flush()?;
        Ok(())
    }

    pub fn to_gzip_bytes(&self) -> TagResult<Vec<u8>> {
        let mut out = Vec::new();
        self.write_gzip(&mut out)?;
        Ok(out)
    }

    /// Decodes either a gzip-compressed or a raw document.
    pub fn from_maybe_gzip(bytes: &[u8]) -> TagResult<Self> {
        if bytes.starts_with(&GZIP_MAGIC) {
            let mut raw = Vec::new();
            GzDecoder::new(bytes).read_to_end(&mut raw).map_err(|e| {
                TagError::Malformed(format!("corrupt gzip stream: {}", e))
            })?;
            Self::decode(&raw)
        } else {
            Self::decode(bytes)
        }
    }
}
