//! Binary layout of a single tag:
//!
//! ```text
//! [type: u8][name length: u16][name: UTF-8][payload]
//! ```
//!
//! Fixed-width numbers are big-endian. Strings, byte arrays and big integers
//! are `[len: u32][bytes]`, numeric arrays `[count: u32][elements]` and groups
//! `[count: u32][child tags]`.

use crate::error::{TagError, TagResult};
use crate::tag::{Tag, TagGroup, TagType, TagValue};

/// Groups nested deeper than this are rejected while decoding. Decoding
/// recurses once per level, so this also bounds stack use on small thread
/// stacks.
pub const MAX_DEPTH: usize = 64;

// type byte + empty name length
const MIN_TAG_BYTES: usize = 3;

pub fn encode(tag: &Tag) -> TagResult<Vec<u8>> {
    let mut w = Writer::new();
    w.write_tag(tag)?;
    Ok(w.finish())
}

/// Decodes exactly one tag; trailing bytes are an error.
pub fn decode(bytes: &[u8]) -> TagResult<Tag> {
    let mut r = Reader::new(bytes);
    let tag = r.read_tag(0)?;
    r.finish()?;
    Ok(tag)
}

pub(crate) struct Writer {
    out: Vec<u8>,
}

impl Writer {
    pub(crate) fn new() -> Self {
        Self { out: Vec::new() }
    }

    pub(crate) fn finish(self) -> Vec<u8> {
        self.out
    }

    pub(crate) fn write_name(&mut self, name: &str) -> TagResult<()> {
        let len = u16::try_from(name.len()).map_err(|_| {
            TagError::Malformed(format!("tag name of {} bytes exceeds {}", name.len(), u16::MAX))
        })?;
        self.out.extend_from_slice(&len.to_be_bytes());
        self.out.extend_from_slice(name.as_bytes());
        Ok(())
    }

    fn write_len(&mut self, len: usize) -> TagResult<()> {
        let len = u32::try_from(len)
            .map_err(|_| TagError::Malformed(format!("length {} exceeds {}", len, u32::MAX)))?;
        self.out.extend_from_slice(&len.to_be_bytes());
        Ok(())
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> TagResult<()> {
        self.write_len(bytes.len())?;
        self.out.extend_from_slice(bytes);
        Ok(())
    }

    pub(crate) fn write_tag(&mut self, tag: &Tag) -> TagResult<()> {
        self.out.push(tag.tag_type().id());
        self.write_name(&tag.name)?;
        self.write_payload(&tag.value)
    }

    pub(crate) fn write_group_tag(&mut self, name: &str, group: &TagGroup) -> TagResult<()> {
        self.out.push(TagType::Group.id());
        self.write_name(name)?;
        self.write_group(group)
    }

    fn write_group(&mut self, group: &TagGroup) -> TagResult<()> {
        self.write_len(group.len())?;
        for child in group {
            self.write_tag(child)?;
        }
        Ok(())
    }

    fn write_payload(&mut self, value: &TagValue) -> TagResult<()> {
        match value {
            TagValue::Group(g) => self.write_group(g)?,
            TagValue::Byte(v) => self.out.extend_from_slice(&v.to_be_bytes()),
            TagValue::Short(v) => self.out.extend_from_slice(&v.to_be_bytes()),
            TagValue::Int(v) => self.out.extend_from_slice(&v.to_be_bytes()),
            TagValue::Long(v) => self.out.extend_from_slice(&v.to_be_bytes()),
            TagValue::Float(v) => self.out.extend_from_slice(&v.to_be_bytes()),
            TagValue::Double(v) => self.out.extend_from_slice(&v.to_be_bytes()),
            TagValue::Boolean(v) => self.out.push(u8::from(*v)),
            TagValue::String(s) => self.write_bytes(s.as_bytes())?,
            TagValue::ByteArray(b) | TagValue::BigInt(b) => self.write_bytes(b)?,
            TagValue::IntArray(v) => {
                self.write_len(v.len())?;
                v.iter().for_each(|x| self.out.extend_from_slice(&x.to_be_bytes()));
            }
            TagValue::LongArray(v) => {
                self.write_len(v.len())?;
                v.iter().for_each(|x| self.out.extend_from_slice(&x.to_be_bytes()));
            }
            TagValue::FloatArray(v) => {
                self.write_len(v.len())?;
                v.iter().for_each(|x| self.out.extend_from_slice(&x.to_be_bytes()));
            }
            TagValue::DoubleArray(v) => {
                self.write_len(v.len())?;
                v.iter().for_each(|x| self.out.extend_from_slice(&x.to_be_bytes()));
            }
        }
        Ok(())
    }
}

pub(crate) struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> TagResult<&'a [u8]> {
        if n > self.remaining() {
            return Err(TagError::Malformed(format!(
                "need {} bytes at offset {}, only {} left",
                n,
                self.pos,
                self.remaining()
            )));
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> TagResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub(crate) fn u8(&mut self) -> TagResult<u8> {
        Ok(self.array::<1>()?[0])
    }

    fn u32(&mut self) -> TagResult<u32> {
        Ok(u32::from_be_bytes(self.array()?))
    }

    /// Reads a `u32` count and checks that `count * width` bytes can follow.
    fn count(&mut self, width: usize) -> TagResult<usize> {
        let count = self.u32()? as usize;
        if count.saturating_mul(width) > self.remaining() {
            return Err(TagError::Malformed(format!(
                "count {} at offset {} runs past end of buffer",
                count, self.pos
            )));
        }
        Ok(count)
    }

    fn utf8(&self, bytes: &[u8]) -> TagResult<String> {
        String::from_utf8(bytes.to_vec()).map_err(|e| {
            TagError::Malformed(format!("invalid UTF-8 before offset {}: {}", self.pos, e))
        })
    }

    pub(crate) fn read_name(&mut self) -> TagResult<String> {
        let len = u16::from_be_bytes(self.array()?) as usize;
        let bytes = self.take(len)?;
        self.utf8(bytes)
    }

    fn read_bytes(&mut self) -> TagResult<Vec<u8>> {
        let len = self.count(1)?;
        Ok(self.take(len)?.to_vec())
    }

    fn read_array<T, const N: usize>(&mut self, convert: fn([u8; N]) -> T) -> TagResult<Vec<T>> {
        let count = self.count(N)?;
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            out.push(convert(self.array::<N>()?));
        }
        Ok(out)
    }

    pub(crate) fn read_tag(&mut self, depth: usize) -> TagResult<Tag> {
        let ty = TagType::from_id(self.u8()?)?;
        let name = self.read_name()?;
        let value = self.read_payload(ty, depth)?;
        Ok(Tag { name, value })
    }

    pub(crate) fn read_group(&mut self, depth: usize) -> TagResult<TagGroup> {
        if depth >= MAX_DEPTH {
            return Err(TagError::Malformed(format!("groups nested deeper than {}", MAX_DEPTH)));
        }
        let count = self.count(MIN_TAG_BYTES)?;
        let mut group = TagGroup::with_capacity(count);
        for _ in 0..count {
            group.add(self.read_tag(depth + 1)?);
        }
        Ok(group)
    }

    fn read_payload(&mut self, ty: TagType, depth: usize) -> TagResult<TagValue> {
        let value = match ty {
            TagType::Group => TagValue::Group(self.read_group(depth)?),
            TagType::Byte => TagValue::Byte(i8::from_be_bytes(self.array()?)),
            TagType::Short => TagValue::Short(i16::from_be_bytes(self.array()?)),
            TagType::Int => TagValue::Int(i32::from_be_bytes(self.array()?)),
            TagType::Long => TagValue::Long(i64::from_be_bytes(self.array()?)),
            TagType::Float => TagValue::Float(f32::from_be_bytes(self.array()?)),
            TagType::Double => TagValue::Double(f64::from_be_bytes(self.array()?)),
            TagType::Boolean => match self.u8()? {
                0 => TagValue::Boolean(false),
                1 => TagValue::Boolean(true),
                other => {
                    return Err(TagError::Malformed(format!(
                        "boolean byte {} at offset {}",
                        other,
                        self.pos - 1
                    )));
                }
            },
            TagType::String => {
                let bytes = self.read_bytes()?;
                TagValue::String(self.utf8(&bytes)?)
            }
            TagType::ByteArray => TagValue::ByteArray(self.read_bytes()?),
            TagType::BigInt => TagValue::BigInt(self.read_bytes()?),
            TagType::IntArray => TagValue::IntArray(self.read_array(i32::from_be_bytes)?),
            TagType::LongArray => TagValue::LongArray(self.read_array(i64::from_be_bytes)?),
            TagType::FloatArray => TagValue::FloatArray(self.read_array(f32::from_be_bytes)?),
            TagType::DoubleArray => TagValue::DoubleArray(self.read_array(f64::from_be_bytes)?),
        };
        Ok(value)
    }

    pub(crate) fn finish(&self) -> TagResult<()> {
        if self.remaining() != 0 {
            return Err(TagError::Malformed(format!(
                "{} trailing bytes after offset {}",
                self.remaining(),
                self.pos
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn every_variant() -> Vec<Tag> {
        vec![
            Tag::byte("b", -7),
            Tag::short("s", i16::MIN),
            Tag::int("i", 123_456),
            Tag::long("l", i64::MAX),
            Tag::float("f", 1.5),
            Tag::double("d", -0.25),
            Tag::boolean("t", true),
            Tag::boolean("f", false),
            Tag::string("str", "grass/ünïcode"),
            Tag::string("", ""),
            Tag::byte_array("bytes", vec![0, 1, 255]),
            Tag::big_int("big", -(1i128 << 100)),
            Tag::new("ia", TagValue::IntArray(vec![1, -2, 3])),
            Tag::new("la", TagValue::LongArray(vec![i64::MIN, 0])),
            Tag::new("fa", TagValue::FloatArray(vec![0.5, -8.0])),
            Tag::double_array("da", vec![1.0, 2.0, 3.0, 4.0]),
            Tag::double_array("empty", Vec::new()),
        ]
    }

    #[test]
    fn test_round_trip_every_variant() {
        for tag in every_variant() {
            let bytes = encode(&tag).unwrap();
            assert_eq!(bytes[0], tag.tag_type().id());
            assert_eq!(decode(&bytes).unwrap(), tag, "variant {:?}", tag.tag_type());
        }
    }

    #[test]
    fn test_round_trip_nested_groups() {
        let mut tag = Tag::group("leaf", every_variant().into_iter().collect());
        for depth in 0..40 {
            let mut g = TagGroup::new();
            g.add(Tag::int("depth", depth)).add(tag);
            tag = Tag::group(format!("level{}", depth), g);
        }
        let bytes = encode(&tag).unwrap();
        assert_eq!(decode(&bytes).unwrap(), tag);
    }

    #[test]
    fn test_int_layout() {
        let bytes = encode(&Tag::int("v", 0x0102_0304)).unwrap();
        assert_eq!(bytes, vec![0x04, 0x00, 0x01, b'v', 0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn test_group_layout() {
        let mut g = TagGroup::new();
        g.add(Tag::boolean("a", true));
        let bytes = encode(&Tag::group("g", g)).unwrap();
        assert_eq!(
            bytes,
            vec![0x01, 0x00, 0x01, b'g', 0x00, 0x00, 0x00, 0x01, 0x0A, 0x00, 0x01, b'a', 0x01]
        );
    }

    #[test]
    fn test_truncated_input_is_malformed() {
        let bytes = encode(&Tag::string("name", "a long enough value")).unwrap();
        for cut in 0..bytes.len() {
            let err = decode(&bytes[..cut]).unwrap_err();
            assert!(err.is_malformed(), "cut at {} gave {:?}", cut, err);
        }
    }

    #[test]
    fn test_huge_length_is_malformed_without_allocating() {
        // string tag claiming 4 GiB of payload
        let bytes = vec![0x0B, 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF];
        assert!(matches!(decode(&bytes), Err(TagError::Malformed(_))));

        // double array claiming u32::MAX elements
        let bytes = vec![0x13, 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0, 0, 0, 0, 0, 0, 0, 0];
        assert!(matches!(decode(&bytes), Err(TagError::Malformed(_))));
    }

    #[test]
    fn test_unknown_type_byte() {
        let bytes = vec![0x7F, 0x00, 0x00];
        assert!(matches!(decode(&bytes), Err(TagError::UnknownType(0x7F))));
    }

    #[test]
    fn test_bad_boolean_byte() {
        let bytes = vec![0x0A, 0x00, 0x00, 0x02];
        assert!(matches!(decode(&bytes), Err(TagError::Malformed(_))));
    }

    #[test]
    fn test_invalid_utf8_name() {
        let bytes = vec![0x02, 0x00, 0x01, 0xFF, 0x00];
        assert!(matches!(decode(&bytes), Err(TagError::Malformed(_))));
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut bytes = encode(&Tag::int("v", 1)).unwrap();
        bytes.push(0);
        assert!(matches!(decode(&bytes), Err(TagError::Malformed(_))));
    }

    #[test]
    fn test_depth_limit() {
        // MAX_DEPTH + 1 nested single-child groups, each with an empty name
        let mut bytes = Vec::new();
        for _ in 0..=MAX_DEPTH {
            bytes.extend_from_slice(&[0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01]);
        }
        bytes.extend_from_slice(&[0x02, 0x00, 0x00, 0x00]);
        assert!(matches!(decode(&bytes), Err(TagError::Malformed(_))));
    }

    #[test]
    fn test_deepest_accepted_nesting_on_plain_thread() {
        // MAX_DEPTH nested groups is the deepest document accepted
        let mut bytes = Vec::new();
        for _ in 0..MAX_DEPTH {
            bytes.extend_from_slice(&[0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01]);
        }
        bytes.extend_from_slice(&[0x02, 0x00, 0x00, 0x07]);

        let levels = std::thread::spawn(move || {
            let mut tag = decode(&bytes).unwrap();
            let mut levels = 0;
            while let TagValue::Group(g) = tag.value {
                levels += 1;
                tag = g.into_iter().next().unwrap();
            }
            assert!(matches!(tag.value, TagValue::Byte(7)));
            levels
        })
        .join()
        .unwrap();
        assert_eq!(levels, MAX_DEPTH);
    }

    #[test]
    fn test_name_too_long() {
        let tag = Tag::int("x".repeat(70_000), 0);
        assert!(matches!(encode(&tag), Err(TagError::Malformed(_))));
    }
}
