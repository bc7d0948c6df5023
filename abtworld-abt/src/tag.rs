//! In-memory ABT tag tree.
//!
//! A [`Tag`] is a name plus a [`TagValue`]. The type byte written to disk is
//! derived from the value variant, so the two can never disagree.

use std::collections::HashMap;

use crate::error::{TagError, TagResult};

/// One-byte type discriminant of a tag on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TagType {
    Group = 0x01,
    Byte = 0x02,
    Short = 0x03,
    Int = 0x04,
    Long = 0x05,
    ByteArray = 0x06,
    BigInt = 0x07,
    Float = 0x08,
    Double = 0x09,
    Boolean = 0x0A,
    String = 0x0B,
    IntArray = 0x10,
    LongArray = 0x11,
    FloatArray = 0x12,
    DoubleArray = 0x13,
}

impl TagType {
    pub fn from_id(id: u8) -> TagResult<Self> {
        let ty = match id {
            0x01 => TagType::Group,
            0x02 => TagType::Byte,
            0x03 => TagType::Short,
            0x04 => TagType::Int,
            0x05 => TagType::Long,
            0x06 => TagType::ByteArray,
            0x07 => TagType::BigInt,
            0x08 => TagType::Float,
            0x09 => TagType::Double,
            0x0A => TagType::Boolean,
            0x0B => TagType::String,
            0x10 => TagType::IntArray,
            0x11 => TagType::LongArray,
            0x12 => TagType::FloatArray,
            0x13 => TagType::DoubleArray,
            other => return Err(TagError::UnknownType(other)),
        };
        Ok(ty)
    }

    #[inline]
    pub fn id(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    Group(TagGroup),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    ByteArray(Vec<u8>),
    /// Two's-complement big-endian magnitude, as produced by [`big_int_bytes`].
    BigInt(Vec<u8>),
    Float(f32),
    Double(f64),
    Boolean(bool),
    String(String),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
    FloatArray(Vec<f32>),
    DoubleArray(Vec<f64>),
}

impl TagValue {
    pub fn tag_type(&self) -> TagType {
        match self {
            TagValue::Group(_) => TagType::Group,
            TagValue::Byte(_) => TagType::Byte,
            TagValue::Short(_) => TagType::Short,
            TagValue::Int(_) => TagType::Int,
            TagValue::Long(_) => TagType::Long,
            TagValue::ByteArray(_) => TagType::ByteArray,
            TagValue::BigInt(_) => TagType::BigInt,
            TagValue::Float(_) => TagType::Float,
            TagValue::Double(_) => TagType::Double,
            TagValue::Boolean(_) => TagType::Boolean,
            TagValue::String(_) => TagType::String,
            TagValue::IntArray(_) => TagType::IntArray,
            TagValue::LongArray(_) => TagType::LongArray,
            TagValue::FloatArray(_) => TagType::FloatArray,
            TagValue::DoubleArray(_) => TagType::DoubleArray,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    pub name: String,
    pub value: TagValue,
}

impl Tag {
    pub fn new(name: impl Into<String>, value: TagValue) -> Self {
        Self { name: name.into(), value }
    }

    pub fn byte(name: impl Into<String>, v: i8) -> Self {
        Self::new(name, TagValue::Byte(v))
    }

    pub fn short(name: impl Into<String>, v: i16) -> Self {
        Self::new(name, TagValue::Short(v))
    }

    pub fn int(name: impl Into<String>, v: i32) -> Self {
        Self::new(name, TagValue::Int(v))
    }

    pub fn long(name: impl Into<String>, v: i64) -> Self {
        Self::new(name, TagValue::Long(v))
    }

    pub fn float(name: impl Into<String>, v: f32) -> Self {
        Self::new(name, TagValue::Float(v))
    }

    pub fn double(name: impl Into<String>, v: f64) -> Self {
        Self::new(name, TagValue::Double(v))
    }

    pub fn boolean(name: impl Into<String>, v: bool) -> Self {
        Self::new(name, TagValue::Boolean(v))
    }

    pub fn string(name: impl Into<String>, v: impl Into<String>) -> Self {
        Self::new(name, TagValue::String(v.into()))
    }

    pub fn byte_array(name: impl Into<String>, v: Vec<u8>) -> Self {
        Self::new(name, TagValue::ByteArray(v))
    }

    pub fn big_int(name: impl Into<String>, v: i128) -> Self {
        Self::new(name, TagValue::BigInt(big_int_bytes(v)))
    }

    pub fn double_array(name: impl Into<String>, v: Vec<f64>) -> Self {
        Self::new(name, TagValue::DoubleArray(v))
    }

    pub fn group(name: impl Into<String>, group: TagGroup) -> Self {
        Self::new(name, TagValue::Group(group))
    }

    #[inline]
    pub fn tag_type(&self) -> TagType {
        self.value.tag_type()
    }

    pub fn as_group(&self) -> Option<&TagGroup> {
        match &self.value {
            TagValue::Group(g) => Some(g),
            _ => None,
        }
    }

    pub fn into_group(self) -> TagResult<TagGroup> {
        match self.value {
            TagValue::Group(g) => Ok(g),
            other => Err(TagError::TypeMismatch {
                name: self.name,
                expected: TagType::Group,
                found: other.tag_type(),
            }),
        }
    }
}

/// Minimal two's-complement big-endian encoding of `v`.
pub fn big_int_bytes(v: i128) -> Vec<u8> {
    let bytes = v.to_be_bytes();
    let mut start = 0;
    while start < bytes.len() - 1 {
        let redundant = (bytes[start] == 0x00 && bytes[start + 1] & 0x80 == 0)
            || (bytes[start] == 0xFF && bytes[start + 1] & 0x80 != 0);
        if !redundant {
            break;
        }
        start += 1;
    }
    bytes[start..].to_vec()
}

/// Inverse of [`big_int_bytes`]. `None` if the value does not fit an `i128`.
pub fn big_int_to_i128(bytes: &[u8]) -> Option<i128> {
    let first = *bytes.first()?;
    if bytes.len() > 16 {
        return None;
    }
    let fill = if first & 0x80 != 0 { 0xFF } else { 0x00 };
    let mut buf = [fill; 16];
    buf[16 - bytes.len()..].copy_from_slice(bytes);
    Some(i128::from_be_bytes(buf))
}

/// Ordered children of a group tag. Names are not required to be unique;
/// lookups return the first match.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TagGroup {
    tags: Vec<Tag>,
}

macro_rules! copy_getter {
    ($fn_name:ident, $variant:ident, $ty:ty) => {
        pub fn $fn_name(&self, name: &str) -> TagResult<$ty> {
            match self.require(name)? {
                TagValue::$variant(v) => Ok(*v),
                other => Err(mismatch(name, TagType::$variant, other)),
            }
        }
    };
}

macro_rules! slice_getter {
    ($fn_name:ident, $variant:ident, $ty:ty) => {
        pub fn $fn_name(&self, name: &str) -> TagResult<&[$ty]> {
            match self.require(name)? {
                TagValue::$variant(v) => Ok(v.as_slice()),
                other => Err(mismatch(name, TagType::$variant, other)),
            }
        }
    };
}

fn mismatch(name: &str, expected: TagType, found: &TagValue) -> TagError {
    TagError::TypeMismatch {
        name: name.to_string(),
        expected,
        found: found.tag_type(),
    }
}

impl TagGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { tags: Vec::with_capacity(capacity) }
    }

    pub fn add(&mut self, tag: Tag) -> &mut Self {
        self.tags.push(tag);
        self
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Tag> {
        self.tags.iter()
    }

    pub fn get(&self, name: &str) -> Option<&Tag> {
        self.tags.iter().find(|t| t.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Tag> {
        self.tags.iter_mut().find(|t| t.name == name)
    }

    fn require(&self, name: &str) -> TagResult<&TagValue> {
        self.get(name)
            .map(|t| &t.value)
            .ok_or_else(|| TagError::MissingTag(name.to_string()))
    }

    copy_getter!(get_byte, Byte, i8);
    copy_getter!(get_short, Short, i16);
    copy_getter!(get_int, Int, i32);
    copy_getter!(get_long, Long, i64);
    copy_getter!(get_float, Float, f32);
    copy_getter!(get_double, Double, f64);
    copy_getter!(get_bool, Boolean, bool);

    slice_getter!(get_bytes, ByteArray, u8);
    slice_getter!(get_big_int_bytes, BigInt, u8);
    slice_getter!(get_int_array, IntArray, i32);
    slice_getter!(get_long_array, LongArray, i64);
    slice_getter!(get_float_array, FloatArray, f32);
    slice_getter!(get_double_array, DoubleArray, f64);

    pub fn get_str(&self, name: &str) -> TagResult<&str> {
        match self.require(name)? {
            TagValue::String(s) => Ok(s.as_str()),
            other => Err(mismatch(name, TagType::String, other)),
        }
    }

    pub fn get_group(&self, name: &str) -> TagResult<&TagGroup> {
        match self.require(name)? {
            TagValue::Group(g) => Ok(g),
            other => Err(mismatch(name, TagType::Group, other)),
        }
    }

    /// Builds a hash index over the children for many by-name lookups.
    pub fn index(&self) -> TagIndex<'_> {
        let mut map = HashMap::with_capacity(self.tags.len());
        for tag in &self.tags {
            map.entry(tag.name.as_str()).or_insert(&tag.value);
        }
        TagIndex { map }
    }
}

/// Read-only by-name view of a [`TagGroup`] with the same typed getters.
/// Like the group itself, the first child with a given name wins.
pub struct TagIndex<'a> {
    map: HashMap<&'a str, &'a TagValue>,
}

impl<'a> TagIndex<'a> {
    fn require(&self, name: &str) -> TagResult<&'a TagValue> {
        self.map
            .get(name)
            .copied()
            .ok_or_else(|| TagError::MissingTag(name.to_string()))
    }

    copy_getter!(get_int, Int, i32);
    copy_getter!(get_long, Long, i64);
    copy_getter!(get_bool, Boolean, bool);

    pub fn get_str(&self, name: &str) -> TagResult<&'a str> {
        match self.require(name)? {
            TagValue::String(s) => Ok(s.as_str()),
            other => Err(mismatch(name, TagType::String, other)),
        }
    }
}

impl FromIterator<Tag> for TagGroup {
    fn from_iter<I: IntoIterator<Item = Tag>>(iter: I) -> Self {
        Self { tags: iter.into_iter().collect() }
    }
}

impl IntoIterator for TagGroup {
    type Item = Tag;
    type IntoIter = std::vec::IntoIter<Tag>;

    fn into_iter(self) -> Self::IntoIter {
        self.tags.into_iter()
    }
}

impl<'a> IntoIterator for &'a TagGroup {
    type Item = &'a Tag;
    type IntoIter = std::slice::Iter<'a, Tag>;

    fn into_iter(self) -> Self::IntoIter {
        self.tags.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_ids_round_trip() {
        for id in 0u8..=0xFF {
            if let Ok(ty) = TagType::from_id(id) {
                assert_eq!(ty.id(), id);
            }
        }
        assert!(matches!(TagType::from_id(0x00), Err(TagError::UnknownType(0))));
        assert!(matches!(TagType::from_id(0x1C), Err(TagError::UnknownType(0x1C))));
    }

    #[test]
    fn test_typed_getters() {
        let mut g = TagGroup::new();
        g.add(Tag::int("version", 0))
            .add(Tag::long("x", -3))
            .add(Tag::string("name", "plains"))
            .add(Tag::boolean("flag", true));

        assert_eq!(g.get_int("version").unwrap(), 0);
        assert_eq!(g.get_long("x").unwrap(), -3);
        assert_eq!(g.get_str("name").unwrap(), "plains");
        assert!(g.get_bool("flag").unwrap());

        match g.get_int("x") {
            Err(TagError::TypeMismatch { expected, found, .. }) => {
                assert_eq!(expected, TagType::Int);
                assert_eq!(found, TagType::Long);
            }
            other => panic!("expected mismatch, got {:?}", other),
        }
        assert!(matches!(g.get_int("missing"), Err(TagError::MissingTag(_))));
    }

    #[test]
    fn test_duplicate_names_return_first() {
        let g: TagGroup = vec![Tag::int("a", 1), Tag::int("a", 2)].into_iter().collect();
        assert_eq!(g.get_int("a").unwrap(), 1);
        assert_eq!(g.len(), 2);
    }

    #[test]
    fn test_index_matches_linear_lookup() {
        let g: TagGroup = vec![
            Tag::int("a", 1),
            Tag::string("s", "x"),
            Tag::int("a", 2),
        ]
        .into_iter()
        .collect();
        let idx = g.index();
        assert_eq!(idx.get_int("a").unwrap(), g.get_int("a").unwrap());
        assert_eq!(idx.get_str("s").unwrap(), "x");
        assert!(matches!(idx.get_bool("s"), Err(TagError::TypeMismatch { .. })));
        assert!(matches!(idx.get_long("nope"), Err(TagError::MissingTag(_))));
    }

    #[test]
    fn test_big_int_bytes() {
        for v in [0i128, 1, -1, 127, 128, -128, -129, 255, 1 << 70, i128::MAX, i128::MIN] {
            let bytes = big_int_bytes(v);
            assert_eq!(big_int_to_i128(&bytes), Some(v), "value {}", v);
        }
        assert_eq!(big_int_bytes(0), vec![0x00]);
        assert_eq!(big_int_bytes(128), vec![0x00, 0x80]);
        assert_eq!(big_int_bytes(-1), vec![0xFF]);
        assert_eq!(big_int_to_i128(&[]), None);
        assert_eq!(big_int_to_i128(&[1u8; 17]), None);
    }

    #[test]
    fn test_into_group() {
        let t = Tag::group("root", TagGroup::new());
        assert!(t.into_group().unwrap().is_empty());
        assert!(Tag::int("n", 1).into_group().is_err());
    }
}
