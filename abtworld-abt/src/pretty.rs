//! Human-readable and JSON views of a tag tree.

use std::fmt;

use serde_json::{Map, Value, json};

use crate::doc::TagDoc;
use crate::tag::{Tag, TagGroup, TagValue, big_int_to_i128};

fn write_tag(f: &mut fmt::Formatter<'_>, tag: &Tag, indent: usize) -> fmt::Result {
    write!(f, "{:indent$}{} ({:?})", "", tag.name, tag.tag_type(), indent = indent)?;
    match &tag.value {
        TagValue::Group(g) => {
            writeln!(f, " [{}]", g.len())?;
            write_children(f, g, indent + 2)
        }
        TagValue::BigInt(b) => match big_int_to_i128(b) {
            Some(v) => writeln!(f, " = {}", v),
            None => writeln!(f, " = {:02x?}", b),
        },
        TagValue::Byte(v) => writeln!(f, " = {}", v),
        TagValue::Short(v) => writeln!(f, " = {}", v),
        TagValue::Int(v) => writeln!(f, " = {}", v),
        TagValue::Long(v) => writeln!(f, " = {}", v),
        TagValue::Float(v) => writeln!(f, " = {}", v),
        TagValue::Double(v) => writeln!(f, " = {}", v),
        TagValue::Boolean(v) => writeln!(f, " = {}", v),
        TagValue::String(v) => writeln!(f, " = {:?}", v),
        TagValue::ByteArray(v) => writeln!(f, " = {} bytes", v.len()),
        TagValue::IntArray(v) => writeln!(f, " = {:?}", v),
        TagValue::LongArray(v) => writeln!(f, " = {:?}", v),
        TagValue::FloatArray(v) => writeln!(f, " = {:?}", v),
        TagValue::DoubleArray(v) => writeln!(f, " = {:?}", v),
    }
}

fn write_children(f: &mut fmt::Formatter<'_>, group: &TagGroup, indent: usize) -> fmt::Result {
    for child in group {
        write_tag(f, child, indent)?;
    }
    Ok(())
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_tag(f, self, 0)
    }
}

impl fmt::Display for TagDoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "doc {} [{}]", self.name, self.root.len())?;
        write_children(f, &self.root, 2)
    }
}

/// Groups become objects; repeated names inside a group keep the last value.
pub fn to_json(value: &TagValue) -> Value {
    match value {
        TagValue::Group(g) => group_to_json(g),
        TagValue::Byte(v) => json!(v),
        TagValue::Short(v) => json!(v),
        TagValue::Int(v) => json!(v),
        TagValue::Long(v) => json!(v),
        TagValue::Float(v) => json!(v),
        TagValue::Double(v) => json!(v),
        TagValue::Boolean(v) => json!(v),
        TagValue::String(v) => json!(v),
        TagValue::ByteArray(v) => json!(v),
        TagValue::BigInt(v) => match big_int_to_i128(v) {
            Some(n) => json!(n.to_string()),
            None => json!(v),
        },
        TagValue::IntArray(v) => json!(v),
        TagValue::LongArray(v) => json!(v),
        TagValue::FloatArray(v) => json!(v),
        TagValue::DoubleArray(v) => json!(v),
    }
}

pub fn group_to_json(group: &TagGroup) -> Value {
    let mut map = Map::new();
    for child in group {
        map.insert(child.name.clone(), to_json(&child.value));
    }
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_indents_children() {
        let mut g = TagGroup::new();
        g.add(Tag::int("version", 0)).add(Tag::string("tile/0/0/0", "grass"));
        let text = Tag::group("chunk", g).to_string();
        assert_eq!(
            text,
            "chunk (Group) [2]\n  version (Int) = 0\n  tile/0/0/0 (String) = \"grass\"\n"
        );
    }

    #[test]
    fn test_json_view() {
        let mut pos = TagGroup::new();
        pos.add(Tag::double("x", 1.5)).add(Tag::double("y", -2.0));
        let mut root = TagGroup::new();
        root.add(Tag::group("pos", pos)).add(Tag::big_int("seed", -5));
        let v = group_to_json(&root);
        assert_eq!(v["pos"]["x"], json!(1.5));
        assert_eq!(v["seed"], json!("-5"));
    }
}
