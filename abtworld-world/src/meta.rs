use abtworld_abt::{Tag, TagDoc, TagGroup, TagResult};
use abtworld_storage::METADATA_DOC;

use crate::error::{WorldError, WorldResult};

/// Only metadata format understood by this crate.
pub const FORMAT_VERSION: i32 = 0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightSource {
    pub x: f64,
    pub y: f64,
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub brightness: f32,
}

impl LightSource {
    pub fn to_group(&self) -> TagGroup {
        let mut color = TagGroup::with_capacity(4);
        color
            .add(Tag::float("r", self.r))
            .add(Tag::float("g", self.g))
            .add(Tag::float("b", self.b))
            .add(Tag::float("brightness", self.brightness));

        let mut pos = TagGroup::with_capacity(2);
        pos.add(Tag::double("x", self.x)).add(Tag::double("y", self.y));

        let mut group = TagGroup::with_capacity(2);
        group.add(Tag::group("color", color)).add(Tag::group("pos", pos));
        group
    }

    pub fn from_group(group: &TagGroup) -> TagResult<Self> {
        let color = group.get_group("color")?;
        let pos = group.get_group("pos")?;
        Ok(Self {
            x: pos.get_double("x")?,
            y: pos.get_double("y")?,
            r: color.get_float("r")?,
            g: color.get_float("g")?,
            b: color.get_float("b")?,
            brightness: color.get_float("brightness")?,
        })
    }
}

/// Contents of `map.abt`. Entities are kept as opaque tags; this crate only
/// carries them between load and save.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorldMetadata {
    pub lights: Vec<LightSource>,
    pub entities: Vec<Tag>,
}

impl WorldMetadata {
    pub fn to_doc(&self) -> TagDoc {
        let lights: TagGroup = self
            .lights
            .iter()
            .enumerate()
            .map(|(i, light)| Tag::group(format!("light{}", i), light.to_group()))
            .collect();
        let entities: TagGroup = self.entities.iter().cloned().collect();

        let mut root = TagGroup::with_capacity(3);
        root.add(Tag::int("version", FORMAT_VERSION))
            .add(Tag::group("lights", lights))
            .add(Tag::group("entities", entities));
        TagDoc::new(METADATA_DOC, root)
    }

    pub fn from_doc(doc: &TagDoc) -> WorldResult<Self> {
        let version = doc.root.get_int("version")?;
        if version != FORMAT_VERSION {
            return Err(WorldError::UnknownFormatVersion(version));
        }

        let lights = doc
            .root
            .get_group("lights")?
            .iter()
            .map(|tag| LightSource::from_group(&tag.clone().into_group()?))
            .collect::<TagResult<Vec<_>>>()?;
        let entities = doc.root.get_group("entities")?.iter().cloned().collect();

        Ok(Self { lights, entities })
    }

    /// Lights handed to a network world arrive as bare tag groups.
    pub fn lights_from_groups(groups: &[TagGroup]) -> WorldResult<Vec<LightSource>> {
        Ok(groups
            .iter()
            .map(LightSource::from_group)
            .collect::<TagResult<Vec<_>>>()?)
    }
}
