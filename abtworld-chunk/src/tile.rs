use std::collections::HashMap;
use std::sync::Arc;

/// A tile type. Behaviour lives elsewhere; the chunk layer only needs the id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tile {
    id: String,
}

impl Tile {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Tile lookup by string id, handed to a world at construction.
#[derive(Debug, Default)]
pub struct TileRegistry {
    tiles: HashMap<String, Arc<Tile>>,
}

impl TileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut registry = Self::new();
        for id in ids {
            registry.register(id);
        }
        registry
    }

    /// Registers a tile, replacing any previous tile with the same id.
    pub fn register(&mut self, id: impl Into<String>) -> Arc<Tile> {
        let tile = Arc::new(Tile::new(id));
        self.tiles.insert(tile.id().to_string(), tile.clone());
        tile
    }

    pub fn get(&self, id: &str) -> Option<Arc<Tile>> {
        self.tiles.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_get() {
        let registry = TileRegistry::with_ids(["grass", "stone"]);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("grass").unwrap().id(), "grass");
        assert!(registry.get("lava").is_none());
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = TileRegistry::new();
        let first = registry.register("grass");
        let second = registry.register("grass");
        assert_eq!(registry.len(), 1);
        assert!(Arc::ptr_eq(&registry.get("grass").unwrap(), &second));
        assert!(!Arc::ptr_eq(&first, &second));
    }
}
