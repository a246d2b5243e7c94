use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::coords::{tileset_region, GridSize, PixelRect};
use crate::surface::{Surface, TextureRegion};
use crate::TileId;

/// Texture named by an animation keyframe: a tileset index or an atlas sprite name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TextureRef {
    Id(TileId),
    Name(String),
}

impl fmt::Display for TextureRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "#{id}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

/// Source of drawable tile/sprite regions.
pub trait TextureSource {
    fn region_for_id(&self, tile_id: TileId) -> Option<TextureRegion<'_>>;

    fn region_for_name(&self, _name: &str) -> Option<TextureRegion<'_>> {
        None
    }

    fn texture_of(&self, texture: &TextureRef) -> Option<TextureRegion<'_>> {
        match texture {
            TextureRef::Id(id) => self.region_for_id(*id),
            TextureRef::Name(name) => self.region_for_name(name),
        }
    }
}

impl<T: TextureSource + ?Sized> TextureSource for Box<T> {
    fn region_for_id(&self, tile_id: TileId) -> Option<TextureRegion<'_>> {
        (**self).region_for_id(tile_id)
    }

    fn region_for_name(&self, name: &str) -> Option<TextureRegion<'_>> {
        (**self).region_for_name(name)
    }
}

/// Single tileset image addressed by flat tile index, row-major,
/// `tileset_width / tile_width` columns.
#[derive(Debug, Clone)]
pub struct IndexedTileset {
    image: Surface,
    tile_size: GridSize,
}

impl IndexedTileset {
    pub fn new(image: Surface, tile_size: GridSize) -> Self {
        Self { image, tile_size }
    }

    pub fn tile_size(&self) -> GridSize {
        self.tile_size
    }

    pub fn image(&self) -> &Surface {
        &self.image
    }

    /// Number of whole tiles the image holds.
    pub fn tile_count(&self) -> usize {
        let columns = self.image.width() / self.tile_size.width.max(1);
        let rows = self.image.height() / self.tile_size.height.max(1);
        columns as usize * rows as usize
    }
}

impl TextureSource for IndexedTileset {
    fn region_for_id(&self, tile_id: TileId) -> Option<TextureRegion<'_>> {
        if tile_id < 0 || tile_id as usize >= self.tile_count() {
            return None;
        }
        self.image
            .region(tileset_region(tile_id, self.tile_size, self.image.width()))
    }

    /// Decimal names resolve as tile indices.
    fn region_for_name(&self, name: &str) -> Option<TextureRegion<'_>> {
        name.trim()
            .parse::<TileId>()
            .ok()
            .and_then(|id| self.region_for_id(id))
    }
}

/// Spritesheet with named sub-regions.
#[derive(Debug, Clone)]
pub struct NamedAtlas {
    image: Surface,
    regions: HashMap<String, PixelRect>,
}

impl NamedAtlas {
    pub fn new(image: Surface, regions: HashMap<String, PixelRect>) -> Self {
        Self { image, regions }
    }

    pub fn image(&self) -> &Surface {
        &self.image
    }
}

impl TextureSource for NamedAtlas {
    /// Tile ids look up the sprite named by their decimal form.
    fn region_for_id(&self, tile_id: TileId) -> Option<TextureRegion<'_>> {
        self.region_for_name(&tile_id.to_string())
    }

    fn region_for_name(&self, name: &str) -> Option<TextureRegion<'_>> {
        let rect = self.regions.get(name)?;
        self.image.region(*rect)
    }
}
