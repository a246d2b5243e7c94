//! Chunked tile maps: sparse chunk storage, cached per-layer chunk surfaces,
//! shared per-tile animations and corner-sampled overlap queries, plus a
//! bitmap font for drawing text onto the same surfaces.

mod animation;
mod catalog;
mod coords;
mod error;
mod font;
pub mod loader;
mod query;
mod render;
mod store;
mod surface;
mod texture;
mod tilemap;

pub use animation::{Animation, Keyframe};
pub use catalog::{PropertyBag, PropertyValue, TileCatalog, TileDefinition};
pub use coords::{
    tileset_region, ChunkKey, CoordinateMapper, GridSize, PixelRect, TilePos, WorldPos,
};
pub use error::TileMapError;
pub use font::{BitmapFont, FontError};
pub use loader::LoadError;
pub use query::overlapping_tiles;
pub use render::{ChunkRenderer, RenderConfig};
pub use store::{Chunk, ChunkStore, Layer};
pub use surface::{Rgb, Rgba, Surface, TextureRegion, TRANSPARENT};
pub use texture::{IndexedTileset, NamedAtlas, TextureRef, TextureSource};
pub use tilemap::TileMap;

/// Tile identifier. Any negative id is an empty cell.
pub type TileId = i32;

pub const EMPTY_TILE: TileId = -1;

/// Builds a map straight from parsed documents.
pub fn build_tilemap<T: TextureSource>(
    map: loader::MapDocument,
    tiles: loader::TilePropertiesDocument,
    textures: T,
    config: RenderConfig,
) -> Result<TileMap<T>, TileMapError> {
    let store = map.into_store()?;
    let catalog = TileCatalog::new(loader::tile_definitions(tiles)?)?;
    Ok(TileMap::new(store, catalog, textures, config))
}
