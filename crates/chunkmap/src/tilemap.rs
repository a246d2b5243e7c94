use tracing::{debug, info};

use crate::catalog::{PropertyBag, TileCatalog, TileDefinition};
use crate::coords::{ChunkKey, PixelRect, TilePos, WorldPos};
use crate::error::TileMapError;
use crate::query::overlapping_tiles;
use crate::render::{ChunkRenderer, RenderConfig};
use crate::store::ChunkStore;
use crate::surface::Surface;
use crate::texture::TextureSource;
use crate::TileId;

/// A loaded map: logical chunks, tile catalog, render cache and the texture
/// source used to draw it. All mutation goes through this type so the render
/// cache stays consistent with edits and animation ticks.
pub struct TileMap<T: TextureSource> {
    store: ChunkStore,
    catalog: TileCatalog,
    renderer: ChunkRenderer,
    textures: T,
}

impl<T: TextureSource> TileMap<T> {
    pub fn new(store: ChunkStore, catalog: TileCatalog, textures: T, config: RenderConfig) -> Self {
        let tile_size = store.tile_size();
        let chunk_size = store.chunk_size();
        info!(
            chunk_count = store.len(),
            tile_width = tile_size.width,
            tile_height = tile_size.height,
            chunk_width = chunk_size.width,
            chunk_height = chunk_size.height,
            tile_definitions = catalog.len(),
            colorkey = ?config.colorkey,
            "tilemap_created"
        );
        Self {
            store,
            catalog,
            renderer: ChunkRenderer::new(config),
            textures,
        }
    }

    pub fn store(&self) -> &ChunkStore {
        &self.store
    }

    pub fn catalog(&self) -> &TileCatalog {
        &self.catalog
    }

    pub fn renderer(&self) -> &ChunkRenderer {
        &self.renderer
    }

    pub fn textures(&self) -> &T {
        &self.textures
    }

    pub fn chunk_keys(&self) -> impl Iterator<Item = ChunkKey> + '_ {
        self.store.chunk_keys()
    }

    pub fn chunk_at_position(&self, position: WorldPos) -> ChunkKey {
        self.store.mapper().chunk_of(position)
    }

    /// World position of the chunk's top-left corner.
    pub fn chunk_position(&self, key: ChunkKey) -> WorldPos {
        self.store.mapper().chunk_origin(key)
    }

    pub fn tile_at(
        &self,
        key: ChunkKey,
        layer_index: usize,
        position: TilePos,
    ) -> Result<TileId, TileMapError> {
        self.store.tile_at(key, layer_index, position)
    }

    pub fn tile_properties(&self, tile_id: TileId) -> &PropertyBag {
        self.catalog.properties_of(tile_id)
    }

    /// Writes `tile_id` and redraws that one cell if the chunk is cached.
    pub fn set_tile(
        &mut self,
        key: ChunkKey,
        layer_index: usize,
        position: TilePos,
        tile_id: TileId,
    ) -> Result<TileId, TileMapError> {
        let previous = self.store.set_tile(key, layer_index, position, tile_id)?;
        self.renderer.apply_edit(
            &self.store,
            &self.catalog,
            &self.textures,
            key,
            layer_index,
            position,
            tile_id,
        )?;
        Ok(previous)
    }

    pub fn get_chunk_surfaces(&mut self, key: ChunkKey) -> Result<&[Surface], TileMapError> {
        self.renderer
            .get_chunk_surfaces(&self.store, &self.catalog, &self.textures, key)
    }

    /// Fully renders every stored chunk, replacing any cached surfaces.
    pub fn render_all(&mut self) -> Result<usize, TileMapError> {
        let mut keys = self.store.chunk_keys().collect::<Vec<_>>();
        keys.sort_unstable();
        for key in &keys {
            self.renderer
                .render_chunk(&self.store, &self.catalog, &self.textures, *key)?;
        }
        Ok(keys.len())
    }

    /// All layers of `key` flattened bottom-to-top.
    pub fn composite_chunk(&mut self, key: ChunkKey) -> Result<Surface, TileMapError> {
        self.get_chunk_surfaces(key)?;
        self.renderer
            .composite(key)
            .ok_or(TileMapError::ChunkNotFound { key })
    }

    pub fn overlapping_tiles<S: AsRef<str>>(
        &self,
        rect: PixelRect,
        layer_index: usize,
        properties: &[S],
    ) -> Result<Vec<PixelRect>, TileMapError> {
        overlapping_tiles(&self.store, &self.catalog, rect, layer_index, properties)
    }

    /// One animation tick; call exactly once per game frame. Cached chunks
    /// pick up the new frames on their next [`TileMap::get_chunk_surfaces`].
    pub fn update_animations(&mut self) -> Vec<TileId> {
        let changed = self.catalog.advance_animations();
        if !changed.is_empty() {
            debug!(changed = ?changed, "animation_keyframes_changed");
        }
        changed
    }

    /// Swaps in new tile definitions, resetting every animation and dropping
    /// all cached surfaces. On error the old catalog stays in place.
    pub fn reload_tile_properties(
        &mut self,
        definitions: impl IntoIterator<Item = (TileId, TileDefinition)>,
    ) -> Result<(), TileMapError> {
        self.catalog.reload(definitions)?;
        let dropped = self.renderer.cached_chunk_count();
        self.renderer.clear();
        info!(
            tile_definitions = self.catalog.len(),
            dropped_chunks = dropped,
            "tile_properties_reloaded"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::GridSize;
    use crate::surface::{Rgba, TRANSPARENT};
    use crate::texture::IndexedTileset;
    use serde_json::json;
    use std::collections::BTreeMap;

    const RED: Rgba = [255, 0, 0, 255];
    const GREEN: Rgba = [0, 255, 0, 255];

    fn definitions(value: serde_json::Value) -> Vec<(TileId, TileDefinition)> {
        let raw: BTreeMap<String, TileDefinition> = serde_json::from_value(value).expect("defs");
        raw.into_iter()
            .map(|(key, def)| (key.parse::<TileId>().expect("id"), def))
            .collect()
    }

    fn tilemap(tiles: serde_json::Value) -> TileMap<IndexedTileset> {
        let mut image = Surface::new_filled(8, 4, TRANSPARENT);
        image.fill_rect(PixelRect::new(0, 0, 4, 4), RED);
        image.fill_rect(PixelRect::new(4, 0, 4, 4), GREEN);
        let store = ChunkStore::new(
            GridSize::new(4, 4),
            GridSize::new(2, 2),
            [
                (ChunkKey::new(0, 0), vec![vec![vec![0, -1], vec![-1, 1]]]),
                (ChunkKey::new(1, 0), vec![vec![vec![1, 1], vec![1, 1]]]),
            ],
        )
        .expect("store");
        TileMap::new(
            store,
            TileCatalog::new(definitions(tiles)).expect("catalog"),
            IndexedTileset::new(image, GridSize::new(4, 4)),
            RenderConfig::default(),
        )
    }

    #[test]
    fn set_tile_keeps_cached_surface_current() {
        let mut map = tilemap(json!({}));
        map.get_chunk_surfaces(ChunkKey::new(0, 0)).expect("render");
        let previous = map
            .set_tile(ChunkKey::new(0, 0), 0, TilePos::new(1, 0), 1)
            .expect("set");
        assert_eq!(previous, -1);
        let surfaces = map.get_chunk_surfaces(ChunkKey::new(0, 0)).expect("surfaces");
        assert_eq!(surfaces[0].pixel(5, 0), Some(GREEN));
    }

    #[test]
    fn set_tile_on_missing_chunk_fails_without_side_effects() {
        let mut map = tilemap(json!({}));
        let error = map
            .set_tile(ChunkKey::new(4, 4), 0, TilePos::new(0, 0), 1)
            .expect_err("missing");
        assert_eq!(
            error,
            TileMapError::ChunkNotFound {
                key: ChunkKey::new(4, 4)
            }
        );
        assert_eq!(map.renderer().cached_chunk_count(), 0);
    }

    #[test]
    fn animation_ticks_show_up_on_next_read() {
        let mut map = tilemap(json!({
            "0": {"animation": [{"frames": 2, "texture": 0}, {"frames": 1, "texture": 1}]},
        }));
        let key = ChunkKey::new(0, 0);
        assert_eq!(map.get_chunk_surfaces(key).expect("render")[0].pixel(0, 0), Some(RED));
        assert!(map.update_animations().is_empty());
        assert_eq!(map.get_chunk_surfaces(key).expect("tick 1")[0].pixel(0, 0), Some(RED));
        assert_eq!(map.update_animations(), vec![0]);
        assert_eq!(map.get_chunk_surfaces(key).expect("tick 2")[0].pixel(0, 0), Some(GREEN));
        map.update_animations();
        assert_eq!(map.get_chunk_surfaces(key).expect("tick 3")[0].pixel(0, 0), Some(RED));
    }

    #[test]
    fn reload_drops_cache_and_resets_animations() {
        let mut map = tilemap(json!({
            "0": {"animation": [{"frames": 1, "texture": 0}, {"frames": 1, "texture": 1}]},
        }));
        map.render_all().expect("render all");
        assert_eq!(map.renderer().cached_chunk_count(), 2);
        map.update_animations();
        map.reload_tile_properties(definitions(json!({
            "0": {"hazard": true, "animation": [{"frames": 1, "texture": 1}]},
        })))
        .expect("reload");
        assert_eq!(map.renderer().cached_chunk_count(), 0);
        assert!(map.tile_properties(0).is_truthy("hazard"));
        let surfaces = map.get_chunk_surfaces(ChunkKey::new(0, 0)).expect("render");
        assert_eq!(surfaces[0].pixel(0, 0), Some(GREEN));
    }

    #[test]
    fn chunk_position_helpers_agree() {
        let map = tilemap(json!({}));
        let key = map.chunk_at_position(WorldPos::new(9, -1));
        assert_eq!(key, ChunkKey::new(1, -1));
        assert_eq!(map.chunk_position(key), WorldPos::new(8, -8));
    }

    #[test]
    fn query_goes_through_catalog_properties() {
        let map = tilemap(json!({"1": {"solid": true}}));
        let hits = map
            .overlapping_tiles(PixelRect::new(2, 2, 8, 4), 0, &["solid"])
            .expect("query");
        assert_eq!(
            hits,
            vec![PixelRect::new(8, 0, 4, 4), PixelRect::new(8, 4, 4, 4)]
        );
    }

    #[test]
    fn composite_chunk_renders_on_demand() {
        let mut map = tilemap(json!({}));
        let composite = map.composite_chunk(ChunkKey::new(1, 0)).expect("composite");
        assert_eq!(composite.pixel(7, 7), Some(GREEN));
        assert!(map.composite_chunk(ChunkKey::new(9, 9)).is_err());
    }
}
