use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::catalog::TileCatalog;
use crate::coords::{ChunkKey, GridSize, PixelRect, TilePos};
use crate::error::TileMapError;
use crate::store::{Chunk, ChunkStore};
use crate::surface::{Rgb, Rgba, Surface, TRANSPARENT};
use crate::texture::{TextureRef, TextureSource};
use crate::TileId;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderConfig {
    /// Background color of empty cells. Layer surfaces carry it as their
    /// colorkey so it stays see-through when layers are composited.
    pub colorkey: Option<Rgb>,
}

impl RenderConfig {
    pub fn background(&self) -> Rgba {
        match self.colorkey {
            Some([r, g, b]) => [r, g, b, 255],
            None => TRANSPARENT,
        }
    }
}

/// Per-chunk cache of rendered layer surfaces.
///
/// Surfaces are derived from the chunk store, the catalog's animation state
/// and a texture source. Callers keep them current by routing every tile edit
/// through [`ChunkRenderer::apply_edit`].
#[derive(Debug, Default)]
pub struct ChunkRenderer {
    config: RenderConfig,
    cache: HashMap<ChunkKey, Vec<Surface>>,
    warned_missing_textures: HashSet<TextureRef>,
}

struct CellPainter<'a, T: TextureSource + ?Sized> {
    catalog: &'a TileCatalog,
    textures: &'a T,
    tile_size: GridSize,
    background: Rgba,
    warned_missing_textures: &'a mut HashSet<TextureRef>,
}

impl ChunkRenderer {
    pub fn new(config: RenderConfig) -> Self {
        Self {
            config,
            cache: HashMap::new(),
            warned_missing_textures: HashSet::new(),
        }
    }

    pub fn config(&self) -> RenderConfig {
        self.config
    }

    pub fn is_cached(&self, key: ChunkKey) -> bool {
        self.cache.contains_key(&key)
    }

    pub fn cached_chunk_count(&self) -> usize {
        self.cache.len()
    }

    /// Cached surfaces without refreshing animated cells.
    pub fn cached_surfaces(&self, key: ChunkKey) -> Option<&[Surface]> {
        self.cache.get(&key).map(Vec::as_slice)
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }

    /// Renders every layer of `key` from scratch and replaces its cache entry.
    pub fn render_chunk<T: TextureSource + ?Sized>(
        &mut self,
        store: &ChunkStore,
        catalog: &TileCatalog,
        textures: &T,
        key: ChunkKey,
    ) -> Result<&[Surface], TileMapError> {
        let chunk = store.chunk(key).ok_or(TileMapError::ChunkNotFound { key })?;
        let pixel_size = store.mapper().chunk_pixel_size();
        let background = self.config.background();
        let colorkey = self.config.colorkey;
        let mut painter = CellPainter {
            catalog,
            textures,
            tile_size: store.tile_size(),
            background,
            warned_missing_textures: &mut self.warned_missing_textures,
        };
        let mut surfaces = Vec::with_capacity(chunk.layer_count());
        for layer in chunk.layers() {
            let mut surface = Surface::new_filled(pixel_size.width, pixel_size.height, background)
                .with_colorkey(colorkey);
            for (x, y, tile_id) in layer.cells() {
                if tile_id >= 0 {
                    painter.draw_tile(&mut surface, x, y, tile_id);
                }
            }
            surfaces.push(surface);
        }
        debug!(chunk = %key, layers = surfaces.len(), "chunk_rendered");
        self.cache.insert(key, surfaces);
        Ok(self.cached_surfaces(key).unwrap_or(&[]))
    }

    /// Current surfaces for `key`. A cached chunk has its animated cells
    /// redrawn first; an uncached chunk is rendered in full.
    pub fn get_chunk_surfaces<T: TextureSource + ?Sized>(
        &mut self,
        store: &ChunkStore,
        catalog: &TileCatalog,
        textures: &T,
        key: ChunkKey,
    ) -> Result<&[Surface], TileMapError> {
        let chunk = store.chunk(key).ok_or(TileMapError::ChunkNotFound { key })?;
        if !self.cache.contains_key(&key) {
            return self.render_chunk(store, catalog, textures, key);
        }
        let background = self.config.background();
        let surfaces = self
            .cache
            .get_mut(&key)
            .ok_or(TileMapError::ChunkNotFound { key })?;
        if !catalog.has_animations() {
            return Ok(surfaces.as_slice());
        }
        let mut painter = CellPainter {
            catalog,
            textures,
            tile_size: store.tile_size(),
            background,
            warned_missing_textures: &mut self.warned_missing_textures,
        };
        refresh_animated_cells(&mut painter, chunk, surfaces);
        Ok(surfaces.as_slice())
    }

    /// Redraws the one edited cell on the cached surface. Uncached chunks are
    /// left alone; they pick the edit up when first rendered.
    #[allow(clippy::too_many_arguments)]
    pub fn apply_edit<T: TextureSource + ?Sized>(
        &mut self,
        store: &ChunkStore,
        catalog: &TileCatalog,
        textures: &T,
        key: ChunkKey,
        layer_index: usize,
        position: TilePos,
        new_tile_id: TileId,
    ) -> Result<(), TileMapError> {
        let Some(surfaces) = self.cache.get_mut(&key) else {
            return Ok(());
        };
        if !store.contains(key) {
            return Err(TileMapError::ChunkNotFound { key });
        }
        let layer_count = surfaces.len();
        let surface = surfaces
            .get_mut(layer_index)
            .ok_or(TileMapError::LayerIndexOutOfRange {
                key,
                layer_index,
                layer_count,
            })?;
        let chunk_size = store.chunk_size();
        if position.x >= chunk_size.width || position.y >= chunk_size.height {
            return Err(TileMapError::TileIndexOutOfBounds {
                key,
                x: position.x,
                y: position.y,
                width: chunk_size.width,
                height: chunk_size.height,
            });
        }
        let mut painter = CellPainter {
            catalog,
            textures,
            tile_size: store.tile_size(),
            background: self.config.background(),
            warned_missing_textures: &mut self.warned_missing_textures,
        };
        painter.redraw_cell(surface, position.x, position.y, new_tile_id);
        debug!(
            chunk = %key,
            layer_index,
            x = position.x,
            y = position.y,
            tile_id = new_tile_id,
            "tile_edit_applied"
        );
        Ok(())
    }

    /// Flattens the cached layers of `key` bottom-to-top into one surface.
    pub fn composite(&self, key: ChunkKey) -> Option<Surface> {
        let surfaces = self.cache.get(&key)?;
        let first = surfaces.first()?;
        let mut output = Surface::new_filled(first.width(), first.height(), TRANSPARENT);
        for region in surfaces.iter().filter_map(|layer| layer.region(layer.bounds())) {
            output.blit_region(region, 0, 0);
        }
        Some(output)
    }
}

impl<T: TextureSource + ?Sized> CellPainter<'_, T> {
    fn cell_rect(&self, x: u32, y: u32) -> PixelRect {
        PixelRect::new(
            (x * self.tile_size.width) as i32,
            (y * self.tile_size.height) as i32,
            self.tile_size.width,
            self.tile_size.height,
        )
    }

    /// Clears the cell to the background, then draws `tile_id` if non-empty.
    fn redraw_cell(&mut self, surface: &mut Surface, x: u32, y: u32, tile_id: TileId) {
        surface.fill_rect(self.cell_rect(x, y), self.background);
        if tile_id >= 0 {
            self.draw_tile(surface, x, y, tile_id);
        }
    }

    fn draw_tile(&mut self, surface: &mut Surface, x: u32, y: u32, tile_id: TileId) {
        let texture = match self.catalog.animation_of(tile_id) {
            Some(animation) => animation.current_texture_ref().clone(),
            None => TextureRef::Id(tile_id),
        };
        let Some(mut region) = self.textures.texture_of(&texture) else {
            if self.warned_missing_textures.insert(texture.clone()) {
                warn!(
                    tile_id,
                    texture = %texture,
                    "texture_region_missing_leaving_cell_empty"
                );
            }
            return;
        };
        // Oversized regions are cropped to the cell so redrawing one cell
        // never touches its neighbours.
        region.rect.width = region.rect.width.min(self.tile_size.width);
        region.rect.height = region.rect.height.min(self.tile_size.height);
        let cell = self.cell_rect(x, y);
        surface.blit_region(region, cell.x, cell.y);
    }
}

fn refresh_animated_cells<T: TextureSource + ?Sized>(
    painter: &mut CellPainter<'_, T>,
    chunk: &Chunk,
    surfaces: &mut [Surface],
) {
    for (layer, surface) in chunk.layers().iter().zip(surfaces.iter_mut()) {
        for (x, y, tile_id) in layer.cells() {
            if tile_id >= 0 && painter.catalog.is_animated(tile_id) {
                painter.redraw_cell(surface, x, y, tile_id);
            }
        }
    }
}
