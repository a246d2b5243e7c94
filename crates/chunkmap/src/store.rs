use std::collections::HashMap;

use crate::coords::{ChunkKey, CoordinateMapper, GridSize, TilePos, WorldPos};
use crate::error::TileMapError;
use crate::{TileId, EMPTY_TILE};

/// Row-major grid of tile ids, `width * height` entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layer {
    width: u32,
    height: u32,
    tiles: Vec<TileId>,
}

impl Layer {
    /// Builds a layer from nested rows, rejecting anything that is not
    /// exactly `size.height` rows of `size.width` ids.
    pub fn from_rows(size: GridSize, rows: &[Vec<TileId>]) -> Result<Self, TileMapError> {
        if rows.len() != size.height as usize {
            return Err(TileMapError::map_format(format!(
                "layer has {} rows, expected {}",
                rows.len(),
                size.height
            )));
        }
        let mut tiles = Vec::with_capacity(size.area());
        for (row_index, row) in rows.iter().enumerate() {
            if row.len() != size.width as usize {
                return Err(TileMapError::map_format(format!(
                    "layer row {row_index} has {} columns, expected {}",
                    row.len(),
                    size.width
                )));
            }
            tiles.extend_from_slice(row);
        }
        Ok(Self {
            width: size.width,
            height: size.height,
            tiles,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn index_of(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    pub fn get(&self, x: u32, y: u32) -> Option<TileId> {
        self.index_of(x, y).map(|index| self.tiles[index])
    }

    /// Returns the previous id, or `None` if `(x, y)` is out of bounds.
    pub fn set(&mut self, x: u32, y: u32, tile_id: TileId) -> Option<TileId> {
        let index = self.index_of(x, y)?;
        Some(std::mem::replace(&mut self.tiles[index], tile_id))
    }

    /// `(x, y, tile_id)` for every cell in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (u32, u32, TileId)> + '_ {
        let width = self.width.max(1);
        self.tiles
            .iter()
            .enumerate()
            .map(move |(index, &tile_id)| (index as u32 % width, index as u32 / width, tile_id))
    }

    pub fn rows(&self) -> Vec<Vec<TileId>> {
        self.tiles
            .chunks(self.width.max(1) as usize)
            .map(<[TileId]>::to_vec)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    layers: Vec<Layer>,
}

impl Chunk {
    pub fn new(layers: Vec<Layer>) -> Self {
        Self { layers }
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }
}

/// Sparse chunk dictionary; a missing key is empty space.
#[derive(Debug, Clone)]
pub struct ChunkStore {
    mapper: CoordinateMapper,
    chunks: HashMap<ChunkKey, Chunk>,
}

impl ChunkStore {
    /// `chunks` yields each chunk's layers as nested rows. Every layer must be
    /// exactly `chunk_size` and keys must be unique.
    pub fn new(
        tile_size: GridSize,
        chunk_size: GridSize,
        chunks: impl IntoIterator<Item = (ChunkKey, Vec<Vec<Vec<TileId>>>)>,
    ) -> Result<Self, TileMapError> {
        let mapper = CoordinateMapper::new(tile_size, chunk_size)?;
        let mut store = HashMap::new();
        for (key, raw_layers) in chunks {
            if !mapper.is_addressable(key) {
                return Err(TileMapError::map_format(format!(
                    "chunk {key} lies outside the addressable world"
                )));
            }
            let layers = raw_layers
                .iter()
                .enumerate()
                .map(|(index, rows)| {
                    Layer::from_rows(chunk_size, rows).map_err(|error| {
                        TileMapError::map_format(format!("chunk {key} layer {index}: {error}"))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            if store.insert(key, Chunk::new(layers)).is_some() {
                return Err(TileMapError::map_format(format!("duplicate chunk {key}")));
            }
        }
        Ok(Self {
            mapper,
            chunks: store,
        })
    }

    pub fn mapper(&self) -> &CoordinateMapper {
        &self.mapper
    }

    pub fn tile_size(&self) -> GridSize {
        self.mapper.tile_size()
    }

    pub fn chunk_size(&self) -> GridSize {
        self.mapper.chunk_size()
    }

    pub fn chunk(&self, key: ChunkKey) -> Option<&Chunk> {
        self.chunks.get(&key)
    }

    pub fn contains(&self, key: ChunkKey) -> bool {
        self.chunks.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Keys of every stored chunk, in no particular order. Call again to restart.
    pub fn chunk_keys(&self) -> impl Iterator<Item = ChunkKey> + '_ {
        self.chunks.keys().copied()
    }

    pub fn layer_grid(&self, key: ChunkKey, layer_index: usize) -> Result<&Layer, TileMapError> {
        let chunk = self
            .chunks
            .get(&key)
            .ok_or(TileMapError::ChunkNotFound { key })?;
        chunk
            .layers
            .get(layer_index)
            .ok_or(TileMapError::LayerIndexOutOfRange {
                key,
                layer_index,
                layer_count: chunk.layers.len(),
            })
    }

    /// Direct grid access. Edits made through this reference bypass any
    /// render cache; prefer [`crate::TileMap::set_tile`].
    pub fn layer_grid_mut(
        &mut self,
        key: ChunkKey,
        layer_index: usize,
    ) -> Result<&mut Layer, TileMapError> {
        let chunk = self
            .chunks
            .get_mut(&key)
            .ok_or(TileMapError::ChunkNotFound { key })?;
        let layer_count = chunk.layers.len();
        chunk
            .layers
            .get_mut(layer_index)
            .ok_or(TileMapError::LayerIndexOutOfRange {
                key,
                layer_index,
                layer_count,
            })
    }

    pub fn tile_at(
        &self,
        key: ChunkKey,
        layer_index: usize,
        position: TilePos,
    ) -> Result<TileId, TileMapError> {
        let layer = self.layer_grid(key, layer_index)?;
        layer
            .get(position.x, position.y)
            .ok_or(TileMapError::TileIndexOutOfBounds {
                key,
                x: position.x,
                y: position.y,
                width: layer.width,
                height: layer.height,
            })
    }

    /// Tile under a world position. Absent chunks read as [`EMPTY_TILE`].
    pub fn tile_at_world(
        &self,
        position: WorldPos,
        layer_index: usize,
    ) -> Result<TileId, TileMapError> {
        let (key, tile) = self.mapper.locate(position);
        if !self.contains(key) {
            return Ok(EMPTY_TILE);
        }
        self.tile_at(key, layer_index, tile)
    }

    /// Logical edit. Never creates chunks. Returns the replaced id.
    pub fn set_tile(
        &mut self,
        key: ChunkKey,
        layer_index: usize,
        position: TilePos,
        tile_id: TileId,
    ) -> Result<TileId, TileMapError> {
        let layer = self.layer_grid_mut(key, layer_index)?;
        let (width, height) = (layer.width, layer.height);
        layer
            .set(position.x, position.y, tile_id)
            .ok_or(TileMapError::TileIndexOutOfBounds {
                key,
                x: position.x,
                y: position.y,
                width,
                height,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> ChunkStore {
        ChunkStore::new(
            GridSize::new(8, 8),
            GridSize::new(2, 2),
            [
                (ChunkKey::new(0, 0), vec![vec![vec![0, -1], vec![-1, 1]]]),
                (
                    ChunkKey::new(-1, 0),
                    vec![vec![vec![2, 2], vec![2, 2]], vec![vec![-1, 3], vec![-1, -1]]],
                ),
            ],
        )
        .expect("store")
    }

    #[test]
    fn short_layer_is_a_format_error() {
        let error = ChunkStore::new(
            GridSize::new(8, 8),
            GridSize::new(2, 2),
            [(ChunkKey::new(0, 0), vec![vec![vec![0, 0]]])],
        )
        .expect_err("short layer");
        assert!(matches!(error, TileMapError::MapFormat { .. }), "{error}");
    }

    #[test]
    fn ragged_row_is_a_format_error() {
        let result = ChunkStore::new(
            GridSize::new(8, 8),
            GridSize::new(2, 2),
            [(ChunkKey::new(0, 0), vec![vec![vec![0, 0], vec![0]]])],
        );
        assert!(matches!(result, Err(TileMapError::MapFormat { .. })));
    }

    #[test]
    fn duplicate_chunk_key_is_a_format_error() {
        let layer = vec![vec![vec![0, 0], vec![0, 0]]];
        let result = ChunkStore::new(
            GridSize::new(8, 8),
            GridSize::new(2, 2),
            [
                (ChunkKey::new(0, 0), layer.clone()),
                (ChunkKey::new(0, 0), layer),
            ],
        );
        assert!(matches!(result, Err(TileMapError::MapFormat { .. })));
    }

    #[test]
    fn layer_grid_reports_missing_chunk_and_layer() {
        let store = store();
        assert_eq!(
            store.layer_grid(ChunkKey::new(5, 5), 0).expect_err("missing"),
            TileMapError::ChunkNotFound {
                key: ChunkKey::new(5, 5)
            }
        );
        assert_eq!(
            store.layer_grid(ChunkKey::new(0, 0), 1).expect_err("layer"),
            TileMapError::LayerIndexOutOfRange {
                key: ChunkKey::new(0, 0),
                layer_index: 1,
                layer_count: 1,
            }
        );
        assert_eq!(store.layer_grid(ChunkKey::new(-1, 0), 1).expect("layer").get(1, 0), Some(3));
    }

    #[test]
    fn set_tile_edits_in_place_and_returns_previous() {
        let mut store = store();
        let previous = store
            .set_tile(ChunkKey::new(0, 0), 0, TilePos::new(1, 0), 9)
            .expect("set");
        assert_eq!(previous, -1);
        assert_eq!(
            store.tile_at(ChunkKey::new(0, 0), 0, TilePos::new(1, 0)),
            Ok(9)
        );
    }

    #[test]
    fn set_tile_never_creates_chunks() {
        let mut store = store();
        let result = store.set_tile(ChunkKey::new(3, 3), 0, TilePos::new(0, 0), 1);
        assert!(matches!(result, Err(TileMapError::ChunkNotFound { .. })));
        assert!(!store.contains(ChunkKey::new(3, 3)));
    }

    #[test]
    fn set_tile_rejects_out_of_bounds_position() {
        let mut store = store();
        let result = store.set_tile(ChunkKey::new(0, 0), 0, TilePos::new(2, 0), 1);
        assert!(matches!(
            result,
            Err(TileMapError::TileIndexOutOfBounds { x: 2, y: 0, .. })
        ));
    }

    #[test]
    fn tile_at_world_reads_negative_chunks_and_empty_space() {
        let store = store();
        assert_eq!(store.tile_at_world(WorldPos::new(-1, 0), 1), Ok(3));
        assert_eq!(store.tile_at_world(WorldPos::new(9, 9), 0), Ok(1));
        assert_eq!(store.tile_at_world(WorldPos::new(100, 100), 0), Ok(EMPTY_TILE));
    }

    #[test]
    fn chunk_keys_is_restartable() {
        let store = store();
        let mut first = store.chunk_keys().collect::<Vec<_>>();
        let mut second = store.chunk_keys().collect::<Vec<_>>();
        first.sort();
        second.sort();
        assert_eq!(first, vec![ChunkKey::new(-1, 0), ChunkKey::new(0, 0)]);
        assert_eq!(first, second);
    }

    #[test]
    fn cells_walk_row_major() {
        let layer = Layer::from_rows(GridSize::new(2, 2), &[vec![0, -1], vec![-1, 1]]).expect("layer");
        let cells = layer.cells().collect::<Vec<_>>();
        assert_eq!(cells, vec![(0, 0, 0), (1, 0, -1), (0, 1, -1), (1, 1, 1)]);
        assert_eq!(layer.rows(), vec![vec![0, -1], vec![-1, 1]]);
    }

    #[test]
    fn chunk_beyond_world_coordinates_is_a_format_error() {
        let result = ChunkStore::new(
            GridSize::new(16, 16),
            GridSize::new(1, 1),
            [(ChunkKey::new(i32::MAX, 0), vec![vec![vec![0]]])],
        );
        assert!(matches!(result, Err(TileMapError::MapFormat { .. })));
    }
}
