use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::catalog::TileDefinition;
use crate::coords::{ChunkKey, GridSize};
use crate::error::TileMapError;
use crate::store::ChunkStore;
use crate::TileId;

use super::{parse_json, LoadError};

/// Parsed map document: `{"tile_size": [w, h], "chunk_size": [w, h],
/// "chunks": {"x,y": {"layers": [[[id, ...], ...], ...]}}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapDocument {
    pub tile_size: [u32; 2],
    pub chunk_size: [u32; 2],
    pub chunks: BTreeMap<String, ChunkDocument>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkDocument {
    pub layers: Vec<Vec<Vec<TileId>>>,
}

/// Tile id (decimal string key) to definition.
pub type TilePropertiesDocument = BTreeMap<String, TileDefinition>;

impl MapDocument {
    pub fn tile_size(&self) -> GridSize {
        GridSize::new(self.tile_size[0], self.tile_size[1])
    }

    pub fn chunk_size(&self) -> GridSize {
        GridSize::new(self.chunk_size[0], self.chunk_size[1])
    }

    /// Validates and converts into a store. Nothing is built on error.
    pub fn into_store(self) -> Result<ChunkStore, TileMapError> {
        let tile_size = self.tile_size();
        let chunk_size = self.chunk_size();
        let chunks = self
            .chunks
            .into_iter()
            .map(|(raw_key, chunk)| Ok((raw_key.parse::<ChunkKey>()?, chunk.layers)))
            .collect::<Result<Vec<_>, TileMapError>>()?;
        ChunkStore::new(tile_size, chunk_size, chunks)
    }

    /// Snapshot of a store's current logical contents.
    pub fn from_store(store: &ChunkStore) -> Self {
        let tile_size = store.tile_size();
        let chunk_size = store.chunk_size();
        let chunks = store
            .chunk_keys()
            .filter_map(|key| {
                store.chunk(key).map(|chunk| {
                    let layers = chunk.layers().iter().map(|layer| layer.rows()).collect();
                    (key.to_string(), ChunkDocument { layers })
                })
            })
            .collect();
        Self {
            tile_size: [tile_size.width, tile_size.height],
            chunk_size: [chunk_size.width, chunk_size.height],
            chunks,
        }
    }
}

pub fn parse_map_document(raw: &str) -> Result<MapDocument, LoadError> {
    parse_json("map", raw)
}

pub fn parse_tile_properties(raw: &str) -> Result<TilePropertiesDocument, LoadError> {
    parse_json("tile properties", raw)
}

/// Converts string keys to tile ids; a non-integer key is a format error.
pub fn tile_definitions(
    document: TilePropertiesDocument,
) -> Result<Vec<(TileId, TileDefinition)>, TileMapError> {
    document
        .into_iter()
        .map(|(raw_id, definition)| {
            let tile_id = raw_id.trim().parse::<TileId>().map_err(|_| {
                TileMapError::map_format(format!("tile properties key '{raw_id}' is not a tile id"))
            })?;
            Ok((tile_id, definition))
        })
        .collect()
}
