use thiserror::Error;

use crate::coords::ChunkKey;
use crate::TileId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TileMapError {
    #[error("malformed map data: {reason}")]
    MapFormat { reason: String },
    #[error("chunk {key} does not exist")]
    ChunkNotFound { key: ChunkKey },
    #[error("layer {layer_index} out of range for chunk {key} ({layer_count} layers)")]
    LayerIndexOutOfRange {
        key: ChunkKey,
        layer_index: usize,
        layer_count: usize,
    },
    #[error("tile ({x},{y}) outside chunk {key} bounds {width}x{height}")]
    TileIndexOutOfBounds {
        key: ChunkKey,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },
    #[error("invalid animation for tile {tile_id}: {reason}")]
    InvalidAnimationSpec { tile_id: TileId, reason: String },
}

impl TileMapError {
    pub(crate) fn map_format(reason: impl Into<String>) -> Self {
        Self::MapFormat {
            reason: reason.into(),
        }
    }
}
