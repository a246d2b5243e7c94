use std::collections::BTreeMap;

use serde::Deserialize;

use crate::animation::Keyframe;
use crate::catalog::{PropertyBag, PropertyValue, TileDefinition};
use crate::coords::ChunkKey;
use crate::error::TileMapError;
use crate::texture::TextureRef;
use crate::{TileId, EMPTY_TILE};

use super::document::{ChunkDocument, MapDocument, TilePropertiesDocument};
use super::{parse_json, LoadError};

/// Tick rate used to turn Tiled frame durations (milliseconds) into frames.
pub const TILED_TICKS_PER_SECOND: u64 = 60;

const TILED_GID_MASK: u64 = 0x1FFF_FFFF;
const TILE_LAYER_KIND: &str = "tilelayer";

#[derive(Debug, Deserialize)]
struct TiledMap {
    tilewidth: u32,
    tileheight: u32,
    #[serde(default)]
    layers: Vec<TiledLayer>,
}

#[derive(Debug, Deserialize)]
struct TiledLayer {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    chunks: Vec<TiledChunk>,
}

#[derive(Debug, Deserialize)]
struct TiledChunk {
    x: i32,
    y: i32,
    width: u32,
    height: u32,
    data: Vec<u64>,
}

#[derive(Debug, Deserialize)]
struct TiledTileset {
    #[serde(default)]
    tiles: Vec<TiledTile>,
}

#[derive(Debug, Deserialize)]
struct TiledTile {
    id: TileId,
    #[serde(default)]
    properties: Vec<TiledProperty>,
    #[serde(default)]
    animation: Vec<TiledFrame>,
}

#[derive(Debug, Deserialize)]
struct TiledProperty {
    name: String,
    value: PropertyValue,
}

#[derive(Debug, Deserialize)]
struct TiledFrame {
    tileid: TileId,
    duration: u64,
}

/// Converts an infinite Tiled JSON map into a [`MapDocument`].
///
/// Tiled gids are 1-based with 0 meaning empty, so every id is shifted down
/// by one. Flip flags in the top bits are dropped. Each tile layer becomes
/// one chunk layer, in document order; chunks missing from a layer get an
/// all-empty layer in that slot.
pub fn import_tiled_map(raw: &str) -> Result<MapDocument, LoadError> {
    let source: TiledMap = parse_json("tiled map", raw)?;
    let mut chunk_size: Option<(u32, u32)> = None;
    let mut chunks = BTreeMap::<ChunkKey, Vec<Vec<Vec<TileId>>>>::new();
    let mut layer_count = 0usize;

    for layer in source.layers.iter().filter(|layer| layer.kind == TILE_LAYER_KIND) {
        if layer.chunks.is_empty() {
            continue;
        }
        for chunk in &layer.chunks {
            let size = (chunk.width, chunk.height);
            if size.0 == 0 || size.1 == 0 {
                return Err(TileMapError::map_format(format!(
                    "tiled chunk at ({}, {}) has zero size",
                    chunk.x, chunk.y
                ))
                .into());
            }
            match chunk_size {
                None => chunk_size = Some(size),
                Some(expected) if expected != size => {
                    return Err(TileMapError::map_format(format!(
                        "tiled chunk at ({}, {}) is {}x{}, expected {}x{}",
                        chunk.x, chunk.y, size.0, size.1, expected.0, expected.1
                    ))
                    .into());
                }
                Some(_) => {}
            }
            let expected_len = size.0 as usize * size.1 as usize;
            if chunk.data.len() != expected_len {
                return Err(TileMapError::map_format(format!(
                    "tiled chunk at ({}, {}) has {} tiles, expected {}",
                    chunk.x,
                    chunk.y,
                    chunk.data.len(),
                    expected_len
                ))
                .into());
            }

            let key = ChunkKey::new(
                chunk.x.div_euclid(size.0 as i32),
                chunk.y.div_euclid(size.1 as i32),
            );
            let rows = chunk
                .data
                .chunks(size.0 as usize)
                .map(|row| row.iter().map(|gid| gid_to_tile_id(*gid)).collect())
                .collect::<Vec<Vec<TileId>>>();
            let layers = chunks.entry(key).or_default();
            pad_layers(layers, layer_count, size);
            layers.push(rows);
        }
        layer_count += 1;
    }

    let (chunk_width, chunk_height) = chunk_size.unwrap_or((1, 1));
    let chunks = chunks
        .into_iter()
        .map(|(key, mut layers)| {
            pad_layers(&mut layers, layer_count, (chunk_width, chunk_height));
            (key.to_string(), ChunkDocument { layers })
        })
        .collect();
    Ok(MapDocument {
        tile_size: [source.tilewidth, source.tileheight],
        chunk_size: [chunk_width, chunk_height],
        chunks,
    })
}

/// Converts a Tiled tileset's per-tile properties and animations into a
/// tile-properties document. Tiles with neither are skipped.
pub fn import_tiled_tileset(raw: &str) -> Result<TilePropertiesDocument, LoadError> {
    let source: TiledTileset = parse_json("tiled tileset", raw)?;
    let mut document = TilePropertiesDocument::new();
    for tile in source.tiles {
        if tile.properties.is_empty() && tile.animation.is_empty() {
            continue;
        }
        let properties = tile
            .properties
            .into_iter()
            .map(|property| (property.name, property.value))
            .collect::<PropertyBag>();
        let animation = (!tile.animation.is_empty()).then(|| {
            tile.animation
                .iter()
                .map(|frame| Keyframe {
                    frames: duration_to_frames(frame.duration),
                    texture: TextureRef::Id(frame.tileid),
                })
                .collect::<Vec<_>>()
        });
        document.insert(
            tile.id.to_string(),
            TileDefinition {
                animation,
                properties,
            },
        );
    }
    Ok(document)
}

fn gid_to_tile_id(gid: u64) -> TileId {
    let gid = gid & TILED_GID_MASK;
    (gid as i64 - 1) as TileId
}

fn duration_to_frames(duration_ms: u64) -> u32 {
    let frames = duration_ms
        .saturating_mul(TILED_TICKS_PER_SECOND)
        .saturating_add(500)
        / 1000;
    frames.clamp(1, u64::from(u32::MAX)) as u32
}

fn pad_layers(layers: &mut Vec<Vec<Vec<TileId>>>, count: usize, size: (u32, u32)) {
    while layers.len() < count {
        layers.push(vec![vec![EMPTY_TILE; size.0 as usize]; size.1 as usize]);
    }
}
