mod document;
mod files;
mod tiled;

use std::io;
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::error::TileMapError;
use crate::font::FontError;

pub use document::{
    parse_map_document, parse_tile_properties, tile_definitions, ChunkDocument, MapDocument,
    TilePropertiesDocument,
};
pub use files::{
    load_bitmap_font, load_indexed_tileset, load_map_document, load_named_atlas, load_rgba_image,
    load_tile_properties, resolve_json_path, AtlasEntry,
};
pub use tiled::{import_tiled_map, import_tiled_tileset, TILED_TICKS_PER_SECOND};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {document} json at {json_path}: {source}")]
    ParseJson {
        document: &'static str,
        json_path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to decode image {path}: {source}")]
    DecodeImage {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error(transparent)]
    Map(#[from] TileMapError),
    #[error(transparent)]
    Font(#[from] FontError),
}

fn parse_json<D: DeserializeOwned>(document: &'static str, raw: &str) -> Result<D, LoadError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize::<_, D>(&mut deserializer).map_err(|error| {
        let json_path = error.path().to_string();
        LoadError::ParseJson {
            document,
            json_path,
            source: error.into_inner(),
        }
    })
}
