use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use image::ImageReader;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::coords::{GridSize, PixelRect};
use crate::font::BitmapFont;
use crate::surface::{Rgb, Surface};
use crate::texture::{IndexedTileset, NamedAtlas};

use super::document::{parse_map_document, parse_tile_properties, MapDocument, TilePropertiesDocument};
use super::{parse_json, LoadError};

/// One sprite entry of a named-atlas document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtlasEntry {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Appends `.json` unless the path already ends with it.
pub fn resolve_json_path(path: &Path) -> PathBuf {
    let has_json_extension = path
        .extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| extension.eq_ignore_ascii_case("json"));
    if has_json_extension {
        return path.to_path_buf();
    }
    let mut raw = path.as_os_str().to_owned();
    raw.push(".json");
    PathBuf::from(raw)
}

fn read_text(path: &Path) -> Result<String, LoadError> {
    fs::read_to_string(path).map_err(|source| LoadError::ReadFile {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_map_document(path: &Path) -> Result<MapDocument, LoadError> {
    let path = resolve_json_path(path);
    let document = parse_map_document(&read_text(&path)?)?;
    info!(
        path = %path.display(),
        chunk_count = document.chunks.len(),
        "map_document_loaded"
    );
    Ok(document)
}

pub fn load_tile_properties(path: &Path) -> Result<TilePropertiesDocument, LoadError> {
    let path = resolve_json_path(path);
    let document = parse_tile_properties(&read_text(&path)?)?;
    info!(
        path = %path.display(),
        tile_count = document.len(),
        "tile_properties_loaded"
    );
    Ok(document)
}

pub fn load_rgba_image(path: &Path, colorkey: Option<Rgb>) -> Result<Surface, LoadError> {
    let decode_error = |source| LoadError::DecodeImage {
        path: path.to_path_buf(),
        source,
    };
    let reader = ImageReader::open(path).map_err(|source| LoadError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = reader.with_guessed_format().map_err(|source| LoadError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    let decoded = reader.decode().map_err(decode_error)?;
    Ok(Surface::from_image(decoded.to_rgba8()).with_colorkey(colorkey))
}

pub fn load_indexed_tileset(
    path: &Path,
    tile_size: GridSize,
    colorkey: Option<Rgb>,
) -> Result<IndexedTileset, LoadError> {
    let image = load_rgba_image(path, colorkey)?;
    let tileset = IndexedTileset::new(image, tile_size);
    info!(
        path = %path.display(),
        tile_count = tileset.tile_count(),
        "indexed_tileset_loaded"
    );
    Ok(tileset)
}

/// Loads a spritesheet image and its `{name: {x, y, width, height}}` document.
pub fn load_named_atlas(
    image_path: &Path,
    atlas_path: &Path,
    colorkey: Option<Rgb>,
) -> Result<NamedAtlas, LoadError> {
    let image = load_rgba_image(image_path, colorkey)?;
    let atlas_path = resolve_json_path(atlas_path);
    let entries: BTreeMap<String, AtlasEntry> =
        parse_json("texture atlas", &read_text(&atlas_path)?)?;
    let regions = entries
        .into_iter()
        .map(|(name, entry)| {
            (
                name,
                PixelRect::new(entry.x, entry.y, entry.width, entry.height),
            )
        })
        .collect::<HashMap<_, _>>();
    info!(
        image = %image_path.display(),
        atlas = %atlas_path.display(),
        sprite_count = regions.len(),
        "named_atlas_loaded"
    );
    Ok(NamedAtlas::new(image, regions))
}

/// Loads a glyph strip image whose glyphs spell out `chars` in order.
pub fn load_bitmap_font(
    path: &Path,
    chars: &str,
    spacing: u32,
    colorkey: Option<Rgb>,
) -> Result<BitmapFont, LoadError> {
    let font = BitmapFont::new(load_rgba_image(path, colorkey)?, chars, spacing)?;
    info!(
        path = %path.display(),
        glyph_count = chars.chars().filter(|ch| font.has_glyph(*ch)).count(),
        char_height = font.char_height(),
        "bitmap_font_loaded"
    );
    Ok(font)
}
