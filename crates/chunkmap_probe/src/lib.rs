use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chunkmap::loader::{
    import_tiled_map, import_tiled_tileset, load_indexed_tileset, load_map_document,
    load_named_atlas, load_tile_properties, resolve_json_path, MapDocument, TilePropertiesDocument,
};
use chunkmap::{
    build_tilemap, ChunkKey, PixelRect, RenderConfig, Rgb, TextureRegion, TextureSource, TileId,
    TilePos, TRANSPARENT,
};
use tracing::{info, warn};

pub const ASSET_ROOT_ENV_VAR: &str = "CHUNKMAP_ASSET_ROOT";
pub const DEFAULT_TICKS: u32 = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextureChoice {
    None,
    Tileset(PathBuf),
    Atlas { image: PathBuf, regions: PathBuf },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileEdit {
    pub chunk: ChunkKey,
    pub layer_index: usize,
    pub position: TilePos,
    pub tile_id: TileId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOptions {
    pub map: PathBuf,
    pub tiles: Option<PathBuf>,
    pub textures: TextureChoice,
    pub tiled: bool,
    pub ticks: u32,
    pub queries: Vec<PixelRect>,
    pub layer_index: usize,
    pub properties: Vec<String>,
    pub colorkey: Option<Rgb>,
    pub edits: Vec<TileEdit>,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            map: PathBuf::new(),
            tiles: None,
            textures: TextureChoice::None,
            tiled: false,
            ticks: DEFAULT_TICKS,
            queries: Vec::new(),
            layer_index: 0,
            properties: Vec::new(),
            colorkey: None,
            edits: Vec::new(),
        }
    }
}

/// Stands in for a tileset when only logical data is inspected.
struct NoTextures;

impl TextureSource for NoTextures {
    fn region_for_id(&self, _tile_id: TileId) -> Option<TextureRegion<'_>> {
        None
    }
}

pub fn parse_args(args: &[String]) -> Result<ProbeOptions, String> {
    let mut options = ProbeOptions::default();
    let mut map = None;
    let mut atlas_image = None;
    let mut atlas_regions = None;
    let mut index = 0usize;
    while index < args.len() {
        let flag = args[index].as_str();
        if flag == "--tiled" {
            options.tiled = true;
            index += 1;
            continue;
        }
        let value = args
            .get(index + 1)
            .ok_or_else(|| format!("missing value for {flag}"))?;
        match flag {
            "--map" => map = Some(PathBuf::from(value)),
            "--tiles" => options.tiles = Some(PathBuf::from(value)),
            "--tileset" => options.textures = TextureChoice::Tileset(PathBuf::from(value)),
            "--atlas" => atlas_image = Some(PathBuf::from(value)),
            "--atlas-json" => atlas_regions = Some(PathBuf::from(value)),
            "--ticks" => {
                options.ticks = value
                    .parse::<u32>()
                    .map_err(|_| format!("invalid --ticks value '{value}' (expected u32)"))?;
            }
            "--layer" => {
                options.layer_index = value
                    .parse::<usize>()
                    .map_err(|_| format!("invalid --layer value '{value}' (expected usize)"))?;
            }
            "--query" => {
                let [x, y, width, height] = parse_ints::<4>(value, "--query")?;
                if width < 0 || height < 0 {
                    return Err(format!("invalid --query value '{value}' (negative size)"));
                }
                options
                    .queries
                    .push(PixelRect::new(x, y, width as u32, height as u32));
            }
            "--property" => options.properties.push(value.clone()),
            "--colorkey" => {
                let [r, g, b] = parse_ints::<3>(value, "--colorkey")?;
                let channel = |raw: i32| {
                    u8::try_from(raw)
                        .map_err(|_| format!("invalid --colorkey value '{value}' (expected 0-255)"))
                };
                options.colorkey = Some([channel(r)?, channel(g)?, channel(b)?]);
            }
            "--set" => {
                let [chunk_x, chunk_y, layer, x, y, tile_id] = parse_ints::<6>(value, "--set")?;
                if layer < 0 || x < 0 || y < 0 {
                    return Err(format!(
                        "invalid --set value '{value}' (layer and tile position must be >= 0)"
                    ));
                }
                options.edits.push(TileEdit {
                    chunk: ChunkKey::new(chunk_x, chunk_y),
                    layer_index: layer as usize,
                    position: TilePos::new(x as u32, y as u32),
                    tile_id,
                });
            }
            other => return Err(format!("unknown argument '{other}'")),
        }
        index += 2;
    }

    options.map = map.ok_or_else(|| "missing required --map".to_string())?;
    match (atlas_image, atlas_regions) {
        (Some(image), Some(regions)) => {
            options.textures = TextureChoice::Atlas { image, regions };
        }
        (Some(image), None) => {
            let regions = image.with_extension("json");
            options.textures = TextureChoice::Atlas { image, regions };
        }
        (None, Some(_)) => return Err("--atlas-json requires --atlas".to_string()),
        (None, None) => {}
    }
    Ok(options)
}

fn parse_ints<const N: usize>(raw: &str, flag: &str) -> Result<[i32; N], String> {
    let invalid = || format!("invalid {flag} value '{raw}' (expected {N} comma-separated integers)");
    let parts = raw
        .split(',')
        .map(|part| part.trim().parse::<i32>().map_err(|_| invalid()))
        .collect::<Result<Vec<_>, _>>()?;
    parts.try_into().map_err(|_| invalid())
}

/// Resolves `path` against `$CHUNKMAP_ASSET_ROOT` when it is relative.
pub fn resolve_asset_path(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match env::var(ASSET_ROOT_ENV_VAR) {
        Ok(root) if !root.trim().is_empty() => PathBuf::from(root).join(path),
        _ => path.to_path_buf(),
    }
}

fn read_text(path: &Path) -> Result<String, String> {
    let path = resolve_json_path(path);
    fs::read_to_string(&path).map_err(|error| format!("failed to read {}: {error}", path.display()))
}

fn load_documents(
    options: &ProbeOptions,
) -> Result<(MapDocument, TilePropertiesDocument), String> {
    let map_path = resolve_asset_path(&options.map);
    let tiles_path = options.tiles.as_deref().map(resolve_asset_path);
    if options.tiled {
        let map = import_tiled_map(&read_text(&map_path)?).map_err(|error| error.to_string())?;
        let tiles = match tiles_path {
            Some(path) => {
                import_tiled_tileset(&read_text(&path)?).map_err(|error| error.to_string())?
            }
            None => TilePropertiesDocument::new(),
        };
        return Ok((map, tiles));
    }
    let map = load_map_document(&map_path).map_err(|error| error.to_string())?;
    let tiles = match tiles_path {
        Some(path) => load_tile_properties(&path).map_err(|error| error.to_string())?,
        None => TilePropertiesDocument::new(),
    };
    Ok((map, tiles))
}

fn load_textures(
    options: &ProbeOptions,
    map: &MapDocument,
) -> Result<Box<dyn TextureSource>, String> {
    let textures: Box<dyn TextureSource> = match &options.textures {
        TextureChoice::None => Box::new(NoTextures),
        TextureChoice::Tileset(path) => Box::new(
            load_indexed_tileset(&resolve_asset_path(path), map.tile_size(), options.colorkey)
                .map_err(|error| error.to_string())?,
        ),
        TextureChoice::Atlas { image, regions } => Box::new(
            load_named_atlas(
                &resolve_asset_path(image),
                &resolve_asset_path(regions),
                options.colorkey,
            )
            .map_err(|error| error.to_string())?,
        ),
    };
    Ok(textures)
}

/// Loads the map, applies edits, ticks animations, renders every chunk and
/// runs the queries, writing one summary line per step to `out`.
pub fn run(options: &ProbeOptions, out: &mut dyn Write) -> Result<(), String> {
    let (map_document, tiles_document) = load_documents(options)?;
    let textures = load_textures(options, &map_document)?;
    let config = RenderConfig {
        colorkey: options.colorkey,
    };
    let mut tilemap = build_tilemap(map_document, tiles_document, textures, config)
        .map_err(|error| error.to_string())?;

    let mut keys = tilemap.chunk_keys().collect::<Vec<_>>();
    keys.sort_unstable();
    let tile_size = tilemap.store().tile_size();
    let chunk_size = tilemap.store().chunk_size();
    emit(
        out,
        format!(
            "map chunks={} tile_size={}x{} chunk_size={}x{} tiles={} animated={}",
            keys.len(),
            tile_size.width,
            tile_size.height,
            chunk_size.width,
            chunk_size.height,
            tilemap.catalog().len(),
            tilemap.catalog().animated_tile_ids().count()
        ),
    )?;

    tilemap.render_all().map_err(|error| error.to_string())?;

    for edit in &options.edits {
        let previous = tilemap
            .set_tile(edit.chunk, edit.layer_index, edit.position, edit.tile_id)
            .map_err(|error| error.to_string())?;
        info!(
            chunk = %edit.chunk,
            layer_index = edit.layer_index,
            x = edit.position.x,
            y = edit.position.y,
            previous,
            tile_id = edit.tile_id,
            "probe_tile_set"
        );
        emit(
            out,
            format!(
                "edit chunk={} layer={} tile={},{} {}->{}",
                edit.chunk,
                edit.layer_index,
                edit.position.x,
                edit.position.y,
                previous,
                edit.tile_id
            ),
        )?;
    }

    let mut keyframe_changes = 0usize;
    for _ in 0..options.ticks {
        keyframe_changes += tilemap.update_animations().len();
    }
    if options.ticks > 0 {
        emit(
            out,
            format!("ticks={} keyframe_changes={keyframe_changes}", options.ticks),
        )?;
    }

    for key in &keys {
        let origin = tilemap.chunk_position(*key);
        let composite = tilemap
            .composite_chunk(*key)
            .map_err(|error| error.to_string())?;
        let covered = composite
            .rgba()
            .chunks_exact(4)
            .filter(|pixel| *pixel != TRANSPARENT.as_slice())
            .count();
        let layers = tilemap
            .store()
            .chunk(*key)
            .map(|chunk| chunk.layer_count())
            .unwrap_or_default();
        emit(
            out,
            format!(
                "chunk {key} origin={},{} layers={layers} covered_pixels={covered}",
                origin.x, origin.y
            ),
        )?;
    }

    for rect in &options.queries {
        let hits = match tilemap.overlapping_tiles(
            *rect,
            options.layer_index,
            options.properties.as_slice(),
        ) {
            Ok(hits) => hits,
            Err(error) => {
                warn!(error = %error, "probe_query_failed");
                return Err(error.to_string());
            }
        };
        let rendered = hits
            .iter()
            .map(|hit| format!("({},{},{},{})", hit.x, hit.y, hit.width, hit.height))
            .collect::<Vec<_>>()
            .join(" ");
        emit(
            out,
            format!(
                "query rect=({},{},{},{}) layer={} properties=[{}] hits={} {rendered}",
                rect.x,
                rect.y,
                rect.width,
                rect.height,
                options.layer_index,
                options.properties.join(","),
                hits.len()
            )
            .trim_end()
            .to_string(),
        )?;
    }
    Ok(())
}

fn emit(out: &mut dyn Write, line: String) -> Result<(), String> {
    writeln!(out, "{line}").map_err(|error| format!("failed to write output: {error}"))
}
