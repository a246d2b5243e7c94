use std::fmt;
use std::str::FromStr;

use crate::error::TileMapError;
use crate::TileId;

/// Integer chunk address. Formats as `"x,y"`, the key used by map documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkKey {
    pub x: i32,
    pub y: i32,
}

impl ChunkKey {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for ChunkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

impl FromStr for ChunkKey {
    type Err = TileMapError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || TileMapError::map_format(format!("invalid chunk key '{raw}'"));
        let (x, y) = raw.split_once(',').ok_or_else(invalid)?;
        let x = x.trim().parse::<i32>().map_err(|_| invalid())?;
        let y = y.trim().parse::<i32>().map_err(|_| invalid())?;
        Ok(Self { x, y })
    }
}

/// Width/height pair used for both tile size (pixels) and chunk size (tiles).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridSize {
    pub width: u32,
    pub height: u32,
}

impl GridSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// World position in pixels. Positive y points down, as in the rendered surfaces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct WorldPos {
    pub x: i32,
    pub y: i32,
}

impl WorldPos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Tile position inside a chunk, `0 <= x < chunk_width`, `0 <= y < chunk_height`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TilePos {
    pub x: u32,
    pub y: u32,
}

impl TilePos {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> i32 {
        self.x.saturating_add(self.width as i32)
    }

    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(self.height as i32)
    }

    /// Top-left, top-right, bottom-left, bottom-right. Right and bottom edges
    /// are exclusive, so the right corners sit one pixel past the last column.
    pub fn corners(&self) -> [WorldPos; 4] {
        [
            WorldPos::new(self.x, self.y),
            WorldPos::new(self.right(), self.y),
            WorldPos::new(self.x, self.bottom()),
            WorldPos::new(self.right(), self.bottom()),
        ]
    }
}

/// Largest chunk width or height in pixels; world coordinates are `i32`.
pub const MAX_PIXEL_EXTENT: u64 = i32::MAX as u64;

/// Grid/chunk/world coordinate algebra for one map.
///
/// All divisions are floor divisions so positions left of or above the
/// origin land in negative chunks instead of collapsing onto chunk 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinateMapper {
    tile_size: GridSize,
    chunk_size: GridSize,
}

impl CoordinateMapper {
    pub fn new(tile_size: GridSize, chunk_size: GridSize) -> Result<Self, TileMapError> {
        if tile_size.width == 0 || tile_size.height == 0 {
            return Err(TileMapError::map_format(format!(
                "tile_size must be non-zero, got {}x{}",
                tile_size.width, tile_size.height
            )));
        }
        if chunk_size.width == 0 || chunk_size.height == 0 {
            return Err(TileMapError::map_format(format!(
                "chunk_size must be non-zero, got {}x{}",
                chunk_size.width, chunk_size.height
            )));
        }
        let pixel_width = u64::from(tile_size.width) * u64::from(chunk_size.width);
        let pixel_height = u64::from(tile_size.height) * u64::from(chunk_size.height);
        if pixel_width > MAX_PIXEL_EXTENT || pixel_height > MAX_PIXEL_EXTENT {
            return Err(TileMapError::map_format(format!(
                "chunk pixel size {pixel_width}x{pixel_height} exceeds {MAX_PIXEL_EXTENT}"
            )));
        }
        Ok(Self {
            tile_size,
            chunk_size,
        })
    }

    pub fn tile_size(&self) -> GridSize {
        self.tile_size
    }

    pub fn chunk_size(&self) -> GridSize {
        self.chunk_size
    }

    /// Pixel dimensions of one rendered chunk layer.
    pub fn chunk_pixel_size(&self) -> GridSize {
        GridSize::new(
            self.tile_size.width * self.chunk_size.width,
            self.tile_size.height * self.chunk_size.height,
        )
    }

    pub fn chunk_of(&self, position: WorldPos) -> ChunkKey {
        let tile_x = i64::from(position.x).div_euclid(i64::from(self.tile_size.width));
        let tile_y = i64::from(position.y).div_euclid(i64::from(self.tile_size.height));
        ChunkKey {
            x: tile_x.div_euclid(i64::from(self.chunk_size.width)) as i32,
            y: tile_y.div_euclid(i64::from(self.chunk_size.height)) as i32,
        }
    }

    /// Top-left world pixel of `key`, saturated to the `i32` range for keys
    /// too far out to be addressable.
    pub fn chunk_origin(&self, key: ChunkKey) -> WorldPos {
        let (x, y) = self.origin_wide(key);
        WorldPos {
            x: x.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32,
            y: y.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32,
        }
    }

    /// Whether every pixel of `key` has an `i32` world coordinate.
    pub fn is_addressable(&self, key: ChunkKey) -> bool {
        let pixel = self.chunk_pixel_size();
        let (x, y) = self.origin_wide(key);
        let fits = |origin: i64, extent: u32| {
            origin >= i64::from(i32::MIN) && origin + i64::from(extent) - 1 <= i64::from(i32::MAX)
        };
        fits(x, pixel.width) && fits(y, pixel.height)
    }

    fn origin_wide(&self, key: ChunkKey) -> (i64, i64) {
        let pixel = self.chunk_pixel_size();
        (
            i64::from(pixel.width) * i64::from(key.x),
            i64::from(pixel.height) * i64::from(key.y),
        )
    }

    /// Tile offset of `position` relative to `chunk_origin`. Callers that pass
    /// an origin other than the containing chunk's get offsets outside the chunk.
    pub fn local_tile_of(&self, position: WorldPos, chunk_origin: WorldPos) -> (i64, i64) {
        let dx = i64::from(position.x) - i64::from(chunk_origin.x);
        let dy = i64::from(position.y) - i64::from(chunk_origin.y);
        (
            dx.div_euclid(i64::from(self.tile_size.width)),
            dy.div_euclid(i64::from(self.tile_size.height)),
        )
    }

    /// Containing chunk plus the in-bounds tile position of `position`.
    pub fn locate(&self, position: WorldPos) -> (ChunkKey, TilePos) {
        let key = self.chunk_of(position);
        let (local_x, local_y) = self.local_tile_of(position, self.chunk_origin(key));
        (key, TilePos::new(local_x as u32, local_y as u32))
    }

    /// World-space rectangle covered by one tile.
    pub fn tile_rect(&self, key: ChunkKey, tile: TilePos) -> PixelRect {
        let origin = self.chunk_origin(key);
        PixelRect {
            x: origin.x + (tile.x * self.tile_size.width) as i32,
            y: origin.y + (tile.y * self.tile_size.height) as i32,
            width: self.tile_size.width,
            height: self.tile_size.height,
        }
    }
}

/// Pixel rectangle of `tile_id` inside an indexed tileset image.
///
/// The column count is `tileset_width / tile_size.width` for square and
/// non-square tiles alike. No bounds checking happens here: negative ids or
/// ids past the end of the image produce rectangles outside the image and
/// must be filtered by the caller.
pub fn tileset_region(tile_id: TileId, tile_size: GridSize, tileset_width: u32) -> PixelRect {
    let columns = i64::from((tileset_width / tile_size.width.max(1)).max(1));
    let id = i64::from(tile_id);
    let column = id.rem_euclid(columns);
    let row = id.div_euclid(columns);
    PixelRect {
        x: (column * i64::from(tile_size.width)) as i32,
        y: (row * i64::from(tile_size.height)) as i32,
        width: tile_size.width,
        height: tile_size.height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapper(tile: (u32, u32), chunk: (u32, u32)) -> CoordinateMapper {
        CoordinateMapper::new(GridSize::new(tile.0, tile.1), GridSize::new(chunk.0, chunk.1))
            .expect("mapper")
    }

    #[test]
    fn chunk_key_round_trips_through_string_form() {
        let key: ChunkKey = "-3, 7".parse().expect("parse");
        assert_eq!(key, ChunkKey::new(-3, 7));
        assert_eq!(key.to_string(), "-3,7");
    }

    #[test]
    fn chunk_key_rejects_garbage() {
        for raw in ["", "1", "a,b", "1;2", "1,2,3"] {
            assert!(raw.parse::<ChunkKey>().is_err(), "raw={raw}");
        }
    }

    #[test]
    fn zero_sizes_are_rejected() {
        assert!(CoordinateMapper::new(GridSize::new(0, 8), GridSize::new(2, 2)).is_err());
        assert!(CoordinateMapper::new(GridSize::new(8, 8), GridSize::new(2, 0)).is_err());
    }

    #[test]
    fn chunk_of_uses_floor_division_for_negative_positions() {
        let mapper = mapper((8, 8), (2, 2));
        assert_eq!(mapper.chunk_of(WorldPos::new(0, 0)), ChunkKey::new(0, 0));
        assert_eq!(mapper.chunk_of(WorldPos::new(15, 15)), ChunkKey::new(0, 0));
        assert_eq!(mapper.chunk_of(WorldPos::new(16, 0)), ChunkKey::new(1, 0));
        assert_eq!(mapper.chunk_of(WorldPos::new(-1, -1)), ChunkKey::new(-1, -1));
        assert_eq!(mapper.chunk_of(WorldPos::new(-16, -17)), ChunkKey::new(-1, -2));
    }

    #[test]
    fn chunk_origin_bounds_every_sampled_position() {
        let mapper = mapper((8, 6), (3, 2));
        let pixel = mapper.chunk_pixel_size();
        for y in (-40..40).step_by(3) {
            for x in (-50..50).step_by(7) {
                let position = WorldPos::new(x, y);
                let origin = mapper.chunk_origin(mapper.chunk_of(position));
                let dx = position.x - origin.x;
                let dy = position.y - origin.y;
                assert!(dx >= 0 && dx < pixel.width as i32, "x={x} origin={origin:?}");
                assert!(dy >= 0 && dy < pixel.height as i32, "y={y} origin={origin:?}");
            }
        }
    }

    #[test]
    fn locate_returns_in_bounds_local_tile() {
        let mapper = mapper((8, 8), (2, 2));
        assert_eq!(
            mapper.locate(WorldPos::new(-1, 9)),
            (ChunkKey::new(-1, 0), TilePos::new(1, 1))
        );
        assert_eq!(
            mapper.locate(WorldPos::new(17, 31)),
            (ChunkKey::new(1, 1), TilePos::new(0, 1))
        );
    }

    #[test]
    fn tile_rect_is_offset_by_chunk_origin() {
        let mapper = mapper((8, 8), (2, 2));
        assert_eq!(
            mapper.tile_rect(ChunkKey::new(-1, 1), TilePos::new(1, 0)),
            PixelRect::new(-8, 16, 8, 8)
        );
    }

    #[test]
    fn rect_corners_use_exclusive_right_and_bottom() {
        let rect = PixelRect::new(0, 0, 16, 16);
        assert_eq!(
            rect.corners(),
            [
                WorldPos::new(0, 0),
                WorldPos::new(16, 0),
                WorldPos::new(0, 16),
                WorldPos::new(16, 16),
            ]
        );
    }

    #[test]
    fn tileset_region_uses_width_based_column_count() {
        let tile = GridSize::new(16, 8);
        assert_eq!(tileset_region(0, tile, 64), PixelRect::new(0, 0, 16, 8));
        assert_eq!(tileset_region(3, tile, 64), PixelRect::new(48, 0, 16, 8));
        assert_eq!(tileset_region(5, tile, 64), PixelRect::new(16, 8, 16, 8));
    }

    #[test]
    fn chunk_pixel_size_must_fit_world_coordinates() {
        let error = CoordinateMapper::new(GridSize::new(65_536, 8), GridSize::new(65_536, 2))
            .expect_err("oversized chunk");
        assert!(matches!(error, TileMapError::MapFormat { .. }));
        assert!(CoordinateMapper::new(GridSize::new(u32::MAX, 1), GridSize::new(1, 1)).is_err());
    }

    #[test]
    fn far_chunks_are_not_addressable_and_origins_saturate() {
        let mapper = mapper((16, 16), (32, 32));
        assert!(mapper.is_addressable(ChunkKey::new(-4_194_304, 4_194_303)));
        assert!(!mapper.is_addressable(ChunkKey::new(4_194_304, 0)));
        assert!(!mapper.is_addressable(ChunkKey::new(0, -4_194_305)));
        assert_eq!(
            mapper.chunk_origin(ChunkKey::new(i32::MAX, i32::MIN)),
            WorldPos::new(i32::MAX, i32::MIN)
        );
    }
}
