use crate::catalog::TileCatalog;
use crate::coords::PixelRect;
use crate::error::TileMapError;
use crate::store::ChunkStore;

/// World rectangles of the tiles under the four corners of `rect` on
/// `layer_index` whose properties include every name in `required` as a
/// truthy value.
///
/// Only the corners are sampled, so a query larger than a tile can miss tiles
/// strictly inside it. Corners in absent chunks are skipped. The result holds
/// up to four entries and is not de-duplicated: corners sharing a tile yield
/// the same rectangle more than once. With no required properties every
/// sampled tile matches, empty ones included.
pub fn overlapping_tiles<S: AsRef<str>>(
    store: &ChunkStore,
    catalog: &TileCatalog,
    rect: PixelRect,
    layer_index: usize,
    required: &[S],
) -> Result<Vec<PixelRect>, TileMapError> {
    let mapper = store.mapper();
    let mut overlapping = Vec::with_capacity(4);
    for corner in rect.corners() {
        let (key, tile) = mapper.locate(corner);
        if !store.contains(key) {
            continue;
        }
        let tile_id = store.tile_at(key, layer_index, tile)?;
        if catalog.properties_of(tile_id).all_truthy(required) {
            overlapping.push(mapper.tile_rect(key, tile));
        }
    }
    Ok(overlapping)
}
