use serde::{Deserialize, Serialize};

use crate::error::TileMapError;
use crate::texture::TextureRef;
use crate::TileId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyframe {
    /// Number of ticks this keyframe stays on screen.
    pub frames: u32,
    pub texture: TextureRef,
}

/// Keyframe cycle for one animated tile id.
///
/// State is `(keyframe_index, frame_in_keyframe)` with
/// `frame_in_keyframe < keyframes[keyframe_index].frames`. Every placed tile
/// with the same id reads the same instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Animation {
    tile_id: TileId,
    keyframes: Vec<Keyframe>,
    keyframe_index: usize,
    frame_in_keyframe: u32,
}

impl Animation {
    pub fn new(tile_id: TileId, keyframes: Vec<Keyframe>) -> Result<Self, TileMapError> {
        validate_keyframes(tile_id, &keyframes)?;
        Ok(Self {
            tile_id,
            keyframes,
            keyframe_index: 0,
            frame_in_keyframe: 0,
        })
    }

    pub fn tile_id(&self) -> TileId {
        self.tile_id
    }

    pub fn keyframes(&self) -> &[Keyframe] {
        &self.keyframes
    }

    pub fn keyframe_index(&self) -> usize {
        self.keyframe_index
    }

    pub fn frame_in_keyframe(&self) -> u32 {
        self.frame_in_keyframe
    }

    /// Advances one tick. Returns `true` when the active keyframe changed.
    pub fn advance(&mut self) -> bool {
        self.frame_in_keyframe += 1;
        if self.frame_in_keyframe < self.keyframes[self.keyframe_index].frames {
            return false;
        }
        self.frame_in_keyframe = 0;
        self.keyframe_index = (self.keyframe_index + 1) % self.keyframes.len();
        true
    }

    pub fn current_texture_ref(&self) -> &TextureRef {
        &self.keyframes[self.keyframe_index].texture
    }

    /// Swaps in a new keyframe list and rewinds to the first frame. On error
    /// the previous keyframes and position are kept.
    pub fn reset(&mut self, keyframes: Vec<Keyframe>) -> Result<(), TileMapError> {
        validate_keyframes(self.tile_id, &keyframes)?;
        self.keyframes = keyframes;
        self.keyframe_index = 0;
        self.frame_in_keyframe = 0;
        Ok(())
    }

    /// Total ticks in one full cycle.
    pub fn cycle_length(&self) -> u64 {
        self.keyframes.iter().map(|frame| u64::from(frame.frames)).sum()
    }
}

fn validate_keyframes(tile_id: TileId, keyframes: &[Keyframe]) -> Result<(), TileMapError> {
    if keyframes.is_empty() {
        return Err(TileMapError::InvalidAnimationSpec {
            tile_id,
            reason: "keyframe list is empty".to_string(),
        });
    }
    if let Some(index) = keyframes.iter().position(|frame| frame.frames == 0) {
        return Err(TileMapError::InvalidAnimationSpec {
            tile_id,
            reason: format!("keyframe {index} has a duration of 0 frames"),
        });
    }
    Ok(())
}
