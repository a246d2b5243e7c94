use std::collections::HashMap;

use thiserror::Error;

use crate::coords::{GridSize, PixelRect, WorldPos};
use crate::surface::{Rgba, Surface, TextureRegion};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FontError {
    #[error("font charset is empty")]
    EmptyCharset,
    #[error("font image is too small to hold separator markers ({width}x{height})")]
    ImageTooSmall { width: u32, height: u32 },
    #[error("no separator pixel below the top-left marker, glyph height unknown")]
    MissingHeightMarker,
    #[error("font image has more glyphs than the {char_count} chars given")]
    TooManyGlyphs { char_count: usize },
}

/// Fixed-height proportional font cut from a glyph strip image.
///
/// The top-left pixel holds the separator color. Column 1 carries a second
/// separator pixel one row below the last glyph row, which fixes the glyph
/// height. Each text row is `height + 1` pixels tall; on its first glyph row
/// every separator pixel closes the glyph started after the previous one.
/// Glyphs map to `chars` in scan order.
#[derive(Debug, Clone)]
pub struct BitmapFont {
    image: Surface,
    glyphs: HashMap<char, PixelRect>,
    char_height: u32,
    pub spacing: u32,
    /// Advance used for chars the font has no glyph for.
    pub space_width: u32,
}

impl BitmapFont {
    pub fn new(image: Surface, chars: &str, spacing: u32) -> Result<Self, FontError> {
        let chars = chars.chars().collect::<Vec<_>>();
        if chars.is_empty() {
            return Err(FontError::EmptyCharset);
        }
        if image.width() < 2 || image.height() < 2 {
            return Err(FontError::ImageTooSmall {
                width: image.width(),
                height: image.height(),
            });
        }
        let separator = image.pixel(0, 0).ok_or(FontError::ImageTooSmall {
            width: image.width(),
            height: image.height(),
        })?;
        let char_height = scan_char_height(&image, separator)?;
        let glyph_rects = scan_glyph_rects(&image, separator, char_height);
        if glyph_rects.len() > chars.len() {
            return Err(FontError::TooManyGlyphs {
                char_count: chars.len(),
            });
        }
        let total_width = glyph_rects.iter().map(|rect| u64::from(rect.width)).sum::<u64>();
        let space_width = (total_width / chars.len() as u64) as u32;
        let glyphs = chars.into_iter().zip(glyph_rects).collect::<HashMap<_, _>>();
        Ok(Self {
            image,
            glyphs,
            char_height,
            spacing,
            space_width,
        })
    }

    pub fn char_height(&self) -> u32 {
        self.char_height
    }

    pub fn has_glyph(&self, ch: char) -> bool {
        self.glyphs.contains_key(&ch)
    }

    pub fn char_region(&self, ch: char) -> Option<TextureRegion<'_>> {
        self.glyphs
            .get(&ch)
            .and_then(|rect| self.image.region(*rect))
    }

    /// Pixel size of `text` once rendered: glyph widths, `space_width` per
    /// unknown char and `spacing` between neighbours.
    pub fn size(&self, text: &str) -> GridSize {
        let char_count = text.chars().count() as u32;
        let gaps = self.spacing.saturating_mul(char_count.saturating_sub(1));
        let advance = text
            .chars()
            .map(|ch| self.glyphs.get(&ch).map_or(self.space_width, |rect| rect.width))
            .fold(0u32, u32::saturating_add);
        GridSize::new(gaps.saturating_add(advance), self.char_height)
    }

    /// Blits `text` onto `surface` with its top-left corner at `position`.
    /// Unknown chars advance the pen by `space_width` and draw nothing.
    pub fn render_on(&self, surface: &mut Surface, text: &str, position: WorldPos) {
        let mut pen_x = i64::from(position.x);
        for ch in text.chars() {
            match self.char_region(ch) {
                Some(region) => {
                    let dest_x = pen_x.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32;
                    surface.blit_region(region, dest_x, position.y);
                    pen_x += i64::from(region.rect.width) + i64::from(self.spacing);
                }
                None => pen_x += i64::from(self.space_width),
            }
        }
    }

    /// Fresh surface exactly [`BitmapFont::size`] big, filled with
    /// `background`, with `text` drawn at the origin.
    pub fn render(&self, text: &str, background: Rgba) -> Surface {
        let size = self.size(text);
        let mut surface = Surface::new_filled(size.width, size.height, background);
        self.render_on(&mut surface, text, WorldPos::new(0, 0));
        surface
    }
}

fn scan_char_height(image: &Surface, separator: Rgba) -> Result<u32, FontError> {
    (1..image.height())
        .find(|y| image.pixel(1, *y) == Some(separator))
        .map(|y| y - 1)
        .ok_or(FontError::MissingHeightMarker)
}

fn scan_glyph_rects(image: &Surface, separator: Rgba, char_height: u32) -> Vec<PixelRect> {
    let row_stride = char_height + 1;
    let text_rows = image.height() / row_stride;
    let mut rects = Vec::new();
    for row in (0..text_rows).map(|index| 1 + index * row_stride) {
        let mut previous = None;
        for column in 0..image.width() {
            if image.pixel(column, row) != Some(separator) {
                continue;
            }
            if let Some(start) = previous {
                let left = start + 1;
                rects.push(PixelRect::new(
                    left as i32,
                    row as i32,
                    column - left,
                    char_height,
                ));
            }
            previous = Some(column);
        }
    }
    rects
}
