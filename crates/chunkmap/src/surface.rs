use image::RgbaImage;

use crate::coords::PixelRect;

pub type Rgba = [u8; 4];
pub type Rgb = [u8; 3];

pub const TRANSPARENT: Rgba = [0, 0, 0, 0];

/// RGBA8 pixel buffer, row-major, 4 bytes per pixel.
///
/// A surface with a colorkey treats pixels of that color (any alpha) as
/// transparent when it is the source of a blit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Surface {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
    colorkey: Option<Rgb>,
}

/// Sub-rectangle of a surface, the unit texture sources hand to the renderer.
#[derive(Debug, Clone, Copy)]
pub struct TextureRegion<'a> {
    pub surface: &'a Surface,
    pub rect: PixelRect,
}

impl Surface {
    pub fn new_filled(width: u32, height: u32, color: Rgba) -> Self {
        let pixel_count = width as usize * height as usize;
        let mut rgba = Vec::with_capacity(pixel_count * 4);
        for _ in 0..pixel_count {
            rgba.extend_from_slice(&color);
        }
        Self {
            width,
            height,
            rgba,
            colorkey: None,
        }
    }

    /// Returns `None` when `rgba` is not exactly `width * height * 4` bytes.
    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>) -> Option<Self> {
        if rgba.len() != width as usize * height as usize * 4 {
            return None;
        }
        Some(Self {
            width,
            height,
            rgba,
            colorkey: None,
        })
    }

    pub fn from_image(image: RgbaImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
            rgba: image.into_raw(),
            colorkey: None,
        }
    }

    pub fn with_colorkey(mut self, colorkey: Option<Rgb>) -> Self {
        self.colorkey = colorkey;
        self
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn colorkey(&self) -> Option<Rgb> {
        self.colorkey
    }

    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }

    pub fn bounds(&self) -> PixelRect {
        PixelRect::new(0, 0, self.width, self.height)
    }

    pub fn contains_rect(&self, rect: PixelRect) -> bool {
        rect.x >= 0
            && rect.y >= 0
            && rect.right() <= self.width as i32
            && rect.bottom() <= self.height as i32
    }

    pub fn region(&self, rect: PixelRect) -> Option<TextureRegion<'_>> {
        self.contains_rect(rect).then_some(TextureRegion {
            surface: self,
            rect,
        })
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        let mut color = TRANSPARENT;
        color.copy_from_slice(&self.rgba[offset..offset + 4]);
        Some(color)
    }

    /// Overwrites every pixel of `rect` (clipped to the surface) with `color`.
    pub fn fill_rect(&mut self, rect: PixelRect, color: Rgba) {
        let Some((left, top, right, bottom)) = self.clip(rect) else {
            return;
        };
        let row_stride = self.width as usize * 4;
        for y in top..bottom {
            let row = y * row_stride;
            for x in left..right {
                let offset = row + x * 4;
                self.rgba[offset..offset + 4].copy_from_slice(&color);
            }
        }
    }

    /// Copies `region` to `(dest_x, dest_y)`. Source pixels with alpha 0 or
    /// matching the source colorkey are skipped; everything is clipped.
    pub fn blit_region(&mut self, region: TextureRegion<'_>, dest_x: i32, dest_y: i32) {
        let source = region.surface;
        let Some(src) = source.clip(region.rect) else {
            return;
        };
        let (src_left, src_top, src_right, src_bottom) = src;
        let shift_x = dest_x - src_left as i32;
        let shift_y = dest_y - src_top as i32;
        let Some((left, top, right, bottom)) = self.clip(PixelRect::new(
            dest_x,
            dest_y,
            (src_right - src_left) as u32,
            (src_bottom - src_top) as u32,
        )) else {
            return;
        };

        let dst_stride = self.width as usize * 4;
        let src_stride = source.width as usize * 4;
        for out_y in top..bottom {
            let src_y = (out_y as i32 - shift_y) as usize;
            for out_x in left..right {
                let src_x = (out_x as i32 - shift_x) as usize;
                let src_offset = src_y * src_stride + src_x * 4;
                let color = &source.rgba[src_offset..src_offset + 4];
                if color[3] == 0 {
                    continue;
                }
                if source
                    .colorkey
                    .is_some_and(|key| key == [color[0], color[1], color[2]])
                {
                    continue;
                }
                let dst_offset = out_y * dst_stride + out_x * 4;
                self.rgba[dst_offset..dst_offset + 4].copy_from_slice(color);
            }
        }
    }

    fn clip(&self, rect: PixelRect) -> Option<(usize, usize, usize, usize)> {
        let left = rect.x.max(0);
        let top = rect.y.max(0);
        let right = rect.right().min(self.width as i32);
        let bottom = rect.bottom().min(self.height as i32);
        if left >= right || top >= bottom {
            return None;
        }
        Some((left as usize, top as usize, right as usize, bottom as usize))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgba = [255, 0, 0, 255];
    const BLUE: Rgba = [0, 0, 255, 255];

    #[test]
    fn from_rgba_rejects_wrong_length() {
        assert!(Surface::from_rgba(2, 2, vec![0; 15]).is_none());
        assert!(Surface::from_rgba(2, 2, vec![0; 16]).is_some());
    }

    #[test]
    fn fill_rect_is_clipped_to_surface() {
        let mut surface = Surface::new_filled(4, 4, TRANSPARENT);
        surface.fill_rect(PixelRect::new(-2, 2, 4, 10), RED);
        assert_eq!(surface.pixel(0, 2), Some(RED));
        assert_eq!(surface.pixel(1, 3), Some(RED));
        assert_eq!(surface.pixel(2, 2), Some(TRANSPARENT));
        assert_eq!(surface.pixel(0, 1), Some(TRANSPARENT));
    }

    #[test]
    fn blit_copies_sub_region_to_destination() {
        let mut source = Surface::new_filled(4, 2, RED);
        source.fill_rect(PixelRect::new(2, 0, 2, 2), BLUE);
        let mut target = Surface::new_filled(3, 3, TRANSPARENT);
        let region = source.region(PixelRect::new(2, 0, 2, 2)).expect("region");
        target.blit_region(region, 1, 1);
        assert_eq!(target.pixel(0, 0), Some(TRANSPARENT));
        assert_eq!(target.pixel(1, 1), Some(BLUE));
        assert_eq!(target.pixel(2, 2), Some(BLUE));
    }

    #[test]
    fn blit_skips_transparent_and_colorkey_pixels() {
        let mut source = Surface::new_filled(3, 1, [10, 20, 30, 255]).with_colorkey(Some([10, 20, 30]));
        source.fill_rect(PixelRect::new(1, 0, 1, 1), TRANSPARENT);
        source.fill_rect(PixelRect::new(2, 0, 1, 1), RED);
        let mut target = Surface::new_filled(3, 1, BLUE);
        target.blit_region(source.region(source.bounds()).expect("region"), 0, 0);
        assert_eq!(target.pixel(0, 0), Some(BLUE));
        assert_eq!(target.pixel(1, 0), Some(BLUE));
        assert_eq!(target.pixel(2, 0), Some(RED));
    }

    #[test]
    fn blit_with_negative_destination_is_clipped() {
        let source = Surface::new_filled(2, 2, RED);
        let mut target = Surface::new_filled(2, 2, TRANSPARENT);
        target.blit_region(source.region(source.bounds()).expect("region"), -1, -1);
        assert_eq!(target.pixel(0, 0), Some(RED));
        assert_eq!(target.pixel(1, 0), Some(TRANSPARENT));
        assert_eq!(target.pixel(0, 1), Some(TRANSPARENT));
    }

    #[test]
    fn region_outside_surface_is_rejected() {
        let surface = Surface::new_filled(4, 4, RED);
        assert!(surface.region(PixelRect::new(2, 2, 4, 4)).is_none());
        assert!(surface.region(PixelRect::new(-1, 0, 1, 1)).is_none());
    }
}
