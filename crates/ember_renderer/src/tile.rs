//! Screen-space tiling for the bucket scheduler.

/// Edge length of a square bucket in pixels. Border tiles are clipped to the
/// image rectangle.
pub const TILE_SIZE: u32 = 64;

/// A rectangular region of the output image, owned by exactly one worker for
/// the duration of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Tile {
    /// Iterates every pixel coordinate inside the tile, row-major.
    pub fn pixels(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        let (x0, y0) = (self.x, self.y);
        (y0..y0 + self.height).flat_map(move |y| (x0..x0 + self.width).map(move |x| (x, y)))
    }

    pub fn pixel_count(&self) -> u32 {
        self.width * self.height
    }
}

/// Splits an image into row-major tiles of at most [`TILE_SIZE`] on each side.
pub fn tiles_for(width: u32, height: u32) -> Vec<Tile> {
    let mut tiles = Vec::new();
    let mut y = 0;
    while y < height {
        let h = TILE_SIZE.min(height - y);
        let mut x = 0;
        while x < width {
            let w = TILE_SIZE.min(width - x);
            tiles.push(Tile {
                x,
                y,
                width: w,
                height: h,
            });
            x += TILE_SIZE;
        }
        y += TILE_SIZE;
    }
    tiles
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tiles_cover_image_exactly_once() {
        let (width, height) = (150, 100);
        let tiles = tiles_for(width, height);
        let mut seen = vec![0u32; (width * height) as usize];
        for tile in &tiles {
            for (x, y) in tile.pixels() {
                assert!(x < width && y < height);
                seen[(y * width + x) as usize] += 1;
            }
        }
        assert!(seen.iter().all(|&count| count == 1));
    }

    #[test]
    fn test_border_tiles_clipped() {
        let tiles = tiles_for(130, 70);
        assert_eq!(tiles.len(), 6);
        let last = tiles.last().unwrap();
        assert_eq!((last.width, last.height), (2, 6));
    }

    #[test]
    fn test_small_image_single_tile() {
        let tiles = tiles_for(8, 8);
        assert_eq!(tiles.len(), 1);
        assert_eq!(tiles[0].pixel_count(), 64);
    }
}
