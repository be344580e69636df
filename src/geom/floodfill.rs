//! Flood fill and outer border tracing over an RGBA pixel buffer.
//!
//! Used by the flood-fill tool to turn a clicked area of similar colour into
//! a polygon. Growth is 4-connected; the border is traced along pixel edges
//! so the resulting polygon encloses every filled pixel.

use image::RgbaImage;

/// A filled area of an image.
#[derive(Clone, Debug)]
pub struct FillMask {
    pub width: u32,
    pub height: u32,
    /// Row-major membership flags, `width * height` long.
    pub mask: Vec<bool>,
    /// Inclusive bounding box (min_x, min_y, max_x, max_y).
    pub bbox: (u32, u32, u32, u32),
    /// Number of filled pixels.
    pub count: usize,
}

impl FillMask {
    /// Returns true if the pixel is inside the filled area. Out-of-range
    /// coordinates are outside.
    pub fn contains(&self, x: i64, y: i64) -> bool {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return false;
        }
        self.mask[y as usize * self.width as usize + x as usize]
    }
}

/// Maximum per-channel absolute difference between two colours.
#[inline]
pub fn color_distance(a: [u8; 4], b: [u8; 4]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(l, r)| (*l as f64 - *r as f64).abs())
        .fold(0.0, f64::max)
}

/// Grows a 4-connected area of pixels whose colour is within `threshold` of
/// the seed pixel.
///
/// Returns `None` when the seed lies outside the image.
pub fn flood_fill(image: &RgbaImage, seed_x: u32, seed_y: u32, threshold: f64) -> Option<FillMask> {
    let (width, height) = image.dimensions();
    if seed_x >= width || seed_y >= height {
        return None;
    }

    let wu = width as usize;
    let raw = image.as_raw();
    let pix = |idx: usize| -> [u8; 4] {
        let o = idx * 4;
        [raw[o], raw[o + 1], raw[o + 2], raw[o + 3]]
    };

    let seed_idx = seed_y as usize * wu + seed_x as usize;
    let target = pix(seed_idx);

    let mut mask = vec![false; wu * height as usize];
    let mut bbox = (seed_x, seed_y, seed_x, seed_y);
    let mut count = 0usize;

    // stack of packed flat indices
    let mut stack: Vec<usize> = Vec::with_capacity(4096);
    mask[seed_idx] = true;
    stack.push(seed_idx);

    while let Some(idx) = stack.pop() {
        count += 1;
        let x = (idx % wu) as u32;
        let y = (idx / wu) as u32;

        bbox.0 = bbox.0.min(x);
        bbox.1 = bbox.1.min(y);
        bbox.2 = bbox.2.max(x);
        bbox.3 = bbox.3.max(y);

        let mut visit = |ni: usize| {
            if !mask[ni] && color_distance(pix(ni), target) <= threshold {
                mask[ni] = true;
                stack.push(ni);
            }
        };

        if x > 0 {
            visit(idx - 1);
        }
        if x + 1 < width {
            visit(idx + 1);
        }
        if y > 0 {
            visit(idx - wu);
        }
        if y + 1 < height {
            visit(idx + wu);
        }
    }

    Some(FillMask {
        width,
        height,
        mask,
        bbox,
        count,
    })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Heading {
    East,
    South,
    West,
    North,
}

impl Heading {
    fn right(self) -> Self {
        match self {
            Heading::East => Heading::South,
            Heading::South => Heading::West,
            Heading::West => Heading::North,
            Heading::North => Heading::East,
        }
    }

    fn left(self) -> Self {
        match self {
            Heading::East => Heading::North,
            Heading::North => Heading::West,
            Heading::West => Heading::South,
            Heading::South => Heading::East,
        }
    }

    fn step(self) -> (i64, i64) {
        match self {
            Heading::East => (1, 0),
            Heading::South => (0, 1),
            Heading::West => (-1, 0),
            Heading::North => (0, -1),
        }
    }

    /// Pixels ahead of grid vertex (x, y): (front-left, front-right).
    fn ahead(self, x: i64, y: i64) -> ((i64, i64), (i64, i64)) {
        match self {
            Heading::East => ((x, y - 1), (x, y)),
            Heading::South => ((x, y), (x - 1, y)),
            Heading::West => ((x - 1, y), (x - 1, y - 1)),
            Heading::North => ((x - 1, y - 1), (x, y - 1)),
        }
    }
}

/// Traces the outer border of a filled area along pixel edges.
///
/// Vertices are pixel-corner positions in natural image coordinates, ordered
/// clockwise (with y pointing down) and without collinear points. Holes are
/// ignored.
pub fn trace_border(fill: &FillMask) -> Vec<(f64, f64)> {
    if fill.count == 0 {
        return Vec::new();
    }

    // Topmost row, leftmost pixel: nothing above or to its left is filled.
    let (min_x, min_y, max_x, _) = fill.bbox;
    let Some(start_x) = (min_x..=max_x).find(|x| fill.contains(*x as i64, min_y as i64)) else {
        return Vec::new();
    };
    let start = (start_x as i64, min_y as i64);

    let mut vertices = vec![(start.0 as f64, start.1 as f64)];
    let (mut x, mut y) = start;
    let mut heading = Heading::East;
    let limit = 4 * (fill.width as usize + 1) * (fill.height as usize + 1);

    for _ in 0..limit {
        let (front_left, front_right) = heading.ahead(x, y);
        let next = if !fill.contains(front_right.0, front_right.1) {
            heading.right()
        } else if fill.contains(front_left.0, front_left.1) {
            heading.left()
        } else {
            heading
        };

        if next != heading {
            vertices.push((x as f64, y as f64));
            heading = next;
        }

        let (dx, dy) = heading.step();
        x += dx;
        y += dy;

        if (x, y) == start {
            break;
        }
    }

    vertices
}

/// Flood fills from a seed pixel and returns the traced border.
pub fn fill_outline(image: &RgbaImage, seed_x: u32, seed_y: u32, threshold: f64) -> Option<Vec<(f64, f64)>> {
    let fill = flood_fill(image, seed_x, seed_y, threshold)?;
    let outline = trace_border(&fill);
    (outline.len() >= 3).then_some(outline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn checker_block() -> RgbaImage {
        // 8x8 white image with a red 3x2 block at (2, 3)
        let mut img = RgbaImage::from_pixel(8, 8, Rgba([255, 255, 255, 255]));
        for y in 3..5 {
            for x in 2..5 {
                img.put_pixel(x, y, Rgba([200, 10, 10, 255]));
            }
        }
        img
    }

    #[test]
    fn fill_stays_inside_block() {
        let img = checker_block();
        let fill = flood_fill(&img, 3, 3, 10.0).expect("seed inside image");
        assert_eq!(fill.count, 6);
        assert_eq!(fill.bbox, (2, 3, 4, 4));
    }

    #[test]
    fn threshold_admits_close_colours() {
        let mut img = checker_block();
        img.put_pixel(5, 3, Rgba([205, 15, 5, 255]));
        let fill = flood_fill(&img, 2, 3, 10.0).expect("fill");
        assert_eq!(fill.count, 7);
    }

    #[test]
    fn seed_outside_image_is_none() {
        let img = checker_block();
        assert!(flood_fill(&img, 8, 0, 10.0).is_none());
    }

    #[test]
    fn border_of_block_is_rectangle() {
        let img = checker_block();
        let outline = fill_outline(&img, 3, 4, 10.0).expect("outline");
        assert_eq!(outline, vec![(2.0, 3.0), (5.0, 3.0), (5.0, 5.0), (2.0, 5.0)]);
    }

    #[test]
    fn single_pixel_border_has_four_corners() {
        let mut img = RgbaImage::from_pixel(3, 3, Rgba([0, 0, 0, 255]));
        img.put_pixel(1, 1, Rgba([255, 255, 255, 255]));
        let outline = fill_outline(&img, 1, 1, 0.0).expect("outline");
        assert_eq!(outline, vec![(1.0, 1.0), (2.0, 1.0), (2.0, 2.0), (1.0, 2.0)]);
    }

    #[test]
    fn l_shape_border_follows_notch() {
        // ##.
        // #..
        let mut img = RgbaImage::from_pixel(3, 2, Rgba([0, 0, 0, 255]));
        img.put_pixel(0, 0, Rgba([9, 9, 9, 255]));
        img.put_pixel(1, 0, Rgba([9, 9, 9, 255]));
        img.put_pixel(0, 1, Rgba([9, 9, 9, 255]));
        let outline = fill_outline(&img, 0, 0, 0.0).expect("outline");
        assert_eq!(
            outline,
            vec![
                (0.0, 0.0),
                (2.0, 0.0),
                (2.0, 1.0),
                (1.0, 1.0),
                (1.0, 2.0),
                (0.0, 2.0)
            ]
        );
    }
}
