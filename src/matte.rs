//! Background removal via flood fill.
//!
//! Clears the alpha of background-colored pixels that connect to the image
//! border through same-colored neighbors. Interior regions of the same
//! color stay opaque, which is what separates this from a blanket color key.

use std::collections::VecDeque;

use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatteSettings {
    /// Per-channel tolerance when matching the background color
    pub tolerance: u8,
}

impl Default for MatteSettings {
    fn default() -> Self {
        Self { tolerance: 5 }
    }
}

#[derive(Debug, Clone)]
pub struct MatteResult {
    /// Copy of the input with background alpha forced to zero
    pub image: RgbaImage,
    /// Removal flags addressed by linear index `y * width + x`
    pub removed: Vec<bool>,
}

fn matches_target(pixel: &Rgba<u8>, target: [u8; 3], tolerance: u8) -> bool {
    pixel[0].abs_diff(target[0]) <= tolerance
        && pixel[1].abs_diff(target[1]) <= tolerance
        && pixel[2].abs_diff(target[2]) <= tolerance
}

/// Flood-fill the background to transparent.
///
/// Breadth-first fill seeded from every border pixel that matches `target`
/// within the per-channel tolerance, expanding through 4-connected matching
/// neighbors. The input is not mutated; the output differs from it only in
/// the alpha channel of removed pixels.
pub fn matte_background(img: &RgbaImage, target: [u8; 3], settings: &MatteSettings) -> MatteResult {
    let (width, height) = img.dimensions();
    let mut image = img.clone();
    let mut removed = vec![false; (width as usize) * (height as usize)];
    if width == 0 || height == 0 {
        return MatteResult { image, removed };
    }

    let tolerance = settings.tolerance;
    let w = width as usize;
    let mut visited = vec![false; removed.len()];
    let mut queue: VecDeque<usize> = VecDeque::new();

    let mut border: Vec<(u32, u32)> = Vec::new();
    for x in 0..width {
        border.push((x, 0));
        border.push((x, height - 1));
    }
    for y in 0..height {
        border.push((0, y));
        border.push((width - 1, y));
    }
    for (x, y) in border {
        let idx = y as usize * w + x as usize;
        if !visited[idx] && matches_target(img.get_pixel(x, y), target, tolerance) {
            visited[idx] = true;
            queue.push_back(idx);
        }
    }

    while let Some(idx) = queue.pop_front() {
        removed[idx] = true;
        let x = (idx % w) as u32;
        let y = (idx / w) as u32;
        image.get_pixel_mut(x, y)[3] = 0;

        let mut expand = |nx: u32, ny: u32, visited: &mut Vec<bool>, queue: &mut VecDeque<usize>| {
            let nidx = ny as usize * w + nx as usize;
            if !visited[nidx] && matches_target(img.get_pixel(nx, ny), target, tolerance) {
                visited[nidx] = true;
                queue.push_back(nidx);
            }
        };
        if x > 0 {
            expand(x - 1, y, &mut visited, &mut queue);
        }
        if x < width - 1 {
            expand(x + 1, y, &mut visited, &mut queue);
        }
        if y > 0 {
            expand(x, y - 1, &mut visited, &mut queue);
        }
        if y < height - 1 {
            expand(x, y + 1, &mut visited, &mut queue);
        }
    }

    MatteResult { image, removed }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BORDER: [u8; 3] = [200, 0, 0];
    const INNER: [u8; 3] = [0, 0, 200];

    fn framed_image(size: u32, inner: [u8; 3]) -> RgbaImage {
        RgbaImage::from_fn(size, size, |x, y| {
            if x == 0 || y == 0 || x == size - 1 || y == size - 1 {
                Rgba([BORDER[0], BORDER[1], BORDER[2], 255])
            } else {
                Rgba([inner[0], inner[1], inner[2], 255])
            }
        })
    }

    fn zero_tolerance() -> MatteSettings {
        MatteSettings { tolerance: 0 }
    }

    #[test]
    fn test_border_removed_interior_kept() {
        let img = framed_image(4, INNER);
        let result = matte_background(&img, BORDER, &zero_tolerance());
        assert_eq!(result.removed.iter().filter(|&&r| r).count(), 12);
        for (x, y, pixel) in result.image.enumerate_pixels() {
            if x == 0 || y == 0 || x == 3 || y == 3 {
                assert_eq!(pixel[3], 0);
            } else {
                assert_eq!(pixel[3], 255);
            }
        }
    }

    #[test]
    fn test_uniform_interior_fully_removed() {
        let img = framed_image(4, BORDER);
        let result = matte_background(&img, BORDER, &zero_tolerance());
        assert!(result.removed.iter().all(|&r| r));
    }

    #[test]
    fn test_solid_image_fully_removed() {
        let img = RgbaImage::from_pixel(3, 3, Rgba([77, 88, 99, 255]));
        let result = matte_background(&img, [77, 88, 99], &zero_tolerance());
        assert_eq!(result.removed.iter().filter(|&&r| r).count(), 9);
        assert!(result.image.pixels().all(|p| p[3] == 0));
    }

    #[test]
    fn test_disconnected_island_stays_opaque() {
        // background-colored center separated from the border by a ring
        let mut img = framed_image(5, INNER);
        img.put_pixel(2, 2, Rgba([BORDER[0], BORDER[1], BORDER[2], 255]));
        let result = matte_background(&img, BORDER, &zero_tolerance());
        assert_eq!(result.image.get_pixel(2, 2)[3], 255);
        assert!(!result.removed[2 * 5 + 2]);
        assert_eq!(result.image.get_pixel(0, 0)[3], 0);
    }

    #[test]
    fn test_tolerance_matches_nearby_colors() {
        let settings = MatteSettings { tolerance: 5 };
        assert!(matches_target(&Rgba([105, 95, 103, 255]), [100, 100, 100], 5));
        assert!(!matches_target(&Rgba([106, 100, 100, 255]), [100, 100, 100], 5));

        let img = RgbaImage::from_pixel(2, 2, Rgba([102, 98, 100, 255]));
        let result = matte_background(&img, [100, 100, 100], &settings);
        assert!(result.removed.iter().all(|&r| r));
    }

    #[test]
    fn test_input_untouched_and_colors_preserved() {
        let img = framed_image(4, INNER);
        let result = matte_background(&img, BORDER, &zero_tolerance());
        assert!(img.pixels().all(|p| p[3] == 255));
        for (a, b) in result.image.pixels().zip(img.pixels()) {
            assert_eq!([a[0], a[1], a[2]], [b[0], b[1], b[2]]);
        }
    }
}
