//! Color frequency histogram of a reconstructed image.

use std::collections::HashMap;

use image::RgbaImage;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct ColorCount {
    pub color: [u8; 3],
    /// Canonical `#rrggbb` key for the color
    pub hex: String,
    pub count: usize,
    /// Full RGBA of the first pixel encountered with this color
    pub rgba: [u8; 4],
}

struct Bucket {
    count: usize,
    first_seen: usize,
    rgba: [u8; 4],
}

/// Count distinct opaque colors, most frequent first.
///
/// Fully transparent pixels are skipped and alpha is excluded from the key,
/// so colors differing only in alpha share one bucket. Ties keep
/// first-encountered order. An empty histogram is a valid result.
pub fn color_histogram(img: &RgbaImage) -> Vec<ColorCount> {
    let mut buckets: HashMap<[u8; 3], Bucket> = HashMap::new();
    let mut order = 0usize;

    for pixel in img.pixels() {
        if pixel[3] == 0 {
            continue;
        }
        let key = [pixel[0], pixel[1], pixel[2]];
        buckets
            .entry(key)
            .and_modify(|b| b.count += 1)
            .or_insert(Bucket {
                count: 1,
                first_seen: order,
                rgba: pixel.0,
            });
        order += 1;
    }

    let mut entries: Vec<([u8; 3], Bucket)> = buckets.into_iter().collect();
    entries.sort_by(|a, b| b.1.count.cmp(&a.1.count).then(a.1.first_seen.cmp(&b.1.first_seen)));

    entries
        .into_iter()
        .map(|(color, bucket)| ColorCount {
            color,
            hex: format!("#{:02x}{:02x}{:02x}", color[0], color[1], color[2]),
            count: bucket.count,
            rgba: bucket.rgba,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_counts_sum_to_opaque_pixels() {
        let img = RgbaImage::from_fn(6, 6, |x, y| {
            if (x + y) % 3 == 0 {
                Rgba([0, 0, 0, 0])
            } else {
                Rgba([(x % 2 * 255) as u8, 40, 60, 255])
            }
        });
        let opaque = img.pixels().filter(|p| p[3] != 0).count();
        let histogram = color_histogram(&img);
        let total: usize = histogram.iter().map(|e| e.count).sum();
        assert_eq!(total, opaque);
    }

    #[test]
    fn test_descending_with_stable_ties() {
        let mut img = RgbaImage::from_pixel(3, 1, Rgba([9, 9, 9, 255]));
        img.put_pixel(1, 0, Rgba([1, 2, 3, 255]));
        // counts: [9,9,9] x2, [1,2,3] x1
        let histogram = color_histogram(&img);
        assert_eq!(histogram[0].color, [9, 9, 9]);
        assert_eq!(histogram[0].count, 2);
        assert_eq!(histogram[1].count, 1);

        // equal counts keep first-encountered order
        let tied = RgbaImage::from_fn(2, 2, |x, _y| {
            if x == 0 {
                Rgba([5, 0, 0, 255])
            } else {
                Rgba([0, 5, 0, 255])
            }
        });
        let histogram = color_histogram(&tied);
        assert_eq!(histogram[0].color, [5, 0, 0]);
        assert_eq!(histogram[1].color, [0, 5, 0]);
    }

    #[test]
    fn test_alpha_excluded_from_key() {
        let mut img = RgbaImage::from_pixel(2, 1, Rgba([10, 20, 30, 255]));
        img.put_pixel(1, 0, Rgba([10, 20, 30, 128]));
        let histogram = color_histogram(&img);
        assert_eq!(histogram.len(), 1);
        assert_eq!(histogram[0].count, 2);
        assert_eq!(histogram[0].rgba, [10, 20, 30, 255]);
        assert_eq!(histogram[0].hex, "#0a141e");
    }

    #[test]
    fn test_transparent_image_is_empty() {
        let img = RgbaImage::from_pixel(4, 4, Rgba([200, 200, 200, 0]));
        assert!(color_histogram(&img).is_empty());
        assert!(color_histogram(&RgbaImage::new(0, 0)).is_empty());
    }
}
