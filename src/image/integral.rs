//! Summed-area tables for constant-time window statistics.

use crate::image::ImageView;

/// Exact integer integral images of pixel values and squared pixel values.
///
/// Built once per frame and shared by every template scanned against it, so
/// the window sums needed for normalization cost four lookups per placement.
#[derive(Clone, Debug)]
pub struct IntegralImage {
    width: usize,
    height: usize,
    sum: Vec<u64>,
    sum_sq: Vec<u64>,
}

impl IntegralImage {
    /// Builds both tables from a grayscale view.
    pub fn new(img: ImageView<'_, u8>) -> Self {
        let width = img.width();
        let height = img.height();
        let cols = width + 1;
        let mut sum = vec![0u64; cols * (height + 1)];
        let mut sum_sq = vec![0u64; cols * (height + 1)];

        for (y, row) in img.rows().enumerate() {
            let mut row_sum = 0u64;
            let mut row_sq = 0u64;
            let above = y * cols;
            let here = (y + 1) * cols;
            for (x, &value) in row.iter().enumerate() {
                let v = value as u64;
                row_sum += v;
                row_sq += v * v;
                sum[here + x + 1] = sum[above + x + 1] + row_sum;
                sum_sq[here + x + 1] = sum_sq[above + x + 1] + row_sq;
            }
        }

        Self {
            width,
            height,
            sum,
            sum_sq,
        }
    }

    /// Returns the width of the source image.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the height of the source image.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns `(Σi, Σi²)` over the `w x h` window with top-left `(x, y)`.
    ///
    /// The window must lie inside the source image.
    #[inline]
    pub fn window(&self, x: usize, y: usize, w: usize, h: usize) -> (u64, u64) {
        debug_assert!(x + w <= self.width && y + h <= self.height);
        let cols = self.width + 1;
        let tl = y * cols + x;
        let tr = tl + w;
        let bl = (y + h) * cols + x;
        let br = bl + w;
        (
            (self.sum[br] + self.sum[tl]) - (self.sum[tr] + self.sum[bl]),
            (self.sum_sq[br] + self.sum_sq[tl]) - (self.sum_sq[tr] + self.sum_sq[bl]),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::IntegralImage;
    use crate::image::ImageView;

    #[test]
    fn window_sums_match_brute_force() {
        let width = 7;
        let height = 5;
        let data: Vec<u8> = (0..width * height).map(|i| (i * 37 % 251) as u8).collect();
        let view = ImageView::from_slice(&data, width, height).unwrap();
        let integral = IntegralImage::new(view);

        for (x, y, w, h) in [(0, 0, 7, 5), (2, 1, 3, 3), (6, 4, 1, 1), (1, 0, 4, 2)] {
            let mut s = 0u64;
            let mut s2 = 0u64;
            for yy in y..y + h {
                for xx in x..x + w {
                    let v = data[yy * width + xx] as u64;
                    s += v;
                    s2 += v * v;
                }
            }
            assert_eq!(integral.window(x, y, w, h), (s, s2));
        }
    }
}
