//! Rotation of small grayscale templates.
//!
//! The pivot is the geometric center of the pixel grid, `((w - 1) / 2,
//! (h - 1) / 2)`, so quarter and half turns of any canvas land exactly on
//! source pixels. OpenCV's usual `getRotationMatrix2D((w / 2, h / 2))`
//! pivots half a pixel further right and down on even sizes; variants
//! precomputed that way match these only up to that half-pixel shift, not
//! pixel for pixel. Odd sizes agree.

use crate::image::{ImageView, OwnedImage};
use crate::util::math::sin_cos_deg;

/// Bicubic coefficient used by OpenCV's `INTER_CUBIC`.
const CUBIC_A: f32 = -0.75;

/// Rotates a grayscale template with bicubic sampling on a fixed canvas.
///
/// Rotation is about `cx = (w - 1) / 2`, `cy = (h - 1) / 2`. Positive angles
/// turn the content counter-clockwise as displayed (y pointing down). Each
/// destination pixel is mapped back into the source; the 4x4 neighbourhood
/// around it is weighted with the cubic convolution kernel and taps that fall
/// outside the source read `fill`. The output has the input dimensions, so
/// corners that rotate out of the canvas are cropped.
pub fn rotate_u8_bicubic(src: ImageView<'_, u8>, angle_deg: f32, fill: u8) -> OwnedImage {
    let width = src.width();
    let height = src.height();
    let mut out = vec![fill; width * height];

    let (sin_a, cos_a) = sin_cos_deg(angle_deg);
    let cx = (width as f32 - 1.0) * 0.5;
    let cy = (height as f32 - 1.0) * 0.5;
    let fill_f = fill as f32;

    let sample = |x: isize, y: isize| -> f32 {
        if x < 0 || y < 0 {
            return fill_f;
        }
        src.get(x as usize, y as usize)
            .map_or(fill_f, |&value| value as f32)
    };

    for y in 0..height {
        for x in 0..width {
            let dx = x as f32 - cx;
            let dy = y as f32 - cy;
            let src_x = cos_a * dx - sin_a * dy + cx;
            let src_y = sin_a * dx + cos_a * dy + cy;

            if !src_x.is_finite()
                || !src_y.is_finite()
                || src_x <= -2.0
                || src_y <= -2.0
                || src_x >= width as f32 + 1.0
                || src_y >= height as f32 + 1.0
            {
                continue;
            }

            let x0 = src_x.floor();
            let y0 = src_y.floor();
            let wx = cubic_weights(src_x - x0);
            let wy = cubic_weights(src_y - y0);
            let x0 = x0 as isize;
            let y0 = y0 as isize;

            let mut value = 0.0f32;
            for (j, wy_j) in wy.iter().enumerate() {
                let sy = y0 - 1 + j as isize;
                let mut acc = 0.0f32;
                for (i, wx_i) in wx.iter().enumerate() {
                    acc += wx_i * sample(x0 - 1 + i as isize, sy);
                }
                value += wy_j * acc;
            }

            out[y * width + x] = value.round().clamp(0.0, 255.0) as u8;
        }
    }

    OwnedImage::from_raw(out, width, height)
}

/// Cubic convolution weights for the taps at offsets `-1, 0, 1, 2` given the
/// fractional position `t` in `[0, 1)`.
fn cubic_weights(t: f32) -> [f32; 4] {
    let a = CUBIC_A;
    let t1 = t + 1.0;
    let u = 1.0 - t;
    let w0 = ((a * t1 - 5.0 * a) * t1 + 8.0 * a) * t1 - 4.0 * a;
    let w1 = ((a + 2.0) * t - (a + 3.0)) * t * t + 1.0;
    let w2 = ((a + 2.0) * u - (a + 3.0)) * u * u + 1.0;
    let w3 = 1.0 - w0 - w1 - w2;
    [w0, w1, w2, w3]
}

#[cfg(test)]
mod tests {
    use super::{cubic_weights, rotate_u8_bicubic};
    use crate::image::ImageView;

    #[test]
    fn weights_sum_to_one_and_interpolate_at_zero() {
        let w = cubic_weights(0.0);
        assert!((w[1] - 1.0).abs() < 1e-6);
        assert!(w[0].abs() < 1e-6 && w[2].abs() < 1e-6 && w[3].abs() < 1e-6);

        for t in [0.1f32, 0.25, 0.5, 0.9] {
            let sum: f32 = cubic_weights(t).iter().sum();
            assert!((sum - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn zero_angle_is_identity() {
        let data: Vec<u8> = (0..35u8).map(|v| v * 7).collect();
        let view = ImageView::from_slice(&data, 7, 5).unwrap();
        let rotated = rotate_u8_bicubic(view, 0.0, 0);
        assert_eq!(rotated.data(), data.as_slice());
    }

    #[test]
    fn half_turn_flips_both_axes() {
        let width = 5;
        let height = 4;
        let data: Vec<u8> = (0..(width * height) as u8).map(|v| v * 11).collect();
        let view = ImageView::from_slice(&data, width, height).unwrap();
        let rotated = rotate_u8_bicubic(view, 180.0, 0);
        for y in 0..height {
            for x in 0..width {
                let expected = data[(height - 1 - y) * width + (width - 1 - x)];
                assert_eq!(rotated.data()[y * width + x], expected);
            }
        }
    }

    #[test]
    fn quarter_turn_is_counter_clockwise() {
        // A bright pixel right of center moves above center.
        let mut data = vec![0u8; 25];
        data[2 * 5 + 4] = 200;
        let view = ImageView::from_slice(&data, 5, 5).unwrap();
        let rotated = rotate_u8_bicubic(view, 90.0, 0);
        assert_eq!(rotated.data()[2], 200);
        assert_eq!(rotated.data()[2 * 5 + 4], 0);
    }

    #[test]
    fn even_sizes_pivot_between_the_middle_pixels() {
        let data: Vec<u8> = (0..16u8).map(|v| v * 15 + 5).collect();
        let view = ImageView::from_slice(&data, 4, 4).unwrap();
        let rotated = rotate_u8_bicubic(view, 90.0, 0);
        // (3, 1) sits at offset (1.5, -0.5) from the pivot and turns to (1, 0).
        assert_eq!(rotated.data()[1], data[4 + 3]);
        let mut before = data.clone();
        let mut after = rotated.data().to_vec();
        before.sort_unstable();
        after.sort_unstable();
        assert_eq!(before, after);
    }

    #[test]
    fn rotation_keeps_canvas_size() {
        let data = vec![128u8; 24 * 18];
        let view = ImageView::from_slice(&data, 24, 18).unwrap();
        let rotated = rotate_u8_bicubic(view, 37.0, 0);
        assert_eq!((rotated.width(), rotated.height()), (24, 18));
    }
}
