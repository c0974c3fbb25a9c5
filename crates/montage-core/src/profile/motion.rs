//! Frame statistics: brightness, contrast and inter-frame motion
//!
//! Operates on down-scaled grayscale frames (~160x90). Motion is a
//! per-grid-cell luma delta between two frames ~0.1s apart, with a
//! noise floor to suppress sensor grain, plus a dominant-direction
//! classification from the cell deltas' spatial distribution.

use crate::types::MotionDirection;

/// Profiling frame width after down-scaling
pub const FRAME_WIDTH: usize = 160;
/// Profiling frame height after down-scaling
pub const FRAME_HEIGHT: usize = 90;

/// Spatial grid used for motion analysis (16x16 cells)
const GRID: usize = 16;

/// Per-pixel luma delta below this is treated as sensor noise
const NOISE_FLOOR: u8 = 25;

/// Motion energy below this classifies as static
const STATIC_THRESHOLD: f32 = 0.05;

/// A down-scaled grayscale frame
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: usize,
    pub height: usize,
    /// Row-major luma plane, one byte per pixel
    pub luma: Vec<u8>,
}

impl Frame {
    pub fn new(width: usize, height: usize, luma: Vec<u8>) -> Self {
        debug_assert_eq!(luma.len(), width * height);
        Self {
            width,
            height,
            luma,
        }
    }

    /// Uniform frame, handy for tests
    pub fn solid(width: usize, height: usize, value: u8) -> Self {
        Self::new(width, height, vec![value; width * height])
    }
}

/// Mean luma, normalized to 0-1
pub fn brightness(frame: &Frame) -> f32 {
    if frame.luma.is_empty() {
        return 0.5;
    }
    let sum: u64 = frame.luma.iter().map(|&v| v as u64).sum();
    sum as f32 / (frame.luma.len() as f32 * 255.0)
}

/// Contrast proxy: luma variance scaled into 0-1
pub fn contrast(frame: &Frame) -> f32 {
    if frame.luma.is_empty() {
        return 0.5;
    }
    let n = frame.luma.len() as f64;
    let mean = frame.luma.iter().map(|&v| v as f64).sum::<f64>() / n;
    let variance = frame
        .luma
        .iter()
        .map(|&v| {
            let d = v as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n;
    // Full-scale black/white checkerboard has variance 127.5^2; a std-dev
    // of 64 already reads as very high contrast.
    ((variance.sqrt() / 64.0) as f32).clamp(0.0, 1.0)
}

/// Per-cell mean luma deltas between two frames on the analysis grid
///
/// Returns a GRID x GRID row-major matrix of normalized deltas (0-1),
/// with the noise floor already applied per pixel.
fn cell_deltas(a: &Frame, b: &Frame) -> Vec<f32> {
    let mut cells = vec![0.0f32; GRID * GRID];
    if a.width != b.width || a.height != b.height || a.luma.is_empty() {
        return cells;
    }
    let mut counts = vec![0u32; GRID * GRID];
    for y in 0..a.height {
        let cy = y * GRID / a.height;
        for x in 0..a.width {
            let cx = x * GRID / a.width;
            let i = y * a.width + x;
            let delta = a.luma[i].abs_diff(b.luma[i]);
            let cell = cy * GRID + cx;
            if delta > NOISE_FLOOR {
                cells[cell] += delta as f32 / 255.0;
            }
            counts[cell] += 1;
        }
    }
    for (c, &n) in cells.iter_mut().zip(counts.iter()) {
        if n > 0 {
            *c /= n as f32;
        }
    }
    cells
}

/// Motion energy (0-1) and dominant direction between two close-in-time
/// frames
pub fn motion_between(a: &Frame, b: &Frame) -> (f32, MotionDirection) {
    let cells = cell_deltas(a, b);
    let mean = cells.iter().sum::<f32>() / cells.len() as f32;
    // Typical inter-frame deltas are small; scale so busy footage lands
    // near the top of the range.
    let energy = (mean * 12.0).clamp(0.0, 1.0);

    if energy < STATIC_THRESHOLD {
        return (energy, MotionDirection::Static);
    }

    // Directional bias: horizontal motion concentrates delta variance
    // across columns, vertical motion across rows.
    let mut row_means = vec![0.0f32; GRID];
    let mut col_means = vec![0.0f32; GRID];
    for r in 0..GRID {
        for c in 0..GRID {
            let v = cells[r * GRID + c];
            row_means[r] += v / GRID as f32;
            col_means[c] += v / GRID as f32;
        }
    }
    let spread = |v: &[f32]| {
        let m = v.iter().sum::<f32>() / v.len() as f32;
        v.iter().map(|x| (x - m) * (x - m)).sum::<f32>() / v.len() as f32
    };
    let row_spread = spread(&row_means);
    let col_spread = spread(&col_means);

    let direction = if col_spread > row_spread * 1.5 {
        MotionDirection::Horizontal
    } else if row_spread > col_spread * 1.5 {
        MotionDirection::Vertical
    } else {
        MotionDirection::Chaotic
    };
    (energy, direction)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_frame(w: usize, h: usize, shift: usize) -> Frame {
        // Horizontal luma gradient, shifted right by `shift` pixels.
        let mut luma = vec![0u8; w * h];
        for y in 0..h {
            for x in 0..w {
                let sx = (x + w - shift % w) % w;
                luma[y * w + x] = (sx * 255 / w) as u8;
            }
        }
        Frame::new(w, h, luma)
    }

    #[test]
    fn brightness_of_solid_frames() {
        assert_eq!(brightness(&Frame::solid(16, 16, 0)), 0.0);
        assert_eq!(brightness(&Frame::solid(16, 16, 255)), 1.0);
        let mid = brightness(&Frame::solid(16, 16, 128));
        assert!((mid - 0.5).abs() < 0.01);
    }

    #[test]
    fn contrast_separates_flat_from_checkerboard() {
        let flat = Frame::solid(32, 32, 100);
        let mut board = Frame::solid(32, 32, 0);
        for (i, v) in board.luma.iter_mut().enumerate() {
            if (i / 32 + i % 32) % 2 == 0 {
                *v = 255;
            }
        }
        assert_eq!(contrast(&flat), 0.0);
        assert_eq!(contrast(&board), 1.0);
    }

    #[test]
    fn identical_frames_read_static() {
        let f = gradient_frame(FRAME_WIDTH, FRAME_HEIGHT, 0);
        let (energy, dir) = motion_between(&f, &f);
        assert_eq!(energy, 0.0);
        assert_eq!(dir, MotionDirection::Static);
    }

    #[test]
    fn noise_below_floor_is_suppressed() {
        let a = Frame::solid(FRAME_WIDTH, FRAME_HEIGHT, 100);
        let b = Frame::solid(FRAME_WIDTH, FRAME_HEIGHT, 110); // delta 10 < 25
        let (energy, dir) = motion_between(&a, &b);
        assert_eq!(energy, 0.0);
        assert_eq!(dir, MotionDirection::Static);
    }

    #[test]
    fn large_shift_reads_as_motion() {
        let a = gradient_frame(FRAME_WIDTH, FRAME_HEIGHT, 0);
        let b = gradient_frame(FRAME_WIDTH, FRAME_HEIGHT, 40);
        let (energy, _) = motion_between(&a, &b);
        assert!(energy > 0.1, "energy = {energy}");
    }

    #[test]
    fn vertical_band_change_classifies_vertical() {
        // Change confined to a horizontal band: spread across rows is
        // high, across columns near zero.
        let a = Frame::solid(FRAME_WIDTH, FRAME_HEIGHT, 20);
        let mut b = Frame::solid(FRAME_WIDTH, FRAME_HEIGHT, 20);
        for y in 0..FRAME_HEIGHT / 4 {
            for x in 0..FRAME_WIDTH {
                b.luma[y * FRAME_WIDTH + x] = 220;
            }
        }
        let (energy, dir) = motion_between(&a, &b);
        assert!(energy >= STATIC_THRESHOLD);
        assert_eq!(dir, MotionDirection::Vertical);
    }

    #[test]
    fn mismatched_frames_are_harmless() {
        let a = Frame::solid(16, 16, 0);
        let b = Frame::solid(32, 32, 255);
        let (energy, dir) = motion_between(&a, &b);
        assert_eq!(energy, 0.0);
        assert_eq!(dir, MotionDirection::Static);
    }
}
