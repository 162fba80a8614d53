//! # Fractal Noise
//!
//! Deterministic fractional Brownian motion built on the `noise` crate's 2D
//! Perlin primitive. Every sample is shifted by [`BROWNIAN_OFFSET`] before it
//! reaches the primitive so the terrain never depends on the primitive's
//! behavior around and below the origin (it mirrors there).
//!
//! The 3D field is not true 3D noise: it averages the six ordered axis pairs
//! of 2D fBm, which is cheap and good enough for carving caves and ore pockets.

use noise::{NoiseFn, Perlin};

/// Added to every input coordinate before sampling the 2D primitive.
pub const BROWNIAN_OFFSET: f64 = 32000.0;

/// Persistence used by the 3D axis-pair field.
const PERSISTENCE_3D: f64 = 0.5;

/// Multi-octave value noise sampled from a seeded Perlin permutation table.
///
/// Holds no mutable state; the same input always produces the same output.
#[derive(Clone)]
pub struct FractalNoise {
    perlin: Perlin,
}

impl FractalNoise {
    /// Creates the noise source for `seed`.
    pub fn new(seed: u32) -> Self {
        FractalNoise {
            perlin: Perlin::new(seed),
        }
    }

    /// The base 2D sample, remapped from Perlin's `[-1, 1]` into `[0, 1]`.
    fn sample(&self, x: f64, z: f64) -> f64 {
        let value = self.perlin.get([x + BROWNIAN_OFFSET, z + BROWNIAN_OFFSET]);
        ((value + 1.0) * 0.5).clamp(0.0, 1.0)
    }

    /// 2D fractional Brownian motion, normalized into `[0, 1]`.
    ///
    /// Each octave doubles the frequency and scales the amplitude by
    /// `persistence`.
    pub fn brownian_2d(&self, x: f64, z: f64, octaves: u32, persistence: f64) -> f64 {
        let mut total = 0.0;
        let mut frequency = 1.0;
        let mut amplitude = 1.0;
        let mut max_value = 0.0;

        for _ in 0..octaves {
            total += self.sample(x * frequency, z * frequency) * amplitude;
            max_value += amplitude;
            amplitude *= persistence;
            frequency *= 2.0;
        }

        if max_value == 0.0 {
            return 0.0;
        }
        total / max_value
    }

    /// 1D fractional Brownian motion along a fixed row of the 2D field.
    pub fn brownian_1d(&self, x: f64, octaves: u32, persistence: f64) -> f64 {
        self.brownian_2d(x, 0.0, octaves, persistence)
    }

    /// 3D fractal field averaged from the six ordered axis pairs.
    ///
    /// `smooth` scales the input coordinates; smaller values give larger
    /// features.
    pub fn brownian_3d(&self, x: f64, y: f64, z: f64, smooth: f64, octaves: u32) -> f64 {
        let (x, y, z) = (x * smooth, y * smooth, z * smooth);

        let xy = self.brownian_2d(x, y, octaves, PERSISTENCE_3D);
        let yz = self.brownian_2d(y, z, octaves, PERSISTENCE_3D);
        let xz = self.brownian_2d(x, z, octaves, PERSISTENCE_3D);
        let yx = self.brownian_2d(y, x, octaves, PERSISTENCE_3D);
        let zy = self.brownian_2d(z, y, octaves, PERSISTENCE_3D);
        let zx = self.brownian_2d(z, x, octaves, PERSISTENCE_3D);

        (xy + yz + xz + yx + zy + zx) / 6.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_is_normalized() {
        let noise = FractalNoise::new(3);
        for i in -50..50 {
            let t = i as f64 * 0.37;
            let v2 = noise.brownian_2d(t, -t * 1.3, 4, 0.5);
            let v3 = noise.brownian_3d(t, t * 0.5, -t, 0.1, 3);
            assert!((0.0..=1.0).contains(&v2), "2d sample {v2} out of range");
            assert!((0.0..=1.0).contains(&v3), "3d sample {v3} out of range");
        }
    }

    #[test]
    fn same_seed_same_field() {
        let a = FractalNoise::new(11);
        let b = FractalNoise::new(11);
        assert_eq!(a.brownian_2d(1.25, -7.5, 5, 0.5), b.brownian_2d(1.25, -7.5, 5, 0.5));
        assert_eq!(a.brownian_1d(42.1, 3, 0.5), b.brownian_1d(42.1, 3, 0.5));
    }

    #[test]
    fn zero_octaves_is_flat() {
        let noise = FractalNoise::new(0);
        assert_eq!(noise.brownian_2d(3.0, 4.0, 0, 0.5), 0.0);
    }
}
