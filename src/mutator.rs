// ============================================================================
// MUTATORS — convolution filters and colour-matrix transforms
// ============================================================================
//
// Every mutator reads the untouched source graph and writes a fresh pixel
// buffer, which is committed only once every row is done. Rows are computed
// in parallel via rayon.

use std::fmt;
use std::str::FromStr;

use rayon::prelude::*;

use crate::error::{Error, Result, ensure};
use crate::graph::PixelGraph;
use crate::node::{Node, Pixel, channel_from_f64};

/// An in-place transform over every node of a [`PixelGraph`].
pub trait Mutator: Send + Sync {
    /// Script keyword for this mutator.
    fn name(&self) -> &'static str;

    fn apply(&self, graph: &mut PixelGraph) -> Result<()>;
}

// ============================================================================
// CONVOLUTION FILTERS
// ============================================================================

/// Square convolution kernel applied per colour channel. Opacity is kept.
///
/// Kernel taps that fall outside the grid read the `Empty` sentinel and so
/// contribute zero; there is no border reflection or clamping.
#[derive(Clone, Debug, PartialEq)]
pub struct Filter {
    name: &'static str,
    radius: usize,
    weights: Vec<f64>,
}

impl Filter {
    /// Build a filter from a row-major `(2r+1) × (2r+1)` weight table.
    pub fn from_kernel(name: &'static str, radius: usize, weights: Vec<f64>) -> Result<Self> {
        let side = 2 * radius + 1;
        ensure!(
            weights.len() == side * side,
            "kernel of radius {} needs {} weights, got {}",
            radius,
            side * side,
            weights.len()
        );
        Ok(Self { name, radius, weights })
    }

    /// 3×3 blur: 1/4 centre, 1/8 orthogonal, 1/16 diagonal.
    pub fn blur() -> Self {
        const C: f64 = 1.0 / 4.0;
        const O: f64 = 1.0 / 8.0;
        const D: f64 = 1.0 / 16.0;
        Self {
            name: "blur",
            radius: 1,
            weights: vec![
                D, O, D, //
                O, C, O, //
                D, O, D,
            ],
        }
    }

    /// 5×5 sharpen: 1 at the centre, 1/4 on the inner ring, −1/8 on the
    /// outer ring. The weights sum to one, so flat regions are unchanged.
    pub fn sharpen() -> Self {
        const I: f64 = 1.0 / 4.0;
        const N: f64 = -1.0 / 8.0;
        Self {
            name: "sharpen",
            radius: 2,
            weights: vec![
                N, N, N, N, N, //
                N, I, I, I, N, //
                N, I, 1.0, I, N, //
                N, I, I, I, N, //
                N, N, N, N, N,
            ],
        }
    }

    pub fn radius(&self) -> usize {
        self.radius
    }

    /// Weight at offset `(dx, dy)` from the centre, zero outside the kernel.
    pub fn weight(&self, dx: i64, dy: i64) -> f64 {
        let r = self.radius as i64;
        if dx.abs() > r || dy.abs() > r {
            return 0.0;
        }
        let side = 2 * r + 1;
        self.weights[((dy + r) * side + (dx + r)) as usize]
    }

    fn convolve_at(&self, origin: Node<'_>) -> Pixel {
        let r = self.radius as i64;
        let mut acc = [0.0f64; 3];
        for dy in -r..=r {
            for dx in -r..=r {
                let w = self.weight(dx, dy);
                if w == 0.0 {
                    continue;
                }
                let c = origin.offset(dx, dy).color();
                acc[0] += w * c.red as f64;
                acc[1] += w * c.green as f64;
                acc[2] += w * c.blue as f64;
            }
        }
        Pixel::new(
            channel_from_f64(acc[0]),
            channel_from_f64(acc[1]),
            channel_from_f64(acc[2]),
            origin.opacity(),
        )
    }
}

impl Mutator for Filter {
    fn name(&self) -> &'static str {
        self.name
    }

    fn apply(&self, graph: &mut PixelGraph) -> Result<()> {
        let width = graph.width();
        let src: &PixelGraph = graph;
        let mut out = vec![Pixel::TRANSPARENT; src.pixels().len()];

        // Parallel by row; `src` is never written until the commit below.
        out.par_chunks_mut(width).enumerate().for_each(|(y, row_out)| {
            for (x, slot) in row_out.iter_mut().enumerate() {
                *slot = self.convolve_at(Node::Pixel { graph: src, x, y });
            }
        });

        graph.commit(out);
        Ok(())
    }
}

// ============================================================================
// COLOUR-MATRIX TRANSFORMS
// ============================================================================

/// A 3×3 matrix applied to each node's `(R, G, B)` column vector.
#[derive(Clone, Debug, PartialEq)]
pub struct ColorTransform {
    name: &'static str,
    matrix: [[f64; 3]; 3],
}

impl ColorTransform {
    pub fn new(name: &'static str, matrix: [[f64; 3]; 3]) -> Self {
        Self { name, matrix }
    }

    /// BT.709 luma written into all three channels.
    pub fn greyscale() -> Self {
        const LUMA: [f64; 3] = [0.2126, 0.7152, 0.0722];
        Self::new("greyscale", [LUMA, LUMA, LUMA])
    }

    pub fn sepia() -> Self {
        Self::new(
            "sepia",
            [
                [0.393, 0.769, 0.189],
                [0.349, 0.686, 0.168],
                [0.272, 0.534, 0.131],
            ],
        )
    }

    pub fn transform(&self, p: Pixel) -> Pixel {
        let v = [p.red as f64, p.green as f64, p.blue as f64];
        let row = |i: usize| {
            let m = self.matrix[i];
            channel_from_f64(m[0] * v[0] + m[1] * v[1] + m[2] * v[2])
        };
        Pixel::new(row(0), row(1), row(2), p.opacity)
    }
}

impl Mutator for ColorTransform {
    fn name(&self) -> &'static str {
        self.name
    }

    fn apply(&self, graph: &mut PixelGraph) -> Result<()> {
        let out: Vec<Pixel> = graph
            .pixels()
            .par_iter()
            .map(|&p| self.transform(p))
            .collect();
        graph.commit(out);
        Ok(())
    }
}

// ============================================================================
// SCRIPT-FACING SELECTOR
// ============================================================================

/// The mutators a script can name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MutatorKind {
    Blur,
    Sharpen,
    Greyscale,
    Sepia,
}

impl MutatorKind {
    pub fn all() -> &'static [MutatorKind] {
        &[
            MutatorKind::Blur,
            MutatorKind::Sharpen,
            MutatorKind::Greyscale,
            MutatorKind::Sepia,
        ]
    }

    pub fn name(self) -> &'static str {
        match self {
            MutatorKind::Blur => "blur",
            MutatorKind::Sharpen => "sharpen",
            MutatorKind::Greyscale => "greyscale",
            MutatorKind::Sepia => "sepia",
        }
    }

    pub fn mutator(self) -> Box<dyn Mutator> {
        match self {
            MutatorKind::Blur => Box::new(Filter::blur()),
            MutatorKind::Sharpen => Box::new(Filter::sharpen()),
            MutatorKind::Greyscale => Box::new(ColorTransform::greyscale()),
            MutatorKind::Sepia => Box::new(ColorTransform::sepia()),
        }
    }
}

impl FromStr for MutatorKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "blur" => Ok(MutatorKind::Blur),
            "sharpen" => Ok(MutatorKind::Sharpen),
            "greyscale" | "grayscale" => Ok(MutatorKind::Greyscale),
            "sepia" => Ok(MutatorKind::Sepia),
            _ => Err(Error::invalid(format!("unknown mutator '{}'", s))),
        }
    }
}

impl fmt::Display for MutatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
