// ============================================================================
// BLEND STRATEGIES — flatten a LayeredImage into one PixelGraph
// ============================================================================

use rayon::prelude::*;

use crate::error::Result;
use crate::graph::PixelGraph;
use crate::layered::{Layer, LayeredImage};
use crate::node::{Pixel, channel_from_f64};

/// Flattens a layer stack. Only one strategy ships, but scripts and callers
/// go through this trait.
pub trait BlendStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn blend(&self, image: &LayeredImage) -> Result<PixelGraph>;
}

/// Porter-Duff "over": each visible layer is composited onto the layers
/// behind it, using its per-pixel opacity as alpha. Hidden layers are
/// skipped. A position no visible layer covers stays fully transparent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NormalBlend;

impl NormalBlend {
    /// Composite `top` over `base` (both straight, non-premultiplied alpha).
    pub fn over(base: Pixel, top: Pixel) -> Pixel {
        // Fast path: fully transparent top pixel
        if top.opacity == 0 {
            return base;
        }
        // Fast path: fully opaque top pixel
        if top.opacity == 255 {
            return top;
        }

        let top_a = top.opacity as f64 / 255.0;
        let base_a = base.opacity as f64 / 255.0;
        let out_a = top_a + base_a * (1.0 - top_a);

        let mix = |t: u8, b: u8| {
            let c = (t as f64 * top_a + b as f64 * base_a * (1.0 - top_a)) / out_a;
            channel_from_f64(c)
        };

        Pixel::new(
            mix(top.red, base.red),
            mix(top.green, base.green),
            mix(top.blue, base.blue),
            channel_from_f64(out_a * 255.0),
        )
    }
}

impl BlendStrategy for NormalBlend {
    fn name(&self) -> &'static str {
        "normal"
    }

    fn blend(&self, image: &LayeredImage) -> Result<PixelGraph> {
        let w = image.width();
        // Back to front: the last layer is the deepest.
        let visible: Vec<&Layer> = image.layers().filter(|l| l.is_visible()).rev().collect();

        let mut out = vec![Pixel::TRANSPARENT; w * image.height()];
        out.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
            for (x, slot) in row.iter_mut().enumerate() {
                let idx = y * w + x;
                *slot = visible
                    .iter()
                    .fold(Pixel::TRANSPARENT, |acc, layer| {
                        Self::over(acc, layer.pixels().pixels()[idx])
                    });
            }
        });

        PixelGraph::from_pixels(w, image.height(), out)
    }
}
