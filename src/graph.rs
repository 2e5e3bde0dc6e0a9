// ============================================================================
// PIXEL GRAPH — rectangular mesh of pixel nodes in a flat arena
// ============================================================================

use std::iter::FusedIterator;
use std::path::Path;

use crate::codec::{self, ImageFormat};
use crate::error::{Error, Result, ensure};
use crate::mutator::Mutator;
use crate::node::{Node, NodeMut, Pixel};

/// Upper bound on `width × height` for any graph (same budget as a 16k × 16k
/// canvas), so a script typo cannot ask for terabytes.
pub const MAX_PIXELS: usize = 256_000_000;

/// A mutable raster stored as a row-major arena of [`Pixel`]s.
///
/// Neighbour links are implied by position: the node right of `(x, y)` is
/// `(x + 1, y)`, and any step off the grid reaches [`Node::Empty`]. Link
/// consistency (`a.right().left() == a`) therefore holds by construction,
/// including across `insert_row` / `insert_column`.
///
/// A graph always has at least one row and one column.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelGraph {
    width: usize,
    height: usize,
    pub(crate) pixels: Vec<Pixel>,
}

impl PixelGraph {
    // ---- construction -------------------------------------------------------

    /// A 1×1 graph holding one opaque white pixel.
    pub fn create_empty() -> Self {
        Self {
            width: 1,
            height: 1,
            pixels: vec![Pixel::WHITE],
        }
    }

    /// A `width × height` graph where every node holds `color`.
    pub fn new_filled(width: usize, height: usize, color: Pixel) -> Result<Self> {
        check_dimensions(width, height)?;
        Ok(Self {
            width,
            height,
            pixels: vec![color; width * height],
        })
    }

    /// A graph of zero colour and zero opacity.
    pub fn transparent(width: usize, height: usize) -> Result<Self> {
        Self::new_filled(width, height, Pixel::TRANSPARENT)
    }

    /// Wrap an existing row-major pixel buffer.
    pub fn from_pixels(width: usize, height: usize, pixels: Vec<Pixel>) -> Result<Self> {
        check_dimensions(width, height)?;
        ensure!(
            pixels.len() == width * height,
            "pixel buffer holds {} pixels but {}x{} needs {}",
            pixels.len(),
            width,
            height,
            width * height
        );
        Ok(Self { width, height, pixels })
    }

    /// Decode a PPM/PNG/JPEG file into a new graph.
    pub fn read_from_file(path: &Path) -> Result<Self> {
        let raster = codec::decode(path)?;
        Self::from_pixels(raster.width, raster.height, raster.pixels)
    }

    /// A checkerboard of `tile_count` square tiles of `tile_size` pixels.
    ///
    /// `tile_count` must be a perfect square; tiles alternate starting with
    /// `first` in the top-left corner.
    pub fn checkerboard(
        tile_size: usize,
        tile_count: usize,
        first: Pixel,
        second: Pixel,
    ) -> Result<Self> {
        ensure!(tile_size > 0, "tile size must be positive");
        ensure!(tile_count > 0, "tile count must be positive");
        let per_side = tile_count.isqrt();
        ensure!(
            per_side * per_side == tile_count,
            "tile count {} is not a perfect square",
            tile_count
        );
        let side = per_side
            .checked_mul(tile_size)
            .ok_or_else(|| Error::invalid("checkerboard is too large"))?;
        check_dimensions(side, side)?;

        let mut pixels = Vec::with_capacity(side * side);
        for y in 0..side {
            for x in 0..side {
                let tile_parity = (x / tile_size + y / tile_size) % 2;
                pixels.push(if tile_parity == 0 { first } else { second });
            }
        }
        Ok(Self {
            width: side,
            height: side,
            pixels,
        })
    }

    /// Independent copy: later writes to either graph are not seen by the other.
    pub fn deep_copy(&self) -> Self {
        self.clone()
    }

    // ---- dimensions and access ----------------------------------------------

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Row-major view of every pixel.
    pub fn pixels(&self) -> &[Pixel] {
        &self.pixels
    }

    #[inline]
    pub(crate) fn index_of(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    fn check_bounds(&self, x: usize, y: usize) -> Result<()> {
        ensure!(
            x < self.width && y < self.height,
            "position ({}, {}) is outside the {}x{} image",
            x,
            y,
            self.width,
            self.height
        );
        Ok(())
    }

    pub fn get_pixel_at(&self, x: usize, y: usize) -> Result<Node<'_>> {
        self.check_bounds(x, y)?;
        Ok(Node::Pixel { graph: self, x, y })
    }

    pub fn node_mut(&mut self, x: usize, y: usize) -> Result<NodeMut<'_>> {
        self.check_bounds(x, y)?;
        Ok(NodeMut::Pixel { graph: self, x, y })
    }

    pub fn pixel(&self, x: usize, y: usize) -> Result<Pixel> {
        self.check_bounds(x, y)?;
        Ok(self.pixels[self.index_of(x, y)])
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, pixel: Pixel) -> Result<()> {
        self.check_bounds(x, y)?;
        let idx = self.index_of(x, y);
        self.pixels[idx] = pixel;
        Ok(())
    }

    // ---- mesh growth --------------------------------------------------------

    /// Insert a row of opaque white nodes so that it becomes row `index`.
    /// Rows at or after `index` move down by one.
    pub fn insert_row(&mut self, index: usize) -> Result<()> {
        ensure!(
            index <= self.height,
            "row index {} is outside 0..={}",
            index,
            self.height
        );
        check_dimensions(self.width, self.height + 1)?;
        let start = index * self.width;
        self.pixels
            .splice(start..start, std::iter::repeat_n(Pixel::WHITE, self.width));
        self.height += 1;
        Ok(())
    }

    /// Insert a column of opaque white nodes so that it becomes column `index`.
    /// Columns at or after `index` move right by one.
    pub fn insert_column(&mut self, index: usize) -> Result<()> {
        ensure!(
            index <= self.width,
            "column index {} is outside 0..={}",
            index,
            self.width
        );
        check_dimensions(self.width + 1, self.height)?;
        let new_width = self.width + 1;
        let mut pixels = Vec::with_capacity(new_width * self.height);
        for row in self.pixels.chunks_exact(self.width) {
            pixels.extend_from_slice(&row[..index]);
            pixels.push(Pixel::WHITE);
            pixels.extend_from_slice(&row[index..]);
        }
        self.pixels = pixels;
        self.width = new_width;
        Ok(())
    }

    // ---- transforms and output ----------------------------------------------

    /// Run `mutator` over every node.
    pub fn apply_mutator(&mut self, mutator: &dyn Mutator) -> Result<()> {
        mutator.apply(self)
    }

    /// Encode to `path` as `format` (JPEG at the default quality).
    pub fn write_to_file(&self, format: ImageFormat, path: &Path) -> Result<()> {
        codec::encode(self, format, path, codec::DEFAULT_JPEG_QUALITY)
    }

    /// Row-major, one-shot iteration over every node.
    pub fn nodes(&self) -> Nodes<'_> {
        Nodes { graph: self, next: 0 }
    }

    /// Replace the pixel buffer wholesale; used by mutators to commit a
    /// freshly computed frame.
    pub(crate) fn commit(&mut self, pixels: Vec<Pixel>) {
        debug_assert_eq!(pixels.len(), self.pixels.len());
        self.pixels = pixels;
    }
}

impl Default for PixelGraph {
    fn default() -> Self {
        Self::create_empty()
    }
}

pub(crate) fn check_dimensions(width: usize, height: usize) -> Result<()> {
    ensure!(
        width > 0 && height > 0,
        "image dimensions must be positive, got {}x{}",
        width,
        height
    );
    ensure!(
        width.checked_mul(height).is_some_and(|n| n <= MAX_PIXELS),
        "image dimensions {}x{} exceed {} pixels",
        width,
        height,
        MAX_PIXELS
    );
    Ok(())
}

// ============================================================================
// ROW-MAJOR NODE ITERATOR
// ============================================================================

/// Iterator returned by [`PixelGraph::nodes`]. Once it returns `None` it
/// keeps returning `None`; start over with a new call to `nodes()`.
#[derive(Clone, Debug)]
pub struct Nodes<'g> {
    graph: &'g PixelGraph,
    next: usize,
}

impl<'g> Iterator for Nodes<'g> {
    type Item = Node<'g>;

    fn next(&mut self) -> Option<Node<'g>> {
        if self.next >= self.graph.pixels.len() {
            return None;
        }
        let i = self.next;
        self.next += 1;
        Some(Node::Pixel {
            graph: self.graph,
            x: i % self.graph.width,
            y: i / self.graph.width,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.graph.pixels.len().saturating_sub(self.next);
        (left, Some(left))
    }
}

impl ExactSizeIterator for Nodes<'_> {}
impl FusedIterator for Nodes<'_> {}

impl<'g> IntoIterator for &'g PixelGraph {
    type Item = Node<'g>;
    type IntoIter = Nodes<'g>;

    fn into_iter(self) -> Nodes<'g> {
        self.nodes()
    }
}
