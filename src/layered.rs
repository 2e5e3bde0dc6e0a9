// ============================================================================
// LAYERED IMAGE — ordered stack of same-size named layers
// ============================================================================
//
// Index 0 is the topmost (front) layer. New layers are inserted at the front.
// All layers share the image's width and height, fixed at construction.

use std::ops::Deref;
use std::path::Path;

use crate::blend::BlendStrategy;
use crate::codec::{self, ImageFormat};
use crate::error::{Error, Result, ensure};
use crate::graph::{PixelGraph, check_dimensions};
use crate::mutator::Mutator;
use crate::node::{NodeMut, Pixel};
use crate::persist;

// ============================================================================
// FIXED-SIZE GRAPH
// ============================================================================

/// A [`PixelGraph`] whose dimensions can no longer change.
///
/// Read access goes through `Deref`; the only mutations offered are the ones
/// that keep the mesh shape (pixel writes and mutators).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FixedSizeGraph {
    graph: PixelGraph,
}

impl FixedSizeGraph {
    pub fn new(graph: PixelGraph) -> Self {
        Self { graph }
    }

    pub fn transparent(width: usize, height: usize) -> Result<Self> {
        Ok(Self::new(PixelGraph::transparent(width, height)?))
    }

    pub fn node_mut(&mut self, x: usize, y: usize) -> Result<NodeMut<'_>> {
        self.graph.node_mut(x, y)
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, pixel: Pixel) -> Result<()> {
        self.graph.set_pixel(x, y, pixel)
    }

    pub fn apply_mutator(&mut self, mutator: &dyn Mutator) -> Result<()> {
        self.graph.apply_mutator(mutator)
    }

    pub fn as_graph(&self) -> &PixelGraph {
        &self.graph
    }
}

impl Deref for FixedSizeGraph {
    type Target = PixelGraph;

    fn deref(&self) -> &PixelGraph {
        &self.graph
    }
}

// ============================================================================
// LAYER
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Layer {
    name: String,
    visible: bool,
    pixels: FixedSizeGraph,
}

impl Layer {
    pub fn new(name: impl Into<String>, pixels: FixedSizeGraph, visible: bool) -> Result<Self> {
        let name = name.into();
        validate_layer_name(&name)?;
        Ok(Self { name, visible, pixels })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn pixels(&self) -> &FixedSizeGraph {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut FixedSizeGraph {
        &mut self.pixels
    }
}

/// Layer names are non-empty and contain no whitespace, since they appear
/// as single tokens in scripts and in saved file names.
pub fn validate_layer_name(name: &str) -> Result<()> {
    ensure!(!name.is_empty(), "layer name must not be empty");
    ensure!(
        !name.chars().any(char::is_whitespace),
        "layer name '{}' must not contain whitespace",
        name.escape_debug()
    );
    ensure!(
        !name.contains(['/', '\\']),
        "layer name '{}' must not contain path separators",
        name
    );
    Ok(())
}

// ============================================================================
// LAYERED IMAGE
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayeredImage {
    width: usize,
    height: usize,
    layers: Vec<Layer>,
}

impl LayeredImage {
    /// A layered image with no layers yet.
    pub fn new(width: usize, height: usize) -> Result<Self> {
        check_dimensions(width, height)?;
        Ok(Self {
            width,
            height,
            layers: Vec::new(),
        })
    }

    /// Assemble an image from an ordered (topmost first) layer list,
    /// checking sizes and name uniqueness.
    pub fn from_layers(width: usize, height: usize, layers: Vec<Layer>) -> Result<Self> {
        let mut image = Self::new(width, height)?;
        for layer in layers {
            image.check_fresh_name(layer.name())?;
            image.check_size(&layer.pixels)?;
            image.layers.push(layer);
        }
        Ok(image)
    }

    /// Load a stack saved by [`LayeredImage::save_as_layered_image`].
    pub fn load(dir: &Path) -> Result<Self> {
        persist::load_layered(dir)
    }

    // ---- queries ------------------------------------------------------------

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    /// Names from front to back.
    pub fn layer_names(&self) -> Vec<String> {
        self.layers.iter().map(|l| l.name.clone()).collect()
    }

    pub fn layer_index(&self, name: &str) -> Option<usize> {
        self.layers.iter().position(|l| l.name == name)
    }

    fn require_index(&self, name: &str) -> Result<usize> {
        self.layer_index(name)
            .ok_or_else(|| Error::invalid(format!("layer '{}' does not exist", name)))
    }

    pub fn layer(&self, name: &str) -> Result<&Layer> {
        let idx = self.require_index(name)?;
        Ok(&self.layers[idx])
    }

    pub fn layer_mut(&mut self, name: &str) -> Result<&mut Layer> {
        let idx = self.require_index(name)?;
        Ok(&mut self.layers[idx])
    }

    pub fn layer_at(&self, index: usize) -> Result<&Layer> {
        self.layers.get(index).ok_or_else(|| {
            Error::invalid(format!(
                "layer index {} is outside 0..{}",
                index,
                self.layers.len()
            ))
        })
    }

    pub fn visibility(&self, name: &str) -> Result<bool> {
        Ok(self.layer(name)?.visible)
    }

    pub fn visibility_at(&self, index: usize) -> Result<bool> {
        Ok(self.layer_at(index)?.visible)
    }

    /// Front-to-back, one-shot iteration over the layers.
    pub fn layers(&self) -> std::slice::Iter<'_, Layer> {
        self.layers.iter()
    }

    // ---- validation helpers -------------------------------------------------

    fn check_fresh_name(&self, name: &str) -> Result<()> {
        validate_layer_name(name)?;
        ensure!(
            self.layer_index(name).is_none(),
            "layer '{}' already exists",
            name
        );
        Ok(())
    }

    fn check_size(&self, graph: &PixelGraph) -> Result<()> {
        ensure!(
            graph.width() == self.width && graph.height() == self.height,
            "image is {}x{} but the layered image is {}x{}",
            graph.width(),
            graph.height(),
            self.width,
            self.height
        );
        Ok(())
    }

    // ---- stack edits --------------------------------------------------------

    /// Add a fully transparent layer at the front.
    pub fn add_layer(&mut self, name: &str) -> Result<()> {
        self.check_fresh_name(name)?;
        let pixels = FixedSizeGraph::transparent(self.width, self.height)?;
        self.layers.insert(0, Layer::new(name, pixels, true)?);
        Ok(())
    }

    /// Add an independent copy of `source` named `name` at the front. The
    /// copy inherits the source's visibility.
    pub fn copy_layer(&mut self, name: &str, source: &str) -> Result<()> {
        self.check_fresh_name(name)?;
        let src = self.layer(source)?;
        let copy = Layer::new(name, src.pixels.clone(), src.visible)?;
        self.layers.insert(0, copy);
        Ok(())
    }

    /// Add `graph` as a new visible layer at the front. Its size must match.
    pub fn add_graph_as_layer(&mut self, name: &str, graph: PixelGraph) -> Result<()> {
        self.check_fresh_name(name)?;
        self.check_size(&graph)?;
        self.layers
            .insert(0, Layer::new(name, FixedSizeGraph::new(graph), true)?);
        Ok(())
    }

    /// Decode `path` and add it as a new layer at the front.
    pub fn load_image_as_layer(&mut self, name: &str, path: &Path) -> Result<()> {
        self.check_fresh_name(name)?;
        let graph = PixelGraph::read_from_file(path)?;
        self.add_graph_as_layer(name, graph)
    }

    /// Move `name` so that it ends up at `to_index`.
    pub fn move_layer(&mut self, name: &str, to_index: usize) -> Result<()> {
        let from = self.require_index(name)?;
        ensure!(
            to_index < self.layers.len(),
            "layer index {} is outside 0..{}",
            to_index,
            self.layers.len()
        );
        let layer = self.layers.remove(from);
        self.layers.insert(to_index, layer);
        Ok(())
    }

    pub fn remove_layer(&mut self, name: &str) -> Result<()> {
        let idx = self.require_index(name)?;
        self.layers.remove(idx);
        Ok(())
    }

    pub fn set_visibility(&mut self, name: &str, visible: bool) -> Result<()> {
        self.layer_mut(name)?.visible = visible;
        Ok(())
    }

    // ---- output -------------------------------------------------------------

    /// Flatten the stack into one graph.
    pub fn flatten(&self, strategy: &dyn BlendStrategy) -> Result<PixelGraph> {
        strategy.blend(self)
    }

    /// Flatten with `strategy`, then encode as a single raster.
    pub fn save_as_image(
        &self,
        strategy: &dyn BlendStrategy,
        format: ImageFormat,
        path: &Path,
        jpeg_quality: u8,
    ) -> Result<()> {
        codec::check_parent_dir(path)?;
        let flat = self.flatten(strategy)?;
        codec::encode(&flat, format, path, jpeg_quality)
    }

    /// Persist the whole stack (names, order, visibility, pixels).
    pub fn save_as_layered_image(&self, dir: &Path) -> Result<()> {
        persist::save_layered(self, dir)
    }
}

impl<'a> IntoIterator for &'a LayeredImage {
    type Item = &'a Layer;
    type IntoIter = std::slice::Iter<'a, Layer>;

    fn into_iter(self) -> Self::IntoIter {
        self.layers()
    }
}
