// ============================================================================
// SCRIPT COMMANDS — validated command values, stores and cursor state
// ============================================================================
//
// A `Command` is built (and shape-checked) by the dispatch table, then run in
// two steps: `execute` against the `Workspace`, and `alter_language_state`
// against the `Cursor`. `execute` checks everything it depends on before it
// touches a store, so a failed command leaves the workspace unchanged.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::blend::NormalBlend;
use crate::codec::{self, DEFAULT_JPEG_QUALITY, ImageFormat};
use crate::error::{Error, Result, ensure};
use crate::graph::PixelGraph;
use crate::layered::{FixedSizeGraph, LayeredImage, validate_layer_name};
use crate::mutator::{Mutator, MutatorKind};
use crate::node::Pixel;
use crate::persist::{self, DEFAULT_MAX_DIMENSION};

// ============================================================================
// WORKSPACE
// ============================================================================

/// Knobs that affect how commands read and write files.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkspaceOptions {
    /// Quality for JPEG output, 1–100.
    pub jpeg_quality: u8,
    /// Longest accepted side for created, decoded or imported images.
    pub max_dimension: usize,
}

impl Default for WorkspaceOptions {
    fn default() -> Self {
        Self {
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            max_dimension: DEFAULT_MAX_DIMENSION,
        }
    }
}

/// The two named stores every command runs against.
#[derive(Debug, Default)]
pub struct Workspace {
    graphs: HashMap<String, PixelGraph>,
    layered: HashMap<String, LayeredImage>,
    options: WorkspaceOptions,
}

impl Workspace {
    pub fn new(options: WorkspaceOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn options(&self) -> WorkspaceOptions {
        self.options
    }

    pub fn graphs(&self) -> &HashMap<String, PixelGraph> {
        &self.graphs
    }

    pub fn layered_images(&self) -> &HashMap<String, LayeredImage> {
        &self.layered
    }

    pub fn graph(&self, name: &str) -> Result<&PixelGraph> {
        self.graphs
            .get(name)
            .ok_or_else(|| Error::invalid(format!("image '{}' does not exist", name)))
    }

    pub fn graph_mut(&mut self, name: &str) -> Result<&mut PixelGraph> {
        self.graphs
            .get_mut(name)
            .ok_or_else(|| Error::invalid(format!("image '{}' does not exist", name)))
    }

    pub fn layered(&self, name: &str) -> Result<&LayeredImage> {
        self.layered
            .get(name)
            .ok_or_else(|| Error::invalid(format!("layered image '{}' does not exist", name)))
    }

    pub fn layered_mut(&mut self, name: &str) -> Result<&mut LayeredImage> {
        self.layered
            .get_mut(name)
            .ok_or_else(|| Error::invalid(format!("layered image '{}' does not exist", name)))
    }

    /// Store `graph` under a name that is not yet taken.
    pub fn insert_graph(&mut self, name: &str, graph: PixelGraph) -> Result<()> {
        self.check_fresh_graph(name)?;
        self.check_bounds(graph.width(), graph.height())?;
        self.graphs.insert(name.to_string(), graph);
        Ok(())
    }

    /// Store `image` under a name that is not yet taken.
    pub fn insert_layered(&mut self, name: &str, image: LayeredImage) -> Result<()> {
        self.check_fresh_layered(name)?;
        self.check_bounds(image.width(), image.height())?;
        self.layered.insert(name.to_string(), image);
        Ok(())
    }

    fn check_fresh_graph(&self, name: &str) -> Result<()> {
        ensure!(
            !self.graphs.contains_key(name),
            "image '{}' already exists",
            name
        );
        Ok(())
    }

    fn check_fresh_layered(&self, name: &str) -> Result<()> {
        ensure!(
            !self.layered.contains_key(name),
            "layered image '{}' already exists",
            name
        );
        Ok(())
    }

    fn check_bounds(&self, width: usize, height: usize) -> Result<()> {
        let max = self.options.max_dimension;
        ensure!(
            width <= max && height <= max,
            "image size {}x{} exceeds the {} pixel limit per side",
            width,
            height,
            max
        );
        Ok(())
    }

    fn target(&self, target: &Target) -> Result<&PixelGraph> {
        match target {
            Target::Graph(name) => self.graph(name),
            Target::Layer { image, layer } => {
                Ok(self.layered(image)?.layer(layer)?.pixels().as_graph())
            }
        }
    }

    fn target_mut(&mut self, target: &Target) -> Result<TargetMut<'_>> {
        match target {
            Target::Graph(name) => Ok(TargetMut::Graph(self.graph_mut(name)?)),
            Target::Layer { image, layer } => Ok(TargetMut::Layer(
                self.layered_mut(image)?.layer_mut(layer)?.pixels_mut(),
            )),
        }
    }
}

/// Mutable view of whatever a [`Target`] names.
enum TargetMut<'a> {
    Graph(&'a mut PixelGraph),
    Layer(&'a mut FixedSizeGraph),
}

impl TargetMut<'_> {
    fn set_pixel(&mut self, x: usize, y: usize, pixel: Pixel) -> Result<()> {
        match self {
            TargetMut::Graph(g) => g.set_pixel(x, y, pixel),
            TargetMut::Layer(g) => g.set_pixel(x, y, pixel),
        }
    }

    fn apply_mutator(&mut self, mutator: &dyn Mutator) -> Result<()> {
        match self {
            TargetMut::Graph(g) => g.apply_mutator(mutator),
            TargetMut::Layer(g) => g.apply_mutator(mutator),
        }
    }
}

// ============================================================================
// CURSOR
// ============================================================================

/// The interpreter's current-image / current-layer state, used when a script
/// line leaves out an image or layer name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Cursor {
    image: Option<String>,
    layer: Option<String>,
}

impl Cursor {
    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }

    pub fn layer(&self) -> Option<&str> {
        self.layer.as_deref()
    }

    pub fn require_image(&self) -> Result<&str> {
        self.image()
            .ok_or_else(|| Error::invalid("no image name given and no current image is set"))
    }

    pub fn require_layer(&self) -> Result<&str> {
        self.layer()
            .ok_or_else(|| Error::invalid("no layer name given and no current layer is set"))
    }

    pub fn set(&mut self, image: Option<String>, layer: Option<String>) {
        self.image = image;
        self.layer = layer;
    }
}

// ============================================================================
// COMMAND VALUES
// ============================================================================

/// What an `update-color`, `apply-mutator` or `save` line acts on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Target {
    /// A single image from the graph store.
    Graph(String),
    /// One layer of a layered image.
    Layer { image: String, layer: String },
}

impl Target {
    fn validate(&self) -> Result<()> {
        match self {
            Target::Graph(name) => validate_image_name(name),
            Target::Layer { image, layer } => {
                validate_image_name(image)?;
                validate_layer_name(layer)
            }
        }
    }
}

/// Source for `create-image`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImageSource {
    Checkerboard {
        tile_size: usize,
        tile_count: usize,
        first: Pixel,
        second: Pixel,
    },
    Empty,
    Transparent { width: usize, height: usize },
    Copy { source: String },
    File { path: PathBuf },
}

/// Source for `create-layered-image`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LayeredSource {
    Blank { width: usize, height: usize },
    Import { dir: PathBuf },
}

/// One parsed script line. Build these through the constructor functions,
/// which reject malformed names and values up front.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    CreateImage { name: String, source: ImageSource },
    CreateLayeredImage { name: String, source: LayeredSource },
    UpdateColor { target: Target, x: usize, y: usize, color: Pixel },
    ApplyMutator { target: Target, mutator: MutatorKind },
    Save { target: Target, format: ImageFormat, path: PathBuf },
    SaveLayered { image: String, dir: PathBuf },
    SaveAsImage { image: String, format: ImageFormat, path: PathBuf },
    Load { image: String },
    SetCurrentLayer { image: String, layer: String },
    AddLayer { image: String, layer: String },
    CopyLayer { image: String, layer: String, source: String },
    AddImageAsLayer { image: String, layer: String, path: PathBuf },
    MoveLayer { image: String, layer: String, index: usize },
    RemoveLayer { image: String, layer: String },
    UpdateVisibility { image: String, layer: String, visible: bool },
}

/// Image names follow the same token rules as layer names.
pub fn validate_image_name(name: &str) -> Result<()> {
    ensure!(!name.is_empty(), "image name must not be empty");
    ensure!(
        !name.chars().any(char::is_whitespace),
        "image name '{}' must not contain whitespace",
        name.escape_debug()
    );
    Ok(())
}

fn validate_path(path: &Path) -> Result<()> {
    ensure!(!path.as_os_str().is_empty(), "path must not be empty");
    Ok(())
}

/// One colour channel or opacity given as a script integer.
pub fn channel(value: i64, what: &str) -> Result<u8> {
    u8::try_from(value)
        .map_err(|_| Error::invalid(format!("{} {} is outside [0, 255]", what, value)))
}

fn rgb(values: [i64; 3]) -> Result<Pixel> {
    Ok(Pixel::opaque(
        channel(values[0], "red")?,
        channel(values[1], "green")?,
        channel(values[2], "blue")?,
    ))
}

impl Command {
    // ---- constructors ---------------------------------------------------------

    pub fn checkerboard(
        name: &str,
        tile_size: usize,
        tile_count: usize,
        first: [i64; 3],
        second: [i64; 3],
    ) -> Result<Self> {
        Self::create_image(
            name,
            ImageSource::Checkerboard {
                tile_size,
                tile_count,
                first: rgb(first)?,
                second: rgb(second)?,
            },
        )
    }

    pub fn create_image(name: &str, source: ImageSource) -> Result<Self> {
        let cmd = Command::CreateImage {
            name: name.to_string(),
            source,
        };
        cmd.validate()?;
        Ok(cmd)
    }

    pub fn create_layered_image(name: &str, source: LayeredSource) -> Result<Self> {
        let cmd = Command::CreateLayeredImage {
            name: name.to_string(),
            source,
        };
        cmd.validate()?;
        Ok(cmd)
    }

    pub fn update_color(target: Target, x: usize, y: usize, rgba: [i64; 4]) -> Result<Self> {
        let color = Pixel::new(
            channel(rgba[0], "red")?,
            channel(rgba[1], "green")?,
            channel(rgba[2], "blue")?,
            channel(rgba[3], "opacity")?,
        );
        let cmd = Command::UpdateColor { target, x, y, color };
        cmd.validate()?;
        Ok(cmd)
    }

    pub fn apply_mutator(target: Target, mutator: MutatorKind) -> Result<Self> {
        let cmd = Command::ApplyMutator { target, mutator };
        cmd.validate()?;
        Ok(cmd)
    }

    pub fn save(target: Target, format: ImageFormat, path: impl Into<PathBuf>) -> Result<Self> {
        let cmd = Command::Save {
            target,
            format,
            path: path.into(),
        };
        cmd.validate()?;
        Ok(cmd)
    }

    pub fn save_layered(image: &str, dir: impl Into<PathBuf>) -> Result<Self> {
        let cmd = Command::SaveLayered {
            image: image.to_string(),
            dir: dir.into(),
        };
        cmd.validate()?;
        Ok(cmd)
    }

    pub fn save_as_image(
        image: &str,
        format: ImageFormat,
        path: impl Into<PathBuf>,
    ) -> Result<Self> {
        let cmd = Command::SaveAsImage {
            image: image.to_string(),
            format,
            path: path.into(),
        };
        cmd.validate()?;
        Ok(cmd)
    }

    pub fn load(image: &str) -> Result<Self> {
        let cmd = Command::Load {
            image: image.to_string(),
        };
        cmd.validate()?;
        Ok(cmd)
    }

    pub fn set_current_layer(image: &str, layer: &str) -> Result<Self> {
        let cmd = Command::SetCurrentLayer {
            image: image.to_string(),
            layer: layer.to_string(),
        };
        cmd.validate()?;
        Ok(cmd)
    }

    pub fn add_layer(image: &str, layer: &str) -> Result<Self> {
        let cmd = Command::AddLayer {
            image: image.to_string(),
            layer: layer.to_string(),
        };
        cmd.validate()?;
        Ok(cmd)
    }

    pub fn copy_layer(image: &str, layer: &str, source: &str) -> Result<Self> {
        let cmd = Command::CopyLayer {
            image: image.to_string(),
            layer: layer.to_string(),
            source: source.to_string(),
        };
        cmd.validate()?;
        Ok(cmd)
    }

    pub fn add_image_as_layer(image: &str, layer: &str, path: impl Into<PathBuf>) -> Result<Self> {
        let cmd = Command::AddImageAsLayer {
            image: image.to_string(),
            layer: layer.to_string(),
            path: path.into(),
        };
        cmd.validate()?;
        Ok(cmd)
    }

    pub fn move_layer(image: &str, layer: &str, index: usize) -> Result<Self> {
        let cmd = Command::MoveLayer {
            image: image.to_string(),
            layer: layer.to_string(),
            index,
        };
        cmd.validate()?;
        Ok(cmd)
    }

    pub fn remove_layer(image: &str, layer: &str) -> Result<Self> {
        let cmd = Command::RemoveLayer {
            image: image.to_string(),
            layer: layer.to_string(),
        };
        cmd.validate()?;
        Ok(cmd)
    }

    pub fn update_visibility(image: &str, layer: &str, visible: bool) -> Result<Self> {
        let cmd = Command::UpdateVisibility {
            image: image.to_string(),
            layer: layer.to_string(),
            visible,
        };
        cmd.validate()?;
        Ok(cmd)
    }

    // ---- shape checks ---------------------------------------------------------

    /// Store-independent checks: names, paths and value ranges.
    pub fn validate(&self) -> Result<()> {
        match self {
            Command::CreateImage { name, source } => {
                validate_image_name(name)?;
                match source {
                    ImageSource::Checkerboard {
                        tile_size,
                        tile_count,
                        ..
                    } => {
                        ensure!(*tile_size > 0, "tile size must be positive");
                        let side = tile_count.isqrt();
                        ensure!(
                            *tile_count > 0 && side * side == *tile_count,
                            "tile count {} is not a positive perfect square",
                            tile_count
                        );
                    }
                    ImageSource::Empty => {}
                    ImageSource::Transparent { width, height } => {
                        ensure!(
                            *width > 0 && *height > 0,
                            "image dimensions must be positive, got {}x{}",
                            width,
                            height
                        );
                    }
                    ImageSource::Copy { source } => validate_image_name(source)?,
                    ImageSource::File { path } => validate_path(path)?,
                }
            }
            Command::CreateLayeredImage { name, source } => {
                validate_image_name(name)?;
                match source {
                    LayeredSource::Blank { width, height } => {
                        ensure!(
                            *width > 0 && *height > 0,
                            "layered image dimensions must be positive, got {}x{}",
                            width,
                            height
                        );
                    }
                    LayeredSource::Import { dir } => validate_path(dir)?,
                }
            }
            Command::UpdateColor { target, .. } | Command::ApplyMutator { target, .. } => {
                target.validate()?
            }
            Command::Save { target, path, .. } => {
                target.validate()?;
                validate_path(path)?;
            }
            Command::SaveLayered { image, dir: path }
            | Command::SaveAsImage { image, path, .. } => {
                validate_image_name(image)?;
                validate_path(path)?;
            }
            Command::Load { image } => validate_image_name(image)?,
            Command::SetCurrentLayer { image, layer }
            | Command::AddLayer { image, layer }
            | Command::MoveLayer { image, layer, .. }
            | Command::RemoveLayer { image, layer }
            | Command::UpdateVisibility { image, layer, .. } => {
                validate_image_name(image)?;
                validate_layer_name(layer)?;
            }
            Command::CopyLayer {
                image,
                layer,
                source,
            } => {
                validate_image_name(image)?;
                validate_layer_name(layer)?;
                validate_layer_name(source)?;
            }
            Command::AddImageAsLayer { image, layer, path } => {
                validate_image_name(image)?;
                validate_layer_name(layer)?;
                validate_path(path)?;
            }
        }
        Ok(())
    }

    /// The script keyword this command was parsed from.
    pub fn keyword(&self) -> &'static str {
        match self {
            Command::CreateImage { .. } => "create-image",
            Command::CreateLayeredImage { .. } => "create-layered-image",
            Command::UpdateColor { .. } => "update-color",
            Command::ApplyMutator { .. } => "apply-mutator",
            Command::Save { .. } => "save",
            Command::SaveLayered { .. } => "save-layered",
            Command::SaveAsImage { .. } => "save-as-image",
            Command::Load { .. } => "load",
            Command::SetCurrentLayer { .. } => "set-current-layer",
            Command::AddLayer { .. } => "add-layer",
            Command::CopyLayer { .. } => "copy-layer",
            Command::AddImageAsLayer { .. } => "add-image-as-layer",
            Command::MoveLayer { .. } => "move-layer",
            Command::RemoveLayer { .. } => "remove-layer",
            Command::UpdateVisibility { .. } => "update-visibility",
        }
    }

    // ---- execution ------------------------------------------------------------

    /// Run the command against the stores.
    pub fn execute(&self, ws: &mut Workspace) -> Result<()> {
        self.validate()?;
        match self {
            Command::CreateImage { name, source } => {
                ws.check_fresh_graph(name)?;
                let graph = match source {
                    ImageSource::Checkerboard {
                        tile_size,
                        tile_count,
                        first,
                        second,
                    } => {
                        let side = tile_count.isqrt().saturating_mul(*tile_size);
                        ws.check_bounds(side, side)?;
                        PixelGraph::checkerboard(*tile_size, *tile_count, *first, *second)?
                    }
                    ImageSource::Empty => PixelGraph::create_empty(),
                    ImageSource::Transparent { width, height } => {
                        ws.check_bounds(*width, *height)?;
                        PixelGraph::transparent(*width, *height)?
                    }
                    ImageSource::Copy { source } => ws.graph(source)?.deep_copy(),
                    ImageSource::File { path } => PixelGraph::read_from_file(path)?,
                };
                ws.insert_graph(name, graph)
            }

            Command::CreateLayeredImage { name, source } => {
                ws.check_fresh_layered(name)?;
                let image = match source {
                    LayeredSource::Blank { width, height } => {
                        ws.check_bounds(*width, *height)?;
                        LayeredImage::new(*width, *height)?
                    }
                    LayeredSource::Import { dir } => {
                        persist::load_layered_bounded(dir, ws.options.max_dimension)?
                    }
                };
                ws.insert_layered(name, image)
            }

            Command::UpdateColor { target, x, y, color } => {
                ws.target_mut(target)?.set_pixel(*x, *y, *color)
            }

            Command::ApplyMutator { target, mutator } => {
                let mutator = mutator.mutator();
                ws.target_mut(target)?.apply_mutator(mutator.as_ref())
            }

            Command::Save {
                target,
                format,
                path,
            } => {
                let graph = ws.target(target)?;
                codec::encode(graph, *format, path, ws.options.jpeg_quality)
            }

            Command::SaveLayered { image, dir } => ws.layered(image)?.save_as_layered_image(dir),

            Command::SaveAsImage {
                image,
                format,
                path,
            } => ws.layered(image)?.save_as_image(
                &NormalBlend,
                *format,
                path,
                ws.options.jpeg_quality,
            ),

            Command::Load { image } => ws.layered(image).map(|_| ()),

            Command::SetCurrentLayer { image, layer } => {
                ws.layered(image)?.layer(layer).map(|_| ())
            }

            Command::AddLayer { image, layer } => ws.layered_mut(image)?.add_layer(layer),

            Command::CopyLayer {
                image,
                layer,
                source,
            } => ws.layered_mut(image)?.copy_layer(layer, source),

            Command::AddImageAsLayer { image, layer, path } => {
                ws.layered_mut(image)?.load_image_as_layer(layer, path)
            }

            Command::MoveLayer {
                image,
                layer,
                index,
            } => ws.layered_mut(image)?.move_layer(layer, *index),

            Command::RemoveLayer { image, layer } => ws.layered_mut(image)?.remove_layer(layer),

            Command::UpdateVisibility {
                image,
                layer,
                visible,
            } => ws.layered_mut(image)?.set_visibility(layer, *visible),
        }
    }

    /// Update the cursors after a successful `execute`. Only `load` and
    /// `set-current-layer` change anything.
    pub fn alter_language_state(&self, cursor: &mut Cursor, ws: &Workspace) -> Result<()> {
        match self {
            Command::Load { image } => {
                let top = ws
                    .layered(image)?
                    .layers()
                    .next()
                    .map(|l| l.name().to_string());
                cursor.set(Some(image.clone()), top);
            }
            Command::SetCurrentLayer { image, layer } => {
                ws.layered(image)?.layer(layer)?;
                cursor.set(Some(image.clone()), Some(layer.clone()));
            }
            _ => {}
        }
        Ok(())
    }
}
