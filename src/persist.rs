// ============================================================================
// LAYERED IMAGE PERSISTENCE — manifest + one PNG per layer
// ============================================================================
//
// Directory layout:
//
//   <dir>/manifest.pgl     bincode-encoded `Manifest` (magic "PGL1")
//   <dir>/0-<name>.png     topmost layer
//   <dir>/1-<name>.png     ...
//
// PNG keeps opacity, so a save/load round trip is lossless.

use std::ffi::OsStr;
use std::fs::{self, File};
use std::collections::HashSet;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::codec::{self, DEFAULT_JPEG_QUALITY, ImageFormat};
use crate::error::{Error, Result, ensure};
use crate::graph::PixelGraph;
use crate::layered::{FixedSizeGraph, Layer, LayeredImage, validate_layer_name};

/// Magic header stored as the manifest's first field.
const MANIFEST_MAGIC: &str = "PGL1";
pub const MANIFEST_FILE: &str = "manifest.pgl";

/// Maximum supported width/height (per axis) unless a setting narrows it.
pub const DEFAULT_MAX_DIMENSION: usize = 32_768;
/// Maximum number of layers in a saved stack.
pub const MAX_LAYERS: usize = 256;

#[derive(Serialize, Deserialize, Debug)]
struct Manifest {
    magic: String,
    width: u32,
    height: u32,
    layers: Vec<LayerEntry>,
}

#[derive(Serialize, Deserialize, Debug)]
struct LayerEntry {
    name: String,
    visible: bool,
    file: String,
}

/// File name for the layer at `index`.
pub fn layer_file_name(index: usize, name: &str) -> String {
    format!("{}-{}.png", index, name)
}

// ============================================================================
// SAVE
// ============================================================================

/// Write `image` into `dir`, creating the directory if needed.
pub fn save_layered(image: &LayeredImage, dir: &Path) -> Result<()> {
    ensure!(
        image.num_layers() <= MAX_LAYERS,
        "cannot save {} layers, the maximum is {}",
        image.num_layers(),
        MAX_LAYERS
    );
    if dir.exists() {
        ensure!(dir.is_dir(), "'{}' is not a directory", dir.display());
    } else {
        codec::check_parent_dir(dir)?;
        fs::create_dir(dir)?;
    }

    // Only files listed by an earlier manifest belong to us; anything else in
    // the directory is left alone and never overwritten.
    let manifest_path = dir.join(MANIFEST_FILE);
    let previous: HashSet<String> = if manifest_path.exists() {
        read_manifest(&manifest_path)?
            .layers
            .into_iter()
            .map(|entry| entry.file)
            .filter(|file| Path::new(file).file_name() == Some(OsStr::new(file)))
            .collect()
    } else {
        HashSet::new()
    };

    let files: Vec<String> = image
        .layers()
        .enumerate()
        .map(|(index, layer)| layer_file_name(index, layer.name()))
        .collect();
    for file in &files {
        ensure!(
            previous.contains(file) || !dir.join(file).exists(),
            "'{}' already exists and was not written by an earlier save",
            dir.join(file).display()
        );
    }

    let mut layers = Vec::with_capacity(image.num_layers());
    for (layer, file) in image.layers().zip(files) {
        codec::encode(
            layer.pixels(),
            ImageFormat::Png,
            &dir.join(&file),
            DEFAULT_JPEG_QUALITY,
        )?;
        layers.push(LayerEntry {
            name: layer.name().to_string(),
            visible: layer.is_visible(),
            file,
        });
    }

    let manifest = Manifest {
        magic: MANIFEST_MAGIC.to_string(),
        width: to_u32(image.width())?,
        height: to_u32(image.height())?,
        layers,
    };
    let mut writer = BufWriter::new(File::create(&manifest_path)?);
    bincode::serialize_into(&mut writer, &manifest)?;
    writer.flush()?;

    // Drop layer files from an earlier, possibly larger, save.
    for stale in previous
        .iter()
        .filter(|file| !manifest.layers.iter().any(|entry| &entry.file == *file))
    {
        match fs::remove_file(dir.join(stale)) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }

    log::info!(
        "saved layered image {}x{} ({} layers) to {}",
        image.width(),
        image.height(),
        image.num_layers(),
        dir.display()
    );
    Ok(())
}

/// Decode a manifest, rejecting files that do not carry the magic.
fn read_manifest(path: &Path) -> Result<Manifest> {
    // bincode writes a String as an 8-byte length prefix followed by the
    // bytes, so the 4-byte magic sits at 8..12.
    let raw = fs::read(path)?;
    ensure!(
        raw.len() >= 12 && &raw[8..12] == MANIFEST_MAGIC.as_bytes(),
        "'{}' is not a layered image manifest",
        path.display()
    );
    Ok(bincode::deserialize(&raw)?)
}

fn to_u32(v: usize) -> Result<u32> {
    u32::try_from(v).map_err(|_| Error::invalid(format!("dimension {} is too large to save", v)))
}

// ============================================================================
// LOAD
// ============================================================================

/// Load a stack written by [`save_layered`], bounded by
/// [`DEFAULT_MAX_DIMENSION`].
pub fn load_layered(dir: &Path) -> Result<LayeredImage> {
    load_layered_bounded(dir, DEFAULT_MAX_DIMENSION)
}

/// Load a stack written by [`save_layered`], rejecting any side longer than
/// `max_dimension`.
pub fn load_layered_bounded(dir: &Path, max_dimension: usize) -> Result<LayeredImage> {
    ensure!(dir.is_dir(), "directory '{}' does not exist", dir.display());
    let manifest_path = dir.join(MANIFEST_FILE);
    ensure!(
        manifest_path.is_file(),
        "'{}' has no {}",
        dir.display(),
        MANIFEST_FILE
    );

    let manifest = read_manifest(&manifest_path)?;

    let (width, height) = (manifest.width as usize, manifest.height as usize);
    ensure!(
        (1..=max_dimension).contains(&width) && (1..=max_dimension).contains(&height),
        "layered image size {}x{} is outside 1..={} per side",
        width,
        height,
        max_dimension
    );
    ensure!(
        manifest.layers.len() <= MAX_LAYERS,
        "manifest lists {} layers, which exceeds the maximum of {}",
        manifest.layers.len(),
        MAX_LAYERS
    );

    let mut layers = Vec::with_capacity(manifest.layers.len());
    for entry in manifest.layers {
        validate_layer_name(&entry.name)?;
        // Layer files must live directly inside `dir`.
        ensure!(
            Path::new(&entry.file).file_name() == Some(OsStr::new(&entry.file)),
            "layer file '{}' is not a plain file name",
            entry.file
        );
        let graph = PixelGraph::read_from_file(&dir.join(&entry.file))?;
        ensure!(
            graph.width() == width && graph.height() == height,
            "layer '{}' is {}x{}, expected {}x{}",
            entry.name,
            graph.width(),
            graph.height(),
            width,
            height
        );
        layers.push(Layer::new(entry.name, FixedSizeGraph::new(graph), entry.visible)?);
    }

    let image = LayeredImage::from_layers(width, height, layers)?;
    log::info!(
        "loaded layered image {}x{} ({} layers) from {}",
        width,
        height,
        image.num_layers(),
        dir.display()
    );
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Pixel;
    use tempfile::TempDir;

    fn sample() -> LayeredImage {
        let mut img = LayeredImage::new(3, 2).unwrap();
        img.add_layer("back").unwrap();
        img.add_layer("front").unwrap();
        img.layer_mut("front")
            .unwrap()
            .pixels_mut()
            .set_pixel(2, 1, Pixel::new(10, 20, 30, 40))
            .unwrap();
        img.set_visibility("back", false).unwrap();
        img
    }

    #[test]
    fn save_then_load_restores_everything() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("stack");
        let img = sample();
        save_layered(&img, &dir).unwrap();
        assert!(dir.join(MANIFEST_FILE).is_file());
        assert!(dir.join("0-front.png").is_file());
        assert!(dir.join("1-back.png").is_file());

        let loaded = load_layered(&dir).unwrap();
        assert_eq!(loaded, img);
        assert_eq!(loaded.layer_names(), vec!["front", "back"]);
        assert!(!loaded.visibility("back").unwrap());
    }

    #[test]
    fn resaving_fewer_layers_drops_stale_files() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("stack");
        let mut img = sample();
        save_layered(&img, &dir).unwrap();
        fs::write(dir.join("notes.png"), b"not ours").unwrap();

        img.remove_layer("back").unwrap();
        save_layered(&img, &dir).unwrap();
        assert!(!dir.join("1-back.png").exists());
        assert!(dir.join("notes.png").exists());
        assert_eq!(load_layered(&dir).unwrap().num_layers(), 1);
    }

    #[test]
    fn files_not_listed_in_the_manifest_are_never_touched() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("photos");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("2024-holiday.png"), b"family photo").unwrap();

        let mut img = sample();
        save_layered(&img, &dir).unwrap();
        img.remove_layer("back").unwrap();
        save_layered(&img, &dir).unwrap();
        assert_eq!(fs::read(dir.join("2024-holiday.png")).unwrap(), b"family photo");
        assert!(!dir.join("1-back.png").exists());

        // A name clash with a file an earlier save did not write is refused
        // before anything on disk changes.
        fs::write(dir.join("1-back.png"), b"mine").unwrap();
        img.add_layer("back").unwrap();
        img.move_layer("back", 1).unwrap();
        assert!(save_layered(&img, &dir).unwrap_err().is_invalid_argument());
        assert_eq!(fs::read(dir.join("1-back.png")).unwrap(), b"mine");
        assert_eq!(load_layered(&dir).unwrap().num_layers(), 1);
    }

    #[test]
    fn save_refuses_to_replace_a_foreign_manifest() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(MANIFEST_FILE), b"someone else's file").unwrap();
        assert!(save_layered(&sample(), tmp.path()).unwrap_err().is_invalid_argument());
        assert_eq!(
            fs::read(tmp.path().join(MANIFEST_FILE)).unwrap(),
            b"someone else's file"
        );
    }

    #[test]
    fn save_requires_an_existing_parent() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("missing").join("stack");
        assert!(save_layered(&sample(), &dir).unwrap_err().is_invalid_argument());
    }

    #[test]
    fn load_rejects_missing_or_foreign_manifests() {
        let tmp = TempDir::new().unwrap();
        assert!(load_layered(&tmp.path().join("nope")).unwrap_err().is_invalid_argument());
        assert!(load_layered(tmp.path()).unwrap_err().is_invalid_argument());

        fs::write(tmp.path().join(MANIFEST_FILE), b"garbage garbage garbage").unwrap();
        assert!(load_layered(tmp.path()).unwrap_err().is_invalid_argument());
    }

    #[test]
    fn load_enforces_dimension_bound_and_layer_sizes() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("stack");
        save_layered(&sample(), &dir).unwrap();
        assert!(load_layered_bounded(&dir, 2).unwrap_err().is_invalid_argument());

        // Swap one layer for an image of the wrong size.
        PixelGraph::create_empty()
            .write_to_file(ImageFormat::Png, &dir.join("0-front.png"))
            .unwrap();
        assert!(load_layered(&dir).unwrap_err().is_invalid_argument());
    }
}
