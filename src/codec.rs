// ============================================================================
// RASTER CODEC — PPM (plain text), PNG and JPEG via the `image` crate
// ============================================================================

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::pnm::{PnmEncoder, PnmSubtype, SampleEncoding};
use image::{ColorType, ImageEncoder};

use crate::error::{Error, Result, ensure};
use crate::graph::PixelGraph;
use crate::node::Pixel;

/// JPEG quality used when no setting overrides it.
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// The three supported containers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    /// Plain-text `P3` pixmap: RGB triples, no alpha.
    Ppm,
    /// RGBA, lossless.
    Png,
    /// RGB, lossy.
    Jpeg,
}

impl ImageFormat {
    pub fn all() -> &'static [ImageFormat] {
        &[ImageFormat::Ppm, ImageFormat::Png, ImageFormat::Jpeg]
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Ppm => "ppm",
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
        }
    }
}

impl FromStr for ImageFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "ppm" => Ok(ImageFormat::Ppm),
            "png" => Ok(ImageFormat::Png),
            "jpeg" | "jpg" => Ok(ImageFormat::Jpeg),
            _ => Err(Error::invalid(format!("unsupported image format '{}'", s))),
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Decoded image: dimensions plus row-major RGBA pixels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Raster {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<Pixel>,
}

// ============================================================================
// DECODING
// ============================================================================

/// Decode any supported file. The container is sniffed from the content, so
/// a misnamed extension still decodes. Opacity is 255 for formats without
/// an alpha channel.
pub fn decode(path: &Path) -> Result<Raster> {
    ensure!(path.is_file(), "image file '{}' does not exist", path.display());

    let img = image::io::Reader::open(path)?
        .with_guessed_format()?
        .decode()?
        .to_rgba8();

    let (w, h) = img.dimensions();
    let pixels = img
        .pixels()
        .map(|p| Pixel::from_rgba(p.0))
        .collect();

    log::info!("decoded {} ({}x{})", path.display(), w, h);
    Ok(Raster {
        width: w as usize,
        height: h as usize,
        pixels,
    })
}

// ============================================================================
// ENCODING
// ============================================================================

/// Fail unless the directory that would hold `path` exists.
pub fn check_parent_dir(path: &Path) -> Result<()> {
    ensure!(
        !path.as_os_str().is_empty(),
        "output path must not be empty"
    );
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        ensure!(
            parent.is_dir(),
            "directory '{}' does not exist",
            parent.display()
        );
    }
    Ok(())
}

fn rgb_bytes(graph: &PixelGraph) -> Vec<u8> {
    graph.pixels().iter().flat_map(|p| p.rgb()).collect()
}

fn rgba_bytes(graph: &PixelGraph) -> Vec<u8> {
    graph.pixels().iter().flat_map(|p| p.to_rgba()).collect()
}

/// Encode `graph` to `path`. `jpeg_quality` is only used for JPEG output.
pub fn encode(
    graph: &PixelGraph,
    format: ImageFormat,
    path: &Path,
    jpeg_quality: u8,
) -> Result<()> {
    check_parent_dir(path)?;
    let w = u32::try_from(graph.width()).map_err(|_| Error::invalid("image too wide to encode"))?;
    let h = u32::try_from(graph.height()).map_err(|_| Error::invalid("image too tall to encode"))?;

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    match format {
        ImageFormat::Ppm => {
            let encoder = PnmEncoder::new(&mut writer)
                .with_subtype(PnmSubtype::Pixmap(SampleEncoding::Ascii));
            encoder.write_image(&rgb_bytes(graph), w, h, ColorType::Rgb8)?;
        }
        ImageFormat::Png => {
            let encoder = PngEncoder::new(&mut writer);
            encoder.write_image(&rgba_bytes(graph), w, h, ColorType::Rgba8)?;
        }
        ImageFormat::Jpeg => {
            let encoder = JpegEncoder::new_with_quality(&mut writer, jpeg_quality.clamp(1, 100));
            encoder.write_image(&rgb_bytes(graph), w, h, ColorType::Rgb8)?;
        }
    }
    writer.flush()?;

    log::info!("wrote {} as {} ({}x{})", path.display(), format, w, h);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_parse_case_insensitively() {
        assert_eq!("PPM".parse::<ImageFormat>().unwrap(), ImageFormat::Ppm);
        assert_eq!("jpg".parse::<ImageFormat>().unwrap(), ImageFormat::Jpeg);
        assert_eq!("Jpeg".parse::<ImageFormat>().unwrap(), ImageFormat::Jpeg);
        assert!("gif".parse::<ImageFormat>().unwrap_err().is_invalid_argument());
        for &f in ImageFormat::all() {
            assert_eq!(f.extension().parse::<ImageFormat>().unwrap(), f);
        }
    }

    #[test]
    fn missing_parent_directory_is_rejected() {
        let g = PixelGraph::create_empty();
        let err = encode(
            &g,
            ImageFormat::Png,
            Path::new("/definitely/not/here/out.png"),
            DEFAULT_JPEG_QUALITY,
        )
        .unwrap_err();
        assert!(err.is_invalid_argument());
        assert!(check_parent_dir(Path::new("relative.png")).is_ok());
    }

    #[test]
    fn decoding_a_missing_file_fails() {
        let err = decode(Path::new("/no/such/image.ppm")).unwrap_err();
        assert!(err.is_invalid_argument());
    }
}
