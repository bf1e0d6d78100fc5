//! Listing, writing and deleting images and crops on disk.

use std::fs;
use std::path::{Path, PathBuf};

use image::{ImageFormat, RgbaImage};

use crate::error::CropError;
use crate::geometry::CropRect;

pub const IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "webp", "bmp", "gif"];
pub const CROP_MARKER: &str = "_crop_";
const CROP_EXTENSION: &str = ".png";

/// A named file in a listed directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub name: String,
    pub path: PathBuf,
}

/// Decoded pixel size of an image file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Integer pixel region actually cut from the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// The collaborator operations the desktop host needs.
///
/// [`FsLibrary`] is the only production implementation; the trait keeps the
/// host free of direct filesystem calls so the save batch can run on a
/// worker thread.
pub trait CropLibrary: Send + Sync {
    fn list_images(&self, dir: &Path) -> Result<Vec<FileEntry>, CropError>;
    fn list_crops(&self, dir: &Path) -> Result<Vec<FileEntry>, CropError>;
    fn save_crops(
        &self,
        image_path: &Path,
        rects: &[CropRect],
        output_dir: &Path,
    ) -> Result<Vec<FileEntry>, CropError>;
    fn delete_crop(&self, path: &Path) -> Result<(), CropError>;
    fn read_decoded_size(&self, image_path: &Path) -> Result<Dimensions, CropError>;
    fn read_thumbnail(&self, image_path: &Path, max_side: u32) -> Result<RgbaImage, CropError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FsLibrary;

impl CropLibrary for FsLibrary {
    fn list_images(&self, dir: &Path) -> Result<Vec<FileEntry>, CropError> {
        list_images(dir)
    }

    fn list_crops(&self, dir: &Path) -> Result<Vec<FileEntry>, CropError> {
        list_crops(dir)
    }

    fn save_crops(
        &self,
        image_path: &Path,
        rects: &[CropRect],
        output_dir: &Path,
    ) -> Result<Vec<FileEntry>, CropError> {
        save_crops(image_path, rects, output_dir)
    }

    fn delete_crop(&self, path: &Path) -> Result<(), CropError> {
        delete_crop(path)
    }

    fn read_decoded_size(&self, image_path: &Path) -> Result<Dimensions, CropError> {
        read_decoded_size(image_path)
    }

    fn read_thumbnail(&self, image_path: &Path, max_side: u32) -> Result<RgbaImage, CropError> {
        read_thumbnail(image_path, max_side)
    }
}

pub fn is_image_file(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}

pub fn is_crop_file(name: &str) -> bool {
    name.to_lowercase().contains(CROP_MARKER)
}

fn list_files(dir: &Path, keep: impl Fn(&str) -> bool) -> Result<Vec<FileEntry>, CropError> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| CropError::io(dir, e))? {
        let entry = entry.map_err(|e| CropError::io(dir, e))?;
        let is_file = entry
            .file_type()
            .map_err(|e| CropError::io(entry.path(), e))?
            .is_file();
        let name = entry.file_name().to_string_lossy().into_owned();
        if is_file && keep(&name) {
            files.push(FileEntry {
                path: entry.path(),
                name,
            });
        }
    }
    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(files)
}

/// Image files directly inside `dir`, sorted by name.
pub fn list_images(dir: &Path) -> Result<Vec<FileEntry>, CropError> {
    list_files(dir, is_image_file)
}

/// Image files inside `dir` whose name carries the crop marker.
pub fn list_crops(dir: &Path) -> Result<Vec<FileEntry>, CropError> {
    list_files(dir, |name| is_image_file(name) && is_crop_file(name))
}

pub fn crop_file_name(base_name: &str, index: u64) -> String {
    format!("{base_name}{CROP_MARKER}{index}{CROP_EXTENSION}")
}

/// The `N` of `<base_name>_crop_<N>.png`, compared case-insensitively.
pub fn parse_crop_index(file_name: &str, base_name: &str) -> Option<u64> {
    let prefix = format!("{base_name}{CROP_MARKER}");
    if !file_name.get(..prefix.len())?.eq_ignore_ascii_case(&prefix) {
        return None;
    }
    let rest = file_name.get(prefix.len()..)?;
    let split = rest.len().checked_sub(CROP_EXTENSION.len())?;
    let (digits, ext) = (rest.get(..split)?, rest.get(split..)?);
    if digits.is_empty()
        || !digits.bytes().all(|b| b.is_ascii_digit())
        || !ext.eq_ignore_ascii_case(CROP_EXTENSION)
    {
        return None;
    }
    digits.parse().ok()
}

/// One past the highest existing crop number for `base_name`, or 1.
pub fn next_crop_index(output_dir: &Path, base_name: &str) -> Result<u64, CropError> {
    if !output_dir.exists() {
        return Ok(1);
    }
    let mut max_index = 0u64;
    for entry in fs::read_dir(output_dir).map_err(|e| CropError::io(output_dir, e))? {
        let entry = entry.map_err(|e| CropError::io(output_dir, e))?;
        if let Some(index) = parse_crop_index(&entry.file_name().to_string_lossy(), base_name) {
            max_index = max_index.max(index);
        }
    }
    Ok(max_index.saturating_add(1))
}

/// Floor a rectangle to whole pixels and intersect it with the image.
/// Returns `None` when either side ends up 1 pixel or less.
pub fn pixel_region(rect: &CropRect, image: Dimensions) -> Option<PixelRegion> {
    if rect.width <= 1.0 || rect.height <= 1.0 {
        return None;
    }
    let x = rect.x.floor().max(0.0) as u32;
    let y = rect.y.floor().max(0.0) as u32;
    let width = (rect.width.floor() as u32).min(image.width.saturating_sub(x));
    let height = (rect.height.floor() as u32).min(image.height.saturating_sub(y));
    if width <= 1 || height <= 1 {
        return None;
    }
    Some(PixelRegion {
        x,
        y,
        width,
        height,
    })
}

/// Write each rectangle of `image_path` as its own PNG in `output_dir`.
///
/// The source is decoded here, so its real size (not whatever the editor
/// cached) bounds the regions. Rectangles that shrink to 1 pixel or less
/// are skipped without using up a number. A failure part-way leaves the
/// files already written in place.
pub fn save_crops(
    image_path: &Path,
    rects: &[CropRect],
    output_dir: &Path,
) -> Result<Vec<FileEntry>, CropError> {
    if rects.is_empty() {
        return Ok(Vec::new());
    }

    fs::create_dir_all(output_dir).map_err(|e| CropError::io(output_dir, e))?;
    let base_name = image_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .ok_or_else(|| CropError::InvalidImagePath(image_path.to_path_buf()))?;
    let mut index = next_crop_index(output_dir, &base_name)?;

    let source = image::open(image_path).map_err(|e| CropError::image(image_path, e))?;
    let dims = Dimensions {
        width: source.width(),
        height: source.height(),
    };

    let mut saved = Vec::new();
    for rect in rects {
        let Some(region) = pixel_region(rect, dims) else {
            log::debug!("skipping degenerate crop {rect:?}");
            continue;
        };
        let name = crop_file_name(&base_name, index);
        let path = output_dir.join(&name);
        source
            .crop_imm(region.x, region.y, region.width, region.height)
            .to_rgba8()
            .save_with_format(&path, ImageFormat::Png)
            .map_err(|e| CropError::image(&path, e))?;
        log::debug!("wrote {} ({}x{})", path.display(), region.width, region.height);
        saved.push(FileEntry { name, path });
        index += 1;
    }

    log::info!(
        "Saved {} crop(s) from {} into {}",
        saved.len(),
        image_path.display(),
        output_dir.display()
    );
    Ok(saved)
}

/// Remove a saved crop. A missing file is an error.
pub fn delete_crop(path: &Path) -> Result<(), CropError> {
    fs::remove_file(path).map_err(|e| CropError::io(path, e))?;
    log::info!("Deleted crop {}", path.display());
    Ok(())
}

pub fn read_decoded_size(image_path: &Path) -> Result<Dimensions, CropError> {
    let (width, height) =
        image::image_dimensions(image_path).map_err(|e| CropError::image(image_path, e))?;
    Ok(Dimensions { width, height })
}

/// Decode an image and shrink it to fit a `max_side` square, keeping the ratio.
pub fn read_thumbnail(image_path: &Path, max_side: u32) -> Result<RgbaImage, CropError> {
    let image = image::open(image_path).map_err(|e| CropError::image(image_path, e))?;
    Ok(image.thumbnail(max_side, max_side).to_rgba8())
}
