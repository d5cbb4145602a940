use std::{
    fs,
    io::Cursor,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};
use eframe::egui::ColorImage;
use log::warn;
use rand::seq::SliceRandom;

use crate::overlay::color_image_from;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "ico", "webp"];

pub fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.iter().any(|known| ext.eq_ignore_ascii_case(known)))
        .unwrap_or(false)
}

/// Regular files in `dir` whose extension is one of `extensions`, sorted.
pub fn list_files(dir: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)
        .with_context(|| format!("Failed to list asset directory: {}", dir.display()))?
    {
        let path = entry?.path();
        if path.is_file() && has_extension(&path, extensions) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

pub fn load_color_image(path: &Path) -> Result<ColorImage> {
    let data =
        fs::read(path).with_context(|| format!("Unable to open image: {}", path.display()))?;
    let reader = image::ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .with_context(|| format!("Unable to determine image format: {}", path.display()))?;
    let image = reader
        .decode()
        .with_context(|| format!("Failed to decode image: {}", path.display()))?;
    Ok(color_image_from(&image))
}

/// Directory of interchangeable disc backgrounds. The listing is read fresh
/// on every pick so records added while running are eligible.
#[derive(Debug, Clone)]
pub struct RecordLibrary {
    dir: PathBuf,
}

impl RecordLibrary {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Picks a random record image, skipping files that fail to decode.
    pub fn pick_random(&self) -> Result<(PathBuf, ColorImage)> {
        let mut candidates = list_files(&self.dir, IMAGE_EXTENSIONS)?;
        candidates.shuffle(&mut rand::rng());

        let mut last_err = None;
        for path in candidates {
            match load_color_image(&path) {
                Ok(image) => return Ok((path, image)),
                Err(err) => {
                    warn!("Skipping unreadable record image: {err:#}");
                    last_err = Some(err);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| {
            anyhow!("No record images found in {}", self.dir.display())
        }))
    }
}

/// Transport icons and the banner strip; all of them are required.
pub struct IconImages {
    pub play: ColorImage,
    pub pause: ColorImage,
    pub skip: ColorImage,
    pub previous: ColorImage,
    pub banner: ColorImage,
}

impl IconImages {
    pub fn load(dir: &Path) -> Result<Self> {
        let load = |name: &str| load_color_image(&dir.join(name));
        Ok(Self {
            play: load("play.png")?,
            pause: load("pause.png")?,
            skip: load("skip.png")?,
            previous: load("previous.png")?,
            banner: load("banner.png")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "record_spinner_{name}_{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_png(path: &Path, size: u32) {
        RgbaImage::from_pixel(size, size, Rgba([200, 100, 50, 255]))
            .save(path)
            .unwrap();
    }

    #[test]
    fn lists_only_matching_files() {
        let dir = scratch_dir("list");
        write_png(&dir.join("b.png"), 2);
        fs::rename(dir.join("b.png"), dir.join("b.PNG")).unwrap();
        write_png(&dir.join("a.png"), 2);
        fs::write(dir.join("notes.txt"), "hi").unwrap();
        fs::create_dir_all(dir.join("nested.png")).unwrap();

        let files = list_files(&dir, IMAGE_EXTENSIONS).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.png", "b.PNG"]);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn pick_random_skips_corrupt_images() {
        let dir = scratch_dir("pick");
        fs::write(dir.join("broken.png"), [0u8, 1, 2]).unwrap();
        write_png(&dir.join("good.png"), 4);

        let (path, image) = RecordLibrary::new(&dir).pick_random().unwrap();
        assert!(path.ends_with("good.png"));
        assert_eq!(image.size, [4, 4]);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn empty_record_dir_is_an_error() {
        let dir = scratch_dir("empty");
        assert!(RecordLibrary::new(&dir).pick_random().is_err());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_icon_is_an_error() {
        let dir = scratch_dir("icons");
        for name in ["play.png", "pause.png", "skip.png", "previous.png"] {
            write_png(&dir.join(name), 8);
        }
        assert!(IconImages::load(&dir).is_err());

        write_png(&dir.join("banner.png"), 8);
        let icons = IconImages::load(&dir).unwrap();
        assert_eq!(icons.banner.size, [8, 8]);
        let _ = fs::remove_dir_all(&dir);
    }
}
