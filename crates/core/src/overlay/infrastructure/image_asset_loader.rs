use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::overlay::domain::decorative_image::DecorativeImage;

#[derive(Error, Debug)]
pub enum AssetError {
    #[error("asset {name} not found (searched: {})", display_dirs(.searched))]
    Missing { name: String, searched: Vec<PathBuf> },
    #[error("failed to decode asset {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

fn display_dirs(dirs: &[PathBuf]) -> String {
    dirs.iter()
        .map(|d| d.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Loads named bitmaps from an ordered list of asset directories.
pub struct ImageAssetLoader {
    search_dirs: Vec<PathBuf>,
}

impl ImageAssetLoader {
    pub fn new(search_dirs: Vec<PathBuf>) -> Self {
        Self { search_dirs }
    }

    /// `./assets`, the executable's `assets/` and `../Resources/` (app
    /// bundles), then the per-user data dir.
    pub fn with_default_dirs() -> Self {
        let mut dirs = vec![PathBuf::from("assets")];
        if let Some(exe_dir) = std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(Path::to_path_buf))
        {
            dirs.push(exe_dir.join("assets"));
            dirs.push(exe_dir.join("..").join("Resources"));
        }
        if let Some(data) = dirs::data_dir() {
            dirs.push(data.join("Purikura").join("assets"));
        }
        Self::new(dirs)
    }

    /// Puts `dir` ahead of the existing search path.
    pub fn prepend_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.search_dirs.insert(0, dir.into());
        self
    }

    pub fn search_dirs(&self) -> &[PathBuf] {
        &self.search_dirs
    }

    /// Finds `name` (a bare file name or a path) and decodes it as RGBA.
    pub fn load(&self, name: &str) -> Result<DecorativeImage, AssetError> {
        let path = self.locate(name).ok_or_else(|| AssetError::Missing {
            name: name.to_string(),
            searched: self.search_dirs.clone(),
        })?;
        let pixels = image::open(&path)
            .map_err(|source| AssetError::Decode {
                path: path.clone(),
                source,
            })?
            .into_rgba8();
        let (w, h) = pixels.dimensions();
        log::info!("Loaded decoration {} ({w}x{h})", path.display());
        Ok(DecorativeImage::new(name, pixels))
    }

    fn locate(&self, name: &str) -> Option<PathBuf> {
        let direct = Path::new(name);
        if direct.is_absolute() || direct.components().count() > 1 {
            return direct.is_file().then(|| direct.to_path_buf());
        }
        self.search_dirs
            .iter()
            .map(|dir| dir.join(name))
            .find(|candidate| candidate.is_file())
    }
}
