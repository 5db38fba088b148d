use {
    crate::error::{AutoclickError, TemplateLoadError},
    image::RgbImage,
    std::path::{Path, PathBuf},
};

/// Reference image of a UI element to search for.
#[derive(Debug, Clone)]
pub struct TemplateImage {
    name: String,
    path: PathBuf,
    image: RgbImage,
}

impl TemplateImage {
    /// Reads the file as raw bytes and decodes it in memory.
    ///
    /// Decoding from a buffer keeps paths with non-ASCII segments working on
    /// every platform. Any alpha channel is dropped.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AutoclickError> {
        let path = path.as_ref();
        let image = decode(path).map_err(|source| AutoclickError::TemplateLoad {
            path: path.to_owned(),
            source,
        })?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self {
            name,
            path: path.to_owned(),
            image,
        })
    }

    pub fn from_image(name: impl Into<String>, image: RgbImage) -> Self {
        let name = name.into();
        Self {
            path: PathBuf::from(&name),
            name,
            image,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

fn decode(path: &Path) -> Result<RgbImage, TemplateLoadError> {
    let bytes = fs_err::read(path)?;
    let image = image::load_from_memory(&bytes)?.into_rgb8();
    if image.width() == 0 || image.height() == 0 {
        return Err(TemplateLoadError::Empty);
    }
    Ok(image)
}
