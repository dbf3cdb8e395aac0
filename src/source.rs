//! Frame sources for offline processing.

use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::error::{Error, Result};
use crate::image::{Frame, Image};

/// File extensions recognized as images, compared case-insensitively.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Something that produces frames one at a time.
pub trait FrameSource: Send {
    /// Returns the next frame, or `None` once the source is exhausted.
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    /// Returns a name for the frame most recently returned by [`FrameSource::next_frame`].
    fn frame_name(&self) -> Option<String> {
        None
    }
}

/// Decodes a list of PNG or JPEG files into RGB frames, in list order.
#[derive(Debug, Clone)]
pub struct ImageFiles {
    paths: Vec<PathBuf>,
    next: usize,
}

impl ImageFiles {
    pub fn new<I: IntoIterator<Item = P>, P: Into<PathBuf>>(paths: I) -> Self {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
            next: 0,
        }
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Returns the path of the frame most recently returned.
    pub fn current_path(&self) -> Option<&Path> {
        self.next.checked_sub(1).map(|i| &*self.paths[i])
    }
}

impl FrameSource for ImageFiles {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let Some(path) = self.paths.get(self.next) else {
            return Ok(None);
        };
        self.next += 1;

        log::trace!("decoding '{}'", path.display());
        let image = Image::load(path)?;
        Ok(Some(Frame::from_image(image)))
    }

    fn frame_name(&self) -> Option<String> {
        let path = self.current_path()?;
        Some(path.file_stem()?.to_string_lossy().into_owned())
    }
}

/// Every image in a directory, in lexical file name order.
///
/// Useful for frame sequences dumped by a video tool (`frame_00001.png`, ...).
#[derive(Debug, Clone)]
pub struct FrameDirectory {
    files: ImageFiles,
}

impl FrameDirectory {
    /// Lists the images in `dir`. Subdirectories and other files are ignored.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        Self::open_impl(dir.as_ref())
    }

    fn open_impl(dir: &Path) -> Result<Self> {
        let entries = fs::read_dir(dir)
            .map_err(|e| Error::config(dir, format!("failed to read frame directory: {e}")))?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.is_file() && is_image(&path) {
                paths.push(path);
            }
        }
        paths.sort();
        log::debug!("found {} frames in '{}'", paths.len(), dir.display());

        Ok(Self {
            files: ImageFiles::new(paths),
        })
    }

    pub fn paths(&self) -> &[PathBuf] {
        self.files.paths()
    }

    pub fn into_paths(self) -> Vec<PathBuf> {
        self.files.paths
    }
}

impl FrameSource for FrameDirectory {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        self.files.next_frame()
    }

    fn frame_name(&self) -> Option<String> {
        self.files.frame_name()
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}
