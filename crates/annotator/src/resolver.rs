//! Logged identifier to on-disk video path.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::AnnotateError;

/// Maps a logged id (e.g. `clip_0042.h264`) to the stored artifact
/// (e.g. `<videos_root>/clip_0042.mp4`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoResolver {
    pub videos_root: PathBuf,
    pub logged_extension: String,
    pub stored_extension: String,
}

impl VideoResolver {
    pub fn new(videos_root: impl Into<PathBuf>) -> Self {
        Self {
            videos_root: videos_root.into(),
            logged_extension: "h264".to_string(),
            stored_extension: "mp4".to_string(),
        }
    }

    pub fn with_extensions(mut self, logged: &str, stored: &str) -> Self {
        self.logged_extension = logged.trim_start_matches('.').to_string();
        self.stored_extension = stored.trim_start_matches('.').to_string();
        self
    }

    /// Pure extension translation: logged (or missing) extension becomes the
    /// stored one; any other extension is kept.
    pub fn translate(&self, local_id: &str) -> PathBuf {
        let id = Path::new(local_id);
        let rel = match id.extension().and_then(|e| e.to_str()) {
            None => id.with_extension(&self.stored_extension),
            Some(ext) if ext.eq_ignore_ascii_case(&self.logged_extension) => {
                id.with_extension(&self.stored_extension)
            }
            Some(_) => id.to_path_buf(),
        };
        self.videos_root.join(rel)
    }

    /// Translated path if it exists, otherwise the first stored-extension file
    /// inside `<videos_root>/<stem>/`.
    pub fn resolve(&self, local_id: &str) -> Result<PathBuf, AnnotateError> {
        let direct = self.translate(local_id);
        if direct.exists() {
            return Ok(direct);
        }
        if let Some(found) = self.find_in_id_dir(local_id) {
            return Ok(found);
        }
        Err(AnnotateError::MissingSourceVideo {
            local_id: local_id.to_string(),
            tried: direct,
        })
    }

    fn find_in_id_dir(&self, local_id: &str) -> Option<PathBuf> {
        let id = Path::new(local_id);
        let stem = id.file_stem()?;
        let dir = match id.parent() {
            Some(parent) => self.videos_root.join(parent).join(stem),
            None => self.videos_root.join(stem),
        };
        let mut matches: Vec<PathBuf> = fs::read_dir(&dir)
            .ok()?
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case(&self.stored_extension))
            })
            .collect();
        matches.sort();
        matches.into_iter().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translates_logged_extension() {
        let r = VideoResolver::new("/videos");
        assert_eq!(r.translate("clip_7.h264"), PathBuf::from("/videos/clip_7.mp4"));
        assert_eq!(r.translate("clip_7.H264"), PathBuf::from("/videos/clip_7.mp4"));
        assert_eq!(r.translate("2021/f1/clip_7"), PathBuf::from("/videos/2021/f1/clip_7.mp4"));
        assert_eq!(r.translate("clip_7.avi"), PathBuf::from("/videos/clip_7.avi"));
    }

    #[test]
    fn custom_extensions() {
        let r = VideoResolver::new("v").with_extensions(".raw", ".mkv");
        assert_eq!(r.translate("a.raw"), PathBuf::from("v/a.mkv"));
    }

    #[test]
    fn resolves_direct_then_id_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("direct.mp4"), b"").unwrap();
        fs::create_dir_all(root.join("nested")).unwrap();
        fs::write(root.join("nested/video.mp4"), b"").unwrap();
        fs::write(root.join("nested/notes.txt"), b"").unwrap();

        let r = VideoResolver::new(root);
        assert_eq!(r.resolve("direct.h264").unwrap(), root.join("direct.mp4"));
        assert_eq!(r.resolve("nested.h264").unwrap(), root.join("nested/video.mp4"));
        let err = r.resolve("absent.h264").unwrap_err();
        assert!(matches!(
            err,
            AnnotateError::MissingSourceVideo { ref tried, .. } if tried == &root.join("absent.mp4")
        ));
    }
}
