//! Frame sources: an ffmpeg subprocess for real videos and a directory of
//! still images for pre-extracted frames.

use std::fs;
use std::io::{BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};
use vision_core::interfaces::{Frame, FrameSource, VideoError, VideoOpener};

/// Decodes with `ffmpeg` into packed RGB24 over a pipe; dimensions come from `ffprobe`.
#[derive(Debug, Clone)]
pub struct FfmpegOpener {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

impl Default for FfmpegOpener {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
        }
    }
}

impl FfmpegOpener {
    fn probe(&self, path: &Path) -> Result<(u32, u32), VideoError> {
        let open_err = |msg: String| VideoError::Open {
            path: path.to_path_buf(),
            msg,
        };
        let output = Command::new(&self.ffprobe)
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=width,height",
                "-of",
                "csv=s=x:p=0",
            ])
            .arg(path)
            .output()
            .map_err(|e| open_err(format!("spawn {}: {e}", self.ffprobe.display())))?;
        if !output.status.success() {
            return Err(open_err(format!(
                "ffprobe exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        let text = String::from_utf8_lossy(&output.stdout);
        parse_dimensions(&text).ok_or_else(|| open_err(format!("unexpected ffprobe output {text:?}")))
    }
}

/// Parse `WIDTHxHEIGHT` as printed by ffprobe (first non-empty line).
pub fn parse_dimensions(raw: &str) -> Option<(u32, u32)> {
    let line = raw.lines().map(str::trim).find(|l| !l.is_empty())?;
    let (w, h) = line.split_once('x')?;
    let w: u32 = w.trim().parse().ok()?;
    let h: u32 = h.trim().trim_end_matches('x').parse().ok()?;
    (w > 0 && h > 0).then_some((w, h))
}

impl VideoOpener for FfmpegOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn FrameSource + Send>, VideoError> {
        if !path.is_file() {
            return Err(VideoError::Open {
                path: path.to_path_buf(),
                msg: "not a file".into(),
            });
        }
        let size = self.probe(path)?;
        let mut child = Command::new(&self.ffmpeg)
            .args(["-v", "error", "-nostdin", "-i"])
            .arg(path)
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "pipe:1"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| VideoError::Open {
                path: path.to_path_buf(),
                msg: format!("spawn {}: {e}", self.ffmpeg.display()),
            })?;
        let stdout = child.stdout.take().ok_or_else(|| VideoError::Open {
            path: path.to_path_buf(),
            msg: "ffmpeg stdout unavailable".into(),
        })?;
        Ok(Box::new(FfmpegSource {
            path: path.to_path_buf(),
            child,
            stdout: BufReader::new(stdout),
            size,
            next_id: 0,
        }))
    }
}

struct FfmpegSource {
    path: PathBuf,
    child: Child,
    stdout: BufReader<ChildStdout>,
    size: (u32, u32),
    next_id: u64,
}

impl FfmpegSource {
    fn decode_err(&self, msg: String) -> VideoError {
        VideoError::Decode {
            path: self.path.clone(),
            frame_id: self.next_id,
            msg,
        }
    }
}

impl FrameSource for FfmpegSource {
    fn dimensions(&self) -> (u32, u32) {
        self.size
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, VideoError> {
        let len = self.size.0 as usize * self.size.1 as usize * 3;
        let mut rgb = vec![0u8; len];
        let mut filled = 0usize;
        while filled < len {
            match self.stdout.read(&mut rgb[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(self.decode_err(format!("read: {e}"))),
            }
        }
        if filled == 0 {
            let status = self
                .child
                .wait()
                .map_err(|e| self.decode_err(format!("wait: {e}")))?;
            if !status.success() {
                return Err(self.decode_err(format!("ffmpeg exited with {status}")));
            }
            return Ok(None);
        }
        if filled < len {
            return Err(self.decode_err(format!("truncated frame: {filled} of {len} bytes")));
        }
        let frame = Frame {
            id: self.next_id,
            size: self.size,
            rgb,
        };
        self.next_id += 1;
        Ok(Some(frame))
    }
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        if let Ok(None) = self.child.try_wait() {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

/// Treats a directory of still images (sorted by file name) as one video.
#[derive(Debug, Clone, Default)]
pub struct ImageDirOpener;

impl VideoOpener for ImageDirOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn FrameSource + Send>, VideoError> {
        let open_err = |msg: String| VideoError::Open {
            path: path.to_path_buf(),
            msg,
        };
        let mut frames: Vec<PathBuf> = fs::read_dir(path)
            .map_err(|e| open_err(e.to_string()))?
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| {
                matches!(
                    p.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref(),
                    Some("png" | "jpg" | "jpeg")
                )
            })
            .collect();
        frames.sort();
        let first = frames.first().ok_or_else(|| open_err("no frame images".into()))?;
        let size = image::image_dimensions(first).map_err(|e| open_err(e.to_string()))?;
        Ok(Box::new(ImageDirSource {
            frames,
            size,
            next_id: 0,
        }))
    }
}

struct ImageDirSource {
    frames: Vec<PathBuf>,
    size: (u32, u32),
    next_id: u64,
}

impl FrameSource for ImageDirSource {
    fn dimensions(&self) -> (u32, u32) {
        self.size
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, VideoError> {
        let Some(path) = self.frames.get(self.next_id as usize) else {
            return Ok(None);
        };
        let decode_err = |msg: String| VideoError::Decode {
            path: path.clone(),
            frame_id: self.next_id,
            msg,
        };
        let img = image::open(path)
            .map_err(|e| decode_err(e.to_string()))?
            .to_rgb8();
        if img.dimensions() != self.size {
            return Err(decode_err(format!(
                "frame is {:?}, video is {:?}",
                img.dimensions(),
                self.size
            )));
        }
        let frame = Frame {
            id: self.next_id,
            size: self.size,
            rgb: img.into_raw(),
        };
        self.next_id += 1;
        Ok(Some(frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ffprobe_dimensions() {
        assert_eq!(parse_dimensions("1296x972\n"), Some((1296, 972)));
        assert_eq!(parse_dimensions("\n640x480x\n"), Some((640, 480)));
        assert_eq!(parse_dimensions("0x480"), None);
        assert_eq!(parse_dimensions("garbage"), None);
        assert_eq!(parse_dimensions(""), None);
    }

    #[test]
    fn image_dir_yields_frames_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        for (name, shade) in [("f_0002.png", 20u8), ("f_0001.png", 10u8)] {
            image::RgbImage::from_pixel(4, 3, image::Rgb([shade, 0, 0]))
                .save(dir.path().join(name))
                .unwrap();
        }
        let mut src = ImageDirOpener.open(dir.path()).unwrap();
        assert_eq!(src.dimensions(), (4, 3));
        let first = src.next_frame().unwrap().unwrap();
        assert_eq!((first.id, first.rgb[0]), (0, 10));
        let second = src.next_frame().unwrap().unwrap();
        assert_eq!((second.id, second.rgb[0]), (1, 20));
        assert!(src.next_frame().unwrap().is_none());
    }

    #[test]
    fn mismatched_frame_size_is_decode_failure() {
        let dir = tempfile::tempdir().unwrap();
        image::RgbImage::new(4, 3).save(dir.path().join("a.png")).unwrap();
        image::RgbImage::new(5, 3).save(dir.path().join("b.png")).unwrap();
        let mut src = ImageDirOpener.open(dir.path()).unwrap();
        assert!(src.next_frame().unwrap().is_some());
        assert!(matches!(
            src.next_frame(),
            Err(VideoError::Decode { frame_id: 1, .. })
        ));
    }

    #[test]
    fn missing_file_cannot_be_opened() {
        let dir = tempfile::tempdir().unwrap();
        let res = FfmpegOpener::default().open(&dir.path().join("absent.mp4"));
        assert!(matches!(res, Err(VideoError::Open { .. })));
        assert!(ImageDirOpener.open(&dir.path().join("absent")).is_err());
    }
}
