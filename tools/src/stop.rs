//! External stop signal: the appearance of a file raises the shared flag.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

const POLL: Duration = Duration::from_millis(500);

pub struct StopWatch {
    pub flag: Arc<AtomicBool>,
    done: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl StopWatch {
    /// With no path the flag is never raised.
    pub fn start(stop_file: Option<PathBuf>) -> Self {
        let flag = Arc::new(AtomicBool::new(false));
        let done = Arc::new(AtomicBool::new(false));
        let handle = stop_file.map(|path| {
            let (flag, done) = (flag.clone(), done.clone());
            thread::spawn(move || {
                while !done.load(Ordering::Relaxed) {
                    if path.exists() {
                        tracing::warn!(stop_file = %path.display(), "stop requested; abandoning remaining videos");
                        flag.store(true, Ordering::Relaxed);
                        return;
                    }
                    thread::sleep(POLL);
                }
            })
        });
        Self { flag, done, handle }
    }
}

impl Drop for StopWatch {
    fn drop(&mut self) {
        self.done.store(true, Ordering::Relaxed);
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_file_raises_flag() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("STOP");
        let watch = StopWatch::start(Some(path.clone()));
        assert!(!watch.flag.load(Ordering::Relaxed));
        std::fs::write(&path, b"").unwrap();
        for _ in 0..40 {
            if watch.flag.load(Ordering::Relaxed) {
                break;
            }
            thread::sleep(Duration::from_millis(100));
        }
        assert!(watch.flag.load(Ordering::Relaxed));
    }

    #[test]
    fn no_path_never_stops() {
        let watch = StopWatch::start(None);
        assert!(!watch.flag.load(Ordering::Relaxed));
    }
}
