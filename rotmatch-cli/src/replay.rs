//! Stand-ins for the platform collaborators: frames replayed from disk, clicks
//! written to the log and command keys typed on stdin.

use rotmatch::{
    CapturedFrame, Click, ClickDispatcher, FrameSource, TriggerCallback, TriggerRegistry,
    WindowRect,
};
use std::collections::HashMap;
use std::fs;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::thread;
use tracing::{debug, info, warn};

const FRAME_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Cycles through the images of a directory in file-name order.
///
/// A missing or empty directory behaves like a window that does not exist.
pub struct ReplaySource {
    dir: PathBuf,
    next: usize,
}

impl ReplaySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            next: 0,
        }
    }

    fn frame_paths(&self) -> Vec<PathBuf> {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_frame(path))
            .collect();
        paths.sort();
        paths
    }
}

fn is_frame(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| FRAME_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

impl FrameSource for ReplaySource {
    fn capture(&mut self, window_title: &str) -> Option<CapturedFrame> {
        let paths = self.frame_paths();
        if paths.is_empty() {
            return None;
        }
        let path = &paths[self.next % paths.len()];
        self.next = self.next.wrapping_add(1);

        let image = match image::open(path) {
            Ok(image) => image,
            Err(err) => {
                warn!("skipping frame {}: {err}", path.display());
                return None;
            }
        };
        debug!("\"{window_title}\" <- {}", path.display());
        let rect = WindowRect::new(0, 0, image.width() as i32, image.height() as i32);
        Some(CapturedFrame { image, rect })
    }
}

/// Reports clicks instead of injecting input.
pub struct LogDispatcher;

impl ClickDispatcher for LogDispatcher {
    fn dispatch_click(&mut self, window_title: &str, click: &Click) {
        let (sx, sy) = click.screen_position();
        info!(
            "click {} in \"{window_title}\" at ({}, {}) screen ({sx}, {sy})",
            click.detector, click.x, click.y
        );
    }
}

/// Fires callbacks for key names read line by line from stdin.
#[derive(Default)]
pub struct StdinTriggers {
    callbacks: HashMap<String, TriggerCallback>,
}

impl TriggerRegistry for StdinTriggers {
    fn register(&mut self, key: &str, callback: TriggerCallback) {
        self.callbacks.insert(key.to_ascii_lowercase(), callback);
    }
}

impl StdinTriggers {
    /// Starts the reader thread; it ends at end of input.
    pub fn spawn(self) -> io::Result<thread::JoinHandle<()>> {
        thread::Builder::new()
            .name("rotmatch-stdin".to_string())
            .spawn(move || {
                for line in io::stdin().lock().lines() {
                    let Ok(line) = line else { break };
                    let key = line.trim().to_ascii_lowercase();
                    if key.is_empty() {
                        continue;
                    }
                    match self.callbacks.get(&key) {
                        Some(callback) => callback(),
                        None => warn!("unbound key \"{key}\""),
                    }
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    #[test]
    fn replays_frames_in_name_order_and_wraps() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("frames");
        fs::create_dir_all(&dir).unwrap();
        for (name, value) in [("b.png", 20u8), ("a.png", 10), ("notes.txt", 0)] {
            let path = dir.join(name);
            if name.ends_with(".png") {
                GrayImage::from_pixel(4, 3, Luma([value])).save(&path).unwrap();
            } else {
                fs::write(&path, "not a frame").unwrap();
            }
        }

        let mut source = ReplaySource::new(&dir);
        let seen: Vec<u8> = (0..3)
            .map(|_| source.capture("w").unwrap().image.to_luma8().get_pixel(0, 0)[0])
            .collect();
        assert_eq!(seen, vec![10, 20, 10]);

        fs::remove_dir_all(&dir).unwrap();
        assert!(source.capture("w").is_none());
    }
}
