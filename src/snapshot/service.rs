//! Snapshot service
//!
//! Captures the current output and moves images between memory, files and
//! the stdout stream.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::warn;

use super::bitmap::Image;

/// Snapshot prefix that streams PNM images to stdout instead of files
pub const STDOUT_PREFIX: &str = "-";

/// File name of the snapshot for `call_no` under `prefix`
pub fn snapshot_path(prefix: &str, call_no: u32) -> PathBuf {
    PathBuf::from(format!("{}{:010}.png", prefix, call_no))
}

/// Capture, load, store and compare snapshots
pub trait SnapshotService: Send {
    /// Grab the current output, `None` if nothing can be read back
    fn capture(&mut self) -> Option<Image>;

    /// Load a reference image, `None` if it does not exist or cannot be read
    fn load_reference(&mut self, path: &Path) -> Option<Image>;

    /// Write an image file, reporting success
    fn write_file(&mut self, image: &Image, path: &Path) -> bool;

    /// Stream an image as PNM annotated with `comment`
    fn write_stream(&mut self, image: &Image, comment: &str) -> io::Result<()>;

    /// Average precision in bits of `image` against `reference`
    fn compare(&self, image: &Image, reference: &Image) -> f64 {
        image.compare(reference)
    }
}

/// Callback that reads back the current output
pub type CaptureFn = Box<dyn FnMut() -> Option<Image> + Send>;

/// PNG files on disk, PNM on a stream, capture through a callback
pub struct PngSnapshots {
    capture: CaptureFn,
    stream: Box<dyn Write + Send>,
}

impl PngSnapshots {
    /// Snapshots captured by `capture`, streamed to stdout
    pub fn new<F>(capture: F) -> Self
    where
        F: FnMut() -> Option<Image> + Send + 'static,
    {
        Self {
            capture: Box::new(capture),
            stream: Box::new(io::stdout()),
        }
    }

    /// Redirect the PNM stream
    pub fn with_stream(mut self, stream: Box<dyn Write + Send>) -> Self {
        self.stream = stream;
        self
    }
}

impl SnapshotService for PngSnapshots {
    fn capture(&mut self) -> Option<Image> {
        (self.capture)()
    }

    fn load_reference(&mut self, path: &Path) -> Option<Image> {
        if !path.exists() {
            return None;
        }
        match Image::read_png(path) {
            Ok(image) => Some(image),
            Err(e) => {
                warn!("Failed to read {}: {}", path.display(), e);
                None
            }
        }
    }

    fn write_file(&mut self, image: &Image, path: &Path) -> bool {
        match image.write_png(path) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to write {}: {}", path.display(), e);
                false
            }
        }
    }

    fn write_stream(&mut self, image: &Image, comment: &str) -> io::Result<()> {
        image.write_pnm(&mut self.stream, comment)?;
        self.stream.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use tempfile::TempDir;

    /// Stream sink shared with the test
    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_snapshot_path() {
        assert_eq!(snapshot_path("out/", 5), PathBuf::from("out/0000000005.png"));
        assert_eq!(snapshot_path("", 1234567890), PathBuf::from("1234567890.png"));
    }

    #[test]
    fn test_missing_reference_is_none() {
        let mut snapshots = PngSnapshots::new(|| None);
        assert!(snapshots
            .load_reference(Path::new("/nonexistent/0000000012.png"))
            .is_none());
        assert!(snapshots.capture().is_none());
    }

    #[test]
    fn test_write_and_load() {
        let dir = TempDir::new().unwrap();
        let path = snapshot_path(&format!("{}/", dir.path().display()), 3);
        let image = Image::from_rgba(1, 1, vec![10, 20, 30, 255]).unwrap();

        let mut snapshots = PngSnapshots::new(|| None);
        assert!(snapshots.write_file(&image, &path));
        assert_eq!(snapshots.load_reference(&path), Some(image));
    }

    #[test]
    fn test_write_stream() {
        let sink = SharedBuf::default();
        let mut snapshots = PngSnapshots::new(|| None).with_stream(Box::new(sink.clone()));
        let image = Image::from_rgba(1, 1, vec![1, 2, 3, 4]).unwrap();
        snapshots.write_stream(&image, "7").unwrap();
        assert_eq!(sink.0.lock().as_slice(), b"P6\n#7\n1 1\n255\n\x01\x02\x03");
    }
}
