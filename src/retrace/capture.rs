//! Snapshot and compare step
//!
//! Runs for every selected call: loads the reference, captures the current
//! output, writes or streams it, and reports the precision against the
//! reference. Images are dropped on every exit path.

use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::config::SnapshotConfig;
use crate::snapshot::{snapshot_path, SnapshotService, STDOUT_PREFIX};

/// What a snapshot step did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotReport {
    pub call_no: u32,
    /// Reference image that was loaded
    pub reference: Option<PathBuf>,
    /// The current output could be captured
    pub captured: bool,
    /// Snapshot file that was written
    pub written: Option<PathBuf>,
    /// The snapshot went to the PNM stream
    pub streamed: bool,
    /// Average precision in bits against the reference
    pub precision: Option<f64>,
}

/// Snapshot and compare the current output for `call_no`
pub fn take_snapshot(
    config: &SnapshotConfig,
    service: &mut dyn SnapshotService,
    call_no: u32,
) -> SnapshotReport {
    let mut report = SnapshotReport {
        call_no,
        ..SnapshotReport::default()
    };

    if !config.is_enabled() {
        return report;
    }

    let reference = match config.compare_prefix.as_deref() {
        Some(prefix) => {
            let path = snapshot_path(prefix, call_no);
            match service.load_reference(&path) {
                Some(image) => {
                    info!("Read {}", path.display());
                    report.reference = Some(path);
                    Some(image)
                }
                None => {
                    debug!("No reference {} for call {}", path.display(), call_no);
                    return report;
                }
            }
        }
        None => None,
    };

    let Some(image) = service.capture() else {
        debug!("Nothing to capture at call {}", call_no);
        return report;
    };
    report.captured = true;

    match config.snapshot_prefix.as_deref() {
        Some(STDOUT_PREFIX) => {
            let comment = call_no.to_string();
            match service.write_stream(&image, &comment) {
                Ok(()) => report.streamed = true,
                Err(e) => warn!("Failed to stream snapshot {}: {}", call_no, e),
            }
        }
        Some(prefix) => {
            let path = snapshot_path(prefix, call_no);
            if service.write_file(&image, &path) {
                info!("Wrote {}", path.display());
                report.written = Some(path);
            }
        }
        None => {}
    }

    if let Some(ref reference) = reference {
        let precision = service.compare(&image, reference);
        let line = precision_line(call_no, precision);
        if config.streams_to_stdout() {
            eprintln!("{}", line);
        } else {
            println!("{}", line);
        }
        report.precision = Some(precision);
    }

    report
}

fn precision_line(call_no: u32, precision: f64) -> String {
    format!("Snapshot {} average precision of {} bits", call_no, precision)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::Image;
    use std::collections::HashMap;
    use std::io;
    use std::path::Path;

    /// In-memory snapshot service
    #[derive(Default)]
    struct FakeSnapshots {
        current: Option<Image>,
        references: HashMap<PathBuf, Image>,
        written: Vec<PathBuf>,
        streamed: Vec<String>,
        captures: usize,
    }

    impl SnapshotService for FakeSnapshots {
        fn capture(&mut self) -> Option<Image> {
            self.captures += 1;
            self.current.clone()
        }

        fn load_reference(&mut self, path: &Path) -> Option<Image> {
            self.references.get(path).cloned()
        }

        fn write_file(&mut self, _image: &Image, path: &Path) -> bool {
            self.written.push(path.to_path_buf());
            true
        }

        fn write_stream(&mut self, _image: &Image, comment: &str) -> io::Result<()> {
            self.streamed.push(comment.to_string());
            Ok(())
        }
    }

    fn gray(value: u8) -> Image {
        Image::from_rgba(2, 2, vec![value; 16]).unwrap()
    }

    #[test]
    fn test_disabled_is_noop() {
        let mut service = FakeSnapshots {
            current: Some(gray(1)),
            ..Default::default()
        };
        let report = take_snapshot(&SnapshotConfig::default(), &mut service, 4);
        assert_eq!(service.captures, 0);
        assert!(!report.captured);
    }

    #[test]
    fn test_writes_numbered_file() {
        let mut service = FakeSnapshots {
            current: Some(gray(1)),
            ..Default::default()
        };
        let config = SnapshotConfig::snapshot_every_frame("out/");
        let report = take_snapshot(&config, &mut service, 5);

        assert_eq!(report.written, Some(PathBuf::from("out/0000000005.png")));
        assert_eq!(service.written.len(), 1);
        assert!(report.precision.is_none());
    }

    #[test]
    fn test_streams_to_stdout() {
        let mut service = FakeSnapshots {
            current: Some(gray(1)),
            ..Default::default()
        };
        let config = SnapshotConfig::snapshot_every_frame("-");
        let report = take_snapshot(&config, &mut service, 42);

        assert!(report.streamed);
        assert_eq!(service.streamed, vec!["42".to_string()]);
        assert!(service.written.is_empty());
    }

    #[test]
    fn test_missing_reference_skips_everything() {
        let mut service = FakeSnapshots {
            current: Some(gray(1)),
            ..Default::default()
        };
        let mut config = SnapshotConfig::compare_every_frame("ref/");
        config.snapshot_prefix = Some("out/".to_string());
        let report = take_snapshot(&config, &mut service, 12);

        assert_eq!(service.captures, 0);
        assert!(service.written.is_empty());
        assert!(report.precision.is_none());
    }

    #[test]
    fn test_compare_identical_is_max_precision() {
        let mut service = FakeSnapshots {
            current: Some(gray(9)),
            ..Default::default()
        };
        service
            .references
            .insert(PathBuf::from("ref/0000000003.png"), gray(9));
        let config = SnapshotConfig::compare_every_frame("ref/");
        let report = take_snapshot(&config, &mut service, 3);

        assert_eq!(report.reference, Some(PathBuf::from("ref/0000000003.png")));
        let precision = report.precision.unwrap();
        assert_eq!(precision, gray(9).compare(&gray(9)));
        assert!(precision > gray(0).compare(&gray(255)));
    }

    #[test]
    fn test_capture_unavailable() {
        let mut service = FakeSnapshots::default();
        service
            .references
            .insert(PathBuf::from("ref/0000000001.png"), gray(9));
        let config = SnapshotConfig::compare_every_frame("ref/");
        let report = take_snapshot(&config, &mut service, 1);

        assert!(report.reference.is_some());
        assert!(!report.captured);
        assert!(report.precision.is_none());
    }

    #[test]
    fn test_precision_line_keeps_full_value() {
        assert_eq!(
            precision_line(4, 7.25),
            "Snapshot 4 average precision of 7.25 bits"
        );
        assert!(precision_line(9, 23.96).contains(" 23.96 bits"));
    }
}
