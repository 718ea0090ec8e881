//! Rotating sample log
//!
//! Samples are appended to `{base}_{index}.txt` in the data directory. With
//! a segment length set, the file is closed after that many samples and the
//! next segment opens `{base}_{index + 1}.txt`. A segment's file is created
//! when the segment starts, before its first sample is read, and closed on
//! drop.

use crate::imu::types::SampleBundle;
use std::fs::File;
use std::io::{self, LineWriter, Write};
use std::path::PathBuf;

/// Samples per segment for a rotation period, truncated toward zero.
///
/// Products within rounding error of an integer count as that integer, so
/// 0.29 s at 100 Hz is 29 samples.
pub fn samples_per_segment(frequency: f64, rotation_period: f64) -> u64 {
    let product = rotation_period * frequency;
    let nearest = product.round();
    if (product - nearest).abs() < 1e-9 {
        nearest as u64
    } else {
        product.floor() as u64
    }
}

pub fn segment_file_name(base_name: &str, index: u64) -> String {
    format!("{base_name}_{index}.txt")
}

#[derive(Debug)]
pub struct SegmentWriter {
    dir: PathBuf,
    base_name: String,
    /// None means a single, unbounded segment.
    segment_len: Option<u64>,
    index: u64,
    written: u64,
    file: Option<LineWriter<File>>,
}

impl SegmentWriter {
    pub fn new(dir: impl Into<PathBuf>, base_name: impl Into<String>, segment_len: Option<u64>) -> Self {
        Self {
            dir: dir.into(),
            base_name: base_name.into(),
            segment_len,
            index: 0,
            written: 0,
            file: None,
        }
    }

    pub fn segment_path(&self, index: u64) -> PathBuf {
        self.dir.join(segment_file_name(&self.base_name, index))
    }

    /// Create the current segment's file unless it is already open.
    pub fn start_segment(&mut self) -> io::Result<()> {
        if self.file.is_none() {
            let path = self.segment_path(self.index);
            tracing::debug!("Opening segment {}", path.display());
            self.file = Some(LineWriter::new(File::create(&path)?));
        }
        Ok(())
    }

    pub fn write_sample(&mut self, bundle: &SampleBundle) -> io::Result<()> {
        self.start_segment()?;
        if let Some(file) = self.file.as_mut() {
            file.write_all(bundle.to_log_line().as_bytes())?;
        }
        self.written += 1;

        if self.segment_len.is_some_and(|len| self.written >= len) {
            self.close_segment()?;
            self.index += 1;
            self.written = 0;
        }
        Ok(())
    }

    fn close_segment(&mut self) -> io::Result<()> {
        if let Some(mut file) = self.file.take() {
            file.flush()?;
        }
        Ok(())
    }

    /// Flush and close the open segment, if any.
    pub fn finish(&mut self) -> io::Result<()> {
        self.close_segment()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imu::types::AxisReading;
    use std::fs;
    use std::path::Path;

    fn bundle(n: i16) -> SampleBundle {
        SampleBundle {
            accelerometer: AxisReading { x: n, y: 0, z: 0 },
            ..Default::default()
        }
    }

    fn line_count(path: &Path) -> usize {
        fs::read_to_string(path).unwrap().lines().count()
    }

    #[test]
    fn test_samples_per_segment_truncates() {
        assert_eq!(samples_per_segment(10.0, 2.0), 20);
        assert_eq!(samples_per_segment(3.0, 1.5), 4);
        assert_eq!(samples_per_segment(7.0, 0.9), 6);
        assert_eq!(samples_per_segment(1.0, 0.5), 0);
    }

    #[test]
    fn test_samples_per_segment_ignores_float_error() {
        assert_eq!(samples_per_segment(100.0, 0.29), 29);
        assert_eq!(samples_per_segment(100.0, 0.57), 57);
        assert_eq!(samples_per_segment(100.0, 0.295), 29);
        assert_eq!(samples_per_segment(50.0, 0.1), 5);
    }

    #[test]
    fn test_rotation_at_ten_hz_two_seconds() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = SegmentWriter::new(dir.path(), "run", Some(samples_per_segment(10.0, 2.0)));

        for i in 0..20 {
            writer.write_sample(&bundle(i)).unwrap();
        }
        assert_eq!(line_count(&writer.segment_path(0)), 20);
        assert!(!writer.segment_path(1).exists());

        writer.write_sample(&bundle(20)).unwrap();
        writer.finish().unwrap();
        assert_eq!(line_count(&writer.segment_path(1)), 1);
        assert!(!writer.segment_path(2).exists());
    }

    #[test]
    fn test_unbounded_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = SegmentWriter::new(dir.path(), "flight", None);
        for i in 0..50 {
            writer.write_sample(&bundle(i)).unwrap();
        }
        writer.finish().unwrap();
        assert_eq!(line_count(&dir.path().join("flight_0.txt")), 50);
        assert!(!writer.segment_path(1).exists());
    }

    #[test]
    fn test_line_format_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = SegmentWriter::new(dir.path(), "fmt", None);
        let sample = SampleBundle {
            accelerometer: AxisReading { x: 1, y: 2, z: 3 },
            magnetometer: AxisReading { x: 7, y: 8, z: 9 },
            gyroscope: AxisReading { x: -4, y: -5, z: -6 },
        };
        writer.write_sample(&sample).unwrap();
        writer.finish().unwrap();
        let contents = fs::read_to_string(dir.path().join("fmt_0.txt")).unwrap();
        assert_eq!(contents, "Acc: 1 2 3 Gyr: -4 -5 -6 Mag: 7 8 9\n");
    }

    #[test]
    fn test_start_segment_creates_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = SegmentWriter::new(dir.path(), "early", Some(2));
        writer.start_segment().unwrap();
        assert_eq!(fs::read_to_string(writer.segment_path(0)).unwrap(), "");

        // already open, no truncation
        writer.write_sample(&bundle(1)).unwrap();
        writer.start_segment().unwrap();
        writer.write_sample(&bundle(2)).unwrap();
        assert_eq!(line_count(&writer.segment_path(0)), 2);
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = SegmentWriter::new(dir.path().join("nope"), "x", None);
        assert!(writer.write_sample(&bundle(0)).is_err());
    }
}
