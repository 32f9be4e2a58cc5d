// ============================================================
// Layer 4 — Gesture Recording Loader
// ============================================================
// Turns a directory tree of landmark recordings into one
// exactly-sized dataset of overlapping training windows.
//
// Expected layout (one sub-directory per gesture class, the
// class label is the position of the name in the gesture list):
//
//   data/
//     wave/         rec_001.csv  rec_002.csv ...
//     swipe_left/   rec_001.csv ...
//     swipe_right/  rec_001.csv ...
//
// Every non-empty line of a recording is one frame of F
// comma-separated values. Malformed or missing fields read as
// 0.0 instead of rejecting the whole file.
//
// Sliding-window augmentation:
//   A recording of N frames yields ⌊(N − T) / stride⌋ + 1
//   windows of T frames, starting at 0, stride, 2·stride, ...
//   Recordings shorter than T frames yield nothing.
//
// Why two passes?
//   The number of windows is unknown until every file has been
//   scanned, and the dataset must be a single contiguous buffer
//   reserved once at its exact final size:
//
//     Pass 1 — count frames per file, sum the window counts
//     reserve total × T × F floats (fails cleanly if it cannot)
//     Pass 2 — re-read each file and copy every window out
//
// Reference: Rust Book §9 (Error Handling)
//            Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use std::{
    fs,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use crate::data::dataset::WindowDataset;
use crate::domain::architecture::Architecture;
use crate::domain::error::TcnError;
use crate::domain::traits::WindowSource;

/// Step between consecutive window starts.
pub const DEFAULT_STRIDE: usize = 10;

/// Only files with this extension are treated as recordings.
const RECORDING_EXTENSION: &str = "csv";

/// Loads gesture recordings from `<root>/<gesture>/*.csv`.
pub struct GestureDirLoader {
    root: PathBuf,
    gestures: Vec<String>,
    arch: Architecture,
    stride: usize,
}

impl GestureDirLoader {
    pub fn new(root: impl Into<PathBuf>, gestures: Vec<String>, arch: Architecture, stride: usize) -> Self {
        Self { root: root.into(), gestures, arch, stride }
    }
}

impl WindowSource for GestureDirLoader {
    fn load_windows(&self) -> Result<WindowDataset> {
        if self.stride == 0 {
            return Err(TcnError::InvalidConfig("window stride must be at least 1".into()).into());
        }
        let seq_len = self.arch.seq_len;
        let features = self.arch.features;
        let window_len = self.arch.window_len();

        // ── Pass 1: count windows ─────────────────────────────────────────────
        // Remember which files qualified so pass 2 visits exactly the same set.
        let mut recordings: Vec<(usize, PathBuf)> = Vec::new();
        let mut total = 0usize;

        for (label, gesture) in self.gestures.iter().enumerate() {
            let dir = self.root.join(gesture);
            let files = match recording_files(&dir) {
                Ok(files) => files,
                Err(e) => {
                    tracing::warn!("Skipping gesture '{}': {:#}", gesture, e);
                    continue;
                }
            };

            for path in files {
                let frames = match count_frames(&path) {
                    Ok(n) => n,
                    Err(e) => {
                        tracing::warn!("Skipping '{}': {:#}", path.display(), e);
                        continue;
                    }
                };
                let windows = window_count(frames, seq_len, self.stride);
                if windows == 0 {
                    tracing::debug!(
                        "'{}' has {} frames, fewer than the window length {}",
                        path.display(),
                        frames,
                        seq_len
                    );
                    continue;
                }
                total += windows;
                recordings.push((label, path));
            }
        }

        if total == 0 {
            return Err(TcnError::NoData(self.root.clone()).into());
        }
        tracing::info!(
            "Generating {} windows from {} recordings (stride {})",
            total,
            recordings.len(),
            self.stride
        );

        // ── Exact-capacity allocation ─────────────────────────────────────────
        let requested = total
            .checked_mul(window_len)
            .ok_or(TcnError::AllocationFailed { requested: usize::MAX })?;
        let mut data: Vec<f32> = Vec::new();
        data.try_reserve_exact(requested)
            .map_err(|_| TcnError::AllocationFailed { requested })?;
        let mut labels: Vec<usize> = Vec::new();
        labels
            .try_reserve_exact(total)
            .map_err(|_| TcnError::AllocationFailed { requested: total })?;

        // ── Pass 2: copy windows ──────────────────────────────────────────────
        for (label, path) in &recordings {
            let frames = read_frames(path, features)?;
            let frame_count = frames.len() / features;

            let mut start = 0;
            while start + seq_len <= frame_count {
                data.extend_from_slice(&frames[start * features..(start + seq_len) * features]);
                labels.push(*label);
                start += self.stride;
            }
        }

        if labels.len() != total {
            tracing::warn!(
                "Recordings changed between passes: counted {} windows, built {}",
                total,
                labels.len()
            );
        }

        Ok(WindowDataset::from_parts(window_len, data, labels)?)
    }
}

/// Number of windows of `seq_len` frames a recording of `frames` frames yields.
pub fn window_count(frames: usize, seq_len: usize, stride: usize) -> usize {
    if frames < seq_len || stride == 0 {
        0
    } else {
        (frames - seq_len) / stride + 1
    }
}

/// Read every frame of a recording as frame-major values
/// (`frames × features` floats).
pub fn read_frames(path: &Path, features: usize) -> Result<Vec<f32>> {
    let mut values = Vec::new();
    for_each_frame_line(path, |line| parse_frame(line, features, &mut values))?;
    Ok(values)
}

/// Append exactly `features` values parsed from one CSV line.
/// Missing or unparsable fields become 0.0; extra fields are ignored.
pub fn parse_frame(line: &str, features: usize, out: &mut Vec<f32>) {
    let mut fields = line.split(',');
    for _ in 0..features {
        let value = fields
            .next()
            .and_then(|field| field.trim().parse::<f32>().ok())
            .unwrap_or(0.0);
        out.push(value);
    }
}

/// Recording files of one gesture directory, sorted by name so that
/// both passes and repeated runs see the same order.
fn recording_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)
        .with_context(|| format!("Cannot read directory '{}'", dir.display()))?
    {
        let path = entry?.path();
        if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some(RECORDING_EXTENSION) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Count the frames (non-empty lines) of a recording.
fn count_frames(path: &Path) -> Result<usize> {
    let mut count = 0;
    for_each_frame_line(path, |_| count += 1)?;
    Ok(count)
}

/// Call `f` with every non-empty line of a recording. Bytes that are not
/// valid UTF-8 are replaced, so they fail to parse and read as 0.0.
fn for_each_frame_line(path: &Path, mut f: impl FnMut(&str)) -> Result<()> {
    let file = fs::File::open(path)
        .with_context(|| format!("Cannot open recording '{}'", path.display()))?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let read = reader
            .read_until(b'\n', &mut buf)
            .with_context(|| format!("Cannot read '{}'", path.display()))?;
        if read == 0 {
            return Ok(());
        }
        let line = String::from_utf8_lossy(&buf);
        if !line.trim().is_empty() {
            f(&line);
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn arch(features: usize, seq_len: usize) -> Architecture {
        Architecture::new(features, seq_len, 2, 3, 2, 1).unwrap()
    }

    /// Write `frames` lines of `features` values; frame i holds i, i+0.5, ...
    fn write_recording(dir: &Path, name: &str, frames: usize, features: usize) {
        fs::create_dir_all(dir).unwrap();
        let mut f = fs::File::create(dir.join(name)).unwrap();
        for i in 0..frames {
            let row: Vec<String> = (0..features).map(|j| format!("{}", i as f32 + j as f32 * 0.5)).collect();
            writeln!(f, "{}", row.join(",")).unwrap();
        }
    }

    fn gestures() -> Vec<String> {
        vec!["wave".to_string(), "swipe".to_string()]
    }

    #[test]
    fn test_window_count_examples() {
        assert_eq!(window_count(100, 20, 5), 17);
        assert_eq!(window_count(15, 20, 5), 0);
        assert_eq!(window_count(20, 20, 5), 1);
    }

    #[test]
    fn test_loads_windows_with_labels() {
        let root = tempfile::tempdir().unwrap();
        write_recording(&root.path().join("wave"), "a.csv", 12, 2);
        write_recording(&root.path().join("swipe"), "b.csv", 5, 2);
        // Not a recording: wrong extension
        write_recording(&root.path().join("swipe"), "notes.txt", 50, 2);

        let loader = GestureDirLoader::new(root.path(), gestures(), arch(2, 4), 4);
        let ds = loader.load_windows().unwrap();

        // wave: (12 - 4) / 4 + 1 = 3, swipe: (5 - 4) / 4 + 1 = 1
        assert_eq!(ds.len(), 4);
        assert_eq!(ds.labels(), &[0, 0, 0, 1]);

        // Second wave window starts at frame 4
        let s = ds.sample(1);
        assert_eq!(s.frames.len(), 8);
        assert_eq!(s.frames[0], 4.0);
        assert_eq!(s.frames[1], 4.5);
        assert_eq!(s.frames[7], 7.5);
    }

    #[test]
    fn test_short_recordings_give_no_data() {
        let root = tempfile::tempdir().unwrap();
        write_recording(&root.path().join("wave"), "a.csv", 3, 2);

        let loader = GestureDirLoader::new(root.path(), gestures(), arch(2, 4), 1);
        let err = loader.load_windows().unwrap_err();
        assert!(matches!(err.downcast_ref::<TcnError>(), Some(TcnError::NoData(_))));
    }

    #[test]
    fn test_missing_gesture_directory_is_skipped() {
        let root = tempfile::tempdir().unwrap();
        write_recording(&root.path().join("swipe"), "b.csv", 6, 2);

        let loader = GestureDirLoader::new(root.path(), gestures(), arch(2, 4), 1);
        let ds = loader.load_windows().unwrap();
        assert_eq!(ds.len(), 3);
        assert!(ds.labels().iter().all(|&l| l == 1));
    }

    #[test]
    fn test_zero_stride_is_rejected() {
        let root = tempfile::tempdir().unwrap();
        let loader = GestureDirLoader::new(root.path(), gestures(), arch(2, 4), 0);
        let err = loader.load_windows().unwrap_err();
        assert!(matches!(err.downcast_ref::<TcnError>(), Some(TcnError::InvalidConfig(_))));
    }

    #[test]
    fn test_malformed_fields_default_to_zero() {
        let mut out = Vec::new();
        parse_frame("1.5, abc,,2", 5, &mut out);
        assert_eq!(out, vec![1.5, 0.0, 0.0, 2.0, 0.0]);
    }

    #[test]
    fn test_invalid_utf8_field_reads_as_zero() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("wave");
        fs::create_dir_all(&dir).unwrap();
        let mut bytes = b"0,0\n1.0,\xff\xfe\n".to_vec();
        bytes.extend_from_slice(b"2,2\n3,3\n4,4\n5,5\n");
        fs::write(dir.join("a.csv"), bytes).unwrap();

        let loader = GestureDirLoader::new(root.path(), gestures(), arch(2, 4), 1);
        let ds = loader.load_windows().unwrap();
        assert_eq!(ds.len(), 3);
        assert_eq!(&ds.sample(0).frames[2..4], &[1.0, 0.0]);
    }

    #[test]
    fn test_extra_fields_are_ignored() {
        let mut out = Vec::new();
        parse_frame("1,2,3,4", 2, &mut out);
        assert_eq!(out, vec![1.0, 2.0]);
    }

    #[test]
    fn test_blank_lines_are_not_frames() {
        let root = tempfile::tempdir().unwrap();
        let path = root.path().join("r.csv");
        fs::write(&path, "1,2\n\n3,4\n   \n").unwrap();
        assert_eq!(count_frames(&path).unwrap(), 2);
        assert_eq!(read_frames(&path, 2).unwrap(), vec![1.0, 2.0, 3.0, 4.0]);
    }
}
