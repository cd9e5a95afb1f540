use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::io::{BufRead, BufReader};
use std::time::{Duration, Instant};

use crate::pose::{Frame, Landmark};

// --- データ構造 ---

/// 記録された1フレーム (JSON Lines の1行)
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RecordedFrame {
    /// 記録開始からの経過ミリ秒
    pub timestamp_ms: u64,
    pub landmarks: Vec<Landmark>,
}

impl RecordedFrame {
    /// `base` を記録開始時刻として扱う
    pub fn instant(&self, base: Instant) -> Instant {
        base + Duration::from_millis(self.timestamp_ms)
    }

    pub fn into_frame(self) -> Frame {
        Frame::new(self.landmarks)
    }
}

// --- Load ---

pub fn load_recording(path: &str) -> Result<Vec<RecordedFrame>> {
    let file = fs::File::open(path).context("Failed to open recording file")?;
    parse_recording(BufReader::new(file))
}

/// 空行は読み飛ばす。壊れた行は行番号付きでエラー
pub fn parse_recording<R: BufRead>(reader: R) -> Result<Vec<RecordedFrame>> {
    let mut frames = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line.context("Failed to read recording")?;
        if line.trim().is_empty() {
            continue;
        }
        let frame: RecordedFrame = serde_json::from_str(&line)
            .with_context(|| format!("Invalid frame on line {}", i + 1))?;
        frames.push(frame);
    }
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lines() {
        let input = r#"{"timestamp_ms": 0, "landmarks": [{"x": 0.5, "y": 0.2, "z": -0.1, "visibility": 0.9}]}

{"timestamp_ms": 33, "landmarks": [{"x": 0.4, "y": 0.3, "visibility": 0.8}]}
"#;
        let frames = parse_recording(input.as_bytes()).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].landmarks[0].z, -0.1);
        assert_eq!(frames[1].timestamp_ms, 33);
        assert_eq!(frames[1].landmarks[0].z, 0.0);
    }

    #[test]
    fn test_bad_line_reports_number() {
        let input = "{\"timestamp_ms\": 0, \"landmarks\": []}\nnot json\n";
        let err = parse_recording(input.as_bytes()).unwrap_err();
        assert!(format!("{:#}", err).contains("line 2"));
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("rakat-recording-{}.jsonl", std::process::id()));
        let landmark = r#"{"x": 0.5, "y": 0.25, "visibility": 0.75}"#;
        let landmarks = vec![landmark; 33].join(",");
        fs::write(&path, format!("{{\"timestamp_ms\": 40, \"landmarks\": [{}]}}\n", landmarks)).unwrap();
        let loaded = load_recording(path.to_str().unwrap());
        let _ = fs::remove_file(&path);
        let loaded = loaded.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].timestamp_ms, 40);
        let frame = loaded[0].clone().into_frame();
        assert!(frame.is_complete());
        assert_eq!(frame.landmarks[32], Landmark::new(0.5, 0.25, 0.75));
    }

    #[test]
    fn test_instant_offset() {
        let base = Instant::now();
        let frame = RecordedFrame { timestamp_ms: 1500, landmarks: Vec::new() };
        assert_eq!(frame.instant(base) - base, Duration::from_millis(1500));
        assert!(!frame.into_frame().is_complete());
    }
}
