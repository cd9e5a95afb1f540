use std::collections::VecDeque;

use crate::config::{TuningConfig, STABILITY_WINDOW_SLACK};
use crate::pose::Posture;

/// フレームごとの生の姿勢に対するスライディングウィンドウ多数決
///
/// 直近ウィンドウ内で `stability_frames` 回以上出た姿勢だけを安定姿勢とする。
/// 単発の誤検出では出力は変わらない
pub struct Stabilizer {
    stability_frames: usize,
    window: VecDeque<Posture>,
}

impl Stabilizer {
    pub fn new(stability_frames: usize) -> Self {
        let stability_frames = stability_frames.max(1);
        Self {
            stability_frames,
            window: VecDeque::with_capacity(stability_frames + STABILITY_WINDOW_SLACK),
        }
    }

    pub fn from_config(config: &TuningConfig) -> Self {
        Self::new(config.stability_frames)
    }

    pub fn capacity(&self) -> usize {
        self.stability_frames + STABILITY_WINDOW_SLACK
    }

    /// 次の入力から反映。ウィンドウは新しい方を残す
    pub fn set_stability_frames(&mut self, stability_frames: usize) {
        self.stability_frames = stability_frames.max(1);
        self.trim();
    }

    pub fn apply(&mut self, raw: Posture) -> Posture {
        self.window.push_back(raw);
        self.trim();
        self.majority()
    }

    fn trim(&mut self) {
        while self.window.len() > self.capacity() {
            self.window.pop_front();
        }
    }

    /// 古い順に走査。同数なら先にその数へ達した姿勢を採用
    fn majority(&self) -> Posture {
        let mut counts = [0usize; Posture::COUNT];
        let mut best = Posture::Unknown;
        let mut best_count = 0;
        for &posture in &self.window {
            let count = &mut counts[posture.index()];
            *count += 1;
            if *count > best_count {
                best_count = *count;
                best = posture;
            }
        }

        if best_count >= self.stability_frames {
            best
        } else {
            Posture::Unknown
        }
    }

    pub fn reset(&mut self) {
        self.window.clear();
    }
}
