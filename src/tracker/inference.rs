//! 姿勢タイムラインとカウント進捗の突き合わせ（ヒューリスティック補正）
//!
//! 誤分類や安定化で姿勢が抜けると遷移カウントは取りこぼす。
//! 直近のタイムラインからサジダ2回やサラームの見落としを推定し、カウンタを前に進める。
//! 補正で進捗が減ることはない

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use tracing::info;

use crate::config::InferenceConfig;
use crate::pose::Posture;
use crate::prayer::{Advance, Session};
use crate::tracker::events::{push_advance, CorrectionReason, TrackerEvent};

/// タイムライン上の安定姿勢変化1件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionEvent {
    pub posture: Posture,
    pub timestamp: Instant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferenceLogEntry {
    pub message: String,
    pub timestamp: Instant,
}

pub struct InferenceEngine {
    config: InferenceConfig,
    timeline: VecDeque<PositionEvent>,
    log: VecDeque<InferenceLogEntry>,
    auto_corrections: u32,
    /// 楽観的なラカート推定値。Prostrating への遷移2回ごとに+1
    expected_rakat: u32,
    prostration_entries: u8,
    previous: Posture,
    right_gesture_seen: bool,
    sitting_since: Option<Instant>,
    extended_sit_noted: bool,
    last_correction: Option<Instant>,
}

impl InferenceEngine {
    pub fn new(config: InferenceConfig) -> Self {
        Self {
            config,
            timeline: VecDeque::with_capacity(config.timeline_capacity),
            log: VecDeque::with_capacity(config.log_capacity),
            auto_corrections: 0,
            expected_rakat: 1,
            prostration_entries: 0,
            previous: Posture::Unknown,
            right_gesture_seen: false,
            sitting_since: None,
            extended_sit_noted: false,
            last_correction: None,
        }
    }

    pub fn timeline(&self) -> impl Iterator<Item = &PositionEvent> {
        self.timeline.iter()
    }

    pub fn log(&self) -> impl Iterator<Item = &InferenceLogEntry> {
        self.log.iter()
    }

    pub fn auto_corrections(&self) -> u32 {
        self.auto_corrections
    }

    pub fn expected_rakat(&self) -> u32 {
        self.expected_rakat
    }

    /// 安定姿勢の変化を追加。満杯なら最古を捨てる
    pub fn record(&mut self, posture: Posture, timestamp: Instant) {
        self.track_sitting(posture, timestamp);
        if self.config.timeline_capacity == 0 {
            return;
        }
        while self.timeline.len() >= self.config.timeline_capacity {
            self.timeline.pop_front();
        }
        self.timeline.push_back(PositionEvent { posture, timestamp });
    }

    /// カウンタが `posture` を受理した後に規則を評価
    pub fn evaluate(
        &mut self,
        session: &mut Session,
        posture: Posture,
        now: Instant,
        events: &mut Vec<TrackerEvent>,
    ) {
        let previous = self.previous;
        self.previous = posture;
        if session.is_completed() {
            return;
        }

        self.track_expectation(session, posture);

        if self.terminal_gesture(session, posture, now, events) {
            return;
        }
        if !self.in_cooldown(now) {
            if previous == Posture::Sitting && posture == Posture::Standing {
                self.stand_after_sit(session, now, events);
            } else if posture == Posture::Sitting {
                self.sit_stand_sit(session, now, events);
            }
        }
        self.extended_sitting(session, now, events);
    }

    /// 時間経過による判定。処理フレームごとに呼ぶ
    pub fn tick(&mut self, session: &Session, now: Instant, events: &mut Vec<TrackerEvent>) {
        if !session.is_completed() {
            self.extended_sitting(session, now, events);
        }
    }

    pub fn reset(&mut self) {
        self.timeline.clear();
        self.log.clear();
        self.auto_corrections = 0;
        self.expected_rakat = 1;
        self.prostration_entries = 0;
        self.previous = Posture::Unknown;
        self.right_gesture_seen = false;
        self.sitting_since = None;
        self.extended_sit_noted = false;
        self.last_correction = None;
    }

    fn track_expectation(&mut self, session: &Session, posture: Posture) {
        let total = session.total_rakats();
        self.expected_rakat = self.expected_rakat.max(session.current_rakat()).min(total);
        if posture == Posture::Prostrating {
            self.prostration_entries += 1;
            if self.prostration_entries >= 2 {
                self.prostration_entries = 0;
                self.expected_rakat = (self.expected_rakat + 1).min(total);
            }
        }
    }

    /// Unknown も着座の中断として扱う
    fn track_sitting(&mut self, posture: Posture, now: Instant) {
        if posture == Posture::Sitting {
            if self.sitting_since.is_none() {
                self.sitting_since = Some(now);
                self.extended_sit_noted = false;
            }
        } else {
            self.sitting_since = None;
        }
    }

    fn in_cooldown(&self, now: Instant) -> bool {
        let cooldown = Duration::from_millis(self.config.correction_cooldown_ms);
        self.last_correction
            .is_some_and(|t| now.saturating_duration_since(t) < cooldown)
    }

    /// 右→左のサラームで構成要素を終了
    fn terminal_gesture(
        &mut self,
        session: &mut Session,
        posture: Posture,
        now: Instant,
        events: &mut Vec<TrackerEvent>,
    ) -> bool {
        match posture {
            Posture::TerminalGestureRight => {
                self.right_gesture_seen = true;
                false
            }
            Posture::TerminalGestureLeft if self.right_gesture_seen => {
                let total = session.total_rakats();
                let skipped = session.jump_to_rakat(total);
                if skipped > 0 {
                    self.apply_correction(CorrectionReason::TerminalGesture, skipped, now, events);
                }
                if session.complete() {
                    push_advance(events, Advance::Completed { rakat: total }, session.component_index());
                    self.push_log(
                        format!("Salam detected, {} complete ({} rakats)", session.component().label, total),
                        now,
                        events,
                    );
                }
                true
            }
            _ => false,
        }
    }

    fn stand_after_sit(&mut self, session: &mut Session, now: Instant, events: &mut Vec<TrackerEvent>) {
        let current = session.current_rakat();
        if current >= self.expected_rakat {
            return;
        }
        if session.jump_to_rakat(self.expected_rakat) == 0 {
            return;
        }
        self.apply_correction(CorrectionReason::StandAfterSit, 1, now, events);
        events.push(TrackerEvent::RakatAdvanced { rakat: session.current_rakat() });
        self.push_log(
            format!("Stood after sitting, rakat {} -> {}", current, session.current_rakat()),
            now,
            events,
        );
    }

    fn sit_stand_sit(&mut self, session: &mut Session, now: Instant, events: &mut Vec<TrackerEvent>) {
        if session.sujood_in_rakat() != 1 {
            return;
        }
        let mut recent: Vec<Posture> = self
            .timeline
            .iter()
            .rev()
            .map(|e| e.posture)
            .filter(|p| p.is_known())
            .take(self.config.pattern_window)
            .collect();
        recent.reverse();
        if !ends_with_sit_stand_sit(&recent) {
            return;
        }

        let current = session.current_rakat();
        if session.jump_to_rakat(current + 1) == 0 {
            return;
        }
        self.expected_rakat = self.expected_rakat.max(session.current_rakat());
        self.prostration_entries = 0;
        self.apply_correction(CorrectionReason::SitStandSit, 1, now, events);
        events.push(TrackerEvent::RakatAdvanced { rakat: session.current_rakat() });
        self.push_log(
            format!("Sit-stand-sit with one sujood, rakat {} -> {}", current, session.current_rakat()),
            now,
            events,
        );
    }

    /// ログのみ: 最終ラカートでの長い着座は最後のタシャッフドとみなす
    fn extended_sitting(&mut self, session: &Session, now: Instant, events: &mut Vec<TrackerEvent>) {
        if self.extended_sit_noted || !session.is_final_rakat() || session.sujood_in_rakat() != 1 {
            return;
        }
        let Some(since) = self.sitting_since else {
            return;
        };
        let limit = Duration::try_from_secs_f32(self.config.extended_sit_secs.max(0.0))
            .unwrap_or(Duration::MAX);
        if now.saturating_duration_since(since) > limit {
            self.extended_sit_noted = true;
            self.push_log(
                format!(
                    "Sitting for over {:.0}s on final rakat, likely final tashahhud",
                    self.config.extended_sit_secs
                ),
                now,
                events,
            );
        }
    }

    fn apply_correction(
        &mut self,
        reason: CorrectionReason,
        count: u32,
        now: Instant,
        events: &mut Vec<TrackerEvent>,
    ) {
        self.auto_corrections += count;
        self.last_correction = Some(now);
        info!("auto-correction x{}: {}", count, reason.description());
        events.push(TrackerEvent::CorrectionApplied { reason, count });
    }

    fn push_log(&mut self, message: String, now: Instant, events: &mut Vec<TrackerEvent>) {
        info!("{}", message);
        if self.config.log_capacity > 0 {
            while self.log.len() >= self.config.log_capacity {
                self.log.pop_front();
            }
            self.log.push_back(InferenceLogEntry { message: message.clone(), timestamp: now });
        }
        events.push(TrackerEvent::InferenceLogged { message, timestamp: now });
    }
}

impl Default for InferenceEngine {
    fn default() -> Self {
        Self::new(InferenceConfig::default())
    }
}

/// 最新エントリで終わる Sitting → Standing → Sitting（間に Prostrating を含まない）
fn ends_with_sit_stand_sit(recent: &[Posture]) -> bool {
    let Some((&last, rest)) = recent.split_last() else {
        return false;
    };
    if last != Posture::Sitting {
        return false;
    }
    let mut seen_standing = false;
    for &p in rest.iter().rev() {
        match p {
            Posture::Prostrating => return false,
            Posture::Standing => seen_standing = true,
            Posture::Sitting if seen_standing => return true,
            _ => {}
        }
    }
    false
}
