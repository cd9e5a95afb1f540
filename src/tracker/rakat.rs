use std::time::Instant;

use anyhow::Result;
use tracing::{debug, info};

use crate::config::{Config, TuningConfig};
use crate::pose::{classify_with, Classification, Frame, Posture, Thresholds};
use crate::prayer::{PrayerDefinition, Session};
use crate::tracker::counter::TransitionCounter;
use crate::tracker::events::TrackerEvent;
use crate::tracker::inference::{InferenceEngine, InferenceLogEntry, PositionEvent};
use crate::tracker::stabilizer::Stabilizer;

/// フレーム駆動のカウントセッション
///
/// [`RakatTracker::process_frame`] は 分類 → 安定化 → カウント → 推論 を
/// 完了してから返る。一時停止中のフレームは破棄する
pub struct RakatTracker {
    tuning: TuningConfig,
    thresholds: Thresholds,
    stabilizer: Stabilizer,
    counter: TransitionCounter,
    inference: InferenceEngine,
    session: Option<Session>,
    tracking: bool,
    stable: Posture,
    confidence: u8,
}

impl RakatTracker {
    pub fn new(config: &Config) -> Self {
        let tuning = config.tuning.clamped();
        Self {
            tuning,
            thresholds: Thresholds::from_tuning(&tuning),
            stabilizer: Stabilizer::from_config(&tuning),
            counter: TransitionCounter::new(),
            inference: InferenceEngine::new(config.inference),
            session: None,
            tracking: false,
            stable: Posture::Unknown,
            confidence: 0,
        }
    }

    pub fn tuning(&self) -> &TuningConfig {
        &self.tuning
    }

    /// 次のフレームから反映。安定化ウィンドウは保持
    pub fn set_tuning(&mut self, tuning: TuningConfig) {
        let tuning = tuning.clamped();
        self.tuning = tuning;
        self.thresholds = Thresholds::from_tuning(&tuning);
        self.stabilizer.set_stability_frames(tuning.stability_frames);
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn stable_posture(&self) -> Posture {
        self.stable
    }

    pub fn confidence(&self) -> u8 {
        self.confidence
    }

    pub fn is_tracking(&self) -> bool {
        self.tracking
    }

    pub fn auto_corrections(&self) -> u32 {
        self.inference.auto_corrections()
    }

    pub fn inference_log(&self) -> impl Iterator<Item = &InferenceLogEntry> {
        self.inference.log()
    }

    pub fn timeline(&self) -> impl Iterator<Item = &PositionEvent> {
        self.inference.timeline()
    }

    /// `definition[index]` のカウントを開始（トラッキング有効）
    pub fn start_component(&mut self, definition: PrayerDefinition, index: usize) -> Result<()> {
        let session = Session::start(definition, index)?;
        info!(
            "start component {} ({}, {} rakats)",
            index,
            session.component().label,
            session.total_rakats()
        );
        self.session = Some(session);
        self.clear_tracking_state();
        self.tracking = true;
        Ok(())
    }

    /// 次の構成要素がなければ `false`
    pub fn advance_to_next_component(&mut self) -> bool {
        let Some(next) = self.session.as_ref().and_then(Session::next_component) else {
            return false;
        };
        info!("advance to component {} ({})", next.component_index(), next.component().label);
        self.session = Some(next);
        self.clear_tracking_state();
        self.tracking = true;
        true
    }

    pub fn reset_current_component(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.reset();
            info!("component {} reset", session.component_index());
        }
        self.clear_tracking_state();
    }

    pub fn pause_tracking(&mut self) {
        self.tracking = false;
    }

    /// セッションなし・完了後は何もしない
    pub fn resume_tracking(&mut self) {
        self.tracking = self.session.as_ref().is_some_and(|s| !s.is_completed());
    }

    /// セッションを終了し最終状態を返す
    pub fn stop(&mut self) -> Option<Session> {
        self.tracking = false;
        self.clear_tracking_state();
        self.session.take()
    }

    /// 手動操作。一時停止中も有効
    pub fn force_sujood(&mut self) -> Vec<TrackerEvent> {
        let mut events = Vec::new();
        if let Some(session) = self.session.as_mut() {
            self.counter.force_sujood(session, &mut events);
        }
        self.halt_if_completed();
        events
    }

    /// 手動操作。一時停止中も有効
    pub fn force_advance_rakat(&mut self) -> Vec<TrackerEvent> {
        let mut events = Vec::new();
        if let Some(session) = self.session.as_mut() {
            self.counter.force_advance_rakat(session, &mut events);
        }
        self.halt_if_completed();
        events
    }

    pub fn process_frame(&mut self, frame: &Frame, now: Instant) -> Vec<TrackerEvent> {
        if !self.tracking {
            return Vec::new();
        }
        let classification = classify_with(frame, &self.thresholds);
        self.process_classification(classification, now)
    }

    /// 分類済みの結果を入力する（呼び出し側で分類する場合）
    pub fn process_classification(
        &mut self,
        classification: Classification,
        now: Instant,
    ) -> Vec<TrackerEvent> {
        let mut events = Vec::new();
        if !self.tracking {
            return events;
        }
        let Some(session) = self.session.as_mut() else {
            return events;
        };

        self.confidence = classification.confidence;
        let stable = self.stabilizer.apply(classification.posture);
        if stable != self.stable {
            self.stable = stable;
            self.inference.record(stable, now);
            if self.counter.update(session, stable, &mut events) {
                debug!("stable posture {:?} ({}%)", stable, classification.confidence);
                events.insert(
                    0,
                    TrackerEvent::PostureChanged { posture: stable, confidence: classification.confidence },
                );
                self.inference.evaluate(session, stable, now, &mut events);
            }
        }
        self.inference.tick(session, now, &mut events);

        self.halt_if_completed();
        events
    }

    fn halt_if_completed(&mut self) {
        if self.session.as_ref().is_some_and(Session::is_completed) {
            self.tracking = false;
        }
    }

    fn clear_tracking_state(&mut self) {
        self.stabilizer.reset();
        self.counter.reset();
        self.inference.reset();
        self.stable = Posture::Unknown;
        self.confidence = 0;
    }
}
