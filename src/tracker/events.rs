use std::time::Instant;

use crate::pose::Posture;
use crate::prayer::Advance;

/// 推論による補正の理由
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CorrectionReason {
    /// 最終ラカートを数える前に右→左のサラームを検出
    TerminalGesture,
    /// 期待ラカートより遅れた状態で着座から起立
    StandAfterSit,
    /// サジダ1回のまま 座る→立つ→座る
    SitStandSit,
}

impl CorrectionReason {
    pub fn description(self) -> &'static str {
        match self {
            CorrectionReason::TerminalGesture => "salam detected, completing prayer",
            CorrectionReason::StandAfterSit => "stood after sitting, advancing to expected rakat",
            CorrectionReason::SitStandSit => "sit-stand-sit pattern, assuming missed sujood",
        }
    }
}

/// フレーム処理・操作で発行されるイベント
#[derive(Debug, Clone, PartialEq)]
pub enum TrackerEvent {
    PostureChanged { posture: Posture, confidence: u8 },
    SujoodRecorded { count: u8 },
    /// 最終ラカートでは `rakat` は目標値のままで、
    /// 続けて `ComponentCompleted` が出る
    RakatAdvanced { rakat: u32 },
    ComponentCompleted { component_index: usize },
    CorrectionApplied { reason: CorrectionReason, count: u32 },
    InferenceLogged { message: String, timestamp: Instant },
}

pub(crate) fn push_advance(events: &mut Vec<TrackerEvent>, advance: Advance, component_index: usize) {
    match advance {
        Advance::Rakat(rakat) => events.push(TrackerEvent::RakatAdvanced { rakat }),
        Advance::Completed { rakat } => {
            events.push(TrackerEvent::RakatAdvanced { rakat });
            events.push(TrackerEvent::ComponentCompleted { component_index });
        }
    }
}
