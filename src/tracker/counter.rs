use tracing::{debug, info};

use crate::pose::Posture;
use crate::prayer::{Advance, Session};
use crate::tracker::events::{push_advance, TrackerEvent};

/// 安定姿勢の遷移からサジダとラカートを数える
///
/// `Prostrating` から `Sitting` / `Standing` へ移った時点でサジダ1回。
/// 同じラカートで2回目ならラカートを進める
pub struct TransitionCounter {
    previous: Posture,
}

impl TransitionCounter {
    pub fn new() -> Self {
        Self {
            previous: Posture::Unknown,
        }
    }

    pub fn previous(&self) -> Posture {
        self.previous
    }

    /// 遷移として受理したら `true`
    pub fn update(
        &mut self,
        session: &mut Session,
        posture: Posture,
        events: &mut Vec<TrackerEvent>,
    ) -> bool {
        if session.is_completed() || posture == self.previous || posture == Posture::Unknown {
            return false;
        }

        let previous = self.previous;
        debug!("posture {:?} -> {:?}", previous, posture);

        if previous == Posture::Prostrating
            && matches!(posture, Posture::Sitting | Posture::Standing)
        {
            record_sujood(session, events);
        }

        self.previous = posture;
        true
    }

    /// 手動操作: 姿勢入力なしでサジダを1回数える
    pub fn force_sujood(&mut self, session: &mut Session, events: &mut Vec<TrackerEvent>) {
        record_sujood(session, events);
    }

    /// 手動操作: 姿勢入力なしで現在のラカートを終える
    pub fn force_advance_rakat(&mut self, session: &mut Session, events: &mut Vec<TrackerEvent>) {
        if let Some(advance) = session.advance_rakat() {
            log_advance(advance);
            push_advance(events, advance, session.component_index());
        }
    }

    pub fn reset(&mut self) {
        self.previous = Posture::Unknown;
    }
}

impl Default for TransitionCounter {
    fn default() -> Self {
        Self::new()
    }
}

fn record_sujood(session: &mut Session, events: &mut Vec<TrackerEvent>) {
    let Some(record) = session.record_sujood() else {
        return;
    };
    debug!("sujood {}/2 in rakat", record.count);
    events.push(TrackerEvent::SujoodRecorded { count: record.count });
    if let Some(advance) = record.advance {
        log_advance(advance);
        push_advance(events, advance, session.component_index());
    }
}

fn log_advance(advance: Advance) {
    match advance {
        Advance::Rakat(rakat) => info!("rakat advanced to {}", rakat),
        Advance::Completed { rakat } => info!("component completed at rakat {}", rakat),
    }
}
