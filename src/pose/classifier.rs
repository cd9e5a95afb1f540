//! 1フレームの姿勢分類
//!
//! 座標は画像正規化なので `y` が大きいほど画面下。
//! 規則は上から順に評価し最初に一致したものを採用する。
//! 幾何的に重なる姿勢（浅いルクーは着座の条件も満たしうる）はこの順序で区別する

use crate::config::TuningConfig;
use crate::pose::{Frame, LandmarkIndex, Posture};

/// フレームの信頼性判定に使うランドマーク
const ANCHOR_LANDMARKS: [LandmarkIndex; 5] = [
    LandmarkIndex::Nose,
    LandmarkIndex::LeftShoulder,
    LandmarkIndex::RightShoulder,
    LandmarkIndex::LeftHip,
    LandmarkIndex::RightHip,
];

const PROSTRATION_MARGIN_CONSERVATIVE: f32 = 0.10;
const PROSTRATION_MARGIN_PERMISSIVE: f32 = 0.02;
const BOWING_MARGIN_CONSERVATIVE: f32 = 0.10;
const BOWING_MARGIN_PERMISSIVE: f32 = 0.20;
const MIN_VISIBILITY_CONSERVATIVE: f32 = 0.5;
const MIN_VISIBILITY_PERMISSIVE: f32 = 0.3;
const SITTING_MARGIN: f32 = 0.10;
const TERMINAL_NOSE_OFFSET: f32 = 0.06;
const TERMINAL_EAR_SPREAD: f32 = 0.05;

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// [`TuningConfig`] から導出するしきい値
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub min_visibility: f32,
    pub prostration_margin: f32,
    pub bowing_margin: f32,
    pub sitting_margin: f32,
    pub terminal_nose_offset: f32,
    pub terminal_ear_spread: f32,
}

impl Thresholds {
    /// 感度 20 (保守的) 〜 80 (寛容) で線形補間
    pub fn from_tuning(tuning: &TuningConfig) -> Self {
        let t = tuning.sensitivity_factor();
        Self {
            min_visibility: lerp(MIN_VISIBILITY_CONSERVATIVE, MIN_VISIBILITY_PERMISSIVE, t),
            prostration_margin: lerp(
                PROSTRATION_MARGIN_CONSERVATIVE,
                PROSTRATION_MARGIN_PERMISSIVE,
                t,
            ),
            bowing_margin: lerp(BOWING_MARGIN_CONSERVATIVE, BOWING_MARGIN_PERMISSIVE, t),
            sitting_margin: SITTING_MARGIN,
            terminal_nose_offset: TERMINAL_NOSE_OFFSET,
            terminal_ear_spread: TERMINAL_EAR_SPREAD,
        }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self::from_tuning(&TuningConfig::default())
    }
}

/// 1フレーム分の縦横の集約値
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyGeometry {
    pub nose_x: f32,
    pub nose_y: f32,
    pub shoulder_x: f32,
    pub shoulder_y: f32,
    pub hip_y: f32,
    pub knee_y: f32,
    pub ear_spread: f32,
}

impl BodyGeometry {
    pub fn from_frame(frame: &Frame) -> Option<Self> {
        use LandmarkIndex::*;
        let nose = frame.get(Nose)?;
        let ls = frame.get(LeftShoulder)?;
        let rs = frame.get(RightShoulder)?;
        let lh = frame.get(LeftHip)?;
        let rh = frame.get(RightHip)?;
        let lk = frame.get(LeftKnee)?;
        let rk = frame.get(RightKnee)?;
        let le = frame.get(LeftEar)?;
        let re = frame.get(RightEar)?;

        if ![nose, ls, rs, lh, rh, lk, rk, le, re].iter().all(|l| l.is_finite()) {
            return None;
        }

        Some(Self {
            nose_x: nose.x,
            nose_y: nose.y,
            shoulder_x: (ls.x + rs.x) / 2.0,
            shoulder_y: (ls.y + rs.y) / 2.0,
            hip_y: (lh.y + rh.y) / 2.0,
            knee_y: (lk.y + rk.y) / 2.0,
            ear_spread: (le.x - re.x).abs(),
        })
    }
}

/// 優先度表の1エントリ
pub struct Rule {
    pub name: &'static str,
    pub check: fn(&BodyGeometry, &Thresholds) -> Option<Posture>,
}

/// 優先度順の分類規則
pub const RULES: [Rule; 5] = [
    Rule { name: "terminal_gesture", check: terminal_gesture },
    Rule { name: "prostrating", check: prostrating },
    Rule { name: "bowing", check: bowing },
    Rule { name: "sitting", check: sitting },
    Rule { name: "standing", check: standing },
];

/// 顔を横に向け、両耳が重なった状態
/// 鼻のオフセットが負（画像左）なら本人の右（前面カメラ、ミラーなし）
fn terminal_gesture(g: &BodyGeometry, th: &Thresholds) -> Option<Posture> {
    if g.ear_spread >= th.terminal_ear_spread {
        return None;
    }
    let offset = g.nose_x - g.shoulder_x;
    if offset < -th.terminal_nose_offset {
        Some(Posture::TerminalGestureRight)
    } else if offset > th.terminal_nose_offset {
        Some(Posture::TerminalGestureLeft)
    } else {
        None
    }
}

fn prostrating(g: &BodyGeometry, th: &Thresholds) -> Option<Posture> {
    (g.nose_y > g.hip_y + th.prostration_margin).then_some(Posture::Prostrating)
}

fn bowing(g: &BodyGeometry, th: &Thresholds) -> Option<Posture> {
    let back_flat = (g.shoulder_y - g.hip_y).abs() < th.bowing_margin;
    (back_flat && g.nose_y >= g.shoulder_y).then_some(Posture::Bowing)
}

fn sitting(g: &BodyGeometry, th: &Thresholds) -> Option<Posture> {
    let hips_on_knees = (g.hip_y - g.knee_y).abs() < th.sitting_margin;
    (hips_on_knees && g.nose_y < g.hip_y).then_some(Posture::Sitting)
}

fn standing(g: &BodyGeometry, _th: &Thresholds) -> Option<Posture> {
    let upright = g.nose_y < g.shoulder_y && g.shoulder_y < g.hip_y && g.hip_y < g.knee_y;
    upright.then_some(Posture::Standing)
}

/// 分類結果: 姿勢と基準点の可視性（%）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Classification {
    pub posture: Posture,
    /// 可視性を測る前に棄却したフレームは 0
    pub confidence: u8,
}

impl Classification {
    pub fn unknown() -> Self {
        Self::default()
    }
}

/// 1フレームを分類する。`frame` と `tuning` の純関数
pub fn classify(frame: &Frame, tuning: &TuningConfig) -> Classification {
    classify_with(frame, &Thresholds::from_tuning(tuning))
}

pub fn classify_with(frame: &Frame, thresholds: &Thresholds) -> Classification {
    if !frame.is_complete() {
        return Classification::unknown();
    }

    let visibility = frame.average_visibility(&ANCHOR_LANDMARKS);
    if !visibility.is_finite() {
        return Classification::unknown();
    }
    let confidence = (visibility * 100.0).round().clamp(0.0, 100.0) as u8;

    if visibility < thresholds.min_visibility {
        return Classification { posture: Posture::Unknown, confidence };
    }

    let posture = BodyGeometry::from_frame(frame)
        .and_then(|g| RULES.iter().find_map(|rule| (rule.check)(&g, thresholds)))
        .unwrap_or(Posture::Unknown);

    Classification { posture, confidence }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::pose::Landmark;

    /// テスト用フレームを組み立てる合成ボディ
    #[derive(Clone, Copy)]
    pub(crate) struct Body {
        pub nose: (f32, f32),
        pub shoulder_y: f32,
        pub hip_y: f32,
        pub knee_y: f32,
        pub ears_x: (f32, f32),
        pub visibility: f32,
    }

    impl Body {
        pub fn frame(&self) -> Frame {
            use LandmarkIndex::*;
            let mut landmarks = vec![Landmark::new(0.5, 0.5, self.visibility); LandmarkIndex::COUNT];
            let mut set = |i: LandmarkIndex, x: f32, y: f32| {
                landmarks[i as usize] = Landmark::new(x, y, self.visibility);
            };
            set(Nose, self.nose.0, self.nose.1);
            set(LeftShoulder, 0.58, self.shoulder_y);
            set(RightShoulder, 0.42, self.shoulder_y);
            set(LeftHip, 0.55, self.hip_y);
            set(RightHip, 0.45, self.hip_y);
            set(LeftKnee, 0.55, self.knee_y);
            set(RightKnee, 0.45, self.knee_y);
            set(LeftEar, self.ears_x.0, self.nose.1 - 0.01);
            set(RightEar, self.ears_x.1, self.nose.1 - 0.01);
            Frame::new(landmarks)
        }
    }

    pub(crate) fn standing_body() -> Body {
        Body {
            nose: (0.5, 0.15),
            shoulder_y: 0.30,
            hip_y: 0.55,
            knee_y: 0.75,
            ears_x: (0.54, 0.46),
            visibility: 0.9,
        }
    }

    pub(crate) fn bowing_body() -> Body {
        Body { nose: (0.5, 0.52), shoulder_y: 0.45, hip_y: 0.50, ..standing_body() }
    }

    pub(crate) fn prostrating_body() -> Body {
        Body { nose: (0.5, 0.80), shoulder_y: 0.70, hip_y: 0.55, knee_y: 0.80, ..standing_body() }
    }

    pub(crate) fn sitting_body() -> Body {
        Body { nose: (0.5, 0.35), shoulder_y: 0.50, hip_y: 0.75, knee_y: 0.78, ..standing_body() }
    }

    pub(crate) fn salam_right_body() -> Body {
        Body { nose: (0.40, 0.35), ears_x: (0.47, 0.50), ..sitting_body() }
    }

    pub(crate) fn salam_left_body() -> Body {
        Body { nose: (0.60, 0.35), ears_x: (0.53, 0.50), ..sitting_body() }
    }

    pub(crate) fn frame_for(posture: Posture) -> Frame {
        match posture {
            Posture::Standing => standing_body().frame(),
            Posture::Bowing => bowing_body().frame(),
            Posture::Prostrating => prostrating_body().frame(),
            Posture::Sitting => sitting_body().frame(),
            Posture::TerminalGestureRight => salam_right_body().frame(),
            Posture::TerminalGestureLeft => salam_left_body().frame(),
            Posture::Unknown => Frame::new(Vec::new()),
        }
    }

    fn classify_default(frame: &Frame) -> Posture {
        classify(frame, &TuningConfig::default()).posture
    }

    #[test]
    fn test_each_posture() {
        for posture in Posture::ALL {
            assert_eq!(classify_default(&frame_for(posture)), posture, "{:?}", posture);
        }
    }

    #[test]
    fn test_short_frame_is_unknown() {
        let frame = Frame::new(vec![Landmark::new(0.5, 0.5, 1.0); 32]);
        let result = classify(&frame, &TuningConfig::default());
        assert_eq!(result.posture, Posture::Unknown);
        assert_eq!(result.confidence, 0);
    }

    #[test]
    fn test_low_visibility_is_unknown_but_reports_confidence() {
        let body = Body { visibility: 0.2, ..standing_body() };
        let result = classify(&body.frame(), &TuningConfig::default());
        assert_eq!(result.posture, Posture::Unknown);
        assert_eq!(result.confidence, 20);
    }

    #[test]
    fn test_confidence_is_rounded_percentage() {
        let body = Body { visibility: 0.876, ..standing_body() };
        let result = classify(&body.frame(), &TuningConfig::default());
        assert_eq!(result.confidence, 88);
    }

    #[test]
    fn test_non_finite_is_unknown() {
        let mut frame = standing_body().frame();
        frame.landmarks[LandmarkIndex::LeftKnee as usize].y = f32::NAN;
        assert_eq!(classify_default(&frame), Posture::Unknown);
    }

    #[test]
    fn test_terminal_gesture_preempts_sitting() {
        let frame = salam_right_body().frame();
        let g = BodyGeometry::from_frame(&frame).unwrap();
        let th = Thresholds::default();
        assert_eq!(sitting(&g, &th), Some(Posture::Sitting));
        assert_eq!(classify_default(&frame), Posture::TerminalGestureRight);
    }

    #[test]
    fn test_head_offset_with_wide_ears_is_not_gesture() {
        let body = Body { nose: (0.40, 0.35), ears_x: (0.55, 0.45), ..sitting_body() };
        assert_eq!(classify_default(&body.frame()), Posture::Sitting);
    }

    #[test]
    fn test_sensitivity_widens_prostration() {
        // nose 0.05 below hips: permissive margin 0.02 accepts, conservative 0.10 rejects
        let body = Body { nose: (0.5, 0.60), shoulder_y: 0.50, hip_y: 0.55, knee_y: 0.80, ..standing_body() };
        let permissive = TuningConfig::new(80, 3).unwrap();
        let conservative = TuningConfig::new(20, 3).unwrap();
        assert_eq!(classify(&body.frame(), &permissive).posture, Posture::Prostrating);
        assert_ne!(classify(&body.frame(), &conservative).posture, Posture::Prostrating);
    }

    #[test]
    fn test_sensitivity_widens_bowing() {
        // shoulder/hip gap 0.15: inside permissive 0.20, outside conservative 0.10
        let body = Body { nose: (0.5, 0.42), shoulder_y: 0.40, hip_y: 0.55, knee_y: 0.75, ..standing_body() };
        let permissive = TuningConfig::new(80, 3).unwrap();
        let conservative = TuningConfig::new(20, 3).unwrap();
        assert_eq!(classify(&body.frame(), &permissive).posture, Posture::Bowing);
        assert_ne!(classify(&body.frame(), &conservative).posture, Posture::Bowing);
    }

    #[test]
    fn test_threshold_interpolation() {
        let mid = Thresholds::from_tuning(&TuningConfig::new(50, 3).unwrap());
        assert!((mid.prostration_margin - 0.06).abs() < 1e-6);
        assert!((mid.bowing_margin - 0.15).abs() < 1e-6);
        assert!((mid.min_visibility - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_rule_order() {
        let names: Vec<_> = RULES.iter().map(|r| r.name).collect();
        assert_eq!(names, ["terminal_gesture", "prostrating", "bowing", "sitting", "standing"]);
    }

    #[test]
    fn test_shallow_bow_matching_sitting_is_bowing() {
        let body = Body { nose: (0.5, 0.56), shoulder_y: 0.55, hip_y: 0.60, knee_y: 0.65, ..standing_body() };
        let th = Thresholds::default();
        let g = BodyGeometry::from_frame(&body.frame()).unwrap();
        assert_eq!(bowing(&g, &th), Some(Posture::Bowing));
        assert_eq!(sitting(&g, &th), Some(Posture::Sitting));
        assert_eq!(prostrating(&g, &th), None);
        assert_eq!(classify_default(&body.frame()), Posture::Bowing);
    }

    #[test]
    fn test_low_head_matching_bowing_is_prostrating() {
        let body = Body { nose: (0.5, 0.80), shoulder_y: 0.70, hip_y: 0.65, knee_y: 0.80, ..standing_body() };
        let th = Thresholds::default();
        let g = BodyGeometry::from_frame(&body.frame()).unwrap();
        assert_eq!(prostrating(&g, &th), Some(Posture::Prostrating));
        assert_eq!(bowing(&g, &th), Some(Posture::Bowing));
        assert_eq!(classify_default(&body.frame()), Posture::Prostrating);
    }

    #[test]
    fn test_classify_is_deterministic() {
        let frame = bowing_body().frame();
        let tuning = TuningConfig::default();
        assert_eq!(classify(&frame, &tuning), classify(&frame, &tuning));
    }
}
