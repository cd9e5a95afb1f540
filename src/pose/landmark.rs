use serde::{Deserialize, Serialize};

/// BlazePose の 33 ランドマークインデックス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum LandmarkIndex {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

impl LandmarkIndex {
    pub const COUNT: usize = 33;

    pub fn from_index(index: usize) -> Option<Self> {
        use LandmarkIndex::*;
        const ALL: [LandmarkIndex; LandmarkIndex::COUNT] = [
            Nose, LeftEyeInner, LeftEye, LeftEyeOuter, RightEyeInner, RightEye, RightEyeOuter,
            LeftEar, RightEar, MouthLeft, MouthRight, LeftShoulder, RightShoulder,
            LeftElbow, RightElbow, LeftWrist, RightWrist, LeftPinky, RightPinky,
            LeftIndex, RightIndex, LeftThumb, RightThumb, LeftHip, RightHip,
            LeftKnee, RightKnee, LeftAnkle, RightAnkle, LeftHeel, RightHeel,
            LeftFootIndex, RightFootIndex,
        ];
        ALL.get(index).copied()
    }
}

/// 単一ランドマーク
///
/// 座標は画像正規化 (0.0〜1.0)。Y は画面下方向が正。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
    /// 可視性スコア (0.0〜1.0)
    pub visibility: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, visibility: f32) -> Self {
        Self { x, y, z: 0.0, visibility }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite() && self.visibility.is_finite()
    }
}

impl Default for Landmark {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            visibility: 0.0,
        }
    }
}

/// 姿勢推定器の 1 フレーム分の出力
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub landmarks: Vec<Landmark>,
}

impl Frame {
    pub fn new(landmarks: Vec<Landmark>) -> Self {
        Self { landmarks }
    }

    /// 最低ランドマーク数を満たしているか
    pub fn is_complete(&self) -> bool {
        self.landmarks.len() >= LandmarkIndex::COUNT
    }

    pub fn get(&self, index: LandmarkIndex) -> Option<&Landmark> {
        self.landmarks.get(index as usize)
    }

    /// 指定ランドマークの平均可視性
    pub fn average_visibility(&self, indices: &[LandmarkIndex]) -> f32 {
        if indices.is_empty() {
            return 0.0;
        }
        let sum: f32 = indices
            .iter()
            .map(|&i| self.get(i).map_or(0.0, |l| l.visibility.clamp(0.0, 1.0)))
            .sum();
        sum / indices.len() as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_landmark_index_count() {
        assert_eq!(LandmarkIndex::COUNT, 33);
    }

    #[test]
    fn test_landmark_index_from_index() {
        assert_eq!(LandmarkIndex::from_index(0), Some(LandmarkIndex::Nose));
        assert_eq!(LandmarkIndex::from_index(23), Some(LandmarkIndex::LeftHip));
        assert_eq!(LandmarkIndex::from_index(32), Some(LandmarkIndex::RightFootIndex));
        assert_eq!(LandmarkIndex::from_index(33), None);
    }

    #[test]
    fn test_from_index_matches_discriminant() {
        for i in 0..LandmarkIndex::COUNT {
            let idx = LandmarkIndex::from_index(i).unwrap();
            assert_eq!(idx as usize, i);
        }
    }

    #[test]
    fn test_frame_get_and_completeness() {
        let mut landmarks = vec![Landmark::default(); LandmarkIndex::COUNT];
        landmarks[LandmarkIndex::Nose as usize] = Landmark::new(0.5, 0.2, 0.9);
        let frame = Frame::new(landmarks);
        assert!(frame.is_complete());
        let nose = frame.get(LandmarkIndex::Nose).unwrap();
        assert_eq!(nose.y, 0.2);

        let short = Frame::new(vec![Landmark::default(); 10]);
        assert!(!short.is_complete());
        assert!(short.get(LandmarkIndex::LeftHip).is_none());
    }

    #[test]
    fn test_average_visibility() {
        let frame = Frame::new(vec![Landmark::new(0.0, 0.0, 0.5); LandmarkIndex::COUNT]);
        let avg = frame.average_visibility(&[LandmarkIndex::Nose, LandmarkIndex::LeftHip]);
        assert!((avg - 0.5).abs() < 0.001);
    }

    #[test]
    fn test_landmark_deserialize_without_z() {
        let lm: Landmark = serde_json::from_str(r#"{"x":0.1,"y":0.2,"visibility":0.8}"#).unwrap();
        assert_eq!(lm.z, 0.0);
        assert_eq!(lm.visibility, 0.8);
    }
}
