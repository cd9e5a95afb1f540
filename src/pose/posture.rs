use serde::{Deserialize, Serialize};

/// 1フレームから認識する姿勢
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(usize)]
pub enum Posture {
    #[default]
    Unknown = 0,
    /// Qiyam
    Standing = 1,
    /// Ruku
    Bowing = 2,
    /// Sujood
    Prostrating = 3,
    /// Jalsa / tashahhud
    Sitting = 4,
    /// 右肩へのサラーム
    TerminalGestureRight = 5,
    /// 左肩へのサラーム
    TerminalGestureLeft = 6,
}

impl Posture {
    pub const COUNT: usize = 7;

    pub const ALL: [Posture; Posture::COUNT] = [
        Posture::Unknown,
        Posture::Standing,
        Posture::Bowing,
        Posture::Prostrating,
        Posture::Sitting,
        Posture::TerminalGestureRight,
        Posture::TerminalGestureLeft,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn is_known(self) -> bool {
        self != Posture::Unknown
    }

    pub fn is_terminal_gesture(self) -> bool {
        matches!(self, Posture::TerminalGestureRight | Posture::TerminalGestureLeft)
    }

    pub fn name(self) -> &'static str {
        match self {
            Posture::Unknown => "Detecting...",
            Posture::Standing => "Standing (Qiyam)",
            Posture::Bowing => "Bowing (Ruku)",
            Posture::Prostrating => "Prostrating (Sujood)",
            Posture::Sitting => "Sitting (Jalsa)",
            Posture::TerminalGestureRight => "Salam (right)",
            Posture::TerminalGestureLeft => "Salam (left)",
        }
    }
}

impl std::fmt::Display for Posture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
