use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::warn;

pub const SENSITIVITY_MIN: u32 = 20;
pub const SENSITIVITY_MAX: u32 = 80;
pub const STABILITY_FRAMES_MIN: usize = 2;
pub const STABILITY_FRAMES_MAX: usize = 8;

/// 多数決ウィンドウの余裕フレーム数
pub const STABILITY_WINDOW_SLACK: usize = 2;

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    #[serde(default)]
    pub tuning: TuningConfig,
    #[serde(default)]
    pub inference: InferenceConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

/// 分類しきい値と安定化ウィンドウの調整値（UIスライダー相当）
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct TuningConfig {
    /// 感度 (20〜80)。高いほど Sujood / Ruku を検出しやすい
    #[serde(default = "default_sensitivity")]
    pub sensitivity: u32,
    /// 姿勢確定に必要なフレーム数 (2〜8)
    #[serde(default = "default_stability_frames")]
    pub stability_frames: usize,
}

fn default_sensitivity() -> u32 { 50 }
fn default_stability_frames() -> usize { 3 }

impl Default for TuningConfig {
    fn default() -> Self {
        Self {
            sensitivity: default_sensitivity(),
            stability_frames: default_stability_frames(),
        }
    }
}

impl TuningConfig {
    pub fn new(sensitivity: u32, stability_frames: usize) -> Result<Self> {
        let tuning = Self { sensitivity, stability_frames };
        tuning.validate()?;
        Ok(tuning)
    }

    pub fn validate(&self) -> Result<()> {
        if !(SENSITIVITY_MIN..=SENSITIVITY_MAX).contains(&self.sensitivity) {
            bail!(
                "sensitivity {} out of range {}..={}",
                self.sensitivity,
                SENSITIVITY_MIN,
                SENSITIVITY_MAX
            );
        }
        if !(STABILITY_FRAMES_MIN..=STABILITY_FRAMES_MAX).contains(&self.stability_frames) {
            bail!(
                "stability_frames {} out of range {}..={}",
                self.stability_frames,
                STABILITY_FRAMES_MIN,
                STABILITY_FRAMES_MAX
            );
        }
        Ok(())
    }

    /// 範囲外の値を境界に丸める
    pub fn clamped(self) -> Self {
        Self {
            sensitivity: self.sensitivity.clamp(SENSITIVITY_MIN, SENSITIVITY_MAX),
            stability_frames: self
                .stability_frames
                .clamp(STABILITY_FRAMES_MIN, STABILITY_FRAMES_MAX),
        }
    }

    /// 感度の補間係数 t (0.0 = 保守的, 1.0 = 寛容)
    pub fn sensitivity_factor(&self) -> f32 {
        let s = self.sensitivity.clamp(SENSITIVITY_MIN, SENSITIVITY_MAX);
        (s - SENSITIVITY_MIN) as f32 / (SENSITIVITY_MAX - SENSITIVITY_MIN) as f32
    }
}

/// 推論エンジン（自動補正）の設定
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct InferenceConfig {
    /// 姿勢タイムラインの保持件数
    #[serde(default = "default_timeline_capacity")]
    pub timeline_capacity: usize,
    /// 座る→立つ→座るパターンの探索件数
    #[serde(default = "default_pattern_window")]
    pub pattern_window: usize,
    /// 最終ラカートでの長時間着座判定（秒）
    #[serde(default = "default_extended_sit_secs")]
    pub extended_sit_secs: f32,
    /// 推論ログの保持件数
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,
    /// 自動補正の重複抑止期間（ミリ秒）
    #[serde(default = "default_correction_cooldown_ms")]
    pub correction_cooldown_ms: u64,
}

fn default_timeline_capacity() -> usize { 100 }
fn default_pattern_window() -> usize { 10 }
fn default_extended_sit_secs() -> f32 { 10.0 }
fn default_log_capacity() -> usize { 5 }
fn default_correction_cooldown_ms() -> u64 { 3000 }

impl InferenceConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.extended_sit_secs.is_finite() || self.extended_sit_secs < 0.0 {
            bail!(
                "extended_sit_secs must be a finite, non-negative number of seconds (got {})",
                self.extended_sit_secs
            );
        }
        Ok(())
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            timeline_capacity: default_timeline_capacity(),
            pattern_window: default_pattern_window(),
            extended_sit_secs: default_extended_sit_secs(),
            log_capacity: default_log_capacity(),
            correction_cooldown_ms: default_correction_cooldown_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ComponentConfig {
    pub label: String,
    pub rakats: u32,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct SessionConfig {
    /// プリセット名 (fajr, dhuhr, asr, maghrib, isha, taraweeh, witr)
    #[serde(default = "default_prayer")]
    pub prayer: String,
    /// 明示的な構成。空でなければプリセットより優先
    #[serde(default)]
    pub components: Vec<ComponentConfig>,
}

fn default_prayer() -> String { "fajr".to_string() }

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            prayer: default_prayer(),
            components: Vec::new(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        config.tuning.validate()?;
        config.inference.validate()?;
        Ok(config)
    }

    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!("config not loaded, using defaults: {:#}", e);
                Self::default()
            }
        }
    }
}
