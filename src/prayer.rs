//! 礼拝の定義と構成要素ごとのカウントセッション

use anyhow::{bail, Result};
use std::str::FromStr;

use crate::config::SessionConfig;

/// 組み込みの礼拝とそのラカート数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Prayer {
    Fajr,
    Dhuhr,
    Asr,
    Maghrib,
    Isha,
    Taraweeh,
    Witr,
}

impl Prayer {
    pub const ALL: [Prayer; 7] = [
        Prayer::Fajr,
        Prayer::Dhuhr,
        Prayer::Asr,
        Prayer::Maghrib,
        Prayer::Isha,
        Prayer::Taraweeh,
        Prayer::Witr,
    ];

    pub fn rakats(self) -> u32 {
        match self {
            Prayer::Fajr => 2,
            Prayer::Dhuhr | Prayer::Asr | Prayer::Isha => 4,
            Prayer::Maghrib | Prayer::Witr => 3,
            Prayer::Taraweeh => 20,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Prayer::Fajr => "Fajr",
            Prayer::Dhuhr => "Dhuhr",
            Prayer::Asr => "Asr",
            Prayer::Maghrib => "Maghrib",
            Prayer::Isha => "Isha",
            Prayer::Taraweeh => "Taraweeh",
            Prayer::Witr => "Witr",
        }
    }

    pub fn arabic(self) -> &'static str {
        match self {
            Prayer::Fajr => "الفجر",
            Prayer::Dhuhr => "الظهر",
            Prayer::Asr => "العصر",
            Prayer::Maghrib => "المغرب",
            Prayer::Isha => "العشاء",
            Prayer::Taraweeh => "التراويح",
            Prayer::Witr => "الوتر",
        }
    }
}

impl FromStr for Prayer {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let key = s.trim().to_ascii_lowercase();
        Prayer::ALL
            .into_iter()
            .find(|p| p.name().to_ascii_lowercase() == key)
            .ok_or_else(|| anyhow::anyhow!("unknown prayer: {}", s))
    }
}

/// 礼拝の構成要素（目標ラカート数つき）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrayerComponent {
    pub label: String,
    pub target_rakats: u32,
}

impl PrayerComponent {
    pub fn new(label: impl Into<String>, target_rakats: u32) -> Result<Self> {
        let label = label.into();
        if target_rakats == 0 {
            bail!("component {:?} must have at least one rakat", label);
        }
        Ok(Self { label, target_rakats })
    }
}

/// 構成要素の順序付きリスト（空は不可）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrayerDefinition {
    components: Vec<PrayerComponent>,
}

impl PrayerDefinition {
    pub fn new(components: Vec<PrayerComponent>) -> Result<Self> {
        if components.is_empty() {
            bail!("prayer definition needs at least one component");
        }
        Ok(Self { components })
    }

    pub fn from_preset(prayer: Prayer) -> Self {
        Self {
            components: vec![PrayerComponent {
                label: prayer.name().to_string(),
                target_rakats: prayer.rakats(),
            }],
        }
    }

    /// 明示的な構成がプリセット名より優先
    pub fn from_config(config: &SessionConfig) -> Result<Self> {
        if config.components.is_empty() {
            return Ok(Self::from_preset(config.prayer.parse()?));
        }
        let components = config
            .components
            .iter()
            .map(|c| PrayerComponent::new(c.label.clone(), c.rakats))
            .collect::<Result<Vec<_>>>()?;
        Self::new(components)
    }

    pub fn components(&self) -> &[PrayerComponent] {
        &self.components
    }

    pub fn get(&self, index: usize) -> Option<&PrayerComponent> {
        self.components.get(index)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

/// ラカートを進めた結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// 現在のラカート (1始まり)
    Rakat(u32),
    /// 最終ラカート完了。カウンタは目標値のまま
    Completed { rakat: u32 },
}

/// サジダ1回分の記録結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SujoodRecord {
    /// 1 か 2。2 のときは `advance` に反映済み
    pub count: u8,
    pub advance: Option<Advance>,
}

/// 構成要素1つ分のカウント進捗
///
/// 常に `1 <= current_rakat <= total_rakats`。`sujood_in_rakat` は操作の合間では
/// 0 か 1（2回目のサジダは同じ呼び出しでラカートを進める）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    definition: PrayerDefinition,
    component_index: usize,
    current_rakat: u32,
    sujood_in_rakat: u8,
    completed: bool,
}

impl Session {
    pub fn start(definition: PrayerDefinition, component_index: usize) -> Result<Self> {
        if definition.get(component_index).is_none() {
            bail!(
                "component index {} out of range (definition has {})",
                component_index,
                definition.len()
            );
        }
        Ok(Self {
            definition,
            component_index,
            current_rakat: 1,
            sujood_in_rakat: 0,
            completed: false,
        })
    }

    pub fn definition(&self) -> &PrayerDefinition {
        &self.definition
    }

    pub fn component_index(&self) -> usize {
        self.component_index
    }

    pub fn component(&self) -> &PrayerComponent {
        &self.definition.components[self.component_index]
    }

    pub fn total_rakats(&self) -> u32 {
        self.component().target_rakats
    }

    pub fn current_rakat(&self) -> u32 {
        self.current_rakat
    }

    pub fn sujood_in_rakat(&self) -> u8 {
        self.sujood_in_rakat
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn is_final_rakat(&self) -> bool {
        self.current_rakat == self.total_rakats()
    }

    pub fn has_next_component(&self) -> bool {
        self.component_index + 1 < self.definition.len()
    }

    /// これまでのサジダ数。完了後は `2 * total` で飽和
    pub fn progress(&self) -> u32 {
        if self.completed {
            self.total_rakats() * 2
        } else {
            (self.current_rakat - 1) * 2 + self.sujood_in_rakat as u32
        }
    }

    /// 完了済みなら `None`
    pub fn record_sujood(&mut self) -> Option<SujoodRecord> {
        if self.completed {
            return None;
        }
        let count = self.sujood_in_rakat + 1;
        if count >= 2 {
            let advance = self.advance_rakat();
            Some(SujoodRecord { count: 2, advance })
        } else {
            self.sujood_in_rakat = count;
            Some(SujoodRecord { count, advance: None })
        }
    }

    /// 次のラカートへ進む。最終ラカートなら完了にする
    pub fn advance_rakat(&mut self) -> Option<Advance> {
        if self.completed {
            return None;
        }
        self.sujood_in_rakat = 0;
        if self.current_rakat >= self.total_rakats() {
            self.completed = true;
            Some(Advance::Completed { rakat: self.current_rakat })
        } else {
            self.current_rakat += 1;
            Some(Advance::Rakat(self.current_rakat))
        }
    }

    /// 前方向のみのジャンプ（目標値で頭打ち）。飛ばしたラカート数を返す
    pub fn jump_to_rakat(&mut self, rakat: u32) -> u32 {
        if self.completed {
            return 0;
        }
        let target = rakat.min(self.total_rakats());
        if target <= self.current_rakat {
            return 0;
        }
        let skipped = target - self.current_rakat;
        self.current_rakat = target;
        self.sujood_in_rakat = 0;
        skipped
    }

    /// 完了にする。既に完了なら `false`
    pub fn complete(&mut self) -> bool {
        if self.completed {
            return false;
        }
        self.sujood_in_rakat = 0;
        self.completed = true;
        true
    }

    pub fn reset(&mut self) {
        self.current_rakat = 1;
        self.sujood_in_rakat = 0;
        self.completed = false;
    }

    /// 次の構成要素のセッション（あれば）
    pub fn next_component(&self) -> Option<Self> {
        if !self.has_next_component() {
            return None;
        }
        Self::start(self.definition.clone(), self.component_index + 1).ok()
    }
}
