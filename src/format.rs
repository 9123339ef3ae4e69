use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::outcome_model::OutcomeModel;
use crate::stages::{CarryOver, DEFAULT_VENUE_CAP, Rounding, SecondStage, StageRule};
use crate::tiebreak::TieBreakPolicy;

/// Who gets credited with the title in a trial.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TitleRule {
    /// Every team level on the top band's maximum points shares the credit.
    #[default]
    SharedTopPoints,
    /// Only the team ranked first after tie-breaks.
    RankOne,
}

/// Everything that distinguishes one competition format from another. The simulation
/// pipeline is the same for all of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeagueFormat {
    pub name: String,
    #[serde(default)]
    pub model: OutcomeModel,
    #[serde(default)]
    pub tiebreak: TieBreakPolicy,
    #[serde(default)]
    pub track_goals: bool,
    #[serde(default)]
    pub title: TitleRule,
    /// Ignore every team's home bonus; all fixtures are played at neutral venues.
    #[serde(default)]
    pub neutral_venues: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub second_stage: Option<SecondStage>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatPreset {
    Regular,
    Split,
    PlayoffPlayout,
    Tournament,
}

impl FormatPreset {
    pub fn format(self) -> LeagueFormat {
        match self {
            FormatPreset::Regular => LeagueFormat::regular(),
            FormatPreset::Split => LeagueFormat::split(6),
            FormatPreset::PlayoffPlayout => LeagueFormat::playoff_playout(6),
            FormatPreset::Tournament => LeagueFormat::tournament(),
        }
    }
}

impl LeagueFormat {
    /// Straight league: calibrated model, points only, shared title on equal top points.
    pub fn regular() -> Self {
        Self {
            name: "regular".to_string(),
            model: OutcomeModel::default(),
            tiebreak: TieBreakPolicy::PointsOnly,
            track_goals: false,
            title: TitleRule::SharedTopPoints,
            neutral_venues: false,
            second_stage: None,
        }
    }

    /// Regular season followed by a top/bottom split with one more round-robin per band.
    pub fn split(cut: usize) -> Self {
        Self {
            name: "split".to_string(),
            second_stage: Some(SecondStage {
                rule: StageRule::GroupSplit { cut },
                carry_over: CarryOver::Keep,
            }),
            ..Self::regular()
        }
    }

    /// Points are halved at the split; the top band plays home and away, the rest once.
    pub fn playoff_playout(playoff_size: usize) -> Self {
        Self {
            name: "playoff_playout".to_string(),
            title: TitleRule::RankOne,
            second_stage: Some(SecondStage {
                rule: StageRule::PlayoffPlayout {
                    playoff_size,
                    venue_cap: DEFAULT_VENUE_CAP,
                },
                carry_over: CarryOver::Halve {
                    rounding: Rounding::HalfEven,
                },
            }),
            ..Self::regular()
        }
    }

    /// Short group competition at neutral venues: flat model, simulated goals,
    /// head-to-head tie-breaks. Home bonuses from the season file are ignored.
    pub fn tournament() -> Self {
        Self {
            name: "tournament".to_string(),
            model: OutcomeModel::flat(),
            tiebreak: TieBreakPolicy::HeadToHead,
            track_goals: true,
            title: TitleRule::RankOne,
            neutral_venues: true,
            second_stage: None,
        }
    }

    pub fn validate(&self, teams: usize) -> Result<()> {
        self.model.validate()?;
        if let Some(stage) = &self.second_stage {
            stage.validate(teams)?;
        }
        Ok(())
    }
}
