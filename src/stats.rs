//! Derived attendance statistics shown on the dashboards.

use std::fmt;

use crate::api::types::Defaulter;

pub const DEFAULT_THRESHOLD: f64 = 75.0;

/// Whole-number attendance percentage; zero sessions count as 0%.
pub fn percent(present: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    (f64::from(present) * 100.0 / f64::from(total)).round() as u32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskLevel {
    Critical,
    AtRisk,
    Borderline,
}

impl RiskLevel {
    /// Bucket for a percentage below the 75% threshold; `None` at or above it.
    pub fn classify(percent: u32) -> Option<Self> {
        match percent {
            0..=59 => Some(RiskLevel::Critical),
            60..=69 => Some(RiskLevel::AtRisk),
            70..=74 => Some(RiskLevel::Borderline),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RiskLevel::Critical => "Critical (<60%)",
            RiskLevel::AtRisk => "At Risk (60-69%)",
            RiskLevel::Borderline => "Borderline (70-74%)",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RiskLevel::Critical => "Critical",
            RiskLevel::AtRisk => "At Risk",
            RiskLevel::Borderline => "Borderline",
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RiskBreakdown {
    pub critical: usize,
    pub at_risk: usize,
    pub borderline: usize,
}

impl RiskBreakdown {
    pub fn from_defaulters(defaulters: &[Defaulter]) -> Self {
        defaulters
            .iter()
            .filter_map(|d| RiskLevel::classify(d.percent))
            .fold(Self::default(), |mut acc, level| {
                match level {
                    RiskLevel::Critical => acc.critical += 1,
                    RiskLevel::AtRisk => acc.at_risk += 1,
                    RiskLevel::Borderline => acc.borderline += 1,
                }
                acc
            })
    }

    pub fn total(&self) -> usize {
        self.critical + self.at_risk + self.borderline
    }

    pub fn rows(&self) -> Vec<(&'static str, usize)> {
        vec![
            (RiskLevel::Critical.label(), self.critical),
            (RiskLevel::AtRisk.label(), self.at_risk),
            (RiskLevel::Borderline.label(), self.borderline),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Performance {
    Excellent,
    Good,
    Average,
    Poor,
}

impl Performance {
    pub fn from_percent(percent: f64) -> Self {
        if percent >= 85.0 {
            Performance::Excellent
        } else if percent >= 75.0 {
            Performance::Good
        } else if percent >= 60.0 {
            Performance::Average
        } else {
            Performance::Poor
        }
    }
}

impl fmt::Display for Performance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Performance::Excellent => "Excellent",
            Performance::Good => "Good",
            Performance::Average => "Average",
            Performance::Poor => "Poor",
        })
    }
}

/// Worst attendance first.
pub fn sort_worst_first(defaulters: &mut [Defaulter]) {
    defaulters.sort_by_key(|d| d.percent);
}
