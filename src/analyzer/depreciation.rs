use crate::model::{IssueSet, IssueTag, VehicleDescriptor};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Solar year the age tables are anchored to.
pub const DEFAULT_REFERENCE_YEAR: i32 = 1404;

const AGE_CAP: f64 = 0.50;
const OLD_AGE_RATE: f64 = 0.03;
const OLD_AGE_BASELINE: i32 = 9;
const MILEAGE_CAP: f64 = 0.25;
const LOW_MILEAGE_KM: u64 = 10_000;
const LOW_MILEAGE_BONUS: f64 = -0.02;
const EXCESS_STEP_KM: u64 = 10_000;
const EXCESS_STEP_RATE: f64 = 0.01;
const TOTAL_CAP: f64 = 0.70;

/// Value lost per year of age for ages 0..=9, as (min, max).
const AGE_TABLE: [(f64, f64); 10] = [
    (0.00, 0.00),
    (0.10, 0.15),
    (0.07, 0.10),
    (0.05, 0.08),
    (0.04, 0.06),
    (0.04, 0.05),
    (0.03, 0.05),
    (0.03, 0.05),
    (0.03, 0.05),
    (0.03, 0.05),
];

/// Absolute-mileage brackets, highest first.
const MILEAGE_BRACKETS: [(u64, f64); 7] = [
    (300_000, 0.20),
    (250_000, 0.15),
    (200_000, 0.12),
    (150_000, 0.08),
    (100_000, 0.05),
    (50_000, 0.03),
    (20_000, 0.01),
];

/// How one issue tag reduces value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FactorRule {
    /// Fixed range; the midpoint is applied.
    Range { min: f64, max: f64 },
    /// `rate` per whole `unit_km` of mileage above the age-expected mileage.
    RatePerUnit { rate: f64, unit_km: u64 },
}

impl FactorRule {
    pub fn amount(&self, excess_km: u64) -> f64 {
        match *self {
            FactorRule::Range { min, max } => (min + max) / 2.0,
            FactorRule::RatePerUnit { rate, unit_km } if unit_km > 0 => {
                (excess_km / unit_km) as f64 * rate
            }
            FactorRule::RatePerUnit { .. } => 0.0,
        }
    }
}

/// Named factor tables selectable from configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorPreset {
    #[default]
    Standard,
    Moderate,
}

/// Per-issue depreciation factors.
#[derive(Debug, Clone, PartialEq)]
pub struct DepreciationFactorTable {
    factors: HashMap<IssueTag, FactorRule>,
}

impl DepreciationFactorTable {
    pub fn from_preset(preset: FactorPreset) -> Self {
        match preset {
            FactorPreset::Standard => Self::standard(),
            FactorPreset::Moderate => Self::moderate(),
        }
    }

    pub fn standard() -> Self {
        use IssueTag::*;
        let ranges = [
            (PaintOnePart, 0.03, 0.06),
            (PaintTwoParts, 0.06, 0.10),
            (PaintThreeParts, 0.08, 0.12),
            (PaintFourPlus, 0.12, 0.18),
            (RoofPaint, 0.12, 0.18),
            (PillarPaint, 0.10, 0.15),
            (FullPaint, 0.18, 0.35),
            (PaintChassisDamage, 0.25, 0.45),
            (BodyPartReplacement, 0.06, 0.12),
            (RoofPillarRepair, 0.18, 0.30),
            (EngineOverhaul, 0.12, 0.25),
            (GearboxRepair, 0.08, 0.15),
            (SuspensionDefect, 0.03, 0.06),
            (OptionDefect, 0.01, 0.04),
            (OldTires, 0.015, 0.03),
            (AccidentHistory, 0.08, 0.20),
            (MinorScratches, 0.005, 0.015),
            (ElectricalIssues, 0.04, 0.08),
            (InteriorDamage, 0.02, 0.05),
        ];
        Self::build(&ranges)
    }

    /// Softer factors. Tags without a moderate value keep the standard one.
    pub fn moderate() -> Self {
        use IssueTag::*;
        let mut table = Self::standard();
        let ranges = [
            (PaintOnePart, 0.02, 0.05),
            (PaintTwoParts, 0.05, 0.08),
            (PaintThreeParts, 0.07, 0.10),
            (PaintFourPlus, 0.10, 0.15),
            (RoofPaint, 0.10, 0.15),
            (PillarPaint, 0.08, 0.12),
            (FullPaint, 0.15, 0.30),
            (PaintChassisDamage, 0.20, 0.40),
            (BodyPartReplacement, 0.05, 0.10),
            (RoofPillarRepair, 0.15, 0.25),
            (EngineOverhaul, 0.10, 0.20),
            (GearboxRepair, 0.07, 0.12),
            (SuspensionDefect, 0.02, 0.05),
            (OptionDefect, 0.005, 0.03),
            (OldTires, 0.01, 0.02),
            (AccidentHistory, 0.05, 0.15),
            (MinorScratches, 0.005, 0.01),
        ];
        for (tag, min, max) in ranges {
            table.set_factor(tag, FactorRule::Range { min, max });
        }
        table
    }

    fn build(ranges: &[(IssueTag, f64, f64)]) -> Self {
        let mut factors: HashMap<IssueTag, FactorRule> = ranges
            .iter()
            .map(|&(tag, min, max)| (tag, FactorRule::Range { min, max }))
            .collect();
        factors.insert(
            IssueTag::HighMileage,
            FactorRule::RatePerUnit {
                rate: 0.0125,
                unit_km: 5_000,
            },
        );
        Self { factors }
    }

    pub fn factor(&self, tag: IssueTag) -> Option<FactorRule> {
        self.factors.get(&tag).copied()
    }

    pub fn set_factor(&mut self, tag: IssueTag, rule: FactorRule) {
        self.factors.insert(tag, rule);
    }
}

impl Default for DepreciationFactorTable {
    fn default() -> Self {
        Self::standard()
    }
}

/// Every depreciation term for one vehicle, as fractions of market price.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DepreciationBreakdown {
    pub age: f64,
    pub mileage: f64,
    pub issues: f64,
    pub total: f64,
}

#[derive(Debug, Clone)]
pub struct DepreciationModel {
    table: DepreciationFactorTable,
    reference_year: i32,
}

impl DepreciationModel {
    pub fn new(table: DepreciationFactorTable, reference_year: i32) -> Self {
        Self {
            table,
            reference_year,
        }
    }

    /// Age loss in `[0, 0.50]`. Unknown or future years lose nothing.
    pub fn age_depreciation(&self, year: Option<i32>) -> f64 {
        let Some(year) = year else { return 0.0 };
        let age = self.reference_year - year;
        if age <= 0 {
            return 0.0;
        }
        match AGE_TABLE.get(age as usize) {
            Some(&(min, max)) => (min + max) / 2.0,
            None => (OLD_AGE_RATE * (age - OLD_AGE_BASELINE) as f64).min(AGE_CAP),
        }
    }

    /// Mileage a car of this age normally has.
    pub fn expected_mileage(age: i32) -> u64 {
        let age_km = |per_year: u64| age as u64 * per_year;
        match age {
            a if a <= 0 => 0,
            a if a <= 2 => age_km(15_000),
            a if a <= 5 => age_km(17_500),
            a if a <= 10 => age_km(18_000),
            _ => age_km(15_000),
        }
    }

    /// Kilometres above the age-expected mileage; 0 when either input is unknown.
    pub fn excess_mileage(&self, mileage_km: Option<u64>, year: Option<i32>) -> u64 {
        match (mileage_km, year) {
            (Some(km), Some(year)) => {
                km.saturating_sub(Self::expected_mileage(self.reference_year - year))
            }
            _ => 0,
        }
    }

    /// Mileage loss in `[0, 0.25]`, or the low-mileage bonus of -0.02 under
    /// 10,000 km. Needs both mileage and year.
    pub fn mileage_depreciation(&self, mileage_km: Option<u64>, year: Option<i32>) -> f64 {
        let (Some(km), Some(_)) = (mileage_km, year) else {
            return 0.0;
        };
        if km < LOW_MILEAGE_KM {
            return LOW_MILEAGE_BONUS;
        }

        let base = MILEAGE_BRACKETS
            .iter()
            .find(|(floor, _)| km >= *floor)
            .map_or(0.0, |&(_, rate)| rate);
        let excess = self.excess_mileage(mileage_km, year);
        let surcharge = (excess / EXCESS_STEP_KM) as f64 * EXCESS_STEP_RATE;

        (base + surcharge).min(MILEAGE_CAP)
    }

    /// Sum of the factors of every tag. Rate-based factors use `excess_km`.
    pub fn issues_depreciation(&self, issues: &IssueSet, excess_km: u64) -> f64 {
        issues
            .iter()
            .filter_map(|tag| self.table.factor(tag))
            .map(|rule| rule.amount(excess_km))
            .sum()
    }

    /// Returns `(total, issues_only)`; the total is clamped to `[0, 0.70]`.
    pub fn total_depreciation(
        &self,
        issues: &IssueSet,
        mileage_dep: f64,
        age_dep: f64,
        excess_km: u64,
    ) -> (f64, f64) {
        let issues_dep = self.issues_depreciation(issues, excess_km);
        let total = (age_dep + mileage_dep + issues_dep).clamp(0.0, TOTAL_CAP);
        (total, issues_dep)
    }

    pub fn assess(&self, descriptor: &VehicleDescriptor, issues: &IssueSet) -> DepreciationBreakdown {
        let age = self.age_depreciation(descriptor.year);
        let mileage = self.mileage_depreciation(descriptor.mileage_km, descriptor.year);
        let excess = self.excess_mileage(descriptor.mileage_km, descriptor.year);
        let (total, issues_dep) = self.total_depreciation(issues, mileage, age, excess);
        DepreciationBreakdown {
            age,
            mileage,
            issues: issues_dep,
            total,
        }
    }
}

impl Default for DepreciationModel {
    fn default() -> Self {
        Self::new(DepreciationFactorTable::standard(), DEFAULT_REFERENCE_YEAR)
    }
}
