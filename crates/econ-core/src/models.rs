//! Pre-validated assumption models: dates, capex, expenses, taxes, ownership,
//! stream properties and risking, plus the allocation context of a group.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::criteria::{normalize_name, Criteria, OffsetBase, RatePhase, RawCapexRow};

fn default_true() -> bool {
    true
}

fn default_one() -> f64 {
    1.0
}

fn default_hundred() -> f64 {
    100.0
}

/// Escalation direction: compounding percent or additive dollars.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationKind {
    /// `rate` is an annual percent, compounded.
    Pct,
    /// `rate` is dollars (per unit) added per year.
    Dollar,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationFrequency {
    /// Applied pro rata every month.
    #[default]
    Monthly,
    /// Stepped on each anniversary of the escalation start.
    Yearly,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EscalationModel {
    pub kind: EscalationKind,
    pub rate: f64,
    #[serde(default)]
    pub frequency: EscalationFrequency,
}

/// How a well's econ limit (cutoff) is chosen.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CutoffCriteria {
    /// Explicit date.
    Date { date: NaiveDate },
    /// Run to the max econ life.
    MaxLife,
    /// Last month with positive econ cash flow.
    #[default]
    LastPositiveCashFlow,
    /// Month before the first negative econ cash flow.
    FirstNegativeCashFlow,
    /// Month at which cumulative econ cash flow peaks.
    MaxCumulativeCashFlow,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DatesModel {
    pub as_of_date: NaiveDate,
    #[serde(default)]
    pub discount_date: Option<NaiveDate>,
    #[serde(default)]
    pub first_production_date: Option<NaiveDate>,
    #[serde(default = "default_max_life")]
    pub max_econ_life_years: u32,
    #[serde(default)]
    pub cutoff: CutoffCriteria,
    /// Overrides the run-level default when set.
    #[serde(default)]
    pub cash_flow_prior_to_as_of_date: Option<bool>,
}

fn default_max_life() -> u32 {
    50
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurrencyUnit {
    #[default]
    Dollars,
    /// M$; converted to dollars when events are built.
    ThousandDollars,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CapexModel {
    #[serde(default)]
    pub unit: CurrencyUnit,
    #[serde(default)]
    pub rows: Vec<RawCapexRow>,
}

/// Seasonal / dated / offset / rate-banded value source of an expense or tax track.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValueSchedule {
    Flat {
        value: f64,
    },
    /// Piecewise constant from each start date; zero before the first.
    Dated {
        segments: Vec<DatedValue>,
    },
    /// Consecutive segments of `months` length from `base`; the last value holds.
    Offset {
        base: OffsetBase,
        segments: Vec<OffsetValue>,
    },
    /// Value of the highest band whose `min_rate` the month's gross rate reaches.
    RateBased {
        phase: RatePhase,
        bands: Vec<RateBand>,
    },
    /// One value per calendar month, January first.
    Seasonal {
        values: [f64; 12],
    },
}

impl Default for ValueSchedule {
    fn default() -> Self {
        ValueSchedule::Flat { value: 0.0 }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DatedValue {
    pub start: NaiveDate,
    pub value: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OffsetValue {
    pub months: u32,
    pub value: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RateBand {
    pub min_rate: f64,
    pub value: f64,
}

/// Value + escalation + downward cap shared by every expense and tax row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Track<U> {
    pub unit: U,
    pub schedule: ValueSchedule,
    #[serde(default)]
    pub escalation_start: Option<Criteria>,
    #[serde(default)]
    pub escalation: Option<EscalationModel>,
    #[serde(default)]
    pub cap: Option<f64>,
}

/// Ownership fraction that converts a gross amount into the net one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnershipBasis {
    #[default]
    Wi,
    Nri,
    LeaseNri,
    /// Charged at 100% regardless of WI.
    OneHundredPctWi,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExpenseFlags {
    #[serde(default = "default_one")]
    pub deal_terms: f64,
    #[serde(default)]
    pub calculation: OwnershipBasis,
    #[serde(default = "default_true")]
    pub affect_econ_limit: bool,
    #[serde(default)]
    pub deduct_before_severance_tax: bool,
    #[serde(default)]
    pub deduct_before_ad_valorem_tax: bool,
    #[serde(default = "default_true")]
    pub stop_at_econ_limit: bool,
}

impl Default for ExpenseFlags {
    fn default() -> Self {
        Self {
            deal_terms: 1.0,
            calculation: OwnershipBasis::Wi,
            affect_econ_limit: true,
            deduct_before_severance_tax: false,
            deduct_before_ad_valorem_tax: false,
            stop_at_econ_limit: true,
        }
    }
}

/// Closed set of names an expense row's `category` string must match.
///
/// Rows carry the raw string; `validate_expenses` reports an unknown name as
/// `InvalidCategory` for that well only.
macro_rules! category_set {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ();

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let norm = normalize_name(s);
                $name::ALL.iter().copied().find(|c| c.as_str() == norm).ok_or(())
            }
        }
    };
}

category_set!(FixedCategory {
    MonthlyWellCost => "monthly_well_cost",
    OtherMonthlyCost1 => "other_monthly_cost_1",
    OtherMonthlyCost2 => "other_monthly_cost_2",
});

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixedUnit {
    PerMonth,
    /// Multiplied by the well's gross well count.
    PerWellPerMonth,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FixedExpenseRow {
    /// One of [`FixedCategory`]; checked by `validate_expenses`.
    pub category: String,
    #[serde(flatten)]
    pub track: Track<FixedUnit>,
    #[serde(flatten)]
    pub flags: ExpenseFlags,
}

/// Sold products that expenses and taxes attach to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Product {
    Oil,
    Gas,
    Ngl,
    DripCondensate,
}

impl Product {
    pub const ALL: [Product; 4] = [
        Product::Oil,
        Product::Gas,
        Product::Ngl,
        Product::DripCondensate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Product::Oil => "oil",
            Product::Gas => "gas",
            Product::Ngl => "ngl",
            Product::DripCondensate => "drip_condensate",
        }
    }
}

category_set!(VariableCategory {
    Gathering => "gathering",
    Processing => "processing",
    Transportation => "transportation",
    Marketing => "marketing",
    Other => "other",
});

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableUnit {
    PerUnitVolume,
    PctOfRevenue,
    PctOfProduction,
    PerMonth,
}

/// Which gas volume a volumetric charge applies to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shrinkage {
    #[default]
    Shrunk,
    Unshrunk,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VariableExpenseRow {
    pub product: Product,
    /// One of [`VariableCategory`].
    pub category: String,
    #[serde(default)]
    pub shrinkage: Shrinkage,
    #[serde(flatten)]
    pub track: Track<VariableUnit>,
    #[serde(flatten)]
    pub flags: ExpenseFlags,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaterUnit {
    PerUnitVolume,
    PerMonth,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WaterDisposalRow {
    #[serde(flatten)]
    pub track: Track<WaterUnit>,
    #[serde(flatten)]
    pub flags: ExpenseFlags,
}

category_set!(CarbonCategory {
    Co2e => "co2e",
    Co2 => "co2",
    Ch4 => "ch4",
    N2o => "n2o",
});

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CarbonUnit {
    PerMetricTon,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CarbonExpenseRow {
    /// One of [`CarbonCategory`].
    pub category: String,
    /// Metric tons emitted per gross BOE.
    pub emission_factor: f64,
    #[serde(flatten)]
    pub track: Track<CarbonUnit>,
    #[serde(flatten)]
    pub flags: ExpenseFlags,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpenseModel {
    #[serde(default)]
    pub fixed: Vec<FixedExpenseRow>,
    #[serde(default)]
    pub variable: Vec<VariableExpenseRow>,
    #[serde(default)]
    pub water_disposal: Vec<WaterDisposalRow>,
    #[serde(default)]
    pub carbon: Vec<CarbonExpenseRow>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeveranceUnit {
    PctOfRevenue,
    PctOfProduction,
    /// $/bbl for liquids, $/mcf for gas.
    PerUnitVolume,
    PerMonth,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SeverancePhaseModel {
    /// At most two tracks; their results are summed.
    #[serde(default)]
    pub tracks: Vec<Track<SeveranceUnit>>,
    #[serde(default)]
    pub shrinkage: Shrinkage,
}

/// Pennsylvania unconventional-well impact fee.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImpactFeeModel {
    /// Annual average Henry Hub gas price that selects the fee column.
    pub average_gas_price: f64,
    /// Anchor for well age; header `spud_date` when absent.
    #[serde(default)]
    pub anchor: Option<Criteria>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SeveranceTaxModel {
    #[serde(default)]
    pub oil: SeverancePhaseModel,
    #[serde(default)]
    pub gas: SeverancePhaseModel,
    #[serde(default)]
    pub ngl: SeverancePhaseModel,
    #[serde(default)]
    pub drip_condensate: SeverancePhaseModel,
    /// Replaces the gas severance tracks when present.
    #[serde(default)]
    pub impact_fee: Option<ImpactFeeModel>,
}

impl SeveranceTaxModel {
    pub fn phase(&self, product: Product) -> &SeverancePhaseModel {
        match product {
            Product::Oil => &self.oil,
            Product::Gas => &self.gas,
            Product::Ngl => &self.ngl,
            Product::DripCondensate => &self.drip_condensate,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdValoremUnit {
    /// Percent of total net revenue.
    PctOfRevenue,
    PctOfProduction,
    PerBoe,
    PerMonth,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AdValoremTaxModel {
    #[serde(default)]
    pub tracks: Vec<Track<AdValoremUnit>>,
    /// Subtract severance tax from the revenue base.
    #[serde(default)]
    pub deduct_severance_tax: bool,
    #[serde(default)]
    pub shrinkage: Shrinkage,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductionTaxModel {
    #[serde(default)]
    pub severance: SeveranceTaxModel,
    #[serde(default)]
    pub ad_valorem: AdValoremTaxModel,
}

/// Scalar or dated monthly ownership fraction (e.g. the output of a reversion pass).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Interest {
    Scalar(f64),
    Monthly { start: NaiveDate, values: Vec<f64> },
}

impl Default for Interest {
    fn default() -> Self {
        Interest::Scalar(1.0)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OwnershipModel {
    #[serde(default)]
    pub wi: Interest,
    #[serde(default)]
    pub nri: Interest,
    /// Defaults to `nri` when absent.
    #[serde(default)]
    pub lease_nri: Option<Interest>,
    #[serde(default)]
    pub oil_nri: Option<Interest>,
    #[serde(default)]
    pub gas_nri: Option<Interest>,
    #[serde(default)]
    pub ngl_nri: Option<Interest>,
    #[serde(default)]
    pub drip_condensate_nri: Option<Interest>,
}

impl Default for OwnershipModel {
    fn default() -> Self {
        Self {
            wi: Interest::Scalar(1.0),
            nri: Interest::Scalar(0.8),
            lease_nri: None,
            oil_nri: None,
            gas_nri: None,
            ngl_nri: None,
            drip_condensate_nri: None,
        }
    }
}

/// Byproduct volume basis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrivenBy {
    #[default]
    Risked,
    Unrisked,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompositionalProduct {
    pub name: String,
    /// bbl per MMcf of unshrunk gas.
    pub yield_per_mmcf: f64,
    #[serde(default = "default_one")]
    pub risk: f64,
}

/// Percent losses/shrink and byproduct yields from wellhead to sales.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StreamProperties {
    #[serde(default)]
    pub oil_loss_pct: f64,
    #[serde(default = "default_hundred")]
    pub oil_shrink_pct: f64,
    #[serde(default)]
    pub gas_loss_pct: f64,
    #[serde(default)]
    pub gas_flare_pct: f64,
    #[serde(default = "default_hundred")]
    pub gas_shrink_pct: f64,
    /// bbl/MMcf.
    #[serde(default)]
    pub ngl_yield: f64,
    /// bbl/MMcf.
    #[serde(default)]
    pub drip_condensate_yield: f64,
    #[serde(default)]
    pub driven_by: DrivenBy,
    #[serde(default)]
    pub compositional: Vec<CompositionalProduct>,
}

impl Default for StreamProperties {
    fn default() -> Self {
        Self {
            oil_loss_pct: 0.0,
            oil_shrink_pct: 100.0,
            gas_loss_pct: 0.0,
            gas_flare_pct: 0.0,
            gas_shrink_pct: 100.0,
            ngl_yield: 0.0,
            drip_condensate_yield: 0.0,
            driven_by: DrivenBy::Risked,
            compositional: vec![],
        }
    }
}

/// Multipliers applied to gross wellhead forecasts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RiskingModel {
    #[serde(default = "default_one")]
    pub oil: f64,
    #[serde(default = "default_one")]
    pub gas: f64,
    #[serde(default = "default_one")]
    pub water: f64,
    #[serde(default = "default_one")]
    pub ngl: f64,
    #[serde(default = "default_one")]
    pub drip_condensate: f64,
}

impl Default for RiskingModel {
    fn default() -> Self {
        Self {
            oil: 1.0,
            gas: 1.0,
            water: 1.0,
            ngl: 1.0,
            drip_condensate: 1.0,
        }
    }
}

/// Shut-in period; each flag says whether that stream continues while shut in.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShutInWindow {
    pub start: NaiveDate,
    /// Inclusive.
    pub end: NaiveDate,
    #[serde(default)]
    pub fixed_expense: bool,
    #[serde(default = "default_true")]
    pub capex: bool,
    #[serde(default)]
    pub production: bool,
}

impl ShutInWindow {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationBasis {
    #[default]
    Gross,
    Net,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationTiming {
    #[default]
    Monthly,
    Annual,
    Remaining,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationMethod {
    OilVolume,
    GasVolume,
    #[default]
    BoeVolume,
    WellCount,
    Revenue,
    Income,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupEconLimit {
    #[default]
    Independent,
    CannotExceedGroup,
    MustBeGroup,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationContext {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub basis: AllocationBasis,
    #[serde(default)]
    pub timing: AllocationTiming,
    #[serde(default)]
    pub method: AllocationMethod,
    #[serde(default)]
    pub group_econ_limit: GroupEconLimit,
}

impl Default for AllocationContext {
    fn default() -> Self {
        Self {
            enabled: true,
            basis: AllocationBasis::Gross,
            timing: AllocationTiming::Monthly,
            method: AllocationMethod::BoeVolume,
            group_econ_limit: GroupEconLimit::Independent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_row_parses_flattened_track_and_flags() {
        let yaml = r#"
category: monthly_well_cost
unit: per_well_per_month
schedule: { kind: flat, value: 1500 }
escalation: { kind: pct, rate: 3.0 }
cap: 2000
deduct_before_severance_tax: true
"#;
        let row: FixedExpenseRow = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(row.track.unit, FixedUnit::PerWellPerMonth);
        assert_eq!(row.track.cap, Some(2000.0));
        assert!(row.flags.affect_econ_limit);
        assert!(row.flags.deduct_before_severance_tax);
        assert_eq!(row.flags.deal_terms, 1.0);
        assert_eq!(
            row.track.escalation.as_ref().map(|e| e.frequency),
            Some(EscalationFrequency::Monthly)
        );
    }

    #[test]
    fn numbered_fixed_categories_keep_their_underscore() {
        let yaml = r#"
- { category: other_monthly_cost_1, unit: per_month, schedule: { kind: flat, value: 10 } }
- { category: other_monthly_cost_2, unit: per_month, schedule: { kind: flat, value: 20 } }
"#;
        let rows: Vec<FixedExpenseRow> = serde_yaml::from_str(yaml).unwrap();
        let parsed: Vec<FixedCategory> = rows.iter().map(|r| r.category.parse().unwrap()).collect();
        assert_eq!(
            parsed,
            vec![FixedCategory::OtherMonthlyCost1, FixedCategory::OtherMonthlyCost2]
        );
        assert_eq!(FixedCategory::OtherMonthlyCost2.to_string(), "other_monthly_cost_2");
    }

    #[test]
    fn interest_is_scalar_or_monthly() {
        let scalar: Interest = serde_json::from_str("0.75").unwrap();
        assert_eq!(scalar, Interest::Scalar(0.75));
        let monthly: Interest =
            serde_json::from_str(r#"{"start": "2021-01-01", "values": [1.0, 0.5]}"#).unwrap();
        assert!(matches!(monthly, Interest::Monthly { ref values, .. } if values.len() == 2));
    }

    #[test]
    fn dates_model_defaults() {
        let m: DatesModel = serde_json::from_str(r#"{"as_of_date": "2022-01-01"}"#).unwrap();
        assert_eq!(m.max_econ_life_years, 50);
        assert_eq!(m.cutoff, CutoffCriteria::LastPositiveCashFlow);
        assert!(m.cash_flow_prior_to_as_of_date.is_none());
    }
}
