//! Core domain models and invariants for the well economics engine.
//!
//! This crate defines the serializable inputs (well header, production,
//! assumption models), the closed criteria type every dated row resolves
//! through, the per-well result bundles, and validation helpers that turn
//! malformed models into structured [`ConfigurationError`]s.

pub mod calendar;
pub mod criteria;
pub mod error;
pub mod models;
pub mod results;
pub mod well;

pub use calendar::Timeline;
pub use criteria::{
    CapexCalculation, CapexCategory, Criteria, CriteriaRow, OffsetBase, RatePhase, RawCapexRow,
};
pub use error::ConfigurationError;
pub use models::*;
pub use results::*;
pub use well::{ProductionSeries, ScheduleMilestones, WellHeader, WellInput};

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Run-level configuration resolved once and threaded into every component.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Enables compositional byproducts in the volume chain.
    #[serde(default)]
    pub compositional_economics: bool,
    /// Fan independent wells and groups across the worker pool.
    #[serde(default = "default_true")]
    pub parallel: bool,
    /// Default for wells whose dates model does not say.
    #[serde(default)]
    pub cash_flow_prior_to_as_of_date: bool,
    /// Mcf per BOE for wellhead / unshrunk gas.
    #[serde(default = "default_six")]
    pub wet_gas_boe_factor: f64,
    /// Mcf per BOE for sales gas.
    #[serde(default = "default_six")]
    pub dry_gas_boe_factor: f64,
    /// Mcf equivalent per BOE.
    #[serde(default = "default_six")]
    pub mcfe_factor: f64,
}

/// `a / b`, or zero when the quotient is not finite.
pub fn safe_div(a: f64, b: f64) -> f64 {
    if b == 0.0 {
        return 0.0;
    }
    let q = a / b;
    if q.is_finite() {
        q
    } else {
        0.0
    }
}

fn default_true() -> bool {
    true
}

fn default_six() -> f64 {
    6.0
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            compositional_economics: false,
            parallel: true,
            cash_flow_prior_to_as_of_date: false,
            wet_gas_boe_factor: 6.0,
            dry_gas_boe_factor: 6.0,
            mcfe_factor: 6.0,
        }
    }
}

fn check_fraction(value: f64, field: &str) -> Result<(), ConfigurationError> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(ConfigurationError::invalid(
            None,
            field,
            format!("{value} is outside [0, 1]"),
        ));
    }
    Ok(())
}

fn check_interest(interest: &Interest, field: &str) -> Result<(), ConfigurationError> {
    match interest {
        Interest::Scalar(v) => check_fraction(*v, field),
        Interest::Monthly { values, .. } => {
            if values.is_empty() {
                return Err(ConfigurationError::invalid(None, field, "empty series"));
            }
            values.iter().try_for_each(|v| check_fraction(*v, field))
        }
    }
}

/// Validate ownership fractions.
pub fn validate_ownership(m: &OwnershipModel) -> Result<(), ConfigurationError> {
    check_interest(&m.wi, "wi")?;
    check_interest(&m.nri, "nri")?;
    for (field, opt) in [
        ("lease_nri", &m.lease_nri),
        ("oil_nri", &m.oil_nri),
        ("gas_nri", &m.gas_nri),
        ("ngl_nri", &m.ngl_nri),
        ("drip_condensate_nri", &m.drip_condensate_nri),
    ] {
        if let Some(i) = opt {
            check_interest(i, field)?;
        }
    }
    Ok(())
}

/// Validate stream percentages and yields.
pub fn validate_stream(s: &StreamProperties) -> Result<(), ConfigurationError> {
    for (field, pct) in [
        ("oil_loss_pct", s.oil_loss_pct),
        ("oil_shrink_pct", s.oil_shrink_pct),
        ("gas_loss_pct", s.gas_loss_pct),
        ("gas_flare_pct", s.gas_flare_pct),
        ("gas_shrink_pct", s.gas_shrink_pct),
    ] {
        check_fraction(pct / 100.0, field)?;
    }
    if s.ngl_yield < 0.0 || s.drip_condensate_yield < 0.0 {
        return Err(ConfigurationError::invalid(None, "yield", "must be >= 0"));
    }
    Ok(())
}

/// Severance tracks a single phase may carry.
pub const MAX_SEVERANCE_TRACKS: usize = 2;

/// Validate tax models: at most [`MAX_SEVERANCE_TRACKS`] per phase. The error
/// column is the position of the first track past the limit.
pub fn validate_taxes(t: &ProductionTaxModel) -> Result<(), ConfigurationError> {
    for product in Product::ALL {
        let n = t.severance.phase(product).tracks.len();
        if n > MAX_SEVERANCE_TRACKS {
            return Err(ConfigurationError::invalid(
                Some(MAX_SEVERANCE_TRACKS + 1),
                &format!("severance.{}", product.as_str()),
                format!("{n} tracks given, at most 2 allowed"),
            ));
        }
    }
    if let Some(fee) = &t.severance.impact_fee {
        if !fee.average_gas_price.is_finite() || fee.average_gas_price < 0.0 {
            return Err(ConfigurationError::invalid(
                None,
                "impact_fee.average_gas_price",
                "must be a non-negative price",
            ));
        }
    }
    Ok(())
}

fn check_category<C: FromStr>(raw: &str, column: usize) -> Result<(), ConfigurationError> {
    raw.parse::<C>()
        .map(|_| ())
        .map_err(|_| ConfigurationError::InvalidCategory {
            column: Some(column),
            category: raw.to_string(),
        })
}

/// Check every expense row names a known category. `column` is the row's
/// 1-based position within its own table.
pub fn validate_expenses(e: &ExpenseModel) -> Result<(), ConfigurationError> {
    for (i, row) in e.fixed.iter().enumerate() {
        check_category::<FixedCategory>(&row.category, i + 1)?;
    }
    for (i, row) in e.variable.iter().enumerate() {
        check_category::<VariableCategory>(&row.category, i + 1)?;
    }
    for (i, row) in e.carbon.iter().enumerate() {
        check_category::<CarbonCategory>(&row.category, i + 1)?;
    }
    Ok(())
}

/// Validate the parts of a well input that are not checked while rows are parsed.
pub fn validate_well(w: &WellInput) -> Result<(), ConfigurationError> {
    if w.id.trim().is_empty() {
        return Err(ConfigurationError::invalid(None, "id", "must not be empty"));
    }
    if w.dates.max_econ_life_years == 0 {
        return Err(ConfigurationError::invalid(
            None,
            "max_econ_life_years",
            "must be > 0",
        ));
    }
    if !w.well_count.is_finite() || w.well_count < 0.0 {
        return Err(ConfigurationError::invalid(None, "well_count", "must be >= 0"));
    }
    validate_ownership(&w.ownership)?;
    validate_stream(&w.stream)?;
    validate_expenses(&w.expenses)?;
    validate_taxes(&w.taxes)?;
    for (i, s) in w.shut_ins.iter().enumerate() {
        if s.end < s.start {
            return Err(ConfigurationError::invalid(
                Some(i + 1),
                "shut_ins",
                "end precedes start",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn well() -> WellInput {
        WellInput {
            id: "W-1".into(),
            header: WellHeader::default(),
            schedule: ScheduleMilestones::new(),
            production: ProductionSeries::default(),
            forecast_start: None,
            dates: DatesModel {
                as_of_date: NaiveDate::from_ymd_opt(2022, 1, 1).unwrap(),
                discount_date: None,
                first_production_date: None,
                max_econ_life_years: 50,
                cutoff: CutoffCriteria::MaxLife,
                cash_flow_prior_to_as_of_date: None,
            },
            capex: CapexModel::default(),
            expenses: ExpenseModel::default(),
            taxes: ProductionTaxModel::default(),
            ownership: OwnershipModel::default(),
            stream: StreamProperties::default(),
            risking: RiskingModel::default(),
            shut_ins: vec![],
            well_count: 1.0,
        }
    }

    #[test]
    fn default_well_validates() {
        validate_well(&well()).unwrap();
    }

    #[test]
    fn rejects_three_severance_tracks() {
        let mut w = well();
        let track = Track {
            unit: SeveranceUnit::PctOfRevenue,
            schedule: ValueSchedule::Flat { value: 4.6 },
            escalation_start: None,
            escalation: None,
            cap: None,
        };
        w.taxes.severance.gas.tracks = vec![track.clone(), track.clone(), track];
        match validate_well(&w) {
            Err(ConfigurationError::InvalidValue { column, field, .. }) => {
                assert_eq!(column, Some(3));
                assert_eq!(field, "severance.gas");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    fn fixed_row(category: &str) -> FixedExpenseRow {
        FixedExpenseRow {
            category: category.to_string(),
            track: Track {
                unit: FixedUnit::PerMonth,
                schedule: ValueSchedule::Flat { value: 100.0 },
                escalation_start: None,
                escalation: None,
                cap: None,
            },
            flags: ExpenseFlags::default(),
        }
    }

    #[test]
    fn unknown_expense_category_reports_its_row() {
        let mut w = well();
        w.expenses.fixed = vec![
            fixed_row("monthly_well_cost"),
            fixed_row("other_monthly_cost_2"),
            fixed_row("bogus_cost"),
        ];
        assert_eq!(
            validate_well(&w),
            Err(ConfigurationError::InvalidCategory {
                column: Some(3),
                category: "bogus_cost".into(),
            })
        );
    }

    #[test]
    fn category_names_parse_loosely() {
        assert_eq!(
            "Other Monthly Cost 1".parse::<FixedCategory>(),
            Ok(FixedCategory::OtherMonthlyCost1)
        );
        assert_eq!("co2e".parse::<CarbonCategory>(), Ok(CarbonCategory::Co2e));
        assert!("other_monthly_cost1".parse::<FixedCategory>().is_err());
        assert!("marketing".parse::<VariableCategory>().is_ok());
    }

    #[test]
    fn rejects_inverted_shut_in() {
        let mut w = well();
        w.shut_ins.push(ShutInWindow {
            start: NaiveDate::from_ymd_opt(2022, 3, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2022, 2, 1).unwrap(),
            fixed_expense: false,
            capex: true,
            production: false,
        });
        let err = validate_well(&w).unwrap_err();
        assert_eq!(err.column(), Some(1));
    }

    #[test]
    fn engine_config_defaults_from_empty_yaml() {
        let cfg: EngineConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(cfg, EngineConfig::default());
    }

    proptest! {
        #[test]
        fn wi_outside_unit_interval_is_rejected(wi in 1.0001f64..10.0) {
            let mut w = well();
            w.ownership.wi = Interest::Scalar(wi);
            prop_assert!(validate_well(&w).is_err());
        }

        #[test]
        fn wi_inside_unit_interval_is_accepted(wi in 0.0f64..=1.0) {
            let mut w = well();
            w.ownership.wi = Interest::Scalar(wi);
            prop_assert!(validate_well(&w).is_ok());
        }
    }
}
