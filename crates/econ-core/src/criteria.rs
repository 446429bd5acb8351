//! Closed set of date criteria and the capex row that carries one.
//!
//! Assumption tables arrive with loosely keyed rows (`{"offset_to_fpd": {"days": 30}}`).
//! They are converted once, at the model boundary, into the tagged [`Criteria`]
//! variant so downstream code never inspects key names.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigurationError;
use crate::models::EscalationModel;

/// Anchor dates a named offset can be measured from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OffsetBase {
    Fpd,
    AsOfDate,
    DiscountDate,
    FirstSegment,
    EconLimit,
}

/// Phase whose daily-average gross rate drives a threshold criteria.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatePhase {
    Oil,
    Gas,
    Water,
    TotalFluid,
}

/// How a row's date is determined. Exactly one per row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Criteria {
    /// Explicit calendar date.
    Date { date: NaiveDate },
    /// First month the phase rate drops to or below `threshold` (units/day).
    RateThreshold { phase: RatePhase, threshold: f64 },
    /// Named schedule milestone plus a day delta.
    ScheduleOffset { milestone: String, days: i64 },
    /// Well header date field plus a day delta.
    HeaderOffset { field: String, days: i64 },
    /// One of the well's own key dates plus a day delta.
    NamedOffset { base: OffsetBase, days: i64 },
}

/// Keys recognised in a raw row, in the order they are reported.
pub const CRITERIA_KEYS: [&str; 12] = [
    "date",
    "offset_to_fpd",
    "offset_to_as_of_date",
    "offset_to_discount_date",
    "offset_to_first_segment",
    "offset_to_econ_limit",
    "oil_rate",
    "gas_rate",
    "water_rate",
    "total_fluid_rate",
    "schedule",
    "header",
];

impl Criteria {
    pub fn is_econ_limit_offset(&self) -> bool {
        matches!(
            self,
            Criteria::NamedOffset {
                base: OffsetBase::EconLimit,
                ..
            }
        )
    }

    /// Build the variant from a loose key map. Keys outside [`CRITERIA_KEYS`] are ignored.
    pub fn from_keys(
        keys: &Map<String, Value>,
        column: Option<usize>,
    ) -> Result<Self, ConfigurationError> {
        let present: Vec<&str> = CRITERIA_KEYS
            .iter()
            .copied()
            .filter(|k| keys.get(*k).is_some_and(|v| !v.is_null()))
            .collect();
        let key = match present.as_slice() {
            [] => return Err(ConfigurationError::MissingCriteria { column }),
            [one] => *one,
            many => {
                return Err(ConfigurationError::AmbiguousCriteria {
                    column,
                    keys: many.iter().map(|k| k.to_string()).collect(),
                })
            }
        };
        let value = &keys[key];
        let criteria = match key {
            "date" => Criteria::Date {
                date: parse_date(value, column, key)?,
            },
            "offset_to_fpd" => named(OffsetBase::Fpd, value, column, key)?,
            "offset_to_as_of_date" => named(OffsetBase::AsOfDate, value, column, key)?,
            "offset_to_discount_date" => named(OffsetBase::DiscountDate, value, column, key)?,
            "offset_to_first_segment" => named(OffsetBase::FirstSegment, value, column, key)?,
            "offset_to_econ_limit" => named(OffsetBase::EconLimit, value, column, key)?,
            "oil_rate" => rate(RatePhase::Oil, value, column, key)?,
            "gas_rate" => rate(RatePhase::Gas, value, column, key)?,
            "water_rate" => rate(RatePhase::Water, value, column, key)?,
            "total_fluid_rate" => rate(RatePhase::TotalFluid, value, column, key)?,
            "schedule" => Criteria::ScheduleOffset {
                milestone: string_field(value, "milestone", column, key)?,
                days: days_of(value, column, key)?,
            },
            _ => Criteria::HeaderOffset {
                field: string_field(value, "field", column, key)?,
                days: days_of(value, column, key)?,
            },
        };
        Ok(criteria)
    }
}

fn parse_date(value: &Value, column: Option<usize>, key: &str) -> Result<NaiveDate, ConfigurationError> {
    let s = value
        .as_str()
        .ok_or_else(|| ConfigurationError::invalid(column, key, "expected a YYYY-MM-DD string"))?;
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| ConfigurationError::invalid(column, key, e.to_string()))
}

/// Accepts either a bare integer or `{days: n}`.
fn days_of(value: &Value, column: Option<usize>, key: &str) -> Result<i64, ConfigurationError> {
    let raw = match value {
        Value::Object(obj) => obj.get("days").cloned().unwrap_or(Value::from(0)),
        other => other.clone(),
    };
    raw.as_i64()
        .or_else(|| raw.as_f64().map(|f| f.round() as i64))
        .ok_or_else(|| ConfigurationError::invalid(column, key, "expected an integer day count"))
}

fn named(
    base: OffsetBase,
    value: &Value,
    column: Option<usize>,
    key: &str,
) -> Result<Criteria, ConfigurationError> {
    Ok(Criteria::NamedOffset {
        base,
        days: days_of(value, column, key)?,
    })
}

fn rate(
    phase: RatePhase,
    value: &Value,
    column: Option<usize>,
    key: &str,
) -> Result<Criteria, ConfigurationError> {
    let threshold = value
        .as_f64()
        .filter(|t| t.is_finite() && *t >= 0.0)
        .ok_or_else(|| ConfigurationError::invalid(column, key, "expected a non-negative rate"))?;
    Ok(Criteria::RateThreshold { phase, threshold })
}

fn string_field(
    value: &Value,
    name: &str,
    column: Option<usize>,
    key: &str,
) -> Result<String, ConfigurationError> {
    value
        .get(name)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ConfigurationError::invalid(column, key, format!("missing '{name}'")))
}

/// Fixed set of capital expenditure categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapexCategory {
    Drilling,
    Completion,
    Facilities,
    Pipelines,
    ArtificialLift,
    Workover,
    Leasehold,
    Pad,
    WaterLine,
    Legal,
    Exploration,
    Development,
    Other,
    Abandonment,
    Salvage,
}

impl CapexCategory {
    pub const ALL: [CapexCategory; 15] = [
        CapexCategory::Drilling,
        CapexCategory::Completion,
        CapexCategory::Facilities,
        CapexCategory::Pipelines,
        CapexCategory::ArtificialLift,
        CapexCategory::Workover,
        CapexCategory::Leasehold,
        CapexCategory::Pad,
        CapexCategory::WaterLine,
        CapexCategory::Legal,
        CapexCategory::Exploration,
        CapexCategory::Development,
        CapexCategory::Other,
        CapexCategory::Abandonment,
        CapexCategory::Salvage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CapexCategory::Drilling => "drilling",
            CapexCategory::Completion => "completion",
            CapexCategory::Facilities => "facilities",
            CapexCategory::Pipelines => "pipelines",
            CapexCategory::ArtificialLift => "artificial_lift",
            CapexCategory::Workover => "workover",
            CapexCategory::Leasehold => "leasehold",
            CapexCategory::Pad => "pad",
            CapexCategory::WaterLine => "water_line",
            CapexCategory::Legal => "legal",
            CapexCategory::Exploration => "exploration",
            CapexCategory::Development => "development",
            CapexCategory::Other => "other",
            CapexCategory::Abandonment => "abandonment",
            CapexCategory::Salvage => "salvage",
        }
    }

    /// Abandonment and salvage survive econ-limit and max-life filtering.
    pub fn is_end_of_life(&self) -> bool {
        matches!(self, CapexCategory::Abandonment | CapexCategory::Salvage)
    }
}

impl fmt::Display for CapexCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lowercase snake_case form of a free-form category name.
pub(crate) fn normalize_name(s: &str) -> String {
    s.trim().to_ascii_lowercase().replace([' ', '-'], "_")
}

impl FromStr for CapexCategory {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm = normalize_name(s);
        CapexCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == norm)
            .ok_or(())
    }
}

/// Whether a row's amounts are 8/8ths (gross) or already the owner's net share.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapexCalculation {
    #[default]
    Gross,
    Net,
}

fn default_one() -> Decimal {
    Decimal::ONE
}

/// Capex row as it appears in an assumption table.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RawCapexRow {
    pub category: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tangible: Decimal,
    #[serde(default)]
    pub intangible: Decimal,
    #[serde(default)]
    pub escalation_start: Option<Map<String, Value>>,
    #[serde(default)]
    pub escalation_model: Option<EscalationModel>,
    #[serde(default = "default_one")]
    pub deal_terms: Decimal,
    #[serde(default)]
    pub after_econ_limit: bool,
    #[serde(default)]
    pub calculation: CapexCalculation,
    /// Remaining keys; exactly one must be a criteria key.
    #[serde(flatten)]
    pub criteria: Map<String, Value>,
}

/// Typed capex row with exactly one criteria.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CriteriaRow {
    /// 1-based position in the source table.
    pub column: usize,
    pub category: CapexCategory,
    pub description: Option<String>,
    pub tangible: Decimal,
    pub intangible: Decimal,
    pub criteria: Criteria,
    /// `None` means escalation starts at the row's own date.
    pub escalation_start: Option<Criteria>,
    pub escalation_model: Option<EscalationModel>,
    pub deal_terms: Decimal,
    pub after_econ_limit: bool,
    pub calculation: CapexCalculation,
}

impl CriteriaRow {
    /// Convert a raw row; `column` is its 1-based table position.
    pub fn from_raw(raw: &RawCapexRow, column: usize) -> Result<Self, ConfigurationError> {
        let col = Some(column);
        let category = raw
            .category
            .parse::<CapexCategory>()
            .map_err(|_| ConfigurationError::InvalidCategory {
                column: col,
                category: raw.category.clone(),
            })?;
        if raw.deal_terms < Decimal::ZERO {
            return Err(ConfigurationError::invalid(col, "deal_terms", "must be >= 0"));
        }
        let criteria = Criteria::from_keys(&raw.criteria, col)?;
        let escalation_start = raw
            .escalation_start
            .as_ref()
            .map(|keys| Criteria::from_keys(keys, col))
            .transpose()?;
        Ok(Self {
            column,
            category,
            description: raw.description.clone(),
            tangible: raw.tangible,
            intangible: raw.intangible,
            criteria,
            escalation_start,
            escalation_model: raw.escalation_model.clone(),
            deal_terms: raw.deal_terms,
            after_econ_limit: raw.after_econ_limit,
            calculation: raw.calculation,
        })
    }
}
