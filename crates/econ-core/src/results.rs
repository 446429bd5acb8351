//! Output bundles produced per well and per group.

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::calendar::{add_years, month_offset, Timeline};
use crate::criteria::{CapexCategory, CriteriaRow};
use crate::models::Product;

/// Canonical key dates of one well evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateContext {
    pub first_production_date: NaiveDate,
    pub as_of_date: NaiveDate,
    pub discount_date: NaiveDate,
    pub first_segment_date: Option<NaiveDate>,
    /// Econ limit.
    pub cutoff_date: NaiveDate,
    pub cash_flow_start_date: NaiveDate,
    pub cash_flow_end_date: NaiveDate,
    pub max_econ_life_years: u32,
}

impl DateContext {
    pub fn max_life_date(&self) -> NaiveDate {
        add_years(self.as_of_date, self.max_econ_life_years)
    }

    /// Month offset `t` of `date` from first production.
    pub fn offset(&self, date: NaiveDate) -> i32 {
        month_offset(self.first_production_date, date)
    }

    /// The cutoff precedes the cash flow start month.
    pub fn is_unecon(&self) -> bool {
        month_offset(self.cash_flow_start_date, self.cutoff_date) < 0
    }

    /// Cash flow start through cash flow end.
    pub fn timeline(&self) -> Timeline {
        Timeline::between(self.cash_flow_start_date, self.cash_flow_end_date)
    }
}

/// A resolved capex row with its computed dollars.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CapexEvent {
    pub row: CriteriaRow,
    pub date: NaiveDate,
    /// Months from first production.
    pub offset: i32,
    pub tangible_gross: Decimal,
    pub intangible_gross: Decimal,
    pub tangible_net: Decimal,
    pub intangible_net: Decimal,
}

impl CapexEvent {
    pub fn category(&self) -> CapexCategory {
        self.row.category
    }

    pub fn total_net(&self) -> Decimal {
        self.tangible_net + self.intangible_net
    }

    pub fn total_gross(&self) -> Decimal {
        self.tangible_gross + self.intangible_gross
    }

    /// Copy with every dollar figure multiplied by `ratio`.
    pub fn scaled(&self, ratio: Decimal) -> Self {
        Self {
            row: self.row.clone(),
            date: self.date,
            offset: self.offset,
            tangible_gross: self.tangible_gross * ratio,
            intangible_gross: self.intangible_gross * ratio,
            tangible_net: self.tangible_net * ratio,
            intangible_net: self.intangible_net * ratio,
        }
    }
}

pub fn decimal_to_f64(d: Decimal) -> f64 {
    d.to_f64().unwrap_or(0.0)
}

/// Monthly capex series plus the events they came from.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CapexResult {
    pub tangible: Vec<f64>,
    pub intangible: Vec<f64>,
    /// Net tangible + intangible.
    pub total: Vec<f64>,
    pub gross_total: Vec<f64>,
    pub by_category: BTreeMap<CapexCategory, Vec<f64>>,
    pub events: Vec<CapexEvent>,
}

impl CapexResult {
    /// Lay events onto `timeline`; events outside it are kept in the list only.
    pub fn from_events(events: Vec<CapexEvent>, timeline: &Timeline) -> Self {
        let mut out = Self {
            tangible: timeline.zeros(),
            intangible: timeline.zeros(),
            total: timeline.zeros(),
            gross_total: timeline.zeros(),
            by_category: BTreeMap::new(),
            events: vec![],
        };
        for ev in &events {
            let Some(i) = timeline.index_of(ev.date) else {
                continue;
            };
            let tan = decimal_to_f64(ev.tangible_net);
            let intan = decimal_to_f64(ev.intangible_net);
            out.tangible[i] += tan;
            out.intangible[i] += intan;
            out.total[i] += tan + intan;
            out.gross_total[i] += decimal_to_f64(ev.total_gross());
            out.by_category
                .entry(ev.category())
                .or_insert_with(|| timeline.zeros())[i] += tan + intan;
        }
        out.events = events;
        out
    }
}

/// One expense row's monthly dollars.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExpenseSeries {
    pub category: String,
    pub gross: Vec<f64>,
    /// Owner's share; the monthly dollar array.
    pub net: Vec<f64>,
    pub affect_econ_limit: bool,
    pub deduct_before_severance_tax: bool,
    pub deduct_before_ad_valorem_tax: bool,
    /// Product the row is charged against, if any.
    pub product: Option<Product>,
}

/// Expense family output.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpenseResult {
    pub fixed: Vec<ExpenseSeries>,
    pub variable: Vec<ExpenseSeries>,
    pub water_disposal: Vec<ExpenseSeries>,
    pub carbon: Vec<ExpenseSeries>,
}

impl ExpenseResult {
    pub fn all(&self) -> impl Iterator<Item = &ExpenseSeries> {
        self.fixed
            .iter()
            .chain(&self.variable)
            .chain(&self.water_disposal)
            .chain(&self.carbon)
    }

    pub fn sum_net<'a>(series: impl IntoIterator<Item = &'a ExpenseSeries>, len: usize) -> Vec<f64> {
        let mut out = vec![0.0; len];
        for s in series {
            for (o, v) in out.iter_mut().zip(&s.net) {
                *o += v;
            }
        }
        out
    }

    pub fn fixed_total(&self, len: usize) -> Vec<f64> {
        Self::sum_net(&self.fixed, len)
    }

    /// Variable plus carbon.
    pub fn variable_total(&self, len: usize) -> Vec<f64> {
        Self::sum_net(self.variable.iter().chain(&self.carbon), len)
    }

    pub fn water_disposal_total(&self, len: usize) -> Vec<f64> {
        Self::sum_net(&self.water_disposal, len)
    }

    pub fn total(&self, len: usize) -> Vec<f64> {
        Self::sum_net(self.all(), len)
    }

    pub fn econ_limit_total(&self, len: usize) -> Vec<f64> {
        Self::sum_net(self.all().filter(|s| s.affect_econ_limit), len)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TaxResult {
    pub severance: BTreeMap<Product, Vec<f64>>,
    pub severance_total: Vec<f64>,
    pub ad_valorem: Vec<f64>,
}

impl TaxResult {
    pub fn total(&self) -> Vec<f64> {
        self.severance_total
            .iter()
            .zip(&self.ad_valorem)
            .map(|(s, a)| s + a)
            .collect()
    }
}

/// Per-phase volumes at one stage of the wellhead → sales chain.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseVolumes {
    pub oil: Vec<f64>,
    pub gas: Vec<f64>,
    pub water: Vec<f64>,
    pub ngl: Vec<f64>,
    pub drip_condensate: Vec<f64>,
    #[serde(default)]
    pub compositional: BTreeMap<String, Vec<f64>>,
}

impl PhaseVolumes {
    pub fn zeros(len: usize) -> Self {
        Self {
            oil: vec![0.0; len],
            gas: vec![0.0; len],
            water: vec![0.0; len],
            ngl: vec![0.0; len],
            drip_condensate: vec![0.0; len],
            compositional: BTreeMap::new(),
        }
    }

    pub fn product(&self, product: Product) -> &[f64] {
        match product {
            Product::Oil => &self.oil,
            Product::Gas => &self.gas,
            Product::Ngl => &self.ngl,
            Product::DripCondensate => &self.drip_condensate,
        }
    }
}

/// Ownership key of a split.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnershipKey {
    Wi,
    Nri,
    LeaseNri,
    OneMinusWi,
    OneMinusNri,
    OneMinusLeaseNri,
}

/// Monthly WI / NRI / lease NRI of one phase.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseOwnership {
    pub wi: Vec<f64>,
    pub nri: Vec<f64>,
    pub lease_nri: Vec<f64>,
}

impl PhaseOwnership {
    pub fn get(&self, key: OwnershipKey) -> Vec<f64> {
        let complement = |v: &Vec<f64>| v.iter().map(|x| 1.0 - x).collect();
        match key {
            OwnershipKey::Wi => self.wi.clone(),
            OwnershipKey::Nri => self.nri.clone(),
            OwnershipKey::LeaseNri => self.lease_nri.clone(),
            OwnershipKey::OneMinusWi => complement(&self.wi),
            OwnershipKey::OneMinusNri => complement(&self.nri),
            OwnershipKey::OneMinusLeaseNri => complement(&self.lease_nri),
        }
    }
}

/// Ownership per product; water uses the WI of the oil split.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OwnershipSplit {
    pub phases: BTreeMap<Product, PhaseOwnership>,
}

impl OwnershipSplit {
    pub fn phase(&self, product: Product) -> Option<&PhaseOwnership> {
        self.phases.get(&product)
    }

    pub fn wi(&self) -> &[f64] {
        self.phases
            .get(&Product::Oil)
            .map(|p| p.wi.as_slice())
            .unwrap_or(&[])
    }

    pub fn nri(&self) -> &[f64] {
        self.phases
            .get(&Product::Oil)
            .map(|p| p.nri.as_slice())
            .unwrap_or(&[])
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VolumeResult {
    pub wellhead: PhaseVolumes,
    pub unshrunk: PhaseVolumes,
    pub sales: PhaseVolumes,
    /// Sales volumes by ownership key (`gross`, `wi`, `nri`, `lease_nri`).
    pub ownership: BTreeMap<String, PhaseVolumes>,
    /// Wellhead BOE using the wet-gas factor.
    pub wellhead_boe: Vec<f64>,
    /// Sales BOE using the dry-gas factor.
    pub boe: Vec<f64>,
    pub mcfe: Vec<f64>,
    pub net_boe: Vec<f64>,
    pub net_mcfe: Vec<f64>,
}

/// Net revenue per product, as delivered by the upstream revenue component.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseRevenue {
    pub oil: Vec<f64>,
    pub gas: Vec<f64>,
    pub ngl: Vec<f64>,
    pub drip_condensate: Vec<f64>,
}

impl PhaseRevenue {
    pub fn zeros(len: usize) -> Self {
        Self {
            oil: vec![0.0; len],
            gas: vec![0.0; len],
            ngl: vec![0.0; len],
            drip_condensate: vec![0.0; len],
        }
    }

    pub fn product(&self, product: Product) -> &[f64] {
        match product {
            Product::Oil => &self.oil,
            Product::Gas => &self.gas,
            Product::Ngl => &self.ngl,
            Product::DripCondensate => &self.drip_condensate,
        }
    }

    pub fn total(&self) -> Vec<f64> {
        (0..self.oil.len())
            .map(|i| {
                Product::ALL
                    .iter()
                    .map(|p| self.product(*p).get(i).copied().unwrap_or(0.0))
                    .sum()
            })
            .collect()
    }
}

/// Per-well result bundle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WellResult {
    pub well_id: String,
    pub dates: DateContext,
    pub timeline: Timeline,
    pub unecon: bool,
    pub capex: CapexResult,
    pub expenses: ExpenseResult,
    pub taxes: TaxResult,
    pub volumes: VolumeResult,
    pub ownership: OwnershipSplit,
    pub revenue: PhaseRevenue,
    pub well_count: f64,
}

impl WellResult {
    /// Net revenue − expenses − taxes − capex per month.
    pub fn net_cash_flow(&self) -> Vec<f64> {
        let n = self.timeline.months;
        let rev = self.revenue.total();
        let exp = self.expenses.total(n);
        let tax = self.taxes.total();
        (0..n)
            .map(|i| {
                rev.get(i).copied().unwrap_or(0.0)
                    - exp[i]
                    - tax.get(i).copied().unwrap_or(0.0)
                    - self.capex.total.get(i).copied().unwrap_or(0.0)
            })
            .collect()
    }

    /// Net revenue − expenses − taxes per month (before capex).
    pub fn net_income(&self) -> Vec<f64> {
        let n = self.timeline.months;
        let rev = self.revenue.total();
        let exp = self.expenses.total(n);
        let tax = self.taxes.total();
        (0..n)
            .map(|i| {
                rev.get(i).copied().unwrap_or(0.0) - exp[i] - tax.get(i).copied().unwrap_or(0.0)
            })
            .collect()
    }
}
