//! Severance and ad valorem production taxes.

use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;
use tracing::debug;

use econ_core::calendar::{days_in_month, month_offset};
use econ_core::{
    AdValoremUnit, ExpenseResult, ExpenseSeries, ImpactFeeModel, Product, ProductionTaxModel,
    SeveranceUnit, TaxResult,
};

use crate::expense::StreamContext;

/// Annual Pennsylvania impact fee per well by year of age (rows) and average
/// gas price band (columns).
const IMPACT_FEE_SCHEDULE: [[f64; 5]; 15] = [
    [40_000.0, 45_000.0, 50_000.0, 55_000.0, 60_000.0],
    [30_000.0, 35_000.0, 40_000.0, 45_000.0, 55_000.0],
    [25_000.0, 30_000.0, 30_000.0, 35_000.0, 45_000.0],
    [10_000.0, 15_000.0, 15_000.0, 20_000.0, 20_000.0],
    [10_000.0, 15_000.0, 15_000.0, 20_000.0, 20_000.0],
    [10_000.0, 15_000.0, 15_000.0, 20_000.0, 20_000.0],
    [10_000.0, 15_000.0, 15_000.0, 20_000.0, 20_000.0],
    [10_000.0, 15_000.0, 15_000.0, 20_000.0, 20_000.0],
    [10_000.0, 15_000.0, 15_000.0, 20_000.0, 20_000.0],
    [10_000.0, 15_000.0, 15_000.0, 20_000.0, 20_000.0],
    [5_000.0, 5_000.0, 10_000.0, 10_000.0, 10_000.0],
    [5_000.0, 5_000.0, 10_000.0, 10_000.0, 10_000.0],
    [5_000.0, 5_000.0, 10_000.0, 10_000.0, 10_000.0],
    [5_000.0, 5_000.0, 10_000.0, 10_000.0, 10_000.0],
    [5_000.0, 5_000.0, 10_000.0, 10_000.0, 10_000.0],
];

fn price_band(price: f64) -> usize {
    if price <= 2.25 {
        0
    } else if price < 3.0 {
        1
    } else if price < 5.0 {
        2
    } else if price < 6.0 {
        3
    } else {
        4
    }
}

/// Annual fee for a well in its `age_years`-th year (0-based); zero past year 15.
pub fn impact_fee_annual(age_years: usize, average_gas_price: f64) -> f64 {
    IMPACT_FEE_SCHEDULE
        .get(age_years)
        .map_or(0.0, |row| row[price_band(average_gas_price)])
}

/// Fraction of each month between first production and the econ limit.
pub fn active_fraction(ctx: &StreamContext<'_>) -> Vec<f64> {
    let dates = ctx.resolver.context();
    let (start, end) = (dates.first_production_date, dates.cutoff_date);
    ctx.timeline
        .dates()
        .map(|month| {
            let days = f64::from(days_in_month(month));
            let from = if month_offset(start, month) == 0 {
                start.day()
            } else {
                1
            };
            let to = if month_offset(end, month) == 0 {
                end.day()
            } else {
                days_in_month(month)
            };
            if month_offset(start, month) < 0 || month_offset(end, month) > 0 || to < from {
                0.0
            } else {
                f64::from(to - from + 1) / days
            }
        })
        .collect()
}

fn deductions(
    expenses: &ExpenseResult,
    n: usize,
    pick: impl Fn(&ExpenseSeries) -> bool,
) -> Vec<f64> {
    ExpenseResult::sum_net(expenses.all().filter(|s| pick(s)), n)
}

fn add_into(acc: &mut [f64], values: &[f64]) {
    for (a, v) in acc.iter_mut().zip(values) {
        *a += v;
    }
}

/// Computes severance and ad valorem tax of a well.
#[derive(Clone, Copy, Debug)]
pub struct TaxCalculator<'a> {
    pub model: &'a ProductionTaxModel,
}

impl<'a> TaxCalculator<'a> {
    pub fn new(model: &'a ProductionTaxModel) -> Self {
        Self { model }
    }

    pub fn compute(&self, ctx: &StreamContext<'_>, expenses: &ExpenseResult) -> TaxResult {
        let n = ctx.len();
        let active = active_fraction(ctx);
        let mut severance = BTreeMap::new();
        let mut severance_total = vec![0.0; n];
        for product in Product::ALL {
            let mut values = match (&self.model.severance.impact_fee, product) {
                (Some(fee), Product::Gas) => impact_fee(fee, ctx),
                _ => self.severance(product, ctx, expenses, &active),
            };
            ctx.stop_after_cutoff(&mut values);
            add_into(&mut severance_total, &values);
            severance.insert(product, values);
        }
        let mut ad_valorem = self.ad_valorem(ctx, expenses, &severance_total, &active);
        ctx.stop_after_cutoff(&mut ad_valorem);
        TaxResult {
            severance,
            severance_total,
            ad_valorem,
        }
    }

    fn severance(
        &self,
        product: Product,
        ctx: &StreamContext<'_>,
        expenses: &ExpenseResult,
        active: &[f64],
    ) -> Vec<f64> {
        let n = ctx.len();
        let phase = self.model.severance.phase(product);
        let mut out = vec![0.0; n];
        for track in &phase.tracks {
            let values = match track.unit {
                SeveranceUnit::PctOfRevenue => {
                    let deduct = deductions(expenses, n, |s| {
                        s.deduct_before_severance_tax && s.product == Some(product)
                    });
                    let base: Vec<f64> = (0..n)
                        .map(|i| {
                            ctx.revenue.product(product).get(i).copied().unwrap_or(0.0) - deduct[i]
                        })
                        .collect();
                    crate::mul(&ctx.track(track, 0.01), &base)
                }
                SeveranceUnit::PctOfProduction => {
                    let value = crate::mul(
                        &ctx.net_volume(product, phase.shrinkage),
                        &ctx.realized_price(product),
                    );
                    crate::mul(&ctx.track(track, 0.01), &value)
                }
                SeveranceUnit::PerUnitVolume => crate::mul(
                    &ctx.track(track, 1.0),
                    &ctx.net_volume(product, phase.shrinkage),
                ),
                SeveranceUnit::PerMonth => {
                    crate::mul(&crate::mul(&ctx.track(track, 1.0), ctx.wi()), active)
                }
            };
            add_into(&mut out, &values);
        }
        out
    }

    fn ad_valorem(
        &self,
        ctx: &StreamContext<'_>,
        expenses: &ExpenseResult,
        severance_total: &[f64],
        active: &[f64],
    ) -> Vec<f64> {
        let n = ctx.len();
        let model = &self.model.ad_valorem;
        let mut out = vec![0.0; n];
        for track in &model.tracks {
            let values = match track.unit {
                AdValoremUnit::PctOfRevenue => {
                    let revenue = ctx.revenue.total();
                    let deduct = deductions(expenses, n, |s| s.deduct_before_ad_valorem_tax);
                    let base: Vec<f64> = (0..n)
                        .map(|i| {
                            let sev = if model.deduct_severance_tax {
                                severance_total[i]
                            } else {
                                0.0
                            };
                            revenue.get(i).copied().unwrap_or(0.0) - sev - deduct[i]
                        })
                        .collect();
                    crate::mul(&ctx.track(track, 0.01), &base)
                }
                AdValoremUnit::PctOfProduction => {
                    let mut value = vec![0.0; n];
                    for product in Product::ALL {
                        add_into(
                            &mut value,
                            &crate::mul(
                                &ctx.net_volume(product, model.shrinkage),
                                &ctx.realized_price(product),
                            ),
                        );
                    }
                    crate::mul(&ctx.track(track, 0.01), &value)
                }
                AdValoremUnit::PerBoe => crate::mul(&ctx.track(track, 1.0), &ctx.volumes.net_boe),
                AdValoremUnit::PerMonth => {
                    crate::mul(&crate::mul(&ctx.track(track, 1.0), ctx.wi()), active)
                }
            };
            add_into(&mut out, &values);
        }
        out.into_iter().map(|v| v.max(0.0)).collect()
    }
}

/// Monthly impact fee (annual fee / 12 times WI) measured from the anchor date.
fn impact_fee(fee: &ImpactFeeModel, ctx: &StreamContext<'_>) -> Vec<f64> {
    let anchor: Option<NaiveDate> = match &fee.anchor {
        Some(criteria) => ctx.resolver.resolve(criteria).map(|r| r.date),
        None => ctx.resolver.refs().header.date("spud_date"),
    };
    let Some(anchor) = anchor else {
        debug!("impact fee anchor missing; no fee charged");
        return vec![0.0; ctx.len()];
    };
    let wi = ctx.wi();
    ctx.timeline
        .dates()
        .enumerate()
        .map(|(i, month)| {
            let age = month_offset(anchor, month);
            let Ok(age) = usize::try_from(age) else {
                return 0.0;
            };
            impact_fee_annual(age / 12, fee.average_gas_price) / 12.0
                * wi.get(i).copied().unwrap_or(0.0)
        })
        .collect()
}
