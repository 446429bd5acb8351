//! Fixed, variable, water disposal and carbon expenses.
//!
//! Each row runs the same pipeline: unit normalization, escalation, cap,
//! deal terms, well count (per-well fixed costs only), then the ownership
//! basis that turns gross dollars into net ones.

use std::str::FromStr;

use econ_core::{
    safe_div, CarbonCategory, ExpenseFlags, ExpenseModel, ExpenseResult, ExpenseSeries,
    FixedCategory, FixedUnit, OwnershipSplit, PhaseRevenue, Product, Shrinkage, ShutInWindow,
    Timeline, Track, VariableCategory, VariableUnit, VolumeResult, WaterUnit,
};

use crate::dates::DateResolver;
use crate::ownership::basis_series;
use crate::schedule::{track_values, RateLookup};
use crate::shut_in::{monthly_multiplier, ShutInStream};

/// Per-well streams every expense and tax row reads from.
#[derive(Clone, Copy, Debug)]
pub struct StreamContext<'a> {
    pub timeline: &'a Timeline,
    pub resolver: &'a DateResolver<'a>,
    pub volumes: &'a VolumeResult,
    pub revenue: &'a PhaseRevenue,
    pub ownership: &'a OwnershipSplit,
    pub rates: &'a RateLookup,
    pub well_count: f64,
    pub shut_ins: &'a [ShutInWindow],
}

impl<'a> StreamContext<'a> {
    pub fn len(&self) -> usize {
        self.timeline.months
    }

    pub fn is_empty(&self) -> bool {
        self.timeline.is_empty()
    }

    /// Zero every month after the econ limit month.
    pub fn stop_after_cutoff(&self, values: &mut [f64]) {
        let last = self.timeline.offset_of(self.resolver.context().cutoff_date);
        for (i, v) in values.iter_mut().enumerate() {
            if i as i32 > last {
                *v = 0.0;
            }
        }
    }

    /// Gross volume of a product at the chosen shrinkage stage.
    pub fn gross_volume(&self, product: Product, shrinkage: Shrinkage) -> &'a [f64] {
        let stage = match shrinkage {
            Shrinkage::Shrunk => &self.volumes.sales,
            Shrinkage::Unshrunk => &self.volumes.unshrunk,
        };
        stage.product(product)
    }

    /// Net-interest volume of a product at the chosen shrinkage stage.
    pub fn net_volume(&self, product: Product, shrinkage: Shrinkage) -> Vec<f64> {
        let nri = self
            .ownership
            .phase(product)
            .map(|p| p.nri.as_slice())
            .unwrap_or(&[]);
        crate::mul(self.gross_volume(product, shrinkage), nri)
    }

    /// Net revenue per net sales unit.
    pub fn realized_price(&self, product: Product) -> Vec<f64> {
        let net_sales = self.net_volume(product, Shrinkage::Shrunk);
        let rev = self.revenue.product(product);
        (0..self.len())
            .map(|i| {
                safe_div(
                    rev.get(i).copied().unwrap_or(0.0),
                    net_sales.get(i).copied().unwrap_or(0.0),
                )
            })
            .collect()
    }

    pub fn track<U>(&self, track: &Track<U>, scale: f64) -> Vec<f64> {
        track_values(track, scale, self.timeline, self.resolver, self.rates)
    }

    pub fn wi(&self) -> &'a [f64] {
        self.ownership.wi()
    }
}

/// Gross dollars from net ones; when the fraction is zero gross equals net.
pub fn gross_from_net(net: &[f64], fraction: &[f64]) -> Vec<f64> {
    net.iter()
        .zip(fraction.iter().chain(std::iter::repeat(&0.0)))
        .map(|(n, f)| if *f == 0.0 { *n } else { n / f })
        .collect()
}

#[derive(Clone, Copy, Debug)]
enum Amount {
    Gross,
    Net,
}

/// Computes every expense family of a well.
#[derive(Clone, Copy, Debug)]
pub struct ExpenseCalculator<'a> {
    pub model: &'a ExpenseModel,
}

impl<'a> ExpenseCalculator<'a> {
    pub fn new(model: &'a ExpenseModel) -> Self {
        Self { model }
    }

    pub fn compute(&self, ctx: &StreamContext<'_>) -> ExpenseResult {
        let fixed_multiplier =
            monthly_multiplier(ctx.timeline, ctx.shut_ins, ShutInStream::FixedExpense);
        let fixed = self
            .model
            .fixed
            .iter()
            .map(|row| {
                let per_well = match row.track.unit {
                    FixedUnit::PerMonth => 1.0,
                    FixedUnit::PerWellPerMonth => ctx.well_count,
                };
                let values: Vec<f64> = ctx
                    .track(&row.track, 1.0)
                    .iter()
                    .zip(&fixed_multiplier)
                    .map(|(v, m)| v * per_well * m)
                    .collect();
                finish(
                    ctx,
                    label::<FixedCategory>(&row.category),
                    None,
                    &row.flags,
                    values,
                    Amount::Gross,
                )
            })
            .collect();

        let variable = self
            .model
            .variable
            .iter()
            .map(|row| {
                let product = row.product;
                let (values, amount) = match row.track.unit {
                    VariableUnit::PerUnitVolume => (
                        crate::mul(
                            &ctx.track(&row.track, 1.0),
                            ctx.gross_volume(product, row.shrinkage),
                        ),
                        Amount::Gross,
                    ),
                    VariableUnit::PctOfRevenue => (
                        crate::mul(&ctx.track(&row.track, 0.01), ctx.revenue.product(product)),
                        Amount::Net,
                    ),
                    VariableUnit::PctOfProduction => {
                        let volume = crate::mul(
                            ctx.gross_volume(product, row.shrinkage),
                            &ctx.realized_price(product),
                        );
                        (
                            crate::mul(&ctx.track(&row.track, 0.01), &volume),
                            Amount::Gross,
                        )
                    }
                    VariableUnit::PerMonth => (ctx.track(&row.track, 1.0), Amount::Gross),
                };
                let name = format!(
                    "{}_{}",
                    product.as_str(),
                    label::<VariableCategory>(&row.category)
                );
                finish(ctx, name, Some(product), &row.flags, values, amount)
            })
            .collect();

        let water_disposal = self
            .model
            .water_disposal
            .iter()
            .map(|row| {
                let rate = ctx.track(&row.track, 1.0);
                let values = match row.track.unit {
                    WaterUnit::PerUnitVolume => crate::mul(&rate, &ctx.volumes.sales.water),
                    WaterUnit::PerMonth => rate,
                };
                finish(
                    ctx,
                    "water_disposal".to_string(),
                    None,
                    &row.flags,
                    values,
                    Amount::Gross,
                )
            })
            .collect();

        let carbon = self
            .model
            .carbon
            .iter()
            .map(|row| {
                let tons: Vec<f64> = ctx
                    .volumes
                    .boe
                    .iter()
                    .map(|b| b * row.emission_factor)
                    .collect();
                let values = crate::mul(&ctx.track(&row.track, 1.0), &tons);
                finish(
                    ctx,
                    label::<CarbonCategory>(&row.category),
                    None,
                    &row.flags,
                    values,
                    Amount::Gross,
                )
            })
            .collect();

        ExpenseResult {
            fixed,
            variable,
            water_disposal,
            carbon,
        }
    }
}

/// Canonical spelling of a category; unparsed text passes through.
fn label<C: FromStr + ToString>(raw: &str) -> String {
    raw.parse::<C>()
        .map(|c| c.to_string())
        .unwrap_or_else(|_| raw.to_string())
}

/// Apply deal terms, ownership basis and the econ-limit stop to a row's dollars.
fn finish(
    ctx: &StreamContext<'_>,
    category: String,
    product: Option<Product>,
    flags: &ExpenseFlags,
    values: Vec<f64>,
    amount: Amount,
) -> ExpenseSeries {
    let n = ctx.len();
    let mut values: Vec<f64> = values.into_iter().map(|v| v * flags.deal_terms).collect();
    values.resize(n, 0.0);
    if flags.stop_at_econ_limit {
        ctx.stop_after_cutoff(&mut values);
    }
    let fraction = basis_series(ctx.ownership, flags.calculation, n);
    let (gross, net) = match amount {
        Amount::Gross => {
            let net = crate::mul(&values, &fraction);
            (values, net)
        }
        Amount::Net => (gross_from_net(&values, &fraction), values),
    };
    ExpenseSeries {
        category,
        gross,
        net,
        affect_econ_limit: flags.affect_econ_limit,
        deduct_before_severance_tax: flags.deduct_before_severance_tax,
        deduct_before_ad_valorem_tax: flags.deduct_before_ad_valorem_tax,
        product,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::ReferenceData;
    use crate::ownership::ownership_split;
    use chrono::NaiveDate;
    use econ_core::{
        CarbonExpenseRow, CarbonUnit, DateContext, FixedExpenseRow, Interest, OwnershipBasis,
        OwnershipModel, PhaseVolumes, ProductionSeries, ScheduleMilestones, ValueSchedule,
        VariableExpenseRow, WellHeader,
    };

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    struct Fixture {
        ctx: DateContext,
        header: WellHeader,
        schedule: ScheduleMilestones,
        production: ProductionSeries,
        timeline: Timeline,
        volumes: VolumeResult,
        revenue: PhaseRevenue,
        split: OwnershipSplit,
        rates: RateLookup,
    }

    fn fixture(wi: f64) -> Fixture {
        let timeline = Timeline::between(d(2022, 1, 1), d(2022, 4, 1));
        let mut sales = PhaseVolumes::zeros(4);
        sales.oil = vec![100.0; 4];
        sales.water = vec![10.0; 4];
        let volumes = VolumeResult {
            unshrunk: sales.clone(),
            sales,
            boe: vec![100.0; 4],
            ..VolumeResult::default()
        };
        let mut revenue = PhaseRevenue::zeros(4);
        revenue.oil = vec![4000.0; 4];
        Fixture {
            ctx: DateContext {
                first_production_date: d(2022, 1, 1),
                as_of_date: d(2022, 1, 1),
                discount_date: d(2022, 1, 1),
                first_segment_date: None,
                cutoff_date: d(2022, 3, 31),
                cash_flow_start_date: d(2022, 1, 1),
                cash_flow_end_date: d(2022, 4, 1),
                max_econ_life_years: 50,
            },
            header: WellHeader::default(),
            schedule: ScheduleMilestones::new(),
            production: ProductionSeries::default(),
            split: ownership_split(
                &OwnershipModel {
                    wi: Interest::Scalar(wi),
                    nri: Interest::Scalar(0.8 * wi),
                    ..OwnershipModel::default()
                },
                &timeline,
            ),
            timeline,
            volumes,
            revenue,
            rates: RateLookup::default(),
        }
    }

    fn flat<U>(unit: U, value: f64) -> Track<U> {
        Track {
            unit,
            schedule: ValueSchedule::Flat { value },
            escalation_start: None,
            escalation: None,
            cap: None,
        }
    }

    fn run(f: &Fixture, model: &ExpenseModel, well_count: f64) -> ExpenseResult {
        let resolver = DateResolver::new(
            &f.ctx,
            ReferenceData {
                header: &f.header,
                schedule: &f.schedule,
                production: &f.production,
            },
        );
        let ctx = StreamContext {
            timeline: &f.timeline,
            resolver: &resolver,
            volumes: &f.volumes,
            revenue: &f.revenue,
            ownership: &f.split,
            rates: &f.rates,
            well_count,
            shut_ins: &[],
        };
        ExpenseCalculator::new(model).compute(&ctx)
    }

    #[test]
    fn fixed_per_well_scales_by_count_and_stops_at_limit() {
        let f = fixture(0.5);
        let model = ExpenseModel {
            fixed: vec![FixedExpenseRow {
                category: "Monthly Well Cost".into(),
                track: flat(FixedUnit::PerWellPerMonth, 1000.0),
                flags: ExpenseFlags::default(),
            }],
            ..ExpenseModel::default()
        };
        let r = run(&f, &model, 2.0);
        let row = &r.fixed[0];
        assert_eq!(row.category, "monthly_well_cost");
        assert_eq!(row.gross, vec![2000.0, 2000.0, 2000.0, 0.0]);
        assert_eq!(row.net, vec![1000.0, 1000.0, 1000.0, 0.0]);
    }

    #[test]
    fn pct_of_revenue_is_net_and_backs_out_gross() {
        let f = fixture(0.5);
        let model = ExpenseModel {
            variable: vec![VariableExpenseRow {
                product: Product::Oil,
                category: "marketing".into(),
                shrinkage: Shrinkage::Shrunk,
                track: flat(VariableUnit::PctOfRevenue, 10.0),
                flags: ExpenseFlags {
                    stop_at_econ_limit: false,
                    ..ExpenseFlags::default()
                },
            }],
            ..ExpenseModel::default()
        };
        let r = run(&f, &model, 1.0);
        let row = &r.variable[0];
        assert_eq!(row.category, "oil_marketing");
        assert!((row.net[3] - 400.0).abs() < 1e-9);
        assert!((row.gross[3] - 800.0).abs() < 1e-9);
    }

    #[test]
    fn zero_wi_gross_equals_net() {
        let f = fixture(0.0);
        let model = ExpenseModel {
            variable: vec![VariableExpenseRow {
                product: Product::Oil,
                category: "gathering".into(),
                shrinkage: Shrinkage::Shrunk,
                track: flat(VariableUnit::PctOfRevenue, 10.0),
                flags: ExpenseFlags::default(),
            }],
            ..ExpenseModel::default()
        };
        let r = run(&f, &model, 1.0);
        assert_eq!(r.variable[0].gross, r.variable[0].net);
    }

    #[test]
    fn carbon_uses_boe_and_emission_factor() {
        let f = fixture(1.0);
        let model = ExpenseModel {
            carbon: vec![CarbonExpenseRow {
                category: "co2e".into(),
                emission_factor: 0.05,
                track: flat(CarbonUnit::PerMetricTon, 20.0),
                flags: ExpenseFlags {
                    calculation: OwnershipBasis::OneHundredPctWi,
                    ..ExpenseFlags::default()
                },
            }],
            ..ExpenseModel::default()
        };
        let r = run(&f, &model, 1.0);
        assert!((r.carbon[0].net[0] - 100.0).abs() < 1e-9);
        assert_eq!(r.carbon[0].category, "co2e");
        assert_eq!(r.econ_limit_total(4)[3], 0.0);
    }

    #[test]
    fn gross_from_net_handles_zero_fraction() {
        assert_eq!(gross_from_net(&[10.0, 10.0], &[0.5, 0.0]), vec![20.0, 10.0]);
    }
}
