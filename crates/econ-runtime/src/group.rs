//! Group pipeline: aggregate members, run group economics once, allocate back.

use serde::{Deserialize, Serialize};
use tracing::info;

use econ_alloc::{AllocatedShare, AllocationEngine, GroupSeries, MemberReference, ReferenceTable};
use econ_core::{
    AllocationContext, CapexModel, DatesModel, EngineConfig, ExpenseModel, Interest,
    OwnershipModel, ProductionSeries, ProductionTaxModel, ShutInWindow, StreamProperties,
    Timeline, WellInput, WellResult,
};

use crate::error::EvalError;
use crate::pipeline::evaluate_well;
use crate::revenue::RevenueSource;

fn full_interest() -> OwnershipModel {
    OwnershipModel {
        wi: Interest::Scalar(1.0),
        nri: Interest::Scalar(1.0),
        ..OwnershipModel::default()
    }
}

/// Shared facility whose costs are allocated back to its member wells.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GroupInput {
    pub id: String,
    /// Member well ids.
    pub wells: Vec<String>,
    #[serde(default)]
    pub allocation: AllocationContext,
    pub dates: DatesModel,
    #[serde(default)]
    pub capex: CapexModel,
    #[serde(default)]
    pub expenses: ExpenseModel,
    #[serde(default)]
    pub taxes: ProductionTaxModel,
    /// Group dollars are carried at 100% unless set.
    #[serde(default = "full_interest")]
    pub ownership: OwnershipModel,
    #[serde(default)]
    pub stream: StreamProperties,
    #[serde(default)]
    pub shut_ins: Vec<ShutInWindow>,
}

/// A member's evaluated inputs, handed over from phase 1.
#[derive(Clone, Copy, Debug)]
pub struct Member<'a> {
    pub input: &'a WellInput,
    pub result: &'a WellResult,
}

/// Group economics plus every member's allocated share.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GroupResult {
    pub group_id: String,
    pub result: WellResult,
    pub allocations: Vec<AllocatedShare>,
}

/// Gross production of every member summed on the union of their months.
pub fn aggregate_production<'a>(
    series: impl IntoIterator<Item = &'a ProductionSeries> + Clone,
) -> ProductionSeries {
    let timelines: Vec<Timeline> = series
        .clone()
        .into_iter()
        .map(|p| p.timeline())
        .filter(|t| !t.is_empty())
        .collect();
    let (Some(start), Some(end)) = (
        timelines.iter().map(|t| t.start).min(),
        timelines.iter().map(|t| t.end()).max(),
    ) else {
        return ProductionSeries::default();
    };
    let union = Timeline::between(start, end);
    let mut out = ProductionSeries {
        start,
        oil: union.zeros(),
        gas: union.zeros(),
        water: union.zeros(),
    };
    for p in series {
        let from = p.timeline();
        for (acc, src) in [
            (&mut out.oil, &p.oil),
            (&mut out.gas, &p.gas),
            (&mut out.water, &p.water),
        ] {
            for (a, v) in acc.iter_mut().zip(union.align(src, &from)) {
                *a += v;
            }
        }
    }
    out
}

/// A member's phase-1 wellhead volumes on its result timeline: risked,
/// derated for shut-ins and zero past the member's cutoff.
pub fn delivered_production(result: &WellResult) -> ProductionSeries {
    let wellhead = &result.volumes.wellhead;
    ProductionSeries {
        start: result.timeline.start,
        oil: wellhead.oil.clone(),
        gas: wellhead.gas.clone(),
        water: wellhead.water.clone(),
    }
}

impl GroupInput {
    /// Pseudo-well carrying the group's own models and the members' summed
    /// phase-1 volumes.
    pub fn pseudo_well(&self, members: &[Member<'_>]) -> WellInput {
        let delivered: Vec<ProductionSeries> = members
            .iter()
            .map(|m| delivered_production(m.result))
            .collect();
        WellInput {
            id: self.id.clone(),
            header: Default::default(),
            schedule: Default::default(),
            production: aggregate_production(&delivered),
            forecast_start: members.iter().filter_map(|m| m.input.forecast_start).min(),
            dates: self.dates.clone(),
            capex: self.capex.clone(),
            expenses: self.expenses.clone(),
            taxes: self.taxes.clone(),
            ownership: self.ownership.clone(),
            stream: self.stream.clone(),
            risking: Default::default(),
            shut_ins: self.shut_ins.clone(),
            well_count: members.iter().map(|m| m.input.well_count).sum(),
        }
    }
}

/// Phases 2 and 3 for one group; phase 1 results arrive in `members`.
pub fn evaluate_group(
    group: &GroupInput,
    members: &[Member<'_>],
    config: &EngineConfig,
    revenue: &dyn RevenueSource,
) -> Result<GroupResult, EvalError> {
    if members.is_empty() {
        return Err(EvalError::EmptyGroup(group.id.clone()));
    }
    info!(group = %group.id, members = members.len(), "group economics");
    let result = evaluate_well(&group.pseudo_well(members), config, revenue)?;

    info!(group = %group.id, "allocating group costs");
    let refs: Vec<MemberReference> = members
        .iter()
        .map(|m| MemberReference::from_result(m.result, &group.allocation))
        .collect();
    let table = ReferenceTable::build(&refs);
    let series = GroupSeries::from_result(&result, group.allocation.basis);
    let engine = AllocationEngine::new(group.allocation);
    let allocations = refs
        .iter()
        .map(|m| engine.allocate(&table, &series, m))
        .collect();
    Ok(GroupResult {
        group_id: group.id.clone(),
        result,
        allocations,
    })
}
