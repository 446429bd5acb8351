use criterion::{criterion_group, criterion_main, Criterion};

use econ_runtime::{evaluate_well, parse_scenario, run_batch, ScenarioFormat};

const SCENARIO: &str = r#"
settings:
  parallel: false
prices:
  oil: 70.0
  gas: 3.0
wells:
  - id: W1
    dates: {as_of_date: 2024-01-01, max_econ_life_years: 30}
    production:
      start: 2024-01-01
      oil: [900, 820, 760, 700, 660, 620, 590, 560, 530, 510, 490, 470]
      gas: [2500, 2300, 2150, 2000, 1900, 1800, 1700, 1650, 1600, 1550, 1500, 1450]
      water: [300, 300, 300, 300, 300, 300, 300, 300, 300, 300, 300, 300]
    expenses:
      fixed:
        - {category: monthly_well_cost, unit: per_month, schedule: {kind: flat, value: 8000}}
      variable:
        - {product: gas, category: gathering, unit: per_unit_volume, schedule: {kind: flat, value: 0.35}}
      water_disposal:
        - {unit: per_unit_volume, schedule: {kind: flat, value: 1.1}}
    capex:
      rows:
        - {category: drilling, tangible: 1500000, intangible: 2500000, date: 2024-01-01}
        - {category: abandonment, tangible: 75000, offset_to_econ_limit: {days: 0}}
  - id: W2
    dates: {as_of_date: 2024-01-01, max_econ_life_years: 30}
    production:
      start: 2024-01-01
      oil: [400, 380, 360, 340, 320, 300, 290, 280, 270, 260, 250, 240]
groups:
  - id: PAD
    wells: [W1, W2]
    allocation: {method: boe_volume, timing: remaining, basis: gross}
    dates: {as_of_date: 2024-01-01, max_econ_life_years: 30}
    expenses:
      fixed:
        - {category: monthly_well_cost, unit: per_month, schedule: {kind: flat, value: 3000}}
"#;

fn bench_econ(c: &mut Criterion) {
    let scenario = match parse_scenario(SCENARIO, ScenarioFormat::Yaml) {
        Ok(s) => s,
        Err(e) => panic!("bench scenario: {e}"),
    };
    let well = &scenario.wells[0];
    c.bench_function("evaluate_well", |b| {
        b.iter(|| evaluate_well(well, &scenario.settings, &scenario.prices))
    });
    c.bench_function("run_batch_with_group", |b| b.iter(|| run_batch(&scenario)));
}

criterion_group!(benches, bench_econ);
criterion_main!(benches);
