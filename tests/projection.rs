//! End-to-end engine tests driving the public library API

use chrono::NaiveDate;
use finproj::{
    run_calculation, run_projection, Asset, AssetKind, CalcId, CalcUnit, CalculationState,
    CashflowContext, Company, ContributionFlows, Disposal, EconomicAssumptions, EngineError,
    EntityCashflow, EntityContext, EntityId, ExecutionPlan, FinancialYear, GlobalContext,
    IncomeFlows, Intermediates, Loan, Ownership, Person, PlanStep, PositionContext, Registry,
    Residency, RuleDomain, RuleStore, Scenario, Severity, WorkStatus,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn person(name: &str, dob: &str) -> Person {
    Person {
        name: name.to_string(),
        date_of_birth: date(dob),
        residency: Residency::Resident,
        work_status: WorkStatus::Employed,
    }
}

fn earner(salary: Decimal, employer_sg: Decimal) -> EntityCashflow {
    EntityCashflow {
        income: IncomeFlows {
            salary_gross: salary,
            ..Default::default()
        },
        contributions: ContributionFlows {
            employer_sg,
            ..Default::default()
        },
        ..Default::default()
    }
}

fn sole(entity: &str) -> Vec<Ownership> {
    vec![Ownership {
        entity_id: entity.into(),
        share: Decimal::ONE,
    }]
}

fn single_person_state(salary: Decimal) -> CalculationState {
    let mut entities = EntityContext::default();
    entities
        .persons
        .insert("alex".into(), person("Alex", "1984-03-15"));

    let mut cashflows = CashflowContext::default();
    cashflows.entities.insert("alex".into(), earner(salary, Decimal::ZERO));
    cashflows.living_expenses = dec!(52000);

    CalculationState {
        global: GlobalContext {
            scenario_id: "it-base".to_string(),
            financial_year: FinancialYear(2024),
            effective_date: date("2024-07-01"),
            assumptions: EconomicAssumptions::default(),
        },
        entities,
        positions: PositionContext::default(),
        cashflows,
        intermediates: Intermediates::default(),
    }
}

/// Two earners, a geared rental, super balances and a company
fn family_state() -> CalculationState {
    let mut state = single_person_state(dec!(95000));
    state.global.scenario_id = "it-family".to_string();
    state.cashflows.living_expenses = dec!(78000);

    let alex: EntityId = "alex".into();
    state
        .cashflows
        .entities
        .insert(alex.clone(), earner(dec!(95000), dec!(10925)));

    state
        .entities
        .persons
        .insert("sam".into(), person("Sam", "1986-09-02"));
    state
        .cashflows
        .entities
        .insert("sam".into(), earner(dec!(65000), dec!(7475)));

    state.entities.companies.insert(
        "fam-co".into(),
        Company {
            name: "Family Co Pty Ltd".to_string(),
            aggregated_turnover: dec!(2000000),
            taxable_income: dec!(150000),
        },
    );

    state.positions.assets.insert(
        "rental".to_string(),
        Asset {
            owners: vec![
                Ownership {
                    entity_id: "alex".into(),
                    share: dec!(0.5),
                },
                Ownership {
                    entity_id: "sam".into(),
                    share: dec!(0.5),
                },
            ],
            kind: AssetKind::Property,
            value: dec!(840000),
            cost_base: dec!(650000),
            acquisition_date: date("2019-03-01"),
            weekly_rent: dec!(800),
            annual_costs: dec!(4000),
        },
    );
    state.positions.loans.insert(
        "mortgage".to_string(),
        Loan {
            owners: vec![
                Ownership {
                    entity_id: "alex".into(),
                    share: dec!(0.5),
                },
                Ownership {
                    entity_id: "sam".into(),
                    share: dec!(0.5),
                },
            ],
            principal: dec!(500000),
            annual_interest_rate: dec!(0.06),
            annual_repayment: dec!(30000),
            interest_only: true,
            secured_asset_id: Some("rental".to_string()),
        },
    );
    state.positions.assets.insert(
        "super-alex".to_string(),
        Asset {
            owners: sole("alex"),
            kind: AssetKind::SuperAccumulation,
            value: dec!(230000),
            cost_base: Decimal::ZERO,
            acquisition_date: date("2010-07-01"),
            weekly_rent: Decimal::ZERO,
            annual_costs: Decimal::ZERO,
        },
    );
    state.positions.assets.insert(
        "super-sam".to_string(),
        Asset {
            owners: sole("sam"),
            kind: AssetKind::SuperAccumulation,
            value: dec!(150000),
            cost_base: Decimal::ZERO,
            acquisition_date: date("2012-07-01"),
            weekly_rent: Decimal::ZERO,
            annual_costs: Decimal::ZERO,
        },
    );

    state
}

fn standard_setup() -> (Registry, RuleStore) {
    (Registry::standard(), RuleStore::builtin().unwrap())
}

#[test]
fn base_tax_matches_worked_example() {
    let state = single_person_state(dec!(80000));
    let (registry, rules) = standard_setup();

    let result = run_calculation(
        &registry,
        &rules,
        &state,
        &CalcId::new("CAL-PIT-001"),
        &"alex".into(),
        0,
    )
    .unwrap();

    assert_eq!(result.value, dec!(14788.00));
    assert_eq!(result.trace.rule_version, "2024-25");
    assert_eq!(result.trace.severity, Severity::Info);
}

#[test]
fn single_calculation_leaves_state_untouched() {
    let state = single_person_state(dec!(80000));
    let before = state.clone();
    let (registry, rules) = standard_setup();
    let cal_id = CalcId::new("CAL-PIT-001");
    let alex: EntityId = "alex".into();

    let first = run_calculation(&registry, &rules, &state, &cal_id, &alex, 0).unwrap();
    let second = run_calculation(&registry, &rules, &state, &cal_id, &alex, 0).unwrap();

    assert_eq!(first, second);
    assert_eq!(state, before);
}

/// Units depending on intermediates cannot run as the first invocation
#[test]
fn dependent_unit_requires_prior_results() {
    let state = single_person_state(dec!(80000));
    let (registry, rules) = standard_setup();

    let err = run_calculation(
        &registry,
        &rules,
        &state,
        &CalcId::new("CAL-PIT-005"),
        &"alex".into(),
        0,
    )
    .unwrap_err();

    assert!(matches!(err, EngineError::CalculationInput { .. }));
}

#[test]
fn earlier_financial_year_resolves_prior_rules() {
    let mut state = single_person_state(dec!(80000));
    state.global.financial_year = FinancialYear(2023);
    state.global.effective_date = date("2023-07-01");
    let (registry, rules) = standard_setup();

    let result = run_calculation(
        &registry,
        &rules,
        &state,
        &CalcId::new("CAL-PIT-001"),
        &"alex".into(),
        0,
    )
    .unwrap();

    assert_eq!(result.trace.rule_version, "2023-24");
    assert_eq!(result.value, dec!(16467.00));
}

#[test]
fn dates_without_rule_coverage_are_rejected() {
    let mut state = single_person_state(dec!(80000));
    state.global.financial_year = FinancialYear(2022);
    state.global.effective_date = date("2022-07-01");
    let (registry, rules) = standard_setup();

    let err = run_calculation(
        &registry,
        &rules,
        &state,
        &CalcId::new("CAL-PIT-001"),
        &"alex".into(),
        0,
    )
    .unwrap_err();

    assert!(matches!(err, EngineError::RuleNotFound { .. }));
}

#[test]
fn projection_is_deterministic() {
    let state = family_state();
    let (registry, rules) = standard_setup();
    let plan = ExecutionPlan::standard(&state);

    let first = run_projection(&registry, &rules, &state, &plan, 5).unwrap();
    let second = run_projection(&registry, &rules, &state, &plan, 5).unwrap();

    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

/// Concurrent projections over cloned states neither disturb each other
/// nor drift from the single-threaded result
#[test]
fn concurrent_projections_are_isolated() {
    let state = family_state();
    let (registry, rules) = standard_setup();
    let plan = ExecutionPlan::standard(&state);
    let baseline =
        serde_json::to_string(&run_projection(&registry, &rules, &state, &plan, 5).unwrap())
            .unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let state = state.clone();
            std::thread::spawn(move || {
                let (registry, rules) = standard_setup();
                let plan = ExecutionPlan::standard(&state);
                let output = run_projection(&registry, &rules, &state, &plan, 5).unwrap();
                serde_json::to_string(&output).unwrap()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), baseline);
    }
}

/// Every plan step leaves exactly one trace entry per projected year, in
/// plan order
#[test]
fn trace_covers_every_step_every_year() {
    let state = family_state();
    let (registry, rules) = standard_setup();
    let plan = ExecutionPlan::standard(&state);
    // 12 personal units for each of two persons, plus the company
    assert_eq!(plan.len(), 25);

    let horizon = 3;
    let output = run_projection(&registry, &rules, &state, &plan, horizon).unwrap();

    assert_eq!(output.years.len(), horizon as usize + 1);
    for (i, year) in output.years.iter().enumerate() {
        assert_eq!(year.year_index as usize, i);
    }

    assert_eq!(output.trace.len(), plan.len() * (horizon as usize + 1));
    for (i, entry) in output.trace.iter().enumerate() {
        let step = &plan.steps[i % plan.len()];
        assert_eq!(entry.year_index as usize, i / plan.len());
        assert_eq!(entry.cal_id, step.cal_id);
        assert_eq!(entry.entity_id, step.entity_id);
    }
}

#[test]
fn horizon_beyond_sanity_bound_is_rejected() {
    let state = single_person_state(dec!(80000));
    let (registry, rules) = standard_setup();
    let plan = ExecutionPlan::standard(&state);

    assert!(run_projection(&registry, &rules, &state, &plan, 60).is_ok());

    let err = run_projection(&registry, &rules, &state, &plan, 61).unwrap_err();
    assert!(matches!(
        err.engine_error(),
        EngineError::SanityBoundExceeded { .. }
    ));
}

#[test]
fn monetary_input_beyond_cap_is_rejected() {
    let (registry, rules) = standard_setup();

    let state = single_person_state(dec!(1_000_000_000));
    let plan = ExecutionPlan::standard(&state);
    assert!(run_projection(&registry, &rules, &state, &plan, 0).is_ok());

    let state = single_person_state(dec!(1_000_000_000.01));
    let err = run_projection(&registry, &rules, &state, &plan, 0).unwrap_err();
    assert!(matches!(
        err.engine_error(),
        EngineError::SanityBoundExceeded { .. }
    ));
}

#[test]
fn ownership_shares_must_sum_to_one() {
    let mut state = single_person_state(dec!(80000));
    state.positions.assets.insert(
        "home".to_string(),
        Asset {
            owners: vec![Ownership {
                entity_id: "alex".into(),
                share: dec!(0.9),
            }],
            kind: AssetKind::Property,
            value: dec!(900000),
            cost_base: dec!(700000),
            acquisition_date: date("2015-05-01"),
            weekly_rent: Decimal::ZERO,
            annual_costs: Decimal::ZERO,
        },
    );
    let (registry, rules) = standard_setup();
    let plan = ExecutionPlan::standard(&state);

    let err = run_projection(&registry, &rules, &state, &plan, 0).unwrap_err();
    assert!(matches!(err.engine_error(), EngineError::ScenarioInput(_)));
}

#[test]
fn registry_is_total_and_rejects_duplicates() {
    let registry = Registry::standard();
    assert_eq!(registry.len(), CalcUnit::ALL.len());
    for unit in CalcUnit::ALL {
        assert!(registry.contains(&unit.cal_id()));
    }

    let err = registry
        .resolve(&CalcId::new("CAL-XXX-999"))
        .unwrap_err();
    assert!(matches!(err, EngineError::UnknownCalculationId(_)));

    let mut registry = Registry::new();
    registry.register(CalcUnit::PitBaseTax).unwrap();
    let err = registry.register(CalcUnit::PitBaseTax).unwrap_err();
    assert!(matches!(err, EngineError::DuplicateRegistration(_)));
}

#[test]
fn plan_referencing_unknown_calculation_or_entity_fails_setup() {
    let state = single_person_state(dec!(80000));
    let (registry, rules) = standard_setup();

    let plan = ExecutionPlan::new(vec![PlanStep {
        cal_id: CalcId::new("CAL-PIT-999"),
        entity_id: "alex".into(),
    }]);
    let err = run_projection(&registry, &rules, &state, &plan, 0).unwrap_err();
    assert!(matches!(
        err.engine_error(),
        EngineError::UnknownCalculationId(_)
    ));

    let plan = ExecutionPlan::new(vec![PlanStep {
        cal_id: CalcId::new("CAL-PIT-001"),
        entity_id: "ghost".into(),
    }]);
    let err = run_projection(&registry, &rules, &state, &plan, 0).unwrap_err();
    assert!(matches!(err.engine_error(), EngineError::UnknownEntity(_)));
}

const RULES_2024: &str = r#"{
  "domain": "personal-tax",
  "version": "2024-25",
  "effective_from": "2024-07-01",
  "effective_to": "2025-06-30",
  "brackets": [
    { "from": "0", "to": "18200", "rate": "0" },
    { "from": "18200", "rate": "0.30" }
  ],
  "medicare": { "levy_rate": "0.02", "low_income_threshold": "27222" },
  "lito": { "max_offset": "700", "full_amount_limit": "37500", "taper_rate": "0.05" }
}"#;

const RULES_2025: &str = r#"{
  "domain": "personal-tax",
  "version": "2025-26",
  "effective_from": "2025-07-01",
  "effective_to": "2026-06-30",
  "brackets": [
    { "from": "0", "to": "18200", "rate": "0" },
    { "from": "18200", "rate": "0.28" }
  ],
  "medicare": { "levy_rate": "0.02", "low_income_threshold": "27500" },
  "lito": { "max_offset": "700", "full_amount_limit": "37500", "taper_rate": "0.05" }
}"#;

#[test]
fn reload_picks_up_new_rule_files() {
    let dir = std::env::temp_dir().join(format!("finproj-rules-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("personal-tax-2024-25.json"), RULES_2024).unwrap();

    let mut store = RuleStore::load(&dir).unwrap();
    assert_eq!(store.versions(RuleDomain::PersonalTax).len(), 1);
    assert!(store
        .resolve(RuleDomain::PersonalTax, date("2025-10-01"))
        .is_err());

    std::fs::write(dir.join("personal-tax-2025-26.json"), RULES_2025).unwrap();
    store.reload().unwrap();
    assert_eq!(store.versions(RuleDomain::PersonalTax).len(), 2);
    assert_eq!(
        store
            .resolve(RuleDomain::PersonalTax, date("2025-10-01"))
            .unwrap()
            .version,
        "2025-26"
    );

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn long_held_disposals_get_the_discount() {
    let mut state = single_person_state(dec!(80000));
    state.positions.assets.insert(
        "shares".to_string(),
        Asset {
            owners: sole("alex"),
            kind: AssetKind::Portfolio,
            value: dec!(60000),
            cost_base: dec!(40000),
            acquisition_date: date("2018-01-10"),
            weekly_rent: Decimal::ZERO,
            annual_costs: Decimal::ZERO,
        },
    );
    state.positions.disposals.push(Disposal {
        asset_id: "shares".to_string(),
        year_index: 0,
        proceeds: dec!(60000),
        incidental_costs: Decimal::ZERO,
    });
    let (registry, rules) = standard_setup();
    let plan = ExecutionPlan::standard(&state);

    let output = run_projection(&registry, &rules, &state, &plan, 0).unwrap();

    let raw_calc = CalcId::new("CAL-CGT-001");
    let raw: Vec<_> = output
        .trace
        .entries_for_calc(&raw_calc)
        .collect();
    assert_eq!(raw.len(), 1);
    assert_eq!(raw[0].value, dec!(20000.00));

    let discounted_calc = CalcId::new("CAL-CGT-002");
    let discounted: Vec<_> = output
        .trace
        .entries_for_calc(&discounted_calc)
        .collect();
    assert_eq!(discounted[0].value, dec!(10000.00));
    assert_eq!(discounted[0].severity, Severity::DecisionPoint);
}

#[test]
fn division_293_levies_high_earners() {
    let mut state = single_person_state(dec!(260000));
    state
        .cashflows
        .entities
        .insert("alex".into(), earner(dec!(260000), dec!(25000)));
    let (registry, rules) = standard_setup();
    let plan = ExecutionPlan::standard(&state);

    let output = run_projection(&registry, &rules, &state, &plan, 0).unwrap();

    let div293_calc = CalcId::new("CAL-SUP-008");
    let div293: Vec<_> = output
        .trace
        .entries_for_calc(&div293_calc)
        .collect();
    assert_eq!(div293[0].value, dec!(3750.00));
    assert_eq!(div293[0].severity, Severity::DecisionPoint);
}

#[test]
fn contributions_over_the_cap_warn() {
    let mut state = single_person_state(dec!(190000));
    state.cashflows.entities.insert(
        "alex".into(),
        EntityCashflow {
            income: IncomeFlows {
                salary_gross: dec!(190000),
                ..Default::default()
            },
            contributions: ContributionFlows {
                employer_sg: dec!(30000),
                salary_sacrifice: dec!(5000),
                ..Default::default()
            },
            ..Default::default()
        },
    );
    let (registry, rules) = standard_setup();
    let plan = ExecutionPlan::standard(&state);

    let output = run_projection(&registry, &rules, &state, &plan, 0).unwrap();

    let cap_usage_calc = CalcId::new("CAL-SUP-003");
    let cap_usage: Vec<_> = output
        .trace
        .entries_for_calc(&cap_usage_calc)
        .collect();
    assert_eq!(cap_usage[0].value, dec!(35000));
    assert_eq!(cap_usage[0].severity, Severity::Warning);
    assert!(cap_usage[0].explanation.contains("exceed"));
}

#[test]
fn year_summary_reflects_tax_and_surplus() {
    let state = single_person_state(dec!(80000));
    let (registry, rules) = standard_setup();
    let plan = ExecutionPlan::standard(&state);

    let output = run_projection(&registry, &rules, &state, &plan, 0).unwrap();

    let year = &output.years[0];
    assert_eq!(year.financial_year, FinancialYear(2024));
    // base 14788.00 + medicare 1055.56, no offsets at this income
    assert_eq!(year.summary.tax_paid, dec!(15843.56));
    assert_eq!(year.summary.surplus, dec!(12156.44));
    assert_eq!(year.summary.net_wealth, Decimal::ZERO);
    assert_eq!(year.summary.retirement_adequacy, Decimal::ZERO);
}

#[test]
fn scenario_document_projects_end_to_end() {
    let json = r#"{
        "scenario_id": "doc-example",
        "financial_year": 2024,
        "effective_date": "2024-07-01",
        "horizon_years": 2,
        "assumptions": { "wage_growth_rate": "0.03" },
        "entities": {
            "persons": {
                "alex": { "name": "Alex", "date_of_birth": "1984-03-15" }
            }
        },
        "cashflows": {
            "entities": {
                "alex": { "income": { "salary_gross": "80000" } }
            },
            "living_expenses": "52000"
        }
    }"#;

    let scenario = Scenario::read_json(json.as_bytes()).unwrap();
    let horizon = scenario.horizon_years.unwrap();
    let state = scenario.into_state();
    let (registry, rules) = standard_setup();
    let plan = ExecutionPlan::standard(&state);

    let output = run_projection(&registry, &rules, &state, &plan, horizon).unwrap();

    assert_eq!(output.scenario_id, "doc-example");
    assert_eq!(output.years.len(), 3);

    // wages grow 3%: year 1 salary 82400 lifts base tax to 15508.00
    let year_one_base = output
        .trace
        .iter()
        .find(|e| e.year_index == 1 && e.cal_id == CalcId::new("CAL-PIT-001"))
        .unwrap();
    assert_eq!(year_one_base.value, dec!(15508.00));
}
