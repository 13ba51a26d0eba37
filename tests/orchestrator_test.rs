//! Integration tests for scenario sequencing against an in-memory module.

mod common;

use std::collections::HashSet;
use std::time::Duration;

use common::{FakeModule, FakeOptions};
use kparam_check::accessor::ParameterStore;
use kparam_check::scenario::{self, EvalError, Observation, Predicate, Scenario};
use kparam_check::{Orchestrator, OrchestratorConfig, ParamName};

fn fast() -> OrchestratorConfig {
    OrchestratorConfig {
        settle_delay: Duration::ZERO,
        pause_between: Duration::ZERO,
        final_log_lines: 5,
    }
}

fn settled(delay: Duration) -> OrchestratorConfig {
    OrchestratorConfig {
        settle_delay: delay,
        ..fast()
    }
}

fn find(name: &str) -> Scenario {
    scenario::catalogue()
        .into_iter()
        .find(|s| s.name == name)
        .unwrap_or_else(|| panic!("no scenario named {}", name))
}

fn outcome(report: &kparam_check::TestReport, name: &str) -> bool {
    report
        .results
        .iter()
        .find(|r| r.name == name)
        .map(|r| r.passed)
        .unwrap_or_else(|| panic!("no result for {}", name))
}

// === Conforming module ===

#[tokio::test]
async fn catalogue_passes_against_conforming_module() {
    let orch = Orchestrator::new(FakeModule::new(), fast());
    let report = orch.run(&scenario::catalogue()).await;

    for r in &report.results {
        assert!(r.passed, "{} failed:\n{}", r.name, r.render());
    }
    assert_eq!(report.total(), 9);
    assert_eq!(report.passed(), 9);
    assert!(report.all_passed());
    assert!(report.finished_at.is_some());
}

#[tokio::test]
async fn results_follow_catalogue_order() {
    let orch = Orchestrator::new(FakeModule::new(), fast());
    let catalogue = scenario::catalogue();
    let report = orch.run(&catalogue).await;

    let names: Vec<&str> = report.results.iter().map(|r| r.name.as_str()).collect();
    let expected: Vec<&str> = catalogue.iter().map(|s| s.name).collect();
    assert_eq!(names, expected);
}

#[tokio::test]
async fn log_cleared_once_at_start_of_run() {
    let orch = Orchestrator::new(FakeModule::new(), fast());
    orch.run(&scenario::catalogue()).await;
    assert_eq!(orch.store().clears(), 1);
}

#[tokio::test]
async fn repeated_runs_on_fresh_modules_agree() {
    let first = Orchestrator::new(FakeModule::new(), fast())
        .run(&scenario::catalogue())
        .await;
    let second = Orchestrator::new(FakeModule::new(), fast())
        .run(&scenario::catalogue())
        .await;

    let a: Vec<(String, bool)> = first
        .outcomes()
        .into_iter()
        .map(|(n, p)| (n.to_string(), p))
        .collect();
    let b: Vec<(String, bool)> = second
        .outcomes()
        .into_iter()
        .map(|(n, p)| (n.to_string(), p))
        .collect();
    assert_eq!(a, b);
    assert_ne!(first.run_id, second.run_id);
}

// === Restore ===

#[tokio::test]
async fn writable_parameters_restored_after_every_scenario() {
    let orch = Orchestrator::new(FakeModule::new(), fast());
    let report = orch.run(&scenario::catalogue()).await;

    for r in &report.results {
        assert!(r.restore.failed.is_empty(), "{}: {:?}", r.name, r.restore.failed);
    }
    assert_eq!(report.final_state.value(ParamName::Idx).unwrap(), "0");
    assert_eq!(report.final_state.value(ParamName::ChVal).unwrap(), "A (65)");
    assert_eq!(orch.store().idx(), 0);
}

#[tokio::test]
async fn each_scenario_starts_from_previous_snapshot() {
    let orch = Orchestrator::new(FakeModule::new(), fast());
    let report = orch.run(&scenario::catalogue()).await;

    for r in &report.results {
        if r.observation.pre.get(ParamName::Idx).is_some() {
            assert_eq!(r.observation.pre.value(ParamName::Idx).unwrap(), "0", "{}", r.name);
        }
        if r.observation.pre.get(ParamName::ChVal).is_some() {
            assert_eq!(
                r.observation.pre.value(ParamName::ChVal).unwrap(),
                "A (65)",
                "{}",
                r.name
            );
        }
    }
}

#[tokio::test]
async fn restore_writes_index_before_value() {
    let module = FakeModule::new();
    let orch = Orchestrator::new(module, fast());
    let string_scenario: Vec<Scenario> = scenario::catalogue()
        .into_iter()
        .filter(|s| s.name == "String modification via idx and ch_val")
        .collect();
    let report = orch.run(&string_scenario).await;
    assert!(report.all_passed());

    let journal = orch.store().journal();
    let writes: Vec<(ParamName, &str)> = journal.iter().map(|(p, v)| (*p, v.as_str())).collect();
    assert_eq!(
        writes,
        vec![
            (ParamName::Idx, "0"),
            (ParamName::ChVal, "72"),
            (ParamName::Idx, "1"),
            (ParamName::ChVal, "101"),
            (ParamName::Idx, "0"),
            (ParamName::ChVal, "65"),
        ]
    );
    assert_eq!(
        report.results[0].restore.restored,
        vec![ParamName::Idx, ParamName::ChVal]
    );
}

#[tokio::test]
async fn unchanged_parameters_not_rewritten() {
    let orch = Orchestrator::new(FakeModule::new(), fast());
    let rejecting: Vec<Scenario> = scenario::catalogue()
        .into_iter()
        .filter(|s| s.name == "idx too large (100)")
        .collect();
    let report = orch.run(&rejecting).await;

    assert!(report.all_passed());
    assert!(report.results[0].restore.restored.is_empty());
    assert_eq!(orch.store().journal().len(), 1);
}

#[tokio::test]
async fn derived_string_drift_reported_not_failed() {
    let orch = Orchestrator::new(FakeModule::new(), fast());
    let report = orch.run(&scenario::catalogue()).await;

    let valid_ch = report
        .results
        .iter()
        .find(|r| r.name == "Valid ch_val (88='X')")
        .unwrap();
    assert!(valid_ch.passed);
    assert!(valid_ch.restore.failed.is_empty());
    assert_eq!(valid_ch.restore.drifted_read_only, vec![ParamName::MyStr]);
    assert!(report.unclean_restores().contains(&"Valid ch_val (88='X')"));
}

#[tokio::test]
async fn failed_restore_recorded_and_run_continues() {
    let module = FakeModule::with_options(FakeOptions {
        refused: vec![(ParamName::Idx, "0".to_string())],
        ..Default::default()
    });
    let orch = Orchestrator::new(module, fast());
    let report = orch.run(&scenario::catalogue()).await;

    assert_eq!(report.total(), 9);
    let valid_idx = report
        .results
        .iter()
        .find(|r| r.name == "Valid idx (10)")
        .unwrap();
    assert!(valid_idx.passed);
    assert_eq!(valid_idx.restore.failed.len(), 1);
    let failure = &valid_idx.restore.failed[0];
    assert_eq!(failure.param, ParamName::Idx);
    assert_eq!(failure.expected.as_deref(), Some("0"));
    assert!(failure.reason.contains("not delivered"));
    assert!(report.unclean_restores().contains(&"Valid idx (10)"));
}

// === Settle ===

fn lagging(lag: Duration) -> FakeModule {
    FakeModule::with_options(FakeOptions {
        lag,
        ..Default::default()
    })
}

#[tokio::test]
async fn restore_verified_after_settle_on_lagging_module() {
    let orch = Orchestrator::new(
        lagging(Duration::from_millis(20)),
        settled(Duration::from_millis(60)),
    );
    let result = orch.run_scenario(&find("Valid idx (10)")).await;

    assert!(result.passed, "{}", result.render());
    assert!(result.restore.failed.is_empty(), "{:?}", result.restore.failed);
    assert_eq!(result.restore.restored, vec![ParamName::Idx]);
    assert_eq!(orch.store().idx(), 0);
}

#[tokio::test]
async fn lagging_module_observed_too_early_without_settle() {
    let orch = Orchestrator::new(lagging(Duration::from_millis(20)), fast());
    let result = orch.run_scenario(&find("Valid idx (10)")).await;

    assert!(!result.passed);
    assert_eq!(result.observation.post.value(ParamName::Idx).unwrap(), "0");
}

// === Rejected writes ===

fn idx_kept(obs: &Observation) -> Result<bool, EvalError> {
    obs.unchanged(ParamName::Idx)
}

fn ch_val_kept(obs: &Observation) -> Result<bool, EvalError> {
    obs.unchanged(ParamName::ChVal)
}

#[tokio::test]
async fn rejected_writes_leave_stored_value_unchanged() {
    let cases: &[(&'static str, ParamName, &'static str)] = &[
        ("idx 64", ParamName::Idx, "64"),
        ("idx 1000", ParamName::Idx, "1000"),
        ("idx past u64", ParamName::Idx, "18446744073709551616"),
        ("idx leading space", ParamName::Idx, " 5"),
        ("idx trailing junk", ParamName::Idx, "5x"),
        ("ch_val 256", ParamName::ChVal, "256"),
        ("ch_val 1000", ParamName::ChVal, "1000"),
        ("ch_val past u64", ParamName::ChVal, "18446744073709551616"),
        ("ch_val leading space", ParamName::ChVal, " 5"),
        ("ch_val trailing junk", ParamName::ChVal, "5x"),
    ];

    for &(name, param, value) in cases {
        let predicate: Predicate = match param {
            ParamName::Idx => idx_kept,
            _ => ch_val_kept,
        };
        let scenario = Scenario::new(name, "must be refused", predicate)
            .observing(&[param])
            .write(param, value);

        let orch = Orchestrator::new(FakeModule::new(), fast());
        let before = orch.store().read_parameter(param).await.unwrap();
        let result = orch.run_scenario(&scenario).await;

        assert!(result.passed, "{} was accepted:\n{}", name, result.render());
        assert!(result.writes[0].delivered, "{}", name);
        assert!(result.restore.restored.is_empty(), "{} needed a restore", name);
        assert_eq!(orch.store().read_parameter(param).await.unwrap(), before, "{}", name);
    }
}

// === Non-conforming modules ===

#[tokio::test]
async fn missing_range_checks_fail_rejection_scenarios() {
    let module = FakeModule::with_options(FakeOptions {
        ignore_range: true,
        ..Default::default()
    });
    let orch = Orchestrator::new(module, fast());
    let report = orch.run(&scenario::catalogue()).await;

    assert!(!outcome(&report, "idx too large (100)"));
    assert!(!outcome(&report, "ch_val too large (300)"));
    assert!(outcome(&report, "idx negative (-5)"));
    assert!(outcome(&report, "ch_val not a number ('abc')"));
    assert!(outcome(&report, "Valid idx (10)"));
    assert!(!report.all_passed());
}

#[tokio::test]
async fn off_by_one_index_check_caught_by_boundary_scenarios() {
    let module = FakeModule::with_options(FakeOptions {
        idx_limit: Some(64),
        ..Default::default()
    });
    let orch = Orchestrator::new(module, fast());
    let mut scenarios = scenario::catalogue();
    scenarios.extend(scenario::extended());
    let report = orch.run(&scenarios).await;

    assert_eq!(report.total(), 12);
    assert!(outcome(&report, "idx too large (100)"));
    assert!(!outcome(&report, "idx boundary (64)"));
    assert!(outcome(&report, "ch_val boundary (256)"));
    assert!(outcome(&report, "ch_val negative (-1)"));
}

#[tokio::test]
async fn boundary_scenarios_pass_against_conforming_module() {
    let orch = Orchestrator::new(FakeModule::new(), fast());
    let report = orch.run(&scenario::extended()).await;
    assert_eq!(report.passed(), 3);
}

// === Transport and observability ===

#[tokio::test]
async fn transport_failure_is_not_evidence_of_rejection() {
    let module = FakeModule::with_options(FakeOptions {
        transport_down: true,
        ..Default::default()
    });
    let orch = Orchestrator::new(module, fast());
    let report = orch.run(&scenario::catalogue()).await;

    // Nothing reached the module, so nothing was logged as out of range.
    assert!(!outcome(&report, "idx too large (100)"));
    assert!(!outcome(&report, "Valid idx (10)"));
    // Unchanged state alone is what these predicates require.
    assert!(outcome(&report, "idx negative (-5)"));
    assert!(outcome(&report, "my_str is read-only"));

    let too_large = &report.results[1];
    assert_eq!(too_large.writes.len(), 1);
    assert!(!too_large.writes[0].delivered);
    assert!(too_large.writes[0].error.is_some());
}

#[tokio::test]
async fn read_only_write_refused_by_transport_still_passes() {
    let orch = Orchestrator::new(FakeModule::new(), fast());
    let report = orch.run(&scenario::catalogue()).await;

    let read_only = report.results.last().unwrap();
    assert_eq!(read_only.name, "my_str is read-only");
    assert!(read_only.passed);
    assert!(!read_only.writes[0].delivered);
}

#[tokio::test]
async fn unobservable_parameter_fails_its_scenarios_only() {
    let module = FakeModule::with_options(FakeOptions {
        unreadable: HashSet::from([ParamName::ChVal]),
        ..Default::default()
    });
    let orch = Orchestrator::new(module, fast());
    let report = orch.run(&scenario::catalogue()).await;

    assert_eq!(report.total(), 9);
    for name in [
        "Initial state",
        "ch_val too large (300)",
        "ch_val not a number ('abc')",
        "Valid ch_val (88='X')",
    ] {
        let r = report.results.iter().find(|r| r.name == name).unwrap();
        assert!(!r.passed, "{} should fail", name);
        assert!(
            r.error.as_deref().unwrap_or("").contains("ch_val could not be observed"),
            "{}: {:?}",
            name,
            r.error
        );
    }
    assert!(outcome(&report, "idx too large (100)"));
    assert!(outcome(&report, "Valid idx (10)"));
    assert!(outcome(&report, "my_str is read-only"));
}

// === Predicates ===

fn panicking(_: &Observation) -> Result<bool, EvalError> {
    let checkpoints: Vec<u8> = Vec::new();
    Ok(checkpoints[3] == 0)
}

#[tokio::test]
async fn panicking_predicate_fails_scenario_without_stopping_run() {
    let mut scenarios = vec![Scenario::new("broken", "panics", panicking)
        .observing(&[ParamName::Idx])
        .write(ParamName::Idx, "7")];
    scenarios.extend(scenario::catalogue().into_iter().take(2));

    let orch = Orchestrator::new(FakeModule::new(), fast());
    let report = orch.run(&scenarios).await;

    assert_eq!(report.total(), 3);
    assert!(!report.results[0].passed);
    assert!(report.results[0]
        .error
        .as_deref()
        .unwrap()
        .starts_with("predicate panicked"));
    // The write was still undone.
    assert_eq!(report.results[0].restore.restored, vec![ParamName::Idx]);
    assert!(report.results[1].passed);
    assert!(report.results[2].passed);
}

#[tokio::test]
async fn missing_checkpoint_is_a_verdict_error() {
    let scenario = Scenario::new(
        "needs checkpoints",
        "asks for a checkpoint it never takes",
        |obs| Ok(obs.checkpoint(0)?.value(ParamName::Idx)? == "0"),
    )
    .observing(&[ParamName::Idx]);

    let orch = Orchestrator::new(FakeModule::new(), fast());
    let result = orch.run_scenario(&scenario).await;

    assert!(!result.passed);
    assert_eq!(
        result.error.as_deref(),
        Some("checkpoint 0 was not captured")
    );
}

// === Report ===

#[tokio::test]
async fn report_serializes_with_final_state() {
    let orch = Orchestrator::new(FakeModule::new(), fast());
    let report = orch.run(&scenario::catalogue()).await;

    let json = report.to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["component"], "my_module");
    assert_eq!(value["results"].as_array().unwrap().len(), 9);
    assert_eq!(value["final_state"]["readings"]["idx"]["text"], "0");

    let summary = report.to_string();
    assert!(summary.contains("Passed: 9/9"));
}

#[tokio::test]
async fn run_with_reports_each_result_as_it_completes() {
    let orch = Orchestrator::new(FakeModule::new(), fast());
    let mut seen = Vec::new();
    orch.run_with(&scenario::catalogue(), |r| seen.push(r.name.clone()))
        .await;
    assert_eq!(seen.len(), 9);
    assert_eq!(seen[0], "Initial state");
}
