#[cfg(test)]
use crate::prelude::*;

#[test]
fn read_scenario_and_overrides() {
    let settings = Settings::read("src/tests/config.toml").unwrap();
    assert_eq!(settings.config.scenario, Scenario::Immunocompromised);
    assert_eq!(settings.parameters.k1, Some(4e-5));
    assert_eq!(settings.parameters.t_max, Some(1200.0));
    assert_eq!(settings.parameters.k2, None);
    assert_eq!(settings.initial.healthy, Some(450.0));
    assert_eq!(settings.log.level, "debug");
    assert_eq!(settings.output.path, "outputs/immunocompromised/");
}

#[test]
fn read_solver_options() {
    let settings = Settings::read("src/tests/config.toml").unwrap();
    assert_eq!(settings.solver.method, Method::Dop853);
    assert_eq!(settings.solver.rtol, 1e-6);
    assert_eq!(settings.solver.atol, 1e-9);
    assert_eq!(settings.solver.stiffness_check, Some(500));
    assert_eq!(settings.solver.max_steps, 100_000);
}

#[test]
fn resolve_run_config() {
    let settings = Settings::read("src/tests/config.toml").unwrap();
    let run = settings.run_config();
    assert_eq!(run.parameters.k1, 4e-5);
    assert_eq!(run.parameters.k2, 0.005);
    assert_eq!(run.parameters.t_max, 1200.0);
    assert_eq!(run.initial, StateVector::new(450.0, 0.0, 0.0, 10.0));
    assert_eq!(run.span, TimeSpan::new(0.0, 1000.0, 501));
}

#[test]
fn minimal_file_uses_scenario_defaults() {
    let settings = Settings::read("src/tests/minimal.toml").unwrap();
    let run = settings.run_config();
    let preset = Scenario::Infected.run_config();
    assert_eq!(run.initial, preset.initial);
    assert_eq!(run.span, preset.span);
    assert_eq!(run.parameters.k1, preset.parameters.k1);
    assert_eq!(settings.solver, SolverOptions::default());
    assert_eq!(settings.log.level, "info");
    assert!(settings.log.file.is_none());
}

#[test]
fn missing_file_is_an_error() {
    assert!(Settings::read("src/tests/does_not_exist.toml").is_err());
}

#[test]
fn simulate_from_settings() {
    let mut settings = Settings::read("src/tests/minimal.toml").unwrap();
    settings.time.tf = Some(100.0);
    settings.time.n = Some(101);
    let trajectory = entrypoints::simulate(&settings).unwrap();
    assert_eq!(trajectory.len(), 101);
    assert_eq!(*trajectory.initial(), StateVector::new(600.0, 0.0, 0.0, 1e-3));
}

#[test]
fn invalid_settings_fail_before_solving() {
    let mut settings = Settings::from_scenario(Scenario::Healthy);
    settings.parameters.t_max = Some(0.0);
    let err = entrypoints::simulate(&settings).unwrap_err();
    let cause = err.downcast_ref::<SimulationError>().unwrap();
    assert!(cause.is_configuration());
}

#[test]
fn run_writes_outputs() {
    let folder = std::env::temp_dir().join(format!("hivsim-run-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&folder);

    let mut settings = Settings::from_scenario(Scenario::Infected);
    settings.time.tf = Some(100.0);
    settings.time.n = Some(101);
    settings.output.write = true;
    settings.output.path = format!("{}/nested/", folder.display());
    settings.log.file = Some("run.log".to_string());

    let trajectory = entrypoints::run(settings.clone()).unwrap();
    assert_eq!(trajectory.len(), 101);

    let output = folder.join("nested");
    let csv = std::fs::read_to_string(output.join("trajectory.csv")).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 102);
    assert_eq!(lines[0], "time,T,T1,T2,V");
    assert!(lines[1].starts_with("0,600,0,0,"));
    assert!(lines[101].starts_with("100,"));

    let json = std::fs::read_to_string(output.join("settings.json")).unwrap();
    let written: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(written["settings"]["config"]["scenario"], "infected");
    assert_eq!(written["settings"]["output"]["write"], true);
    assert_eq!(written["run"]["span"]["tf"], 100.0);
    assert_eq!(written["run"]["span"]["n"], 101);
    assert_eq!(written["run"]["initial"]["virus"], 1e-3);
    assert_eq!(written["run"]["parameters"]["t_max"], 1500.0);

    let resolved: Settings = serde_json::from_value(written["settings"].clone()).unwrap();
    assert_eq!(resolved.run_config().span, TimeSpan::new(0.0, 100.0, 101));

    assert!(output.join("run.log").exists());
    std::fs::remove_dir_all(&folder).unwrap();
}
