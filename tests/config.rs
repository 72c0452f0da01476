// ABOUTME: Integration tests for suite configuration parsing and validation.
// ABOUTME: Tests YAML parsing, discovery, path resolution and scenario planning.

use haven_verify::config::*;
use haven_verify::driver::PlanOutcome;
use haven_verify::error::ConfigError;
use haven_verify::pipeline::PipelineMode;
use haven_verify::request::{ModuleSource, NameStyle};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

mod parsing {
    use super::*;

    #[test]
    fn parse_minimal_config() {
        let yaml = r#"
scenarios:
  - name: minimal
"#;
        let config = SuiteConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.scenarios.len(), 1);
        assert_eq!(config.scenarios.first().name, "minimal");
        assert!(config.base.source.is_none());
    }

    #[test]
    fn parse_full_config() {
        let yaml = r#"
env_files:
  - .env.local
  - .env

terraform:
  binary: /usr/local/bin/terraform
  provider_version: "~> 4.40"

retry:
  connectivity:
    max_attempts: 3
    delay: 10s
  address_lookup:
    max_attempts: 2
    delay: 1s

precondition:
  lookup_url: https://checkip.example.net
  timeout: 5s
  authorized_ranges:
    - 203.0.113.0/24

expectations:
  cluster_prefix: null
  resource_group_prefix: rg-
  provisioning_state: Succeeded
  monitoring_resource_type: Microsoft.OperationalInsights/workspaces

work_dir: .scratch

base:
  source:
    module:
      path: ../modules/haven
      aliases:
        cluster_name: name
  name_prefix: haven-ci
  domain_suffix: ci.example.com
  inputs:
    location: West Europe
    kubernetes_version: "1.33.0"
    enable_keda: false

scenarios:
  - name: minimal
  - name: production-config
    mode: plan
    expect_plan: changes_pending
    name_style: short
    inputs:
      enable_auto_scaling: true
      min_node_count: 1
      max_node_count: 5
  - name: existing-infrastructure
    setup:
      targets:
        - azurerm_virtual_network.existing
      bind:
        existing_vnet_name: vnet_name
"#;
        let config = SuiteConfig::from_yaml(yaml).unwrap();

        assert_eq!(config.env_files.len(), 2);
        assert_eq!(
            config.terraform.binary,
            PathBuf::from("/usr/local/bin/terraform")
        );
        assert_eq!(config.terraform.provider_version, "~> 4.40");
        assert_eq!(config.retry.connectivity.max_attempts(), 3);
        assert_eq!(config.retry.connectivity.delay(), Duration::from_secs(10));
        assert_eq!(config.retry.address_lookup.max_attempts(), 2);
        assert_eq!(config.precondition.timeout, Duration::from_secs(5));
        assert!(
            config
                .precondition
                .authorized_ranges
                .contains(&"203.0.113.9".parse().unwrap())
        );
        assert!(
            !config
                .precondition
                .authorized_ranges
                .contains(&"10.0.0.1".parse().unwrap())
        );
        assert_eq!(config.expectations.cluster_prefix, None);
        assert_eq!(config.work_dir, Some(PathBuf::from(".scratch")));
        assert!(matches!(
            config.base.source,
            Some(ModuleSource::Module { ref aliases, .. }) if aliases["cluster_name"] == "name"
        ));

        let production = config.scenario("production-config").unwrap();
        assert_eq!(production.mode, Some(PipelineMode::Plan));
        assert_eq!(production.expect_plan, Some(PlanOutcome::ChangesPending));
        assert_eq!(production.name_style, Some(NameStyle::Short));
        assert_eq!(production.inputs.max_node_count, Some(5));

        let existing = config.scenario("existing-infrastructure").unwrap();
        let setup = existing.setup.as_ref().unwrap();
        assert_eq!(setup.bind["existing_vnet_name"], "vnet_name");
    }

    #[test]
    fn empty_scenario_list_is_rejected() {
        let err = SuiteConfig::from_yaml("scenarios: []\n").unwrap_err();
        assert!(err.to_string().contains("at least one scenario"));
    }

    #[test]
    fn duplicate_scenario_names_are_rejected() {
        let yaml = r#"
scenarios:
  - name: minimal
  - name: minimal
"#;
        let err = SuiteConfig::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("duplicate scenario name"));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let yaml = r#"
scenarios:
  - name: minimal
    inputs:
      enable_magic: true
"#;
        assert!(matches!(
            SuiteConfig::from_yaml(yaml),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn invalid_autoscaling_bounds_are_rejected() {
        let yaml = r#"
scenarios:
  - name: bad
    inputs:
      min_node_count: 5
      max_node_count: 1
"#;
        assert!(matches!(
            SuiteConfig::from_yaml(yaml),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn zero_attempt_retry_policy_is_rejected() {
        let yaml = r#"
retry:
  connectivity:
    max_attempts: 0
    delay: 1s
scenarios:
  - name: minimal
"#;
        assert!(SuiteConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn invalid_authorized_range_is_rejected() {
        let yaml = r#"
precondition:
  authorized_ranges:
    - 10.0.0.0/33
scenarios:
  - name: minimal
"#;
        assert!(SuiteConfig::from_yaml(yaml).is_err());
    }
}

mod discovery {
    use super::*;

    const SUITE: &str = r#"
env_files: [.env]
work_dir: scratch
base:
  source:
    example:
      path: modules/minimal
scenarios:
  - name: minimal
  - name: quick
    mode: validate
"#;

    #[test]
    fn discovers_primary_file_and_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILENAME), SUITE).unwrap();

        let config = SuiteConfig::discover(dir.path()).unwrap();

        assert_eq!(config.root(), dir.path());
        assert_eq!(config.env_file_paths(), vec![dir.path().join(".env")]);
        assert_eq!(config.work_root(), Some(dir.path().join("scratch")));
        assert_eq!(
            config.base_template().source.unwrap().path(),
            dir.path().join("modules/minimal")
        );
    }

    #[test]
    fn discovers_alternate_locations() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join(".haven-verify")).unwrap();
        fs::write(dir.path().join(CONFIG_FILENAME_DIR), SUITE).unwrap();

        assert!(SuiteConfig::discover(dir.path()).is_ok());
    }

    #[test]
    fn missing_suite_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            SuiteConfig::discover(dir.path()),
            Err(ConfigError::NotFound(_))
        ));
    }

    #[test]
    fn load_resolves_against_the_file_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("suites");
        fs::create_dir_all(&nested).unwrap();
        let path = nested.join("ci.yml");
        fs::write(&path, SUITE).unwrap();

        let config = SuiteConfig::load(&path).unwrap();

        assert_eq!(config.work_root(), Some(nested.join("scratch")));
    }

    #[test]
    fn plans_follow_suite_order_and_selection() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILENAME), SUITE).unwrap();
        let config = SuiteConfig::discover(dir.path()).unwrap();

        let all = config.plans(&[], None).unwrap();
        assert_eq!(
            all.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
            vec!["minimal", "quick"]
        );
        assert_eq!(all[0].options.mode, PipelineMode::Full);
        assert_eq!(all[1].options.mode, PipelineMode::Validate);

        let selected = config
            .plans(&["quick".to_string()], Some(PipelineMode::Plan))
            .unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].options.mode, PipelineMode::Plan);

        assert!(matches!(
            config.plans(&["nope".to_string()], None),
            Err(ConfigError::UnknownScenario(_))
        ));
    }
}

mod init {
    use super::*;

    #[test]
    fn init_writes_template_once() {
        let dir = tempfile::tempdir().unwrap();

        let path = init_config(dir.path(), false).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), TEMPLATE_YAML);

        assert!(init_config(dir.path(), false).is_err());
        assert!(init_config(dir.path(), true).is_ok());
    }
}
