//! End-to-end pipeline tests: CONFIG_DB in, APPL_DB and notifications out

mod common;

use common::{dual_stack_interface, enabled_global, TestBed};
use pretty_assertions::assert_eq;
use sonic_cfgmgr_common::field_values;
use tokio_test::{assert_err, assert_ok};

use sonic_uemgrd::cli::{execute, Command, InterfaceArgs};
use sonic_uemgrd::{
    encode, resolve, validate_snapshot, ChangeNotification, RawConfigSnapshot, Scope, UeError,
    UE_DUAL_STACK_CONFIG_CHANNEL,
};

#[tokio::test]
async fn test_dual_stack_interface_scenario() {
    let mut bed = TestBed::new();
    bed.config("UE_INTERFACE", "Ethernet0", dual_stack_interface()).await;

    let report = assert_ok!(bed.mgr.run().await);
    assert!(report.is_clean(), "{:?}", report.errors());

    let record = bed
        .appl_db
        .record("UE_INTERFACE_CONFIG:Ethernet0")
        .await
        .expect("interface record");
    let expected: Vec<(&str, &str)> = vec![
        ("enabled", "true"),
        ("ipv4_enabled", "true"),
        ("ipv6_enabled", "true"),
        ("load_balance_mode", "ecmp"),
        ("max_paths_v4", "4"),
        ("max_paths_v6", "2"),
        ("prefer_version", "4"),
    ];
    assert_eq!(
        record.iter().map(|(f, v)| (f.as_str(), v.as_str())).collect::<Vec<_>>(),
        expected
    );

    let published = bed.appl_db.published().await;
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].0, UE_DUAL_STACK_CONFIG_CHANNEL);

    let message: serde_json::Value = serde_json::from_str(&published[0].1).unwrap();
    assert_eq!(message["interface"], "Ethernet0");
    assert_eq!(message["operation"], "SET_DUAL_STACK");
    assert_eq!(message["config"]["max_paths_v6"], "2");
    assert_eq!(message["capabilities"]["ipv4"], true);
    assert_eq!(message["capabilities"]["ipv6"], true);
}

#[tokio::test]
async fn test_ecmp_family_mismatch_scenario() {
    let mut bed = TestBed::new();
    bed.config(
        "UE_ECMP_CONFIG",
        "ipv6_groups|g1",
        field_values! { "prefix" => "10.0.0.0/24", "max_paths" => "8" },
    )
    .await;
    bed.config(
        "UE_ECMP_CONFIG",
        "ipv6_groups|g2",
        field_values! { "prefix" => "fc00::/64" },
    )
    .await;

    let report = bed.mgr.run().await.unwrap();

    assert_eq!(report.validation_errors.len(), 1);
    let error = &report.validation_errors[0];
    assert_eq!(error.scope, Scope::Ecmp);
    assert_eq!(error.key, "ipv6_groups|g1");
    assert!(error.message.contains("g1"));

    let dump = bed.appl_db.dump().await;
    assert!(dump.keys().all(|key| !key.ends_with(":g1")));
    assert_eq!(
        bed.app_field("UE_ECMP_GROUP:ipv6:g2", "prefix").await.as_deref(),
        Some("fc00::/64")
    );
    assert_eq!(
        bed.app_field("UE_ECMP_GROUP:ipv6:g2", "ip_version").await.as_deref(),
        Some("ipv6")
    );
}

#[tokio::test]
async fn test_max_paths_required_iff_version_enabled() {
    let cases = [
        ("4", field_values! { "ue_enable" => "true", "ip_versions" => "4" }, true),
        ("4", field_values! { "ue_enable" => "true", "ip_versions" => "4", "max_paths_v4" => "2" }, false),
        ("6", field_values! { "ue_enable" => "true", "ip_versions" => "6" }, true),
        ("6", field_values! { "ue_enable" => "true", "ip_versions" => "6", "max_paths_v6" => "2" }, false),
        // max_paths of a version that is not enabled is never required
        ("6", field_values! { "ue_enable" => "true", "ip_versions" => "4", "max_paths_v4" => "2" }, false),
    ];

    for (version, fvs, expect_error) in cases {
        let mut bed = TestBed::new();
        bed.config("UE_INTERFACE", "Ethernet8", fvs.clone()).await;

        let report = bed.mgr.run().await.unwrap();
        let required = format!("max_paths_v{} required when IPv{} enabled", version, version);
        let has_error = report
            .validation_errors
            .iter()
            .any(|e| e.scope == Scope::Interface && e.message == required);

        assert_eq!(has_error, expect_error, "{:?}", fvs);
        assert_eq!(
            bed.appl_db.record("UE_INTERFACE_CONFIG:Ethernet8").await.is_some(),
            report.validation_errors.is_empty()
        );
    }
}

#[tokio::test]
async fn test_ecmp_record_iff_prefix_valid() {
    let cases = [
        ("ipv4_groups", "10.1.0.0/16", true),
        ("ipv4_groups", "10.1.0.1/16", false),
        ("ipv4_groups", "fc00::/64", false),
        ("ipv4_groups", "", false),
        ("ipv6_groups", "2001:db8::/32", true),
        ("ipv6_groups", "2001:db8::/129", false),
    ];

    for (container, prefix, expect_record) in cases {
        let mut bed = TestBed::new();
        bed.config(
            "UE_ECMP_CONFIG",
            &format!("{}|grp", container),
            field_values! { "prefix" => prefix },
        )
        .await;

        let report = bed.mgr.run().await.unwrap();
        let family = container.trim_end_matches("_groups");
        let record = bed.appl_db.record(&format!("UE_ECMP_GROUP:{}:grp", family)).await;

        assert_eq!(record.is_some(), expect_record, "{} {}", container, prefix);
        assert_eq!(report.validation_errors.is_empty(), expect_record);
    }
}

#[tokio::test]
async fn test_unchanged_snapshot_is_idempotent() {
    let mut bed = TestBed::new();
    bed.config("UE_GLOBAL", "global", enabled_global("4,6")).await;
    bed.config(
        "UE_ADDRESS_FAMILY",
        "ipv6",
        field_values! { "enabled" => "true", "entropy_fields" => "flow_label,src_port" },
    )
    .await;
    bed.config("UE_INTERFACE", "Ethernet0", dual_stack_interface()).await;
    bed.config(
        "UE_ECMP_CONFIG",
        "ipv4_groups|g1",
        field_values! { "prefix" => "10.0.0.0/8" },
    )
    .await;

    bed.mgr.run().await.unwrap();
    let first_dump = bed.appl_db.dump().await;
    let first_published = bed.appl_db.published().await;
    bed.appl_db.clear_published().await;

    bed.mgr.run().await.unwrap();
    let second_dump = bed.appl_db.dump().await;
    let second_published = bed.appl_db.published().await;

    assert_eq!(first_dump, second_dump);
    // A notification is still sent for an unchanged interface
    assert_eq!(first_published.len(), 1);
    assert_eq!(first_published, second_published);
    assert_eq!(bed.mgr.run_count(), 2);
}

#[test]
fn test_duplicate_interface_last_write_wins() {
    let snapshot = RawConfigSnapshot {
        interfaces: vec![
            ("Ethernet4".to_string(), dual_stack_interface()),
            (
                "Ethernet4".to_string(),
                field_values! {
                    "ue_enable" => "true",
                    "ip_versions" => "6",
                    "max_paths_v6" => "16",
                    "load_balance_mode" => "entropy_spray",
                    "prefer_version" => "6",
                },
            ),
        ],
        ..Default::default()
    };

    let validation = validate_snapshot(&snapshot);
    assert!(validation.errors.is_empty());

    let resolution = resolve(&validation.config);
    let records = encode(&resolution.state);
    assert_eq!(records.len(), 1);

    let fields: Vec<(&str, &str)> = records[0]
        .fields
        .iter()
        .map(|(f, v)| (f.as_str(), v.as_str()))
        .collect();
    assert_eq!(
        fields,
        vec![
            ("enabled", "true"),
            ("ipv4_enabled", "false"),
            ("ipv6_enabled", "true"),
            ("max_paths_v6", "16"),
            ("load_balance_mode", "entropy_spray"),
            ("prefer_version", "6"),
        ]
    );
}

#[tokio::test]
async fn test_global_ip_versions_round_trip() {
    for (ip_versions, ipv4, ipv6) in [("4,6", "true", "true"), ("6", "false", "true"), ("4", "true", "false")] {
        let mut bed = TestBed::new();
        bed.config("UE_GLOBAL", "global", enabled_global(ip_versions)).await;
        bed.mgr.run().await.unwrap();

        assert_eq!(bed.app_field("UE_GLOBAL_STATE", "ipv4_enabled").await.as_deref(), Some(ipv4));
        assert_eq!(bed.app_field("UE_GLOBAL_STATE", "ipv6_enabled").await.as_deref(), Some(ipv6));
    }
}

#[tokio::test]
async fn test_global_disable_gates_lower_scopes() {
    let mut bed = TestBed::new();
    bed.config("UE_GLOBAL", "global", field_values! { "enable" => "false" }).await;
    bed.config("UE_ADDRESS_FAMILY", "ipv4", field_values! { "enabled" => "true" }).await;
    bed.config("UE_INTERFACE", "Ethernet0", dual_stack_interface()).await;

    let report = bed.mgr.run().await.unwrap();
    assert!(report.is_clean());

    assert_eq!(bed.app_field("UE_GLOBAL_STATE", "enabled").await.as_deref(), Some("false"));
    assert_eq!(bed.app_field("UE_IPV4_CONFIG", "enabled").await.as_deref(), Some("false"));
    assert!(bed.appl_db.record("UE_TRANSPORT_MODE").await.is_none());

    let intf = bed.appl_db.record("UE_INTERFACE_CONFIG:Ethernet0").await.unwrap();
    assert_eq!(intf.get("enabled").map(String::as_str), Some("false"));
    assert_eq!(intf.get("ipv4_enabled").map(String::as_str), Some("false"));
    assert!(!intf.contains_key("max_paths_v4"));

    let published = bed.appl_db.published().await;
    let notification: ChangeNotification = serde_json::from_str(&published[0].1).unwrap();
    assert!(!notification.capabilities.ipv4);
    assert!(!notification.capabilities.ipv6);
}

#[tokio::test]
async fn test_disabled_global_with_invalid_field_still_gates() {
    let mut bed = TestBed::new();
    bed.config(
        "UE_GLOBAL",
        "global",
        field_values! { "enable" => "false", "congestion_control" => "bogus" },
    )
    .await;
    bed.config("UE_INTERFACE", "Ethernet0", dual_stack_interface()).await;

    let report = bed.mgr.run().await.unwrap();
    assert_eq!(report.validation_errors.len(), 1);
    assert_eq!(report.validation_errors[0].scope, Scope::Global);

    assert_eq!(bed.app_field("UE_GLOBAL_STATE", "enabled").await.as_deref(), Some("false"));
    assert_eq!(
        bed.app_field("UE_INTERFACE_CONFIG:Ethernet0", "enabled").await.as_deref(),
        Some("false")
    );
}

#[tokio::test]
async fn test_invalid_enabled_global_is_treated_as_disabled() {
    let mut bed = TestBed::new();
    bed.config(
        "UE_GLOBAL",
        "global",
        field_values! { "enable" => "true", "ip_versions" => "4,5" },
    )
    .await;
    bed.config("UE_INTERFACE", "Ethernet0", dual_stack_interface()).await;

    let report = bed.mgr.run().await.unwrap();
    assert_eq!(report.validation_errors.len(), 1);

    assert_eq!(bed.app_field("UE_GLOBAL_STATE", "enabled").await.as_deref(), Some("false"));
    assert!(bed.appl_db.record("UE_TRANSPORT_MODE").await.is_none());
    assert_eq!(
        bed.app_field("UE_INTERFACE_CONFIG:Ethernet0", "ipv4_enabled").await.as_deref(),
        Some("false")
    );
}

#[tokio::test]
async fn test_partial_write_failure_keeps_other_records() {
    let mut bed = TestBed::new();
    bed.config("UE_GLOBAL", "global", enabled_global("4,6")).await;
    bed.config("UE_ADDRESS_FAMILY", "ipv4", field_values! { "enabled" => "true" }).await;
    bed.config("UE_INTERFACE", "Ethernet0", dual_stack_interface()).await;
    bed.appl_db.fail_on_key("UE_IPV4_CONFIG").await;

    let report = bed.mgr.run().await.unwrap();

    assert_eq!(report.apply.errors.len(), 1);
    assert_eq!(report.apply.errors[0].key, "UE_IPV4_CONFIG");
    assert!(report.apply.errors[0].error.is_store_unavailable());
    assert!(bed.appl_db.record("UE_IPV4_CONFIG").await.is_none());

    // Records before and after the failing one are kept
    assert!(bed.appl_db.record("UE_GLOBAL_STATE").await.is_some());
    assert!(bed.appl_db.record("UE_INTERFACE_CONFIG:Ethernet0").await.is_some());
    assert_eq!(bed.appl_db.published().await.len(), 1);
}

#[tokio::test]
async fn test_unreachable_config_db_aborts_run() {
    let mut bed = TestBed::new();
    bed.config("UE_INTERFACE", "Ethernet0", dual_stack_interface()).await;
    bed.config_db.set_unavailable(true).await;

    let err = assert_err!(bed.mgr.run().await);
    assert!(matches!(err, UeError::StoreUnavailable(_)));
    assert!(bed.appl_db.dump().await.is_empty());
    assert!(bed.appl_db.published().await.is_empty());
    assert_eq!(bed.mgr.run_count(), 0);
}

#[tokio::test]
async fn test_capabilities_from_interface_addresses() {
    let bed = TestBed::new();
    let present = field_values! { "NULL" => "NULL" };
    bed.config("INTERFACE", "Ethernet0|10.0.0.1/31", present.clone()).await;
    bed.config("INTERFACE", "Ethernet0|fc00::1/126", present.clone()).await;
    bed.config("INTERFACE", "Ethernet4|10.0.0.3/31", present.clone()).await;
    bed.config("INTERFACE", "Ethernet40|fc00::5/126", present).await;

    let detector = bed.mgr.capability_detector();
    let ethernet0 = detector.detect("Ethernet0").await;
    assert!(ethernet0.ipv4 && ethernet0.ipv6);

    let ethernet4 = detector.detect("Ethernet4").await;
    assert!(ethernet4.ipv4);
    assert!(!ethernet4.ipv6);

    let unknown = detector.detect("Ethernet8").await;
    assert!(!unknown.ipv4 && !unknown.ipv6);

    bed.config_db.set_unavailable(true).await;
    let degraded = detector.detect("Ethernet0").await;
    assert!(!degraded.ipv4 && !degraded.ipv6);
    assert!(matches!(
        detector.try_detect("Ethernet0").await,
        Err(UeError::UnreachableCollaborator { .. })
    ));
}

#[tokio::test]
async fn test_stats_default_to_zero() {
    let bed = TestBed::new();
    bed.state(
        "UE_INTERFACE_STATS_V6:Ethernet0",
        field_values! { "packets_sprayed" => "1200", "active_paths" => "3", "active_connections" => "bogus" },
    )
    .await;

    let stats = assert_ok!(bed.mgr.stats_reader().get_stats("Ethernet0").await);
    assert_eq!(stats.ipv4.packets_sprayed, 0);
    assert_eq!(stats.ipv4.active_paths, 0);
    assert_eq!(stats.ipv6.packets_sprayed, 1200);
    assert_eq!(stats.ipv6.active_paths, 3);
    assert_eq!(stats.ipv6.connections, 0);

    bed.state_db.set_unavailable(true).await;
    let err = assert_err!(bed.mgr.stats_reader().get_stats("Ethernet0").await);
    assert!(err.is_store_unavailable());
}

#[tokio::test]
async fn test_cli_write_is_picked_up_by_next_run() {
    let mut bed = TestBed::new();
    let command = Command::Interface(InterfaceArgs {
        interface: "Ethernet12".to_string(),
        enable: true,
        ipv4: false,
        ipv6: true,
        max_paths_v4: 4,
        max_paths_v6: 8,
        prefer_version: "6".to_string(),
    });

    let output = assert_ok!(execute(&command, &bed.stores(), UE_DUAL_STACK_CONFIG_CHANNEL).await);
    assert!(output.success);
    assert!(output.text.contains("Ethernet12"));

    let raw = bed.config_db.record("UE_INTERFACE|Ethernet12").await.unwrap();
    assert_eq!(raw.get("ip_versions").map(String::as_str), Some("6"));

    bed.mgr.run().await.unwrap();
    assert_eq!(
        bed.app_field("UE_INTERFACE_CONFIG:Ethernet12", "max_paths_v6").await.as_deref(),
        Some("8")
    );
    assert_eq!(
        bed.app_field("UE_INTERFACE_CONFIG:Ethernet12", "ipv4_enabled").await.as_deref(),
        Some("false")
    );
}

#[tokio::test]
async fn test_cli_validate_reports_errors() {
    let bed = TestBed::new();
    bed.config(
        "UE_INTERFACE",
        "Ethernet0",
        field_values! { "ue_enable" => "true", "ip_versions" => "4,6", "max_paths_v4" => "4" },
    )
    .await;

    let output = execute(&Command::Validate, &bed.stores(), UE_DUAL_STACK_CONFIG_CHANNEL)
        .await
        .unwrap();
    assert!(!output.success);
    assert_eq!(
        output.text,
        "interface Ethernet0: max_paths_v6 required when IPv6 enabled"
    );
    assert!(bed.appl_db.dump().await.is_empty());
}
