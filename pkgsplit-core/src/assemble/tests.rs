//! Tests for unit assembly and plan building

use crate::assemble::{assemble, assemble_with_config};
use crate::ast::{MemberKind, Visibility, PLAN_STRATEGY};
use crate::config::PkgsplitConfig;

const BILLING: &str = "\
CREATE OR REPLACE PACKAGE billing IS
  PROCEDURE charge(p_id NUMBER);
  FUNCTION total(p_id NUMBER) RETURN NUMBER;
  PROCEDURE planned;
END billing;
/
CREATE OR REPLACE PACKAGE BODY billing IS
  PROCEDURE charge(p_id NUMBER) IS BEGIN NULL; END charge;
  FUNCTION total(p_id NUMBER) RETURN NUMBER IS BEGIN RETURN p_id; END total;
  PROCEDURE helper IS BEGIN NULL; END helper;
END billing;
/";

const UTIL: &str = "\
CREATE PACKAGE util IS
  PROCEDURE log_it(p_msg VARCHAR2);
  PROCEDURE log_it(p_msg VARCHAR2, p_level NUMBER);
END util;";

#[test]
fn units_are_keyed_in_discovery_order() {
    let source = format!("{}\n{}", BILLING, UTIL);
    let results = assemble(&source);
    let keys: Vec<&str> = results.keys().map(|k| k.as_str()).collect();
    assert_eq!(keys, ["BILLING", "UTIL"]);
}

#[test]
fn declaration_and_body_pair_into_one_member() {
    let results = assemble(BILLING);
    let billing = &results["BILLING"];
    let charge = billing
        .members
        .iter()
        .find(|m| m.name == "charge")
        .expect("charge member");
    assert_eq!(charge.visibility, Visibility::Public);
    assert_eq!(charge.signature_text, "PROCEDURE charge(p_id NUMBER)");
    assert!(charge.body_text.ends_with("END charge;"));
    assert!(!charge.is_stub());
}

#[test]
fn visibility_and_stub_classification() {
    let results = assemble(BILLING);
    let billing = &results["BILLING"];
    assert_eq!(billing.members.len(), 4);

    let planned = billing
        .members
        .iter()
        .find(|m| m.name == "planned")
        .expect("planned member");
    assert_eq!(planned.visibility, Visibility::Public);
    assert!(planned.is_stub());

    let helper = billing
        .members
        .iter()
        .find(|m| m.name == "helper")
        .expect("helper member");
    assert_eq!(helper.visibility, Visibility::Private);
    assert!(!helper.is_stub());
}

#[test]
fn member_counts_are_by_kind() {
    let results = assemble(BILLING);
    let billing = &results["BILLING"];
    assert_eq!(billing.total_procedures, 3);
    assert_eq!(billing.total_functions, 1);
}

#[test]
fn function_return_type_survives_merge() {
    let results = assemble(BILLING);
    let total = results["BILLING"]
        .members
        .iter()
        .find(|m| m.name == "total")
        .expect("total member");
    assert_eq!(total.kind, MemberKind::Function);
    assert_eq!(total.return_type.as_deref(), Some("NUMBER"));
}

#[test]
fn overloads_stay_distinct_and_get_version_suffixes() {
    let results = assemble(UTIL);
    let util = &results["UTIL"];
    assert_eq!(util.members.len(), 2);
    assert_eq!(util.members[0].overload_index, 0);
    assert_eq!(util.members[1].overload_index, 1);

    let targets: Vec<&str> = util
        .decomposition_plan
        .iter()
        .map(|p| p.target_object_name.as_str())
        .collect();
    assert_eq!(targets, ["UTIL_LOG_IT", "UTIL_LOG_IT_v1"]);
}

#[test]
fn plan_entries_carry_the_fixed_strategy() {
    let results = assemble(BILLING);
    let billing = &results["BILLING"];
    assert_eq!(billing.decomposition_plan.len(), billing.members.len());
    for entry in &billing.decomposition_plan {
        assert_eq!(entry.strategy, PLAN_STRATEGY);
    }
}

#[test]
fn plan_targets_are_unit_qualified_in_member_order() {
    let results = assemble(BILLING);
    let targets: Vec<&str> = results["BILLING"]
        .decomposition_plan
        .iter()
        .map(|p| p.target_object_name.as_str())
        .collect();
    assert_eq!(
        targets,
        [
            "BILLING_CHARGE",
            "BILLING_TOTAL",
            "BILLING_PLANNED",
            "BILLING_HELPER"
        ]
    );
}

#[test]
fn stub_plan_entry_falls_back_to_signature_text() {
    let results = assemble(BILLING);
    let planned = results["BILLING"]
        .decomposition_plan
        .iter()
        .find(|p| p.original_name == "planned")
        .expect("planned entry");
    assert_eq!(planned.source_text, "PROCEDURE planned");

    let charge = results["BILLING"]
        .decomposition_plan
        .iter()
        .find(|p| p.original_name == "charge")
        .expect("charge entry");
    assert!(charge.source_text.ends_with("END charge;"));
}

#[test]
fn explicit_parameter_mode_still_pairs_decl_with_body() {
    // The body spells the default IN mode explicitly; that is the same
    // parameter list, not a second overload
    let source = "\
CREATE PACKAGE modes IS
  PROCEDURE charge(p_id NUMBER);
END modes;
CREATE PACKAGE BODY modes IS
  PROCEDURE charge(p_id IN NUMBER) IS BEGIN NULL; END charge;
END modes;";
    let results = assemble(source);
    let unit = &results["MODES"];
    assert_eq!(unit.members.len(), 1);
    let charge = &unit.members[0];
    assert_eq!(charge.visibility, Visibility::Public);
    assert!(!charge.is_stub());
    assert_eq!(charge.overload_index, 0);
    assert_eq!(
        unit.decomposition_plan[0].target_object_name,
        "MODES_CHARGE"
    );
}

#[test]
fn default_value_spelling_does_not_break_pairing() {
    let source = "\
CREATE PACKAGE fmt_pkg IS
  PROCEDURE pad(p_text VARCHAR2, p_len NUMBER := 3);
END fmt_pkg;
CREATE PACKAGE BODY fmt_pkg IS
  PROCEDURE pad(p_text IN VARCHAR2, p_len IN NUMBER DEFAULT 3) IS BEGIN NULL; END pad;
END fmt_pkg;";
    let results = assemble(source);
    let unit = &results["FMT_PKG"];
    assert_eq!(unit.members.len(), 1);
    let pad = &unit.members[0];
    assert_eq!(pad.visibility, Visibility::Public);
    assert!(!pad.is_stub());
    // The declaration's spelling stays authoritative
    assert_eq!(
        pad.parameters,
        vec!["p_text VARCHAR2", "p_len NUMBER := 3"]
    );
}

#[test]
fn three_package_blob_yields_three_complete_results() {
    let source = "\
CREATE PACKAGE a IS PROCEDURE pa; END a;
CREATE PACKAGE BODY a IS PROCEDURE pa IS BEGIN NULL; END pa; END a;
CREATE PACKAGE b IS
  PROCEDURE pb1;
  PROCEDURE pb2;
  FUNCTION fb RETURN NUMBER;
END b;
CREATE PACKAGE BODY b IS
  PROCEDURE pb1 IS BEGIN NULL; END pb1;
  PROCEDURE pb2 IS BEGIN NULL; END pb2;
  FUNCTION fb RETURN NUMBER IS BEGIN RETURN 1; END fb;
END b;
CREATE PACKAGE c IS PROCEDURE pc; END c;
CREATE PACKAGE BODY c IS PROCEDURE pc IS BEGIN NULL; END pc; END c;";
    let results = assemble(source);
    assert_eq!(results.len(), 3);

    let b = &results["B"];
    assert_eq!(b.total_procedures, 2);
    assert_eq!(b.total_functions, 1);
    for member in &b.members {
        assert!(!member.is_stub());
        assert_eq!(member.visibility, Visibility::Public);
    }
    for result in results.values() {
        assert_eq!(
            result.total_procedures + result.total_functions,
            result.members.len()
        );
    }
}

#[test]
fn declaration_only_unit_members_are_public_stubs() {
    let source = "CREATE PACKAGE spec_only IS PROCEDURE p; FUNCTION f RETURN DATE; END spec_only;";
    let results = assemble(source);
    let unit = &results["SPEC_ONLY"];
    assert_eq!(unit.members.len(), 2);
    for member in &unit.members {
        assert_eq!(member.visibility, Visibility::Public);
        assert!(member.is_stub());
    }
}

#[test]
fn implementation_only_unit_members_are_private() {
    let source =
        "CREATE PACKAGE BODY impl_only IS PROCEDURE p IS BEGIN NULL; END p; END impl_only;";
    let results = assemble(source);
    let unit = &results["IMPL_ONLY"];
    assert_eq!(unit.members.len(), 1);
    assert_eq!(unit.members[0].visibility, Visibility::Private);
    assert!(!unit.members[0].is_stub());
}

#[test]
fn config_filters_apply_to_unit_names() {
    let source = format!("{}\n{}", BILLING, UTIL);
    let config: PkgsplitConfig =
        serde_json::from_str(r#"{ "exclude_units": ["util"] }"#).unwrap();
    let resolved = config.resolve(None).unwrap();
    let results = assemble_with_config(&source, Some(&resolved));
    assert_eq!(results.len(), 1);
    assert!(results.contains_key("BILLING"));
}

#[test]
fn empty_source_yields_no_units() {
    assert!(assemble("").is_empty());
}

#[test]
fn assembly_is_idempotent() {
    let source = format!("{}\n{}", BILLING, UTIL);
    assert_eq!(assemble(&source), assemble(&source));
}
