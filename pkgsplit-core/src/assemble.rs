//! Unit assembly: discovery, per-unit scanning, merge, plan building
//!
//! Global invariants enforced:
//! - Units keyed and ordered by discovery order
//! - Members merged by case-folded name; overload indices assigned in
//!   scan order
//! - Assembly never fails: malformed input degrades to fewer members,
//!   never to an error

use crate::ast::{
    Member, MemberKind, MergedMember, PlanEntry, UnitResult, Visibility, PLAN_STRATEGY,
};
use crate::config::ResolvedConfig;
use crate::discover;
use crate::scanner;
use indexmap::IndexMap;
use log::debug;
use std::collections::HashMap;

/// Decompose every discovered unit in the source text.
pub fn assemble(source: &str) -> IndexMap<String, UnitResult> {
    assemble_with_config(source, None)
}

/// Decompose every discovered unit, applying config unit filters and
/// scan limits when a resolved configuration is supplied.
pub fn assemble_with_config(
    source: &str,
    config: Option<&ResolvedConfig>,
) -> IndexMap<String, UnitResult> {
    let limits = config.map(|c| c.limits).unwrap_or_default();
    let units = discover::discover(source, &limits);

    let mut results = IndexMap::new();
    for unit in units {
        if let Some(cfg) = config {
            if !cfg.should_include_unit(&unit.name) {
                debug!("unit {} filtered out by configuration", unit.name);
                continue;
            }
        }
        let decl_text = unit.decl.map(|s| s.slice(source)).unwrap_or("");
        let impl_text = unit.body.map(|s| s.slice(source)).unwrap_or("");
        let members = scanner::scan_unit(&unit.name, decl_text, impl_text, &limits);
        results.insert(unit.name.clone(), build_unit_result(unit.name, members));
    }
    results
}

/// Merge a unit's member occurrences and build its result record.
fn build_unit_result(unit_name: String, members: Vec<Member>) -> UnitResult {
    let merged = merge_members(members);
    let total_procedures = merged
        .iter()
        .filter(|m| m.kind == MemberKind::Procedure)
        .count();
    let total_functions = merged
        .iter()
        .filter(|m| m.kind == MemberKind::Function)
        .count();
    let decomposition_plan = merged.iter().map(|m| plan_entry(&unit_name, m)).collect();

    UnitResult {
        unit_name,
        members: merged,
        total_procedures,
        total_functions,
        decomposition_plan,
        note: None,
    }
}

/// Merge occurrences into one record per distinct routine.
///
/// Occurrences are grouped by (case-folded name, normalized parameter
/// signature), preserving first-seen scan order; each group is one
/// overload, so a declaration and its implementation pair up while two
/// routines sharing a name with different parameter lists stay distinct.
fn merge_members(members: Vec<Member>) -> Vec<MergedMember> {
    let mut order: Vec<(String, String)> = Vec::new();
    let mut groups: HashMap<(String, String), Vec<Member>> = HashMap::new();
    for member in members {
        let key = (member.folded_name(), member.param_signature());
        if !groups.contains_key(&key) {
            order.push(key.clone());
        }
        groups.entry(key).or_default().push(member);
    }

    let mut overload_counts: HashMap<String, usize> = HashMap::new();
    let mut merged = Vec::with_capacity(order.len());
    for key in order {
        let group = match groups.remove(&key) {
            Some(g) if !g.is_empty() => g,
            _ => continue,
        };
        let index = overload_counts.entry(key.0).or_insert(0);
        let mut record = merge_group(group);
        record.overload_index = *index;
        *index += 1;
        merged.push(record);
    }
    merged
}

/// Merge one overload group into a single record.
///
/// The declaration-only occurrence carries the authoritative public
/// contract (signature, parameters, return type); the body comes from
/// whichever occurrence has one. Visibility is public iff the routine
/// appeared in the declaration region.
fn merge_group(group: Vec<Member>) -> MergedMember {
    let visibility = if group.iter().any(|m| m.is_declared_public) {
        Visibility::Public
    } else {
        Visibility::Private
    };
    let body_text = group
        .iter()
        .find(|m| m.has_body())
        .map(|m| m.body_text.clone())
        .unwrap_or_default();
    let primary = group.iter().find(|m| !m.has_body()).unwrap_or(&group[0]);

    MergedMember {
        name: primary.name.clone(),
        kind: primary.kind,
        signature_text: primary.signature_text.clone(),
        body_text,
        return_type: primary.return_type.clone(),
        parameters: primary.parameters.clone(),
        visibility,
        overload_index: 0,
    }
}

/// One plan entry per merged member: an independent, unit-qualified
/// object named `{unit_name}_{member_name}`, suffixed `_v{N}` for the
/// Nth overload beyond the first.
fn plan_entry(unit_name: &str, member: &MergedMember) -> PlanEntry {
    let base = format!("{}_{}", unit_name, member.name.to_uppercase());
    let target_object_name = if member.overload_index == 0 {
        base
    } else {
        format!("{}_v{}", base, member.overload_index)
    };

    PlanEntry {
        target_object_name,
        original_name: member.name.clone(),
        kind: member.kind,
        visibility: member.visibility,
        source_text: if member.is_stub() {
            member.signature_text.clone()
        } else {
            member.body_text.clone()
        },
        return_type: member.return_type.clone(),
        strategy: PLAN_STRATEGY.to_string(),
    }
}

#[cfg(test)]
#[path = "assemble/tests.rs"]
mod tests;
