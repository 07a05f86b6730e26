//! Reporting and output generation
//!
//! Global invariants enforced:
//! - Deterministic output ordering (discovery order for units, scan
//!   order for members)
//! - Byte-for-byte identical output across runs

use crate::ast::UnitResult;
use indexmap::IndexMap;

/// Render decomposition results as a text table
pub fn render_text(results: &IndexMap<String, UnitResult>) -> String {
    let mut output = String::new();

    for (i, result) in results.values().enumerate() {
        if i > 0 {
            output.push('\n');
        }
        output.push_str(&format!(
            "{} ({} procedures, {} functions)\n",
            result.unit_name, result.total_procedures, result.total_functions
        ));
        if let Some(ref note) = result.note {
            output.push_str(&format!("  note: {}\n", note));
            continue;
        }

        output.push_str(&format!(
            "  {:<30} {:<10} {:<10} {:<6} {}\n",
            "TARGET", "KIND", "VISIBILITY", "STUB", "RETURNS"
        ));
        for (member, entry) in result.members.iter().zip(&result.decomposition_plan) {
            output.push_str(&format!(
                "  {:<30} {:<10} {:<10} {:<6} {}\n",
                truncate_or_pad(&entry.target_object_name, 30),
                entry.kind.as_str(),
                entry.visibility.as_str(),
                if member.is_stub() { "yes" } else { "no" },
                entry.return_type.as_deref().unwrap_or("-"),
            ));
        }
    }

    output
}

/// Render decomposition results as JSON output
pub fn render_json(results: &IndexMap<String, UnitResult>) -> String {
    serde_json::to_string_pretty(results).unwrap_or_else(|_| "{}".to_string())
}

/// Truncate or pad string to fixed width
fn truncate_or_pad(s: &str, width: usize) -> String {
    if s.len() > width {
        format!("{}...", &s[..width.saturating_sub(3)])
    } else {
        format!("{:<width$}", s, width = width)
    }
}
