use std::collections::BTreeSet;
use std::fmt::Write;

use tenq_core::TenantKey;

use crate::harness::Timeline;

/// One row per tenant, sorted by name. Each step contributes a `+` per event
/// and pads with `.` up to the busiest tenant of that step, so columns line
/// up across rows.
pub fn render_pattern(timeline: &Timeline) -> String {
    let tenants: BTreeSet<&TenantKey> = timeline
        .steps
        .iter()
        .flat_map(|step| step.keys())
        .collect();
    let widths: Vec<usize> = timeline
        .steps
        .iter()
        .map(|step| step.values().copied().max().unwrap_or(0))
        .collect();

    let mut out = String::new();
    for tenant in tenants {
        let _ = write!(out, "{tenant}: ");
        for (step, width) in timeline.steps.iter().zip(&widths) {
            let count = step.get(tenant).copied().unwrap_or(0);
            out.push_str(&"+".repeat(count));
            out.push_str(&".".repeat(width - count));
        }
        out.push('\n');
    }
    out
}
