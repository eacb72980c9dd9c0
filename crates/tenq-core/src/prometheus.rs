use crate::api::QueueStats;

pub fn render_stats(stats: &QueueStats, namespace: &str) -> String {
    let ns = if namespace.is_empty() {
        "tenq"
    } else {
        namespace
    };

    let mut out = String::new();
    out.push_str(&format!(
        "# HELP {ns}_enqueued_total Total messages admitted\n# TYPE {ns}_enqueued_total counter\n{ns}_enqueued_total {}\n",
        stats.enqueued
    ));
    out.push_str(&format!(
        "# HELP {ns}_dequeued_total Total messages delivered\n# TYPE {ns}_dequeued_total counter\n{ns}_dequeued_total {}\n",
        stats.dequeued
    ));
    out.push_str(&format!(
        "# HELP {ns}_rejected_total Total puts refused because the buffer was full\n# TYPE {ns}_rejected_total counter\n{ns}_rejected_total {}\n",
        stats.rejected
    ));
    out.push_str(&format!(
        "# HELP {ns}_pending Messages currently buffered\n# TYPE {ns}_pending gauge\n{ns}_pending {}\n",
        stats.pending
    ));
    out.push_str(&format!(
        "# HELP {ns}_tenants Tenants registered in the round-robin ring\n# TYPE {ns}_tenants gauge\n{ns}_tenants {}\n",
        stats.tenants
    ));

    out
}
