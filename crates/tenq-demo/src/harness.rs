use std::collections::BTreeMap;

use tenq_core::{DequeueResult, Queue, TenantKey};

use crate::scenario::Scenario;

/// Per-step event counts for each tenant.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Timeline {
    pub steps: Vec<BTreeMap<TenantKey, usize>>,
}

impl Timeline {
    pub fn record(&mut self, step: usize, tenant: TenantKey) {
        if self.steps.len() <= step {
            self.steps.resize_with(step + 1, BTreeMap::new);
        }
        *self.steps[step].entry(tenant).or_insert(0) += 1;
    }

    /// Ensures `step` exists even if nothing happened in it.
    pub fn mark(&mut self, step: usize) {
        if self.steps.len() <= step {
            self.steps.resize_with(step + 1, BTreeMap::new);
        }
    }

    pub fn total(&self) -> usize {
        self.steps.iter().flat_map(|step| step.values()).sum()
    }

    pub fn count(&self, tenant: &TenantKey) -> usize {
        self.steps
            .iter()
            .filter_map(|step| step.get(tenant))
            .sum()
    }
}

#[derive(Clone, Debug, Default)]
pub struct RunReport {
    /// What each step tried to put.
    pub input: Timeline,
    /// Which tenant each iteration's `next` served.
    pub output: Timeline,
    /// Puts refused with `BufferFull`.
    pub rejected: usize,
}

/// Feeds one scenario step per iteration, then consumes at most one message,
/// until the steps run out and the queue is empty.
///
/// `next` is only called after `is_empty` reports pending data, so a
/// blocking FIFO queue never parks the harness.
pub fn drive(queue: &dyn Queue<u64>, scenario: &Scenario) -> RunReport {
    let mut report = RunReport::default();
    let mut index = 0;
    let mut step = 0;

    while index < scenario.steps.len() || !queue.is_empty() {
        if let Some(messages) = scenario.steps.get(index) {
            report.input.mark(index);
            for message in messages {
                report.input.record(index, message.tenant.clone());
                if let Err(error) = queue.put(message.tenant.clone(), message.payload) {
                    tracing::debug!(step, %error, "put refused");
                    report.rejected += 1;
                }
            }
            index += 1;
        }

        report.output.mark(step);
        if !queue.is_empty() {
            match queue.next() {
                DequeueResult::Message(message) => report.output.record(step, message.tenant),
                DequeueResult::Empty => {}
                DequeueResult::Closed => break,
            }
        }
        step += 1;
    }

    tracing::debug!(
        steps = step,
        delivered = report.output.total(),
        rejected = report.rejected,
        "scenario finished"
    );
    report
}
