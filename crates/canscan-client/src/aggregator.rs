//! Result aggregation
//!
//! Keeps results in arrival order and maintains per-category counts on append,
//! so reading counts never rescans the collection.

use std::collections::HashMap;

use canscan_core::{ScanResult, ScanStatus};

#[derive(Debug, Clone, Default)]
pub struct ResultAggregator {
    results: Vec<ScanResult>,
    counts_by_type: HashMap<String, usize>,
    counts_by_status: HashMap<ScanStatus, usize>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, result: ScanResult) {
        *self
            .counts_by_type
            .entry(result.category().to_string())
            .or_insert(0) += 1;
        *self.counts_by_status.entry(result.status).or_insert(0) += 1;
        self.results.push(result);
    }

    /// All results, in arrival order
    pub fn all(&self) -> &[ScanResult] {
        &self.results
    }

    pub fn counts_by_type(&self) -> &HashMap<String, usize> {
        &self.counts_by_type
    }

    pub fn counts_by_status(&self) -> &HashMap<ScanStatus, usize> {
        &self.counts_by_status
    }

    /// Number of results with the given status
    pub fn count_status(&self, status: ScanStatus) -> usize {
        self.counts_by_status.get(&status).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Consume the aggregator, returning its results, per-type and per-status counts
    #[allow(clippy::type_complexity)]
    pub fn into_parts(
        self,
    ) -> (
        Vec<ScanResult>,
        HashMap<String, usize>,
        HashMap<ScanStatus, usize>,
    ) {
        (self.results, self.counts_by_type, self.counts_by_status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_parts_keeps_all_counts() {
        let mut aggregator = ResultAggregator::new();
        aggregator.append(ScanResult::new("sniff", ScanStatus::Detected));
        aggregator.append(ScanResult::new("inject", ScanStatus::Failed));

        let (results, by_type, by_status) = aggregator.into_parts();
        assert_eq!(results.len(), 2);
        assert_eq!(by_type["inject"], 1);
        assert_eq!(by_status[&ScanStatus::Detected], 1);
        assert_eq!(by_status[&ScanStatus::Failed], 1);
    }

    #[test]
    fn test_append_preserves_order_and_counts() {
        let mut aggregator = ResultAggregator::new();
        aggregator.append(ScanResult::new("sniff", ScanStatus::Detected).with_packet("a"));
        aggregator.append(ScanResult::new("inject", ScanStatus::Success));
        aggregator.append(ScanResult::new("sniff", ScanStatus::Detected).with_packet("b"));

        let packets: Vec<_> = aggregator
            .all()
            .iter()
            .map(|r| r.packet.as_deref())
            .collect();
        assert_eq!(packets, vec![Some("a"), None, Some("b")]);
        assert_eq!(aggregator.counts_by_type()["sniff"], 2);
        assert_eq!(aggregator.counts_by_type()["inject"], 1);
        assert_eq!(aggregator.count_status(ScanStatus::Detected), 2);
        assert_eq!(aggregator.count_status(ScanStatus::Failed), 0);
    }

    #[test]
    fn test_untyped_results_counted_as_unknown() {
        let mut aggregator = ResultAggregator::new();
        aggregator.append(ScanResult::new("", ScanStatus::Unknown));

        assert_eq!(aggregator.counts_by_type()["unknown"], 1);
        assert_eq!(aggregator.len(), 1);
    }
}
