//! Property tests for the metric synchronizer

use std::collections::HashSet;
use std::sync::Arc;

use nut_exporter_core::{
    MetricCatalog, MetricKind, MetricSynchronizer, SeriesRegistry, SeriesTransition, VariableMap,
};
use proptest::prelude::*;

fn scalar_variables() -> Vec<(&'static str, &'static str)> {
    MetricCatalog::standard()
        .iter()
        .filter(|d| d.kind == MetricKind::Scalar)
        .map(|d| (d.variable, d.series))
        .collect()
}

fn blob(values: &[((&str, &str), f64)]) -> String {
    values
        .iter()
        .map(|((variable, _), value)| format!("{variable}: {value}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn variable_set() -> impl Strategy<Value = Vec<((&'static str, &'static str), f64)>> {
    let all = scalar_variables();
    let len = all.len();
    proptest::sample::subsequence(all, 0..=len).prop_flat_map(|vars| {
        let n = vars.len();
        (Just(vars), proptest::collection::vec(-1.0e6f64..1.0e6, n))
            .prop_map(|(vars, values)| vars.into_iter().zip(values).collect())
    })
}

fn synchronizer() -> MetricSynchronizer {
    MetricSynchronizer::new(MetricCatalog::standard(), Arc::new(SeriesRegistry::new()))
}

proptest! {
    /// Property: applying the same variables twice changes nothing the second time
    #[test]
    fn reapply_is_idempotent(values in variable_set()) {
        let sync = synchronizer();
        let vars = VariableMap::from_blob(&blob(&values));

        let first = sync.apply(&vars);
        prop_assert_eq!(first.count(SeriesTransition::Registered), values.len());

        let second = sync.apply(&vars);
        prop_assert_eq!(second.structural_changes(), 0);
        prop_assert_eq!(second.count(SeriesTransition::Unchanged), values.len());
        prop_assert_eq!(sync.registry().len(), values.len());
    }

    /// Property: scalar values are exported exactly as parsed
    #[test]
    fn values_are_exported(values in variable_set()) {
        let sync = synchronizer();
        sync.apply(&VariableMap::from_blob(&blob(&values)));
        for ((_, series), value) in &values {
            prop_assert_eq!(sync.registry().value(series), Some(*value));
        }
    }

    /// Property: a series missing from a later poll is removed exactly once
    #[test]
    fn vanished_series_removed_once(
        before in variable_set(),
        after in variable_set(),
    ) {
        let sync = synchronizer();
        sync.apply(&VariableMap::from_blob(&blob(&before)));

        let kept: HashSet<&str> = after.iter().map(|((_, s), _)| *s).collect();
        let expected_removed = before
            .iter()
            .filter(|((_, s), _)| !kept.contains(s))
            .count();

        let report = sync.apply(&VariableMap::from_blob(&blob(&after)));
        prop_assert_eq!(report.count(SeriesTransition::Removed), expected_removed);
        prop_assert_eq!(sync.registry().len(), after.len());

        let again = sync.apply(&VariableMap::from_blob(&blob(&after)));
        prop_assert_eq!(again.count(SeriesTransition::Removed), 0);
    }
}
