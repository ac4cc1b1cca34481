//! Property tests for chain execution.

use proptest::collection::{btree_map, vec};
use proptest::prelude::*;
use zoomos_core::{CancellationFlag, StatisticsAggregator, default_chain};
use zoomos_model::{ClientIdentity, Row, RunConfiguration};

fn rows() -> impl Strategy<Value = Vec<Row>> {
    vec(btree_map("[a-z]{1,8}", ".{0,12}", 0..6), 0..40)
}

proptest! {
    #[test]
    fn default_chain_returns_input_unchanged(rows in rows(), client in any::<u64>()) {
        let config = RunConfiguration::new(ClientIdentity::new(client));
        let stats = StatisticsAggregator::new();

        let output = default_chain()
            .execute(rows.clone(), &config, &stats, &CancellationFlag::new())
            .unwrap();

        let snapshot = stats.snapshot();
        prop_assert_eq!(output, rows.clone());
        prop_assert_eq!(snapshot.success_count, rows.len() as u64);
        prop_assert_eq!(snapshot.error_count, 0);
        prop_assert!(snapshot.errors.is_empty());
    }
}
