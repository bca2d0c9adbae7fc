//! Property-based boundary tests.
//!
//! Uses proptest to check that inclusive numeric ranges and derived values
//! hold across the whole input space rather than at hand-picked points.

use cloud_resource_schemas::resources::ec2::Vpc;
use cloud_resource_schemas::resources::kinesis::KinesisStream;
use cloud_resource_schemas::resources::secretsmanager::Secret;
use cloud_resource_schemas::resources::sqs::SqsQueue;
use cloud_resource_schemas::{ResourceAttributes, ResourceError, ValidationError};
use proptest::prelude::*;
use serde_json::json;

proptest! {
    #[test]
    fn prop_retention_range(hours in 0i64..10_000) {
        let result = KinesisStream::build(&json!({"name": "s", "retention_period": hours}));
        if (24..=8760).contains(&hours) {
            let stream = result.unwrap();
            prop_assert_eq!(stream.retention_period_days(), hours / 24);
            prop_assert_eq!(stream.has_extended_retention(), hours > 24);
        } else {
            let is_range_error = matches!(
                result,
                Err(ResourceError::Validation(
                    ValidationError::BelowMinimum { .. } | ValidationError::AboveMaximum { .. }
                ))
            );
            prop_assert!(is_range_error);
        }
    }

    #[test]
    fn prop_delay_range(delay in -100i64..1_000) {
        let result = SqsQueue::build(&json!({"name": "orders", "delay_seconds": delay}));
        prop_assert_eq!(result.is_ok(), (0..=900).contains(&delay));
    }

    #[test]
    fn prop_provisioned_throughput_scales_with_shards(shards in 1i64..=500) {
        let stream = KinesisStream::build(&json!({"name": "s", "shard_count": shards})).unwrap();
        prop_assert_eq!(stream.write_capacity_mb_per_sec(), Some(shards));
        prop_assert_eq!(stream.read_capacity_mb_per_sec(), Some(shards * 2));
        prop_assert_eq!(stream.write_records_per_sec(), Some(shards * 1000));
        prop_assert!(stream.estimated_monthly_cost() > 0.0);
    }

    #[test]
    fn prop_vpc_prefix_range(prefix in 8u8..=32) {
        let result = Vpc::build(&json!({"cidr_block": format!("10.0.0.0/{prefix}")}));
        if (16..=28).contains(&prefix) {
            let vpc = result.unwrap();
            prop_assert_eq!(vpc.prefix_length(), Some(prefix));
            prop_assert_eq!(vpc.total_ip_addresses(), Some(1u64 << (32 - u32::from(prefix))));
        } else {
            prop_assert!(result.is_err());
        }
    }

    #[test]
    fn prop_recovery_window(days in 0i64..=30) {
        let result = Secret::build(&json!({"name": "db", "recovery_window_in_days": days}));
        prop_assert_eq!(result.is_ok(), days == 0 || days >= 7);
    }
}
