use pdist_core::plan::{static_partition, MIN_CHUNK_SIZE};
use pdist_core::{Axis, AxisChunks, ChunkPlan, PlanRequest};
use proptest::prelude::*;

fn arb_strategy() -> impl Strategy<Value = pdist_core::Strategy> {
    prop_oneof![
        Just(pdist_core::Strategy::Auto),
        Just(pdist_core::Strategy::ParallelOnX),
        Just(pdist_core::Strategy::ParallelOnY),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn test_chunks_cover_axis_exactly(n_samples in 1usize..5_000, chunk_size in MIN_CHUNK_SIZE..600) {
        let axis = AxisChunks::new(n_samples, chunk_size);

        prop_assert_eq!(
            axis.chunk_size * (axis.n_chunks - 1) + axis.last_chunk_size,
            n_samples
        );
        prop_assert!(axis.last_chunk_size > 0 && axis.last_chunk_size <= axis.chunk_size);

        let mut expected_start = 0;
        for r in axis.iter() {
            prop_assert_eq!(r.start, expected_start);
            prop_assert!(!r.is_empty());
            expected_start = r.end;
        }
        prop_assert_eq!(expected_start, n_samples);
    }

    #[test]
    fn test_thread_budget_bounds(
        n_x in 0usize..20_000,
        n_y in 0usize..20_000,
        chunk_size in MIN_CHUNK_SIZE..1024,
        threads in 1usize..64,
        strategy in arb_strategy(),
    ) {
        let req = PlanRequest {
            chunk_size,
            effective_n_threads: threads,
            strategy,
            ..PlanRequest::default()
        };
        let plan = ChunkPlan::new(n_x, n_y, &req).unwrap();
        let parallel_chunks = match plan.parallel_axis {
            Axis::X => plan.x.n_chunks,
            Axis::Y => plan.y.n_chunks,
        };

        prop_assert!(plan.n_threads >= 1);
        prop_assert!(plan.n_threads <= threads);
        if parallel_chunks > 0 {
            prop_assert!(plan.n_threads <= parallel_chunks);
        }
    }

    #[test]
    fn test_auto_resolution_is_deterministic(
        n_x in 0usize..100_000,
        n_y in 0usize..100_000,
        chunk_size in MIN_CHUNK_SIZE..1024,
        threads in 1usize..128,
    ) {
        let req = PlanRequest {
            chunk_size,
            effective_n_threads: threads,
            strategy: pdist_core::Strategy::Auto,
            ..PlanRequest::default()
        };
        let first = ChunkPlan::new(n_x, n_y, &req).unwrap();
        let second = ChunkPlan::new(n_x, n_y, &req).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn test_static_partition_is_disjoint_and_complete(n_items in 0usize..500, n_parts in 1usize..40) {
        let mut next = 0;
        for part in 0..n_parts {
            let r = static_partition(n_items, n_parts, part);
            prop_assert_eq!(r.start, next);
            next = r.end;
        }
        prop_assert_eq!(next, n_items);
    }
}

#[test]
fn test_documented_auto_scenarios() {
    let plan = ChunkPlan::new(
        1000,
        10,
        &PlanRequest {
            chunk_size: 256,
            effective_n_threads: 8,
            strategy: pdist_core::Strategy::Auto,
            ..PlanRequest::default()
        },
    )
    .unwrap();
    assert_eq!(plan.parallel_axis, Axis::X);

    let plan = ChunkPlan::new(
        50,
        10_000,
        &PlanRequest {
            chunk_size: 256,
            effective_n_threads: 16,
            strategy: pdist_core::Strategy::Auto,
            ..PlanRequest::default()
        },
    )
    .unwrap();
    assert_eq!(plan.parallel_axis, Axis::Y);
}
