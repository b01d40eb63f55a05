use std::sync::Arc;

use revdiff::{
    AlignOptions, Comparator, ComparisonError, ComparisonRequest, InMemoryRevisionStore,
};

fn comparator_with(options: AlignOptions) -> Comparator {
    let store = InMemoryRevisionStore::new();
    store.insert("memo", 1, "x y x y x y");
    store.insert("memo", 2, "y y x x y y x");
    Comparator::builder(Arc::new(store))
        .align_options(options)
        .build()
        .expect("comparator")
}

#[tokio::test]
async fn invalid_granularity_is_rejected_without_caching() {
    let comparator = comparator_with(AlignOptions::default());
    let request = ComparisonRequest::new("memo", 1, 2).with_granularity("paragraphs");

    let err = comparator.compare(&request).await.expect_err("invalid granularity");
    assert!(matches!(err, ComparisonError::InvalidConfig(ref msg) if msg.contains("paragraphs")));
    assert!(comparator.cache().is_empty());
    assert_eq!(comparator.cache().stats().misses, 0);
}

#[tokio::test]
async fn out_of_range_threshold_is_rejected() {
    let comparator = comparator_with(AlignOptions::default());
    for threshold in [-0.01, 1.5, f64::NAN, f64::INFINITY] {
        let request = ComparisonRequest::new("memo", 1, 2).with_threshold(threshold);
        let err = comparator.compare(&request).await.expect_err("bad threshold");
        assert_eq!(err.kind(), "invalid_config", "{threshold}");
    }
    assert!(comparator.cache().is_empty());
}

#[tokio::test]
async fn unknown_revision_propagates_not_found() {
    let comparator = comparator_with(AlignOptions::default());
    let err = comparator
        .compare(&ComparisonRequest::new("missing", 1, 2))
        .await
        .expect_err("missing revision");
    assert_eq!(err.kind(), "revision_not_found");
    assert!(comparator.cache().is_empty());
}

#[tokio::test]
async fn over_budget_alignment_is_diff_too_large() {
    let comparator = comparator_with(AlignOptions {
        max_edit_distance: 1,
        ..AlignOptions::default()
    });
    let err = comparator
        .compare(&ComparisonRequest::new("memo", 1, 2).with_algorithm("syntactic"))
        .await
        .expect_err("too large");
    assert!(matches!(err, ComparisonError::DiffTooLarge { limit: 1, .. }));
    assert!(comparator.cache().is_empty());

    // Coarser granularity succeeds on the same revisions.
    let ok = comparator
        .compare(&ComparisonRequest::new("memo", 1, 2).with_granularity("paragraph"))
        .await
        .expect("paragraph comparison");
    assert_eq!(ok.operations.len(), 1);
}
