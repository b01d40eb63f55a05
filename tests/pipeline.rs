//! End-to-end properties of a comparison, exercised through `Comparator`.

use std::sync::Arc;

use revdiff::{
    Comparator, ComparisonRequest, ComparisonResult, InMemoryRevisionStore, OpKind, Significance,
    Token,
};

const CONTRACT_V1: &str = "# Services Agreement\n\n\
1. Scope\n\n\
The Supplier shall deliver the services described in Schedule A. \
Payment is due within 30 days of invoice.\n\n\
2. Termination\n\n\
Either party may terminate with 60 days written notice.\n";

const CONTRACT_V2: &str = "# Services Agreement\n\n\
1. Scope\n\n\
The Supplier shall deliver the services described in Schedule A and Schedule B. \
Payment is due within 14 days of invoice.\n\n\
2. Termination\n\n\
Either party may terminate with 30 days written notice. \
Termination fees are listed in Appendix C.\n";

fn store() -> InMemoryRevisionStore {
    let store = InMemoryRevisionStore::new();
    store.insert("contract", 1, CONTRACT_V1);
    store.insert("contract", 2, CONTRACT_V2);
    store.insert("cat", 1, "The cat sat on the mat.");
    store.insert("cat", 2, "A cat was sitting on the mat.");
    store.insert("disjoint", 1, "abc def ghi");
    store.insert("disjoint", 2, "xyz uvw");
    store
}

fn comparator() -> Comparator {
    Comparator::builder(Arc::new(store()))
        .build()
        .expect("default comparator")
}

fn texts(tokens: &[Token]) -> String {
    tokens.iter().map(|t| t.text.as_str()).collect()
}

fn rebuild(result: &ComparisonResult) -> (String, String) {
    let mut a = String::new();
    let mut b = String::new();
    for op in &result.operations {
        if op.kind != OpKind::Insert {
            a.push_str(&texts(&op.a_content));
        }
        if op.kind != OpKind::Delete {
            b.push_str(&texts(&op.b_content));
        }
    }
    (a, b)
}

#[tokio::test]
async fn every_configuration_round_trips() {
    let comparator = comparator();
    for granularity in ["character", "word", "sentence", "paragraph"] {
        for algorithm in ["syntactic", "semantic", "hybrid"] {
            let request = ComparisonRequest::new("contract", 1, 2)
                .with_granularity(granularity)
                .with_algorithm(algorithm);
            let result = comparator
                .compare(&request)
                .await
                .expect("comparison should succeed");
            assert_eq!(
                rebuild(&result),
                (CONTRACT_V1.to_string(), CONTRACT_V2.to_string()),
                "{granularity}/{algorithm}"
            );
            assert!(result.metrics.is_well_formed(), "{granularity}/{algorithm}");
            // Same heading skeleton on both sides, so structure alone scores 0.3.
            assert!(result.metrics.overall_similarity > 0.3);
            assert!(result.metrics.overall_similarity < 1.0);
            assert!(result.change_count() > 0);
        }
    }
}

#[tokio::test]
async fn self_comparison_is_unchanged() {
    let comparator = comparator();
    for granularity in ["character", "word", "sentence", "paragraph"] {
        let request = ComparisonRequest::new("contract", 2, 2).with_granularity(granularity);
        let result = comparator.compare(&request).await.expect("self comparison");

        assert_eq!(result.metrics.overall_similarity, 1.0);
        assert_eq!(result.metrics.change_significance, Significance::None);
        assert_eq!(result.change_count(), 0);
        assert!(result.operations.iter().all(|op| op.kind == OpKind::Equal));
    }
}

#[tokio::test]
async fn disjoint_revisions_are_one_delete_and_one_insert() {
    let comparator = comparator();
    let result = comparator
        .compare(&ComparisonRequest::new("disjoint", 1, 2))
        .await
        .expect("disjoint comparison");

    let kinds: Vec<OpKind> = result.operations.iter().map(|op| op.kind).collect();
    assert_eq!(kinds, vec![OpKind::Delete, OpKind::Insert]);
    assert_eq!(texts(&result.operations[0].a_content), "abc def ghi");
    assert_eq!(texts(&result.operations[1].b_content), "xyz uvw");
    assert_eq!(result.metrics.text_similarity, 0.0);
    assert_eq!(result.metrics.structural_similarity, 1.0);
    assert_eq!(
        result.metrics.change_significance,
        Significance::CompleteRewrite
    );
    assert_eq!(result.change_summary.major_removals, vec!["abc def ghi"]);
    assert_eq!(result.change_summary.major_additions, vec!["xyz uvw"]);
}

#[tokio::test]
async fn hybrid_reclassifies_a_rephrased_sentence() {
    let comparator = comparator();
    let request = ComparisonRequest::new("cat", 1, 2)
        .with_granularity("sentence")
        .with_algorithm("hybrid")
        .with_threshold(0.6);
    let result = comparator.compare(&request).await.expect("hybrid comparison");

    assert_eq!(result.operations.len(), 1);
    let op = &result.operations[0];
    assert_eq!(op.kind, OpKind::Replace);
    assert!(op.confidence.is_some_and(|c| c >= 0.6));

    let syntactic = comparator
        .compare(&request.clone().with_algorithm("syntactic"))
        .await
        .expect("syntactic comparison");
    let kinds: Vec<OpKind> = syntactic.operations.iter().map(|op| op.kind).collect();
    assert_eq!(kinds, vec![OpKind::Delete, OpKind::Insert]);
}

#[tokio::test]
async fn response_contract_shape() {
    let comparator = comparator();
    let result = comparator
        .compare(&ComparisonRequest::new("contract", 1, 2).with_granularity("sentence"))
        .await
        .expect("comparison");
    let json = serde_json::to_value(result.to_response()).expect("serializable response");

    for key in ["operations", "metrics", "change_summary", "cached", "computed_at"] {
        assert!(json.get(key).is_some(), "missing {key}");
    }
    for key in [
        "overall_similarity",
        "text_similarity",
        "structural_similarity",
        "change_significance",
    ] {
        assert!(json["metrics"].get(key).is_some(), "missing metrics.{key}");
    }
    let first = &json["operations"][0];
    assert!(first["operation"].is_string());
    assert!(first["a_content"].is_array());
    assert!(first["b_content"].is_array());
    assert!(first["position"].is_u64());
    assert_eq!(json["cached"], false);
}

#[tokio::test]
async fn structural_similarity_tracks_headings() {
    let store = InMemoryRevisionStore::new();
    store.insert("outline", 1, "# Intro\n\nText.\n\n# Terms\n\nMore text.");
    store.insert("outline", 2, "# Intro\n\nText.\n\n# Pricing\n\nMore text.");
    let comparator = Comparator::builder(Arc::new(store)).build().expect("comparator");

    let result = comparator
        .compare(&ComparisonRequest::new("outline", 1, 2).with_granularity("paragraph"))
        .await
        .expect("comparison");
    // Skeletons: [H(Intro), B, H(Terms), B] vs [H(Intro), B, H(Pricing), B].
    assert_eq!(result.metrics.structural_similarity, 0.75);
}
