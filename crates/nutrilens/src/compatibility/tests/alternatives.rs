use std::sync::Arc;
use std::time::Duration;

use super::common::*;

use crate::compatibility::alternatives::{
    dedupe_candidates, AlternativeRanker, CandidateRecord, CandidateRetriever, CandidateSource,
    ImprovementKind, RankingConfig, RetrievalConfig, SimilarityScorer, SourceWeights,
};
use crate::compatibility::domain::{Nutrient, ProductRecord};

fn ranker() -> AlternativeRanker {
    AlternativeRanker::new(restrictions(), RankingConfig::default())
}

fn record(product: ProductRecord, source: CandidateSource) -> CandidateRecord {
    CandidateRecord { product, source }
}

#[test]
fn eighty_percent_sugar_is_exactly_one_less_sugar_improvement() {
    let target = cereal();
    let candidate = cereal_variant("3017620422010", 0.8);

    let ranked = ranker().rank(
        &target,
        &empty_profile(),
        vec![record(candidate, CandidateSource::Category)],
        5,
        0.0,
    );

    assert_eq!(ranked.len(), 1);
    let alternative = &ranked[0];
    assert_eq!(alternative.improvement_reasons.len(), 1);
    assert_eq!(
        alternative.improvement_reasons[0].kind,
        ImprovementKind::LessSugar
    );
    assert_eq!(alternative.improvement_reasons[0].message, "20% less sugar");
    assert!(alternative.breakdown.nutrition_delta_bonus > 0.0);
    assert_eq!(alternative.breakdown.source_weight, 5.0);
    assert_eq!(alternative.breakdown.improvement_bonus, 2.0);
}

#[test]
fn eighty_percent_boundary_holds_for_inexact_products() {
    let mut target = cereal();
    target.nutrients.set(Nutrient::Sugars, 11.2);
    let mut candidate = cereal_variant("3017620422011", 1.0);
    candidate.nutrients.set(Nutrient::Sugars, 8.96);

    let ranked = ranker().rank(
        &target,
        &empty_profile(),
        vec![record(candidate, CandidateSource::Category)],
        5,
        0.0,
    );

    assert_eq!(ranked.len(), 1);
    let reasons: Vec<&str> = ranked[0]
        .improvement_reasons
        .iter()
        .map(|improvement| improvement.message.as_str())
        .collect();
    assert_eq!(reasons, vec!["20% less sugar"]);
}

#[test]
fn ninety_percent_calories_and_boosted_fiber_count_at_the_boundary() {
    let mut target = cereal();
    target.nutrients.set(Nutrient::EnergyKcal, 411.3);
    target.nutrients.set(Nutrient::Fiber, 3.1);
    let mut candidate = cereal_variant("3017620422012", 1.0);
    candidate.nutrients.set(Nutrient::EnergyKcal, 370.17);
    candidate.nutrients.set(Nutrient::Fiber, 3.72);

    let ranked = ranker().rank(
        &target,
        &empty_profile(),
        vec![record(candidate, CandidateSource::Category)],
        5,
        0.0,
    );

    assert_eq!(ranked.len(), 1);
    let kinds: Vec<ImprovementKind> = ranked[0]
        .improvement_reasons
        .iter()
        .map(|improvement| improvement.kind)
        .collect();
    assert!(kinds.contains(&ImprovementKind::FewerCalories));
    assert!(kinds.contains(&ImprovementKind::MoreFiber));
}

#[test]
fn candidates_without_improvements_do_not_qualify() {
    let target = cereal();
    let twin = cereal_variant("3017620422099", 1.0);

    let ranked = ranker().rank(
        &target,
        &empty_profile(),
        vec![record(twin, CandidateSource::Category)],
        5,
        0.0,
    );

    assert!(ranked.is_empty());
}

#[test]
fn ranking_never_returns_the_target_and_respects_limit() {
    let target = cereal();
    let mut renamed_target = cereal();
    renamed_target.name = "CHOCO CRUNCH CEREAL".to_string();

    let candidates = vec![
        record(renamed_target, CandidateSource::Brand),
        record(cereal_variant("3017620422010", 0.8), CandidateSource::Category),
        record(oat_flakes(), CandidateSource::Dietary),
        record(granola_bar(), CandidateSource::Brand),
    ];

    let ranked = ranker().rank(&target, &empty_profile(), candidates.clone(), 10, 0.0);
    assert!(ranked.iter().all(|candidate| candidate.product.code != target.code));
    assert_eq!(ranked.len(), 3);

    let limited = ranker().rank(&target, &empty_profile(), candidates, 2, 0.0);
    assert_eq!(limited.len(), 2);
}

#[test]
fn ranking_is_ordered_by_final_score() {
    let target = cereal();
    let ranked = ranker().rank(
        &target,
        &empty_profile(),
        vec![
            record(cereal_variant("3017620422010", 0.8), CandidateSource::Category),
            record(oat_flakes(), CandidateSource::Category),
            record(granola_bar(), CandidateSource::Brand),
        ],
        3,
        0.0,
    );

    let scores: Vec<f64> = ranked.iter().map(|candidate| candidate.final_score).collect();
    assert!(scores.windows(2).all(|pair| pair[0] >= pair[1]));
    assert_eq!(ranked[0].product.code, oat_flakes().code);
}

#[test]
fn min_score_filters_on_final_score() {
    let ranked = ranker().rank(
        &cereal(),
        &empty_profile(),
        vec![record(oat_flakes(), CandidateSource::Category)],
        5,
        10_000.0,
    );

    assert!(ranked.is_empty());
}

#[test]
fn duplicates_keep_the_highest_weighted_source() {
    let target = cereal();
    let merged = dedupe_candidates(
        &target,
        vec![
            record(target.clone(), CandidateSource::Category),
            record(oat_flakes(), CandidateSource::Brand),
            record(oat_flakes(), CandidateSource::Health),
            record(oat_flakes(), CandidateSource::Category),
        ],
        &SourceWeights::default(),
    );

    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].source, CandidateSource::Health);
}

#[test]
fn blank_codes_deduplicate_by_name() {
    let target = cereal();
    let mut first = oat_flakes();
    first.code.0 = String::new();
    let mut second = oat_flakes();
    second.code.0 = String::new();
    second.name = "plain oat flakes".to_string();

    let merged = dedupe_candidates(
        &target,
        vec![
            record(first, CandidateSource::Category),
            record(second, CandidateSource::Dietary),
        ],
        &SourceWeights::default(),
    );

    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].source, CandidateSource::Dietary);
}

#[test]
fn dietary_label_and_condition_bonuses_raise_profile_score() {
    let target = cereal();
    let profile = profile(Vec::new(), vec!["diabetes_type_2"], vec!["vegan"]);

    let ranked = ranker().rank(
        &target,
        &profile,
        vec![record(oat_flakes(), CandidateSource::Health)],
        5,
        0.0,
    );

    // vegan label +10, sugar under 5 for diabetes +15
    assert_eq!(ranked[0].breakdown.profile_bonus, 25.0);
}

#[test]
fn similarity_is_bounded() {
    let identical = SimilarityScorer::similarity(&cereal(), &cereal());
    assert!((identical - 1.0).abs() < 1e-9);

    let distant = SimilarityScorer::similarity(&cereal(), &granola_bar());
    assert!(distant > 0.0 && distant < 1.0);
}

fn retriever<C>(catalog: C, timeout_ms: u64) -> CandidateRetriever<C>
where
    C: crate::compatibility::ProductCatalog,
{
    CandidateRetriever::new(
        Arc::new(catalog),
        restrictions(),
        RetrievalConfig {
            strategy_timeout_ms: timeout_ms,
            ..RetrievalConfig::default()
        },
    )
}

#[tokio::test]
async fn retrieval_runs_every_applicable_strategy() {
    let retriever = retriever(MemoryCatalog::new(catalog_products()), 1_000);
    let profile = profile(Vec::new(), vec!["diabetes_type_2"], vec!["vegan"]);
    let target = cereal();

    let pool = retriever.retrieve(&target, &profile).await;

    assert!(pool.iter().all(|candidate| !candidate.product.same_product(&target)));
    for source in [
        CandidateSource::Category,
        CandidateSource::Brand,
        CandidateSource::Dietary,
        CandidateSource::Health,
    ] {
        assert!(
            pool.iter().any(|candidate| candidate.source == source),
            "missing {source:?}"
        );
    }
    assert!(pool
        .iter()
        .filter(|candidate| candidate.source == CandidateSource::Health)
        .all(|candidate| candidate.product.code == oat_flakes().code));
}

#[tokio::test]
async fn empty_profile_skips_dietary_and_health_strategies() {
    let retriever = retriever(MemoryCatalog::new(catalog_products()), 1_000);

    let pool = retriever.retrieve(&cereal(), &empty_profile()).await;

    assert!(!pool.is_empty());
    assert!(pool.iter().all(|candidate| matches!(
        candidate.source,
        CandidateSource::Category | CandidateSource::Brand
    )));
}

#[tokio::test]
async fn failing_catalog_yields_no_candidates() {
    let retriever = retriever(UnavailableCatalog, 1_000);
    let profile = profile(Vec::new(), vec!["hypertension"], vec!["vegan"]);

    assert!(retriever.retrieve(&cereal(), &profile).await.is_empty());
}

#[tokio::test]
async fn slow_strategies_time_out_without_losing_fast_ones() {
    let catalog = SlowCatalog {
        inner: MemoryCatalog::new(catalog_products()),
        delay: Duration::from_secs(5),
    };
    let retriever = retriever(catalog, 50);

    let pool = retriever.retrieve(&cereal(), &empty_profile()).await;

    assert!(!pool.is_empty());
    assert!(pool
        .iter()
        .all(|candidate| candidate.source == CandidateSource::Brand));
}

#[tokio::test]
async fn category_strategy_ranks_the_whole_category_before_truncating() {
    let products: Vec<ProductRecord> = [28.0, 27.0, 26.0, 1.0]
        .into_iter()
        .enumerate()
        .map(|(index, sugars)| {
            let mut product = cereal_variant(&format!("301762042210{}", index + 1), 1.0);
            product.brand = format!("Mill {index}");
            product.nutrients.set(Nutrient::Sugars, sugars);
            product
        })
        .collect();
    let retriever = CandidateRetriever::new(
        Arc::new(MemoryCatalog::new(products)),
        restrictions(),
        RetrievalConfig {
            per_strategy_limit: 1,
            ..RetrievalConfig::default()
        },
    );

    let pool = retriever.retrieve(&cereal(), &empty_profile()).await;
    let category: Vec<&str> = pool
        .iter()
        .filter(|candidate| candidate.source == CandidateSource::Category)
        .map(|candidate| candidate.product.code.as_str())
        .collect();

    assert_eq!(category, vec!["3017620422104"]);
}
