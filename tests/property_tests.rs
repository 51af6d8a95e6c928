use std::collections::BTreeMap;

use proptest::prelude::*;

use tally::analyzers::distribution::{allocate_percentages, DistributionAggregator};
use tally::analyzers::segment::{SegmentAggregator, SegmentInput};
use tally::model::{Answer, Question, QuestionType, ScoreCategory, ScoreConfig, ScoreRange};
use tally::score::band::{self, BandTable};
use tally::score::compute;

const LABELS: [&str; 6] = [
    "Strongly Disagree",
    "Disagree",
    "Neutral",
    "Agree",
    "Strongly Agree",
    "Not a label",
];

/// Contiguous ranges over [0, 100] split at the given interior floors.
fn ranges_from_floors(mut floors: Vec<u8>) -> Vec<ScoreRange> {
    floors.retain(|f| (1..=100).contains(f));
    floors.sort_unstable();
    floors.dedup();

    let mut starts = vec![0.0];
    starts.extend(floors.iter().map(|f| f64::from(*f)));
    starts
        .iter()
        .enumerate()
        .map(|(i, &min)| {
            let max = starts.get(i + 1).map(|next| next - 1.0).unwrap_or(100.0);
            ScoreRange::new(format!("band-{i}"), min, max, format!("Band {i}"))
        })
        .collect()
}

fn survey_questions() -> Vec<Question> {
    let agreement = [
        ("Strongly Disagree", 1.0),
        ("Disagree", 2.0),
        ("Neutral", 3.0),
        ("Agree", 4.0),
        ("Strongly Agree", 5.0),
    ];
    let reversed = agreement.map(|(label, points)| (label, 6.0 - points));
    vec![
        Question::new("q1", QuestionType::Likert).scored("engagement", agreement),
        Question::new("q2", QuestionType::Likert).scored("engagement", agreement).with_weight(2.0),
        Question::new("q3", QuestionType::Likert).scored("wellbeing", reversed),
        Question::new("q4", QuestionType::Checkbox).scored("growth", agreement),
    ]
}

fn score_config(enabled: bool) -> ScoreConfig {
    ScoreConfig {
        enabled,
        categories: vec![
            ScoreCategory::new("engagement", "Engagement"),
            ScoreCategory::new("wellbeing", "Wellbeing"),
            ScoreCategory::new("growth", "Growth"),
        ],
        score_ranges: BandTable::canonical().ranges().to_vec(),
    }
}

fn answer_strategy() -> impl Strategy<Value = Answer> {
    prop_oneof![
        prop::sample::select(LABELS.to_vec()).prop_map(Answer::from),
        prop::collection::vec(prop::sample::select(LABELS.to_vec()), 0..4).prop_map(Answer::from),
    ]
}

fn answers_strategy() -> impl Strategy<Value = BTreeMap<String, Answer>> {
    prop::collection::btree_map(
        prop::sample::select(vec!["q1", "q2", "q3", "q4", "q5"]).prop_map(str::to_string),
        answer_strategy(),
        0..5,
    )
}

// ---------------------------------------------------------------------------
// Band resolution
// ---------------------------------------------------------------------------

proptest! {
    /// Every integer score in [0, 100] lands in exactly one band of a contiguous set.
    #[test]
    fn contiguous_bands_cover_every_score(floors in prop::collection::vec(1u8..=100, 0..8)) {
        let ranges = ranges_from_floors(floors);
        prop_assert!(band::check_coverage(&ranges).is_ok());

        for score in 0..=100 {
            let score = f64::from(score);
            let matching = ranges.iter().filter(|r| r.contains(score)).count();
            prop_assert_eq!(matching, 1, "score {} matched {} bands", score, matching);
            prop_assert!(band::resolve(score, &ranges).is_some());
        }
    }

    /// The canonical index agrees with resolving against the canonical table.
    #[test]
    fn canonical_index_matches_table(score in 0u8..=100) {
        let score = f64::from(score);
        let table = BandTable::canonical();
        let by_table = table.ranges().iter().position(|r| r.contains(score));
        prop_assert_eq!(band::canonical_index(score), by_table);
    }
}

// ---------------------------------------------------------------------------
// Distribution aggregation
// ---------------------------------------------------------------------------

proptest! {
    /// Histogram counts always sum to the number of scores.
    #[test]
    fn histogram_counts_sum_to_total(scores in prop::collection::vec(-20.0f64..120.0, 1..200)) {
        let dist = DistributionAggregator::default().aggregate(&scores);
        prop_assert!(!dist.is_empty);
        let counted: usize = dist.buckets.iter().map(|b| b.count).sum();
        prop_assert_eq!(counted, scores.len());
        prop_assert_eq!(dist.total, scores.len());
    }

    /// Band counts plus unresolved scores account for every score.
    #[test]
    fn band_counts_sum_to_resolvable(scores in prop::collection::vec(-20.0f64..120.0, 1..200)) {
        let bands = DistributionAggregator::default().aggregate_bands(&scores);
        let counted: usize = bands.bands.iter().map(|b| b.count).sum();
        prop_assert_eq!(counted, bands.total);
        prop_assert_eq!(bands.total + bands.unresolved, scores.len());
    }

    /// Non-zero counts always allocate exactly 100 percent.
    #[test]
    fn percentages_sum_to_100(counts in prop::collection::vec(0usize..1000, 1..10)) {
        prop_assume!(counts.iter().any(|c| *c > 0));
        let percentages = allocate_percentages(&counts);
        let sum: f64 = percentages.iter().sum();
        prop_assert_eq!(sum, 100.0);
        for (count, pct) in counts.iter().zip(&percentages) {
            if *count == 0 {
                prop_assert_eq!(*pct, 0.0);
            }
        }
    }

    /// Statistics stay within the observed range.
    #[test]
    fn statistics_are_bounded(scores in prop::collection::vec(0.0f64..=100.0, 1..100)) {
        let dist = DistributionAggregator::default().aggregate(&scores);
        let stats = dist.statistics.unwrap();
        prop_assert!(stats.min <= stats.median && stats.median <= stats.max);
        prop_assert!(stats.min <= stats.mean + 1e-9 && stats.mean <= stats.max + 1e-9);
        prop_assert_eq!(stats.std_dev.is_some(), scores.len() > 1);
    }
}

// ---------------------------------------------------------------------------
// Category scoring
// ---------------------------------------------------------------------------

proptest! {
    /// `compute` yields no score set exactly when scoring is disabled.
    #[test]
    fn compute_none_iff_disabled(answers in answers_strategy(), enabled in any::<bool>()) {
        let result = compute(&survey_questions(), &answers, &score_config(enabled)).unwrap();
        prop_assert_eq!(result.is_none(), !enabled);
    }

    /// Normalized scores stay in [0, 100], and unanswered categories are absent.
    #[test]
    fn normalized_scores_bounded(answers in answers_strategy()) {
        let questions = survey_questions();
        let set = compute(&questions, &answers, &score_config(true)).unwrap().unwrap();
        for (id, score) in &set.categories {
            prop_assert!((0.0..=100.0).contains(&score.normalized_score));
            prop_assert!(score.max_score > 0.0);
            let answered = questions
                .iter()
                .filter(|q| q.category() == Some(id.as_str()))
                .any(|q| answers.contains_key(&q.id));
            prop_assert!(answered, "category {} scored without answers", id);
        }
        if let Some(overall) = set.overall_score {
            prop_assert!((0.0..=100.0).contains(&overall));
        }
        prop_assert_eq!(set.overall_score.is_none(), set.categories.is_empty());
    }
}

// ---------------------------------------------------------------------------
// Segment aggregation
// ---------------------------------------------------------------------------

proptest! {
    /// Every input is counted in exactly one segment.
    #[test]
    fn segments_partition_inputs(
        inputs in prop::collection::vec(
            (
                prop::option::of(prop::sample::select(vec!["m-1", "m-2", "m-3", ""])),
                prop::option::of(0.0f64..=100.0),
            ),
            0..50,
        )
    ) {
        let inputs: Vec<SegmentInput> = inputs
            .into_iter()
            .map(|(key, score)| SegmentInput {
                segment_key: key.map(str::to_string),
                segment_label: None,
                overall_score: score,
                completion_pct: None,
            })
            .collect();
        let segments = SegmentAggregator::default().aggregate(&inputs);
        let total: usize = segments.values().map(|s| s.respondent_count).sum();
        prop_assert_eq!(total, inputs.len());
        for summary in segments.values() {
            prop_assert!(summary.scored_count <= summary.respondent_count);
            prop_assert_eq!(summary.avg_score.is_some(), summary.scored_count > 0);
        }
    }
}
