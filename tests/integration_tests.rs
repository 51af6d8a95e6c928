use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

use tally::analyzers::confidence::{self, WarningCode};
use tally::analyzers::{distribution, segment};
use tally::config::Config;
use tally::core::{AnalysisContext, Analyzer};
use tally::model::{load_responses, load_survey, load_versions, Response, Survey};
use tally::report::build_report;
use tally::score::band::{CRITICAL, DEVELOPING, EFFECTIVE, HIGHLY_EFFECTIVE, NEEDS_IMPROVEMENT};
use tally::score::trend::{self, OverallTrend};

fn tally() -> Command {
    Command::cargo_bin("tally").expect("binary exists")
}

fn fixtures_dir() -> &'static str {
    concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures")
}

fn fixture(name: &str) -> String {
    format!("{}/{}", fixtures_dir(), name)
}

fn golden() -> (Survey, Vec<Response>) {
    (
        load_survey(fixture("survey.json")).unwrap(),
        load_responses(fixture("responses.json")).unwrap(),
    )
}

fn with_inputs(cmd: &mut Command) -> &mut Command {
    cmd.args([
        "-s",
        fixture("survey.json").as_str(),
        "-r",
        fixture("responses.json").as_str(),
        "--versions",
        fixture("versions.json").as_str(),
    ])
}

fn json_stdout(cmd: &mut Command) -> Value {
    let output = cmd.output().unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    serde_json::from_slice(&output.stdout).unwrap()
}

// ---------------------------------------------------------------------------
// Golden fixture: 2 managers x 5 responses x 5 categories
// ---------------------------------------------------------------------------

#[test]
fn test_golden_every_response_scored() {
    let (survey, responses) = golden();
    let config = Config::default();
    let ctx = AnalysisContext::new(&survey, &responses, &config);
    let sets = ctx.score_sets().unwrap();
    assert_eq!(sets.len(), 10);
    for set in sets {
        let set = set.as_ref().unwrap();
        assert_eq!(set.categories.len(), 5);
    }
}

#[test]
fn test_golden_reverse_scored_category() {
    let (survey, responses) = golden();
    let config = Config::default();
    let ctx = AnalysisContext::new(&survey, &responses, &config);
    let alice = ctx.scored().unwrap().find(|s| s.response_id == "alice-1").unwrap();
    // "Disagree" twice on burnout questions scores high.
    assert_eq!(alice.score("wellbeing"), Some(80.0));
    assert_eq!(alice.score("engagement"), Some(100.0));
    assert_eq!(alice.overall_score, Some(90.0));
    assert_eq!(alice.overall_band.as_ref().unwrap().id, HIGHLY_EFFECTIVE);
}

#[test]
fn test_golden_manager_averages() {
    let (survey, responses) = golden();
    let config = Config::default();
    let ctx = AnalysisContext::new(&survey, &responses, &config);
    let analysis = segment::Analyzer::new().analyze(&ctx).unwrap();

    assert_eq!(analysis.segments.len(), 2);
    let alice = analysis.segments.iter().find(|s| s.key == "m-alice").unwrap();
    let bob = analysis.segments.iter().find(|s| s.key == "m-bob").unwrap();

    assert_eq!(alice.label.as_deref(), Some("Alice"));
    assert_eq!(alice.respondent_count, 5);
    assert!((alice.avg_score.unwrap() - 89.6).abs() < 1e-9);
    assert_eq!(alice.avg_score.unwrap().round(), 90.0);
    assert_eq!(alice.avg_score_display, Some(89.6));
    assert_eq!(alice.completion_rate, Some(100.0));

    assert!((bob.avg_score.unwrap() - 49.2).abs() < 1e-9);
    assert_eq!(bob.avg_score.unwrap().round(), 49.0);
    assert_eq!(bob.band_distribution.count(DEVELOPING), 1);
    assert_eq!(bob.band_distribution.count(NEEDS_IMPROVEMENT), 4);
}

#[test]
fn test_golden_band_distribution() {
    let (survey, responses) = golden();
    let config = Config::default();
    let ctx = AnalysisContext::new(&survey, &responses, &config);
    let analysis = distribution::Analyzer::new().analyze(&ctx).unwrap();
    let bands = &analysis.band_distribution;

    assert_eq!(bands.count(HIGHLY_EFFECTIVE), 5);
    assert_eq!(bands.count(NEEDS_IMPROVEMENT), 4);
    assert_eq!(bands.count(DEVELOPING), 1);
    assert_eq!(bands.count(EFFECTIVE), 0);
    assert_eq!(bands.count(CRITICAL), 0);
    assert_eq!(bands.total, 10);
    let ids: Vec<&str> = bands.bands.iter().map(|b| b.id.as_str()).collect();
    assert_eq!(
        ids,
        vec![CRITICAL, NEEDS_IMPROVEMENT, DEVELOPING, EFFECTIVE, HIGHLY_EFFECTIVE]
    );
    let percent_sum: f64 = bands.bands.iter().map(|b| b.percentage).sum();
    assert_eq!(percent_sum, 100.0);
}

#[test]
fn test_golden_histogram() {
    let (survey, responses) = golden();
    let config = Config::default();
    let ctx = AnalysisContext::new(&survey, &responses, &config);
    let analysis = distribution::Analyzer::new().analyze(&ctx).unwrap();
    let counts: Vec<usize> = analysis.distribution.buckets.iter().map(|b| b.count).collect();
    assert_eq!(counts, vec![0, 0, 5, 0, 5]);

    let stats = analysis.distribution.statistics.unwrap();
    assert_eq!(stats.min, 46.0);
    assert_eq!(stats.max, 90.0);
    assert!((stats.mean - 69.4).abs() < 1e-9);
    assert_eq!(stats.median, 72.0);
}

#[test]
fn test_golden_trend() {
    let survey = load_survey(fixture("survey.json")).unwrap();
    let versions = load_versions(fixture("versions.json")).unwrap();
    let analysis = trend::analyze_trend(&survey, &versions, &Config::default()).unwrap();

    let ids: Vec<&str> = analysis.summary.trends.iter().map(|p| p.version_id.as_str()).collect();
    assert_eq!(ids, vec!["v1", "v2"]);
    assert!((analysis.summary.start_score.unwrap() - 49.2).abs() < 1e-9);
    assert!((analysis.summary.end_score.unwrap() - 89.6).abs() < 1e-9);

    let comparison = analysis.comparison.unwrap();
    assert_eq!(comparison.before_version, "v1");
    assert_eq!(comparison.after_version, "v2");
    assert_eq!(comparison.summary.improved, 5);
    assert_eq!(comparison.summary.overall, OverallTrend::Positive);
    let engagement = comparison
        .per_category
        .iter()
        .find(|c| c.category_id == "engagement")
        .unwrap();
    assert_eq!(engagement.before, Some(52.0));
    assert_eq!(engagement.after, Some(100.0));
}

#[test]
fn test_golden_report_has_no_warnings() {
    let (survey, responses) = golden();
    let config = Config::default();
    let ctx = AnalysisContext::new(&survey, &responses, &config);
    let report = build_report(&ctx, None).unwrap();
    assert!(report.warnings.is_empty(), "{:?}", report.warnings);
    assert_eq!(report.category_distributions.len(), 5);
}

#[test]
fn test_disabled_scoring_warns_instead_of_failing() {
    let (mut survey, responses) = golden();
    survey.score_config.enabled = false;
    let config = Config::default();
    let ctx = AnalysisContext::new(&survey, &responses, &config);

    assert!(ctx.score_sets().unwrap().iter().all(Option::is_none));
    let analysis = distribution::Analyzer::new().analyze(&ctx).unwrap();
    assert!(analysis.distribution.is_empty);
    assert!(analysis.band_distribution.is_empty);

    let checked = confidence::Analyzer::new().analyze(&ctx).unwrap();
    assert!(checked
        .warnings
        .iter()
        .any(|w| w.code == WarningCode::ScoringDisabled));
}

// ---------------------------------------------------------------------------
// CLI smoke tests
// ---------------------------------------------------------------------------

#[test]
fn test_help_output() {
    tally()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("scoring and analytics"));
}

#[test]
fn test_scores_json_output() {
    let json = json_stdout(with_inputs(&mut tally()).args(["-f", "json", "scores"]));
    assert_eq!(json["summary"]["totalResponses"], 10);
    assert_eq!(json["summary"]["scoredResponses"], 10);
    assert_eq!(json["responses"][0]["overallScore"], 90.0);
}

#[test]
fn test_segments_command() {
    let json = json_stdout(with_inputs(&mut tally()).args(["-f", "json", "segments"]));
    assert_eq!(json["keyField"], "managerId");
    let segments = json["segments"].as_array().unwrap();
    assert_eq!(segments.len(), 2);
    assert_eq!(segments[0]["key"], "m-alice");
    assert_eq!(segments[0]["avgScoreDisplay"], 89.6);
    assert_eq!(segments[1]["avgScoreDisplay"], 49.2);
}

#[test]
fn test_segments_by_missing_field_is_unassigned() {
    let json = json_stdout(with_inputs(&mut tally()).args(["-f", "json", "segments", "--by", "teamId"]));
    let segments = json["segments"].as_array().unwrap();
    assert_eq!(segments.len(), 1);
    assert_eq!(segments[0]["key"], "unassigned");
    assert_eq!(segments[0]["unassigned"], true);
    assert_eq!(segments[0]["respondentCount"], 10);
}

#[test]
fn test_bands_command() {
    let json = json_stdout(with_inputs(&mut tally()).args(["-f", "json", "bands"]));
    assert_eq!(json["total"], 10);
    assert_eq!(json["bands"][4]["id"], "highly-effective");
    assert_eq!(json["bands"][4]["count"], 5);
}

#[test]
fn test_distribution_category() {
    let json = json_stdout(with_inputs(&mut tally()).args(["-f", "json", "distribution", "--category", "wellbeing"]));
    assert_eq!(json["scope"], "wellbeing");
    assert_eq!(json["distribution"]["total"], 10);
    assert_eq!(json["distribution"]["isEmpty"], false);
}

#[test]
fn test_distribution_unknown_category_fails() {
    with_inputs(&mut tally())
        .args(["distribution", "--category", "morale"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown category: morale"));
}

#[test]
fn test_trend_command() {
    let json = json_stdout(with_inputs(&mut tally()).args(["-f", "json", "trend"]));
    assert_eq!(json["summary"]["hasMultipleVersions"], true);
    assert_eq!(json["comparison"]["summary"]["overall"], "positive");
}

#[test]
fn test_compare_reversed_versions() {
    let json = json_stdout(with_inputs(&mut tally()).args(["-f", "json", "compare", "--before", "v2", "--after", "v1"]));
    assert_eq!(json["beforeVersion"], "v2");
    assert_eq!(json["summary"]["declined"], 5);
    assert_eq!(json["summary"]["overall"], "negative");
}

#[test]
fn test_compare_unknown_version_fails() {
    with_inputs(&mut tally())
        .args(["compare", "--before", "v9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown version: v9"));
}

#[test]
fn test_compare_epsilon_from_config() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("tally.toml");
    std::fs::write(&config, "[trend]\nepsilon = 100.0\n").unwrap();

    let json = json_stdout(
        with_inputs(&mut tally()).args(["-c", config.to_str().unwrap(), "-f", "json", "compare"]),
    );
    assert_eq!(json["summary"]["stable"], 5);
    assert_eq!(json["summary"]["overall"], "stable");
}

#[test]
fn test_check_reports_single_version() {
    let dir = TempDir::new().unwrap();
    let versions = dir.path().join("versions.json");
    std::fs::write(&versions, "[]").unwrap();

    let json = json_stdout(tally().args([
        "-s",
        fixture("survey.json").as_str(),
        "-r",
        fixture("responses.json").as_str(),
        "--versions",
        versions.to_str().unwrap(),
        "-f",
        "json",
        "check",
        "--trend",
    ]));
    assert_eq!(json["errors"], 0);
    assert_eq!(json["warnings"][0]["code"], "single-version");
}

#[test]
fn test_check_empty_responses() {
    let dir = TempDir::new().unwrap();
    let responses = dir.path().join("responses.json");
    std::fs::write(&responses, "[]").unwrap();

    let json = json_stdout(tally().args([
        "-s",
        fixture("survey.json").as_str(),
        "-r",
        responses.to_str().unwrap(),
        "-f",
        "json",
        "check",
    ]));
    assert_eq!(json["warnings"][0]["code"], "no-responses");
}

#[test]
fn test_misconfigured_survey_fails() {
    let dir = TempDir::new().unwrap();
    let survey = dir.path().join("survey.json");
    std::fs::write(
        &survey,
        r#"{"id": "s1", "scoreConfig": {"enabled": true, "categories": [{"id": "a", "name": "A"}, {"id": "a", "name": "A"}]}}"#,
    )
    .unwrap();

    tally()
        .args(["-s", survey.to_str().unwrap(), "-r", fixture("responses.json").as_str(), "scores"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Scoring misconfigured"));
}

#[test]
fn test_disabled_scoring_warns_on_stderr() {
    let dir = TempDir::new().unwrap();
    let survey = dir.path().join("survey.json");
    std::fs::write(&survey, r#"{"id": "s1", "scoreConfig": {"enabled": false}}"#).unwrap();

    tally()
        .args(["-s", survey.to_str().unwrap(), "-r", fixture("responses.json").as_str(), "-f", "json", "scores"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Scoring is disabled"))
        .stdout(predicate::str::contains("\"scoringEnabled\": false"));
}

#[test]
fn test_missing_survey_flag_fails() {
    tally()
        .arg("scores")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--survey"));
}

#[test]
fn test_missing_file_fails() {
    tally()
        .args(["-s", "/nonexistent/survey.json", "-r", "/nonexistent/r.json", "scores"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("File not found"));
}

#[test]
fn test_report_markdown() {
    with_inputs(&mut tally())
        .args(["-f", "markdown", "report"])
        .assert()
        .success()
        .stdout(predicate::str::contains("# Category Distributions"))
        .stdout(predicate::str::contains("m-alice"));
}

#[test]
fn test_report_json_includes_trend() {
    let json = json_stdout(with_inputs(&mut tally()).args(["-f", "json", "report"]));
    assert_eq!(json["surveyId"], "survey-golden");
    assert!(json["trend"]["comparison"].is_object());
    assert_eq!(json["warnings"].as_array().unwrap().len(), 0);
}

#[test]
fn test_config_command() {
    tally()
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("[segments]"))
        .stdout(predicate::str::contains("key_field = \"managerId\""));
}

#[test]
fn test_config_default_command() {
    tally()
        .args(["config", "--default"])
        .assert()
        .success()
        .stdout(predicate::str::contains("TALLY_"));
}

#[test]
fn test_config_file_not_found() {
    tally()
        .args(["-c", "/nonexistent/tally.toml", "config"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config file not found"));
}
