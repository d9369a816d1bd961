use chrono::{SecondsFormat, Utc};
use clap::Parser;
use fire_rescue::config::GameConfig;
use fire_rescue::constants::{ACTION_POINTS_PER_TURN, MAX_RESCUERS, TOTAL_POI_COUNT};
use fire_rescue::engine::GameEngine;
use fire_rescue::types::{Cell, GameEvent, Outcome, PoiKind, Role};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

const DEFAULT_GAMES: usize = 5;
const DEFAULT_MAX_STEPS: u64 = 2_000;

/// Plays seeded fire-rescue games headlessly and checks engine invariants.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    games: Option<usize>,
    #[arg(long)]
    max_steps: Option<u64>,
    /// JSON board layout; the built-in house when omitted.
    #[arg(long)]
    layout: Option<PathBuf>,
    #[arg(long)]
    match_id: Option<String>,
    #[arg(long)]
    summary_out: Option<PathBuf>,
}

#[derive(Clone, Debug, Serialize)]
struct Scenario {
    name: String,
    seed: u32,
    #[serde(rename = "maxSteps")]
    max_steps: u64,
}

#[derive(Clone, Debug, Default, Serialize)]
struct GameResultLine {
    scenario: String,
    seed: u32,
    outcome: String,
    reason: String,
    steps: u64,
    rounds: u64,
    rescued: usize,
    lost: usize,
    #[serde(rename = "damageCount")]
    damage_count: u32,
    explosions: u32,
    knockouts: u32,
    #[serde(rename = "doorsOpened")]
    doors_opened: u32,
    #[serde(rename = "falseAlarms")]
    false_alarms: u32,
    anomalies: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
struct AnomalyRecord {
    step: u64,
    message: String,
}

#[derive(Clone, Debug, Serialize)]
struct ScenarioRunResult {
    #[serde(flatten)]
    result: GameResultLine,
    #[serde(rename = "anomalyRecords")]
    anomaly_records: Vec<AnomalyRecord>,
}

#[derive(Clone, Debug, Serialize)]
struct RunSummary {
    #[serde(rename = "matchId")]
    match_id: String,
    #[serde(rename = "startedAt")]
    started_at: String,
    #[serde(rename = "startedAtMs")]
    started_at_ms: u64,
    #[serde(rename = "finishedAtMs")]
    finished_at_ms: u64,
    #[serde(rename = "gameCount")]
    game_count: usize,
    #[serde(rename = "anomalyCount")]
    anomaly_count: usize,
    #[serde(rename = "averageSteps")]
    average_steps: u64,
    #[serde(rename = "outcomeCounts")]
    outcome_counts: BTreeMap<String, usize>,
    games: Vec<GameResultLine>,
}

#[derive(Clone, Debug, Serialize)]
struct StructuredLogLine {
    #[serde(rename = "timestampMs")]
    timestamp_ms: u64,
    level: String,
    event: String,
    #[serde(rename = "matchId")]
    match_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    scenario: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    step: Option<u64>,
    details: Value,
}

fn main() {
    let cli = Cli::parse();
    let scenarios = resolve_scenarios(&cli);
    let run_started_at_ms = now_ms();
    let started_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    let seed_hint = scenarios.first().map(|scenario| scenario.seed).unwrap_or(0);
    let match_id = cli
        .match_id
        .clone()
        .unwrap_or_else(|| default_match_id(seed_hint, run_started_at_ms));

    let config = match GameConfig::load_or_default(cli.layout.as_deref()) {
        Ok(config) => config,
        Err(error) => {
            emit_log(
                "error",
                "layout_load_failed",
                &match_id,
                None,
                None,
                None,
                json!({ "error": error.to_string() }),
            );
            std::process::exit(2);
        }
    };

    let mut has_anomaly = false;
    let mut game_results = Vec::new();
    let mut outcome_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut total_steps = 0u64;
    let mut total_anomalies = 0usize;

    for scenario in scenarios {
        emit_log(
            "info",
            "game_started",
            &match_id,
            Some(&scenario.name),
            Some(scenario.seed),
            None,
            json!({ "maxSteps": scenario.max_steps }),
        );
        let run = run_scenario(&config, &scenario);

        for anomaly in &run.anomaly_records {
            emit_log(
                "warn",
                "anomaly_detected",
                &match_id,
                Some(&scenario.name),
                Some(scenario.seed),
                Some(anomaly.step),
                json!({ "message": anomaly.message }),
            );
        }

        if !run.result.anomalies.is_empty() {
            has_anomaly = true;
        }
        total_anomalies += run.anomaly_records.len();
        total_steps += run.result.steps;
        *outcome_counts.entry(run.result.outcome.clone()).or_insert(0) += 1;

        emit_log(
            "info",
            "game_finished",
            &match_id,
            Some(&scenario.name),
            Some(scenario.seed),
            Some(run.result.steps),
            json!({
                "outcome": run.result.outcome,
                "reason": run.result.reason,
                "rescued": run.result.rescued,
                "lost": run.result.lost,
                "damageCount": run.result.damage_count,
                "anomalyCount": run.anomaly_records.len(),
            }),
        );

        match serde_json::to_string(&run.result) {
            Ok(line) => println!("{line}"),
            Err(error) => emit_log(
                "error",
                "result_serialize_failed",
                &match_id,
                Some(&scenario.name),
                Some(scenario.seed),
                None,
                json!({ "error": error.to_string() }),
            ),
        }
        game_results.push(run.result);
    }

    let summary = build_run_summary(
        match_id.clone(),
        started_at,
        run_started_at_ms,
        now_ms(),
        game_results,
        outcome_counts,
        total_anomalies,
        total_steps,
    );

    let mut summary_out_written: Option<String> = None;
    if let Some(path) = cli.summary_out.as_ref() {
        if let Err(error) = write_summary(path, &summary) {
            emit_log(
                "error",
                "summary_write_failed",
                &match_id,
                None,
                None,
                None,
                json!({
                    "path": path.to_string_lossy(),
                    "error": error.to_string(),
                }),
            );
            std::process::exit(2);
        }
        summary_out_written = Some(path.to_string_lossy().to_string());
    }

    emit_log(
        "info",
        "run_finished",
        &match_id,
        None,
        None,
        None,
        json!({
            "gameCount": summary.game_count,
            "anomalyCount": summary.anomaly_count,
            "averageSteps": summary.average_steps,
            "outcomeCounts": summary.outcome_counts,
            "summaryOut": summary_out_written,
        }),
    );

    if has_anomaly {
        std::process::exit(1);
    }
}

fn run_scenario(config: &GameConfig, scenario: &Scenario) -> ScenarioRunResult {
    let mut engine = GameEngine::new(config.clone(), scenario.seed);
    engine.drain_events();

    let mut result = GameResultLine {
        scenario: scenario.name.clone(),
        seed: scenario.seed,
        ..GameResultLine::default()
    };
    let mut anomaly_records = Vec::new();
    let mut anomaly_seen = HashSet::new();
    let mut last_damage = 0u32;

    for _ in 0..scenario.max_steps {
        let was_over = engine.is_over();
        let report = engine.step();
        let step = engine.step_count();

        if was_over && report.advanced {
            push_anomaly(
                &mut result.anomalies,
                &mut anomaly_records,
                &mut anomaly_seen,
                step,
                "step advanced after game over".to_string(),
            );
        }

        for event in &report.events {
            match event {
                GameEvent::Explosion { .. } => result.explosions += 1,
                GameEvent::KnockedOut { .. } => result.knockouts += 1,
                GameEvent::DoorOpened { .. } => result.doors_opened += 1,
                GameEvent::PoiRevealed {
                    kind: PoiKind::FalseAlarm,
                    ..
                } => result.false_alarms += 1,
                _ => {}
            }
        }

        for message in collect_engine_anomalies(&engine, last_damage) {
            push_anomaly(
                &mut result.anomalies,
                &mut anomaly_records,
                &mut anomaly_seen,
                step,
                message,
            );
        }
        last_damage = engine.damage_count();

        if engine.is_over() {
            break;
        }
    }

    let state = engine.game_state();
    result.outcome = outcome_key(state.outcome);
    result.reason = state.end_reason;
    result.steps = state.step;
    result.rounds = state.round_count;
    result.rescued = state.rescued;
    result.lost = state.lost;
    result.damage_count = state.damage_count;

    ScenarioRunResult {
        result,
        anomaly_records,
    }
}

fn collect_engine_anomalies(engine: &GameEngine, last_damage: u32) -> Vec<String> {
    let mut anomalies = Vec::new();

    let counts = engine.poi_counts();
    if counts.total() != TOTAL_POI_COUNT {
        anomalies.push(format!("POI count drifted to {}", counts.total()));
    }
    let (victims, alarms) = engine.pois().kind_totals();
    if (victims, alarms) != (10, 5) {
        anomalies.push(format!("POI kinds drifted to {victims} victims / {alarms} false alarms"));
    }

    let placed: Vec<Cell> = engine.pois().placed().map(|(_, cell)| cell).collect();
    let unique: HashSet<Cell> = placed.iter().copied().collect();
    if unique.len() != placed.len() {
        anomalies.push("two POIs share a cell".to_string());
    }

    let agents = engine.firefighters();
    for agent in &agents {
        if agent.action_points_spent > ACTION_POINTS_PER_TURN {
            anomalies.push(format!(
                "firefighter {} spent {} action points in one turn",
                agent.id, agent.action_points_spent
            ));
        }
    }
    let free_rescuers = agents
        .iter()
        .filter(|agent| agent.role == Role::Rescuer && !agent.is_carrying_victim)
        .count();
    if free_rescuers > MAX_RESCUERS {
        anomalies.push(format!("{free_rescuers} rescuers assigned"));
    }

    if engine.damage_count() < last_damage {
        anomalies.push(format!(
            "damage decreased from {last_damage} to {}",
            engine.damage_count()
        ));
    }
    anomalies
}

fn resolve_scenarios(cli: &Cli) -> Vec<Scenario> {
    let seed = cli.seed.unwrap_or_else(now_ms);
    let games = cli.games.unwrap_or(DEFAULT_GAMES).max(1);
    let max_steps = cli.max_steps.unwrap_or(DEFAULT_MAX_STEPS).max(1);

    (0..games)
        .map(|idx| Scenario {
            name: format!("game-{}", idx + 1),
            seed: normalize_seed(seed.wrapping_add(idx as u64)),
            max_steps,
        })
        .collect()
}

fn normalize_seed(seed: u64) -> u32 {
    seed as u32
}

fn outcome_key(outcome: Option<Outcome>) -> String {
    match outcome {
        Some(Outcome::Won) => "won",
        Some(Outcome::Lost) => "lost",
        None => "unfinished",
    }
    .to_string()
}

fn push_anomaly(
    anomalies: &mut Vec<String>,
    anomaly_records: &mut Vec<AnomalyRecord>,
    anomaly_seen: &mut HashSet<String>,
    step: u64,
    message: String,
) {
    anomaly_records.push(AnomalyRecord {
        step,
        message: message.clone(),
    });
    if anomaly_seen.insert(message.clone()) {
        anomalies.push(message);
    }
}

fn default_match_id(seed: u32, timestamp_ms: u64) -> String {
    format!("sim-{seed}-{timestamp_ms}")
}

#[allow(clippy::too_many_arguments)]
fn build_run_summary(
    match_id: String,
    started_at: String,
    started_at_ms: u64,
    finished_at_ms: u64,
    games: Vec<GameResultLine>,
    outcome_counts: BTreeMap<String, usize>,
    anomaly_count: usize,
    total_steps: u64,
) -> RunSummary {
    let game_count = games.len();
    let average_steps = if game_count == 0 {
        0
    } else {
        total_steps / game_count as u64
    };
    RunSummary {
        match_id,
        started_at,
        started_at_ms,
        finished_at_ms,
        game_count,
        anomaly_count,
        average_steps,
        outcome_counts,
        games,
    }
}

fn emit_log(
    level: &str,
    event: &str,
    match_id: &str,
    scenario: Option<&str>,
    seed: Option<u32>,
    step: Option<u64>,
    details: Value,
) {
    let log_line = StructuredLogLine {
        timestamp_ms: now_ms(),
        level: level.to_string(),
        event: event.to_string(),
        match_id: match_id.to_string(),
        scenario: scenario.map(|value| value.to_string()),
        seed,
        step,
        details,
    };
    match serde_json::to_string(&log_line) {
        Ok(line) => eprintln!("{line}"),
        Err(error) => eprintln!("{{\"level\":\"error\",\"event\":\"log_serialize_failed\",\"error\":{:?}}}", error.to_string()),
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn write_summary(path: &Path, summary: &RunSummary) -> io::Result<()> {
    let summary_text = serde_json::to_string_pretty(summary).map_err(io::Error::other)?;
    std::fs::write(path, summary_text)
}
