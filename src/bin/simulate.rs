use chrono::{DateTime, SecondsFormat, Utc};
use clap::Parser;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::Path;
use std::path::PathBuf;
use tiger_maze_server::constants::{COMBO_CAP_TENTHS, TICK_MS};
use tiger_maze_server::engine::{now_ms, EngineOptions, GameEngine};
use tiger_maze_server::error::LevelLoadError;
use tiger_maze_server::types::{Cell, LevelStatus, RuntimeEvent, Snapshot};
use tiger_maze_server::world::{level_file_path, load_level_file, LevelDescriptor};

/// Hard stop for a single scenario: ten simulated minutes.
const DEFAULT_MAX_TICKS: u64 = 10 * 60 * 1000 / TICK_MS;
/// How many collectibles the greedy autopilot tries before heading for the goal.
const GREEDY_CANDIDATES: usize = 8;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Run a single level descriptor file.
    #[arg(long)]
    level_file: Option<PathBuf>,
    #[arg(long, default_value = "levels")]
    levels_dir: PathBuf,
    /// Run a single level from the levels directory.
    #[arg(long)]
    level: Option<u32>,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    max_ticks: Option<u64>,
    #[arg(long)]
    cell_size: Option<f32>,
    /// Sweep collectibles before heading for the goal.
    #[arg(long)]
    greedy: bool,
    #[arg(long)]
    match_id: Option<String>,
    #[arg(long)]
    summary_out: Option<PathBuf>,
}

#[derive(Clone, Debug, Serialize)]
struct Scenario {
    name: String,
    level: u32,
    seed: u32,
    source: PathBuf,
}

#[derive(Clone, Debug, Serialize)]
struct ScenarioResultLine {
    scenario: String,
    level: u32,
    seed: u32,
    status: LevelStatus,
    #[serde(rename = "durationMs")]
    duration_ms: u64,
    score: u64,
    #[serde(rename = "foodsCollected")]
    foods_collected: u32,
    #[serde(rename = "totalFoods")]
    total_foods: u32,
    hits: u32,
    #[serde(rename = "powerUpsCollected")]
    power_ups_collected: u32,
    #[serde(rename = "maxCombo")]
    max_combo: u32,
    anomalies: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
struct AnomalyRecord {
    tick: u64,
    message: String,
}

#[derive(Clone, Debug, Serialize)]
struct ScenarioRunResult {
    #[serde(flatten)]
    result: ScenarioResultLine,
    #[serde(rename = "anomalyRecords")]
    anomaly_records: Vec<AnomalyRecord>,
    finished_tick: u64,
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
    #[serde(rename = "scenarioCount")]
    scenario_count: usize,
    #[serde(rename = "anomalyCount")]
    anomaly_count: usize,
    #[serde(rename = "averageDurationMs")]
    average_duration_ms: u64,
    #[serde(rename = "outcomeCounts")]
    outcome_counts: BTreeMap<String, usize>,
    scenarios: Vec<ScenarioResultLine>,
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
    tick: Option<u64>,
    details: Value,
}

#[derive(Clone, Copy, Debug)]
struct RunSettings {
    greedy: bool,
    max_ticks: u64,
    cell_size: Option<f32>,
}

fn main() {
    let cli = Cli::parse();
    let scenarios = resolve_scenarios(&cli);
    let settings = RunSettings {
        greedy: cli.greedy,
        max_ticks: cli.max_ticks.unwrap_or(DEFAULT_MAX_TICKS).max(1),
        cell_size: cli.cell_size,
    };
    let run_started_at_ms = now_ms();
    let seed_hint = scenarios.first().map(|scenario| scenario.seed).unwrap_or(0);
    let match_id = cli
        .match_id
        .clone()
        .unwrap_or_else(|| default_match_id(seed_hint, run_started_at_ms));
    let mut has_anomaly = false;
    let mut has_load_failure = false;
    let mut scenario_results = Vec::new();
    let mut outcome_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut total_duration_ms = 0u64;
    let mut total_anomalies = 0usize;

    for scenario in scenarios {
        emit_log(
            "info",
            "scenario_started",
            &match_id,
            Some(&scenario.name),
            Some(scenario.seed),
            None,
            json!({
                "level": scenario.level,
                "source": scenario.source.to_string_lossy(),
                "greedy": settings.greedy,
            }),
        );

        let loaded = load_level_file(&scenario.source).map(|mut descriptor| {
            if cli.level_file.is_none() {
                descriptor.level = scenario.level;
            }
            descriptor
        });
        let scenario_run = match loaded
            .and_then(|descriptor| run_scenario(&scenario, &descriptor, settings))
        {
            Ok(scenario_run) => scenario_run,
            Err(error) => {
                emit_log(
                    "error",
                    "level_load_failed",
                    &match_id,
                    Some(&scenario.name),
                    Some(scenario.seed),
                    None,
                    json!({
                        "error": error.to_string(),
                    }),
                );
                has_load_failure = true;
                load_failed_result(&scenario)
            }
        };

        for anomaly in &scenario_run.anomaly_records {
            emit_log(
                "warn",
                "anomaly_detected",
                &match_id,
                Some(&scenario.name),
                Some(scenario.seed),
                Some(anomaly.tick),
                json!({
                    "message": anomaly.message,
                }),
            );
        }

        if !scenario_run.result.anomalies.is_empty() {
            has_anomaly = true;
        }
        total_anomalies += scenario_run.anomaly_records.len();
        total_duration_ms += scenario_run.result.duration_ms;
        *outcome_counts
            .entry(outcome_key(scenario_run.result.status))
            .or_insert(0) += 1;

        emit_log(
            "info",
            "scenario_finished",
            &match_id,
            Some(&scenario.name),
            Some(scenario.seed),
            Some(scenario_run.finished_tick),
            json!({
                "status": scenario_run.result.status,
                "durationMs": scenario_run.result.duration_ms,
                "score": scenario_run.result.score,
                "anomalyCount": scenario_run.anomaly_records.len(),
            }),
        );

        println!(
            "{}",
            serde_json::to_string(&scenario_run.result).expect("scenario result should serialize")
        );
        scenario_results.push(scenario_run.result);
    }

    let run_finished_at_ms = now_ms();
    let summary = build_run_summary(
        match_id.clone(),
        run_started_at_ms,
        run_finished_at_ms,
        scenario_results,
        outcome_counts,
        total_anomalies,
        total_duration_ms,
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
            "scenarioCount": summary.scenario_count,
            "anomalyCount": summary.anomaly_count,
            "averageDurationMs": summary.average_duration_ms,
            "outcomeCounts": summary.outcome_counts,
            "summaryOut": summary_out_written,
        }),
    );

    if has_load_failure {
        std::process::exit(2);
    }
    if has_anomaly {
        std::process::exit(1);
    }
}

fn run_scenario(
    scenario: &Scenario,
    descriptor: &LevelDescriptor,
    settings: RunSettings,
) -> Result<ScenarioRunResult, LevelLoadError> {
    let mut options = EngineOptions {
        seed: scenario.seed,
        ..EngineOptions::default()
    };
    if let Some(cell_size) = settings.cell_size {
        options.cell_size = cell_size;
    }
    let engine = GameEngine::new(descriptor, options, 0)?;
    Ok(run_engine(engine, &scenario.name, scenario.seed, settings))
}

fn run_engine(
    mut engine: GameEngine,
    name: &str,
    seed: u32,
    settings: RunSettings,
) -> ScenarioRunResult {
    let mut now = 0u64;
    let mut hits = 0u32;
    let mut power_ups_collected = 0u32;
    let mut max_combo = 0u32;
    let mut previous_score = 0u64;
    let mut anomalies = Vec::new();
    let mut anomaly_records = Vec::new();
    let mut anomaly_seen = HashSet::new();
    let mut last_tick = 0u64;

    while !engine.is_ended() {
        drive_autopilot(&mut engine, settings.greedy);
        now += TICK_MS;
        engine.step(now);
        let snapshot = engine.build_snapshot(true);
        last_tick = snapshot.tick;
        for message in collect_snapshot_anomalies(&engine, &snapshot, previous_score) {
            push_anomaly(
                &mut anomalies,
                &mut anomaly_records,
                &mut anomaly_seen,
                snapshot.tick,
                message,
            );
        }
        previous_score = snapshot.score;
        max_combo = max_combo.max(snapshot.combo.count);

        for event in &snapshot.events {
            match event {
                RuntimeEvent::PlayerHit { .. } => hits += 1,
                RuntimeEvent::PowerUpCollected { .. } => power_ups_collected += 1,
                _ => {}
            }
        }

        if snapshot.tick >= settings.max_ticks && !engine.is_ended() {
            push_anomaly(
                &mut anomalies,
                &mut anomaly_records,
                &mut anomaly_seen,
                snapshot.tick,
                "tick limit exceeded".to_string(),
            );
            break;
        }
    }

    let final_snapshot = engine.build_snapshot(false);
    ScenarioRunResult {
        result: ScenarioResultLine {
            scenario: name.to_string(),
            level: engine.level(),
            seed,
            status: engine.status(),
            duration_ms: engine.elapsed_ms(),
            score: engine.score(),
            foods_collected: final_snapshot.foods_collected,
            total_foods: final_snapshot.total_foods,
            hits,
            power_ups_collected,
            max_combo,
            anomalies,
        },
        anomaly_records,
        finished_tick: last_tick,
    }
}

/// Re-targets the player once its current route is used up.
fn drive_autopilot(engine: &mut GameEngine, greedy: bool) {
    if !engine.player_route_done() {
        return;
    }
    let here = engine.player_cell();
    if greedy {
        for target in nearest_collectibles(engine, here) {
            if engine.request_move(target) {
                return;
            }
        }
    }
    let goal = engine.grid().goal();
    engine.request_move(goal);
}

fn nearest_collectibles(engine: &GameEngine, from: Cell) -> Vec<Cell> {
    let mut cells = engine.grid().collectible_cells();
    cells.sort_by_key(|cell| (cell.manhattan(from), cell.y, cell.x));
    cells.truncate(GREEDY_CANDIDATES);
    cells
}

fn collect_snapshot_anomalies(
    engine: &GameEngine,
    snapshot: &Snapshot,
    previous_score: u64,
) -> Vec<String> {
    let mut anomalies = Vec::new();
    let player = &snapshot.player;
    if !player.x.is_finite() || !player.y.is_finite() {
        anomalies.push(format!("player position not finite: {} {}", player.x, player.y));
    }
    if !engine.grid().is_walkable(player.cell) {
        anomalies.push(format!(
            "player inside wall: {} {}",
            player.cell.x, player.cell.y
        ));
    }

    for enemy in &snapshot.enemies {
        if !enemy.x.is_finite() || !enemy.y.is_finite() {
            anomalies.push(format!("enemy position not finite: {}", enemy.id));
        } else if !engine.grid().is_walkable(enemy.cell) {
            anomalies.push(format!("enemy inside wall: {}", enemy.id));
        }
    }

    let combo_cap = f64::from(COMBO_CAP_TENTHS) / 10.0;
    if !(1.0..=combo_cap).contains(&snapshot.combo.multiplier) {
        anomalies.push(format!(
            "combo multiplier out of range: {}",
            snapshot.combo.multiplier
        ));
    }

    if snapshot.score < previous_score {
        anomalies.push(format!(
            "score decreased: {previous_score} -> {}",
            snapshot.score
        ));
    }
    if snapshot.foods_collected > snapshot.total_foods {
        anomalies.push(format!(
            "collected more than total: {}/{}",
            snapshot.foods_collected, snapshot.total_foods
        ));
    }
    anomalies
}

fn resolve_scenarios(cli: &Cli) -> Vec<Scenario> {
    let seed = normalize_seed(cli.seed.unwrap_or_else(now_ms));

    if let Some(path) = cli.level_file.as_ref() {
        return vec![Scenario {
            name: format!("file-{}", file_label(path)),
            level: cli.level.unwrap_or(1),
            seed,
            source: path.clone(),
        }];
    }

    if let Some(level) = cli.level {
        let level = level.max(1);
        return vec![Scenario {
            name: format!("level-{level}"),
            level,
            seed,
            source: level_file_path(&cli.levels_dir, level),
        }];
    }

    (1..=3u32)
        .map(|level| Scenario {
            name: format!("level-{level}"),
            level,
            seed: seed.wrapping_add(level - 1),
            source: level_file_path(&cli.levels_dir, level),
        })
        .collect()
}

fn file_label(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| "level".to_string())
}

fn normalize_seed(seed: u64) -> u32 {
    seed as u32
}

fn load_failed_result(scenario: &Scenario) -> ScenarioRunResult {
    ScenarioRunResult {
        result: ScenarioResultLine {
            scenario: scenario.name.clone(),
            level: scenario.level,
            seed: scenario.seed,
            status: LevelStatus::LoadFailed,
            duration_ms: 0,
            score: 0,
            foods_collected: 0,
            total_foods: 0,
            hits: 0,
            power_ups_collected: 0,
            max_combo: 0,
            anomalies: Vec::new(),
        },
        anomaly_records: Vec::new(),
        finished_tick: 0,
    }
}

fn push_anomaly(
    anomalies: &mut Vec<String>,
    anomaly_records: &mut Vec<AnomalyRecord>,
    anomaly_seen: &mut HashSet<String>,
    tick: u64,
    message: String,
) {
    anomaly_records.push(AnomalyRecord {
        tick,
        message: message.clone(),
    });
    if anomaly_seen.insert(message.clone()) {
        anomalies.push(message);
    }
}

fn default_match_id(seed: u32, timestamp_ms: u64) -> String {
    format!("sim-{seed}-{timestamp_ms}")
}

fn iso_timestamp(timestamp_ms: u64) -> String {
    i64::try_from(timestamp_ms)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn build_run_summary(
    match_id: String,
    started_at_ms: u64,
    finished_at_ms: u64,
    scenarios: Vec<ScenarioResultLine>,
    outcome_counts: BTreeMap<String, usize>,
    anomaly_count: usize,
    total_duration_ms: u64,
) -> RunSummary {
    let scenario_count = scenarios.len();
    let average_duration_ms = if scenario_count == 0 {
        0
    } else {
        total_duration_ms / scenario_count as u64
    };
    RunSummary {
        match_id,
        started_at: iso_timestamp(started_at_ms),
        started_at_ms,
        finished_at_ms,
        scenario_count,
        anomaly_count,
        average_duration_ms,
        outcome_counts,
        scenarios,
    }
}

fn emit_log(
    level: &str,
    event: &str,
    match_id: &str,
    scenario: Option<&str>,
    seed: Option<u32>,
    tick: Option<u64>,
    details: Value,
) {
    let log_line = StructuredLogLine {
        timestamp_ms: now_ms(),
        level: level.to_string(),
        event: event.to_string(),
        match_id: match_id.to_string(),
        scenario: scenario.map(|value| value.to_string()),
        seed,
        tick,
        details,
    };
    eprintln!(
        "{}",
        serde_json::to_string(&log_line).expect("structured log should serialize")
    );
}

fn outcome_key(status: LevelStatus) -> String {
    match status {
        LevelStatus::Completed => "completed",
        LevelStatus::Failed => "failed",
        LevelStatus::LoadFailed => "load_failed",
        LevelStatus::Loading | LevelStatus::Active | LevelStatus::Paused => "unfinished",
    }
    .to_string()
}

fn write_summary(path: &Path, summary: &RunSummary) -> io::Result<()> {
    let summary_text = serde_json::to_string_pretty(summary).expect("run summary should serialize");
    std::fs::write(path, summary_text)
}
