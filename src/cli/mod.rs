use anyhow::{anyhow, Result};
use serde::Serialize;
use std::collections::HashSet;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use crate::cache::DatasetLoader;
use crate::config::{AppConfig, SelectionConfig};
use crate::error::ScoutResult;
use crate::models::{Dataset, Position, ScoredPlayer};
use crate::services::{
    plan_squad, rank_players, AvailabilityDecision, AvailabilityStrategy, DiscountAvailability,
    ExcludeDoubtful, IgnoreAvailability, RankingReport,
};
use crate::utils::{best_name_match, fit, format_price, round2};

pub struct RankOptions {
    pub position: Option<Position>,
    pub top: usize,
    pub history: bool,
    pub export: Option<PathBuf>,
}

/// How doubtful players are treated during squad selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum AvailabilityMode {
    Ignore,
    Discount,
    Exclude,
    Prompt,
}

impl AvailabilityMode {
    pub fn strategy(self) -> Box<dyn AvailabilityStrategy> {
        match self {
            AvailabilityMode::Ignore => Box::new(IgnoreAvailability),
            AvailabilityMode::Discount => Box::new(DiscountAvailability),
            AvailabilityMode::Exclude => Box::new(ExcludeDoubtful::default()),
            AvailabilityMode::Prompt => Box::new(InteractivePrompt::new(io::stdin().lock())),
        }
    }
}

pub struct SquadOptions {
    pub budget: Option<u32>,
    pub pins: Vec<String>,
    pub availability: AvailabilityMode,
    /// Admit on the plain budget check without reserving money for open slots
    pub no_reserve: bool,
    pub history: bool,
    pub export: Option<PathBuf>,
}

async fn load_dataset(config: &AppConfig) -> Result<Dataset> {
    Ok(DatasetLoader::new(config).load(false).await?)
}

fn ranked(config: &AppConfig, dataset: &Dataset, history: bool) -> RankingReport {
    let mut scoring = config.scoring.clone();
    scoring.include_history |= history;
    rank_players(dataset, &scoring)
}

pub async fn fetch_data(config: &AppConfig, force: bool) -> Result<()> {
    println!("📥 Fetching fantasy data into {}...", config.cache_dir);

    let dataset = DatasetLoader::new(config).load(force).await?;

    println!(
        "✅ {} players, {} teams, {} player summaries cached",
        dataset.players.len(),
        dataset.teams.len(),
        dataset.summaries.len()
    );
    if let Some(next) = dataset.next_event {
        println!("📅 Next gameweek: {}", next);
    }
    if !dataset.rejected.is_empty() {
        println!("⚠️  {} records rejected (see logs)", dataset.rejected.len());
    }

    Ok(())
}

// ── Tables ──────────────────────────────────────────────────────────────────

fn print_header() {
    println!(
        "{:>4}  {}  {}  {}  {:>6}  {:>5}  {:>8}  {:>8}  {:>8}",
        "#",
        fit("Name", 18),
        fit("Pos", 3),
        fit("Team", 4),
        "Price",
        "Avail",
        "Score",
        "Final",
        "GW"
    );
}

fn print_row(rank: usize, p: &ScoredPlayer) {
    println!(
        "{:>4}  {}  {}  {}  {:>6}  {:>5.2}  {:>8.3}  {:>8.3}  {:>8.3}",
        rank,
        fit(&p.name, 18),
        fit(p.position.as_str(), 3),
        fit(&p.team_name, 4),
        format_price(p.price),
        p.availability,
        p.combined_score,
        p.final_score,
        p.gameweek_score
    );
}

fn print_players(players: &[ScoredPlayer]) {
    print_header();
    for (i, p) in players.iter().enumerate() {
        print_row(i + 1, p);
    }
}

// ── CSV export ──────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct RankingRow<'a> {
    rank: usize,
    id: u32,
    name: &'a str,
    position: &'static str,
    team: &'a str,
    price: f64,
    availability: f64,
    performance: f64,
    history_multiplier: f64,
    previous_difficulty: f64,
    upcoming_difficulty: f64,
    performance_score: f64,
    combined_score: f64,
    final_score: f64,
    gameweek_score: f64,
}

impl<'a> RankingRow<'a> {
    fn new(rank: usize, p: &'a ScoredPlayer) -> Self {
        Self {
            rank,
            id: p.id,
            name: &p.name,
            position: p.position.as_str(),
            team: &p.team_name,
            price: p.price as f64 / 10.0,
            availability: p.availability,
            performance: round2(p.performance),
            history_multiplier: p.history_multiplier,
            previous_difficulty: p.previous_difficulty,
            upcoming_difficulty: p.upcoming_difficulty,
            performance_score: p.performance_score,
            combined_score: p.combined_score,
            final_score: p.final_score,
            gameweek_score: p.gameweek_score,
        }
    }
}

pub fn export_players(path: &Path, players: &[ScoredPlayer]) -> ScoutResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for (i, p) in players.iter().enumerate() {
        writer.serialize(RankingRow::new(i + 1, p))?;
    }
    writer.flush()?;
    tracing::info!("Exported {} rows to {}", players.len(), path.display());
    Ok(())
}

// ── Commands ────────────────────────────────────────────────────────────────

pub async fn show_rankings(config: &AppConfig, options: RankOptions) -> Result<()> {
    let dataset = load_dataset(config).await?;
    let report = ranked(config, &dataset, options.history);

    let rows: Vec<ScoredPlayer> = report
        .table
        .iter()
        .filter(|p| options.position.map_or(true, |pos| p.position == pos))
        .take(options.top)
        .cloned()
        .collect();

    match options.position {
        Some(position) => println!("🏆 Top {} {} players:\n", rows.len(), position),
        None => println!("🏆 Top {} players:\n", rows.len()),
    }
    print_players(&rows);

    println!(
        "\n📊 {} ranked, {} unavailable, {} failed",
        report.table.len(),
        report.excluded.len(),
        report.failures.len()
    );
    if report.skipped_fixtures > 0 {
        println!("📭 {} unscheduled fixtures ignored", report.skipped_fixtures);
    }

    if let Some(path) = options.export {
        export_players(&path, &rows)?;
        println!("💾 Saved to {}", path.display());
    }

    Ok(())
}

/// Resolve pinned names against the ranked table. Names with no close match are returned separately.
pub fn resolve_pins(table: &[ScoredPlayer], names: &[String]) -> (HashSet<u32>, Vec<String>) {
    let mut pinned = HashSet::new();
    let mut unmatched = Vec::new();

    for name in names {
        match best_name_match(name, table.iter().map(|p| p.name.as_str())) {
            Some(i) => {
                pinned.insert(table[i].id);
            }
            None => unmatched.push(name.clone()),
        }
    }

    (pinned, unmatched)
}

/// Apply the command-line overrides to the configured selection rules.
fn selection_for(base: &SelectionConfig, budget: Option<u32>, no_reserve: bool) -> SelectionConfig {
    let mut selection = base.clone();
    if let Some(budget) = budget {
        selection.budget = budget;
    }
    selection.reserve_budget &= !no_reserve;
    selection
}

pub async fn build_squad(config: &AppConfig, options: SquadOptions) -> Result<()> {
    let dataset = load_dataset(config).await?;
    let report = ranked(config, &dataset, options.history);

    let selection = selection_for(&config.selection, options.budget, options.no_reserve);

    let (pinned, unmatched) = resolve_pins(&report.table, &options.pins);
    for name in &unmatched {
        println!("❓ No player matching '{}', ignoring pin", name);
    }

    let mut strategy = options.availability.strategy();

    println!(
        "🔧 Building a squad from {} players with budget {}{}...",
        report.table.len(),
        format_price(selection.budget),
        if selection.reserve_budget { "" } else { " (no budget reserve)" }
    );
    let plan = plan_squad(&report.table, &pinned, &selection, &config.lineup, strategy.as_mut())?;
    let squad = &plan.selection.squad;

    println!("\n⭐ Starting XI:");
    print_players(&plan.lineup.starters);
    println!("\n🪑 Bench:");
    print_players(&plan.lineup.bench);

    println!(
        "\n💰 Total cost: {} / {}",
        format_price(squad.total_cost()),
        format_price(selection.budget)
    );
    println!(
        "🔁 {} passes, {} repairs, {} restarts",
        plan.selection.passes, plan.selection.repairs, plan.selection.restarts
    );

    if let Some(path) = options.export {
        let mut rows = plan.lineup.starters.clone();
        rows.extend(plan.lineup.bench.iter().cloned());
        export_players(&path, &rows)?;
        println!("💾 Saved to {}", path.display());
    }

    Ok(())
}

pub async fn show_player(config: &AppConfig, name: &str, history: bool) -> Result<()> {
    let dataset = load_dataset(config).await?;

    println!("🔍 Searching for player: {}", name);

    let index = best_name_match(name, dataset.players.iter().map(|p| p.name.as_str()))
        .ok_or_else(|| anyhow!("no player matching '{}'", name))?;
    let player = &dataset.players[index];
    let report = ranked(config, &dataset, history);

    println!("\n📊 {} {} ({})", player.first_name, player.second_name, player.name);
    println!("   Team: {}", dataset.teams.short_name(player.team_id));
    println!("   Position: {}", player.position);
    println!("   Price: {}", format_price(player.price));
    if !player.news.is_empty() {
        println!("   News: {}", player.news);
    }

    if report.excluded.contains(&player.id) {
        println!("\n🚫 Not available for the next round");
        return Ok(());
    }
    if let Some(failure) = report.failures.iter().find(|f| f.id == Some(player.id)) {
        println!("\n❌ Could not be scored: {}", failure.reason);
        return Ok(());
    }

    let Some((rank, scored)) = report
        .table
        .iter()
        .enumerate()
        .find(|(_, p)| p.id == player.id)
    else {
        return Err(anyhow!("player {} missing from the ranking", player.id));
    };

    println!("\n🧮 Score breakdown (rank {} of {}):", rank + 1, report.table.len());
    println!("   Availability: {:.0}%", scored.availability * 100.0);
    println!(
        "   Gameweek scores: {:?}",
        scored.gameweek_scores.iter().map(|s| round2(*s)).collect::<Vec<_>>()
    );
    println!("   Performance: {:.2}", scored.performance);
    println!("   History multiplier: {:.3}", scored.history_multiplier);
    println!("   Previous difficulty: {:.3}", scored.previous_difficulty);
    println!("   Upcoming difficulty: {:.3}", scored.upcoming_difficulty);
    println!("   Performance score: {:.3}", scored.performance_score);
    println!("   Combined score: {:.3}", scored.combined_score);
    println!("   Final score: {:.3}", scored.final_score);
    println!("   Next gameweek score: {:.3}", scored.gameweek_score);

    Ok(())
}

// ── Interactive availability prompt ─────────────────────────────────────────

pub fn parse_decision(answer: &str) -> Option<AvailabilityDecision> {
    match answer.trim().to_lowercase().as_str() {
        "d" | "discount" => Some(AvailabilityDecision::Discount),
        "e" | "exclude" => Some(AvailabilityDecision::Exclude),
        "i" | "ignore" | "" => Some(AvailabilityDecision::Ignore),
        _ => None,
    }
}

/// Asks on the terminal what to do with each doubtful candidate
pub struct InteractivePrompt<R> {
    input: R,
}

impl<R: BufRead> InteractivePrompt<R> {
    pub fn new(input: R) -> Self {
        Self { input }
    }
}

impl<R: BufRead> AvailabilityStrategy for InteractivePrompt<R> {
    fn decide(&mut self, candidate: &ScoredPlayer) -> AvailabilityDecision {
        loop {
            print!(
                "⚠️  {} ({}, {}) is {:.0}% likely to play. [d]iscount / [e]xclude / [i]gnore: ",
                candidate.name,
                candidate.position,
                candidate.team_name,
                candidate.availability * 100.0
            );
            io::stdout().flush().ok();

            let mut answer = String::new();
            match self.input.read_line(&mut answer) {
                Ok(0) | Err(_) => return AvailabilityDecision::Ignore,
                Ok(_) => {}
            }
            if let Some(decision) = parse_decision(&answer) {
                return decision;
            }
            println!("Please answer d, e or i.");
        }
    }
}
