//! Command line entry point: classic demo battles, directory tournaments,
//! and the self-play evolution loop.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use redcode::RelaxedWarrior;
use redqueen_core::{Battle, MarsConfig, Standing};
use redqueen_evolve::{
    templates, LocalVariation, RedQueen, RedQueenConfig,
};

#[derive(Parser)]
#[command(
    name = "redqueen",
    about = "Battle and evolve CoreWar redcode warriors",
    version
)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Battle the classic warriors against each other
    Demo,

    /// Round-robin tournament over every .red file in a directory
    Tournament {
        /// Directory of warrior sources
        dir: PathBuf,

        /// Rounds per match
        #[arg(long, default_value_t = 10)]
        rounds: u32,
    },

    /// Run the self-play evolution loop
    Evolve {
        /// Variation operator backend; only the built-in "local" operator
        /// ships with this binary
        #[arg(long, default_value = "local")]
        provider: String,

        /// Model identifier, for providers that take one
        #[arg(long)]
        model: Option<String>,

        /// Self-play rounds
        #[arg(long, default_value_t = 10)]
        rounds: usize,

        /// Archive generations per round
        #[arg(long, default_value_t = 50)]
        generations: usize,

        /// Random warriors seeding each round's archive
        #[arg(long, default_value_t = 50)]
        population: usize,

        /// Offspring per generation
        #[arg(long, default_value_t = 10)]
        batch: usize,

        /// Champion history per round: -1 all, 0 latest only, k>0 last k
        #[arg(long, default_value_t = -1)]
        history: i64,

        /// Output directory for checkpoints and the run summary
        #[arg(long)]
        out: PathBuf,

        /// Seed the champion history from .red files instead of the
        /// classics
        #[arg(long)]
        seed_dir: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Demo => demo(),
        Command::Tournament { dir, rounds } => tournament(&dir, rounds),
        Command::Evolve {
            provider,
            model,
            rounds,
            generations,
            population,
            batch,
            history,
            out,
            seed_dir,
        } => evolve(
            &provider,
            model.as_deref(),
            RedQueenConfig {
                rounds,
                generations_per_round: generations,
                initial_population: population,
                batch_size: batch,
                history_length: history,
                output_dir: Some(out),
                ..RedQueenConfig::default()
            },
            seed_dir.as_deref(),
        ),
    }
}

/// Terminal logging, info by default
fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    let config = simplelog::ConfigBuilder::new()
        .set_target_level(log::LevelFilter::Off)
        .set_thread_level(log::LevelFilter::Off)
        .build();
    let _ = simplelog::TermLogger::init(
        level,
        config,
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );
}

/// Imp vs dwarf, then a tournament of all the classics
fn demo() -> Result<()> {
    let battle = Battle::new(MarsConfig::default(), 10);

    println!("imp vs dwarf, 10 rounds");
    let pair = [templates::imp(), templates::dwarf()];
    let result = battle.run(&pair)?;
    for (warrior, wins) in pair.iter().zip(&result.wins) {
        println!("  {:<12} {wins} wins", warrior.name);
    }
    println!("  {} draws, ~{} cycles per round", result.draws, result.cycles);
    match result.winner {
        Some(id) => println!("  aggregate winner: {}", pair[id].name),
        None => println!("  aggregate: draw"),
    }

    println!();
    println!("classics tournament, 10 rounds per match");
    let classics = templates::classics();
    let standings = battle.tournament(&classics)?;
    print_standings(&classics, &standings);
    Ok(())
}

/// Round-robin over every .red file in a directory
fn tournament(dir: &Path, rounds: u32) -> Result<()> {
    let warriors = load_warrior_dir(dir)?;
    if warriors.len() < 2 {
        bail!(
            "{} holds {} parseable warrior(s); a tournament needs at least 2",
            dir.display(),
            warriors.len()
        );
    }
    println!(
        "{} warriors, {rounds} rounds per match",
        warriors.len()
    );

    let battle = Battle::new(MarsConfig::default(), rounds);
    let standings = battle.tournament(&warriors)?;
    print_standings(&warriors, &standings);
    Ok(())
}

/// The self-play loop behind the `evolve` subcommand
fn evolve(
    provider: &str,
    model: Option<&str>,
    config: RedQueenConfig,
    seed_dir: Option<&Path>,
) -> Result<()> {
    // Configuration errors abort before any evolution begins
    if provider != "local" {
        bail!(
            "unknown variation provider '{provider}': only the built-in \
             'local' operator ships with this binary"
        );
    }
    if let Some(model) = model {
        log::warn!("--model {model} is ignored by the local operator");
    }

    let seeds = match seed_dir {
        Some(dir) => load_warrior_dir(dir)?,
        None => Vec::new(),
    };

    let mut drq =
        RedQueen::with_seeds(config, LocalVariation::new(), seeds);
    let evolved = drq.run()?;

    println!("evolved {} champions", evolved.len());
    for record in drq.records() {
        println!(
            "  round {:>3}: {:<32} fitness {:.4}  archive {}",
            record.round, record.champion.name, record.fitness,
            record.archive_size
        );
    }
    Ok(())
}

/// Parse every .red file in a directory, skipping the unparseable with a
/// warning
fn load_warrior_dir(dir: &Path) -> Result<Vec<RelaxedWarrior>> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("reading {}", dir.display()))?
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .is_some_and(|extension| extension.eq_ignore_ascii_case("red"))
        })
        .collect();
    entries.sort();

    let mut warriors = Vec::new();
    for path in entries {
        let source = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        let warrior = redcode_parser::parse_warrior(&source);
        if warrior.is_empty() {
            log::warn!(
                "{} contains no parseable instructions, skipping",
                path.display()
            );
        } else {
            warriors.push(warrior);
        }
    }
    Ok(warriors)
}

/// A points-ordered standings table
fn print_standings(warriors: &[RelaxedWarrior], standings: &[Standing]) {
    let mut order: Vec<usize> = (0..standings.len()).collect();
    order.sort_by(|&a, &b| {
        standings[b]
            .points
            .partial_cmp(&standings[a].points)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    println!("  {:<20} {:>4} {:>6} {:>6} {:>6}", "name", "pts", "wins", "draws", "losses");
    for idx in order {
        let standing = &standings[idx];
        println!(
            "  {:<20} {:>4} {:>6} {:>6} {:>6}",
            warriors[idx].name,
            standing.points,
            standing.wins,
            standing.draws,
            standing.losses
        );
    }
}
