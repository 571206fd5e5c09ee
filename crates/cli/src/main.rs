//! Panelcut command-line planner

mod export;
mod job;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use std::path::PathBuf;
use u_panelcut_core::geometry::{DEFAULT_BOARD_H, DEFAULT_BOARD_W, DEFAULT_THICKNESS, DEFAULT_TRIM};
use u_panelcut_core::{
    generate_random_parts, solution_cost, validate_solution, Board, PriceModel, RandomPartsConfig,
    Severity, ShelfBackendKind, Solver, SolverConfig, Strategy, Trim,
};
use u_panelcut_solver::{is_milp_available, Planner};

#[derive(Parser)]
#[command(name = "panelcut")]
#[command(about = "Guillotine cutting planner for rectangular panels")]
#[command(version)]
struct Cli {
    /// Log search internals
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Plan sheets for a parts list
    Solve {
        /// Parts file (.csv with name,w,h,qty,can_rotate or a .json job)
        #[arg(short, long)]
        parts: PathBuf,

        /// Packing strategy
        #[arg(short, long, value_enum, default_value = "shelf")]
        strategy: StrategyArg,

        /// Raw board size, e.g. 2800x2070
        #[arg(short, long)]
        board: Option<String>,

        /// Board thickness in mm
        #[arg(long, default_value_t = DEFAULT_THICKNESS)]
        thickness: i64,

        /// Trim margin: N or L,R,T,B
        #[arg(long)]
        trim: Option<String>,

        /// Saw kerf in mm
        #[arg(short, long)]
        kerf: Option<i64>,

        /// Time limit per sheet in seconds
        #[arg(short, long, default_value = "10")]
        time_limit: f64,

        /// Maximum number of sheets
        #[arg(short, long, default_value = "20")]
        max_sheets: usize,

        /// Use the MILP shelf backend (requires the `milp` feature)
        #[arg(long)]
        milp: bool,

        /// Output file for the JSON report
        #[arg(long)]
        json: Option<PathBuf>,

        /// Directory for placements.csv, cuts.csv and summary.csv
        #[arg(long)]
        csv_dir: Option<PathBuf>,

        /// Price per mm of cut
        #[arg(long)]
        price_per_mm: Option<f64>,

        /// Price per sheet
        #[arg(long, default_value = "0")]
        price_per_sheet: f64,
    },

    /// Generate a random parts list
    Generate {
        /// Random seed for reproducibility
        #[arg(short, long, default_value = "123")]
        seed: u64,

        /// Number of distinct part types
        #[arg(short, long, default_value = "25")]
        unique: usize,

        /// Output CSV file (stdout when omitted)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum StrategyArg {
    /// Shelf packer, sheet by sheet
    Shelf,
    /// Two-cut zone search around the shelf packer
    Hybrid,
    /// Greedy bottom-left placement
    BottomLeft,
    /// Best of several part orderings
    Global,
    /// Smallest sheet cap that places everything
    MinSheets,
}

impl From<StrategyArg> for Strategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Shelf => Strategy::Shelf,
            StrategyArg::Hybrid => Strategy::Hybrid,
            StrategyArg::BottomLeft => Strategy::BottomLeft,
            StrategyArg::Global => Strategy::Global,
            StrategyArg::MinSheets => Strategy::MinSheets,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(if cli.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .parse_default_env()
        .format_timestamp(None)
        .init();

    match cli.command {
        Commands::Solve {
            parts,
            strategy,
            board,
            thickness,
            trim,
            kerf,
            time_limit,
            max_sheets,
            milp,
            json,
            csv_dir,
            price_per_mm,
            price_per_sheet,
        } => {
            let job = job::load_job(&parts)?;
            let (width, height) = match board {
                Some(value) => job::parse_board(&value)?,
                None => job.board.unwrap_or((DEFAULT_BOARD_W, DEFAULT_BOARD_H)),
            };
            let trim = match trim {
                Some(value) => job::parse_trim(&value)?,
                None => match job.trim {
                    Some(t) => t,
                    None => Trim::uniform(DEFAULT_TRIM)?,
                },
            };
            let board = Board::new("board", width, height, thickness, trim)?;

            let mut config = SolverConfig::new()
                .with_strategy(strategy.into())
                .with_time_limit((time_limit * 1000.0).round().max(1.0) as u64)
                .with_max_sheets(max_sheets)
                .with_search_max_sheets(max_sheets);
            if let Some(k) = kerf.or(job.kerf) {
                config = config.with_kerf(k);
            }
            if milp {
                if !is_milp_available() {
                    log::warn!("built without the `milp` feature, falling back to branch and bound");
                }
                config = config.with_backend(ShelfBackendKind::Milp);
            }

            println!(
                "Planning {} part types on {}x{} ({})",
                job.parts.len(),
                width,
                height,
                config.strategy
            );
            let solution = Planner::new(config).solve(&board, &job.parts)?;
            let issues = validate_solution(&solution);

            let cost = match price_per_mm {
                Some(rate) => Some(solution_cost(
                    &solution,
                    &PriceModel::new(rate).with_sheet_fee(price_per_sheet),
                )?),
                None => None,
            };

            export::print_summary(&solution, cost.as_ref());
            for issue in &issues {
                eprintln!("{}", issue);
            }

            if let Some(path) = json {
                export::Report::new(&solution, cost.as_ref(), &issues)
                    .save_json(&path)
                    .with_context(|| format!("writing {}", path.display()))?;
                println!("Report saved to: {}", path.display());
            }

            if let Some(dir) = csv_dir {
                export::save_csv_dir(&solution, &dir)
                    .with_context(|| format!("writing CSV files to {}", dir.display()))?;
                println!("CSV saved to: {}", dir.display());
            }

            let errors = issues
                .iter()
                .filter(|i| i.severity == Severity::Error)
                .count();
            if errors > 0 {
                anyhow::bail!("{} validation errors", errors);
            }
        }

        Commands::Generate { seed, unique, out } => {
            let config = RandomPartsConfig::new()
                .with_seed(seed)
                .with_unique(unique)
                .with_max_size(
                    DEFAULT_BOARD_W - 2 * DEFAULT_TRIM,
                    DEFAULT_BOARD_H - 2 * DEFAULT_TRIM,
                );
            let parts = generate_random_parts(&config)?;
            let csv = job::parts_to_csv(&parts);
            match out {
                Some(path) => {
                    std::fs::write(&path, csv)?;
                    println!("{} part types written to {}", parts.len(), path.display());
                }
                None => print!("{}", csv),
            }
        }
    }

    Ok(())
}
