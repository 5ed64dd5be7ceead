use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use pgn_analyzer_core::error::LexErrorKind;
use pgn_analyzer_core::parser::{Encoding, Lexer, DEFAULT_BUFSIZE};
use pgn_analyzer_core::{board, Annotator, Error, Game, PgnReader, Position, ReaderConfig, Result, ScoreUnit};

mod compare;
mod scores;

use scores::JsonScores;

/// Streaming PGN parser, position analyzer and annotator
#[derive(Parser)]
#[command(name = "pgn-analyzer")]
#[command(about = "Parse, inspect and annotate PGN files")]
#[command(version = "0.1.0")]
struct Cli {
    /// Log parser and annotator progress
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Read every game of a PGN file
    Parse {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// What to extract from each game
        #[arg(long, value_enum, default_value_t = Target::Games)]
        target: Target,

        #[arg(long, value_enum, default_value_t = EncodingArg::U)]
        encoding: EncodingArg,

        /// Lexer buffer size in bytes
        #[arg(long, env = "PGN_BUFSIZE", default_value_t = DEFAULT_BUFSIZE)]
        bufsize: usize,

        /// Check mainlines against pgn-reader
        #[arg(long)]
        compare: bool,

        #[arg(long)]
        json: bool,
    },

    /// Print the positional summary of a FEN
    Position {
        #[arg(value_name = "FEN")]
        fen: String,

        #[arg(long)]
        json: bool,

        /// Report scores in pawns instead of centipawns
        #[arg(long)]
        pawns: bool,
    },

    /// Assign NAGs to a game from engine scores
    Annotate {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// JSON file with per-ply scores and optional UCI lines
        #[arg(long, value_name = "JSON")]
        scores: PathBuf,

        /// Game to annotate, counting from 1
        #[arg(long, default_value = "1")]
        game: usize,

        /// Score drop (in pawns) that makes a move a blunder
        #[arg(long, default_value = "2.0")]
        blunder: f64,

        /// Score drop that makes a move a mistake
        #[arg(long)]
        poor: Option<f64>,

        /// Score drop that makes a move dubious
        #[arg(long)]
        dubious: Option<f64>,

        /// Add engine lines for every annotated move
        #[arg(long)]
        force_hints: bool,

        #[arg(long, default_value = "")]
        name: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Target {
    Games,
    Headers,
    Board,
    Skip,
    Lex,
}

/// `u`tf-8, `l`atin-1 or `a`scii
#[derive(Clone, Copy, ValueEnum)]
enum EncodingArg {
    U,
    L,
    A,
}

impl From<EncodingArg> for Encoding {
    fn from(arg: EncodingArg) -> Self {
        match arg {
            EncodingArg::U => Encoding::Utf8,
            EncodingArg::L => Encoding::Latin1,
            EncodingArg::A => Encoding::Ascii,
        }
    }
}

#[derive(Serialize)]
struct GameReport {
    number: usize,
    summary: String,
    plies: usize,
    final_fen: Option<String>,
    errors: Vec<String>,
}

impl GameReport {
    fn new(number: usize, game: &Game) -> Self {
        Self {
            number,
            summary: game.headers.summary(),
            plies: game.mainline().count(),
            final_fen: game.fen(game.end()).ok(),
            errors: game.errors.iter().map(|e| e.to_string()).collect(),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.debug { tracing::Level::DEBUG } else { tracing::Level::WARN };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Parse {
            file,
            target,
            encoding,
            bufsize,
            compare,
            json,
        } => {
            let config = ReaderConfig::default()
                .with_bufsize(bufsize)
                .with_encoding(encoding.into());
            match target {
                Target::Games => parse_games(&file, config, compare, json),
                Target::Headers => parse_headers(&file, config),
                Target::Board => parse_boards(&file, config),
                Target::Skip => skip_games(&file, config),
                Target::Lex => lex_games(&file, config),
            }
        }
        Command::Position { fen, json, pawns } => {
            let unit = if pawns { ScoreUnit::Pawns } else { ScoreUnit::Centipawns };
            let summary = Position::from_fen(&fen)?.with_unit(unit).summary();
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print!("{}", summary);
            }
            Ok(())
        }
        Command::Annotate {
            file,
            scores,
            game,
            blunder,
            poor,
            dubious,
            force_hints,
            name,
        } => {
            let mut annotator = Annotator::new(name);
            annotator.set_blunder(blunder, true);
            if let Some(poor) = poor {
                annotator.set_poor_move(poor, false);
            }
            if let Some(dubious) = dubious {
                annotator.set_dubious_move(dubious, false);
            }
            annotate(&file, &scores, game, &annotator, force_hints)
        }
    }
}

fn open(file: &Path, config: ReaderConfig) -> Result<PgnReader<File>> {
    Ok(PgnReader::with_config(File::open(file)?, config))
}

/// Lexical errors are reported and reading goes on with the next game,
/// except for I/O failures.
fn keep_going(error: &pgn_analyzer_core::LexError) -> bool {
    warn!("{}", error);
    !matches!(error.kind, LexErrorKind::Io(_))
}

fn parse_games(file: &Path, config: ReaderConfig, compare: bool, json: bool) -> Result<()> {
    let mut reader = open(file, config)?;
    let mut reports = Vec::new();
    let mut mainlines = Vec::new();
    for game in reader.games() {
        let game = match game {
            Ok(game) => game,
            Err(e) => {
                warn!("{}", e);
                if compare {
                    mainlines.push(None);
                }
                continue;
            }
        };
        let report = GameReport::new(reports.len() + 1, &game);
        if !json {
            println!("{}. {} ({} plies)", report.number, report.summary, report.plies);
            for error in &report.errors {
                println!("   {}", error);
            }
        }
        if compare {
            mainlines.push(Some(game.mainline_moves().iter().map(|mv| mv.uci()).collect::<Vec<_>>()));
        }
        reports.push(report);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        println!("{} games", reports.len());
    }

    if compare {
        let oracle = compare::oracle_mainlines(file)?;
        let problems = compare::compare(&mainlines, &oracle);
        for problem in &problems {
            println!("compare: {}", problem);
        }
        if problems.is_empty() {
            println!("compare: {} mainlines agree with pgn-reader", mainlines.len());
        }
    }
    Ok(())
}

fn parse_headers(file: &Path, config: ReaderConfig) -> Result<()> {
    let mut reader = open(file, config)?;
    let mut count = 0;
    loop {
        match reader.read_headers() {
            Ok(Some(headers)) => {
                count += 1;
                println!("{}. {}", count, headers.summary());
            }
            Ok(None) => break,
            Err(e) if keep_going(&e) => continue,
            Err(e) => return Err(e.into()),
        }
    }
    println!("{} games", count);
    Ok(())
}

fn parse_boards(file: &Path, config: ReaderConfig) -> Result<()> {
    let mut reader = open(file, config)?;
    let mut count = 0;
    loop {
        match reader.read_board() {
            Ok(Some(position)) => {
                count += 1;
                println!("{}. {}", count, board::fen_of(&position));
            }
            Ok(None) => break,
            Err(e) if keep_going(&e) => continue,
            Err(e) => return Err(e.into()),
        }
    }
    println!("{} games", count);
    Ok(())
}

fn skip_games(file: &Path, config: ReaderConfig) -> Result<()> {
    let mut reader = open(file, config)?;
    let mut count = 0;
    loop {
        match reader.skip_game() {
            Ok(true) => count += 1,
            Ok(false) => break,
            Err(e) if keep_going(&e) => continue,
            Err(e) => return Err(e.into()),
        }
    }
    println!("{} games", count);
    Ok(())
}

fn lex_games(file: &Path, config: ReaderConfig) -> Result<()> {
    let mut lexer = Lexer::new(File::open(file)?, config.bufsize, config.encoding);
    loop {
        let first = match lexer.new_game() {
            Ok(Some(token)) => token,
            Ok(None) => break,
            Err(e) if keep_going(&e) => {
                lexer.recover()?;
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        println!("game {}", lexer.game());
        let rest = match lexer.dump() {
            Ok(tokens) => tokens,
            Err(e) if keep_going(&e) => {
                lexer.recover()?;
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        for token in std::iter::once(first).chain(rest) {
            println!("  {}", token);
        }
        lexer.end_game()?;
    }
    println!("{} games", lexer.game());
    Ok(())
}

fn annotate(
    file: &Path,
    scores: &Path,
    number: usize,
    annotator: &Annotator,
    force_hints: bool,
) -> Result<()> {
    let mut source = JsonScores::from_path(scores)?;
    let text = fs::read_to_string(file)?;
    let mut reader = PgnReader::new(text.as_bytes());
    let mut game = reader
        .games()
        .nth(number.saturating_sub(1))
        .ok_or(Error::GameNotFound(number))??;
    let root = game.root();
    let plies = source.len();
    let added = annotator.annotate(&mut game, root, &mut source, plies, force_hints)?;
    debug!(added, "annotation finished");
    print!("{}", game.to_pgn()?);
    Ok(())
}
