use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use remember_sync::batch::notes_from_paths;
use remember_sync::models::ensure_note_types;
use remember_sync::render::{find_notes, render_wiki, rendered_files};
use remember_sync::{sync_notes, NoteBody, Settings, SqliteCollection, TwNote};

#[derive(Parser)]
#[command(name = "remember_sync", about = "Sync TiddlyRemember notes from a TiddlyWiki into a flashcard collection")]
struct Cli {
    /// Settings file (default: remember.toml, if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and add the note types
    Init,
    /// Render the wiki's tiddlers to HTML
    Render {
        /// Directory to render into
        #[arg(short, long)]
        out: PathBuf,
    },
    /// List the notes in an already-rendered directory
    Scan {
        dir: PathBuf,
    },
    /// Render (or read) the wiki and sync its notes into the database
    Sync {
        /// Use this already-rendered directory instead of running TiddlyWiki
        #[arg(short, long)]
        rendered: Option<PathBuf>,
    },
    /// Show note counts per note type
    Stats,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref()).context("loading settings")?;

    match cli.command {
        Commands::Init => {
            let mut col = open_collection(&settings)?;
            let added = ensure_note_types(&mut col)?;
            println!("Database ready at {:?} ({} note types added)", settings.database, added);
        }
        Commands::Render { out } => {
            std::fs::create_dir_all(&out).with_context(|| format!("creating {:?}", out))?;
            render_wiki(&settings.tiddlywiki, &settings.wiki_path, &out, &settings.filter)?;
            println!("Rendered {} tiddlers into {:?}", rendered_files(&out)?.len(), out);
        }
        Commands::Scan { dir } => {
            let notes = scan(&dir)?;
            let mut notes: Vec<_> = notes.into_iter().collect();
            notes.sort_by(|a, b| a.tidref.cmp(&b.tidref).then_with(|| a.id.cmp(&b.id)));
            for note in &notes {
                println!("{:<16} | {:<24} | {}", note.id, truncate(&note.tidref, 24), summary(note));
            }
            println!("\n{} notes", notes.len());
        }
        Commands::Sync { rendered } => {
            let notes = match rendered {
                Some(dir) => scan(&dir)?,
                None => {
                    let pb = progress_bar();
                    let mut progress = |done: usize, total: usize| {
                        pb.set_length(total as u64);
                        pb.set_position(done as u64);
                    };
                    let notes = find_notes(&settings, Some(&mut progress))?;
                    pb.finish_and_clear();
                    notes
                }
            };
            let mut col = open_collection(&settings)?;
            let report = sync_notes(notes, &mut col, &settings)?;
            println!(
                "Added {}, updated {}, migrated {}, unchanged {}, removed {}.",
                report.added, report.updated, report.migrated, report.unchanged, report.removed
            );
        }
        Commands::Stats => {
            let col = open_collection(&settings)?;
            let counts = col.note_counts()?;
            if counts.is_empty() {
                println!("No note types yet. Run 'init' first.");
            }
            for (model, count) in counts {
                println!("{:<28} {:>6}", model, count);
            }
        }
    }

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {:.1}s", elapsed.as_secs_f64());
    }
    Ok(())
}

fn open_collection(settings: &Settings) -> anyhow::Result<SqliteCollection> {
    SqliteCollection::open(&settings.database)
        .with_context(|| format!("opening {:?}", settings.database))
}

/// Parse every rendered tiddler in `dir`, with a progress bar.
fn scan(dir: &Path) -> anyhow::Result<HashSet<TwNote>> {
    let paths = rendered_files(dir).with_context(|| format!("listing {:?}", dir))?;

    let pb = progress_bar();
    pb.set_length(paths.len() as u64);
    let mut progress = |done: usize, _total: usize| pb.set_position(done as u64);
    let notes = notes_from_paths(&paths, Some(&mut progress))?;
    pb.finish_and_clear();
    Ok(notes)
}

fn progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")
            .unwrap()
            .progress_chars("#>-"),
    );
    pb
}

fn summary(note: &TwNote) -> String {
    match &note.body {
        NoteBody::Question { question, .. } => format!("Q: {}", truncate(question, 60)),
        NoteBody::Cloze { text } => format!("C: {}", truncate(text, 60)),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}
