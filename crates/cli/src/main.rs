mod config;

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;
use ulog_explorer_core::model::{Session, Slot, is_derived, split_combined_name};
use ulog_explorer_core::report::{self, RecordingSummary};
use ulog_explorer_core::views::{markers, time_series, trajectory};

/// Inspect PX4 ULog flight recordings: metadata, messages, topics and derived
/// fields.
#[derive(Parser, Debug)]
#[command(name = "ulog-explorer")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (default: ./ulog-explorer.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log output on stderr (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Summary: start time, duration, dropouts, info messages, topic sizes
    Info {
        /// Log file, or a directory to take the newest .ulg from
        path: Option<PathBuf>,
        /// Include perf counters and full multi-info contents
        #[arg(long)]
        all: bool,
        /// Emit a JSON summary instead of text
        #[arg(long)]
        json: bool,
    },
    /// Logged text messages with timestamps
    Messages { path: Option<PathBuf> },
    /// Topic tables and their fields
    Topics {
        path: Option<PathBuf>,
        /// Only list computed fields
        #[arg(long)]
        derived_only: bool,
        /// Also list derivations that could not run
        #[arg(long)]
        skipped: bool,
    },
    /// Select curves and read values at a time or over a region
    Inspect {
        path: Option<PathBuf>,
        /// Curve as `topic->field`; repeatable
        #[arg(long = "field", short = 'f', required = true)]
        fields: Vec<String>,
        /// Second log to overlay
        #[arg(long)]
        compare: Option<PathBuf>,
        /// Marker time in seconds
        #[arg(long)]
        at: Option<f64>,
        /// Region of interest in seconds
        #[arg(long, num_args = 2, value_names = ["START", "END"])]
        roi: Option<Vec<f64>>,
        /// Rescale curves to [0, 1] in plot output
        #[arg(long)]
        rescale: bool,
        /// Print the plot commands as JSON
        #[arg(long)]
        plot: bool,
        /// Include the trajectory map in plot output
        #[arg(long)]
        trajectory: bool,
    },
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();
}

fn open(session: &mut Session, slot: Slot, path: &Path) -> Result<()> {
    session
        .load(slot, path)
        .with_context(|| format!("could not open {}", path.display()))
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);
    let cfg = config::load(args.config.as_deref())?;
    debug!(?cfg, "configuration loaded");

    let mut out = std::io::stdout().lock();
    let mut session = Session::new();

    match args.command {
        Command::Info { path, all, json } => {
            let path = config::resolve_log(path.as_deref(), &cfg)?;
            open(&mut session, Slot::Primary, &path)?;
            let Some(recording) = session.recording(Slot::Primary) else {
                bail!("no recording loaded");
            };
            if json {
                serde_json::to_writer_pretty(&mut out, &RecordingSummary::new(recording))?;
                writeln!(out)?;
            } else {
                write!(out, "{}", report::render_info(recording, all || cfg.verbose_info))?;
            }
        }
        Command::Messages { path } => {
            let path = config::resolve_log(path.as_deref(), &cfg)?;
            open(&mut session, Slot::Primary, &path)?;
            if let Some(recording) = session.recording(Slot::Primary) {
                write!(out, "{}", report::render_messages(recording))?;
            }
        }
        Command::Topics {
            path,
            derived_only,
            skipped,
        } => {
            let path = config::resolve_log(path.as_deref(), &cfg)?;
            open(&mut session, Slot::Primary, &path)?;
            let Some(recording) = session.recording(Slot::Primary) else {
                bail!("no recording loaded");
            };
            for (name, table) in &recording.tables {
                let fields: Vec<&str> = table
                    .field_names()
                    .filter(|f| !derived_only || is_derived(f) || is_derived(name))
                    .collect();
                if fields.is_empty() {
                    continue;
                }
                writeln!(out, "{name} ({} rows)", table.len())?;
                for field in fields {
                    writeln!(out, "  {field}")?;
                }
            }
            if skipped {
                for s in &recording.skipped {
                    writeln!(out, "skipped {}: {}", s.derivation, s.reason)?;
                }
            }
        }
        Command::Inspect {
            path,
            fields,
            compare,
            at,
            roi,
            rescale,
            plot,
            trajectory,
        } => {
            let path = config::resolve_log(path.as_deref(), &cfg)?;
            open(&mut session, Slot::Primary, &path)?;
            if let Some(other) = compare {
                open(&mut session, Slot::Secondary, &other)?;
            }

            for name in &fields {
                let Some((topic, field)) = split_combined_name(name) else {
                    bail!("`{name}` is not of the form topic->field");
                };
                if let Err(err) = session.add_selected(topic, field) {
                    eprintln!("skipping {name}: {err}");
                }
            }
            if cfg.bold {
                session.toggle_bold();
            }
            if rescale {
                session.toggle_rescale();
            }

            if let Some(t) = at {
                for slot in Slot::ALL {
                    session.set_marker(slot, t);
                    session.toggle_marker(slot);
                }
            }
            if let Some([start, end]) = roi.as_deref().and_then(|r| <[f64; 2]>::try_from(r).ok()) {
                for slot in Slot::ALL {
                    session.set_roi(slot, start, end);
                    session.toggle_roi(slot);
                }
            }

            for (slot, loaded) in session.loaded() {
                writeln!(out, "[{slot:?}] {}", loaded.recording.title)?;
                if loaded.display.marker.visible {
                    let label = markers::marker_label(
                        &loaded.recording,
                        session.selection(),
                        loaded.display.marker.position,
                    );
                    writeln!(out, "{label}")?;
                }
                if loaded.display.roi.visible {
                    for stats in markers::roi_statistics(
                        &loaded.recording,
                        session.selection(),
                        loaded.display.roi.range,
                    ) {
                        match stats.slope {
                            Some(slope) => writeln!(out, "{} mean: {} diff: {slope}", stats.name, stats.mean)?,
                            None => writeln!(out, "{} mean: {}", stats.name, stats.mean)?,
                        }
                    }
                }
            }

            if plot {
                if trajectory {
                    session.toggle_trajectory();
                }
                let mut commands = time_series::render_frame(&mut session);
                commands.extend(trajectory::render_trajectory(&session));
                serde_json::to_writer_pretty(&mut out, &commands)?;
                writeln!(out)?;
            }
        }
    }
    Ok(())
}
