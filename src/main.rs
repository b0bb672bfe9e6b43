use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context as _, Result};
use clap::{Args, Parser, Subcommand};

use nbmerge::format::{OutputFormat, Report, render_paths};
use nbmerge::merge::{MergeAnalysis, analyze};
use nbmerge::model::ThreeWayNotebooks;
use nbmerge::{NbMergeConfig, Settings, git, telemetry};

/// Three-way, cell-aware merge for Jupyter notebooks
///
/// Aligns the cells of a base, current and incoming notebook, classifies
/// what diverged (added, deleted, modified, reordered cells, and metadata,
/// execution-count or output drift) and auto-resolves the trivial cases.
///
/// EXIT CODES:
///   0  no conflicts left
///   1  conflicts need manual resolution
///   2  error
///
/// LOGGING:
///   NBMERGE_LOG=debug          filter directive (default: warn)
///   NBMERGE_LOG_FORMAT=json    JSON log lines on stderr
#[derive(Parser)]
#[command(name = "nbmerge")]
#[command(version, about)]
#[command(propagate_version = true)]
#[command(after_help = "See 'nbmerge <command> --help' for more information on a specific command.")]
struct Cli {
    /// Path to an nbmerge.toml; a missing file means defaults
    #[arg(long, global = true, env = "NBMERGE_CONFIG", default_value = "nbmerge.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report alignment, conflicts and auto-resolutions for three notebooks
    ///
    /// Pass '-' for a version that does not exist (e.g. no common base).
    Analyze {
        #[command(flatten)]
        inputs: Inputs,

        /// Output format
        #[arg(long, value_enum, default_value_t, ignore_case = true)]
        format: OutputFormat,
    },

    /// Write the auto-resolved notebook
    ///
    /// The result is the current version (incoming when current is absent)
    /// with trivial conflicts resolved. Edits made only on the incoming side
    /// are not merged in; remaining conflicts are listed on stderr.
    Resolve {
        #[command(flatten)]
        inputs: Inputs,

        /// Where to write the notebook (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Analyze an unmerged notebook straight from the git index
    Git {
        /// Notebook path relative to the repository root
        #[arg(required_unless_present = "list")]
        path: Option<PathBuf>,

        /// List unmerged notebooks instead
        #[arg(long)]
        list: bool,

        /// Repository root
        #[arg(long, default_value = ".")]
        repo: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value_t, ignore_case = true)]
        format: OutputFormat,
    },
}

#[derive(Args)]
struct Inputs {
    /// Common ancestor, or '-'
    base: PathBuf,
    /// Local version ("ours"), or '-'
    current: PathBuf,
    /// Version being merged in ("theirs"), or '-'
    incoming: PathBuf,
}

impl Inputs {
    fn load(&self) -> Result<ThreeWayNotebooks> {
        let base = read_side(&self.base)?;
        let current = read_side(&self.current)?;
        let incoming = read_side(&self.incoming)?;
        Ok(ThreeWayNotebooks::from_texts(
            base.as_deref(),
            current.as_deref(),
            incoming.as_deref(),
        ))
    }
}

fn read_side(path: &Path) -> Result<Option<String>> {
    if path.as_os_str() == "-" {
        return Ok(None);
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read notebook {}", path.display()))?;
    Ok(Some(text))
}

fn main() -> ExitCode {
    telemetry::init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}

/// Returns whether the merge is clean.
fn run(cli: Cli) -> Result<bool> {
    let settings = NbMergeConfig::load(&cli.config)
        .map_err(nbmerge::MergeError::from)
        .context("failed to load configuration")?
        .settings();

    match cli.command {
        Commands::Analyze { inputs, format } => {
            let notebooks = inputs.load()?;
            let analysis = run_analysis(&notebooks, &settings)?;
            print!("{}", Report::new(&analysis, &notebooks.failures).render(format)?);
            Ok(analysis.is_clean())
        }
        Commands::Resolve { inputs, output } => {
            let notebooks = inputs.load()?;
            for failure in &notebooks.failures {
                eprintln!("warning: {failure}");
            }
            let analysis = run_analysis(&notebooks, &settings)?;
            let text = nbmerge_format::serialize_notebook(&analysis.resolution.resolved_notebook)
                .context("failed to serialize resolved notebook")?;
            match output {
                Some(path) => std::fs::write(&path, text)
                    .with_context(|| format!("failed to write {}", path.display()))?,
                None => print!("{text}"),
            }
            for conflict in &analysis.resolution.remaining_conflicts {
                eprintln!("conflict: {}", conflict.summary());
            }
            Ok(analysis.is_clean())
        }
        Commands::Git {
            path,
            list,
            repo,
            format,
        } => {
            if list {
                let paths = git::unmerged_notebooks(&repo)?;
                print!("{}", render_paths(&paths, format)?);
                return Ok(paths.is_empty());
            }
            let Some(path) = path else {
                anyhow::bail!("a notebook path is required unless --list is given");
            };
            let notebooks = git::three_way_versions(&repo, &path)
                .with_context(|| format!("failed to read {} from the git index", path.display()))?
                .parse();
            let analysis = run_analysis(&notebooks, &settings)?;
            print!("{}", Report::new(&analysis, &notebooks.failures).render(format)?);
            Ok(analysis.is_clean())
        }
    }
}

fn run_analysis(notebooks: &ThreeWayNotebooks, settings: &Settings) -> Result<MergeAnalysis> {
    analyze(notebooks.versions(), settings).context("cannot merge notebook versions")
}
