//! Reading the three versions of an unmerged notebook from the git index.
//!
//! During a conflicted merge git keeps up to three index entries per path:
//! stage 1 (base), stage 2 (ours, the current side) and stage 3 (theirs, the
//! incoming side). An add/add conflict has no stage 1, and a modify/delete
//! conflict lacks stage 2 or 3; a missing stage becomes `None`.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::MergeError;
use crate::model::{Side, ThreeWayNotebooks};

/// Raw text of each stage of an unmerged path.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ThreeWayVersions {
    /// Stage 1.
    pub base: Option<String>,
    /// Stage 2 ("ours").
    pub current: Option<String>,
    /// Stage 3 ("theirs").
    pub incoming: Option<String>,
}

impl ThreeWayVersions {
    /// Parse every present stage; see [`ThreeWayNotebooks::from_texts`].
    #[must_use]
    pub fn parse(&self) -> ThreeWayNotebooks {
        ThreeWayNotebooks::from_texts(
            self.base.as_deref(),
            self.current.as_deref(),
            self.incoming.as_deref(),
        )
    }
}

const fn stage_of(side: Side) -> u8 {
    match side {
        Side::Base => 1,
        Side::Current => 2,
        Side::Incoming => 3,
    }
}

/// Read stages 1-3 of `path` (relative to `repo_root`) from the index.
///
/// # Errors
/// Returns [`MergeError::Git`] if git fails or `path` has no unmerged stages,
/// [`MergeError::Io`] if git cannot be spawned, and [`MergeError::Parse`] if a
/// stage is not UTF-8.
pub fn three_way_versions(repo_root: &Path, path: &Path) -> Result<ThreeWayVersions, MergeError> {
    let path_str = path.to_string_lossy();
    let listing = git_stdout(repo_root, &["ls-files", "--unmerged", "--", &path_str])?;
    let stages = parse_unmerged_stages(&listing);
    if stages.is_empty() {
        return Err(MergeError::Git {
            command: format!("git ls-files --unmerged -- {path_str}"),
            stderr: format!("'{path_str}' has no unmerged index entries"),
        });
    }

    let mut versions = ThreeWayVersions::default();
    for side in Side::ALL {
        let stage = stage_of(side);
        if !stages.contains(&stage) {
            tracing::debug!(path = %path_str, stage, "stage absent from index");
            continue;
        }
        let spec = format!(":{stage}:{path_str}");
        let bytes = git_bytes(repo_root, &["show", &spec])?;
        let text = String::from_utf8(bytes).map_err(|e| MergeError::Parse {
            side,
            source: e.into(),
        })?;
        match side {
            Side::Base => versions.base = Some(text),
            Side::Current => versions.current = Some(text),
            Side::Incoming => versions.incoming = Some(text),
        }
    }
    Ok(versions)
}

/// Unmerged `*.ipynb` paths, relative to `repo_root`, in git's order.
///
/// # Errors
/// Returns [`MergeError::Git`] if git fails and [`MergeError::Io`] if it
/// cannot be spawned.
pub fn unmerged_notebooks(repo_root: &Path) -> Result<Vec<PathBuf>, MergeError> {
    let out = git_stdout(repo_root, &["diff", "--name-only", "--diff-filter=U"])?;
    let mut paths: Vec<PathBuf> = Vec::new();
    for line in out.lines().map(str::trim).filter(|l| l.ends_with(".ipynb")) {
        let p = PathBuf::from(line);
        if !paths.contains(&p) {
            paths.push(p);
        }
    }
    Ok(paths)
}

/// Stage numbers from `git ls-files --unmerged` output.
///
/// Each line has the form `<mode> <object> <stage>\t<path>`.
fn parse_unmerged_stages(output: &str) -> Vec<u8> {
    let mut stages: Vec<u8> = output
        .lines()
        .filter_map(|line| {
            let (meta, _path) = line.split_once('\t')?;
            meta.split_whitespace().nth(2)?.parse().ok()
        })
        .collect();
    stages.sort_unstable();
    stages.dedup();
    stages
}

fn git_stdout(dir: &Path, args: &[&str]) -> Result<String, MergeError> {
    let bytes = git_bytes(dir, args)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Run a git command in `dir` and return raw stdout, or a [`MergeError`].
fn git_bytes(dir: &Path, args: &[&str]) -> Result<Vec<u8>, MergeError> {
    let out = Command::new("git").args(args).current_dir(dir).output()?;
    if out.status.success() {
        Ok(out.stdout)
    } else {
        Err(MergeError::Git {
            command: format!("git {}", args.join(" ")),
            stderr: String::from_utf8_lossy(&out.stderr).trim().to_owned(),
        })
    }
}
