//! Front/back fisheye pairing and external stitcher invocation.
//!
//! Dual-lens rigs write two mirrored directory trees, one per lens, with the
//! lens encoded as a token in directory names (`GFRNT`/`GBACK` on GoPro
//! Fusion) and as a letter prefix in filenames (`GF012345.JPG` /
//! `GB012345.JPG`). Pairing is pure path-token substitution; no table
//! matching or time math happens here.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;
use walkdir::WalkDir;

/// Default directory token identifying the front-lens tree.
pub const DEFAULT_FRONT_TOKEN: &str = "GFRNT";
/// Default directory token identifying the back-lens tree.
pub const DEFAULT_BACK_TOKEN: &str = "GBACK";

/// One front/back pair plus the output path the stitched image goes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StitchJob {
    pub front: PathBuf,
    pub back: PathBuf,
    pub output: PathBuf,
}

/// Discover stitchable front/back pairs.
///
/// Walks `front_dir` for JPEG files and derives each back-image path by
/// substituting `back_token` for `front_token` in the relative directory and
/// in the filename. Fronts with no back counterpart on disk are skipped with
/// a warning. Output paths mirror the front tree under `output_dir` with the
/// front token stripped from directory names.
pub fn pair_front_back(
    front_dir: &Path,
    back_dir: &Path,
    output_dir: &Path,
    front_token: &str,
    back_token: &str,
) -> Vec<StitchJob> {
    let mut jobs = Vec::new();

    for entry in WalkDir::new(front_dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let front = entry.path();
        if !front.is_file() || !is_jpeg(front) {
            continue;
        }
        let relative = match front.strip_prefix(front_dir) {
            Ok(rel) => rel,
            Err(_) => continue,
        };

        let back = back_dir.join(swap_tokens(relative, front_token, back_token));
        if !back.is_file() {
            log::warn!("No back image for {}, skipping", front.display());
            continue;
        }

        let output = output_dir.join(strip_token(relative, front_token));
        jobs.push(StitchJob {
            front: front.to_path_buf(),
            back,
            output,
        });
    }

    jobs
}

/// Run the external stitching executable for one pair.
///
/// The output directory is created first; the stitcher is expected to write
/// `job.output` itself and exit non-zero on failure.
pub fn run_stitcher(stitcher: &Path, job: &StitchJob) -> Result<()> {
    if let Some(parent) = job.output.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory {}", parent.display()))?;
    }

    let status = Command::new(stitcher)
        .arg("--front")
        .arg(&job.front)
        .arg("--back")
        .arg(&job.back)
        .arg("--output")
        .arg(&job.output)
        .arg("--iq")
        .arg("1")
        .status()
        .with_context(|| format!("Failed to launch stitcher {}", stitcher.display()))?;

    if !status.success() {
        anyhow::bail!(
            "Stitcher exited with {status} for {}",
            job.front.display()
        );
    }
    Ok(())
}

fn is_jpeg(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"))
        .unwrap_or(false)
}

/// Replace the front token with the back token in every path component.
///
/// Directory names carry the full token; filenames carry its two-letter
/// prefix form (`GF…` → `GB…`).
fn swap_tokens(relative: &Path, front_token: &str, back_token: &str) -> PathBuf {
    let front_prefix = prefix_of(front_token);
    let back_prefix = prefix_of(back_token);

    relative
        .iter()
        .map(|component| {
            let name = component.to_string_lossy();
            if name.contains(front_token) {
                name.replace(front_token, back_token)
            } else if let Some(rest) = name.strip_prefix(&front_prefix) {
                format!("{back_prefix}{rest}")
            } else {
                name.into_owned()
            }
        })
        .collect()
}

/// Remove the front token from directory names for the output tree.
fn strip_token(relative: &Path, front_token: &str) -> PathBuf {
    relative
        .iter()
        .map(|component| component.to_string_lossy().replace(front_token, ""))
        .filter(|name| !name.is_empty())
        .collect()
}

/// The filename prefix form of a lens token: its first two characters.
fn prefix_of(token: &str) -> String {
    token.chars().take(2).collect()
}
