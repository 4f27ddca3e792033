//! Debug plotting through a Python subprocess.

use crate::signal::multitaper::MtmCoherenceResult;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Errors raised by plot utilities.
#[derive(Debug, Error)]
pub enum PlotError {
    /// Underlying process or filesystem I/O failure.
    #[error("plot I/O failure: {0}")]
    Io(#[from] std::io::Error),
    /// Python subprocess stdin was unavailable.
    #[error("failed to open stdin for python plotting process")]
    StdinUnavailable,
    /// Python subprocess exited unsuccessfully.
    #[error("python plotting script failed with status: {0}")]
    PythonExitFailure(ExitStatus),
}

/// Matplotlib script drawing `result` into `output_path`.
///
/// The upper panel shows coherence against the confidence level with tick
/// marks spaced by the taper bandwidth; the lower panel shows phase with the
/// Monte Carlo band shaded when one was estimated.
pub fn coherence_plot_script(result: &MtmCoherenceResult, output_path: &Path) -> String {
    let (lower, upper) = result.phase_bounds();
    let ci = result.coherence_confidence.first().copied().unwrap_or(0.0);
    let output_path_literal = output_path.to_string_lossy().replace('\\', "\\\\");
    format!(
        r#"
import matplotlib
matplotlib.use("Agg")
import matplotlib.pyplot as plt
import numpy as np

s = np.array({s:?})
c = np.array({c:?})
ph = np.array({ph:?})
phl = np.array({phl:?})
phu = np.array({phu:?})
phi = np.array({phi:?})
ci = {ci:?}
w = {w:?}

fig, (ax0, ax1) = plt.subplots(2, 1, figsize=(10, 8))
ax0.plot(s, c)
ax0.axhline(ci, color="k", linestyle="--")
above = 100.0 * np.count_nonzero(c > ci) / max(len(c), 1)
ax0.set_title(f"mean is {mean:.2}   {{above:.0f}}% of estimates above {level:.0}% confidence level")
ax0.set_xlabel("frequency")
ax0.set_ylabel("coherence")
if len(s) > 0:
    ax0.set_xlim(s[0], s[-1])
    ax0.plot([s[0], s[-1]], [1.02, 1.02], "k")
    if w > 0:
        for ds in np.arange(s[-1], s[-1] + 2 * w, 2 * w):
            ax0.plot([ds, ds], [0.98, 1.02], "k")
ax0.set_ylim(0, 1.025)

if np.any(phi > 0):
    wrapped = phl > phu
    ax1.fill_between(s, phl, phu, where=~wrapped, color="0.9")
    ax1.fill_between(s, phl, 180.0, where=wrapped, color="0.9")
    ax1.fill_between(s, -180.0, phu, where=wrapped, color="0.9")
ax1.plot(s, ph)
ax1.axhline(0.0, color="k", linestyle="--")
ax1.set_ylim(-180, 180)
ax1.set_xlabel("frequency")
ax1.set_ylabel("phase")
fig.tight_layout()
fig.savefig(r"{path}", dpi=150)
plt.close(fig)
"#,
        s = result.frequencies,
        c = result.coherence,
        ph = result.phase,
        phl = lower,
        phu = upper,
        phi = result.phase_confidence,
        ci = ci,
        w = result.half_bandwidth,
        mean = result.mean_coherence(),
        level = significance_percent(result),
        path = output_path_literal,
    )
}

fn significance_percent(result: &MtmCoherenceResult) -> f64 {
    // ci = sqrt(1 - (1 - p)^(1 / (n - 1))), with n = dof rounded.
    let n = result.dof.round().max(2.0);
    match result.coherence_confidence.first() {
        Some(ci) => 100.0 * (1.0 - (1.0 - ci * ci).powf(n - 1.0)),
        None => 95.0,
    }
}

/// Render `result` with matplotlib and save it as a PNG.
///
/// Without an explicit path the image lands in `target/contracts/plots`.
/// Returns the output path when plotting succeeds.
pub fn python_plot_coherence<P: AsRef<Path>>(
    result: &MtmCoherenceResult,
    output_path: Option<P>,
) -> Result<PathBuf, PlotError> {
    let output_path = match output_path {
        Some(path) => path.as_ref().to_path_buf(),
        None => {
            let ts = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs();
            PathBuf::from(format!("target/contracts/plots/mtm_coherence_{ts}.png"))
        }
    };
    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let script = coherence_plot_script(result, &output_path);
    let mut python = std::process::Command::new("python")
        .stdin(std::process::Stdio::piped())
        .stdout(std::process::Stdio::null()) // noisy
        .stderr(std::process::Stdio::null()) // noisy
        .spawn()?;

    if let Some(mut stdin) = python.stdin.take() {
        stdin.write_all(script.as_bytes())?;
    } else {
        return Err(PlotError::StdinUnavailable);
    }

    let status = python.wait()?;
    if !status.success() {
        return Err(PlotError::PythonExitFailure(status));
    }
    Ok(output_path)
}
