//! Video assembly and size-limited re-encoding
//!
//! Screencast frames are stitched into a WebM via the external `ffmpeg`
//! binary. The failure webhook caps attachments at roughly 5 MB, so large
//! videos are re-encoded down before upload; a missing or failing ffmpeg
//! downgrades gracefully to whatever artifact exists.

use std::path::{Path, PathBuf};

use schulgate_domain::constants::{VIDEO_HARD_LIMIT_BYTES, VIDEO_SOFT_LIMIT_BYTES};
use tokio::process::Command;
use tracing::{debug, warn};

/// Frame rate the screenshot sampler approximates
const FRAMERATE: &str = "4";

/// Stitch `frame_%06d.jpg` files into a WebM video.
///
/// Returns `None` when ffmpeg is unavailable or exits with an error; the
/// recording then ships without a video.
pub async fn assemble(frames_dir: &Path, output: &Path) -> Option<PathBuf> {
    let pattern = frames_dir.join("frame_%06d.jpg");

    let status = Command::new("ffmpeg")
        .arg("-y")
        .args(["-framerate", FRAMERATE])
        .arg("-i")
        .arg(&pattern)
        .args(["-c:v", "libvpx-vp9", "-b:v", "1M"])
        .arg(output)
        .output()
        .await;

    match status {
        Ok(out) if out.status.success() && output.exists() => {
            debug!(video = %output.display(), "session video assembled");
            Some(output.to_path_buf())
        }
        Ok(out) => {
            warn!(
                code = ?out.status.code(),
                stderr = %String::from_utf8_lossy(&out.stderr).chars().take(200).collect::<String>(),
                "ffmpeg failed to assemble session video"
            );
            None
        }
        Err(err) => {
            warn!(error = %err, "ffmpeg not available; skipping session video");
            None
        }
    }
}

/// Shrink a video under the webhook's attachment limit.
///
/// Videos at or under the soft limit pass through untouched. Larger ones are
/// re-encoded at reduced resolution and bitrate; if that still exceeds the
/// hard limit or ffmpeg fails, the original is returned and the upload is
/// left to fate.
pub async fn prepare_for_upload(video: &Path) -> PathBuf {
    let size = match std::fs::metadata(video) {
        Ok(meta) => meta.len(),
        Err(_) => return video.to_path_buf(),
    };
    if size <= VIDEO_SOFT_LIMIT_BYTES {
        return video.to_path_buf();
    }

    let compressed = video.with_file_name("session_compressed.webm");
    let status = Command::new("ffmpeg")
        .arg("-y")
        .arg("-i")
        .arg(video)
        .args(["-vf", "scale=-2:540", "-c:v", "libvpx-vp9", "-b:v", "400k"])
        .arg(&compressed)
        .output()
        .await;

    match status {
        Ok(out) if out.status.success() => {
            let fits = std::fs::metadata(&compressed)
                .map(|meta| meta.len() <= VIDEO_HARD_LIMIT_BYTES)
                .unwrap_or(false);
            if fits {
                debug!(original = size, "session video re-encoded for upload");
                return compressed;
            }
            warn!("re-encoded video still exceeds the attachment limit; sending original");
            video.to_path_buf()
        }
        _ => {
            warn!("ffmpeg re-encode failed; sending original video");
            video.to_path_buf()
        }
    }
}
