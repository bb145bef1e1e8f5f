//! Desktop background integration.

use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;

use super::error::WallpaperError;

#[async_trait]
pub trait DesktopBackground: Send + Sync {
    /// Show the image at `path` as the desktop background.
    async fn apply(&self, path: &Path) -> Result<(), WallpaperError>;
}

/// Uses the platform's own tooling: `gsettings` on Linux (GNOME light and
/// dark keys), `osascript` on macOS.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemBackground;

#[async_trait]
impl DesktopBackground for SystemBackground {
    async fn apply(&self, path: &Path) -> Result<(), WallpaperError> {
        let path = path
            .to_str()
            .ok_or_else(|| WallpaperError::NonUtf8Path(path.to_path_buf()))?;

        if cfg!(target_os = "linux") {
            let uri = format!("file://{path}");
            for key in ["picture-uri", "picture-uri-dark"] {
                run(
                    "gsettings",
                    &["set", "org.gnome.desktop.background", key, &uri],
                )
                .await?;
            }
            Ok(())
        } else if cfg!(target_os = "macos") {
            let script = format!(
                "tell application \"System Events\" to tell every desktop to set picture to \"{}\"",
                path.replace('"', "\\\"")
            );
            run("osascript", &["-e", &script]).await
        } else {
            Err(WallpaperError::Unsupported(std::env::consts::OS))
        }
    }
}

async fn run(program: &'static str, args: &[&str]) -> Result<(), WallpaperError> {
    tracing::debug!(program, ?args, "Setting desktop background");
    let output = Command::new(program)
        .args(args)
        .output()
        .await
        .map_err(|source| WallpaperError::Spawn { program, source })?;
    if !output.status.success() {
        return Err(WallpaperError::Command {
            program,
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(())
}
