// src/stages/command.rs

//! External tool stage.
//!
//! Each asset is piped through a shell command: contents on stdin, new
//! contents read from stdout. The file the asset was read from is exported
//! as `ASSETDAG_FILE` (falling back to the output path for generated
//! assets) and the output path as `ASSETDAG_OUTPUT`, so compilers that
//! resolve imports relative to the entry file can read it directly. A
//! non-zero exit fails the stage with the tool's stderr.

use std::process::Stdio;

use anyhow::{bail, Context, Result};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use super::{Asset, BoxFuture, Stage};

#[derive(Debug, Clone)]
pub struct CommandStage {
    cmd: String,
}

impl CommandStage {
    pub fn new(cmd: String) -> Self {
        Self { cmd }
    }

    fn shell(&self) -> Command {
        if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&self.cmd);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(&self.cmd);
            c
        }
    }

    async fn pipe(&self, mut asset: Asset) -> Result<Asset> {
        debug!(cmd = %self.cmd, file = %asset.rel.display(), "piping asset through command");

        let mut child = self
            .shell()
            .env("ASSETDAG_FILE", asset.source.as_deref().unwrap_or(asset.rel.as_path()))
            .env("ASSETDAG_OUTPUT", &asset.rel)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("spawning `{}`", self.cmd))?;

        let mut stdin = child.stdin.take().context("child stdin not captured")?;
        let input = std::mem::take(&mut asset.contents);
        // stdin is fed while stdout drains; a closed pipe is not an error.
        let writer = tokio::spawn(async move {
            let _ = stdin.write_all(&input).await;
        });

        let output = child
            .wait_with_output()
            .await
            .with_context(|| format!("waiting for `{}`", self.cmd))?;
        let _ = writer.await;

        if !output.status.success() {
            bail!(
                "`{}` failed on {} ({}): {}",
                self.cmd,
                asset.rel.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        asset.contents = output.stdout;
        Ok(asset)
    }
}

impl Stage for CommandStage {
    fn name(&self) -> &'static str {
        "command"
    }

    fn apply(&self, assets: Vec<Asset>) -> BoxFuture<'_, Result<Vec<Asset>>> {
        Box::pin(async move {
            let mut out = Vec::with_capacity(assets.len());
            for asset in assets {
                out.push(self.pipe(asset).await?);
            }
            Ok(out)
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replaces_contents_with_stdout() {
        let out = CommandStage::new("tr a-z A-Z".into())
            .apply(vec![Asset::new("a.txt", "hello")])
            .await
            .unwrap();
        assert_eq!(out[0].contents, b"HELLO");
    }

    #[tokio::test]
    async fn exports_source_and_output_paths() {
        let out = CommandStage::new("printf '%s|%s' \"$ASSETDAG_FILE\" \"$ASSETDAG_OUTPUT\"".into())
            .apply(vec![
                Asset::new("css/a.css", "").with_source("/src/less/a.less"),
                Asset::new("stack.svg", ""),
            ])
            .await
            .unwrap();
        assert_eq!(out[0].contents, b"/src/less/a.less|css/a.css");
        assert_eq!(out[1].contents, b"stack.svg|stack.svg");
    }

    #[tokio::test]
    async fn non_zero_exit_reports_stderr() {
        let err = CommandStage::new("echo broken >&2; exit 3".into())
            .apply(vec![Asset::new("a.txt", "x")])
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("broken"));
    }
}
