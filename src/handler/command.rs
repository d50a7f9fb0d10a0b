use crate::error::HandlerError;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Maximum captured bytes per stream before truncation.
const MAX_STREAM_BYTES: usize = 65_536;

/// Environment variables passed through to validation commands.
/// Only functional variables are included, never API keys or secrets.
const SAFE_ENV_VARS: &[&str] = &[
    "PATH", "HOME", "TERM", "LANG", "LC_ALL", "LC_CTYPE", "USER", "SHELL",
];

/// A configured validation command, run through `sh -c` from the project
/// root with a scrubbed environment. `{target}` and `{source}` in the
/// template are replaced with the artifact and source paths.
pub struct ValidationCommand {
    template: String,
    timeout: Duration,
    workdir: std::path::PathBuf,
}

/// What a finished (or killed) validation run produced.
pub struct CommandOutcome {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

impl CommandOutcome {
    pub fn passed(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }
}

impl ValidationCommand {
    pub fn new(template: impl Into<String>, timeout_secs: u64, workdir: impl AsRef<Path>) -> Self {
        Self {
            template: template.into(),
            timeout: Duration::from_secs(timeout_secs),
            workdir: workdir.as_ref().to_path_buf(),
        }
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout.as_secs()
    }

    fn render(&self, target: &Path, source: &Path) -> String {
        self.template
            .replace("{target}", &target.display().to_string())
            .replace("{source}", &source.display().to_string())
    }

    /// Run the command against one artifact. A non-zero exit or a timeout is
    /// a normal outcome; only failure to launch the process is an error.
    pub async fn run(
        &self,
        target: &Path,
        source: &Path,
    ) -> Result<CommandOutcome, HandlerError> {
        let rendered = self.render(target, source);
        debug!(command = %rendered, "running validation command");

        // Clear the environment so validator subprocesses never see API keys,
        // then re-add only functional variables.
        let mut cmd = tokio::process::Command::new("sh");
        cmd.arg("-c")
            .arg(&rendered)
            .current_dir(&self.workdir)
            .env_clear()
            .kill_on_drop(true);
        for var in SAFE_ENV_VARS {
            if let Ok(val) = std::env::var(var) {
                cmd.env(var, val);
            }
        }

        match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => Ok(CommandOutcome {
                exit_code: output.status.code(),
                stdout: capture(&output.stdout),
                stderr: capture(&output.stderr),
                timed_out: false,
            }),
            Ok(Err(err)) => Err(HandlerError::Command {
                message: format!("{rendered}: {err}"),
            }),
            Err(_) => Ok(CommandOutcome {
                exit_code: None,
                stdout: String::new(),
                stderr: String::new(),
                timed_out: true,
            }),
        }
    }
}

fn capture(bytes: &[u8]) -> String {
    let mut text = String::from_utf8_lossy(bytes).into_owned();
    if text.len() > MAX_STREAM_BYTES {
        let mut cut = MAX_STREAM_BYTES;
        while cut > 0 && !text.is_char_boundary(cut) {
            cut -= 1;
        }
        text.truncate(cut);
        text.push_str("\n... [truncated]");
    }
    text
}
