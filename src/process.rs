// ABOUTME: Subprocess execution for external CLIs (git, helm) with timeouts.
// ABOUTME: Captures output and scrubs secrets before anything is logged or returned.

use secrecy::{ExposeSecret, SecretString};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

const REDACTED: &str = "***";

/// Errors from running an external program.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("{program} is not installed or not on PATH")]
    NotFound { program: String },

    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("`{command}` timed out after {}s", .after.as_secs())]
    Timeout { command: String, after: Duration },

    #[error("`{command}` exited with code {}: {}", .exit_code.map_or_else(|| "none".to_string(), |c| c.to_string()), .stderr.trim())]
    Failed {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },
}

impl ProcessError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ProcessError::NotFound { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ProcessError::Timeout { .. })
    }
}

/// Captured output of a successful run.
#[derive(Debug, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// A single invocation of an external program.
pub struct ProcessCommand {
    program: String,
    args: Vec<String>,
    cwd: Option<PathBuf>,
    envs: Vec<(String, String)>,
    timeout: Duration,
    secrets: Vec<SecretString>,
}

impl ProcessCommand {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            envs: Vec::new(),
            timeout,
            secrets: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: &Path) -> Self {
        self.cwd = Some(dir.to_path_buf());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// Secrets to scrub from the logged command line and captured output.
    pub fn redact(mut self, secrets: impl IntoIterator<Item = SecretString>) -> Self {
        self.secrets.extend(secrets);
        self
    }

    /// Command line with secrets scrubbed, for logs and errors.
    pub fn display(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        self.scrub(&line)
    }

    fn scrub(&self, text: &str) -> String {
        redact(text, &self.secrets)
    }

    pub async fn run(self) -> Result<CommandOutput, ProcessError> {
        let command_line = self.display();
        tracing::debug!("Running {}", command_line);

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .envs(self.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(ref dir) = self.cwd {
            command.current_dir(dir);
        }

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Err(_) => {
                tracing::warn!("{} timed out after {:?}", command_line, self.timeout);
                return Err(ProcessError::Timeout {
                    command: command_line,
                    after: self.timeout,
                });
            }
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ProcessError::NotFound {
                    program: self.program.clone(),
                });
            }
            Ok(Err(e)) => {
                return Err(ProcessError::Spawn {
                    program: self.program.clone(),
                    source: e,
                });
            }
            Ok(Ok(output)) => output,
        };

        let stdout = self.scrub(&String::from_utf8_lossy(&output.stdout));
        let stderr = self.scrub(&String::from_utf8_lossy(&output.stderr));

        if output.status.success() {
            Ok(CommandOutput { stdout, stderr })
        } else {
            tracing::debug!(
                "{} failed with exit code {:?}",
                command_line,
                output.status.code()
            );
            // Some tools report failures on stdout only.
            let diagnostic = if stderr.trim().is_empty() { stdout } else { stderr };
            Err(ProcessError::Failed {
                command: command_line,
                exit_code: output.status.code(),
                stderr: diagnostic,
            })
        }
    }
}

/// Replace every occurrence of each secret (raw and percent-encoded) and any
/// URL userinfo with `***`.
pub fn redact(text: &str, secrets: &[SecretString]) -> String {
    let mut out = text.to_string();
    for secret in secrets {
        let raw = secret.expose_secret();
        if raw.is_empty() {
            continue;
        }
        out = out.replace(raw, REDACTED);
        let encoded = urlencoding::encode(raw);
        if encoded != raw {
            out = out.replace(encoded.as_ref(), REDACTED);
        }
    }
    scrub_userinfo(&out)
}

/// Strip `user:pass@` from anything that looks like a URL authority.
fn scrub_userinfo(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(idx) = rest.find("://") {
        let (head, tail) = rest.split_at(idx + 3);
        out.push_str(head);
        let authority_end = tail
            .find(|c: char| c == '/' || c.is_whitespace() || c == '\'' || c == '"')
            .unwrap_or(tail.len());
        let authority = &tail[..authority_end];
        match authority.rfind('@') {
            Some(at) if authority[..at] != *REDACTED => {
                out.push_str(REDACTED);
                out.push_str(&authority[at..]);
            }
            _ => out.push_str(authority),
        }
        rest = &tail[authority_end..];
    }
    out.push_str(rest);
    out
}
