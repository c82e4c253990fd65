use std::{
    collections::{HashMap, VecDeque},
    process::Stdio,
    sync::{Mutex, PoisonError},
};

use snafu::{OptionExt, ResultExt, Snafu, ensure};
use tokio::io::AsyncWriteExt;

use super::Invocation;

/// The seam between step construction and subprocess execution.
///
/// The provisioning sequence only ever talks to a `CommandRunner`; the real
/// implementation spawns subprocesses, while [`DryRunRunner`] records the
/// invocations for `plan` output and for tests.
pub trait CommandRunner {
    /// Executes `invocation` and returns its trimmed standard output.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] if the process cannot be spawned, its stdin
    /// cannot be written, or it exits with a non-zero status.
    fn run(&self, invocation: Invocation) -> impl Future<Output = Result<String, Error>> + Send;
}

impl<R> CommandRunner for &R
where
    R: CommandRunner + Sync,
{
    async fn run(&self, invocation: Invocation) -> Result<String, Error> {
        (**self).run(invocation).await
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("Failed to spawn `{program}`, error: {source}"))]
    SpawnProcess { program: String, source: std::io::Error },

    #[snafu(display("Failed to open stdin of `{program}`"))]
    OpenStdin { program: String },

    #[snafu(display("Failed to write stdin of `{program}`, error: {source}"))]
    WriteStdin { program: String, source: std::io::Error },

    #[snafu(display("Failed to collect output of `{program}`, error: {source}"))]
    CollectOutput { program: String, source: std::io::Error },

    #[snafu(display(
        "`{command}` failed ({}): {stderr}",
        code.map_or_else(|| "terminated by signal".to_string(), |code| format!("exit code {code}"))
    ))]
    CommandFailed { command: String, code: Option<i32>, stderr: String },
}

/// Executes invocations as real subprocesses via [`tokio::process`].
///
/// Standard output and error are captured; a non-zero exit status is turned
/// into [`Error::CommandFailed`] carrying the captured stderr.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    async fn run(&self, invocation: Invocation) -> Result<String, Error> {
        tracing::debug!("running `{invocation}`");

        let program = invocation.program.clone();
        let mut child = tokio::process::Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(if invocation.stdin.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|_| SpawnProcessSnafu { program: program.clone() })?;

        if let Some(input) = &invocation.stdin {
            let mut stdin = child
                .stdin
                .take()
                .with_context(|| OpenStdinSnafu { program: program.clone() })?;
            stdin
                .write_all(input.as_bytes())
                .await
                .with_context(|_| WriteStdinSnafu { program: program.clone() })?;
            drop(stdin);
        }

        let output = child
            .wait_with_output()
            .await
            .with_context(|_| CollectOutputSnafu { program: program.clone() })?;

        ensure!(
            output.status.success(),
            CommandFailedSnafu {
                command: invocation.render(),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
        );

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// Records invocations instead of executing them.
///
/// Outputs are answered from scripted per-action queues; actions without a
/// scripted response fall back to a placeholder identifier so that dependent
/// steps still receive a usable value. The action key is the first two
/// arguments of the invocation (e.g. `ec2 create-subnet`).
#[derive(Debug, Default)]
pub struct DryRunRunner {
    responses: Mutex<HashMap<String, VecDeque<String>>>,
    recorded: Mutex<Vec<Invocation>>,
}

impl DryRunRunner {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Queues scripted outputs for an action key.
    // Only referenced from `#[cfg(test)]` code, so the non-test build sees it as dead.
    #[allow(dead_code)]
    #[must_use]
    pub fn respond_with<I, S>(self, action: &str, outputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        {
            let mut responses =
                self.responses.lock().unwrap_or_else(PoisonError::into_inner);
            let queue = responses.entry(action.to_string()).or_default();
            queue.extend(outputs.into_iter().map(Into::into));
        }
        self
    }

    /// Returns the invocations recorded so far, in execution order.
    #[must_use]
    pub fn recorded(&self) -> Vec<Invocation> {
        self.recorded.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn action_key(invocation: &Invocation) -> String {
        invocation.args.iter().take(2).map(String::as_str).collect::<Vec<_>>().join(" ")
    }

    fn placeholder_for(action: &str) -> String {
        match action {
            "ec2 create-vpc" => "<vpc-id>".to_string(),
            "ec2 create-subnet" => "<subnet-id>".to_string(),
            "ec2 create-security-group" => "<security-group-id>".to_string(),
            _ => String::new(),
        }
    }
}

impl CommandRunner for DryRunRunner {
    async fn run(&self, invocation: Invocation) -> Result<String, Error> {
        let action = Self::action_key(&invocation);
        self.recorded.lock().unwrap_or_else(PoisonError::into_inner).push(invocation);

        let scripted = self
            .responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(&action)
            .and_then(VecDeque::pop_front);
        Ok(scripted.unwrap_or_else(|| Self::placeholder_for(&action)))
    }
}

#[cfg(test)]
mod tests {
    use super::{CommandRunner, DryRunRunner, Invocation};

    #[tokio::test]
    async fn test_scripted_responses_are_consumed_in_order() {
        let runner =
            DryRunRunner::new().respond_with("ec2 create-subnet", ["subnet-a", "subnet-b"]);

        let first = runner
            .run(Invocation::new("aws", ["ec2", "create-subnet", "--cidr-block", "10.0.1.0/24"]))
            .await
            .unwrap();
        let second = runner
            .run(Invocation::new("aws", ["ec2", "create-subnet", "--cidr-block", "10.0.2.0/24"]))
            .await
            .unwrap();

        assert_eq!(first, "subnet-a");
        assert_eq!(second, "subnet-b");
        assert_eq!(runner.recorded().len(), 2);
    }

    #[tokio::test]
    async fn test_unscripted_capture_falls_back_to_placeholder() {
        let runner = DryRunRunner::new();
        let output = runner
            .run(Invocation::new("aws", ["ec2", "create-vpc", "--cidr-block", "10.0.0.0/16"]))
            .await
            .unwrap();
        assert_eq!(output, "<vpc-id>");
    }

    #[tokio::test]
    async fn test_non_capturing_action_yields_empty_output() {
        let runner = DryRunRunner::new();
        let output = runner
            .run(Invocation::new("kubectl", ["create", "namespace", "staging"]))
            .await
            .unwrap();
        assert!(output.is_empty());
    }
}
