use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;

static BUILD_QUAKESTACK: OnceLock<Result<(), String>> = OnceLock::new();

/// Variables the binary reads; always cleared so the host environment cannot
/// leak into a run.
const CONFIG_VARS: [&str; 5] = [
    "BRANCH_NAME",
    "CDK_DEFAULT_ACCOUNT",
    "CDK_DEFAULT_REGION",
    "DATADOG_API_KEY",
    "QUAKESTACK_LOG",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    pub command_line: String,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl RunResult {
    #[must_use]
    pub fn transcript(&self) -> String {
        format!(
            "$ {}\n[exit: {}]\n[stdout]\n{}[stderr]\n{}",
            self.command_line, self.exit_code, self.stdout, self.stderr
        )
    }
}

/// Run `quakestack synth` as an external process with `workdir` as its
/// current directory.
///
/// `NO_PAGER=1` is always set to keep output deterministic for assertions.
///
/// # Errors
///
/// Returns an error if building/running the `quakestack` binary fails.
pub fn run_synth(
    workdir: &Path,
    flags: &[&str],
    env_overrides: &[(&str, &str)],
) -> Result<RunResult, String> {
    ensure_quakestack_built()?;
    let bin = quakestack_bin()?;

    let mut command = Command::new(bin);
    command.current_dir(workdir);
    command.env("NO_PAGER", "1");
    for name in CONFIG_VARS {
        command.env_remove(name);
    }
    command.arg("synth");
    command.args(flags);

    let mut command_parts: Vec<String> = env_overrides
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect();
    command_parts.push("quakestack".to_string());
    command_parts.push("synth".to_string());
    command_parts.extend(flags.iter().map(|flag| (*flag).to_string()));

    for (name, value) in env_overrides {
        command.env(name, value);
    }

    let output = command
        .output()
        .map_err(|error| format!("failed to run quakestack synth: {error}"))?;

    Ok(RunResult {
        command_line: command_parts.join(" "),
        exit_code: output.status.code().unwrap_or(1),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

fn ensure_quakestack_built() -> Result<(), String> {
    match BUILD_QUAKESTACK.get_or_init(|| {
        let status = Command::new("cargo")
            .arg("build")
            .arg("-q")
            .arg("-p")
            .arg("quakestack")
            .status()
            .map_err(|error| format!("failed to build quakestack binary: {error}"))?;

        if status.success() {
            Ok(())
        } else {
            Err(format!(
                "failed to build quakestack binary: cargo exited with status {status}"
            ))
        }
    }) {
        Ok(()) => Ok(()),
        Err(error) => Err(error.clone()),
    }
}

fn quakestack_bin() -> Result<PathBuf, String> {
    let mut path = std::env::current_exe()
        .map_err(|error| format!("failed to determine current executable: {error}"))?;
    if !path.pop() {
        return Err("failed to resolve test executable directory".to_string());
    }
    if path.ends_with("deps") {
        let _ = path.pop();
    }
    Ok(path.join(format!("quakestack{}", std::env::consts::EXE_SUFFIX)))
}
