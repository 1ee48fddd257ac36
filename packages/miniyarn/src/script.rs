use std::{collections::BTreeMap, process::Output};

use miniyarn_primitives::PackageLocator;
use miniyarn_utils::{Path, ToFileString};
use tokio::process::Command;

use crate::error::Error;

#[derive(Debug)]
pub enum ScriptResult {
    Success(Output),
    Failure(Output, String),
}

impl ScriptResult {
    pub fn new(output: Output, shell_line: String) -> Self {
        if output.status.success() {
            Self::Success(output)
        } else {
            Self::Failure(output, shell_line)
        }
    }

    pub fn success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn output(self) -> Output {
        match self {
            Self::Success(output) => output,
            Self::Failure(output, _) => output,
        }
    }

    pub fn stdout_text(self) -> String {
        String::from_utf8_lossy(&self.output().stdout)
            .trim()
            .to_string()
    }
}

/// Describes how to spawn a child process: its working directory, extra
/// variables, and the directories to put first on its PATH.
#[derive(Clone, Debug, Default)]
pub struct ScriptEnvironment {
    cwd: Option<Path>,
    env: BTreeMap<String, String>,
    bin_dirs: Vec<Path>,
}

impl ScriptEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cwd(mut self, cwd: Path) -> Self {
        self.cwd = Some(cwd);
        self
    }

    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env.extend(env);
        self
    }

    pub fn with_env_variable(mut self, key: &str, value: &str) -> Self {
        self.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_bin_dir(mut self, bin_dir: Path) -> Self {
        self.bin_dirs.push(bin_dir);
        self
    }

    fn make_path(&self) -> String {
        let mut path_entries = self.bin_dirs.iter()
            .map(|bin_dir| bin_dir.to_file_string())
            .collect::<Vec<_>>();

        if let Ok(current_path) = std::env::var("PATH") {
            path_entries.push(current_path);
        }

        path_entries.join(":")
    }

    pub async fn run_exec<I, S>(&self, program: &str, args: I) -> Result<ScriptResult, Error> where I: IntoIterator<Item = S>, S: AsRef<str> {
        let args = args.into_iter()
            .map(|arg| arg.as_ref().to_string())
            .collect::<Vec<_>>();

        let shell_line
            = std::iter::once(program.to_string()).chain(args.iter().cloned()).collect::<Vec<_>>().join(" ");

        let mut cmd
            = Command::new(program);

        cmd.args(&args);
        cmd.envs(&self.env);
        cmd.kill_on_drop(true);
        cmd.env("PATH", self.make_path());

        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd.to_path_buf());
        }

        log::debug!("Running {}", shell_line);

        let output
            = cmd.output().await?;

        Ok(ScriptResult::new(output, shell_line))
    }

    pub async fn run_script(&self, script: &str) -> Result<ScriptResult, Error> {
        self.run_exec("sh", ["-c", script]).await
    }
}

/// The `.bin` folders a package can see, from its own up to the project's.
fn visible_bin_dirs(package_path: &Path) -> Vec<Path> {
    let mut bin_dirs
        = vec![];

    let mut current
        = Some(package_path.clone());

    while let Some(dir) = current {
        if dir.basename() != Some("node_modules") {
            bin_dirs.push(dir.with_join_str("node_modules/.bin"));
        }

        if !dir.as_str().split('/').any(|segment| segment == "node_modules") {
            break;
        }

        current = dir.dirname();
    }

    bin_dirs
}

/// Runs one of the lifecycle scripts of an installed package from within its
/// directory, with the binaries of its dependencies reachable from PATH.
pub async fn run_lifecycle_script(locator: &PackageLocator, package_path: &Path, script_name: &str, script: &str) -> Result<(), Error> {
    log::info!("Running the {} script of {}", script_name, locator);

    let mut script_env = ScriptEnvironment::new()
        .with_cwd(package_path.clone());

    for bin_dir in visible_bin_dirs(package_path) {
        script_env = script_env.with_bin_dir(bin_dir);
    }

    let result = script_env
        .with_env_variable("npm_lifecycle_event", script_name)
        .with_env_variable("npm_lifecycle_script", script)
        .run_script(script)
        .await?;

    match result {
        ScriptResult::Success(output) => {
            log::debug!("{}", String::from_utf8_lossy(&output.stdout).trim_end());
            Ok(())
        },

        ScriptResult::Failure(output, _) => Err(Error::LifecycleScriptFailed {
            locator: locator.to_file_string(),
            script_name: script_name.to_string(),
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use miniyarn_primitives::Ident;
    use miniyarn_utils::FromFileString;

    use super::*;

    #[tokio::test]
    async fn test_lifecycle_script_environment() {
        let package_path = Path::temp_dir().unwrap();
        let bin_dir = package_path.with_join_str("node_modules/.bin");

        bin_dir.fs_create_dir_all().unwrap();
        bin_dir.with_join_str("greet")
            .fs_write_text("#!/bin/sh\necho hello > greeting.txt\n").unwrap()
            .fs_set_executable().unwrap();

        let locator = PackageLocator::new(Ident::new("pkg"), "1.0.0");
        run_lifecycle_script(&locator, &package_path, "install", "greet && echo $npm_lifecycle_event >> greeting.txt").await.unwrap();

        assert_eq!(package_path.with_join_str("greeting.txt").fs_read_text().unwrap(), "hello\ninstall\n");
    }

    #[test]
    fn test_visible_bin_dirs() {
        let package_path = Path::from_file_string("/project/node_modules/a/node_modules/b").unwrap();

        let bin_dirs = visible_bin_dirs(&package_path).into_iter()
            .map(|bin_dir| bin_dir.to_file_string())
            .collect::<Vec<_>>();

        assert_eq!(bin_dirs, vec![
            "/project/node_modules/a/node_modules/b/node_modules/.bin",
            "/project/node_modules/a/node_modules/.bin",
            "/project/node_modules/.bin",
        ]);
    }

    #[tokio::test]
    async fn test_lifecycle_script_failure() {
        let package_path = Path::temp_dir().unwrap();
        let locator = PackageLocator::new(Ident::new("pkg"), "1.0.0");

        let result = run_lifecycle_script(&locator, &package_path, "postinstall", "echo broken >&2; exit 3").await;

        match result {
            Err(Error::LifecycleScriptFailed {script_name, code, stderr, ..}) => {
                assert_eq!(script_name, "postinstall");
                assert_eq!(code, Some(3));
                assert_eq!(stderr.trim(), "broken");
            },
            other => panic!("unexpected result: {other:?}"),
        }
    }

    fn process_state(pid: &str) -> Option<char> {
        let stat = Path::from_file_string(&format!("/proc/{}/stat", pid)).unwrap()
            .fs_read_text()
            .ok()?;

        stat.rsplit(')').next()?.trim_start().chars().next()
    }

    #[tokio::test]
    async fn test_cancelled_script_is_killed() {
        let cwd = Path::temp_dir().unwrap();
        let pid_path = cwd.with_join_str("pid");

        let script_env = ScriptEnvironment::new()
            .with_cwd(cwd.clone());

        let result = tokio::time::timeout(
            std::time::Duration::from_millis(500),
            script_env.run_script("echo $$ > pid; exec sleep 30"),
        ).await;

        assert!(result.is_err());

        tokio::time::sleep(std::time::Duration::from_millis(200)).await;

        let pid = pid_path.fs_read_text().unwrap();
        let state = process_state(pid.trim());

        assert!(matches!(state, None | Some('Z') | Some('X')), "process {} is still {:?}", pid.trim(), state);
    }

    #[tokio::test]
    async fn test_run_exec_captures_stdout() {
        let result = ScriptEnvironment::new()
            .run_exec("echo", ["one", "two"])
            .await
            .unwrap();

        assert!(result.success());
        assert_eq!(result.stdout_text(), "one two");
    }
}
