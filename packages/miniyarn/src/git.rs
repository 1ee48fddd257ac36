use std::collections::BTreeMap;

use miniyarn_utils::Path;

use crate::{archive, error::Error, script::{ScriptEnvironment, ScriptResult}};

fn make_git_env() -> BTreeMap<String, String> {
    let mut env = BTreeMap::new();

    env.insert("GIT_TERMINAL_PROMPT".to_string(), "0".to_string());

    if let Err(std::env::VarError::NotPresent) = std::env::var("GIT_SSH_COMMAND") {
        let ssh = std::env::var("GIT_SSH").unwrap_or("ssh".to_string());
        let ssh_command = format!("{} -o BatchMode=yes", ssh);

        env.insert("GIT_SSH_COMMAND".to_string(), ssh_command);
    }

    env
}

async fn run_git(cwd: Option<&Path>, args: &[&str]) -> Result<ScriptResult, Error> {
    let mut script_env = ScriptEnvironment::new()
        .with_env(make_git_env());

    if let Some(cwd) = cwd {
        script_env = script_env.with_cwd(cwd.clone());
    }

    script_env.run_exec("git", args).await
}

async fn run_git_ok(cwd: Option<&Path>, args: &[&str]) -> Result<ScriptResult, Error> {
    match run_git(cwd, args).await? {
        ScriptResult::Failure(output, shell_line) => Err(Error::GitError {
            command: shell_line,
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }),

        result => Ok(result),
    }
}

pub fn is_commit_hash(treeish: &str) -> bool {
    treeish.len() == 40 && treeish.chars().all(|c| c.is_ascii_hexdigit())
}

pub async fn ls_remote(url: &str) -> Result<BTreeMap<String, String>, Error> {
    let output
        = run_git_ok(None, &["ls-remote", url]).await?.stdout_text();

    let mut refs = BTreeMap::new();

    for line in output.lines() {
        let mut parts = line.split_whitespace();

        if let (Some(hash), Some(name)) = (parts.next(), parts.next()) {
            refs.insert(name.to_string(), hash.to_string());
        }
    }

    Ok(refs)
}

/// Turns a branch, tag, or `HEAD` into the commit it currently points to.
/// Commit hashes are returned as-is.
pub async fn resolve_treeish(url: &str, treeish: &str) -> Result<String, Error> {
    if is_commit_hash(treeish) {
        return Ok(treeish.to_lowercase());
    }

    let refs
        = ls_remote(url).await?;

    let candidates = match treeish {
        "HEAD" => vec!["HEAD".to_string()],
        _ => vec![
            format!("refs/tags/{}^{{}}", treeish),
            format!("refs/tags/{}", treeish),
            format!("refs/heads/{}", treeish),
            treeish.to_string(),
        ],
    };

    candidates.iter()
        .find_map(|candidate| refs.get(candidate))
        .cloned()
        .ok_or_else(|| Error::GitReferenceNotFound(format!("{}#{}", url, treeish)))
}

/// Asks the remote for a ready-made archive. Most hosting providers disable
/// this, hence the clone fallback.
async fn fetch_via_archive(url: &str, treeish: &str) -> Result<Vec<u8>, Error> {
    let remote_arg
        = format!("--remote={}", url);

    let output
        = run_git_ok(None, &["archive", "--format=tar.gz", &remote_arg, treeish]).await?.output();

    Ok(output.stdout)
}

async fn fetch_via_clone(url: &str, treeish: &str, clone_dir: &Path) -> Result<Vec<u8>, Error> {
    clone_dir.fs_create_dir_all()?;

    run_git_ok(Some(clone_dir), &["init", "--quiet"]).await?;
    run_git_ok(Some(clone_dir), &["remote", "add", "origin", url]).await?;

    let shallow_fetch
        = run_git(Some(clone_dir), &["fetch", "--depth", "1", "origin", treeish]).await?;

    if shallow_fetch.success() {
        run_git_ok(Some(clone_dir), &["reset", "--hard", "FETCH_HEAD"]).await?;
    } else {
        run_git_ok(Some(clone_dir), &["fetch", "origin"]).await?;

        let remote_treeish
            = format!("origin/{}", treeish);

        if !run_git(Some(clone_dir), &["reset", "--hard", treeish]).await?.success() {
            run_git_ok(Some(clone_dir), &["reset", "--hard", &remote_treeish]).await?;
        }
    }

    clone_dir.with_join_str(".git").fs_rm()?;

    let clone_dir
        = clone_dir.clone();

    let archive = tokio::task::spawn_blocking(move || {
        archive::write_tgz(&archive::pack_directory(&clone_dir, &|_| true)?)
    }).await??;

    Ok(archive)
}

/// Downloads the tree of a repository at the given treeish as a gzipped
/// tarball whose entries are relative to the repository root.
pub async fn fetch_repository_archive(url: &str, treeish: &str, scratch_dir: &Path) -> Result<Vec<u8>, Error> {
    match fetch_via_archive(url, treeish).await {
        Ok(archive) if !archive.is_empty() => Ok(archive),
        Ok(_) => fetch_via_clone(url, treeish, &scratch_dir.with_join_str("clone")).await,
        Err(err) => {
            log::debug!("Remote archive unavailable for {} ({}), cloning instead", url, err);
            fetch_via_clone(url, treeish, &scratch_dir.with_join_str("clone")).await
        },
    }
}
