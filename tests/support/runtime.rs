use anyhow::{bail, Result};
use std::{
    env,
    path::{Path, PathBuf},
    sync::OnceLock,
};

/// Ensure a Docker API socket is reachable for testcontainers.
///
/// `DOCKER_HOST` wins; otherwise the Docker socket, then a Podman socket, which
/// gets exported as `DOCKER_HOST`.
///
/// # Errors
/// Returns an error if no container runtime socket can be found.
pub fn ensure_container_runtime() -> Result<()> {
    static INIT: OnceLock<Result<(), String>> = OnceLock::new();
    match INIT.get_or_init(init_container_runtime) {
        Ok(()) => Ok(()),
        Err(message) => bail!("{message}"),
    }
}

fn init_container_runtime() -> Result<(), String> {
    if let Ok(docker_host) = env::var("DOCKER_HOST") {
        return match docker_host.strip_prefix("unix://") {
            Some(path) if !Path::new(path).exists() => {
                Err(format!("DOCKER_HOST points to a missing socket: {path}"))
            }
            _ => Ok(()),
        };
    }

    if Path::new("/var/run/docker.sock").exists() {
        return Ok(());
    }

    if let Some(path) = find_podman_socket() {
        env::set_var("DOCKER_HOST", format!("unix://{}", path.display()));
        return Ok(());
    }

    Err("No container runtime socket found. Start Docker or `podman.socket`, or set `DOCKER_HOST`.".to_string())
}

fn find_podman_socket() -> Option<PathBuf> {
    let mut candidates = Vec::new();
    if let Ok(runtime_dir) = env::var("XDG_RUNTIME_DIR") {
        candidates.push(PathBuf::from(runtime_dir).join("podman/podman.sock"));
    }
    candidates.push(PathBuf::from("/var/run/podman/podman.sock"));
    candidates.push(PathBuf::from("/run/podman/podman.sock"));

    candidates.into_iter().find(|path| path.exists())
}
