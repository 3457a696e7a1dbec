//! Network namespace handles and the namespace worker.
//!
//! Entering a namespace with `setns(2)` only affects the calling thread, so
//! work that must run inside a workload namespace is handed to a dedicated
//! OS thread that enters the namespace, drives the work to completion on
//! its own single-threaded runtime and restores its original namespace
//! before exiting. The caller's runtime thread never changes namespace.

use std::fs::File;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};

use tokio::sync::oneshot;

use crate::error::{LinkError, OvnL2Error, Result};

/// Namespace of the calling thread.
pub const CURRENT_THREAD_NETNS: &str = "/proc/thread-self/ns/net";

fn namespace_error(path: &Path, message: impl Into<String>) -> OvnL2Error {
    LinkError::Namespace {
        path: path.display().to_string(),
        message: message.into(),
    }
    .into()
}

/// An open network namespace handle.
///
/// The file descriptor is closed exactly once, when the handle is dropped.
#[derive(Debug)]
pub struct NetNs {
    file: File,
    path: PathBuf,
}

impl NetNs {
    /// Opens the namespace at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| namespace_error(path, format!("failed to open netns: {}", e)))?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Opens the namespace at `path`, returning `None` if it no longer exists.
    pub fn try_open(path: impl AsRef<Path>) -> Result<Option<Self>> {
        let path = path.as_ref();
        match File::open(path) {
            Ok(file) => Ok(Some(Self {
                file,
                path: path.to_path_buf(),
            })),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(namespace_error(path, format!("failed to open netns: {}", e))),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Runs `f` to completion inside this namespace on a dedicated thread.
    pub async fn run<F, Fut, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>>,
        T: Send + 'static,
    {
        let target = self.file.try_clone()?;
        let path = self.path.clone();
        let (tx, rx) = oneshot::channel();

        let worker_path = path.clone();
        std::thread::Builder::new()
            .name("netns-worker".to_string())
            .spawn(move || {
                let result = run_in_namespace(&target, &worker_path, f);
                // The receiver only goes away if the caller was cancelled
                let _ = tx.send(result);
            })?;

        rx.await
            .map_err(|_| namespace_error(&path, "namespace worker exited without a result"))?
    }
}

#[cfg(target_os = "linux")]
fn run_in_namespace<F, Fut, T>(target: &File, path: &Path, f: F) -> Result<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    use nix::sched::{setns, CloneFlags};

    let original = File::open(CURRENT_THREAD_NETNS)
        .map_err(|e| namespace_error(path, format!("failed to open current netns: {}", e)))?;

    setns(target, CloneFlags::CLONE_NEWNET)
        .map_err(|e| namespace_error(path, format!("failed to enter netns: {}", e)))?;
    let _guard = NsGuard { original };
    tracing::debug!(netns = %path.display(), "Entered network namespace");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(f())
}

#[cfg(not(target_os = "linux"))]
fn run_in_namespace<F, Fut, T>(_target: &File, path: &Path, _f: F) -> Result<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    Err(namespace_error(
        path,
        "network namespaces are only supported on Linux",
    ))
}

/// Returns the worker thread to its original namespace on drop.
#[cfg(target_os = "linux")]
struct NsGuard {
    original: File,
}

#[cfg(target_os = "linux")]
impl Drop for NsGuard {
    fn drop(&mut self) {
        use nix::sched::{setns, CloneFlags};

        if let Err(e) = setns(&self.original, CloneFlags::CLONE_NEWNET) {
            tracing::error!(error = %e, "Failed to restore original network namespace");
        } else {
            tracing::debug!("Restored original network namespace");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_namespace() {
        let err = NetNs::open("/nonexistent/netns").unwrap_err();
        assert!(matches!(
            err,
            OvnL2Error::Link(LinkError::Namespace { .. })
        ));
        assert!(err.to_string().contains("/nonexistent/netns"));
    }

    #[test]
    fn test_try_open_missing_namespace() {
        assert!(NetNs::try_open("/nonexistent/netns").unwrap().is_none());
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    #[ignore = "requires CAP_SYS_ADMIN"]
    async fn test_run_in_own_namespace() {
        let ns = NetNs::open(CURRENT_THREAD_NETNS).unwrap();
        let value = ns.run(|| async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    #[ignore = "requires CAP_SYS_ADMIN"]
    async fn test_run_propagates_error() {
        let ns = NetNs::open(CURRENT_THREAD_NETNS).unwrap();
        let err = ns
            .run(|| async { Err::<(), _>(OvnL2Error::address("boom")) })
            .await
            .unwrap_err();
        assert!(matches!(err, OvnL2Error::Address(_)));
    }
}
