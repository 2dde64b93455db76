//! Invalid configuration must stop loading instead of falling back to defaults.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use bridge_config::Config;
use once_cell::sync::Lazy;
use ortho_config::{OrthoConfig, OrthoError};
use rstest::{fixture, rstest};
use tempfile::TempDir;

static ENV_MUTEX: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

/// Scratch directory plus exclusive access to the process environment.
struct Sandbox {
    dir: TempDir,
    restore: Vec<(&'static str, Option<OsString>)>,
    _env: MutexGuard<'static, ()>,
}

impl Sandbox {
    fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, contents).expect("write config file");
        path
    }

    fn set_env(&mut self, key: &'static str, value: impl AsRef<std::ffi::OsStr>) {
        self.restore.push((key, std::env::var_os(key)));
        // Edition 2024 marks environment mutation as unsafe; `ENV_MUTEX`
        // serialises every test in this binary that touches it.
        unsafe { std::env::set_var(key, value) };
    }
}

impl Drop for Sandbox {
    fn drop(&mut self) {
        while let Some((key, previous)) = self.restore.pop() {
            match previous {
                Some(value) => unsafe { std::env::set_var(key, value) },
                None => unsafe { std::env::remove_var(key) },
            }
        }
    }
}

#[fixture]
fn sandbox() -> Sandbox {
    let env = ENV_MUTEX.lock().unwrap_or_else(PoisonError::into_inner);
    Sandbox {
        dir: TempDir::new().expect("create temp dir"),
        restore: Vec::new(),
        _env: env,
    }
}

fn load(args: &[&str], config_path: Option<&Path>) -> Result<Config, std::sync::Arc<OrthoError>> {
    let mut argv = vec![OsString::from("bridged")];
    argv.extend(args.iter().map(OsString::from));
    if let Some(path) = config_path {
        argv.push(OsString::from("--config-path"));
        argv.push(path.as_os_str().to_owned());
    }
    Config::load_from_iter(argv)
}

#[rstest]
#[case::unsupported_scheme(&["--daemon-socket", "ws://127.0.0.1:8091"])]
#[case::missing_unix_path(&["--daemon-socket", "unix://"])]
#[case::negative_queue_limit(&["--deferred-queue-limit", "-1"])]
#[case::unknown_log_format(&["--log-format", "yaml"])]
fn bad_flags_fail(sandbox: Sandbox, #[case] args: &[&str]) {
    let result = load(args, None);
    drop(sandbox);
    assert!(result.is_err(), "{args:?} should be rejected");
}

#[rstest]
fn bad_environment_values_fail(mut sandbox: Sandbox) {
    sandbox.set_env("BRIDGE_DRAIN_INTERVAL_MS", "soon");

    let result = load(&[], None);

    assert!(result.is_err(), "non-numeric drain interval should be rejected");
}

#[rstest]
fn every_malformed_file_is_reported(mut sandbox: Sandbox) {
    let cli_path = sandbox.write(
        "cli_bridge.toml",
        r#"daemon_socket = { transport = "tcp" host = "127.0.0.1" }"#,
    );
    let env_path = sandbox.write("env_bridge.toml", "deferred_queue_limit = plenty");
    sandbox.set_env("BRIDGE_CONFIG_PATH", env_path.as_os_str());

    let error = load(&[], Some(&cli_path)).expect_err("loading must fail");

    assert!(
        error.to_string().contains("multiple configuration errors"),
        "expected an aggregate, got {error}"
    );
    let OrthoError::Aggregate(aggregate) = error.as_ref() else {
        panic!("expected aggregated error, got {error:?}");
    };
    let mut reported: Vec<PathBuf> = aggregate
        .iter()
        .filter_map(|failure| match failure {
            OrthoError::File { path, .. } => Some(path.clone()),
            _ => None,
        })
        .collect();
    reported.sort();
    let mut expected = vec![cli_path, env_path];
    expected.sort();
    assert_eq!(reported, expected);
}
