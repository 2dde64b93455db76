//! Behavioural coverage for configuration layering.

use std::cell::RefCell;
use std::ffi::OsString;
use std::fs;
use std::sync::{Mutex, MutexGuard};

use bridge_config::{
    Config, SocketEndpoint, default_deferred_queue_limit, default_log_filter, default_log_format,
    default_socket_endpoint,
};
use once_cell::sync::Lazy;
use ortho_config::OrthoConfig;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tempfile::TempDir;

static ENV_MUTEX: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

struct Harness {
    temp_dir: TempDir,
    cli_args: RefCell<Vec<OsString>>,
    env_overrides: RefCell<Vec<(String, Option<OsString>)>>,
    loaded: RefCell<Option<Config>>,
    error: RefCell<Option<String>>,
    _env_guard: MutexGuard<'static, ()>,
}

impl Harness {
    fn new() -> Self {
        let env_guard = ENV_MUTEX
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let temp_dir = match TempDir::new() {
            Ok(dir) => dir,
            Err(error) => panic!("failed to create temporary directory: {error}"),
        };
        Self {
            temp_dir,
            cli_args: RefCell::new(vec![OsString::from("bridged")]),
            env_overrides: RefCell::new(Vec::new()),
            loaded: RefCell::new(None),
            error: RefCell::new(None),
            _env_guard: env_guard,
        }
    }

    fn write_config(&self, socket: &SocketEndpoint) {
        let path = self.temp_dir.path().join("bridge.toml");
        let toml = match socket {
            SocketEndpoint::Unix { path } => {
                format!("daemon_socket = {{ transport = \"unix\", path = \"{path}\" }}\n")
            }
            SocketEndpoint::Tcp { host, port } => format!(
                "daemon_socket = {{ transport = \"tcp\", host = \"{host}\", port = {port} }}\n"
            ),
        };

        if let Err(error) = fs::write(&path, toml) {
            panic!("failed to write configuration: {error}");
        }

        let mut args = self.cli_args.borrow_mut();
        args.push(OsString::from("--config-path"));
        args.push(path.into_os_string());
    }

    fn set_env(&self, key: &str, value: &str) {
        let previous = std::env::var_os(key);
        // Environment mutation is `unsafe` in edition 2024; `Drop` restores it
        // and the harness holds `ENV_MUTEX` for its whole lifetime.
        unsafe { std::env::set_var(key, value) };
        self.env_overrides
            .borrow_mut()
            .push((key.to_owned(), previous));
    }

    fn push_cli_arg(&self, arg: impl Into<OsString>) {
        self.cli_args.borrow_mut().push(arg.into());
    }

    fn load(&self) {
        if self.loaded.borrow().is_some() || self.error.borrow().is_some() {
            return;
        }

        let args = self.cli_args.borrow().clone();
        match Config::load_from_iter(args) {
            Ok(config) => *self.loaded.borrow_mut() = Some(config),
            Err(error) => *self.error.borrow_mut() = Some(error.to_string()),
        }
    }

    fn config(&self) -> Config {
        self.load();
        if let Some(error) = self.error.borrow().as_ref() {
            panic!("configuration failed to load: {error}");
        }
        match self.loaded.borrow().as_ref() {
            Some(config) => config.clone(),
            None => panic!("configuration was not loaded"),
        }
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        let mut overrides = self.env_overrides.borrow_mut();
        while let Some((key, value)) = overrides.pop() {
            if let Some(os_value) = value {
                unsafe { std::env::set_var(&key, os_value) };
            } else {
                unsafe { std::env::remove_var(&key) };
            }
        }
    }
}

fn parse_socket(socket: &str) -> SocketEndpoint {
    match socket.parse::<SocketEndpoint>() {
        Ok(endpoint) => endpoint,
        Err(error) => panic!("invalid socket '{socket}': {error}"),
    }
}

#[fixture]
fn harness() -> Harness {
    Harness::new()
}

#[given("a configuration file setting the daemon socket to \"{socket}\"")]
fn given_configuration_file(harness: &Harness, socket: String) {
    harness.write_config(&parse_socket(&socket));
}

#[given("the environment overrides the drain interval to \"{millis}\"")]
fn given_environment_override(harness: &Harness, millis: String) {
    harness.set_env("BRIDGE_DRAIN_INTERVAL_MS", &millis);
}

#[when("the CLI sets the daemon socket to \"{socket}\"")]
fn when_cli_override(harness: &Harness, socket: String) {
    harness.push_cli_arg("--daemon-socket");
    harness.push_cli_arg(OsString::from(&socket));
}

#[when("the configuration loads without overrides")]
fn when_load_without_overrides(harness: &Harness) {
    harness.load();
}

#[then("loading the configuration resolves the daemon socket to \"{socket}\"")]
fn then_resolved_socket(harness: &Harness, socket: String) {
    assert_eq!(harness.config().daemon_socket(), &parse_socket(&socket));
}

#[then("the drain interval resolves to {millis} milliseconds")]
fn then_drain_interval(harness: &Harness, millis: u64) {
    assert_eq!(harness.config().drain_interval_ms, millis);
}

#[then("loading the configuration applies the built-in defaults")]
fn then_defaults_applied(harness: &Harness) {
    let config = harness.config();
    assert_eq!(config.daemon_socket(), &default_socket_endpoint());
    assert_eq!(config.log_filter(), default_log_filter());
    assert_eq!(config.log_format(), default_log_format());
    assert_eq!(config.deferred_queue_limit, default_deferred_queue_limit());
}

#[scenario(
    path = "tests/features/configuration_precedence.feature",
    name = "Defaults apply when nothing is configured"
)]
fn defaults_apply(#[from(harness)] harness: Harness) {
    drop(harness);
}

#[scenario(
    path = "tests/features/configuration_precedence.feature",
    name = "Environment overrides the configuration file"
)]
fn environment_layer(#[from(harness)] harness: Harness) {
    drop(harness);
}

#[scenario(
    path = "tests/features/configuration_precedence.feature",
    name = "Command-line flags override the configuration file"
)]
fn cli_layer(#[from(harness)] harness: Harness) {
    drop(harness);
}
