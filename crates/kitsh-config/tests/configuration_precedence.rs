//! Precedence between environment variables and CLI flags.

use std::ffi::OsString;

use kitsh_config::{Config, LogFormat};
use ortho_config::OrthoConfig;

struct EnvGuard {
    key: &'static str,
    previous: Option<OsString>,
}

impl EnvGuard {
    fn set(key: &'static str, value: &str) -> Self {
        let previous = std::env::var_os(key);
        // Environment mutation is `unsafe` on edition 2024; the guard restores
        // the original value on drop.
        unsafe { std::env::set_var(key, value) };
        Self { key, previous }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        match self.previous.take() {
            Some(value) => unsafe { std::env::set_var(self.key, value) },
            None => unsafe { std::env::remove_var(self.key) },
        }
    }
}

fn args(values: &[&str]) -> Vec<OsString> {
    values.iter().map(OsString::from).collect()
}

// Environment access is process-wide, so the scenarios run sequentially in a
// single test.
#[test]
fn cli_flags_override_environment() {
    {
        let _target = EnvGuard::set("KITSUNE_TARGET", "from-env:7000");
        let config =
            Config::load_from_iter(args(&["kitsh"])).expect("environment configuration loads");
        assert_eq!(config.target_text(), Some("from-env:7000"));

        let config = Config::load_from_iter(args(&["kitsh", "--target", "from-cli:8000"]))
            .expect("cli configuration loads");
        assert_eq!(config.target_text(), Some("from-cli:8000"));
    }

    let config = Config::load_from_iter(args(&[
        "kitsh",
        "--target",
        "kitsune:1",
        "--ssl",
        "--log-format",
        "json",
    ]))
    .expect("flag configuration loads");
    assert!(config.ssl);
    assert_eq!(config.log_format(), LogFormat::Json);
    let target = config.target().expect("target parses");
    assert_eq!(target.port(), 1);
}
