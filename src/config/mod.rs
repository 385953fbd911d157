use std::{
    collections::HashMap,
    env,
    fs,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use directories::BaseDirs;

use crate::execution::DEFAULT_CANVAS_SIZE;

/// Interpreter environment variables forwarded to the R process when set.
const R_ENV_KEYS: &[&str] = &["R_HOME", "R_ENABLE_JIT", "R_DEFAULT_DEVICE", "COLORTERM"];

#[derive(Debug, Clone)]
pub struct Config {
    inner: HashMap<String, String>,
    pub config_path: PathBuf,
}

impl Config {
    pub fn load() -> Self {
        Self::load_from(&default_config_path())
    }

    /// Defaults, overlaid by the rc file at `config_path`, overlaid by the
    /// process environment.
    pub fn load_from(config_path: &Path) -> Self {
        let mut map = default_map();

        if config_path.exists() {
            if let Ok(file) = fs::File::open(config_path) {
                let reader = BufReader::new(file);
                for line in reader.lines().map_while(Result::ok) {
                    let line = line.trim();
                    if line.is_empty() || line.starts_with('#') {
                        continue;
                    }
                    if let Some((k, v)) = line.split_once('=') {
                        map.insert(k.trim().to_string(), v.trim().to_string());
                    }
                }
            }
        }

        for (k, v) in env::vars() {
            if is_config_key(&k) {
                map.insert(k, v);
            }
        }

        Self { inner: map, config_path: config_path.to_path_buf() }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key).cloned()
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.inner.insert(key.to_string(), value.into());
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key)
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    pub fn get_u32(&self, key: &str) -> Option<u32> {
        self.get(key).and_then(|v| v.parse::<u32>().ok())
    }

    pub fn get_path(&self, key: &str) -> Option<PathBuf> {
        self.get(key).filter(|v| !v.is_empty()).map(PathBuf::from)
    }

    pub fn r_binary(&self) -> String {
        self.get("R_BINARY").unwrap_or_else(|| "R".into())
    }

    pub fn r_args(&self) -> Vec<String> {
        self.get("R_ARGS")
            .unwrap_or_default()
            .split_whitespace()
            .map(str::to_string)
            .collect()
    }

    /// Environment for the R process: the interpreter keys that have a
    /// non-empty value.
    pub fn r_env(&self) -> Vec<(String, String)> {
        R_ENV_KEYS
            .iter()
            .filter_map(|k| {
                self.get(k)
                    .filter(|v| !v.is_empty())
                    .map(|v| (k.to_string(), v))
            })
            .collect()
    }

    pub fn canvas_size(&self) -> u32 {
        self.get_u32("CANVAS_SIZE")
            .filter(|s| *s > 0)
            .unwrap_or(DEFAULT_CANVAS_SIZE)
    }

    pub fn plots_dir(&self) -> Option<PathBuf> {
        self.get_path("PLOTS_DIR")
    }
}

fn is_config_key(k: &str) -> bool {
    // Known keys, plus RSNIP_* for forward-compat
    const KEYS: &[&str] = &[
        "R_BINARY",
        "R_ARGS",
        "R_HOME",
        "R_ENABLE_JIT",
        "R_DEFAULT_DEVICE",
        "COLORTERM",
        "CANVAS_SIZE",
        "SHARED_ENVIRONMENT",
        "PRETTIFY_MARKDOWN",
        "PLOTS_DIR",
    ];

    KEYS.contains(&k) || k.starts_with("RSNIP_")
}

fn default_config_path() -> PathBuf {
    let base = BaseDirs::new()
        .map(|b| b.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("~/.config"));
    base.join("rsnip").join(".rsniprc")
}

fn default_map() -> HashMap<String, String> {
    let mut m = HashMap::new();

    // Interpreter
    m.insert("R_BINARY".into(), "R".into());
    m.insert("R_ARGS".into(), "--vanilla --quiet --no-echo".into());
    m.insert("R_ENABLE_JIT".into(), "0".into());
    m.insert("COLORTERM".into(), "truecolor".into());

    // Numbers
    m.insert("CANVAS_SIZE".into(), DEFAULT_CANVAS_SIZE.to_string());

    // Bools as strings
    m.insert("SHARED_ENVIRONMENT".into(), "true".into());
    m.insert("PRETTIFY_MARKDOWN".into(), "true".into());

    m
}
