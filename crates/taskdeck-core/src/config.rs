use std::collections::HashMap;
use std::fs;
use std::path::{
  Path,
  PathBuf
};
use std::time::Duration;

use anyhow::{
  Context,
  anyhow
};
use tracing::{
  debug,
  info,
  trace,
  warn
};

pub const DEFAULT_API_URL: &str =
  "http://127.0.0.1:8000/api";

#[derive(Debug, Clone)]
pub struct Config {
  map: HashMap<String, String>,
  pub loaded_files: Vec<PathBuf>
}

impl Default for Config {
  fn default() -> Self {
    let mut map = HashMap::new();
    map.insert(
      "api.url".to_string(),
      DEFAULT_API_URL.to_string()
    );
    map.insert(
      "api.timeout".to_string(),
      "0".to_string()
    );
    map.insert(
      "color".to_string(),
      "on".to_string()
    );
    map.insert(
      "confirm".to_string(),
      "on".to_string()
    );

    Self {
      map,
      loaded_files: vec![]
    }
  }
}

impl Config {
  #[tracing::instrument(skip(
    deckrc_override
  ))]
  pub fn load(
    deckrc_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Config::default();

    let deckrc = resolve_deckrc_path(
      deckrc_override
    )?;
    if let Some(path) = deckrc {
      info!(deckrc = %path.display(), "loading deckrc");
      cfg.load_file(&path)?;
    } else {
      debug!(
        "no deckrc found; using \
         defaults"
      );
    }

    Ok(cfg)
  }

  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      let key = k
        .strip_prefix("rc.")
        .unwrap_or(&k)
        .to_string();
      debug!(key = %key, value = %v, "applying override");
      self.map.insert(key, v);
    }
  }

  pub fn get(
    &self,
    key: &str
  ) -> Option<String> {
    self.map.get(key).cloned()
  }

  pub fn get_bool(
    &self,
    key: &str
  ) -> Option<bool> {
    self
      .map
      .get(key)
      .map(|v| parse_bool(v))
  }

  pub fn iter(
    &self
  ) -> impl Iterator<Item = (&String, &String)>
  {
    self.map.iter()
  }

  pub fn api_url(&self) -> String {
    self
      .get("api.url")
      .unwrap_or_else(|| {
        DEFAULT_API_URL.to_string()
      })
  }

  /// `None` when unset or zero.
  pub fn api_timeout(
    &self
  ) -> anyhow::Result<Option<Duration>> {
    let raw = self
      .get("api.timeout")
      .unwrap_or_default();
    let raw = raw.trim();
    if raw.is_empty() {
      return Ok(None);
    }

    let secs: u64 =
      raw.parse().with_context(|| {
        format!(
          "invalid api.timeout: {raw} \
           (expected whole seconds)"
        )
      })?;
    Ok(
      (secs > 0)
        .then_some(Duration::from_secs(secs))
    )
  }

  pub fn color(&self) -> bool {
    self.get_bool("color").unwrap_or(true)
  }

  pub fn confirm(&self) -> bool {
    self
      .get_bool("confirm")
      .unwrap_or(true)
  }

  #[tracing::instrument(skip(self))]
  fn load_file(
    &mut self,
    path: &Path
  ) -> anyhow::Result<()> {
    let path = expand_tilde(path);
    let path = fs::canonicalize(&path)
      .unwrap_or(path);
    let text =
      fs::read_to_string(&path)
        .with_context(|| {
          format!(
            "failed to read {}",
            path.display()
          )
        })?;

    self
      .loaded_files
      .push(path.clone());

    let base_dir = path
      .parent()
      .map(|p| p.to_path_buf())
      .unwrap_or_else(|| {
        PathBuf::from(".")
      });

    for (line_num, raw_line) in
      text.lines().enumerate()
    {
      let mut line = raw_line.trim();
      if line.is_empty()
        || line.starts_with('#')
      {
        continue;
      }

      if let Some((before, _)) =
        line.split_once(" #")
      {
        line = before.trim();
      }

      if let Some(include_rest) =
        line.strip_prefix("include ")
      {
        let include_path =
          resolve_include_path(
            &base_dir,
            include_rest.trim()
          )?;
        debug!(
            file = %path.display(),
            include = %include_path.display(),
            line = line_num + 1,
            "processing include"
        );

        if !include_path.exists() {
          warn!(include = %include_path.display(), "include file does not exist; skipping");
          continue;
        }

        let canonical =
          fs::canonicalize(&include_path)
            .with_context(|| {
              format!(
                "failed to resolve {}",
                include_path.display()
              )
            })?;
        if self
          .loaded_files
          .contains(&canonical)
        {
          warn!(include = %canonical.display(), "deckrc already loaded; skipping include");
        } else {
          self.load_file(&canonical)?;
        }
        continue;
      }

      let (k, v) = line
        .split_once('=')
        .ok_or_else(|| {
          anyhow!(
            "invalid config line \
             {}:{}: {}",
            path.display(),
            line_num + 1,
            raw_line
          )
        })?;

      let key = k.trim().to_string();
      let value = v.trim().to_string();
      trace!(key = %key, value = %value, "loaded config key");
      self.map.insert(key, value);
    }

    Ok(())
  }
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_deckrc_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(path.to_path_buf()));
  }

  if let Ok(deckrc_env) =
    std::env::var("DECKRC")
  {
    if deckrc_env == "/dev/null" {
      return Ok(None);
    }
    return Ok(Some(PathBuf::from(
      deckrc_env
    )));
  }

  if let Some(home) = dirs::home_dir() {
    let candidate = home.join(".deckrc");
    if candidate.exists() {
      return Ok(Some(candidate));
    }
  }

  if let Some(config_dir) =
    dirs::config_dir()
  {
    let candidate = config_dir
      .join("taskdeck")
      .join("deckrc");
    if candidate.exists() {
      return Ok(Some(candidate));
    }
  }

  Ok(None)
}

fn resolve_include_path(
  base_dir: &Path,
  include: &str
) -> anyhow::Result<PathBuf> {
  if include.trim().is_empty() {
    return Err(anyhow!(
      "include path cannot be empty"
    ));
  }

  let raw = PathBuf::from(include);
  let expanded = expand_tilde(&raw);
  if expanded.is_absolute() {
    Ok(expanded)
  } else {
    Ok(base_dir.join(expanded))
  }
}

fn expand_tilde(
  path: &Path
) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}

fn parse_bool(s: &str) -> bool {
  matches!(
    s.trim()
      .to_ascii_lowercase()
      .as_str(),
    "1" | "y" | "yes" | "on" | "true"
  )
}
