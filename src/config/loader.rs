//! Configuration loading and environment parsing.

use super::validation::validate_config;
use super::Config;
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Load configuration with the following precedence (highest first):
/// 1) `QUIZ_RAID_CONFIG_JSON` env var containing raw JSON
/// 2) If `QUIZ_RAID_CONFIG_STDIN=true/1`, read JSON from stdin
/// 3) File pointed by `QUIZ_RAID_CONFIG_PATH` env var
/// 4) config.json in current working directory
/// 5) config.json next to the executable (application directory)
/// 6) Defaults compiled into the binary
///
/// Sources are merged from lowest precedence upward, so a field set by a
/// higher source always wins. Additionally, individual fields can be
/// overridden by environment variables with prefix QUIZ_RAID using "__" as a
/// nested separator, e.g. `QUIZ_RAID__PORT=8080` or
/// `QUIZ_RAID__GAME__STARTING_LIVES=2`. Any errors while reading/parsing are
/// printed to stderr and that source is skipped.
///
/// **Note:** Validation errors from [`validate_config`] are logged to stderr
/// but are *not* propagated; `load()` always returns a `Config`. Callers who
/// need hard failure should call
/// [`validate_config()`](super::validation::validate_config) on the returned
/// config and handle the error themselves.
#[must_use]
pub fn load() -> Config {
    use std::env;
    use std::io::Read;
    use std::path::PathBuf;

    let defaults = Config::default();
    let mut merged =
        serde_json::to_value(&defaults).unwrap_or_else(|_| Value::Object(serde_json::Map::new()));

    // 5) config.json next to executable
    if let Ok(exe_path) = env::current_exe() {
        if let Some(mut exe_dir) = exe_path.parent().map(std::path::Path::to_path_buf) {
            exe_dir.push("config.json");
            merge_file_source(&mut merged, &exe_dir);
        }
    }

    // 4) config.json in CWD
    merge_file_source(&mut merged, &PathBuf::from("config.json"));

    // 3) Explicit path via env var
    if let Ok(path) = env::var("QUIZ_RAID_CONFIG_PATH") {
        let path = PathBuf::from(path);
        merge_file_source(&mut merged, &path);
    }

    // 2) JSON from STDIN (opt-in)
    if let Ok(val) = env::var("QUIZ_RAID_CONFIG_STDIN") {
        if env_var_truthy(&val) {
            let mut buf = String::new();
            if let Err(e) = std::io::stdin().read_to_string(&mut buf) {
                eprintln!("Failed to read config from stdin: {e}");
            } else if let Some(value) = parse_json_document(&buf, "stdin") {
                merge_values(&mut merged, value);
            }
        }
    }

    // 1) Inline JSON via env var
    if let Ok(json) = env::var("QUIZ_RAID_CONFIG_JSON") {
        if let Some(value) = parse_json_document(&json, "QUIZ_RAID_CONFIG_JSON") {
            merge_values(&mut merged, value);
        }
    }

    // Environment overrides with prefix QUIZ_RAID and nested separator __
    apply_env_overrides(&mut merged);

    let config = match serde_json::from_value::<Config>(merged) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to deserialize config; using defaults: {e}");
            defaults
        }
    };

    // Warn-only here; main decides whether a validation failure is fatal.
    if let Err(e) = validate_config(&config) {
        eprintln!("Configuration validation error: {e}");
    }

    config
}

fn parse_json_document(raw: &str, label: &str) -> Option<Value> {
    if raw.trim().is_empty() {
        return None;
    }

    match serde_json::from_str(raw) {
        Ok(value) => Some(value),
        Err(err) => {
            eprintln!("Failed to parse config from {label}: {err}");
            None
        }
    }
}

fn merge_file_source(target: &mut Value, path: &Path) {
    if path.as_os_str().is_empty() || !path.exists() {
        return;
    }

    match fs::read_to_string(path) {
        Ok(contents) => {
            if let Some(value) = parse_json_document(&contents, &format!("file {}", path.display()))
            {
                merge_values(target, value);
            }
        }
        Err(err) => {
            eprintln!("Failed to read config from {}: {}", path.display(), err);
        }
    }
}

fn merge_values(target: &mut Value, source: Value) {
    match (target, source) {
        (Value::Object(target_map), Value::Object(source_map)) => {
            for (key, value) in source_map {
                match target_map.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        target_map.insert(key, value);
                    }
                }
            }
        }
        (target_slot, source_value) => {
            *target_slot = source_value;
        }
    }
}

fn apply_env_overrides(root: &mut Value) {
    for (key, raw_value) in std::env::vars() {
        let Some(stripped) = key.strip_prefix("QUIZ_RAID__") else {
            continue;
        };

        let segments: Vec<String> = stripped
            .split("__")
            .filter(|segment| !segment.is_empty())
            .map(str::to_ascii_lowercase)
            .collect();

        if segments.is_empty() {
            continue;
        }

        let value = parse_env_value(&raw_value);
        set_nested_value(root, &segments, value);
    }
}

fn env_var_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}

fn parse_env_value(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.contains(',') {
        let items = trimmed
            .split(',')
            .map(|segment| parse_scalar(segment.trim()))
            .collect::<Vec<_>>();
        return Value::Array(items);
    }

    parse_scalar(trimmed)
}

fn parse_scalar(raw: &str) -> Value {
    if raw.is_empty() {
        return Value::String(String::new());
    }

    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn set_nested_value(target: &mut Value, segments: &[String], value: Value) {
    if segments.is_empty() {
        *target = value;
        return;
    }

    if segments.len() == 1 {
        let map = ensure_object(target);
        // SAFETY: Length is checked to be exactly 1 on the line above.
        #[allow(clippy::indexing_slicing)]
        map.insert(segments[0].clone(), value);
        return;
    }

    let map = ensure_object(target);
    // SAFETY: segments.len() > 1 (len 0 and len 1 are handled above), so
    // index 0 and the [1..] slice are both in bounds.
    #[allow(clippy::indexing_slicing)]
    let key = segments[0].clone();
    let entry = map
        .entry(key)
        .or_insert_with(|| Value::Object(serde_json::Map::new()));
    #[allow(clippy::indexing_slicing)]
    let rest = &segments[1..];
    set_nested_value(entry, rest, value);
}

fn ensure_object(value: &mut Value) -> &mut serde_json::Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(serde_json::Map::new());
    }

    // SAFETY: The branch above guarantees `value` is a `Value::Object`, so
    // `as_object_mut()` will always return `Some`.
    #[allow(clippy::expect_used)]
    value
        .as_object_mut()
        .expect("value should be coerced into an object")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_overwrites_scalars_and_recurses_into_objects() {
        let mut target = serde_json::json!({
            "port": 4800,
            "game": { "starting_lives": 3, "health_per_player": 5.0 }
        });
        merge_values(
            &mut target,
            serde_json::json!({ "game": { "starting_lives": 2 } }),
        );
        assert_eq!(target["port"], 4800);
        assert_eq!(target["game"]["starting_lives"], 2);
        assert_eq!(target["game"]["health_per_player"], 5.0);
    }

    #[test]
    fn nested_env_segments_create_intermediate_objects() {
        let mut root = Value::Object(serde_json::Map::new());
        set_nested_value(
            &mut root,
            &["game".to_string(), "starting_lives".to_string()],
            Value::from(2),
        );
        assert_eq!(root["game"]["starting_lives"], 2);
    }

    #[test]
    fn env_scalars_keep_their_json_types() {
        assert_eq!(parse_scalar("8080"), Value::from(8080));
        assert_eq!(parse_scalar("true"), Value::from(true));
        assert_eq!(parse_scalar("2.5"), Value::from(2.5));
        assert_eq!(parse_scalar("hello"), Value::from("hello"));
    }

    #[test]
    fn comma_separated_env_values_become_arrays() {
        let parsed = parse_env_value("a, b, 3");
        assert_eq!(
            parsed,
            Value::Array(vec![Value::from("a"), Value::from("b"), Value::from(3)])
        );
    }

    #[test]
    fn truthy_values_are_recognized() {
        assert!(env_var_truthy("1"));
        assert!(env_var_truthy("TRUE"));
        assert!(env_var_truthy(" yes "));
        assert!(!env_var_truthy("0"));
        assert!(!env_var_truthy("off"));
    }
}
