use anyhow::{Context, Result};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

/// Load + merge YAML layers in order (later files override earlier ones via
/// deep-merge), then canonicalize to sorted-key JSON and hash it. Used to
/// fingerprint the effective run configuration for reproducibility
/// instrumentation (testable property 9: determinism).
pub fn load_layered_yaml(paths: &[&Path]) -> Result<LoadedConfig> {
    let mut merged = Value::Object(Default::default());

    for p in paths {
        let s = fs::read_to_string(p).with_context(|| format!("read config: {}", p.display()))?;
        let yaml_val: serde_yaml::Value =
            serde_yaml::from_str(&s).with_context(|| format!("parse yaml: {}", p.display()))?;
        let json_val = serde_json::to_value(yaml_val).context("yaml->json conversion failed")?;
        deep_merge(&mut merged, json_val);
    }

    let canonical = canonicalize_json(&merged);

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    let hash = hex::encode(hasher.finalize());

    Ok(LoadedConfig {
        config_json: serde_json::from_str(&canonical).context("canonical json parse failed")?,
        canonical_json: canonical,
        config_hash: hash,
    })
}

/// Hash an already-constructed, serializable config value the same way, for
/// callers that build `RunConfig` programmatically instead of from YAML.
pub fn hash_config<T: serde::Serialize>(value: &T) -> Result<String> {
    let json_val = serde_json::to_value(value).context("config serialization failed")?;
    let canonical = canonicalize_json(&json_val);
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_json: Value,
    pub canonical_json: String,
    pub config_hash: String,
}

fn deep_merge(dst: &mut Value, src: Value) {
    match (dst, src) {
        (Value::Object(dst_map), Value::Object(src_map)) => {
            for (k, v) in src_map {
                match dst_map.get_mut(&k) {
                    Some(existing) => deep_merge(existing, v),
                    None => {
                        dst_map.insert(k, v);
                    }
                }
            }
        }
        (dst_slot, src_val) => {
            *dst_slot = src_val;
        }
    }
}

fn canonicalize_json(v: &Value) -> String {
    let sorted = sort_keys(v);
    serde_json::to_string(&sorted).expect("json serialization must not fail")
}

fn sort_keys(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut keys: Vec<_> = map.keys().cloned().collect();
            keys.sort();
            let mut new = serde_json::Map::new();
            for k in keys {
                new.insert(k.clone(), sort_keys(&map[&k]));
            }
            Value::Object(new)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_keys).collect()),
        _ => v.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn hash_is_stable_regardless_of_key_order() {
        let a = serde_json::json!({"b": 1, "a": 2});
        let b = serde_json::json!({"a": 2, "b": 1});
        assert_eq!(
            canonicalize_json(&a),
            canonicalize_json(&b)
        );
    }

    #[test]
    fn layered_yaml_overrides_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("base.yaml");
        let overlay = dir.path().join("overlay.yaml");
        let mut f1 = fs::File::create(&base).unwrap();
        write!(f1, "symbols: [SPY]\ninitial_capital: 50000").unwrap();
        let mut f2 = fs::File::create(&overlay).unwrap();
        write!(f2, "initial_capital: 100000").unwrap();

        let loaded = load_layered_yaml(&[base.as_path(), overlay.as_path()]).unwrap();
        assert_eq!(loaded.config_json["initial_capital"], 100000);
        assert_eq!(loaded.config_json["symbols"][0], "SPY");
    }
}
