use crate::error::{ShardPropError, ShardPropResult};
use std::collections::HashMap;
use std::str::FromStr;

#[derive(Debug, Clone, Default)]
pub struct Configuration {
    config: HashMap<String, String>,
}

impl Configuration {
    pub fn new() -> Self {
        Self {
            config: HashMap::new(),
        }
    }

    pub fn from_pairs<I, S>(pairs: I) -> ShardPropResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut config = Self::new();
        for pair in pairs {
            let pair = pair.as_ref();
            let (key, value) = pair.split_once('=').ok_or_else(|| {
                ShardPropError::InvalidArgument(format!("expected key=value, got {pair:?}"))
            })?;
            let key = key.trim();
            if key.is_empty() {
                return Err(ShardPropError::InvalidArgument(format!(
                    "empty option name in {pair:?}"
                )));
            }
            config.put(key, value.trim());
        }
        Ok(config)
    }

    pub fn put(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.config.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&String> {
        self.config.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.config.contains_key(key)
    }

    pub fn get_string(&self, key: &str, default_value: &str) -> String {
        self.config
            .get(key)
            .cloned()
            .unwrap_or_else(|| default_value.to_string())
    }

    pub fn get_parsed<T>(&self, key: &str, default_value: T) -> ShardPropResult<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.config.get(key) {
            None => Ok(default_value),
            Some(raw) => raw.parse().map_err(|e| {
                ShardPropError::InvalidArgument(format!("option {key}={raw:?}: {e}"))
            }),
        }
    }

    pub fn get_bool(&self, key: &str, default_value: bool) -> ShardPropResult<bool> {
        match self.config.get(key).map(|s| s.to_ascii_lowercase()) {
            None => Ok(default_value),
            Some(v) => match v.as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(ShardPropError::InvalidArgument(format!(
                    "option {key}={v:?} is not a boolean"
                ))),
            },
        }
    }
}
