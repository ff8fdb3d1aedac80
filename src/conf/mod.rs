//! Configuration for spindle compilations.
//!
//! A `SpindleConf` is an untyped key-value dictionary supplied by the
//! embedder; `parse` turns it into a `ParsedConf` with correctly typed
//! fields, substituting defaults for missing keys and rejecting malformed
//! values.

use std::collections::BTreeMap;

use crate::error::*;

pub mod constants;

use self::constants::*;

/// An untyped key-value configuration dictionary.
#[derive(Clone, Debug, Default)]
pub struct SpindleConf {
    dict: BTreeMap<String, String>,
}

impl SpindleConf {
    pub fn new() -> SpindleConf {
        SpindleConf {
            dict: BTreeMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&String> {
        self.dict.get(key)
    }

    pub fn set<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        self.dict.insert(key.into(), value.into());
    }
}

/// A parsed configuration with correctly typed fields.
#[derive(Clone, Debug)]
pub struct ParsedConf {
    pub reverse_loop_order: bool,
    pub annotation_provider: String,
    pub apply_fold_intrinsics: bool,
}

/// Parse a configuration from a `SpindleConf` key-value dictionary.
pub fn parse(conf: &SpindleConf) -> SpindleResult<ParsedConf> {
    let value = get_value(conf, CONF_LOOPS_REVERSE_KEY);
    let reverse_loop_order = value
        .map(|s| parse_bool_flag(&s, "Invalid flag for loops.reverse"))
        .unwrap_or(Ok(CONF_LOOPS_REVERSE_DEFAULT))?;

    let annotation_provider = get_value(conf, CONF_ANNOTATION_PROVIDER_KEY)
        .unwrap_or_else(|| CONF_ANNOTATION_PROVIDER_DEFAULT.to_string());

    let value = get_value(conf, CONF_FOLD_INTRINSICS_KEY);
    let apply_fold_intrinsics = value
        .map(|s| parse_bool_flag(&s, "Invalid flag for applyFoldIntrinsics"))
        .unwrap_or(Ok(CONF_FOLD_INTRINSICS_DEFAULT))?;

    Ok(ParsedConf {
        reverse_loop_order,
        annotation_provider,
        apply_fold_intrinsics,
    })
}

fn get_value(conf: &SpindleConf, key: &str) -> Option<String> {
    conf.get(key).cloned()
}

/// Parse a boolean flag with a custom error message.
fn parse_bool_flag(s: &str, err: &str) -> SpindleResult<bool> {
    match s.parse::<bool>() {
        Ok(v) => Ok(v),
        _ => config_err!("{}: {}", err, s),
    }
}

#[test]
fn conf_parsing() {
    let conf = SpindleConf::new();
    let parsed = parse(&conf).unwrap();
    assert_eq!(parsed.reverse_loop_order, false);
    assert_eq!(parsed.annotation_provider, "none");
    assert_eq!(parsed.apply_fold_intrinsics, true);

    let mut conf = SpindleConf::new();
    conf.set(CONF_LOOPS_REVERSE_KEY, "true");
    conf.set(CONF_ANNOTATION_PROVIDER_KEY, "static");
    conf.set(CONF_FOLD_INTRINSICS_KEY, "false");
    let parsed = parse(&conf).unwrap();
    assert_eq!(parsed.reverse_loop_order, true);
    assert_eq!(parsed.annotation_provider, "static");
    assert_eq!(parsed.apply_fold_intrinsics, false);

    let mut conf = SpindleConf::new();
    conf.set(CONF_LOOPS_REVERSE_KEY, "maybe");
    assert!(parse(&conf).is_err());
}
