//! `tf.train.Example` protobuf messages
//!
//! Wire-compatible with `tensorflow/core/example/{example,feature}.proto`.
//! Features are kept in a `BTreeMap` so serialization is deterministic.

use std::collections::BTreeMap;
use crate::error::{PrepError, Result};

#[derive(Clone, PartialEq, prost::Message)]
pub struct BytesList {
    #[prost(bytes = "vec", repeated, tag = "1")]
    pub value: Vec<Vec<u8>>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct FloatList {
    #[prost(float, repeated, tag = "1")]
    pub value: Vec<f32>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Int64List {
    #[prost(int64, repeated, tag = "1")]
    pub value: Vec<i64>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Feature {
    #[prost(oneof = "feature::Kind", tags = "1, 2, 3")]
    pub kind: Option<feature::Kind>,
}

pub mod feature {
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Kind {
        #[prost(message, tag = "1")]
        BytesList(super::BytesList),
        #[prost(message, tag = "2")]
        FloatList(super::FloatList),
        #[prost(message, tag = "3")]
        Int64List(super::Int64List),
    }
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Features {
    #[prost(btree_map = "string, message", tag = "1")]
    pub feature: BTreeMap<String, Feature>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Example {
    #[prost(message, optional, tag = "1")]
    pub features: Option<Features>,
}

impl Feature {
    pub fn bytes<I: IntoIterator<Item = Vec<u8>>>(values: I) -> Self {
        Self { kind: Some(feature::Kind::BytesList(BytesList { value: values.into_iter().collect() })) }
    }

    pub fn floats(values: Vec<f32>) -> Self {
        Self { kind: Some(feature::Kind::FloatList(FloatList { value: values })) }
    }

    pub fn int64s(values: Vec<i64>) -> Self {
        Self { kind: Some(feature::Kind::Int64List(Int64List { value: values })) }
    }

    fn kind_name(&self) -> &'static str {
        match &self.kind {
            Some(feature::Kind::BytesList(_)) => "bytes_list",
            Some(feature::Kind::FloatList(_)) => "float_list",
            Some(feature::Kind::Int64List(_)) => "int64_list",
            None => "empty",
        }
    }
}

impl Example {
    pub fn new() -> Self {
        Self { features: Some(Features::default()) }
    }

    /// Insert or replace a named feature
    pub fn insert(&mut self, name: &str, feature: Feature) {
        self.features
            .get_or_insert_with(Features::default)
            .feature
            .insert(name.to_string(), feature);
    }

    pub fn with(mut self, name: &str, feature: Feature) -> Self {
        self.insert(name, feature);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Feature> {
        self.features.as_ref()?.feature.get(name)
    }

    pub fn feature_names(&self) -> Vec<&str> {
        self.features
            .as_ref()
            .map(|f| f.feature.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    fn require(&self, name: &str) -> Result<&Feature> {
        self.get(name)
            .ok_or_else(|| PrepError::record(format!("Missing feature '{}'", name)))
    }

    pub fn bytes_list(&self, name: &str) -> Result<&[Vec<u8>]> {
        let feature = self.require(name)?;
        match &feature.kind {
            Some(feature::Kind::BytesList(list)) => Ok(&list.value),
            _ => Err(type_mismatch(name, "bytes_list", feature)),
        }
    }

    pub fn float_list(&self, name: &str) -> Result<&[f32]> {
        let feature = self.require(name)?;
        match &feature.kind {
            Some(feature::Kind::FloatList(list)) => Ok(&list.value),
            _ => Err(type_mismatch(name, "float_list", feature)),
        }
    }

    pub fn int64_list(&self, name: &str) -> Result<&[i64]> {
        let feature = self.require(name)?;
        match &feature.kind {
            Some(feature::Kind::Int64List(list)) => Ok(&list.value),
            _ => Err(type_mismatch(name, "int64_list", feature)),
        }
    }

    /// Single-valued int64 feature
    pub fn int64(&self, name: &str) -> Result<i64> {
        match self.int64_list(name)? {
            [value] => Ok(*value),
            other => Err(PrepError::record(format!(
                "Feature '{}' should hold one int64, found {}", name, other.len()
            ))),
        }
    }

    /// Single-valued bytes feature
    pub fn bytes(&self, name: &str) -> Result<&[u8]> {
        match self.bytes_list(name)? {
            [value] => Ok(value),
            other => Err(PrepError::record(format!(
                "Feature '{}' should hold one byte string, found {}", name, other.len()
            ))),
        }
    }
}

fn type_mismatch(name: &str, expected: &str, found: &Feature) -> PrepError {
    PrepError::record(format!(
        "Feature '{}' has type {}, expected {}", name, found.kind_name(), expected
    ))
}
