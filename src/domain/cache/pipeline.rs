//! Batched cache operations

use std::time::Duration;

/// A single operation inside a pipeline
#[derive(Debug, Clone, PartialEq)]
pub enum CacheOp {
    Get { key: String },
    Set { key: String, value: String, ttl: Duration },
    Delete { key: String },
}

impl CacheOp {
    pub fn get(key: impl Into<String>) -> Self {
        Self::Get { key: key.into() }
    }

    pub fn set(key: impl Into<String>, value: impl Into<String>, ttl: Duration) -> Self {
        Self::Set {
            key: key.into(),
            value: value.into(),
            ttl,
        }
    }

    pub fn delete(key: impl Into<String>) -> Self {
        Self::Delete { key: key.into() }
    }

    pub fn key(&self) -> &str {
        match self {
            Self::Get { key } | Self::Set { key, .. } | Self::Delete { key } => key,
        }
    }
}

/// Result of one pipelined operation, positionally matching its `CacheOp`
#[derive(Debug, Clone, PartialEq)]
pub enum CacheOpResult {
    /// Result of a `Get`
    Value(Option<String>),
    /// Result of a `Set`
    Stored,
    /// Result of a `Delete`: whether the key existed
    Deleted(bool),
}

impl CacheOpResult {
    pub fn into_value(self) -> Option<String> {
        match self {
            Self::Value(value) => value,
            _ => None,
        }
    }
}

/// Builder for a batch of cache operations
#[derive(Debug, Clone, Default)]
pub struct CachePipeline {
    ops: Vec<CacheOp>,
}

impl CachePipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(mut self, key: impl Into<String>) -> Self {
        self.ops.push(CacheOp::get(key));
        self
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>, ttl: Duration) -> Self {
        self.ops.push(CacheOp::set(key, value, ttl));
        self
    }

    pub fn delete(mut self, key: impl Into<String>) -> Self {
        self.ops.push(CacheOp::delete(key));
        self
    }

    pub fn push(&mut self, op: CacheOp) {
        self.ops.push(op);
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[CacheOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<CacheOp> {
        self.ops
    }
}
