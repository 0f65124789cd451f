//! Approximate retained-size accounting for object graphs.
//!
//! One walk charges every reachable object once under two cost models: the
//! legacy model (key bytes only, fixed string header) and the revised model
//! (adds a header per key and the payload of every string). The walk is
//! bounded by a [`MemUsageBudget`]; running out of any dimension aborts the
//! whole estimate.

use super::JsObjectData;
use crate::types::{JsBigInt, JsObject, JsString, JsValue, number_ops};
use rustc_hash::FxHashSet;
use std::collections::VecDeque;
use std::fmt;
use thiserror::Error;

pub const SIZE_EMPTY_STRUCT: u64 = 8;
pub const SIZE_BOOL: u64 = 1;
pub const SIZE_INT: u64 = 8;
pub const SIZE_NUMBER: u64 = 8;
pub const SIZE_STRING: u64 = 16;
pub const SIZE_BIGINT: u64 = 16;

/// Per-value costs. Object overhead and buffer storage are shared by all
/// models and charged by the walker itself.
pub trait SizeModel {
    fn key(&self, key: &str) -> u64;
    fn string(&self, s: &JsString) -> u64;
    fn bigint(&self, b: &JsBigInt) -> u64;

    fn number(&self, n: f64) -> u64 {
        if number_ops::is_integral(n) { SIZE_INT } else { SIZE_NUMBER }
    }

    fn boolean(&self) -> u64 {
        SIZE_BOOL
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Legacy;

#[derive(Debug, Clone, Copy, Default)]
pub struct Revised;

impl SizeModel for Legacy {
    fn key(&self, key: &str) -> u64 {
        key.len() as u64
    }

    fn string(&self, _s: &JsString) -> u64 {
        SIZE_STRING
    }

    fn bigint(&self, _b: &JsBigInt) -> u64 {
        SIZE_BIGINT
    }
}

impl SizeModel for Revised {
    fn key(&self, key: &str) -> u64 {
        key.len() as u64 + SIZE_STRING
    }

    fn string(&self, s: &JsString) -> u64 {
        SIZE_STRING + s.utf8_len() as u64
    }

    fn bigint(&self, b: &JsBigInt) -> u64 {
        SIZE_BIGINT + b.magnitude_bytes() as u64
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemUsage {
    pub legacy: u64,
    pub revised: u64,
}

impl fmt::Display for MemUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "legacy {} bytes, revised {} bytes", self.legacy, self.revised)
    }
}

/// Limits for one estimation. `max_total` and `max_string_bytes` are
/// measured under the revised model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemUsageBudget {
    pub max_depth: usize,
    pub max_objects: usize,
    pub max_total: u64,
    pub max_string_bytes: u64,
}

impl Default for MemUsageBudget {
    fn default() -> Self {
        Self {
            max_depth: 256,
            max_objects: 1 << 20,
            max_total: 1 << 30,
            max_string_bytes: 1 << 28,
        }
    }
}

impl MemUsageBudget {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_max_objects(mut self, max_objects: usize) -> Self {
        self.max_objects = max_objects;
        self
    }

    pub fn with_max_total(mut self, max_total: u64) -> Self {
        self.max_total = max_total;
        self
    }

    pub fn with_max_string_bytes(mut self, max_string_bytes: u64) -> Self {
        self.max_string_bytes = max_string_bytes;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetResource {
    Depth,
    Objects,
    TotalBytes,
    StringBytes,
}

impl fmt::Display for BudgetResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BudgetResource::Depth => "depth",
            BudgetResource::Objects => "objects",
            BudgetResource::TotalBytes => "total bytes",
            BudgetResource::StringBytes => "string bytes",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemUsageError {
    #[error("memory estimate budget exhausted: {resource} limit of {limit}")]
    BudgetExhausted { resource: BudgetResource, limit: u64 },
}

struct Walker<'a> {
    budget: &'a MemUsageBudget,
    visited: FxHashSet<usize>,
    // FIFO, so an object is first reached on its shortest path from the root
    worklist: VecDeque<(JsObject, usize)>,
    usage: MemUsage,
    objects: usize,
    string_bytes: u64,
}

impl<'a> Walker<'a> {
    fn new(budget: &'a MemUsageBudget) -> Self {
        Self {
            budget,
            visited: FxHashSet::default(),
            worklist: VecDeque::new(),
            usage: MemUsage::default(),
            objects: 0,
            string_bytes: 0,
        }
    }

    fn exhausted(&self, resource: BudgetResource, limit: u64) -> MemUsageError {
        log::warn!(
            "memory estimate aborted after {} objects: {resource} limit of {limit} reached",
            self.objects
        );
        MemUsageError::BudgetExhausted { resource, limit }
    }

    fn charge(&mut self, cost: impl Fn(&dyn SizeModel) -> u64) -> Result<(), MemUsageError> {
        let (legacy, revised): (&dyn SizeModel, &dyn SizeModel) = (&Legacy, &Revised);
        self.usage.legacy += cost(legacy);
        self.usage.revised += cost(revised);
        if self.usage.revised > self.budget.max_total {
            return Err(self.exhausted(BudgetResource::TotalBytes, self.budget.max_total));
        }
        Ok(())
    }

    fn charge_flat(&mut self, bytes: u64) -> Result<(), MemUsageError> {
        self.charge(|_| bytes)
    }

    fn count_string_bytes(&mut self, bytes: u64) -> Result<(), MemUsageError> {
        self.string_bytes += bytes;
        if self.string_bytes > self.budget.max_string_bytes {
            return Err(self.exhausted(
                BudgetResource::StringBytes,
                self.budget.max_string_bytes,
            ));
        }
        Ok(())
    }

    fn run(&mut self, root: &JsObject) -> Result<(), MemUsageError> {
        self.worklist.push_back((root.clone(), 0));
        while let Some((obj, depth)) = self.worklist.pop_front() {
            self.visit(&obj, depth)?;
        }
        Ok(())
    }

    fn visit(&mut self, obj: &JsObject, depth: usize) -> Result<(), MemUsageError> {
        if !self.visited.insert(obj.addr()) {
            return Ok(());
        }
        if depth > self.budget.max_depth {
            return Err(self.exhausted(BudgetResource::Depth, self.budget.max_depth as u64));
        }
        self.objects += 1;
        if self.objects > self.budget.max_objects {
            return Err(self.exhausted(BudgetResource::Objects, self.budget.max_objects as u64));
        }
        let data = obj.borrow();
        log::trace!("memusage: visiting {} at depth {depth}", data.class_name);
        self.charge_flat(SIZE_EMPTY_STRUCT)?;
        if let Some(ref state) = data.array_buffer {
            self.charge_flat(state.byte_length() as u64)?;
        }
        if let Some(ref ta) = data.typed_array_info {
            self.charge_flat(SIZE_EMPTY_STRUCT)?;
            self.worklist.push_back((ta.buffer.clone(), depth + 1));
            if let Some(ref ctor) = ta.default_ctor {
                self.worklist.push_back((ctor.clone(), depth + 1));
            }
        }
        if let Some(ref dv) = data.data_view_info {
            self.charge_flat(SIZE_EMPTY_STRUCT)?;
            self.worklist.push_back((dv.buffer.clone(), depth + 1));
        }
        self.properties(&data, depth)
    }

    fn properties(&mut self, data: &JsObjectData, depth: usize) -> Result<(), MemUsageError> {
        for key in &data.property_order {
            let Some(desc) = data.properties.get(key) else {
                continue;
            };
            self.count_string_bytes(key.len() as u64)?;
            self.charge(|m| m.key(key))?;
            for value in [&desc.value, &desc.get, &desc.set].into_iter().flatten() {
                self.value(value, depth)?;
            }
        }
        Ok(())
    }

    fn value(&mut self, value: &JsValue, depth: usize) -> Result<(), MemUsageError> {
        match value {
            JsValue::Undefined | JsValue::Null => Ok(()),
            JsValue::Boolean(_) => self.charge(|m| m.boolean()),
            JsValue::Number(n) => self.charge(|m| m.number(*n)),
            JsValue::String(s) => {
                self.count_string_bytes(s.utf8_len() as u64)?;
                self.charge(|m| m.string(s))
            }
            JsValue::BigInt(b) => self.charge(|m| m.bigint(b)),
            JsValue::Object(o) => {
                self.worklist.push_back((o.clone(), depth + 1));
                Ok(())
            }
        }
    }
}

/// Estimates the memory retained by `root` under both cost models.
/// Prototype links are not followed.
pub fn estimate_memory(
    root: Option<&JsObject>,
    budget: &MemUsageBudget,
) -> Result<MemUsage, MemUsageError> {
    let Some(root) = root else {
        return Ok(MemUsage {
            legacy: SIZE_EMPTY_STRUCT,
            revised: SIZE_EMPTY_STRUCT,
        });
    };
    let mut walker = Walker::new(budget);
    walker.run(root)?;
    log::debug!("memusage: {} objects, {}", walker.objects, walker.usage);
    Ok(walker.usage)
}
