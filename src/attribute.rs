//! Per-node attribute storage
//!
//! A pure container keyed by attribute key, holding at most one slot per
//! value type under each key (the same key may legally exist at several
//! types at once). All schema checking happens here; the node layer decides
//! which failures are recoverable and which go to the fatal handler, and it
//! alone dispatches change events from the outcomes returned here.

use std::collections::HashMap;

use crate::error::SshsError;
use crate::value::{AttributeFlags, AttributeRanges, AttributeType, AttributeValue};

/// Keys ending in this suffix enumerate before all others, so user interfaces
/// can render an option list ahead of the attribute that selects from it.
const LIST_OPTIONS_SUFFIX: &str = "ListOptions";

/// A schema violation detected while creating an attribute. Always escalated
/// to the fatal handler by the node layer.
#[derive(Debug)]
pub(crate) struct UsageViolation(pub(crate) String);

/// Outcome of a create call, driving event dispatch in the node layer.
#[derive(Debug)]
pub(crate) enum CreateOutcome {
    /// Fresh attribute stored; fire an added event with the default value.
    Added(AttributeValue),
    /// Existing attribute re-described; the stored value fell outside the new
    /// ranges and was replaced by the new default. Fire a modified event.
    Replaced(AttributeValue),
    /// Existing attribute re-described; the stored value still fits. No event.
    Updated,
}

// =============================================================================
// Attribute
// =============================================================================

/// A single typed, range-checked, flagged value with a human description.
#[derive(Debug, Clone)]
pub(crate) struct Attribute {
    value: AttributeValue,
    ranges: AttributeRanges,
    flags: AttributeFlags,
    description: String,
}

impl Attribute {
    pub(crate) fn value(&self) -> &AttributeValue {
        &self.value
    }

    pub(crate) fn attr_type(&self) -> AttributeType {
        self.value.attr_type()
    }

    pub(crate) fn ranges(&self) -> AttributeRanges {
        self.ranges
    }

    pub(crate) fn flags(&self) -> AttributeFlags {
        self.flags
    }

    pub(crate) fn description(&self) -> &str {
        &self.description
    }
}

// =============================================================================
// AttributeTable
// =============================================================================

/// The attribute container of one node.
#[derive(Debug, Default)]
pub(crate) struct AttributeTable {
    entries: HashMap<String, Vec<Attribute>>,
}

impl AttributeTable {
    fn slot(&self, key: &str, attr_type: AttributeType) -> Option<&Attribute> {
        self.entries
            .get(key)?
            .iter()
            .find(|attribute| attribute.attr_type() == attr_type)
    }

    /// Define or re-describe the attribute `key` at the default's type.
    ///
    /// A fresh attribute stores the default. An existing one keeps its value
    /// but takes over the new ranges, flags, and description; if the stored
    /// value no longer fits the new ranges it is replaced by the default.
    pub(crate) fn create(
        &mut self,
        key: &str,
        default: AttributeValue,
        ranges: AttributeRanges,
        flags: AttributeFlags,
        description: &str,
    ) -> Result<CreateOutcome, UsageViolation> {
        let attr_type = default.attr_type();

        if attr_type == AttributeType::String {
            let (min, max) = match ranges {
                AttributeRanges::Integer { min, max } => (min, max),
                AttributeRanges::Real { .. } => {
                    return Err(UsageViolation(format!(
                        "attribute '{key}' of type '{attr_type}' needs integer length ranges, got real ranges"
                    )));
                }
            };
            let window = 0..=i64::from(i32::MAX);
            if !window.contains(&min) || !window.contains(&max) {
                return Err(UsageViolation(format!(
                    "attribute '{key}' of type '{attr_type}' has length ranges [{min}, {max}] outside the allowed [0, {}]",
                    i32::MAX
                )));
            }
        }

        match ranges.admits(&default) {
            Some(true) => {}
            Some(false) => {
                return Err(UsageViolation(format!(
                    "attribute '{key}' of type '{attr_type}' has default value '{default}' outside range {ranges}"
                )));
            }
            None => {
                return Err(UsageViolation(format!(
                    "attribute '{key}' of type '{attr_type}' cannot be bounded by {} ranges",
                    ranges.kind()
                )));
            }
        }

        if flags.contains(AttributeFlags::NOTIFY_ONLY) && attr_type != AttributeType::Bool {
            return Err(UsageViolation(format!(
                "attribute '{key}' of type '{attr_type}' requests NOTIFY_ONLY, which only bool attributes support"
            )));
        }

        let slots = self.entries.entry(key.to_owned()).or_default();
        match slots
            .iter_mut()
            .find(|attribute| attribute.attr_type() == attr_type)
        {
            None => {
                slots.push(Attribute {
                    value: default.clone(),
                    ranges,
                    flags,
                    description: description.to_owned(),
                });
                Ok(CreateOutcome::Added(default))
            }
            Some(existing) => {
                existing.ranges = ranges;
                existing.flags = flags;
                existing.description = description.to_owned();
                if existing.ranges.admits(&existing.value) == Some(true) {
                    Ok(CreateOutcome::Updated)
                } else {
                    existing.value = default.clone();
                    Ok(CreateOutcome::Replaced(default))
                }
            }
        }
    }

    /// Current value of `key` at `attr_type`, if present.
    pub(crate) fn get(&self, key: &str, attr_type: AttributeType) -> Option<AttributeValue> {
        self.slot(key, attr_type).map(|attribute| attribute.value.clone())
    }

    pub(crate) fn contains(&self, key: &str, attr_type: AttributeType) -> bool {
        self.slot(key, attr_type).is_some()
    }

    /// Update the attribute `key` at the value's type.
    ///
    /// `via_read_only` selects the update path: the normal path rejects
    /// read-only attributes, the read-only path accepts only them. On success
    /// the returned option carries the new value when it differed from the
    /// stored one (the caller fires a modified event with it), and is `None`
    /// for an unchanged write. Notify-only attributes report the difference
    /// but never store the value.
    pub(crate) fn put(
        &mut self,
        key: &str,
        value: AttributeValue,
        via_read_only: bool,
    ) -> Result<Option<AttributeValue>, SshsError> {
        let attr_type = value.attr_type();

        let attribute = match self
            .entries
            .get_mut(key)
            .and_then(|slots| slots.iter_mut().find(|a| a.attr_type() == attr_type))
        {
            Some(attribute) => attribute,
            None => {
                return Err(SshsError::AttributeNotFound {
                    key: key.to_owned(),
                    attr_type,
                });
            }
        };

        let read_only = attribute.flags.contains(AttributeFlags::READ_ONLY);
        if read_only != via_read_only {
            return Err(if read_only {
                SshsError::ReadOnly {
                    key: key.to_owned(),
                    attr_type,
                }
            } else {
                SshsError::NotReadOnly {
                    key: key.to_owned(),
                    attr_type,
                }
            });
        }

        if attribute.ranges.admits(&value) != Some(true) {
            return Err(SshsError::OutOfRange {
                key: key.to_owned(),
                attr_type,
                value: value.to_string(),
                ranges: attribute.ranges,
            });
        }

        let changed = attribute.value != value;

        if !attribute.flags.contains(AttributeFlags::NOTIFY_ONLY) {
            attribute.value = value.clone();
        }

        Ok(changed.then_some(value))
    }

    /// Remove `key` at `attr_type`, returning the last stored value if it was
    /// present (the caller fires a removed event with it).
    pub(crate) fn remove(&mut self, key: &str, attr_type: AttributeType) -> Option<AttributeValue> {
        let slots = self.entries.get_mut(key)?;
        let index = slots
            .iter()
            .position(|attribute| attribute.attr_type() == attr_type)?;
        let removed = slots.remove(index);
        if slots.is_empty() {
            self.entries.remove(key);
        }
        Some(removed.value)
    }

    /// Remove everything, returning the removed (key, last value) pairs in
    /// enumeration order.
    pub(crate) fn drain_all(&mut self) -> Vec<(String, AttributeValue)> {
        let drained = self
            .enumerate()
            .into_iter()
            .map(|(key, attribute)| (key, attribute.value))
            .collect();
        self.entries.clear();
        drained
    }

    /// Distinct attribute keys in enumeration order.
    pub(crate) fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.keys().cloned().collect();
        keys.sort_by(|a, b| enumeration_key_order(a, b));
        keys
    }

    /// The types present under `key`, in canonical type order.
    pub(crate) fn types_of(&self, key: &str) -> Vec<AttributeType> {
        let mut types: Vec<AttributeType> = self
            .entries
            .get(key)
            .map(|slots| slots.iter().map(Attribute::attr_type).collect())
            .unwrap_or_default();
        types.sort();
        types
    }

    pub(crate) fn ranges(&self, key: &str, attr_type: AttributeType) -> Option<AttributeRanges> {
        self.slot(key, attr_type).map(Attribute::ranges)
    }

    pub(crate) fn flags(&self, key: &str, attr_type: AttributeType) -> Option<AttributeFlags> {
        self.slot(key, attr_type).map(Attribute::flags)
    }

    pub(crate) fn description(&self, key: &str, attr_type: AttributeType) -> Option<String> {
        self.slot(key, attr_type)
            .map(|attribute| attribute.description.clone())
    }

    /// Snapshot of every attribute in enumeration order: option-list keys
    /// first, then lexicographic by key, then canonical type order.
    pub(crate) fn enumerate(&self) -> Vec<(String, Attribute)> {
        let mut all: Vec<(String, Attribute)> = self
            .entries
            .iter()
            .flat_map(|(key, slots)| slots.iter().map(move |a| (key.clone(), a.clone())))
            .collect();
        all.sort_by(|(a_key, a), (b_key, b)| {
            enumeration_key_order(a_key, b_key).then_with(|| a.attr_type().cmp(&b.attr_type()))
        });
        all
    }
}

/// Keys ending in [`LIST_OPTIONS_SUFFIX`] sort first, everything else in byte
/// order.
fn enumeration_key_order(a: &str, b: &str) -> std::cmp::Ordering {
    let a_list = a.ends_with(LIST_OPTIONS_SUFFIX);
    let b_list = b.ends_with(LIST_OPTIONS_SUFFIX);
    b_list.cmp(&a_list).then_with(|| a.cmp(b))
}
