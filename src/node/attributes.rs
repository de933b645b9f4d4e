//! Attribute operations on nodes
//!
//! Wraps the per-node attribute table with the locking, the fatal-tier
//! enforcement, and the event dispatch that the table itself stays free of.
//! Every mutation fires its change events while the node lock is still held.

use std::io::{Read, Write};

use crate::attribute::{Attribute, CreateOutcome};
use crate::error::{Result, SshsError};
use crate::node::listener::AttributeEvent;
use crate::node::Node;
use crate::value::{AttributeFlags, AttributeRanges, AttributeType, AttributeValue};
use crate::xml;

impl Node {
    // -------------------------------------------------------------------------
    // Core operations
    // -------------------------------------------------------------------------

    /// Define the attribute `key` at the default's type, or re-describe an
    /// existing one.
    ///
    /// A fresh attribute stores `default` and fires an added event. On an
    /// existing attribute the ranges, flags, and description are replaced;
    /// the stored value survives if it still fits the new ranges, otherwise
    /// it is replaced by `default` and a modified event fires.
    ///
    /// Impossible schemas (default outside its own ranges, string length
    /// bounds outside `[0, i32::MAX]`, notify-only on a non-bool) are
    /// contract violations and go to the fatal handler.
    pub fn create_attribute(
        &self,
        key: &str,
        default: AttributeValue,
        ranges: AttributeRanges,
        flags: AttributeFlags,
        description: &str,
    ) {
        self.ensure_alive();
        let guard = self.lock_state();

        let created = guard
            .borrow_mut()
            .attributes
            .create(key, default, ranges, flags, description);

        let outcome = match created {
            Ok(outcome) => outcome,
            Err(violation) => self.fatal(&format!("create_attribute(): {}", violation.0)),
        };

        match outcome {
            CreateOutcome::Added(value) => {
                self.dispatch_attribute_event(AttributeEvent::Added, key, &value);
            }
            CreateOutcome::Replaced(value) => {
                self.dispatch_attribute_event(AttributeEvent::Modified, key, &value);
            }
            CreateOutcome::Updated => {}
        }
    }

    /// Read the attribute `key` at `attr_type`.
    ///
    /// Reading an attribute that was never created is a contract violation
    /// and goes to the fatal handler; probe with [`Node::attribute_exists`]
    /// when unsure.
    pub fn get_attribute(&self, key: &str, attr_type: AttributeType) -> AttributeValue {
        self.ensure_alive();
        let guard = self.lock_state();

        let value = guard.borrow().attributes.get(key, attr_type);
        match value {
            Some(value) => value,
            None => self.fatal(&format!(
                "get_attribute(): attribute '{key}' of type '{attr_type}' not present, create it first"
            )),
        }
    }

    /// Update the attribute `key` at the value's type.
    ///
    /// Read-only attributes reject this path with [`SshsError::ReadOnly`];
    /// values outside the attribute's ranges are rejected with
    /// [`SshsError::OutOfRange`] and leave the stored value untouched. A
    /// successful update to a different value fires a modified event; writing
    /// the stored value again fires nothing. Updating an attribute that was
    /// never created goes to the fatal handler.
    pub fn put_attribute(&self, key: &str, value: AttributeValue) -> Result<()> {
        self.put_attribute_on_path(key, value, false)
    }

    /// Update a read-only attribute, the path reserved for the producer that
    /// owns it. Rejects attributes that are not read-only with
    /// [`SshsError::NotReadOnly`]; otherwise behaves like
    /// [`Node::put_attribute`].
    pub fn update_read_only_attribute(&self, key: &str, value: AttributeValue) -> Result<()> {
        self.put_attribute_on_path(key, value, true)
    }

    fn put_attribute_on_path(
        &self,
        key: &str,
        value: AttributeValue,
        via_read_only: bool,
    ) -> Result<()> {
        self.ensure_alive();
        let guard = self.lock_state();

        let stored = guard.borrow_mut().attributes.put(key, value, via_read_only);

        let fired = match stored {
            Ok(fired) => fired,
            Err(error @ SshsError::AttributeNotFound { .. }) => {
                let op = if via_read_only {
                    "update_read_only_attribute"
                } else {
                    "put_attribute"
                };
                self.fatal(&format!("{op}(): {error}, create it first"));
            }
            Err(error) => return Err(error),
        };

        if let Some(new_value) = fired {
            self.dispatch_attribute_event(AttributeEvent::Modified, key, &new_value);
        }

        Ok(())
    }

    /// Whether the attribute `key` exists at `attr_type`.
    pub fn attribute_exists(&self, key: &str, attr_type: AttributeType) -> bool {
        self.ensure_alive();
        let guard = self.lock_state();
        let exists = guard.borrow().attributes.contains(key, attr_type);
        exists
    }

    /// Remove the attribute `key` at `attr_type`, firing a removed event with
    /// its last value. Removing an absent attribute is a no-op.
    pub fn remove_attribute(&self, key: &str, attr_type: AttributeType) {
        self.ensure_alive();
        let guard = self.lock_state();

        let removed = guard.borrow_mut().attributes.remove(key, attr_type);

        if let Some(last_value) = removed {
            self.dispatch_attribute_event(AttributeEvent::Removed, key, &last_value);
        }
    }

    /// Remove every attribute of this node, firing a removed event for each.
    pub fn remove_all_attributes(&self) {
        self.ensure_alive();
        let guard = self.lock_state();

        let drained = guard.borrow_mut().attributes.drain_all();

        for (key, last_value) in &drained {
            self.dispatch_attribute_event(AttributeEvent::Removed, key, last_value);
        }
    }

    // -------------------------------------------------------------------------
    // Introspection
    // -------------------------------------------------------------------------

    /// The ranges of attribute `key` at `attr_type`. Absence is a contract
    /// violation.
    pub fn attribute_ranges(&self, key: &str, attr_type: AttributeType) -> AttributeRanges {
        self.ensure_alive();
        let guard = self.lock_state();
        let ranges = guard.borrow().attributes.ranges(key, attr_type);
        match ranges {
            Some(ranges) => ranges,
            None => self.fatal(&format!(
                "attribute_ranges(): attribute '{key}' of type '{attr_type}' not present, create it first"
            )),
        }
    }

    /// The flags of attribute `key` at `attr_type`. Absence is a contract
    /// violation.
    pub fn attribute_flags(&self, key: &str, attr_type: AttributeType) -> AttributeFlags {
        self.ensure_alive();
        let guard = self.lock_state();
        let flags = guard.borrow().attributes.flags(key, attr_type);
        match flags {
            Some(flags) => flags,
            None => self.fatal(&format!(
                "attribute_flags(): attribute '{key}' of type '{attr_type}' not present, create it first"
            )),
        }
    }

    /// The description of attribute `key` at `attr_type`. Absence is a
    /// contract violation.
    pub fn attribute_description(&self, key: &str, attr_type: AttributeType) -> String {
        self.ensure_alive();
        let guard = self.lock_state();
        let description = guard.borrow().attributes.description(key, attr_type);
        match description {
            Some(description) => description,
            None => self.fatal(&format!(
                "attribute_description(): attribute '{key}' of type '{attr_type}' not present, create it first"
            )),
        }
    }

    /// Distinct attribute keys in enumeration order: keys ending in
    /// `ListOptions` first, then lexicographic.
    pub fn attribute_keys(&self) -> Vec<String> {
        self.ensure_alive();
        let guard = self.lock_state();
        let keys = guard.borrow().attributes.keys();
        keys
    }

    /// The types present under `key`, in canonical type order. Empty if the
    /// key does not exist.
    pub fn attribute_types(&self, key: &str) -> Vec<AttributeType> {
        self.ensure_alive();
        let guard = self.lock_state();
        let types = guard.borrow().attributes.types_of(key);
        types
    }

    /// Full attribute snapshot in enumeration order, for the XML exporter.
    pub(crate) fn attributes_snapshot(&self) -> Vec<(String, Attribute)> {
        self.ensure_alive();
        let guard = self.lock_state();
        let snapshot = guard.borrow().attributes.enumerate();
        snapshot
    }

    // -------------------------------------------------------------------------
    // String-typed access
    // -------------------------------------------------------------------------

    /// Update or bootstrap an attribute from its string forms, the entry
    /// point used by the XML importer and remote configuration.
    ///
    /// `type_str` and `value_str` are parsed first; unknown types and
    /// malformed values are recoverable errors. A value no ranges could admit
    /// (a non-finite float, say) is rejected the same way, since documents
    /// are untrusted input. If the attribute exists the parsed value goes
    /// through the normal update path. If it does not, it is created on the
    /// spot with maximal ranges and flagged `NO_EXPORT`, ready to be
    /// re-described by [`Node::create_attribute`] later.
    pub fn put_attribute_from_strings(
        &self,
        key: &str,
        type_str: &str,
        value_str: &str,
    ) -> Result<()> {
        self.ensure_alive();

        let attr_type: AttributeType = type_str.parse()?;
        let value = AttributeValue::parse(attr_type, value_str)?;

        if AttributeRanges::full(attr_type).admits(&value) != Some(true) {
            return Err(SshsError::InvalidValue {
                attr_type,
                value: value_str.to_string(),
            });
        }

        // One continuous hold of the node lock keeps probe and write atomic.
        let _guard = self.lock_state();

        if self.attribute_exists(key, attr_type) {
            self.put_attribute(key, value)
        } else {
            self.create_attribute(
                key,
                value,
                AttributeRanges::full(attr_type),
                AttributeFlags::NORMAL | AttributeFlags::NO_EXPORT,
                "XML loaded value.",
            );
            Ok(())
        }
    }

    // -------------------------------------------------------------------------
    // Typed convenience accessors
    // -------------------------------------------------------------------------

    /// Typed shorthand for [`Node::create_attribute`]. Bool attributes carry
    /// no meaningful ranges.
    pub fn create_bool(&self, key: &str, default: bool, flags: AttributeFlags, description: &str) {
        self.create_attribute(
            key,
            AttributeValue::Bool(default),
            AttributeRanges::none(),
            flags,
            description,
        );
    }

    pub fn create_byte(
        &self,
        key: &str,
        default: i8,
        min: i8,
        max: i8,
        flags: AttributeFlags,
        description: &str,
    ) {
        self.create_attribute(
            key,
            AttributeValue::Byte(default),
            AttributeRanges::Integer {
                min: i64::from(min),
                max: i64::from(max),
            },
            flags,
            description,
        );
    }

    pub fn create_short(
        &self,
        key: &str,
        default: i16,
        min: i16,
        max: i16,
        flags: AttributeFlags,
        description: &str,
    ) {
        self.create_attribute(
            key,
            AttributeValue::Short(default),
            AttributeRanges::Integer {
                min: i64::from(min),
                max: i64::from(max),
            },
            flags,
            description,
        );
    }

    pub fn create_int(
        &self,
        key: &str,
        default: i32,
        min: i32,
        max: i32,
        flags: AttributeFlags,
        description: &str,
    ) {
        self.create_attribute(
            key,
            AttributeValue::Int(default),
            AttributeRanges::Integer {
                min: i64::from(min),
                max: i64::from(max),
            },
            flags,
            description,
        );
    }

    pub fn create_long(
        &self,
        key: &str,
        default: i64,
        min: i64,
        max: i64,
        flags: AttributeFlags,
        description: &str,
    ) {
        self.create_attribute(
            key,
            AttributeValue::Long(default),
            AttributeRanges::Integer { min, max },
            flags,
            description,
        );
    }

    pub fn create_float(
        &self,
        key: &str,
        default: f32,
        min: f32,
        max: f32,
        flags: AttributeFlags,
        description: &str,
    ) {
        self.create_attribute(
            key,
            AttributeValue::Float(default),
            AttributeRanges::Real {
                min: f64::from(min),
                max: f64::from(max),
            },
            flags,
            description,
        );
    }

    pub fn create_double(
        &self,
        key: &str,
        default: f64,
        min: f64,
        max: f64,
        flags: AttributeFlags,
        description: &str,
    ) {
        self.create_attribute(
            key,
            AttributeValue::Double(default),
            AttributeRanges::Real { min, max },
            flags,
            description,
        );
    }

    /// String attributes are bounded by byte length, not value.
    pub fn create_string(
        &self,
        key: &str,
        default: &str,
        min_length: usize,
        max_length: usize,
        flags: AttributeFlags,
        description: &str,
    ) {
        self.create_attribute(
            key,
            AttributeValue::String(default.to_owned()),
            AttributeRanges::Integer {
                min: min_length as i64,
                max: max_length as i64,
            },
            flags,
            description,
        );
    }

    pub fn put_bool(&self, key: &str, value: bool) -> Result<()> {
        self.put_attribute(key, AttributeValue::Bool(value))
    }

    pub fn put_byte(&self, key: &str, value: i8) -> Result<()> {
        self.put_attribute(key, AttributeValue::Byte(value))
    }

    pub fn put_short(&self, key: &str, value: i16) -> Result<()> {
        self.put_attribute(key, AttributeValue::Short(value))
    }

    pub fn put_int(&self, key: &str, value: i32) -> Result<()> {
        self.put_attribute(key, AttributeValue::Int(value))
    }

    pub fn put_long(&self, key: &str, value: i64) -> Result<()> {
        self.put_attribute(key, AttributeValue::Long(value))
    }

    pub fn put_float(&self, key: &str, value: f32) -> Result<()> {
        self.put_attribute(key, AttributeValue::Float(value))
    }

    pub fn put_double(&self, key: &str, value: f64) -> Result<()> {
        self.put_attribute(key, AttributeValue::Double(value))
    }

    pub fn put_string(&self, key: &str, value: &str) -> Result<()> {
        self.put_attribute(key, AttributeValue::String(value.to_owned()))
    }

    pub fn get_bool(&self, key: &str) -> bool {
        let AttributeValue::Bool(value) = self.get_attribute(key, AttributeType::Bool) else {
            unreachable!("typed lookup returned a mismatched variant");
        };
        value
    }

    pub fn get_byte(&self, key: &str) -> i8 {
        let AttributeValue::Byte(value) = self.get_attribute(key, AttributeType::Byte) else {
            unreachable!("typed lookup returned a mismatched variant");
        };
        value
    }

    pub fn get_short(&self, key: &str) -> i16 {
        let AttributeValue::Short(value) = self.get_attribute(key, AttributeType::Short) else {
            unreachable!("typed lookup returned a mismatched variant");
        };
        value
    }

    pub fn get_int(&self, key: &str) -> i32 {
        let AttributeValue::Int(value) = self.get_attribute(key, AttributeType::Int) else {
            unreachable!("typed lookup returned a mismatched variant");
        };
        value
    }

    pub fn get_long(&self, key: &str) -> i64 {
        let AttributeValue::Long(value) = self.get_attribute(key, AttributeType::Long) else {
            unreachable!("typed lookup returned a mismatched variant");
        };
        value
    }

    pub fn get_float(&self, key: &str) -> f32 {
        let AttributeValue::Float(value) = self.get_attribute(key, AttributeType::Float) else {
            unreachable!("typed lookup returned a mismatched variant");
        };
        value
    }

    pub fn get_double(&self, key: &str) -> f64 {
        let AttributeValue::Double(value) = self.get_attribute(key, AttributeType::Double) else {
            unreachable!("typed lookup returned a mismatched variant");
        };
        value
    }

    pub fn get_string(&self, key: &str) -> String {
        let AttributeValue::String(value) = self.get_attribute(key, AttributeType::String) else {
            unreachable!("typed lookup returned a mismatched variant");
        };
        value
    }

    // -------------------------------------------------------------------------
    // XML exchange
    // -------------------------------------------------------------------------

    /// Export this node's attributes (children excluded) as an XML document.
    pub fn export_node_to_xml<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.ensure_alive();
        xml::export_node(self, writer, false)
    }

    /// Export this node and its whole subtree as an XML document.
    pub fn export_sub_tree_to_xml<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.ensure_alive();
        xml::export_node(self, writer, true)
    }

    /// Import attribute values for this node (children ignored) from an XML
    /// document. With `strict`, the document's node name must match this
    /// node's name.
    pub fn import_node_from_xml<R: Read>(&self, reader: &mut R, strict: bool) -> Result<()> {
        self.ensure_alive();
        xml::import_node(self, reader, false, strict)
    }

    /// Import attribute values for this node and its subtree from an XML
    /// document, creating missing child nodes along the way.
    pub fn import_sub_tree_from_xml<R: Read>(&self, reader: &mut R, strict: bool) -> Result<()> {
        self.ensure_alive();
        xml::import_node(self, reader, true, strict)
    }
}
