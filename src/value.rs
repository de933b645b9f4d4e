//! Attribute value model
//!
//! The tagged value union stored in every attribute, its type tags, the range
//! bounds and flag bits attached at creation time, and the canonical string
//! forms used by the XML exchange format.
//!
//! ## Canonical string forms
//!
//! - Booleans render as `true`/`false` and parse only those two words.
//! - Integers render in decimal and parse decimal only.
//! - Floats render through Rust's shortest-round-trip formatting, so an
//!   exported value parses back to the identical bits.
//! - Strings pass through verbatim.

use std::fmt;
use std::ops::BitOr;
use std::str::FromStr;

use crate::error::SshsError;

// =============================================================================
// Type tags
// =============================================================================

/// The value types an attribute can hold.
///
/// The `Ord` impl gives the stable tie-break order used when several types
/// share one attribute key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttributeType {
    Bool,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    String,
}

impl AttributeType {
    /// Every type tag, in canonical order.
    pub const ALL: [AttributeType; 8] = [
        AttributeType::Bool,
        AttributeType::Byte,
        AttributeType::Short,
        AttributeType::Int,
        AttributeType::Long,
        AttributeType::Float,
        AttributeType::Double,
        AttributeType::String,
    ];

    /// The lowercase name used in the XML `type` attribute.
    pub fn as_str(self) -> &'static str {
        match self {
            AttributeType::Bool => "bool",
            AttributeType::Byte => "byte",
            AttributeType::Short => "short",
            AttributeType::Int => "int",
            AttributeType::Long => "long",
            AttributeType::Float => "float",
            AttributeType::Double => "double",
            AttributeType::String => "string",
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttributeType {
    type Err = SshsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bool" => Ok(AttributeType::Bool),
            "byte" => Ok(AttributeType::Byte),
            "short" => Ok(AttributeType::Short),
            "int" => Ok(AttributeType::Int),
            "long" => Ok(AttributeType::Long),
            "float" => Ok(AttributeType::Float),
            "double" => Ok(AttributeType::Double),
            "string" => Ok(AttributeType::String),
            other => Err(SshsError::UnknownType(other.to_string())),
        }
    }
}

// =============================================================================
// Values
// =============================================================================

/// A typed attribute value.
///
/// The variant is the type: a value can never disagree with its type tag.
/// Equality is the change-detection rule for update events, so two floats
/// compare by `==` on purpose.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Bool(bool),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
}

impl AttributeValue {
    /// The type tag of this value.
    pub fn attr_type(&self) -> AttributeType {
        match self {
            AttributeValue::Bool(_) => AttributeType::Bool,
            AttributeValue::Byte(_) => AttributeType::Byte,
            AttributeValue::Short(_) => AttributeType::Short,
            AttributeValue::Int(_) => AttributeType::Int,
            AttributeValue::Long(_) => AttributeType::Long,
            AttributeValue::Float(_) => AttributeType::Float,
            AttributeValue::Double(_) => AttributeType::Double,
            AttributeValue::String(_) => AttributeType::String,
        }
    }

    /// Parse the canonical string form into a value of `attr_type`.
    ///
    /// Numeric forms are decimal only; booleans accept exactly `true` and
    /// `false`. Surrounding whitespace is tolerated for everything except
    /// strings, which pass through verbatim.
    pub fn parse(attr_type: AttributeType, text: &str) -> Result<Self, SshsError> {
        let invalid = || SshsError::InvalidValue {
            attr_type,
            value: text.to_string(),
        };

        match attr_type {
            AttributeType::Bool => match text.trim() {
                "true" => Ok(AttributeValue::Bool(true)),
                "false" => Ok(AttributeValue::Bool(false)),
                _ => Err(invalid()),
            },
            AttributeType::Byte => text
                .trim()
                .parse::<i8>()
                .map(AttributeValue::Byte)
                .map_err(|_| invalid()),
            AttributeType::Short => text
                .trim()
                .parse::<i16>()
                .map(AttributeValue::Short)
                .map_err(|_| invalid()),
            AttributeType::Int => text
                .trim()
                .parse::<i32>()
                .map(AttributeValue::Int)
                .map_err(|_| invalid()),
            AttributeType::Long => text
                .trim()
                .parse::<i64>()
                .map(AttributeValue::Long)
                .map_err(|_| invalid()),
            AttributeType::Float => text
                .trim()
                .parse::<f32>()
                .map(AttributeValue::Float)
                .map_err(|_| invalid()),
            AttributeType::Double => text
                .trim()
                .parse::<f64>()
                .map(AttributeValue::Double)
                .map_err(|_| invalid()),
            AttributeType::String => Ok(AttributeValue::String(text.to_string())),
        }
    }
}

impl fmt::Display for AttributeValue {
    /// Renders the canonical string form used in XML documents.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Bool(v) => write!(f, "{v}"),
            AttributeValue::Byte(v) => write!(f, "{v}"),
            AttributeValue::Short(v) => write!(f, "{v}"),
            AttributeValue::Int(v) => write!(f, "{v}"),
            AttributeValue::Long(v) => write!(f, "{v}"),
            AttributeValue::Float(v) => write!(f, "{v}"),
            AttributeValue::Double(v) => write!(f, "{v}"),
            AttributeValue::String(v) => f.write_str(v),
        }
    }
}

// =============================================================================
// Ranges
// =============================================================================

/// Admissible-value bounds attached to an attribute at creation time.
///
/// Integer bounds cover the four integer types and the byte length of string
/// values; real bounds cover `float` and `double`. Bool attributes carry
/// ranges but never check them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttributeRanges {
    Integer { min: i64, max: i64 },
    Real { min: f64, max: f64 },
}

impl AttributeRanges {
    /// Placeholder ranges for bool attributes; never consulted.
    pub const fn none() -> Self {
        AttributeRanges::Integer { min: 0, max: 0 }
    }

    /// The widest ranges admitting every value of `attr_type`. Used to
    /// bootstrap attributes from XML documents.
    pub fn full(attr_type: AttributeType) -> Self {
        match attr_type {
            AttributeType::Bool => AttributeRanges::none(),
            AttributeType::Byte => AttributeRanges::Integer {
                min: i64::from(i8::MIN),
                max: i64::from(i8::MAX),
            },
            AttributeType::Short => AttributeRanges::Integer {
                min: i64::from(i16::MIN),
                max: i64::from(i16::MAX),
            },
            AttributeType::Int => AttributeRanges::Integer {
                min: i64::from(i32::MIN),
                max: i64::from(i32::MAX),
            },
            AttributeType::Long => AttributeRanges::Integer {
                min: i64::MIN,
                max: i64::MAX,
            },
            AttributeType::Float => AttributeRanges::Real {
                min: f64::from(-f32::MAX),
                max: f64::from(f32::MAX),
            },
            AttributeType::Double => AttributeRanges::Real {
                min: -f64::MAX,
                max: f64::MAX,
            },
            AttributeType::String => AttributeRanges::Integer {
                min: 0,
                max: i64::from(i32::MAX),
            },
        }
    }

    /// Whether `value` satisfies these bounds under its type's rule.
    ///
    /// Integer values and string lengths widen to `i64`, floats widen to
    /// `f64`, bools always pass. Returns `None` when the ranges kind cannot
    /// bound the value's type at all; the caller escalates that mismatch.
    pub(crate) fn admits(&self, value: &AttributeValue) -> Option<bool> {
        match (value, self) {
            (AttributeValue::Bool(_), _) => Some(true),
            (AttributeValue::Byte(v), AttributeRanges::Integer { min, max }) => {
                Some(i64::from(*v) >= *min && i64::from(*v) <= *max)
            }
            (AttributeValue::Short(v), AttributeRanges::Integer { min, max }) => {
                Some(i64::from(*v) >= *min && i64::from(*v) <= *max)
            }
            (AttributeValue::Int(v), AttributeRanges::Integer { min, max }) => {
                Some(i64::from(*v) >= *min && i64::from(*v) <= *max)
            }
            (AttributeValue::Long(v), AttributeRanges::Integer { min, max }) => {
                Some(*v >= *min && *v <= *max)
            }
            (AttributeValue::Float(v), AttributeRanges::Real { min, max }) => {
                Some(f64::from(*v) >= *min && f64::from(*v) <= *max)
            }
            (AttributeValue::Double(v), AttributeRanges::Real { min, max }) => {
                Some(*v >= *min && *v <= *max)
            }
            (AttributeValue::String(s), AttributeRanges::Integer { min, max }) => {
                Some(s.len() as i64 >= *min && s.len() as i64 <= *max)
            }
            _ => None,
        }
    }

    /// The name of this ranges kind, for violation messages.
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            AttributeRanges::Integer { .. } => "integer",
            AttributeRanges::Real { .. } => "real",
        }
    }
}

impl fmt::Display for AttributeRanges {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeRanges::Integer { min, max } => write!(f, "[{min}, {max}]"),
            AttributeRanges::Real { min, max } => write!(f, "[{min}, {max}]"),
        }
    }
}

// =============================================================================
// Flags
// =============================================================================

/// Behavior flags attached to an attribute at creation time.
///
/// A small bitset; combine with `|`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeFlags(u8);

impl AttributeFlags {
    /// Read-write, exported, stateful. The absence of every other flag.
    pub const NORMAL: AttributeFlags = AttributeFlags(0);
    /// Rejects normal updates; writable only through the read-only update
    /// path reserved for the owning producer.
    pub const READ_ONLY: AttributeFlags = AttributeFlags(1 << 0);
    /// Push-button semantics: updates fire change events but the stored value
    /// never changes. Only valid on bool attributes.
    pub const NOTIFY_ONLY: AttributeFlags = AttributeFlags(1 << 1);
    /// Excluded from XML export.
    pub const NO_EXPORT: AttributeFlags = AttributeFlags(1 << 2);

    /// Whether every flag in `other` is set in `self`.
    pub const fn contains(self, other: AttributeFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// The raw bit pattern.
    pub const fn bits(self) -> u8 {
        self.0
    }
}

impl BitOr for AttributeFlags {
    type Output = AttributeFlags;

    fn bitor(self, rhs: AttributeFlags) -> AttributeFlags {
        AttributeFlags(self.0 | rhs.0)
    }
}

impl Default for AttributeFlags {
    fn default() -> Self {
        AttributeFlags::NORMAL
    }
}

impl fmt::Display for AttributeFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == 0 {
            return f.write_str("NORMAL");
        }
        let mut first = true;
        let mut put = |f: &mut fmt::Formatter<'_>, name: &str| -> fmt::Result {
            if !first {
                f.write_str("|")?;
            }
            first = false;
            f.write_str(name)
        };
        if self.contains(AttributeFlags::READ_ONLY) {
            put(f, "READ_ONLY")?;
        }
        if self.contains(AttributeFlags::NOTIFY_ONLY) {
            put(f, "NOTIFY_ONLY")?;
        }
        if self.contains(AttributeFlags::NO_EXPORT) {
            put(f, "NO_EXPORT")?;
        }
        Ok(())
    }
}
