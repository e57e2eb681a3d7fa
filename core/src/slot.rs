//! Slot references and their encoded token form.
//!
//! A slot is a `(group position, role index)` pair inside an event's roster.
//! Stored assignment maps hold slots in an encoded string form (the *token*)
//! whose shape depends on whether the event spans more than one group:
//!
//! - Single-group event: `"3"` (the role index alone, kept compact for
//!   backward compatibility with rosters written before multi-group support)
//! - Multi-group event: `"2.3"` (`group_position "." role_index`)
//!
//! Both components are positive, 1-based decimal integers. The codec is
//! round-trip exact: `SlotToken::decode(slot.encode(m), m) == slot` for
//! every valid slot and matching mode.
//!
//! Decoding is the only place malformed data can enter the core (tokens are
//! read back from storage), so `decode` returns a typed error and callers
//! building read models skip the entry instead of failing the projection.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error produced when a stored token cannot be decoded.
///
/// Projection code treats this as "skip this entry with a warning"; it must
/// never abort a whole read-model rebuild.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeSlotError {
    /// The token was empty.
    #[error("Slot token is empty")]
    Empty,

    /// A component was not a positive decimal integer.
    #[error("Slot token {token:?} has a non-numeric component {component:?}")]
    NotNumeric {
        /// The full token being decoded.
        token: String,
        /// The offending component.
        component: String,
    },

    /// A component decoded to zero; positions and indices are 1-based.
    #[error("Slot token {0:?} has a zero component; positions are 1-based")]
    Zero(String),

    /// More than one separator was present.
    #[error("Slot token {0:?} has too many components")]
    TooManyComponents(String),
}

/// A `(group position, role index)` pair within an event's roster.
///
/// At most one participant may hold a given slot at a time; that exclusivity
/// is enforced by the storage layer, not by this type. Both fields are
/// 1-based.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Slot {
    /// 1-based position of the group inside the event's `group_ids`.
    pub group_position: u32,
    /// 1-based index of the role inside that group.
    pub role_index: u32,
}

impl Slot {
    /// Create a slot from 1-based components.
    #[must_use]
    pub const fn new(group_position: u32, role_index: u32) -> Self {
        Self {
            group_position,
            role_index,
        }
    }

    /// Encode this slot to its stored token form.
    ///
    /// `multi_group` must reflect the owning event (`group_ids.len() > 1`);
    /// the same slot encodes differently depending on the event shape.
    #[must_use]
    pub fn encode(self, multi_group: bool) -> SlotToken {
        if multi_group {
            SlotToken(format!("{}.{}", self.group_position, self.role_index))
        } else {
            SlotToken(self.role_index.to_string())
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.group_position, self.role_index)
    }
}

/// The encoded string form of a [`Slot`], as stored in assignment maps.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SlotToken(String);

impl SlotToken {
    /// Wrap an already-encoded token read back from storage.
    ///
    /// No validation is performed; [`SlotToken::decode`] is where malformed
    /// data is detected.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Get the token as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert into the inner `String`.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Decode this token back to a [`Slot`].
    ///
    /// A bare token (no separator) decodes as `(1, role_index)`: single-group
    /// events store the role index alone, and group position 1 is the only
    /// position they have. A bare token on a multi-group event is read the
    /// same way; since `group_ids` is fixed at creation, such a token can
    /// only come from hand-edited data.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeSlotError`] for empty tokens, non-numeric or zero
    /// components, and tokens with more than one separator.
    pub fn decode(&self, multi_group: bool) -> Result<Slot, DecodeSlotError> {
        if self.0.is_empty() {
            return Err(DecodeSlotError::Empty);
        }

        let mut parts = self.0.split('.');
        // split always yields at least one element
        let first = parts.next().unwrap_or_default();
        let second = parts.next();

        if parts.next().is_some() {
            return Err(DecodeSlotError::TooManyComponents(self.0.clone()));
        }

        match second {
            None => {
                let role_index = parse_component(&self.0, first)?;
                let _ = multi_group; // bare tokens always mean group 1
                Ok(Slot::new(1, role_index))
            }
            Some(second) => {
                let group_position = parse_component(&self.0, first)?;
                let role_index = parse_component(&self.0, second)?;
                Ok(Slot::new(group_position, role_index))
            }
        }
    }
}

impl fmt::Display for SlotToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SlotToken {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SlotToken {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for SlotToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn parse_component(token: &str, component: &str) -> Result<u32, DecodeSlotError> {
    let value: u32 = component
        .parse()
        .map_err(|_| DecodeSlotError::NotNumeric {
            token: token.to_string(),
            component: component.to_string(),
        })?;
    if value == 0 {
        return Err(DecodeSlotError::Zero(token.to_string()));
    }
    Ok(value)
}
