//! Strongly-typed identifiers.
//!
//! IDs are ULID based so they sort by creation time and can be minted without
//! coordination. `Id<T>` carries a zero-sized marker so an appointment id can
//! never be passed where some other id is expected.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;
use ulid::Ulid;

/// Marker trait supplying the display prefix for an id family.
pub trait IdMarker: Send + Sync + 'static {
    fn prefix() -> &'static str;
}

#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id<T: IdMarker> {
    ulid: Ulid,
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            _marker: PhantomData,
        }
    }

    pub fn as_ulid(&self) -> Ulid {
        self.ulid
    }
}

impl<T: IdMarker> From<Ulid> for Id<T> {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.ulid)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid id `{input}`: expected `{prefix}<ulid>`")]
pub struct ParseIdError {
    input: String,
    prefix: &'static str,
}

impl<T: IdMarker> FromStr for Id<T> {
    type Err = ParseIdError;

    /// Accepts both the prefixed display form and a bare ULID.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix(T::prefix()).unwrap_or(s);
        Ulid::from_string(raw)
            .map(Self::from_ulid)
            .map_err(|_| ParseIdError {
                input: s.to_string(),
                prefix: T::prefix(),
            })
    }
}

impl<T: IdMarker> Serialize for Id<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de, T: IdMarker> Deserialize<'de> for Id<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Appointment {}

impl IdMarker for Appointment {
    fn prefix() -> &'static str {
        "apt-"
    }
}

/// Identifier of a committed appointment.
pub type AppointmentId = Id<Appointment>;
