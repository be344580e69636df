//! Region identifiers.
//!
//! [`RegionId`] is the arena key: allocated once, never reused, and stable
//! for the lifetime of an annotation. The pairing id (`pid`) that travels on
//! the wire is a separate string so that restored regions keep the id the
//! external store knows them by.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A unique identifier for a region inside one annotation.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionId(pub u64);

impl RegionId {
    /// Creates a new RegionId.
    #[inline]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying u64 value.
    #[inline]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RegionId({})", self.0)
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Length of generated pairing ids.
pub const PID_LEN: usize = 10;

/// Allocates region ids and fresh pairing ids.
#[derive(Clone, Debug)]
pub struct IdGenerator {
    next: u64,
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next region id. Ids are never handed out twice.
    pub fn next_region_id(&mut self) -> RegionId {
        let id = RegionId(self.next);
        self.next += 1;
        id
    }

    /// Returns a new random pairing id.
    pub fn new_pid(&self) -> String {
        let mut pid = uuid::Uuid::new_v4().simple().to_string();
        pid.truncate(PID_LEN);
        pid
    }
}
