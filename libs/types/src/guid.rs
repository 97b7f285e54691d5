//! Profiling identifiers
//!
//! Every protocol object carries a 64-bit guid. The value space is
//! partitioned in two: dynamic guids are allocated sequentially at
//! runtime and live below [`MIN_STATIC_GUID`]; static guids are derived
//! from a name hash and always have the top bit set. The two classes
//! can never collide, which lets a collector match well-known objects
//! by name while runtime objects stay cheap to mint.

use std::fmt;

use parking_lot::Mutex;
use sha3::{Digest, Keccak256};

/// Lowest value of the static guid partition. Dynamic guids wrap back
/// to zero before ever reaching it.
pub const MIN_STATIC_GUID: u64 = 1 << 63;

/// A 64-bit profiling identifier, either dynamic or static.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProfilingGuid(pub u64);

impl ProfilingGuid {
    pub fn is_static(self) -> bool {
        self.0 >= MIN_STATIC_GUID
    }

    pub fn is_dynamic(self) -> bool {
        !self.is_static()
    }
}

impl fmt::Display for ProfilingGuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

/// Sequentially allocated runtime identifier, always `< MIN_STATIC_GUID`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProfilingDynamicGuid(pub u64);

/// Name-derived stable identifier, top bit always set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProfilingStaticGuid(pub u64);

impl From<ProfilingDynamicGuid> for ProfilingGuid {
    fn from(guid: ProfilingDynamicGuid) -> Self {
        ProfilingGuid(guid.0)
    }
}

impl From<ProfilingStaticGuid> for ProfilingGuid {
    fn from(guid: ProfilingStaticGuid) -> Self {
        ProfilingGuid(guid.0)
    }
}

/// Allocator for both guid classes.
///
/// The dynamic counter is shared by every producer thread, so it sits
/// behind a mutex; static guid derivation is a pure function of the
/// name and takes no lock.
#[derive(Debug, Default)]
pub struct GuidGenerator {
    next_dynamic: Mutex<u64>,
}

impl GuidGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next dynamic guid.
    ///
    /// Wraps back to zero instead of crossing into the static
    /// partition, so a dynamic guid never aliases a static one.
    pub fn next_dynamic_guid(&self) -> ProfilingDynamicGuid {
        let mut next = self.next_dynamic.lock();
        let guid = ProfilingDynamicGuid(*next);
        *next += 1;
        if *next == MIN_STATIC_GUID {
            *next = 0;
        }
        guid
    }

    /// Derive the static guid for a name.
    ///
    /// Keccak-256 of the name folded to its first eight bytes, with the
    /// top bit forced on. The same name yields the same guid in every
    /// process and run.
    pub fn static_guid(&self, name: &str) -> ProfilingStaticGuid {
        let digest = Keccak256::digest(name.as_bytes());
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        ProfilingStaticGuid(u64::from_le_bytes(bytes) | MIN_STATIC_GUID)
    }

    /// Rewind the dynamic counter to zero. Intended for tests only.
    pub fn reset(&self) {
        *self.next_dynamic.lock() = 0;
    }
}
