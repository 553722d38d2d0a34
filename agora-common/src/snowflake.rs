//! Time-ordered 64 bit ids for every stored entity.
//!
//! Bits, most significant first: 42 bits of milliseconds since [`EPOCH`], 5 bits
//! worker id, 5 bits process id and a 12 bit sequence. Ids from one generator are
//! strictly increasing, so ordering by id orders by creation.

use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use std::fmt::{Display, Formatter};
use time::{Duration, UtcDateTime, macros::utc_datetime};

pub const EPOCH: UtcDateTime = utc_datetime!(2025-01-01 00:00);

const SEQUENCE_BITS: u32 = 12;
const PROCESS_ID_BITS: u32 = 5;
const WORKER_ID_BITS: u32 = 5;
const TIMESTAMP_BITS: u32 = 42;

const PROCESS_ID_SHIFT: u32 = SEQUENCE_BITS;
const WORKER_ID_SHIFT: u32 = PROCESS_ID_SHIFT + PROCESS_ID_BITS;
const TIMESTAMP_SHIFT: u32 = WORKER_ID_SHIFT + WORKER_ID_BITS;

const fn mask(bits: u32) -> u64 {
    (1 << bits) - 1
}

/// Declares a small id that identifies where snowflakes are generated.
macro_rules! node_id {
    ($(#[$meta:meta])* $name:ident: bits = $bits:ident, shift = $shift:ident) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
        #[serde(transparent)]
        pub struct $name(u8);

        impl $name {
            pub const MAX: u8 = (1 << $bits) - 1;

            #[must_use]
            pub fn new(id: u8) -> Option<Self> {
                (id <= Self::MAX).then_some(Self(id))
            }

            #[must_use]
            pub fn new_unchecked(id: u8) -> Self {
                Self::new(id).expect(concat!(stringify!($name), " out of range."))
            }

            #[must_use]
            pub fn get(self) -> u8 {
                self.0
            }

            fn bits(self) -> u64 {
                u64::from(self.0) << $shift
            }

            #[allow(clippy::cast_possible_truncation)]
            fn of(snowflake: Snowflake) -> Self {
                Self(((snowflake.0 >> $shift) & mask($bits)) as u8)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                let id = u8::deserialize(deserializer)?;
                Self::new(id).ok_or_else(|| {
                    Error::invalid_value(Unexpected::Unsigned(id.into()), &stringify!($name))
                })
            }
        }
    };
}

node_id!(
    /// Machine that generates ids, taken from `WORKER_ID`.
    WorkerId: bits = WORKER_ID_BITS, shift = WORKER_ID_SHIFT
);
node_id!(
    /// Process on a worker that generates ids, taken from `PROCESS_ID`.
    ProcessId: bits = PROCESS_ID_BITS, shift = PROCESS_ID_SHIFT
);

#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Snowflake(u64);

impl Snowflake {
    #[must_use]
    pub fn new(inner: u64) -> Self {
        Self(inner)
    }

    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }

    /// Millisecond at which the id was generated.
    #[must_use]
    pub fn created_at(self) -> UtcDateTime {
        #[allow(clippy::cast_possible_wrap)]
        let millis = (self.0 >> TIMESTAMP_SHIFT) as i64;
        EPOCH + Duration::milliseconds(millis)
    }

    #[must_use]
    pub fn worker_id(self) -> WorkerId {
        WorkerId::of(self)
    }

    #[must_use]
    pub fn process_id(self) -> ProcessId {
        ProcessId::of(self)
    }

    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn sequence(self) -> u16 {
        (self.0 & mask(SEQUENCE_BITS)) as u16
    }
}

impl Display for Snowflake {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// Milliseconds since [`EPOCH`], clamped into the timestamp bits.
fn timestamp_millis(time: UtcDateTime) -> u64 {
    let millis = (time - EPOCH).whole_milliseconds().max(0);
    u64::try_from(millis).map_or(mask(TIMESTAMP_BITS), |millis| {
        millis.min(mask(TIMESTAMP_BITS))
    })
}

/// Hands out strictly increasing snowflakes for one worker/process pair.
///
/// When the sequence of a millisecond runs out, or the clock goes backwards, ids
/// borrow from the following millisecond instead of repeating.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct SnowflakeGenerator {
    worker_id: WorkerId,
    process_id: ProcessId,
    last_millis: u64,
    sequence: u64,
}

impl SnowflakeGenerator {
    #[must_use]
    pub fn new(worker_id: WorkerId, process_id: ProcessId) -> Self {
        Self {
            worker_id,
            process_id,
            last_millis: 0,
            sequence: 0,
        }
    }

    pub fn generate_at(&mut self, time: UtcDateTime) -> Snowflake {
        let millis = timestamp_millis(time);

        if millis > self.last_millis {
            self.last_millis = millis;
            self.sequence = 0;
        } else if self.sequence < mask(SEQUENCE_BITS) {
            self.sequence += 1;
        } else {
            self.last_millis = (self.last_millis + 1).min(mask(TIMESTAMP_BITS));
            self.sequence = 0;
        }

        Snowflake(
            self.last_millis << TIMESTAMP_SHIFT
                | self.worker_id.bits()
                | self.process_id.bits()
                | self.sequence,
        )
    }

    pub fn generate(&mut self) -> Snowflake {
        self.generate_at(UtcDateTime::now())
    }
}
