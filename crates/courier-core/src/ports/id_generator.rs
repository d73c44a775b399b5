//! IdGenerator port.

use ulid::Ulid;

use crate::domain::AppointmentId;
use crate::ports::Clock;

pub trait IdGenerator: Send + Sync {
    fn appointment_id(&self) -> AppointmentId;
}

/// ULID generator whose timestamp half comes from a `Clock`, so ids minted
/// under a `FixedClock` share a predictable prefix.
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn appointment_id(&self) -> AppointmentId {
        let timestamp_ms = self.clock.now().timestamp_millis() as u64;
        let ulid = Ulid::from_parts(timestamp_ms, rand::random());
        AppointmentId::from_ulid(ulid)
    }
}
