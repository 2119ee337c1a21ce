use gridhost_common::EntityId;

/// Outbound delivery seam for broadcasts.
///
/// The core never inspects payload contents; the hosting layer supplies a
/// courier that encodes and sends them (network session table, test
/// recorder, ...).
pub trait Courier: Send + Sync {
    fn deliver(&self, player: EntityId, payload: &[u8]);
}

/// Discards everything. Useful for headless instances and tests that do not
/// care about delivery.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullCourier;

impl Courier for NullCourier {
    fn deliver(&self, _player: EntityId, _payload: &[u8]) {}
}
