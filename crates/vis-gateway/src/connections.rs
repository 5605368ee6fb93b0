//! Fixed-capacity connection table

use parking_lot::Mutex;
use tokio::sync::mpsc::UnboundedSender;
use vis_core::ConnectionId;

use crate::error::GatewayError;

/// Maximum number of concurrently attached clients.
pub const MAX_CLIENTS: usize = 20;

/// Scale factor between a table slot index and the identifier handed to a
/// client, keeping identifiers well clear of the 0 free-slot sentinel.
pub const CLIENT_MASK: u32 = 1_000_000;

struct Slot {
    id: ConnectionId,
    outbound: UnboundedSender<String>,
}

/// Ownership container for all live connection records.
///
/// Every connection-event path and the push API go through the same guard:
/// slot allocation, slot release, and identifier scans never race, and a
/// slot cannot be reused while a send to its old identifier is mid-scan.
pub struct ConnectionTable {
    /// Index 0 is never used; identifier 0 stays the free sentinel.
    slots: Mutex<[Option<Slot>; MAX_CLIENTS + 1]>,
}

impl ConnectionTable {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(std::array::from_fn(|_| None)),
        }
    }

    /// Claim the first free slot, scanning upwards from index 1, and bind
    /// the connection's outbound queue to it.
    pub fn allocate(
        &self,
        outbound: UnboundedSender<String>,
    ) -> Result<ConnectionId, GatewayError> {
        let mut slots = self.slots.lock();
        for index in 1..=MAX_CLIENTS {
            if slots[index].is_none() {
                let id = index as ConnectionId * CLIENT_MASK;
                slots[index] = Some(Slot { id, outbound });
                return Ok(id);
            }
        }
        Err(GatewayError::TableFull {
            capacity: MAX_CLIENTS,
        })
    }

    /// Release the slot holding `id`, making the identifier eligible for
    /// reuse by a future connection. Releasing an identifier that is not
    /// live is a no-op.
    pub fn free(&self, id: ConnectionId) {
        let mut slots = self.slots.lock();
        for slot in slots.iter_mut() {
            if slot.as_ref().is_some_and(|s| s.id == id) {
                *slot = None;
                return;
            }
        }
    }

    /// Queue `payload` for the connection holding `id`.
    ///
    /// Returns false when the identifier is not live; the payload is
    /// silently dropped (fire-and-forget delivery).
    pub fn send_to(&self, id: ConnectionId, payload: String) -> bool {
        let slots = self.slots.lock();
        for slot in slots.iter().flatten() {
            if slot.id == id {
                return slot.outbound.send(payload).is_ok();
            }
        }
        false
    }

    pub fn active_count(&self) -> usize {
        self.slots.lock().iter().flatten().count()
    }
}

impl Default for ConnectionTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tokio::sync::mpsc;

    use super::*;

    #[test]
    fn identifiers_are_distinct_nonzero_up_to_capacity() {
        let table = ConnectionTable::new();
        let mut ids = Vec::new();
        let mut receivers = Vec::new();

        for _ in 0..MAX_CLIENTS {
            let (tx, rx) = mpsc::unbounded_channel();
            ids.push(table.allocate(tx).unwrap());
            receivers.push(rx);
        }

        assert_eq!(table.active_count(), MAX_CLIENTS);
        for &id in &ids {
            assert_ne!(id, 0);
            assert_eq!(id % CLIENT_MASK, 0);
        }
        let mut deduped = ids.clone();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(deduped.len(), MAX_CLIENTS);

        // Table full: the next client is rejected.
        let (tx, _rx) = mpsc::unbounded_channel();
        assert!(matches!(
            table.allocate(tx),
            Err(GatewayError::TableFull { .. })
        ));
    }

    #[test]
    fn freeing_releases_exactly_one_identifier() {
        let table = ConnectionTable::new();
        let mut receivers = Vec::new();
        let mut ids = Vec::new();
        for _ in 0..MAX_CLIENTS {
            let (tx, rx) = mpsc::unbounded_channel();
            ids.push(table.allocate(tx).unwrap());
            receivers.push(rx);
        }

        let victim = ids[4];
        table.free(victim);
        assert_eq!(table.active_count(), MAX_CLIENTS - 1);
        assert!(!table.send_to(victim, "late".to_string()));

        // The freed slot (and only that slot) is reusable.
        let (tx, _rx) = mpsc::unbounded_channel();
        let reassigned = table.allocate(tx).unwrap();
        assert_eq!(reassigned, victim);
    }

    #[test]
    fn send_to_targets_exactly_one_connection() {
        let table = ConnectionTable::new();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        let id_a = table.allocate(tx_a).unwrap();
        let id_b = table.allocate(tx_b).unwrap();

        assert!(table.send_to(id_a, "for a".to_string()));
        assert_eq!(rx_a.try_recv().unwrap(), "for a");
        assert!(rx_b.try_recv().is_err());

        assert!(table.send_to(id_b, "for b".to_string()));
        assert_eq!(rx_b.try_recv().unwrap(), "for b");
    }

    #[test]
    fn send_to_unknown_identifier_is_a_noop() {
        let table = ConnectionTable::new();
        assert!(!table.send_to(0, "sentinel".to_string()));
        assert!(!table.send_to(7 * CLIENT_MASK, "never assigned".to_string()));
    }
}
