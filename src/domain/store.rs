// Domain-level ticket state: the authoritative ordered sequence and the
// next-ID counter.

/// Identifier of a ticket. IDs are monotonic, unique, and never reused,
/// even after the ticket is deleted. ID 0 is never issued.
pub type TicketId = u64;

/// A unit of trackable work with an optional assignee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub id: TicketId,
    /// Client identifier of the current owner; empty means unassigned.
    pub assigned_to: String,
}

/// Outcome of an abandon attempt, so callers can log the wrong-owner case
/// differently from a plain miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbandonOutcome {
    Released,
    WrongOwner,
    NotFound,
}

/// Ordered ticket collection (creation order) plus the next-ID counter.
///
/// The counter is always strictly greater than any ID ever issued. Order is
/// significant only for display. Mutated exclusively by the engine task.
#[derive(Debug)]
pub struct TicketStore {
    tickets: Vec<Ticket>,
    next_id: TicketId,
}

impl Default for TicketStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TicketStore {
    pub fn new() -> Self {
        Self {
            tickets: Vec::new(),
            next_id: 1,
        }
    }

    /// Appends a new unassigned ticket and returns its ID.
    pub fn create(&mut self) -> TicketId {
        let id = self.next_id;
        self.next_id += 1;
        self.tickets.push(Ticket {
            id,
            assigned_to: String::new(),
        });
        id
    }

    /// Unconditionally hands the ticket to `client_id` (last writer wins;
    /// reassignment from one owner to another is allowed). Returns false
    /// when the ticket does not exist.
    pub fn assign(&mut self, ticket_id: TicketId, client_id: &str) -> bool {
        match self.tickets.iter_mut().find(|t| t.id == ticket_id) {
            Some(ticket) => {
                ticket.assigned_to = client_id.to_string();
                true
            }
            None => false,
        }
    }

    /// Clears the assignee, honored only when `client_id` currently holds
    /// the ticket.
    pub fn abandon(&mut self, ticket_id: TicketId, client_id: &str) -> AbandonOutcome {
        match self.tickets.iter_mut().find(|t| t.id == ticket_id) {
            Some(ticket) if ticket.assigned_to == client_id => {
                ticket.assigned_to.clear();
                AbandonOutcome::Released
            }
            Some(_) => AbandonOutcome::WrongOwner,
            None => AbandonOutcome::NotFound,
        }
    }

    /// Removes the ticket; remaining tickets keep their IDs and relative
    /// order. Returns false when the ticket does not exist.
    pub fn delete(&mut self, ticket_id: TicketId) -> bool {
        let before = self.tickets.len();
        self.tickets.retain(|t| t.id != ticket_id);
        self.tickets.len() != before
    }

    /// Full copy of the current ticket sequence.
    pub fn snapshot(&self) -> Vec<Ticket> {
        self.tickets.clone()
    }

    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_strictly_increasing_and_unique() {
        let mut store = TicketStore::new();
        let mut issued = Vec::new();
        for _ in 0..5 {
            issued.push(store.create());
        }

        for pair in issued.windows(2) {
            assert!(pair[0] < pair[1]);
        }
        assert_eq!(issued, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn ids_are_not_reused_after_delete() {
        let mut store = TicketStore::new();
        let first = store.create();
        assert!(store.delete(first));

        let second = store.create();
        assert!(second > first);
    }

    #[test]
    fn assign_is_last_writer_wins() {
        let mut store = TicketStore::new();
        let id = store.create();

        assert!(store.assign(id, "alice"));
        assert!(store.assign(id, "bob"));

        assert_eq!(store.snapshot()[0].assigned_to, "bob");
    }

    #[test]
    fn assign_unknown_ticket_is_noop() {
        let mut store = TicketStore::new();
        assert!(!store.assign(42, "alice"));
        assert!(store.is_empty());
    }

    #[test]
    fn abandon_requires_matching_owner() {
        let mut store = TicketStore::new();
        let id = store.create();
        store.assign(id, "alice");

        assert_eq!(store.abandon(id, "bob"), AbandonOutcome::WrongOwner);
        assert_eq!(store.snapshot()[0].assigned_to, "alice");

        assert_eq!(store.abandon(id, "alice"), AbandonOutcome::Released);
        assert_eq!(store.snapshot()[0].assigned_to, "");
    }

    #[test]
    fn abandon_unknown_ticket_is_noop() {
        let mut store = TicketStore::new();
        assert_eq!(store.abandon(42, "alice"), AbandonOutcome::NotFound);
    }

    #[test]
    fn delete_removes_exactly_one_and_preserves_other_ids() {
        let mut store = TicketStore::new();
        let first = store.create();
        let second = store.create();
        let third = store.create();

        assert!(store.delete(second));
        let ids: Vec<TicketId> = store.snapshot().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![first, third]);

        // A deleted ticket is gone for good.
        assert!(!store.delete(second));
        assert!(!store.assign(second, "alice"));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn create_assign_abandon_delete_scenario() {
        let mut store = TicketStore::new();
        let first = store.create();
        let second = store.create();

        assert!(store.assign(first, "a"));
        // Ticket 2 is unassigned, so "a" does not hold it.
        assert_eq!(store.abandon(second, "a"), AbandonOutcome::WrongOwner);
        assert!(store.delete(first));

        assert_eq!(
            store.snapshot(),
            vec![Ticket {
                id: second,
                assigned_to: String::new(),
            }]
        );
    }
}
