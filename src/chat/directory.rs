// ABOUTME: Name-to-connection directory with a reverse index for O(1) cleanup on disconnect

use crate::chat::frame::PeerName;
use std::collections::BTreeMap;
use std::collections::HashMap;
use thiserror::Error;

/// Opaque handle to an accepted TCP connection, assigned by the readiness
/// loop in acceptance order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Registered-client directory. Keyed on the raw 20-byte name field rather
/// than a decoded `String`, so two distinct non-UTF-8 names can never
/// collide after lossy decoding. Ordered by the raw bytes so that
/// `CLIENT_LIST` bodies and log output are deterministic.
#[derive(Debug, Default)]
pub struct Directory {
    by_name: BTreeMap<PeerName, ConnectionId>,
    by_connection: HashMap<ConnectionId, PeerName>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("name {0:?} is already registered")]
    NameTaken(PeerName),
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `name` for `connection`. Fails without side effects if the
    /// name is already taken.
    pub fn register(&mut self, name: PeerName, connection: ConnectionId) -> Result<(), DirectoryError> {
        if self.by_name.contains_key(&name) {
            return Err(DirectoryError::NameTaken(name));
        }
        self.by_connection.insert(connection, name);
        self.by_name.insert(name, connection);
        Ok(())
    }

    pub fn lookup(&self, name: &PeerName) -> Option<ConnectionId> {
        self.by_name.get(name).copied()
    }

    pub fn name_of(&self, connection: ConnectionId) -> Option<PeerName> {
        self.by_connection.get(&connection).copied()
    }

    /// Removes whatever record is associated with `connection`, if any,
    /// returning the name that was freed.
    pub fn remove_by_connection(&mut self, connection: ConnectionId) -> Option<PeerName> {
        let name = self.by_connection.remove(&connection)?;
        self.by_name.remove(&name);
        Some(name)
    }

    /// Registered names in directory order (by raw byte content).
    pub fn names(&self) -> impl Iterator<Item = PeerName> + '_ {
        self.by_name.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
