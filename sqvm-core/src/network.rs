//! Network sessions
//!
//! The host owns the transport ([`Connector`]). The VM validates the target
//! (`host:port`), keeps each session's state and reports failures.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::diagnostics::RuntimeFault;
use crate::fault::{Checked, Diagnostics};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConnectionState::Disconnected => "DISCONNECTED",
            ConnectionState::Connecting => "CONNECTING",
            ConnectionState::Connected => "CONNECTED",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transport supplied by the host
pub trait Connector {
    /// `Connected`, `Connecting` (completed later via [`SessionTable::set_state`])
    /// or `Disconnected` on failure
    fn connect(&mut self, host: &str, port: u16) -> ConnectionState;

    fn disconnect(&mut self, _host: &str, _port: u16) {}
}

/// `host:port` with a non-empty host and a `u16` port
pub fn parse_target(target: &str) -> Option<(&str, u16)> {
    let (host, port) = target.rsplit_once(':')?;
    if host.is_empty() || host.chars().any(char::is_whitespace) {
        return None;
    }
    Some((host, port.parse().ok()?))
}

#[derive(Debug, Clone)]
struct Session {
    host: String,
    port: u16,
    state: ConnectionState,
}

#[derive(Default)]
pub struct SessionTable {
    sessions: BTreeMap<SessionId, Session>,
    next_id: u64,
    connector: Option<Box<dyn Connector>>,
}

impl fmt::Debug for SessionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionTable")
            .field("sessions", &self.sessions)
            .field("has_connector", &self.connector.is_some())
            .finish()
    }
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_connector(&mut self, connector: impl Connector + 'static) {
        self.connector = Some(Box::new(connector));
    }

    /// Opens a session to `target`.
    ///
    /// A failed attempt still allocates the id, left `Disconnected`.
    pub fn connect<D: Diagnostics + ?Sized>(
        &mut self,
        d: &mut D,
        enabled: bool,
        target: &str,
    ) -> Checked<Option<SessionId>> {
        if !enabled {
            d.raise(RuntimeFault::NetworkingDisabled)?;
            return Ok(None);
        }
        let Some((host, port)) = parse_target(target) else {
            d.raise(RuntimeFault::NetworkingFormatMismatch { provided: target.to_string() })?;
            return Ok(None);
        };
        let live = self.sessions.values().any(|s| {
            s.host == host && s.port == port && s.state != ConnectionState::Disconnected
        });
        if live {
            d.raise(RuntimeFault::AlreadyConnected)?;
            return Ok(None);
        }

        self.next_id += 1;
        let id = SessionId(self.next_id);
        let state = match self.connector.as_mut() {
            Some(connector) => connector.connect(host, port),
            None => ConnectionState::Disconnected,
        };
        tracing::debug!(session = id.0, host, port, state = %state, "network connect");
        self.sessions.insert(id, Session { host: host.to_string(), port, state });
        if state == ConnectionState::Disconnected {
            d.raise(RuntimeFault::FailedToEstablishConnection)?;
        }
        Ok(Some(id))
    }

    pub fn status(&self, id: SessionId) -> Option<ConnectionState> {
        self.sessions.get(&id).map(|s| s.state)
    }

    /// Host-side completion of a `Connecting` session
    pub fn set_state(&mut self, id: SessionId, state: ConnectionState) -> bool {
        match self.sessions.get_mut(&id) {
            Some(session) => {
                session.state = state;
                true
            }
            None => false,
        }
    }

    /// `false` when the session is unknown or already down
    pub fn disconnect(&mut self, id: SessionId) -> bool {
        let Some(session) = self.sessions.get_mut(&id) else {
            return false;
        };
        if session.state == ConnectionState::Disconnected {
            return false;
        }
        session.state = ConnectionState::Disconnected;
        if let Some(connector) = self.connector.as_mut() {
            connector.disconnect(&session.host, session.port);
        }
        true
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
