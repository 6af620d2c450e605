//! Session coordination
//!
//! The coordinator owns the single watch session: who is connected, who is
//! host, and what playback position everyone last reported. Connection
//! handlers and the reconciler all go through one mutex, and every operation
//! (including its broadcasts) completes inside a single critical section.
//!
//! A connection whose queue rejects a message during any broadcast is treated
//! as disconnected and cleaned up before the lock is released, through the
//! same routine an explicit close uses.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;

use super::connection::{ConnectionHandle, ConnectionId};
use super::messages::{
    coerce_time, ClientMessage, HostChangedPayload, ParticipantId, PresenceEntry, ServerMessage,
    TimeCorrection, WelcomePayload,
};
use super::presence::{Participant, ReportedTime};
use super::reconcile::compute_correction;

/// Host election state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HostState {
    #[default]
    NoHost,
    HostHeld(ParticipantId),
}

impl HostState {
    pub fn host_id(&self) -> Option<ParticipantId> {
        match self {
            HostState::NoHost => None,
            HostState::HostHeld(id) => Some(*id),
        }
    }

    fn is_held_by(&self, id: ParticipantId) -> bool {
        *self == HostState::HostHeld(id)
    }
}

/// Recipients of a broadcast
#[derive(Debug, Clone, Copy)]
enum Audience {
    Everyone,
    AllExcept(ConnectionId),
}

#[derive(Debug)]
struct Member {
    participant: Participant,
    connection_id: ConnectionId,
    handle: ConnectionHandle,
}

/// All mutable session state, only ever touched under the coordinator lock
#[derive(Debug, Default)]
struct SessionState {
    /// Participant arena, keyed by stable id
    participants: HashMap<ParticipantId, Member>,
    /// Live connection -> participant
    connections: HashMap<ConnectionId, ParticipantId>,
    /// Last reported playback position; absent means "not voting"
    reported_times: HashMap<ParticipantId, ReportedTime>,
    host: HostState,
    next_connection: u64,
    next_join_seq: u64,
    /// Connections whose queue rejected a message, pending cleanup
    dead: Vec<ConnectionId>,
}

impl SessionState {
    fn send_to(&mut self, connection_id: ConnectionId, msg: ServerMessage) {
        let Some(id) = self.connections.get(&connection_id) else {
            return;
        };
        let failed = self
            .participants
            .get(id)
            .map(|member| member.handle.send(msg).is_err())
            .unwrap_or(false);
        if failed {
            self.dead.push(connection_id);
        }
    }

    fn broadcast(&mut self, msg: ServerMessage, audience: Audience) -> usize {
        let mut sent = 0;
        let mut failed = Vec::new();

        for member in self.participants.values() {
            if let Audience::AllExcept(excluded) = audience {
                if member.connection_id == excluded {
                    continue;
                }
            }
            match member.handle.send(msg.clone()) {
                Ok(()) => sent += 1,
                Err(e) => {
                    tracing::debug!(
                        participant_id = %member.participant.id,
                        connection_id = %member.connection_id,
                        error = %e,
                        "Broadcast write failed, dropping connection"
                    );
                    failed.push(member.connection_id);
                }
            }
        }

        self.dead.extend(failed);
        sent
    }

    /// Roster in join order
    fn presence(&self) -> Vec<PresenceEntry> {
        let mut members: Vec<&Member> = self.participants.values().collect();
        members.sort_by_key(|m| m.participant.join_seq);
        members
            .into_iter()
            .map(|m| m.participant.to_presence())
            .collect()
    }

    fn entry_for(&self, connection_id: ConnectionId) -> Option<PresenceEntry> {
        let id = self.connections.get(&connection_id)?;
        self.participants
            .get(id)
            .map(|member| member.participant.to_presence())
    }

    /// Remove a connection and everything hanging off it
    ///
    /// Safe to call for a connection that is already gone.
    fn remove(&mut self, connection_id: ConnectionId) -> Option<Participant> {
        let id = self.connections.remove(&connection_id)?;
        let member = self.participants.remove(&id)?;
        self.reported_times.remove(&id);

        let was_host = self.host.is_held_by(id);
        if was_host {
            self.host = HostState::NoHost;
        }

        let entry = member.participant.to_presence();
        self.broadcast(ServerMessage::PresenceLeave(entry), Audience::Everyone);

        if was_host {
            tracing::info!(participant_id = %id, "Host disconnected, host cleared");
            self.broadcast(
                ServerMessage::HostChanged(HostChangedPayload::vacant()),
                Audience::Everyone,
            );
        }

        tracing::info!(
            participant_id = %id,
            connection_id = %connection_id,
            remaining = self.participants.len(),
            "Participant left"
        );

        Some(member.participant)
    }

    /// Clean up every connection found dead during this operation
    fn reap(&mut self) {
        while let Some(connection_id) = self.dead.pop() {
            self.remove(connection_id);
        }
    }

    fn describe(&self, member: &Member) -> ParticipantSnapshot {
        let id = member.participant.id;
        ParticipantSnapshot {
            id,
            name: member.participant.name.clone(),
            joined_at: member.participant.joined_at,
            is_host: self.host.is_held_by(id),
            reported_time: self.reported_times.get(&id).copied(),
        }
    }

    fn correction(&self) -> Option<TimeCorrection> {
        let reported: Vec<f64> = self.reported_times.values().map(|r| r.seconds).collect();
        let host_time = self
            .host
            .host_id()
            .and_then(|id| self.reported_times.get(&id))
            .map(|r| r.seconds);
        compute_correction(&reported, host_time)
    }
}

/// Result of accepting a connection
#[derive(Debug, Clone)]
pub struct Joined {
    pub connection_id: ConnectionId,
    pub participant: Participant,
}

/// One participant as shown by the status routes
#[derive(Debug, Clone, Serialize)]
pub struct ParticipantSnapshot {
    pub id: ParticipantId,
    pub name: String,
    pub joined_at: DateTime<Utc>,
    pub is_host: bool,
    pub reported_time: Option<ReportedTime>,
}

/// Read-only view of the whole session
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub participants: Vec<ParticipantSnapshot>,
    pub host_id: Option<ParticipantId>,
}

/// Shared handle to the session
///
/// Cheap to clone; every clone refers to the same state.
#[derive(Debug, Clone, Default)]
pub struct SessionCoordinator {
    state: Arc<Mutex<SessionState>>,
}

impl SessionCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection
    ///
    /// Allocates the participant, queues `welcome` for the newcomer and
    /// announces it to everyone else.
    pub fn join(&self, sender: mpsc::UnboundedSender<ServerMessage>) -> Joined {
        let mut state = self.state.lock();

        let connection_id = ConnectionId::new(state.next_connection);
        state.next_connection += 1;
        let participant = Participant::new(state.next_join_seq);
        state.next_join_seq += 1;

        let id = participant.id;
        state.connections.insert(connection_id, id);
        state.participants.insert(
            id,
            Member {
                participant: participant.clone(),
                connection_id,
                handle: ConnectionHandle::new(sender),
            },
        );

        let welcome = ServerMessage::Welcome(WelcomePayload {
            id,
            name: participant.name.clone(),
            presence: state.presence(),
        });
        state.send_to(connection_id, welcome);
        state.broadcast(
            ServerMessage::PresenceJoin(participant.to_presence()),
            Audience::AllExcept(connection_id),
        );

        tracing::info!(
            participant_id = %id,
            connection_id = %connection_id,
            name = %participant.name,
            participants = state.participants.len(),
            "Participant joined"
        );

        state.reap();

        Joined {
            connection_id,
            participant,
        }
    }

    /// Dispatch one inbound message from a connection
    ///
    /// Messages from a connection that has already been removed are ignored.
    pub fn handle_message(&self, connection_id: ConnectionId, message: ClientMessage) {
        let mut state = self.state.lock();

        let Some(sender) = state.entry_for(connection_id) else {
            tracing::debug!(connection_id = %connection_id, "Message from removed connection");
            return;
        };

        match message {
            ClientMessage::Chat { text } => {
                state.broadcast(
                    ServerMessage::Chat {
                        id: sender.id,
                        name: sender.name,
                        text,
                    },
                    Audience::AllExcept(connection_id),
                );
            }
            ClientMessage::Control { action, time } => {
                state.broadcast(
                    ServerMessage::Control {
                        id: sender.id,
                        action,
                        time,
                    },
                    Audience::AllExcept(connection_id),
                );
            }
            ClientMessage::TimeUpdate { time } => {
                let seconds = coerce_time(&time);
                state
                    .reported_times
                    .insert(sender.id, ReportedTime::now(seconds));
            }
            ClientMessage::ClaimHost => {
                state.host = HostState::HostHeld(sender.id);
                tracing::info!(participant_id = %sender.id, "Host claimed");
                state.broadcast(
                    ServerMessage::HostChanged(HostChangedPayload::held(sender)),
                    Audience::Everyone,
                );
            }
            ClientMessage::ReleaseHost => {
                if state.host.is_held_by(sender.id) {
                    state.host = HostState::NoHost;
                    tracing::info!(participant_id = %sender.id, "Host released");
                    state.broadcast(
                        ServerMessage::HostChanged(HostChangedPayload::vacant()),
                        Audience::Everyone,
                    );
                } else {
                    tracing::debug!(
                        participant_id = %sender.id,
                        "Release from non-host ignored"
                    );
                }
            }
            ClientMessage::Unknown => {
                tracing::trace!(participant_id = %sender.id, "Unrecognized message type ignored");
            }
        }

        state.reap();
    }

    /// Remove a connection after it closed
    ///
    /// Returns the participant that left, or `None` when the connection had
    /// already been cleaned up.
    pub fn leave(&self, connection_id: ConnectionId) -> Option<Participant> {
        let mut state = self.state.lock();
        let removed = state.remove(connection_id);
        state.reap();
        removed
    }

    /// Run one reconciliation cycle and broadcast its result
    pub fn reconcile(&self) -> Option<TimeCorrection> {
        let mut state = self.state.lock();
        let correction = state.correction()?;
        let recipients =
            state.broadcast(ServerMessage::TimeCorrection(correction), Audience::Everyone);
        tracing::trace!(recipients, "Time correction queued");
        state.reap();
        Some(correction)
    }

    /// Current host, if any
    pub fn host(&self) -> Option<ParticipantId> {
        self.state.lock().host.host_id()
    }

    pub fn participant_count(&self) -> usize {
        self.state.lock().participants.len()
    }

    /// Look up one participant
    pub fn participant(&self, id: ParticipantId) -> Option<ParticipantSnapshot> {
        let state = self.state.lock();
        state
            .participants
            .get(&id)
            .map(|member| state.describe(member))
    }

    /// Point-in-time view of the session, roster in join order
    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.lock();
        let mut members: Vec<&Member> = state.participants.values().collect();
        members.sort_by_key(|m| m.participant.join_seq);

        SessionSnapshot {
            participants: members
                .into_iter()
                .map(|member| state.describe(member))
                .collect(),
            host_id: state.host.host_id(),
        }
    }
}
