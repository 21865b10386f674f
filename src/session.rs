use std::collections::HashMap;

use thiserror::Error;

use crate::poll::PollGate;
use crate::schedule::model::{ScheduleFields, ScheduleKind};

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum FieldGroup {
    HostClock,
    DeviceClock,
    Shutdown,
    Startup,
}

impl FieldGroup {
    pub fn label(self) -> &'static str {
        match self {
            FieldGroup::HostClock => "host clock",
            FieldGroup::DeviceClock => "device clock",
            FieldGroup::Shutdown => "shutdown schedule",
            FieldGroup::Startup => "startup schedule",
        }
    }

    pub fn schedule_kind(self) -> Option<ScheduleKind> {
        match self {
            FieldGroup::Shutdown => Some(ScheduleKind::Shutdown),
            FieldGroup::Startup => Some(ScheduleKind::Startup),
            FieldGroup::HostClock | FieldGroup::DeviceClock => None,
        }
    }
}

impl From<ScheduleKind> for FieldGroup {
    fn from(kind: ScheduleKind) -> Self {
        match kind {
            ScheduleKind::Shutdown => FieldGroup::Shutdown,
            ScheduleKind::Startup => FieldGroup::Startup,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum FieldValues {
    Clock(String),
    Schedule(ScheduleFields),
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum SessionState {
    Locked,
    Editing,
    Committing,
}

#[derive(Debug, Clone)]
pub struct EditSession {
    pub group: FieldGroup,
    pub previous_value: FieldValues,
    pub state: SessionState,
}

#[derive(Debug, Error, Eq, PartialEq)]
pub enum SessionError {
    #[error("{} is already being edited", .0.label())]
    AlreadyEditing(FieldGroup),
    #[error("{} is not being edited", .0.label())]
    NotEditing(FieldGroup),
}

#[derive(Debug, Default)]
pub struct SessionController {
    sessions: HashMap<FieldGroup, EditSession>,
    gate: PollGate,
}

impl SessionController {
    pub fn state(&self, group: FieldGroup) -> SessionState {
        self.sessions
            .get(&group)
            .map(|session| session.state)
            .unwrap_or(SessionState::Locked)
    }

    pub fn is_editing(&self, group: FieldGroup) -> bool {
        self.state(group) == SessionState::Editing
    }

    pub fn any_active(&self) -> bool {
        !self.gate.is_open()
    }

    pub fn poll_allowed(&self) -> bool {
        self.gate.is_open()
    }

    pub fn gate(&self) -> &PollGate {
        &self.gate
    }

    pub fn begin_edit(
        &mut self,
        group: FieldGroup,
        snapshot: FieldValues,
    ) -> Result<(), SessionError> {
        if self.sessions.contains_key(&group) {
            return Err(SessionError::AlreadyEditing(group));
        }
        self.sessions.insert(
            group,
            EditSession {
                group,
                previous_value: snapshot,
                state: SessionState::Editing,
            },
        );
        self.gate.acquire();
        Ok(())
    }

    pub fn cancel(&mut self, group: FieldGroup) -> Option<FieldValues> {
        if !self.is_editing(group) {
            return None;
        }
        let session = self.sessions.remove(&group)?;
        self.gate.release();
        Some(session.previous_value)
    }

    pub fn cancel_all(&mut self) -> Vec<(FieldGroup, FieldValues)> {
        let editing: Vec<FieldGroup> = self
            .sessions
            .values()
            .filter(|session| session.state == SessionState::Editing)
            .map(|session| session.group)
            .collect();
        editing
            .into_iter()
            .filter_map(|group| self.cancel(group).map(|snapshot| (group, snapshot)))
            .collect()
    }

    /// Moves an Editing group to Committing; the gate stays closed until
    /// [`finish_commit`](Self::finish_commit).
    pub fn begin_commit(&mut self, group: FieldGroup) -> Result<(), SessionError> {
        match self.sessions.get_mut(&group) {
            Some(session) if session.state == SessionState::Editing => {
                session.state = SessionState::Committing;
                Ok(())
            }
            _ => Err(SessionError::NotEditing(group)),
        }
    }

    pub fn finish_commit(&mut self, group: FieldGroup) {
        if let Some(session) = self.sessions.get(&group)
            && session.state == SessionState::Committing
        {
            self.sessions.remove(&group);
            self.gate.release();
        }
    }
}
