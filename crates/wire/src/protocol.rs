//! Commands and payload records exchanged between scheduler and workers.
//!
//! Payloads are JSON records carried inside the framed body.

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::codec::Frame;
use crate::error::WireError;

/// Default scheduler port for worker connections.
pub const DEFAULT_PORT: u16 = 9001;

/// Known command bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
    /// Scheduler → worker: a unit of work.
    Task = 1,
    /// Worker → scheduler: the outcome of a task.
    Result = 2,
    /// Reserved handshake. Currently carries no behaviour on either side.
    Hello = 3,
}

impl Command {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Command {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Task),
            2 => Ok(Self::Result),
            3 => Ok(Self::Hello),
            other => Err(other),
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Task => "TASK",
            Self::Result => "RESULT",
            Self::Hello => "HELLO",
        };
        f.write_str(name)
    }
}

/// Body of a `TASK` frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPayload {
    pub id: String,
    pub data: String,
}

/// Body of a `RESULT` frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultPayload {
    pub task_id: String,
    pub result: String,
}

impl Frame {
    /// Build a frame whose body is `body` serialized as JSON.
    pub fn json<T: Serialize>(command: Command, body: &T) -> Result<Self, WireError> {
        let payload = serde_json::to_vec(body)?;
        Ok(Self::new(command.as_u8(), payload))
    }

    pub fn task(task: &TaskPayload) -> Result<Self, WireError> {
        Self::json(Command::Task, task)
    }

    pub fn result(result: &ResultPayload) -> Result<Self, WireError> {
        Self::json(Command::Result, result)
    }

    /// The known command for this frame, if any.
    pub fn kind(&self) -> Option<Command> {
        Command::try_from(self.command).ok()
    }

    /// Deserialize the JSON body.
    pub fn decode_json<T: DeserializeOwned>(&self) -> Result<T, WireError> {
        Ok(serde_json::from_slice(&self.payload)?)
    }
}
