/// `rw/rapid/execution` state, spec §3.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RapidExecutionState {
    pub ctrlexecstate: String,
    pub cycle: String,
}

/// Event-log message classification, closed over the controller's
/// `1`/`2`/`3` codes — see `original_source/rapid_commander.py`'s
/// `LOG_MSG_TYPE_{INFO,WARNING,ERROR}` constants for the same three-way
/// split in the original ROS service layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMessageType {
    Info,
    Warning,
    Error,
}

impl LogMessageType {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(LogMessageType::Info),
            2 => Some(LogMessageType::Warning),
            3 => Some(LogMessageType::Error),
            _ => None,
        }
    }
}

/// One entry from the controller's event log, spec §3/§4.3.
#[derive(Debug, Clone, PartialEq)]
pub struct RapidEventLogEntry {
    pub msg_type: LogMessageType,
    pub code: i64,
    pub timestamp: chrono::NaiveDateTime,
    pub args: Vec<String>,
    pub title: String,
    pub description: String,
    pub consequences: String,
    pub causes: String,
    pub actions: String,
}

/// A message read from or sent to an IPC queue, spec §3/§4.3.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RapidIpcMessage {
    pub payload: String,
    pub userdef: i64,
    pub msgtype: i64,
    pub cmd: i64,
}

/// A digital I/O signal reading, spec §3.
#[derive(Debug, Clone, PartialEq)]
pub struct RapidSignal {
    pub name: String,
    pub lvalue: f64,
}
