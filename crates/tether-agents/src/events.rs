//! Background-agent poller event types

use serde::{Deserialize, Serialize};

use crate::poller::BackgroundAgent;
use crate::transcript::Activity;

/// Events emitted while tracking background agents
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PollerEvent {
    /// A new background agent was discovered in the message list
    Registered { agent: BackgroundAgent },

    /// New activity was parsed from an agent's transcript
    Activity {
        agent_id: String,
        activities: Vec<Activity>,
    },

    /// The agent's transcript went quiet and it is considered finished
    Completed {
        agent_id: String,
        result: Option<String>,
    },

    /// The user removed the agent from the tracked list
    Dismissed { agent_id: String },

    /// Tracking was reset (session switch)
    Reset,
}

impl PollerEvent {
    /// The agent this event is about, if any
    pub fn agent_id(&self) -> Option<&str> {
        match self {
            PollerEvent::Registered { agent } => Some(&agent.agent_id),
            PollerEvent::Activity { agent_id, .. }
            | PollerEvent::Completed { agent_id, .. }
            | PollerEvent::Dismissed { agent_id } => Some(agent_id),
            PollerEvent::Reset => None,
        }
    }
}
