//! `tether watch` - follow the background agents of a saved session

use crate::session::SessionStore;
use std::sync::Arc;
use tether_agents::{
    ActivityKind, BackgroundAgentPoller, FsTranscriptSource, PollerConfig, PollerEvent,
};
use tether_core::UiMessage;
use tokio::sync::broadcast::error::RecvError;

pub struct WatchCommand;

impl WatchCommand {
    pub async fn execute(
        id: &str,
        store: &SessionStore,
        config: PollerConfig,
    ) -> anyhow::Result<()> {
        let session = store.load(id)?;
        let poller = BackgroundAgentPoller::new(Arc::new(FsTranscriptSource), config);

        tokio::select! {
            count = Self::watch(&poller, &session.messages, |line| println!("{line}")) => {
                if count == 0 {
                    println!("No background agents in session {id}");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("\nStopped watching");
            }
        }
        poller.reset();
        Ok(())
    }

    /// Discover agents in `messages` and report poller events until none is
    /// running. Returns the number of agents followed.
    pub async fn watch(
        poller: &BackgroundAgentPoller,
        messages: &[UiMessage],
        mut out: impl FnMut(String),
    ) -> usize {
        let mut events = poller.subscribe();
        let discovered = poller.discover(messages).len();
        if discovered == 0 {
            return 0;
        }

        let mut finished = 0;
        while finished < discovered {
            match events.recv().await {
                Ok(event) => {
                    if matches!(
                        event,
                        PollerEvent::Completed { .. } | PollerEvent::Dismissed { .. }
                    ) {
                        finished += 1;
                    }
                    for line in describe(&event) {
                        out(line);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "watch fell behind poller events");
                    if !poller.has_running() {
                        break;
                    }
                }
                Err(RecvError::Closed) => break,
            }
        }
        discovered
    }
}

fn describe(event: &PollerEvent) -> Vec<String> {
    match event {
        PollerEvent::Registered { agent } => vec![format!(
            "↻ {} started ({})",
            if agent.description.is_empty() {
                &agent.agent_id
            } else {
                &agent.description
            },
            agent.output_file
        )],
        PollerEvent::Activity {
            agent_id,
            activities,
        } => activities
            .iter()
            .map(|a| match a.kind {
                ActivityKind::ToolCall => format!(
                    "  [{agent_id}] ⚙ {} {}",
                    a.tool_name.as_deref().unwrap_or("tool"),
                    a.summary
                )
                .trim_end()
                .to_string(),
                ActivityKind::Text => format!("  [{agent_id}] {}", a.summary),
            })
            .collect(),
        PollerEvent::Completed { agent_id, result } => {
            let mut lines = vec![format!("✓ {agent_id} completed")];
            if let Some(result) = result {
                lines.extend(result.lines().map(|l| format!("  {l}")));
            }
            lines
        }
        PollerEvent::Dismissed { agent_id } => vec![format!("✗ {agent_id} dismissed")],
        PollerEvent::Reset => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use std::time::Duration;
    use tether_core::ToolResultPayload;

    fn agent_call(tool_use_id: &str, output_file: &str) -> UiMessage {
        let mut msg = UiMessage::tool_call(
            tool_use_id,
            "Task",
            json!({"description": "Survey crates"}),
            1,
        );
        msg.attach_tool_result(ToolResultPayload {
            is_async: true,
            output_file: Some(output_file.into()),
            ..Default::default()
        });
        msg
    }

    #[tokio::test]
    async fn test_watch_until_completed() {
        let mut transcript = tempfile::NamedTempFile::new().unwrap();
        for line in [
            json!({"type": "user", "message": {"content": "go"}}),
            json!({"type": "assistant", "message": {"content": [
                {"type": "tool_use", "name": "Grep", "input": {"pattern": "tokio"}}
            ]}}),
            json!({"type": "assistant", "message": {"content": [
                {"type": "text", "text": "Found 3 crates."}
            ]}}),
        ] {
            writeln!(transcript, "{line}").unwrap();
        }
        let path = transcript.path().to_string_lossy().to_string();

        let poller = BackgroundAgentPoller::new(
            Arc::new(FsTranscriptSource),
            PollerConfig {
                interval: Duration::from_millis(10),
                stability_threshold: 2,
            },
        );
        let mut lines = Vec::new();
        let followed = tokio::time::timeout(
            Duration::from_secs(5),
            WatchCommand::watch(&poller, &[agent_call("t1", &path)], |l| lines.push(l)),
        )
        .await
        .unwrap();

        assert_eq!(followed, 1);
        assert!(lines[0].starts_with("↻ Survey crates started"));
        assert!(lines.contains(&"  [t1] ⚙ Grep tokio".to_string()));
        assert!(lines.contains(&"✓ t1 completed".to_string()));
        assert_eq!(lines.last().map(String::as_str), Some("  Found 3 crates."));
    }

    #[tokio::test]
    async fn test_nothing_to_watch() {
        let poller = BackgroundAgentPoller::new(Arc::new(FsTranscriptSource), PollerConfig::default());
        let followed = WatchCommand::watch(&poller, &[UiMessage::user("u", "hi", 1)], |_| {}).await;
        assert_eq!(followed, 0);
    }
}
