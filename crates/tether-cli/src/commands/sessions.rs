//! `tether sessions` - list saved sessions

use crate::session::SessionStore;

pub struct SessionsCommand;

impl SessionsCommand {
    pub fn execute(store: &SessionStore) -> anyhow::Result<()> {
        let sessions = store.list()?;
        if sessions.is_empty() {
            println!("No saved sessions found.");
            println!("Sessions are stored in: {}", store.dir().display());
            return Ok(());
        }

        println!("Saved sessions:\n");
        println!("{:<38} {:<20} {:<8} Working Dir", "ID", "Created", "Msgs");
        println!("{}", "-".repeat(90));
        for s in sessions {
            println!(
                "{:<38} {:<20} {:<8} {}",
                s.id,
                s.created_at_display(),
                s.message_count,
                s.working_dir
            );
        }
        println!("\nResume with: tether resume <session-id>");
        Ok(())
    }
}
