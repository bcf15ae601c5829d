use crate::auth;
use crate::config::Config;
use crate::session::Session;
use crate::state::PollState;
use crate::transport::Transport;
use log::{debug, warn};
use std::collections::HashMap;
use std::sync::Arc;

type ConsoleResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

pub const HELP: &str = "\
commands:
  join <name> [password]      log in (the name 'admin' needs the password)
  leave <name>                log out, keeping that participant's state
  <name> vote <option>        vote on the current question
  <name> reveal|next|reset    admin controls
  <name> start|end            admin: start or end the session
  show <name>                 print what <name> currently sees
  help | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Join { name: String, password: Option<String> },
    Leave { name: String },
    Vote { name: String, option: String },
    Reveal { name: String },
    Next { name: String },
    Reset { name: String },
    Start { name: String },
    End { name: String },
    Show { name: String },
    Help,
    Quit,
}

/// Parses one input line. Blank lines give `Ok(None)`.
pub fn parse_command(line: &str) -> ConsoleResult<Option<Command>> {
    let line = line.trim();
    let mut parts = line.split_whitespace();
    let first = match parts.next() {
        Some(word) => word,
        None => return Ok(None),
    };

    let command = match first {
        "help" => Command::Help,
        "quit" | "exit" => Command::Quit,
        "join" => {
            let name = parts.next().ok_or("usage: join <name> [password]")?.to_string();
            let password = parts.next().map(str::to_string);
            Command::Join { name, password }
        }
        "leave" => Command::Leave {
            name: parts.next().ok_or("usage: leave <name>")?.to_string(),
        },
        "show" => Command::Show {
            name: parts.next().ok_or("usage: show <name>")?.to_string(),
        },
        name => {
            let name = name.to_string();
            match parts.next() {
                Some("vote") => {
                    // Options may contain spaces, so take the rest of the line.
                    let option = line[first.len()..]
                        .trim_start()
                        .strip_prefix("vote")
                        .map(str::trim)
                        .filter(|o| !o.is_empty())
                        .ok_or("usage: <name> vote <option>")?
                        .to_string();
                    Command::Vote { name, option }
                }
                Some("reveal") => Command::Reveal { name },
                Some("next") => Command::Next { name },
                Some("reset") => Command::Reset { name },
                Some("start") => Command::Start { name },
                Some("end") => Command::End { name },
                Some(other) => return Err(format!("unknown action '{}'", other).into()),
                None => return Err(format!("what should {} do? try 'help'", name).into()),
            }
        }
    };
    Ok(Some(command))
}

/// Several participants sharing one relay, driven line by line.
pub struct Console {
    config: Config,
    transport: Arc<dyn Transport>,
    sessions: HashMap<String, Session>,
    parked: HashMap<String, PollState>,
}

impl Console {
    pub fn new(config: Config, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            transport,
            sessions: HashMap::new(),
            parked: HashMap::new(),
        }
    }

    /// Runs one command, then lets every publish land and every session
    /// catch up before reporting.
    pub async fn execute(&mut self, command: Command) -> ConsoleResult<String> {
        let mut output = match command {
            Command::Help => HELP.to_string(),
            Command::Quit => "bye".to_string(),
            Command::Join { name, password } => self.join(&name, password.as_deref())?,
            Command::Leave { name } => self.leave(&name).await?,
            Command::Show { name } => self.show(&name)?,
            Command::Vote { name, option } => {
                self.session(&name)?.submit_vote(&option)?;
                format!("{} voted '{}'", name, option)
            }
            Command::Reveal { name } => {
                self.session(&name)?.reveal_results()?;
                "results revealed".to_string()
            }
            Command::Next { name } => {
                self.session(&name)?.advance_question()?;
                "moving to the next question".to_string()
            }
            Command::Reset { name } => {
                self.session(&name)?.reset_session()?;
                "session reset".to_string()
            }
            Command::Start { name } => {
                self.session(&name)?.start_session()?;
                "session started".to_string()
            }
            Command::End { name } => {
                self.session(&name)?.end_session()?;
                "session ended".to_string()
            }
        };

        for line in self.sync_all().await {
            output.push('\n');
            output.push_str(&line);
        }
        Ok(output)
    }

    /// Logs everyone out.
    pub async fn shutdown(&mut self) {
        let names: Vec<String> = self.sessions.keys().cloned().collect();
        for name in names {
            if let Err(e) = self.leave(&name).await {
                warn!("Could not log {} out: {}", name, e);
            }
        }
    }

    fn join(&mut self, name: &str, password: Option<&str>) -> ConsoleResult<String> {
        let user = auth::login(name, password, &self.config)?;
        if self.sessions.contains_key(&user.name) {
            return Err(format!("{} is already logged in", user.name).into());
        }

        let state = self.parked.remove(&user.name).unwrap_or_default();
        let is_admin = user.is_admin;
        let key = user.name.clone();
        let session = Session::resume(user, state, Arc::clone(&self.transport), &self.config)?;
        self.sessions.insert(key.clone(), session);

        Ok(if is_admin {
            format!("{} joined as admin", key)
        } else {
            format!("{} joined", key)
        })
    }

    async fn leave(&mut self, name: &str) -> ConsoleResult<String> {
        let session = self
            .sessions
            .remove(name)
            .ok_or_else(|| format!("{} is not logged in", name))?;
        let state = session.logout().await;
        self.parked.insert(name.to_string(), state);
        Ok(format!("{} left", name))
    }

    fn show(&self, name: &str) -> ConsoleResult<String> {
        let session = self
            .sessions
            .get(name)
            .ok_or_else(|| format!("{} is not logged in", name))?;
        let view = serde_json::json!({
            "screen": session.screen(),
            "view": session.view(),
        });
        Ok(serde_json::to_string_pretty(&view)?)
    }

    fn session(&mut self, name: &str) -> ConsoleResult<&mut Session> {
        self.sessions
            .get_mut(name)
            .ok_or_else(|| format!("{} is not logged in", name).into())
    }

    /// Settles all outbound publishes, then drains every inbound queue.
    /// Returns alert lines to show.
    async fn sync_all(&mut self) -> Vec<String> {
        for session in self.sessions.values_mut() {
            session.settle().await;
        }

        let mut lines = Vec::new();
        for (name, session) in self.sessions.iter_mut() {
            let applied = session.drain();
            if applied > 0 {
                debug!("[{}] applied {} event(s)", session.label(), applied);
            }
            for alert in session.take_alerts() {
                lines.push(format!("[{}] ALERT: {}", name, alert.message));
            }
        }
        lines.sort();
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::local::LocalRelay;

    fn console() -> (Arc<LocalRelay>, Console) {
        let relay = Arc::new(LocalRelay::new());
        let transport: Arc<dyn Transport> = relay.clone();
        let config = Config {
            admin_password: Some("pw".to_string()),
            ..Config::default()
        };
        (relay, Console::new(config, transport))
    }

    async fn run(console: &mut Console, line: &str) -> ConsoleResult<String> {
        let command = parse_command(line)?.ok_or("blank line")?;
        console.execute(command).await
    }

    #[test]
    fn parses_commands() {
        assert_eq!(parse_command("   ").unwrap(), None);
        assert_eq!(
            parse_command("join admin pw").unwrap(),
            Some(Command::Join { name: "admin".to_string(), password: Some("pw".to_string()) })
        );
        assert_eq!(
            parse_command("alice vote  Drug Discovery ").unwrap(),
            Some(Command::Vote { name: "alice".to_string(), option: "Drug Discovery".to_string() })
        );
        assert_eq!(
            parse_command("admin next").unwrap(),
            Some(Command::Next { name: "admin".to_string() })
        );
        assert_eq!(parse_command("quit").unwrap(), Some(Command::Quit));
    }

    #[test]
    fn rejects_malformed_commands() {
        assert!(parse_command("join").is_err());
        assert!(parse_command("alice").is_err());
        assert!(parse_command("alice dance").is_err());
        assert!(parse_command("alice vote").is_err());
    }

    #[tokio::test]
    async fn scripted_round_reaches_every_participant() {
        let (_relay, mut console) = console();
        run(&mut console, "join alice").await.unwrap();
        run(&mut console, "join admin pw").await.unwrap();
        run(&mut console, "admin start").await.unwrap();
        run(&mut console, "alice vote Diagnostics").await.unwrap();
        run(&mut console, "admin reveal").await.unwrap();
        run(&mut console, "admin next").await.unwrap();

        let alice = &console.sessions["alice"];
        assert_eq!(alice.snapshot().current_question_index, 1);
        assert_eq!(alice.snapshot().questions[0].tally("Diagnostics"), 1);
        assert!(!alice.snapshot().results_visible);

        let shown = run(&mut console, "show alice").await.unwrap();
        assert!(shown.contains("\"screen\": \"question\""));
    }

    #[tokio::test]
    async fn errors_are_reported_not_fatal() {
        let (_relay, mut console) = console();
        assert!(run(&mut console, "join admin wrong").await.is_err());
        assert!(run(&mut console, "bob vote Yes").await.is_err());

        run(&mut console, "join bob").await.unwrap();
        assert!(run(&mut console, "join bob").await.is_err());
        assert!(run(&mut console, "bob reveal").await.is_err());
    }

    #[tokio::test]
    async fn failed_vote_is_surfaced_as_an_alert() {
        let (relay, mut console) = console();
        run(&mut console, "join bob").await.unwrap();
        relay.set_offline(true);

        let output = run(&mut console, "bob vote Diagnostics").await.unwrap();
        assert!(output.contains("[bob] ALERT: Failed to save your vote."));
    }

    #[tokio::test]
    async fn leaving_and_rejoining_keeps_local_state() {
        let (relay, mut console) = console();
        run(&mut console, "join bob").await.unwrap();
        run(&mut console, "bob vote Diagnostics").await.unwrap();
        run(&mut console, "leave bob").await.unwrap();
        assert_eq!(relay.subscriber_count("voting-channel"), 0);

        run(&mut console, "join bob").await.unwrap();
        let bob = &console.sessions["bob"];
        assert_eq!(bob.state().vote_record.get(&1).map(String::as_str), Some("Diagnostics"));

        console.shutdown().await;
        assert!(console.sessions.is_empty());
    }
}
