//! Line-oriented console front end
//!
//! Reads commands from stdin and renders the venue views. Signals from the
//! bus (relayed between processes through the store) and the chat watcher
//! trigger a re-render; nothing is pushed as data.

use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pawpark_core::{
    heartbeat_interval, Backend, Collection, DeleteOutcome, Gender, JoinOutcome, LeaveOutcome,
    LeaveReason, NoopNotifier, Notifier, ProfileOutcome, ProfilePatch, RecentEntry,
    RenameOutcome, Result, SendOutcome, Session, SessionId, Topic,
};
use pawpark_sync::{HeartbeatTask, LocalBus, SharedBus, SignalRelay, StoreWatcher};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::state::AppState;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Join { name: String, consent: bool },
    Leave,
    Rename(String),
    Say(String),
    Delete(Uuid),
    Profile(ProfilePatch),
    Who,
    Chat,
    Dump,
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  join <name> --consent     check in (consent stores a 180-day identity)
  leave                     check out
  rename <name>             change display name
  say <text>                post to the venue chat
  del <message-id>          delete one of your messages
  profile key=value ...     breed, age, gender (male|female|-), photo
  who                       online now and recently present
  chat                      show the chat
  dump                      raw stored collections
  quit";

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> std::result::Result<Self, Self::Err> {
        let line = line.trim();
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        match verb.to_lowercase().as_str() {
            "join" => {
                let mut consent = false;
                let words: Vec<&str> = rest
                    .split_whitespace()
                    .filter(|w| {
                        let flag = *w == "--consent";
                        consent |= flag;
                        !flag
                    })
                    .collect();
                Ok(Command::Join {
                    name: words.join(" "),
                    consent,
                })
            }
            "leave" => Ok(Command::Leave),
            "rename" => Ok(Command::Rename(rest.to_string())),
            "say" => Ok(Command::Say(rest.to_string())),
            "del" | "delete" => Uuid::parse_str(rest)
                .map(Command::Delete)
                .map_err(|_| format!("not a message id: {}", rest)),
            "profile" => parse_patch(rest).map(Command::Profile),
            "who" => Ok(Command::Who),
            "chat" => Ok(Command::Chat),
            "dump" => Ok(Command::Dump),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            "" => Err("empty command".to_string()),
            other => Err(format!("unknown command: {}", other)),
        }
    }
}

/// `key=value` pairs; a value runs until the next token containing `=`
fn parse_patch(input: &str) -> std::result::Result<ProfilePatch, String> {
    let mut pairs: Vec<(String, String)> = Vec::new();
    for token in input.split_whitespace() {
        match token.split_once('=') {
            Some((key, value)) => pairs.push((key.to_lowercase(), value.to_string())),
            None => match pairs.last_mut() {
                Some((_, value)) => {
                    value.push(' ');
                    value.push_str(token);
                }
                None => return Err(format!("expected key=value, got {}", token)),
            },
        }
    }

    let mut patch = ProfilePatch::default();
    for (key, value) in pairs {
        match key.as_str() {
            "breed" => patch.breed = Some(value),
            "age" => patch.age = Some(value),
            "gender" => patch.gender = Some(Gender::from_str(&value)?),
            "photo" | "photourl" => patch.photo_url = Some(value),
            other => return Err(format!("unknown profile field: {}", other)),
        }
    }
    if patch.is_empty() {
        return Err("nothing to update".to_string());
    }
    Ok(patch)
}

/// Result of running one command
#[derive(Debug, Default)]
pub struct Reply {
    pub lines: Vec<String>,
    pub quit: bool,
}

impl Reply {
    fn line(text: impl Into<String>) -> Self {
        Self {
            lines: vec![text.into()],
            quit: false,
        }
    }
}

/// Run one command. `bus_enabled` is only reported by `dump`.
pub fn execute(session: &mut Session, command: Command, bus_enabled: bool) -> Result<Reply> {
    let reply = match command {
        Command::Join { name, consent } => match session.join(&name, consent)? {
            JoinOutcome::Joined => Reply {
                lines: render_who(session),
                quit: false,
            },
            JoinOutcome::EmptyName => Reply::line("a name is required"),
            JoinOutcome::ConsentRequired => {
                Reply::line("joining stores a cookie for 180 days; repeat with --consent")
            }
            JoinOutcome::NoIdentity => Reply::line("no stored identity"),
        },
        Command::Leave => match session.leave(LeaveReason::Explicit)? {
            LeaveOutcome::Left(entry) => Reply::line(format!("{} left", entry.display_name)),
            LeaveOutcome::NotJoined => Reply::line("not checked in"),
        },
        Command::Rename(name) => match session.rename(&name)? {
            RenameOutcome::Renamed => Reply::line(format!("now known as {}", name.trim())),
            RenameOutcome::NotJoined => Reply::line("not checked in"),
            RenameOutcome::EmptyName => Reply::line("a name is required"),
            RenameOutcome::Evicted => Reply::line("your check-in expired; join again"),
        },
        Command::Say(text) => match session.send_message(&text)? {
            SendOutcome::Sent(message) => Reply::line(format!(
                "[{}] {}: {} ({})",
                message.format_timestamp(),
                message.display_name,
                message.text,
                message.id
            )),
            SendOutcome::Empty => Reply::line("nothing to send"),
            SendOutcome::NotJoined => Reply::line("check in before chatting"),
        },
        Command::Delete(id) => match session.delete_message(id)? {
            DeleteOutcome::Deleted => Reply::line("deleted"),
            DeleteOutcome::NotFound => Reply::line("no such message"),
            DeleteOutcome::NotOwner => Reply::line("you can only delete your own messages"),
        },
        Command::Profile(patch) => match session.update_profile(session.id(), patch)? {
            ProfileOutcome::Updated(profile) => Reply::line(
                profile
                    .summary()
                    .unwrap_or_else(|| "profile updated".to_string()),
            ),
            ProfileOutcome::NotOwner => Reply::line("you can only edit your own profile"),
        },
        Command::Who => Reply {
            lines: render_who(session),
            quit: false,
        },
        Command::Chat => Reply {
            lines: render_chat(session),
            quit: false,
        },
        Command::Dump => {
            let dump = session.dump();
            let show = |name: &str, raw: Option<String>| {
                format!("{}: {}", name, raw.unwrap_or_else(|| "-".to_string()))
            };
            Reply {
                lines: vec![
                    show("members", dump.members),
                    show("recent", dump.recent),
                    show("profiles", dump.profiles),
                    show("chat", dump.chat),
                    format!("bus: {}", if bus_enabled { "on" } else { "off" }),
                ],
                quit: false,
            }
        }
        Command::Help => Reply::line(HELP),
        Command::Quit => Reply {
            lines: Vec::new(),
            quit: true,
        },
    };
    Ok(reply)
}

pub fn render_who(session: &Session) -> Vec<String> {
    let profiles = session.profiles();
    let mut lines = vec![format!("online at {}:", session.venue())];

    let online = session.online_now();
    if online.is_empty() {
        lines.push("  nobody".to_string());
    }
    for member in online {
        let you = if member.id == session.id() { " (you)" } else { "" };
        let summary = profiles
            .get(&member.id)
            .and_then(|p| p.summary())
            .map(|s| format!(" - {}", s))
            .unwrap_or_default();
        lines.push(format!("  {}{}{}", member.display_name, you, summary));
    }

    let recent = session.recent();
    if !recent.is_empty() {
        lines.push("recently here:".to_string());
        for entry in recent {
            lines.push(format!("  {} ({})", entry.display_name, entry.at.format("%H:%M")));
        }
    }
    lines
}

pub fn render_chat(session: &Session) -> Vec<String> {
    let messages = session.messages();
    if messages.is_empty() {
        return vec!["no messages".to_string()];
    }
    messages
        .iter()
        .map(|m| {
            let own = if m.owner_id == session.id() { "*" } else { " " };
            format!("{}[{}] {}: {}  {}", own, m.format_timestamp(), m.display_name, m.text, m.id)
        })
        .collect()
}

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{}", line);
    }
}

/// Interactive loop for one session at the resolved venue
pub async fn run(state: &AppState, venue_hint: Option<String>) -> Result<()> {
    let bus = LocalBus::new();
    let watch_interval = Duration::from_millis(state.config.sync.watch_interval_ms);
    let (notifier, _relay): (Arc<dyn Notifier>, Option<SignalRelay>) =
        if state.config.sync.broadcast {
            let backend: Arc<dyn Backend> = state.backend.clone();
            let shared = SharedBus::new(bus.clone(), backend);
            let relay = shared.spawn_relay(watch_interval);
            (Arc::new(shared), Some(relay))
        } else {
            info!("Broadcast disabled, relying on store polling");
            (Arc::new(NoopNotifier), None)
        };

    let deps = state.session_deps(notifier);
    let bootstrap = deps.bootstrap(venue_hint.as_deref(), &state.config.default_venue());
    let venue = bootstrap.venue.clone();
    if bootstrap.venue_locked() {
        println!("venue {} (from your stored check-in)", venue);
    } else {
        println!("venue {}", venue);
    }

    let session = Arc::new(Mutex::new(Session::open(bootstrap, &deps)));
    let own_id: SessionId = lock(&session).id();
    let mut heartbeat = HeartbeatTask::idle();

    {
        let mut s = lock(&session);
        if s.resume()? == JoinOutcome::Joined {
            println!("welcome back, {}", s.state().display_name);
            print_lines(&render_who(&s));
        } else {
            println!("type `help` for commands");
        }
    }
    sync_heartbeat(&session, &mut heartbeat);

    let mut presence = bus.subscribe(&Topic::Venue(venue.clone()));
    let mut chat = bus.subscribe(&Topic::Chat(venue.clone()));
    let (_watcher, mut chat_changes) = StoreWatcher::spawn(
        lock(&session).store().clone(),
        Collection::Chat,
        watch_interval,
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        warn!(error = %e, "Failed to read stdin");
                        break;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }
                let command = match line.parse::<Command>() {
                    Ok(command) => command,
                    Err(e) => {
                        println!("{}", e);
                        continue;
                    }
                };
                let reply = {
                    let mut s = lock(&session);
                    execute(&mut s, command, state.config.sync.broadcast)
                };
                match reply {
                    Ok(reply) => {
                        print_lines(&reply.lines);
                        if reply.quit {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::error!("Command failed: {}", e);
                        println!("error: {}", e);
                    }
                }
                sync_heartbeat(&session, &mut heartbeat);
            }
            Some(signal) = presence.recv() => {
                if signal.origin != own_id {
                    debug!(change = ?signal.change, "Venue changed");
                    print_lines(&render_who(&lock(&session)));
                }
            }
            Some(signal) = chat.recv() => {
                if signal.origin != own_id {
                    print_lines(&render_chat(&lock(&session)));
                }
            }
            Some(version) = chat_changes.recv() => {
                debug!(version, "Chat collection changed");
                print_lines(&render_chat(&lock(&session)));
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    shut_down(&session, &mut heartbeat)?;
    Ok(())
}

/// Exit path for quit, end of input and ctrl_c: stop the heartbeat, then
/// check out. Returns the departure when the session was joined.
pub fn shut_down(
    session: &Arc<Mutex<Session>>,
    heartbeat: &mut HeartbeatTask,
) -> Result<Option<RecentEntry>> {
    heartbeat.cancel();
    match lock(session).leave(LeaveReason::Terminated)? {
        LeaveOutcome::Left(entry) => {
            info!(name = %entry.display_name, "Checked out on exit");
            Ok(Some(entry))
        }
        LeaveOutcome::NotJoined => Ok(None),
    }
}

/// Keep the heartbeat running exactly while the session is joined
fn sync_heartbeat(session: &Arc<Mutex<Session>>, heartbeat: &mut HeartbeatTask) {
    let joined = lock(session).is_joined();
    if joined && !heartbeat.is_running() {
        *heartbeat = HeartbeatTask::spawn(session.clone(), heartbeat_interval());
    } else if !joined {
        heartbeat.cancel();
    }
}

fn lock(session: &Mutex<Session>) -> std::sync::MutexGuard<'_, Session> {
    session.lock().unwrap_or_else(|e| e.into_inner())
}
