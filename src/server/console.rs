// Console game server - an in-memory world driven from stdin.
//
// Plays the host role for the moderator: it owns the visible state (chat,
// signs, books, bans) and implements both the world primitives the event
// adapters write through and the privileged action surface the dispatcher
// uses. Everything a player would see is printed and kept in a short
// scrollback.

use super::events::{BlockPos, GameServer};
use crate::core::moderation::{ActionSurface, Actor, ContentKind};
use dashmap::{DashMap, DashSet};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Mutex;

const SCROLLBACK: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookRecord {
    pub pages: Vec<String>,
    pub signed: bool,
}

impl fmt::Display for BookRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.signed { "signed" } else { "draft" };
        write!(f, "{}: {}", state, self.pages.join(" | "))
    }
}

#[derive(Default)]
pub struct ConsoleServer {
    signs: DashMap<BlockPos, Vec<String>>,
    books: DashMap<(String, String), BookRecord>,
    banned: DashSet<String>,
    scrollback: Mutex<VecDeque<String>>,
}

impl ConsoleServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Print a line to the console and remember it.
    pub fn emit(&self, line: impl Into<String>) {
        let line = line.into();
        println!("{}", line);

        let mut scrollback = self
            .scrollback
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if scrollback.len() == SCROLLBACK {
            scrollback.pop_front();
        }
        scrollback.push_back(line);
    }

    pub fn scrollback(&self) -> Vec<String> {
        self.scrollback
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .cloned()
            .collect()
    }

    #[cfg(test)]
    pub fn sign_at(&self, pos: BlockPos) -> Option<Vec<String>> {
        self.signs.get(&pos).map(|lines| lines.clone())
    }

    #[cfg(test)]
    pub fn book(&self, author: &str, title: &str) -> Option<BookRecord> {
        self.books
            .get(&(author.to_string(), title.to_string()))
            .map(|book| book.clone())
    }

    pub fn is_banned(&self, player: &str) -> bool {
        self.banned.contains(&player.to_lowercase())
    }

    fn ban(&self, player: &str, reason: &str) {
        self.banned.insert(player.to_lowercase());
        tracing::info!(player, reason, "Player banned");
        self.emit(format!("[Server] {} was banned: {}", player, reason));
    }
}

impl GameServer for ConsoleServer {
    fn broadcast_chat(&self, sender: &Actor, message: &str) {
        self.emit(format!("<{}> {}", sender, message));
    }

    fn write_sign(&self, pos: BlockPos, lines: &[String]) {
        self.signs.insert(pos, lines.to_vec());
        self.emit(format!("[Sign {}] {}", pos, lines.join(" | ")));
    }

    fn write_book(&self, author: &Actor, title: &str, pages: &[String], signed: bool) {
        let record = BookRecord {
            pages: pages.to_vec(),
            signed,
        };
        self.emit(format!("[Book \"{}\" by {}] {}", title, author, record));
        self.books
            .insert((author.name.clone(), title.to_string()), record);
    }

    fn may_publish(&self, actor: &Actor) -> bool {
        !self.is_banned(&actor.name)
    }

    fn reject_edit(&self, actor: &Actor, kind: ContentKind) {
        self.emit(format!("[Server] {} edit by {} was rejected", kind, actor));
    }
}

impl ActionSurface for ConsoleServer {
    fn disconnect(&self, actor: &Actor, reason: &str) {
        tracing::info!(player = %actor, reason, "Player kicked");
        self.emit(format!("[Server] {} was kicked: {}", actor, reason));
    }

    fn notify(&self, actor: &Actor, message: &str) {
        self.emit(format!("[-> {}] {}", actor, message));
    }

    fn execute_command(&self, command: &str) {
        tracing::info!(command, "Running console command");

        let mut parts = command.trim().splitn(3, ' ');
        match (parts.next(), parts.next()) {
            (Some("ban"), Some(player)) => {
                let reason = parts.next().unwrap_or("Banned by an operator");
                self.ban(player, reason);
            }
            _ => self.emit(format!("[Console] /{}", command)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ban_command_updates_ban_list() {
        let server = ConsoleServer::new();
        server.execute_command("ban Griefer Rule violation: Toxicity");

        assert!(server.is_banned("griefer"));
        assert!(!server.is_banned("Steve"));
        assert_eq!(
            server.scrollback(),
            vec!["[Server] Griefer was banned: Rule violation: Toxicity".to_string()]
        );
    }

    #[test]
    fn test_other_commands_are_echoed() {
        let server = ConsoleServer::new();
        server.execute_command("mute Steve 5m");

        assert_eq!(server.scrollback(), vec!["[Console] /mute Steve 5m".to_string()]);
    }

    #[test]
    fn test_world_writes_are_stored() {
        let server = ConsoleServer::new();
        let pos = BlockPos { x: 1, y: 2, z: 3 };
        let alex = Actor::new("Alex");

        server.write_sign(pos, &["hi".to_string(), "there".to_string()]);
        server.write_book(&alex, "Diary", &["page".to_string()], true);

        assert_eq!(server.sign_at(pos), Some(vec!["hi".to_string(), "there".to_string()]));
        assert_eq!(
            server.book("Alex", "Diary"),
            Some(BookRecord {
                pages: vec!["page".to_string()],
                signed: true
            })
        );
        assert_eq!(server.book("Steve", "Diary"), None);
    }

    #[test]
    fn test_kick_and_notify_are_printed() {
        let server = ConsoleServer::new();
        let steve = Actor::new("Steve");

        server.notify(&steve, "Warning: Rule violation: Spam");
        server.disconnect(&steve, "Rule violation: Spam");

        assert_eq!(
            server.scrollback(),
            vec![
                "[-> Steve] Warning: Rule violation: Spam".to_string(),
                "[Server] Steve was kicked: Rule violation: Spam".to_string(),
            ]
        );
    }

    #[test]
    fn test_scrollback_is_bounded() {
        let server = ConsoleServer::new();
        for i in 0..SCROLLBACK + 10 {
            server.emit(format!("line {}", i));
        }

        let lines = server.scrollback();
        assert_eq!(lines.len(), SCROLLBACK);
        assert_eq!(lines[0], "line 10");
    }
}
