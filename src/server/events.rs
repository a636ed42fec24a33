// Host event adapters.
//
// Each content kind a player can produce (chat line, signed book, sign
// edit) is wrapped in an adapter that the content gate drives through
// `InterceptedContent`. The adapters own the original payload and write to
// the world through the `GameServer` primitives only.

use crate::core::moderation::{Actor, ContentKind, InterceptedContent};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Shown on every sign line while its text is being analyzed.
pub const SIGN_ANALYZING: &str = "ANALYZING...";
/// Shown on every sign line after a violation.
pub const SIGN_BLOCKED: &str = "BREAKING RULES.";
/// Shown on every book page while the book is being analyzed.
pub const BOOK_ANALYZING: &str = "Analyzing...";
/// Shown on every book page after a violation.
pub const BOOK_BLOCKED: &str = "Blocked";

/// Maximum lines a sign can hold.
pub const SIGN_LINES: usize = 4;

// ============================================================================
// HOST PRIMITIVES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.x, self.y, self.z)
    }
}

impl FromStr for BlockPos {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        let [x, y, z] = parts.as_slice() else {
            anyhow::bail!("expected x,y,z but got '{}'", s);
        };

        Ok(Self {
            x: x.parse()?,
            y: y.parse()?,
            z: z.parse()?,
        })
    }
}

/// World mutations the adapters need. Everything here runs on the
/// governing loop.
pub trait GameServer: Send + Sync {
    /// Deliver a chat line from `sender` to every player.
    fn broadcast_chat(&self, sender: &Actor, message: &str);

    /// Set the visible text of the sign at `pos`.
    fn write_sign(&self, pos: BlockPos, lines: &[String]);

    /// Store `pages` as the book `title` held by `author`.
    fn write_book(&self, author: &Actor, title: &str, pages: &[String], signed: bool);

    /// Whether `actor` may still publish. Checked again when an analysis
    /// finishes, since the player can be banned while it runs.
    fn may_publish(&self, actor: &Actor) -> bool;

    /// Refuse the edit that produced the event.
    fn reject_edit(&self, actor: &Actor, kind: ContentKind);
}

// ============================================================================
// CHAT
// ============================================================================

pub struct ChatMessage {
    server: Arc<dyn GameServer>,
    sender: Actor,
    message: String,
    delivered: bool,
}

impl ChatMessage {
    pub fn new(server: Arc<dyn GameServer>, sender: Actor, message: impl Into<String>) -> Self {
        Self {
            server,
            sender,
            message: message.into(),
            delivered: false,
        }
    }
}

impl InterceptedContent for ChatMessage {
    fn kind(&self) -> ContentKind {
        ContentKind::Chat
    }

    fn actor(&self) -> &Actor {
        &self.sender
    }

    fn original_text(&self) -> String {
        self.message.clone()
    }

    // Chat has no placeholder; holding the broadcast back is enough
    fn suppress(&mut self) {}

    fn commit(&mut self) {
        if self.delivered {
            return;
        }
        self.delivered = true;

        if !self.server.may_publish(&self.sender) {
            self.server.reject_edit(&self.sender, ContentKind::Chat);
            return;
        }
        self.server.broadcast_chat(&self.sender, &self.message);
    }

    fn block(&mut self) {}

    fn cancel(&mut self) {}
}

// ============================================================================
// BOOKS
// ============================================================================

/// A player signing a book. Unsigned draft edits never reach the gate.
pub struct SignedBook {
    server: Arc<dyn GameServer>,
    author: Actor,
    title: String,
    pages: Vec<String>,
}

impl SignedBook {
    pub fn new(
        server: Arc<dyn GameServer>,
        author: Actor,
        title: impl Into<String>,
        pages: Vec<String>,
    ) -> Self {
        Self {
            server,
            author,
            title: title.into(),
            pages,
        }
    }

    fn placeholder(&self, text: &str) -> Vec<String> {
        vec![text.to_string(); self.pages.len().max(1)]
    }
}

impl InterceptedContent for SignedBook {
    fn kind(&self) -> ContentKind {
        ContentKind::Book
    }

    fn actor(&self) -> &Actor {
        &self.author
    }

    fn original_text(&self) -> String {
        self.pages.join("\n")
    }

    fn suppress(&mut self) {
        let pages = self.placeholder(BOOK_ANALYZING);
        self.server.write_book(&self.author, &self.title, &pages, false);
    }

    // A banned author keeps the pages as an unsigned draft
    fn commit(&mut self) {
        let signed = self.server.may_publish(&self.author);
        self.server
            .write_book(&self.author, &self.title, &self.pages, signed);
        if !signed {
            self.server.reject_edit(&self.author, ContentKind::Book);
        }
    }

    fn block(&mut self) {
        let pages = self.placeholder(BOOK_BLOCKED);
        self.server.write_book(&self.author, &self.title, &pages, false);
    }

    fn cancel(&mut self) {
        self.server.reject_edit(&self.author, ContentKind::Book);
    }
}

// ============================================================================
// SIGNS
// ============================================================================

pub struct SignEdit {
    server: Arc<dyn GameServer>,
    editor: Actor,
    pos: BlockPos,
    lines: Vec<String>,
}

impl SignEdit {
    pub fn new(server: Arc<dyn GameServer>, editor: Actor, pos: BlockPos, lines: Vec<String>) -> Self {
        Self {
            server,
            editor,
            pos,
            lines,
        }
    }

    fn fill(&self, text: &str) {
        let lines = vec![text.to_string(); self.lines.len()];
        self.server.write_sign(self.pos, &lines);
    }
}

impl InterceptedContent for SignEdit {
    fn kind(&self) -> ContentKind {
        ContentKind::Sign
    }

    fn actor(&self) -> &Actor {
        &self.editor
    }

    fn original_text(&self) -> String {
        self.lines.join("\n")
    }

    fn suppress(&mut self) {
        self.fill(SIGN_ANALYZING);
    }

    fn commit(&mut self) {
        if !self.server.may_publish(&self.editor) {
            self.fill("");
            self.server.reject_edit(&self.editor, ContentKind::Sign);
            return;
        }
        self.server.write_sign(self.pos, &self.lines);
    }

    fn block(&mut self) {
        self.fill(SIGN_BLOCKED);
    }

    // The blocked placeholder stays on the sign
    fn cancel(&mut self) {
        self.server.reject_edit(&self.editor, ContentKind::Sign);
    }
}
