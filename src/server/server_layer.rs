// Server layer - the console host the moderator runs inside.
//
// - `events.rs` adapts chat, book and sign events to the content gate.
// - `console.rs` is the in-memory world and action surface.
// - `input.rs` parses console lines.
// - `commands.rs` has the operator commands.

#[path = "events.rs"]
pub mod events;

#[path = "console.rs"]
pub mod console;

#[path = "input.rs"]
pub mod input;

#[path = "commands.rs"]
pub mod commands;

pub use console::ConsoleServer;
pub use input::ConsoleInput;
