// Moderation config infra.
// - `moderation_file.rs` is the JSON file format and its conversion to rules.
// - `file_source.rs` combines the file with environment settings into a snapshot.

#[path = "moderation_file.rs"]
pub mod moderation_file;

#[path = "file_source.rs"]
pub mod file_source;

pub use file_source::FileConfigSource;
