// Console input - one host event or operator command per line.
//
//   chat <player> <message...>
//   book <player> <title> <page1>|<page2>|...
//   draft <player> <title> <page1>|<page2>|...
//   sign <player> <x>,<y>,<z> <line1>|<line2>|...
//   aimreload | aimstatus | stop

use super::events::{BlockPos, SIGN_LINES};
use anyhow::{bail, Context};

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleInput {
    Chat {
        player: String,
        message: String,
    },
    Book {
        player: String,
        title: String,
        pages: Vec<String>,
        /// Only signing is moderated; drafts are saved as-is
        signing: bool,
    },
    Sign {
        player: String,
        pos: BlockPos,
        lines: Vec<String>,
    },
    Reload,
    Status,
    Stop,
}

impl ConsoleInput {
    pub fn parse(line: &str) -> anyhow::Result<Self> {
        let (verb, rest) = split_word(line).context("empty input")?;

        match verb.to_lowercase().as_str() {
            "aimreload" => Ok(Self::Reload),
            "aimstatus" => Ok(Self::Status),
            "stop" => Ok(Self::Stop),
            "chat" => {
                let (player, message) = split_word(rest).context("usage: chat <player> <message>")?;
                if message.trim().is_empty() {
                    bail!("usage: chat <player> <message>");
                }
                Ok(Self::Chat {
                    player: player.to_string(),
                    message: message.to_string(),
                })
            }
            verb @ ("book" | "draft") => {
                let usage = || format!("usage: {} <player> <title> <page1>|<page2>|...", verb);
                let (player, rest) = split_word(rest).with_context(usage)?;
                let (title, text) = split_word(rest).with_context(usage)?;
                Ok(Self::Book {
                    player: player.to_string(),
                    title: title.to_string(),
                    pages: split_pipes(text),
                    signing: verb == "book",
                })
            }
            "sign" => {
                let usage = "usage: sign <player> <x>,<y>,<z> <line1>|<line2>|...";
                let (player, rest) = split_word(rest).context(usage)?;
                let (pos, text) = split_word(rest).context(usage)?;
                let pos: BlockPos = pos.parse().context(usage)?;

                let lines = split_pipes(text);
                if lines.len() > SIGN_LINES {
                    bail!("a sign holds at most {} lines", SIGN_LINES);
                }

                Ok(Self::Sign {
                    player: player.to_string(),
                    pos,
                    lines,
                })
            }
            other => bail!("unknown command '{}'", other),
        }
    }
}

/// Split off the first whitespace-delimited word. The remainder keeps its
/// text verbatim apart from the single separating character.
fn split_word(input: &str) -> Option<(&str, &str)> {
    let input = input.trim_start();
    if input.is_empty() {
        return None;
    }

    match input.find(char::is_whitespace) {
        Some(end) => {
            let sep_len = input[end..].chars().next().map_or(1, char::len_utf8);
            Some((&input[..end], &input[end + sep_len..]))
        }
        None => Some((input, "")),
    }
}

fn split_pipes(text: &str) -> Vec<String> {
    text.split('|').map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_operator_commands() {
        assert_eq!(ConsoleInput::parse("aimreload").unwrap(), ConsoleInput::Reload);
        assert_eq!(ConsoleInput::parse("  AIMSTATUS ").unwrap(), ConsoleInput::Status);
        assert_eq!(ConsoleInput::parse("stop").unwrap(), ConsoleInput::Stop);
    }

    #[test]
    fn test_chat_message_is_verbatim() {
        assert_eq!(
            ConsoleInput::parse("chat Steve  hello   world ").unwrap(),
            ConsoleInput::Chat {
                player: "Steve".to_string(),
                message: " hello   world ".to_string(),
            }
        );
    }

    #[test]
    fn test_chat_requires_message() {
        assert!(ConsoleInput::parse("chat Steve").is_err());
        assert!(ConsoleInput::parse("chat Steve    ").is_err());
    }

    #[test]
    fn test_parse_book_and_draft() {
        assert_eq!(
            ConsoleInput::parse("book Alex Diary first page|second page").unwrap(),
            ConsoleInput::Book {
                player: "Alex".to_string(),
                title: "Diary".to_string(),
                pages: vec!["first page".to_string(), "second page".to_string()],
                signing: true,
            }
        );

        let draft = ConsoleInput::parse("draft Alex Notes todo").unwrap();
        assert!(matches!(draft, ConsoleInput::Book { signing: false, .. }));
    }

    #[test]
    fn test_parse_sign() {
        assert_eq!(
            ConsoleInput::parse("sign Alex 10,64,-3 Welcome||to my|shop").unwrap(),
            ConsoleInput::Sign {
                player: "Alex".to_string(),
                pos: BlockPos { x: 10, y: 64, z: -3 },
                lines: vec![
                    "Welcome".to_string(),
                    String::new(),
                    "to my".to_string(),
                    "shop".to_string(),
                ],
            }
        );
    }

    #[test]
    fn test_sign_rejects_bad_input() {
        assert!(ConsoleInput::parse("sign Alex 10,64 text").is_err());
        assert!(ConsoleInput::parse("sign Alex 1,2,3 a|b|c|d|e").is_err());
    }

    #[test]
    fn test_unknown_and_empty_input() {
        assert!(ConsoleInput::parse("teleport Steve").is_err());
        assert!(ConsoleInput::parse("   ").is_err());
    }
}
