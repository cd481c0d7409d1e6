//! Line commands read from stdin.

use scorekeep_bus::FormField;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
	#[error("unknown command {0:?}, try `help`")]
	Unknown(String),
	#[error("usage: {0}")]
	Usage(&'static str),
	#[error("field {0:?} is not of the form <element_id>=<value>")]
	BadField(String),
	#[error("payload is not valid JSON: {0}")]
	BadPayload(String),
}

pub const HELP: &str = "\
commands:
  edit <event_id> <element_id>=<value>...  submit a score form
  goto <params>                            flush pending scores, then navigate
  send <channel> <json>                    send a payload on a push channel
  show                                     print pending scores, query and channels
  help                                     this text
  quit                                     exit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
	Edit { event_id: String, fields: Vec<FormField> },
	Goto { params: String },
	Send { channel: String, payload: serde_json::Value },
	Show,
	Help,
	Quit,
}

impl Command {
	/// Parses one input line. Blank lines yield `Ok(None)`.
	pub fn parse(line: &str) -> Result<Option<Self>, ParseError> {
		let line = line.trim();
		let Some((verb, rest)) = split_word(line) else {
			return Ok(None);
		};

		let command = match verb {
			"edit" => {
				let (event_id, rest) = split_word(rest).ok_or(ParseError::Usage("edit <event_id> <element_id>=<value>..."))?;
				let fields = rest
					.split_whitespace()
					.map(|pair| match pair.split_once('=') {
						Some((id, value)) if !id.is_empty() => Ok(FormField::new(id, value)),
						_ => Err(ParseError::BadField(pair.to_string())),
					})
					.collect::<Result<Vec<_>, _>>()?;
				Self::Edit {
					event_id: event_id.to_string(),
					fields,
				}
			}
			"goto" => {
				if rest.is_empty() {
					return Err(ParseError::Usage("goto <params>"));
				}
				Self::Goto {
					params: rest.trim_start_matches('?').to_string(),
				}
			}
			"send" => {
				let (channel, payload) = split_word(rest).ok_or(ParseError::Usage("send <channel> <json>"))?;
				let payload = if payload.is_empty() {
					serde_json::Value::Object(Default::default())
				} else {
					serde_json::from_str(payload).map_err(|e| ParseError::BadPayload(e.to_string()))?
				};
				Self::Send {
					channel: channel.to_string(),
					payload,
				}
			}
			"show" => Self::Show,
			"help" | "?" => Self::Help,
			"quit" | "exit" => Self::Quit,
			other => return Err(ParseError::Unknown(other.to_string())),
		};
		Ok(Some(command))
	}
}

fn split_word(text: &str) -> Option<(&str, &str)> {
	let text = text.trim_start();
	if text.is_empty() {
		return None;
	}
	Some(match text.split_once(char::is_whitespace) {
		Some((word, rest)) => (word, rest.trim()),
		None => (text, ""),
	})
}
