//! Text codec: one [`Message`] to one line of text, and back.
//!
//! The codec owns no I/O. Byte framing (splitting a stream on line
//! terminators) lives in the transport crate; this module only ever sees a
//! single line without its terminator.
//!
//! ## Encoding
//!
//! ```text
//! join:                      quit:
//! join_ack:0                 join_ack:1,<size>,<x,y,v,f>...
//! new:<size>,<x,y,v,f>...    new_ack:<0|1>
//! fill:<x>,<y>,<v>           fill_ack:<x>,<y>,<v>
//! ```
//!
//! ## Decoding
//!
//! [`decode`] is total: it never panics and never returns an error. Anything
//! it cannot parse (unknown header, wrong field count, a non-numeric field,
//! a board that breaks its structural invariants) becomes [`Message::Malformed`].
//! [`try_decode`] exposes the same parser with the reason as a
//! [`ProtocolError`].

use std::fmt::Write;

use crate::types::header;
use crate::{BoardSnapshot, Message, ProtocolError, Square};

/// Encodes a message as one line, without a line terminator.
///
/// # Errors
/// - [`ProtocolError::NotTransmittable`] for `Closed` and `Malformed`
/// - [`ProtocolError::InvalidBoard`] for a `JoinAck` whose `board` does not
///   match its `accepted` flag
///
/// ```
/// use sudoku_duel_protocol::{encode, Message};
///
/// let line = encode(&Message::Fill { x: 3, y: 4, value: 7 }).unwrap();
/// assert_eq!(line, "fill:3,4,7");
/// ```
pub fn encode(msg: &Message) -> Result<String, ProtocolError> {
    let line = match msg {
        Message::Join => header::JOIN.to_string(),
        Message::Quit => header::QUIT.to_string(),

        Message::JoinAck {
            accepted: false,
            board: None,
        } => format!("{}0", header::JOIN_ACK),
        Message::JoinAck {
            accepted: true,
            board: Some(board),
        } => {
            let mut line = format!("{}1,", header::JOIN_ACK);
            push_board(&mut line, board);
            line
        }
        Message::JoinAck { accepted, .. } => {
            return Err(ProtocolError::InvalidBoard(format!(
                "join_ack with accepted={accepted} must {} a board",
                if *accepted { "carry" } else { "not carry" }
            )));
        }

        Message::NewGame { board } => {
            let mut line = header::NEW.to_string();
            push_board(&mut line, board);
            line
        }
        Message::NewGameAck { accepted } => {
            format!("{}{}", header::NEW_ACK, u8::from(*accepted))
        }

        Message::Fill { x, y, value } => {
            format!("{}{x},{y},{value}", header::FILL)
        }
        Message::FillAck { x, y, value } => {
            format!("{}{x},{y},{value}", header::FILL_ACK)
        }

        Message::Closed | Message::Malformed { .. } => {
            return Err(ProtocolError::NotTransmittable(msg.kind()));
        }
    };
    Ok(line)
}

/// Appends `size` and then `,x,y,v,f` for every square.
fn push_board(line: &mut String, board: &BoardSnapshot) {
    // Writing into a String cannot fail.
    let _ = write!(line, "{}", board.size());
    for sq in board.squares() {
        let _ = write!(
            line,
            ",{},{},{},{}",
            sq.x,
            sq.y,
            sq.value,
            u8::from(sq.fixed)
        );
    }
}

/// Decodes one line. Never fails: undecodable input becomes
/// [`Message::Malformed`] carrying the original line and the reason.
///
/// ```
/// use sudoku_duel_protocol::{decode, Message};
///
/// assert_eq!(decode("fill:3,4,7"), Message::Fill { x: 3, y: 4, value: 7 });
/// assert!(matches!(decode("bogus_header:1,2,3"), Message::Malformed { .. }));
/// ```
pub fn decode(line: &str) -> Message {
    match try_decode(line) {
        Ok(msg) => msg,
        Err(e) => Message::Malformed {
            line: line.to_string(),
            reason: e.to_string(),
        },
    }
}

/// Decodes one line, reporting why it could not be parsed.
///
/// A trailing `\r` (from a CRLF terminator) and whitespace around the
/// header and each field are ignored.
pub fn try_decode(line: &str) -> Result<Message, ProtocolError> {
    let line = line.trim();

    // Longest header first, so `join_ack:` never parses as `join:`.
    let (head, body) = header::ALL
        .iter()
        .find_map(|h| line.strip_prefix(h).map(|body| (*h, body)))
        .ok_or_else(|| ProtocolError::UnknownHeader(line.to_string()))?;

    let fields = parse_fields(body)?;

    match head {
        header::JOIN => {
            expect_arity(head, "0", &fields, fields.is_empty())?;
            Ok(Message::Join)
        }
        header::QUIT => {
            expect_arity(head, "0", &fields, fields.is_empty())?;
            Ok(Message::Quit)
        }
        header::FILL | header::FILL_ACK => {
            expect_arity(head, "3", &fields, fields.len() == 3)?;
            let (x, y, value) = (fields[0], fields[1], fields[2]);
            Ok(if head == header::FILL {
                Message::Fill { x, y, value }
            } else {
                Message::FillAck { x, y, value }
            })
        }
        header::NEW_ACK => {
            expect_arity(head, "1", &fields, fields.len() == 1)?;
            Ok(Message::NewGameAck {
                accepted: parse_flag(fields[0], 0)?,
            })
        }
        header::JOIN_ACK => {
            expect_arity(head, "at least 1", &fields, !fields.is_empty())?;
            if parse_flag(fields[0], 0)? {
                expect_arity(
                    head,
                    "accept, size, and squares",
                    &fields,
                    fields.len() >= 2,
                )?;
                let board = parse_board(head, fields[1], &fields[2..], 2)?;
                Ok(Message::join_accepted(board))
            } else {
                expect_arity(head, "1 when declined", &fields, fields.len() == 1)?;
                Ok(Message::join_declined())
            }
        }
        header::NEW => {
            expect_arity(head, "size and squares", &fields, !fields.is_empty())?;
            let board = parse_board(head, fields[0], &fields[1..], 1)?;
            Ok(Message::NewGame { board })
        }
        // `header::ALL` and the arms above list the same headers.
        other => Err(ProtocolError::UnknownHeader(other.to_string())),
    }
}

/// Splits a body on `,` and parses every field as `u32`.
///
/// An empty (or all-whitespace) body has zero fields. A non-numeric field
/// is reported with its position instead of panicking.
fn parse_fields(body: &str) -> Result<Vec<u32>, ProtocolError> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    body.split(',')
        .enumerate()
        .map(|(index, token)| {
            let token = token.trim();
            token.parse::<u32>().map_err(|_| ProtocolError::InvalidField {
                index,
                token: token.to_string(),
            })
        })
        .collect()
}

fn expect_arity(
    header: &'static str,
    expected: &'static str,
    fields: &[u32],
    ok: bool,
) -> Result<(), ProtocolError> {
    if ok {
        Ok(())
    } else {
        Err(ProtocolError::Arity {
            header,
            expected,
            actual: fields.len(),
        })
    }
}

fn parse_flag(value: u32, index: usize) -> Result<bool, ProtocolError> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        value => Err(ProtocolError::InvalidFlag { index, value }),
    }
}

/// Builds a peer's board from its size and the flattened `x,y,v,f` groups.
/// `offset` is the body index of the first square field, for error reports.
fn parse_board(
    header: &'static str,
    size: u32,
    rest: &[u32],
    offset: usize,
) -> Result<BoardSnapshot, ProtocolError> {
    if rest.len() % 4 != 0 {
        return Err(ProtocolError::Arity {
            header,
            expected: "size followed by groups of 4",
            actual: rest.len() + offset,
        });
    }

    let squares = rest
        .chunks_exact(4)
        .enumerate()
        .map(|(i, group)| {
            Ok(Square {
                x: group[0],
                y: group[1],
                value: group[2],
                fixed: parse_flag(group[3], offset + i * 4 + 3)?,
            })
        })
        .collect::<Result<Vec<_>, ProtocolError>>()?;

    BoardSnapshot::from_peer(size, squares)
}

// =========================================================================
// Tests
// =========================================================================
