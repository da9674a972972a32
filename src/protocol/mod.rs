//! Protocol Module
//!
//! Defines the wire protocol spoken with the key-value server.
//!
//! ## Protocol Format (text, CRLF-delimited)
//!
//! ### Request Format
//! ```text
//! <verb> <key>\r\n
//! [duration: <secs>\r\n]
//! [transfer-encoding: chunked\r\n]
//! \r\n
//! <body>\r\n
//! ```
//!
//! ### Commands
//! - set: header block as above, then the value as the body
//! - get: header line followed directly by the blank line, no body
//!
//! Values larger than 4096 bytes are chunk-framed: `<size>\r\n<bytes>\r\n`
//! records in order, terminated by `0\r\n\r\n`, with sizes in decimal.
//!
//! ### Response Format
//! ```text
//! <OK|Err>\r\n
//! <payload line>\r\n
//! ...
//! \r\n
//! ```
//!
//! An `OK` reply to a get carries a leading blank payload line before the
//! value; an empty value means the key is absent or expired. An `OK` reply
//! to a set carries the server's confirmation message as its first payload
//! line. `Err` may carry a detail line. The server may chunk-frame large
//! get payloads using the same records as requests.

mod command;
mod response;
mod codec;

pub use command::{Command, Verb};
pub use response::{Response, Status};
pub use codec::{encode_command, ResponseDecoder};
pub use codec::{CHUNK_SIZE, MAX_LINE_SIZE, MAX_PAYLOAD_SIZE};
