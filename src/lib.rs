#![warn(missing_docs)]
#![forbid(unsafe_code)]
//! Rule-driven JSON binding.
//!
//! Instead of hand-writing per-field parsing code, describe where things
//! live in the document with a set of [`Rule`]s and let the engine build
//! the object graph:
//!
//! ```
//! use json_bind::{Rule, RuleSet, bindable};
//!
//! bindable! {
//!     #[derive(Debug, Default, PartialEq)]
//!     pub struct Example {
//!         pub client: String,
//!         pub people: Vec<Person>,
//!     }
//!
//!     #[derive(Debug, Default, PartialEq)]
//!     pub struct Person {
//!         pub first_name: String,
//!         pub age: Option<u32>,
//!     }
//! }
//!
//! let rules = RuleSet::new([
//!     Rule::bind_type::<Example>("")?,
//!     Rule::bind_field::<Example>("client", "client")?,
//!     Rule::bind_type_into::<Person>("people[]", "people")?,
//!     Rule::bind_field::<Person>("people[].firstName", "first_name")?,
//!     Rule::bind_field::<Person>("people[].age", "age")?,
//! ])?;
//!
//! let example: Example = json_bind::from_str(
//!     r#"{"client":"Acme","people":[{"firstName":"Jo","age":30}]}"#,
//!     &rules,
//! )?;
//! assert_eq!(example.client, "Acme");
//! assert_eq!(example.people[0].first_name, "Jo");
//! assert_eq!(example.people[0].age, Some(30));
//! # Ok::<(), json_bind::BindError>(())
//! ```
//!
//! A path is a dotted list of keys; `[]` stands for every element of an
//! array. The empty path is the document root. Content no rule reaches is
//! skipped.

extern crate alloc;

mod deserialize;
mod error;
mod options;
mod path;
mod reflect;
mod rule;
mod serialize;
mod span;
mod tokenizer;
mod value;

pub use deserialize::{Deserializer, deserialize, from_slice, from_str};
pub use error::{BindError, BindErrorKind, Result};
pub use options::{DEFAULT_MAX_DEPTH, DuplicatePolicy, Options};
pub use path::{Path, PathError, Segment};
pub use reflect::{
    Bind, Container, Element, Field, FieldShape, Instance, Kind, Mismatch, Repr, Shape, Slot,
    construct,
};
pub use rule::{Rule, RuleKind, RuleSet, Target};
pub use serialize::{serialize, to_string, to_string_pretty, to_writer, to_writer_pretty};
pub use span::{Pos, Position, Span, Spanned};
pub use value::{Members, Number, Value, parse};

#[doc(hidden)]
pub mod __private {
    pub use alloc::boxed::Box;
}

/// A byte sink for JSON output.
pub trait JsonWrite {
    /// Append `buf` to the output.
    fn write(&mut self, buf: &[u8]);

    /// Hint that `additional` more bytes are coming.
    fn reserve(&mut self, additional: usize);
}

impl JsonWrite for alloc::vec::Vec<u8> {
    fn write(&mut self, buf: &[u8]) {
        self.extend_from_slice(buf);
    }

    fn reserve(&mut self, additional: usize) {
        alloc::vec::Vec::reserve(self, additional);
    }
}

impl JsonWrite for &mut alloc::vec::Vec<u8> {
    fn write(&mut self, buf: &[u8]) {
        self.extend_from_slice(buf);
    }

    fn reserve(&mut self, additional: usize) {
        alloc::vec::Vec::reserve(self, additional);
    }
}

/// Write `s` as a quoted JSON string.
pub fn write_json_string<W: JsonWrite>(writer: &mut W, s: &str) {
    writer.reserve(s.len() + 2);
    writer.write(b"\"");

    let bytes = s.as_bytes();
    let mut start = 0;
    for (i, c) in s.char_indices() {
        if needs_escape(c) {
            writer.write(&bytes[start..i]);
            write_json_escaped_char(writer, c);
            start = i + c.len_utf8();
        }
    }
    writer.write(&bytes[start..]);

    writer.write(b"\"");
}

fn needs_escape(c: char) -> bool {
    matches!(c, '"' | '\\') || (c as u32) < 0x20
}

/// Write `c` for use inside a JSON string, escaping it if required.
pub fn write_json_escaped_char<W: JsonWrite>(writer: &mut W, c: char) {
    match c {
        '"' => writer.write(b"\\\""),
        '\\' => writer.write(b"\\\\"),
        '\n' => writer.write(b"\\n"),
        '\r' => writer.write(b"\\r"),
        '\t' => writer.write(b"\\t"),
        '\u{08}' => writer.write(b"\\b"),
        '\u{0C}' => writer.write(b"\\f"),
        c if (c as u32) < 0x20 => {
            const HEX: &[u8; 16] = b"0123456789abcdef";
            let n = c as usize;
            writer.write(&[b'\\', b'u', b'0', b'0', HEX[n >> 4], HEX[n & 0xf]]);
        }
        c => {
            let mut buf = [0; 4];
            writer.write(c.encode_utf8(&mut buf).as_bytes());
        }
    }
}
