/*!
The object layer of rime.

This crate provides an owned model of PDF objects together with the pieces
that work directly on it:

- [`parse_object`] and [`parse_indirect`] read PDF object syntax.
- [`XRef`] stores indirect objects and resolves references.
- [`object::PdfString`] decodes hex and literal strings, optionally decrypting them.
- [`NameTree`] looks up keys in name trees.
- [`crypto`] implements the standard security handler.
- [`filter`] decodes the non-image stream filters.
- [`content::Tokenizer`] splits content streams into instructions.

Reading complete files, including cross-reference tables, is out of scope.

# Example
```
use rime_syntax::object::PdfString;
use rime_syntax::parse_object;

let string = parse_object(b"<FEFF00680069>").unwrap();
let string = string.cast::<PdfString>().unwrap();

assert_eq!(string.literal_string(), "hi");
```
*/

#![forbid(unsafe_code)]

pub mod content;
pub mod crypto;
pub mod error;
pub mod filter;
pub mod name_tree;
pub mod object;
mod parse;
pub mod reader;
pub mod xref;

pub use crypto::{SecurityManager, SecurityProvider};
pub use error::{Error, Result};
pub use name_tree::{NameNode, NameTree, NameTreeKind, NameValue};
pub use parse::{parse_indirect, parse_object};
pub use xref::XRef;
