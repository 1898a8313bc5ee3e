//! Format templates: parsing, key derivation, and spec formatting.
//!
//! - [`parser`]: lazy tokenizer yielding literal/field segments
//! - [`key`]: per-pass capture-slot key derivation
//! - [`spec`]: the format-spec mini-language

pub mod key;
pub mod parser;
pub mod spec;

pub use key::{base_key, KeyFlattener};
pub use parser::{parse_template, template_fields, Conversion, FieldRef, Segment, TemplateParser};
pub use spec::{format_text, format_value, FormatSpec};
