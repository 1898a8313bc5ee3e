//! Tokenizer for `{name!conversion:spec}` format templates.
//!
//! Doubled braces are literal, `[...]` in a field name hides separators,
//! and a spec may nest one level of braces. Parsing is lazy: the iterator
//! yields one [`Segment`] per literal/field pair and stops at the first
//! syntax error.

use std::iter::Peekable;
use std::str::CharIndices;

use crate::error::TemplateSyntaxError;

/// Conversion flag of a replacement field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Conversion {
    /// No `!` suffix.
    #[default]
    None,
    /// `!s`
    Str,
    /// `!r`
    Repr,
}

impl Conversion {
    /// The flag as it appears in a derived key (`""`, `"s"`, `"r"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "",
            Self::Str => "s",
            Self::Repr => "r",
        }
    }

    fn from_char(c: char) -> Result<Self, TemplateSyntaxError> {
        match c {
            's' => Ok(Self::Str),
            'r' => Ok(Self::Repr),
            other => Err(TemplateSyntaxError::UnknownConversion(other)),
        }
    }
}

/// One replacement field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRef {
    /// Dotted path, possibly ending in `()`.
    pub name: String,
    pub conversion: Conversion,
    /// Raw spec text after `:`, empty if absent.
    pub spec: String,
}

impl FieldRef {
    /// Does the name end in `()`, asking for the value to be called?
    pub fn wants_call(&self) -> bool {
        self.name.ends_with("()")
    }

    /// The name with any trailing `()` removed.
    pub fn path(&self) -> &str {
        self.name.strip_suffix("()").unwrap_or(&self.name)
    }
}

/// Literal text followed by an optional field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub literal: String,
    pub field: Option<FieldRef>,
}

/// Lazy parser over a template. Create a fresh one per pass.
pub struct TemplateParser<'a> {
    chars: Peekable<CharIndices<'a>>,
    done: bool,
}

/// Parse `template` into its segments.
pub fn parse_template(template: &str) -> TemplateParser<'_> {
    TemplateParser {
        chars: template.char_indices().peekable(),
        done: false,
    }
}

impl TemplateParser<'_> {
    fn fail(&mut self, err: TemplateSyntaxError) -> Option<Result<Segment, TemplateSyntaxError>> {
        self.done = true;
        Some(Err(err))
    }

    /// Read a field body; the opening `{` has been consumed.
    fn field(&mut self) -> Result<FieldRef, TemplateSyntaxError> {
        let mut name = String::new();
        let mut in_index = false;
        let mut terminator = loop {
            let Some((_, c)) = self.chars.next() else {
                return Err(if in_index {
                    TemplateSyntaxError::UnterminatedIndex
                } else {
                    TemplateSyntaxError::Unterminated
                });
            };
            match c {
                '[' if !in_index => {
                    in_index = true;
                    name.push(c);
                }
                ']' if in_index => {
                    in_index = false;
                    name.push(c);
                }
                '!' | ':' | '}' if !in_index => break c,
                '{' if !in_index => return Err(TemplateSyntaxError::UnexpectedBrace),
                c => name.push(c),
            }
        };

        let mut conversion = Conversion::None;
        if terminator == '!' {
            let Some((_, c)) = self.chars.next() else {
                return Err(TemplateSyntaxError::Unterminated);
            };
            if c == ':' || c == '}' {
                return Err(TemplateSyntaxError::ConversionNotTerminated);
            }
            conversion = Conversion::from_char(c)?;
            terminator = match self.chars.next() {
                Some((_, t @ (':' | '}'))) => t,
                Some(_) => return Err(TemplateSyntaxError::ConversionNotTerminated),
                None => return Err(TemplateSyntaxError::Unterminated),
            };
        }

        let mut spec = String::new();
        if terminator == ':' {
            let mut depth = 1usize;
            loop {
                let Some((_, c)) = self.chars.next() else {
                    return Err(TemplateSyntaxError::Unterminated);
                };
                match c {
                    '{' => depth += 1,
                    '}' => {
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                    }
                    _ => {}
                }
                spec.push(c);
            }
        }

        Ok(FieldRef {
            name,
            conversion,
            spec,
        })
    }
}

impl Iterator for TemplateParser<'_> {
    type Item = Result<Segment, TemplateSyntaxError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut literal = String::new();
        while let Some((_, c)) = self.chars.next() {
            match c {
                '{' => {
                    if matches!(self.chars.peek(), Some((_, '{'))) {
                        self.chars.next();
                        literal.push('{');
                        continue;
                    }
                    return match self.field() {
                        Ok(field) => Some(Ok(Segment {
                            literal,
                            field: Some(field),
                        })),
                        Err(err) => self.fail(err),
                    };
                }
                '}' => {
                    if matches!(self.chars.peek(), Some((_, '}'))) {
                        self.chars.next();
                        literal.push('}');
                        continue;
                    }
                    return self.fail(TemplateSyntaxError::UnmatchedClose);
                }
                c => literal.push(c),
            }
        }
        self.done = true;
        if literal.is_empty() {
            None
        } else {
            Some(Ok(Segment {
                literal,
                field: None,
            }))
        }
    }
}

/// Collect every field of a template, failing on the first syntax error.
pub fn template_fields(template: &str) -> Result<Vec<FieldRef>, TemplateSyntaxError> {
    parse_template(template)
        .filter_map(|seg| seg.map(|s| s.field).transpose())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(t: &str) -> Vec<Segment> {
        parse_template(t).collect::<Result<_, _>>().unwrap()
    }

    fn field(name: &str, conversion: Conversion, spec: &str) -> Option<FieldRef> {
        Some(FieldRef {
            name: name.into(),
            conversion,
            spec: spec.into(),
        })
    }

    #[test]
    fn test_empty_template() {
        assert!(parse("").is_empty());
    }

    #[test]
    fn test_literal_only() {
        assert_eq!(
            parse("simple message"),
            vec![Segment {
                literal: "simple message".into(),
                field: None
            }]
        );
    }

    #[test]
    fn test_fields_and_trailing_literal() {
        let segs = parse("a{x}b{y!r:>5}c");
        assert_eq!(segs.len(), 3);
        assert_eq!(segs[0].literal, "a");
        assert_eq!(segs[0].field, field("x", Conversion::None, ""));
        assert_eq!(segs[1].literal, "b");
        assert_eq!(segs[1].field, field("y", Conversion::Repr, ">5"));
        assert_eq!(segs[2].literal, "c");
        assert_eq!(segs[2].field, None);
    }

    #[test]
    fn test_escaped_braces() {
        let segs = parse("{{literal}} {x}");
        assert_eq!(segs[0].literal, "{literal} ");
        assert_eq!(segs[0].field, field("x", Conversion::None, ""));
    }

    #[test]
    fn test_spec_may_contain_separators() {
        assert_eq!(parse("{foo::}")[0].field, field("foo", Conversion::None, ":"));
        assert_eq!(parse("{foo:!}")[0].field, field("foo", Conversion::None, "!"));
        assert_eq!(parse("{foo!s::}")[0].field, field("foo", Conversion::Str, ":"));
        assert_eq!(
            parse("{foo:{bar}}")[0].field,
            field("foo", Conversion::None, "{bar}")
        );
    }

    #[test]
    fn test_empty_name_is_legal() {
        assert_eq!(parse("{}")[0].field, field("", Conversion::None, ""));
    }

    #[test]
    fn test_index_brackets_hide_separators() {
        assert_eq!(
            parse("{a[x:y]}")[0].field,
            field("a[x:y]", Conversion::None, "")
        );
    }

    #[test]
    fn test_call_suffix() {
        let f = parse("{obj.method()}")[0].field.clone().unwrap();
        assert!(f.wants_call());
        assert_eq!(f.path(), "obj.method");
    }

    #[test]
    fn test_syntax_errors() {
        let err = |t: &str| parse_template(t).find_map(Result::err).unwrap();
        assert_eq!(err("oops }"), TemplateSyntaxError::UnmatchedClose);
        assert_eq!(err("{oops"), TemplateSyntaxError::Unterminated);
        assert_eq!(err("{x!q}"), TemplateSyntaxError::UnknownConversion('q'));
        assert_eq!(err("{x!sq}"), TemplateSyntaxError::ConversionNotTerminated);
        assert_eq!(err("{x:>5"), TemplateSyntaxError::Unterminated);
        assert_eq!(err("{a[0}"), TemplateSyntaxError::UnterminatedIndex);
        assert_eq!(err("{a{b}}"), TemplateSyntaxError::UnexpectedBrace);
    }

    #[test]
    fn test_parser_stops_after_error() {
        let mut parser = parse_template("} {x}");
        assert!(parser.next().unwrap().is_err());
        assert!(parser.next().is_none());
    }

    #[test]
    fn test_template_fields() {
        let fields = template_fields("{a} and {b!r} {{c}}").unwrap();
        let names: Vec<_> = fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(template_fields("{").is_err());
    }
}
