/*
 * Copyright Cedar Contributors
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *      https://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

use std::fmt::{self, Display};
use std::iter;

use itertools::Itertools;
use miette::Diagnostic;
use nonempty::NonEmpty;
use smol_str::SmolStr;
use thiserror::Error;

use super::loc::{Loc, Position};
use super::token::{Token, TokenKind};

/// For errors during parsing
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum ParseError {
    /// Error from the lexer
    #[error(transparent)]
    #[diagnostic(transparent)]
    Lex(#[from] LexError),
    /// Error building the syntax tree from the token stream
    #[error(transparent)]
    #[diagnostic(transparent)]
    ToCST(#[from] ToCSTError),
}

impl ParseError {
    /// Where the error was detected
    pub fn position(&self) -> Position {
        match self {
            Self::Lex(e) => e.position,
            Self::ToCST(e) => e.position,
        }
    }

    /// Source location of the offending text
    pub fn loc(&self) -> &Loc {
        match self {
            Self::Lex(e) => &e.loc,
            Self::ToCST(e) => &e.loc,
        }
    }
}

/// The reason the lexer gave up
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexErrorKind {
    /// A character that starts no Cedar token
    #[error("unrecognized character `{0}`")]
    UnrecognizedCharacter(char),
    /// A `"` with no closing `"` before the end of the line
    #[error("unterminated string literal")]
    UnterminatedString,
}

/// Error raised while tokenizing. The lexer stops at the first one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}")]
pub struct LexError {
    kind: LexErrorKind,
    position: Position,
    loc: Loc,
}

impl LexError {
    pub(crate) fn new(kind: LexErrorKind, loc: Loc) -> Self {
        Self {
            kind,
            position: loc.position(),
            loc,
        }
    }

    /// What went wrong
    pub fn kind(&self) -> &LexErrorKind {
        &self.kind
    }

    /// Byte offset of the first offending byte
    pub fn offset(&self) -> usize {
        self.position.offset
    }

    /// Line and column of the first offending byte
    pub fn position(&self) -> Position {
        self.position
    }

    /// Source location of the offending text
    pub fn loc(&self) -> &Loc {
        &self.loc
    }
}

impl Diagnostic for LexError {
    impl_diagnostic_from_source_loc_field!(loc);

    fn help<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        match self.kind {
            LexErrorKind::UnterminatedString => Some(Box::new(
                "string literals must be closed with `\"` on the line they start on",
            )),
            LexErrorKind::UnrecognizedCharacter(_) => None,
        }
    }
}

/// What the parser ran into where it wanted something else
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Found {
    /// A token, with its kind and raw text
    Token {
        /// Kind of the token
        kind: TokenKind,
        /// Raw source text of the token
        text: SmolStr,
    },
    /// The token stream ran out
    EndOfInput,
}

impl From<&Token<'_>> for Found {
    fn from(token: &Token<'_>) -> Self {
        Self::Token {
            kind: token.kind,
            text: token.text.into(),
        }
    }
}

impl Display for Found {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Token { text, .. } => write!(f, "token `{text}`"),
            Self::EndOfInput => write!(f, "end of input"),
        }
    }
}

/// Different kinds of syntax errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToCSTErrorKind {
    /// The token found cannot appear here
    UnexpectedToken,
    /// An integer literal that does not fit in a 64-bit signed integer
    IntegerOverflow,
    /// Expressions nested deeper than the available stack allows
    RecursionLimit,
}

/// Syntax error: the token stream does not match the grammar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToCSTError {
    kind: ToCSTErrorKind,
    position: Position,
    expected: Vec<SmolStr>,
    found: Found,
    loc: Loc,
}

impl ToCSTError {
    pub(crate) fn new(
        kind: ToCSTErrorKind,
        expected: Vec<SmolStr>,
        found: Found,
        loc: Loc,
    ) -> Self {
        Self {
            kind,
            position: loc.position(),
            expected,
            found,
            loc,
        }
    }

    /// What kind of syntax error this is
    pub fn kind(&self) -> ToCSTErrorKind {
        self.kind
    }

    /// Byte offset, line and column of the offending token
    pub fn position(&self) -> Position {
        self.position
    }

    /// Descriptions of the token classes that would have been accepted
    pub fn expected(&self) -> &[SmolStr] {
        &self.expected
    }

    /// The token actually found
    pub fn found(&self) -> &Found {
        &self.found
    }

    /// Source location of the offending token
    pub fn loc(&self) -> &Loc {
        &self.loc
    }
}

impl Display for ToCSTError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ToCSTErrorKind::UnexpectedToken => {
                write!(f, "unexpected {}", self.found)?;
                match self.expected.as_slice() {
                    [] => Ok(()),
                    [one] => write!(f, ", expected {one}"),
                    many => write!(f, ", expected one of: {}", many.iter().join(", ")),
                }
            }
            ToCSTErrorKind::IntegerOverflow => {
                write!(f, "integer literal {} is out of range", self.found)
            }
            ToCSTErrorKind::RecursionLimit => {
                write!(f, "expression nested too deeply at {}", self.found)
            }
        }
    }
}

impl std::error::Error for ToCSTError {}

impl Diagnostic for ToCSTError {
    impl_diagnostic_from_source_loc_field!(loc);

    fn help<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        match self.kind {
            ToCSTErrorKind::IntegerOverflow => Some(Box::new(format!(
                "integer literals must be between {} and {}",
                i64::MIN,
                i64::MAX
            ))),
            ToCSTErrorKind::UnexpectedToken | ToCSTErrorKind::RecursionLimit => None,
        }
    }
}

/// One or more [`ParseError`]s. `Display` shows the first; the rest are
/// reported as related diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", .0.first())]
pub struct ParseErrors(NonEmpty<ParseError>);

impl ParseErrors {
    /// Construct a `ParseErrors` with at least one element
    pub fn new(first: ParseError, rest: impl IntoIterator<Item = ParseError>) -> Self {
        let mut nv = NonEmpty::singleton(first);
        nv.extend(rest);
        Self(nv)
    }

    /// Construct a `ParseErrors` from an iterator, or `None` if it is empty
    pub fn from_iter(i: impl IntoIterator<Item = ParseError>) -> Option<Self> {
        NonEmpty::collect(i).map(Self)
    }

    /// The first error encountered
    pub fn first(&self) -> &ParseError {
        self.0.first()
    }

    /// Iterate over the errors in the order they were encountered
    pub fn iter(&self) -> impl Iterator<Item = &ParseError> {
        self.0.iter()
    }

    /// Number of errors
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`, there is at least one error
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Append errors
    pub fn extend(&mut self, other: impl IntoIterator<Item = ParseError>) {
        self.0.extend(other);
    }
}

impl From<ParseError> for ParseErrors {
    fn from(err: ParseError) -> Self {
        Self::new(err, iter::empty())
    }
}

impl From<LexError> for ParseErrors {
    fn from(err: LexError) -> Self {
        ParseError::from(err).into()
    }
}

impl From<ToCSTError> for ParseErrors {
    fn from(err: ToCSTError) -> Self {
        ParseError::from(err).into()
    }
}

impl IntoIterator for ParseErrors {
    type Item = ParseError;
    type IntoIter = iter::Chain<iter::Once<ParseError>, std::vec::IntoIter<ParseError>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ParseErrors {
    type Item = &'a ParseError;
    type IntoIter = iter::Chain<iter::Once<Self::Item>, std::slice::Iter<'a, ParseError>>;

    fn into_iter(self) -> Self::IntoIter {
        iter::once(&self.0.head).chain(self.0.tail.iter())
    }
}

// Report the first error; the rest show up as related diagnostics
impl Diagnostic for ParseErrors {
    fn related(&self) -> Option<Box<dyn Iterator<Item = &dyn Diagnostic> + '_>> {
        let mut errs = self.iter().map(|err| err as &dyn Diagnostic);
        let first_err = errs.next()?;
        match first_err.related() {
            Some(first_err_related) => Some(Box::new(first_err_related.chain(errs))),
            None => Some(Box::new(errs)),
        }
    }

    fn code<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        self.first().code()
    }

    fn severity(&self) -> Option<miette::Severity> {
        self.first().severity()
    }

    fn help<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        self.first().help()
    }

    fn url<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        self.first().url()
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        self.first().source_code()
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = miette::LabeledSpan> + '_>> {
        self.first().labels()
    }

    fn diagnostic_source(&self) -> Option<&dyn Diagnostic> {
        self.first().diagnostic_source()
    }
}
