/*
 * Copyright 2022-2023 Amazon.com, Inc. or its affiliates. All Rights Reserved.
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

use logos::{Logos, Span};
use serde::Serialize;
use std::fmt::{self, Display};

/// Cedar token kinds.
///
/// Keywords are not distinguished here: `permit`, `when`, `principal`, `in`
/// and friends all lex as [`TokenKind::Ident`] and are reclassified by the
/// parser depending on where they appear.
#[allow(missing_docs)] // variants are named after the text they match
#[derive(Logos, Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum TokenKind {
    #[regex(r"\s+")]
    Whitespace,

    #[regex(r"//[^\n\r]*")]
    Comment,

    #[regex(r"[_a-zA-Z][_a-zA-Z0-9]*")]
    Ident,

    /// Digits, optionally preceded by `-` (see [`super::lexer::tokenize`])
    #[regex("[0-9]+")]
    Int,

    /// Raw string literal, quotes included
    #[regex(r#""([^"\\\n\r]|\\[^\n\r])*""#)]
    Str,

    /// `?principal`, `?resource`, or any other `?ident`
    #[regex(r"\?[_a-zA-Z][_a-zA-Z0-9]*")]
    Slot,

    #[token("@")]
    At,

    #[token(".")]
    Dot,

    #[token(",")]
    Comma,

    #[token(";")]
    SemiColon,

    #[token(":")]
    Colon,

    #[token("::")]
    DoubleColon,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[token("[")]
    LBracket,

    #[token("]")]
    RBracket,

    #[token("==")]
    Equal,

    #[token("!=")]
    NotEqual,

    #[token("<")]
    Lt,

    #[token("<=")]
    Le,

    #[token(">")]
    Gt,

    #[token(">=")]
    Ge,

    #[token("||")]
    Or,

    #[token("&&")]
    And,

    #[token("+")]
    Add,

    #[token("-")]
    Dash,

    #[token("*")]
    Mul,

    #[token("!")]
    Neg,
}

impl TokenKind {
    /// Whether this kind is trivia, i.e. skipped by the grammar
    pub fn is_trivia(self) -> bool {
        matches!(self, Self::Whitespace | Self::Comment)
    }

    /// Whether a token of this kind can be the last token of an operand.
    /// Keyword identifiers are handled separately by the lexer.
    pub(crate) fn ends_operand(self) -> bool {
        matches!(
            self,
            Self::Ident
                | Self::Int
                | Self::Str
                | Self::Slot
                | Self::RParen
                | Self::RBracket
                | Self::RBrace
        )
    }
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Whitespace => write!(f, "whitespace"),
            Self::Comment => write!(f, "comment"),
            Self::Ident => write!(f, "identifier"),
            Self::Int => write!(f, "integer literal"),
            Self::Str => write!(f, "string literal"),
            Self::Slot => write!(f, "template slot"),
            Self::At => write!(f, "`@`"),
            Self::Dot => write!(f, "`.`"),
            Self::Comma => write!(f, "`,`"),
            Self::SemiColon => write!(f, "`;`"),
            Self::Colon => write!(f, "`:`"),
            Self::DoubleColon => write!(f, "`::`"),
            Self::LParen => write!(f, "`(`"),
            Self::RParen => write!(f, "`)`"),
            Self::LBrace => write!(f, "`{{`"),
            Self::RBrace => write!(f, "`}}`"),
            Self::LBracket => write!(f, "`[`"),
            Self::RBracket => write!(f, "`]`"),
            Self::Equal => write!(f, "`==`"),
            Self::NotEqual => write!(f, "`!=`"),
            Self::Lt => write!(f, "`<`"),
            Self::Le => write!(f, "`<=`"),
            Self::Gt => write!(f, "`>`"),
            Self::Ge => write!(f, "`>=`"),
            Self::Or => write!(f, "`||`"),
            Self::And => write!(f, "`&&`"),
            Self::Add => write!(f, "`+`"),
            Self::Dash => write!(f, "`-`"),
            Self::Mul => write!(f, "`*`"),
            Self::Neg => write!(f, "`!`"),
        }
    }
}

/// A significant (non-trivia) token: its kind, its byte span, and the exact
/// source text it covers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token<'src> {
    /// What kind of token this is
    pub kind: TokenKind,
    /// Byte range in the source
    pub span: Span,
    /// Raw source text of the token
    pub text: &'src str,
}

impl Token<'_> {
    /// Whether this token is the identifier `kw`
    pub fn is_keyword(&self, kw: &str) -> bool {
        self.kind == TokenKind::Ident && self.text == kw
    }
}

impl Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}`", self.text)
    }
}

/// Whitespace or comment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TriviaKind {
    /// A run of whitespace
    Whitespace,
    /// A `//` comment, up to but excluding the line terminator
    Comment,
}

/// A piece of trivia and where it sits in the source
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Trivia {
    /// Whitespace or comment
    pub kind: TriviaKind,
    /// Byte range in the source
    pub span: Span,
}
