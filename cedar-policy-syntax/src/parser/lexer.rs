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

//! Converts policy text into significant tokens plus trivia.

use std::sync::Arc;

use logos::Logos;
use serde::Serialize;

use super::err::{LexError, LexErrorKind};
use super::loc::Loc;
use super::token::{Token, TokenKind, Trivia, TriviaKind};

/// Identifiers after which a `-` starts a negative literal rather than a
/// subtraction, because they cannot end an operand. Used as field names
/// they end an operand like any other identifier.
const OPERATOR_KEYWORDS: [&str; 7] = ["if", "then", "else", "in", "has", "like", "is"];

/// Output of the lexer: the tokens the grammar sees, and the trivia it skips
#[derive(Debug, Clone, Serialize)]
pub struct Lexed<'src> {
    /// Source text the spans index into
    #[serde(skip)]
    pub src: &'src str,
    /// Significant tokens, in source order
    pub tokens: Vec<Token<'src>>,
    /// Whitespace and comments, in source order
    pub trivia: Vec<Trivia>,
}

impl<'src> Lexed<'src> {
    /// Comments, in source order
    pub fn comments(&self) -> impl Iterator<Item = &'src str> + '_ {
        self.trivia
            .iter()
            .filter(|t| t.kind == TriviaKind::Comment)
            .filter_map(|t| self.src.get(t.span.clone()))
    }
}

/// Tracks whether the last significant token can end an operand, which
/// decides if a following `-` starts a negative literal
#[derive(Debug, Default)]
struct OperandTracker {
    /// the last token can end an operand
    ends_operand: bool,
    /// the last token is `.` or the `has` operator, so the next identifier is
    /// a field name even if it is spelled like a keyword
    before_field: bool,
}

impl OperandTracker {
    fn push<'src>(&mut self, tokens: &mut Vec<Token<'src>>, token: Token<'src>) {
        let is_operator_keyword =
            token.kind == TokenKind::Ident && OPERATOR_KEYWORDS.contains(&token.text);
        let ends_operand = if is_operator_keyword {
            self.before_field
        } else {
            token.kind.ends_operand()
        };
        self.before_field =
            token.kind == TokenKind::Dot || (token.is_keyword("has") && !ends_operand);
        self.ends_operand = ends_operand;
        tokens.push(token);
    }
}

/// Tokenize `text`. Stops at the first character that starts no token.
pub fn tokenize(text: &str) -> Result<Lexed<'_>, LexError> {
    let mut tokens: Vec<Token<'_>> = Vec::new();
    let mut trivia = Vec::new();
    // set when a `-` directly follows something that cannot end an operand
    let mut pending_dash: Option<Token<'_>> = None;
    let mut tracker = OperandTracker::default();

    for (kind, span) in TokenKind::lexer(text).spanned() {
        let kind = match kind {
            Ok(kind) => kind,
            Err(()) => {
                let rest = text.get(span.start..).unwrap_or_default();
                let kind = match rest.chars().next() {
                    Some('"') => LexErrorKind::UnterminatedString,
                    Some(c) => LexErrorKind::UnrecognizedCharacter(c),
                    None => LexErrorKind::UnterminatedString,
                };
                let len = rest.chars().next().map_or(0, char::len_utf8);
                return Err(LexError::new(
                    kind,
                    Loc::new((span.start, len), Arc::from(text)),
                ));
            }
        };

        if kind.is_trivia() {
            if let Some(dash) = pending_dash.take() {
                tracker.push(&mut tokens, dash);
            }
            trivia.push(Trivia {
                kind: if kind == TokenKind::Comment {
                    TriviaKind::Comment
                } else {
                    TriviaKind::Whitespace
                },
                span,
            });
            continue;
        }

        let token_text = text.get(span.clone()).unwrap_or_default();
        match (pending_dash.take(), kind) {
            (Some(dash), TokenKind::Int) => {
                let merged = dash.span.start..span.end;
                tracker.push(
                    &mut tokens,
                    Token {
                        kind: TokenKind::Int,
                        text: text.get(merged.clone()).unwrap_or_default(),
                        span: merged,
                    },
                );
            }
            (dash, _) => {
                if let Some(dash) = dash {
                    tracker.push(&mut tokens, dash);
                }
                let token = Token {
                    kind,
                    span,
                    text: token_text,
                };
                if kind == TokenKind::Dash && !tracker.ends_operand {
                    pending_dash = Some(token);
                } else {
                    tracker.push(&mut tokens, token);
                }
            }
        }
    }
    tokens.extend(pending_dash);

    tracing::trace!(
        tokens = tokens.len(),
        trivia = trivia.len(),
        "tokenized Cedar source"
    );
    Ok(Lexed {
        src: text,
        tokens,
        trivia,
    })
}
