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

//! This module contains step two of the parser for the Cedar language.
//! It converts the token stream produced by [`super::lexer`] to a CST.
//!
//! The parser is hand-written recursive descent with one token of lookahead
//! (two at the few places listed in the comments), and precedence climbing
//! for binary operators.

use std::sync::Arc;

use nonempty::NonEmpty;
use smol_str::SmolStr;

use super::cst::{
    ActionConstraint, Annotation, BinaryOp, Condition, ConditionKind, Effect, EntityConstraint,
    EntityOrSlot, EntityRef, Expr, ExprKind, HasField, Ident, Literal, Path, Policies, Policy,
    RecordKey, Scope, Slot, Str, UnaryOp, Var,
};
use super::err::{Found, ParseError, ParseErrors, ToCSTError, ToCSTErrorKind};
use super::lexer::Lexed;
use super::loc::Loc;
use super::node::Node;
use super::token::{Token, TokenKind};
use super::{ErrorMode, ParseConfig};

/// Identifiers that can never be a path segment
const RESERVED_IDENTS: [&str; 9] = [
    "true", "false", "if", "then", "else", "in", "is", "like", "has",
];

/// Stack space, in bytes, that must remain before descending into a nested
/// expression
const REQUIRED_STACK_SPACE: usize = 1024 * 100;

type Result<T> = std::result::Result<T, ToCSTError>;

/// Parse every policy in `lexed`.
///
/// With [`ErrorMode::CollectAll`], a policy that fails to parse is skipped up
/// to and including its terminating `;` (the first one outside brackets) and
/// parsing resumes there; all errors found this way are returned together.
pub fn parse_tokens(
    lexed: &Lexed<'_>,
    config: &ParseConfig,
) -> std::result::Result<Node<Policies>, ParseErrors> {
    let mut parser = Parser::new(lexed);
    let mut policies = Vec::new();
    let mut errs: Vec<ParseError> = Vec::new();
    while !parser.is_at_end() {
        let policy_start = parser.pos;
        match parser.policy() {
            Ok(policy) => policies.push(policy),
            Err(err) => match config.error_mode {
                ErrorMode::FailFast => return Err(err.into()),
                ErrorMode::CollectAll => {
                    tracing::debug!(
                        position = %err.position(),
                        error = %err,
                        "skipping malformed policy"
                    );
                    errs.push(err.into());
                    parser.skip_malformed_policy(policy_start);
                }
            },
        }
    }
    if let Some(errs) = ParseErrors::from_iter(errs) {
        return Err(errs);
    }
    let loc = Loc::new(0..lexed.src.len(), Arc::clone(&parser.src));
    Ok(Node::with_source_loc(Policies(policies), loc))
}

/// Parse exactly one policy from `lexed`
pub fn parse_policy_tokens(lexed: &Lexed<'_>) -> std::result::Result<Node<Policy>, ToCSTError> {
    let mut parser = Parser::new(lexed);
    let policy = parser.policy()?;
    parser.expect_end()?;
    Ok(policy)
}

/// Parse exactly one expression from `lexed`
pub fn parse_expr_tokens(lexed: &Lexed<'_>) -> std::result::Result<Expr, ToCSTError> {
    let mut parser = Parser::new(lexed);
    let expr = parser.expr()?;
    parser.expect_end()?;
    Ok(expr)
}

/// Cursor over the significant tokens of one source text
#[derive(Debug)]
struct Parser<'a, 'src> {
    tokens: &'a [Token<'src>],
    /// index of the next unconsumed token
    pos: usize,
    /// end offset of the last consumed token
    prev_end: usize,
    src: Arc<str>,
}

impl<'a, 'src> Parser<'a, 'src> {
    fn new(lexed: &'a Lexed<'src>) -> Self {
        Self {
            tokens: &lexed.tokens,
            pos: 0,
            prev_end: 0,
            src: Arc::from(lexed.src),
        }
    }

    // ---------------------------------------------------------------------
    // token cursor

    fn peek(&self) -> Option<&'a Token<'src>> {
        self.tokens.get(self.pos)
    }

    fn peek_nth(&self, n: usize) -> Option<&'a Token<'src>> {
        self.tokens.get(self.pos + n)
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(|t| t.kind)
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek_kind() == Some(kind)
    }

    fn at_keyword(&self, kw: &str) -> bool {
        self.peek().is_some_and(|t| t.is_keyword(kw))
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn bump(&mut self) -> Option<&'a Token<'src>> {
        let token = self.tokens.get(self.pos)?;
        self.pos += 1;
        self.prev_end = token.span.end;
        Some(token)
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, kw: &str) -> bool {
        if self.at_keyword(kw) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<&'a Token<'src>> {
        match self.peek() {
            Some(token) if token.kind == kind => {
                self.bump();
                Ok(token)
            }
            _ => Err(self.unexpected([kind.to_string()])),
        }
    }

    fn expect_keyword(&mut self, kw: &str) -> Result<()> {
        if self.eat_keyword(kw) {
            Ok(())
        } else {
            Err(self.unexpected([format!("`{kw}`")]))
        }
    }

    fn expect_end(&self) -> Result<()> {
        if self.is_at_end() {
            Ok(())
        } else {
            Err(self.unexpected(["end of input"]))
        }
    }

    /// Skip the malformed policy that starts at token index `policy_start`:
    /// rewind there, then skip up to and including the first `;` outside any
    /// brackets. A `;` followed by the start of another policy also ends the
    /// skip, so an unclosed bracket cannot swallow the rest of the input.
    fn skip_malformed_policy(&mut self, policy_start: usize) {
        self.pos = policy_start.min(self.pos);
        let mut depth = 0usize;
        while let Some(token) = self.bump() {
            match token.kind {
                TokenKind::LParen | TokenKind::LBrace | TokenKind::LBracket => depth += 1,
                TokenKind::RParen | TokenKind::RBrace | TokenKind::RBracket => {
                    depth = depth.saturating_sub(1);
                }
                TokenKind::SemiColon if depth == 0 || self.at_policy_start() => break,
                _ => {}
            }
        }
    }

    fn at_policy_start(&self) -> bool {
        self.at(TokenKind::At) || self.at_keyword("permit") || self.at_keyword("forbid")
    }

    // ---------------------------------------------------------------------
    // locations and errors

    /// Start offset of the next token, or the end of the source
    fn start(&self) -> usize {
        self.peek().map_or(self.src.len(), |t| t.span.start)
    }

    /// Wrap `node` with a location running from `start` to the end of the
    /// last consumed token
    fn node<T>(&self, node: T, start: usize) -> Node<T> {
        let end = self.prev_end.max(start);
        Node::with_source_loc(node, Loc::new(start..end, Arc::clone(&self.src)))
    }

    fn error_at_current(
        &self,
        kind: ToCSTErrorKind,
        expected: impl IntoIterator<Item = impl Into<SmolStr>>,
    ) -> ToCSTError {
        let (found, span) = match self.peek() {
            Some(token) => (Found::from(token), token.span.clone()),
            None => (Found::EndOfInput, self.src.len()..self.src.len()),
        };
        ToCSTError::new(
            kind,
            expected.into_iter().map(Into::into).collect::<Vec<SmolStr>>(),
            found,
            Loc::new(span, Arc::clone(&self.src)),
        )
    }

    fn unexpected(&self, expected: impl IntoIterator<Item = impl Into<SmolStr>>) -> ToCSTError {
        self.error_at_current(ToCSTErrorKind::UnexpectedToken, expected)
    }

    fn stack_size_check(&self) -> Result<()> {
        #[cfg(not(target_arch = "wasm32"))]
        {
            if stacker::remaining_stack().unwrap_or(0) < REQUIRED_STACK_SPACE {
                return Err(self.error_at_current(
                    ToCSTErrorKind::RecursionLimit,
                    std::iter::empty::<SmolStr>(),
                ));
            }
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // policies

    fn policy(&mut self) -> Result<Node<Policy>> {
        let start = self.start();
        let mut annotations = Vec::new();
        while self.at(TokenKind::At) {
            annotations.push(self.annotation()?);
        }
        let effect = self.effect()?;
        self.expect(TokenKind::LParen)?;
        let scope = self.scope()?;
        self.expect(TokenKind::RParen)?;
        let mut conditions = Vec::new();
        loop {
            if self.at_keyword("when") || self.at_keyword("unless") {
                conditions.push(self.condition()?);
            } else if self.eat(TokenKind::SemiColon) {
                break;
            } else {
                return Err(self.unexpected(["`when`", "`unless`", "`;`"]));
            }
        }
        Ok(self.node(
            Policy {
                annotations,
                effect,
                scope,
                conditions,
            },
            start,
        ))
    }

    fn annotation(&mut self) -> Result<Node<Annotation>> {
        let start = self.start();
        self.expect(TokenKind::At)?;
        let key = self.ident()?;
        self.expect(TokenKind::LParen)?;
        let value = self.str_lit()?;
        self.expect(TokenKind::RParen)?;
        Ok(self.node(Annotation { key, value }, start))
    }

    fn effect(&mut self) -> Result<Node<Effect>> {
        let start = self.start();
        let effect = if self.eat_keyword("permit") {
            Effect::Permit
        } else if self.eat_keyword("forbid") {
            Effect::Forbid
        } else {
            return Err(self.unexpected(["`@`", "`permit`", "`forbid`"]));
        };
        Ok(self.node(effect, start))
    }

    fn scope(&mut self) -> Result<Node<Scope>> {
        let start = self.start();
        let principal = self.entity_constraint("principal", Slot::Principal, TokenKind::Comma)?;
        self.expect(TokenKind::Comma)?;
        let action = self.action_constraint()?;
        self.expect(TokenKind::Comma)?;
        let resource = self.entity_constraint("resource", Slot::Resource, TokenKind::RParen)?;
        Ok(self.node(
            Scope {
                principal,
                action,
                resource,
            },
            start,
        ))
    }

    /// Principal or resource constraint. `follow` is the token that ends the
    /// unconstrained form.
    fn entity_constraint(
        &mut self,
        var: &str,
        slot: Slot,
        follow: TokenKind,
    ) -> Result<Node<EntityConstraint>> {
        let start = self.start();
        self.expect_keyword(var)?;
        let constraint = match self.peek() {
            Some(t) if t.is_keyword("is") => {
                self.bump();
                let entity_type = self.path()?;
                let in_entity = if self.eat_keyword("in") {
                    Some(self.entity_or_slot(slot)?)
                } else {
                    None
                };
                EntityConstraint::IsType {
                    entity_type,
                    in_entity,
                }
            }
            Some(t) if t.kind == TokenKind::Equal => {
                self.bump();
                let (target, loc) = self.entity_or_slot(slot)?.into_inner();
                match target {
                    EntityOrSlot::Entity(e) => {
                        EntityConstraint::EqEntity(Node::with_source_loc(e, loc))
                    }
                    EntityOrSlot::Slot(s) => {
                        EntityConstraint::EqTemplateSlot(Node::with_source_loc(s, loc))
                    }
                }
            }
            Some(t) if t.is_keyword("in") => {
                self.bump();
                let (target, loc) = self.entity_or_slot(slot)?.into_inner();
                match target {
                    EntityOrSlot::Entity(e) => {
                        EntityConstraint::InEntity(Node::with_source_loc(e, loc))
                    }
                    EntityOrSlot::Slot(s) => {
                        EntityConstraint::InTemplateSlot(Node::with_source_loc(s, loc))
                    }
                }
            }
            Some(t) if t.kind == follow => EntityConstraint::Any,
            _ => {
                return Err(self.unexpected([
                    SmolStr::new_static("`is`"),
                    SmolStr::new_static("`==`"),
                    SmolStr::new_static("`in`"),
                    SmolStr::new(follow.to_string()),
                ]))
            }
        };
        Ok(self.node(constraint, start))
    }

    fn action_constraint(&mut self) -> Result<Node<ActionConstraint>> {
        let start = self.start();
        self.expect_keyword("action")?;
        let constraint = match self.peek() {
            Some(t) if t.kind == TokenKind::Equal => {
                self.bump();
                ActionConstraint::EqEntity(self.entity_ref()?)
            }
            Some(t) if t.is_keyword("in") => {
                self.bump();
                if self.at(TokenKind::LBracket) {
                    ActionConstraint::InEntityList(self.entity_list()?)
                } else {
                    ActionConstraint::InEntity(self.entity_ref()?)
                }
            }
            Some(t) if t.kind == TokenKind::Comma => ActionConstraint::Any,
            _ => return Err(self.unexpected(["`==`", "`in`", "`,`"])),
        };
        Ok(self.node(constraint, start))
    }

    /// An entity reference, or the one slot allowed in this position
    fn entity_or_slot(&mut self, slot: Slot) -> Result<Node<EntityOrSlot>> {
        let start = self.start();
        match self.peek() {
            Some(t) if t.kind == TokenKind::Slot => {
                if t.text != slot.as_str() {
                    return Err(self.unexpected([
                        format!("`{}`", slot.as_str()),
                        "entity reference".to_string(),
                    ]));
                }
                self.bump();
                Ok(self.node(EntityOrSlot::Slot(slot), start))
            }
            _ => Ok(self.entity_ref()?.map(EntityOrSlot::Entity)),
        }
    }

    /// `[ Entity (, Entity)* ]`
    fn entity_list(&mut self) -> Result<NonEmpty<Node<EntityRef>>> {
        self.expect(TokenKind::LBracket)?;
        if self.at(TokenKind::RBracket) {
            return Err(self.unexpected(["entity reference"]));
        }
        let mut entities = NonEmpty::new(self.entity_ref()?);
        loop {
            if self.eat(TokenKind::Comma) {
                entities.push(self.entity_ref()?);
            } else if self.eat(TokenKind::RBracket) {
                return Ok(entities);
            } else {
                return Err(self.unexpected(["`,`", "`]`"]));
            }
        }
    }

    fn entity_ref(&mut self) -> Result<Node<EntityRef>> {
        let start = self.start();
        let entity_type = self.path()?;
        self.expect(TokenKind::DoubleColon)?;
        let id = self.str_lit()?;
        Ok(self.node(EntityRef { entity_type, id }, start))
    }

    /// `A::B::C`. Stops before a `::` that is not followed by an identifier,
    /// so `A::B::"id"` leaves `::"id"` for the caller.
    fn path(&mut self) -> Result<Node<Path>> {
        let start = self.start();
        let mut segments = NonEmpty::new(self.path_segment()?);
        while self.at(TokenKind::DoubleColon)
            && self.peek_nth(1).is_some_and(|t| t.kind == TokenKind::Ident)
        {
            self.bump();
            segments.push(self.path_segment()?);
        }
        Ok(self.node(Path { segments }, start))
    }

    fn path_segment(&mut self) -> Result<Ident> {
        match self.peek() {
            Some(t) if t.kind == TokenKind::Ident && !RESERVED_IDENTS.contains(&t.text) => {
                self.ident()
            }
            _ => Err(self.unexpected(["identifier"])),
        }
    }

    /// Any identifier, keywords included
    fn ident(&mut self) -> Result<Ident> {
        let start = self.start();
        let token = self.expect(TokenKind::Ident)?;
        Ok(self.node(SmolStr::new(token.text), start))
    }

    fn str_lit(&mut self) -> Result<Node<Str>> {
        let start = self.start();
        let token = self.expect(TokenKind::Str)?;
        Ok(self.node(Str::new(token.text), start))
    }

    fn int_lit(&mut self) -> Result<i64> {
        match self.peek() {
            Some(t) if t.kind == TokenKind::Int => {
                let value = t.text.parse::<i64>().map_err(|_| {
                    self.error_at_current(
                        ToCSTErrorKind::IntegerOverflow,
                        std::iter::empty::<SmolStr>(),
                    )
                })?;
                self.bump();
                Ok(value)
            }
            _ => Err(self.unexpected(["integer literal"])),
        }
    }

    fn condition(&mut self) -> Result<Node<Condition>> {
        let start = self.start();
        let kind = if self.eat_keyword("when") {
            ConditionKind::When
        } else if self.eat_keyword("unless") {
            ConditionKind::Unless
        } else {
            return Err(self.unexpected(["`when`", "`unless`"]));
        };
        let kind = self.node(kind, start);
        self.expect(TokenKind::LBrace)?;
        let body = self.expr()?;
        self.expect(TokenKind::RBrace)?;
        Ok(self.node(Condition { kind, body }, start))
    }

    // ---------------------------------------------------------------------
    // expressions, loosest first

    fn expr(&mut self) -> Result<Expr> {
        self.stack_size_check()?;
        if !self.at_keyword("if") {
            return self.or();
        }
        let start = self.start();
        self.bump();
        let cond = self.expr()?;
        self.expect_keyword("then")?;
        let then_expr = self.expr()?;
        self.expect_keyword("else")?;
        let else_expr = self.expr()?;
        Ok(self.node(
            ExprKind::IfThenElse {
                cond: Box::new(cond),
                then_expr: Box::new(then_expr),
                else_expr: Box::new(else_expr),
            },
            start,
        ))
    }

    fn binary(&self, op: BinaryOp, left: Expr, right: Expr, start: usize) -> Expr {
        self.node(
            ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            start,
        )
    }

    /// Left-associative fold of `next` separated by operators `op_of` accepts
    fn binary_level(
        &mut self,
        next: fn(&mut Self) -> Result<Expr>,
        op_of: fn(&Token<'_>) -> Option<BinaryOp>,
    ) -> Result<Expr> {
        let start = self.start();
        let mut left = next(self)?;
        while let Some(op) = self.peek().and_then(op_of) {
            self.bump();
            let right = next(self)?;
            left = self.binary(op, left, right, start);
        }
        Ok(left)
    }

    fn or(&mut self) -> Result<Expr> {
        self.binary_level(Self::and, |t| {
            (t.kind == TokenKind::Or).then_some(BinaryOp::Or)
        })
    }

    fn and(&mut self) -> Result<Expr> {
        self.binary_level(Self::relation, |t| {
            (t.kind == TokenKind::And).then_some(BinaryOp::And)
        })
    }

    fn relation(&mut self) -> Result<Expr> {
        self.binary_level(Self::add, |t| match t.kind {
            TokenKind::Lt => Some(BinaryOp::Less),
            TokenKind::Le => Some(BinaryOp::LessEq),
            TokenKind::Gt => Some(BinaryOp::Greater),
            TokenKind::Ge => Some(BinaryOp::GreaterEq),
            TokenKind::Equal => Some(BinaryOp::Eq),
            TokenKind::NotEqual => Some(BinaryOp::NotEq),
            TokenKind::Ident if t.text == "in" => Some(BinaryOp::In),
            _ => None,
        })
    }

    fn add(&mut self) -> Result<Expr> {
        self.binary_level(Self::mult, |t| match t.kind {
            TokenKind::Add => Some(BinaryOp::Add),
            TokenKind::Dash => Some(BinaryOp::Sub),
            _ => None,
        })
    }

    fn mult(&mut self) -> Result<Expr> {
        self.binary_level(Self::unary, |t| {
            (t.kind == TokenKind::Mul).then_some(BinaryOp::Mul)
        })
    }

    fn unary(&mut self) -> Result<Expr> {
        self.stack_size_check()?;
        let op = match self.peek_kind() {
            Some(TokenKind::Neg) => UnaryOp::Not,
            Some(TokenKind::Dash) => UnaryOp::Neg,
            _ => return self.member_test(),
        };
        let start = self.start();
        self.bump();
        let operand = self.unary()?;
        Ok(self.node(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            start,
        ))
    }

    /// `has`, `like` and `is`, applied left to right to a postfix chain
    fn member_test(&mut self) -> Result<Expr> {
        let start = self.start();
        let mut expr = self.postfix()?;
        loop {
            let kind = if self.eat_keyword("has") {
                ExprKind::Has {
                    operand: Box::new(expr),
                    field: self.has_field()?,
                }
            } else if self.eat_keyword("like") {
                ExprKind::Like {
                    operand: Box::new(expr),
                    pattern: self.str_lit()?,
                }
            } else if self.eat_keyword("is") {
                let entity_type = self.path()?;
                let in_expr = if self.eat_keyword("in") {
                    Some(Box::new(self.postfix()?))
                } else {
                    None
                };
                ExprKind::Is {
                    operand: Box::new(expr),
                    entity_type,
                    in_expr,
                }
            } else {
                return Ok(expr);
            };
            expr = self.node(kind, start);
        }
    }

    fn has_field(&mut self) -> Result<Node<HasField>> {
        let start = self.start();
        let field = match self.peek() {
            Some(t) if t.kind == TokenKind::Ident => HasField::Ident(SmolStr::new(t.text)),
            Some(t) if t.kind == TokenKind::Str => HasField::Str(Str::new(t.text)),
            _ => return Err(self.unexpected(["identifier", "string literal"])),
        };
        self.bump();
        Ok(self.node(field, start))
    }

    fn postfix(&mut self) -> Result<Expr> {
        let start = self.start();
        let mut expr = self.primary()?;
        loop {
            let kind = match self.peek_kind() {
                Some(TokenKind::LBracket) => {
                    self.bump();
                    let index = self.expr()?;
                    self.expect(TokenKind::RBracket)?;
                    ExprKind::Index {
                        operand: Box::new(expr),
                        index: Box::new(index),
                    }
                }
                Some(TokenKind::Dot) => {
                    self.bump();
                    let name = self.ident()?;
                    if self.at(TokenKind::LParen) {
                        ExprKind::MethodCall {
                            operand: Box::new(expr),
                            method: name,
                            args: self.args()?,
                        }
                    } else {
                        ExprKind::FieldAccess {
                            operand: Box::new(expr),
                            field: name,
                        }
                    }
                }
                Some(TokenKind::LParen) => ExprKind::Call {
                    callee: Box::new(expr),
                    args: self.args()?,
                },
                _ => return Ok(expr),
            };
            expr = self.node(kind, start);
        }
    }

    /// `( [Expr (, Expr)*] )`
    fn args(&mut self) -> Result<Vec<Expr>> {
        self.expect(TokenKind::LParen)?;
        let mut args = Vec::new();
        if self.eat(TokenKind::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.expr()?);
            if self.eat(TokenKind::Comma) {
                continue;
            }
            if self.eat(TokenKind::RParen) {
                return Ok(args);
            }
            return Err(self.unexpected(["`,`", "`)`"]));
        }
    }

    fn primary(&mut self) -> Result<Expr> {
        let start = self.start();
        let Some(token) = self.peek() else {
            return Err(self.unexpected(["expression"]));
        };
        let kind = match token.kind {
            TokenKind::Int => ExprKind::Int(self.int_lit()?),
            TokenKind::Str => ExprKind::Str(self.str_lit()?.node),
            TokenKind::LParen => {
                self.bump();
                let inner = self.expr()?;
                self.expect(TokenKind::RParen)?;
                ExprKind::Paren(Box::new(inner))
            }
            TokenKind::LBracket => self.bracketed()?,
            TokenKind::LBrace => self.record()?,
            TokenKind::Ident => match token.text {
                "true" | "false" => {
                    self.bump();
                    ExprKind::Bool(token.text == "true")
                }
                "principal" | "action" | "resource" | "context" => {
                    self.bump();
                    ExprKind::Var(match token.text {
                        "principal" => Var::Principal,
                        "action" => Var::Action,
                        "resource" => Var::Resource,
                        _ => Var::Context,
                    })
                }
                // includes `if`: a conditional is only an operand when parenthesized
                text if RESERVED_IDENTS.contains(&text) => {
                    return Err(self.unexpected(["expression"]))
                }
                _ => self.name_or_entity()?,
            },
            _ => return Err(self.unexpected(["expression"])),
        };
        Ok(self.node(kind, start))
    }

    /// A bare path, or `Path::"id"`
    fn name_or_entity(&mut self) -> Result<ExprKind> {
        let entity_type = self.path()?;
        if self.eat(TokenKind::DoubleColon) {
            let id = self.str_lit()?;
            Ok(ExprKind::EntityRef(EntityRef { entity_type, id }))
        } else {
            Ok(ExprKind::Name(entity_type.node))
        }
    }

    /// After `[`, an identifier other than `true`/`false` starts an entity
    /// list; anything else is a set literal. Needs two tokens of lookahead.
    fn bracketed(&mut self) -> Result<ExprKind> {
        match self.peek_nth(1) {
            Some(t) if t.kind == TokenKind::Ident && !matches!(t.text, "true" | "false") => {
                Ok(ExprKind::EntityList(self.entity_list()?))
            }
            _ => {
                self.expect(TokenKind::LBracket)?;
                let mut elements = Vec::new();
                if self.eat(TokenKind::RBracket) {
                    return Ok(ExprKind::Set(elements));
                }
                loop {
                    elements.push(self.literal()?);
                    if self.eat(TokenKind::Comma) {
                        continue;
                    }
                    if self.eat(TokenKind::RBracket) {
                        return Ok(ExprKind::Set(elements));
                    }
                    return Err(self.unexpected(["`,`", "`]`"]));
                }
            }
        }
    }

    fn record(&mut self) -> Result<ExprKind> {
        self.expect(TokenKind::LBrace)?;
        let mut attrs = Vec::new();
        if self.eat(TokenKind::RBrace) {
            return Ok(ExprKind::Record(attrs));
        }
        loop {
            let key = self.record_key()?;
            self.expect(TokenKind::Colon)?;
            let value = self.literal()?;
            attrs.push((key, value));
            if self.eat(TokenKind::Comma) {
                continue;
            }
            if self.eat(TokenKind::RBrace) {
                return Ok(ExprKind::Record(attrs));
            }
            return Err(self.unexpected(["`,`", "`}`"]));
        }
    }

    fn record_key(&mut self) -> Result<Node<RecordKey>> {
        let start = self.start();
        let key = match self.peek() {
            Some(t) if t.kind == TokenKind::Ident => RecordKey::Ident(SmolStr::new(t.text)),
            Some(t) if t.kind == TokenKind::Str => RecordKey::Str(Str::new(t.text)),
            _ => return Err(self.unexpected(["identifier", "string literal"])),
        };
        self.bump();
        Ok(self.node(key, start))
    }

    /// Literal allowed inside set and record literals
    fn literal(&mut self) -> Result<Node<Literal>> {
        let start = self.start();
        let literal = match self.peek() {
            Some(t) if t.is_keyword("true") => Literal::Bool(true),
            Some(t) if t.is_keyword("false") => Literal::Bool(false),
            Some(t) if t.kind == TokenKind::Int => {
                let value = self.int_lit()?;
                return Ok(self.node(Literal::Int(value), start));
            }
            Some(t) if t.kind == TokenKind::Str => Literal::Str(Str::new(t.text)),
            _ => return Err(self.unexpected(["literal"])),
        };
        self.bump();
        Ok(self.node(literal, start))
    }
}

// PANIC SAFETY unit test code
#[allow(clippy::panic)]
// PANIC SAFETY unit test code
#[allow(clippy::indexing_slicing)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_expr, parse_policies, parse_policies_with_config, parse_policy};
    use crate::test_utils::*;
    use cool_asserts::assert_matches;
    use tracing_test::traced_test;

    #[track_caller]
    fn assert_parse_succeeds<T>(
        parse: impl FnOnce(&str) -> std::result::Result<T, ParseErrors>,
        text: &str,
    ) -> T {
        parse(text)
            .unwrap_or_else(|errs| panic!("failed to parse:\n{:?}", miette::Report::new(errs)))
    }

    #[track_caller]
    fn assert_parse_fails<T: std::fmt::Debug>(
        parse: impl FnOnce(&str) -> std::result::Result<T, ParseErrors>,
        text: &str,
    ) -> ParseErrors {
        match parse(text) {
            Ok(node) => {
                panic!("parsing should have failed, but succeeded with:\n{node:?}")
            }
            Err(errs) => errs,
        }
    }

    /// Fully parenthesized rendering, to check tree shape
    fn shape(e: &Expr) -> String {
        let sexp = |parts: Vec<String>| format!("({})", parts.join(" "));
        match &e.node {
            ExprKind::Unary { op, operand } => {
                let op = match op {
                    UnaryOp::Not => "!",
                    UnaryOp::Neg => "-",
                };
                sexp(vec![op.into(), shape(operand)])
            }
            ExprKind::Binary { op, left, right } => {
                sexp(vec![op.as_str().into(), shape(left), shape(right)])
            }
            ExprKind::Index { operand, index } => {
                sexp(vec!["[]".into(), shape(operand), shape(index)])
            }
            ExprKind::Paren(inner) => sexp(vec!["paren".into(), shape(inner)]),
            ExprKind::FieldAccess { operand, field } => {
                sexp(vec![".".into(), shape(operand), field.to_string()])
            }
            ExprKind::Has { operand, field } => {
                sexp(vec!["has".into(), shape(operand), field.to_string()])
            }
            ExprKind::Is {
                operand,
                entity_type,
                in_expr,
            } => {
                let mut parts = vec!["is".into(), shape(operand), entity_type.to_string()];
                parts.extend(in_expr.iter().map(|e| shape(e)));
                sexp(parts)
            }
            ExprKind::Call { callee, args } => {
                let mut parts = vec!["call".into(), shape(callee)];
                parts.extend(args.iter().map(shape));
                sexp(parts)
            }
            ExprKind::Like { operand, pattern } => {
                sexp(vec!["like".into(), shape(operand), pattern.to_string()])
            }
            ExprKind::MethodCall {
                operand,
                method,
                args,
            } => {
                let mut parts = vec![format!(".{method}"), shape(operand)];
                parts.extend(args.iter().map(shape));
                sexp(parts)
            }
            ExprKind::IfThenElse {
                cond,
                then_expr,
                else_expr,
            } => sexp(vec![
                "if".into(),
                shape(cond),
                shape(then_expr),
                shape(else_expr),
            ]),
            _ => e.to_string(),
        }
    }

    #[track_caller]
    fn assert_shape(text: &str, expected: &str) {
        let expr = assert_parse_succeeds(parse_expr, text);
        assert_eq!(shape(&expr), expected, "for {text}");
    }

    #[test]
    fn scenario_unconstrained_permit() {
        let policies = assert_parse_succeeds(parse_policies, "permit(principal, action, resource);");
        assert_eq!(policies.node.len(), 1);
        let policy = &policies.node.0[0].node;
        assert!(policy.annotations.is_empty());
        assert_eq!(policy.effect.node, Effect::Permit);
        assert_eq!(policy.scope.node.principal.node, EntityConstraint::Any);
        assert_eq!(policy.scope.node.action.node, ActionConstraint::Any);
        assert_eq!(policy.scope.node.resource.node, EntityConstraint::Any);
        assert!(policy.conditions.is_empty());
    }

    #[test]
    fn scenario_forbid_with_method_call() {
        let src = r#"forbid(principal == User::"alice", action, resource) when { context.ip.isIpv4() };"#;
        let policy = assert_parse_succeeds(parse_policy, src).node;
        assert_eq!(policy.effect.node, Effect::Forbid);
        assert_matches!(&policy.scope.node.principal.node, EntityConstraint::EqEntity(e) => {
            assert_eq!(
                e.node.entity_type.node.segments.iter().map(|s| s.node.as_str()).collect::<Vec<_>>(),
                vec!["User"]
            );
            assert_eq!(e.node.id.node.contents(), "alice");
            assert_eq!(e.source_text(), Some(r#"User::"alice""#));
        });
        assert_eq!(policy.conditions.len(), 1);
        let cond = &policy.conditions[0].node;
        assert_eq!(cond.kind.node, ConditionKind::When);
        assert_matches!(&cond.body.node, ExprKind::MethodCall { operand, method, args } => {
            assert_eq!(method.node, "isIpv4");
            assert!(args.is_empty());
            assert_matches!(&operand.node, ExprKind::FieldAccess { operand, field } => {
                assert_eq!(field.node, "ip");
                assert_matches!(&operand.node, ExprKind::Var(Var::Context));
            });
        });
        assert_eq!(cond.body.method_name(), Some("isIpv4"));
    }

    #[test]
    fn scenario_template_with_is_in() {
        let src = r#"permit(principal in ?principal, action == Action::"view", resource is Photo in Album::"vacation") unless { 1 > 2 };"#;
        let policy = assert_parse_succeeds(parse_policy, src).node;
        let scope = &policy.scope.node;
        assert_matches!(&scope.principal.node, EntityConstraint::InTemplateSlot(slot) => {
            assert_eq!(slot.node, Slot::Principal);
            assert_eq!(slot.source_text(), Some("?principal"));
        });
        assert_matches!(&scope.action.node, ActionConstraint::EqEntity(e) => {
            assert_eq!(e.node.entity_type.node.basename(), "Action");
            assert_eq!(e.node.id.node.raw(), "\"view\"");
        });
        assert_matches!(&scope.resource.node, EntityConstraint::IsType { entity_type, in_entity: Some(in_entity) } => {
            assert_eq!(entity_type.node.basename(), "Photo");
            assert_matches!(&in_entity.node, EntityOrSlot::Entity(e) => {
                assert_eq!(e.entity_type.node.basename(), "Album");
                assert_eq!(e.id.node.contents(), "vacation");
            });
        });
        assert_eq!(
            scope.resource.source_text(),
            Some(r#"resource is Photo in Album::"vacation""#)
        );
        let cond = &policy.conditions[0].node;
        assert_eq!(cond.kind.node, ConditionKind::Unless);
        assert_eq!(shape(&cond.body), "(> 1 2)");
    }

    #[test]
    fn empty_file() {
        for src in ["", "  // nothing here\n", "\n\n"] {
            let policies = assert_parse_succeeds(parse_policies, src);
            assert!(policies.node.is_empty(), "{src:?}");
        }
    }

    #[test]
    fn annotations_precede_effect() {
        let src = r#"@id("p0") @advice("deny") forbid(principal, action, resource);"#;
        let policy = assert_parse_succeeds(parse_policy, src).node;
        let keys: Vec<_> = policy
            .annotations
            .iter()
            .map(|a| (a.node.key.node.as_str(), a.node.value.node.contents()))
            .collect();
        assert_eq!(keys, vec![("id", "p0"), ("advice", "deny")]);
        assert_eq!(
            policy.annotations[1].source_text(),
            Some(r#"@advice("deny")"#)
        );
    }

    #[test]
    fn scope_forms() {
        let policy = assert_parse_succeeds(
            parse_policy,
            r#"permit(principal is User, action in [Action::"a", Ns::Action::"b"], resource == ?resource);"#,
        )
        .node;
        let scope = policy.scope.node;
        assert_matches!(&scope.principal.node, EntityConstraint::IsType { in_entity: None, .. });
        assert_matches!(&scope.action.node, ActionConstraint::InEntityList(list) => {
            assert_eq!(list.len(), 2);
            assert_eq!(
                list.last().node.entity_type.node.namespace().map(|s| s.as_str()).collect::<Vec<_>>(),
                vec!["Ns"]
            );
        });
        assert_matches!(&scope.resource.node, EntityConstraint::EqTemplateSlot(s) => {
            assert_eq!(s.node, Slot::Resource);
        });

        let policy = assert_parse_succeeds(
            parse_policy,
            r#"forbid(principal is User in ?principal, action in Action::"g", resource in Folder::"f");"#,
        )
        .node;
        let scope = policy.scope.node;
        assert_matches!(
            &scope.principal.node,
            EntityConstraint::IsType { in_entity: Some(Node { node: EntityOrSlot::Slot(Slot::Principal), .. }), .. }
        );
        assert_matches!(&scope.action.node, ActionConstraint::InEntity(_));
        assert_matches!(&scope.resource.node, EntityConstraint::InEntity(_));
    }

    #[test]
    fn multiple_conditions_in_order() {
        let src = "permit(principal, action, resource) when { true } unless { false } when { 1 };";
        let policy = assert_parse_succeeds(parse_policy, src).node;
        let kinds: Vec<_> = policy.conditions.iter().map(|c| c.node.kind.node).collect();
        assert_eq!(
            kinds,
            vec![ConditionKind::When, ConditionKind::Unless, ConditionKind::When]
        );
    }

    #[test]
    fn keywords_are_contextual() {
        // `permit`, `when` and friends are only keywords where the grammar expects them
        assert_shape("permit.when", "(. permit when)");
        assert_shape("context.if", "(. context if)");
        assert_shape("{if: 1}", "{if: 1}");
        assert_shape("x has then", "(has x then)");
        assert_shape("context.in -1", "(- (. context in) 1)");
        assert_shape("x.is-1", "(- (. x is) 1)");
        assert_shape("x has then -1", "(- (has x then) 1)");
        let errs = assert_parse_fails(parse_expr, "if");
        expect_exactly_one_error(
            "if",
            &errs,
            &ExpectedErrorMessage::error("unexpected end of input, expected expression"),
        );
    }

    #[test]
    fn precedence() {
        assert_shape("1 + 2 * 3", "(+ 1 (* 2 3))");
        assert_shape("1 * 2 + 3", "(+ (* 1 2) 3)");
        assert_shape("a || b && c", "(|| a (&& b c))");
        assert_shape("a && b || c", "(|| (&& a b) c)");
        assert_shape("-a.b", "(- (. a b))");
        assert_shape("!a.b(c)", "(! (.b a c))");
        assert_shape("a < b + 1 && c", "(&& (< a (+ b 1)) c)");
        assert_shape("principal in Group::\"g\" || x", "(|| (in principal Group::\"g\") x)");
        assert_shape("!a has b", "(! (has a b))");
        assert_shape("a has b && c like \"*x\"", "(&& (has a b) (like c \"*x\"))");
        assert_shape("a.b[\"c\"].d", "(. ([] (. a b) \"c\") d)");
        assert_shape(
            "if a then b else if c then d else e",
            "(if a b (if c d e))",
        );
        assert_shape("if a || b then 1 + 2 else 3", "(if (|| a b) (+ 1 2) 3)");
        assert_shape("1 + (if a then b else c)", "(+ 1 (paren (if a b c)))");
    }

    #[test]
    fn associativity() {
        assert_shape("a - b - c", "(- (- a b) c)");
        assert_shape("a + b - c + d", "(+ (- (+ a b) c) d)");
        assert_shape("a * b * c", "(* (* a b) c)");
        assert_shape("a || b || c", "(|| (|| a b) c)");
        assert_shape("a == b == c", "(== (== a b) c)");
        assert_shape("!!a", "(! (! a))");
        assert_shape("- -a", "(- (- a))");
        assert_shape("a.b.c.d", "(. (. (. a b) c) d)");
    }

    #[test]
    fn negative_literals_and_subtraction() {
        assert_shape("-1", "-1");
        assert_shape("x - 1", "(- x 1)");
        assert_shape("x-1", "(- x 1)");
        assert_shape("x == -1", "(== x -1)");
        assert_shape("- 1", "(- 1)");
        let expr = assert_parse_succeeds(parse_expr, "-9223372036854775808");
        assert_eq!(expr.node, ExprKind::Int(i64::MIN));
    }

    #[test]
    fn postfix_forms() {
        assert_shape(
            r#"ip("10.0.0.1").isInRange(ip("10.0.0.0/8"))"#,
            r#"(.isInRange (call ip "10.0.0.1") (call ip "10.0.0.0/8"))"#,
        );
        assert_shape(
            "decimal(\"1.0\").lessThan(decimal(\"2.0\"))",
            "(.lessThan (call decimal \"1.0\") (call decimal \"2.0\"))",
        );
        assert_shape("a.contains(1)", "(.contains a 1)");
        assert_shape("a.containsAll([1, 2])", "(.containsAll a [1, 2])");
        assert_shape("ext::fn(1, 2)", "(call ext::fn 1 2)");
        assert_shape("f()()", "(call (call f))");
        assert_shape("(a)[b]", "([] (paren a) b)");
    }

    #[test]
    fn is_and_like() {
        assert_shape("principal is User", "(is principal User)");
        assert_shape(
            "principal is Ns::User in Group::\"g\"",
            "(is principal Ns::User Group::\"g\")",
        );
        assert_shape(
            "resource is Doc in principal.folders && true",
            "(&& (is resource Doc (. principal folders)) true)",
        );
        assert_shape("x like \"a*b\"", "(like x \"a*b\")");
        assert_shape("x has \"weird key\"", "(has x \"weird key\")");
    }

    #[test]
    fn literals() {
        assert_shape("[]", "[]");
        assert_shape("[1, -2, \"three\", true]", "[1, -2, \"three\", true]");
        assert_shape("{}", "{}");
        assert_shape(
            r#"{ a: 1, "b c": "d", a: false }"#,
            r#"{a: 1, "b c": "d", a: false}"#,
        );
        assert_shape(
            r#"[User::"a", Ns::Group::"b"]"#,
            r#"[User::"a", Ns::Group::"b"]"#,
        );
        assert_matches!(
            assert_parse_succeeds(parse_expr, "[true]").node,
            ExprKind::Set(_)
        );
        assert_matches!(
            assert_parse_succeeds(parse_expr, "[User::\"a\"]").node,
            ExprKind::EntityList(_)
        );
    }

    #[test]
    fn spans_cover_exactly_their_tokens() {
        let src = r#"permit(principal, action, resource)
            when {
                (context.time >= 9 && context.time < 17) ||
                principal in Group::"admins" ||
                !(resource has owner) ||
                resource.tags.containsAll(["a", "b"]) &&
                (if context.x is Ns::T in principal then -1 * (2 + 3) else {k: "v"}["k"])
            };"#;
        let policy = assert_parse_succeeds(parse_policy, src);
        assert_eq!(policy.source_text(), Some(src));
        let body = &policy.node.conditions[0].node.body;
        let mut count = 0;
        for expr in body.subexpressions() {
            count += 1;
            let text = expr.source_text().unwrap();
            assert_eq!(text, text.trim(), "span has surrounding trivia: {text:?}");
            let reparsed = assert_parse_succeeds(parse_expr, text);
            assert_eq!(&reparsed, expr, "re-parsing {text:?}");
        }
        assert!(count > 30, "only visited {count} subexpressions");
    }

    #[test]
    fn deterministic() {
        let src = r#"@id("x") permit(principal == User::"a", action in [Action::"r"], resource) when { context.a.b(1, [2]) like "*" } unless { x - y - z };"#;
        let first = assert_parse_succeeds(parse_policies, src);
        let second = assert_parse_succeeds(parse_policies, src);
        assert_eq!(first, second);
        let locs = |p: &Node<Policies>| {
            p.node.0[0].node.conditions[0]
                .node
                .body
                .subexpressions()
                .map(|e| (e.loc.start(), e.loc.end()))
                .collect::<Vec<_>>()
        };
        assert_eq!(locs(&first), locs(&second));
    }

    #[test]
    fn empty_condition_body() {
        let src = "permit ( principal, action, resource ) when { };";
        let errs = assert_parse_fails(parse_policies, src);
        expect_exactly_one_error(
            src,
            &errs,
            &ExpectedErrorMessage::error("unexpected token `}`, expected expression")
                .exactly_one_underline("}"),
        );
        let position = errs.first().position();
        assert_eq!(position.offset, src.find('}').unwrap());
        assert_eq!((position.line, position.column), (1, 47));
    }

    #[test]
    fn empty_action_list() {
        let src = "permit(principal, action in [], resource);";
        let errs = assert_parse_fails(parse_policies, src);
        expect_exactly_one_error(
            src,
            &errs,
            &ExpectedErrorMessage::error("unexpected token `]`, expected entity reference")
                .exactly_one_underline("]"),
        );
    }

    #[test]
    fn structural_errors() {
        let cases = [
            (
                "permit(principal, action, resource)",
                "unexpected end of input, expected one of: `when`, `unless`, `;`",
            ),
            (
                "permit(action, principal, resource);",
                "unexpected token `action`, expected `principal`",
            ),
            (
                "permit(principal action, resource);",
                "unexpected token `action`, expected one of: `is`, `==`, `in`, `,`",
            ),
            (
                "permit(principal == User, action, resource);",
                "unexpected token `,`, expected `::`",
            ),
            (
                "permit(principal == User::alice, action, resource);",
                "unexpected token `,`, expected `::`",
            ),
            (
                "permit(principal == User::5, action, resource);",
                "unexpected token `5`, expected string literal",
            ),
            (
                "allow(principal, action, resource);",
                "unexpected token `allow`, expected one of: `@`, `permit`, `forbid`",
            ),
            (
                "permit(principal, action, resource) when { true ;",
                "unexpected token `;`, expected `}`",
            ),
            (
                "permit(principal, action, resource) when true;",
                "unexpected token `true`, expected `{`",
            ),
            (
                "@id permit(principal, action, resource);",
                "unexpected token `permit`, expected `(`",
            ),
        ];
        for (src, msg) in cases {
            let errs = assert_parse_fails(parse_policies, src);
            expect_exactly_one_error(src, &errs, &ExpectedErrorMessage::error(msg));
        }
    }

    #[test]
    fn expression_errors() {
        let cases = [
            ("x like y", "unexpected token `y`, expected string literal"),
            ("x like 1", "unexpected token `1`, expected string literal"),
            ("if a then b", "unexpected end of input, expected `else`"),
            ("if a b else c", "unexpected token `b`, expected `then`"),
            ("1 +", "unexpected end of input, expected expression"),
            ("(1", "unexpected end of input, expected `)`"),
            ("f(1 2)", "unexpected token `2`, expected one of: `,`, `)`"),
            ("[1, x]", "unexpected token `x`, expected literal"),
            ("{a: b}", "unexpected token `b`, expected literal"),
            ("{1: 2}", "unexpected token `1`, expected one of: identifier, string literal"),
            ("x is if", "unexpected token `if`, expected identifier"),
            ("a b", "unexpected token `b`, expected end of input"),
            ("1 + if a then b else c", "unexpected token `if`, expected expression"),
            ("User::if::\"x\"", "unexpected token `if`, expected identifier"),
        ];
        for (src, msg) in cases {
            let errs = assert_parse_fails(parse_expr, src);
            expect_exactly_one_error(src, &errs, &ExpectedErrorMessage::error(msg));
        }
    }

    #[test]
    fn wrong_template_slot() {
        let src = "permit(principal == ?resource, action, resource);";
        let errs = assert_parse_fails(parse_policies, src);
        expect_exactly_one_error(
            src,
            &errs,
            &ExpectedErrorMessage::error(
                "unexpected token `?resource`, expected one of: `?principal`, entity reference",
            )
            .exactly_one_underline("?resource"),
        );
        let src = "permit(principal, action == ?principal, resource);";
        let errs = assert_parse_fails(parse_policies, src);
        expect_exactly_one_error(
            src,
            &errs,
            &ExpectedErrorMessage::error("unexpected token `?principal`, expected identifier"),
        );
    }

    #[test]
    fn expr_overflow() {
        // an error is not a crash!
        for src in [
            "principal == -5555555555555555555555",
            "principal == 5555555555555555555555",
            "[9223372036854775808]",
        ] {
            let errs = assert_parse_fails(parse_expr, src);
            let err = errs.first();
            assert_matches!(err, ParseError::ToCST(e) => {
                assert_eq!(e.kind(), ToCSTErrorKind::IntegerOverflow);
            });
            expect_source_snippet(src, err, src.rsplit([' ', '[']).next().unwrap().trim_end_matches(']'));
            expect_err(
                src,
                err,
                &ExpectedErrorMessage::error_and_help(
                    &format!(
                        "integer literal token `{}` is out of range",
                        src.rsplit([' ', '[']).next().unwrap().trim_end_matches(']')
                    ),
                    "integer literals must be between -9223372036854775808 and 9223372036854775807",
                ),
            );
        }
    }

    #[test]
    fn deep_nesting_is_an_error_not_a_crash() {
        let depth = 100_000;
        let src = format!("{}1{}", "(".repeat(depth), ")".repeat(depth));
        let errs = assert_parse_fails(parse_expr, &src);
        assert_matches!(errs.first(), ParseError::ToCST(e) => {
            assert_eq!(e.kind(), ToCSTErrorKind::RecursionLimit);
        });
        let src = format!("{}x", "!".repeat(depth));
        let errs = assert_parse_fails(parse_expr, &src);
        expect_err(
            &src,
            errs.first(),
            &ExpectedErrorMessage::error_starts_with("expression nested too deeply"),
        );
    }

    #[test]
    fn fail_fast_stops_at_first_policy_error() {
        let src = r#"
            permit(principal, action, resource);
            permit(principal, action resource);
            forbid(principal, action, resource) when { };
        "#;
        let errs = assert_parse_fails(parse_policies, src);
        assert_eq!(errs.len(), 1);
        assert_eq!(errs.first().position().line, 3);
    }

    #[test]
    #[traced_test]
    fn collect_all_reports_every_policy() {
        let src = r#"
            permit(principal, action, resource);
            permit(principal, action resource);
            forbid(principal, action, resource) when { };
            permit(principal == User::"x", action, resource);
        "#;
        let errs = assert_parse_fails(
            |text| parse_policies_with_config(text, &ParseConfig::collect_all()),
            src,
        );
        let lines: Vec<_> = errs.iter().map(|e| e.position().line).collect();
        assert_eq!(lines, vec![3, 4]);
        assert!(logs_contain("skipping malformed policy"));
    }

    #[test]
    fn collect_all_skips_semicolons_inside_brackets() {
        let src = "permit(principal, action, resource) when { x ; };\npermit(principal, action, resource);";
        let errs = assert_parse_fails(
            |text| parse_policies_with_config(text, &ParseConfig::collect_all()),
            src,
        );
        expect_exactly_one_error(
            src,
            &errs,
            &ExpectedErrorMessage::error("unexpected token `;`, expected `}`"),
        );

        let src = r#"permit(principal, action in [Action::"a"; Action::"b"], resource);
forbid(principal, action, resource) when { [1; 2] };
permit(principal, action, resource);"#;
        let errs = assert_parse_fails(
            |text| parse_policies_with_config(text, &ParseConfig::collect_all()),
            src,
        );
        let lines: Vec<_> = errs.iter().map(|e| e.position().line).collect();
        assert_eq!(lines, vec![1, 2]);
    }

    #[test]
    fn collect_all_recovers_from_unclosed_brackets() {
        let src = "permit(principal, action, resource) when { (x ;\nforbid(principal, action, resource);\npermit(principal action, resource);";
        let errs = assert_parse_fails(
            |text| parse_policies_with_config(text, &ParseConfig::collect_all()),
            src,
        );
        let lines: Vec<_> = errs.iter().map(|e| e.position().line).collect();
        assert_eq!(lines, vec![1, 3]);
    }

    #[test]
    fn collect_all_on_valid_input() {
        let src = "permit(principal, action, resource); forbid(principal, action, resource);";
        let policies = assert_parse_succeeds(
            |text| parse_policies_with_config(text, &ParseConfig::collect_all()),
            src,
        );
        assert_eq!(policies.node.len(), 2);
        assert_eq!(
            policies.node.0[1].source_text(),
            Some("forbid(principal, action, resource);")
        );
    }

    #[test]
    fn collect_all_handles_missing_semicolon_at_end() {
        let src = "permit(principal, action, resource) when { 1 +";
        let errs = assert_parse_fails(
            |text| parse_policies_with_config(text, &ParseConfig::collect_all()),
            src,
        );
        assert_eq!(errs.len(), 1);
    }

    #[test]
    fn lex_errors_surface_through_parse() {
        let src = "permit(principal, action, resource) when { 1 / 2 };";
        let errs = assert_parse_fails(parse_policies, src);
        assert_matches!(errs.first(), ParseError::Lex(_));
        expect_exactly_one_error(
            src,
            &errs,
            &ExpectedErrorMessage::error("unrecognized character `/`").exactly_one_underline("/"),
        );
    }

    #[test]
    fn parse_policy_requires_exactly_one() {
        let src = "permit(principal, action, resource); permit(principal, action, resource);";
        let errs = assert_parse_fails(parse_policy, src);
        expect_exactly_one_error(
            src,
            &errs,
            &ExpectedErrorMessage::error("unexpected token `permit`, expected end of input"),
        );
    }

    #[test]
    fn comments_are_skipped() {
        let src = r#"
            // leading comment
            @id("c") // after annotation
            permit( // inside scope
                principal, // p
                action,
                resource
            ) when { // body
                1 // one
                + 2
            }; // done
        "#;
        let policy = assert_parse_succeeds(parse_policy, src.trim()).node;
        assert_eq!(shape(&policy.conditions[0].node.body), "(+ 1 2)");
        assert_eq!(
            policy.conditions[0].node.body.source_text(),
            Some("1 // one\n                + 2")
        );
    }
}
