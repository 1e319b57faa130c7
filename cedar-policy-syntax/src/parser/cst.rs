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

//! Concrete syntax tree for Cedar policies.
//!
//! Every node is wrapped in a [`Node`], which records the exact source span
//! the node was parsed from. Trees own their children and are never mutated
//! after the parser builds them.

use nonempty::NonEmpty;
use serde::Serialize;
use smol_str::SmolStr;

use super::expr_iterator::ExprIterator;
use super::node::Node;

/// An identifier, as written
pub type Ident = Node<SmolStr>;

/// A sequence of policies, in declaration order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Policies(pub Vec<Node<Policy>>);

impl Policies {
    /// Iterate over the policies in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &Node<Policy>> {
        self.0.iter()
    }

    /// Number of policies
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no policies
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A single `permit` or `forbid` rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Policy {
    /// Annotations, in the order written
    pub annotations: Vec<Node<Annotation>>,
    /// `permit` or `forbid`
    pub effect: Node<Effect>,
    /// The principal/action/resource constraints between the parentheses
    pub scope: Node<Scope>,
    /// `when`/`unless` clauses, in the order written
    pub conditions: Vec<Node<Condition>>,
}

/// `@key("value")`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Annotation {
    /// Annotation key
    pub key: Ident,
    /// Annotation value
    pub value: Node<Str>,
}

/// Policy effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Effect {
    /// `permit`
    Permit,
    /// `forbid`
    Forbid,
}

/// The three scope constraints, always in principal, action, resource order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Scope {
    /// Constraint on the principal
    pub principal: Node<PrincipalConstraint>,
    /// Constraint on the action
    pub action: Node<ActionConstraint>,
    /// Constraint on the resource
    pub resource: Node<ResourceConstraint>,
}

/// Principal and resource constraints share one set of forms
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum EntityConstraint {
    /// `principal`
    Any,
    /// `principal is T`, optionally followed by `in E` or `in ?principal`
    IsType {
        /// Required entity type
        entity_type: Node<Path>,
        /// Optional hierarchy constraint
        in_entity: Option<Node<EntityOrSlot>>,
    },
    /// `principal == E`
    EqEntity(Node<EntityRef>),
    /// `principal in E`
    InEntity(Node<EntityRef>),
    /// `principal == ?principal`
    EqTemplateSlot(Node<Slot>),
    /// `principal in ?principal`
    InTemplateSlot(Node<Slot>),
}

/// Constraint on the principal
pub type PrincipalConstraint = EntityConstraint;
/// Constraint on the resource
pub type ResourceConstraint = EntityConstraint;

/// Constraint on the action
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ActionConstraint {
    /// `action`
    Any,
    /// `action == E`
    EqEntity(Node<EntityRef>),
    /// `action in E`
    InEntity(Node<EntityRef>),
    /// `action in [E1, E2, ...]`, never empty
    InEntityList(NonEmpty<Node<EntityRef>>),
}

/// Either an entity reference or a template slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum EntityOrSlot {
    /// A concrete entity
    Entity(EntityRef),
    /// A template slot
    Slot(Slot),
}

/// Template slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Slot {
    /// `?principal`
    Principal,
    /// `?resource`
    Resource,
}

impl Slot {
    /// The slot as written, including the leading `?`
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Principal => "?principal",
            Self::Resource => "?resource",
        }
    }
}

/// `when { ... }` or `unless { ... }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Condition {
    /// `when` or `unless`
    pub kind: Node<ConditionKind>,
    /// The guarded expression
    pub body: Expr,
}

/// Kind of a condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ConditionKind {
    /// `when`
    When,
    /// `unless`
    Unless,
}

/// A `::`-separated name, used for entity types and function names
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Path {
    /// The segments, outermost namespace first
    pub segments: NonEmpty<Ident>,
}

impl Path {
    /// The last segment
    pub fn basename(&self) -> &SmolStr {
        &self.segments.last().node
    }

    /// All segments but the last
    pub fn namespace(&self) -> impl Iterator<Item = &SmolStr> {
        self.segments
            .iter()
            .take(self.segments.len() - 1)
            .map(|seg| &seg.node)
    }
}

/// `Type::"id"`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct EntityRef {
    /// The entity type
    pub entity_type: Node<Path>,
    /// The entity id
    pub id: Node<Str>,
}

/// A string literal exactly as written, quotes included. Escape sequences
/// are left undecoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Str {
    raw: SmolStr,
}

impl Str {
    pub(crate) fn new(raw: impl Into<SmolStr>) -> Self {
        Self { raw: raw.into() }
    }

    /// Source text, including the surrounding quotes
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Source text between the quotes
    pub fn contents(&self) -> &str {
        self.raw
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .unwrap_or(&self.raw)
    }
}

/// A literal allowed in set and record literals
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Literal {
    /// `true` or `false`
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// String literal
    Str(Str),
}

/// Record literal key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum RecordKey {
    /// `key: ...`
    Ident(SmolStr),
    /// `"key": ...`
    Str(Str),
}

/// Right-hand side of `has`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum HasField {
    /// `e has attr`
    Ident(SmolStr),
    /// `e has "attr"`
    Str(Str),
}

/// Variables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Var {
    /// `principal`
    Principal,
    /// `action`
    Action,
    /// `resource`
    Resource,
    /// `context`
    Context,
}

impl Var {
    /// The keyword naming this variable
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Principal => "principal",
            Self::Action => "action",
            Self::Resource => "resource",
            Self::Context => "context",
        }
    }
}

/// Prefix operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum UnaryOp {
    /// `!`
    Not,
    /// `-`
    Neg,
}

/// Infix operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BinaryOp {
    /// `||`
    Or,
    /// `&&`
    And,
    /// `<`
    Less,
    /// `<=`
    LessEq,
    /// `>`
    Greater,
    /// `>=`
    GreaterEq,
    /// `==`
    Eq,
    /// `!=`
    NotEq,
    /// `in`
    In,
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
}

impl BinaryOp {
    /// The operator as written in source
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Or => "||",
            Self::And => "&&",
            Self::Less => "<",
            Self::LessEq => "<=",
            Self::Greater => ">",
            Self::GreaterEq => ">=",
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::In => "in",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
        }
    }
}

/// An expression together with its source location
pub type Expr = Node<ExprKind>;

/// Every form of Cedar expression
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ExprKind {
    /// `!e` or `-e`
    Unary {
        /// The operator
        op: UnaryOp,
        /// The operand
        operand: Box<Expr>,
    },
    /// `left op right`
    Binary {
        /// The operator
        op: BinaryOp,
        /// Left operand
        left: Box<Expr>,
        /// Right operand
        right: Box<Expr>,
    },
    /// `e[index]`
    Index {
        /// The indexed expression
        operand: Box<Expr>,
        /// The index
        index: Box<Expr>,
    },
    /// `(e)`
    Paren(Box<Expr>),
    /// `e.field`
    FieldAccess {
        /// The record or entity
        operand: Box<Expr>,
        /// The attribute name
        field: Ident,
    },
    /// `e has field` or `e has "field"`
    Has {
        /// The record or entity
        operand: Box<Expr>,
        /// The attribute tested for
        field: Node<HasField>,
    },
    /// `e is T` or `e is T in e2`
    Is {
        /// The tested expression
        operand: Box<Expr>,
        /// The entity type
        entity_type: Node<Path>,
        /// Optional hierarchy test
        in_expr: Option<Box<Expr>>,
    },
    /// `f(args)`
    Call {
        /// Function being called, normally a [`ExprKind::Name`]
        callee: Box<Expr>,
        /// Arguments, in order
        args: Vec<Expr>,
    },
    /// `e like "pattern"`
    Like {
        /// The string tested
        operand: Box<Expr>,
        /// The pattern, with `*` wildcards left undecoded
        pattern: Node<Str>,
    },
    /// `e.method(args)`
    MethodCall {
        /// The receiver
        operand: Box<Expr>,
        /// Method name, e.g. `contains` or `isIpv4`
        method: Ident,
        /// Arguments, in order
        args: Vec<Expr>,
    },
    /// `if cond then then_expr else else_expr`
    IfThenElse {
        /// The test
        cond: Box<Expr>,
        /// Value when the test holds
        then_expr: Box<Expr>,
        /// Value otherwise
        else_expr: Box<Expr>,
    },
    /// `Type::"id"`
    EntityRef(EntityRef),
    /// `[Type::"a", Type::"b"]`
    EntityList(NonEmpty<Node<EntityRef>>),
    /// `[1, "two", true]`
    Set(Vec<Node<Literal>>),
    /// `{ key: 1, "other": "two" }`, duplicate keys allowed
    Record(Vec<(Node<RecordKey>, Node<Literal>)>),
    /// `principal`, `action`, `resource`, `context`
    Var(Var),
    /// A bare name, such as the callee of `ip("10.0.0.1")`
    Name(Path),
    /// `true` / `false`
    Bool(bool),
    /// Integer literal
    Int(i64),
    /// String literal
    Str(Str),
}

impl Node<ExprKind> {
    /// Iterate over this expression and all of its subexpressions,
    /// depth-first, parents before children
    pub fn subexpressions(&self) -> ExprIterator<'_> {
        ExprIterator::new(self)
    }

    /// The method name, if this is a method call
    pub fn method_name(&self) -> Option<&str> {
        match &self.node {
            ExprKind::MethodCall { method, .. } => Some(&method.node),
            _ => None,
        }
    }
}
