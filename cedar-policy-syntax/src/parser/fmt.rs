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

//! `Display` for the CST. The output is Cedar text that parses back to an
//! equal tree. `{:#}` puts each scope constraint and condition on its own line.

use std::fmt;

use itertools::Itertools;

use super::cst::*;

impl fmt::Display for Policies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ps = self.0.iter();
        if let Some(p) = ps.next() {
            if f.alternate() {
                write!(f, "{p:#}")?;
            } else {
                write!(f, "{p}")?;
            }
        }
        for p in ps {
            if f.alternate() {
                write!(f, "\n\n{p:#}")?;
            } else {
                write!(f, " {p}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // start with annotations
        for anno in &self.annotations {
            if f.alternate() {
                // each annotation on a new line
                writeln!(f, "{anno}")?;
            } else {
                write!(f, "{anno} ")?;
            }
        }
        if f.alternate() {
            write!(f, "{}({:#})", self.effect, self.scope)?;
            // include conditions on their own lines
            for c in &self.conditions {
                write!(f, "\n{c:#}")?;
            }
        } else {
            write!(f, "{}({})", self.effect, self.scope)?;
            for c in &self.conditions {
                write!(f, " {c}")?;
            }
        }
        write!(f, ";")
    }
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}({})", self.key, self.value)
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Permit => write!(f, "permit"),
            Self::Forbid => write!(f, "forbid"),
        }
    }
}

/// A principal or resource constraint, with the variable it constrains
struct Constrained<'a>(&'a str, &'a EntityConstraint);

impl fmt::Display for Constrained<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self(var, constraint) = self;
        match constraint {
            EntityConstraint::Any => write!(f, "{var}"),
            EntityConstraint::IsType {
                entity_type,
                in_entity: None,
            } => write!(f, "{var} is {entity_type}"),
            EntityConstraint::IsType {
                entity_type,
                in_entity: Some(in_entity),
            } => write!(f, "{var} is {entity_type} in {in_entity}"),
            EntityConstraint::EqEntity(e) => write!(f, "{var} == {e}"),
            EntityConstraint::InEntity(e) => write!(f, "{var} in {e}"),
            EntityConstraint::EqTemplateSlot(s) => write!(f, "{var} == {s}"),
            EntityConstraint::InTemplateSlot(s) => write!(f, "{var} in {s}"),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let principal = Constrained("principal", &self.principal.node);
        let resource = Constrained("resource", &self.resource.node);
        if f.alternate() {
            write!(
                f,
                "\n  {principal},\n  {},\n  {resource}\n",
                self.action
            )
        } else {
            write!(f, "{principal}, {}, {resource}", self.action)
        }
    }
}

impl fmt::Display for ActionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "action"),
            Self::EqEntity(e) => write!(f, "action == {e}"),
            Self::InEntity(e) => write!(f, "action in {e}"),
            Self::InEntityList(es) => write!(f, "action in [{}]", es.iter().format(", ")),
        }
    }
}

impl fmt::Display for EntityOrSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entity(e) => write!(f, "{e}"),
            Self::Slot(s) => write!(f, "{s}"),
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            write!(f, "{} {{\n  {}\n}}", self.kind, self.body)
        } else {
            write!(f, "{} {{ {} }}", self.kind, self.body)
        }
    }
}

impl fmt::Display for ConditionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::When => write!(f, "when"),
            Self::Unless => write!(f, "unless"),
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.iter().format("::"))
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.entity_type, self.id)
    }
}

impl fmt::Display for Str {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw())
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Str(s) => write!(f, "{s}"),
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ident(i) => write!(f, "{i}"),
            Self::Str(s) => write!(f, "{s}"),
        }
    }
}

impl fmt::Display for HasField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ident(i) => write!(f, "{i}"),
            Self::Str(s) => write!(f, "{s}"),
        }
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl fmt::Display for ExprKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unary {
                op: UnaryOp::Not,
                operand,
            } => write!(f, "!{operand}"),
            Self::Unary {
                op: UnaryOp::Neg,
                operand,
            } => {
                // `-1` would lex as a single negative literal
                let operand = operand.to_string();
                if operand.starts_with(|c: char| c.is_ascii_digit()) {
                    write!(f, "- {operand}")
                } else {
                    write!(f, "-{operand}")
                }
            }
            Self::Binary { op, left, right } => write!(f, "{left} {op} {right}"),
            Self::Index { operand, index } => write!(f, "{operand}[{index}]"),
            Self::Paren(inner) => write!(f, "({inner})"),
            Self::FieldAccess { operand, field } => write!(f, "{operand}.{field}"),
            Self::Has { operand, field } => write!(f, "{operand} has {field}"),
            Self::Is {
                operand,
                entity_type,
                in_expr,
            } => {
                write!(f, "{operand} is {entity_type}")?;
                if let Some(in_expr) = in_expr {
                    write!(f, " in {in_expr}")?;
                }
                Ok(())
            }
            Self::Call { callee, args } => write!(f, "{callee}({})", args.iter().format(", ")),
            Self::Like { operand, pattern } => write!(f, "{operand} like {pattern}"),
            Self::MethodCall {
                operand,
                method,
                args,
            } => write!(f, "{operand}.{method}({})", args.iter().format(", ")),
            Self::IfThenElse {
                cond,
                then_expr,
                else_expr,
            } => write!(f, "if {cond} then {then_expr} else {else_expr}"),
            Self::EntityRef(e) => write!(f, "{e}"),
            Self::EntityList(es) => write!(f, "[{}]", es.iter().format(", ")),
            Self::Set(elements) => write!(f, "[{}]", elements.iter().format(", ")),
            Self::Record(attrs) => write!(
                f,
                "{{{}}}",
                attrs
                    .iter()
                    .format_with(", ", |(k, v), f| f(&format_args!("{k}: {v}")))
            ),
            Self::Var(v) => write!(f, "{v}"),
            Self::Name(path) => write!(f, "{path}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Str(s) => write!(f, "{s}"),
        }
    }
}
