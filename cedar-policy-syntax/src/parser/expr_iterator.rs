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

use super::cst::{Expr, ExprKind};

/// This structure implements the iterator used to traverse subexpressions of an
/// expression.
#[derive(Debug)]
pub struct ExprIterator<'a> {
    /// The stack of expressions that need to be visited. To get the next
    /// expression, the iterator will pop from the stack. If the stack is empty,
    /// then the iterator is finished. Otherwise, any subexpressions of that
    /// expression are then pushed onto the stack, and the popped expression is
    /// returned.
    expression_stack: Vec<&'a Expr>,
}

impl<'a> ExprIterator<'a> {
    /// Construct an expr iterator
    pub fn new(expr: &'a Expr) -> Self {
        Self {
            expression_stack: vec![expr],
        }
    }
}

impl<'a> Iterator for ExprIterator<'a> {
    type Item = &'a Expr;

    fn next(&mut self) -> Option<Self::Item> {
        let next_expr = self.expression_stack.pop()?;
        // children are pushed in reverse so they come out left to right
        match &next_expr.node {
            ExprKind::Var(_)
            | ExprKind::Name(_)
            | ExprKind::Bool(_)
            | ExprKind::Int(_)
            | ExprKind::Str(_)
            | ExprKind::EntityRef(_)
            | ExprKind::EntityList(_)
            | ExprKind::Set(_)
            | ExprKind::Record(_) => (),
            ExprKind::IfThenElse {
                cond,
                then_expr,
                else_expr,
            } => {
                self.expression_stack.push(else_expr);
                self.expression_stack.push(then_expr);
                self.expression_stack.push(cond);
            }
            ExprKind::Binary { left, right, .. } => {
                self.expression_stack.push(right);
                self.expression_stack.push(left);
            }
            ExprKind::Index { operand, index } => {
                self.expression_stack.push(index);
                self.expression_stack.push(operand);
            }
            ExprKind::Is {
                operand, in_expr, ..
            } => {
                if let Some(in_expr) = in_expr {
                    self.expression_stack.push(in_expr);
                }
                self.expression_stack.push(operand);
            }
            ExprKind::Unary { operand, .. }
            | ExprKind::FieldAccess { operand, .. }
            | ExprKind::Has { operand, .. }
            | ExprKind::Like { operand, .. }
            | ExprKind::Paren(operand) => {
                self.expression_stack.push(operand);
            }
            ExprKind::Call { callee, args } => {
                self.expression_stack.extend(args.iter().rev());
                self.expression_stack.push(callee);
            }
            ExprKind::MethodCall { operand, args, .. } => {
                self.expression_stack.extend(args.iter().rev());
                self.expression_stack.push(operand);
            }
        }
        Some(next_expr)
    }
}
