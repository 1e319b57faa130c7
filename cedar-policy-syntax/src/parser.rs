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

//! This module contains the parser for the Cedar language.

/// Concrete Syntax Tree produced by the parser
pub mod cst;
/// error handling utilities
pub mod err;
/// Depth-first traversal of expressions
pub mod expr_iterator;
/// implementations for formatting, like `Display`
mod fmt;
/// Step one: convert text to tokens
pub mod lexer;
/// Source locations
pub mod loc;
/// Metadata wrapper for CST Nodes
mod node;
/// Step two: convert tokens to CST
pub mod text_to_cst;
/// Token definitions
pub mod token;

pub use lexer::{tokenize, Lexed};
pub use loc::{Loc, Position};
pub use node::Node;

use serde::{Deserialize, Serialize};

/// What the parser does when a policy fails to parse
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorMode {
    /// Stop at the first error
    #[default]
    FailFast,
    /// Skip past the next `;` and keep going, reporting every error found
    CollectAll,
}

/// Options for [`parse_policies_with_config`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseConfig {
    /// Error handling strategy
    pub error_mode: ErrorMode,
}

impl ParseConfig {
    /// Config that collects every policy's first error instead of stopping
    pub fn collect_all() -> Self {
        Self {
            error_mode: ErrorMode::CollectAll,
        }
    }
}

/// Parse a sequence of policies, stopping at the first error
pub fn parse_policies(text: &str) -> Result<Node<cst::Policies>, err::ParseErrors> {
    parse_policies_with_config(text, &ParseConfig::default())
}

/// Parse a sequence of policies with the given error handling strategy
pub fn parse_policies_with_config(
    text: &str,
    config: &ParseConfig,
) -> Result<Node<cst::Policies>, err::ParseErrors> {
    let lexed = tokenize(text)?;
    let policies = text_to_cst::parse_tokens(&lexed, config)?;
    tracing::debug!(policies = policies.node.len(), "parsed Cedar policies");
    Ok(policies)
}

/// Parse exactly one policy
pub fn parse_policy(text: &str) -> Result<Node<cst::Policy>, err::ParseErrors> {
    let lexed = tokenize(text)?;
    Ok(text_to_cst::parse_policy_tokens(&lexed)?)
}

/// Parse a single expression, such as the body of a `when` clause
pub fn parse_expr(text: &str) -> Result<cst::Expr, err::ParseErrors> {
    let lexed = tokenize(text)?;
    Ok(text_to_cst::parse_expr_tokens(&lexed)?)
}
