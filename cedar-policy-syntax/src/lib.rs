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

//! Lexer, parser and syntax tree for the Cedar policy language.
//!
//! The entry points live in [`parser`]: [`parser::tokenize`] turns text into
//! tokens and trivia, and [`parser::parse_policies`] turns text into an
//! ordered sequence of policy syntax trees.
#![forbid(unsafe_code)]
#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]

#[macro_use]
mod error_macros;

pub mod parser;

#[cfg(any(test, feature = "test-util"))]
pub mod test_utils;
