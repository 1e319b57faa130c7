/*
 * Copyright 2023 Amazon.com, Inc. or its affiliates. All Rights Reserved.
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

use std::error::Error;

use miette::{Diagnostic, Report};
use thiserror::Error;

use crate::CedarExitCode;

/// Failure reading input or writing output, adapted from Rust's standard
/// [`Error`] to [`miette`]'s [`Diagnostic`] so it renders like a syntax error.
#[derive(Debug, Diagnostic, Error)]
#[error(transparent)]
#[diagnostic(code(cedar_policy_syntax_cli::io_err))]
struct IoDiagnostic(Box<dyn Error + Send + Sync + 'static>);

/// Like [`miette::IntoDiagnostic`], but attaches our diagnostic code
pub trait IntoDiagnostic<T> {
    fn into_diagnostic(self) -> Result<T, Report>;
}

impl<T, E: Error + Send + Sync + 'static> IntoDiagnostic<T> for Result<T, E> {
    fn into_diagnostic(self) -> Result<T, Report> {
        self.map_err(|err| IoDiagnostic(Box::new(err)).into())
    }
}

/// Why a command produced no output
#[derive(Debug)]
pub enum CommandFailure {
    /// Input could not be read, or output could not be produced
    Io(Report),
    /// Input is not valid Cedar
    Syntax {
        /// File name, or `<stdin>`
        file: String,
        report: Report,
    },
}

impl CommandFailure {
    pub fn syntax(err: impl Diagnostic + Send + Sync + 'static, file: &str) -> Self {
        Self::Syntax {
            file: file.to_owned(),
            report: Report::new(err),
        }
    }

    pub fn exit_code(&self) -> CedarExitCode {
        match self {
            Self::Io(_) => CedarExitCode::Failure,
            Self::Syntax { .. } => CedarExitCode::SyntaxError,
        }
    }

    /// Render the diagnostic to stdout. Syntax errors carry their own copy of
    /// the source, so the file name is printed as a header.
    pub fn print(&self) {
        match self {
            Self::Io(report) => println!("{report:?}"),
            Self::Syntax { file, report } => println!("{file} is not valid Cedar\n{report:?}"),
        }
    }
}

impl From<Report> for CommandFailure {
    fn from(report: Report) -> Self {
        Self::Io(report)
    }
}
