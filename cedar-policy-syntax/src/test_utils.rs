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

//! Assertion helpers for error messages and their source locations.

// PANIC SAFETY: testing code
#![allow(clippy::panic)]

use itertools::Itertools;

use crate::parser::err::ParseErrors;

/// The message, help text, and underlined snippet an error is expected to
/// have
#[derive(Debug)]
pub struct ExpectedErrorMessage<'a> {
    /// Expected contents of `Display`, or expected prefix of `Display` if `prefix` is `true`
    error: &'a str,
    /// Expected contents of `help()`, or `None` if no help
    help: Option<&'a str>,
    /// If `true`, `error` is only an expected prefix
    prefix: bool,
    /// Expected text under the error's single label, if checked
    underline: Option<&'a str>,
}

impl<'a> ExpectedErrorMessage<'a> {
    /// Expect the given exact error message and no help text.
    pub fn error(msg: &'a str) -> Self {
        Self {
            error: msg,
            help: None,
            prefix: false,
            underline: None,
        }
    }

    /// Expect the given exact error message and help text.
    pub fn error_and_help(error: &'a str, help: &'a str) -> Self {
        Self {
            help: Some(help),
            ..Self::error(error)
        }
    }

    /// Expect the error message to start with the given text, and expect no help text.
    pub fn error_starts_with(msg: &'a str) -> Self {
        Self {
            prefix: true,
            ..Self::error(msg)
        }
    }

    /// Also expect the error to carry exactly one label, covering `snippet`
    pub fn exactly_one_underline(self, snippet: &'a str) -> Self {
        Self {
            underline: Some(snippet),
            ..self
        }
    }

    /// Return a boolean indicating whether a given error matches this expected message.
    /// (If you want to assert that it matches, use [`expect_err()`] instead,
    /// for much better assertion-failure messages.)
    pub fn matches(&self, error: &impl miette::Diagnostic) -> bool {
        let e_string = error.to_string();
        let h_string = error.help().map(|h| h.to_string());
        let message_matches = if self.prefix {
            e_string.starts_with(self.error)
        } else {
            e_string == self.error
        };
        message_matches && h_string.as_deref() == self.help
    }
}

impl std::fmt::Display for ExpectedErrorMessage<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.prefix {
            writeln!(f, "expected error to start with: {}", self.error)?;
        } else {
            writeln!(f, "expected error: {}", self.error)?;
        }
        match self.help {
            Some(help) => writeln!(f, "expected help: {help}")?,
            None => writeln!(f, "  with no help message")?,
        }
        if let Some(underline) = self.underline {
            writeln!(f, "underlining: {underline}")?;
        }
        Ok(())
    }
}

/// Expect that the given `err` is an error with the given `ExpectedErrorMessage`.
///
/// `src` is the original input text, used for assertion-failure messages and
/// as the source the error's label indexes into.
#[track_caller] // report the caller's location as the location of the panic, not the location in this function
pub fn expect_err(src: &str, err: &impl miette::Diagnostic, msg: &ExpectedErrorMessage<'_>) {
    let error = err.to_string();
    let help = err.help().map(|h| h.to_string());
    if msg.prefix {
        assert!(
            error.starts_with(msg.error),
            "for the following input:\n{src}\nactual error did not start with the expected prefix\n  actual error: {error}\n  expected prefix: {}",
            msg.error,
        );
    } else {
        assert_eq!(
            &error, msg.error,
            "for the following input:\n{src}\nactual error did not match expected", // assert_eq! will print the actual and expected messages
        );
    }
    assert_eq!(
        help.as_deref(),
        msg.help,
        "for the following input:\n{src}\nactual help did not match expected",
    );
    if let Some(underline) = msg.underline {
        expect_source_snippet(src, err, underline);
    }
}

/// Expect that `errs` holds exactly one error, and that it matches `msg`
#[track_caller]
pub fn expect_exactly_one_error(src: &str, errs: &ParseErrors, msg: &ExpectedErrorMessage<'_>) {
    match errs.iter().exactly_one() {
        Ok(err) => expect_err(src, err, msg),
        Err(errs) => {
            let errs = errs.collect::<Vec<_>>();
            panic!(
                "for the following input:\n{src}\nexpected exactly one error, but got {}:\n{}",
                errs.len(),
                errs.iter().map(|e| format!("  {e}")).join("\n"),
            )
        }
    }
}

/// Expect that the given `err` has a (single) source location, where the
/// contents of that source location are `snippet`.
///
/// `src` is the original input text, used both for assertion-failure messages
/// but also as the source we assume the error's source location indexes into.
#[track_caller]
pub fn expect_source_snippet(
    src: impl AsRef<str>,
    err: &impl miette::Diagnostic,
    snippet: impl AsRef<str>,
) {
    let src = src.as_ref();
    let snippet = snippet.as_ref();
    let labels = err.labels().unwrap_or_else(|| {
        panic!("for the following input:\n{src}\ndid not find a source location, but expected one")
    });
    let label = labels.exactly_one().unwrap_or_else(|labels| {
        panic!(
            "for the following input:\n{src}\nexpected exactly one source location, but found {}",
            labels.count(),
        )
    });
    let actual_snippet = {
        let span = label.inner();
        src.get(span.offset()..span.offset() + span.len())
            .unwrap_or_else(|| panic!("label {span:?} is out of bounds for the input:\n{src}"))
    };
    assert_eq!(
        actual_snippet,
        snippet,
        "for the following input:\n{src}\nexpected source snippet to be:\n  {snippet}\nbut it was:\n  {actual_snippet}\n",
    );
}
