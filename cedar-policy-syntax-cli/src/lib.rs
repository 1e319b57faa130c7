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

mod err;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use miette::WrapErr;
use rayon::prelude::*;
use std::{
    path::Path,
    process::{ExitCode, Termination},
};
use tracing_subscriber::EnvFilter;

use cedar_policy_syntax::parser::{
    self, cst::Policies, tokenize, ErrorMode, Node, ParseConfig, Position,
};
use err::{CommandFailure, IntoDiagnostic};

/// Name used in diagnostics for input read from stdin
const STDIN_NAME: &str = "<stdin>";

/// Cedar CLI for checking, parsing and tokenizing policies
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)] // Pull from `Cargo.toml`
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
    /// Log more (`-v` for debug, `-vv` for trace). `RUST_LOG` takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check that policies successfully parse
    CheckParse(CheckParseArgs),
    /// Parse a policy set and print its syntax tree
    Parse(ParseArgs),
    /// Print the tokens of a policy set
    Tokenize(TokenizeArgs),
}

#[derive(Args, Debug)]
pub struct CheckParseArgs {
    /// Files containing policies. Reads from stdin if none are given.
    #[arg(short, long = "policies", value_name = "FILE")]
    pub policies_files: Vec<String>,
    /// Keep going after a malformed policy and report every error found
    #[arg(long)]
    pub collect_all_errors: bool,
}

impl CheckParseArgs {
    fn parse_config(&self) -> ParseConfig {
        ParseConfig {
            error_mode: if self.collect_all_errors {
                ErrorMode::CollectAll
            } else {
                ErrorMode::FailFast
            },
        }
    }
}

#[derive(Args, Debug)]
pub struct ParseArgs {
    /// File containing policies. Reads from stdin if not given.
    #[arg(short, long = "policies", value_name = "FILE")]
    pub policies_file: Option<String>,
    /// How to print the syntax tree
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Args, Debug)]
pub struct TokenizeArgs {
    /// File containing policies. Reads from stdin if not given.
    #[arg(short, long = "policies", value_name = "FILE")]
    pub policies_file: Option<String>,
    /// Also print whitespace and comments
    #[arg(long)]
    pub trivia: bool,
    /// How to print the tokens
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable
    #[default]
    Text,
    /// Pretty-printed JSON
    Json,
}

#[derive(Eq, PartialEq, Debug, Copy, Clone)]
pub enum CedarExitCode {
    // The command completed successfully.
    Success,
    // The command failed to complete, e.g. because its input could not be read.
    Failure,
    // The input was read, but it is not valid Cedar.
    SyntaxError,
}

impl Termination for CedarExitCode {
    fn report(self) -> ExitCode {
        match self {
            CedarExitCode::Success => ExitCode::SUCCESS,
            CedarExitCode::Failure => ExitCode::FAILURE,
            CedarExitCode::SyntaxError => ExitCode::from(2),
        }
    }
}

/// Install a `tracing` subscriber writing to stderr, so stdout stays
/// reserved for command output
pub fn init_logging(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

pub fn check_parse(args: &CheckParseArgs) -> CedarExitCode {
    let config = args.parse_config();
    let results: Vec<Result<usize, CommandFailure>> = if args.policies_files.is_empty() {
        vec![check_one(None, &config)]
    } else {
        args.policies_files
            .par_iter()
            .map(|file| check_one(Some(file.as_str()), &config))
            .collect()
    };

    let mut exit_code = CedarExitCode::Success;
    for result in results {
        if let Err(failure) = result {
            failure.print();
            // a file we couldn't read outranks one that didn't parse
            if exit_code != CedarExitCode::Failure {
                exit_code = failure.exit_code();
            }
        }
    }
    exit_code
}

fn check_one(filename: Option<&str>, config: &ParseConfig) -> Result<usize, CommandFailure> {
    let (name, src) = read_source(filename)?;
    let policies = parse_source(&name, &src, config)?;
    tracing::info!(file = %name, policies = policies.node.len(), "policies parse");
    Ok(policies.node.len())
}

pub fn parse(args: &ParseArgs) -> CedarExitCode {
    report_outcome(render_tree(args))
}

fn render_tree(args: &ParseArgs) -> Result<String, CommandFailure> {
    let (name, src) = read_source(args.policies_file.as_deref())?;
    let policies = parse_source(&name, &src, &ParseConfig::default())?;
    match args.format {
        OutputFormat::Text => Ok(format!("{policies:#}")),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&policies)
            .into_diagnostic()
            .wrap_err("failed to serialize syntax tree")?),
    }
}

pub fn tokenize_policies(args: &TokenizeArgs) -> CedarExitCode {
    report_outcome(render_tokens(args))
}

fn render_tokens(args: &TokenizeArgs) -> Result<String, CommandFailure> {
    let (name, src) = read_source(args.policies_file.as_deref())?;
    let lexed = tokenize(&src).map_err(|err| CommandFailure::syntax(err, &name))?;
    tracing::debug!(
        tokens = lexed.tokens.len(),
        trivia = lexed.trivia.len(),
        "tokenized input"
    );

    if args.format == OutputFormat::Json {
        let json = if args.trivia {
            serde_json::to_string_pretty(&lexed)
        } else {
            serde_json::to_string_pretty(&lexed.tokens)
        };
        return Ok(json
            .into_diagnostic()
            .wrap_err("failed to serialize tokens")?);
    }

    // (start offset, kind, text) in source order
    let mut rows: Vec<(usize, String, String)> = lexed
        .tokens
        .iter()
        .map(|t| (t.span.start, format!("{:?}", t.kind), t.text.to_string()))
        .collect();
    if args.trivia {
        rows.extend(lexed.trivia.iter().map(|t| {
            let text = src.get(t.span.clone()).unwrap_or_default();
            (t.span.start, format!("{:?}", t.kind), format!("{text:?}"))
        }));
        rows.sort_by_key(|(start, _, _)| *start);
    }
    Ok(rows
        .into_iter()
        .map(|(start, kind, text)| {
            format!("{}\t{kind}\t{text}", Position::from_offset(&src, start))
        })
        .collect::<Vec<_>>()
        .join("\n"))
}

fn report_outcome(outcome: Result<String, CommandFailure>) -> CedarExitCode {
    match outcome {
        Ok(output) => {
            if !output.is_empty() {
                println!("{output}");
            }
            CedarExitCode::Success
        }
        Err(failure) => {
            failure.print();
            failure.exit_code()
        }
    }
}

/// Parse `src`, naming `name` in any error report
fn parse_source(
    name: &str,
    src: &str,
    config: &ParseConfig,
) -> Result<Node<Policies>, CommandFailure> {
    parser::parse_policies_with_config(src, config)
        .map_err(|errs| CommandFailure::syntax(errs, name))
}

/// Read the named file, or stdin if there is none. Returns the name to use in
/// diagnostics along with the contents.
fn read_source(filename: Option<&str>) -> Result<(String, String), CommandFailure> {
    let name = filename.unwrap_or(STDIN_NAME).to_owned();
    let src = read_from_file_or_stdin(filename, "policies")?;
    tracing::debug!(file = %name, bytes = src.len(), "read input");
    Ok((name, src))
}

fn read_from_file_or_stdin(
    filename: Option<impl AsRef<Path>>,
    context: &str,
) -> miette::Result<String> {
    let mut src_str = String::new();
    match filename.as_ref() {
        Some(path) => {
            src_str = std::fs::read_to_string(path)
                .into_diagnostic()
                .wrap_err_with(|| {
                    format!(
                        "failed to open {} file {}",
                        context,
                        path.as_ref().display()
                    )
                })?;
        }
        None => {
            std::io::Read::read_to_string(&mut std::io::stdin(), &mut src_str)
                .into_diagnostic()
                .wrap_err_with(|| format!("failed to read {} from stdin", context))?;
        }
    };
    Ok(src_str)
}
