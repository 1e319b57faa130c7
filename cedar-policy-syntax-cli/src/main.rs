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

#![forbid(unsafe_code)]

use cedar_policy_syntax_cli::{
    check_parse, init_logging, parse, tokenize_policies, CedarExitCode, Cli, Commands,
};

use clap::Parser;

fn main() -> CedarExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match cli.command {
        Commands::CheckParse(args) => check_parse(&args),
        Commands::Parse(args) => parse(&args),
        Commands::Tokenize(args) => tokenize_policies(&args),
    }
}
