// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use jvm_classfile::ClassFile;
use jvm_runtime::{execute, Heap, LocalVars};
use tracing::info;

const ENTRY_METHOD_NAME: &str = "main";
const ENTRY_METHOD_DESCRIPTOR: &str = "([Ljava/lang/String;)V";

/// Loads a class file and runs its `main` method.
#[derive(Parser, Debug)]
#[command(name = "jvm", about = "Executes the main method of a JVM-subset class file")]
struct Args {
    /// Path to the .class file to run.
    class_file: PathBuf,
}

fn main() -> ExitCode {
    // clap's default on a usage error is exit code 2; the contract
    // here pins wrong argument count to exit code 1, so the error is
    // handled here instead of left to `Args::parse()`.
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(_) => {
            eprintln!("usage: jvm <path-to-class-file>");
            return ExitCode::from(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let bytes = match std::fs::read(&args.class_file) {
        Ok(bytes) => bytes,
        Err(error) => {
            eprintln!("failed to read {}: {error}", args.class_file.display());
            return ExitCode::from(1);
        }
    };

    let class_file = match ClassFile::parse(&bytes) {
        Ok(class_file) => class_file,
        Err(error) => {
            eprintln!("{error}");
            return ExitCode::from(1);
        }
    };

    let method = match class_file.find_method(ENTRY_METHOD_NAME, ENTRY_METHOD_DESCRIPTOR) {
        Ok(method) => method,
        Err(error) => {
            eprintln!("{error}");
            return ExitCode::from(1);
        }
    };

    info!(class_file = %args.class_file.display(), "running main");

    let locals = LocalVars::with_params(method.max_locals, &[]);
    let mut heap = Heap::new();

    match execute(&class_file, method, locals, &mut heap) {
        None => ExitCode::SUCCESS,
        Some(_) => {
            eprintln!("main returned a value; main must be void");
            ExitCode::from(1)
        }
    }
}
