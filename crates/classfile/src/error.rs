// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

use thiserror::Error;

/// Boundary errors raised while reading a class file. These are
/// reported to the user and cause a clean non-zero exit (§7 of the
/// spec); they are never panics, since a malformed or unexpected file
/// is an ordinary, recoverable-by-the-user situation.
#[derive(Debug, Error)]
pub enum ClassFileError {
    #[error("not a class file: bad magic number")]
    BadMagic,

    #[error("unexpected end of class file")]
    UnexpectedEof,

    #[error("constant pool index {0} is out of range")]
    ConstantPoolIndexOutOfRange(u16),

    #[error("constant pool entry {0} has an unrecognized tag {1:#x}")]
    UnknownConstantTag(u16, u8),

    #[error("constant pool entry {index} is a {found}, expected a {expected}")]
    WrongConstantKind {
        index: u16,
        found: &'static str,
        expected: &'static str,
    },

    #[error("method {name}{descriptor} was not found")]
    MethodNotFound { name: String, descriptor: String },

    #[error("method {name}{descriptor} has no Code attribute")]
    MissingCodeAttribute { name: String, descriptor: String },
}
