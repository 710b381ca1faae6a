// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

pub mod class_file;
pub mod constant_pool;
pub mod descriptor;
pub mod error;
pub mod method;
pub mod reader;

pub use class_file::ClassFile;
pub use constant_pool::{ConstantPool, ConstantPoolEntry};
pub use error::ClassFileError;
pub use method::MethodInfo;
pub use reader::ClassReader;
