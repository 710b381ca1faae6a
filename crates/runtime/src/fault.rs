// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

use tracing::error;

/// Raise a fatal execution-invariant violation.
///
/// Bytecode is trusted input at this tier: division by zero, a
/// negative shift amount, a branch outside the code array, an
/// unresolvable constant-pool reference, stack under/overflow, and the
/// like are not recoverable conditions with a `Result` to propagate —
/// they are bugs in the class file (or in this interpreter), and the
/// only correct response is to abort the run. This is the sole place
/// that decision is made, so every call site reads the same way.
pub fn fault(message: impl std::fmt::Display) -> ! {
    let message = message.to_string();
    error!(%message, "fatal execution invariant violation");
    panic!("{message}");
}
