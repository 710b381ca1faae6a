// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

/// Count the parameter slots of a method descriptor such as
/// `"(II)I"` or `"([Ljava/lang/String;)V"`.
///
/// Only the parameter list between `(` and `)` matters here: the
/// interpreter doesn't need the return type to size the callee's local
/// variable array, it only needs to know how many stack slots to pop
/// as arguments. Every parameter, primitive or reference, occupies one
/// slot under this interpreter's unified `i32` value representation
/// (longs and doubles, which occupy two on a real JVM, never appear in
/// the supported instruction subset).
pub fn param_count(descriptor: &str) -> usize {
    let inner = descriptor
        .strip_prefix('(')
        .and_then(|rest| rest.split(')').next())
        .unwrap_or("");

    let mut count = 0;
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            // array dimensions are part of the element type, not a
            // parameter of their own; keep consuming '[' and move on
            // to whatever they prefix.
            '[' => continue,
            'L' => {
                // object type: consume up to and including ';'
                for next in chars.by_ref() {
                    if next == ';' {
                        break;
                    }
                }
                count += 1;
            }
            'B' | 'C' | 'D' | 'F' | 'I' | 'J' | 'S' | 'Z' => count += 1,
            _ => count += 1,
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn no_parameters() {
        assert_eq!(param_count("()V"), 0);
    }

    #[test]
    fn primitive_parameters() {
        assert_eq!(param_count("(II)I"), 2);
        assert_eq!(param_count("(IIII)I"), 4);
    }

    #[test]
    fn reference_and_array_parameters_are_one_slot_each() {
        assert_eq!(param_count("([Ljava/lang/String;)V"), 1);
        assert_eq!(param_count("([Ljava/lang/String;I)V"), 2);
    }
}
