// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

use crate::fault::fault;

/// A frame's local-variable array: a fixed-size, zero-initialized
/// sequence of Signed32 slots, sized per method (`max_locals`).
/// Parameters occupy the lowest indices, in declaration order.
#[derive(Debug)]
pub struct LocalVars {
    slots: Vec<i32>,
}

impl LocalVars {
    /// Build a zero-filled frame and copy `params` into the lowest
    /// slots, in order — the marshalling contract `invokestatic` and
    /// the entry point both rely on.
    pub fn with_params(max_locals: u16, params: &[i32]) -> Self {
        let mut slots = vec![0i32; max_locals as usize];
        if params.len() > slots.len() {
            fault(format!(
                "{} parameters do not fit in {} local slots",
                params.len(),
                max_locals
            ));
        }
        slots[..params.len()].copy_from_slice(params);
        Self { slots }
    }

    pub fn get(&self, index: u8) -> i32 {
        *self
            .slots
            .get(index as usize)
            .unwrap_or_else(|| fault(format!("local variable index {index} out of range")))
    }

    pub fn set(&mut self, index: u8, value: i32) {
        let slot = self
            .slots
            .get_mut(index as usize)
            .unwrap_or_else(|| fault(format!("local variable index {index} out of range")));
        *slot = value;
    }
}
