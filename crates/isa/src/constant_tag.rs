// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

/// Constant-pool entry tags, per the JVM specification (§4.4). The
/// interpreter only ever consults `Integer` and `Methodref` entries;
/// the rest are here so the reader can skip an entry of any kind
/// without losing its place in the pool.
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ConstantTag {
    Utf8 = 1,
    Integer = 3,
    Float = 4,
    Long = 5,
    Double = 6,
    Class = 7,
    String = 8,
    Fieldref = 9,
    Methodref = 10,
    InterfaceMethodref = 11,
    NameAndType = 12,
    MethodHandle = 15,
    MethodType = 16,
    Dynamic = 17,
    InvokeDynamic = 18,
    Module = 19,
    Package = 20,
}

impl ConstantTag {
    pub fn from_byte(byte: u8) -> Option<Self> {
        use ConstantTag::*;
        let tag = match byte {
            1 => Utf8,
            3 => Integer,
            4 => Float,
            5 => Long,
            6 => Double,
            7 => Class,
            8 => String,
            9 => Fieldref,
            10 => Methodref,
            11 => InterfaceMethodref,
            12 => NameAndType,
            15 => MethodHandle,
            16 => MethodType,
            17 => Dynamic,
            18 => InvokeDynamic,
            19 => Module,
            20 => Package,
            _ => return None,
        };
        Some(tag)
    }

    /// `Long` and `Double` entries occupy two consecutive constant-pool
    /// indices (the second is left empty), a historical JVM wart we
    /// still have to respect when walking the pool.
    pub fn occupies_two_slots(&self) -> bool {
        matches!(self, ConstantTag::Long | ConstantTag::Double)
    }
}
