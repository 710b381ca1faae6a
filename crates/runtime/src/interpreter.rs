// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

use jvm_classfile::{ClassFile, MethodInfo};
use tracing::{trace, trace_span};

use crate::fault::fault;
use crate::heap::Heap;
use crate::instruction::{decode, Instruction, ReturnKind};
use crate::locals::LocalVars;
use crate::ops::{arithmetic, bitwise};
use crate::stack::OperandStack;

/// Execute `method`'s bytecode against `locals` and `heap`, recursing
/// into `invokestatic` targets with ordinary host-language calls — the
/// simplest faithful model, since a frame is never paused and resumed
/// at this tier. Returns the method's result: `None` for `return`,
/// `Some(v)` for `ireturn`/`areturn`.
pub fn execute(class_file: &ClassFile, method: &MethodInfo, mut locals: LocalVars, heap: &mut Heap) -> Option<i32> {
    let span = trace_span!("invoke", name = %method.name, descriptor = %method.descriptor);
    let _guard = span.enter();

    let code = method
        .code
        .as_ref()
        .unwrap_or_else(|| fault(format!("{}{} has no Code attribute", method.name, method.descriptor)));

    let mut stack = OperandStack::new(method.max_stack);
    let mut pc: usize = 0;

    loop {
        if pc >= code.len() {
            return None;
        }

        let (instruction, len) = decode(code, pc);
        trace!(pc, ?instruction, "dispatch");

        match instruction {
            Instruction::Nop => {}
            Instruction::IconstM1 => stack.push(-1),
            Instruction::Iconst0 => stack.push(0),
            Instruction::Iconst1 => stack.push(1),
            Instruction::Iconst2 => stack.push(2),
            Instruction::Iconst3 => stack.push(3),
            Instruction::Iconst4 => stack.push(4),
            Instruction::Iconst5 => stack.push(5),
            Instruction::BiPush(v) | Instruction::SiPush(v) => stack.push(v),
            Instruction::Ldc(index) => {
                let value = class_file
                    .constant_pool
                    .integer(index)
                    .unwrap_or_else(|error| fault(error));
                stack.push(value);
            }

            Instruction::Load(index) => stack.push(locals.get(index)),
            Instruction::Store(index) => {
                let value = stack.pop();
                locals.set(index, value);
            }
            Instruction::Dup => stack.dup(),

            Instruction::IAdd => binary_op(&mut stack, arithmetic::add),
            Instruction::ISub => binary_op(&mut stack, arithmetic::sub),
            Instruction::IMul => binary_op(&mut stack, arithmetic::mul),
            Instruction::IDiv => binary_op(&mut stack, arithmetic::div),
            Instruction::IRem => binary_op(&mut stack, arithmetic::rem),
            Instruction::INeg => {
                let a = stack.pop();
                stack.push(arithmetic::neg(a));
            }
            Instruction::IShl => binary_op(&mut stack, bitwise::shl),
            Instruction::IShr => binary_op(&mut stack, bitwise::shr),
            Instruction::IUshr => binary_op(&mut stack, bitwise::ushr),
            Instruction::IAnd => binary_op(&mut stack, bitwise::and),
            Instruction::IOr => binary_op(&mut stack, bitwise::or),
            Instruction::IXor => binary_op(&mut stack, bitwise::xor),
            Instruction::IInc { index, constant } => {
                let value = locals.get(index);
                locals.set(index, value.wrapping_add(constant));
            }

            Instruction::IfEq(offset) => {
                branch_if(&mut pc, code, offset, stack.pop() == 0);
                continue;
            }
            Instruction::IfNe(offset) => {
                branch_if(&mut pc, code, offset, stack.pop() != 0);
                continue;
            }
            Instruction::IfLt(offset) => {
                branch_if(&mut pc, code, offset, stack.pop() < 0);
                continue;
            }
            Instruction::IfGe(offset) => {
                branch_if(&mut pc, code, offset, stack.pop() >= 0);
                continue;
            }
            Instruction::IfGt(offset) => {
                branch_if(&mut pc, code, offset, stack.pop() > 0);
                continue;
            }
            Instruction::IfLe(offset) => {
                branch_if(&mut pc, code, offset, stack.pop() <= 0);
                continue;
            }
            Instruction::IfIcmpEq(offset) => {
                branch_if_cmp(&mut pc, code, offset, &mut stack, |a, b| a == b);
                continue;
            }
            Instruction::IfIcmpNe(offset) => {
                branch_if_cmp(&mut pc, code, offset, &mut stack, |a, b| a != b);
                continue;
            }
            Instruction::IfIcmpLt(offset) => {
                branch_if_cmp(&mut pc, code, offset, &mut stack, |a, b| a < b);
                continue;
            }
            Instruction::IfIcmpGe(offset) => {
                branch_if_cmp(&mut pc, code, offset, &mut stack, |a, b| a >= b);
                continue;
            }
            Instruction::IfIcmpGt(offset) => {
                branch_if_cmp(&mut pc, code, offset, &mut stack, |a, b| a > b);
                continue;
            }
            Instruction::IfIcmpLe(offset) => {
                branch_if_cmp(&mut pc, code, offset, &mut stack, |a, b| a <= b);
                continue;
            }
            Instruction::Goto(offset) => {
                pc = branch_target(code, pc, offset);
                continue;
            }

            Instruction::InvokeStatic(index) => {
                let target = class_file
                    .find_method_from_index(index)
                    .unwrap_or_else(|error| fault(error));
                let param_count = target.param_count();

                let mut params = vec![0i32; param_count];
                for slot in params.iter_mut().rev() {
                    *slot = stack.pop();
                }

                let callee_locals = LocalVars::with_params(target.max_locals, &params);
                if let Some(result) = execute(class_file, target, callee_locals, heap) {
                    stack.push(result);
                }
            }
            Instruction::Return(ReturnKind::Value) => return Some(stack.pop()),
            Instruction::Return(ReturnKind::Void) => return None,

            // getstatic's only role in this subset is loading
            // `System.out` ahead of a println; there is no field slot
            // to push, so there is nothing to do.
            Instruction::GetStatic => {}
            Instruction::InvokeVirtual => {
                let value = stack.pop();
                println!("{value}");
            }

            Instruction::NewArray => {
                let n = stack.pop();
                if n < 0 {
                    fault(format!("newarray with negative size {n}"));
                }
                let mut array = vec![0i32; n as usize + 1];
                array[0] = n;
                let reference = heap.allocate(array);
                stack.push(reference as i32);
            }
            Instruction::ArrayLength => {
                let reference = stack.pop() as u32;
                stack.push(heap.lookup(reference)[0]);
            }
            Instruction::IaStore => {
                let value = stack.pop();
                let index = stack.pop();
                let reference = stack.pop() as u32;
                let array = heap.lookup_mut(reference);
                let slot = array
                    .get_mut(index as usize + 1)
                    .unwrap_or_else(|| fault(format!("array index {index} out of bounds")));
                *slot = value;
            }
            Instruction::IaLoad => {
                let index = stack.pop();
                let reference = stack.pop() as u32;
                let array = heap.lookup(reference);
                let value = *array
                    .get(index as usize + 1)
                    .unwrap_or_else(|| fault(format!("array index {index} out of bounds")));
                stack.push(value);
            }
        }

        pc += len;
    }
}

fn binary_op(stack: &mut OperandStack, op: impl FnOnce(i32, i32) -> i32) {
    let b = stack.pop();
    let a = stack.pop();
    stack.push(op(a, b));
}

/// Branches in this subset are measured from the branching opcode's
/// own address, not from the end of its 3-byte encoding.
fn branch_target(code: &[u8], opcode_pc: usize, offset: i16) -> usize {
    let target = opcode_pc as i64 + offset as i64;
    if target < 0 || target as usize > code.len() {
        fault(format!("branch target {target} is outside the code array"));
    }
    target as usize
}

fn branch_if(pc: &mut usize, code: &[u8], offset: i16, condition: bool) {
    if condition {
        *pc = branch_target(code, *pc, offset);
    } else {
        *pc += 3;
    }
}

fn branch_if_cmp(pc: &mut usize, code: &[u8], offset: i16, stack: &mut OperandStack, cmp: impl FnOnce(i32, i32) -> bool) {
    let b = stack.pop();
    let a = stack.pop();
    branch_if(pc, code, offset, cmp(a, b));
}

#[cfg(test)]
mod tests {
    use super::*;
    use jvm_classfile::ClassFile;
    use pretty_assertions::assert_eq;

    fn write_utf8(bytes: &mut Vec<u8>, s: &str) {
        bytes.push(1);
        bytes.extend((s.len() as u16).to_be_bytes());
        bytes.extend(s.as_bytes());
    }

    /// Build a one-method class file whose `main(I)I` body is `code`,
    /// with the given `max_stack`/`max_locals`.
    fn class_with_main(code: &[u8], max_stack: u16, max_locals: u16) -> ClassFile {
        let mut bytes = Vec::new();
        bytes.extend(0xCAFE_BABEu32.to_be_bytes());
        bytes.extend(0u16.to_be_bytes());
        bytes.extend(52u16.to_be_bytes());

        bytes.extend(4u16.to_be_bytes());
        write_utf8(&mut bytes, "main");
        write_utf8(&mut bytes, "(I)I");
        write_utf8(&mut bytes, "Code");

        bytes.extend(0u16.to_be_bytes());
        bytes.extend(0u16.to_be_bytes());
        bytes.extend(0u16.to_be_bytes());

        bytes.extend(0u16.to_be_bytes());
        bytes.extend(0u16.to_be_bytes());

        bytes.extend(1u16.to_be_bytes());
        bytes.extend(0u16.to_be_bytes());
        bytes.extend(1u16.to_be_bytes());
        bytes.extend(2u16.to_be_bytes());
        bytes.extend(1u16.to_be_bytes());

        bytes.extend(3u16.to_be_bytes());
        let body_len = 2 + 2 + 4 + code.len() + 2 + 2;
        bytes.extend((body_len as u32).to_be_bytes());
        bytes.extend(max_stack.to_be_bytes());
        bytes.extend(max_locals.to_be_bytes());
        bytes.extend((code.len() as u32).to_be_bytes());
        bytes.extend(code);
        bytes.extend(0u16.to_be_bytes());
        bytes.extend(0u16.to_be_bytes());

        bytes.extend(0u16.to_be_bytes());

        ClassFile::parse(&bytes).unwrap()
    }

    fn run(code: &[u8], max_stack: u16, max_locals: u16, params: &[i32]) -> Option<i32> {
        let class_file = class_with_main(code, max_stack, max_locals);
        let method = class_file.find_method("main", "(I)I").unwrap();
        let locals = LocalVars::with_params(max_locals, params);
        let mut heap = Heap::new();
        execute(&class_file, method, locals, &mut heap)
    }

    /// Build a two-method class file: `main()I` calling `mul(II)I` via
    /// `invokestatic` on constant-pool index 7, and `mul`'s own body.
    /// `main_code` is free to reference that Methodref index.
    fn class_with_main_and_mul(main_code: &[u8], mul_code: &[u8]) -> ClassFile {
        fn code_attribute(code_name_index: u16, max_stack: u16, max_locals: u16, code: &[u8]) -> Vec<u8> {
            let mut attr = Vec::new();
            attr.extend(code_name_index.to_be_bytes());
            let body_len = 2 + 2 + 4 + code.len() + 2 + 2;
            attr.extend((body_len as u32).to_be_bytes());
            attr.extend(max_stack.to_be_bytes());
            attr.extend(max_locals.to_be_bytes());
            attr.extend((code.len() as u32).to_be_bytes());
            attr.extend(code);
            attr.extend(0u16.to_be_bytes()); // exception_table_length
            attr.extend(0u16.to_be_bytes()); // code attributes_count
            attr
        }

        let mut bytes = Vec::new();
        bytes.extend(0xCAFE_BABEu32.to_be_bytes());
        bytes.extend(0u16.to_be_bytes());
        bytes.extend(52u16.to_be_bytes());

        // 1=Utf8 "main", 2=Utf8 "()I", 3=Utf8 "Code", 4=Utf8 "mul",
        // 5=Utf8 "(II)I", 6=NameAndType{4,5}, 7=Methodref{0,6}
        bytes.extend(8u16.to_be_bytes());
        write_utf8(&mut bytes, "main");
        write_utf8(&mut bytes, "()I");
        write_utf8(&mut bytes, "Code");
        write_utf8(&mut bytes, "mul");
        write_utf8(&mut bytes, "(II)I");
        bytes.push(12); // NameAndType
        bytes.extend(4u16.to_be_bytes());
        bytes.extend(5u16.to_be_bytes());
        bytes.push(10); // Methodref
        bytes.extend(0u16.to_be_bytes()); // class_index, never dereferenced
        bytes.extend(6u16.to_be_bytes());

        bytes.extend(0u16.to_be_bytes()); // access_flags
        bytes.extend(0u16.to_be_bytes()); // this_class
        bytes.extend(0u16.to_be_bytes()); // super_class
        bytes.extend(0u16.to_be_bytes()); // interfaces_count
        bytes.extend(0u16.to_be_bytes()); // fields_count

        bytes.extend(2u16.to_be_bytes()); // methods_count

        bytes.extend(0u16.to_be_bytes()); // access_flags
        bytes.extend(1u16.to_be_bytes()); // name_index -> "main"
        bytes.extend(2u16.to_be_bytes()); // descriptor_index -> "()I"
        bytes.extend(1u16.to_be_bytes()); // attributes_count
        bytes.extend(code_attribute(3, 2, 0, main_code));

        bytes.extend(0u16.to_be_bytes()); // access_flags
        bytes.extend(4u16.to_be_bytes()); // name_index -> "mul"
        bytes.extend(5u16.to_be_bytes()); // descriptor_index -> "(II)I"
        bytes.extend(1u16.to_be_bytes()); // attributes_count
        bytes.extend(code_attribute(3, 2, 2, mul_code));

        bytes.extend(0u16.to_be_bytes()); // class attributes_count

        ClassFile::parse(&bytes).unwrap()
    }

    #[test]
    fn e5_static_call_with_two_parameters() {
        // main: bipush 6, bipush 7, invokestatic #7 (mul), ireturn
        let main_code = [0x10, 6, 0x10, 7, 0xb8, 0x00, 0x07, 0xac];
        // mul: iload_0, iload_1, imul, ireturn
        let mul_code = [0x1a, 0x1b, 0x68, 0xac];

        let class_file = class_with_main_and_mul(&main_code, &mul_code);
        let main = class_file.find_method("main", "()I").unwrap();
        let locals = LocalVars::with_params(0, &[]);
        let mut heap = Heap::new();

        let result = execute(&class_file, main, locals, &mut heap);
        assert_eq!(result, Some(42));
    }

    #[test]
    fn e1_constants_and_addition() {
        // iconst_3, iconst_4, iadd, ireturn
        let result = run(&[0x06, 0x07, 0x60, 0xac], 2, 0, &[]);
        assert_eq!(result, Some(7));
    }

    #[test]
    fn e2_subtraction_ordering() {
        // bipush 10, bipush 3, isub, ireturn: stack order a=10,b=3 -> 7
        let result = run(&[0x10, 10, 0x10, 3, 0x64, 0xac], 2, 0, &[]);
        assert_eq!(result, Some(7));
    }

    #[test]
    #[should_panic(expected = "division by zero")]
    fn e3_division_by_zero_traps() {
        // bipush 5, bipush 0, idiv
        run(&[0x10, 5, 0x10, 0, 0x6c, 0xac], 2, 0, &[]);
    }

    #[test]
    fn e4_loop_via_iinc_and_if_icmplt_sums_one_to_ten() {
        // locals: 0 = i, 1 = sum
        // loop: iload_0, bipush 11, if_icmpge done(+11), iload_1, iload_0, iadd, istore_1,
        //       iinc 0 1, goto loop(-13), done: iload_1, ireturn
        let code: Vec<u8> = vec![
            0x1a, // iload_0
            0x10, 11, // bipush 11
            0xa2, 0x00, 0x0d, // if_icmpge +13 -> done
            0x1b, // iload_1
            0x1a, // iload_0
            0x60, // iadd
            0x3c, // istore_1
            0x84, 0, 1, // iinc 0, 1
            0xa7, 0xff, 0xf3, // goto -13 (back to iload_0 at offset 0)
            0x1b, // done: iload_1
            0xac, // ireturn
        ];
        let result = run(&code, 4, 2, &[1]);
        assert_eq!(result, Some(55));
    }

    #[test]
    fn newarray_store_load_and_length_round_trip() {
        // bipush 4, newarray 10 (int), dup, bipush 0, bipush 10, iastore,
        // dup, arraylength, pop via ireturn of arraylength directly
        let code: Vec<u8> = vec![
            0x10, 4, // bipush 4
            0xbc, 10, // newarray int
            0x59, // dup
            0x10, 0, // bipush 0
            0x10, 10, // bipush 10
            0x4f, // iastore
            0xbe, // arraylength
            0xac, // ireturn
        ];
        let result = run(&code, 4, 0, &[]);
        assert_eq!(result, Some(4));
    }
}
