// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

use tracing::debug;

use crate::constant_pool::ConstantPool;
use crate::error::ClassFileError;
use crate::method::MethodInfo;
use crate::reader::ClassReader;

const CLASS_MAGIC: u32 = 0xCAFE_BABE;

/// A class file, reduced to what the interpreter needs to find and
/// run a method: its constant pool (kept around so `Methodref`
/// operands in bytecode can be resolved later) and its methods.
///
/// Everything else the format carries — access flags, the
/// superclass/interfaces hierarchy, fields, class-level attributes —
/// is read just far enough to stay aligned in the byte stream, then
/// discarded. This interpreter never instantiates objects or walks an
/// inheritance chain, so none of it has anywhere to go.
#[derive(Debug)]
pub struct ClassFile {
    pub constant_pool: ConstantPool,
    pub methods: Vec<MethodInfo>,
}

impl ClassFile {
    pub fn parse(bytes: &[u8]) -> Result<Self, ClassFileError> {
        let mut reader = ClassReader::new(bytes);

        let magic = reader.read_u32()?;
        if magic != CLASS_MAGIC {
            return Err(ClassFileError::BadMagic);
        }

        let minor_version = reader.read_u16()?;
        let major_version = reader.read_u16()?;
        debug!(minor_version, major_version, "read class file header");

        let constant_pool_count = reader.read_u16()?;
        let constant_pool = ConstantPool::parse(&mut reader, constant_pool_count)?;

        let _access_flags = reader.read_u16()?;
        let _this_class = reader.read_u16()?;
        let _super_class = reader.read_u16()?;

        let interfaces_count = reader.read_u16()?;
        for _ in 0..interfaces_count {
            reader.read_u16()?;
        }

        let fields_count = reader.read_u16()?;
        for _ in 0..fields_count {
            skip_member(&mut reader)?;
        }

        let methods_count = reader.read_u16()?;
        let mut methods = Vec::with_capacity(methods_count as usize);
        for _ in 0..methods_count {
            methods.push(parse_method(&mut reader, &constant_pool)?);
        }

        let class_attributes_count = reader.read_u16()?;
        for _ in 0..class_attributes_count {
            skip_attribute(&mut reader)?;
        }

        Ok(Self { constant_pool, methods })
    }

    /// Locate a method by name and descriptor, and reject it unless it
    /// carries a `Code` attribute — abstract or native methods have no
    /// bytecode for this interpreter to run.
    pub fn find_method(&self, name: &str, descriptor: &str) -> Result<&MethodInfo, ClassFileError> {
        let method = self
            .methods
            .iter()
            .find(|m| m.name == name && m.descriptor == descriptor)
            .ok_or_else(|| ClassFileError::MethodNotFound {
                name: name.to_string(),
                descriptor: descriptor.to_string(),
            })?;

        if method.code.is_none() {
            return Err(ClassFileError::MissingCodeAttribute {
                name: name.to_string(),
                descriptor: descriptor.to_string(),
            });
        }

        Ok(method)
    }

    /// Resolve a `Methodref` constant-pool index (as found in an
    /// `invokestatic` operand) to the method it names.
    pub fn find_method_from_index(&self, methodref_index: u16) -> Result<&MethodInfo, ClassFileError> {
        let (name, descriptor) = self.constant_pool.method_name_and_descriptor(methodref_index)?;
        let (name, descriptor) = (name.to_string(), descriptor.to_string());
        self.find_method(&name, &descriptor)
    }
}

/// Skip a `field_info` or a `method_info`'s common prefix
/// (`access_flags`, `name_index`, `descriptor_index`) plus its
/// attributes, used for fields (whose attributes we never need).
fn skip_member(reader: &mut ClassReader) -> Result<(), ClassFileError> {
    let _access_flags = reader.read_u16()?;
    let _name_index = reader.read_u16()?;
    let _descriptor_index = reader.read_u16()?;
    let attributes_count = reader.read_u16()?;
    for _ in 0..attributes_count {
        skip_attribute(reader)?;
    }
    Ok(())
}

fn parse_method(reader: &mut ClassReader, constant_pool: &ConstantPool) -> Result<MethodInfo, ClassFileError> {
    let _access_flags = reader.read_u16()?;
    let name_index = reader.read_u16()?;
    let descriptor_index = reader.read_u16()?;
    let name = constant_pool.utf8(name_index)?.to_string();
    let descriptor = constant_pool.utf8(descriptor_index)?.to_string();

    let attributes_count = reader.read_u16()?;
    let mut max_stack = 0u16;
    let mut max_locals = 0u16;
    let mut code = None;

    for _ in 0..attributes_count {
        let attribute_name_index = reader.read_u16()?;
        let attribute_length = reader.read_u32()?;
        let attribute_name = constant_pool.utf8(attribute_name_index)?;

        if attribute_name == "Code" {
            max_stack = reader.read_u16()?;
            max_locals = reader.read_u16()?;
            let code_length = reader.read_u32()? as usize;
            code = Some(reader.read_bytes(code_length)?.to_vec());

            let exception_table_length = reader.read_u16()?;
            for _ in 0..exception_table_length {
                reader.skip(8)?; // start_pc, end_pc, handler_pc, catch_type
            }

            let code_attributes_count = reader.read_u16()?;
            for _ in 0..code_attributes_count {
                skip_attribute(reader)?;
            }
        } else {
            reader.skip(attribute_length as usize)?;
        }
    }

    Ok(MethodInfo {
        name,
        descriptor,
        max_stack,
        max_locals,
        code,
    })
}

fn skip_attribute(reader: &mut ClassReader) -> Result<(), ClassFileError> {
    let _attribute_name_index = reader.read_u16()?;
    let attribute_length = reader.read_u32()?;
    reader.skip(attribute_length as usize)
}
