// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

use jvm_isa::ConstantTag;

use crate::error::ClassFileError;
use crate::reader::ClassReader;

/// One decoded constant-pool entry. The interpreter only ever reads
/// `Integer` (via `ldc`) and resolves `Methodref` (via `invokestatic`),
/// but every tag the JVM spec defines is represented here so the pool
/// can be walked without losing alignment on an entry kind the
/// interpreter itself never touches.
#[derive(Debug, Clone)]
pub enum ConstantPoolEntry {
    Utf8(String),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class { name_index: u16 },
    String { string_index: u16 },
    Fieldref { class_index: u16, name_and_type_index: u16 },
    Methodref { class_index: u16, name_and_type_index: u16 },
    InterfaceMethodref { class_index: u16, name_and_type_index: u16 },
    NameAndType { name_index: u16, descriptor_index: u16 },
    MethodHandle { reference_kind: u8, reference_index: u16 },
    MethodType { descriptor_index: u16 },
    Dynamic { bootstrap_method_attr_index: u16, name_and_type_index: u16 },
    InvokeDynamic { bootstrap_method_attr_index: u16, name_and_type_index: u16 },
    Module { name_index: u16 },
    Package { name_index: u16 },
}

impl ConstantPoolEntry {
    fn kind_name(&self) -> &'static str {
        match self {
            ConstantPoolEntry::Utf8(_) => "Utf8",
            ConstantPoolEntry::Integer(_) => "Integer",
            ConstantPoolEntry::Float(_) => "Float",
            ConstantPoolEntry::Long(_) => "Long",
            ConstantPoolEntry::Double(_) => "Double",
            ConstantPoolEntry::Class { .. } => "Class",
            ConstantPoolEntry::String { .. } => "String",
            ConstantPoolEntry::Fieldref { .. } => "Fieldref",
            ConstantPoolEntry::Methodref { .. } => "Methodref",
            ConstantPoolEntry::InterfaceMethodref { .. } => "InterfaceMethodref",
            ConstantPoolEntry::NameAndType { .. } => "NameAndType",
            ConstantPoolEntry::MethodHandle { .. } => "MethodHandle",
            ConstantPoolEntry::MethodType { .. } => "MethodType",
            ConstantPoolEntry::Dynamic { .. } => "Dynamic",
            ConstantPoolEntry::InvokeDynamic { .. } => "InvokeDynamic",
            ConstantPoolEntry::Module { .. } => "Module",
            ConstantPoolEntry::Package { .. } => "Package",
        }
    }
}

/// The class file's constant pool, indexed from 1. Index 0, and the
/// second slot of every `Long`/`Double` entry, are `None`.
#[derive(Debug, Default)]
pub struct ConstantPool {
    entries: Vec<Option<ConstantPoolEntry>>,
}

impl ConstantPool {
    /// Parse `count - 1` entries (the JVM's `constant_pool_count` is
    /// one more than the number of real entries, because the table is
    /// 1-indexed).
    pub fn parse(reader: &mut ClassReader, count: u16) -> Result<Self, ClassFileError> {
        let mut entries: Vec<Option<ConstantPoolEntry>> = vec![None];

        let mut index = 1u16;
        while index < count {
            let tag_byte = reader.read_u8()?;
            let tag =
                ConstantTag::from_byte(tag_byte).ok_or(ClassFileError::UnknownConstantTag(index, tag_byte))?;

            let entry = match tag {
                ConstantTag::Utf8 => {
                    let len = reader.read_u16()? as usize;
                    let bytes = reader.read_bytes(len)?;
                    ConstantPoolEntry::Utf8(String::from_utf8_lossy(bytes).into_owned())
                }
                ConstantTag::Integer => ConstantPoolEntry::Integer(reader.read_i32()?),
                ConstantTag::Float => ConstantPoolEntry::Float(f32::from_bits(reader.read_u32()?)),
                ConstantTag::Long => {
                    let high = reader.read_u32()? as u64;
                    let low = reader.read_u32()? as u64;
                    ConstantPoolEntry::Long(((high << 32) | low) as i64)
                }
                ConstantTag::Double => {
                    let high = reader.read_u32()? as u64;
                    let low = reader.read_u32()? as u64;
                    ConstantPoolEntry::Double(f64::from_bits((high << 32) | low))
                }
                ConstantTag::Class => ConstantPoolEntry::Class {
                    name_index: reader.read_u16()?,
                },
                ConstantTag::String => ConstantPoolEntry::String {
                    string_index: reader.read_u16()?,
                },
                ConstantTag::Fieldref => ConstantPoolEntry::Fieldref {
                    class_index: reader.read_u16()?,
                    name_and_type_index: reader.read_u16()?,
                },
                ConstantTag::Methodref => ConstantPoolEntry::Methodref {
                    class_index: reader.read_u16()?,
                    name_and_type_index: reader.read_u16()?,
                },
                ConstantTag::InterfaceMethodref => ConstantPoolEntry::InterfaceMethodref {
                    class_index: reader.read_u16()?,
                    name_and_type_index: reader.read_u16()?,
                },
                ConstantTag::NameAndType => ConstantPoolEntry::NameAndType {
                    name_index: reader.read_u16()?,
                    descriptor_index: reader.read_u16()?,
                },
                ConstantTag::MethodHandle => ConstantPoolEntry::MethodHandle {
                    reference_kind: reader.read_u8()?,
                    reference_index: reader.read_u16()?,
                },
                ConstantTag::MethodType => ConstantPoolEntry::MethodType {
                    descriptor_index: reader.read_u16()?,
                },
                ConstantTag::Dynamic => ConstantPoolEntry::Dynamic {
                    bootstrap_method_attr_index: reader.read_u16()?,
                    name_and_type_index: reader.read_u16()?,
                },
                ConstantTag::InvokeDynamic => ConstantPoolEntry::InvokeDynamic {
                    bootstrap_method_attr_index: reader.read_u16()?,
                    name_and_type_index: reader.read_u16()?,
                },
                ConstantTag::Module => ConstantPoolEntry::Module {
                    name_index: reader.read_u16()?,
                },
                ConstantTag::Package => ConstantPoolEntry::Package {
                    name_index: reader.read_u16()?,
                },
            };

            let occupies_two = tag.occupies_two_slots();
            entries.push(Some(entry));
            index += 1;
            if occupies_two {
                // the JVM spec reserves, but never fills, the slot
                // right after a Long/Double entry.
                entries.push(None);
                index += 1;
            }
        }

        Ok(Self { entries })
    }

    fn entry(&self, index: u16) -> Result<&ConstantPoolEntry, ClassFileError> {
        self.entries
            .get(index as usize)
            .and_then(|slot| slot.as_ref())
            .ok_or(ClassFileError::ConstantPoolIndexOutOfRange(index))
    }

    pub fn utf8(&self, index: u16) -> Result<&str, ClassFileError> {
        match self.entry(index)? {
            ConstantPoolEntry::Utf8(s) => Ok(s),
            other => Err(ClassFileError::WrongConstantKind {
                index,
                found: other.kind_name(),
                expected: "Utf8",
            }),
        }
    }

    pub fn integer(&self, index: u16) -> Result<i32, ClassFileError> {
        match self.entry(index)? {
            ConstantPoolEntry::Integer(v) => Ok(*v),
            other => Err(ClassFileError::WrongConstantKind {
                index,
                found: other.kind_name(),
                expected: "Integer",
            }),
        }
    }

    /// Resolve a `Methodref` entry down to the `(name, descriptor)` of
    /// the method it names, following `Methodref -> NameAndType -> Utf8`.
    pub fn method_name_and_descriptor(&self, index: u16) -> Result<(&str, &str), ClassFileError> {
        let name_and_type_index = match self.entry(index)? {
            ConstantPoolEntry::Methodref { name_and_type_index, .. } => *name_and_type_index,
            other => {
                return Err(ClassFileError::WrongConstantKind {
                    index,
                    found: other.kind_name(),
                    expected: "Methodref",
                })
            }
        };

        let (name_index, descriptor_index) = match self.entry(name_and_type_index)? {
            ConstantPoolEntry::NameAndType { name_index, descriptor_index } => {
                (*name_index, *descriptor_index)
            }
            other => {
                return Err(ClassFileError::WrongConstantKind {
                    index: name_and_type_index,
                    found: other.kind_name(),
                    expected: "NameAndType",
                })
            }
        };

        Ok((self.utf8(name_index)?, self.utf8(descriptor_index)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pool_from(bytes: &[u8], count: u16) -> ConstantPool {
        let mut reader = ClassReader::new(bytes);
        ConstantPool::parse(&mut reader, count).unwrap()
    }

    #[test]
    fn long_entry_does_not_shift_the_index_of_what_follows() {
        // entry 1: Long (tag 5, 8 bytes), entry 3 (note the skip): Integer 7
        let bytes = [
            5, 0, 0, 0, 0, 0, 0, 0, 1, // Long = 1
            3, 0, 0, 0, 7, // Integer = 7
        ];
        let pool = pool_from(&bytes, 4);
        assert_eq!(pool.integer(3).unwrap(), 7);
    }

    #[test]
    fn resolves_methodref_to_name_and_descriptor() {
        // 1: Methodref{class=2, nat=3}; 2: Class{name=4}; 3: NameAndType{name=5, desc=6};
        // 4: Utf8 "Main"; 5: Utf8 "mul"; 6: Utf8 "(II)I"
        let mut bytes = Vec::new();
        bytes.extend([10, 0, 2, 0, 3]); // Methodref
        bytes.extend([7, 0, 4]); // Class
        bytes.extend([12, 0, 5, 0, 6]); // NameAndType
        bytes.extend([1, 0, 4]);
        bytes.extend(b"Main");
        bytes.extend([1, 0, 3]);
        bytes.extend(b"mul");
        bytes.extend([1, 0, 5]);
        bytes.extend(b"(II)I");

        let pool = pool_from(&bytes, 7);
        let (name, descriptor) = pool.method_name_and_descriptor(1).unwrap();
        assert_eq!(name, "mul");
        assert_eq!(descriptor, "(II)I");
    }

    #[test]
    fn unknown_tag_is_a_typed_error_not_a_panic() {
        let mut reader = ClassReader::new(&[0xFF]);
        assert!(matches!(
            ConstantPool::parse(&mut reader, 2),
            Err(ClassFileError::UnknownConstantTag(1, 0xFF))
        ));
    }
}
