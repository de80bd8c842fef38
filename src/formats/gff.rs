//! 通用结构化资源格式 (GFF V3.2)
//!
//! utc/uti/dlg/are 等资源都使用这一容器格式，
//! 这里只关心字段树本身，不解释字段含义。

use byteorder::{LittleEndian, WriteBytesExt};
use std::cell::Cell;
use std::collections::{BTreeMap, HashMap};

use super::reader::{BinaryReader, fixed_string_bytes};
use crate::error::{Error, Result};
use crate::utils::{decode_cp1252, encode_cp1252};

const HEADER_SIZE: usize = 56;
const MAX_DEPTH: usize = 128;
const ROOT_STRUCT_ID: u32 = 0xFFFF_FFFF;

/// 字段类型及其在文件中的编号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GffFieldType {
    UInt8 = 0,
    Int8 = 1,
    UInt16 = 2,
    Int16 = 3,
    UInt32 = 4,
    Int32 = 5,
    UInt64 = 6,
    Int64 = 7,
    Single = 8,
    Double = 9,
    String = 10,
    ResRef = 11,
    LocString = 12,
    Binary = 13,
    Struct = 14,
    List = 15,
    Vector4 = 16,
    Vector3 = 17,
}

impl GffFieldType {
    fn from_id(id: u32) -> Result<Self> {
        use GffFieldType::*;
        Ok(match id {
            0 => UInt8,
            1 => Int8,
            2 => UInt16,
            3 => Int16,
            4 => UInt32,
            5 => Int32,
            6 => UInt64,
            7 => Int64,
            8 => Single,
            9 => Double,
            10 => String,
            11 => ResRef,
            12 => LocString,
            13 => Binary,
            14 => Struct,
            15 => List,
            16 => Vector4,
            17 => Vector3,
            other => return Err(Error::invalid("GFF", format!("未知字段类型 {other}"))),
        })
    }

    /// 补丁定义中 `FieldType=` 使用的名称
    pub fn patch_name(self) -> Option<&'static str> {
        use GffFieldType::*;
        Some(match self {
            UInt8 => "Byte",
            Int8 => "Char",
            UInt16 => "Word",
            Int16 => "Short",
            UInt32 => "DWORD",
            Int32 => "Int",
            Int64 => "Int64",
            Single => "Float",
            Double => "Double",
            String => "ExoString",
            ResRef => "ResRef",
            LocString => "ExoLocString",
            Struct => "Struct",
            List => "List",
            Vector4 => "Orientation",
            Vector3 => "Position",
            UInt64 | Binary => return None,
        })
    }
}

/// 本地化字符串，子串键为 `语言 * 2 + 性别`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalizedString {
    pub stringref: i32,
    pub substrings: BTreeMap<u32, String>,
}

impl LocalizedString {
    pub fn from_stringref(stringref: i32) -> Self {
        Self {
            stringref,
            substrings: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GffValue {
    UInt8(u8),
    Int8(i8),
    UInt16(u16),
    Int16(i16),
    UInt32(u32),
    Int32(i32),
    UInt64(u64),
    Int64(i64),
    Single(f32),
    Double(f64),
    String(String),
    ResRef(String),
    LocString(LocalizedString),
    Binary(Vec<u8>),
    Struct(GffStruct),
    List(Vec<GffStruct>),
    Vector4([f32; 4]),
    Vector3([f32; 3]),
}

impl GffValue {
    pub fn field_type(&self) -> GffFieldType {
        match self {
            GffValue::UInt8(_) => GffFieldType::UInt8,
            GffValue::Int8(_) => GffFieldType::Int8,
            GffValue::UInt16(_) => GffFieldType::UInt16,
            GffValue::Int16(_) => GffFieldType::Int16,
            GffValue::UInt32(_) => GffFieldType::UInt32,
            GffValue::Int32(_) => GffFieldType::Int32,
            GffValue::UInt64(_) => GffFieldType::UInt64,
            GffValue::Int64(_) => GffFieldType::Int64,
            GffValue::Single(_) => GffFieldType::Single,
            GffValue::Double(_) => GffFieldType::Double,
            GffValue::String(_) => GffFieldType::String,
            GffValue::ResRef(_) => GffFieldType::ResRef,
            GffValue::LocString(_) => GffFieldType::LocString,
            GffValue::Binary(_) => GffFieldType::Binary,
            GffValue::Struct(_) => GffFieldType::Struct,
            GffValue::List(_) => GffFieldType::List,
            GffValue::Vector4(_) => GffFieldType::Vector4,
            GffValue::Vector3(_) => GffFieldType::Vector3,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GffField {
    pub label: String,
    pub value: GffValue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GffStruct {
    pub struct_id: u32,
    pub fields: Vec<GffField>,
}

impl GffStruct {
    pub fn new(struct_id: u32) -> Self {
        Self {
            struct_id,
            fields: Vec::new(),
        }
    }

    pub fn with(mut self, label: impl Into<String>, value: GffValue) -> Self {
        self.set(label, value);
        self
    }

    /// 设置字段，同名字段会被覆盖
    pub fn set(&mut self, label: impl Into<String>, value: GffValue) {
        let label = label.into();
        match self.fields.iter_mut().find(|f| f.label == label) {
            Some(field) => field.value = value,
            None => self.fields.push(GffField { label, value }),
        }
    }

    pub fn get(&self, label: &str) -> Option<&GffValue> {
        self.fields.iter().find(|f| f.label == label).map(|f| &f.value)
    }
}

/// 一个完整的 GFF 资源
#[derive(Debug, Clone, PartialEq)]
pub struct Gff {
    /// 四字节内容类型，例如 `UTC `
    pub content_type: String,
    pub root: GffStruct,
}

impl Gff {
    pub fn new(content_type: &str) -> Self {
        Self {
            content_type: content_type.to_string(),
            root: GffStruct::new(ROOT_STRUCT_ID),
        }
    }

    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = BinaryReader::new(data);
        let content_type = reader.read_fixed_string(4)?;
        reader.expect_magic(b"V3.2", "GFF")?;

        let header = GffHeader::read(&mut reader)?;
        let parser = GffParser {
            data,
            header,
            materialized: Cell::new(0),
        };
        let root = parser.read_struct(0, 0)?;
        Ok(Self { content_type, root })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut builder = GffBuilder::default();
        builder.write_struct(&self.root)?;
        builder.finish(&self.content_type)
    }
}

#[derive(Debug)]
struct GffHeader {
    struct_offset: usize,
    struct_count: usize,
    field_offset: usize,
    field_count: usize,
    label_offset: usize,
    label_count: usize,
    field_data_offset: usize,
    field_indices_offset: usize,
    list_indices_offset: usize,
}

impl GffHeader {
    fn read(reader: &mut BinaryReader<'_>) -> Result<Self> {
        let mut next = || -> Result<usize> { Ok(reader.read_u32()? as usize) };
        let struct_offset = next()?;
        let struct_count = next()?;
        let field_offset = next()?;
        let field_count = next()?;
        let label_offset = next()?;
        let label_count = next()?;
        let field_data_offset = next()?;
        let _field_data_size = next()?;
        let field_indices_offset = next()?;
        let _field_indices_size = next()?;
        let list_indices_offset = next()?;
        let _list_indices_size = next()?;
        Ok(Self {
            struct_offset,
            struct_count,
            field_offset,
            field_count,
            label_offset,
            label_count,
            field_data_offset,
            field_indices_offset,
            list_indices_offset,
        })
    }
}

struct GffParser<'a> {
    data: &'a [u8],
    header: GffHeader,
    /// 已展开的结构数量，不能超过文件中的结构总数
    materialized: Cell<usize>,
}

impl GffParser<'_> {
    fn at(&self, offset: usize) -> Result<BinaryReader<'_>> {
        let mut reader = BinaryReader::new(self.data);
        reader.seek(offset)?;
        Ok(reader)
    }

    fn read_struct(&self, index: usize, depth: usize) -> Result<GffStruct> {
        if depth > MAX_DEPTH {
            return Err(Error::invalid("GFF", "结构嵌套过深，可能存在循环引用"));
        }
        if index >= self.header.struct_count {
            return Err(Error::invalid("GFF", format!("结构索引 {index} 越界")));
        }
        let materialized = self.materialized.get() + 1;
        if materialized > self.header.struct_count {
            return Err(Error::invalid("GFF", format!("结构 {index} 被重复引用")));
        }
        self.materialized.set(materialized);

        let mut reader = self.at(self.header.struct_offset + index * 12)?;
        let struct_id = reader.read_u32()?;
        let data = reader.read_u32()? as usize;
        let field_count = reader.read_u32()? as usize;

        let field_indices = match field_count {
            0 => Vec::new(),
            1 => vec![data],
            _ => {
                let mut indices = self.at(self.header.field_indices_offset + data)?;
                (0..field_count)
                    .map(|_| Ok(indices.read_u32()? as usize))
                    .collect::<Result<Vec<_>>>()?
            }
        };

        let mut fields = Vec::with_capacity(field_indices.len());
        for field_index in field_indices {
            fields.push(self.read_field(field_index, depth)?);
        }
        Ok(GffStruct { struct_id, fields })
    }

    fn read_field(&self, index: usize, depth: usize) -> Result<GffField> {
        if index >= self.header.field_count {
            return Err(Error::invalid("GFF", format!("字段索引 {index} 越界")));
        }
        let mut reader = self.at(self.header.field_offset + index * 12)?;
        let field_type = GffFieldType::from_id(reader.read_u32()?)?;
        let label_index = reader.read_u32()? as usize;
        let raw = reader.read_bytes(4)?;
        let inline = [raw[0], raw[1], raw[2], raw[3]];

        if label_index >= self.header.label_count {
            return Err(Error::invalid("GFF", format!("标签索引 {label_index} 越界")));
        }
        let label = self
            .at(self.header.label_offset + label_index * 16)?
            .read_fixed_string(16)?;

        let value = self.read_value(field_type, inline, depth)?;
        Ok(GffField { label, value })
    }

    fn read_value(&self, field_type: GffFieldType, inline: [u8; 4], depth: usize) -> Result<GffValue> {
        let as_u32 = u32::from_le_bytes(inline);
        let complex = || self.at(self.header.field_data_offset + as_u32 as usize);

        Ok(match field_type {
            GffFieldType::UInt8 => GffValue::UInt8(inline[0]),
            GffFieldType::Int8 => GffValue::Int8(inline[0] as i8),
            GffFieldType::UInt16 => GffValue::UInt16(u16::from_le_bytes([inline[0], inline[1]])),
            GffFieldType::Int16 => GffValue::Int16(i16::from_le_bytes([inline[0], inline[1]])),
            GffFieldType::UInt32 => GffValue::UInt32(as_u32),
            GffFieldType::Int32 => GffValue::Int32(as_u32 as i32),
            GffFieldType::Single => GffValue::Single(f32::from_le_bytes(inline)),
            GffFieldType::UInt64 => GffValue::UInt64(complex()?.read_u64()?),
            GffFieldType::Int64 => GffValue::Int64(complex()?.read_i64()?),
            GffFieldType::Double => GffValue::Double(complex()?.read_f64()?),
            GffFieldType::String => {
                let mut reader = complex()?;
                let len = reader.read_u32()? as usize;
                GffValue::String(decode_cp1252(reader.read_bytes(len)?))
            }
            GffFieldType::ResRef => {
                let mut reader = complex()?;
                let len = reader.read_u8()? as usize;
                GffValue::ResRef(decode_cp1252(reader.read_bytes(len)?))
            }
            GffFieldType::LocString => {
                let mut reader = complex()?;
                let _size = reader.read_u32()?;
                let stringref = reader.read_u32()? as i32;
                let count = reader.read_u32()?;
                let mut substrings = BTreeMap::new();
                for _ in 0..count {
                    let id = reader.read_u32()?;
                    let len = reader.read_u32()? as usize;
                    substrings.insert(id, decode_cp1252(reader.read_bytes(len)?));
                }
                GffValue::LocString(LocalizedString {
                    stringref,
                    substrings,
                })
            }
            GffFieldType::Binary => {
                let mut reader = complex()?;
                let len = reader.read_u32()? as usize;
                GffValue::Binary(reader.read_bytes(len)?.to_vec())
            }
            GffFieldType::Vector4 => {
                let mut reader = complex()?;
                let mut v = [0f32; 4];
                for c in v.iter_mut() {
                    *c = reader.read_f32()?;
                }
                GffValue::Vector4(v)
            }
            GffFieldType::Vector3 => {
                let mut reader = complex()?;
                let mut v = [0f32; 3];
                for c in v.iter_mut() {
                    *c = reader.read_f32()?;
                }
                GffValue::Vector3(v)
            }
            GffFieldType::Struct => GffValue::Struct(self.read_struct(as_u32 as usize, depth + 1)?),
            GffFieldType::List => {
                let mut reader = self.at(self.header.list_indices_offset + as_u32 as usize)?;
                let count = reader.read_u32()?;
                let mut items = Vec::new();
                for _ in 0..count {
                    let index = reader.read_u32()? as usize;
                    items.push(self.read_struct(index, depth + 1)?);
                }
                GffValue::List(items)
            }
        })
    }
}

#[derive(Default)]
struct GffBuilder {
    structs: Vec<[u32; 3]>,
    fields: Vec<[u32; 3]>,
    labels: Vec<String>,
    label_lookup: HashMap<String, u32>,
    field_data: Vec<u8>,
    field_indices: Vec<u8>,
    list_indices: Vec<u8>,
}

impl GffBuilder {
    fn label_index(&mut self, label: &str) -> u32 {
        if let Some(index) = self.label_lookup.get(label) {
            return *index;
        }
        let index = self.labels.len() as u32;
        self.labels.push(label.to_string());
        self.label_lookup.insert(label.to_string(), index);
        index
    }

    fn write_struct(&mut self, gff_struct: &GffStruct) -> Result<u32> {
        let struct_index = self.structs.len();
        self.structs.push([gff_struct.struct_id, 0, gff_struct.fields.len() as u32]);

        let mut field_indices = Vec::with_capacity(gff_struct.fields.len());
        for field in &gff_struct.fields {
            field_indices.push(self.write_field(field)?);
        }

        let data = match field_indices.as_slice() {
            [] => 0,
            [single] => *single,
            many => {
                let offset = self.field_indices.len() as u32;
                for index in many {
                    self.field_indices.write_u32::<LittleEndian>(*index)?;
                }
                offset
            }
        };
        self.structs[struct_index][1] = data;
        Ok(struct_index as u32)
    }

    fn write_field(&mut self, field: &GffField) -> Result<u32> {
        let field_index = self.fields.len();
        let label_index = self.label_index(&field.label);
        self.fields
            .push([field.value.field_type() as u32, label_index, 0]);

        let data_offset = self.field_data.len() as u32;
        let data = match &field.value {
            GffValue::UInt8(v) => *v as u32,
            GffValue::Int8(v) => *v as u8 as u32,
            GffValue::UInt16(v) => *v as u32,
            GffValue::Int16(v) => *v as u16 as u32,
            GffValue::UInt32(v) => *v,
            GffValue::Int32(v) => *v as u32,
            GffValue::Single(v) => v.to_bits(),
            GffValue::UInt64(v) => {
                self.field_data.write_u64::<LittleEndian>(*v)?;
                data_offset
            }
            GffValue::Int64(v) => {
                self.field_data.write_i64::<LittleEndian>(*v)?;
                data_offset
            }
            GffValue::Double(v) => {
                self.field_data.write_f64::<LittleEndian>(*v)?;
                data_offset
            }
            GffValue::String(text) => {
                let encoded = encode_cp1252(text);
                self.field_data.write_u32::<LittleEndian>(encoded.len() as u32)?;
                self.field_data.extend(encoded);
                data_offset
            }
            GffValue::ResRef(text) => {
                let encoded = encode_cp1252(text);
                let len = u8::try_from(encoded.len())
                    .map_err(|_| Error::invalid("GFF", format!("ResRef 过长: {text}")))?;
                self.field_data.push(len);
                self.field_data.extend(encoded);
                data_offset
            }
            GffValue::LocString(locstring) => {
                let mut body = Vec::new();
                body.write_u32::<LittleEndian>(locstring.stringref as u32)?;
                body.write_u32::<LittleEndian>(locstring.substrings.len() as u32)?;
                for (id, text) in &locstring.substrings {
                    let encoded = encode_cp1252(text);
                    body.write_u32::<LittleEndian>(*id)?;
                    body.write_u32::<LittleEndian>(encoded.len() as u32)?;
                    body.extend(encoded);
                }
                self.field_data.write_u32::<LittleEndian>(body.len() as u32)?;
                self.field_data.extend(body);
                data_offset
            }
            GffValue::Binary(bytes) => {
                self.field_data.write_u32::<LittleEndian>(bytes.len() as u32)?;
                self.field_data.extend_from_slice(bytes);
                data_offset
            }
            GffValue::Vector4(v) => {
                for c in v {
                    self.field_data.write_f32::<LittleEndian>(*c)?;
                }
                data_offset
            }
            GffValue::Vector3(v) => {
                for c in v {
                    self.field_data.write_f32::<LittleEndian>(*c)?;
                }
                data_offset
            }
            GffValue::Struct(child) => self.write_struct(child)?,
            GffValue::List(items) => {
                let mut indices = Vec::with_capacity(items.len());
                for item in items {
                    indices.push(self.write_struct(item)?);
                }
                let offset = self.list_indices.len() as u32;
                self.list_indices.write_u32::<LittleEndian>(indices.len() as u32)?;
                for index in indices {
                    self.list_indices.write_u32::<LittleEndian>(index)?;
                }
                offset
            }
        };
        self.fields[field_index][2] = data;
        Ok(field_index as u32)
    }

    fn finish(self, content_type: &str) -> Result<Vec<u8>> {
        let struct_offset = HEADER_SIZE;
        let field_offset = struct_offset + self.structs.len() * 12;
        let label_offset = field_offset + self.fields.len() * 12;
        let field_data_offset = label_offset + self.labels.len() * 16;
        let field_indices_offset = field_data_offset + self.field_data.len();
        let list_indices_offset = field_indices_offset + self.field_indices.len();

        let mut out = Vec::with_capacity(list_indices_offset + self.list_indices.len());
        out.extend(fixed_string_bytes(content_type, 4));
        out.extend_from_slice(b"V3.2");
        for value in [
            struct_offset,
            self.structs.len(),
            field_offset,
            self.fields.len(),
            label_offset,
            self.labels.len(),
            field_data_offset,
            self.field_data.len(),
            field_indices_offset,
            self.field_indices.len(),
            list_indices_offset,
            self.list_indices.len(),
        ] {
            out.write_u32::<LittleEndian>(value as u32)?;
        }

        for entry in self.structs.iter().chain(self.fields.iter()) {
            for value in entry {
                out.write_u32::<LittleEndian>(*value)?;
            }
        }
        for label in &self.labels {
            out.extend(fixed_string_bytes(label, 16));
        }
        out.extend(self.field_data);
        out.extend(self.field_indices);
        out.extend(self.list_indices);
        Ok(out)
    }
}
