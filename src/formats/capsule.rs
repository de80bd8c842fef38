use byteorder::{LittleEndian, WriteBytesExt};
use bytes::Bytes;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use super::reader::{BinaryReader, fixed_string_bytes};
use crate::error::{Error, Result};
use crate::resource::{extension_for_type, split_resource_name, type_for_extension};

const ERF_HEADER_SIZE: usize = 160;
const ERF_KEY_SIZE: usize = 24;
const RIM_KEYS_OFFSET: usize = 120;
const RIM_KEY_SIZE: usize = 32;

/// 容器种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapsuleKind {
    Erf,
    Mod,
    Sav,
    Rim,
}

impl CapsuleKind {
    fn magic(self) -> &'static [u8; 4] {
        match self {
            Self::Erf => b"ERF ",
            Self::Mod => b"MOD ",
            Self::Sav => b"SAV ",
            Self::Rim => b"RIM ",
        }
    }
}

/// 容器内的一个资源
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapsuleResource {
    pub resref: String,
    pub ext: String,
    pub data: Bytes,
}

impl CapsuleResource {
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.resref, self.ext)
    }
}

/// ERF/MOD/SAV/RIM 容器
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capsule {
    pub kind: CapsuleKind,
    resources: Vec<CapsuleResource>,
}

impl Capsule {
    pub fn new(kind: CapsuleKind) -> Self {
        Self {
            kind,
            resources: Vec::new(),
        }
    }

    pub fn open(path: &Path) -> Result<Self> {
        let data = fs::read(path)?;
        Self::parse(&data)
    }

    /// 按文件头识别容器种类并读取全部资源
    ///
    /// 同一容器内重复出现的 resref 只保留第一个。
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = BinaryReader::new(data);
        let magic = reader.read_bytes(4)?;
        let kind = match magic {
            b"ERF " => CapsuleKind::Erf,
            b"MOD " => CapsuleKind::Mod,
            b"SAV " => CapsuleKind::Sav,
            b"RIM " => CapsuleKind::Rim,
            other => {
                return Err(Error::invalid(
                    "capsule",
                    format!("未知容器类型 {:?}", String::from_utf8_lossy(other)),
                ));
            }
        };
        reader.expect_magic(b"V1.0", "capsule")?;

        let entries = match kind {
            CapsuleKind::Rim => parse_rim(&mut reader)?,
            _ => parse_erf(&mut reader)?,
        };

        let mut capsule = Self::new(kind);
        for (resref, type_id, offset, size) in entries {
            let ext = extension_for_type(type_id)
                .map(str::to_string)
                .unwrap_or_else(|| format!("type{type_id}"));
            let data = Bytes::copy_from_slice(reader.peek_at(offset, size)?);
            capsule.push(resref, ext, data);
        }
        Ok(capsule)
    }

    /// 追加资源，已存在同名资源时忽略
    pub fn push(&mut self, resref: impl Into<String>, ext: impl Into<String>, data: impl Into<Bytes>) {
        let resref = resref.into();
        let ext = ext.into().to_ascii_lowercase();
        if self.get(&resref, &ext).is_some() {
            return;
        }
        self.resources.push(CapsuleResource {
            resref,
            ext,
            data: data.into(),
        });
    }

    pub fn get(&self, resref: &str, ext: &str) -> Option<&CapsuleResource> {
        self.resources
            .iter()
            .find(|r| r.resref.eq_ignore_ascii_case(resref) && r.ext.eq_ignore_ascii_case(ext))
    }

    /// 按 `resref.ext` 文件名查找
    pub fn get_by_name(&self, name: &str) -> Option<&CapsuleResource> {
        let (resref, ext) = split_resource_name(name);
        self.get(resref, ext)
    }

    pub fn resources(&self) -> &[CapsuleResource] {
        &self.resources
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let type_ids = self
            .resources
            .iter()
            .map(|r| {
                type_for_extension(&r.ext)
                    .ok_or_else(|| Error::invalid("capsule", format!("未知资源类型 {}", r.ext)))
            })
            .collect::<Result<Vec<_>>>()?;

        match self.kind {
            CapsuleKind::Rim => self.write_rim(&type_ids),
            _ => self.write_erf(&type_ids),
        }
    }

    fn write_erf(&self, type_ids: &[u16]) -> Result<Vec<u8>> {
        let count = self.resources.len();
        let keys_offset = ERF_HEADER_SIZE;
        let resources_offset = keys_offset + count * ERF_KEY_SIZE;
        let mut data_offset = resources_offset + count * 8;

        let mut out = Vec::new();
        out.extend_from_slice(self.kind.magic());
        out.extend_from_slice(b"V1.0");
        for value in [0, 0, count, keys_offset, keys_offset, resources_offset, 0, 0] {
            out.write_u32::<LittleEndian>(value as u32)?;
        }
        // 描述字符串引用
        out.write_u32::<LittleEndian>(0xFFFF_FFFF)?;
        out.resize(ERF_HEADER_SIZE, 0);

        for (index, (resource, type_id)) in self.resources.iter().zip(type_ids).enumerate() {
            out.extend(fixed_string_bytes(&resource.resref, 16));
            out.write_u32::<LittleEndian>(index as u32)?;
            out.write_u16::<LittleEndian>(*type_id)?;
            out.write_u16::<LittleEndian>(0)?;
        }
        for resource in &self.resources {
            out.write_u32::<LittleEndian>(data_offset as u32)?;
            out.write_u32::<LittleEndian>(resource.data.len() as u32)?;
            data_offset += resource.data.len();
        }
        for resource in &self.resources {
            out.extend_from_slice(&resource.data);
        }
        Ok(out)
    }

    fn write_rim(&self, type_ids: &[u16]) -> Result<Vec<u8>> {
        let count = self.resources.len();
        let mut data_offset = RIM_KEYS_OFFSET + count * RIM_KEY_SIZE;

        let mut out = Vec::new();
        out.extend_from_slice(b"RIM V1.0");
        out.write_u32::<LittleEndian>(0)?;
        out.write_u32::<LittleEndian>(count as u32)?;
        out.write_u32::<LittleEndian>(RIM_KEYS_OFFSET as u32)?;
        out.resize(RIM_KEYS_OFFSET, 0);

        for (index, (resource, type_id)) in self.resources.iter().zip(type_ids).enumerate() {
            out.extend(fixed_string_bytes(&resource.resref, 16));
            out.write_u32::<LittleEndian>(*type_id as u32)?;
            out.write_u32::<LittleEndian>(index as u32)?;
            out.write_u32::<LittleEndian>(data_offset as u32)?;
            out.write_u32::<LittleEndian>(resource.data.len() as u32)?;
            data_offset += resource.data.len();
        }
        for resource in &self.resources {
            out.extend_from_slice(&resource.data);
        }
        Ok(out)
    }
}

type RawEntry = (String, u16, usize, usize);

fn parse_erf(reader: &mut BinaryReader<'_>) -> Result<Vec<RawEntry>> {
    let _language_count = reader.read_u32()?;
    let _locstring_size = reader.read_u32()?;
    let count = reader.read_u32()? as usize;
    let _locstring_offset = reader.read_u32()?;
    let keys_offset = reader.read_u32()? as usize;
    let resources_offset = reader.read_u32()? as usize;

    let mut keys = reader.clone();
    keys.seek(keys_offset)?;
    let mut resources = reader.clone();
    resources.seek(resources_offset)?;

    let mut entries = Vec::with_capacity(count.min(reader.size() / ERF_KEY_SIZE));
    let mut seen = HashSet::new();
    for _ in 0..count {
        let resref = keys.read_fixed_string(16)?;
        let _res_id = keys.read_u32()?;
        let type_id = keys.read_u16()?;
        keys.skip(2)?;
        let offset = resources.read_u32()? as usize;
        let size = resources.read_u32()? as usize;
        if seen.insert((resref.to_ascii_lowercase(), type_id)) {
            entries.push((resref, type_id, offset, size));
        }
    }
    Ok(entries)
}

fn parse_rim(reader: &mut BinaryReader<'_>) -> Result<Vec<RawEntry>> {
    let _reserved = reader.read_u32()?;
    let count = reader.read_u32()? as usize;
    let keys_offset = reader.read_u32()? as usize;
    reader.seek(keys_offset)?;

    let mut entries = Vec::with_capacity(count.min(reader.size() / RIM_KEY_SIZE));
    let mut seen = HashSet::new();
    for _ in 0..count {
        let resref = reader.read_fixed_string(16)?;
        let type_id = reader.read_u32()?;
        let _res_id = reader.read_u32()?;
        let offset = reader.read_u32()? as usize;
        let size = reader.read_u32()? as usize;
        let type_id = u16::try_from(type_id)
            .map_err(|_| Error::invalid("RIM", format!("资源类型越界: {type_id}")))?;
        if seen.insert((resref.to_ascii_lowercase(), type_id)) {
            entries.push((resref, type_id, offset, size));
        }
    }
    Ok(entries)
}
