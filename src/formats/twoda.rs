use byteorder::{LittleEndian, WriteBytesExt};
use std::collections::HashMap;

use super::reader::BinaryReader;
use crate::error::{Error, Result};
use crate::utils::{decode_cp1252, encode_cp1252};

const MAGIC: &[u8] = b"2DA V2.b";

/// 二维表 (2DA V2.b)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TwoDa {
    pub headers: Vec<String>,
    pub rows: Vec<TwoDaRow>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TwoDaRow {
    pub label: String,
    /// 与 `headers` 一一对应
    pub cells: Vec<String>,
}

impl TwoDaRow {
    pub fn new(label: impl Into<String>, cells: Vec<String>) -> Self {
        Self {
            label: label.into(),
            cells,
        }
    }
}

impl TwoDa {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    pub fn column_index(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header)
    }

    pub fn cell(&self, row: usize, header: &str) -> Option<&str> {
        let column = self.column_index(header)?;
        self.rows.get(row)?.cells.get(column).map(String::as_str)
    }

    /// 追加一行，缺少的单元格补空串
    pub fn push_row(&mut self, label: impl Into<String>, mut cells: Vec<String>) {
        cells.resize(self.headers.len(), String::new());
        self.rows.push(TwoDaRow::new(label, cells));
    }

    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = BinaryReader::new(data);
        reader.expect_magic(MAGIC, "2DA")?;
        // 版本号后的换行
        reader.skip(1)?;

        let mut headers = Vec::new();
        loop {
            if reader.peek_at(reader.position(), 1)?[0] == 0 {
                reader.skip(1)?;
                break;
            }
            headers.push(read_tab_terminated(&mut reader)?);
        }

        let row_count = reader.read_u32()? as usize;
        // 行数来自文件头，预分配不能超过剩余数据
        let mut labels = Vec::with_capacity(row_count.min(reader.remaining()));
        for _ in 0..row_count {
            labels.push(read_tab_terminated(&mut reader)?);
        }

        let cell_count = row_count
            .checked_mul(headers.len())
            .ok_or_else(|| Error::invalid("2DA", "单元格数量溢出"))?;
        let mut offsets = Vec::with_capacity(cell_count.min(reader.remaining() / 2));
        for _ in 0..cell_count {
            offsets.push(reader.read_u16()? as usize);
        }

        // 数据区大小
        reader.read_u16()?;
        let data_start = reader.position();

        let mut rows = Vec::with_capacity(labels.len());
        for (row_index, label) in labels.into_iter().enumerate() {
            let mut cells = Vec::with_capacity(headers.len());
            for column in 0..headers.len() {
                let offset = offsets[row_index * headers.len() + column];
                let mut cell_reader = reader.clone();
                cell_reader.seek(data_start + offset)?;
                cells.push(cell_reader.read_terminated_string()?);
            }
            rows.push(TwoDaRow { label, cells });
        }

        Ok(Self { headers, rows })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        out.extend_from_slice(MAGIC);
        out.push(b'\n');

        for header in &self.headers {
            out.extend(encode_cp1252(header));
            out.push(b'\t');
        }
        out.push(0);

        out.write_u32::<LittleEndian>(self.rows.len() as u32)?;
        for row in &self.rows {
            out.extend(encode_cp1252(&row.label));
            out.push(b'\t');
        }

        // 相同的单元格值共享同一偏移
        let mut values: HashMap<&str, u16> = HashMap::new();
        let mut block = Vec::new();
        let mut offsets = Vec::with_capacity(self.rows.len() * self.headers.len());
        for row in &self.rows {
            for column in 0..self.headers.len() {
                let value = row.cells.get(column).map(String::as_str).unwrap_or("");
                let offset = match values.get(value) {
                    Some(offset) => *offset,
                    None => {
                        let offset = u16::try_from(block.len())
                            .map_err(|_| Error::invalid("2DA", "数据区超过 65535 字节"))?;
                        block.extend(encode_cp1252(value));
                        block.push(0);
                        values.insert(value, offset);
                        offset
                    }
                };
                offsets.push(offset);
            }
        }

        for offset in offsets {
            out.write_u16::<LittleEndian>(offset)?;
        }
        let block_size =
            u16::try_from(block.len()).map_err(|_| Error::invalid("2DA", "数据区超过 65535 字节"))?;
        out.write_u16::<LittleEndian>(block_size)?;
        out.extend(block);
        Ok(out)
    }
}

fn read_tab_terminated(reader: &mut BinaryReader<'_>) -> Result<String> {
    let mut raw = Vec::new();
    loop {
        let byte = reader.read_u8()?;
        if byte == b'\t' {
            break;
        }
        raw.push(byte);
    }
    Ok(decode_cp1252(&raw))
}
