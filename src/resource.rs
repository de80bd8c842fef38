use bytes::Bytes;

/// 一个可比较的资源单元
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparableResource {
    /// 相对路径，或容器内的 `resref.ext`
    pub identifier: String,
    /// 小写扩展名
    pub format_tag: String,
    pub data: Bytes,
    /// 来自第几个根
    pub source_index: usize,
    /// 遍历时已确定的安装目录，缺省时由标识符推断
    pub destination: Option<String>,
}

impl ComparableResource {
    pub fn new(identifier: impl Into<String>, data: impl Into<Bytes>, source_index: usize) -> Self {
        let identifier = identifier.into();
        let format_tag = format_tag_of(&identifier);
        Self {
            identifier,
            format_tag,
            data: data.into(),
            source_index,
            destination: None,
        }
    }

    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    /// 标识符的最后一段，即文件名
    pub fn file_name(&self) -> &str {
        file_name_of(&self.identifier)
    }
}

/// 单次两两比较发生的位置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffContext {
    pub where_a: String,
    pub where_b: String,
    pub ext: String,
    /// 资源位于容器内时的 resref
    pub resref: Option<String>,
}

impl DiffContext {
    pub fn new(where_a: impl Into<String>, where_b: impl Into<String>, ext: impl Into<String>) -> Self {
        Self {
            where_a: where_a.into(),
            where_b: where_b.into(),
            ext: ext.into().to_ascii_lowercase(),
            resref: None,
        }
    }

    pub fn with_resref(mut self, resref: impl Into<String>) -> Self {
        self.resref = Some(resref.into());
        self
    }

    /// 诊断输出和补丁定义中使用的资源键
    pub fn location_label(&self) -> String {
        self.label_a()
    }

    pub fn label_a(&self) -> String {
        self.label(&self.where_a)
    }

    pub fn label_b(&self) -> String {
        self.label(&self.where_b)
    }

    fn label(&self, location: &str) -> String {
        match &self.resref {
            Some(resref) => format!("{location}/{resref}.{}", self.ext),
            None => location.to_string(),
        }
    }
}

pub fn file_name_of(identifier: &str) -> &str {
    identifier.rsplit(['/', '\\']).next().unwrap_or(identifier)
}

pub fn format_tag_of(identifier: &str) -> String {
    let name = file_name_of(identifier);
    match name.rsplit_once('.') {
        Some((_, ext)) => ext.to_ascii_lowercase(),
        None => String::new(),
    }
}

/// 拆分 `resref.ext`
pub fn split_resource_name(name: &str) -> (&str, &str) {
    match name.rsplit_once('.') {
        Some((resref, ext)) => (resref, ext),
        None => (name, ""),
    }
}

/// 游戏资源类型表 (类型 id, 扩展名)
const RESOURCE_TYPES: &[(u16, &str)] = &[
    (0, "res"),
    (1, "bmp"),
    (3, "tga"),
    (4, "wav"),
    (6, "plt"),
    (7, "ini"),
    (8, "mp3"),
    (10, "txt"),
    (2002, "mdl"),
    (2009, "nss"),
    (2010, "ncs"),
    (2012, "are"),
    (2013, "set"),
    (2014, "ifo"),
    (2015, "bic"),
    (2016, "wok"),
    (2017, "2da"),
    (2018, "tlk"),
    (2022, "txi"),
    (2023, "git"),
    (2024, "bti"),
    (2025, "uti"),
    (2026, "btc"),
    (2027, "utc"),
    (2029, "dlg"),
    (2030, "itp"),
    (2031, "btt"),
    (2032, "utt"),
    (2033, "dds"),
    (2035, "uts"),
    (2036, "ltr"),
    (2037, "gff"),
    (2038, "fac"),
    (2039, "bte"),
    (2040, "ute"),
    (2041, "btd"),
    (2042, "utd"),
    (2043, "btp"),
    (2044, "utp"),
    (2045, "dft"),
    (2046, "gic"),
    (2047, "gui"),
    (2048, "css"),
    (2049, "ccs"),
    (2050, "btm"),
    (2051, "utm"),
    (2052, "dwk"),
    (2053, "pwk"),
    (2054, "btg"),
    (2055, "utg"),
    (2056, "jrl"),
    (2057, "sav"),
    (2058, "utw"),
    (2059, "4pc"),
    (2060, "ssf"),
    (2061, "hak"),
    (2062, "nwm"),
    (2063, "bik"),
    (2064, "ndb"),
    (2065, "ptm"),
    (2066, "ptt"),
    (3000, "lyt"),
    (3001, "vis"),
    (3002, "rim"),
    (3003, "pth"),
    (3004, "lip"),
    (3005, "bwm"),
    (3006, "txb"),
    (3007, "tpc"),
    (3008, "mdx"),
    (3009, "rsv"),
    (3010, "sig"),
    (3011, "xbx"),
    (9997, "erf"),
    (9998, "bif"),
    (9999, "key"),
];

pub fn extension_for_type(type_id: u16) -> Option<&'static str> {
    RESOURCE_TYPES
        .iter()
        .find(|(id, _)| *id == type_id)
        .map(|(_, ext)| *ext)
}

pub fn type_for_extension(ext: &str) -> Option<u16> {
    RESOURCE_TYPES
        .iter()
        .find(|(_, e)| e.eq_ignore_ascii_case(ext))
        .map(|(id, _)| *id)
}

/// 容器文件扩展名
pub fn is_capsule_extension(ext: &str) -> bool {
    matches!(
        ext.to_ascii_lowercase().as_str(),
        "erf" | "mod" | "rim" | "sav"
    )
}

pub fn is_capsule_name(name: &str) -> bool {
    is_capsule_extension(&format_tag_of(name))
}
