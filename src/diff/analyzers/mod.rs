//! 格式分析器注册表
//!
//! 分析器比较同一资源的两个版本：
//! 语义相同时返回 `Ok(None)`，否则返回把 A 变为 B 所需的修改。
//! 补丁格式无法表达的差异 (删除行、删除字段、类型变化等) 记为
//! [`Error::Unrepresentable`]；若同时存在可表达的部分，则只返回该部分。

mod gff;
mod ssf;
mod tlk;
mod twoda;

use log::warn;

use crate::error::{Error, Result};
use crate::mods::Modification;
use crate::resource::file_name_of;

pub use gff::GffAnalyzer;
pub use ssf::SsfAnalyzer;
pub use tlk::TlkAnalyzer;
pub use twoda::TwoDaAnalyzer;

pub trait DiffAnalyzer: Sync {
    fn name(&self) -> &'static str;

    fn analyze(&self, a: &[u8], b: &[u8], location: &str) -> Result<Option<Modification>>;
}

/// 使用通用结构化格式的扩展名
pub const GFF_EXTENSIONS: &[&str] = &[
    "utc", "uti", "utp", "ute", "utm", "utd", "utw", "dlg", "are", "git", "ifo", "gui", "jrl",
    "fac", "gff",
];

static TWODA: TwoDaAnalyzer = TwoDaAnalyzer;
static GFF: GffAnalyzer = GffAnalyzer;
static TLK: TlkAnalyzer = TlkAnalyzer;
static SSF: SsfAnalyzer = SsfAnalyzer;

/// 按格式标记查找分析器，不区分大小写
pub fn get_analyzer(format_tag: &str) -> Option<&'static dyn DiffAnalyzer> {
    let tag = format_tag.to_ascii_lowercase();
    match tag.as_str() {
        "2da" | "twoda" => Some(&TWODA),
        "tlk" => Some(&TLK),
        "ssf" => Some(&SSF),
        t if GFF_EXTENSIONS.contains(&t) => Some(&GFF),
        _ => None,
    }
}

/// 收集无法表达的差异，最后决定返回部分结果还是错误
#[derive(Debug, Default)]
pub(crate) struct Unrepresentable {
    reasons: Vec<String>,
}

impl Unrepresentable {
    pub(crate) fn note(&mut self, reason: impl Into<String>) {
        self.reasons.push(reason.into());
    }

    pub(crate) fn finish(
        self,
        location: &str,
        modification: Option<Modification>,
    ) -> Result<Option<Modification>> {
        if self.reasons.is_empty() {
            return Ok(modification);
        }
        let reason = self.reasons.join("; ");
        match modification {
            Some(modification) => {
                warn!("{location}: 部分差异无法写入补丁，已忽略: {reason}");
                Ok(Some(modification))
            }
            None => Err(Error::unrepresentable(location, reason)),
        }
    }
}

/// 修改记录使用的源文件名
pub(crate) fn source_file_of(location: &str) -> String {
    file_name_of(location).to_string()
}
