//! TSLPatcher 补丁生成

mod ini;
mod install;
mod materialize;
mod writer;

pub use ini::{IniHeader, escape_text, field_value, render_ini};
pub use install::determine_install_folders;
pub use materialize::PatchMaterializer;
pub use writer::{IncrementalPatchWriter, WriterSummary};
