mod fs;
mod hash;
mod text;

pub use fs::{
    FileEntry, find_child_case_insensitive, resolve_case_insensitive,
    scan_directory,
};
pub use hash::{HashResult, compute_hash};
pub use text::{
    context_text_diff, decode_cp1252, decode_text, encode_cp1252, is_text_content,
    render_binary_diff, render_text_diff, side_by_side_text_diff, text_lines_equal,
    unified_text_diff,
};
