mod capsule;
mod gff;
mod installation;
mod reader;
mod ssf;
mod tlk;
mod twoda;

pub use capsule::{Capsule, CapsuleKind, CapsuleResource};
pub use gff::{Gff, GffField, GffFieldType, GffStruct, GffValue, LocalizedString};
pub use installation::{
    Installation, KEY_FILE, TALKTABLE_FILE, is_module_file, module_companions, module_destination,
    module_priority, module_root,
};
pub use reader::{BinaryReader, fixed_string_bytes};
pub use ssf::{SOUND_NAMES, Ssf};
pub use tlk::{Tlk, TlkEntry};
pub use twoda::{TwoDa, TwoDaRow};
