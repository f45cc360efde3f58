//! Context file selection and change detection

pub mod differ;
pub mod picker;

pub use differ::{checksum, files_to_submit};
pub use picker::{parse_selection, FilePicker, PickerOutcome};
