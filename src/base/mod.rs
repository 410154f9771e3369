//! Foundation types shared by every layer.
//!
//! - [`FileId`] - Stable handle for a script file in the workspace
//! - [`TextRange`], [`TextSize`] - Half-open byte-offset spans
//! - [`LineCol`], [`LineRange`], [`LineIndex`] - Line/column conversion
//!
//! This module has NO dependencies on other crate modules.

mod file_id;
mod span;

pub use file_id::FileId;
pub use span::{LineCol, LineIndex, LineRange, TextRange, TextSize};

// Re-export text-size for downstream span arithmetic
pub use text_size;
