//! Audio Context - 音频值对象
//!
//! 职责:
//! - 音频格式与 MIME 类型映射
//! - 内存音频文件

mod value_objects;

pub use value_objects::{mime_type_for_filename, AudioFile, AudioFormat};
