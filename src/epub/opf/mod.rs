//! OPF（Open Packaging Format）文件解析模块
//!
//! 此模块提供EPUB文件中OPF包文件的解析功能，提取书名、有序的清单和脊柱。

mod manifest;
mod parser;
mod spine;

pub use manifest::ManifestItem;
pub use parser::Opf;
pub use spine::SpineItem;
