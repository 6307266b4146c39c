//! 包内相对路径解析模块
//!
//! 按层级路径段规则把链接目标解析为包内的规范路径：
//! `.` 表示当前目录，`..` 表示上级目录，不以 `/` 开头的路径相对于源文档所在目录，
//! 以 `/` 开头的路径相对于包根目录。链接目标是URL，解析前先做百分号解码。

use percent_encoding::percent_decode_str;
use std::borrow::Cow;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// 路径规范化失败的原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// 路径跳出了包根目录
    EscapesRoot,
    /// 规范化后路径为空（指向包根目录本身）
    Empty,
    /// 路径中包含反斜杠
    Backslash,
    /// 路径中包含控制字符
    ControlCharacter,
    /// 百分号解码后不是有效的UTF-8
    InvalidEncoding,
}

impl Display for PathError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            PathError::EscapesRoot => write!(f, "路径超出了包根目录"),
            PathError::Empty => write!(f, "路径规范化后为空"),
            PathError::Backslash => write!(f, "路径中包含反斜杠"),
            PathError::ControlCharacter => write!(f, "路径中包含控制字符"),
            PathError::InvalidEncoding => write!(f, "路径的百分号编码不是有效的UTF-8"),
        }
    }
}

impl std::error::Error for PathError {}

/// 获取文档路径所在的目录（不含结尾的 `/`）
///
/// 根目录下的文件返回空字符串。
pub fn parent_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(pos) => &path[..pos],
        None => "",
    }
}

/// 相对于源文档解析目标路径
///
/// # 参数
/// * `source` - 源文档的规范路径（本身作为基准，取其所在目录）
/// * `target` - 链接中的路径部分（已去除 `#片段` 与 `?查询`），可以带百分号编码
///
/// # 返回值
/// * `Result<String, PathError>` - 规范化后的包内路径
///
/// # 示例
///
/// ```rust
/// use epub_linkcheck::check::path::resolve;
///
/// assert_eq!(resolve("a/x.xhtml", "b/../c.xhtml").unwrap(), "a/c.xhtml");
/// assert!(resolve("a/x.xhtml", "../../c.xhtml").is_err());
/// assert_eq!(resolve("a/x.xhtml", "chap%201.xhtml").unwrap(), "a/chap 1.xhtml");
/// ```
pub fn resolve(source: &str, target: &str) -> Result<String, PathError> {
    let decoded = decode(target)?;
    let target: &str = &decoded;
    validate(target)?;

    match target.strip_prefix('/') {
        Some(rooted) => canonicalize(rooted),
        None => {
            let base = parent_dir(source);
            if base.is_empty() {
                canonicalize(target)
            } else {
                canonicalize(&format!("{}/{}", base, target))
            }
        }
    }
}

/// 规范化包内路径：去除 `.`、空段并折叠 `..`
///
/// 对已经规范化的路径再次调用会原样返回。
pub fn canonicalize(path: &str) -> Result<String, PathError> {
    validate(path)?;

    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(PathError::EscapesRoot);
                }
            }
            other => segments.push(other),
        }
    }

    if segments.is_empty() {
        return Err(PathError::Empty);
    }

    Ok(segments.join("/"))
}

/// 百分号解码，不合法的 `%` 序列原样保留
pub fn decode(value: &str) -> Result<Cow<'_, str>, PathError> {
    percent_decode_str(value)
        .decode_utf8()
        .map_err(|_| PathError::InvalidEncoding)
}

/// 检查路径中是否包含不允许的字符
fn validate(path: &str) -> Result<(), PathError> {
    if path.contains('\\') {
        return Err(PathError::Backslash);
    }
    if path.chars().any(|c| c.is_ascii_control()) {
        return Err(PathError::ControlCharacter);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_sibling_file() {
        assert_eq!(resolve("OEBPS/text/chap1.xhtml", "chap2.xhtml").unwrap(), "OEBPS/text/chap2.xhtml");
        assert_eq!(resolve("intro.xhtml", "chap1.xhtml").unwrap(), "chap1.xhtml");
    }

    #[test]
    fn test_resolve_parent_segments() {
        assert_eq!(resolve("a/x.xhtml", "b/../c.xhtml").unwrap(), "a/c.xhtml");
        assert_eq!(resolve("a/x.xhtml", "/a/b/../c.xhtml").unwrap(), "a/c.xhtml");
        assert_eq!(resolve("a/b/x.xhtml", "../c.xhtml").unwrap(), "a/c.xhtml");
        assert_eq!(resolve("a/b/x.xhtml", "./../../c.xhtml").unwrap(), "c.xhtml");
    }

    #[test]
    fn test_resolve_nested_directories() {
        assert_eq!(
            resolve("OEBPS/text/part1/chap1.xhtml", "../../images/fig.png").unwrap(),
            "OEBPS/images/fig.png"
        );
        assert_eq!(
            resolve("OEBPS/nav.xhtml", "text//part1/./chap1.xhtml").unwrap(),
            "OEBPS/text/part1/chap1.xhtml"
        );
    }

    #[test]
    fn test_resolve_escaping_root() {
        assert_eq!(resolve("a/x.xhtml", "../../c.xhtml"), Err(PathError::EscapesRoot));
        assert_eq!(resolve("x.xhtml", "../c.xhtml"), Err(PathError::EscapesRoot));
        assert_eq!(resolve("a/x.xhtml", "/../c.xhtml"), Err(PathError::EscapesRoot));
    }

    #[test]
    fn test_resolve_invalid_paths() {
        assert_eq!(resolve("a/x.xhtml", "b\\c.xhtml"), Err(PathError::Backslash));
        assert_eq!(resolve("a/x.xhtml", "c\u{7}.xhtml"), Err(PathError::ControlCharacter));
        assert_eq!(resolve("a/x.xhtml", ".."), Err(PathError::Empty));
        assert_eq!(resolve("a/x.xhtml", "b/.."), Ok("a".to_string()));
        assert_eq!(resolve("x.xhtml", "."), Err(PathError::Empty));
    }

    #[test]
    fn test_resolve_percent_encoded() {
        assert_eq!(resolve("OEBPS/text/intro.xhtml", "chap%201.xhtml").unwrap(), "OEBPS/text/chap 1.xhtml");
        assert_eq!(
            resolve("OEBPS/content.opf", "text/%E7%AC%AC%E4%B8%80%E7%AB%A0.xhtml").unwrap(),
            "OEBPS/text/第一章.xhtml"
        );
        assert_eq!(resolve("a/x.xhtml", "100%.xhtml").unwrap(), "a/100%.xhtml");
        assert_eq!(resolve("a/x.xhtml", "b%5Cc.xhtml"), Err(PathError::Backslash));
        assert_eq!(resolve("a/x.xhtml", "%FF.xhtml"), Err(PathError::InvalidEncoding));
    }

    #[test]
    fn test_canonicalize_is_stable() {
        let once = canonicalize("OEBPS/./text/../text/chap1.xhtml").unwrap();
        assert_eq!(once, "OEBPS/text/chap1.xhtml");
        assert_eq!(canonicalize(&once).unwrap(), once);
    }

    #[test]
    fn test_parent_dir() {
        assert_eq!(parent_dir("OEBPS/text/chap1.xhtml"), "OEBPS/text");
        assert_eq!(parent_dir("chap1.xhtml"), "");
    }
}
