//! JSON 文件读写
//!
//! 爬取结果和翻译结果都以JSON数组形式保存，4空格缩进，非ASCII字符原样输出。

// 标准库导入
use std::collections::HashSet;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

// 第三方crate导入
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};
use tracing::{info, warn};

// 本地模块导入
use crate::error::Result;
use crate::icd_error;
use crate::node::Node;

/// 将数据以4空格缩进写入JSON文件
pub fn save_json<T: Serialize + ?Sized, P: AsRef<Path>>(path: P, container: &T) -> Result<()> {
    let path = path.as_ref();
    info!("💾 保存JSON: {}", path.display());

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| icd_error!(file_op, parent.display(), "创建目录", e))?;
    }

    let file = fs::File::create(path).map_err(|e| icd_error!(file_op, path.display(), "写入", e))?;
    let mut serializer =
        serde_json::Serializer::with_formatter(BufWriter::new(file), PrettyFormatter::with_indent(b"    "));
    container
        .serialize(&mut serializer)
        .map_err(|e| icd_error!(file_op, path.display(), "写入", e))?;
    serializer
        .into_inner()
        .flush()
        .map_err(|e| icd_error!(file_op, path.display(), "写入", e))?;
    Ok(())
}

/// 读取JSON文件
pub fn read_json<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    let path = path.as_ref();
    info!("📂 读取JSON: {}", path.display());

    let content =
        fs::read_to_string(path).map_err(|e| icd_error!(file_op, path.display(), "读取", e))?;
    serde_json::from_str(&content).map_err(|e| icd_error!(file_op, path.display(), "解析", e))
}

/// 读取节点数组
pub fn read_nodes<P: AsRef<Path>>(path: P) -> Result<Vec<Node>> {
    read_json(path)
}

/// 按首次出现顺序去除完全相同的节点
///
/// 节点相等与字段顺序无关，嵌套对象同样如此。
pub fn unique_nodes(nodes: Vec<Node>) -> Vec<Node> {
    let total = nodes.len();
    let mut seen = HashSet::with_capacity(total);

    let unique: Vec<Node> = nodes
        .into_iter()
        .filter(|node| seen.insert(canonical_key(node)))
        .collect();

    if unique.len() < total {
        warn!("⚠️  去除了 {} 个重复节点", total - unique.len());
    }
    unique
}

/// 按字段名排序后的序列化文本，作为节点去重键
fn canonical_key(node: &Node) -> String {
    let mut key = String::new();
    write_canonical_map(&mut key, node);
    key
}

fn write_canonical_map(out: &mut String, map: &Map<String, Value>) {
    let mut entries: Vec<(&String, &Value)> = map.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    out.push('{');
    for (i, (k, v)) in entries.into_iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&Value::String(k.clone()).to_string());
        out.push(':');
        write_canonical(out, v);
    }
    out.push('}');
}

fn write_canonical(out: &mut String, value: &Value) {
    match value {
        Value::Object(map) => write_canonical_map(out, map),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(out, item);
            }
            out.push(']');
        }
        other => out.push_str(&other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use tempfile::tempdir;

    fn node(value: Value) -> Node {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_save_json_format() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("out.json");
        let nodes = vec![node(json!({"@id": "x/1", "title": {"language": "da", "value": "Kolera æøå"}}))];

        save_json(&path, &nodes).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("[\n    {\n        \"@id\""));
        assert!(content.contains("Kolera æøå"));
    }

    #[test]
    fn test_read_back_preserves_field_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nodes.json");
        let nodes = vec![node(json!({"zeta": 1, "alpha": 2, "@id": "x/1"}))];

        save_json(&path, &nodes).unwrap();
        let loaded = read_nodes(&path).unwrap();

        assert_eq!(loaded, nodes);
        assert_eq!(loaded[0].keys().collect::<Vec<_>>(), vec!["zeta", "alpha", "@id"]);
    }

    #[test]
    fn test_read_missing_file() {
        let result = read_nodes("/nonexistent/taxonomy.json");
        assert!(matches!(result, Err(crate::error::Icd11Error::FileOperation { .. })));
    }

    #[test]
    fn test_read_invalid_shape() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, r#"{"not": "an array"}"#).unwrap();

        assert!(read_nodes(&path).is_err());
    }

    #[test]
    fn test_unique_nodes_keeps_first_occurrence() {
        let a = node(json!({"@id": "x/1"}));
        let b = node(json!({"@id": "x/2"}));

        let unique = unique_nodes(vec![a.clone(), b.clone(), a.clone(), b.clone(), a.clone()]);

        assert_eq!(unique, vec![a, b]);
    }

    #[test]
    fn test_unique_nodes_ignores_field_order() {
        let first = node(json!({"@id": "x/1", "title": {"@language": "en", "@value": "Cholera"}}));
        let reordered = node(json!({"title": {"@value": "Cholera", "@language": "en"}, "@id": "x/1"}));
        let different = node(json!({"@id": "x/1", "title": {"@language": "en", "@value": "Typhoid"}}));
        assert_eq!(first, reordered);

        let unique = unique_nodes(vec![first.clone(), reordered, different.clone()]);

        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].keys().collect::<Vec<_>>(), vec!["@id", "title"]);
        assert_eq!(unique, vec![first, different]);
    }
}
