//! 分类节点数据模型
//!
//! ICD-11 节点以JSON对象的形式原样保存（字段顺序保持不变），
//! 本模块只提供标识提取和子节点引用读取等轻量访问方法。

use std::fmt;

use serde_json::{Map, Value};
use tracing::warn;

use crate::api_constants::crawler_config::RESIDUAL_SEGMENTS;

/// 单个分类节点：字段名到任意JSON值的映射
pub type Node = Map<String, Value>;

/// 节点引用字段
pub const ID_FIELD: &str = "@id";

/// 子节点引用字段
pub const CHILD_FIELD: &str = "child";

/// 节点编码字段（章节等节点可能没有）
pub const CODE_FIELD: &str = "code";

/// 规范化后的节点标识，用作去重键
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(String);

impl NodeId {
    /// 从引用路径推导节点标识
    ///
    /// 取最后一个路径段；若为 `unspecified` 或 `other`，则回退到上一段。
    /// 没有上一段时保留原值。
    ///
    /// ```rust
    /// use icd11_translator::node::NodeId;
    ///
    /// let id = NodeId::from_reference("http://id.who.int/icd/release/11/2022-02/mms/123/other");
    /// assert_eq!(id.as_str(), "123");
    /// ```
    pub fn from_reference(reference: &str) -> Self {
        let trimmed = reference.trim_end_matches('/');
        let mut segments = trimmed.rsplit('/');
        let last = segments.next().unwrap_or_default();

        if RESIDUAL_SEGMENTS.contains(&last) {
            if let Some(parent) = segments.next().filter(|s| !s.is_empty()) {
                return Self(parent.to_string());
            }
        }

        Self(last.to_string())
    }

    /// 获取标识字符串
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// 读取节点的 `@id` 引用
pub fn node_reference(node: &Node) -> Option<&str> {
    node.get(ID_FIELD).and_then(Value::as_str)
}

/// 读取节点的标识
pub fn node_id(node: &Node) -> Option<NodeId> {
    node_reference(node).map(NodeId::from_reference)
}

/// 按原始顺序读取子节点引用
///
/// 非字符串条目会被忽略并记录警告。
pub fn child_references(node: &Node) -> Vec<String> {
    let Some(children) = node.get(CHILD_FIELD) else {
        return Vec::new();
    };

    let Some(children) = children.as_array() else {
        warn!("⚠️  节点 {} 的 child 字段不是数组，已忽略", node_label(node));
        return Vec::new();
    };

    children
        .iter()
        .filter_map(|child| match child.as_str() {
            Some(reference) => Some(reference.to_string()),
            None => {
                warn!("⚠️  节点 {} 含有非字符串子引用: {}", node_label(node), child);
                None
            }
        })
        .collect()
}

/// 生成用于日志和错误信息的节点描述
///
/// 优先使用 `code`，其次是节点标识，最后是原始引用。
pub fn node_label(node: &Node) -> String {
    if let Some(code) = node.get(CODE_FIELD).and_then(Value::as_str) {
        if !code.is_empty() {
            return code.to_string();
        }
    }

    match node_reference(node) {
        Some(reference) => NodeId::from_reference(reference).to_string(),
        None => "<unknown>".to_string(),
    }
}
