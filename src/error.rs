//! 统一错误处理模块
//!
//! 提供ICD-11爬取与翻译流程的统一错误类型定义和处理机制

// 标准库导入
use std::fmt;

// 第三方crate导入
use anyhow::Error as AnyhowError;

/// ICD-11 工具统一错误类型
///
/// 爬取阶段的节点获取错误属于可跳过错误，由爬虫记录后继续；
/// 翻译阶段的结构错误与翻译服务错误属于致命错误，会中止整个批次。
#[derive(Debug)]
pub enum Icd11Error {
    /// 网络请求相关错误
    Network {
        /// 错误消息
        message: String,
        /// HTTP状态码（如果适用）
        status_code: Option<u16>,
    },

    /// OAuth2 令牌获取失败
    Authentication {
        /// 错误消息
        message: String,
    },

    /// 节点结构不符合预期（缺少 `@value`、`label` 等字段）
    Schema {
        /// 节点标识（code 或 NodeId）
        node: String,
        /// 字段名
        field: String,
        /// 具体原因
        reason: String,
    },

    /// 翻译API相关错误
    TranslationApi {
        /// API响应状态码
        status_code: u16,
        /// 错误消息
        message: String,
        /// API地址
        api_url: String,
    },

    /// 翻译某个节点字段时失败
    Translation {
        /// 节点标识
        node: String,
        /// 字段名
        field: String,
        /// 底层错误
        source: Box<Icd11Error>,
    },

    /// 文件操作相关错误
    FileOperation {
        /// 文件路径
        path: String,
        /// 操作类型（读取、写入、创建等）
        operation: String,
        /// 底层错误信息
        source: String,
    },

    /// 配置相关错误
    Configuration {
        /// 配置项名称
        field: String,
        /// 错误原因
        reason: String,
    },

    /// 内部处理错误（包装anyhow::Error）
    Internal {
        /// 包装的错误
        source: AnyhowError,
    },
}

impl Icd11Error {
    /// 为底层错误附加节点与字段上下文
    pub fn in_field(self, node: &str, field: &str) -> Self {
        match self {
            // 结构错误本身已经携带上下文
            err @ Icd11Error::Schema { .. } => err,
            other => Icd11Error::Translation {
                node: node.to_string(),
                field: field.to_string(),
                source: Box::new(other),
            },
        }
    }
}

impl fmt::Display for Icd11Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Icd11Error::Network { message, status_code } => {
                if let Some(code) = status_code {
                    write!(f, "网络请求失败 [{}]: {}", code, message)
                } else {
                    write!(f, "网络请求失败: {}", message)
                }
            }
            Icd11Error::Authentication { message } => {
                write!(f, "认证失败: {}", message)
            }
            Icd11Error::Schema { node, field, reason } => {
                write!(f, "节点结构错误 [{}] 字段 {}: {}", node, field, reason)
            }
            Icd11Error::TranslationApi { status_code, message, api_url } => {
                write!(f, "翻译API错误 [{}] {}: {}", status_code, api_url, message)
            }
            Icd11Error::Translation { node, field, source } => {
                write!(f, "翻译失败 [{}] 字段 {}: {}", node, field, source)
            }
            Icd11Error::FileOperation { path, operation, source } => {
                write!(f, "文件{}操作失败 [{}]: {}", operation, path, source)
            }
            Icd11Error::Configuration { field, reason } => {
                write!(f, "配置错误 [{}]: {}", field, reason)
            }
            Icd11Error::Internal { source } => {
                write!(f, "内部处理错误: {}", source)
            }
        }
    }
}

impl std::error::Error for Icd11Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Icd11Error::Translation { source, .. } => Some(source.as_ref()),
            Icd11Error::Internal { source } => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// ICD-11 工具结果类型别名
pub type Result<T> = std::result::Result<T, Icd11Error>;

/// 便捷的错误创建宏
#[macro_export]
macro_rules! icd_error {
    (network, $msg:expr) => {
        $crate::error::Icd11Error::Network {
            message: $msg.to_string(),
            status_code: None,
        }
    };
    (network, $msg:expr, $code:expr) => {
        $crate::error::Icd11Error::Network {
            message: $msg.to_string(),
            status_code: Some($code),
        }
    };
    (auth, $msg:expr) => {
        $crate::error::Icd11Error::Authentication {
            message: $msg.to_string(),
        }
    };
    (schema, $node:expr, $field:expr, $reason:expr) => {
        $crate::error::Icd11Error::Schema {
            node: $node.to_string(),
            field: $field.to_string(),
            reason: $reason.to_string(),
        }
    };
    (translation_api, $code:expr, $msg:expr, $url:expr) => {
        $crate::error::Icd11Error::TranslationApi {
            status_code: $code,
            message: $msg.to_string(),
            api_url: $url.to_string(),
        }
    };
    (file_op, $path:expr, $op:expr, $source:expr) => {
        $crate::error::Icd11Error::FileOperation {
            path: $path.to_string(),
            operation: $op.to_string(),
            source: $source.to_string(),
        }
    };
    (config, $field:expr, $reason:expr) => {
        $crate::error::Icd11Error::Configuration {
            field: $field.to_string(),
            reason: $reason.to_string(),
        }
    };
}

/// 从anyhow::Error转换为Icd11Error
impl From<AnyhowError> for Icd11Error {
    fn from(error: AnyhowError) -> Self {
        Icd11Error::Internal { source: error }
    }
}

/// 从reqwest::Error转换为Icd11Error
impl From<reqwest::Error> for Icd11Error {
    fn from(error: reqwest::Error) -> Self {
        let status_code = error.status().map(|s| s.as_u16());
        Icd11Error::Network {
            message: error.to_string(),
            status_code,
        }
    }
}

/// 从std::io::Error转换为Icd11Error
impl From<std::io::Error> for Icd11Error {
    fn from(error: std::io::Error) -> Self {
        Icd11Error::FileOperation {
            path: "unknown".to_string(),
            operation: "io".to_string(),
            source: error.to_string(),
        }
    }
}

/// 从serde_json::Error转换为Icd11Error
impl From<serde_json::Error> for Icd11Error {
    fn from(error: serde_json::Error) -> Self {
        Icd11Error::Internal {
            source: AnyhowError::new(error).context("JSON处理失败"),
        }
    }
}
