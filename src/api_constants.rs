/// ICD-11 API 与翻译服务配置常量
///
/// 该文件定义了WHO接口、翻译服务和爬取流程相关的常量配置，方便统一管理和维护

/// WHO ICD-11 API 配置
pub mod icd_api {
    /// OAuth2 令牌端点
    pub const TOKEN_ENDPOINT: &str = "https://icdaccessmanagement.who.int/connect/token";

    /// ICD API 根地址
    pub const BASE_URL: &str = "https://id.who.int/icd";

    /// 默认发布版本
    pub const DEFAULT_RELEASE_ID: &str = "2022-02";

    /// 默认线性化（Mortality and Morbidity Statistics）
    pub const DEFAULT_LINEARIZATION: &str = "mms";

    /// API 版本请求头
    pub const API_VERSION: &str = "v2";

    /// OAuth2 scope
    pub const SCOPE: &str = "icdapi_access";

    /// OAuth2 授权类型
    pub const GRANT_TYPE: &str = "client_credentials";

    /// 源数据语言
    pub const ACCEPT_LANGUAGE: &str = "en";

    /// 客户端ID环境变量名
    pub const CLIENT_ID_ENV: &str = "CLIENT_ID";

    /// 客户端密钥环境变量名
    pub const CLIENT_SECRET_ENV: &str = "CLIENT_SECRET";

    /// 令牌提前刷新的余量（秒）
    pub const TOKEN_EXPIRY_MARGIN_SECONDS: i64 = 30;

    /// 令牌响应未给出有效期时的默认值（秒）
    pub const DEFAULT_TOKEN_LIFETIME_SECONDS: i64 = 3600;
}

/// 翻译服务配置
pub mod service_config {
    /// 默认翻译API地址
    pub const DEFAULT_API_URL: &str = "http://localhost:1188/translate";

    /// 默认源语言
    pub const DEFAULT_SOURCE_LANG: &str = "en";

    /// 默认目标语言
    pub const DEFAULT_TARGET_LANG: &str = "da";

    /// 支持的语言代码
    pub const SUPPORTED_LANGUAGES: &[&str] = &[
        "zh", "en", "ja", "ko", "fr", "de", "es", "it", "pt", "ru",
        "ar", "hi", "th", "vi", "id", "ms", "tl", "nl", "sv", "da",
        "no", "fi", "pl", "cs", "sk", "hu", "ro", "bg", "hr", "sr",
        "sl", "et", "lv", "lt", "mt", "ga", "cy", "is", "mk", "sq"
    ];

    /// 默认最大重试次数
    pub const DEFAULT_MAX_RETRIES: usize = 3;

    /// 请求超时时间（秒）
    pub const REQUEST_TIMEOUT_SECONDS: u64 = 30;

    /// 翻译进度输出间隔（节点数）
    pub const PROGRESS_INTERVAL: usize = 100;
}

/// 爬取配置
pub mod crawler_config {
    /// 进度输出间隔（成功获取的节点数）
    pub const PROGRESS_INTERVAL: usize = 100;

    /// 单个节点请求超时时间（秒）
    pub const DEFAULT_FETCH_TIMEOUT: u64 = 30;

    /// 默认爬取结果文件
    pub const DEFAULT_TAXONOMY_PATH: &str = "data/icd11_taxonomy.json";

    /// 需要回退一级路径段的终端标识
    pub const RESIDUAL_SEGMENTS: &[&str] = &["unspecified", "other"];
}

/// 节点字段分类
pub mod field_sets {
    /// 单值多语言文本字段
    pub const SCALAR_TEXT_FIELDS: &[&str] = &[
        "title",
        "description",
        "longDefinition",
        "fullySpecifiedName",
        "codingNote",
    ];

    /// 带引用的标签列表字段
    pub const LABELED_REFERENCE_FIELDS: &[&str] = &["foundationChildElsewhere", "exclusion"];

    /// 纯标签列表字段
    pub const LABELED_FIELDS: &[&str] = &["inclusion", "indexTerm"];
}

/// 实用工具函数
/// 验证API URL是否有效
pub fn is_valid_api_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// 验证语言代码是否支持
pub fn is_supported_language(lang: &str) -> bool {
    service_config::SUPPORTED_LANGUAGES.contains(&lang)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_validation() {
        assert!(is_supported_language("da"));
        assert!(is_supported_language("en"));
        assert!(!is_supported_language("xx"));
    }

    #[test]
    fn test_api_url_validation() {
        assert!(is_valid_api_url("https://example.com"));
        assert!(is_valid_api_url("http://localhost:8080"));
        assert!(!is_valid_api_url("ftp://example.com"));
        assert!(!is_valid_api_url("invalid-url"));
    }

    #[test]
    fn test_field_sets_are_disjoint() {
        for key in field_sets::SCALAR_TEXT_FIELDS {
            assert!(!field_sets::LABELED_REFERENCE_FIELDS.contains(key));
            assert!(!field_sets::LABELED_FIELDS.contains(key));
        }
        for key in field_sets::LABELED_REFERENCE_FIELDS {
            assert!(!field_sets::LABELED_FIELDS.contains(key));
        }
    }
}
