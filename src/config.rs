//! 配置管理模块
//!
//! 提供CLI参数解析和翻译配置管理功能

// 标准库导入
use std::path::PathBuf;

// 第三方crate导入
use clap::{Args, Parser, Subcommand};

// 本地模块导入
use crate::api_constants::{crawler_config, icd_api, is_supported_language, is_valid_api_url, service_config};
use crate::error::Result;
use crate::icd_error;

/// 翻译配置结构体
///
/// 支持Builder模式进行链式配置。
///
/// # Examples
///
/// ```rust
/// use icd11_translator::config::TranslatorConfig;
///
/// let config = TranslatorConfig::new()
///     .target_language("da")
///     .with_api_url("http://localhost:1188/translate")
///     .with_max_retries(5)
///     .enable_cache(true);
/// assert_eq!(config.target_lang(), "da");
/// ```
#[derive(Debug, Clone)]
pub struct TranslatorConfig {
    /// 源语言代码
    source_lang: String,
    /// 目标语言代码 (如: da, de, zh)
    target_lang: String,
    /// 翻译API服务地址
    api_url: String,
    /// 最大重试次数
    max_retries: usize,
    /// 单次请求超时（秒）
    timeout: u64,
    /// 是否启用跨节点缓存
    enable_cache: bool,
}

impl TranslatorConfig {
    /// 创建新的配置实例
    ///
    /// 返回具有默认值的配置实例：
    /// - 源语言: 英语 ("en")
    /// - 目标语言: 丹麦语 ("da")
    /// - API地址: 本地翻译服务
    /// - 最大重试次数: 3
    /// - 启用缓存: false（相同文本每次出现都会重新翻译）
    pub fn new() -> Self {
        Self {
            source_lang: service_config::DEFAULT_SOURCE_LANG.to_string(),
            target_lang: service_config::DEFAULT_TARGET_LANG.to_string(),
            api_url: service_config::DEFAULT_API_URL.to_string(),
            max_retries: service_config::DEFAULT_MAX_RETRIES,
            timeout: service_config::REQUEST_TIMEOUT_SECONDS,
            enable_cache: false,
        }
    }

    /// 获取源语言代码
    pub fn source_lang(&self) -> &str {
        &self.source_lang
    }

    /// 获取目标语言代码
    pub fn target_lang(&self) -> &str {
        &self.target_lang
    }

    /// 获取API地址
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// 获取最大重试次数
    pub fn max_retries(&self) -> usize {
        self.max_retries
    }

    /// 获取请求超时
    pub fn timeout(&self) -> u64 {
        self.timeout
    }

    /// 检查是否启用缓存
    pub fn is_cache_enabled(&self) -> bool {
        self.enable_cache
    }

    /// 设置源语言代码
    pub fn source_language(mut self, lang: &str) -> Self {
        self.source_lang = lang.to_string();
        self
    }

    /// 设置目标语言代码
    pub fn target_language(mut self, lang: &str) -> Self {
        self.target_lang = lang.to_string();
        self
    }

    /// 设置API地址
    pub fn with_api_url(mut self, url: &str) -> Self {
        self.api_url = url.to_string();
        self
    }

    /// 设置最大重试次数
    pub fn with_max_retries(mut self, retries: usize) -> Self {
        self.max_retries = retries;
        self
    }

    /// 设置请求超时
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout = seconds;
        self
    }

    /// 设置是否启用缓存
    pub fn enable_cache(mut self, enable: bool) -> Self {
        self.enable_cache = enable;
        self
    }

    /// 校验配置
    pub fn validate(&self) -> Result<()> {
        if !is_valid_api_url(&self.api_url) {
            return Err(icd_error!(config, "api_url", format!("无效的API地址: {}", self.api_url)));
        }
        if !is_supported_language(&self.target_lang) {
            return Err(icd_error!(config, "target_lang", format!("不支持的目标语言: {}", self.target_lang)));
        }
        Ok(())
    }
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// CLI参数结构
#[derive(Parser)]
#[command(author, version, about = "ICD-11分类体系爬取与翻译CLI工具", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// 详细输出模式
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// 静默模式 (仅输出错误)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// 显示运行统计
    #[arg(long, global = true)]
    pub stats: bool,
}

/// 子命令
#[derive(Subcommand)]
pub enum Command {
    /// 从WHO API爬取完整分类树
    Crawl(CrawlArgs),
    /// 翻译已爬取的分类树文件
    Translate(TranslateArgs),
    /// 爬取后立即翻译
    Run {
        #[command(flatten)]
        crawl: CrawlArgs,
        #[command(flatten)]
        translate: TranslateOptions,
    },
}

/// 爬取参数
#[derive(Args, Debug, Clone)]
pub struct CrawlArgs {
    /// 爬取结果输出路径
    #[arg(long = "taxonomy", value_name = "FILE", default_value = crawler_config::DEFAULT_TAXONOMY_PATH)]
    pub taxonomy: PathBuf,

    /// ICD-11 发布版本
    #[arg(long, default_value = icd_api::DEFAULT_RELEASE_ID)]
    pub release: String,

    /// 线性化名称
    #[arg(long, default_value = icd_api::DEFAULT_LINEARIZATION)]
    pub linearization: String,

    /// 单个节点请求超时时间（秒）
    #[arg(long, default_value_t = crawler_config::DEFAULT_FETCH_TIMEOUT)]
    pub fetch_timeout: u64,

    /// 进度输出间隔（节点数）
    #[arg(long, default_value_t = crawler_config::PROGRESS_INTERVAL)]
    pub progress_interval: usize,
}

/// 翻译参数
#[derive(Args, Debug, Clone)]
pub struct TranslateArgs {
    /// 输入的分类树JSON文件
    #[arg(short, long, value_name = "FILE", default_value = crawler_config::DEFAULT_TAXONOMY_PATH)]
    pub input: PathBuf,

    #[command(flatten)]
    pub options: TranslateOptions,
}

/// 翻译选项（translate 与 run 共用）
#[derive(Args, Debug, Clone)]
pub struct TranslateOptions {
    /// 输出文件路径 (可选，默认为输入文件名+语言代码)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// 目标语言代码 (如: da, de, zh)
    #[arg(short, long, default_value = service_config::DEFAULT_TARGET_LANG)]
    pub lang: String,

    /// 源语言代码
    #[arg(long, default_value = service_config::DEFAULT_SOURCE_LANG)]
    pub source_lang: String,

    /// 翻译API地址
    #[arg(short, long, default_value = service_config::DEFAULT_API_URL)]
    pub api: String,

    /// 最大重试次数
    #[arg(long, default_value_t = service_config::DEFAULT_MAX_RETRIES)]
    pub max_retries: usize,

    /// 启用缓存 (相同文本只翻译一次)
    #[arg(long)]
    pub cache: bool,

    /// 保留输入中的重复节点
    #[arg(long)]
    pub keep_duplicates: bool,
}

impl TranslateOptions {
    /// 转换为翻译配置
    pub fn to_config(&self) -> TranslatorConfig {
        TranslatorConfig::new()
            .source_language(&self.source_lang)
            .target_language(&self.lang)
            .with_api_url(&self.api)
            .with_max_retries(self.max_retries)
            .enable_cache(self.cache)
    }
}
