//! 结构化翻译模块
//!
//! 逐字段遍历节点，只改写表示自然语言内容的字段，其余字段原样保留。

// 标准库导入
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

// 第三方crate导入
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

// 本地模块导入
use crate::api_constants::{field_sets, service_config};
use crate::config::TranslatorConfig;
use crate::error::{Icd11Error, Result};
use crate::icd_error;
use crate::node::{node_label, Node};

/// 文本翻译能力
#[async_trait]
pub trait TextTranslator: Send + Sync {
    /// 翻译一段文本
    async fn translate(&self, text: &str) -> Result<String>;
}

#[async_trait]
impl<T: TextTranslator + ?Sized> TextTranslator for &T {
    async fn translate(&self, text: &str) -> Result<String> {
        (**self).translate(text).await
    }
}

/// 基于HTTP翻译服务的实现
pub struct ApiTextTranslator {
    client: Client,
    config: TranslatorConfig,
    retry_delay: Duration,
}

impl ApiTextTranslator {
    /// 创建翻译器
    pub fn new(config: TranslatorConfig) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout()))
            .build()?;

        Ok(Self {
            client,
            config,
            retry_delay: Duration::from_secs(2),
        })
    }

    /// 设置重试基础延迟
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// 发送单次翻译请求
    async fn request(&self, text: &str) -> Result<String> {
        let api_url = self.config.api_url();
        let response = self
            .client
            .post(api_url)
            .json(&json!({
                "text": text,
                "source_lang": self.config.source_lang(),
                "target_lang": self.config.target_lang()
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(icd_error!(translation_api, status.as_u16(), body, api_url));
        }

        let response_text = response.text().await?;
        extract_translated_text(&response_text, status.as_u16(), api_url)
    }
}

#[async_trait]
impl TextTranslator for ApiTextTranslator {
    async fn translate(&self, text: &str) -> Result<String> {
        let max_attempts = self.config.max_retries() + 1;
        let mut last_error: Option<Icd11Error> = None;

        for attempt in 1..=max_attempts {
            match self.request(text).await {
                Ok(translated) => return Ok(translated),
                Err(e) => {
                    warn!("❌ 翻译请求失败 (尝试 {}/{}): {}", attempt, max_attempts, e);
                    last_error = Some(e);

                    if attempt < max_attempts {
                        tokio::time::sleep(self.retry_delay * attempt as u32).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| icd_error!(network, "所有重试尝试均失败")))
    }
}

/// 从翻译服务响应中取出译文
///
/// 依次尝试 `data`、`text`、`result` 字段。响应不是JSON，或三个字段都不是字符串时返回
/// `TranslationApi` 错误，不把响应原文当作译文。
pub fn extract_translated_text(response_text: &str, status_code: u16, api_url: &str) -> Result<String> {
    let json_val: Value = serde_json::from_str(response_text).map_err(|_| {
        icd_error!(
            translation_api,
            status_code,
            format!("响应不是JSON: {}", response_text),
            api_url
        )
    })?;

    json_val
        .get("data")
        .or_else(|| json_val.get("text"))
        .or_else(|| json_val.get("result"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            icd_error!(
                translation_api,
                status_code,
                format!("响应中没有译文字段: {}", response_text),
                api_url
            )
        })
}

/// 带缓存的翻译器
///
/// 相同文本只调用一次底层翻译器。默认不启用。
pub struct CachingTranslator<T> {
    inner: T,
    cache: Mutex<HashMap<String, String>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl<T: TextTranslator> CachingTranslator<T> {
    /// 包装底层翻译器
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            cache: Mutex::new(HashMap::new()),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    /// 缓存命中次数
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::Relaxed)
    }

    /// 缓存未命中次数
    pub fn misses(&self) -> usize {
        self.misses.load(Ordering::Relaxed)
    }

    fn cached(&self, text: &str) -> Option<String> {
        self.cache
            .lock()
            .ok()
            .and_then(|cache| cache.get(text).cloned())
    }
}

#[async_trait]
impl<T: TextTranslator> TextTranslator for CachingTranslator<T> {
    async fn translate(&self, text: &str) -> Result<String> {
        if let Some(hit) = self.cached(text) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(hit);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let translated = self.inner.translate(text).await?;

        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(text.to_string(), translated.clone());
        }
        Ok(translated)
    }
}

/// 字段分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldClass {
    /// 单值文本 `{"@value": ...}`
    ScalarText,
    /// 标签列表，元素带有 `foundationReference` / `linearizationReference`
    LabeledReferenceList,
    /// 纯标签列表
    LabeledList,
    /// 原样保留
    PassThrough,
}

impl FieldClass {
    /// 根据字段名分类
    pub fn classify(key: &str) -> Self {
        if field_sets::SCALAR_TEXT_FIELDS.contains(&key) {
            FieldClass::ScalarText
        } else if field_sets::LABELED_REFERENCE_FIELDS.contains(&key) {
            FieldClass::LabeledReferenceList
        } else if field_sets::LABELED_FIELDS.contains(&key) {
            FieldClass::LabeledList
        } else {
            FieldClass::PassThrough
        }
    }
}

const VALUE_KEY: &str = "@value";
const LABEL_KEY: &str = "label";
const FOUNDATION_REFERENCE: &str = "foundationReference";
const LINEARIZATION_REFERENCE: &str = "linearizationReference";

/// 结构化翻译器
///
/// 按输入顺序逐个节点翻译；任何结构错误或翻译错误都会中止整个批次。
pub struct StructuralTranslator<T> {
    translator: T,
    target_language: String,
    progress_interval: usize,
    strings_translated: AtomicUsize,
}

impl<T: TextTranslator> StructuralTranslator<T> {
    /// 创建结构化翻译器
    pub fn new(translator: T, target_language: &str) -> Self {
        Self {
            translator,
            target_language: target_language.to_string(),
            progress_interval: service_config::PROGRESS_INTERVAL,
            strings_translated: AtomicUsize::new(0),
        }
    }

    /// 设置进度输出间隔
    pub fn progress_interval(mut self, interval: usize) -> Self {
        self.progress_interval = interval;
        self
    }

    /// 已翻译的文本数量
    pub fn strings_translated(&self) -> usize {
        self.strings_translated.load(Ordering::Relaxed)
    }

    /// 获取底层翻译器
    pub fn inner(&self) -> &T {
        &self.translator
    }

    /// 翻译全部节点
    pub async fn translate_all(&self, nodes: Vec<Node>) -> Result<Vec<Node>> {
        let total = nodes.len();
        info!("📝 开始翻译 {} 个节点 -> {}", total, self.target_language);

        let mut translated = Vec::with_capacity(total);
        for (index, node) in nodes.into_iter().enumerate() {
            translated.push(self.translate_node(node).await?);

            let done = index + 1;
            if self.progress_interval > 0 && done % self.progress_interval == 0 {
                info!("📈 翻译进度: {}/{}", done, total);
            }
        }

        info!(
            "✅ 翻译完成: {} 个节点，{} 段文本",
            translated.len(),
            self.strings_translated()
        );
        Ok(translated)
    }

    /// 翻译单个节点
    ///
    /// 输出节点与输入节点的字段集合和顺序相同，未分类字段直接移入输出。
    pub async fn translate_node(&self, node: Node) -> Result<Node> {
        let label = node_label(&node);
        debug!("翻译节点 {}", label);

        let mut translated = Map::with_capacity(node.len());
        for (key, value) in node {
            let new_value = match FieldClass::classify(&key) {
                FieldClass::PassThrough => value,
                FieldClass::ScalarText => self.translate_scalar(&label, &key, &value).await?,
                FieldClass::LabeledReferenceList => {
                    self.translate_list(&label, &key, &value, true).await?
                }
                FieldClass::LabeledList => self.translate_list(&label, &key, &value, false).await?,
            };
            translated.insert(key, new_value);
        }
        Ok(translated)
    }

    async fn translate_scalar(&self, node: &str, key: &str, value: &Value) -> Result<Value> {
        let text = value
            .get(VALUE_KEY)
            .and_then(Value::as_str)
            .ok_or_else(|| icd_error!(schema, node, key, "缺少 @value 字符串"))?;

        self.language_value(node, key, text).await
    }

    async fn translate_list(
        &self,
        node: &str,
        key: &str,
        value: &Value,
        with_references: bool,
    ) -> Result<Value> {
        let children = value
            .as_array()
            .ok_or_else(|| icd_error!(schema, node, key, "字段不是数组"))?;

        let mut translated = Vec::with_capacity(children.len());
        for (index, child) in children.iter().enumerate() {
            let field = format!("{}[{}]", key, index);
            let text = child
                .get(LABEL_KEY)
                .ok_or_else(|| icd_error!(schema, node, field, "缺少 label"))?
                .get(VALUE_KEY)
                .and_then(Value::as_str)
                .ok_or_else(|| icd_error!(schema, node, field, "label 缺少 @value 字符串"))?;

            let mut entry = Map::new();
            entry.insert(LABEL_KEY.to_string(), self.language_value(node, &field, text).await?);

            if with_references {
                let foundation = child
                    .get(FOUNDATION_REFERENCE)
                    .ok_or_else(|| icd_error!(schema, node, field, "缺少 foundationReference"))?;
                entry.insert(FOUNDATION_REFERENCE.to_string(), foundation.clone());
                entry.insert(
                    LINEARIZATION_REFERENCE.to_string(),
                    child.get(LINEARIZATION_REFERENCE).cloned().unwrap_or(Value::Null),
                );
            }

            translated.push(Value::Object(entry));
        }
        Ok(Value::Array(translated))
    }

    /// 翻译文本并生成 `{language, value}` 记录
    async fn language_value(&self, node: &str, field: &str, text: &str) -> Result<Value> {
        let translated = self
            .translator
            .translate(text)
            .await
            .map_err(|e| e.in_field(node, field))?;
        self.strings_translated.fetch_add(1, Ordering::Relaxed);

        Ok(json!({
            "language": self.target_language,
            "value": translated
        }))
    }
}
