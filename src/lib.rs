//! ICD-11 Translator - 分类体系爬取与结构化翻译工具库
//!
//! 这个库提供了ICD-11分类树爬取、节点字段分类翻译和JSON持久化等核心功能。

pub mod api_constants;
pub mod config;
pub mod crawler;
pub mod error;
pub mod icd_client;
pub mod node;
pub mod stats;
pub mod storage;
pub mod translator;
pub mod utils;
