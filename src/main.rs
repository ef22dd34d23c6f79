use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};

use icd11_translator::config::{Cli, Command, CrawlArgs, TranslateOptions};
use icd11_translator::crawler::{CrawlReport, CrawlerConfig, TaxonomyCrawler};
use icd11_translator::icd_client::{IcdApiConfig, IcdClient};
use icd11_translator::node::Node;
use icd11_translator::stats::{format_duration, print_crawl_stats, print_translation_stats, TranslationStats};
use icd11_translator::storage::{read_nodes, save_json, unique_nodes};
use icd11_translator::translator::{ApiTextTranslator, CachingTranslator, StructuralTranslator, TextTranslator};
use icd11_translator::utils::{generate_output_path, init_logging, validate_input_file};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 初始化日志系统
    init_logging(cli.verbose, cli.quiet);

    let show_stats = cli.stats || cli.verbose;
    let total_start = Instant::now();

    let result = match &cli.command {
        Command::Crawl(args) => crawl(args, show_stats).await.map(|_| ()),
        Command::Translate(args) => translate_file(&args.input, &args.options, show_stats).await,
        Command::Run { crawl: crawl_args, translate } => match crawl(crawl_args, show_stats).await {
            Ok(_) => translate_file(&crawl_args.taxonomy, translate, show_stats).await,
            Err(e) => Err(e),
        },
    };

    match result {
        Ok(()) => {
            if !cli.quiet {
                info!("✅ 全部完成！总耗时: {}", format_duration(total_start.elapsed()));
            }
        }
        Err(e) => {
            error!("❌ 执行失败: {:#}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}

/// 爬取分类树并保存
async fn crawl(args: &CrawlArgs, show_stats: bool) -> Result<CrawlReport> {
    let api_config = IcdApiConfig::from_env()
        .context("读取API凭证失败")?
        .release(&args.release)
        .linearization(&args.linearization)
        .timeout(args.fetch_timeout);

    info!("🚀 启动ICD-11爬取");
    info!("🌐 根节点: {}", api_config.root_uri());
    info!("📄 输出文件: {}", args.taxonomy.display());

    let client = IcdClient::new(api_config).context("创建API客户端失败")?;
    let crawler = TaxonomyCrawler::with_config(
        &client,
        CrawlerConfig {
            progress_interval: args.progress_interval,
        },
    );

    let report = crawler.crawl().await.context("爬取分类树失败")?;

    if !report.failures.is_empty() {
        warn!("⚠️  {} 个节点获取失败，结果不完整", report.failures.len());
    }

    save_json(&args.taxonomy, &report.nodes)
        .with_context(|| format!("保存爬取结果失败: {}", args.taxonomy.display()))?;

    if show_stats {
        print_crawl_stats(&report);
    }

    Ok(report)
}

/// 翻译分类树文件
async fn translate_file(input: &Path, options: &TranslateOptions, show_stats: bool) -> Result<()> {
    validate_input_file(input)?;

    let total_start = Instant::now();
    let config = options.to_config();
    let output_path = generate_output_path(input, &options.output, config.target_lang());

    info!("🚀 启动结构化翻译");
    info!("📂 输入文件: {}", input.display());
    info!("📄 输出文件: {}", output_path.display());
    info!("🌐 目标语言: {}", config.target_lang());

    let mut stats = TranslationStats::default();

    // 读取文件
    let read_start = Instant::now();
    let mut nodes = read_nodes(input).with_context(|| format!("读取文件失败: {}", input.display()))?;
    stats.nodes_read = nodes.len();
    if !options.keep_duplicates {
        nodes = unique_nodes(nodes);
    }
    stats.duplicates_removed = stats.nodes_read - nodes.len();
    stats.file_read_time = read_start.elapsed();

    // 执行翻译
    let translate_start = Instant::now();
    let api = ApiTextTranslator::new(config.clone()).context("创建翻译器失败")?;
    let translated = if config.is_cache_enabled() {
        let cached = CachingTranslator::new(api);
        let translated = translate_nodes(&cached, config.target_lang(), nodes, &mut stats).await?;
        stats.cache_hits = cached.hits();
        stats.cache_misses = cached.misses();
        translated
    } else {
        translate_nodes(api, config.target_lang(), nodes, &mut stats).await?
    };
    stats.translation_time = translate_start.elapsed();

    // 写入文件
    let write_start = Instant::now();
    save_json(&output_path, &translated)
        .with_context(|| format!("写入文件失败: {}", output_path.display()))?;
    stats.file_write_time = write_start.elapsed();

    if show_stats {
        print_translation_stats(&stats, total_start.elapsed());
    }

    Ok(())
}

async fn translate_nodes<T: TextTranslator>(
    translator: T,
    target_language: &str,
    nodes: Vec<Node>,
    stats: &mut TranslationStats,
) -> Result<Vec<Node>> {
    let structural = StructuralTranslator::new(translator, target_language);
    let translated = structural.translate_all(nodes).await.context("翻译中止")?;

    stats.nodes_translated = translated.len();
    stats.strings_translated = structural.strings_translated();
    Ok(translated)
}
