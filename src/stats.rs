use std::time::Duration;

use crate::crawler::CrawlReport;

/// 翻译阶段统计
#[derive(Debug, Default)]
pub struct TranslationStats {
    pub file_read_time: Duration,
    pub translation_time: Duration,
    pub file_write_time: Duration,
    pub nodes_read: usize,
    pub duplicates_removed: usize,
    pub nodes_translated: usize,
    pub strings_translated: usize,
    pub cache_hits: usize,
    pub cache_misses: usize,
}

/// 打印爬取统计
pub fn print_crawl_stats(report: &CrawlReport) {
    let stats = &report.stats;

    println!("\n🕷️ 爬取统计报告:");
    println!("═══════════════════════════════════════");
    println!("   获取节点: {} 个 (含根节点)", report.nodes.len());
    println!("   请求次数: {} 次", stats.fetch_attempts);
    println!("   失败次数: {} 次", report.failures.len());
    println!("   重复引用: {} 个", stats.duplicates_skipped);
    println!("   总耗时: {}", format_duration(stats.duration));

    if !report.failures.is_empty() {
        println!("\n❌ 失败的引用:");
        for failure in report.failures.iter().take(20) {
            println!("   {} ({})", failure.reference, failure.reason);
        }
        if report.failures.len() > 20 {
            println!("   ... 以及另外 {} 个", report.failures.len() - 20);
        }
    }

    if stats.duration.as_secs_f64() > 0.0 {
        println!(
            "\n🚀 爬取速度: {:.1} 节点/秒",
            report.nodes.len() as f64 / stats.duration.as_secs_f64()
        );
    }
}

/// 打印翻译统计
pub fn print_translation_stats(stats: &TranslationStats, total_duration: Duration) {
    println!("\n📊 翻译统计报告:");
    println!("═══════════════════════════════════════");

    // 时间分解
    println!("⏱️  时间分解:");
    println!("   文件读取: {}", format_duration(stats.file_read_time));
    println!("   翻译执行: {}", format_duration(stats.translation_time));
    println!("   文件写入: {}", format_duration(stats.file_write_time));
    println!("   总耗时: {}", format_duration(total_duration));

    // 节点统计
    println!("\n🔤 节点统计:");
    println!("   读取节点: {} 个", stats.nodes_read);
    println!("   去除重复: {} 个", stats.duplicates_removed);
    println!("   翻译节点: {} 个", stats.nodes_translated);
    println!("   翻译文本: {} 段", stats.strings_translated);

    // 缓存统计
    if stats.cache_hits + stats.cache_misses > 0 {
        let cache_hit_rate =
            stats.cache_hits as f64 / (stats.cache_hits + stats.cache_misses) as f64;
        println!("\n💾 缓存统计:");
        println!("   缓存命中: {} 次", stats.cache_hits);
        println!("   缓存未命中: {} 次", stats.cache_misses);
        println!("   命中率: {:.1}%", cache_hit_rate * 100.0);
    }

    if stats.translation_time.as_secs_f64() > 0.0 {
        println!(
            "\n🚀 翻译速度: {:.1} 段/秒",
            stats.strings_translated as f64 / stats.translation_time.as_secs_f64()
        );
    }
}

/// 格式化持续时间
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1000 {
        format!("{}ms", millis)
    } else if millis < 60_000 {
        format!("{:.3}s", duration.as_secs_f64())
    } else {
        let secs = duration.as_secs();
        format!("{}m{:02}s", secs / 60, secs % 60)
    }
}
