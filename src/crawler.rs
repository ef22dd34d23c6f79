//! 分类树爬取模块
//!
//! 此模块负责：
//! - 从根节点出发，按广度优先顺序发现所有可达节点
//! - 按规范化后的节点标识去重，每个标识最多获取一次
//! - 容忍单个节点获取失败，记录后继续爬取

// 标准库导入
use std::collections::{HashSet, VecDeque};
use std::time::{Duration, Instant};

// 第三方crate导入
use async_trait::async_trait;
use tracing::{debug, info, warn};

// 本地模块导入
use crate::api_constants::crawler_config;
use crate::error::Result;
use crate::icd_error;
use crate::node::{child_references, node_id, Node, NodeId};

/// 节点来源能力
///
/// 爬虫只依赖这两个操作；HTTP传输与认证细节由实现方负责。
#[async_trait]
pub trait NodeSource: Send + Sync {
    /// 获取根节点
    async fn fetch_root(&self) -> Result<Node>;

    /// 按标识获取单个节点
    async fn fetch_node(&self, id: &NodeId) -> Result<Node>;
}

#[async_trait]
impl<S: NodeSource + ?Sized> NodeSource for &S {
    async fn fetch_root(&self) -> Result<Node> {
        (**self).fetch_root().await
    }

    async fn fetch_node(&self, id: &NodeId) -> Result<Node> {
        (**self).fetch_node(id).await
    }
}

/// 爬虫配置结构体
#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    /// 每成功获取多少个节点输出一次进度
    pub progress_interval: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            progress_interval: crawler_config::PROGRESS_INTERVAL,
        }
    }
}

/// 单次获取失败的记录
#[derive(Debug, Clone)]
pub struct CrawlFailure {
    /// 队列中的原始引用
    pub reference: String,
    /// 规范化后的标识
    pub node_id: NodeId,
    /// 失败原因
    pub reason: String,
}

/// 爬取统计
#[derive(Debug, Clone, Default)]
pub struct CrawlStats {
    /// 调用 `fetch_node` 的次数
    pub fetch_attempts: usize,
    /// 因已访问而丢弃的引用数
    pub duplicates_skipped: usize,
    /// 总耗时
    pub duration: Duration,
}

/// 爬取结果
#[derive(Debug)]
pub struct CrawlReport {
    /// 按发现顺序排列的节点，根节点在首位
    pub nodes: Vec<Node>,
    /// 获取失败的引用
    pub failures: Vec<CrawlFailure>,
    /// 统计信息
    pub stats: CrawlStats,
}

/// 爬取过程中的状态
///
/// 创建时根节点已标记为访问过，其子引用已入队；仅由爬取循环修改。
#[derive(Debug)]
pub struct CrawlState {
    visited: HashSet<NodeId>,
    pending: VecDeque<String>,
    nodes: Vec<Node>,
}

impl CrawlState {
    /// 以根节点初始化状态
    pub fn new(root: Node) -> Result<Self> {
        let root_id = node_id(&root)
            .ok_or_else(|| icd_error!(schema, "<root>", "@id", "根节点缺少 @id 引用"))?;

        let pending: VecDeque<String> = child_references(&root).into();

        let mut visited = HashSet::new();
        visited.insert(root_id);

        Ok(Self {
            visited,
            pending,
            nodes: vec![root],
        })
    }

    /// 取出最早入队的引用
    pub fn next_reference(&mut self) -> Option<String> {
        self.pending.pop_front()
    }

    /// 检查标识是否已访问
    pub fn is_visited(&self, id: &NodeId) -> bool {
        self.visited.contains(id)
    }

    /// 记录成功获取的节点并将其子引用入队
    ///
    /// 入队时不去重，重复引用在出队时丢弃。
    pub fn record(&mut self, id: NodeId, node: Node) {
        self.pending.extend(child_references(&node));
        self.visited.insert(id);
        self.nodes.push(node);
    }

    /// 已获取的节点数（含根节点）
    pub fn resolved(&self) -> usize {
        self.nodes.len()
    }

    /// 等待处理的引用数
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// 结束爬取，交出节点序列
    pub fn into_nodes(self) -> Vec<Node> {
        self.nodes
    }
}

/// 分类树爬虫
///
/// 从根节点出发按广度优先顺序遍历子引用。单个节点获取失败只会被记录，
/// 不会中止爬取；失败的节点不会被标记为已访问，因此若之后经由另一条
/// 引用再次发现同一标识，会再尝试获取一次。
///
/// # Examples
///
/// ```rust,no_run
/// use icd11_translator::crawler::TaxonomyCrawler;
/// use icd11_translator::icd_client::{IcdApiConfig, IcdClient};
///
/// # async fn run() -> icd11_translator::error::Result<()> {
/// let client = IcdClient::new(IcdApiConfig::from_env()?)?;
/// let report = TaxonomyCrawler::new(&client).crawl().await?;
/// println!("{} nodes", report.nodes.len());
/// # Ok(())
/// # }
/// ```
pub struct TaxonomyCrawler<S> {
    source: S,
    config: CrawlerConfig,
}

impl<S: NodeSource> TaxonomyCrawler<S> {
    /// 使用默认配置创建爬虫
    pub fn new(source: S) -> Self {
        Self::with_config(source, CrawlerConfig::default())
    }

    /// 使用指定配置创建爬虫
    pub fn with_config(source: S, config: CrawlerConfig) -> Self {
        Self { source, config }
    }

    /// 设置进度输出间隔
    pub fn progress_interval(mut self, interval: usize) -> Self {
        self.config.progress_interval = interval;
        self
    }

    /// 执行爬取
    ///
    /// 只有根节点获取失败会返回错误，其余节点失败均记录在结果中。
    pub async fn crawl(&self) -> Result<CrawlReport> {
        let start = Instant::now();

        info!("🕷️ 开始爬取分类树");
        let root = self.source.fetch_root().await?;
        let mut state = CrawlState::new(root)?;
        info!("🌳 根节点已获取，待处理子引用: {}", state.pending());

        let mut failures = Vec::new();
        let mut stats = CrawlStats::default();
        let mut counter = 0usize;

        while let Some(reference) = state.next_reference() {
            let id = NodeId::from_reference(&reference);

            if state.is_visited(&id) {
                stats.duplicates_skipped += 1;
                continue;
            }

            stats.fetch_attempts += 1;
            match self.source.fetch_node(&id).await {
                Ok(node) => {
                    debug!("获取节点 {} ({})", id, reference);
                    state.record(id, node);

                    counter += 1;
                    if self.config.progress_interval > 0 && counter % self.config.progress_interval == 0 {
                        info!("📈 已爬取 {} 个节点，队列剩余 {}", counter, state.pending());
                    }
                }
                Err(e) => {
                    warn!("❌ 节点获取失败 {}: {}", reference, e);
                    failures.push(CrawlFailure {
                        reference,
                        node_id: id,
                        reason: e.to_string(),
                    });
                }
            }
        }

        stats.duration = start.elapsed();
        let nodes = state.into_nodes();

        info!(
            "✅ 爬取完成: {} 个节点，{} 次失败，耗时 {:.1}秒",
            nodes.len(),
            failures.len(),
            stats.duration.as_secs_f64()
        );

        Ok(CrawlReport { nodes, failures, stats })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Icd11Error;
    use crate::node::node_reference;
    use serde_json::{json, Value};
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    const BASE: &str = "http://id.who.int/icd/release/11/2022-02/mms";

    fn uri(id: &str) -> String {
        format!("{}/{}", BASE, id)
    }

    fn make_node(id: &str, children: &[&str]) -> Node {
        let mut node = json!({
            "@id": uri(id),
            "title": {"@language": "en", "@value": format!("Node {}", id)},
        });
        if !children.is_empty() {
            let refs: Vec<Value> = children.iter().map(|c| Value::String(uri(c))).collect();
            node["child"] = Value::Array(refs);
        }
        node.as_object().cloned().unwrap()
    }

    /// 内存中的节点图，可配置失败的标识
    struct GraphSource {
        root: Node,
        nodes: HashMap<String, Node>,
        failing: Mutex<HashMap<String, usize>>,
        calls: Mutex<Vec<String>>,
    }

    impl GraphSource {
        fn new(root_children: &[&str], edges: &[(&str, &[&str])]) -> Self {
            let nodes = edges
                .iter()
                .map(|(id, children)| (id.to_string(), make_node(id, children)))
                .collect();
            Self {
                root: make_node("root", root_children),
                nodes,
                failing: Mutex::new(HashMap::new()),
                calls: Mutex::new(Vec::new()),
            }
        }

        /// 让指定标识的前 `times` 次获取失败
        fn failing(self, id: &str, times: usize) -> Self {
            self.failing.lock().unwrap().insert(id.to_string(), times);
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl NodeSource for GraphSource {
        async fn fetch_root(&self) -> Result<Node> {
            Ok(self.root.clone())
        }

        async fn fetch_node(&self, id: &NodeId) -> Result<Node> {
            self.calls.lock().unwrap().push(id.to_string());

            if let Some(remaining) = self.failing.lock().unwrap().get_mut(id.as_str()) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(icd_error!(network, "timeout", 503));
                }
            }

            self.nodes
                .get(id.as_str())
                .cloned()
                .ok_or_else(|| icd_error!(network, format!("not found: {}", id), 404))
        }
    }

    fn ids(nodes: &[Node]) -> Vec<String> {
        nodes
            .iter()
            .map(|n| NodeId::from_reference(node_reference(n).unwrap()).to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_crawl_full_graph_breadth_first() {
        let source = GraphSource::new(
            &["a", "b"],
            &[("a", &["c", "d"]), ("b", &["e"]), ("c", &[]), ("d", &[]), ("e", &["f"]), ("f", &[])],
        );

        let report = TaxonomyCrawler::new(&source).crawl().await.unwrap();

        assert_eq!(ids(&report.nodes), vec!["root", "a", "b", "c", "d", "e", "f"]);
        assert!(report.failures.is_empty());
        assert_eq!(report.stats.fetch_attempts, 6);
    }

    #[tokio::test]
    async fn test_crawl_each_id_once() {
        // 菱形结构：c 被 a 和 b 同时引用
        let source = GraphSource::new(
            &["a", "b"],
            &[("a", &["c"]), ("b", &["c"]), ("c", &["d"]), ("d", &[])],
        );

        let report = TaxonomyCrawler::new(&source).crawl().await.unwrap();
        let found = ids(&report.nodes);
        let unique: HashSet<_> = found.iter().collect();

        assert_eq!(found.len(), 5);
        assert_eq!(unique.len(), found.len());
        assert_eq!(found[0], "root");
        assert_eq!(report.stats.duplicates_skipped, 1);
        assert_eq!(source.calls().iter().filter(|c| *c == "c").count(), 1);
    }

    #[tokio::test]
    async fn test_crawl_cycle_terminates() {
        // b 指回根节点，c 指回 a
        let source = GraphSource::new(
            &["a"],
            &[("a", &["b", "c"]), ("b", &["root"]), ("c", &["a"])],
        );

        let report = TaxonomyCrawler::new(&source).crawl().await.unwrap();

        assert_eq!(ids(&report.nodes), vec!["root", "a", "b", "c"]);
        assert_eq!(report.stats.duplicates_skipped, 2);
    }

    #[tokio::test]
    async fn test_crawl_residual_reference_maps_to_parent() {
        let mut root = make_node("root", &["123"]);
        root["child"]
            .as_array_mut()
            .unwrap()
            .push(Value::String(format!("{}/123/other", BASE)));
        let mut source = GraphSource::new(&[], &[("123", &[])]);
        source.root = root;

        let report = TaxonomyCrawler::new(&source).crawl().await.unwrap();

        assert_eq!(ids(&report.nodes), vec!["root", "123"]);
        assert_eq!(source.calls(), vec!["123"]);
    }

    #[tokio::test]
    async fn test_crawl_skips_single_failure() {
        let source = GraphSource::new(
            &["a", "b", "c"],
            &[("a", &[]), ("b", &[]), ("c", &[])],
        )
        .failing("b", usize::MAX);

        let report = TaxonomyCrawler::new(&source).crawl().await.unwrap();

        assert_eq!(ids(&report.nodes), vec!["root", "a", "c"]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].node_id.as_str(), "b");
        assert_eq!(report.failures[0].reference, uri("b"));
    }

    #[tokio::test]
    async fn test_crawl_failed_node_children_not_enqueued() {
        let source = GraphSource::new(&["a"], &[("a", &["x"]), ("x", &[])]).failing("a", 1);

        let report = TaxonomyCrawler::new(&source).crawl().await.unwrap();

        assert_eq!(ids(&report.nodes), vec!["root"]);
        assert_eq!(source.calls(), vec!["a"]);
    }

    #[tokio::test]
    async fn test_crawl_retries_failed_node_on_rediscovery() {
        // a 第一次获取失败；b 再次引用 a 时重新获取
        let source = GraphSource::new(&["a", "b"], &[("a", &[]), ("b", &["a"])]).failing("a", 1);

        let report = TaxonomyCrawler::new(&source).crawl().await.unwrap();

        assert_eq!(ids(&report.nodes), vec!["root", "b", "a"]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(source.calls(), vec!["a", "b", "a"]);
    }

    #[tokio::test]
    async fn test_crawl_root_without_children() {
        let source = GraphSource::new(&[], &[]);

        let report = TaxonomyCrawler::new(&source).crawl().await.unwrap();

        assert_eq!(report.nodes.len(), 1);
        assert!(source.calls().is_empty());
    }

    #[tokio::test]
    async fn test_crawl_root_failure_is_fatal() {
        struct BrokenRoot;

        #[async_trait]
        impl NodeSource for BrokenRoot {
            async fn fetch_root(&self) -> Result<Node> {
                Err(icd_error!(auth, "invalid_client"))
            }

            async fn fetch_node(&self, _id: &NodeId) -> Result<Node> {
                unreachable!()
            }
        }

        let result = TaxonomyCrawler::new(BrokenRoot).crawl().await;
        assert!(matches!(result, Err(Icd11Error::Authentication { .. })));
    }

    #[test]
    fn test_crawl_state_requires_root_id() {
        let root = json!({"title": {"@value": "x"}}).as_object().cloned().unwrap();
        assert!(matches!(CrawlState::new(root), Err(Icd11Error::Schema { .. })));
    }

    #[test]
    fn test_crawl_state_queue_keeps_duplicates() {
        let mut state = CrawlState::new(make_node("root", &["a", "a"])).unwrap();
        assert_eq!(state.pending(), 2);

        assert_eq!(state.next_reference(), Some(uri("a")));
        state.record(NodeId::from("a"), make_node("a", &["root", "b"]));
        assert_eq!(state.pending(), 3);
        assert_eq!(state.resolved(), 2);
        assert!(state.is_visited(&NodeId::from("root")));
        assert_eq!(state.next_reference(), Some(uri("a")));
    }

    #[test]
    fn test_crawler_builder() {
        let source = GraphSource::new(&[], &[]);
        let crawler = TaxonomyCrawler::new(&source).progress_interval(10);
        assert_eq!(crawler.config.progress_interval, 10);
        assert_eq!(CrawlerConfig::default().progress_interval, 100);
    }
}
