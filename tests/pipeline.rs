use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use tempfile::TempDir;

use rsblocker::{
    ArtifactRegistry, ConfigManager, ContentBlockerTranslator, FilterSource, MemoryRegistry,
    RsbResult, RsblockerError, RuleLoader, RuleTranslator, Transport,
};

const DAY: Duration = Duration::from_secs(24 * 60 * 60);
const NAMES: [&str; 5] = ["List One", "List Two", "List Three", "List Four", "List Five"];

struct MockTransport {
    bodies: HashMap<String, String>,
    delays: HashMap<String, Duration>,
    calls: AtomicUsize,
}

impl MockTransport {
    fn serving_all() -> Self {
        let bodies = sources()
            .iter()
            .enumerate()
            .map(|(i, s)| (s.location.clone(), list_body(i)))
            .collect();
        Self {
            bodies,
            delays: HashMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    fn with_body(mut self, index: usize, body: &str) -> Self {
        self.bodies.insert(location(index), body.to_string());
        self
    }

    fn without(mut self, index: usize) -> Self {
        self.bodies.remove(&location(index));
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, uri: &str) -> RsbResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delays.get(uri) {
            tokio::time::sleep(*delay).await;
        }
        self.bodies
            .get(uri)
            .cloned()
            .ok_or_else(|| RsblockerError::RequestFailed(uri.to_string()))
    }
}

/// 每次转换阻塞线程一段时间
struct SlowTranslator(Duration);

impl RuleTranslator for SlowTranslator {
    fn translate(&self, lines: &[String], limit: usize, optimize: bool) -> RsbResult<String> {
        std::thread::sleep(self.0);
        ContentBlockerTranslator.translate(lines, limit, optimize)
    }
}

fn location(index: usize) -> String {
    format!("https://lists.test/{}.txt", index)
}

fn list_body(index: usize) -> String {
    format!(
        "[Adblock Plus 2.0]\n! Title: list {i}\n||ads{i}.example.com^\n##.banner-{i}\n@@||ok{i}.example.com^\n",
        i = index
    )
}

fn sources() -> Vec<FilterSource> {
    NAMES
        .iter()
        .enumerate()
        .map(|(i, name)| FilterSource::new(*name, location(i)).unwrap())
        .collect()
}

fn registry() -> Option<Arc<dyn ArtifactRegistry>> {
    Some(Arc::new(MemoryRegistry::new()) as Arc<dyn ArtifactRegistry>)
}

fn loader(cache_dir: &Path, transport: &Arc<MockTransport>, registry: Option<Arc<dyn ArtifactRegistry>>) -> RuleLoader {
    let config = ConfigManager::custom().cache_dir(cache_dir).build();
    RuleLoader::with_components(
        &config,
        sources(),
        transport.clone(),
        Arc::new(ContentBlockerTranslator),
        registry,
    )
    .unwrap()
}

fn cache_file(cache_dir: &Path, index: usize) -> PathBuf {
    cache_dir.join(format!("{}.json", NAMES[index]))
}

fn set_age(path: &Path, age: Duration) {
    let file = std::fs::File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now() - age).unwrap();
}

fn age_of(path: &Path) -> Duration {
    let modified = std::fs::metadata(path).unwrap().modified().unwrap();
    SystemTime::now().duration_since(modified).unwrap_or_default()
}

/// 先完整拉取一次生成缓存文件，再把所有缓存设为指定年龄
async fn seed_cache(cache_dir: &Path, age: Duration) {
    let transport = Arc::new(MockTransport::serving_all());
    loader(cache_dir, &transport, registry()).get_lists(true).await.unwrap();
    for index in 0..NAMES.len() {
        set_age(&cache_file(cache_dir, index), age);
    }
}

fn identifiers(lists: &[Arc<rsblocker::CompiledRuleList>]) -> Vec<String> {
    lists.iter().map(|l| l.identifier.clone()).collect()
}

fn expected_identifiers() -> Vec<String> {
    NAMES.iter().map(|n| n.replace(' ', "")).collect()
}

#[tokio::test]
async fn cold_start_fetches_every_source_and_writes_cache() {
    let temp = TempDir::new().unwrap();
    let cache_dir = temp.path().join("lists");
    let transport = Arc::new(MockTransport::serving_all());

    let lists = loader(&cache_dir, &transport, registry()).get_lists(false).await.unwrap();

    assert_eq!(identifiers(&lists), expected_identifiers());
    assert_eq!(transport.calls(), 5);
    for index in 0..NAMES.len() {
        assert!(cache_file(&cache_dir, index).is_file());
    }
    // 一条拦截 + 一条元素隐藏 + 一条例外
    assert!(lists.iter().all(|l| l.rule_count() == 3));
}

#[tokio::test]
async fn fresh_cache_compiles_from_disk_without_network() {
    let temp = TempDir::new().unwrap();
    seed_cache(temp.path(), DAY).await;

    let transport = Arc::new(MockTransport::serving_all());
    let lists = loader(temp.path(), &transport, registry()).get_lists(false).await.unwrap();

    assert_eq!(identifiers(&lists), expected_identifiers());
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn one_stale_file_refreshes_every_source() {
    let temp = TempDir::new().unwrap();
    seed_cache(temp.path(), DAY).await;
    set_age(&cache_file(temp.path(), 2), 8 * DAY);

    let transport = Arc::new(MockTransport::serving_all());
    let lists = loader(temp.path(), &transport, registry()).get_lists(false).await.unwrap();

    assert_eq!(lists.len(), 5);
    assert_eq!(transport.calls(), 5);
    for index in 0..NAMES.len() {
        assert!(age_of(&cache_file(temp.path(), index)) < DAY);
    }
}

#[tokio::test]
async fn comment_only_list_fails_forced_refresh() {
    let temp = TempDir::new().unwrap();
    let transport = Arc::new(MockTransport::serving_all().with_body(3, "! only comments\n!\n\n"));

    let result = loader(temp.path(), &transport, registry()).get_lists(true).await;

    assert!(matches!(result, Err(RsblockerError::NotFound)));
    // 不因单个失败提前结束，其余源照常完成并写入缓存
    assert_eq!(transport.calls(), 5);
    for index in [0, 1, 2, 4] {
        assert!(cache_file(temp.path(), index).is_file());
    }
    assert!(!cache_file(temp.path(), 3).exists());
}

#[tokio::test]
async fn broken_cache_entry_falls_back_to_refresh() {
    let temp = TempDir::new().unwrap();
    seed_cache(temp.path(), DAY).await;
    std::fs::write(cache_file(temp.path(), 1), "[{\"trigger\":").unwrap();

    let transport = Arc::new(MockTransport::serving_all());
    let lists = loader(temp.path(), &transport, registry()).get_lists(false).await.unwrap();

    assert_eq!(identifiers(&lists), expected_identifiers());
    assert_eq!(transport.calls(), 5);
    let repaired = std::fs::read_to_string(cache_file(temp.path(), 1)).unwrap();
    assert!(serde_json::from_str::<serde_json::Value>(&repaired).is_ok());
}

#[tokio::test]
async fn failed_fallback_refresh_is_not_retried() {
    let temp = TempDir::new().unwrap();
    seed_cache(temp.path(), DAY).await;
    std::fs::write(cache_file(temp.path(), 0), "not json").unwrap();

    let transport = Arc::new(MockTransport::serving_all().without(4));
    let result = loader(temp.path(), &transport, registry()).get_lists(false).await;

    assert!(matches!(result, Err(RsblockerError::NotFound)));
    assert_eq!(transport.calls(), 5);
}

#[tokio::test]
async fn second_run_within_window_reuses_compiled_lists() {
    let temp = TempDir::new().unwrap();
    let transport = Arc::new(MockTransport::serving_all());
    let loader = loader(temp.path(), &transport, registry());

    let first = loader.get_lists(false).await.unwrap();
    let second = loader.get_lists(false).await.unwrap();

    assert_eq!(transport.calls(), 5);
    for (a, b) in first.iter().zip(&second) {
        assert!(Arc::ptr_eq(a, b));
    }
}

#[tokio::test]
async fn results_follow_source_order_not_completion_order() {
    let temp = TempDir::new().unwrap();
    let mut transport = MockTransport::serving_all();
    for index in 0..NAMES.len() {
        let delay = Duration::from_millis(10 * (NAMES.len() - index) as u64);
        transport.delays.insert(location(index), delay);
    }
    let transport = Arc::new(transport);

    let lists = loader(temp.path(), &transport, registry()).get_lists(true).await.unwrap();

    assert_eq!(identifiers(&lists), expected_identifiers());
}

#[tokio::test]
async fn force_refresh_ignores_fresh_cache() {
    let temp = TempDir::new().unwrap();
    seed_cache(temp.path(), DAY).await;

    let transport = Arc::new(MockTransport::serving_all());
    loader(temp.path(), &transport, registry()).get_lists(true).await.unwrap();

    assert_eq!(transport.calls(), 5);
}

#[tokio::test]
async fn missing_registry_fails_with_not_found() {
    let temp = TempDir::new().unwrap();
    let transport = Arc::new(MockTransport::serving_all());

    let result = loader(temp.path(), &transport, None).get_lists(false).await;

    assert!(matches!(result, Err(RsblockerError::NotFound)));
}

#[tokio::test]
async fn clear_cache_removes_files_and_compiled_lists() {
    let temp = TempDir::new().unwrap();
    let transport = Arc::new(MockTransport::serving_all());
    let registry = Arc::new(MemoryRegistry::new());
    let loader = loader(temp.path(), &transport, Some(registry.clone() as Arc<dyn ArtifactRegistry>));

    loader.get_lists(false).await.unwrap();
    let status = loader.cache_status().await.unwrap();
    assert_eq!(status.len(), 5);
    assert!(status.iter().all(|s| s.fresh));

    assert_eq!(loader.clear_cache().await.unwrap(), 5);
    assert!(registry.identifiers().await.unwrap().is_empty());
    assert!(loader.cache_status().await.unwrap().is_empty());

    loader.get_lists(false).await.unwrap();
    assert_eq!(transport.calls(), 10);
}

#[test]
fn duplicate_identifiers_are_rejected() {
    let temp = TempDir::new().unwrap();
    let config = ConfigManager::custom().cache_dir(temp.path()).build();
    let mut set = sources();
    set.push(FilterSource::new("ListOne", "https://lists.test/dup.txt").unwrap());

    let result = RuleLoader::with_components(
        &config,
        set,
        Arc::new(MockTransport::serving_all()),
        Arc::new(ContentBlockerTranslator),
        registry(),
    );
    assert!(matches!(result, Err(RsblockerError::InvalidInput(_))));
}

#[tokio::test]
async fn unwritable_cache_does_not_fail_refresh() {
    let temp = TempDir::new().unwrap();
    let blocker = temp.path().join("file");
    std::fs::write(&blocker, "not a directory").unwrap();
    let cache_dir = blocker.join("sub");
    let transport = Arc::new(MockTransport::serving_all());

    let lists = loader(&cache_dir, &transport, registry()).get_lists(true).await.unwrap();

    assert_eq!(identifiers(&lists), expected_identifiers());
    assert_eq!(transport.calls(), 5);
    assert!(!cache_dir.exists());
}

#[tokio::test]
async fn slow_translation_does_not_serialize_sources() {
    let temp = TempDir::new().unwrap();
    let config = ConfigManager::custom().cache_dir(temp.path()).build();
    let transport = Arc::new(MockTransport::serving_all());
    let loader = RuleLoader::with_components(
        &config,
        sources(),
        transport.clone(),
        Arc::new(SlowTranslator(Duration::from_millis(400))),
        registry(),
    )
    .unwrap();

    // 单线程运行时下若转换阻塞工作线程，5 个源将串行耗时 2 秒
    let start = Instant::now();
    let lists = loader.get_lists(true).await.unwrap();

    assert_eq!(lists.len(), 5);
    assert!(start.elapsed() < Duration::from_millis(1500), "took {:?}", start.elapsed());
}
