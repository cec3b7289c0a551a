//! End-to-end runs of the conversion pipeline against temporary trees, using
//! instrumented encoders in place of the real codec.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use webpsync_cache::{CacheMap, CacheStore};
use webpsync_config::{ConvertConfig, EncoderOptions};
use webpsync_convert::{EncodeError, Encoder, Pipeline, PipelineError};

/// Copies the source bytes behind a marker, counting calls and peak overlap.
#[derive(Default)]
struct CountingEncoder {
    active: AtomicUsize,
    peak: AtomicUsize,
    calls: Mutex<HashMap<String, usize>>,
    delay: Duration,
}

impl CountingEncoder {
    fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    fn calls_for(&self, name: &str) -> usize {
        self.calls.lock().unwrap().get(name).copied().unwrap_or(0)
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl Encoder for CountingEncoder {
    fn encode(&self, input: &Path, output: &Path, _: &EncoderOptions) -> Result<(), EncodeError> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }

        let name = input.file_name().unwrap().to_string_lossy().into_owned();
        *self.calls.lock().unwrap().entry(name.clone()).or_default() += 1;

        let result = if name.starts_with("bad") {
            Err(EncodeError::Other(format!("cannot encode {name}")))
        } else {
            let mut bytes = b"WEBP:".to_vec();
            bytes.extend(std::fs::read(input).unwrap());
            std::fs::write(output, bytes).map_err(|source| EncodeError::Io {
                path: output.to_path_buf(),
                source,
            })
        };

        self.active.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

struct Fixture {
    _dir: tempfile::TempDir,
    input: PathBuf,
    output: PathBuf,
}

impl Fixture {
    /// `{root, a/, a/b/}` with one matching file at each level plus noise.
    fn tree() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        let output = dir.path().join("out");
        std::fs::create_dir_all(input.join("a").join("b")).unwrap();
        std::fs::write(input.join("top.png"), b"top pixels").unwrap();
        std::fs::write(input.join("readme.txt"), b"not an image").unwrap();
        std::fs::write(input.join("a").join("x.png"), b"x pixels").unwrap();
        std::fs::write(input.join("a").join("b").join("z.png"), b"z pixels").unwrap();
        Self {
            _dir: dir,
            input,
            output,
        }
    }

    fn lock_path(&self) -> PathBuf {
        self.output.join("conversion.lock")
    }

    async fn cache(&self) -> CacheMap {
        CacheStore::open(self.lock_path()).load().await.unwrap()
    }
}

fn pipeline(encoder: Arc<CountingEncoder>) -> Pipeline {
    Pipeline::new(ConvertConfig::default(), encoder)
}

#[tokio::test]
async fn mirrors_tree_structure() {
    let fx = Fixture::tree();
    let encoder = Arc::new(CountingEncoder::default());

    let report = pipeline(encoder.clone())
        .run(&fx.input, &fx.output)
        .await
        .unwrap();

    assert_eq!(report.stats.converted, 3);
    assert_eq!(report.stats.failed, 0);
    assert_eq!(report.total_entries, 3);
    assert!(fx.output.join("top.webp").is_file());
    assert!(fx.output.join("a").join("x.webp").is_file());
    assert!(fx.output.join("a").join("b").join("z.webp").is_file());
    assert!(!fx.output.join("readme.webp").exists());
    assert_eq!(
        std::fs::read(fx.output.join("a").join("b").join("z.webp")).unwrap(),
        b"WEBP:z pixels"
    );

    let cache = fx.cache().await;
    let keys: Vec<_> = cache.keys().cloned().collect();
    assert_eq!(keys, vec!["a/b/z.png", "a/x.png", "top.png"]);
    assert_eq!(cache["top.png"].folder, "root");
    assert_eq!(cache["a/x.png"].folder, "a");
    assert_eq!(cache["a/b/z.png"].folder, "a/b");
    assert_eq!(cache["a/b/z.png"].converted_name, "z.webp");
}

#[tokio::test]
async fn second_run_is_a_no_op() {
    let fx = Fixture::tree();
    let encoder = Arc::new(CountingEncoder::default());
    let pipeline = pipeline(encoder.clone());

    pipeline.run(&fx.input, &fx.output).await.unwrap();
    let first = fx.cache().await;
    assert_eq!(encoder.total_calls(), 3);

    let report = pipeline.run(&fx.input, &fx.output).await.unwrap();
    assert_eq!(report.stats.converted, 0);
    assert_eq!(report.stats.skipped, 3);
    assert_eq!(encoder.total_calls(), 3);

    // Entries carry their original conversion timestamps; only metadata moves.
    assert_eq!(fx.cache().await, first);
}

#[tokio::test]
async fn changed_input_is_reconverted_alone() {
    let fx = Fixture::tree();
    let encoder = Arc::new(CountingEncoder::default());
    let pipeline = pipeline(encoder.clone());

    pipeline.run(&fx.input, &fx.output).await.unwrap();
    let before = fx.cache().await;

    std::fs::write(fx.input.join("a").join("x.png"), b"x pixels, edited").unwrap();
    let report = pipeline.run(&fx.input, &fx.output).await.unwrap();

    assert_eq!(report.stats.converted, 1);
    assert_eq!(report.stats.skipped, 2);
    assert_eq!(encoder.calls_for("x.png"), 2);
    assert_eq!(encoder.calls_for("top.png"), 1);
    assert_eq!(encoder.calls_for("z.png"), 1);

    let after = fx.cache().await;
    assert_ne!(after["a/x.png"].input_hash, before["a/x.png"].input_hash);
    assert_eq!(after["top.png"], before["top.png"]);
    assert_eq!(after["a/b/z.png"], before["a/b/z.png"]);
}

#[tokio::test]
async fn deleted_artifact_is_regenerated() {
    let fx = Fixture::tree();
    let encoder = Arc::new(CountingEncoder::default());
    let pipeline = pipeline(encoder.clone());

    pipeline.run(&fx.input, &fx.output).await.unwrap();
    let artifact = fx.output.join("a").join("b").join("z.webp");
    std::fs::remove_file(&artifact).unwrap();

    let report = pipeline.run(&fx.input, &fx.output).await.unwrap();
    assert_eq!(report.stats.converted, 1);
    assert_eq!(encoder.calls_for("z.png"), 2);
    assert!(artifact.is_file());
}

#[tokio::test]
async fn failed_file_is_isolated_and_retried() {
    let fx = Fixture::tree();
    std::fs::write(fx.input.join("a").join("bad.png"), b"broken").unwrap();
    let encoder = Arc::new(CountingEncoder::default());
    let pipeline = pipeline(encoder.clone());

    let report = pipeline.run(&fx.input, &fx.output).await.unwrap();
    assert_eq!(report.stats.failed, 1);
    assert_eq!(report.stats.converted, 3);

    let cache = fx.cache().await;
    assert!(!cache.contains_key("a/bad.png"));
    assert!(cache.contains_key("a/x.png"));

    let report = pipeline.run(&fx.input, &fx.output).await.unwrap();
    assert_eq!(report.stats.failed, 1);
    assert_eq!(report.stats.skipped, 3);
    assert_eq!(encoder.calls_for("bad.png"), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn conversions_never_exceed_limit() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in");
    for d in 0u8..4 {
        let sub = input.join(format!("d{d}")).join("nested");
        std::fs::create_dir_all(&sub).unwrap();
        for f in 0u8..6 {
            std::fs::write(input.join(format!("d{d}")).join(format!("f{f}.png")), [d, f]).unwrap();
            std::fs::write(sub.join(format!("g{f}.png")), [d, f, 1]).unwrap();
        }
    }

    let mut config = ConvertConfig::default();
    config.pipeline.max_concurrent_conversions = 3;
    let encoder = Arc::new(CountingEncoder::with_delay(Duration::from_millis(10)));

    let report = Pipeline::new(config, encoder.clone())
        .run(&input, &dir.path().join("out"))
        .await
        .unwrap();

    assert_eq!(report.stats.converted, 48);
    assert!(encoder.peak() >= 1);
    assert!(
        encoder.peak() <= 3,
        "peak concurrent encodes {} exceeded limit",
        encoder.peak()
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn traversal_cap_bounds_in_flight_files() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in");
    for d in 0u8..3 {
        let sub = input.join(format!("d{d}"));
        std::fs::create_dir_all(&sub).unwrap();
        for f in 0u8..8 {
            std::fs::write(sub.join(format!("f{f}.png")), [d, f]).unwrap();
        }
    }
    for f in 0u8..8 {
        std::fs::write(input.join(format!("top{f}.png")), [9, f]).unwrap();
    }

    let mut config = ConvertConfig::default();
    config.pipeline.max_in_flight = 2;
    config.pipeline.max_concurrent_conversions = 10;
    let encoder = Arc::new(CountingEncoder::with_delay(Duration::from_millis(10)));

    let report = Pipeline::new(config, encoder.clone())
        .run(&input, &dir.path().join("out"))
        .await
        .unwrap();

    assert_eq!(report.stats.converted, 32);
    assert!(
        encoder.peak() <= 2,
        "peak concurrent encodes {} exceeded the traversal cap",
        encoder.peak()
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn tight_traversal_cap_still_completes() {
    let fx = Fixture::tree();
    let mut config = ConvertConfig::default();
    config.pipeline.max_in_flight = 1;
    config.pipeline.max_concurrent_conversions = 1;
    let encoder = Arc::new(CountingEncoder::default());

    let report = Pipeline::new(config, encoder.clone())
        .run(&fx.input, &fx.output)
        .await
        .unwrap();
    assert_eq!(report.stats.converted, 3);
    assert_eq!(encoder.peak(), 1);
}

#[tokio::test]
async fn malformed_lock_file_is_fatal() {
    let fx = Fixture::tree();
    std::fs::create_dir_all(&fx.output).unwrap();
    std::fs::write(fx.lock_path(), "{ this is not json").unwrap();
    let encoder = Arc::new(CountingEncoder::default());

    let err = pipeline(encoder.clone())
        .run(&fx.input, &fx.output)
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Cache(_)));
    assert_eq!(encoder.total_calls(), 0);
    assert_eq!(
        std::fs::read_to_string(fx.lock_path()).unwrap(),
        "{ this is not json"
    );
}

#[tokio::test]
async fn missing_input_root_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let err = pipeline(Arc::new(CountingEncoder::default()))
        .run(&dir.path().join("missing"), &out)
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::InputRoot { .. }));
    assert!(!out.exists());
}

#[tokio::test]
async fn output_inside_input_is_not_walked() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().to_path_buf();
    let output = input.join("converted");
    std::fs::create_dir_all(&output).unwrap();
    std::fs::write(input.join("a.png"), b"a").unwrap();
    std::fs::write(output.join("stray.png"), b"stray").unwrap();

    let encoder = Arc::new(CountingEncoder::default());
    let report = pipeline(encoder.clone()).run(&input, &output).await.unwrap();

    assert_eq!(report.stats.converted, 1);
    assert_eq!(encoder.calls_for("stray.png"), 0);
    assert!(output.join("a.webp").is_file());
}

#[tokio::test]
async fn lock_file_name_follows_config() {
    let fx = Fixture::tree();
    let mut config = ConvertConfig::default();
    config.pipeline.lock_file = "state.lock".to_string();

    let report = Pipeline::new(config, Arc::new(CountingEncoder::default()))
        .run(&fx.input, &fx.output)
        .await
        .unwrap();
    assert!(report.lock_path.ends_with("state.lock"));
    assert!(fx.output.join("state.lock").is_file());
    assert!(!fx.lock_path().exists());
}

#[tokio::test]
async fn lock_file_layout_is_nested_by_folder() {
    let fx = Fixture::tree();
    pipeline(Arc::new(CountingEncoder::default()))
        .run(&fx.input, &fx.output)
        .await
        .unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(fx.lock_path()).unwrap()).unwrap();
    assert_eq!(json["metadata"]["total_files"], 3);
    assert_eq!(json["metadata"]["version"], "1.0");
    let files = json["files"].as_object().unwrap();
    let mut groups: Vec<_> = files.keys().cloned().collect();
    groups.sort();
    assert_eq!(groups, vec!["a", "a/b", "root"]);
    assert_eq!(files["a"]["a/x.png"]["original_name"], "x.png");
    assert_eq!(files["root"]["top.png"]["webp_name"], "top.webp");
}
