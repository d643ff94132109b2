mod common;

use anyhow::Result;
use common::{ByteEncoder, GO_SOURCE, PanickyEncoder, write};
use softgrep::chunk::{Grammar, LanguageSpec};
use softgrep::error::WalkError;
use softgrep::pipeline::{
    PipelineContext, Stage, chunk_file, collect_windows, finish_pipeline, queue,
    run_pipeline_with_stdin,
};
use softgrep::sink::{CountingSink, EmbedSink, Embedder, JsonLinesSink, WindowSink, drain};
use softgrep::tokenize::Encoder;
use softgrep::utils::{CancelToken, Registry};
use softgrep::walker::{Input, WalkSummary, Walker, process_stdin, walk_inputs};
use softgrep::{Chunk, FileEntry, Opts, SourcedWindow, ingest};
use std::io::{Cursor, Read};
use std::ops::ControlFlow;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Paths (relative to `root`, `/`-separated) emitted by one traversal, sorted.
fn walk_names(root: &Path) -> (Vec<String>, WalkSummary) {
    let registry = Registry::builtin();
    let prefix = format!("{}/", root.to_string_lossy().replace('\\', "/"));
    let mut names = Vec::new();
    let summary = Walker::new(&registry)
        .walk(root, |entry| {
            names.push(entry.path.trim_start_matches(prefix.as_str()).to_string());
            ControlFlow::Continue(())
        })
        .unwrap();
    names.sort();
    (names, summary)
}

fn opts(workers: usize) -> Opts {
    Opts {
        workers: Some(workers),
        ..Opts::default()
    }
}

fn byte_encoder() -> Arc<dyn Encoder> {
    Arc::new(ByteEncoder)
}

fn windows_for<'a>(windows: &'a [SourcedWindow], suffix: &str) -> Vec<&'a SourcedWindow> {
    windows
        .iter()
        .filter(|w| w.source.ends_with(suffix))
        .collect()
}

fn test_context() -> Arc<PipelineContext> {
    Arc::new(PipelineContext {
        registry: Arc::new(Registry::builtin()),
        encoder: byte_encoder(),
        chunk_opts: Default::default(),
        cancel: CancelToken::new(),
        counters: Default::default(),
    })
}

fn piped(text: &'static str) -> softgrep::walker::StdinSource {
    Box::new(move || -> Box<dyn Read + Send> { Box::new(Cursor::new(text)) })
}

/// Run `entry` through the chunk stage alone and collect its chunk texts.
fn chunk_entry(entry: FileEntry) -> Vec<String> {
    let ctx = test_context();
    let (tx, rx) = queue::queue::<Chunk>(16);
    chunk_file(entry, &tx, &ctx).unwrap();
    drop(tx);
    rx.iter().map(|c| c.text).collect()
}

// --- walker ---

#[test]
fn test_walk_emits_text_files_and_skips_binary() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "a.go", GO_SOURCE.as_bytes());
    write(tmp.path(), "docs/readme.md", b"# title\n");
    write(tmp.path(), "b.bin", b"\x7fELF\0\0\0\x01");

    let (names, summary) = walk_names(tmp.path());
    assert_eq!(names, vec!["a.go", "docs/readme.md"]);
    assert_eq!(summary.emitted, 2);
    assert_eq!(summary.binary, 1);
    assert!(!summary.stopped);
}

#[test]
fn test_walk_emitted_content_starts_at_beginning() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "a.go", GO_SOURCE.as_bytes());
    let registry = Registry::builtin();
    let mut contents = Vec::new();
    Walker::new(&registry)
        .walk(tmp.path(), |mut entry| {
            let mut s = String::new();
            entry.content.read_to_string(&mut s).unwrap();
            contents.push((entry.language, s));
            ControlFlow::Continue(())
        })
        .unwrap();
    assert_eq!(contents, vec![(Some("go"), GO_SOURCE.to_string())]);
}

#[test]
fn test_walk_skip_pattern() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "main.py", b"print(1)\n");
    write(tmp.path(), "node_modules/dep/index.js", b"function f() {}\n");
    write(tmp.path(), ".git/HEAD", b"ref: refs/heads/main\n");
    write(tmp.path(), "build.log", b"ok\n");
    write(tmp.path(), "Cargo.lock", b"# lock\n");
    write(tmp.path(), "dist.zip", b"PK");

    let (names, summary) = walk_names(tmp.path());
    assert_eq!(names, vec!["main.py"]);
    assert!(summary.filtered >= 5);
}

#[test]
fn test_walk_gitignore_rules() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), ".gitignore", b"*.tmp\ntarget/\n");
    write(tmp.path(), "keep.rs", b"fn main() {}\n");
    write(tmp.path(), "scratch.tmp", b"junk\n");
    write(tmp.path(), "target/debug/out.rs", b"fn x() {}\n");
    write(tmp.path(), "src/deep/also.tmp", b"junk\n");

    let (names, _) = walk_names(tmp.path());
    assert_eq!(names, vec![".gitignore", "keep.rs"]);
}

#[test]
fn test_walk_gitignore_scoped_to_its_directory() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "sub/.gitignore", b"*.txt\n");
    write(tmp.path(), "sub/hidden.txt", b"no\n");
    write(tmp.path(), "sub/inner/hidden.txt", b"no\n");
    write(tmp.path(), "top.txt", b"yes\n");
    write(tmp.path(), "other/visible.txt", b"yes\n");

    let (names, _) = walk_names(tmp.path());
    assert_eq!(names, vec!["other/visible.txt", "sub/.gitignore", "top.txt"]);
}

#[test]
fn test_walk_broken_gitignore_fails_open() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), ".gitignore", b"[unclosed\n");
    write(tmp.path(), "a.txt", b"a\n");

    let (names, _) = walk_names(tmp.path());
    assert!(names.contains(&"a.txt".to_string()));
}

#[test]
fn test_walk_missing_root_is_error() {
    let tmp = TempDir::new().unwrap();
    let registry = Registry::builtin();
    let err = Walker::new(&registry)
        .walk(&tmp.path().join("nope"), |_| ControlFlow::Continue(()))
        .unwrap_err();
    assert!(matches!(err, WalkError::Root { .. }));
}

#[test]
fn test_walk_break_stops_early() {
    let tmp = TempDir::new().unwrap();
    for i in 0..5 {
        write(tmp.path(), &format!("f{i}.txt"), b"x\n");
    }
    let registry = Registry::builtin();
    let mut seen = 0;
    let summary = Walker::new(&registry)
        .walk(tmp.path(), |_| {
            seen += 1;
            ControlFlow::Break(())
        })
        .unwrap();
    assert_eq!(seen, 1);
    assert!(summary.stopped);
}

#[test]
fn test_walk_inputs_fresh_state_per_root() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "a.txt", b"a\n");
    let registry = Registry::builtin();
    let root = Input::Root(tmp.path().to_path_buf());
    let mut n = 0;
    let summary = walk_inputs(
        &[root.clone(), root],
        &registry,
        true,
        &CancelToken::new(),
        process_stdin(),
        |_| {
            n += 1;
            ControlFlow::Continue(())
        },
    )
    .unwrap();
    assert_eq!(n, 2);
    assert_eq!(summary.emitted, 2);
}

#[test]
fn test_walk_inputs_piped_once() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "a.txt", b"a\n");
    let registry = Registry::builtin();
    let mut got = Vec::new();
    let summary = walk_inputs(
        &[Input::Stdin, Input::Root(tmp.path().to_path_buf())],
        &registry,
        true,
        &CancelToken::new(),
        piped("from the pipe"),
        |mut entry| {
            let mut s = String::new();
            entry.content.read_to_string(&mut s).unwrap();
            got.push((entry.path.to_string(), s));
            ControlFlow::Continue(())
        },
    )
    .unwrap();
    assert_eq!(summary.emitted, 2);
    assert_eq!(got[0], ("-".to_string(), "from the pipe".to_string()));
    assert!(got[1].0.ends_with("a.txt"));
}

#[test]
fn test_walk_inputs_repeated_stdin_read_once() {
    let registry = Registry::builtin();
    let mut n = 0;
    let summary = walk_inputs(
        &[Input::Stdin, Input::Stdin],
        &registry,
        true,
        &CancelToken::new(),
        piped("x"),
        |_| {
            n += 1;
            ControlFlow::Continue(())
        },
    )
    .unwrap();
    assert_eq!(n, 1);
    assert_eq!(summary.emitted, 1);
}

#[cfg(unix)]
#[test]
fn test_walk_symlink_cycle_terminates() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "d/a.txt", b"a\n");
    std::os::unix::fs::symlink(tmp.path().join("d"), tmp.path().join("d/loop")).unwrap();

    let (names, _) = walk_names(tmp.path());
    assert_eq!(names, vec!["d/a.txt"]);
}

#[cfg(unix)]
#[test]
fn test_walk_symlinked_file_emitted_once() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "a.txt", b"a\n");
    std::os::unix::fs::symlink(tmp.path().join("a.txt"), tmp.path().join("z-link.txt")).unwrap();

    let (names, _) = walk_names(tmp.path());
    assert_eq!(names.len(), 1);
}

#[cfg(unix)]
#[test]
fn test_walk_no_follow_links() {
    let tmp = TempDir::new().unwrap();
    let outside = TempDir::new().unwrap();
    write(outside.path(), "far.txt", b"far\n");
    std::os::unix::fs::symlink(outside.path(), tmp.path().join("link")).unwrap();

    let registry = Registry::builtin();
    let mut n = 0;
    Walker::new(&registry)
        .follow_links(false)
        .walk(tmp.path(), |_| {
            n += 1;
            ControlFlow::Continue(())
        })
        .unwrap();
    assert_eq!(n, 0);

    let (names, _) = walk_names(tmp.path());
    assert_eq!(names, vec!["link/far.txt"]);
}

// --- end-to-end pipeline ---

#[test]
fn test_pipeline_go_and_binary() -> Result<()> {
    let tmp = TempDir::new()?;
    write(tmp.path(), "a.go", GO_SOURCE.as_bytes());
    write(tmp.path(), "b.bin", b"abc\0def");

    let inputs = vec![Input::Root(tmp.path().to_path_buf())];
    let (windows, stats) = ingest(inputs, &opts(2), byte_encoder(), None)?;

    let go = windows_for(&windows, "a.go");
    assert_eq!(go.len(), 1);
    assert!(go[0].window.decoded_text.starts_with("func hello()"));
    assert!(windows_for(&windows, "b.bin").is_empty());
    assert_eq!(stats.binary, 1);
    assert_eq!(stats.files, 1);
    assert_eq!(stats.chunks, 1);
    assert_eq!(stats.windows, 1);
    assert!(stats.failed.is_empty());
    Ok(())
}

#[test]
fn test_pipeline_long_chunk_windows_in_order() -> Result<()> {
    let tmp = TempDir::new()?;
    let text: String = (0..1500).map(|i| (b'a' + (i % 26) as u8) as char).collect();
    write(tmp.path(), "notes.md", text.as_bytes());

    let o = Opts {
        chunk: softgrep::ChunkOpts {
            stride: 2000,
            overlap: 10,
        },
        ..opts(3)
    };
    let (windows, stats) = ingest(vec![Input::Root(tmp.path().to_path_buf())], &o, byte_encoder(), None)?;
    assert_eq!(stats.chunks, 1);
    assert_eq!(windows.len(), 3);
    let joined: String = windows.iter().map(|w| w.window.decoded_text.as_str()).collect();
    assert_eq!(joined, text);
    Ok(())
}

#[test]
fn test_pipeline_strided_chunks_cover_file() -> Result<()> {
    let tmp = TempDir::new()?;
    write(tmp.path(), "data.csv", &vec![b'x'; 1200]);

    let (windows, stats) = ingest(
        vec![Input::Root(tmp.path().to_path_buf())],
        &opts(2),
        byte_encoder(),
        None,
    )?;
    // [0,500) [450,950) [900,1200)
    assert_eq!(stats.chunks, 3);
    assert_eq!(windows.len(), 3);
    Ok(())
}

#[test]
fn test_pipeline_bad_query_is_isolated() -> Result<()> {
    let tmp = TempDir::new()?;
    write(tmp.path(), "a.go", GO_SOURCE.as_bytes());
    write(tmp.path(), "b.txt", b"plain text\n");

    let registry = Registry::from_languages(vec![LanguageSpec::new(
        "go",
        r"\.go$",
        Some(Grammar::Go),
        "(not_a_node_kind) @x",
        false,
    )]);
    let (windows, stats) = collect_windows(
        vec![Input::Root(tmp.path().to_path_buf())],
        &opts(2),
        Arc::new(registry),
        byte_encoder(),
        CancelToken::new(),
    )?;
    assert_eq!(windows_for(&windows, "b.txt").len(), 1);
    assert!(windows_for(&windows, "a.go").is_empty());
    assert_eq!(stats.failed.len(), 1);
    assert!(stats.failed[0].0.ends_with("a.go"));
    Ok(())
}

#[test]
fn test_pipeline_encoder_panic_is_isolated() -> Result<()> {
    let tmp = TempDir::new()?;
    write(tmp.path(), "bad.txt", b"this goes boom\n");
    for i in 0..4 {
        write(tmp.path(), &format!("ok{i}.txt"), b"fine\n");
    }

    let (windows, stats) = ingest(
        vec![Input::Root(tmp.path().to_path_buf())],
        &opts(2),
        Arc::new(PanickyEncoder),
        None,
    )?;
    assert_eq!(windows.len(), 4);
    assert_eq!(stats.failed.len(), 1);
    assert!(stats.failed[0].1.contains("panic"));
    Ok(())
}

#[test]
fn test_pipeline_piped_input() -> Result<()> {
    let handles = run_pipeline_with_stdin(
        vec![Input::Stdin],
        &opts(2),
        Arc::new(Registry::builtin()),
        byte_encoder(),
        CancelToken::new(),
        piped("hello from a pipe"),
    )?;
    let windows: Vec<SourcedWindow> = handles.window_rx.iter().collect();
    let stats = finish_pipeline(handles.supervisor)?;
    assert_eq!(windows.len(), 1);
    assert_eq!(&*windows[0].source, "-");
    assert_eq!(windows[0].window.decoded_text, "hello from a pipe");
    assert_eq!(stats.files, 1);
    assert_eq!(stats.chunks, 1);
    Ok(())
}

#[test]
fn test_chunk_file_uses_detected_language() {
    let mut entry = FileEntry::new("snippet.txt", Box::new(Cursor::new(GO_SOURCE)));
    entry.language = Some("go");
    let chunks = chunk_entry(entry);
    assert_eq!(chunks.len(), 1);
    assert!(chunks[0].starts_with("func hello()"));
}

#[test]
fn test_chunk_file_without_language_is_strided() {
    let entry = FileEntry::new("a.go", Box::new(Cursor::new(GO_SOURCE)));
    assert_eq!(chunk_entry(entry), vec![GO_SOURCE.to_string()]);
}

#[test]
fn test_pipeline_missing_root_is_walk_error() {
    let tmp = TempDir::new().unwrap();
    let err = ingest(
        vec![Input::Root(tmp.path().join("missing"))],
        &opts(2),
        byte_encoder(),
        None,
    )
    .unwrap_err();
    assert!(err.downcast_ref::<WalkError>().is_some());
}

#[test]
fn test_pipeline_root_error_after_good_root_still_drains() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "a.txt", b"a\n");
    let inputs = vec![
        Input::Root(tmp.path().to_path_buf()),
        Input::Root(tmp.path().join("missing")),
    ];
    let err = ingest(inputs, &opts(1), byte_encoder(), None).unwrap_err();
    assert!(err.downcast_ref::<WalkError>().is_some());
}

#[test]
fn test_pipeline_precancelled() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "a.txt", b"a\n");
    let cancel = CancelToken::new();
    cancel.cancel();
    let err = ingest(
        vec![Input::Root(tmp.path().to_path_buf())],
        &opts(2),
        byte_encoder(),
        Some(cancel),
    )
    .unwrap_err();
    assert!(err.to_string().contains("cancelled"));
}

#[test]
fn test_pipeline_invalid_opts_rejected() {
    let o = Opts {
        chunk: softgrep::ChunkOpts {
            stride: 10,
            overlap: 20,
        },
        ..Opts::default()
    };
    assert!(ingest(Vec::new(), &o, byte_encoder(), None).is_err());
}

#[test]
fn test_pipeline_no_inputs_completes() -> Result<()> {
    let (windows, stats) = ingest(Vec::new(), &opts(2), byte_encoder(), None)?;
    assert!(windows.is_empty());
    assert_eq!(stats.files, 0);
    Ok(())
}

// --- queues and stages ---

#[test]
fn test_queue_recv_returns_on_cancel() {
    let (_tx, rx) = queue::queue::<u32>(1);
    let cancel = CancelToken::new();
    let c = cancel.clone();
    let t = std::thread::spawn(move || queue::recv(&rx, &c));
    std::thread::sleep(Duration::from_millis(20));
    let started = Instant::now();
    cancel.cancel();
    assert_eq!(t.join().unwrap(), None);
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[test]
fn test_queue_send_blocks_until_cancel() {
    let (tx, _rx) = queue::queue::<u32>(1);
    let cancel = CancelToken::new();
    queue::send(&tx, 1, &cancel).unwrap();
    let c = cancel.clone();
    let t = std::thread::spawn(move || queue::send(&tx, 2, &c));
    std::thread::sleep(Duration::from_millis(20));
    cancel.cancel();
    assert!(t.join().unwrap().is_err());
}

#[test]
fn test_queue_closed_and_empty() {
    let (tx, rx) = queue::queue::<u32>(2);
    let cancel = CancelToken::new();
    queue::send(&tx, 7, &cancel).unwrap();
    drop(tx);
    assert_eq!(queue::recv(&rx, &cancel), Some(7));
    assert_eq!(queue::recv(&rx, &cancel), None);
}

#[test]
fn test_stage_close_waits_for_every_worker() {
    fn slow_double(
        _id: usize,
        rx: crossbeam_channel::Receiver<u32>,
        tx: crossbeam_channel::Sender<u32>,
        ctx: Arc<PipelineContext>,
    ) {
        while let Some(n) = queue::recv(&rx, &ctx.cancel) {
            std::thread::sleep(Duration::from_millis(5));
            if queue::send(&tx, n * 2, &ctx.cancel).is_err() {
                break;
            }
        }
    }

    let ctx = test_context();
    let (in_tx, in_rx) = queue::queue::<u32>(4);
    let (out_tx, out_rx) = queue::queue::<u32>(64);
    let stage = Stage::spawn("double", 3, in_rx, out_tx, &ctx, slow_double).unwrap();
    assert_eq!(stage.num_workers(), 3);

    for n in 0..20 {
        queue::send(&in_tx, n, &ctx.cancel).unwrap();
    }
    drop(in_tx);
    assert_eq!(stage.close(), 0);

    // Closed only after all workers exited: every result is already queued.
    let mut out: Vec<u32> = out_rx.iter().collect();
    out.sort();
    assert_eq!(out, (0..20).map(|n| n * 2).collect::<Vec<_>>());
}

// --- sinks ---

struct FakeEmbedder;

impl Embedder for FakeEmbedder {
    fn submit(&self, tokens: &[u32], attention_mask: &[u32]) -> Result<Vec<f32>> {
        if tokens.iter().any(|&t| t == 1000 + b'!' as u32) {
            anyhow::bail!("service rejected window");
        }
        Ok(vec![attention_mask.iter().sum::<u32>() as f32])
    }
}

fn pipeline_rx(files: &[(&str, &[u8])]) -> (TempDir, softgrep::pipeline::PipelineHandles) {
    let tmp = TempDir::new().unwrap();
    for (name, content) in files {
        write(tmp.path(), name, content);
    }
    let handles = softgrep::pipeline::run_pipeline(
        vec![Input::Root(tmp.path().to_path_buf())],
        &opts(2),
        Arc::new(Registry::builtin()),
        byte_encoder(),
        CancelToken::new(),
    )
    .unwrap();
    (tmp, handles)
}

#[test]
fn test_counting_sink_drain() {
    let (_tmp, handles) = pipeline_rx(&[("a.txt", b"aaa"), ("b.txt", b"bbb")]);
    let mut sink = CountingSink::default();
    let n = drain(&handles.window_rx, &mut sink).unwrap();
    finish_pipeline(handles.supervisor).unwrap();
    assert_eq!(n, 2);
    assert_eq!(sink.total, 2);
    assert_eq!(sink.per_source.len(), 2);
}

#[test]
fn test_json_lines_sink_rows() {
    let (_tmp, handles) = pipeline_rx(&[("a.txt", b"hello")]);
    let mut sink = JsonLinesSink::new(Vec::new());
    drain(&handles.window_rx, &mut sink).unwrap();
    finish_pipeline(handles.supervisor).unwrap();

    let out = String::from_utf8(sink.into_inner()).unwrap();
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 1);
    let row: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert!(row["path"].as_str().unwrap().ends_with("a.txt"));
    assert_eq!(row["text"], "hello");
    assert_eq!(row["tokens"].as_array().unwrap().len(), 512);
    assert_eq!(row["attention_mask"].as_array().unwrap().len(), 512);
}

#[test]
fn test_embed_sink_failure_is_not_fatal() {
    let (_tmp, handles) = pipeline_rx(&[("a.txt", b"fine"), ("b.txt", b"bad!")]);
    let mut sink = EmbedSink::new(FakeEmbedder);
    let n = drain(&handles.window_rx, &mut sink).unwrap();
    finish_pipeline(handles.supervisor).unwrap();
    assert_eq!(n, 2);
    assert_eq!(sink.failures, 1);
    assert_eq!(sink.embedded.len(), 1);
    assert_eq!(sink.embedded[0].1, vec![6.0]);
    assert!(sink.flush().is_ok());
}
