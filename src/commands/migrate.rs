//! The migration pipeline: walk, classify, refactor, write, count.

use std::path::Path;

use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::classify::classify;
use crate::config::Settings;
use crate::context::ServiceContext;
use crate::prompts;
use crate::refactor::{CompletionClient, FallbackOrchestrator, RefactorRequest};
use crate::summary::{RunSummary, SummaryAggregator};
use crate::walk::walk;

/// Migrates every eligible file below `root`, one at a time.
///
/// Per-file failures never stop the traversal; they end up in the returned
/// summary. A file is only replaced when its conversion has been written, and
/// an existing file is never overwritten.
pub async fn migrate(ctx: &ServiceContext, settings: &Settings, root: &Path) -> RunSummary {
    let run_id = Uuid::new_v4();
    let span = info_span!("migrate", %run_id, root = %root.display());
    migrate_files(ctx, settings, root, run_id)
        .instrument(span)
        .await
}

async fn migrate_files(
    ctx: &ServiceContext,
    settings: &Settings,
    root: &Path,
    run_id: Uuid,
) -> RunSummary {
    let client = CompletionClient::new(
        ctx.llm.as_ref(),
        ctx.clock.as_ref(),
        settings.retry,
        settings.sampling,
    );
    let orchestrator = FallbackOrchestrator::new(client, settings.models.clone());
    let mut summary = SummaryAggregator::new(run_id, ctx.clock.now());

    info!(
        primary = %settings.models.primary,
        fallback = %settings.models.fallback,
        "starting migration"
    );

    for path in walk(ctx.fs.as_ref(), root) {
        summary.record_attempt();

        let source_text = match ctx.fs.read_to_string(&path) {
            Ok(text) => text,
            Err(e) => {
                error!(file = %path.display(), error = %e, "cannot read source file");
                summary.record_failure(path);
                continue;
            }
        };

        let request = RefactorRequest {
            is_component: classify(&source_text).is_component,
            file_path: path,
            source_text,
        };
        debug!(
            file = %request.file_path.display(),
            component = request.is_component,
            "classified"
        );

        // Covers hand-written files as well as outputs of this run that share
        // a stem (`a.js` and `a.jsx` both become `a.ts`).
        let target = request.target_path();
        if ctx.fs.exists(&target) {
            warn!(
                file = %request.file_path.display(),
                target = %target.display(),
                "target already exists, leaving source in place"
            );
            summary.record_failure(request.file_path);
            continue;
        }

        let outcome = match orchestrator.refactor(&request).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "giving up on file");
                summary.record_initial_failure();
                summary.record_failure(request.file_path);
                continue;
            }
        };
        if outcome.used_fallback_model {
            summary.record_initial_failure();
        }

        let converted = prompts::clean_response(&outcome.text);
        if let Err(e) = ctx.fs.write(&target, &converted) {
            error!(file = %target.display(), error = %e, "cannot write converted file");
            discard_partial_output(ctx, &target);
            summary.record_failure(request.file_path);
            continue;
        }
        if let Err(e) = ctx.fs.remove_file(&request.file_path) {
            warn!(
                file = %request.file_path.display(),
                error = %e,
                "converted file written but original not removed"
            );
        }

        info!(
            from = %request.file_path.display(),
            to = %target.display(),
            model = %outcome.model,
            fallback = outcome.used_fallback_model,
            "converted"
        );
        summary.record_success(outcome.used_fallback_model, &outcome.model);

        ctx.clock.sleep(settings.post_write_delay).await;
    }

    let snapshot = summary.snapshot(ctx.clock.now());
    info!(
        attempted = snapshot.attempted,
        succeeded = snapshot.succeeded,
        failed = snapshot.failed,
        "migration finished"
    );
    snapshot
}

/// Removes whatever a failed write left at `target`. The target did not exist
/// before the write, so nothing else can be lost.
fn discard_partial_output(ctx: &ServiceContext, target: &Path) {
    if !ctx.fs.exists(target) {
        return;
    }
    if let Err(e) = ctx.fs.remove_file(target) {
        warn!(file = %target.display(), error = %e, "cannot remove partial output");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::live::LiveFileSystem;
    use crate::adapters::replaying::{llm_cassette, ReplayingLlmClient, VirtualClock};
    use crate::ports::{CompletionError, CompletionResponse, DirEntry, FileSystem, FsError};
    use std::time::Duration;

    fn ok(text: &str) -> Result<CompletionResponse, CompletionError> {
        Ok(CompletionResponse {
            text: text.into(),
            prompt_tokens: 1,
            completion_tokens: 1,
        })
    }

    fn settings() -> Settings {
        let mut settings = Settings::default();
        settings.models.primary = "primary".into();
        settings.models.fallback = "fallback".into();
        settings.retry.max_attempts = 2;
        settings.post_write_delay = Duration::from_millis(250);
        settings
    }

    fn context_on(
        fs: Box<dyn FileSystem>,
        steps: Vec<(&str, Result<CompletionResponse, CompletionError>)>,
    ) -> ServiceContext {
        ServiceContext::from_parts(
            Box::new(VirtualClock::default()),
            fs,
            Box::new(ReplayingLlmClient::new(&llm_cassette(steps))),
        )
    }

    fn context(steps: Vec<(&str, Result<CompletionResponse, CompletionError>)>) -> ServiceContext {
        context_on(Box::new(LiveFileSystem), steps)
    }

    /// Real disk, with writes or removals forced to fail.
    struct FlakyFs {
        fail_write: bool,
        fail_remove: bool,
    }

    impl FileSystem for FlakyFs {
        fn read_to_string(&self, path: &Path) -> Result<String, FsError> {
            LiveFileSystem.read_to_string(path)
        }

        fn write(&self, path: &Path, contents: &str) -> Result<(), FsError> {
            if self.fail_write {
                // Leave a truncated file behind, as an interrupted write would.
                LiveFileSystem.write(path, &contents[..contents.len() / 2])?;
                return Err("no space left on device".into());
            }
            LiveFileSystem.write(path, contents)
        }

        fn remove_file(&self, path: &Path) -> Result<(), FsError> {
            if self.fail_remove {
                return Err("permission denied".into());
            }
            LiveFileSystem.remove_file(path)
        }

        fn exists(&self, path: &Path) -> bool {
            LiveFileSystem.exists(path)
        }

        fn list_dir(&self, path: &Path) -> Result<Vec<DirEntry>, FsError> {
            LiveFileSystem.list_dir(path)
        }
    }

    #[tokio::test]
    async fn converts_and_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("util.js"), "module.exports = 1;").unwrap();

        let ctx = context(vec![("primary", ok("```ts\nexport default 1;\n```"))]);
        let summary = migrate(&ctx, &settings(), dir.path()).await;

        assert_eq!(summary.succeeded, 1);
        assert!(!dir.path().join("util.js").exists());
        assert_eq!(
            std::fs::read_to_string(dir.path().join("util.ts")).unwrap(),
            "export default 1;\n"
        );
    }

    #[tokio::test]
    async fn failed_file_is_left_untouched() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("x.js"), "var x;").unwrap();

        let ctx = context(vec![
            (
                "primary",
                Err(CompletionError::Api {
                    status: 500,
                    message: "down".into(),
                }),
            ),
            ("fallback", ok("")),
        ]);
        let summary = migrate(&ctx, &settings(), dir.path()).await;

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.failed_initially, 1);
        assert_eq!(summary.failed_files, vec![dir.path().join("x.js")]);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("x.js")).unwrap(),
            "var x;"
        );
        assert!(!dir.path().join("x.ts").exists());
        assert!(summary.is_consistent());
    }

    #[tokio::test]
    async fn unreadable_source_counts_as_failure() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bin.js"), b"\xff\xfe\x00").unwrap();

        let ctx = context(vec![]);
        let summary = migrate(&ctx, &settings(), dir.path()).await;

        assert_eq!(summary.attempted, 1);
        assert_eq!(summary.failed, 1);
        assert!(dir.path().join("bin.js").exists());
    }

    #[tokio::test]
    async fn existing_target_is_never_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("util.js"), "module.exports = 1;").unwrap();
        std::fs::write(dir.path().join("util.ts"), "// handwritten\n").unwrap();

        // An empty cassette panics on any call, so this also proves the
        // model is never asked.
        let ctx = context(vec![]);
        let summary = migrate(&ctx, &settings(), dir.path()).await;

        assert_eq!(summary.attempted, 1);
        assert_eq!(summary.succeeded, 0);
        assert_eq!(summary.failed_files, vec![dir.path().join("util.js")]);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("util.ts")).unwrap(),
            "// handwritten\n"
        );
        assert!(dir.path().join("util.js").exists());
    }

    #[tokio::test]
    async fn write_failure_keeps_original_and_discards_partial_output() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("math.js"), "var two = 2;").unwrap();

        let fs = FlakyFs {
            fail_write: true,
            fail_remove: false,
        };
        let ctx = context_on(
            Box::new(fs),
            vec![("primary", ok("export const two: number = 2;"))],
        );
        let summary = migrate(&ctx, &settings(), dir.path()).await;

        assert_eq!(summary.attempted, 1);
        assert_eq!(summary.succeeded, 0);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.failed_initially, 0);
        assert_eq!(summary.failed_files, vec![dir.path().join("math.js")]);
        assert!(summary.is_consistent());
        assert_eq!(
            std::fs::read_to_string(dir.path().join("math.js")).unwrap(),
            "var two = 2;"
        );
        assert!(!dir.path().join("math.ts").exists());
    }

    #[tokio::test]
    async fn remove_failure_still_counts_as_success() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("math.js"), "var two = 2;").unwrap();

        let fs = FlakyFs {
            fail_write: false,
            fail_remove: true,
        };
        let ctx = context_on(
            Box::new(fs),
            vec![("primary", ok("export const two: number = 2;"))],
        );
        let summary = migrate(&ctx, &settings(), dir.path()).await;

        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 0);
        assert!(summary.failed_files.is_empty());
        assert!(summary.is_consistent());
        assert_eq!(
            std::fs::read_to_string(dir.path().join("math.ts")).unwrap(),
            "export const two: number = 2;\n"
        );
        assert!(dir.path().join("math.js").exists());
    }
}
