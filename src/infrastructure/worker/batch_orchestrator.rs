//! Batch Orchestrator - 章节批量生成状态机
//!
//! Planning -> Streaming -> Partitioning -> Persisting -> Planning ... -> 终态
//!
//! 已完成章节数只由本次运行自己的计数器维护：批次规划、上下文构建、
//! 持久化都显式接收由该计数器推导出的章节号，从不回读外部状态。

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::prompt::SubUnitPrompt;
use super::streaming_client::StreamingGenerationClient;
use crate::application::ports::{
    ChapterExporterPort, ChapterStorePort, GenerationError, GenerationJob, GenerationRunnerPort,
    LifecycleEvent, ProgressSinkPort, SessionManagerPort, SessionStatus,
};
use crate::domain::generation::{
    extract_anchor, partition_chapters, AnchorBounds, BatchPlan, ContextBuilder,
    ContinuityAnchor, StoryMemory, SubUnit,
};
use crate::domain::project::{ChapterRecord, Project};
use crate::domain::text_utils::clean_generated_text;

/// 编排器配置
#[derive(Debug, Clone)]
pub struct BatchOrchestratorConfig {
    /// 每批持久化后的等待时间
    pub settle_delay: Duration,
    /// 每批完成后自动导出纯文本
    pub auto_export: bool,
    pub anchor_bounds: AnchorBounds,
    /// 前情提要上限（字符）
    pub memory_chars: usize,
}

impl Default for BatchOrchestratorConfig {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(200),
            auto_export: true,
            anchor_bounds: AnchorBounds::default(),
            memory_chars: 3000,
        }
    }
}

/// 一次运行的终态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed { total_chapters: u32 },
    Cancelled { completed_chapters: u32 },
    Failed { reason: String },
}

impl RunOutcome {
    pub fn status(&self) -> SessionStatus {
        match self {
            RunOutcome::Completed { .. } => SessionStatus::Completed,
            RunOutcome::Cancelled { .. } => SessionStatus::Cancelled,
            RunOutcome::Failed { .. } => SessionStatus::Failed,
        }
    }

    fn terminal_event(&self) -> LifecycleEvent {
        match self {
            RunOutcome::Completed { total_chapters } => LifecycleEvent::AllComplete {
                total_chapters: *total_chapters,
            },
            RunOutcome::Cancelled { completed_chapters } => LifecycleEvent::Cancelled {
                completed_chapters: *completed_chapters,
            },
            RunOutcome::Failed { reason } => LifecycleEvent::Failed {
                reason: reason.clone(),
            },
        }
    }
}

/// 单次运行内部的可变状态，只在本次运行内可见
struct RunState {
    session_id: String,
    project: Project,
    /// 已完成章节数（连续前缀）
    completed: u32,
    anchor: Option<ContinuityAnchor>,
    memory: StoryMemory,
    cancel: CancellationToken,
}

/// 子单元结果
enum SubUnitResult {
    Done,
    Stop(RunOutcome),
}

/// 批量生成编排器
#[derive(Clone)]
pub struct BatchOrchestrator {
    config: BatchOrchestratorConfig,
    context_builder: ContextBuilder,
    client: Arc<StreamingGenerationClient>,
    chapter_store: Arc<dyn ChapterStorePort>,
    exporter: Arc<dyn ChapterExporterPort>,
    session_manager: Arc<dyn SessionManagerPort>,
    sink: Arc<dyn ProgressSinkPort>,
}

impl BatchOrchestrator {
    pub fn new(
        config: BatchOrchestratorConfig,
        context_builder: ContextBuilder,
        client: Arc<StreamingGenerationClient>,
        chapter_store: Arc<dyn ChapterStorePort>,
        exporter: Arc<dyn ChapterExporterPort>,
        session_manager: Arc<dyn SessionManagerPort>,
        sink: Arc<dyn ProgressSinkPort>,
    ) -> Self {
        Self {
            config,
            context_builder,
            client,
            chapter_store,
            exporter,
            session_manager,
            sink,
        }
    }

    /// 执行一次完整运行，返回终态
    pub async fn run(&self, job: GenerationJob) -> RunOutcome {
        let GenerationJob {
            session_id,
            project,
            start_chapter,
            cancel,
        } = job;

        self.sink
            .session_opened(&session_id, &project.id().to_string());

        let completed = start_chapter.saturating_sub(1);
        let anchor = project
            .chapter(completed)
            .filter(|c| !c.is_placeholder())
            .map(|c| extract_anchor(c.body(), self.config.anchor_bounds))
            .filter(|a| !a.is_empty());

        let mut state = RunState {
            session_id,
            project,
            completed,
            anchor,
            memory: StoryMemory::new(self.config.memory_chars),
            cancel,
        };

        let outcome = self.drive(&mut state).await;

        let error = match &outcome {
            RunOutcome::Failed { reason } => {
                tracing::error!(session_id = %state.session_id, reason = %reason, "Generation failed");
                Some(reason.clone())
            }
            _ => None,
        };
        if let Err(e) = self
            .session_manager
            .finish(&state.session_id, outcome.status(), error)
        {
            tracing::warn!(session_id = %state.session_id, error = %e, "Failed to finish session");
        }

        self.sink.publish(&state.session_id, outcome.terminal_event());
        self.sink
            .session_closed(&state.session_id, outcome.status().as_str());

        tracing::info!(
            session_id = %state.session_id,
            project_id = %state.project.id(),
            status = outcome.status().as_str(),
            completed_chapters = state.completed,
            "Generation run finished"
        );
        outcome
    }

    async fn drive(&self, state: &mut RunState) -> RunOutcome {
        let total = state.project.total_chapters();
        let total_batches = BatchPlan::remaining_batches(state.completed, total);

        if let Err(e) = self
            .session_manager
            .set_status(&state.session_id, SessionStatus::Streaming)
        {
            return RunOutcome::Failed {
                reason: e.to_string(),
            };
        }

        let mut batch_index = 0;
        while let Some(plan) = BatchPlan::next(state.completed, total) {
            batch_index += 1;
            tracing::debug!(
                session_id = %state.session_id,
                batch_index = batch_index,
                start_chapter = plan.start_chapter,
                end_chapter = plan.end_chapter,
                "Planning batch"
            );

            if state.cancel.is_cancelled() {
                return self.cancelled(state);
            }

            if let Err(e) = self.session_manager.set_batch(&state.session_id, batch_index) {
                tracing::warn!(session_id = %state.session_id, error = %e, "Failed to update batch index");
            }
            self.sink.publish(
                &state.session_id,
                LifecycleEvent::BatchStarted {
                    batch_index,
                    total_batches,
                    start_chapter: plan.start_chapter,
                    end_chapter: plan.end_chapter,
                },
            );

            let context = self.context_builder.build(&state.project, plan.start_chapter);

            for sub_unit in plan.sub_units() {
                if state.cancel.is_cancelled() {
                    return self.cancelled(state);
                }
                if let SubUnitResult::Stop(outcome) =
                    self.run_sub_unit(state, &context, &sub_unit).await
                {
                    return outcome;
                }
            }

            self.after_batch(state, batch_index).await;
        }

        RunOutcome::Completed {
            total_chapters: total,
        }
    }

    fn cancelled(&self, state: &RunState) -> RunOutcome {
        tracing::info!(
            session_id = %state.session_id,
            completed_chapters = state.completed,
            "Generation cancelled"
        );
        RunOutcome::Cancelled {
            completed_chapters: state.completed,
        }
    }

    async fn run_sub_unit(
        &self,
        state: &mut RunState,
        context: &str,
        sub_unit: &SubUnit,
    ) -> SubUnitResult {
        let chapters = sub_unit.chapters();
        self.sink.publish(
            &state.session_id,
            LifecycleEvent::SubUnitStarted {
                chapters: chapters.clone(),
            },
        );

        let focus = self
            .context_builder
            .focus_block(&state.project, sub_unit.first_chapter);
        let memory = state.memory.render();
        let messages = SubUnitPrompt {
            sub_unit,
            context,
            focus: focus.as_deref(),
            memory: memory.as_deref(),
            anchor: state.anchor.as_ref(),
        }
        .to_messages();

        tracing::debug!(session_id = %state.session_id, chapters = ?chapters, "Streaming sub-unit");
        let text = match self
            .client
            .generate(&state.session_id, &chapters, messages, &state.cancel)
            .await
        {
            Ok(text) => text,
            Err(GenerationError::Cancelled) => return SubUnitResult::Stop(self.cancelled(state)),
            Err(e) => {
                let reason = e.to_string();
                tracing::error!(
                    session_id = %state.session_id,
                    chapters = ?chapters,
                    error = %reason,
                    "Sub-unit generation failed"
                );
                self.sink.publish(
                    &state.session_id,
                    LifecycleEvent::SubUnitFailed {
                        chapters,
                        reason: reason.clone(),
                    },
                );
                return SubUnitResult::Stop(RunOutcome::Failed { reason });
            }
        };

        tracing::debug!(session_id = %state.session_id, chapters = ?chapters, "Partitioning chapters");
        let cleaned = clean_generated_text(&text);
        let partition =
            partition_chapters(&cleaned, sub_unit.first_chapter, sub_unit.chapter_count());
        if !partition.issues.is_empty() {
            tracing::warn!(
                session_id = %state.session_id,
                chapters = ?chapters,
                issues = ?partition.issues,
                fallback = partition.used_fallback(),
                "Chapter markers did not match the expected format"
            );
            self.sink.publish(
                &state.session_id,
                LifecycleEvent::FormatWarning {
                    chapters: chapters.clone(),
                    issues: partition.issues.clone(),
                },
            );
        }

        tracing::debug!(session_id = %state.session_id, chapters = ?chapters, "Persisting chapters");
        let records = partition.chapters;
        state.project.record_chapters(records.iter().cloned());
        if let Err(e) = self
            .chapter_store
            .save_chapters(*state.project.id(), state.project.chapters())
            .await
        {
            // 内存中的章节表与存储不一致，本次运行不能继续
            return SubUnitResult::Stop(RunOutcome::Failed {
                reason: format!("Failed to persist chapters {:?}: {}", chapters, e),
            });
        }

        state.completed = sub_unit.last_chapter;
        if let Err(e) = self
            .session_manager
            .record_completed(&state.session_id, &chapters)
        {
            tracing::warn!(session_id = %state.session_id, error = %e, "Failed to record completed chapters");
        }

        for record in &records {
            self.sink.publish(
                &state.session_id,
                LifecycleEvent::ChapterCompleted {
                    chapter_number: record.number(),
                    title: record.title().to_string(),
                    final_text: record.body().to_string(),
                    placeholder: record.is_placeholder(),
                },
            );
        }

        self.advance_continuity(state, &records);

        tracing::info!(
            session_id = %state.session_id,
            chapters = ?chapters,
            completed = state.completed,
            "Sub-unit completed"
        );
        SubUnitResult::Done
    }

    /// 用最后一个非占位章节更新锚点与前情提要
    fn advance_continuity(&self, state: &mut RunState, records: &[ChapterRecord]) {
        if let Some(last) = records.iter().rev().find(|c| !c.is_placeholder()) {
            let anchor = extract_anchor(last.body(), self.config.anchor_bounds);
            if !anchor.is_empty() {
                state.anchor = Some(anchor);
            }
        }
        state.memory.remember(records);
    }

    async fn after_batch(&self, state: &RunState, batch_index: u32) {
        if self.config.auto_export {
            match self
                .exporter
                .export_as_text(&state.project, state.project.chapters())
                .await
            {
                Ok(exported) => tracing::debug!(
                    session_id = %state.session_id,
                    file_name = %exported.file_name,
                    "Auto export finished"
                ),
                Err(e) => tracing::warn!(
                    session_id = %state.session_id,
                    error = %e,
                    "Auto export failed"
                ),
            }
        }

        self.sink.publish(
            &state.session_id,
            LifecycleEvent::BatchPersisted {
                batch_index,
                completed_chapters: state.completed,
            },
        );

        if !self.config.settle_delay.is_zero() {
            tokio::time::sleep(self.config.settle_delay).await;
        }
    }
}

impl GenerationRunnerPort for BatchOrchestrator {
    fn launch(&self, job: GenerationJob) {
        let orchestrator = self.clone();
        tracing::info!(
            session_id = %job.session_id,
            project_id = %job.project.id(),
            start_chapter = job.start_chapter,
            "Launching generation run"
        );
        tokio::spawn(async move {
            orchestrator.run(job).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::GenerationSession;
    use crate::domain::generation::align_to_unit;
    use crate::domain::project::{BookName, NarrativeUnit, OutlineSummary, StoryBible};
    use crate::infrastructure::adapters::{FakeChatClient, FakeChatClientConfig, FakeReply, TextFileExporter};
    use crate::infrastructure::memory::InMemorySessionManager;
    use crate::infrastructure::persistence::sqlite::{create_test_pool, SqliteChapterStore};
    use crate::infrastructure::worker::StreamingClientConfig;
    use chrono::Utc;
    use std::collections::{BTreeMap, BTreeSet};
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<LifecycleEvent>>,
    }

    impl RecordingSink {
        fn events(&self) -> Vec<LifecycleEvent> {
            self.events.lock().unwrap().clone()
        }

        fn saw_delta_for(&self, wanted: &[u32]) -> bool {
            self.events.lock().unwrap().iter().any(|e| {
                matches!(e, LifecycleEvent::TextDelta { chapters, .. } if chapters.as_slice() == wanted)
            })
        }
    }

    impl ProgressSinkPort for RecordingSink {
        fn publish(&self, _session_id: &str, event: LifecycleEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    struct Harness {
        orchestrator: BatchOrchestrator,
        fake: Arc<FakeChatClient>,
        sink: Arc<RecordingSink>,
        store: Arc<SqliteChapterStore>,
        sessions: Arc<InMemorySessionManager>,
        export_dir: TempDir,
    }

    async fn harness() -> Harness {
        let fake = Arc::new(FakeChatClient::new(FakeChatClientConfig {
            chunk_chars: 40,
            delay_ms: 0,
            body_chars: 600,
        }));
        let sink = Arc::new(RecordingSink::default());
        let store = Arc::new(SqliteChapterStore::new(create_test_pool().await));
        let sessions = Arc::new(InMemorySessionManager::new());
        let export_dir = TempDir::new().unwrap();

        let client = Arc::new(StreamingGenerationClient::new(
            fake.clone(),
            sink.clone(),
            StreamingClientConfig::default(),
        ));
        let orchestrator = BatchOrchestrator::new(
            BatchOrchestratorConfig {
                settle_delay: Duration::ZERO,
                ..Default::default()
            },
            ContextBuilder::default(),
            client,
            store.clone(),
            Arc::new(TextFileExporter::new(export_dir.path(), true)),
            sessions.clone(),
            sink.clone(),
        );

        Harness {
            orchestrator,
            fake,
            sink,
            store,
            sessions,
            export_dir,
        }
    }

    fn project(units: u32) -> Project {
        let mut project = Project::new(
            BookName::new("雾港纪事").unwrap(),
            OutlineSummary::default(),
            StoryBible::default(),
        );
        let now = Utc::now();
        let units = (0..units)
            .map(|i| {
                NarrativeUnit::new(
                    format!("u{}", i),
                    format!("UNIT-{:02}", i),
                    format!("细纲{}", i),
                    "g1",
                    1,
                    "第一卷",
                    i + 1,
                    now,
                )
                .unwrap()
            })
            .collect();
        project.add_units(units).unwrap();
        project
    }

    impl Harness {
        fn job(&self, project: &Project, start_chapter: u32) -> GenerationJob {
            let session = GenerationSession::new(
                *project.id().as_uuid(),
                start_chapter,
                BatchPlan::remaining_batches(start_chapter - 1, project.total_chapters()),
                project.chapters().keys().copied(),
            );
            let session_id = session.id.clone();
            let cancel = self.sessions.begin(session).unwrap();
            GenerationJob {
                session_id,
                project: project.clone(),
                start_chapter,
                cancel,
            }
        }

        async fn stored(&self, project: &Project) -> BTreeMap<u32, ChapterRecord> {
            self.store.load_chapters(*project.id()).await.unwrap()
        }
    }

    #[tokio::test]
    async fn test_full_run_generates_every_chapter_once() {
        let h = harness().await;
        let project = project(8);
        let job = h.job(&project, 1);
        let session_id = job.session_id.clone();

        let outcome = h.orchestrator.run(job).await;
        assert_eq!(outcome, RunOutcome::Completed { total_chapters: 16 });

        let session = h.sessions.get(&session_id).unwrap();
        assert_eq!(session.status, SessionStatus::Completed);
        assert_eq!(
            session.completed_chapter_numbers,
            (1..=16).collect::<BTreeSet<u32>>()
        );

        let stored = h.stored(&project).await;
        assert_eq!(stored.keys().copied().collect::<Vec<_>>(), (1..=16).collect::<Vec<_>>());
        assert!(stored.values().all(|c| !c.is_placeholder()));

        let events = h.sink.events();
        let completed: Vec<u32> = events
            .iter()
            .filter_map(|e| match e {
                LifecycleEvent::ChapterCompleted { chapter_number, .. } => Some(*chapter_number),
                _ => None,
            })
            .collect();
        assert_eq!(completed, (1..=16).collect::<Vec<_>>());

        let batches: Vec<(u32, u32)> = events
            .iter()
            .filter_map(|e| match e {
                LifecycleEvent::BatchStarted {
                    start_chapter,
                    end_chapter,
                    ..
                } => Some((*start_chapter, *end_chapter)),
                _ => None,
            })
            .collect();
        assert_eq!(batches, vec![(1, 8), (9, 16)]);
        assert_eq!(events.last(), Some(&LifecycleEvent::AllComplete { total_chapters: 16 }));

        assert!(h.export_dir.path().join("雾港纪事.txt").exists());
    }

    #[tokio::test]
    async fn test_second_batch_prompt_only_references_its_units() {
        let h = harness().await;
        let project = project(8);
        h.orchestrator.run(h.job(&project, 1)).await;

        let calls = h.fake.calls().await;
        assert_eq!(calls.len(), 8);
        for call in &calls[4..] {
            let user = &call[1].content;
            for early in 0..4 {
                assert!(!user.contains(&format!("UNIT-{:02}", early)));
            }
            assert!(user.contains("UNIT-04"));
            assert!(user.contains("【上一章结尾（必须无缝衔接）】"));
        }
        assert!(calls[4][1].content.contains("本次输出章节：第9章、第10章"));
    }

    #[tokio::test]
    async fn test_twelve_chapters_second_batch_has_four() {
        let h = harness().await;
        let project = project(6);
        h.orchestrator.run(h.job(&project, 1)).await;

        let batches: Vec<(u32, u32, u32)> = h
            .sink
            .events()
            .iter()
            .filter_map(|e| match e {
                LifecycleEvent::BatchStarted {
                    batch_index,
                    start_chapter,
                    end_chapter,
                    ..
                } => Some((*batch_index, *start_chapter, *end_chapter)),
                _ => None,
            })
            .collect();
        assert_eq!(batches, vec![(1, 1, 8), (2, 9, 12)]);
    }

    #[tokio::test]
    async fn test_cancel_mid_sub_unit_keeps_only_finished_chapters() {
        let h = harness().await;
        let project = project(4);
        h.fake.push_reply(FakeReply::Auto).await;
        h.fake.push_reply(FakeReply::Auto).await;
        h.fake
            .push_reply(FakeReply::Hang {
                partial: "第5章 [半截]\n雨还在下，".to_string(),
            })
            .await;

        let job = h.job(&project, 1);
        let session_id = job.session_id.clone();
        let orchestrator = h.orchestrator.clone();
        let handle = tokio::spawn(async move { orchestrator.run(job).await });

        for _ in 0..200 {
            if h.sink.saw_delta_for(&[5, 6]) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(h.sink.saw_delta_for(&[5, 6]));
        h.sessions.cancel(&session_id).unwrap();

        let outcome = handle.await.unwrap();
        assert_eq!(outcome, RunOutcome::Cancelled { completed_chapters: 4 });

        let session = h.sessions.get(&session_id).unwrap();
        assert_eq!(session.status, SessionStatus::Cancelled);
        assert_eq!(
            session.completed_chapter_numbers,
            [1, 2, 3, 4].into_iter().collect::<BTreeSet<u32>>()
        );
        let stored = h.stored(&project).await;
        assert_eq!(stored.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3, 4]);
        assert!(matches!(
            h.sink.events().last(),
            Some(LifecycleEvent::Cancelled { completed_chapters: 4 })
        ));
    }

    #[tokio::test]
    async fn test_transport_failure_then_resume_matches_uninterrupted_run() {
        let h = harness().await;
        let mut project = project(4);
        h.fake.push_reply(FakeReply::Auto).await;
        h.fake
            .push_reply(FakeReply::Fail(GenerationError::Network("connection reset".into())))
            .await;

        let outcome = h.orchestrator.run(h.job(&project, 1)).await;
        assert!(matches!(outcome, RunOutcome::Failed { .. }));
        assert!(h.sink.events().iter().any(|e| matches!(
            e,
            LifecycleEvent::SubUnitFailed { chapters, .. } if chapters == &vec![3, 4]
        )));

        let stored = h.stored(&project).await;
        assert_eq!(stored.keys().copied().collect::<Vec<_>>(), vec![1, 2]);

        // 从存储恢复项目状态后续跑
        project.record_chapters(stored.into_values());
        let start = align_to_unit(project.contiguous_completed()) + 1;
        assert_eq!(start, 3);

        let job = h.job(&project, start);
        let session_id = job.session_id.clone();
        let outcome = h.orchestrator.run(job).await;
        assert_eq!(outcome, RunOutcome::Completed { total_chapters: 8 });

        let stored = h.stored(&project).await;
        assert_eq!(stored.keys().copied().collect::<Vec<_>>(), (1..=8).collect::<Vec<_>>());
        assert_eq!(
            h.sessions.get(&session_id).unwrap().completed_chapter_numbers,
            (1..=8).collect::<BTreeSet<u32>>()
        );

        // 续跑的首个子单元从第 3 章开始，且带着第 2 章的结尾
        let calls = h.fake.calls().await;
        let resumed = &calls[calls.len() - 3][1].content;
        assert!(resumed.contains("本次输出章节：第3章、第4章"));
        assert!(resumed.contains("【上一章结尾（必须无缝衔接）】"));
    }

    #[tokio::test]
    async fn test_missing_marker_falls_back_and_continues() {
        let h = harness().await;
        let project = project(2);
        h.fake
            .push_reply(FakeReply::Text(
                "第1章 [唯一]\n只有一章的内容。\n\n后面没有第二个标记。".to_string(),
            ))
            .await;

        let outcome = h.orchestrator.run(h.job(&project, 1)).await;
        assert_eq!(outcome, RunOutcome::Completed { total_chapters: 4 });

        let stored = h.stored(&project).await;
        assert_eq!(stored[&1].title(), "唯一");
        assert!(stored[&1].body().contains("后面没有第二个标记"));
        assert!(stored[&2].is_placeholder());
        assert!(!stored[&3].is_placeholder());
        assert!(!stored[&4].is_placeholder());

        assert!(h.sink.events().iter().any(|e| matches!(
            e,
            LifecycleEvent::FormatWarning { chapters, issues }
                if chapters == &vec![1, 2] && issues.iter().any(|i| i.is_fallback())
        )));
    }

    #[tokio::test]
    async fn test_resume_after_overwrite_keeps_earlier_chapters() {
        let h = harness().await;
        let mut project = project(5);
        project.record_chapters((1..=4).map(|n| ChapterRecord::new(n, format!("旧{}", n), "旧的正文。")));
        h.store
            .save_chapters(*project.id(), project.chapters())
            .await
            .unwrap();

        let outcome = h.orchestrator.run(h.job(&project, 5)).await;
        assert_eq!(outcome, RunOutcome::Completed { total_chapters: 10 });

        let stored = h.stored(&project).await;
        assert_eq!(stored.len(), 10);
        assert_eq!(stored[&4].title(), "旧4");
        assert_eq!(stored[&5].title(), "自动章节5");
    }

    #[tokio::test]
    async fn test_cancel_before_start() {
        let h = harness().await;
        let project = project(2);
        let job = h.job(&project, 1);
        job.cancel.cancel();

        let outcome = h.orchestrator.run(job).await;
        assert_eq!(outcome, RunOutcome::Cancelled { completed_chapters: 0 });
        assert!(h.fake.calls().await.is_empty());
        assert!(h.stored(&project).await.is_empty());
    }
}
