use sqlx::{Executor, Result, Sqlite};

use super::{MatchRecord, RunRecord, VideoMetadataRecord};
use crate::quality::QualityRecord;
use crate::report::ReportEntry;

/// 添加运行记录
pub async fn add_run<'c, E>(
    executor: E,
    match_distance: f32,
    neighbors: usize,
    filtered: bool,
    digest: &str,
) -> Result<i64>
where
    E: Executor<'c, Database = Sqlite>,
{
    sqlx::query_scalar(
        r#"
        INSERT INTO run (match_distance, neighbors, filtered, digest)
        VALUES (?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(match_distance)
    .bind(neighbors as i64)
    .bind(filtered)
    .bind(digest)
    .fetch_one(executor)
    .await
}

/// 添加匹配记录
pub async fn add_match<'c, E>(
    executor: E,
    run_id: i64,
    entry: &ReportEntry,
    discarded: bool,
) -> Result<()>
where
    E: Executor<'c, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO matches (run_id, query_video, match_video, distance, discarded)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(run_id)
    .bind(&entry.query_video)
    .bind(&entry.match_video)
    .bind(entry.distance)
    .bind(discarded)
    .execute(executor)
    .await?;

    Ok(())
}

/// 添加视频质量记录
pub async fn add_video_metadata<'c, E>(executor: E, run_id: i64, r: &QualityRecord) -> Result<()>
where
    E: Executor<'c, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO video_metadata (
            run_id, video_id, video_length_seconds,
            activity_mean, activity_std, activity_max_delta,
            gray_mean, gray_std, gray_max,
            duration_flag, dark_flag, flagged
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(run_id)
    .bind(&r.video_id)
    .bind(r.video_length_seconds)
    .bind(r.activity_mean)
    .bind(r.activity_std)
    .bind(r.activity_max_delta)
    .bind(r.gray_mean)
    .bind(r.gray_std)
    .bind(r.gray_max)
    .bind(r.duration_flag)
    .bind(r.dark_flag)
    .bind(r.flagged)
    .execute(executor)
    .await?;

    Ok(())
}

/// 获取最近一次运行
pub async fn get_latest_run<'c, E>(executor: E) -> Result<Option<RunRecord>>
where
    E: Executor<'c, Database = Sqlite>,
{
    sqlx::query_as(
        r#"
        SELECT id, created_at, match_distance, neighbors, filtered, digest
        FROM run ORDER BY id DESC LIMIT 1
        "#,
    )
    .fetch_optional(executor)
    .await
}

/// 获取一次运行的所有匹配，按写入顺序
pub async fn get_matches<'c, E>(executor: E, run_id: i64) -> Result<Vec<MatchRecord>>
where
    E: Executor<'c, Database = Sqlite>,
{
    sqlx::query_as(
        r#"
        SELECT id, run_id, query_video, match_video, distance, discarded
        FROM matches WHERE run_id = ? ORDER BY id ASC
        "#,
    )
    .bind(run_id)
    .fetch_all(executor)
    .await
}

/// 获取一次运行中被标记的视频
pub async fn get_flagged_videos<'c, E>(
    executor: E,
    run_id: i64,
) -> Result<Vec<VideoMetadataRecord>>
where
    E: Executor<'c, Database = Sqlite>,
{
    sqlx::query_as(
        r#"
        SELECT run_id, video_id, video_length_seconds, gray_max, flagged
        FROM video_metadata WHERE run_id = ? AND flagged = 1 ORDER BY video_id ASC
        "#,
    )
    .bind(run_id)
    .fetch_all(executor)
    .await
}
