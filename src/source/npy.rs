use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, bail};
use log::{debug, warn};
use ndarray::prelude::*;
use ndarray_npy::{ReadNpyError, ReadNpyExt};
use rayon::prelude::*;
use regex::Regex;
use walkdir::WalkDir;

use super::{EmbeddingSource, QualitySource};
use crate::index::EmbeddingRecord;
use crate::quality::{FrameStats, VideoStats};

static RE_SIGNATURE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?<id>.+)_vgg_signature\.npy$").unwrap());
static RE_FEATURES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?<id>.+)_vgg_features\.npy$").unwrap());

const FRAMES_SUFFIX: &str = "_vgg_frames.npy";

/// 每个视频一个 `<id>_vgg_signature.npy` 文件的目录
#[derive(Debug, Clone)]
pub struct NpySignatureDir {
    dir: PathBuf,
    re: Regex,
}

impl NpySignatureDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), re: RE_SIGNATURE.clone() }
    }

    /// 使用自定义正则表达式匹配文件名，`id` 分组作为视频 ID
    pub fn with_regex(mut self, re: &str) -> anyhow::Result<Self> {
        self.re = id_regex(re)?;
        Ok(self)
    }
}

impl EmbeddingSource for NpySignatureDir {
    fn list(&self) -> anyhow::Result<Vec<EmbeddingRecord>> {
        let files = scan(&self.dir, &self.re);
        debug!("在 {} 中找到 {} 个向量文件", self.dir.display(), files.len());
        files
            .into_par_iter()
            .map(|(video_id, path)| Ok(EmbeddingRecord { video_id, vector: read_vector(&path)? }))
            .collect()
    }
}

/// 帧级特征 `<id>_vgg_features.npy` 和采样帧 `<id>_vgg_frames.npy` 所在的目录
#[derive(Debug, Clone)]
pub struct NpyFrameDir {
    dir: PathBuf,
    re: Regex,
    frames_per_second: f32,
}

impl NpyFrameDir {
    pub fn new(dir: impl Into<PathBuf>, frames_per_second: f32) -> Self {
        Self { dir: dir.into(), re: RE_FEATURES.clone(), frames_per_second }
    }

    /// 使用自定义正则表达式匹配帧级特征的文件名
    pub fn with_regex(mut self, re: &str) -> anyhow::Result<Self> {
        self.re = id_regex(re)?;
        Ok(self)
    }

    fn stats(&self, video_id: &str, features_path: &Path) -> anyhow::Result<VideoStats> {
        let features = read_features(features_path)?;
        let frames_path = features_path.with_file_name(format!("{video_id}{FRAMES_SUFFIX}"));
        let frames = match read_frames(&frames_path) {
            Ok(frames) => Some(frames),
            Err(e) => {
                warn!("无法读取 {} 的采样帧，灰度统计视为 0: {e:#}", video_id);
                None
            }
        };
        Ok(FrameStats::compute(
            video_id,
            features.view(),
            frames.as_ref().map(|f| f.view()),
            self.frames_per_second,
        ))
    }
}

impl QualitySource for NpyFrameDir {
    fn list(&self) -> anyhow::Result<Vec<VideoStats>> {
        let files = scan(&self.dir, &self.re);
        debug!("在 {} 中找到 {} 个帧级特征文件", self.dir.display(), files.len());
        files.into_par_iter().map(|(video_id, path)| self.stats(&video_id, &path)).collect()
    }
}

fn id_regex(re: &str) -> anyhow::Result<Regex> {
    let re = Regex::new(re).with_context(|| format!("无效的正则表达式: {re}"))?;
    if !re.capture_names().any(|name| name == Some("id")) {
        bail!("正则表达式缺少 id 分组: {re}");
    }
    Ok(re)
}

/// 扫描目录，返回按视频 ID 排序的 (视频 ID, 文件路径)
fn scan(dir: &Path, re: &Regex) -> Vec<(String, PathBuf)> {
    let mut files = WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let id = {
                let name = entry.file_name().to_string_lossy();
                re.captures(&name)?.name("id")?.as_str().to_owned()
            };
            Some((id, entry.into_path()))
        })
        .collect::<Vec<_>>();
    files.sort();
    files
}

fn read_npy_file<A: ReadNpyExt>(path: &Path) -> anyhow::Result<A> {
    let file = File::open(path).with_context(|| format!("无法打开文件: {}", path.display()))?;
    A::read_npy(file).with_context(|| format!("无法解析 npy 文件: {}", path.display()))
}

/// 读取任意形状的 f32 或 f64 数组并展开为向量
fn read_vector(path: &Path) -> anyhow::Result<Vec<f32>> {
    let file = File::open(path).with_context(|| format!("无法打开文件: {}", path.display()))?;
    match ArrayD::<f32>::read_npy(file) {
        Ok(a) => Ok(a.iter().copied().collect()),
        Err(ReadNpyError::WrongDescriptor(_)) => {
            let a: ArrayD<f64> = read_npy_file(path)?;
            Ok(a.iter().map(|&x| x as f32).collect())
        }
        Err(e) => Err(e).with_context(|| format!("无法解析 npy 文件: {}", path.display())),
    }
}

fn read_features(path: &Path) -> anyhow::Result<Array2<f32>> {
    let file = File::open(path).with_context(|| format!("无法打开文件: {}", path.display()))?;
    match Array2::<f32>::read_npy(file) {
        Ok(a) => Ok(a),
        Err(ReadNpyError::WrongDescriptor(_)) => {
            let a: Array2<f64> = read_npy_file(path)?;
            Ok(a.mapv(|x| x as f32))
        }
        Err(e) => Err(e).with_context(|| format!("无法解析 npy 文件: {}", path.display())),
    }
}

/// 读取 (帧数, 高, 宽, 通道) 的采样帧，灰度帧 (帧数, 高, 宽) 视为单通道
fn read_frames(path: &Path) -> anyhow::Result<Array4<u8>> {
    let file = File::open(path).with_context(|| format!("无法打开文件: {}", path.display()))?;
    match Array4::<u8>::read_npy(file) {
        Ok(a) => Ok(a),
        Err(ReadNpyError::WrongNdim(..)) => {
            let a: Array3<u8> = read_npy_file(path)?;
            Ok(a.insert_axis(Axis(3)))
        }
        Err(e) => Err(e).with_context(|| format!("无法解析 npy 文件: {}", path.display())),
    }
}
