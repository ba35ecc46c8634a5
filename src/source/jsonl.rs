use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use log::debug;
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::{EmbeddingSource, QualitySource};
use crate::index::EmbeddingRecord;
use crate::quality::VideoStats;

/// 每行一个 JSON 对象的文件
#[derive(Debug, Clone)]
pub struct JsonlSource {
    path: PathBuf,
}

impl JsonlSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl EmbeddingSource for JsonlSource {
    fn list(&self) -> anyhow::Result<Vec<EmbeddingRecord>> {
        read_jsonl(&self.path)
    }
}

impl QualitySource for JsonlSource {
    fn list(&self) -> anyhow::Result<Vec<VideoStats>> {
        read_jsonl(&self.path)
    }
}

/// 读取 JSONL 文件，忽略空行
pub fn read_jsonl<T: DeserializeOwned>(path: impl AsRef<Path>) -> anyhow::Result<Vec<T>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("无法打开文件: {}", path.display()))?;
    let mut items = vec![];
    for (i, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let item = serde_json::from_str(&line)
            .with_context(|| format!("{}:{} 解析失败", path.display(), i + 1))?;
        items.push(item);
    }
    debug!("从 {} 读取 {} 条记录", path.display(), items.len());
    Ok(items)
}

pub fn write_jsonl<'a, T: Serialize + 'a>(
    writer: impl Write,
    items: impl IntoIterator<Item = &'a T>,
) -> anyhow::Result<()> {
    let mut writer = BufWriter::new(writer);
    for item in items {
        serde_json::to_writer(&mut writer, item)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_write() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("emb.jsonl");
        let records =
            vec![EmbeddingRecord::new("a", vec![1.0, 2.0]), EmbeddingRecord::new("b", vec![0.5, 0.0])];
        write_jsonl(File::create(&path)?, &records)?;
        let source = JsonlSource::new(&path);
        assert_eq!(EmbeddingSource::list(&source)?, records);
        Ok(())
    }

    #[test]
    fn test_blank_lines_and_errors() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("emb.jsonl");
        std::fs::write(&path, "{\"video_id\":\"a\",\"vector\":[1]}\n\n")?;
        assert_eq!(read_jsonl::<EmbeddingRecord>(&path)?.len(), 1);

        std::fs::write(&path, "{\"video_id\":\"a\",\"vector\":[1]}\nnot json\n")?;
        let err = read_jsonl::<EmbeddingRecord>(&path).unwrap_err();
        assert!(err.to_string().contains(":2"));
        Ok(())
    }
}
