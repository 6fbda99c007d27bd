// 操作级事务覆盖层 / Per-action transactional overlay
//
// 所有写入先缓存在内存中, 读取优先命中缓存(read-your-writes),
// 提交时一次性写入 WriteBatch; 丢弃即回滚。
// Writes are buffered in memory and reads see them first; commit flushes a
// single WriteBatch, dropping the overlay rolls everything back.

use rocksdb::{DBIterator, Direction, IteratorMode, WriteBatch, DB};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::BTreeMap;

use super::errors::StorageError;

type Entry = (Vec<u8>, Vec<u8>);

pub struct LedgerTx<'a> {
    db: &'a DB,
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl<'a> LedgerTx<'a> {
    pub fn new(db: &'a DB) -> Self {
        Self {
            db,
            writes: BTreeMap::new(),
        }
    }

    /// 读取原始字节 / Read raw bytes
    pub fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        if let Some(pending) = self.writes.get(key.as_bytes()) {
            return Ok(pending.clone());
        }
        Ok(self.db.get(key.as_bytes())?)
    }

    /// 读取并反序列化 / Read and deserialize
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        match self.get_raw(key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn contains(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.get_raw(key)?.is_some())
    }

    /// 序列化写入 / Serialize and write
    pub fn put<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec(value)?;
        self.writes.insert(key.as_bytes().to_vec(), Some(bytes));
        Ok(())
    }

    pub fn delete(&mut self, key: &str) {
        self.writes.insert(key.as_bytes().to_vec(), None);
    }

    /// 按前缀有序扫描, 合并缓存与数据库, 最多返回 limit 条
    /// Ordered prefix scan merging overlay and store, at most `limit` entries
    pub fn scan_prefix(&self, prefix: &str, limit: usize) -> Result<Vec<Entry>, StorageError> {
        let prefix = prefix.as_bytes();
        let mut store = self
            .db
            .iterator(IteratorMode::From(prefix, Direction::Forward));
        let mut overlay = self
            .writes
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .peekable();

        let mut out = Vec::new();
        let mut store_next = next_in_prefix(&mut store, prefix)?;

        while out.len() < limit {
            let take_overlay = match (&store_next, overlay.peek()) {
                (None, None) => break,
                (Some(_), None) => false,
                (None, Some(_)) => true,
                (Some((store_key, _)), Some((overlay_key, _))) => {
                    overlay_key.as_slice() <= store_key.as_slice()
                }
            };

            if take_overlay {
                if let Some((key, value)) = overlay.next() {
                    // 缓存覆盖数据库中同名键 / Overlay shadows the same store key
                    if matches!(&store_next, Some((store_key, _)) if store_key == key) {
                        store_next = next_in_prefix(&mut store, prefix)?;
                    }
                    if let Some(value) = value {
                        out.push((key.clone(), value.clone()));
                    }
                }
            } else if let Some(entry) = store_next.take() {
                out.push(entry);
                store_next = next_in_prefix(&mut store, prefix)?;
            }
        }

        Ok(out)
    }

    /// 扫描并反序列化值 / Scan and deserialize values
    pub fn scan_values<T: DeserializeOwned>(
        &self,
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<T>, StorageError> {
        self.scan_prefix(prefix, limit)?
            .into_iter()
            .map(|(_, value)| Ok(serde_json::from_slice(&value)?))
            .collect()
    }

    /// 原子提交 / Atomic commit
    pub fn commit(self) -> Result<usize, StorageError> {
        let count = self.writes.len();
        if count == 0 {
            return Ok(0);
        }
        let mut batch = WriteBatch::default();
        for (key, value) in self.writes {
            match value {
                Some(value) => batch.put(&key, &value),
                None => batch.delete(&key),
            }
        }
        self.db.write(batch)?;
        Ok(count)
    }
}

fn next_in_prefix(
    iter: &mut DBIterator<'_>,
    prefix: &[u8],
) -> Result<Option<Entry>, StorageError> {
    match iter.next() {
        Some(Ok((key, value))) if key.starts_with(prefix) => Ok(Some((key.to_vec(), value.to_vec()))),
        Some(Err(e)) => Err(e.into()),
        _ => Ok(None),
    }
}
