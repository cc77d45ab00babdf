// Quota tracker - persisted daily upload counters
//
// One JSON object {date, long_videos, shorts} in a single file. Every read
// and read-modify-write runs under an exclusive advisory lock so two runs
// started by the scheduler at the same time cannot lose an update.
// Structurally invalid content is treated as absent and reset, never
// surfaced as a parse error.

use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use time::Date;

use super::errors::UploadError;
use super::models::{QuotaRecord, UploadKind};
use super::traits::QuotaStore;

pub struct QuotaFile {
    path: PathBuf,
}

impl QuotaFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn locked_file(&self) -> Result<File, UploadError> {
        let file = open_in_place(&self.path)?;
        file.lock_exclusive()?;
        Ok(file)
    }
}

impl QuotaStore for QuotaFile {
    /// Record for a given date. Absent or corrupt files are initialized
    /// with a zeroed record; a record from another day is returned zeroed
    /// without being persisted (persistence happens on `log_upload`).
    fn check_upload_limit(&self, today: Date) -> Result<QuotaRecord, UploadError> {
        let mut file = self.locked_file()?;

        match read_record(&mut file)? {
            Some(record) if record.date == today => Ok(record),
            Some(stale) => {
                tracing::info!(
                    target: "uploader::quota",
                    "quota record from {} is stale, counting from zero",
                    stale.date
                );
                Ok(QuotaRecord::fresh(today))
            }
            None => {
                let record = QuotaRecord::fresh(today);
                write_record(&mut file, &record)?;
                Ok(record)
            }
        }
    }

    /// Increment the counter for `kind` and persist the full record.
    /// Re-reads under the same lock, so a concurrent increment from another
    /// process is never overwritten.
    fn log_upload(&self, kind: UploadKind, today: Date) -> Result<QuotaRecord, UploadError> {
        let mut file = self.locked_file()?;

        let mut record = match read_record(&mut file)? {
            Some(record) if record.date == today => record,
            _ => QuotaRecord::fresh(today),
        };
        record.increment(kind);
        write_record(&mut file, &record)?;

        tracing::info!(
            target: "uploader::quota",
            "logged {} upload, today's counts: long_videos={} shorts={}",
            kind.as_str(),
            record.long_videos,
            record.shorts
        );
        Ok(record)
    }
}

/// Run-level advisory lock, one lock file per upload category next to the
/// quota file. Held from the cap check until the quota is logged, so two
/// overlapping runs of the same category cannot both observe a free slot.
/// The lock releases when the guard drops.
pub struct UploadSlot {
    _file: File,
}

impl UploadSlot {
    pub async fn acquire(quota_path: &Path, kind: UploadKind) -> Result<Self, UploadError> {
        let path = quota_path.with_file_name(format!("{}.lock", kind.as_str()));
        let file = open_in_place(&path)?;

        loop {
            match file.try_lock_exclusive() {
                Ok(()) => return Ok(Self { _file: file }),
                Err(e)
                    if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() =>
                {
                    tracing::debug!(
                        target: "uploader::quota",
                        "another {} run holds the slot, waiting",
                        kind.as_str()
                    );
                    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

fn open_in_place(path: &Path) -> Result<File, UploadError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .open(path)?;
    Ok(file)
}

fn read_record(file: &mut File) -> Result<Option<QuotaRecord>, UploadError> {
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    if contents.trim().is_empty() {
        return Ok(None);
    }
    match serde_json::from_str(&contents) {
        Ok(record) => Ok(Some(record)),
        Err(e) => {
            tracing::warn!(
                target: "uploader::quota",
                "quota file is corrupt ({}), resetting",
                e
            );
            Ok(None)
        }
    }
}

fn write_record(file: &mut File, record: &QuotaRecord) -> Result<(), UploadError> {
    let json = serde_json::to_string(record)
        .map_err(|e| UploadError::Io(format!("failed to encode quota record: {}", e)))?;
    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    file.write_all(json.as_bytes())?;
    file.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    const TODAY: Date = date!(2026 - 08 - 30);
    const YESTERDAY: Date = date!(2026 - 08 - 29);

    fn quota_in(dir: &tempfile::TempDir) -> QuotaFile {
        QuotaFile::new(dir.path().join("upload_log.json"))
    }

    #[test]
    fn test_absent_file_initializes_zeroed_record() {
        let dir = tempfile::tempdir().unwrap();
        let quota = quota_in(&dir);

        let record = quota.check_upload_limit(TODAY).unwrap();
        assert_eq!(record, QuotaRecord::fresh(TODAY));

        // First check persists the fresh record
        let on_disk = std::fs::read_to_string(dir.path().join("upload_log.json")).unwrap();
        let parsed: QuotaRecord = serde_json::from_str(&on_disk).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_stale_date_rolls_over_without_persisting() {
        let dir = tempfile::tempdir().unwrap();
        let quota = quota_in(&dir);
        quota.log_upload(UploadKind::LongVideo, YESTERDAY).unwrap();
        quota.log_upload(UploadKind::Shorts, YESTERDAY).unwrap();

        let record = quota.check_upload_limit(TODAY).unwrap();
        assert_eq!(record, QuotaRecord::fresh(TODAY));

        // The stale record stays on disk until the next log_upload
        let on_disk = std::fs::read_to_string(dir.path().join("upload_log.json")).unwrap();
        let parsed: QuotaRecord = serde_json::from_str(&on_disk).unwrap();
        assert_eq!(parsed.date, YESTERDAY);
        assert_eq!(parsed.long_videos, 1);
        assert_eq!(parsed.shorts, 1);
    }

    #[test]
    fn test_log_upload_increments_only_requested_kind() {
        let dir = tempfile::tempdir().unwrap();
        let quota = quota_in(&dir);
        quota.check_upload_limit(TODAY).unwrap();

        let record = quota.log_upload(UploadKind::Shorts, TODAY).unwrap();
        assert_eq!(record.shorts, 1);
        assert_eq!(record.long_videos, 0);

        let record = quota.log_upload(UploadKind::LongVideo, TODAY).unwrap();
        assert_eq!(record.shorts, 1);
        assert_eq!(record.long_videos, 1);
    }

    #[test]
    fn test_log_upload_applies_rollover_before_increment() {
        let dir = tempfile::tempdir().unwrap();
        let quota = quota_in(&dir);
        quota.log_upload(UploadKind::LongVideo, YESTERDAY).unwrap();

        let record = quota.log_upload(UploadKind::LongVideo, TODAY).unwrap();
        assert_eq!(record.date, TODAY);
        assert_eq!(record.long_videos, 1);
        assert_eq!(record.shorts, 0);
    }

    #[test]
    fn test_corrupt_file_resets_to_fresh_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upload_log.json");
        std::fs::write(&path, "{not json at all").unwrap();

        let quota = QuotaFile::new(path.clone());
        let record = quota.check_upload_limit(TODAY).unwrap();
        assert_eq!(record, QuotaRecord::fresh(TODAY));

        let on_disk = std::fs::read_to_string(&path).unwrap();
        let parsed: QuotaRecord = serde_json::from_str(&on_disk).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_same_day_write_then_read_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let quota = quota_in(&dir);

        let written = quota.log_upload(UploadKind::Shorts, TODAY).unwrap();
        let read = quota.check_upload_limit(TODAY).unwrap();
        assert_eq!(written, read);
    }

    #[test]
    fn test_missing_parent_directory_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let quota = QuotaFile::new(dir.path().join("nested/state/upload_log.json"));
        assert!(quota.check_upload_limit(TODAY).is_ok());
    }

    #[tokio::test]
    async fn test_slot_is_exclusive_per_kind_until_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let quota_path = dir.path().join("upload_log.json");

        let held = UploadSlot::acquire(&quota_path, UploadKind::LongVideo)
            .await
            .unwrap();

        // The other category is independent
        let shorts = UploadSlot::acquire(&quota_path, UploadKind::Shorts).await;
        assert!(shorts.is_ok());

        // Same-kind acquisition waits until the holder drops
        let contender = tokio::spawn({
            let quota_path = quota_path.clone();
            async move { UploadSlot::acquire(&quota_path, UploadKind::LongVideo).await }
        });
        tokio::time::sleep(std::time::Duration::from_millis(120)).await;
        assert!(!contender.is_finished());

        drop(held);
        let reacquired = contender.await.unwrap();
        assert!(reacquired.is_ok());
    }
}
