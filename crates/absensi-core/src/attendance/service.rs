use std::sync::Arc;

use chrono::{NaiveDate, SecondsFormat};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::lifecycle::{self, AttendanceSession};
use super::monthly::{aggregate, MonthlyGrid};
use crate::access::{authorize, Action};
use crate::cache::kinds::{monthly_key, MonthlyCache, SheetCache};
use crate::cache::{CacheManager, Mutation};
use crate::error::{Error, PolicyError, Result};
use crate::models::{
    Actor, AttendanceSheet, AttendanceStatus, SchoolClass, SchoolSettings, YearMonth,
};
use crate::report::DailyReport;
use crate::roster::RosterService;
use crate::store::{collections, decode_all, fields, to_fields, DocumentStore, Filter, Write};

/// Fields written only by lock and unlock.
const LOCK_FIELDS: [&str; 2] = ["is_locked", "locked_at"];

/// IO around the attendance lifecycle.
///
/// Every method takes the current session by reference and returns the next
/// one. On any error the caller's session, the local draft and the cache are
/// exactly as they were.
pub struct AttendanceService<S> {
    store: Arc<S>,
    cache: CacheManager,
    roster: RosterService<S>,
}

impl<S> Clone for AttendanceService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            cache: self.cache.clone(),
            roster: self.roster.clone(),
        }
    }
}

impl<S: DocumentStore> AttendanceService<S> {
    pub fn new(store: Arc<S>, cache: CacheManager) -> Self {
        let roster = RosterService::new(Arc::clone(&store), cache.clone());
        Self { store, cache, roster }
    }

    /// Open the sheet for a class on a date.
    ///
    /// Sources, first match wins: the local draft (unless the stored sheet
    /// has been locked since), the cached sheet (never when locked), the
    /// remote store, and finally a new sheet seeded from the active roster.
    pub async fn open(&self, actor: &Actor, date: NaiveDate, class_id: &str) -> Result<AttendanceSession> {
        authorize(actor, Action::ViewAttendance)?;
        let class_id = SchoolClass::normalize_id(class_id);
        let id = AttendanceSheet::id_for(date, &class_id);

        if let Some(draft) = self.cache.load_draft() {
            if draft.doc_id() == id {
                return self.resume(draft).await;
            }
        }

        if let Some(cached) = self.cache.get::<SheetCache>(&id) {
            if !cached.is_locked {
                return Ok(lifecycle::loaded(cached));
            }
        }

        if let Some(doc) = self.store.get(collections::SHEETS, &id).await? {
            let sheet: AttendanceSheet = doc.decode()?;
            debug!(sheet = %id, locked = sheet.is_locked, "Sheet loaded from store");
            self.cache.set::<SheetCache>(&id, &sheet);
            return Ok(lifecycle::loaded(sheet));
        }

        let roster = self.roster.active_roster(&class_id, false).await?;
        if roster.is_empty() {
            return Err(PolicyError::EmptyRoster(class_id).into());
        }
        let sheet = AttendanceSheet::seed(date, &class_id, &roster);
        self.cache.save_draft(&sheet);
        info!(sheet = %id, students = roster.len(), "New sheet seeded from roster");
        Ok(lifecycle::seeded(sheet))
    }

    /// A draft whose sheet was locked elsewhere is stale and gets dropped.
    /// When the store cannot be reached the draft is resumed as is.
    async fn resume(&self, draft: AttendanceSheet) -> Result<AttendanceSession> {
        let id = draft.doc_id();
        match self.store.get(collections::SHEETS, &id).await {
            Ok(Some(doc)) => {
                let remote: AttendanceSheet = doc.decode()?;
                if remote.is_locked {
                    warn!(sheet = %id, "Sheet was locked, dropping local draft");
                    self.cache.clear_draft();
                    self.cache.set::<SheetCache>(&id, &remote);
                    return Ok(lifecycle::loaded(remote));
                }
            }
            Ok(None) => {}
            Err(e) => warn!(sheet = %id, error = %e, "Lock state unknown, resuming draft offline"),
        }
        debug!(sheet = %id, "Resuming local draft");
        Ok(lifecycle::resumed(draft))
    }

    pub fn set_status(
        &self,
        actor: &Actor,
        session: &AttendanceSession,
        student_id: &str,
        status: AttendanceStatus,
        note: Option<&str>,
    ) -> Result<AttendanceSession> {
        authorize(actor, Action::EditAttendance)?;
        let next = lifecycle::apply_status(session.clone(), student_id, status, note)?;
        if next != *session {
            if let Some(sheet) = &next.sheet {
                self.cache.save_draft(sheet);
            }
        }
        Ok(next)
    }

    pub async fn save(&self, actor: &Actor, session: &AttendanceSession) -> Result<AttendanceSession> {
        authorize(actor, Action::SaveAttendance)?;
        let sheet = lifecycle::prepare_save(session, self.cache.now())?;
        let id = sheet.doc_id();
        let exists = match self.store.get(collections::SHEETS, &id).await? {
            Some(doc) => {
                let remote: AttendanceSheet = doc.decode()?;
                if remote.is_locked {
                    return Err(PolicyError::SheetLocked(id).into());
                }
                true
            }
            None => false,
        };

        // Once stored, the lock fields belong to lock and unlock
        let mut content = to_fields(&id, &sheet)?;
        if exists {
            for field in LOCK_FIELDS {
                content.remove(field);
            }
        }
        self.store
            .commit(vec![Write::Set {
                collection: collections::SHEETS.to_string(),
                id: id.clone(),
                fields: content,
                merge: true,
            }])
            .await?;

        self.cache.set::<SheetCache>(&id, &sheet);
        self.cache.clear_draft_for(&id);
        self.cache.invalidate(&Mutation::SheetSaved {
            date: sheet.date,
            class_id: sheet.class_id.clone(),
        });
        info!(sheet = %id, "Sheet saved");
        Ok(lifecycle::committed(sheet))
    }

    pub async fn lock(&self, actor: &Actor, session: &AttendanceSession) -> Result<AttendanceSession> {
        authorize(actor, Action::LockAttendance)?;
        let sheet = lifecycle::check_lock(session)?;
        let (id, date, class_id) = (sheet.doc_id(), sheet.date, sheet.class_id.clone());
        let now = self.cache.now();

        self.store
            .commit(vec![Write::update(
                collections::SHEETS,
                &id,
                fields([
                    ("is_locked", Value::Bool(true)),
                    (
                        "locked_at",
                        Value::String(now.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
                    ),
                ]),
            )])
            .await?;

        self.cache.clear_draft_for(&id);
        self.cache.invalidate(&Mutation::SheetLocked { date, class_id });
        info!(sheet = %id, "Sheet locked");
        Ok(lifecycle::locked(session.clone(), now))
    }

    pub async fn unlock(&self, actor: &Actor, session: &AttendanceSession) -> Result<AttendanceSession> {
        authorize(actor, Action::UnlockAttendance)?;
        let sheet = lifecycle::check_unlock(session)?;
        let (id, date, class_id) = (sheet.doc_id(), sheet.date, sheet.class_id.clone());

        self.store
            .commit(vec![Write::update(
                collections::SHEETS,
                &id,
                fields([("is_locked", Value::Bool(false))]),
            )])
            .await?;

        self.cache.invalidate(&Mutation::SheetUnlocked { date, class_id });
        info!(sheet = %id, unlocked_by = %actor.uid, "Sheet unlocked");
        Ok(lifecycle::unlocked(session.clone()))
    }

    pub fn daily_report(
        &self,
        actor: &Actor,
        session: &AttendanceSession,
        settings: &SchoolSettings,
    ) -> Result<DailyReport> {
        authorize(actor, Action::ExportReport)?;
        let sheet = lifecycle::check_export(session)?;
        Ok(DailyReport::new(sheet, settings))
    }

    pub fn discard_draft(&self) {
        self.cache.clear_draft();
    }

    /// Every saved sheet of a class within a month.
    pub async fn fetch_month(
        &self,
        class_id: &str,
        month: YearMonth,
        force_refresh: bool,
    ) -> Result<Vec<AttendanceSheet>> {
        let key = monthly_key(class_id, &month);
        self.cache
            .read_through::<MonthlyCache, _, _, Error>(&key, force_refresh, || async {
                let docs = self
                    .store
                    .query(
                        collections::SHEETS,
                        &[
                            Filter::eq("kelas", class_id),
                            Filter::gte("tanggal", month.first().to_string()),
                            Filter::lte("tanggal", month.last().to_string()),
                        ],
                        None,
                    )
                    .await?;
                let mut sheets: Vec<AttendanceSheet> = decode_all(&docs)?;
                sheets.sort_by_key(|s| s.date);
                Ok(sheets)
            })
            .await
    }

    pub async fn monthly_report(
        &self,
        actor: &Actor,
        class_id: &str,
        month: YearMonth,
        force_refresh: bool,
    ) -> Result<MonthlyGrid> {
        authorize(actor, Action::ExportReport)?;
        let class_id = SchoolClass::normalize_id(class_id);
        let (roster, sheets) = futures::join!(
            self.roster.active_roster(&class_id, force_refresh),
            self.fetch_month(&class_id, month, force_refresh)
        );
        Ok(aggregate(&class_id, &roster?, &sheets?, month))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attendance::lifecycle::SheetState;
    use crate::cache::kinds::ClassRoster;
    use crate::cache::MemoryStorage;
    use crate::models::Role;
    use crate::store::{Fields, MemoryStore, StoreError};
    use serde_json::json;

    fn doc(v: Value) -> Fields {
        v.as_object().cloned().unwrap()
    }

    fn guru() -> Actor {
        Actor::new("guru", Role::Guru, true)
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn setup() -> (AttendanceService<MemoryStore>, Arc<MemoryStore>, CacheManager) {
        let store = Arc::new(MemoryStore::new());
        store.seed("kelas", "XA", doc(json!({ "nama_kelas": "XA", "khusus": false })));
        store.seed("kelas", "XB", doc(json!({ "nama_kelas": "XB", "khusus": false })));
        store.seed(
            "siswa",
            "S1",
            doc(json!({ "nama_siswa": "Ana", "nis": "1001", "id_kelas": "XA", "status_aktif": "Aktif" })),
        );
        store.seed(
            "siswa",
            "S2",
            doc(json!({ "nama_siswa": "Budi", "nis": "1002", "id_kelas": "XA", "status_aktif": "Aktif" })),
        );
        let cache = CacheManager::new(Arc::new(MemoryStorage::new()));
        (AttendanceService::new(store.clone(), cache.clone()), store, cache)
    }

    fn policy(err: Error) -> PolicyError {
        err.policy().cloned().expect("expected a policy error")
    }

    #[tokio::test]
    async fn test_open_seeds_and_persists_draft() {
        let (svc, _, cache) = setup();
        let session = svc.open(&guru(), date(1), "xa").await.unwrap();
        assert_eq!(session.state(), SheetState::Draft);
        let sheet = session.sheet.as_ref().unwrap();
        assert_eq!(sheet.doc_id(), "2024-03-01_XA");
        assert_eq!(sheet.students.len(), 2);
        assert_eq!(cache.load_draft().as_ref(), Some(sheet));
    }

    #[tokio::test]
    async fn test_open_rejects_empty_roster() {
        let (svc, _, cache) = setup();
        let err = svc.open(&guru(), date(1), "XB").await.unwrap_err();
        assert_eq!(policy(err), PolicyError::EmptyRoster("XB".into()));
        assert!(cache.load_draft().is_none());
    }

    #[tokio::test]
    async fn test_edits_survive_a_restart_through_the_draft() {
        let (svc, _, _) = setup();
        let session = svc.open(&guru(), date(1), "XA").await.unwrap();
        let session = svc
            .set_status(&guru(), &session, "S1", AttendanceStatus::Izin, Some("Lomba"))
            .unwrap();

        let reopened = svc.open(&guru(), date(1), "XA").await.unwrap();
        assert_eq!(reopened, session);
    }

    #[tokio::test]
    async fn test_save_lock_and_reject_further_edits() {
        let (svc, store, cache) = setup();
        let actor = guru();
        let session = svc.open(&actor, date(1), "XA").await.unwrap();
        let session = svc
            .set_status(&actor, &session, "S1", AttendanceStatus::Sakit, Some("Demam"))
            .unwrap();
        let session = svc.save(&actor, &session).await.unwrap();
        assert_eq!(session.state(), SheetState::Saved);
        assert!(cache.load_draft().is_none());

        let session = svc.lock(&actor, &session).await.unwrap();
        assert_eq!(session.state(), SheetState::Locked);

        let stored = store.raw("rekap_absensi", "2024-03-01_XA").unwrap();
        assert_eq!(stored["is_locked"], json!(true));
        assert_eq!(
            stored["siswa"]["S1"],
            json!({ "nama": "Ana", "nis": "1001", "status": "Sakit", "keterangan": "Demam" })
        );
        assert_eq!(stored["siswa"]["S2"]["status"], json!("Hadir"));
        assert_eq!(stored["siswa"]["S2"]["keterangan"], json!("-"));

        let err = svc
            .set_status(&actor, &session, "S2", AttendanceStatus::Alpa, None)
            .unwrap_err();
        assert_eq!(policy(err), PolicyError::SheetLocked("2024-03-01_XA".into()));
    }

    #[tokio::test]
    async fn test_round_trip_through_the_store() {
        let (svc, store, _) = setup();
        let session = svc.open(&guru(), date(4), "XA").await.unwrap();
        svc.save(&guru(), &session).await.unwrap();

        // Fresh device: no draft, empty cache
        let other = AttendanceService::new(store.clone(), CacheManager::new(Arc::new(MemoryStorage::new())));
        let loaded = other.open(&guru(), date(4), "XA").await.unwrap();
        assert_eq!(loaded.state(), SheetState::Saved);
        let sheet = loaded.sheet.unwrap();
        assert_eq!(sheet.students.len(), 2);
        assert!(sheet
            .students
            .values()
            .all(|e| e.status == AttendanceStatus::Hadir && e.note == "-"));
        assert!(sheet.created_at.is_some());
    }

    #[tokio::test]
    async fn test_lock_requires_save_first() {
        let (svc, store, _) = setup();
        let session = svc.open(&guru(), date(1), "XA").await.unwrap();
        let before = store.commit_count();
        let err = svc.lock(&guru(), &session).await.unwrap_err();
        assert_eq!(policy(err), PolicyError::UnsavedChanges);
        assert_eq!(store.commit_count(), before);
    }

    #[tokio::test]
    async fn test_failed_save_keeps_draft_and_session() {
        let (svc, store, cache) = setup();
        let session = svc.open(&guru(), date(1), "XA").await.unwrap();
        let session = svc
            .set_status(&guru(), &session, "S2", AttendanceStatus::Alpa, None)
            .unwrap();

        store.set_offline(true);
        let err = svc.save(&guru(), &session).await.unwrap_err();
        assert!(matches!(err, Error::Store(StoreError::Unavailable(_))));
        assert_eq!(cache.load_draft(), session.sheet);
        assert_eq!(session.state(), SheetState::Draft);
    }

    #[tokio::test]
    async fn test_locked_sheet_is_reloaded_from_the_store() {
        let (svc, store, _) = setup();
        let session = svc.open(&guru(), date(1), "XA").await.unwrap();
        let session = svc.save(&guru(), &session).await.unwrap();
        svc.lock(&guru(), &session).await.unwrap();

        let reopened = svc.open(&guru(), date(1), "XA").await.unwrap();
        assert_eq!(reopened.state(), SheetState::Locked);

        // Unlocked elsewhere: a locked copy must not shadow the store
        store.seed("rekap_absensi", "2024-03-01_XA", {
            let mut fields = store.raw("rekap_absensi", "2024-03-01_XA").unwrap();
            fields.insert("is_locked".into(), json!(false));
            fields
        });
        let again = svc.open(&guru(), date(1), "XA").await.unwrap();
        assert_eq!(again.state(), SheetState::Saved);
    }

    fn seed_stored_sheet(store: &MemoryStore, day: u32, locked: bool) {
        store.seed(
            "rekap_absensi",
            &format!("2024-03-{:02}_XA", day),
            doc(json!({
                "tanggal": format!("2024-03-{:02}", day),
                "kelas": "XA",
                "siswa": {
                    "S1": { "nama": "Ana", "nis": "1001", "status": "Hadir", "keterangan": "-" },
                    "S2": { "nama": "Budi", "nis": "1002", "status": "Hadir", "keterangan": "-" }
                },
                "is_locked": locked
            })),
        );
    }

    #[tokio::test]
    async fn test_stale_draft_cannot_unlock_a_locked_sheet() {
        let (svc, store, cache) = setup();
        let admin = Actor::new("admin", Role::Admin, true);
        let admin_svc =
            AttendanceService::new(store.clone(), CacheManager::new(Arc::new(MemoryStorage::new())));

        let stale = svc.open(&guru(), date(1), "XA").await.unwrap();
        let stale = svc
            .set_status(&guru(), &stale, "S1", AttendanceStatus::Alpa, None)
            .unwrap();

        let session = admin_svc.open(&admin, date(1), "XA").await.unwrap();
        let session = admin_svc.save(&admin, &session).await.unwrap();
        admin_svc.lock(&admin, &session).await.unwrap();

        // Reopening drops the draft in favour of the locked sheet
        let reopened = svc.open(&guru(), date(1), "XA").await.unwrap();
        assert_eq!(reopened.state(), SheetState::Locked);
        assert!(cache.load_draft().is_none());
        let err = svc.save(&guru(), &reopened).await.unwrap_err();
        assert_eq!(policy(err), PolicyError::SheetLocked("2024-03-01_XA".into()));

        // A session held from before the lock still cannot clear it
        let before = store.commit_count();
        let err = svc.save(&guru(), &stale).await.unwrap_err();
        assert_eq!(policy(err), PolicyError::SheetLocked("2024-03-01_XA".into()));
        assert_eq!(store.commit_count(), before);
        let stored = store.raw("rekap_absensi", "2024-03-01_XA").unwrap();
        assert_eq!(stored["is_locked"], json!(true));
        assert!(stored.contains_key("locked_at"));
        assert_eq!(stored["siswa"]["S1"]["status"], json!("Hadir"));
    }

    #[tokio::test]
    async fn test_resave_leaves_lock_fields_alone() {
        let (svc, store, _) = setup();
        let admin = Actor::new("admin", Role::Admin, true);
        let session = svc.open(&guru(), date(1), "XA").await.unwrap();
        let session = svc.save(&guru(), &session).await.unwrap();
        let stored = store.raw("rekap_absensi", "2024-03-01_XA").unwrap();
        assert_eq!(stored["is_locked"], json!(false));

        let session = svc.lock(&guru(), &session).await.unwrap();
        let session = svc.unlock(&admin, &session).await.unwrap();
        let locked_at = store.raw("rekap_absensi", "2024-03-01_XA").unwrap()["locked_at"].clone();

        let session = svc
            .set_status(&guru(), &session, "S2", AttendanceStatus::Sakit, None)
            .unwrap();
        svc.save(&guru(), &session).await.unwrap();
        let stored = store.raw("rekap_absensi", "2024-03-01_XA").unwrap();
        assert_eq!(stored["is_locked"], json!(false));
        assert_eq!(stored["locked_at"], locked_at);
        assert_eq!(stored["siswa"]["S2"]["status"], json!("Sakit"));
    }

    #[tokio::test]
    async fn test_offline_open_still_resumes_draft() {
        let (svc, store, _) = setup();
        let session = svc.open(&guru(), date(1), "XA").await.unwrap();
        let session = svc
            .set_status(&guru(), &session, "S2", AttendanceStatus::Izin, None)
            .unwrap();

        store.set_offline(true);
        let reopened = svc.open(&guru(), date(1), "XA").await.unwrap();
        assert_eq!(reopened, session);
    }

    #[tokio::test]
    async fn test_saving_or_locking_another_sheet_keeps_the_draft() {
        let (svc, store, cache) = setup();
        seed_stored_sheet(&store, 2, false);
        svc.open(&guru(), date(1), "XA").await.unwrap();

        let other = svc.open(&guru(), date(2), "XA").await.unwrap();
        assert_eq!(other.state(), SheetState::Saved);
        let other = svc.save(&guru(), &other).await.unwrap();
        assert_eq!(cache.load_draft().map(|d| d.doc_id()).as_deref(), Some("2024-03-01_XA"));

        svc.lock(&guru(), &other).await.unwrap();
        assert_eq!(cache.load_draft().map(|d| d.doc_id()).as_deref(), Some("2024-03-01_XA"));
    }

    #[tokio::test]
    async fn test_rejected_edit_on_locked_session_changes_nothing() {
        let (svc, store, cache) = setup();
        seed_stored_sheet(&store, 2, false);
        svc.open(&guru(), date(1), "XA").await.unwrap();
        let session = svc.open(&guru(), date(2), "XA").await.unwrap();
        let session = svc.lock(&guru(), &session).await.unwrap();

        let draft_before = cache.load_draft();
        let session_before = session.clone();
        let err = svc
            .set_status(&guru(), &session, "S1", AttendanceStatus::Sakit, Some("Flu"))
            .unwrap_err();
        assert_eq!(policy(err), PolicyError::SheetLocked("2024-03-02_XA".into()));
        assert_eq!(session, session_before);
        assert_eq!(cache.load_draft(), draft_before);
        assert!(draft_before.is_some());
    }

    #[tokio::test]
    async fn test_rejected_edit_on_sheet_locked_in_store_changes_nothing() {
        let (svc, store, cache) = setup();
        seed_stored_sheet(&store, 3, true);
        svc.open(&guru(), date(1), "XA").await.unwrap();

        let session = svc.open(&guru(), date(3), "XA").await.unwrap();
        assert_eq!(session.state(), SheetState::Locked);
        let draft_before = cache.load_draft();
        let session_before = session.clone();
        let before = store.commit_count();

        let err = svc
            .set_status(&guru(), &session, "S2", AttendanceStatus::Alpa, None)
            .unwrap_err();
        assert_eq!(policy(err), PolicyError::SheetLocked("2024-03-03_XA".into()));
        assert_eq!(session, session_before);
        assert_eq!(cache.load_draft(), draft_before);
        assert_eq!(store.commit_count(), before);
    }

    #[tokio::test]
    async fn test_only_admins_unlock() {
        let (svc, _, _) = setup();
        let session = svc.open(&guru(), date(1), "XA").await.unwrap();
        let session = svc.save(&guru(), &session).await.unwrap();
        let session = svc.lock(&guru(), &session).await.unwrap();

        let err = svc.unlock(&guru(), &session).await.unwrap_err();
        assert!(matches!(policy(err), PolicyError::NotPermitted { .. }));

        let admin = Actor::new("admin", Role::Admin, true);
        let session = svc.unlock(&admin, &session).await.unwrap();
        assert_eq!(session.state(), SheetState::Saved);
        assert!(svc
            .set_status(&guru(), &session, "S1", AttendanceStatus::Hadir, None)
            .is_ok());
    }

    #[tokio::test]
    async fn test_viewer_cannot_edit() {
        let (svc, _, _) = setup();
        let session = svc.open(&guru(), date(1), "XA").await.unwrap();
        let viewer = Actor::new("v", Role::Viewer, true);
        let err = svc
            .set_status(&viewer, &session, "S1", AttendanceStatus::Alpa, None)
            .unwrap_err();
        assert!(matches!(policy(err), PolicyError::NotPermitted { .. }));
    }

    #[tokio::test]
    async fn test_daily_report_requires_lock() {
        let (svc, _, _) = setup();
        let session = svc.open(&guru(), date(1), "XA").await.unwrap();
        let session = svc.save(&guru(), &session).await.unwrap();
        let err = svc
            .daily_report(&guru(), &session, &SchoolSettings::default())
            .unwrap_err();
        assert_eq!(policy(err), PolicyError::ExportRequiresLock);

        let session = svc.lock(&guru(), &session).await.unwrap();
        let report = svc
            .daily_report(&guru(), &session, &SchoolSettings::default())
            .unwrap();
        assert_eq!(report.counts.hadir, 2);
    }

    #[tokio::test]
    async fn test_monthly_report_sees_new_saves() {
        let (svc, _, cache) = setup();
        let actor = guru();
        let month: YearMonth = "2024-03".parse().unwrap();

        let empty = svc.monthly_report(&actor, "XA", month, false).await.unwrap();
        assert_eq!(empty.rows.len(), 2);
        assert!(empty.rows.iter().all(|r| r.totals.total() == 0));

        let session = svc.open(&actor, date(2), "XA").await.unwrap();
        let session = svc
            .set_status(&actor, &session, "S2", AttendanceStatus::Alpa, Some("Tanpa kabar"))
            .unwrap();
        svc.save(&actor, &session).await.unwrap();

        let grid = svc.monthly_report(&actor, "XA", month, false).await.unwrap();
        assert_eq!(grid.days, 31);
        let budi = grid.rows.iter().find(|r| r.name == "Budi").unwrap();
        assert_eq!(budi.cells[1], "A");
        assert_eq!(budi.totals.alpa, 1);
        assert_eq!(budi.notes, vec!["Tgl 2:Alpa(Tanpa kabar)"]);
        assert!(cache.get::<ClassRoster>("XA").is_some());
    }
}
