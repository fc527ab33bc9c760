//! Roster administration: classes, students and special-class memberships.

use std::collections::{BTreeSet, HashSet};
use std::io::Read;
use std::sync::Arc;

use futures::future::try_join_all;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::access::{authorize, Action};
use crate::cache::kinds::{ClassList, ClassRoster, NisCheck, ALL};
use crate::cache::{CacheManager, Mutation};
use crate::error::{Error, PolicyError, Result};
use crate::models::roster::{ACTIVE, INACTIVE};
use crate::models::{
    sort_roster, Actor, ClassMembership, NewStudent, RosterMember, SchoolClass, Student,
    StudentPatch,
};
use crate::store::{collections, decode_all, fields, DocumentStore, Filter, StoreError, Write};

pub struct RosterService<S> {
    store: Arc<S>,
    cache: CacheManager,
}

impl<S> Clone for RosterService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            cache: self.cache.clone(),
        }
    }
}

impl<S: DocumentStore> RosterService<S> {
    pub fn new(store: Arc<S>, cache: CacheManager) -> Self {
        Self { store, cache }
    }

    // ===== Classes =====

    pub async fn list_classes(&self, force_refresh: bool) -> Result<Vec<SchoolClass>> {
        self.cache
            .read_through::<ClassList, _, _, Error>(ALL, force_refresh, || async {
                let docs = self.store.list(collections::CLASSES).await?;
                let mut classes: Vec<SchoolClass> = decode_all(&docs)?;
                classes.sort_by(|a, b| a.id.cmp(&b.id));
                Ok(classes)
            })
            .await
    }

    async fn find_class(&self, class_id: &str) -> Result<Option<SchoolClass>> {
        let doc = self.store.get(collections::CLASSES, class_id).await?;
        Ok(doc.map(|d| d.decode()).transpose()?)
    }

    async fn require_class(&self, class_id: &str) -> Result<SchoolClass> {
        self.find_class(class_id)
            .await?
            .ok_or_else(|| PolicyError::ClassNotFound(class_id.to_string()).into())
    }

    pub async fn create_class(&self, actor: &Actor, raw_id: &str, special: bool) -> Result<SchoolClass> {
        authorize(actor, Action::ManageClasses)?;
        let id = SchoolClass::normalize_id(raw_id);
        if id.is_empty() {
            return Err(PolicyError::InvalidInput("Class id must not be empty".to_string()).into());
        }
        if id.chars().all(|c| c == '.') {
            return Err(PolicyError::InvalidInput(format!("Invalid class id: {}", id)).into());
        }
        if self.find_class(&id).await?.is_some() {
            return Err(PolicyError::DuplicateClass(id).into());
        }

        let class = SchoolClass {
            id: id.clone(),
            name: id.clone(),
            special,
        };
        self.store
            .commit(vec![Write::set(collections::CLASSES, &id, &class, false)?])
            .await?;
        self.cache.invalidate(&Mutation::ClassCreated);
        info!(class = %id, special, "Class created");
        Ok(class)
    }

    /// Delete a class together with its membership documents.
    pub async fn delete_class(&self, actor: &Actor, class_id: &str) -> Result<()> {
        authorize(actor, Action::ManageClasses)?;
        self.require_class(class_id).await?;

        let members = self
            .store
            .query(collections::MEMBERSHIPS, &[Filter::eq("id_kelas", class_id)], None)
            .await?;
        let mut writes = vec![Write::delete(collections::CLASSES, class_id)];
        writes.extend(
            members
                .iter()
                .map(|m| Write::delete(collections::MEMBERSHIPS, &m.id)),
        );
        self.store.commit(writes).await?;

        self.cache.invalidate(&Mutation::ClassDeleted {
            class_id: class_id.to_string(),
        });
        info!(class = %class_id, memberships = members.len(), "Class deleted");
        Ok(())
    }

    // ===== Students =====

    /// Every student of a class, active or not, sorted by name. Never cached.
    pub async fn students_by_class(&self, class_id: &str) -> Result<Vec<Student>> {
        let docs = self
            .store
            .query(collections::STUDENTS, &[Filter::eq("id_kelas", class_id)], None)
            .await?;
        let mut students: Vec<Student> = decode_all(&docs)?;
        students.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(students)
    }

    /// Active students of a class, as used to seed attendance sheets.
    ///
    /// Special classes have no students of their own; their roster is the set
    /// of active students listed in the membership collection.
    pub async fn active_roster(&self, class_id: &str, force_refresh: bool) -> Result<Vec<RosterMember>> {
        self.cache
            .read_through::<ClassRoster, _, _, Error>(class_id, force_refresh, || async {
                let special = self
                    .find_class(class_id)
                    .await?
                    .map(|c| c.special)
                    .unwrap_or(false);
                let students = if special {
                    self.special_class_students(class_id).await?
                } else {
                    let docs = self
                        .store
                        .query(
                            collections::STUDENTS,
                            &[
                                Filter::eq("id_kelas", class_id),
                                Filter::eq("status_aktif", ACTIVE),
                            ],
                            None,
                        )
                        .await?;
                    decode_all::<Student>(&docs)?
                };

                let mut roster: Vec<RosterMember> = students
                    .iter()
                    .filter(|s| s.is_active())
                    .map(RosterMember::from)
                    .collect();
                sort_roster(&mut roster);
                debug!(class = %class_id, special, size = roster.len(), "Roster fetched");
                Ok(roster)
            })
            .await
    }

    async fn special_class_students(&self, class_id: &str) -> Result<Vec<Student>> {
        let docs = self
            .store
            .query(collections::MEMBERSHIPS, &[Filter::eq("id_kelas", class_id)], None)
            .await?;
        let memberships: Vec<ClassMembership> = decode_all(&docs)?;

        let fetches = memberships
            .iter()
            .map(|m| self.store.get(collections::STUDENTS, &m.student_id));
        let found = try_join_all(fetches).await?;
        Ok(found
            .into_iter()
            .flatten()
            .map(|doc| doc.decode::<Student>())
            .collect::<std::result::Result<_, StoreError>>()?)
    }

    pub async fn nis_exists(&self, nis: &str, force_refresh: bool) -> Result<bool> {
        self.cache
            .read_through::<NisCheck, _, _, Error>(nis, force_refresh, || async {
                let docs = self
                    .store
                    .query(collections::STUDENTS, &[Filter::eq("nis", nis)], Some(1))
                    .await?;
                Ok(!docs.is_empty())
            })
            .await
    }

    /// Validate and write a batch of new students in one atomic commit.
    /// Returns the number of students written.
    pub async fn import_students(&self, actor: &Actor, drafts: Vec<NewStudent>) -> Result<usize> {
        authorize(actor, Action::ImportStudents)?;
        if drafts.is_empty() {
            return Err(PolicyError::InvalidInput("No students to import".to_string()).into());
        }

        for (i, d) in drafts.iter().enumerate() {
            if d.name.trim().is_empty() || d.nis.trim().is_empty() || d.class_id.trim().is_empty() {
                return Err(PolicyError::InvalidInput(format!(
                    "Row {}: name, NIS and class are required",
                    i + 1
                ))
                .into());
            }
        }

        let mut seen = HashSet::new();
        for d in &drafts {
            if !seen.insert(d.nis.as_str()) {
                return Err(PolicyError::DuplicateNis(d.nis.clone()).into());
            }
        }

        let classes: BTreeSet<&str> = drafts.iter().map(|d| d.class_id.as_str()).collect();
        let known = self.list_classes(false).await?;
        for class_id in &classes {
            if !known.iter().any(|c| c.id == *class_id) && self.find_class(class_id).await?.is_none() {
                return Err(PolicyError::ClassNotFound(class_id.to_string()).into());
            }
        }

        let checks = drafts.iter().map(|d| self.nis_exists(&d.nis, true));
        let taken = try_join_all(checks).await?;
        if let Some((d, _)) = drafts.iter().zip(&taken).find(|(_, exists)| **exists) {
            return Err(PolicyError::DuplicateNis(d.nis.clone()).into());
        }

        let classes: Vec<String> = classes.into_iter().map(str::to_string).collect();
        let nis: Vec<String> = drafts.iter().map(|d| d.nis.clone()).collect();
        let count = drafts.len();

        let writes = drafts
            .into_iter()
            .map(|d| {
                let id = self.store.new_id();
                Write::set(collections::STUDENTS, &id, &d.into_student(), false)
            })
            .collect::<std::result::Result<Vec<_>, StoreError>>()?;
        self.store.commit(writes).await?;

        self.cache.invalidate(&Mutation::StudentsImported { classes, nis });
        info!(count, "Students imported");
        Ok(count)
    }

    async fn require_student(&self, id: &str) -> Result<Student> {
        let doc = self
            .store
            .get(collections::STUDENTS, id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("{}/{}", collections::STUDENTS, id)))?;
        Ok(doc.decode()?)
    }

    pub async fn update_student(&self, actor: &Actor, id: &str, patch: StudentPatch) -> Result<Student> {
        authorize(actor, Action::ImportStudents)?;
        if patch.is_empty() {
            return Err(PolicyError::InvalidInput("Nothing to update".to_string()).into());
        }

        let current = self.require_student(id).await?;
        let mut updated = current.clone();
        let mut changes: Vec<(&str, Value)> = Vec::new();

        if let Some(name) = patch.name.map(|n| n.trim().to_string()) {
            if name.is_empty() {
                return Err(PolicyError::InvalidInput("Name must not be empty".to_string()).into());
            }
            changes.push(("nama_siswa", Value::String(name.clone())));
            updated.name = name;
        }
        if let Some(nis) = patch.nis.map(|n| n.trim().to_string()) {
            if nis.is_empty() {
                return Err(PolicyError::InvalidInput("NIS must not be empty".to_string()).into());
            }
            if nis != current.nis && self.nis_exists(&nis, true).await? {
                return Err(PolicyError::DuplicateNis(nis).into());
            }
            changes.push(("nis", Value::String(nis.clone())));
            updated.nis = nis;
        }
        if let Some(class_id) = patch.class_id.map(|c| SchoolClass::normalize_id(&c)) {
            if class_id != current.class_id {
                self.require_class(&class_id).await?;
            }
            changes.push(("id_kelas", Value::String(class_id.clone())));
            updated.class_id = class_id;
        }
        if let Some(active) = patch.active {
            let status = if active { ACTIVE } else { INACTIVE };
            changes.push(("status_aktif", Value::String(status.to_string())));
            updated.status = status.to_string();
        }

        self.store
            .commit(vec![Write::update(collections::STUDENTS, id, fields(changes))])
            .await?;

        let mut classes = vec![current.class_id.clone()];
        if updated.class_id != current.class_id {
            classes.push(updated.class_id.clone());
        }
        self.cache.invalidate(&Mutation::StudentUpdated { classes });
        Ok(updated)
    }

    pub async fn delete_students(&self, actor: &Actor, ids: &[String]) -> Result<usize> {
        authorize(actor, Action::DeleteStudents)?;
        if ids.is_empty() {
            return Err(PolicyError::InvalidInput("No students selected".to_string()).into());
        }
        let writes = ids
            .iter()
            .map(|id| Write::delete(collections::STUDENTS, id))
            .collect();
        self.store.commit(writes).await?;
        self.cache.invalidate(&Mutation::StudentsDeleted);
        info!(count = ids.len(), "Students deleted");
        Ok(ids.len())
    }

    /// Move students into another class, typically at the end of a school year.
    pub async fn promote_students(&self, actor: &Actor, ids: &[String], target: &str) -> Result<usize> {
        authorize(actor, Action::PromoteStudents)?;
        if ids.is_empty() {
            return Err(PolicyError::InvalidInput("No students selected".to_string()).into());
        }
        let target = SchoolClass::normalize_id(target);
        self.require_class(&target).await?;

        let writes = ids
            .iter()
            .map(|id| {
                Write::update(
                    collections::STUDENTS,
                    id,
                    fields([("id_kelas", Value::String(target.clone()))]),
                )
            })
            .collect();
        self.store.commit(writes).await?;

        self.cache.invalidate(&Mutation::StudentsMoved { to: target.clone() });
        info!(count = ids.len(), to = %target, "Students promoted");
        Ok(ids.len())
    }

    // ===== Special-class membership =====

    async fn require_special(&self, class_id: &str) -> Result<()> {
        let class = self.require_class(class_id).await?;
        if !class.special {
            return Err(PolicyError::InvalidInput(format!(
                "Class {} is not a special class",
                class_id
            ))
            .into());
        }
        Ok(())
    }

    pub async fn add_member(&self, actor: &Actor, class_id: &str, student_id: &str) -> Result<()> {
        authorize(actor, Action::ManageMembership)?;
        self.require_special(class_id).await?;
        self.require_student(student_id).await?;

        let membership = ClassMembership {
            class_id: class_id.to_string(),
            student_id: student_id.to_string(),
        };
        self.store
            .commit(vec![Write::set(
                collections::MEMBERSHIPS,
                &membership.doc_id(),
                &membership,
                false,
            )?])
            .await?;
        self.cache.invalidate(&Mutation::MembershipChanged {
            class_id: class_id.to_string(),
        });
        Ok(())
    }

    pub async fn remove_member(&self, actor: &Actor, class_id: &str, student_id: &str) -> Result<()> {
        authorize(actor, Action::ManageMembership)?;
        self.require_special(class_id).await?;

        let membership = ClassMembership {
            class_id: class_id.to_string(),
            student_id: student_id.to_string(),
        };
        self.store
            .commit(vec![Write::delete(collections::MEMBERSHIPS, &membership.doc_id())])
            .await?;
        self.cache.invalidate(&Mutation::MembershipChanged {
            class_id: class_id.to_string(),
        });
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct ImportRow {
    nama: String,
    nis: String,
    kelas: String,
}

/// Read `nama,nis,kelas` rows (with a header line) into import drafts.
pub fn parse_import_csv<R: Read>(reader: R) -> std::result::Result<Vec<NewStudent>, PolicyError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut drafts = Vec::new();
    for (i, result) in rdr.deserialize::<ImportRow>().enumerate() {
        let row = result.map_err(|e| PolicyError::InvalidInput(format!("Row {}: {}", i + 1, e)))?;
        drafts.push(NewStudent::new(&row.nama, &row.nis, &row.kelas));
    }
    Ok(drafts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStorage;
    use crate::models::Role;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn admin() -> Actor {
        Actor::new("admin", Role::Admin, true)
    }

    fn doc(v: Value) -> crate::store::Fields {
        v.as_object().cloned().unwrap()
    }

    fn setup() -> (RosterService<MemoryStore>, Arc<MemoryStore>, CacheManager) {
        let store = Arc::new(MemoryStore::new());
        store.seed("kelas", "XA", doc(json!({ "nama_kelas": "XA", "khusus": false })));
        store.seed("kelas", "PRAMUKA", doc(json!({ "nama_kelas": "PRAMUKA", "khusus": true })));
        store.seed(
            "siswa",
            "S1",
            doc(json!({ "nama_siswa": "Budi", "nis": "1002", "id_kelas": "XA", "status_aktif": "Aktif" })),
        );
        store.seed(
            "siswa",
            "S2",
            doc(json!({ "nama_siswa": "Ana", "nis": "1001", "id_kelas": "XA", "status_aktif": "Aktif" })),
        );
        store.seed(
            "siswa",
            "S3",
            doc(json!({ "nama_siswa": "Cici", "nis": "1003", "id_kelas": "XA", "status_aktif": "Nonaktif" })),
        );
        let cache = CacheManager::new(Arc::new(MemoryStorage::new()));
        (RosterService::new(store.clone(), cache.clone()), store, cache)
    }

    fn policy(err: Error) -> PolicyError {
        err.policy().cloned().expect("expected a policy error")
    }

    #[tokio::test]
    async fn test_active_roster_is_sorted_and_cached() {
        let (svc, store, _) = setup();
        let roster = svc.active_roster("XA", false).await.unwrap();
        let names: Vec<_> = roster.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Ana", "Budi"]);

        store.set_offline(true);
        assert_eq!(svc.active_roster("XA", false).await.unwrap().len(), 2);
        assert!(svc.active_roster("XA", true).await.is_err());
    }

    #[tokio::test]
    async fn test_special_class_roster_comes_from_memberships() {
        let (svc, _, _) = setup();
        let actor = admin();
        assert!(svc.active_roster("PRAMUKA", false).await.unwrap().is_empty());

        svc.add_member(&actor, "PRAMUKA", "S1").await.unwrap();
        svc.add_member(&actor, "PRAMUKA", "S3").await.unwrap();
        let roster = svc.active_roster("PRAMUKA", false).await.unwrap();
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].id, "S1");

        svc.remove_member(&actor, "PRAMUKA", "S1").await.unwrap();
        assert!(svc.active_roster("PRAMUKA", false).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_membership_requires_special_class() {
        let (svc, _, _) = setup();
        let err = svc.add_member(&admin(), "XA", "S1").await.unwrap_err();
        assert!(matches!(policy(err), PolicyError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_create_class_normalizes_and_rejects_duplicates() {
        let (svc, _, _) = setup();
        let actor = admin();
        assert_eq!(svc.list_classes(false).await.unwrap().len(), 2);

        let class = svc.create_class(&actor, "  xi ipa ", false).await.unwrap();
        assert_eq!(class.id, "XI IPA");
        assert_eq!(class.name, "XI IPA");
        // Listing was invalidated
        assert_eq!(svc.list_classes(false).await.unwrap().len(), 3);

        let err = svc.create_class(&actor, "xa", false).await.unwrap_err();
        assert_eq!(policy(err), PolicyError::DuplicateClass("XA".into()));
        let err = svc.create_class(&actor, "   ", false).await.unwrap_err();
        assert!(matches!(policy(err), PolicyError::InvalidInput(_)));
        let err = svc.create_class(&actor, "..", false).await.unwrap_err();
        assert!(matches!(policy(err), PolicyError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_create_class_keeps_slashes_out_of_the_id() {
        let (svc, store, _) = setup();
        let class = svc.create_class(&admin(), "xi/ipa", false).await.unwrap();
        assert_eq!(class.id, "XI-IPA");
        assert!(store.raw("kelas", "XI-IPA").is_some());

        // The same raw id resolves to the stored class
        let err = svc.create_class(&admin(), "XI/IPA", false).await.unwrap_err();
        assert_eq!(policy(err), PolicyError::DuplicateClass("XI-IPA".into()));
    }

    #[tokio::test]
    async fn test_delete_class_removes_memberships() {
        let (svc, store, _) = setup();
        let actor = admin();
        svc.add_member(&actor, "PRAMUKA", "S1").await.unwrap();
        svc.delete_class(&actor, "PRAMUKA").await.unwrap();
        assert!(store.raw("kelas", "PRAMUKA").is_none());
        assert!(store.raw("anggota_kelas", "PRAMUKA_S1").is_none());

        let err = svc.delete_class(&actor, "PRAMUKA").await.unwrap_err();
        assert_eq!(policy(err), PolicyError::ClassNotFound("PRAMUKA".into()));
    }

    #[tokio::test]
    async fn test_import_writes_one_batch() {
        let (svc, store, _) = setup();
        let before = store.commit_count();
        let drafts = vec![
            NewStudent::new("Dedi", "2001", "xa"),
            NewStudent::new("Eka", "2002", "XA"),
        ];
        assert_eq!(svc.import_students(&admin(), drafts).await.unwrap(), 2);
        assert_eq!(store.commit_count(), before + 1);
        assert_eq!(svc.active_roster("XA", false).await.unwrap().len(), 4);
        assert!(svc.nis_exists("2001", false).await.unwrap());
    }

    #[tokio::test]
    async fn test_import_validation_order_and_no_writes() {
        let (svc, store, _) = setup();
        let actor = admin();
        let before = store.commit_count();

        let blank = vec![NewStudent::new("", "3001", "XA")];
        assert!(matches!(
            policy(svc.import_students(&actor, blank).await.unwrap_err()),
            PolicyError::InvalidInput(_)
        ));

        let repeated = vec![
            NewStudent::new("A", "3001", "XA"),
            NewStudent::new("B", "3001", "NOPE"),
        ];
        assert_eq!(
            policy(svc.import_students(&actor, repeated).await.unwrap_err()),
            PolicyError::DuplicateNis("3001".into())
        );

        let unknown = vec![NewStudent::new("A", "3001", "NOPE")];
        assert_eq!(
            policy(svc.import_students(&actor, unknown).await.unwrap_err()),
            PolicyError::ClassNotFound("NOPE".into())
        );

        let taken = vec![NewStudent::new("A", "3001", "XA"), NewStudent::new("B", "1001", "XA")];
        assert_eq!(
            policy(svc.import_students(&actor, taken).await.unwrap_err()),
            PolicyError::DuplicateNis("1001".into())
        );

        assert_eq!(store.commit_count(), before);
    }

    #[tokio::test]
    async fn test_import_requires_permission() {
        let (svc, _, _) = setup();
        let guru = Actor::new("g", Role::Guru, true);
        let err = svc
            .import_students(&guru, vec![NewStudent::new("A", "1", "XA")])
            .await
            .unwrap_err();
        assert!(matches!(policy(err), PolicyError::NotPermitted { .. }));
    }

    #[tokio::test]
    async fn test_promote_checks_target_first() {
        let (svc, store, _) = setup();
        let actor = admin();
        let ids = vec!["S1".to_string(), "S2".to_string()];

        let before = store.commit_count();
        let err = svc.promote_students(&actor, &ids, "XII").await.unwrap_err();
        assert_eq!(policy(err), PolicyError::ClassNotFound("XII".into()));
        assert_eq!(store.commit_count(), before);

        svc.create_class(&actor, "XI", false).await.unwrap();
        svc.active_roster("XA", false).await.unwrap();
        assert_eq!(svc.promote_students(&actor, &ids, "xi").await.unwrap(), 2);
        assert_eq!(svc.active_roster("XI", false).await.unwrap().len(), 2);
        assert!(svc.active_roster("XA", false).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_student_deactivate_and_move() {
        let (svc, _, _) = setup();
        let actor = admin();
        svc.active_roster("XA", false).await.unwrap();

        let patch = StudentPatch {
            active: Some(false),
            ..Default::default()
        };
        let updated = svc.update_student(&actor, "S1", patch).await.unwrap();
        assert!(!updated.is_active());
        assert_eq!(svc.active_roster("XA", false).await.unwrap().len(), 1);

        let moved = StudentPatch {
            class_id: Some("nope".into()),
            ..Default::default()
        };
        let err = svc.update_student(&actor, "S2", moved).await.unwrap_err();
        assert_eq!(policy(err), PolicyError::ClassNotFound("NOPE".into()));

        let dup = StudentPatch {
            nis: Some("1002".into()),
            ..Default::default()
        };
        let err = svc.update_student(&actor, "S2", dup).await.unwrap_err();
        assert_eq!(policy(err), PolicyError::DuplicateNis("1002".into()));
    }

    #[tokio::test]
    async fn test_delete_students() {
        let (svc, store, _) = setup();
        let removed = svc
            .delete_students(&admin(), &["S1".to_string(), "S3".to_string()])
            .await
            .unwrap();
        assert_eq!(removed, 2);
        assert!(store.raw("siswa", "S1").is_none());
        assert_eq!(svc.students_by_class("XA").await.unwrap().len(), 1);
    }

    #[test]
    fn test_parse_import_csv() {
        let input = "nama,nis,kelas\n Ana , 1001 , xa\nBudi,1002,XB\n";
        let drafts = parse_import_csv(input.as_bytes()).unwrap();
        assert_eq!(
            drafts,
            vec![NewStudent::new("Ana", "1001", "XA"), NewStudent::new("Budi", "1002", "XB")]
        );

        let broken = "nama,nis,kelas\nAna,1001\n";
        assert!(matches!(
            parse_import_csv(broken.as_bytes()),
            Err(PolicyError::InvalidInput(_))
        ));
    }
}
