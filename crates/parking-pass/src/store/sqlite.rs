use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{ffi, params, Connection, ErrorCode, OptionalExtension, Row};
use tracing::debug;

use super::RepositoryError;
use crate::identity::{NewUser, Role, User, UserId, UserRepository};
use crate::workflows::parking::{
    Application, ApplicationId, ApplicationRepository, ApplicationStatus, NewApplication, NewPass,
    PassRecord, VehicleType,
};

const SCHEMA: &str = "
    PRAGMA foreign_keys = ON;
    CREATE TABLE IF NOT EXISTS users (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      name TEXT NOT NULL,
      email TEXT NOT NULL UNIQUE,
      password_hash TEXT NOT NULL,
      role TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS applications (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      user_id INTEGER NOT NULL REFERENCES users(id),
      vehicle_number TEXT NOT NULL,
      vehicle_type TEXT NOT NULL,
      mobile_number TEXT NOT NULL,
      status TEXT NOT NULL,
      issued_at TEXT NOT NULL,
      expires_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS applications_by_owner ON applications(user_id);
    CREATE TABLE IF NOT EXISTS passes (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      application_id INTEGER NOT NULL UNIQUE REFERENCES applications(id),
      pass_number TEXT NOT NULL,
      document_path TEXT NOT NULL,
      generated_at TEXT NOT NULL
    );
";

const USER_COLUMNS: &str = "id, name, email, password_hash, role";
const APPLICATION_COLUMNS: &str =
    "id, user_id, vehicle_number, vehicle_type, mobile_number, status, issued_at, expires_at";
const PASS_COLUMNS: &str = "id, application_id, pass_number, document_path, generated_at";

/// SQLite-backed store. The connection is serialized behind a mutex.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database file and apply the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RepositoryError> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(map_sqlite)?;
        debug!(path = %path.display(), "opened sqlite store");
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, RepositoryError> {
        Self::with_connection(Connection::open_in_memory().map_err(map_sqlite)?)
    }

    fn with_connection(conn: Connection) -> Result<Self, RepositoryError> {
        conn.execute_batch(SCHEMA).map_err(map_sqlite)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, RepositoryError> {
        self.conn
            .lock()
            .map_err(|_| RepositoryError::Unavailable("sqlite connection lock poisoned".to_string()))
    }
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}

fn map_sqlite(err: rusqlite::Error) -> RepositoryError {
    if let rusqlite::Error::SqliteFailure(failure, _) = &err {
        if failure.code == ErrorCode::ConstraintViolation {
            match failure.extended_code {
                ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                    return RepositoryError::Conflict
                }
                ffi::SQLITE_CONSTRAINT_FOREIGNKEY => return RepositoryError::MissingOwner,
                _ => {}
            }
        }
    }
    RepositoryError::Unavailable(err.to_string())
}

fn corrupt(column: &str, value: &str) -> RepositoryError {
    RepositoryError::Unavailable(format!("unreadable {column} value '{value}'"))
}

fn encode_time(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn decode_time(column: &str, value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|_| corrupt(column, value))
}

struct UserRow {
    id: i64,
    name: String,
    email: String,
    password_hash: String,
    role: String,
}

impl UserRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            password_hash: row.get(3)?,
            role: row.get(4)?,
        })
    }

    fn into_user(self) -> Result<User, RepositoryError> {
        let role = Role::parse(&self.role).ok_or_else(|| corrupt("role", &self.role))?;
        Ok(User {
            id: UserId(self.id),
            name: self.name,
            email: self.email,
            password_hash: self.password_hash,
            role,
        })
    }
}

struct ApplicationRow {
    id: i64,
    owner: i64,
    vehicle_number: String,
    vehicle_type: String,
    mobile_number: String,
    status: String,
    issued_at: String,
    expires_at: String,
}

impl ApplicationRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            owner: row.get(1)?,
            vehicle_number: row.get(2)?,
            vehicle_type: row.get(3)?,
            mobile_number: row.get(4)?,
            status: row.get(5)?,
            issued_at: row.get(6)?,
            expires_at: row.get(7)?,
        })
    }

    fn into_application(self) -> Result<Application, RepositoryError> {
        let vehicle_type = VehicleType::parse(&self.vehicle_type)
            .ok_or_else(|| corrupt("vehicle_type", &self.vehicle_type))?;
        let status = ApplicationStatus::parse(&self.status)
            .ok_or_else(|| corrupt("status", &self.status))?;
        Ok(Application {
            id: ApplicationId(self.id),
            owner: UserId(self.owner),
            vehicle_number: self.vehicle_number,
            vehicle_type,
            mobile_number: self.mobile_number,
            status,
            issued_at: decode_time("issued_at", &self.issued_at)?,
            expires_at: decode_time("expires_at", &self.expires_at)?,
        })
    }
}

struct PassRow {
    id: i64,
    application_id: i64,
    pass_number: String,
    document_path: String,
    generated_at: String,
}

impl PassRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            application_id: row.get(1)?,
            pass_number: row.get(2)?,
            document_path: row.get(3)?,
            generated_at: row.get(4)?,
        })
    }

    fn into_record(self) -> Result<PassRecord, RepositoryError> {
        Ok(PassRecord {
            id: self.id,
            application_id: ApplicationId(self.application_id),
            pass_number: self.pass_number,
            document_path: self.document_path,
            generated_at: decode_time("generated_at", &self.generated_at)?,
        })
    }
}

fn fetch_user(
    conn: &Connection,
    column: &str,
    value: &dyn rusqlite::ToSql,
) -> Result<Option<User>, RepositoryError> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1");
    conn.query_row(&sql, [value], UserRow::read)
        .optional()
        .map_err(map_sqlite)?
        .map(UserRow::into_user)
        .transpose()
}

fn fetch_application(
    conn: &Connection,
    id: ApplicationId,
) -> Result<Option<Application>, RepositoryError> {
    let sql = format!("SELECT {APPLICATION_COLUMNS} FROM applications WHERE id = ?1");
    conn.query_row(&sql, [id.0], ApplicationRow::read)
        .optional()
        .map_err(map_sqlite)?
        .map(ApplicationRow::into_application)
        .transpose()
}

fn fetch_pass(conn: &Connection, id: ApplicationId) -> Result<Option<PassRecord>, RepositoryError> {
    let sql = format!("SELECT {PASS_COLUMNS} FROM passes WHERE application_id = ?1");
    conn.query_row(&sql, [id.0], PassRow::read)
        .optional()
        .map_err(map_sqlite)?
        .map(PassRow::into_record)
        .transpose()
}

fn query_applications(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<Application>, RepositoryError> {
    let mut stmt = conn.prepare(sql).map_err(map_sqlite)?;
    let rows = stmt
        .query_map(params, ApplicationRow::read)
        .map_err(map_sqlite)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(map_sqlite)?;
    rows.into_iter()
        .map(ApplicationRow::into_application)
        .collect()
}

impl UserRepository for SqliteStore {
    fn insert(&self, user: NewUser) -> Result<User, RepositoryError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO users (name, email, password_hash, role) VALUES (?1, ?2, ?3, ?4)",
            params![user.name, user.email, user.password_hash, user.role.label()],
        )
        .map_err(map_sqlite)?;

        Ok(User {
            id: UserId(conn.last_insert_rowid()),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
        })
    }

    fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let conn = self.conn()?;
        fetch_user(&conn, "email", &email)
    }

    fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let conn = self.conn()?;
        fetch_user(&conn, "id", &id.0)
    }
}

impl ApplicationRepository for SqliteStore {
    fn insert(&self, application: NewApplication) -> Result<Application, RepositoryError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO applications (
               user_id, vehicle_number, vehicle_type, mobile_number, status, issued_at, expires_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                application.owner.0,
                application.vehicle_number,
                application.vehicle_type.label(),
                application.mobile_number,
                application.status.label(),
                encode_time(&application.issued_at),
                encode_time(&application.expires_at),
            ],
        )
        .map_err(map_sqlite)?;

        Ok(Application {
            id: ApplicationId(conn.last_insert_rowid()),
            owner: application.owner,
            vehicle_number: application.vehicle_number,
            vehicle_type: application.vehicle_type,
            mobile_number: application.mobile_number,
            status: application.status,
            issued_at: application.issued_at,
            expires_at: application.expires_at,
        })
    }

    fn fetch(&self, id: ApplicationId) -> Result<Option<Application>, RepositoryError> {
        let conn = self.conn()?;
        fetch_application(&conn, id)
    }

    fn list_for_owner(&self, owner: UserId) -> Result<Vec<Application>, RepositoryError> {
        let sql =
            format!("SELECT {APPLICATION_COLUMNS} FROM applications WHERE user_id = ?1 ORDER BY id");
        let conn = self.conn()?;
        query_applications(&conn, &sql, [owner.0])
    }

    fn list_all(&self) -> Result<Vec<Application>, RepositoryError> {
        let sql = format!("SELECT {APPLICATION_COLUMNS} FROM applications ORDER BY id");
        let conn = self.conn()?;
        query_applications(&conn, &sql, params![])
    }

    fn transition_status(
        &self,
        id: ApplicationId,
        from: ApplicationStatus,
        to: ApplicationStatus,
    ) -> Result<Option<Application>, RepositoryError> {
        let conn = self.conn()?;
        let changed = conn
            .execute(
                "UPDATE applications SET status = ?1 WHERE id = ?2 AND status = ?3",
                params![to.label(), id.0, from.label()],
            )
            .map_err(map_sqlite)?;

        let current = fetch_application(&conn, id)?.ok_or(RepositoryError::NotFound)?;
        Ok((changed == 1).then_some(current))
    }

    fn pass_for(&self, id: ApplicationId) -> Result<Option<PassRecord>, RepositoryError> {
        let conn = self.conn()?;
        fetch_pass(&conn, id)
    }

    fn record_pass(&self, pass: NewPass) -> Result<PassRecord, RepositoryError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO passes (application_id, pass_number, document_path, generated_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                pass.application_id.0,
                pass.pass_number,
                pass.document_path,
                encode_time(&pass.generated_at),
            ],
        )
        .map_err(|err| match map_sqlite(err) {
            RepositoryError::MissingOwner => RepositoryError::NotFound,
            other => other,
        })?;

        Ok(PassRecord {
            id: conn.last_insert_rowid(),
            application_id: pass.application_id,
            pass_number: pass.pass_number,
            document_path: pass.document_path,
            generated_at: pass.generated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::parking::ApplicationSubmission;
    use chrono::TimeZone;

    fn new_user(email: &str, role: Role) -> NewUser {
        NewUser {
            name: "Alice".to_string(),
            email: email.to_string(),
            password_hash: "$argon2id$stub".to_string(),
            role,
        }
    }

    fn pending(owner: UserId) -> NewApplication {
        NewApplication::pending(
            owner,
            ApplicationSubmission {
                vehicle_number: "KA01AB1234".to_string(),
                vehicle_type: VehicleType::TwoWheeler,
                mobile_number: "+919999999999".to_string(),
            },
            Utc.with_ymd_and_hms(2024, 2, 10, 23, 59, 59).unwrap(),
        )
    }

    #[test]
    fn enforces_unique_email() {
        let store = SqliteStore::open_in_memory().expect("open");
        UserRepository::insert(&store, new_user("a@x.com", Role::Staff)).expect("insert");
        assert!(matches!(
            UserRepository::insert(&store, new_user("a@x.com", Role::Admin)),
            Err(RepositoryError::Conflict)
        ));
    }

    #[test]
    fn enforces_owner_foreign_key() {
        let store = SqliteStore::open_in_memory().expect("open");
        assert!(matches!(
            ApplicationRepository::insert(&store, pending(UserId(99))),
            Err(RepositoryError::MissingOwner)
        ));
    }

    #[test]
    fn rows_survive_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("parking_pass.db");

        let (user, application) = {
            let store = SqliteStore::open(&path).expect("open");
            let user =
                UserRepository::insert(&store, new_user("root@x.com", Role::Admin)).expect("user");
            let application =
                ApplicationRepository::insert(&store, pending(user.id)).expect("application");
            (user, application)
        };

        let store = SqliteStore::open(&path).expect("reopen");
        assert_eq!(store.find_by_id(user.id).expect("lookup"), Some(user.clone()));
        assert_eq!(
            store.find_by_email("root@x.com").expect("lookup"),
            Some(user.clone())
        );
        assert_eq!(store.fetch(application.id).expect("fetch"), Some(application.clone()));
        assert_eq!(store.list_for_owner(user.id).expect("list"), vec![application]);
    }

    #[test]
    fn reads_share_one_connection_across_owners() {
        let store = SqliteStore::open_in_memory().expect("open");
        let alice = UserRepository::insert(&store, new_user("a@x.com", Role::Staff)).expect("alice");
        let bob = UserRepository::insert(&store, new_user("b@x.com", Role::Staff)).expect("bob");
        let first = ApplicationRepository::insert(&store, pending(alice.id)).expect("first");
        let second = ApplicationRepository::insert(&store, pending(bob.id)).expect("second");

        assert_eq!(store.list_all().expect("list"), vec![first.clone(), second.clone()]);
        assert_eq!(store.list_for_owner(bob.id).expect("list"), vec![second]);
        assert_eq!(store.find_by_email("missing@x.com").expect("lookup"), None);
        assert_eq!(store.find_by_id(UserId(404)).expect("lookup"), None);
        assert_eq!(store.fetch(ApplicationId(404)).expect("fetch"), None);
        assert_eq!(store.pass_for(first.id).expect("lookup"), None);
    }

    #[test]
    fn transition_only_moves_rows_in_the_expected_state() {
        let store = SqliteStore::open_in_memory().expect("open");
        let user = UserRepository::insert(&store, new_user("a@x.com", Role::Staff)).expect("user");
        let application = ApplicationRepository::insert(&store, pending(user.id)).expect("insert");

        let rejected = store
            .transition_status(application.id, ApplicationStatus::Pending, ApplicationStatus::Rejected)
            .expect("transition")
            .expect("row moved");
        assert_eq!(rejected.status, ApplicationStatus::Rejected);
        assert_eq!(
            store
                .transition_status(application.id, ApplicationStatus::Pending, ApplicationStatus::Approved)
                .expect("transition"),
            None
        );
        assert!(matches!(
            store.transition_status(
                ApplicationId(404),
                ApplicationStatus::Pending,
                ApplicationStatus::Approved
            ),
            Err(RepositoryError::NotFound)
        ));
    }

    #[test]
    fn pass_records_are_unique_per_application() {
        let store = SqliteStore::open_in_memory().expect("open");
        let user = UserRepository::insert(&store, new_user("a@x.com", Role::Staff)).expect("user");
        let application = ApplicationRepository::insert(&store, pending(user.id)).expect("insert");
        let pass = NewPass {
            application_id: application.id,
            pass_number: "PP-000001".to_string(),
            document_path: "pass_1.pdf".to_string(),
            generated_at: application.issued_at,
        };

        let record = store.record_pass(pass.clone()).expect("record");
        assert_eq!(store.pass_for(application.id).expect("lookup"), Some(record));
        assert!(matches!(store.record_pass(pass.clone()), Err(RepositoryError::Conflict)));

        let orphan = NewPass {
            application_id: ApplicationId(77),
            ..pass
        };
        assert!(matches!(store.record_pass(orphan), Err(RepositoryError::NotFound)));
    }
}
