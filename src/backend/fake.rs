use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{json, Value};
use time::format_description::well_known::Rfc3339;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::auth::dto::{AuthUser, Session};
use crate::backend::rows::{field_as_string, Direction, Filter, RowQuery};
use crate::backend::BackendClient;
use crate::error::{Error, Result, CODE_NOT_FOUND, CODE_UNIQUE_VIOLATION};
use crate::session::SessionStore;

/// In-memory stand-in for the hosted backend, mirroring the constraints the
/// real one enforces (unique profile ids and invite codes, one friendship
/// row per stored pair, one membership row per group and user) and reporting
/// the same machine-readable codes. A test double for the opaque
/// collaborator, not a server.
pub struct FakeBackend {
    session: SessionStore,
    state: Mutex<FakeState>,
}

#[derive(Default)]
struct FakeState {
    users: Vec<FakeUser>,
    tables: HashMap<String, Vec<Value>>,
    objects: HashMap<String, StoredObject>,
    reset_emails: Vec<String>,
    clock_seq: i64,
}

struct FakeUser {
    id: Uuid,
    email: String,
    password: String,
}

struct StoredObject {
    content_type: String,
    body: Bytes,
}

impl FakeBackend {
    /// The session store is shared with the client under test so procedure
    /// calls can derive the caller the way the real backend does from the
    /// bearer token.
    pub fn new(session: SessionStore) -> Self {
        Self {
            session,
            state: Mutex::new(FakeState::default()),
        }
    }

    /// Raw table snapshot for assertions.
    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.state
            .lock()
            .unwrap()
            .tables
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    /// Plant a row as-is, bypassing defaults and constraints. Used to model
    /// rows written by older clients.
    pub fn seed_row(&self, table: &str, row: Value) {
        self.state
            .lock()
            .unwrap()
            .tables
            .entry(table.to_string())
            .or_default()
            .push(row);
    }

    pub fn object(&self, bucket: &str, path: &str) -> Option<(String, Bytes)> {
        let state = self.state.lock().unwrap();
        state
            .objects
            .get(&format!("{bucket}/{path}"))
            .map(|o| (o.content_type.clone(), o.body.clone()))
    }

    pub fn reset_emails(&self) -> Vec<String> {
        self.state.lock().unwrap().reset_emails.clone()
    }

    fn caller(&self) -> Result<Uuid> {
        self.session
            .current_user()
            .map(|u| u.id)
            .map_err(|_| Error::backend("401", "not authenticated"))
    }
}

fn session_for(user: &FakeUser) -> Session {
    Session {
        access_token: format!("fake-access-{}", user.id),
        refresh_token: format!("fake-refresh-{}", user.id),
        expires_at: OffsetDateTime::now_utc() + Duration::hours(1),
        user: AuthUser {
            id: user.id,
            email: user.email.clone(),
        },
    }
}

/// Strictly increasing timestamps so `order=created_at` is deterministic
/// even for inserts within the same clock tick.
fn next_created_at(state: &mut FakeState) -> String {
    state.clock_seq += 1;
    (OffsetDateTime::now_utc() + Duration::nanoseconds(state.clock_seq))
        .format(&Rfc3339)
        .unwrap()
}

fn apply_defaults(table: &str, row: &mut Value, created_at: String) -> Result<()> {
    let obj = row
        .as_object_mut()
        .ok_or_else(|| Error::backend("PGRST102", "row payload is not an object"))?;
    let keyed_by_id = !matches!(table, "friendships" | "group_members");
    if keyed_by_id && !obj.contains_key("id") {
        obj.insert("id".into(), json!(Uuid::new_v4()));
    }
    if !obj.contains_key("created_at") {
        obj.insert("created_at".into(), json!(created_at));
    }
    match table {
        "gifts" => {
            obj.entry("is_reserved").or_insert(json!(false));
        }
        "ledgers" => {
            obj.entry("status").or_insert(json!("pending"));
        }
        _ => {}
    }
    Ok(())
}

fn same_field(a: &Value, b: &Value, column: &str) -> bool {
    match (field_as_string(a, column), field_as_string(b, column)) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

/// Unique constraints the real backend declares, checked on write. Returns
/// the violated constraint name.
fn violated_constraint(
    table: &str,
    rows: &[Value],
    candidate: &Value,
    skip: Option<usize>,
) -> Option<&'static str> {
    let others = rows
        .iter()
        .enumerate()
        .filter(|(i, _)| Some(*i) != skip)
        .map(|(_, r)| r);
    for existing in others {
        match table {
            "profiles" => {
                if same_field(existing, candidate, "id") {
                    return Some("profiles_pkey");
                }
                if same_field(existing, candidate, "invite_code") {
                    return Some("profiles_invite_code_key");
                }
            }
            "friendships" => {
                if same_field(existing, candidate, "user_id")
                    && same_field(existing, candidate, "friend_id")
                {
                    return Some("friendships_user_id_friend_id_key");
                }
            }
            "group_members" => {
                if same_field(existing, candidate, "group_id")
                    && same_field(existing, candidate, "user_id")
                {
                    return Some("group_members_group_id_user_id_key");
                }
            }
            "groups" => {
                if same_field(existing, candidate, "id") {
                    return Some("groups_pkey");
                }
                if same_field(existing, candidate, "invite_code") {
                    return Some("groups_invite_code_key");
                }
            }
            _ => {
                if same_field(existing, candidate, "id") {
                    return Some("pkey");
                }
            }
        }
    }
    None
}

fn unique_violation(constraint: &str) -> Error {
    Error::backend(
        CODE_UNIQUE_VIOLATION,
        format!("duplicate key value violates unique constraint \"{constraint}\""),
    )
}

fn compare_scalars(a: &str, b: &str) -> Ordering {
    if let (Ok(x), Ok(y)) = (
        OffsetDateTime::parse(a, &Rfc3339),
        OffsetDateTime::parse(b, &Rfc3339),
    ) {
        return x.cmp(&y);
    }
    if let (Ok(x), Ok(y)) = (a.parse::<f64>(), b.parse::<f64>()) {
        return x.partial_cmp(&y).unwrap_or(Ordering::Equal);
    }
    a.cmp(b)
}

fn apply_query(rows: &[Value], query: &RowQuery) -> Vec<Value> {
    let mut out: Vec<Value> = rows
        .iter()
        .filter(|row| query.matches(row))
        .cloned()
        .collect();
    if let Some(order) = &query.order {
        out.sort_by(|a, b| {
            let ord = match (
                field_as_string(a, &order.column),
                field_as_string(b, &order.column),
            ) {
                (Some(x), Some(y)) => compare_scalars(&x, &y),
                (Some(_), None) => Ordering::Greater,
                (None, Some(_)) => Ordering::Less,
                (None, None) => Ordering::Equal,
            };
            match order.direction {
                Direction::Asc => ord,
                Direction::Desc => ord.reverse(),
            }
        });
    }
    if let Some(limit) = query.limit {
        out.truncate(limit as usize);
    }
    out
}

fn merge_patch(target: &mut Value, patch: &Value) {
    if let (Some(target), Some(patch)) = (target.as_object_mut(), patch.as_object()) {
        for (key, value) in patch {
            target.insert(key.clone(), value.clone());
        }
    }
}

#[async_trait]
impl BackendClient for FakeBackend {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Session> {
        let mut state = self.state.lock().unwrap();
        if state.users.iter().any(|u| u.email == email) {
            return Err(Error::backend(
                "user_already_exists",
                "User already registered",
            ));
        }
        let user = FakeUser {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password: password.to_string(),
        };
        let session = session_for(&user);
        state.users.push(user);
        Ok(session)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let state = self.state.lock().unwrap();
        state
            .users
            .iter()
            .find(|u| u.email == email && u.password == password)
            .map(session_for)
            .ok_or_else(|| {
                Error::backend("invalid_credentials", "Invalid login credentials")
            })
    }

    async fn sign_out(&self, _access_token: &str) -> Result<()> {
        Ok(())
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session> {
        let state = self.state.lock().unwrap();
        refresh_token
            .strip_prefix("fake-refresh-")
            .and_then(|id| id.parse::<Uuid>().ok())
            .and_then(|id| state.users.iter().find(|u| u.id == id))
            .map(session_for)
            .ok_or_else(|| Error::backend("invalid_grant", "Invalid Refresh Token"))
    }

    async fn send_password_reset(&self, email: &str) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .reset_emails
            .push(email.to_string());
        Ok(())
    }

    async fn select(&self, table: &str, query: RowQuery) -> Result<Vec<Value>> {
        let state = self.state.lock().unwrap();
        let rows = state.tables.get(table).map(Vec::as_slice).unwrap_or(&[]);
        Ok(apply_query(rows, &query))
    }

    async fn select_one(&self, table: &str, query: RowQuery) -> Result<Value> {
        let mut rows = self.select(table, query).await?;
        if rows.len() == 1 {
            Ok(rows.remove(0))
        } else {
            Err(Error::backend(
                CODE_NOT_FOUND,
                "JSON object requested, multiple (or no) rows returned",
            ))
        }
    }

    async fn insert(&self, table: &str, mut row: Value) -> Result<Value> {
        let mut state = self.state.lock().unwrap();
        let created_at = next_created_at(&mut state);
        apply_defaults(table, &mut row, created_at)?;
        let rows = state.tables.entry(table.to_string()).or_default();
        if let Some(constraint) = violated_constraint(table, rows, &row, None) {
            return Err(unique_violation(constraint));
        }
        rows.push(row.clone());
        Ok(row)
    }

    async fn update(
        &self,
        table: &str,
        filters: Vec<Filter>,
        patch: Value,
    ) -> Result<Vec<Value>> {
        let mut state = self.state.lock().unwrap();
        let rows = state.tables.entry(table.to_string()).or_default();
        let targets: Vec<usize> = rows
            .iter()
            .enumerate()
            .filter(|(_, row)| filters.iter().all(|f| f.matches(row)))
            .map(|(i, _)| i)
            .collect();

        // Validate every merged row before applying any of them.
        let mut merged = Vec::with_capacity(targets.len());
        for &index in &targets {
            let mut candidate = rows[index].clone();
            merge_patch(&mut candidate, &patch);
            if let Some(constraint) =
                violated_constraint(table, rows, &candidate, Some(index))
            {
                return Err(unique_violation(constraint));
            }
            merged.push(candidate);
        }
        for (&index, candidate) in targets.iter().zip(&merged) {
            rows[index] = candidate.clone();
        }
        Ok(merged)
    }

    async fn upsert(&self, table: &str, mut row: Value) -> Result<Value> {
        let existing_index = {
            let state = self.state.lock().unwrap();
            state.tables.get(table).and_then(|rows| {
                rows.iter()
                    .position(|existing| same_field(existing, &row, "id"))
            })
        };
        match existing_index {
            Some(index) => {
                let mut state = self.state.lock().unwrap();
                let rows = state.tables.entry(table.to_string()).or_default();
                let mut candidate = rows[index].clone();
                merge_patch(&mut candidate, &row);
                if let Some(constraint) =
                    violated_constraint(table, rows, &candidate, Some(index))
                {
                    return Err(unique_violation(constraint));
                }
                rows[index] = candidate.clone();
                Ok(candidate)
            }
            None => {
                let mut state = self.state.lock().unwrap();
                let created_at = next_created_at(&mut state);
                apply_defaults(table, &mut row, created_at)?;
                let rows = state.tables.entry(table.to_string()).or_default();
                if let Some(constraint) = violated_constraint(table, rows, &row, None) {
                    return Err(unique_violation(constraint));
                }
                rows.push(row.clone());
                Ok(row)
            }
        }
    }

    async fn delete(&self, table: &str, filters: Vec<Filter>) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(rows) = state.tables.get_mut(table) {
            rows.retain(|row| !filters.iter().all(|f| f.matches(row)));
        }
        Ok(())
    }

    async fn count(&self, table: &str, filters: Vec<Filter>) -> Result<u64> {
        let state = self.state.lock().unwrap();
        let rows = state.tables.get(table).map(Vec::as_slice).unwrap_or(&[]);
        Ok(rows
            .iter()
            .filter(|row| filters.iter().all(|f| f.matches(row)))
            .count() as u64)
    }

    async fn rpc(&self, function: &str, args: Value) -> Result<Value> {
        match function {
            // Creates the group and the creator's membership in one step;
            // the caller comes from the bearer token, never from the args.
            "create_group_with_admin" => {
                let caller = self.caller()?;
                let name = args
                    .get("p_name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| Error::backend("22023", "p_name is required"))?
                    .to_string();
                let invite_code = args
                    .get("p_invite_code")
                    .and_then(Value::as_str)
                    .map(str::to_string);

                let mut state = self.state.lock().unwrap();
                let created_at = next_created_at(&mut state);
                let group = json!({
                    "id": Uuid::new_v4(),
                    "name": name,
                    "invite_code": invite_code,
                    "created_at": created_at,
                });
                let groups = state.tables.entry("groups".to_string()).or_default();
                if let Some(constraint) =
                    violated_constraint("groups", groups, &group, None)
                {
                    return Err(unique_violation(constraint));
                }
                groups.push(group.clone());

                let membership_created_at = next_created_at(&mut state);
                state
                    .tables
                    .entry("group_members".to_string())
                    .or_default()
                    .push(json!({
                        "group_id": group["id"],
                        "user_id": caller,
                        "created_at": membership_created_at,
                    }));
                Ok(group)
            }
            "get_group_members" => {
                let group_id = args
                    .get("p_group_id")
                    .and_then(Value::as_str)
                    .ok_or_else(|| Error::backend("22023", "p_group_id is required"))?
                    .to_string();
                let state = self.state.lock().unwrap();
                let members = state
                    .tables
                    .get("group_members")
                    .map(Vec::as_slice)
                    .unwrap_or(&[])
                    .iter()
                    .filter(|row| {
                        field_as_string(row, "group_id").as_deref() == Some(&group_id)
                    })
                    .cloned()
                    .collect();
                Ok(Value::Array(members))
            }
            other => Err(Error::backend(
                "PGRST202",
                format!("Could not find the function public.{other}"),
            )),
        }
    }

    async fn upload_object(
        &self,
        bucket: &str,
        path: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<()> {
        self.state.lock().unwrap().objects.insert(
            format!("{bucket}/{path}"),
            StoredObject {
                content_type: content_type.to_string(),
                body,
            },
        );
        Ok(())
    }

    fn public_object_url(&self, bucket: &str, path: &str) -> String {
        format!("https://fake.backend/storage/v1/object/public/{bucket}/{path}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> FakeBackend {
        FakeBackend::new(SessionStore::new())
    }

    #[tokio::test]
    async fn select_one_reports_the_not_found_code() {
        let backend = backend();
        let err = backend
            .select_one("profiles", RowQuery::new().filter(Filter::eq("id", "missing")))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn duplicate_friendship_rows_violate_the_pair_constraint() {
        let backend = backend();
        let row = json!({"user_id": "u1", "friend_id": "u2"});
        backend.insert("friendships", row.clone()).await.unwrap();
        let err = backend.insert("friendships", row).await.unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[tokio::test]
    async fn update_rejects_an_invite_code_already_taken() {
        let backend = backend();
        backend
            .insert("profiles", json!({"id": "u1", "invite_code": "AAAAAA"}))
            .await
            .unwrap();
        backend
            .insert("profiles", json!({"id": "u2", "invite_code": "BBBBBB"}))
            .await
            .unwrap();
        let err = backend
            .update(
                "profiles",
                vec![Filter::eq("id", "u2")],
                json!({"invite_code": "AAAAAA"}),
            )
            .await
            .unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[tokio::test]
    async fn ordering_is_newest_first_even_within_a_clock_tick() {
        let backend = backend();
        for name in ["first", "second", "third"] {
            backend
                .insert("gifts", json!({"item_name": name, "amount": 1, "creator_id": "u1"}))
                .await
                .unwrap();
        }
        let rows = backend
            .select("gifts", RowQuery::new().order_desc("created_at"))
            .await
            .unwrap();
        let names: Vec<_> = rows
            .iter()
            .map(|r| r["item_name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["third", "second", "first"]);
    }

    #[tokio::test]
    async fn unknown_procedures_report_the_missing_function_code() {
        let backend = backend();
        let err = backend.rpc("no_such_fn", json!({})).await.unwrap_err();
        assert!(matches!(err, Error::Backend { code, .. } if code == "PGRST202"));
    }
}
