// src/testing.rs

//! In-memory doubles of every external client, for unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{Value, json};

use crate::clients::ClientFactory;
use crate::error::{AppError, Result};
use crate::models::{DelegatedCredentials, PermissionGroup, TranscribeOnRequestJob};
use crate::services::search::{SearchIndex, classify_status};
use crate::storage::{GroupDirectory, JobStore, ObjectStore, WorkQueue};

// --- Search index ---

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub endpoint: String,
    pub body: Option<Value>,
}

type Responder = Box<dyn Fn(&Method, &str, Option<&Value>) -> Result<Value> + Send + Sync>;

/// Search index double answering through a responder closure.
pub struct FakeSearch {
    responder: Responder,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl FakeSearch {
    /// Acknowledges every request.
    pub fn new() -> Self {
        Self::with_responder(|_, _, _| Ok(json!({"result": "updated"})))
    }

    pub fn with_responder(
        responder: impl Fn(&Method, &str, Option<&Value>) -> Result<Value> + Send + Sync + 'static,
    ) -> Self {
        Self {
            responder: Box::new(responder),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answers every `_search` with the given hits.
    pub fn with_hits(hits: Vec<Value>) -> Self {
        let response = search_response(&hits);
        Self::with_responder(move |_, endpoint, _| {
            if endpoint.ends_with("_search") {
                Ok(response.clone())
            } else {
                Ok(json!({"result": "updated"}))
            }
        })
    }

    /// Fails every request as the HTTP client would for `status`.
    pub fn failing(status: u16) -> Self {
        Self::with_responder(move |_, _, _| {
            classify_status(status, "simulated failure")?;
            Ok(Value::Null)
        })
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Bodies of every `_search` request, in order.
    pub fn search_bodies(&self) -> Vec<Value> {
        self.requests()
            .into_iter()
            .filter(|r| r.endpoint.ends_with("_search"))
            .filter_map(|r| r.body)
            .collect()
    }
}

#[async_trait]
impl SearchIndex for FakeSearch {
    async fn send(&self, method: Method, endpoint: &str, body: Option<&Value>) -> Result<Value> {
        self.requests.lock().unwrap().push(RecordedRequest {
            method: method.clone(),
            endpoint: endpoint.to_string(),
            body: body.cloned(),
        });
        (self.responder)(&method, endpoint, body)
    }
}

pub fn search_response(hits: &[Value]) -> Value {
    json!({
        "hits": {
            "total": {"value": hits.len(), "relation": "eq"},
            "hits": hits,
        }
    })
}

pub fn hit(id: &str, source: Value) -> Value {
    json!({
        "_index": "call-details-000001",
        "_id": id,
        "_score": 4.2,
        "_source": source,
    })
}

/// A complete indexed call record.
pub fn call_source(filename_prefix: &str, distributor: &str, line_of_business: &str) -> Value {
    json!({
        "original_contact_id": "9149195935190001661",
        "extension": "1534749",
        "customer_phone_number": "8676959617",
        "agent_email": "agent@example.com",
        "distributor_number": distributor,
        "created_at_": "2024-01-10T15:07:03.979127+00:00",
        "start_datetime": "2024-01-10T15:02:12.507261+00:00",
        "end_datetime": "2024-01-10T15:12:12.507261+00:00",
        "video_recorded": false,
        "call_direction": "1",
        "language": "F",
        "organization_unit": "- Team A",
        "duration": 600,
        "agent_full_name": "Agent Name",
        "filename_prefix": filename_prefix,
        "call_context": "ACQ",
        "company_number": "010",
        "line_of_business": line_of_business,
        "total_hold_time": 0,
        "agent_pbxid": "34749",
        "region": "YT",
        "queue_id": "1877122",
    })
}

// --- Job store ---

#[derive(Default)]
pub struct FakeJobStore {
    fail: bool,
    writes: Mutex<Vec<(String, Vec<TranscribeOnRequestJob>)>>,
}

impl FakeJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn write_count(&self) -> usize {
        self.writes.lock().unwrap().len()
    }

    pub fn writes(&self) -> Vec<(String, Vec<TranscribeOnRequestJob>)> {
        self.writes.lock().unwrap().clone()
    }

    pub fn jobs(&self) -> Vec<TranscribeOnRequestJob> {
        self.writes().into_iter().flat_map(|(_, jobs)| jobs).collect()
    }
}

#[async_trait]
impl JobStore for FakeJobStore {
    async fn write_batch(&self, table: &str, jobs: &[TranscribeOnRequestJob]) -> Result<()> {
        self.writes
            .lock()
            .unwrap()
            .push((table.to_string(), jobs.to_vec()));
        if self.fail {
            return Err(AppError::store("simulated batch write failure"));
        }
        Ok(())
    }
}

// --- Work queue ---

#[derive(Default)]
pub struct FakeQueue {
    fail: bool,
    sends: Mutex<Vec<(String, Vec<String>)>>,
}

impl FakeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn send_count(&self) -> usize {
        self.sends.lock().unwrap().len()
    }

    pub fn sends(&self) -> Vec<(String, Vec<String>)> {
        self.sends.lock().unwrap().clone()
    }

    /// Every message body, parsed.
    pub fn messages(&self) -> Vec<Value> {
        self.sends()
            .into_iter()
            .flat_map(|(_, bodies)| bodies)
            .map(|body| serde_json::from_str(&body).unwrap())
            .collect()
    }
}

#[async_trait]
impl WorkQueue for FakeQueue {
    async fn send_batch(&self, queue_url: &str, messages: &[String]) -> Result<()> {
        self.sends
            .lock()
            .unwrap()
            .push((queue_url.to_string(), messages.to_vec()));
        if self.fail {
            return Err(AppError::queue("simulated send failure"));
        }
        Ok(())
    }
}

// --- Object store ---

#[derive(Default)]
pub struct FakeObjectStore {
    fail_writes: bool,
    objects: Mutex<HashMap<(String, String), Value>>,
}

impl FakeObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_writes() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    pub fn insert(&self, bucket: &str, key: &str, value: Value) {
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), value);
    }

    pub fn get(&self, bucket: &str, key: &str) -> Option<Value> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self
            .objects
            .lock()
            .unwrap()
            .keys()
            .map(|(_, key)| key.clone())
            .collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl ObjectStore for FakeObjectStore {
    async fn get_json(&self, bucket: &str, key: &str) -> Result<Option<Value>> {
        Ok(self.get(bucket, key))
    }

    async fn put_json(&self, bucket: &str, key: &str, value: &Value) -> Result<()> {
        if self.fail_writes {
            return Err(AppError::object_store("simulated put failure"));
        }
        self.insert(bucket, key, value.clone());
        Ok(())
    }
}

// --- Group directory ---

pub struct FakeGroups(pub Vec<PermissionGroup>);

#[async_trait]
impl GroupDirectory for FakeGroups {
    async fn user_groups(&self, _email: &str) -> Result<Vec<PermissionGroup>> {
        Ok(self.0.clone())
    }
}

pub fn permission_group(name: &str, distributors: &[&str], lines_of_business: &[&str]) -> PermissionGroup {
    PermissionGroup {
        id: name.to_string(),
        name: name.to_string(),
        description: "Test group description".to_string(),
        distributors: distributors.iter().map(|s| s.to_string()).collect(),
        lines_of_business: lines_of_business.iter().map(|s| s.to_string()).collect(),
    }
}

// --- Client factory ---

pub struct FakeClients {
    pub search: Arc<FakeSearch>,
    pub jobs: Arc<FakeJobStore>,
    pub queue: Arc<FakeQueue>,
    pub groups: Arc<FakeGroups>,
    pub objects: Arc<FakeObjectStore>,
}

impl FakeClients {
    pub fn new(search: FakeSearch, groups: Vec<PermissionGroup>) -> Self {
        Self {
            search: Arc::new(search),
            jobs: Arc::new(FakeJobStore::new()),
            queue: Arc::new(FakeQueue::new()),
            groups: Arc::new(FakeGroups(groups)),
            objects: Arc::new(FakeObjectStore::new()),
        }
    }

    pub fn with_jobs(mut self, jobs: FakeJobStore) -> Self {
        self.jobs = Arc::new(jobs);
        self
    }

    pub fn with_queue(mut self, queue: FakeQueue) -> Self {
        self.queue = Arc::new(queue);
        self
    }

    pub fn with_objects(mut self, objects: FakeObjectStore) -> Self {
        self.objects = Arc::new(objects);
        self
    }
}

#[async_trait]
impl ClientFactory for FakeClients {
    async fn search_index(
        &self,
        _credentials: &DelegatedCredentials,
    ) -> Result<Arc<dyn SearchIndex>> {
        Ok(self.search.clone())
    }

    async fn service_search_index(&self) -> Result<Arc<dyn SearchIndex>> {
        Ok(self.search.clone())
    }

    fn job_store(&self, _credentials: &DelegatedCredentials) -> Arc<dyn JobStore> {
        self.jobs.clone()
    }

    fn work_queue(&self, _credentials: &DelegatedCredentials) -> Arc<dyn WorkQueue> {
        self.queue.clone()
    }

    fn group_directory(&self, _table: &str) -> Arc<dyn GroupDirectory> {
        self.groups.clone()
    }

    fn object_store(&self) -> Arc<dyn ObjectStore> {
        self.objects.clone()
    }
}
