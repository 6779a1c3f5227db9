// src/clients.rs

//! Construction of the external clients a handler needs.
//!
//! Handlers never build clients themselves: they ask a [`ClientFactory`],
//! built once per process, so tests can substitute in-memory doubles.
//! Clients acting for the caller use the delegated credentials carried by the
//! request; the permission-group directory, the object store and the backfill's
//! search client use the function's own credentials.

use std::sync::Arc;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, SdkConfig};
use aws_credential_types::Credentials;
use aws_credential_types::provider::ProvideCredentials;
use tracing::info;

use crate::error::{AppError, Result};
use crate::models::{DelegatedCredentials, SearchConfig};
use crate::services::search::{AuthStrategy, SearchClient, SearchIndex};
use crate::storage::{
    DynamoGroupDirectory, DynamoJobStore, GroupDirectory, JobStore, ObjectStore, S3ObjectStore,
    SqsWorkQueue, WorkQueue,
};

/// Source of every external client used by the handlers.
#[async_trait]
pub trait ClientFactory: Send + Sync {
    /// Search index client acting for the caller.
    async fn search_index(&self, credentials: &DelegatedCredentials)
    -> Result<Arc<dyn SearchIndex>>;

    /// Search index client acting as the function itself.
    async fn service_search_index(&self) -> Result<Arc<dyn SearchIndex>>;

    fn job_store(&self, credentials: &DelegatedCredentials) -> Arc<dyn JobStore>;

    fn work_queue(&self, credentials: &DelegatedCredentials) -> Arc<dyn WorkQueue>;

    fn group_directory(&self, table: &str) -> Arc<dyn GroupDirectory>;

    fn object_store(&self) -> Arc<dyn ObjectStore>;
}

/// Clients backed by the AWS SDK and the HTTP search client.
pub struct AwsClients {
    sdk_config: SdkConfig,
    search: SearchConfig,
    http: reqwest::Client,
}

impl AwsClients {
    /// Load AWS configuration from the environment.
    pub async fn from_env(search: SearchConfig) -> Result<Self> {
        let sdk_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(search.timeout_secs))
            .build()
            .map_err(|e| AppError::config(format!("Failed to build HTTP client: {e}")))?;

        info!(
            "AWS clients ready (region: {:?}, search host: {})",
            sdk_config.region(),
            search.host
        );
        Ok(Self {
            sdk_config,
            search,
            http,
        })
    }

    fn delegated(credentials: &DelegatedCredentials) -> Credentials {
        Credentials::new(
            credentials.access_key_id.clone(),
            credentials.secret_access_key.clone(),
            credentials.session_token.clone(),
            None,
            "request-authorizer",
        )
    }

    /// Resolve the process's own AWS credentials.
    pub async fn ambient_credentials(&self) -> Result<DelegatedCredentials> {
        let provider = self
            .sdk_config
            .credentials_provider()
            .ok_or_else(|| AppError::config("No AWS credentials provider configured"))?;
        let credentials = provider
            .provide_credentials()
            .await
            .map_err(|e| AppError::config(format!("Failed to resolve AWS credentials: {e}")))?;

        Ok(DelegatedCredentials {
            access_key_id: credentials.access_key_id().to_string(),
            secret_access_key: credentials.secret_access_key().to_string(),
            session_token: credentials.session_token().map(str::to_string),
        })
    }

    fn search_client(&self, credentials: DelegatedCredentials) -> Result<Arc<dyn SearchIndex>> {
        let auth = auth_strategy(&self.search, credentials);
        let client =
            SearchClient::with_client(self.http.clone(), &self.search.host, self.search.use_ssl, auth)?;
        Ok(Arc::new(client))
    }
}

/// Configured headers take precedence over request signing.
pub fn auth_strategy(search: &SearchConfig, credentials: DelegatedCredentials) -> AuthStrategy {
    if search.headers.is_empty() {
        AuthStrategy::signing(credentials, search.region.clone())
    } else {
        AuthStrategy::StaticHeaders(search.headers.clone())
    }
}

#[async_trait]
impl ClientFactory for AwsClients {
    async fn search_index(
        &self,
        credentials: &DelegatedCredentials,
    ) -> Result<Arc<dyn SearchIndex>> {
        self.search_client(credentials.clone())
    }

    async fn service_search_index(&self) -> Result<Arc<dyn SearchIndex>> {
        let credentials = self.ambient_credentials().await?;
        self.search_client(credentials)
    }

    fn job_store(&self, credentials: &DelegatedCredentials) -> Arc<dyn JobStore> {
        let config = aws_sdk_dynamodb::config::Builder::from(&self.sdk_config)
            .credentials_provider(Self::delegated(credentials))
            .build();
        Arc::new(DynamoJobStore::new(aws_sdk_dynamodb::Client::from_conf(
            config,
        )))
    }

    fn work_queue(&self, credentials: &DelegatedCredentials) -> Arc<dyn WorkQueue> {
        let config = aws_sdk_sqs::config::Builder::from(&self.sdk_config)
            .credentials_provider(Self::delegated(credentials))
            .build();
        Arc::new(SqsWorkQueue::new(aws_sdk_sqs::Client::from_conf(config)))
    }

    fn group_directory(&self, table: &str) -> Arc<dyn GroupDirectory> {
        Arc::new(DynamoGroupDirectory::new(
            aws_sdk_dynamodb::Client::new(&self.sdk_config),
            table,
        ))
    }

    fn object_store(&self) -> Arc<dyn ObjectStore> {
        Arc::new(S3ObjectStore::new(aws_sdk_s3::Client::new(&self.sdk_config)))
    }
}
