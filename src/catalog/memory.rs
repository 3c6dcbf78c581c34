use super::CatalogStore;
use crate::error::{GatewayError, GatewayResult};
use crate::models::{DomainRecord, EndpointRecord, NewEndpoint, NewProject, ProjectRecord};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Tables {
    projects: Vec<ProjectRecord>,
    endpoints: Vec<EndpointRecord>,
    domains: Vec<DomainRecord>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Process-local catalog. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    tables: RwLock<Tables>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalog {
    async fn insert_project(&self, project: NewProject) -> GatewayResult<ProjectRecord> {
        let mut tables = self.tables.write().await;
        if tables.projects.iter().any(|p| p.uuid == project.uuid) {
            return Err(GatewayError::internal(format!(
                "duplicate project uuid {}",
                project.uuid
            )));
        }
        let record = ProjectRecord {
            id: tables.next_id(),
            uuid: project.uuid,
            project_name: project.project_name,
            engine: project.engine,
            host: project.host,
            port: project.port,
            username: project.username,
            password_hash: project.password_hash,
            database_name: project.database_name,
            dsn: project.dsn,
            created_at: Utc::now(),
        };
        tables.projects.push(record.clone());
        Ok(record)
    }

    async fn list_projects(&self) -> GatewayResult<Vec<ProjectRecord>> {
        let tables = self.tables.read().await;
        Ok(tables.projects.iter().rev().cloned().collect())
    }

    async fn get_project_by_uuid(&self, uuid: &str) -> GatewayResult<Option<ProjectRecord>> {
        let tables = self.tables.read().await;
        Ok(tables.projects.iter().find(|p| p.uuid == uuid).cloned())
    }

    async fn delete_project(&self, id: i64) -> GatewayResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.projects.len();
        tables.projects.retain(|p| p.id != id);
        Ok(tables.projects.len() != before)
    }

    async fn list_endpoints(&self) -> GatewayResult<Vec<EndpointRecord>> {
        Ok(self.tables.read().await.endpoints.clone())
    }

    async fn get_endpoint(&self, id: i64) -> GatewayResult<Option<EndpointRecord>> {
        let tables = self.tables.read().await;
        Ok(tables.endpoints.iter().find(|e| e.id == id).cloned())
    }

    async fn insert_endpoint(&self, endpoint: NewEndpoint) -> GatewayResult<EndpointRecord> {
        let mut tables = self.tables.write().await;
        let record = endpoint.into_record(tables.next_id());
        tables.endpoints.push(record.clone());
        Ok(record)
    }

    async fn update_endpoint(&self, id: i64, endpoint: NewEndpoint) -> GatewayResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.endpoints.iter_mut().find(|e| e.id == id) {
            Some(existing) => {
                *existing = endpoint.into_record(id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_endpoint(&self, id: i64) -> GatewayResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.endpoints.len();
        tables.endpoints.retain(|e| e.id != id);
        Ok(tables.endpoints.len() != before)
    }

    async fn list_domains(&self) -> GatewayResult<Vec<DomainRecord>> {
        Ok(self.tables.read().await.domains.clone())
    }

    async fn insert_domain(&self, url: &str) -> GatewayResult<DomainRecord> {
        let mut tables = self.tables.write().await;
        if tables.domains.iter().any(|d| d.url == url) {
            return Err(GatewayError::invalid_input("Domain already exists"));
        }
        let record = DomainRecord {
            id: tables.next_id(),
            url: url.to_string(),
        };
        tables.domains.push(record.clone());
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::test_support;

    #[tokio::test]
    async fn test_memory_catalog_behaviour() {
        let store = MemoryCatalog::new();
        test_support::exercise_store(&store).await;
    }

    #[tokio::test]
    async fn test_ids_are_never_reused() {
        let store = MemoryCatalog::new();
        let a = store
            .insert_endpoint(test_support::new_endpoint("/a"))
            .await
            .unwrap();
        store.delete_endpoint(a.id).await.unwrap();
        let b = store
            .insert_endpoint(test_support::new_endpoint("/b"))
            .await
            .unwrap();
        assert!(b.id > a.id);
    }
}
