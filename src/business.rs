//! Business registration.

use chrono::Utc;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::storage::{DocumentStore, StoreError};
use crate::types::BUSINESS_COLLECTION;

const ID_LEN: usize = 8;

#[derive(Error, Debug)]
pub enum RegistrationError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Registration payload as submitted. Every field is required and must be
/// non-blank after trimming.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct BusinessForm {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub contact: Option<String>,
}

/// Validated registration
#[derive(Debug, Clone, PartialEq)]
pub struct NewBusiness {
    pub name: String,
    pub address: String,
    pub contact: String,
}

impl BusinessForm {
    pub fn validate(&self) -> Result<NewBusiness, RegistrationError> {
        Ok(NewBusiness {
            name: required(&self.name, "name")?,
            address: required(&self.address, "address")?,
            contact: required(&self.contact, "contact")?,
        })
    }
}

fn required(value: &Option<String>, field: &'static str) -> Result<String, RegistrationError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or(RegistrationError::Missing(field))
}

/// Validate and store a business, returning its new id. Nothing is written
/// when validation fails.
pub async fn register(
    store: &dyn DocumentStore,
    form: &BusinessForm,
) -> Result<String, RegistrationError> {
    let business = form.validate()?;
    let id = new_business_id();

    let mut fields = Map::new();
    fields.insert("name".into(), Value::from(business.name.as_str()));
    fields.insert("address".into(), Value::from(business.address));
    fields.insert("contact".into(), Value::from(business.contact));
    fields.insert("business_id".into(), Value::from(id.as_str()));
    fields.insert("registered_at".into(), Value::from(Utc::now().to_rfc3339()));
    store.set(BUSINESS_COLLECTION, &id, fields).await?;

    tracing::info!("Registered business {} ({})", id, business.name);
    Ok(id)
}

fn new_business_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..ID_LEN].to_string()
}
