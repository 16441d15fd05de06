use super::{acknowledge, require_session};
use crate::{
    client::ApiClient,
    endpoint::Endpoint,
    errors::ApiError,
};
use serde_derive::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// An employee record. Its fields are defined by the staff page.
pub type Employee = Value;

#[derive(Debug, Deserialize)]
struct StaffResponse {
    #[serde(default)]
    staff: BTreeMap<String, Employee>,
}

/// The result of [`create_staff()`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreatedEmployee {
    /// The ID the server assigned.
    pub id: String,
    pub employee: Employee,
}

#[derive(Debug, Deserialize)]
struct UpdateResponse {
    employee: Employee,
}

/// Get every employee, keyed by ID.
pub async fn get_staff(
    client: &ApiClient,
) -> Result<BTreeMap<String, Employee>, ApiError> {
    require_session(client)?;

    let response: StaffResponse =
        client.fetch(&Endpoint::get("/staff")).await?;

    Ok(response.staff)
}

pub async fn create_staff(
    client: &ApiClient,
    employee: &Employee,
) -> Result<CreatedEmployee, ApiError> {
    require_session(client)?;
    client.connectivity().ensure_online()?;

    let endpoint = Endpoint::post("/staff").with_body(employee.clone());
    let created: CreatedEmployee = client.fetch(&endpoint).await?;
    log::debug!("Created employee {}", created.id);

    Ok(created)
}

pub async fn update_staff(
    client: &ApiClient,
    employee_id: &str,
    employee: &Employee,
) -> Result<Employee, ApiError> {
    require_session(client)?;
    client.connectivity().ensure_online()?;

    let endpoint = Endpoint::put("/staff")
        .with_segment(employee_id)
        .with_body(employee.clone());
    let response: UpdateResponse = client.fetch(&endpoint).await?;

    Ok(response.employee)
}

pub async fn delete_staff(
    client: &ApiClient,
    employee_id: &str,
) -> Result<(), ApiError> {
    require_session(client)?;
    client.connectivity().ensure_online()?;

    let endpoint = Endpoint::delete("/staff").with_segment(employee_id);
    acknowledge(client, &endpoint).await
}
