use super::{acknowledge, require_session};
use crate::{
    client::ApiClient,
    endpoint::Endpoint,
    errors::ApiError,
};
use serde_derive::{Deserialize, Serialize};
use serde_json::Value;

/// Everything the rooms page keeps for the logged in user.
///
/// The layout of individual rooms and residents belongs to the frontend, so
/// they are passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomsSnapshot {
    #[serde(default = "empty_list")]
    pub rooms: Value,
    #[serde(default = "empty_object")]
    pub beds_state: Value,
    #[serde(default = "empty_list")]
    pub residents: Value,
    #[serde(default = "empty_object")]
    pub bed_numbers: Value,
}

impl Default for RoomsSnapshot {
    fn default() -> RoomsSnapshot {
        RoomsSnapshot {
            rooms: empty_list(),
            beds_state: empty_object(),
            residents: empty_list(),
            bed_numbers: empty_object(),
        }
    }
}

fn empty_list() -> Value { Value::Array(Vec::new()) }

fn empty_object() -> Value { Value::Object(Default::default()) }

#[derive(Debug, Deserialize)]
struct UpdateResponse {
    room: Value,
}

/// Fetch the current user's rooms, beds and residents.
pub async fn get_rooms(client: &ApiClient) -> Result<RoomsSnapshot, ApiError> {
    require_session(client)?;

    let snapshot: Option<RoomsSnapshot> =
        client.fetch(&Endpoint::get("/rooms")).await?;

    Ok(snapshot.unwrap_or_default())
}

/// Replace everything stored for the current user.
///
/// Refuses to run while the server is known to be offline, rather than
/// letting the changes vanish.
pub async fn save_rooms(
    client: &ApiClient,
    snapshot: &RoomsSnapshot,
) -> Result<(), ApiError> {
    require_session(client)?;
    client.connectivity().ensure_online()?;

    let endpoint =
        Endpoint::post("/rooms").with_body(serde_json::to_value(snapshot)?);
    acknowledge(client, &endpoint).await
}

pub async fn update_room(
    client: &ApiClient,
    room_id: &str,
    room: &Value,
) -> Result<Value, ApiError> {
    require_session(client)?;
    client.connectivity().ensure_online()?;

    let endpoint = Endpoint::put("/rooms")
        .with_segment(room_id)
        .with_body(room.clone());
    let response: UpdateResponse = client.fetch(&endpoint).await?;

    Ok(response.room)
}

pub async fn delete_room(
    client: &ApiClient,
    room_id: &str,
) -> Result<(), ApiError> {
    require_session(client)?;
    client.connectivity().ensure_online()?;

    let endpoint = Endpoint::delete("/rooms").with_segment(room_id);
    acknowledge(client, &endpoint).await
}

/// Wipe every room on the server. Requires an administrator.
pub async fn delete_all_rooms(client: &ApiClient) -> Result<(), ApiError> {
    require_session(client)?;
    client.connectivity().ensure_online()?;

    log::warn!("Deleting all rooms");
    acknowledge(client, &Endpoint::delete("/rooms/all")).await
}
