use serde::Deserialize;

/// Request body for event registration. The delegate is looked up by email
/// in the main directory and snapshotted into the event store.
#[derive(Debug, Deserialize)]
pub struct EventRegisterRequest {
    pub email: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub committee: String,
}

/// Partial update for the meal form. Absent flags stay as stored; the desk
/// can both mark and unmark a meal.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateMealsRequest {
    pub country: Option<String>,
    pub committee: Option<String>,
    pub d1_bf: Option<bool>,
    pub d1_lunch: Option<bool>,
    pub d1_hitea: Option<bool>,
    pub d2_bf: Option<bool>,
    pub d2_lunch: Option<bool>,
    pub d2_hitea: Option<bool>,
    pub d3_bf: Option<bool>,
    pub d3_lunch: Option<bool>,
    pub d3_hitea: Option<bool>,
}
