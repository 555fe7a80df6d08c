use crate::event::dto::UpdateMealsRequest;
use crate::event::repo::MMDelegate;

/// Merge a meal-form update into the stored event record. Only fields the
/// desk actually sent change.
pub fn apply_meal_update(mut mm: MMDelegate, update: UpdateMealsRequest) -> MMDelegate {
    if let Some(country) = update.country {
        mm.country = country;
    }
    if let Some(committee) = update.committee {
        mm.committee = committee;
    }
    if let Some(v) = update.d1_bf {
        mm.d1_bf = v;
    }
    if let Some(v) = update.d1_lunch {
        mm.d1_lunch = v;
    }
    if let Some(v) = update.d1_hitea {
        mm.d1_hitea = v;
    }
    if let Some(v) = update.d2_bf {
        mm.d2_bf = v;
    }
    if let Some(v) = update.d2_lunch {
        mm.d2_lunch = v;
    }
    if let Some(v) = update.d2_hitea {
        mm.d2_hitea = v;
    }
    if let Some(v) = update.d3_bf {
        mm.d3_bf = v;
    }
    if let Some(v) = update.d3_lunch {
        mm.d3_lunch = v;
    }
    if let Some(v) = update.d3_hitea {
        mm.d3_hitea = v;
    }
    mm
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delegates::repo::{new_delegate_id, Delegate};

    fn record() -> MMDelegate {
        let delegate = Delegate {
            id: new_delegate_id(),
            firstname: "Asha".into(),
            lastname: "Menon".into(),
            email: "mm@example.com".into(),
            contact: String::new(),
            dateofbirth: String::new(),
            gender: String::new(),
            pastmuns: vec![],
            verified: true,
        };
        MMDelegate::from_delegate(&delegate, "France".into(), "UNHRC".into())
    }

    #[test]
    fn absent_fields_stay_as_stored() {
        let merged = apply_meal_update(record(), UpdateMealsRequest::default());
        assert!(merged.d1_bf);
        assert!(!merged.d2_lunch);
        assert_eq!(merged.country, "France");
    }

    #[test]
    fn flags_can_be_set_and_cleared() {
        let merged = apply_meal_update(
            record(),
            UpdateMealsRequest {
                d1_bf: Some(false),
                d2_lunch: Some(true),
                committee: Some("DISEC".into()),
                ..Default::default()
            },
        );
        assert!(!merged.d1_bf);
        assert!(merged.d2_lunch);
        assert_eq!(merged.committee, "DISEC");
    }
}
