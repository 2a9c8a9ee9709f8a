//! Observation form state on the pest page.
//!
//! `Draft` shows the editable form, `Submitted` the confirmation. A failed
//! submit stays in `Draft` with the entered values and the error message.

use serde::Serialize;

use crate::intake::ObservationPayload;

/// Field values echoed back into the form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ObservationValues {
    pub location: String,
    pub observation_date: String,
    pub notes: String,
    pub impact_whenua: String,
    pub impact_wai: String,
    pub impact_tangata: String,
    pub submitter_name: String,
    pub submitter_email: String,
}

impl From<&ObservationPayload> for ObservationValues {
    fn from(p: &ObservationPayload) -> Self {
        let text = |v: &Option<String>| v.clone().unwrap_or_default();
        Self {
            location: p.location.clone(),
            observation_date: p.observation_date.clone(),
            notes: text(&p.notes),
            impact_whenua: text(&p.impact_whenua),
            impact_wai: text(&p.impact_wai),
            impact_tangata: text(&p.impact_tangata),
            submitter_name: text(&p.submitter_name),
            submitter_email: text(&p.submitter_email),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ObservationForm {
    Draft { values: ObservationValues, error: Option<String> },
    Submitted { pest_title: String },
}

impl Default for ObservationForm {
    fn default() -> Self {
        ObservationForm::Draft { values: ObservationValues::default(), error: None }
    }
}

impl ObservationForm {
    pub fn draft(values: ObservationValues) -> Self {
        ObservationForm::Draft { values, error: None }
    }

    /// Apply the outcome of a create call. Only a draft moves; a form that
    /// is already submitted ignores further outcomes.
    pub fn complete<E: std::fmt::Display>(self, outcome: Result<String, E>) -> Self {
        match (self, outcome) {
            (ObservationForm::Draft { .. }, Ok(pest_title)) => ObservationForm::Submitted { pest_title },
            (ObservationForm::Draft { values, .. }, Err(e)) => {
                ObservationForm::Draft { values, error: Some(e.to_string()) }
            }
            (submitted, _) => submitted,
        }
    }
}
