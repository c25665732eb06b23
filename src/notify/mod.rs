pub mod webhook;

use serde::Serialize;

use crate::incident::Incident;

/// Wire shape accepted by the external notification sink.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StatusAlert {
    pub title: String,
    pub message: String,
    pub subtitle: String,
    pub link: String,
}

impl StatusAlert {
    pub fn for_incident(incident: &Incident) -> Self {
        Self {
            title: if incident.resolved {
                "Incident resolved".to_string()
            } else {
                "Status update".to_string()
            },
            message: incident.title.clone(),
            subtitle: if incident.resolved { "Resolved" } else { "Active" }.to_string(),
            link: incident.link.clone(),
        }
    }
}
