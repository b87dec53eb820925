//! Notification payload construction. Titles and bodies are in Spanish to
//! match the rest of the platform's user-facing copy; which one a recipient
//! gets depends on the dominant change type and on whether the recipient
//! was added to or removed from the concept's exception set.

use domain::diff::{priority_for, ChangeRecord, ChangeSet, DominantChange};
use entity::PaymentConcept;
use events::{AudienceKind, NotificationPayload, Priority};

/// Payload for the regular slice of the audience of a mutation.
pub fn for_change(change_set: &ChangeSet, concept: &PaymentConcept) -> NotificationPayload {
    let dominant = change_set
        .dominant()
        .unwrap_or(DominantChange::FieldUpdate);

    let title = match dominant {
        DominantChange::AppliesToChanged => "Cambio de destinatarios del concepto",
        DominantChange::ExceptionsUpdate => "Actualización de excepciones del concepto",
        DominantChange::RelationUpdate => "Actualización de destinatarios del concepto",
        DominantChange::FieldUpdate => "Concepto de pago actualizado",
    };

    let body = match dominant {
        DominantChange::AppliesToChanged => {
            let labels = change_set.records().iter().find_map(|record| match record {
                ChangeRecord::AppliesToChanged { old, new } => Some((old, new)),
                _ => None,
            });
            match labels {
                Some((old, new)) => format!(
                    "Los destinatarios del concepto '{}' cambiaron de {} a {}.",
                    concept.name, old, new
                ),
                None => format!(
                    "Los destinatarios del concepto '{}' cambiaron.",
                    concept.name
                ),
            }
        }
        DominantChange::ExceptionsUpdate | DominantChange::RelationUpdate => format!(
            "Se actualizaron los destinatarios del concepto '{}'.",
            concept.name
        ),
        DominantChange::FieldUpdate => format!(
            "El concepto '{}' fue actualizado; revisa tu resumen de pagos.",
            concept.name
        ),
    };

    NotificationPayload {
        concept_id: concept.id,
        concept_name: concept.name.clone(),
        title: title.to_string(),
        body,
        priority: priority_for(change_set),
        audience_kind: AudienceKind::Regular,
    }
}

/// Payload for recipients newly added to the exception set.
pub fn excluded(concept: &PaymentConcept, priority: Priority) -> NotificationPayload {
    NotificationPayload {
        concept_id: concept.id,
        concept_name: concept.name.clone(),
        title: "Excluido de concepto de pago".to_string(),
        body: format!(
            "Has sido excluido del concepto '{}'; ya no lo adeudas.",
            concept.name
        ),
        priority,
        audience_kind: AudienceKind::NewlyExcluded,
    }
}

/// Payload for recipients whose exception was lifted.
pub fn reinstated(concept: &PaymentConcept, priority: Priority) -> NotificationPayload {
    NotificationPayload {
        concept_id: concept.id,
        concept_name: concept.name.clone(),
        title: "Excepción levantada".to_string(),
        body: format!(
            "Se levantó tu excepción; el concepto '{}' vuelve a aplicarte.",
            concept.name
        ),
        priority,
        audience_kind: AudienceKind::ExceptionLifted,
    }
}

/// Payload for a freshly created concept's audience.
pub fn created(concept: &PaymentConcept) -> NotificationPayload {
    NotificationPayload {
        concept_id: concept.id,
        concept_name: concept.name.clone(),
        title: "Nuevo concepto de pago".to_string(),
        body: format!(
            "Se creó el concepto '{}' por {}; revisa tu resumen de pagos.",
            concept.name, concept.amount
        ),
        priority: Priority::Medium,
        audience_kind: AudienceKind::Regular,
    }
}

/// Payload for a status transition.
pub fn status_changed(
    from: entity::ConceptStatus,
    to: entity::ConceptStatus,
    concept: &PaymentConcept,
) -> NotificationPayload {
    NotificationPayload {
        concept_id: concept.id,
        concept_name: concept.name.clone(),
        title: "Cambio de estado del concepto".to_string(),
        body: format!(
            "El concepto '{}' cambió de estado ({} -> {}).",
            concept.name, from, to
        ),
        priority: Priority::Medium,
        audience_kind: AudienceKind::Regular,
    }
}
