//! Audience generation: one audience per user-related entity type

use crate::db::Audience;
use crate::discovery::RelatedEntity;
use crate::store::audiences::{existing_audience_names, insert_audiences, NewAudience};
use crate::Result;
use sqlx::SqlitePool;
use tracing::info;

/// Audience names split by whether they still need creating
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AudiencePlan {
    /// Missing audiences, in discovery order, without duplicates
    pub to_create: Vec<NewAudience>,
    /// Names that already exist
    pub existing: Vec<String>,
}

/// Outcome of a generation run
#[derive(Debug, Clone, Default)]
pub struct AudienceReport {
    pub created: Vec<Audience>,
    pub existing: Vec<String>,
}

pub fn auto_description(name: &str) -> String {
    format!("Auto-created audience for {}", name)
}

/// Work out which audiences a run would create, without writing
pub async fn plan_audiences(pool: &SqlitePool, related: &[RelatedEntity]) -> Result<AudiencePlan> {
    let mut names: Vec<String> = Vec::with_capacity(related.len());
    for entity in related {
        let name = entity.display_name();
        // Two tables can share a display name; they share the audience too
        if !names.contains(&name) {
            names.push(name);
        }
    }

    let existing = existing_audience_names(pool, &names).await?;

    let mut plan = AudiencePlan::default();
    for name in names {
        if existing.contains(&name) {
            plan.existing.push(name);
        } else {
            plan.to_create.push(NewAudience {
                description: auto_description(&name),
                name,
            });
        }
    }

    Ok(plan)
}

/// Create the audiences missing for the given entity types
pub async fn generate_audiences(pool: &SqlitePool, related: &[RelatedEntity]) -> Result<AudienceReport> {
    let plan = plan_audiences(pool, related).await?;

    let created = if plan.to_create.is_empty() {
        Vec::new()
    } else {
        insert_audiences(pool, &plan.to_create).await?
    };

    info!(
        "Audience generation: {} created, {} already present",
        created.len(),
        plan.existing.len()
    );

    Ok(AudienceReport {
        created,
        existing: plan.existing,
    })
}
