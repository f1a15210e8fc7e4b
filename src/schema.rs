//! Field rules per reported entity.
//!
//! Each entity lists the fields callers may set and the rules those values
//! must satisfy. The registry is built once at startup and handed to the
//! service; nothing registers itself.

use std::collections::HashMap;

use crate::domain::{
    ActivityPlanReport, DisaggregationLocationReport, MonthlyReport, TargetLocationReport,
};
use crate::errors::{ReportError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRule {
    Required,
    NonNegative,
    Range { min: i64, max: i64 },
    MaxLength(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue<'a> {
    Int(Option<i64>),
    Text(Option<&'a str>),
}

impl FieldRule {
    fn check(&self, value: FieldValue<'_>) -> std::result::Result<(), String> {
        match (self, value) {
            (FieldRule::Required, FieldValue::Int(None)) => Err("is required".to_string()),
            (FieldRule::Required, FieldValue::Text(None)) => Err("is required".to_string()),
            (FieldRule::Required, FieldValue::Text(Some(s))) if s.trim().is_empty() => {
                Err("must not be blank".to_string())
            }
            (FieldRule::NonNegative, FieldValue::Int(Some(n))) if n < 0 => {
                Err(format!("must not be negative (got {n})"))
            }
            (FieldRule::Range { min, max }, FieldValue::Int(Some(n))) if n < *min || n > *max => {
                Err(format!("must be between {min} and {max} (got {n})"))
            }
            (FieldRule::MaxLength(max), FieldValue::Text(Some(s))) if s.chars().count() > *max => {
                Err(format!("must be at most {max} characters"))
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: &'static str,
    pub rules: Vec<FieldRule>,
}

impl FieldSpec {
    pub fn new(name: &'static str, rules: &[FieldRule]) -> Self {
        Self {
            name,
            rules: rules.to_vec(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EntitySchema {
    pub entity: &'static str,
    pub fields: Vec<FieldSpec>,
}

/// Rows that expose their editable fields to the schema registry.
pub trait SchemaFields {
    const ENTITY: &'static str;

    fn field(&self, name: &str) -> Option<FieldValue<'_>>;
}

#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    entities: HashMap<&'static str, EntitySchema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rules matching the reporting forms.
    pub fn standard() -> Self {
        use FieldRule::*;

        Self::new()
            .register(EntitySchema {
                entity: ActivityPlanReport::ENTITY,
                fields: vec![
                    FieldSpec::new("response_type", &[MaxLength(200)]),
                    FieldSpec::new("units", &[NonNegative]),
                    FieldSpec::new("no_of_transfers", &[Range { min: 0, max: 30 }]),
                ],
            })
            .register(EntitySchema {
                entity: TargetLocationReport::ENTITY,
                fields: vec![FieldSpec::new("location_code", &[Required, MaxLength(200)])],
            })
            .register(EntitySchema {
                entity: DisaggregationLocationReport::ENTITY,
                fields: vec![
                    FieldSpec::new("category", &[Required, MaxLength(200)]),
                    FieldSpec::new("reached", &[Required, NonNegative]),
                ],
            })
            .register(EntitySchema {
                entity: MonthlyReport::ENTITY,
                fields: vec![FieldSpec::new("rejection_comment", &[MaxLength(2000)])],
            })
    }

    pub fn register(mut self, schema: EntitySchema) -> Self {
        self.entities.insert(schema.entity, schema);
        self
    }

    pub fn schema(&self, entity: &str) -> Option<&EntitySchema> {
        self.entities.get(entity)
    }

    /// Checks every registered field of `row`. Unregistered entities pass.
    pub fn validate<T: SchemaFields>(&self, row: &T) -> Result<()> {
        let Some(schema) = self.schema(T::ENTITY) else {
            return Ok(());
        };

        for spec in &schema.fields {
            let Some(value) = row.field(spec.name) else {
                continue;
            };
            for rule in &spec.rules {
                rule.check(value).map_err(|reason| ReportError::InvalidField {
                    entity: T::ENTITY,
                    field: spec.name,
                    reason,
                })?;
            }
        }
        Ok(())
    }
}

impl SchemaFields for ActivityPlanReport {
    const ENTITY: &'static str = "activity_plan_report";

    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        match name {
            "response_type" => Some(FieldValue::Text(self.response_type.as_deref())),
            "units" => Some(FieldValue::Int(self.units)),
            "no_of_transfers" => Some(FieldValue::Int(self.no_of_transfers)),
            _ => None,
        }
    }
}

impl SchemaFields for TargetLocationReport {
    const ENTITY: &'static str = "target_location_report";

    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        match name {
            "location_code" => Some(FieldValue::Text(Some(self.location_code.as_str()))),
            _ => None,
        }
    }
}

impl SchemaFields for DisaggregationLocationReport {
    const ENTITY: &'static str = "disaggregation_location_report";

    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        match name {
            "category" => Some(FieldValue::Text(Some(self.category.as_str()))),
            "reached" => Some(FieldValue::Int(Some(self.reached))),
            _ => None,
        }
    }
}

impl SchemaFields for MonthlyReport {
    const ENTITY: &'static str = "monthly_report";

    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        match name {
            "rejection_comment" => Some(FieldValue::Text(self.rejection_comment.as_deref())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan_report(no_of_transfers: Option<i64>) -> ActivityPlanReport {
        ActivityPlanReport {
            id: 0,
            monthly_report_id: 1,
            activity_plan_id: 1,
            response_type: Some("Emergency".to_string()),
            units: Some(3),
            no_of_transfers,
        }
    }

    #[test]
    fn test_transfers_are_capped_at_thirty() {
        let registry = SchemaRegistry::standard();
        assert!(registry.validate(&plan_report(Some(30))).is_ok());
        assert!(registry.validate(&plan_report(None)).is_ok());

        let err = registry.validate(&plan_report(Some(31))).unwrap_err();
        assert!(matches!(
            err,
            ReportError::InvalidField { entity: "activity_plan_report", field: "no_of_transfers", .. }
        ));
    }

    #[test]
    fn test_negative_reached_is_rejected() {
        let registry = SchemaRegistry::standard();
        let row = DisaggregationLocationReport {
            id: 0,
            target_location_report_id: 1,
            category: "women".to_string(),
            reached: -1,
        };
        let err = registry.validate(&row).unwrap_err();
        assert_eq!(err.to_string(), "invalid disaggregation_location_report.reached: must not be negative (got -1)");
    }

    #[test]
    fn test_blank_category_is_rejected() {
        let registry = SchemaRegistry::standard();
        let row = DisaggregationLocationReport {
            id: 0,
            target_location_report_id: 1,
            category: "  ".to_string(),
            reached: 4,
        };
        assert!(registry.validate(&row).is_err());
    }

    #[test]
    fn test_empty_registry_accepts_everything() {
        let registry = SchemaRegistry::new();
        assert!(registry.validate(&plan_report(Some(99))).is_ok());
    }
}
